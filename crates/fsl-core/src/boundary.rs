//! Night boundary evaluation.
//!
//! Decides which part of a focus interval counts as in-bed time: only the
//! portion after the configured bedtime instant, and only for intervals that
//! actually cross it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ValidationError;

/// Longest focus interval that may still be read as sleep.
pub const MAX_SLEEP_DURATION: Duration = Duration::hours(10);

const MINUTES_PER_DAY: u16 = 24 * 60;

/// Minute of the local day after which an ongoing focus interval counts as sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct NightBoundary {
    minutes_after_midnight: u16,
}

impl NightBoundary {
    /// 01:00 local.
    pub const DEFAULT_MINUTES: u16 = 60;

    /// Creates a boundary after checking the value is within one day.
    pub fn new(minutes_after_midnight: i64) -> Result<Self, ValidationError> {
        u16::try_from(minutes_after_midnight)
            .ok()
            .filter(|minutes| *minutes < MINUTES_PER_DAY)
            .map(|minutes| Self {
                minutes_after_midnight: minutes,
            })
            .ok_or(ValidationError::BoundaryOutOfRange {
                value: minutes_after_midnight,
            })
    }

    pub const fn minutes_after_midnight(self) -> u16 {
        self.minutes_after_midnight
    }

    pub const fn hour(self) -> u16 {
        self.minutes_after_midnight / 60
    }

    pub const fn minute(self) -> u16 {
        self.minutes_after_midnight % 60
    }
}

impl Default for NightBoundary {
    fn default() -> Self {
        Self {
            minutes_after_midnight: Self::DEFAULT_MINUTES,
        }
    }
}

impl TryFrom<i64> for NightBoundary {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NightBoundary> for i64 {
    fn from(boundary: NightBoundary) -> Self {
        Self::from(boundary.minutes_after_midnight)
    }
}

impl fmt::Display for NightBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for NightBoundary {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidBoundaryFormat {
            value: s.to_string(),
        };
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: i64 = hour.parse().map_err(|_| invalid())?;
        let minute: i64 = minute.parse().map_err(|_| invalid())?;
        if !(0..24).contains(&hour) || !(0..60).contains(&minute) {
            return Err(invalid());
        }
        Self::new(hour * 60 + minute)
    }
}

/// Why an interval was not exported as sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IneligibleReason {
    /// The interval ends at or before it starts.
    EmptyInterval,
    /// The interval is longer than [`MAX_SLEEP_DURATION`].
    TooLong,
    /// Local midnight of the start day could not be resolved.
    UnresolvedBoundary,
    /// Neither today's nor tomorrow's boundary falls inside the interval.
    NoBoundaryCrossing,
    /// Trimming left nothing.
    DegenerateTrim,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EmptyInterval => "interval is empty",
            Self::TooLong => "longer than 10 hours",
            Self::UnresolvedBoundary => "night boundary could not be resolved",
            Self::NoBoundaryCrossing => "did not cross the night boundary",
            Self::DegenerateTrim => "nothing left after trimming",
        };
        f.write_str(text)
    }
}

/// Result of evaluating an interval against the night boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible {
        recorded_start: DateTime<Utc>,
        recorded_end: DateTime<Utc>,
    },
    Ineligible(IneligibleReason),
}

impl Eligibility {
    pub const fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }

    /// The trimmed in-bed interval, if eligible.
    pub const fn recorded_interval(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match *self {
            Self::Eligible {
                recorded_start,
                recorded_end,
            } => Some((recorded_start, recorded_end)),
            Self::Ineligible(_) => None,
        }
    }
}

/// Evaluates `[start, end]` against `boundary`, with "local" defined by `tz`.
pub fn evaluate<Tz: TimeZone>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    boundary: NightBoundary,
    tz: &Tz,
) -> Eligibility {
    if end <= start {
        return Eligibility::Ineligible(IneligibleReason::EmptyInterval);
    }
    if end - start > MAX_SLEEP_DURATION {
        return Eligibility::Ineligible(IneligibleReason::TooLong);
    }

    let Some(boundary_today) = boundary_on_start_day(start, boundary, tz) else {
        return Eligibility::Ineligible(IneligibleReason::UnresolvedBoundary);
    };

    let crosses = |instant: DateTime<Utc>| start <= instant && instant < end;
    let candidate = if crosses(boundary_today) {
        boundary_today
    } else {
        let boundary_next_day = boundary_today + Duration::hours(24);
        if crosses(boundary_next_day) {
            boundary_next_day
        } else {
            return Eligibility::Ineligible(IneligibleReason::NoBoundaryCrossing);
        }
    };

    if candidate >= end {
        return Eligibility::Ineligible(IneligibleReason::DegenerateTrim);
    }

    Eligibility::Eligible {
        recorded_start: candidate,
        recorded_end: end,
    }
}

/// Local midnight of `start`'s calendar day plus the boundary offset.
fn boundary_on_start_day<Tz: TimeZone>(
    start: DateTime<Utc>,
    boundary: NightBoundary,
    tz: &Tz,
) -> Option<DateTime<Utc>> {
    let local_day = start.with_timezone(tz).date_naive();
    let midnight = tz
        .from_local_datetime(&local_day.and_hms_opt(0, 0, 0)?)
        .earliest()?;
    midnight
        .with_timezone(&Utc)
        .checked_add_signed(Duration::minutes(i64::from(
            boundary.minutes_after_midnight(),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset};

    /// A zone with one offset change, for DST transitions at local midnight.
    #[derive(Debug, Clone, Copy)]
    struct ShiftingZone {
        switch_utc: NaiveDateTime,
        before: FixedOffset,
        after: FixedOffset,
    }

    #[derive(Debug, Clone, Copy)]
    struct ShiftingOffset {
        zone: ShiftingZone,
        fixed: FixedOffset,
    }

    impl Offset for ShiftingOffset {
        fn fix(&self) -> FixedOffset {
            self.fixed
        }
    }

    impl ShiftingZone {
        fn new(switch_utc: &str, before_hours: i32, after_hours: i32) -> Self {
            Self {
                switch_utc: ts(switch_utc).naive_utc(),
                before: FixedOffset::east_opt(before_hours * 3600).unwrap(),
                after: FixedOffset::east_opt(after_hours * 3600).unwrap(),
            }
        }

        fn offset_at(self, utc: NaiveDateTime) -> ShiftingOffset {
            let fixed = if utc < self.switch_utc {
                self.before
            } else {
                self.after
            };
            ShiftingOffset { zone: self, fixed }
        }
    }

    impl TimeZone for ShiftingZone {
        type Offset = ShiftingOffset;

        fn from_offset(offset: &ShiftingOffset) -> Self {
            offset.zone
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<ShiftingOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<ShiftingOffset> {
            let valid: Vec<ShiftingOffset> = [self.before, self.after]
                .into_iter()
                .filter_map(|fixed| {
                    let utc = *local - Duration::seconds(i64::from(fixed.local_minus_utc()));
                    let found = self.offset_at(utc);
                    (found.fixed == fixed).then_some(found)
                })
                .collect();
            match valid.as_slice() {
                [] => LocalResult::None,
                [only] => LocalResult::Single(*only),
                [first, second, ..] => LocalResult::Ambiguous(*first, *second),
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> ShiftingOffset {
            self.offset_at(utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> ShiftingOffset {
            self.offset_at(*utc)
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn eval(start: &str, end: &str) -> Eligibility {
        evaluate(ts(start), ts(end), NightBoundary::default(), &Utc)
    }

    #[test]
    fn overnight_session_is_trimmed_to_boundary() {
        let verdict = eval("2024-01-01T23:00:00Z", "2024-01-02T02:30:00Z");
        assert_eq!(
            verdict,
            Eligibility::Eligible {
                recorded_start: ts("2024-01-02T01:00:00Z"),
                recorded_end: ts("2024-01-02T02:30:00Z"),
            }
        );
        let (start, end) = verdict.recorded_interval().unwrap();
        assert_eq!(end - start, Duration::minutes(90));
    }

    #[test]
    fn daytime_session_is_ineligible() {
        assert_eq!(
            eval("2024-01-01T08:00:00Z", "2024-01-01T09:00:00Z"),
            Eligibility::Ineligible(IneligibleReason::NoBoundaryCrossing)
        );
    }

    #[test]
    fn sessions_over_ten_hours_are_ineligible() {
        assert_eq!(
            eval("2024-01-01T00:00:00Z", "2024-01-01T11:00:00Z"),
            Eligibility::Ineligible(IneligibleReason::TooLong)
        );
        // Exactly ten hours is still allowed.
        assert!(eval("2024-01-01T00:00:00Z", "2024-01-01T10:00:00Z").is_eligible());
    }

    #[test]
    fn long_sessions_are_ineligible_for_any_boundary() {
        for minutes in [0, 60, 600, 1439] {
            let boundary = NightBoundary::new(minutes).unwrap();
            let verdict = evaluate(
                ts("2024-03-10T20:00:00Z"),
                ts("2024-03-11T06:00:01Z"),
                boundary,
                &Utc,
            );
            assert_eq!(verdict, Eligibility::Ineligible(IneligibleReason::TooLong));
        }
    }

    #[test]
    fn session_ending_at_boundary_is_ineligible() {
        assert_eq!(
            eval("2024-01-01T00:10:00Z", "2024-01-01T01:00:00Z"),
            Eligibility::Ineligible(IneligibleReason::NoBoundaryCrossing)
        );
    }

    #[test]
    fn session_starting_at_boundary_keeps_full_interval() {
        assert_eq!(
            eval("2024-01-01T01:00:00Z", "2024-01-01T07:00:00Z"),
            Eligibility::Eligible {
                recorded_start: ts("2024-01-01T01:00:00Z"),
                recorded_end: ts("2024-01-01T07:00:00Z"),
            }
        );
    }

    #[test]
    fn crossing_only_next_day_boundary_uses_it() {
        let verdict = evaluate(
            ts("2024-01-01T23:30:00Z"),
            ts("2024-01-02T02:00:00Z"),
            NightBoundary::new(30).unwrap(),
            &Utc,
        );
        assert_eq!(
            verdict,
            Eligibility::Eligible {
                recorded_start: ts("2024-01-02T00:30:00Z"),
                recorded_end: ts("2024-01-02T02:00:00Z"),
            }
        );
    }

    #[test]
    fn empty_interval_is_ineligible() {
        assert_eq!(
            eval("2024-01-01T02:00:00Z", "2024-01-01T02:00:00Z"),
            Eligibility::Ineligible(IneligibleReason::EmptyInterval)
        );
        assert_eq!(
            eval("2024-01-01T03:00:00Z", "2024-01-01T02:00:00Z"),
            Eligibility::Ineligible(IneligibleReason::EmptyInterval)
        );
    }

    #[test]
    fn boundary_uses_local_calendar_day() {
        // 23:00 local in UTC+2 is 21:00Z; the local day is Jan 1 so the
        // boundary is 2024-01-02T01:00+02:00 = 2024-01-01T23:00Z.
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let verdict = evaluate(
            ts("2024-01-01T21:00:00Z"),
            ts("2024-01-02T04:00:00Z"),
            NightBoundary::default(),
            &tz,
        );
        assert_eq!(
            verdict,
            Eligibility::Eligible {
                recorded_start: ts("2024-01-01T23:00:00Z"),
                recorded_end: ts("2024-01-02T04:00:00Z"),
            }
        );
    }

    #[test]
    fn skipped_local_midnight_is_unresolved() {
        // Clocks jump from 00:00 -05:00 to 01:00 -04:00 on 2024-03-10.
        let tz = ShiftingZone::new("2024-03-10T05:00:00Z", -5, -4);
        let verdict = evaluate(
            ts("2024-03-10T06:00:00Z"),
            ts("2024-03-10T09:00:00Z"),
            NightBoundary::default(),
            &tz,
        );
        assert_eq!(
            verdict,
            Eligibility::Ineligible(IneligibleReason::UnresolvedBoundary)
        );
    }

    #[test]
    fn repeated_local_midnight_uses_first_occurrence() {
        // 01:00 -04:00 falls back to 00:00 -05:00 on 2024-11-03, so local
        // midnight happens at 04:00Z and again at 05:00Z.
        let tz = ShiftingZone::new("2024-11-03T05:00:00Z", -4, -5);
        let verdict = evaluate(
            ts("2024-11-03T04:30:00Z"),
            ts("2024-11-03T08:00:00Z"),
            NightBoundary::default(),
            &tz,
        );
        assert_eq!(
            verdict,
            Eligibility::Eligible {
                recorded_start: ts("2024-11-03T05:00:00Z"),
                recorded_end: ts("2024-11-03T08:00:00Z"),
            }
        );
    }

    #[test]
    fn boundary_rejects_out_of_range_minutes() {
        assert!(NightBoundary::new(-1).is_err());
        assert!(NightBoundary::new(1440).is_err());
        assert_eq!(NightBoundary::new(1439).unwrap().to_string(), "23:59");
    }

    #[test]
    fn boundary_parses_clock_time() {
        let boundary: NightBoundary = "02:30".parse().unwrap();
        assert_eq!(boundary.minutes_after_midnight(), 150);
        assert_eq!((boundary.hour(), boundary.minute()), (2, 30));
        assert!("24:00".parse::<NightBoundary>().is_err());
        assert!("1:75".parse::<NightBoundary>().is_err());
        assert!("noon".parse::<NightBoundary>().is_err());
    }

    #[test]
    fn boundary_default_is_one_am() {
        assert_eq!(NightBoundary::default().to_string(), "01:00");
    }
}
