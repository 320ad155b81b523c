//! Health sink integrations for focus sleep.
//!
//! A sink receives trimmed in-bed samples. Two operations matter:
//! - `request_authorization`: idempotent, safe to call repeatedly
//! - `save_in_bed_session`: may be slow and may fail
//!
//! Sinks provided here:
//! - [`JournalSink`]: appends JSON lines to a local file
//! - [`WebhookSink`]: posts samples to an HTTP endpoint

mod journal;
mod webhook;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use journal::JournalSink;
pub use webhook::WebhookSink;

/// Health sink errors.
#[derive(Debug, Error)]
pub enum HealthError {
    /// The sample interval was empty or inverted.
    #[error("in-bed sample must end after it starts ({start} .. {end})")]
    InvalidSample {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// The sink refused access.
    #[error("health sink denied authorization")]
    NotAuthorized,
    /// The sink is not configured correctly.
    #[error("invalid sink configuration: {reason}")]
    InvalidConfig { reason: String },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The endpoint answered with an error.
    #[error("sink rejected sample: {message}")]
    Rejected { status: u16, message: String },
    /// Local file access failed.
    #[error("journal write failed: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to serialize the sample.
    #[error("failed to encode sample: {0}")]
    Encode(#[from] serde_json::Error),
    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcome of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Authorization {
    Granted,
    Denied,
}

/// A sleep-analysis sample of category "in bed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InBedSample {
    pub category: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source: String,
}

impl InBedSample {
    pub const CATEGORY: &'static str = "in_bed";
    pub const SOURCE: &'static str = "fsl";

    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, HealthError> {
        if end <= start {
            return Err(HealthError::InvalidSample { start, end });
        }
        Ok(Self {
            category: Self::CATEGORY.to_string(),
            start,
            end,
            source: Self::SOURCE.to_string(),
        })
    }
}

/// Destination for in-bed samples.
pub trait HealthSink {
    fn request_authorization(
        &self,
    ) -> impl Future<Output = Result<Authorization, HealthError>> + Send;

    fn save_in_bed_session(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), HealthError>> + Send;
}

/// The sink selected by configuration.
#[derive(Debug)]
pub enum ConfiguredSink {
    Journal(JournalSink),
    Webhook(WebhookSink),
    /// Nothing is exported; authorization is always denied.
    Disabled,
}

impl ConfiguredSink {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Journal(_) => "journal",
            Self::Webhook(_) => "webhook",
            Self::Disabled => "disabled",
        }
    }
}

impl HealthSink for ConfiguredSink {
    async fn request_authorization(&self) -> Result<Authorization, HealthError> {
        match self {
            Self::Journal(sink) => sink.request_authorization().await,
            Self::Webhook(sink) => sink.request_authorization().await,
            Self::Disabled => Ok(Authorization::Denied),
        }
    }

    async fn save_in_bed_session(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), HealthError> {
        match self {
            Self::Journal(sink) => sink.save_in_bed_session(start, end).await,
            Self::Webhook(sink) => sink.save_in_bed_session(start, end).await,
            Self::Disabled => Err(HealthError::NotAuthorized),
        }
    }
}
