//! HTTP webhook sink.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;

use crate::{Authorization, HealthError, HealthSink, InBedSample};

/// Default request timeout for sink calls.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Posts in-bed samples as JSON to an HTTP endpoint.
///
/// # Thread Safety
///
/// The sink is safe to share across threads; the underlying HTTP client
/// keeps a connection pool.
pub struct WebhookSink {
    http: reqwest::Client,
    url: Url,
    token: Option<String>,
}

impl fmt::Debug for WebhookSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSink")
            .field("url", &self.url.as_str())
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl WebhookSink {
    /// Creates a sink for `url`, optionally authenticating with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s), if the token is blank, or
    /// if the HTTP client fails to build.
    pub fn new(url: &str, token: Option<String>) -> Result<Self, HealthError> {
        let url = Url::parse(url).map_err(|err| HealthError::InvalidConfig {
            reason: format!("invalid webhook URL {url:?}: {err}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(HealthError::InvalidConfig {
                reason: format!("webhook URL must be http or https, got {}", url.scheme()),
            });
        }
        if token.as_deref().is_some_and(|token| token.trim().is_empty()) {
            return Err(HealthError::InvalidConfig {
                reason: "webhook token cannot be blank".to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(HealthError::ClientBuild)?;

        Ok(Self { http, url, token })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl HealthSink for WebhookSink {
    async fn request_authorization(&self) -> Result<Authorization, HealthError> {
        let response = self.authorize(self.http.get(self.url.clone())).send().await?;
        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(Authorization::Denied);
        }
        // Endpoints that only accept POST still prove we can reach them.
        if status.is_success() || status == StatusCode::METHOD_NOT_ALLOWED {
            return Ok(Authorization::Granted);
        }
        let body = response.text().await?;
        Err(rejection(status, &body))
    }

    async fn save_in_bed_session(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), HealthError> {
        let sample = InBedSample::new(start, end)?;
        let response = self
            .authorize(self.http.post(self.url.clone()))
            .json(&sample)
            .send()
            .await?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(HealthError::NotAuthorized);
        }
        if !status.is_success() {
            let body = response.text().await?;
            return Err(rejection(status, &body));
        }
        tracing::debug!(url = %self.url, %start, %end, "posted in-bed sample");
        Ok(())
    }
}

fn rejection(status: StatusCode, body: &str) -> HealthError {
    parse_error_message(body).map_or_else(
        || HealthError::Rejected {
            status: status.as_u16(),
            message: format!("status {status}: {}", body.trim()),
        },
        |message| HealthError::Rejected {
            status: status.as_u16(),
            message,
        },
    )
}

fn parse_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.error.message)
}
