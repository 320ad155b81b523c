//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use fsl_health::{ConfiguredSink, HealthError, JournalSink, WebhookSink};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file shared by every `fsl` process.
    pub database_path: PathBuf,
    /// Where in-bed samples go.
    #[serde(default)]
    pub health: HealthConfig,
}

/// Which health sink receives in-bed samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Journal,
    Webhook,
    Disabled,
}

impl SinkKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Journal => "journal",
            Self::Webhook => "webhook",
            Self::Disabled => "disabled",
        }
    }
}

/// Health sink settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub sink: SinkKind,
    /// Journal file for the `journal` sink.
    pub journal_path: PathBuf,
    /// Endpoint for the `webhook` sink.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Bearer token for the `webhook` sink.
    #[serde(default)]
    pub webhook_token: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("health", &self.health)
            .finish()
    }
}

impl fmt::Debug for HealthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthConfig")
            .field("sink", &self.sink)
            .field("journal_path", &self.journal_path)
            .field("webhook_url", &self.webhook_url)
            .field(
                "webhook_token",
                &self.webhook_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("fsl.db"),
            health: HealthConfig::default(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            sink: SinkKind::Journal,
            journal_path: data_dir.join("in-bed.jsonl"),
            webhook_url: None,
            webhook_token: None,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (FSL_*, nested with FSL_HEALTH__SINK)
        figment = figment.merge(Env::prefixed("FSL_").split("__"));

        figment.extract()
    }

    /// Builds the configured health sink.
    pub fn build_sink(&self) -> Result<ConfiguredSink, HealthError> {
        match self.health.sink {
            SinkKind::Journal => Ok(ConfiguredSink::Journal(JournalSink::new(
                self.health.journal_path.clone(),
            ))),
            SinkKind::Webhook => {
                let url = self
                    .health
                    .webhook_url
                    .as_deref()
                    .map(str::trim)
                    .filter(|url| !url.is_empty())
                    .ok_or_else(|| HealthError::InvalidConfig {
                        reason: "webhook sink needs health.webhook_url (or FSL_HEALTH__WEBHOOK_URL)"
                            .to_string(),
                    })?;
                let sink = WebhookSink::new(url, self.health.webhook_token.clone())?;
                Ok(ConfiguredSink::Webhook(sink))
            }
            SinkKind::Disabled => Ok(ConfiguredSink::Disabled),
        }
    }
}

/// Returns the platform-specific config directory for fsl.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("fsl"))
}

/// Returns the platform-specific data directory for fsl.
///
/// On Linux: `~/.local/share/fsl`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("fsl"))
}
