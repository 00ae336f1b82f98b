//! Process-wide settings
//!
//! Settings are hydrated once at startup: an optional `.env` file is loaded
//! with `dotenvy` (existing environment variables win), then the relevant
//! variables are captured into an immutable [`Settings`] snapshot. Everything
//! else reads through the typed accessors instead of calling `std::env`.
//!
//! Hydration runs before the subscriber is installed, so anything worth
//! logging about it is recorded on the snapshot and emitted later by
//! [`Settings::report`].

use crate::credential::{ConfigError, Credential};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

/// Variable holding the log filter directives
pub const LOG_FILTER_VAR: &str = "RUST_LOG";
/// Variable selecting the log output format (`text` or `json`)
pub const LOG_FORMAT_VAR: &str = "AGENT_LOG_FORMAT";
/// Variable overriding the Gemini API endpoint
pub const GEMINI_API_BASE_VAR: &str = "GEMINI_API_BASE";
/// Variable overriding the HTTP timeout for model requests, in seconds
pub const REQUEST_TIMEOUT_VAR: &str = "AGENT_REQUEST_TIMEOUT_SECS";

const DEFAULT_LOG_FILTER: &str = "warn,finance_report=info,agent_finance=info,agent_runtime=info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

static SETTINGS: OnceLock<Settings> = OnceLock::new();

/// Output format for log records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per record
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::InvalidValue {
                name: LOG_FORMAT_VAR.to_string(),
                reason: format!("expected 'text' or 'json', got '{other}'"),
            }),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives
    pub filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::Text,
        }
    }
}

/// What happened when looking for a `.env` file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DotenvStatus {
    /// Settings were not hydrated from the process environment
    #[default]
    Skipped,
    /// No `.env` file was found
    NotFound,
    /// Variables were loaded from this file
    Loaded(PathBuf),
    /// A `.env` file exists but could not be read or parsed
    Failed(String),
}

/// A setting that was present but ignored in favor of its default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredSetting {
    pub name: &'static str,
    pub reason: String,
}

/// Immutable snapshot of the process configuration
#[derive(Debug, Clone, Default)]
pub struct Settings {
    vars: HashMap<String, String>,
    log: LogSettings,
    gemini_api_base: Option<String>,
    request_timeout: Option<Duration>,
    dotenv: DotenvStatus,
    ignored: Vec<IgnoredSetting>,
}

impl Settings {
    /// Build settings from explicit key/value pairs
    ///
    /// Invalid optional values fall back to their defaults and are recorded
    /// in [`Settings::ignored`]; a typo in a tuning knob never blocks startup.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let mut ignored = Vec::new();
        let mut log = LogSettings::default();
        if let Some(filter) = non_empty(&vars, LOG_FILTER_VAR) {
            log.filter = filter.to_string();
        }
        if let Some(format) = non_empty(&vars, LOG_FORMAT_VAR) {
            match format.parse() {
                Ok(format) => log.format = format,
                Err(e) => ignored.push(IgnoredSetting {
                    name: LOG_FORMAT_VAR,
                    reason: e.to_string(),
                }),
            }
        }

        let gemini_api_base =
            non_empty(&vars, GEMINI_API_BASE_VAR).map(|s| s.trim_end_matches('/').to_string());

        let request_timeout = non_empty(&vars, REQUEST_TIMEOUT_VAR).and_then(|raw| {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    ignored.push(IgnoredSetting {
                        name: REQUEST_TIMEOUT_VAR,
                        reason: format!("expected a positive number of seconds, got '{raw}'"),
                    });
                    None
                }
            }
        });

        Self {
            vars,
            log,
            gemini_api_base,
            request_timeout,
            dotenv: DotenvStatus::Skipped,
            ignored,
        }
    }

    /// Capture settings from the current process environment
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped; none of
    /// the settings read here can hold such values.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Load `.env` (if present) and capture the environment
    pub fn hydrate() -> Self {
        let dotenv = match dotenvy::dotenv() {
            Ok(path) => DotenvStatus::Loaded(path),
            Err(e) if e.not_found() => DotenvStatus::NotFound,
            Err(e) => DotenvStatus::Failed(e.to_string()),
        };
        Self {
            dotenv,
            ..Self::from_env()
        }
    }

    /// Log what hydration found; call once tracing is initialized
    pub fn report(&self) {
        match &self.dotenv {
            DotenvStatus::Loaded(path) => {
                tracing::debug!(path = %path.display(), "Loaded .env file");
            }
            DotenvStatus::Failed(error) => tracing::warn!(%error, "Failed to load .env file"),
            DotenvStatus::NotFound | DotenvStatus::Skipped => {}
        }
        for setting in &self.ignored {
            tracing::warn!(name = setting.name, reason = %setting.reason, "Ignoring setting");
        }
    }

    /// Outcome of the `.env` lookup
    pub fn dotenv(&self) -> &DotenvStatus {
        &self.dotenv
    }

    /// Settings that fell back to their defaults
    pub fn ignored(&self) -> &[IgnoredSetting] {
        &self.ignored
    }

    /// Look up a required credential
    pub fn credential(&self, name: &str) -> Result<Credential, ConfigError> {
        let value = self
            .vars
            .get(name)
            .ok_or_else(|| ConfigError::MissingCredential {
                name: name.to_string(),
            })?;
        Credential::new(name, value.clone())
    }

    /// Logging configuration
    pub fn log(&self) -> &LogSettings {
        &self.log
    }

    /// Gemini endpoint override, without a trailing slash
    pub fn gemini_api_base(&self) -> Option<&str> {
        self.gemini_api_base.as_deref()
    }

    /// Model request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }
}

/// Process-wide settings, hydrated on first access
pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(Settings::hydrate)
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}
