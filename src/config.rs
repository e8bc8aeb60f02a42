//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.json` in the user's
//! config directory, then `GOOGLE_API_KEY`, then `STUDY_CHAT_*` variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::LinearBackoff;

/// Character budget for document text embedded in a prompt.
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 800_000;
/// Models tried when the model list cannot be fetched.
pub const DEFAULT_FALLBACK_MODELS: [&str; 2] = ["gemini-1.5-flash", "gemini-pro"];

const CONFIG_DIR_NAME: &str = "study-chat";
const CONFIG_FILE_NAME: &str = "config.json";
const ENV_PREFIX: &str = "STUDY_CHAT_";

/// Errors raised while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No credential was supplied by any source.
    #[error(
        "API key not found. Set GOOGLE_API_KEY in your environment or .env file, \
         or google_api_key in the config file"
    )]
    MissingApiKey,
    /// A value is present but unusable.
    #[error("Invalid configuration value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
    /// The layered sources could not be merged or deserialised.
    #[error("Failed to read configuration: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Runtime settings, constructed once at startup and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Credential for the Gemini API
    pub google_api_key: String,
    /// Folder holding the uploaded PDFs
    pub docs_dir: PathBuf,
    /// Folder holding saved chat sessions
    pub history_dir: PathBuf,
    /// Folder where exported answers are written
    pub export_dir: PathBuf,
    /// Maximum characters of document text sent to the model
    pub max_context_chars: usize,
    /// Passes over the model list before giving up
    pub max_attempts: usize,
    /// Linear backoff step after a quota rejection, in seconds
    pub backoff_step_secs: u64,
    /// Models appended to the discovered list and used when discovery fails
    pub fallback_models: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_api_key: String::new(),
            docs_dir: PathBuf::from("documentos"),
            history_dir: PathBuf::from("historial_sesiones"),
            export_dir: PathBuf::from("."),
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
            max_attempts: 3,
            backoff_step_secs: 5,
            fallback_models: DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl AppConfig {
    /// Loads `.env`, then merges every configuration source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] when no credential is found.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_figment(Self::figment(Self::default_path().as_deref()))
    }

    /// Location of the optional JSON config file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Builds the layered provider chain. A missing file is skipped.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = config_file {
            figment = figment.merge(Json::file(path));
        }
        figment
            .merge(Env::raw().only(&["google_api_key"]))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extracts and validates a configuration.
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.google_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_attempts",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// The backoff policy described by this configuration.
    pub fn backoff(&self) -> LinearBackoff {
        LinearBackoff::new(Duration::from_secs(self.backoff_step_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = AppConfig::from_figment(defaults()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn json_overrides_defaults() {
        let figment = defaults().merge(Json::string(
            r#"{ "google_api_key": "k", "max_attempts": 5, "docs_dir": "pdfs" }"#,
        ));
        let config = AppConfig::from_figment(figment).unwrap();
        assert_eq!(config.google_api_key, "k");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.docs_dir, PathBuf::from("pdfs"));
        assert_eq!(config.max_context_chars, DEFAULT_MAX_CONTEXT_CHARS);
        assert_eq!(config.fallback_models, vec!["gemini-1.5-flash", "gemini-pro"]);
    }

    #[test]
    fn zero_attempts_is_invalid() {
        let figment =
            defaults().merge(Json::string(r#"{ "google_api_key": "k", "max_attempts": 0 }"#));
        let err = AppConfig::from_figment(figment).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "max_attempts",
                ..
            }
        ));
    }

    #[test]
    fn backoff_uses_configured_step() {
        let config = AppConfig {
            backoff_step_secs: 2,
            ..AppConfig::default()
        };
        assert_eq!(config.backoff().step(), Duration::from_secs(2));
    }
}
