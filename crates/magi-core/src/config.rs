//! Advisor Configuration
//!
//! Credential and model selection are passed around as an explicit value so
//! tests can build one directly instead of touching the environment.

use serde::{Deserialize, Serialize};

use crate::error::{AdvisorError, Result};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TEMPERATURE: f32 = 0.8;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the persona-extraction provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// API credential (absent by default)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model override (absent means [`DEFAULT_MODEL`])
    pub model: Option<String>,

    /// Chat-completions base URL
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            base_url: DEFAULT_BASE_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl AdvisorConfig {
    /// Build with an explicit credential
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Read from environment variables.
    ///
    /// `OPENAI_API_KEY` wins over `VITE_OPENAI_API_KEY`; both may be absent.
    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENAI_API_KEY")
            .or_else(|_| std::env::var("VITE_OPENAI_API_KEY"))
            .ok();
        let model = std::env::var("OPENAI_MODEL")
            .or_else(|_| std::env::var("VITE_OPENAI_MODEL"))
            .ok();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_key,
            model,
            base_url,
            timeout_secs,
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Whether a non-blank credential is present
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// The credential, or a `Config` error when missing or blank
    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(AdvisorError::Config(
                "no API key set; export OPENAI_API_KEY (or VITE_OPENAI_API_KEY) and restart".into(),
            )),
        }
    }

    /// Resolved model name
    pub fn model_name(&self) -> Result<&str> {
        match self.model.as_deref() {
            None => Ok(DEFAULT_MODEL),
            Some(m) if m.trim().is_empty() => {
                Err(AdvisorError::Config("model override is blank".into()))
            }
            Some(m) => Ok(m.trim()),
        }
    }

    /// Validate everything needed before the first network call
    pub fn validate(&self) -> Result<()> {
        self.require_api_key()?;
        self.model_name()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::default();
        assert!(!config.has_api_key());
        assert_eq!(config.model_name().unwrap(), DEFAULT_MODEL);
        assert!((config.temperature - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_blank_key_is_config_error() {
        let config = AdvisorConfig::with_api_key("   ");
        assert!(matches!(config.validate(), Err(AdvisorError::Config(_))));
    }

    #[test]
    fn test_model_override() {
        let config = AdvisorConfig::with_api_key("sk-test").model("gpt-4o");
        assert_eq!(config.model_name().unwrap(), "gpt-4o");
        assert!(config.validate().is_ok());

        let blank = AdvisorConfig::with_api_key("sk-test").model("");
        assert!(matches!(blank.validate(), Err(AdvisorError::Config(_))));
    }
}
