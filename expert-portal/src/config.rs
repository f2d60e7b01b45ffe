//! Client configuration.
//!
//! Values come from three layers, later ones winning:
//! 1. built-in defaults matching the portal backend's development setup
//! 2. an optional YAML file
//! 3. environment variables (`EXPERT_API_URL`, `EXPERT_API_TIMEOUT_MS`,
//!    `EXPERT_PORTAL_STORE`, `FEEDBACK_MAX_QUESTIONS`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PortalError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:3046/api";
pub const DEFAULT_MAX_QUESTIONS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    /// Root of the portal API, without a trailing slash
    pub api_url: String,
    /// Per-request timeout; `None` keeps the transport default
    pub request_timeout_ms: Option<u64>,
    /// Answers after which the questionnaire submits regardless of question type
    pub max_feedback_questions: usize,
    pub login_redirect_delay_ms: u64,
    pub signup_switch_delay_ms: u64,
    pub completion_redirect_delay_ms: u64,
    /// File backing the client-local session store
    pub store_path: PathBuf,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_ms: None,
            max_feedback_questions: DEFAULT_MAX_QUESTIONS,
            login_redirect_delay_ms: 1500,
            signup_switch_delay_ms: 1500,
            completion_redirect_delay_ms: 3000,
            store_path: PathBuf::from(".expert-portal/session.json"),
        }
    }
}

impl PortalConfig {
    /// Defaults, overlaid with an optional YAML file, overlaid with the process environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let base = match file {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            PortalError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)
            .map_err(|e| PortalError::Config(format!("invalid config file: {}", e)))?;
        config.validate()
    }

    /// Apply overrides from any key lookup. `load` passes the process environment.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("EXPERT_API_URL") {
            self.api_url = url;
        }
        if let Some(raw) = lookup("EXPERT_API_TIMEOUT_MS") {
            let ms = raw.parse::<u64>().map_err(|_| {
                PortalError::Config(format!("EXPERT_API_TIMEOUT_MS is not a number: {}", raw))
            })?;
            self.request_timeout_ms = Some(ms);
        }
        if let Some(path) = lookup("EXPERT_PORTAL_STORE") {
            self.store_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("FEEDBACK_MAX_QUESTIONS") {
            self.max_feedback_questions = raw.parse::<usize>().map_err(|_| {
                PortalError::Config(format!("FEEDBACK_MAX_QUESTIONS is not a number: {}", raw))
            })?;
        }
        self.validate()
    }

    fn validate(mut self) -> Result<Self> {
        if self.max_feedback_questions == 0 {
            return Err(PortalError::Config(
                "max_feedback_questions must be at least 1".to_string(),
            ));
        }
        let trimmed = self.api_url.trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(PortalError::Config("api_url must not be empty".to_string()));
        }
        self.api_url = trimmed.to_string();
        Ok(self)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn login_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.login_redirect_delay_ms)
    }

    pub fn signup_switch_delay(&self) -> Duration {
        Duration::from_millis(self.signup_switch_delay_ms)
    }

    pub fn completion_redirect_delay(&self) -> Duration {
        Duration::from_millis(self.completion_redirect_delay_ms)
    }
}
