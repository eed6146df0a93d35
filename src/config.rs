//! Runtime configuration for the upload queue.
//!
//! Read from the environment (after `.env` has been loaded by the binary).
//! API base URL: ELECMATE_API_URL > VITE_API_URL > localhost default.

use std::path::PathBuf;

use thiserror::Error;

use crate::queue::{default_queue_dir, DEFAULT_MAX_RETRIES};

/// Default backend URL for local development.
pub const DEFAULT_API_URL: &str = "http://localhost:54321";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("No queue directory configured and no platform data directory available")]
    NoQueueDir,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Backend base URL, without a trailing slash.
    pub api_base_url: String,
    /// Bearer token for upload requests.
    pub api_token: Option<String>,
    /// Directory the file-backed queue store lives in.
    pub queue_dir: PathBuf,
    /// Soft rejections allowed before an entry is dropped.
    pub max_retries: u32,
}

impl QueueConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_base_url = non_empty("ELECMATE_API_URL")
            .or_else(|| non_empty("VITE_API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let api_token = non_empty("ELECMATE_API_TOKEN");

        let queue_dir = match non_empty("ELECMATE_QUEUE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_queue_dir().ok_or(ConfigError::NoQueueDir)?,
        };

        let max_retries = match non_empty("ELECMATE_MAX_RETRIES") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "ELECMATE_MAX_RETRIES",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_MAX_RETRIES,
        };

        Ok(Self {
            api_base_url,
            api_token,
            queue_dir,
            max_retries,
        })
    }
}
