use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::{Result, SalesError};

pub const ENV_SERVICE_URL: &str = "SALES_SERVICE_URL";
pub const ENV_TIMEOUT_SECS: &str = "SALES_SERVICE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Root of the sales backend, e.g. `http://localhost:3000`.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by any of the `SALES_*` environment variables that are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_SERVICE_URL) {
            config.base_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            config.timeout_secs = secs.trim().parse().map_err(|e| {
                SalesError::Config(format!("{} must be a number of seconds: {}", ENV_TIMEOUT_SECS, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(SalesError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(SalesError::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `base_url` joined with `path`, tolerating a trailing slash on either side.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
