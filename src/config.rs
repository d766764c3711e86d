//! Client configuration.

use std::env;
use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{Result, TfeError};
use crate::retry::{
    RetryLogHook, RetryPolicy, DEFAULT_RETRY_MAX, DEFAULT_RETRY_WAIT_MAX, DEFAULT_RETRY_WAIT_MIN,
};

/// Default address of the API.
pub const DEFAULT_ADDRESS: &str = "https://app.terraform.io";

/// Default path of the API below the address.
pub const DEFAULT_BASE_PATH: &str = "/api/v2/";

/// Default path of the module registry API below the address.
pub const DEFAULT_REGISTRY_BASE_PATH: &str = "/api/registry/";

/// Everything needed to build a [`crate::TfeClient`].
///
/// # Example
///
/// ```no_run
/// use tfeapi::{Config, TfeClient};
///
/// # fn example() -> tfeapi::Result<()> {
/// let config = Config {
///     token: "my-token".to_string(),
///     retry_server_errors: true,
///     ..Default::default()
/// };
/// let client = TfeClient::new(config)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Config {
    /// Scheme and host of the API, e.g. `https://app.terraform.io`.
    pub address: String,
    /// Path of the JSON:API endpoints below the address.
    pub base_path: String,
    /// Path of the module registry endpoints below the address.
    pub registry_base_path: String,
    /// API token sent as a bearer token on every request.
    pub token: String,
    /// Headers added to every request. Per-request headers take precedence.
    pub headers: HeaderMap,
    /// Pre-built HTTP client; one is created when `None`.
    pub http_client: Option<reqwest::Client>,
    /// Retry 5xx responses and transport errors, not just 429s.
    pub retry_server_errors: bool,
    /// Observer called before every retry.
    pub retry_log_hook: Option<RetryLogHook>,
    /// Lower bound of the backoff window.
    pub retry_wait_min: Duration,
    /// Upper bound of the backoff window.
    pub retry_wait_max: Duration,
    /// Maximum number of retries after the first attempt.
    pub retry_max: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            registry_base_path: DEFAULT_REGISTRY_BASE_PATH.to_string(),
            token: String::new(),
            headers: HeaderMap::new(),
            http_client: None,
            retry_server_errors: false,
            retry_log_hook: None,
            retry_wait_min: DEFAULT_RETRY_WAIT_MIN,
            retry_wait_max: DEFAULT_RETRY_WAIT_MAX,
            retry_max: DEFAULT_RETRY_MAX,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("address", &self.address)
            .field("base_path", &self.base_path)
            .field("registry_base_path", &self.registry_base_path)
            .field("retry_server_errors", &self.retry_server_errors)
            .field("retry_max", &self.retry_max)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Build a configuration from environment variables.
    ///
    /// Uses `TFE_TOKEN` for authentication, and optionally `TFE_ADDRESS` and
    /// `TFE_BASE_PATH` to override the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `TFE_TOKEN` is not set.
    pub fn from_env() -> Result<Self> {
        let token = env::var("TFE_TOKEN").map_err(|_| {
            TfeError::ConfigMissing("TFE_TOKEN environment variable not set".to_string())
        })?;

        let mut config = Self {
            token,
            ..Default::default()
        };

        if let Ok(address) = env::var("TFE_ADDRESS") {
            if !address.is_empty() {
                config.address = address;
            }
        }
        if let Ok(base_path) = env::var("TFE_BASE_PATH") {
            if !base_path.is_empty() {
                config.base_path = base_path;
            }
        }

        Ok(config)
    }

    /// Add a default header sent with every request.
    pub fn header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TfeError::InvalidHeader(format!("{name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TfeError::InvalidHeader(format!("{name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_server_errors: self.retry_server_errors,
            wait_min: self.retry_wait_min,
            wait_max: self.retry_wait_max,
            max_retries: self.retry_max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.address, "https://app.terraform.io");
        assert_eq!(config.base_path, "/api/v2/");
        assert_eq!(config.registry_base_path, "/api/registry/");
        assert!(!config.retry_server_errors);
        assert_eq!(config.retry_max, 30);
    }

    #[test]
    fn test_debug_hides_token() {
        let config = Config {
            token: "super-secret".to_string(),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("address"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_header_validation() {
        let config = Config::default().header("X-Custom", "yes").unwrap();
        assert_eq!(config.headers.get("x-custom").unwrap(), "yes");

        let err = Config::default().header("bad header", "v").unwrap_err();
        assert!(matches!(err, TfeError::InvalidHeader(_)));
    }
}
