//! Client configuration.
//!
//! `ClientConfig` is plain data with sensible defaults; `from_env` overlays
//! the `MEDREC_*` environment variables on top of those defaults.

use std::time::Duration;

use crate::error::ApiError;

pub const ENV_API_URL: &str = "MEDREC_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "MEDREC_API_TIMEOUT_SECS";
pub const ENV_SIGN_IN_PATH: &str = "MEDREC_SIGN_IN_PATH";
pub const ENV_REFRESH_ON_UNAUTHORIZED: &str = "MEDREC_REFRESH_ON_UNAUTHORIZED";

const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_SIGN_IN_PATH: &str = "/login";

/// What the inbound hook does with a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnauthorizedPolicy {
    /// Clear the session and signal invalidation on the first 401.
    #[default]
    HardLogout,
    /// Call `POST /auth/refresh` once and re-send the request once with the
    /// new token. Falls back to `HardLogout` if either step fails.
    RefreshThenRetry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend root every request path is joined to.
    pub base_url: String,
    /// Client-wide timeout; there is no per-request override.
    pub timeout: Duration,
    /// Location carried by `SessionEvent::Invalidated`.
    pub sign_in_path: String,
    pub unauthorized_policy: UnauthorizedPolicy,
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            unauthorized_policy: UnauthorizedPolicy::default(),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Defaults overlaid with the `MEDREC_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiError> {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config = config.with_base_url(&url);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ApiError::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds, got {raw:?}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(path) = lookup(ENV_SIGN_IN_PATH) {
            config.sign_in_path = path;
        }
        if let Some(raw) = lookup(ENV_REFRESH_ON_UNAUTHORIZED) {
            config.unauthorized_policy = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => UnauthorizedPolicy::RefreshThenRetry,
                "0" | "false" | "no" => UnauthorizedPolicy::HardLogout,
                _ => {
                    return Err(ApiError::Config(format!(
                        "{ENV_REFRESH_ON_UNAUTHORIZED} must be true or false, got {raw:?}"
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_sign_in_path(mut self, path: &str) -> Self {
        self.sign_in_path = path.to_string();
        self
    }

    pub fn with_unauthorized_policy(mut self, policy: UnauthorizedPolicy) -> Self {
        self.unauthorized_policy = policy;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    /// # Errors
    ///
    /// Returns `ApiError::Config` if the base URL is not http(s) or the
    /// timeout is zero.
    pub fn validate(&self) -> Result<(), ApiError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "base url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(ApiError::Config("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}
