//! Remote board API configuration parsed from environment variables.

pub const DEFAULT_API_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl crate::error::ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "E_CONFIG_MISSING",
            Self::InvalidBaseUrl(_) => "E_CONFIG_BASE_URL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiTimeouts {
    /// Whole-request timeout. `None` lets a slow call run to completion.
    pub request_secs: Option<u64>,
    pub connect_secs: u64,
}

impl Default for ApiTimeouts {
    fn default() -> Self {
        Self { request_secs: None, connect_secs: DEFAULT_API_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL without a trailing slash, e.g. `https://api.example.org`.
    pub base_url: String,
    /// Bearer token for authenticated calls.
    pub token: Option<String>,
    pub timeouts: ApiTimeouts,
}

impl ApiConfig {
    /// Build typed API config from environment variables.
    ///
    /// Required:
    /// - `BOARD_API_URL`
    ///
    /// Optional:
    /// - `BOARD_API_TOKEN`
    /// - `BOARD_API_REQUEST_TIMEOUT_SECS`: unset means no request timeout
    /// - `BOARD_API_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is missing or not http(s).
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("BOARD_API_URL").map_err(|_| ConfigError::Missing { var: "BOARD_API_URL" })?;
        let token = std::env::var("BOARD_API_TOKEN").ok().filter(|t| !t.is_empty());
        let timeouts = ApiTimeouts {
            request_secs: std::env::var("BOARD_API_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok()),
            connect_secs: env_parse("BOARD_API_CONNECT_TIMEOUT_SECS", DEFAULT_API_CONNECT_TIMEOUT_SECS),
        };
        Self::new(&base_url, token, timeouts)
    }

    /// # Errors
    ///
    /// Returns an error if `base_url` is not http(s).
    pub fn new(base_url: &str, token: Option<String>, timeouts: ApiTimeouts) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self { base_url, token, timeouts })
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
