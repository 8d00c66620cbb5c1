//! Connection settings for the budget service.

use std::fmt;

use crate::error::{Error, Result};

/// Where the service lives and how to authenticate.
///
/// `host` is the full base URL; endpoint paths are appended to it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    host: String,
    api_key: String,
}

impl ClientConfig {
    /// Validate and build a configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` if the host is not an http(s) URL or
    /// the API key is empty.
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let host = host.into().trim().trim_end_matches('/').to_string();
        let api_key = api_key.into().trim().to_string();

        if host.is_empty() {
            return Err(Error::InvalidConfig("host must not be empty".to_string()));
        }
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "host must be an http:// or https:// base URL, got '{}'",
                host
            )));
        }
        if api_key.is_empty() {
            return Err(Error::InvalidConfig("API key must not be empty".to_string()));
        }

        Ok(Self { host, api_key })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Credential sent as a bearer token.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Value of the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.api_key())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
