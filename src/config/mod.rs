//! Configuration (layered: code > env).

use std::fmt;

const DEFAULT_BASE_URL: &str = "https://api.casemate.app/v1";

/// Configuration for the assistant client.
///
/// Built explicitly and passed into [`AssistantClient`], never read ambiently
/// by the streaming core, so streams stay testable in isolation.
///
/// [`AssistantClient`]: crate::client::AssistantClient
#[derive(Clone, Default)]
pub struct CasemateConfig {
    api_key: Option<String>,
    base_url: Option<String>,
}

impl fmt::Debug for CasemateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CasemateConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CasemateConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables (`CASEMATE_API_KEY`,
    /// `CASEMATE_BASE_URL`), reading a `.env` file first if present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self {
            api_key: std::env::var("CASEMATE_API_KEY").ok(),
            base_url: std::env::var("CASEMATE_BASE_URL").ok(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Base URL of the assistant service, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    /// Check if an API key is configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }
}
