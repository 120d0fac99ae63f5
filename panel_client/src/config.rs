use std::time::Duration;

use smm_common::Secret;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection details for one upstream panel. Built per provider from stored credentials.
#[derive(Debug, Clone, Default)]
pub struct PanelConfig {
    pub api_url: String,
    pub api_key: Secret<String>,
    pub timeout: Duration,
}

impl PanelConfig {
    pub fn new<S: Into<String>>(api_url: S, api_key: Secret<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { api_url, api_key, timeout: DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
