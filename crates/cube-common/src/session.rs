//! HTTP session settings shared by the catalog client and the raster reader.
//!
//! Earthdata credentials and transport options live here and are handed to
//! each client constructor, so no process-wide HTTP state is touched.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Environment variable holding an Earthdata Login bearer token.
pub const EARTHDATA_TOKEN_ENV: &str = "EARTHDATA_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Earthdata Login token sent as `Authorization: Bearer ...`.
    pub bearer_token: Option<String>,

    pub user_agent: String,

    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,

    pub connect_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            user_agent: format!("hls-cube/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 600,
            connect_timeout_secs: 30,
        }
    }
}

impl SessionConfig {
    /// Defaults plus the Earthdata token from the environment, if set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(token) = std::env::var(EARTHDATA_TOKEN_ENV) {
            if !token.trim().is_empty() {
                config.bearer_token = Some(token.trim().to_string());
            }
        }
        config
    }

    /// Build a reqwest client carrying these settings.
    pub fn build_client(&self) -> CommonResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| CommonError::Http(format!("invalid bearer token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| CommonError::Http(e.to_string()))
    }
}
