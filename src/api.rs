//! Authenticated JSON client for the site's auxiliary API.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::{Error, Result};

/// A `reqwest` client carrying the bearer token and JSON headers, rooted at
/// [`ApiConfig::base_url`].
#[derive(Debug, Clone)]
pub struct ApiContext {
    client: reqwest::Client,
    base: String,
}

impl ApiContext {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        if config.href.trim().is_empty() {
            return Err(Error::ConfigMissing("HREF".into()));
        }
        let bearer = config
            .bearer_header()
            .ok_or_else(|| Error::ConfigMissing("AUTH_TOKEN".into()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&bearer)
            .map_err(|e| Error::Config(format!("AUTH_TOKEN: {}", e)))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self {
            client,
            base: config.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// `path` resolved against the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET `path` and decode the JSON body. Non-2xx statuses are errors.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        debug!("GET {}", url);
        let resp = self.client.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}
