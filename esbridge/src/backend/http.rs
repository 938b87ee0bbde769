//! HTTP search backend

use super::{BackendResult, Credentials, SearchBackend};
use crate::config::{BackendConfig, ConfigError};
use crate::error::BackendError;
use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

/// Upper bound on how much of an error body is kept in [`BackendError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Build the shared outbound client with the configured timeouts
pub fn build_client(config: &BackendConfig) -> Result<Client, ConfigError> {
    Client::builder()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .build()
        .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))
}

/// Search backend reached over HTTP with Basic-Auth
pub struct HttpBackend {
    client: Client,
    search_url: Url,
    options: String,
    credentials: Credentials,
}

impl HttpBackend {
    pub fn new(client: Client, config: &BackendConfig) -> Result<Self, ConfigError> {
        let raw = format!(
            "{}{}",
            config.url.trim_end_matches('/'),
            config.search_path
        );
        let search_url = Url::parse(&raw)
            .map_err(|e| ConfigError::Invalid(format!("invalid search url {}: {}", raw, e)))?;

        Ok(Self {
            client,
            search_url,
            options: config.options.clone(),
            credentials: Credentials::from_config(config),
        })
    }

    pub fn search_url(&self) -> &Url {
        &self.search_url
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, term: &str) -> Result<BackendResult, BackendError> {
        debug!(url = %self.search_url, term = %term, "querying backend");

        let request = self.client.get(self.search_url.clone()).query(&[
            ("format", "json"),
            ("options", self.options.as_str()),
            ("q", term),
        ]);

        let response = self.credentials.apply(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let result: BackendResult = serde_json::from_slice(&bytes)
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        debug!(
            total = result.total,
            returned = result.results.len(),
            facets = result.facets.len(),
            "backend search complete"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "http"
    }
}
