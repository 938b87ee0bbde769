//! Forwarding of unmatched routes to the backend
//!
//! Everything that is not the translated `_msearch` route is relayed as-is to
//! the passthrough target, with the backend credentials injected.

use crate::backend::Credentials;
use crate::config::{ConfigError, PassthroughConfig};
use crate::error::{BackendError, BridgeError};
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::Response;
use reqwest::{Client, Url};
use tracing::debug;

/// Headers that describe a single connection and must not be relayed
static HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::CONTENT_LENGTH,
];

pub struct Passthrough {
    client: Client,
    target: String,
    credentials: Credentials,
}

impl Passthrough {
    pub fn new(
        client: Client,
        config: &PassthroughConfig,
        credentials: Credentials,
    ) -> Result<Self, ConfigError> {
        Url::parse(&config.url).map_err(|e| {
            ConfigError::Invalid(format!("invalid passthrough url {}: {}", config.url, e))
        })?;
        Ok(Self {
            client,
            target: config.url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Build the upstream URL for an inbound path and query
    pub fn target_url(&self, path_and_query: &str) -> Result<Url, BridgeError> {
        Url::parse(&format!("{}{}", self.target, path_and_query))
            .map_err(|e| BridgeError::Internal(format!("cannot build upstream url for {}: {}", path_and_query, e)))
    }

    /// Relay `request` upstream and return the upstream response unchanged
    pub async fn forward(&self, request: Request, max_body_size: usize) -> Result<Response, BridgeError> {
        let (parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = self.target_url(path_and_query)?;

        let body = axum::body::to_bytes(body, max_body_size)
            .await
            .map_err(|e| BridgeError::InvalidRequestBody(e.to_string()))?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);
        headers.remove(header::AUTHORIZATION);

        debug!(method = %parts.method, url = %url, "forwarding request");

        let outbound = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body);
        let upstream = self
            .credentials
            .apply(outbound)
            .send()
            .await
            .map_err(BackendError::from)?;

        let status = upstream.status();
        let mut response_headers = upstream.headers().clone();
        strip_hop_by_hop(&mut response_headers);
        let bytes = upstream.bytes().await.map_err(BackendError::from)?;

        metrics::counter!(
            "esbridge_passthrough_requests_total",
            "status" => status.as_u16().to_string(),
        )
        .increment(1);

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}
