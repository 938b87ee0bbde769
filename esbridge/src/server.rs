use crate::config::{Config, ConfigError, CorsConfig};
use crate::router::bridge_router;
use crate::state::BridgeState;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub struct BridgeServer {
    state: BridgeState,
    cors_config: CorsConfig,
}

impl BridgeServer {
    pub fn new(state: BridgeState) -> Self {
        Self::with_cors(state, CorsConfig::default())
    }

    pub fn with_cors(state: BridgeState, cors_config: CorsConfig) -> Self {
        Self { state, cors_config }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let state = BridgeState::from_config(config)?;
        Ok(Self::with_cors(state, config.server.cors.clone()))
    }

    /// Build CORS layer from configuration
    fn build_cors_layer(&self) -> CorsLayer {
        if !self.cors_config.enabled {
            return CorsLayer::new();
        }

        let origins: Vec<HeaderValue> = self
            .cors_config
            .origins
            .iter()
            .filter(|o| o.as_str() != "*")
            .filter_map(|o| o.parse().ok())
            .collect();

        let has_wildcard = self.cors_config.origins.iter().any(|o| o == "*");

        let cors = if has_wildcard {
            CorsLayer::new().allow_origin(Any)
        } else if origins.is_empty() {
            CorsLayer::new()
        } else {
            CorsLayer::new().allow_origin(origins)
        };

        // Passthrough relays arbitrary methods
        cors.allow_methods(Any).allow_headers(Any)
    }

    pub fn router(&self) -> Router {
        let max_body_size = self.state.max_body_size;

        bridge_router(self.state.clone())
            .layer(DefaultBodyLimit::max(max_body_size))
            .layer(self.build_cors_layer())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> std::io::Result<()> {
        serve(self.router(), addr).await
    }
}

/// Serve `router` on `addr` until Ctrl-C
pub async fn serve(router: Router, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    fn server(cors: CorsConfig) -> BridgeServer {
        let mut config = Config::default();
        config.passthrough.enabled = false;
        let state = BridgeState::from_config(&config).unwrap();
        BridgeServer::with_cors(state, cors)
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/good-books-ds/_msearch")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let resp = server(CorsConfig::default()).router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn test_cors_specific_origin() {
        let cors = CorsConfig {
            enabled: true,
            origins: vec!["http://localhost:3000".to_string()],
        };
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/good-books-ds/_msearch")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let resp = server(cors).router().oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_body_limit_rejects_large_batches() {
        let mut config = Config::default();
        config.passthrough.enabled = false;
        config.server.max_body_size = 16;
        let server = BridgeServer::from_config(&config).unwrap();

        let req = Request::builder()
            .method(Method::POST)
            .uri("/good-books-ds/_msearch")
            .body(Body::from("{}\n{\"query\":{\"match_all\":{}}}\n"))
            .unwrap();

        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
