//! Shared handler state

use crate::backend::{build_client, Credentials, HttpBackend, SearchBackend};
use crate::config::{Config, ConfigError};
use crate::passthrough::Passthrough;
use std::sync::Arc;

/// State for bridge handlers. Immutable once built and cheap to clone.
#[derive(Clone)]
pub struct BridgeState {
    pub backend: Arc<dyn SearchBackend>,
    pub passthrough: Option<Arc<Passthrough>>,
    /// Index name served on `/{index}/_msearch` and stamped on hits
    pub index: Arc<str>,
    pub max_body_size: usize,
}

impl BridgeState {
    pub fn new(backend: Arc<dyn SearchBackend>, index: impl Into<Arc<str>>) -> Self {
        Self {
            backend,
            passthrough: None,
            index: index.into(),
            max_body_size: crate::config::ServerConfig::default().max_body_size,
        }
    }

    pub fn with_passthrough(mut self, passthrough: Passthrough) -> Self {
        self.passthrough = Some(Arc::new(passthrough));
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    /// Build the HTTP backend and passthrough from configuration.
    ///
    /// Both share one outbound client, so both get the configured timeouts.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let client = build_client(&config.backend)?;
        let backend = HttpBackend::new(client.clone(), &config.backend)?;

        let mut state = Self::new(Arc::new(backend), config.index.name.as_str())
            .with_max_body_size(config.server.max_body_size);

        if config.passthrough.enabled {
            let passthrough = Passthrough::new(
                client,
                &config.passthrough,
                Credentials::from_config(&config.backend),
            )?;
            state = state.with_passthrough(passthrough);
        }

        Ok(state)
    }
}
