//! Elasticsearch multi-search bridge
//!
//! This crate lets Elasticsearch search UIs (ReactiveSearch and friends) run
//! against a document search backend that speaks its own query and result
//! dialect.
//!
//! # Endpoints
//!
//! - `POST /{index}/_msearch` - decoded, sent to the backend search endpoint
//!   and answered in Elasticsearch multi-search format
//! - everything else - forwarded unchanged to the backend with Basic-Auth
//!   credentials injected
//!
//! # Translation
//!
//! - the search term is taken from the first `multi_match` clause of the
//!   nested `bool` query a data search component emits
//! - each backend document becomes a hit with `_id = uri`, `_index = <index>`
//!   and `_score = 1.0`
//! - embedded XML records are converted to JSON under `content`, tagged with
//!   their root element name as `entityType`
//! - backend facets become `terms`-style aggregations

pub mod backend;
pub mod config;
pub mod content;
pub mod error;
pub mod passthrough;
pub mod query;
pub mod response;
pub mod router;
pub mod server;
pub mod state;

mod endpoints;

pub use config::Config;
pub use error::BridgeError;
pub use router::bridge_router;
pub use server::BridgeServer;
pub use state::BridgeState;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
