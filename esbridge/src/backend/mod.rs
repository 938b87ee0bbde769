//! Search backend access
//!
//! The bridge talks to a document search service that answers
//! `GET {search_path}?format=json&options=..&q=..` with a result envelope of
//! documents, a total and optional facets.

mod auth;
mod http;
mod types;

pub use auth::Credentials;
pub use http::{build_client, HttpBackend};
pub use types::{BackendResult, Document, Facet, FacetValue};

use crate::error::BackendError;
use async_trait::async_trait;

/// A backend the `_msearch` route can be served from
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run a search for `term`. An empty term is a match-all search.
    ///
    /// A result with no documents is `Ok`; every transport or protocol
    /// failure is an `Err`.
    async fn search(&self, term: &str) -> Result<BackendResult, BackendError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
