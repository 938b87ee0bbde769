//! Bridge router

use crate::endpoints::{msearch_handler, passthrough_handler};
use crate::state::BridgeState;
use axum::routing::post;
use axum::Router;

/// Create the bridge router
///
/// # Endpoints
///
/// - `POST /{index}/_msearch` - Multi-search, translated to a backend search
/// - anything else - forwarded to the passthrough target, or 404 when
///   passthrough is disabled
pub fn bridge_router(state: BridgeState) -> Router {
    let msearch_path = format!("/{}/_msearch", state.index);

    Router::new()
        .route(
            &msearch_path,
            post(msearch_handler).fallback(passthrough_handler),
        )
        .fallback(passthrough_handler)
        .with_state(state)
}
