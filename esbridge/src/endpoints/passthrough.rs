//! Fallback handler for every route the bridge does not translate

use crate::error::BridgeError;
use crate::state::BridgeState;
use axum::extract::{Request, State};
use axum::response::Response;

pub async fn passthrough_handler(
    State(state): State<BridgeState>,
    request: Request,
) -> Result<Response, BridgeError> {
    match &state.passthrough {
        Some(passthrough) => passthrough.forward(request, state.max_body_size).await,
        None => Err(BridgeError::RouteNotFound {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
        }),
    }
}
