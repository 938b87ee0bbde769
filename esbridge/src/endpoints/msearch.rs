//! Translated `_msearch` endpoint

use crate::error::BridgeError;
use crate::query::decode_msearch;
use crate::response::{EsMSearchResponse, ResponseMapper};
use crate::state::BridgeState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use std::time::Instant;
use tracing::{debug, warn};

/// POST /{index}/_msearch
pub async fn msearch_handler(
    State(state): State<BridgeState>,
    body: Bytes,
) -> Result<Json<EsMSearchResponse>, BridgeError> {
    let start = Instant::now();

    let result = execute_msearch(&state, &body, start).await;

    let status = match &result {
        Ok(_) => "ok".to_string(),
        Err(e) => e.status_code().as_u16().to_string(),
    };
    metrics::counter!("esbridge_msearch_requests_total", "status" => status).increment(1);
    metrics::histogram!("esbridge_msearch_duration_seconds").record(start.elapsed().as_secs_f64());

    result.map(Json)
}

async fn execute_msearch(
    state: &BridgeState,
    body: &Bytes,
    start: Instant,
) -> Result<EsMSearchResponse, BridgeError> {
    let request = decode_msearch(body)?;

    if let Some(index) = request.header.index.as_deref() {
        if index != &*state.index {
            debug!(header_index = %index, route_index = %state.index, "header index ignored");
        }
    }

    let result = state.backend.search(&request.term).await.map_err(|e| {
        warn!(backend = state.backend.name(), kind = e.kind(), error = %e, "backend search failed");
        metrics::counter!("esbridge_backend_errors_total", "kind" => e.kind()).increment(1);
        e
    })?;

    let response = ResponseMapper::map_search_results(&state.index, result, start);

    debug!(
        term = %request.term,
        total = response.hits.total.value,
        hits = response.hits.hits.len(),
        took_ms = response.took,
        "msearch complete"
    );

    Ok(EsMSearchResponse::single(response))
}
