//! `_msearch` NDJSON batch decoding

use super::path::{PathMatch, QueryPath, MULTI_MATCH_TERM};
use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Segments of [`MULTI_MATCH_TERM`] that may be absent without error.
///
/// A body without `query` or `query.bool` is a match-all search and yields `""`.
const TOLERATED_MISSING_DEPTH: usize = 2;

/// Header line of an msearch pair
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MSearchHeader {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub preference: Option<String>,
    #[serde(default)]
    pub routing: Option<String>,
}

/// A decoded single-query msearch request
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub header: MSearchHeader,
    pub body: Value,
    /// Search term; empty for match-all bodies
    pub term: String,
}

/// Decode a raw `_msearch` body into its first header/body pair and term
pub fn decode_msearch(body: &[u8]) -> Result<SearchRequest, DecodeError> {
    let text = std::str::from_utf8(body)?;
    let mut lines = text.lines();

    let header_line = lines.next().unwrap_or_default();
    let body_line = lines
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| {
            DecodeError::MalformedBatch("expected a header line followed by a query line".into())
        })?;

    let ignored = lines.filter(|l| !l.trim().is_empty()).count();
    if ignored > 0 {
        warn!(ignored_lines = ignored, "msearch batch has more than one search, extra lines ignored");
    }

    let header = parse_header(header_line)?;
    let body: Value = serde_json::from_str(body_line)
        .map_err(|source| DecodeError::InvalidJson { line: 2, source })?;

    let term = extract_term(&body, &MULTI_MATCH_TERM)?;
    debug!(index = ?header.index, term = %term, "decoded msearch request");

    Ok(SearchRequest { header, body, term })
}

fn parse_header(line: &str) -> Result<MSearchHeader, DecodeError> {
    if line.trim().is_empty() {
        return Ok(MSearchHeader::default());
    }
    serde_json::from_str(line).map_err(|source| DecodeError::InvalidJson { line: 1, source })
}

/// Pull the search term out of a query body along `path`
pub fn extract_term(body: &Value, path: &QueryPath) -> Result<String, DecodeError> {
    match path.walk(body) {
        PathMatch::Found(Value::String(s)) => Ok(s.clone()),
        PathMatch::Found(_) => Err(DecodeError::NotAString {
            path: path.to_string(),
        }),
        PathMatch::Missing { depth } if depth < TOLERATED_MISSING_DEPTH => Ok(String::new()),
        PathMatch::Missing { depth } => Err(DecodeError::PathMiss {
            path: path.prefix(depth),
        }),
    }
}
