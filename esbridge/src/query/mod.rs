//! Request decoding for the Elasticsearch side of the bridge

mod batch;
mod path;

pub use batch::{decode_msearch, extract_term, MSearchHeader, SearchRequest};
pub use path::{PathMatch, QueryPath, Segment, MULTI_MATCH_TERM};
