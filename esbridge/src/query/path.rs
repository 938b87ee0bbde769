//! Declarative matching of fixed paths inside a JSON query tree

use serde_json::Value;
use std::fmt;

/// One step of a [`QueryPath`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Key(&'static str),
    Index(usize),
}

/// Outcome of walking a path over a query tree
#[derive(Debug, Clone, PartialEq)]
pub enum PathMatch<'a> {
    /// Every segment resolved; holds the leaf value
    Found(&'a Value),
    /// Segment at `depth` could not be resolved (absent, null or wrong shape)
    Missing { depth: usize },
}

/// A fixed sequence of object keys and array indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryPath {
    segments: &'static [Segment],
}

/// `query.bool.must[0].bool.must.bool.should[0].multi_match.query`, the search box
/// term as emitted by ReactiveSearch data search components.
pub const MULTI_MATCH_TERM: QueryPath = QueryPath::new(&[
    Segment::Key("query"),
    Segment::Key("bool"),
    Segment::Key("must"),
    Segment::Index(0),
    Segment::Key("bool"),
    Segment::Key("must"),
    Segment::Key("bool"),
    Segment::Key("should"),
    Segment::Index(0),
    Segment::Key("multi_match"),
    Segment::Key("query"),
]);

impl QueryPath {
    pub const fn new(segments: &'static [Segment]) -> Self {
        Self { segments }
    }

    /// Walk the path from `root`
    pub fn walk<'a>(&self, root: &'a Value) -> PathMatch<'a> {
        let mut current = root;
        for (depth, segment) in self.segments.iter().enumerate() {
            let next = match segment {
                Segment::Key(key) => current.get(*key),
                Segment::Index(idx) => current.as_array().and_then(|a| a.get(*idx)),
            };
            match next {
                Some(v) if !v.is_null() => current = v,
                _ => return PathMatch::Missing { depth },
            }
        }
        PathMatch::Found(current)
    }

    /// Render the first `depth + 1` segments, e.g. `query.bool.must[0]`
    pub fn prefix(&self, depth: usize) -> String {
        render(&self.segments[..(depth + 1).min(self.segments.len())])
    }
}

impl fmt::Display for QueryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self.segments))
    }
}

fn render(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}
