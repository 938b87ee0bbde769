//! Response mappers from backend results to Elasticsearch format

use crate::backend::{BackendResult, Document, Facet};
use crate::content::normalize_payload;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::warn;

/// Score stamped on every hit; the backend order is the ranking
pub const CONSTANT_SCORE: f32 = 1.0;

/// Hit keys synthesized by the bridge; backend fields with these names are dropped
const SYNTHESIZED_KEYS: [&str; 5] = ["_id", "_index", "_score", "content", "entityType"];

/// ES multi-search response
#[derive(Debug, Clone, Serialize)]
pub struct EsMSearchResponse {
    pub took: u64,
    pub responses: Vec<EsSearchResponse>,
}

impl EsMSearchResponse {
    pub fn single(response: EsSearchResponse) -> Self {
        Self {
            took: response.took,
            responses: vec![response],
        }
    }
}

/// ES search response format
#[derive(Debug, Clone, Serialize)]
pub struct EsSearchResponse {
    pub took: u64,
    pub timed_out: bool,
    #[serde(rename = "_shards")]
    pub shards: ShardStats,
    pub hits: HitsResponse,
    pub aggregations: Aggregations,
    /// Documents whose embedded markup could not be normalized
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<HitWarning>,
    pub status: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShardStats {
    pub total: u32,
    pub successful: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl Default for ShardStats {
    fn default() -> Self {
        Self {
            total: 1,
            successful: 1,
            skipped: 0,
            failed: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HitsResponse {
    pub total: TotalHits,
    pub max_score: Option<f32>,
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TotalHits {
    pub value: u64,
    pub relation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score")]
    pub score: f32,
    #[serde(rename = "entityType", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    /// Backend-native fields, `uri` first
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HitWarning {
    #[serde(rename = "_id")]
    pub id: String,
    pub reason: String,
}

/// Named aggregations, serialized as a JSON object in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregations(Vec<(String, TermsAggregation)>);

impl Aggregations {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&TermsAggregation> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, agg)| agg)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }
}

impl Serialize for Aggregations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, agg) in &self.0 {
            map.serialize_entry(name, agg)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermsAggregation {
    pub buckets: Vec<EsBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EsBucket {
    pub key: Value,
    pub doc_count: u64,
}

/// Response mapper
pub struct ResponseMapper;

impl ResponseMapper {
    /// Convert a backend result into an ES search response for `index`.
    ///
    /// Hits keep backend order. `hits.total.value` is the backend total, not
    /// the number of hits returned. `took` runs from `started` until mapping
    /// is done.
    pub fn map_search_results(index: &str, result: BackendResult, started: Instant) -> EsSearchResponse {
        let mut warnings = Vec::new();
        let hits: Vec<Hit> = result
            .results
            .into_iter()
            .map(|doc| Self::map_hit(index, doc, &mut warnings))
            .collect();

        let max_score = if hits.is_empty() {
            None
        } else {
            Some(CONSTANT_SCORE)
        };

        let aggregations = Self::map_facets(result.facets);

        EsSearchResponse {
            took: started.elapsed().as_millis() as u64,
            timed_out: false,
            shards: ShardStats::default(),
            hits: HitsResponse {
                total: TotalHits {
                    value: result.total,
                    relation: "eq".to_string(),
                },
                max_score,
                hits,
            },
            aggregations,
            warnings,
            status: 200,
        }
    }

    fn map_hit(index: &str, doc: Document, warnings: &mut Vec<HitWarning>) -> Hit {
        let normalized = doc.markup_payload().map(normalize_payload);

        let (entity_type, content) = match normalized {
            Some(Ok(n)) => (Some(n.entity_type), Some(n.content)),
            Some(Err(e)) => {
                warn!(uri = %doc.uri, error = %e, "skipping content for document with bad markup");
                metrics::counter!("esbridge_markup_errors_total").increment(1);
                warnings.push(HitWarning {
                    id: doc.uri.clone(),
                    reason: e.to_string(),
                });
                (None, None)
            }
            None => (None, None),
        };

        let mut fields = Map::with_capacity(doc.fields.len() + 1);
        fields.insert("uri".to_string(), Value::String(doc.uri.clone()));
        for (key, value) in doc.fields {
            if !SYNTHESIZED_KEYS.contains(&key.as_str()) {
                fields.insert(key, value);
            }
        }

        Hit {
            index: index.to_string(),
            id: doc.uri,
            score: CONSTANT_SCORE,
            entity_type,
            content,
            fields,
        }
    }

    fn map_facets(facets: Vec<Facet>) -> Aggregations {
        Aggregations(
            facets
                .into_iter()
                .map(|facet| {
                    let buckets = facet
                        .values
                        .into_iter()
                        .map(|v| EsBucket {
                            key: v.name,
                            doc_count: v.count,
                        })
                        .collect();
                    (facet.name, TermsAggregation { buckets })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn backend_result(raw: Value) -> BackendResult {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_shard_stats_default() {
        let s = ShardStats::default();
        assert_eq!(s.total, 1);
        assert_eq!(s.successful, 1);
        assert_eq!(s.skipped, 0);
        assert_eq!(s.failed, 0);
    }

    #[test]
    fn test_map_hit_without_markup() {
        let result = backend_result(json!({
            "results": [{"uri": "doc1", "extracted": {"content": []}}],
            "total": 1
        }));
        let response = ResponseMapper::map_search_results("good-books-ds", result, Instant::now());

        assert_eq!(response.hits.total.value, 1);
        let hit = &response.hits.hits[0];
        assert_eq!(hit.id, "doc1");
        assert_eq!(hit.index, "good-books-ds");
        assert_eq!(hit.score, 1.0);
        assert!(hit.entity_type.is_none());
        assert!(hit.content.is_none());

        let v = serde_json::to_value(hit).unwrap();
        assert!(v.get("content").is_none());
        assert!(v.get("entityType").is_none());
        assert_eq!(v["uri"], json!("doc1"));
        assert_eq!(v["extracted"], json!({"content": []}));
    }

    #[test]
    fn test_blank_markup_is_not_a_warning() {
        let result = backend_result(json!({
            "results": [{"uri": "d", "extracted": {"content": [""]}}],
            "total": 1
        }));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());
        let hit = &response.hits.hits[0];
        assert!(hit.content.is_none());
        assert!(hit.entity_type.is_none());
        assert!(response.warnings.is_empty());
    }

    #[test]
    fn test_took_covers_mapping() {
        let result = backend_result(json!({
            "results": [{"uri": "/b/1.xml", "extracted": {"content": ["<Book><title>X</title></Book>"]}}],
            "total": 1
        }));
        let started = Instant::now().checked_sub(Duration::from_millis(40)).unwrap();
        let response = ResponseMapper::map_search_results("idx", result, started);
        assert!(response.took >= 40);
    }

    #[test]
    fn test_map_hit_with_markup() {
        let result = backend_result(json!({
            "results": [{"uri": "/b/1.xml", "extracted": {"content": ["<Book><title>X</title></Book>"]}}],
            "total": 1
        }));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());
        let v = serde_json::to_value(&response.hits.hits[0]).unwrap();
        assert_eq!(v["entityType"], json!("Book"));
        assert_eq!(v["content"]["Book"]["title"], json!("X"));
        assert!(response.warnings.is_empty());
    }

    #[test]
    fn test_synthesized_fields_override_backend() {
        let result = backend_result(json!({
            "results": [{
                "uri": "doc9",
                "_id": "native",
                "_score": 0.2,
                "_index": "other",
                "content": "stale",
                "score": 12,
                "extracted": {"content": []}
            }],
            "total": 1
        }));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());
        let v = serde_json::to_value(&response.hits.hits[0]).unwrap();
        assert_eq!(v["_id"], json!("doc9"));
        assert_eq!(v["_index"], json!("idx"));
        assert_eq!(v["_score"], json!(1.0));
        assert!(v.get("content").is_none());
        assert_eq!(v["score"], json!(12));
    }

    #[test]
    fn test_total_is_backend_total_not_hit_count() {
        let result = backend_result(json!({
            "results": [{"uri": "a"}, {"uri": "b"}],
            "total": 250
        }));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());
        assert_eq!(response.hits.hits.len(), 2);
        assert_eq!(response.hits.total.value, 250);
        assert_eq!(response.hits.total.relation, "eq");
        assert_eq!(response.hits.max_score, Some(1.0));
    }

    #[test]
    fn test_hits_keep_backend_order() {
        let result = backend_result(json!({
            "results": [{"uri": "z"}, {"uri": "a"}, {"uri": "m"}],
            "total": 3
        }));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());
        let ids: Vec<_> = response.hits.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_facets_to_aggregations() {
        let result = backend_result(json!({
            "results": [],
            "total": 0,
            "facets": {"genre": {"facetValues": [{"name": "Fiction", "count": 3}]}}
        }));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());
        assert_eq!(
            serde_json::to_value(&response.aggregations).unwrap(),
            json!({"genre": {"buckets": [{"key": "Fiction", "doc_count": 3}]}})
        );
    }

    #[test]
    fn test_facet_and_bucket_order_preserved() {
        let result = backend_result(json!({
            "results": [],
            "total": 0,
            "facets": {
                "year": {"facetValues": [{"name": "2001", "count": 1}, {"name": "1999", "count": 5}]},
                "author": {"facetValues": [{"name": "Le Guin", "count": 2}]}
            }
        }));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());
        let names: Vec<_> = response.aggregations.names().collect();
        assert_eq!(names, vec!["year", "author"]);

        let year = response.aggregations.get("year").unwrap();
        assert_eq!(year.buckets[0].key, json!("2001"));
        assert_eq!(year.buckets[1].doc_count, 5);
    }

    #[test]
    fn test_no_facets_gives_empty_aggregations() {
        let result = backend_result(json!({"results": [], "total": 0}));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());
        assert!(response.aggregations.is_empty());
        assert!(response.hits.max_score.is_none());

        let v = serde_json::to_value(&response).unwrap();
        assert_eq!(v["aggregations"], json!({}));
    }

    #[test]
    fn test_bad_markup_isolated_to_document() {
        let result = backend_result(json!({
            "results": [
                {"uri": "good", "extracted": {"content": ["<Book><title>A</title></Book>"]}},
                {"uri": "bad", "extracted": {"content": ["<Book><title>B</Book>"]}},
                {"uri": "also-good", "extracted": {"content": ["<Author><name>C</name></Author>"]}}
            ],
            "total": 3
        }));
        let response = ResponseMapper::map_search_results("idx", result, Instant::now());

        assert_eq!(response.hits.hits.len(), 3);
        assert_eq!(response.hits.hits[0].entity_type.as_deref(), Some("Book"));
        assert!(response.hits.hits[1].content.is_none());
        assert_eq!(response.hits.hits[2].entity_type.as_deref(), Some("Author"));

        assert_eq!(response.warnings.len(), 1);
        assert_eq!(response.warnings[0].id, "bad");
    }

    #[test]
    fn test_envelope_shape() {
        let result = backend_result(json!({"results": [{"uri": "x"}], "total": 1}));
        let started = Instant::now().checked_sub(Duration::from_millis(7)).unwrap();
        let response = EsMSearchResponse::single(ResponseMapper::map_search_results("idx", result, started));
        assert!(response.took >= 7);
        let v = serde_json::to_value(&response).unwrap();

        assert_eq!(v["took"], json!(response.took));
        assert_eq!(v["responses"].as_array().unwrap().len(), 1);
        let item = &v["responses"][0];
        assert_eq!(item["status"], json!(200));
        assert_eq!(item["timed_out"], json!(false));
        assert_eq!(item["_shards"]["successful"], json!(1));
        assert_eq!(item["hits"]["total"]["value"], json!(1));
        assert_eq!(item["hits"]["hits"][0]["_id"], json!("x"));
        assert!(item.get("warnings").is_none());
    }
}
