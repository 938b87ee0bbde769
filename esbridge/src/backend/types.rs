//! Backend result envelope

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Raw search result returned by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct BackendResult {
    #[serde(default)]
    pub results: Vec<Document>,
    pub total: u64,
    /// Facets in the order the backend reported them
    #[serde(default, deserialize_with = "deserialize_facets")]
    pub facets: Vec<Facet>,
}

/// One result document; unknown fields are carried through untouched
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Document {
    pub uri: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// First entry of `extracted.content`, the embedded markup of the document.
    ///
    /// Null and blank strings mean the document carries no markup.
    pub fn markup_payload(&self) -> Option<&Value> {
        self.fields
            .get("extracted")?
            .get("content")?
            .as_array()?
            .first()
            .filter(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub name: String,
    pub values: Vec<FacetValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FacetValue {
    pub name: Value,
    pub count: u64,
}

#[derive(Deserialize)]
struct FacetBody {
    #[serde(rename = "facetValues", default)]
    facet_values: Vec<FacetValue>,
}

fn deserialize_facets<'de, D>(deserializer: D) -> Result<Vec<Facet>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Map<String, Value>> = Option::deserialize(deserializer)?;
    raw.into_iter()
        .flatten()
        .map(|(name, body)| {
            let body: FacetBody = serde_json::from_value(body)
                .map_err(|e| D::Error::custom(format!("facet {}: {}", name, e)))?;
            Ok(Facet {
                name,
                values: body.facet_values,
            })
        })
        .collect()
}
