//! Embedded markup normalization
//!
//! Backend documents carry their source record as an XML string in
//! `extracted.content[0]`. This module turns that string into a JSON tree the
//! search UI can render, and tags the hit with the name of its root element
//! (`entityType`).
//!
//! Conversion rules:
//! - attributes are flattened onto their element without prefix
//! - an element with only text becomes its text value
//! - text next to attributes or child elements is kept under `#text`
//! - an empty element becomes `""`
//! - repeated sibling elements become an array in document order
//! - `true`/`false` and plain decimal numbers are typed; values with leading
//!   zeros stay strings

use crate::error::MarkupError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Number, Value};

/// Key for text content of an element that also has attributes or children
pub const TEXT_KEY: &str = "#text";

/// A normalized payload ready to be attached to a hit
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedContent {
    pub entity_type: String,
    pub content: Value,
}

/// Normalize a document payload
///
/// Strings are parsed as XML. Objects are taken as already structured, with
/// their first key as the entity type.
pub fn normalize_payload(payload: &Value) -> Result<NormalizedContent, MarkupError> {
    match payload {
        Value::String(markup) => normalize_markup(markup),
        Value::Object(map) => {
            let entity_type = map.keys().next().cloned().ok_or(MarkupError::NoRootElement)?;
            Ok(NormalizedContent {
                entity_type,
                content: payload.clone(),
            })
        }
        Value::Array(_) => Err(MarkupError::UnsupportedPayload("array")),
        Value::Number(_) => Err(MarkupError::UnsupportedPayload("number")),
        Value::Bool(_) => Err(MarkupError::UnsupportedPayload("bool")),
        Value::Null => Err(MarkupError::UnsupportedPayload("null")),
    }
}

/// Parse an XML fragment into a JSON tree keyed by element names
pub fn normalize_markup(markup: &str) -> Result<NormalizedContent, MarkupError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut roots = Children::default();

    loop {
        let event = reader.read_event().map_err(|e| {
            MarkupError::Malformed(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(ref e) => stack.push(Element::open(e)?),
            Event::Empty(ref e) => {
                let element = Element::open(e)?;
                attach(&mut stack, &mut roots, element);
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    MarkupError::Malformed("closing tag without opening tag".to_string())
                })?;
                attach(&mut stack, &mut roots, element);
            }
            Event::Text(ref t) => {
                let text = t
                    .unescape()
                    .map_err(|e| MarkupError::Malformed(e.to_string()))?;
                push_text(&mut stack, &text);
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_text(&mut stack, &text);
            }
            Event::Eof => break,
            // Declarations, processing instructions, comments and doctypes
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarkupError::Unclosed(open.name.clone()));
    }

    let entity_type = roots
        .first_name()
        .map(str::to_string)
        .ok_or(MarkupError::NoRootElement)?;

    Ok(NormalizedContent {
        entity_type,
        content: roots.into_value(Map::new()),
    })
}

/// Child elements in document order; repetition is resolved on conversion
#[derive(Debug, Default)]
struct Children(Vec<(String, Value)>);

impl Children {
    fn first_name(&self) -> Option<&str> {
        self.0.first().map(|(name, _)| name.as_str())
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_value(self, mut map: Map<String, Value>) -> Value {
        for (name, value) in self.0 {
            match map.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(name, value);
                }
            }
        }
        Value::Object(map)
    }
}

#[derive(Debug)]
struct Element {
    name: String,
    attributes: Map<String, Value>,
    children: Children,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, MarkupError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Map::new();
        for attr in start.html_attributes() {
            let attr = attr.map_err(|e| MarkupError::Malformed(format!("<{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| MarkupError::Malformed(format!("<{}>: {}", name, e)))?;
            attributes.insert(key, Value::String(value.into_owned()));
        }

        Ok(Self {
            name,
            attributes,
            children: Children::default(),
            text: String::new(),
        })
    }

    fn into_value(self) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            return typed_value(&self.text);
        }

        let has_text = !self.text.is_empty();
        let mut value = self.children.into_value(self.attributes);
        if has_text {
            if let Value::Object(map) = &mut value {
                map.insert(TEXT_KEY.to_string(), typed_value(&self.text));
            }
        }
        value
    }
}

fn attach(stack: &mut [Element], roots: &mut Children, element: Element) {
    let name = element.name.clone();
    let value = element.into_value();
    match stack.last_mut() {
        Some(parent) => parent.children.0.push((name, value)),
        None => roots.0.push((name, value)),
    }
}

/// Text outside any element is dropped
fn push_text(stack: &mut [Element], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(current) = stack.last_mut() {
        if !current.text.is_empty() {
            current.text.push(' ');
        }
        current.text.push_str(text);
    }
}

fn typed_value(text: &str) -> Value {
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => parse_number(text).unwrap_or_else(|| Value::String(text.to_string())),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if int_part.len() > 1 && int_part.starts_with('0') {
        return None;
    }

    match frac_part {
        None => text.parse::<i64>().ok().map(Value::from),
        Some(f) if !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()) => text
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(markup: &str) -> Value {
        normalize_markup(markup).unwrap().content
    }

    #[test]
    fn test_simple_record() {
        let n = normalize_markup("<Book><title>X</title></Book>").unwrap();
        assert_eq!(n.entity_type, "Book");
        assert_eq!(n.content["Book"]["title"], json!("X"));
    }

    #[test]
    fn test_declaration_and_comments_ignored() {
        let n = normalize_markup(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- exported record -->
<Book>
  <title>Dune</title>
</Book>"#,
        )
        .unwrap();
        assert_eq!(n.entity_type, "Book");
        assert_eq!(n.content, json!({"Book": {"title": "Dune"}}));
    }

    #[test]
    fn test_attributes_flattened() {
        assert_eq!(
            content(r#"<Book id="b1" lang="en"><title>Dune</title></Book>"#),
            json!({"Book": {"id": "b1", "lang": "en", "title": "Dune"}})
        );
    }

    #[test]
    fn test_attributes_with_text() {
        assert_eq!(
            content(r#"<Book><price currency="USD">9.99</price></Book>"#),
            json!({"Book": {"price": {"currency": "USD", "#text": 9.99}}})
        );
    }

    #[test]
    fn test_repeated_siblings_preserved() {
        assert_eq!(
            content("<Book><author>A</author><author>B</author><author>C</author></Book>"),
            json!({"Book": {"author": ["A", "B", "C"]}})
        );
    }

    #[test]
    fn test_empty_elements() {
        assert_eq!(
            content(r#"<Book><subtitle/><cover src="c.jpg"/><notes></notes></Book>"#),
            json!({"Book": {"subtitle": "", "cover": {"src": "c.jpg"}, "notes": ""}})
        );
    }

    #[test]
    fn test_value_typing() {
        assert_eq!(
            content(
                "<Book><year>1965</year><rating>4.25</rating><inPrint>true</inPrint>\
                 <isbn>0441013597</isbn><code>-7</code><label>1.</label></Book>"
            ),
            json!({"Book": {
                "year": 1965,
                "rating": 4.25,
                "inPrint": true,
                "isbn": "0441013597",
                "code": -7,
                "label": "1."
            }})
        );
    }

    #[test]
    fn test_entities_and_cdata() {
        assert_eq!(
            content("<Book><title>War &amp; Peace</title><blurb><![CDATA[<b>epic</b>]]></blurb></Book>"),
            json!({"Book": {"title": "War & Peace", "blurb": "<b>epic</b>"}})
        );
    }

    #[test]
    fn test_mixed_content() {
        assert_eq!(
            content("<p>Hello <b>bold</b> world</p>"),
            json!({"p": {"b": "bold", "#text": "Hello world"}})
        );
    }

    #[test]
    fn test_root_with_text_only() {
        let n = normalize_markup("<Note>remember</Note>").unwrap();
        assert_eq!(n.entity_type, "Note");
        assert_eq!(n.content, json!({"Note": "remember"}));
    }

    #[test]
    fn test_mismatched_tags_error() {
        assert!(matches!(
            normalize_markup("<Book><title>X</name></Book>"),
            Err(MarkupError::Malformed(_))
        ));
    }

    #[test]
    fn test_unclosed_element_error() {
        assert!(matches!(
            normalize_markup("<Book><title>X</title>"),
            Err(MarkupError::Unclosed(_)) | Err(MarkupError::Malformed(_))
        ));
    }

    #[test]
    fn test_no_root_element() {
        assert_eq!(
            normalize_markup("just words"),
            Err(MarkupError::NoRootElement)
        );
        assert_eq!(normalize_markup(""), Err(MarkupError::NoRootElement));
    }

    #[test]
    fn test_object_payload_passes_through() {
        let payload = json!({"Book": {"title": "X"}});
        let n = normalize_payload(&payload).unwrap();
        assert_eq!(n.entity_type, "Book");
        assert_eq!(n.content, payload);
    }

    #[test]
    fn test_unsupported_payloads() {
        assert_eq!(
            normalize_payload(&json!(12)),
            Err(MarkupError::UnsupportedPayload("number"))
        );
        assert_eq!(
            normalize_payload(&json!({})),
            Err(MarkupError::NoRootElement)
        );
    }
}
