//! Local JSON-LD extraction
//!
//! Converts the `application/ld+json` blocks of a page into the same
//! document shape the remote validator returns, so locally extracted markup
//! flows through [`crate::decoder::decode`] unchanged. Each block becomes one
//! group; nested objects become their own nodes linked by id.

use serde_json::{Map, Value as JsonValue, json};
use tracing::warn;

#[cfg(feature = "http-providers")]
use crate::error::{AnalysisError, Result};

/// `@context` values treated as plain schema.org
pub const STANDARD_CONTEXTS: &[&str] = &["https://schema.org", "https://schema.org/"];

/// Accepted, but flagged in favor of the https form
pub const INSECURE_CONTEXTS: &[&str] = &["http://schema.org", "http://schema.org/"];

/// Extract JSON-LD script bodies from HTML, skipping empty scripts
#[cfg(feature = "http-providers")]
pub fn extract_blocks(html: &str) -> Result<Vec<String>> {
    use scraper::{Html, Selector};

    let document = Html::parse_document(html);
    let selector = Selector::parse("script")
        .map_err(|err| AnalysisError::MalformedResponse(format!("invalid selector: {err}")))?;

    Ok(document
        .select(&selector)
        .filter(|element| {
            element
                .value()
                .attr("type")
                .map(|kind| kind.trim().to_ascii_lowercase().contains("ld+json"))
                .unwrap_or(false)
        })
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect())
}

/// Extract and convert in one step, returning the serialized document
#[cfg(feature = "http-providers")]
pub fn document_from_html(html: &str) -> Result<String> {
    let blocks = extract_blocks(html)?;
    serde_json::to_string(&document_from_blocks(&blocks))
        .map_err(|err| AnalysisError::MalformedResponse(err.to_string()))
}

/// Build a validator-shaped document from raw JSON-LD block texts
///
/// Blocks that are not valid JSON are skipped with a warning. A block without
/// `@context`, or a top-level entity without `@type`, carries an error; an
/// `http` or non-schema.org context carries a warning. Findings ride on
/// predicate-less assertions, so they never add a property.
pub fn document_from_blocks(blocks: &[String]) -> JsonValue {
    let mut builder = Builder::default();
    let mut groups = Vec::with_capacity(blocks.len());

    for (index, block) in blocks.iter().enumerate() {
        let parsed: JsonValue = match serde_json::from_str(block) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(block = index, error = %err, "skipping malformed JSON-LD block");
                continue;
            }
        };

        let mut nodes = Vec::new();
        let context = builder.push_block(&parsed, &mut nodes);
        if let Some(first) = nodes.first_mut() {
            match context {
                None => add_finding(first, "errors", "missing required property: @context"),
                Some(context) => match context_standing(&context) {
                    ContextStanding::Standard => {}
                    ContextStanding::Insecure => add_finding(
                        first,
                        "warnings",
                        "using http://schema.org; use https://schema.org",
                    ),
                    ContextStanding::NonStandard => add_finding(
                        first,
                        "warnings",
                        &format!(
                            "non-standard @context: {}; use https://schema.org",
                            render_context(&context)
                        ),
                    ),
                },
            }
        }
        groups.push(json!({ "nodes": nodes }));
    }

    json!({ "tripleGroups": groups })
}

enum ContextStanding {
    Standard,
    Insecure,
    NonStandard,
}

fn context_standing(context: &JsonValue) -> ContextStanding {
    match context {
        JsonValue::String(iri) if STANDARD_CONTEXTS.contains(&iri.trim()) => {
            ContextStanding::Standard
        }
        JsonValue::String(iri) if INSECURE_CONTEXTS.contains(&iri.trim()) => {
            ContextStanding::Insecure
        }
        // An array is judged by the vocabulary it starts from.
        JsonValue::Array(items) => items
            .first()
            .map(context_standing)
            .unwrap_or(ContextStanding::NonStandard),
        _ => ContextStanding::NonStandard,
    }
}

fn render_context(context: &JsonValue) -> String {
    match context {
        JsonValue::String(iri) => iri.clone(),
        other => other.to_string(),
    }
}

/// Attach a finding to a converted node as a predicate-less assertion
fn add_finding(node: &mut JsonValue, field: &str, message: &str) {
    if let Some(JsonValue::Array(properties)) = node.get_mut("properties") {
        properties.push(json!({ "pred": "", (field): [message] }));
    }
}

#[derive(Default)]
struct Builder {
    generated: usize,
}

impl Builder {
    /// Push every entity of one block, returning the block's `@context`
    fn push_block(
        &mut self,
        value: &JsonValue,
        nodes: &mut Vec<JsonValue>,
    ) -> Option<JsonValue> {
        match value {
            JsonValue::Array(items) => {
                let mut context = None;
                for item in items {
                    let found = self.push_block(item, nodes);
                    context = context.or(found);
                }
                context
            }
            JsonValue::Object(object) => {
                let context = object.get("@context").cloned();
                match object.get("@graph") {
                    Some(JsonValue::Array(items)) => {
                        for item in items {
                            if let JsonValue::Object(entity) = item {
                                self.push_top_level(entity, nodes);
                            }
                        }
                    }
                    Some(JsonValue::Object(entity)) => {
                        self.push_top_level(entity, nodes);
                    }
                    _ => {
                        self.push_top_level(object, nodes);
                    }
                }
                context
            }
            _ => None,
        }
    }

    /// Top-level entities must declare a type; nested ones may not.
    fn push_top_level(&mut self, object: &Map<String, JsonValue>, nodes: &mut Vec<JsonValue>) {
        let slot = nodes.len();
        self.push_entity(object, nodes);
        if !declared_types(object).is_empty() {
            return;
        }
        if let Some(node) = nodes.get_mut(slot) {
            add_finding(node, "errors", "missing required property: @type");
        }
    }

    fn push_entity(
        &mut self,
        object: &Map<String, JsonValue>,
        nodes: &mut Vec<JsonValue>,
    ) -> String {
        let id = match object.get("@id").and_then(JsonValue::as_str) {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => self.next_id(),
        };

        // Reserve the slot so parents precede their nested children.
        let slot = nodes.len();
        nodes.push(JsonValue::Null);

        let mut properties = Vec::new();
        for (key, value) in object {
            if key.starts_with('@') {
                continue;
            }
            match value {
                JsonValue::Array(items) => {
                    for item in items {
                        self.push_property(key, item, &mut properties, nodes);
                    }
                }
                other => self.push_property(key, other, &mut properties, nodes),
            }
        }

        nodes[slot] = json!({
            "id": id,
            "type": declared_types(object),
            "properties": properties,
        });
        id
    }

    fn push_property(
        &mut self,
        key: &str,
        value: &JsonValue,
        properties: &mut Vec<JsonValue>,
        nodes: &mut Vec<JsonValue>,
    ) {
        match value {
            JsonValue::Null => {}
            JsonValue::Object(object) if object.contains_key("@value") => {
                properties.push(json!({ "pred": key, "value": object["@value"] }));
            }
            JsonValue::Object(object) if is_bare_reference(object) => {
                properties.push(json!({ "pred": key, "target": object["@id"] }));
            }
            JsonValue::Object(object) => {
                let target = self.push_entity(object, nodes);
                properties.push(json!({ "pred": key, "target": target }));
            }
            scalar => properties.push(json!({ "pred": key, "value": scalar })),
        }
    }

    fn next_id(&mut self) -> String {
        let id = format!("_:j{}", self.generated);
        self.generated += 1;
        id
    }
}

fn is_bare_reference(object: &Map<String, JsonValue>) -> bool {
    object.len() == 1 && object.get("@id").is_some_and(JsonValue::is_string)
}

fn declared_types(object: &Map<String, JsonValue>) -> Vec<String> {
    match object.get("@type") {
        Some(JsonValue::String(name)) => vec![name.clone()],
        Some(JsonValue::Array(names)) => names
            .iter()
            .filter_map(JsonValue::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
