//! Validator response decoding
//!
//! Turns the raw body of a structured-data validation response into a
//! [`SchemaGraphDocument`]. Some providers guard their JSON against
//! cross-site script inclusion with a short non-JSON prefix; it is stripped
//! before parsing.

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{AnalysisError, Result};
use crate::types::{PropertyAssertion, PropertyValue, SchemaGraphDocument, ValidatorIssue};

/// Anti-XSSI prefixes emitted ahead of the JSON payload
pub const SECURITY_PREFIXES: &[&str] = &[")]}'"];

const UNSPECIFIED_FINDING: &str = "unspecified validator finding";

/// Decode a raw validator body into a graph document
pub fn decode(raw_text: &str) -> Result<SchemaGraphDocument> {
    let body = strip_security_prefix(raw_text);
    let parsed: RawDocument = serde_json::from_str(body)
        .map_err(|err| AnalysisError::MalformedResponse(err.to_string()))?;

    Ok(build_document(parsed))
}

/// Remove a recognized security prefix, if present
pub fn strip_security_prefix(raw_text: &str) -> &str {
    let trimmed = raw_text.trim_start_matches('\u{feff}').trim_start();
    SECURITY_PREFIXES
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed)
}

fn build_document(raw: RawDocument) -> SchemaGraphDocument {
    let mut document = SchemaGraphDocument::new();

    for group in raw.triple_groups {
        document.begin_group();
        for node in group.nodes {
            push_raw_node(&mut document, node);
        }
    }

    document
}

/// Push a node, then any nodes embedded in its properties, into the current
/// group. Returns the id the node was stored under.
fn push_raw_node(document: &mut SchemaGraphDocument, node: RawNode) -> String {
    let types = node.declared_types();
    let position = document.push_node(node.id, types, Vec::new());
    let properties = node
        .properties
        .into_iter()
        .map(|property| property.into_assertion(document))
        .collect();
    document.set_properties(position, properties)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    triple_groups: Vec<RawGroup>,
}

#[derive(Deserialize)]
struct RawGroup {
    #[serde(default)]
    nodes: Vec<RawNode>,
}

#[derive(Deserialize)]
struct RawNode {
    #[serde(default, alias = "nodeId", alias = "@id")]
    id: Option<String>,
    #[serde(default)]
    types: Vec<RawType>,
    #[serde(default, rename = "type", alias = "@type")]
    type_field: Option<RawTypeField>,
    #[serde(default, rename = "typeGroup")]
    type_group: Option<String>,
    #[serde(default)]
    properties: Vec<RawProperty>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawType {
    Name(String),
    Pred { value: String },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTypeField {
    One(String),
    Many(Vec<String>),
}

impl RawNode {
    /// An object carrying nothing but an id points at a node declared elsewhere
    fn is_reference(&self) -> bool {
        self.properties.is_empty() && self.declared_types().is_empty()
    }

    fn declared_types(&self) -> Vec<String> {
        let candidates: Vec<&str> = if !self.types.is_empty() {
            self.types
                .iter()
                .map(|ty| match ty {
                    RawType::Name(name) => name.as_str(),
                    RawType::Pred { value } => value.as_str(),
                })
                .collect()
        } else {
            match (&self.type_field, &self.type_group) {
                (Some(RawTypeField::One(name)), _) => vec![name.as_str()],
                (Some(RawTypeField::Many(names)), _) => names.iter().map(String::as_str).collect(),
                (None, Some(group)) => vec![group.as_str()],
                (None, None) => Vec::new(),
            }
        };

        let mut types: Vec<String> = Vec::new();
        for candidate in candidates {
            let candidate = candidate.trim();
            if !candidate.is_empty() && !types.iter().any(|known| known == candidate) {
                types.push(candidate.to_string());
            }
        }
        types
    }
}

#[derive(Deserialize)]
struct RawProperty {
    #[serde(default)]
    pred: String,
    #[serde(default)]
    value: Option<JsonValue>,
    #[serde(default, alias = "ref", alias = "nodeRef")]
    target: Option<RawTarget>,
    #[serde(default)]
    errors: Vec<RawIssue>,
    #[serde(default)]
    warnings: Vec<RawIssue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Id(String),
    Embedded(Box<RawNode>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawIssue {
    Text(String),
    Detailed {
        #[serde(default, alias = "errorType", alias = "description")]
        message: Option<String>,
        #[serde(default)]
        severity: Option<String>,
        #[serde(default, rename = "isSevere")]
        is_severe: Option<bool>,
        #[serde(default)]
        args: Vec<JsonValue>,
    },
    /// Numbers, booleans or null: the value itself becomes the message
    Other(JsonValue),
}

impl RawIssue {
    fn into_issue(self, default_label: &str) -> ValidatorIssue {
        match self {
            RawIssue::Text(message) => ValidatorIssue {
                label: default_label.to_string(),
                message,
            },
            RawIssue::Detailed {
                message,
                severity,
                is_severe,
                args,
            } => {
                let label = severity.unwrap_or_else(|| match is_severe {
                    Some(true) => "error".to_string(),
                    Some(false) => "warning".to_string(),
                    None => default_label.to_string(),
                });

                let mut message = message.unwrap_or_else(|| UNSPECIFIED_FINDING.to_string());
                if !args.is_empty() {
                    let rendered: Vec<String> = args.iter().map(render_literal).collect();
                    message = format!("{message} ({})", rendered.join(", "));
                }

                ValidatorIssue { label, message }
            }
            RawIssue::Other(value) => ValidatorIssue {
                label: default_label.to_string(),
                message: match value {
                    JsonValue::Null => UNSPECIFIED_FINDING.to_string(),
                    other => render_literal(&other),
                },
            },
        }
    }
}

impl RawProperty {
    fn into_assertion(self, document: &mut SchemaGraphDocument) -> PropertyAssertion {
        let value = match self.target {
            Some(RawTarget::Id(id)) => Some(PropertyValue::NodeRef(id)),
            Some(RawTarget::Embedded(node)) if node.is_reference() => {
                node.id.map(PropertyValue::NodeRef)
            }
            Some(RawTarget::Embedded(node)) => {
                Some(PropertyValue::NodeRef(push_raw_node(document, *node)))
            }
            None => self
                .value
                .filter(|value| !value.is_null())
                .map(|value| PropertyValue::Literal(render_literal(&value))),
        };

        let mut issues = Vec::with_capacity(self.errors.len() + self.warnings.len());
        issues.extend(self.errors.into_iter().map(|issue| issue.into_issue("error")));
        issues.extend(self.warnings.into_iter().map(|issue| issue.into_issue("warning")));

        PropertyAssertion {
            predicate: self.pred.trim().to_string(),
            value,
            issues,
        }
    }
}

fn render_literal(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}
