//! Common types used across schemalens

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Bucket for nodes that declare no schema type
pub const UNTYPED_BUCKET: &str = "(untyped)";

/// Value carried by a property assertion
///
/// Nested structured values are links to other nodes in the same document,
/// never embedded copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PropertyValue {
    Literal(String),
    NodeRef(String),
}

/// An error or warning attached to an assertion, as reported by the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorIssue {
    /// Severity label as the validator spelled it
    pub label: String,
    pub message: String,
}

/// A single (subject, predicate, value) fact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAssertion {
    pub predicate: String,
    pub value: Option<PropertyValue>,
    pub issues: Vec<ValidatorIssue>,
}

/// A node in the validator graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub types: Vec<String>,
    pub properties: Vec<PropertyAssertion>,
}

/// A group of nodes, referencing the document arena by index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeGroup {
    pub members: Vec<usize>,
}

/// Decoded validator response
///
/// Nodes live in a single arena; groups and references point into it, so the
/// document never holds back-pointers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaGraphDocument {
    groups: Vec<NodeGroup>,
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl SchemaGraphDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new group; subsequent `push_node` calls land in it.
    pub fn begin_group(&mut self) {
        self.groups.push(NodeGroup::default());
    }

    /// Add a node to the arena and to the current group.
    ///
    /// A node without an id gets a synthetic `_:b{n}` id derived from its
    /// arena position.
    pub fn push_node(
        &mut self,
        id: Option<String>,
        types: Vec<String>,
        properties: Vec<PropertyAssertion>,
    ) -> usize {
        if self.groups.is_empty() {
            self.begin_group();
        }

        let position = self.nodes.len();
        let id = id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("_:b{position}"));

        self.index.entry(id.clone()).or_insert(position);
        self.nodes.push(Node {
            id,
            types,
            properties,
        });

        if let Some(group) = self.groups.last_mut() {
            group.members.push(position);
        }
        position
    }

    /// Replace the properties of an already pushed node, returning its id.
    ///
    /// Lets a parent take its arena slot before the nodes embedded in it.
    pub(crate) fn set_properties(
        &mut self,
        position: usize,
        properties: Vec<PropertyAssertion>,
    ) -> String {
        match self.nodes.get_mut(position) {
            Some(node) => {
                node.properties = properties;
                node.id.clone()
            }
            None => format!("_:b{position}"),
        }
    }

    pub fn groups(&self) -> &[NodeGroup] {
        &self.groups
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Nodes of a group in declaration order
    pub fn group_nodes<'a>(&'a self, group: &'a NodeGroup) -> impl Iterator<Item = &'a Node> + 'a {
        group.members.iter().filter_map(|&idx| self.nodes.get(idx))
    }

    /// Resolve a node reference; the first node declared with an id wins.
    pub fn resolve(&self, id: &str) -> Option<&Node> {
        self.index.get(id).and_then(|&idx| self.nodes.get(idx))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Severity bucket for validator findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Validator finding reshaped into a uniform record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedIssue {
    pub severity: Severity,
    pub schema_type: String,
    pub predicate: String,
    pub message: String,
}

/// Canonical per-type property profile of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSchemaProfile {
    url: String,
    types: BTreeMap<String, BTreeSet<String>>,
    #[serde(skip)]
    issues: Vec<ClassifiedIssue>,
}

impl PageSchemaProfile {
    pub fn new(
        url: impl Into<String>,
        types: BTreeMap<String, BTreeSet<String>>,
        issues: Vec<ClassifiedIssue>,
    ) -> Self {
        Self {
            url: url.into(),
            types,
            issues,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Every observed type, including the untyped bucket
    pub fn types(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.types
    }

    /// Observed types that take part in catalog and competitor comparison
    pub fn comparable_types(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.types
            .iter()
            .filter(|(name, _)| name.as_str() != UNTYPED_BUCKET)
    }

    pub fn properties(&self, schema_type: &str) -> Option<&BTreeSet<String>> {
        self.types.get(schema_type)
    }

    pub fn has_type(&self, schema_type: &str) -> bool {
        self.types.contains_key(schema_type)
    }

    pub fn has_property(&self, schema_type: &str, property: &str) -> bool {
        self.types
            .get(schema_type)
            .is_some_and(|props| props.contains(property))
    }

    pub fn issues(&self) -> &[ClassifiedIssue] {
        &self.issues
    }
}

/// Reference record for one schema type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalSchemaEntry {
    pub name: String,
    pub description: String,
    pub schema_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_doc_url: Option<String>,
    #[serde(default)]
    pub required: BTreeSet<String>,
    #[serde(default)]
    pub recommended: BTreeSet<String>,
    /// Property name → Google rich-result feature it unlocks
    #[serde(default)]
    pub rich_results: BTreeMap<String, String>,
}

impl CanonicalSchemaEntry {
    /// Required and recommended properties together
    pub fn documented_properties(&self) -> BTreeSet<&str> {
        self.required
            .iter()
            .chain(self.recommended.iter())
            .map(String::as_str)
            .collect()
    }

    /// schema.org URL followed by the Google documentation URL, if any
    pub fn source_urls(&self) -> Vec<String> {
        let mut urls = vec![self.schema_url.clone()];
        if let Some(doc) = self.google_doc_url.as_ref().filter(|doc| !doc.is_empty()) {
            urls.push(doc.clone());
        }
        urls
    }
}

/// Gaps between one profile type and its catalog entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub schema_type: String,
    pub missing_required: BTreeSet<String>,
    pub missing_recommended: BTreeSet<String>,
    /// Present on the page but unknown to the catalog entry
    pub extra: BTreeSet<String>,
    /// Absent property → rich-result feature it would unlock
    pub rich_result_opportunities: BTreeMap<String, String>,
}

impl DiffResult {
    pub fn is_clean(&self) -> bool {
        self.missing_required.is_empty()
            && self.missing_recommended.is_empty()
            && self.extra.is_empty()
            && self.rich_result_opportunities.is_empty()
    }
}

/// Category of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecommendationKind {
    MissingType,
    MissingRequiredProperty,
    MissingRecommendedProperty,
    RichResultOpportunity,
    CompetitorGap,
    UnrecognizedProperty,
}

impl RecommendationKind {
    /// Tie-break rank; lower wins
    pub fn precedence(self) -> u8 {
        match self {
            RecommendationKind::MissingRequiredProperty => 0,
            RecommendationKind::MissingType => 1,
            RecommendationKind::RichResultOpportunity => 2,
            RecommendationKind::CompetitorGap => 3,
            RecommendationKind::MissingRecommendedProperty => 4,
            RecommendationKind::UnrecognizedProperty => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecommendationKind::MissingType => "missing-type",
            RecommendationKind::MissingRequiredProperty => "missing-required-property",
            RecommendationKind::MissingRecommendedProperty => "missing-recommended-property",
            RecommendationKind::RichResultOpportunity => "rich-result-opportunity",
            RecommendationKind::CompetitorGap => "competitor-gap",
            RecommendationKind::UnrecognizedProperty => "unrecognized-property",
        }
    }
}

/// A ranked, sourced suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
    pub kind: RecommendationKind,
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    pub rationale: String,
    pub source_urls: Vec<String>,
    /// False when no catalog entry backs this item (no source URLs)
    pub catalog_backed: bool,
    /// 0-100, higher first
    pub priority: u8,
}
