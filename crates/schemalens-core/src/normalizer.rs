//! Graph normalization
//!
//! Flattens a [`SchemaGraphDocument`] into a [`PageSchemaProfile`]: for each
//! declared type, the set of predicate names the page satisfies. The fold is
//! deliberately lossy. Multiplicity, nesting depth and value correctness are
//! the validator's concern and only surface as issues.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::issues::{RawIssue, classify, severity_from_label};
use crate::types::{Node, PageSchemaProfile, SchemaGraphDocument, Severity, UNTYPED_BUCKET};
use crate::url_utils::shorten_schema_iri;

/// Build the per-type property profile for one page
pub fn normalize(document: &SchemaGraphDocument, source_url: &str) -> PageSchemaProfile {
    let mut types: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut raw_issues = Vec::new();

    for group in document.groups() {
        for node in document.group_nodes(group) {
            let buckets = node_buckets(node);
            for bucket in &buckets {
                types.entry(bucket.clone()).or_default();
            }
            let issue_owner = buckets.join(", ");

            for assertion in &node.properties {
                let predicate = shorten_schema_iri(&assertion.predicate);

                raw_issues.extend(assertion.issues.iter().map(|issue| RawIssue {
                    label: issue.label.clone(),
                    schema_type: issue_owner.clone(),
                    predicate: predicate.clone(),
                    message: issue.message.clone(),
                }));

                // An errored assertion never counts as satisfied; warnings do.
                let has_error = assertion
                    .issues
                    .iter()
                    .any(|issue| severity_from_label(&issue.label) == Severity::Error);
                if has_error || predicate.is_empty() {
                    continue;
                }

                for bucket in &buckets {
                    if let Some(properties) = types.get_mut(bucket) {
                        properties.insert(predicate.clone());
                    }
                }
            }
        }
    }

    let issues = classify(&raw_issues);
    debug!(
        url = source_url,
        types = types.len(),
        issues = issues.len(),
        "normalized schema graph"
    );

    PageSchemaProfile::new(source_url, types, issues)
}

fn node_buckets(node: &Node) -> Vec<String> {
    let mut buckets: Vec<String> = Vec::new();
    for declared in &node.types {
        let short = shorten_schema_iri(declared);
        if !short.is_empty() && !buckets.contains(&short) {
            buckets.push(short);
        }
    }

    if buckets.is_empty() {
        buckets.push(UNTYPED_BUCKET.to_string());
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;

    const PAGE: &str = "https://example.com/";

    fn profile_for(body: &str) -> PageSchemaProfile {
        normalize(&decode(body).unwrap(), PAGE)
    }

    fn names(set: Option<&BTreeSet<String>>) -> Vec<&str> {
        set.map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    #[test]
    fn errored_assertions_are_not_satisfied() {
        let profile = profile_for(
            r#"{"tripleGroups": [{"nodes": [{
                "type": "Organization",
                "properties": [
                    {"pred": "name", "value": "Acme"},
                    {"pred": "logo", "value": "", "errors": ["Missing image URL"]},
                    {"pred": "url", "value": "http://acme.test", "warnings": ["Prefer https"]}
                ]
            }]}]}"#,
        );

        assert_eq!(names(profile.properties("Organization")), vec!["name", "url"]);
        assert_eq!(profile.issues().len(), 2);
        assert_eq!(profile.issues()[0].severity, Severity::Error);
        assert_eq!(profile.issues()[0].predicate, "logo");
        assert_eq!(profile.issues()[1].severity, Severity::Warning);
        assert_eq!(profile.issues()[1].schema_type, "Organization");
    }

    #[test]
    fn predicates_merge_across_nodes_of_one_type() {
        let profile = profile_for(
            r#"{"tripleGroups": [
                {"nodes": [{"type": "Product", "properties": [{"pred": "name", "value": "A"}, {"pred": "sku", "value": "1"}]}]},
                {"nodes": [{"type": "Product", "properties": [{"pred": "name", "value": "B"}, {"pred": "offers", "target": "o1"}]}]}
            ]}"#,
        );

        assert_eq!(
            names(profile.properties("Product")),
            vec!["name", "offers", "sku"]
        );
    }

    #[test]
    fn satisfied_on_another_node_survives_an_error() {
        let profile = profile_for(
            r#"{"tripleGroups": [{"nodes": [
                {"type": "Product", "properties": [{"pred": "image", "value": "bad", "errors": ["Invalid"]}]},
                {"type": "Product", "properties": [{"pred": "image", "value": "https://img.test/a.png"}]}
            ]}]}"#,
        );

        assert!(profile.has_property("Product", "image"));
        assert_eq!(profile.issues().len(), 1);
    }

    #[test]
    fn multi_typed_nodes_feed_every_type() {
        let profile = profile_for(
            r#"{"tripleGroups": [{"nodes": [{
                "types": ["https://schema.org/Organization", "LocalBusiness"],
                "properties": [{"pred": "https://schema.org/telephone", "value": "+31"}]
            }]}]}"#,
        );

        assert_eq!(names(profile.properties("Organization")), vec!["telephone"]);
        assert_eq!(names(profile.properties("LocalBusiness")), vec!["telephone"]);
    }

    #[test]
    fn references_are_not_dereferenced() {
        let profile = profile_for(
            r#"{"tripleGroups": [{"nodes": [
                {"nodeId": "org", "type": "Organization", "properties": [{"pred": "address", "target": "addr"}]},
                {"nodeId": "addr", "type": "PostalAddress", "properties": [{"pred": "streetAddress", "value": "Main 1"}]}
            ]}]}"#,
        );

        assert_eq!(names(profile.properties("Organization")), vec!["address"]);
        assert_eq!(names(profile.properties("PostalAddress")), vec!["streetAddress"]);
    }

    #[test]
    fn untyped_nodes_land_in_their_own_bucket() {
        let profile = profile_for(
            r#"{"tripleGroups": [{"nodes": [
                {"properties": [{"pred": "name", "value": "?"}, {"pred": "email", "value": "x", "errors": ["Invalid email"]}]},
                {"type": "WebSite", "properties": []}
            ]}]}"#,
        );

        assert_eq!(names(profile.properties(UNTYPED_BUCKET)), vec!["name"]);
        assert!(profile.has_type("WebSite"));
        assert_eq!(profile.issues()[0].schema_type, UNTYPED_BUCKET);

        let comparable: Vec<&str> = profile
            .comparable_types()
            .map(|(name, _)| name.as_str())
            .collect();
        assert_eq!(comparable, vec!["WebSite"]);
    }

    #[test]
    fn normalize_is_idempotent() {
        let document = decode(
            r#"{"tripleGroups": [{"nodes": [
                {"type": "Recipe", "properties": [
                    {"pred": "recipeIngredient", "value": "flour", "warnings": ["Short"]},
                    {"pred": "image", "errors": ["Missing"]},
                    {"pred": "name", "value": "Bread"}
                ]},
                {"properties": [{"pred": "author", "warnings": ["Unknown type"]}]}
            ]}]}"#,
        )
        .unwrap();

        let first = normalize(&document, PAGE);
        let second = normalize(&document, PAGE);

        assert_eq!(first, second);
        assert_eq!(first.issues(), second.issues());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
