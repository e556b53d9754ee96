//! Comparative diff engine
//!
//! Two comparisons: a page profile against the reference catalog, and a
//! page profile against the aggregated markup of competitor pages. Every
//! derived structure is rebuilt per call and never patched.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::catalog::ReferenceCatalog;
use crate::recommend::{
    CATALOG_MISSING_TYPE_PRIORITY, competitor_priority, missing_type_priority,
};
use crate::types::{
    DiffResult, PageSchemaProfile, RecommendationItem, RecommendationKind, UNTYPED_BUCKET,
};

/// Default minimum number of competitors that must use a property
pub const DEFAULT_GAP_THRESHOLD: usize = 2;

/// A competitor that could not be analyzed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFetch {
    pub url: String,
    pub reason: String,
}

/// Schema usage statistics across the competitor set for a keyword
#[derive(Debug, Clone, Default)]
pub struct CompetitorAggregate {
    keyword: String,
    profiles: Vec<PageSchemaProfile>,
    requested: usize,
    failed: Vec<FailedFetch>,
    type_frequency: BTreeMap<String, usize>,
    property_frequency: BTreeMap<String, BTreeMap<String, usize>>,
}

impl CompetitorAggregate {
    /// Build the frequency maps from the profiles that were fetched.
    ///
    /// Each competitor counts at most once per type and per (type, property)
    /// pair. The untyped bucket is not aggregated.
    pub fn from_profiles(
        keyword: impl Into<String>,
        profiles: Vec<PageSchemaProfile>,
        requested: usize,
        failed: Vec<FailedFetch>,
    ) -> Self {
        let mut type_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut property_frequency: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();

        for profile in &profiles {
            for (schema_type, properties) in profile.comparable_types() {
                *type_frequency.entry(schema_type.clone()).or_insert(0) += 1;
                let per_type = property_frequency.entry(schema_type.clone()).or_default();
                for property in properties {
                    *per_type.entry(property.clone()).or_insert(0) += 1;
                }
            }
        }

        Self {
            keyword: keyword.into(),
            profiles,
            requested,
            failed,
            type_frequency,
            property_frequency,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn profiles(&self) -> &[PageSchemaProfile] {
        &self.profiles
    }

    /// Number of competitor profiles that were analyzed
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Number of competitor URLs that were asked for
    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn failed(&self) -> &[FailedFetch] {
        &self.failed
    }

    pub fn type_frequencies(&self) -> &BTreeMap<String, usize> {
        &self.type_frequency
    }

    pub fn property_frequencies(&self) -> &BTreeMap<String, BTreeMap<String, usize>> {
        &self.property_frequency
    }

    pub fn type_frequency(&self, schema_type: &str) -> usize {
        self.type_frequency.get(schema_type).copied().unwrap_or(0)
    }

    pub fn property_frequency(&self, schema_type: &str, property: &str) -> usize {
        self.property_frequency
            .get(schema_type)
            .and_then(|properties| properties.get(property))
            .copied()
            .unwrap_or(0)
    }
}

/// Compare every resolvable type of a profile with its catalog entry
pub fn diff_against_catalog(
    profile: &PageSchemaProfile,
    catalog: &ReferenceCatalog,
) -> BTreeMap<String, DiffResult> {
    let mut diffs = BTreeMap::new();

    for (schema_type, present) in profile.comparable_types() {
        let Some(entry) = catalog.lookup(schema_type) else {
            info!(schema_type = %schema_type, "no catalog guidance for type");
            continue;
        };

        let documented = entry.documented_properties();
        let result = DiffResult {
            schema_type: schema_type.clone(),
            missing_required: entry.required.difference(present).cloned().collect(),
            missing_recommended: entry.recommended.difference(present).cloned().collect(),
            extra: present
                .iter()
                .filter(|property| !documented.contains(property.as_str()))
                .cloned()
                .collect(),
            rich_result_opportunities: entry
                .rich_results
                .iter()
                .filter(|(property, _)| !present.contains(*property))
                .map(|(property, feature)| (property.clone(), feature.clone()))
                .collect(),
        };

        debug!(
            schema_type = %schema_type,
            missing_required = result.missing_required.len(),
            missing_recommended = result.missing_recommended.len(),
            rich_results = result.rich_result_opportunities.len(),
            "diffed type against catalog"
        );
        diffs.insert(schema_type.clone(), result);
    }

    diffs
}

/// Observed types the catalog has no entry for
pub fn unresolved_types(profile: &PageSchemaProfile, catalog: &ReferenceCatalog) -> Vec<String> {
    profile
        .comparable_types()
        .filter(|(schema_type, _)| catalog.lookup(schema_type).is_none())
        .map(|(schema_type, _)| schema_type.clone())
        .collect()
}

/// Properties enough competitors use that the page lacks
///
/// Returns an empty list when no competitor profile is available.
pub fn diff_against_competitors(
    profile: &PageSchemaProfile,
    aggregate: &CompetitorAggregate,
    threshold: usize,
) -> Vec<RecommendationItem> {
    if aggregate.is_empty() {
        return Vec::new();
    }

    let threshold = threshold.max(1);
    let total = aggregate.len();
    let mut gaps = Vec::new();

    for (schema_type, properties) in aggregate.property_frequencies() {
        for (property, &count) in properties {
            if count < threshold || profile.has_property(schema_type, property) {
                continue;
            }

            gaps.push(RecommendationItem {
                kind: RecommendationKind::CompetitorGap,
                schema_type: schema_type.clone(),
                property: Some(property.clone()),
                rationale: format!(
                    "{count} of {total} competitor pages for \"{}\" set `{property}` \
                     on {schema_type}; this page does not.",
                    aggregate.keyword()
                ),
                source_urls: Vec::new(),
                catalog_backed: false,
                priority: competitor_priority(count, total),
            });
        }
    }

    gaps
}

/// Types enough competitors use that the page does not declare at all
pub fn missing_types_against_competitors(
    profile: &PageSchemaProfile,
    aggregate: &CompetitorAggregate,
    threshold: usize,
) -> Vec<RecommendationItem> {
    if aggregate.is_empty() {
        return Vec::new();
    }

    let threshold = threshold.max(1);
    let total = aggregate.len();

    aggregate
        .type_frequencies()
        .iter()
        .filter(|(schema_type, count)| {
            **count >= threshold
                && schema_type.as_str() != UNTYPED_BUCKET
                && !profile.has_type(schema_type)
        })
        .map(|(schema_type, &count)| RecommendationItem {
            kind: RecommendationKind::MissingType,
            schema_type: schema_type.clone(),
            property: None,
            rationale: format!(
                "{count} of {total} competitor pages for \"{}\" declare {schema_type}; \
                 this page does not.",
                aggregate.keyword()
            ),
            source_urls: Vec::new(),
            catalog_backed: false,
            priority: missing_type_priority(count, total),
        })
        .collect()
}

/// Catalog types that unlock rich results and are absent from the page
///
/// Needs no competitor data, so a catalog-only run still suggests types.
pub fn missing_types_against_catalog(
    profile: &PageSchemaProfile,
    catalog: &ReferenceCatalog,
) -> Vec<RecommendationItem> {
    catalog
        .entries()
        .iter()
        .filter(|entry| !entry.rich_results.is_empty() && !profile.has_type(&entry.name))
        .map(|entry| {
            let features: BTreeSet<&str> =
                entry.rich_results.values().map(String::as_str).collect();
            let features: Vec<&str> = features.into_iter().collect();
            RecommendationItem {
                kind: RecommendationKind::MissingType,
                schema_type: entry.name.clone(),
                property: None,
                rationale: format!(
                    "This page declares no {}; adding it enables {}.",
                    entry.name,
                    features.join(", ")
                ),
                source_urls: Vec::new(),
                catalog_backed: false,
                priority: CATALOG_MISSING_TYPE_PRIORITY,
            }
        })
        .collect()
}
