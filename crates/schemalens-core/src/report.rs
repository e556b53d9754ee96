//! The terminal output of an analysis run

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::diff::{CompetitorAggregate, FailedFetch};
use crate::types::{ClassifiedIssue, DiffResult, PageSchemaProfile, RecommendationItem};

/// Structured result of one analysis run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub input_url: String,
    pub keyword: String,
    /// Serialized as the bare type → properties map
    #[serde(serialize_with = "serialize_profile_types")]
    pub profile: PageSchemaProfile,
    pub diffs: BTreeMap<String, DiffResult>,
    /// Observed types without catalog guidance
    pub unresolved_types: Vec<String>,
    pub issues: Vec<ClassifiedIssue>,
    pub competitors: CompetitorReport,
    pub recommendations: Vec<RecommendationItem>,
    /// No competitor profile could be analyzed
    pub competitor_data_unavailable: bool,
    /// Fewer competitor profiles than requested were analyzed
    pub competitor_data_incomplete: bool,
}

/// Competitor section of the report
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorReport {
    pub requested: usize,
    pub analyzed: usize,
    pub failed: Vec<FailedFetch>,
    pub summaries: Vec<CompetitorSummary>,
    pub type_usage: Vec<TypeUsage>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitorSummary {
    pub url: String,
    pub types: Vec<String>,
    pub property_count: usize,
}

/// How many competitors declare a type
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeUsage {
    pub schema_type: String,
    pub usage_count: usize,
    pub percentage: f64,
}

impl CompetitorReport {
    pub fn from_aggregate(aggregate: &CompetitorAggregate) -> Self {
        let summaries = aggregate
            .profiles()
            .iter()
            .map(|profile| CompetitorSummary {
                url: profile.url().to_string(),
                types: profile
                    .comparable_types()
                    .map(|(name, _)| name.clone())
                    .collect(),
                property_count: profile
                    .comparable_types()
                    .map(|(_, properties)| properties.len())
                    .sum(),
            })
            .collect();

        let analyzed = aggregate.len();
        let mut type_usage: Vec<TypeUsage> = aggregate
            .type_frequencies()
            .iter()
            .map(|(schema_type, &usage_count)| TypeUsage {
                schema_type: schema_type.clone(),
                usage_count,
                percentage: if analyzed == 0 {
                    0.0
                } else {
                    usage_count as f64 * 100.0 / analyzed as f64
                },
            })
            .collect();
        type_usage.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.schema_type.cmp(&b.schema_type))
        });

        Self {
            requested: aggregate.requested(),
            analyzed,
            failed: aggregate.failed().to_vec(),
            summaries,
            type_usage,
        }
    }
}

impl Report {
    pub fn assemble(
        input_url: impl Into<String>,
        profile: PageSchemaProfile,
        diffs: BTreeMap<String, DiffResult>,
        unresolved_types: Vec<String>,
        aggregate: &CompetitorAggregate,
        recommendations: Vec<RecommendationItem>,
        search_failed: bool,
    ) -> Self {
        let competitors = CompetitorReport::from_aggregate(aggregate);
        let competitor_data_unavailable = aggregate.is_empty();
        let competitor_data_incomplete = search_failed
            || !aggregate.failed().is_empty()
            || aggregate.len() < aggregate.requested();

        Self {
            input_url: input_url.into(),
            keyword: aggregate.keyword().to_string(),
            issues: profile.issues().to_vec(),
            profile,
            diffs,
            unresolved_types,
            competitors,
            recommendations,
            competitor_data_unavailable,
            competitor_data_incomplete,
        }
    }
}

fn serialize_profile_types<S: Serializer>(
    profile: &PageSchemaProfile,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    profile.types().serialize(serializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(url: &str, types: &[(&str, &[&str])]) -> PageSchemaProfile {
        let types = types
            .iter()
            .map(|(name, props)| {
                (
                    name.to_string(),
                    props.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect();
        PageSchemaProfile::new(url, types, Vec::new())
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let aggregate = CompetitorAggregate::from_profiles(
            "running shoes",
            vec![
                profile(
                    "https://a.test",
                    &[("Product", &["name", "offers"]), ("BreadcrumbList", &[])],
                ),
                profile("https://b.test", &[("Product", &["name"])]),
            ],
            3,
            vec![FailedFetch {
                url: "https://c.test".to_string(),
                reason: "timed out".to_string(),
            }],
        );
        let report = Report::assemble(
            "https://mine.test",
            profile("https://mine.test", &[("Product", &["name"])]),
            BTreeMap::new(),
            Vec::new(),
            &aggregate,
            Vec::new(),
            false,
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["inputUrl"], "https://mine.test");
        assert_eq!(json["keyword"], "running shoes");
        assert_eq!(json["profile"]["Product"][0], "name");
        assert!(json["profile"].get("url").is_none());
        assert!(json["profile"].get("types").is_none());
        assert_eq!(json["competitors"]["requested"], 3);
        assert_eq!(json["competitors"]["analyzed"], 2);
        assert_eq!(json["competitors"]["failed"][0]["url"], "https://c.test");
        assert_eq!(json["competitors"]["typeUsage"][0]["schemaType"], "Product");
        assert_eq!(json["competitors"]["typeUsage"][0]["percentage"], 100.0);
        assert_eq!(json["competitors"]["summaries"][0]["propertyCount"], 2);
        assert_eq!(json["competitorDataUnavailable"], false);
        assert_eq!(json["competitorDataIncomplete"], true);
        assert!(json["recommendations"].as_array().unwrap().is_empty());
    }

    #[test]
    fn empty_competitor_set_is_flagged() {
        let aggregate = CompetitorAggregate::from_profiles("kw", Vec::new(), 10, Vec::new());
        let report = Report::assemble(
            "https://mine.test",
            profile("https://mine.test", &[]),
            BTreeMap::new(),
            Vec::new(),
            &aggregate,
            Vec::new(),
            true,
        );

        assert!(report.competitor_data_unavailable);
        assert!(report.competitor_data_incomplete);
        assert_eq!(report.competitors.analyzed, 0);
    }
}
