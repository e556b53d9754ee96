//! Recommendation generation
//!
//! Merges catalog diffs and competitor evidence into one prioritized list.
//! Each (type, property) pair yields a single item; when several kinds
//! target the same pair, the kind with the higher precedence wins and the
//! other evidence is folded into its rationale.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::catalog::ReferenceCatalog;
use crate::types::{DiffResult, RecommendationItem, RecommendationKind};

pub const MISSING_REQUIRED_PRIORITY: u8 = 90;
pub const RICH_RESULT_PRIORITY: u8 = 75;
pub const MISSING_RECOMMENDED_PRIORITY: u8 = 30;
/// Missing type with only the catalog behind it; below any competitor score
pub const CATALOG_MISSING_TYPE_PRIORITY: u8 = 35;
pub const UNRECOGNIZED_PRIORITY: u8 = 10;

const COMPETITOR_GAP_BASE: u8 = 40;
const COMPETITOR_GAP_SPAN: u32 = 40;
const MISSING_TYPE_BASE: u8 = 55;
const MISSING_TYPE_SPAN: u32 = 35;

/// Score for a property used by `count` of `total` competitors
pub fn competitor_priority(count: usize, total: usize) -> u8 {
    COMPETITOR_GAP_BASE + share_points(count, total, COMPETITOR_GAP_SPAN)
}

/// Score for a type declared by `count` of `total` competitors
pub fn missing_type_priority(count: usize, total: usize) -> u8 {
    MISSING_TYPE_BASE + share_points(count, total, MISSING_TYPE_SPAN)
}

fn share_points(count: usize, total: usize, span: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let count = count.min(total) as u64;
    let total = total as u64;
    ((count * u64::from(span) + total / 2) / total) as u8
}

/// Produce the ordered recommendation list for one run
pub fn generate(
    diffs: &BTreeMap<String, DiffResult>,
    competitor_items: &[RecommendationItem],
    catalog: &ReferenceCatalog,
) -> Vec<RecommendationItem> {
    let mut merged: BTreeMap<(String, Option<String>), RecommendationItem> = BTreeMap::new();

    for (schema_type, diff) in diffs {
        for property in &diff.missing_required {
            offer(
                &mut merged,
                catalog_item(
                    RecommendationKind::MissingRequiredProperty,
                    schema_type,
                    property,
                    format!(
                        "`{property}` is required for {schema_type} and is missing or invalid \
                         on this page."
                    ),
                    MISSING_REQUIRED_PRIORITY,
                ),
            );
        }

        for (property, feature) in &diff.rich_result_opportunities {
            offer(
                &mut merged,
                catalog_item(
                    RecommendationKind::RichResultOpportunity,
                    schema_type,
                    property,
                    format!(
                        "Adding `{property}` to {schema_type} makes the page eligible for the \
                         {feature} rich result."
                    ),
                    RICH_RESULT_PRIORITY,
                ),
            );
        }

        for property in &diff.missing_recommended {
            offer(
                &mut merged,
                catalog_item(
                    RecommendationKind::MissingRecommendedProperty,
                    schema_type,
                    property,
                    format!("`{property}` is recommended for {schema_type}."),
                    MISSING_RECOMMENDED_PRIORITY,
                ),
            );
        }

        for property in &diff.extra {
            offer(
                &mut merged,
                catalog_item(
                    RecommendationKind::UnrecognizedProperty,
                    schema_type,
                    property,
                    format!(
                        "`{property}` is not a documented {schema_type} property in the \
                         reference catalog."
                    ),
                    UNRECOGNIZED_PRIORITY,
                ),
            );
        }
    }

    for item in competitor_items {
        offer(&mut merged, item.clone());
    }

    let mut items: Vec<RecommendationItem> = merged
        .into_values()
        .map(|item| attach_sources(item, catalog))
        .collect();
    sort_recommendations(&mut items);
    items
}

/// Order by priority descending, then kind precedence, property, type
pub fn sort_recommendations(items: &mut [RecommendationItem]) {
    items.sort_by(compare_items);
}

pub fn compare_items(a: &RecommendationItem, b: &RecommendationItem) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.kind.precedence().cmp(&b.kind.precedence()))
        .then_with(|| a.property.cmp(&b.property))
        .then_with(|| a.schema_type.cmp(&b.schema_type))
}

fn catalog_item(
    kind: RecommendationKind,
    schema_type: &str,
    property: &str,
    rationale: String,
    priority: u8,
) -> RecommendationItem {
    RecommendationItem {
        kind,
        schema_type: schema_type.to_string(),
        property: Some(property.to_string()),
        rationale,
        source_urls: Vec::new(),
        catalog_backed: false,
        priority,
    }
}

fn offer(
    merged: &mut BTreeMap<(String, Option<String>), RecommendationItem>,
    candidate: RecommendationItem,
) {
    let key = (candidate.schema_type.clone(), candidate.property.clone());
    let Some(existing) = merged.remove(&key) else {
        merged.insert(key, candidate);
        return;
    };

    let (mut winner, loser) = if candidate.kind.precedence() < existing.kind.precedence() {
        (candidate, existing)
    } else {
        (existing, candidate)
    };
    winner.priority = winner.priority.max(loser.priority);
    winner.rationale = format!("{} Also: {}", winner.rationale, loser.rationale);
    merged.insert(key, winner);
}

fn attach_sources(mut item: RecommendationItem, catalog: &ReferenceCatalog) -> RecommendationItem {
    match catalog.lookup(&item.schema_type) {
        Some(entry) => {
            item.source_urls = entry.source_urls();
            item.catalog_backed = true;
            if item.kind == RecommendationKind::MissingType && !entry.description.is_empty() {
                item.rationale = format!("{} {}", item.rationale, entry.description);
            }
        }
        None => {
            item.source_urls.clear();
            item.catalog_backed = false;
        }
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BuiltinCatalog;
    use crate::diff::{
        CompetitorAggregate, diff_against_catalog, diff_against_competitors,
        missing_types_against_catalog, missing_types_against_competitors,
    };
    use crate::types::PageSchemaProfile;

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

    fn builtin() -> ReferenceCatalog {
        ReferenceCatalog::load(&BuiltinCatalog).unwrap()
    }

    fn assert_ordered(items: &[RecommendationItem]) {
        for pair in items.windows(2) {
            assert!(pair[0].priority >= pair[1].priority, "{pair:?}");
            if pair[0].priority == pair[1].priority {
                assert!(pair[0].kind.precedence() <= pair[1].kind.precedence(), "{pair:?}");
            }
        }
    }

    #[test]
    fn priority_scores_scale_with_competitor_share() {
        assert_eq!(competitor_priority(2, 3), 67);
        assert_eq!(competitor_priority(3, 3), 80);
        assert_eq!(competitor_priority(5, 3), 80);
        assert_eq!(competitor_priority(1, 0), 40);
        assert_eq!(missing_type_priority(10, 10), 90);
    }

    #[test]
    fn output_is_ordered_by_priority_then_kind() {
        let catalog = builtin();
        let page = profile(
            "https://mine.test",
            &[
                ("Organization", &["name", "slogan"]),
                ("Product", &["image"]),
                ("Event", &["name"]),
            ],
        );
        let aggregate = CompetitorAggregate::from_profiles(
            "kw",
            vec![
                profile(
                    "https://a.test",
                    &[("Product", &["name", "offers", "color"]), ("FAQPage", &["mainEntity"])],
                ),
                profile(
                    "https://b.test",
                    &[("Product", &["name", "color"]), ("FAQPage", &["mainEntity"])],
                ),
            ],
            2,
            Vec::new(),
        );

        let mut competitor_items = diff_against_competitors(&page, &aggregate, 2);
        competitor_items.extend(missing_types_against_competitors(&page, &aggregate, 2));

        let items = generate(&diff_against_catalog(&page, &catalog), &competitor_items, &catalog);

        assert!(!items.is_empty());
        assert_ordered(&items);
        assert_eq!(items[0].kind, RecommendationKind::MissingRequiredProperty);

        let mut permuted = items.clone();
        permuted.reverse();
        sort_recommendations(&mut permuted);
        assert_eq!(permuted, items);
    }

    #[test]
    fn equal_scores_fall_back_to_kind_then_property() {
        let mut items = vec![
            RecommendationItem {
                kind: RecommendationKind::UnrecognizedProperty,
                schema_type: "A".to_string(),
                property: Some("a".to_string()),
                rationale: String::new(),
                source_urls: Vec::new(),
                catalog_backed: false,
                priority: 50,
            },
            RecommendationItem {
                kind: RecommendationKind::CompetitorGap,
                schema_type: "A".to_string(),
                property: Some("z".to_string()),
                rationale: String::new(),
                source_urls: Vec::new(),
                catalog_backed: false,
                priority: 50,
            },
            RecommendationItem {
                kind: RecommendationKind::CompetitorGap,
                schema_type: "A".to_string(),
                property: Some("b".to_string()),
                rationale: String::new(),
                source_urls: Vec::new(),
                catalog_backed: false,
                priority: 50,
            },
        ];

        sort_recommendations(&mut items);
        let order: Vec<&str> = items
            .iter()
            .map(|item| item.property.as_deref().unwrap())
            .collect();
        assert_eq!(order, vec!["b", "z", "a"]);
    }

    #[test]
    fn competitor_gap_supersedes_recommended_and_keeps_sources() {
        let catalog = builtin();
        let page = profile("https://mine.test", &[("Organization", &["name", "url"])]);
        let aggregate = CompetitorAggregate::from_profiles(
            "kw",
            vec![
                profile("https://a.test", &[("Organization", &["name", "telephone"])]),
                profile("https://b.test", &[("Organization", &["telephone"])]),
            ],
            2,
            Vec::new(),
        );

        let gaps = diff_against_competitors(&page, &aggregate, 2);
        let items = generate(&diff_against_catalog(&page, &catalog), &gaps, &catalog);

        let telephone: Vec<&RecommendationItem> = items
            .iter()
            .filter(|item| item.property.as_deref() == Some("telephone"))
            .collect();
        assert_eq!(telephone.len(), 1);
        assert_eq!(telephone[0].kind, RecommendationKind::CompetitorGap);
        assert!(telephone[0].catalog_backed);
        assert_eq!(
            telephone[0].source_urls,
            vec![
                "https://schema.org/Organization".to_string(),
                "https://developers.google.com/search/docs/appearance/structured-data/organization"
                    .to_string(),
            ]
        );
        assert!(telephone[0].rationale.contains("recommended"));
        assert_eq!(telephone[0].priority, competitor_priority(2, 2));
    }

    #[test]
    fn required_rich_result_pair_is_emitted_once() {
        let catalog = builtin();
        let page = profile("https://mine.test", &[("FAQPage", &[])]);

        let items = generate(&diff_against_catalog(&page, &catalog), &[], &catalog);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, RecommendationKind::MissingRequiredProperty);
        assert_eq!(items[0].priority, MISSING_REQUIRED_PRIORITY);
        assert!(items[0].rationale.contains("FAQ rich result"));
    }

    #[test]
    fn items_without_catalog_entry_are_flagged_not_dropped() {
        let catalog = builtin();
        let page = profile("https://mine.test", &[("WidgetGizmo", &["name"])]);
        let aggregate = CompetitorAggregate::from_profiles(
            "kw",
            vec![
                profile("https://a.test", &[("WidgetGizmo", &["name", "spin"])]),
                profile("https://b.test", &[("WidgetGizmo", &["spin"])]),
            ],
            2,
            Vec::new(),
        );

        let gaps = diff_against_competitors(&page, &aggregate, 2);
        let items = generate(&diff_against_catalog(&page, &catalog), &gaps, &catalog);

        assert_eq!(items.len(), 1);
        assert!(!items[0].catalog_backed);
        assert!(items[0].source_urls.is_empty());
    }

    #[test]
    fn catalog_only_run_still_recommends() {
        let catalog = builtin();
        let page = profile("https://mine.test", &[("Organization", &["name"])]);
        let empty = CompetitorAggregate::from_profiles("kw", Vec::new(), 10, Vec::new());

        let gaps = diff_against_competitors(&page, &empty, 2);
        assert!(gaps.is_empty());

        let items = generate(&diff_against_catalog(&page, &catalog), &gaps, &catalog);
        assert!(!items.is_empty());
        assert!(items.iter().all(|item| item.catalog_backed));
        assert_ordered(&items);
    }

    #[test]
    fn missing_types_carry_catalog_description() {
        let catalog = builtin();
        let page = profile("https://mine.test", &[("WebPage", &["name"])]);
        let aggregate = CompetitorAggregate::from_profiles(
            "kw",
            vec![
                profile("https://a.test", &[("BreadcrumbList", &["itemListElement"])]),
                profile("https://b.test", &[("BreadcrumbList", &["itemListElement"])]),
            ],
            2,
            Vec::new(),
        );

        let missing = missing_types_against_competitors(&page, &aggregate, 2);
        let items = generate(&BTreeMap::new(), &missing, &catalog);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, RecommendationKind::MissingType);
        assert!(items[0].rationale.contains("chain of linked pages"));
        assert_eq!(items[0].priority, 90);
    }

    #[test]
    fn competitor_backed_missing_type_absorbs_catalog_suggestion() {
        let catalog = builtin();
        let page = profile("https://mine.test", &[("WebPage", &["name"])]);
        let aggregate = CompetitorAggregate::from_profiles(
            "kw",
            vec![
                profile("https://a.test", &[("BreadcrumbList", &["itemListElement"])]),
                profile("https://b.test", &[("BreadcrumbList", &["itemListElement"])]),
            ],
            2,
            Vec::new(),
        );

        let mut competitor_items = missing_types_against_competitors(&page, &aggregate, 2);
        competitor_items.extend(missing_types_against_catalog(&page, &catalog));
        let items = generate(&BTreeMap::new(), &competitor_items, &catalog);

        let breadcrumbs: Vec<&RecommendationItem> = items
            .iter()
            .filter(|item| item.schema_type == "BreadcrumbList")
            .collect();
        assert_eq!(breadcrumbs.len(), 1);
        assert_eq!(breadcrumbs[0].priority, missing_type_priority(2, 2));
        assert!(breadcrumbs[0].rationale.starts_with("2 of 2"));
        assert!(breadcrumbs[0].rationale.contains("Also:"));

        let faq = items
            .iter()
            .find(|item| item.schema_type == "FAQPage")
            .unwrap();
        assert_eq!(faq.kind, RecommendationKind::MissingType);
        assert_eq!(faq.priority, CATALOG_MISSING_TYPE_PRIORITY);
        assert!(faq.catalog_backed);
        assert!(!items.iter().any(|item| item.schema_type == "WebPage"));
        assert_eq!(items[0].schema_type, "BreadcrumbList");
        assert_ordered(&items);
    }
}
