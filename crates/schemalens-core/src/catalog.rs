//! Reference catalog of schema types
//!
//! The catalog is loaded once per run from a [`CatalogSource`] and shared
//! read-only by every comparison. How the required/recommended property sets
//! are sourced is a strategy at the boundary ([`PropertySetSource`]); the
//! diff engine only ever sees resolved [`CanonicalSchemaEntry`] values.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::Deserialize;
use tracing::debug;

use crate::error::CatalogError;
use crate::types::CanonicalSchemaEntry;

/// Produces the catalog rows for a run
pub trait CatalogSource: Send + Sync {
    fn load(&self) -> Result<Vec<CanonicalSchemaEntry>, CatalogError>;
}

/// Supplies property sets for a type when the tabular source has none
pub trait PropertySetSource: Send + Sync {
    fn property_sets(&self, type_name: &str) -> Option<PropertySets>;
}

/// Required/recommended/rich-result sets for one type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySets {
    pub required: BTreeSet<String>,
    pub recommended: BTreeSet<String>,
    pub rich_results: BTreeMap<String, String>,
}

/// Immutable, indexed set of catalog entries
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    entries: Vec<CanonicalSchemaEntry>,
    exact: HashMap<String, usize>,
    folded: HashMap<String, Vec<usize>>,
}

impl ReferenceCatalog {
    /// Index entries; exact duplicate names are rejected.
    pub fn from_entries(entries: Vec<CanonicalSchemaEntry>) -> Result<Self, CatalogError> {
        let mut exact = HashMap::with_capacity(entries.len());
        let mut folded: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            if exact.insert(entry.name.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateEntry(entry.name.clone()));
            }
            folded
                .entry(entry.name.to_lowercase())
                .or_default()
                .push(idx);
        }

        Ok(Self {
            entries,
            exact,
            folded,
        })
    }

    /// Load and index every row of a source in one batch
    pub fn load(source: &dyn CatalogSource) -> Result<Self, CatalogError> {
        let catalog = Self::from_entries(source.load()?)?;
        debug!(entries = catalog.len(), "loaded reference catalog");
        Ok(catalog)
    }

    /// Resolve a type name.
    ///
    /// Exact match first. The case-insensitive fallback only applies when a
    /// single entry matches, so entries differing only in case never merge.
    pub fn lookup(&self, type_name: &str) -> Option<&CanonicalSchemaEntry> {
        if let Some(&idx) = self.exact.get(type_name) {
            return self.entries.get(idx);
        }

        match self.folded.get(&type_name.to_lowercase()).map(Vec::as_slice) {
            Some([idx]) => self.entries.get(*idx),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[CanonicalSchemaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CatalogSource for Vec<CanonicalSchemaEntry> {
    fn load(&self) -> Result<Vec<CanonicalSchemaEntry>, CatalogError> {
        Ok(self.clone())
    }
}

/// Curated table of common rich-result types
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl CatalogSource for BuiltinCatalog {
    fn load(&self) -> Result<Vec<CanonicalSchemaEntry>, CatalogError> {
        Ok(BUILTIN_ENTRIES.clone())
    }
}

impl PropertySetSource for BuiltinCatalog {
    fn property_sets(&self, type_name: &str) -> Option<PropertySets> {
        BUILTIN_ENTRIES
            .iter()
            .find(|entry| entry.name == type_name)
            .map(|entry| PropertySets {
                required: entry.required.clone(),
                recommended: entry.recommended.clone(),
                rich_results: entry.rich_results.clone(),
            })
    }
}

/// Tabular catalog stored as a JSON array of rows
///
/// Rows use the columns `Name`, `Description`, `Schema URL` and
/// `Google Doc URL`, plus optional `Required`, `Recommended` and
/// `Rich Results`. Rows without property columns are completed from the
/// configured [`PropertySetSource`], if any.
pub struct JsonCatalogSource {
    path: PathBuf,
    property_sets: Option<Arc<dyn PropertySetSource>>,
}

impl JsonCatalogSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            property_sets: None,
        }
    }

    pub fn with_property_sets(mut self, source: Arc<dyn PropertySetSource>) -> Self {
        self.property_sets = Some(source);
        self
    }
}

impl CatalogSource for JsonCatalogSource {
    fn load(&self) -> Result<Vec<CanonicalSchemaEntry>, CatalogError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| CatalogError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        entries_from_json(&text, self.property_sets.as_deref())
    }
}

/// Parse tabular JSON rows into catalog entries
pub fn entries_from_json(
    text: &str,
    property_sets: Option<&dyn PropertySetSource>,
) -> Result<Vec<CanonicalSchemaEntry>, CatalogError> {
    let rows: Vec<CatalogRow> = serde_json::from_str(text)?;
    rows.into_iter()
        .enumerate()
        .map(|(row, raw)| raw.into_entry(row + 1, property_sets))
        .collect()
}

#[derive(Deserialize)]
struct CatalogRow {
    #[serde(rename = "Name", alias = "name")]
    name: String,
    #[serde(rename = "Description", alias = "description", default)]
    description: String,
    #[serde(rename = "Schema URL", alias = "schemaUrl", default)]
    schema_url: Option<String>,
    #[serde(rename = "Google Doc URL", alias = "googleDocUrl", default)]
    google_doc_url: Option<String>,
    #[serde(rename = "Required", alias = "required", default)]
    required: Option<PropertyList>,
    #[serde(rename = "Recommended", alias = "recommended", default)]
    recommended: Option<PropertyList>,
    #[serde(rename = "Rich Results", alias = "richResults", default)]
    rich_results: Option<BTreeMap<String, String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PropertyList {
    Items(Vec<String>),
    Delimited(String),
}

impl PropertyList {
    fn into_set(self) -> BTreeSet<String> {
        let items: Vec<String> = match self {
            PropertyList::Items(items) => items,
            PropertyList::Delimited(text) => text
                .split([',', ';', '|'])
                .map(str::to_string)
                .collect(),
        };
        items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }
}

impl CatalogRow {
    fn into_entry(
        self,
        row: usize,
        property_sets: Option<&dyn PropertySetSource>,
    ) -> Result<CanonicalSchemaEntry, CatalogError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(CatalogError::InvalidRow {
                row,
                reason: "empty type name".to_string(),
            });
        }

        let fallback = if self.required.is_none()
            || self.recommended.is_none()
            || self.rich_results.is_none()
        {
            property_sets.and_then(|source| source.property_sets(&name))
        } else {
            None
        }
        .unwrap_or_default();

        let schema_url = non_empty(self.schema_url)
            .unwrap_or_else(|| format!("https://schema.org/{name}"));

        Ok(CanonicalSchemaEntry {
            description: self.description.trim().to_string(),
            schema_url,
            google_doc_url: non_empty(self.google_doc_url),
            required: self
                .required
                .map(PropertyList::into_set)
                .unwrap_or(fallback.required),
            recommended: self
                .recommended
                .map(PropertyList::into_set)
                .unwrap_or(fallback.recommended),
            rich_results: self.rich_results.unwrap_or(fallback.rich_results),
            name,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

const GOOGLE_DOCS: &str = "https://developers.google.com/search/docs/appearance/structured-data";

fn builtin(
    name: &str,
    description: &str,
    google_doc: Option<&str>,
    required: &[&str],
    recommended: &[&str],
    rich_results: &[(&str, &str)],
) -> CanonicalSchemaEntry {
    CanonicalSchemaEntry {
        name: name.to_string(),
        description: description.to_string(),
        schema_url: format!("https://schema.org/{name}"),
        google_doc_url: google_doc.map(|page| format!("{GOOGLE_DOCS}/{page}")),
        required: required.iter().map(|p| p.to_string()).collect(),
        recommended: recommended.iter().map(|p| p.to_string()).collect(),
        rich_results: rich_results
            .iter()
            .map(|(property, feature)| (property.to_string(), feature.to_string()))
            .collect(),
    }
}

static BUILTIN_ENTRIES: Lazy<Vec<CanonicalSchemaEntry>> = Lazy::new(|| {
    vec![
        builtin(
            "Organization",
            "An organization such as a company, NGO or club.",
            Some("organization"),
            &["name", "url"],
            &[
                "address",
                "contactPoint",
                "description",
                "email",
                "founder",
                "foundingDate",
                "logo",
                "memberOf",
                "parentOrganization",
                "serviceArea",
                "telephone",
            ],
            &[
                ("image", "Image Carousel"),
                ("logo", "Organization Knowledge Panel"),
            ],
        ),
        builtin(
            "LocalBusiness",
            "A physical business or branch of an organization.",
            Some("local-business"),
            &["address", "name"],
            &[
                "aggregateRating",
                "department",
                "geo",
                "image",
                "menu",
                "openingHoursSpecification",
                "priceRange",
                "review",
                "telephone",
                "url",
            ],
            &[
                ("aggregateRating", "Review Snippet"),
                ("geo", "Local Business Panel"),
                ("openingHoursSpecification", "Local Business Panel"),
                ("review", "Review Snippet"),
            ],
        ),
        builtin(
            "WebSite",
            "A set of related web pages under a common domain.",
            Some("site-names"),
            &["name", "url"],
            &["alternateName", "potentialAction", "publisher"],
            &[
                ("name", "Site Name"),
                ("potentialAction", "Sitelinks Search Box"),
            ],
        ),
        builtin(
            "WebPage",
            "A single web page.",
            None,
            &[],
            &[
                "breadcrumb",
                "dateModified",
                "datePublished",
                "description",
                "mainEntity",
                "name",
                "primaryImageOfPage",
                "speakable",
            ],
            &[("speakable", "Speakable")],
        ),
        builtin(
            "BreadcrumbList",
            "A chain of linked pages ending at the current page.",
            Some("breadcrumb"),
            &["itemListElement"],
            &[],
            &[("itemListElement", "Breadcrumb")],
        ),
        builtin(
            "Article",
            "A news, sports or blog article.",
            Some("article"),
            &[],
            &[
                "author",
                "dateModified",
                "datePublished",
                "headline",
                "image",
                "publisher",
            ],
            &[("headline", "Article"), ("image", "Top Stories")],
        ),
        builtin(
            "Product",
            "Any offered product or service.",
            Some("product"),
            &["name"],
            &[
                "aggregateRating",
                "brand",
                "description",
                "gtin",
                "image",
                "mpn",
                "offers",
                "review",
                "sku",
            ],
            &[
                ("aggregateRating", "Review Snippet"),
                ("offers", "Product Snippet"),
                ("review", "Review Snippet"),
            ],
        ),
        builtin(
            "FAQPage",
            "A page presenting frequently asked questions and answers.",
            Some("faqpage"),
            &["mainEntity"],
            &[],
            &[("mainEntity", "FAQ")],
        ),
        builtin(
            "Recipe",
            "A recipe with ingredients and instructions.",
            Some("recipe"),
            &["image", "name"],
            &[
                "aggregateRating",
                "author",
                "cookTime",
                "datePublished",
                "description",
                "keywords",
                "nutrition",
                "prepTime",
                "recipeCategory",
                "recipeCuisine",
                "recipeIngredient",
                "recipeInstructions",
                "recipeYield",
                "totalTime",
                "video",
            ],
            &[
                ("aggregateRating", "Review Snippet"),
                ("image", "Recipe"),
                ("video", "Video"),
            ],
        ),
        builtin(
            "Event",
            "An event happening at a certain time and location.",
            Some("event"),
            &["location", "name", "startDate"],
            &[
                "description",
                "endDate",
                "eventAttendanceMode",
                "eventStatus",
                "image",
                "offers",
                "organizer",
                "performer",
            ],
            &[
                ("image", "Event Experience"),
                ("location", "Event Experience"),
                ("startDate", "Event Experience"),
            ],
        ),
        builtin(
            "Review",
            "A review of an item such as a product, place or creative work.",
            Some("review-snippet"),
            &["author", "itemReviewed", "reviewRating"],
            &["datePublished", "publisher", "reviewBody"],
            &[("reviewRating", "Review Snippet")],
        ),
    ]
});
