//! # schemalens-core
//!
//! Core library for auditing a page's schema.org markup against a reference
//! catalog and against the pages that rank for a keyword.
//!
//! This library provides:
//! - Decoding of structured-data validator reports into a graph document
//! - Normalization of that graph into a per-type property profile
//! - Set-difference against a reference catalog and a competitor aggregate
//! - Prioritized, deduplicated recommendations
//!
//! ## Features
//!
//! - `default`: Pure pipeline with no network dependencies
//! - `http-providers`: Bundled schema.org validator, ValueSerp search and
//!   local JSON-LD page fetcher
//!
//! ## Example
//!
//! ```
//! use schemalens_core::{
//!     BuiltinCatalog, ReferenceCatalog, decode, diff_against_catalog, normalize,
//! };
//!
//! let body = r#")]}'
//! {"tripleGroups": [{"nodes": [
//!     {"type": "Organization", "properties": [{"pred": "name", "value": "Acme"}]}
//! ]}]}"#;
//!
//! let document = decode(body).unwrap();
//! let profile = normalize(&document, "https://acme.test/");
//! let catalog = ReferenceCatalog::load(&BuiltinCatalog).unwrap();
//! let diffs = diff_against_catalog(&profile, &catalog);
//!
//! assert!(diffs["Organization"].missing_required.contains("url"));
//! ```

pub mod analysis;
pub mod catalog;
pub mod decoder;
pub mod diff;
pub mod error;
pub mod issues;
pub mod jsonld;
pub mod normalizer;
pub mod recommend;
pub mod report;
pub mod types;
pub mod url_utils;

#[cfg(feature = "http-providers")]
pub mod providers;

// Re-export commonly used types
pub use analysis::{
    AnalysisOptions, Analyzer, RankedSearchProvider, StaticRankedList, StructuredDataValidator,
};
pub use catalog::{
    BuiltinCatalog, CatalogSource, JsonCatalogSource, PropertySetSource, PropertySets,
    ReferenceCatalog,
};
pub use decoder::decode;
pub use diff::{
    CompetitorAggregate, FailedFetch, diff_against_catalog, diff_against_competitors,
};
pub use error::{AnalysisError, CatalogError, Result};
pub use issues::classify;
pub use normalizer::normalize;
pub use recommend::generate;
pub use report::{CompetitorReport, Report};
pub use types::{
    CanonicalSchemaEntry, ClassifiedIssue, DiffResult, PageSchemaProfile, RecommendationItem,
    RecommendationKind, SchemaGraphDocument, Severity,
};

#[cfg(feature = "http-providers")]
pub use providers::{JsonLdPageValidator, SchemaOrgValidator, ValueSerpProvider};
