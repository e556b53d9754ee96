//! Argument handling and wiring for the `schemalens` binary
//!
//! Kept in a library so parsing, configuration layering and summary
//! rendering can be tested without running the binary.

pub mod settings;
pub mod summary;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use schemalens_core::{
    Analyzer, BuiltinCatalog, JsonCatalogSource, JsonLdPageValidator,
    RankedSearchProvider, ReferenceCatalog, SchemaOrgValidator, StaticRankedList,
    StructuredDataValidator, ValueSerpProvider,
};
use tracing::warn;
use url::Url;

pub use settings::{Settings, ValidatorKind};

/// Audit a page's schema.org markup against a reference catalog and the
/// pages that rank for a keyword
#[derive(Debug, Parser)]
#[command(name = "schemalens", version, about)]
pub struct Cli {
    /// Page to audit
    pub url: String,

    /// Search keyword used to find competitor pages
    pub keyword: String,

    /// ValueSerp API key for competitor search
    #[arg(long, env = "VALUESERP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Competitor URL to use instead of a search (repeatable)
    #[arg(long = "competitor", value_name = "URL")]
    pub competitors: Vec<String>,

    /// Number of competitor pages to analyze
    #[arg(short = 'n', long)]
    pub competitor_count: Option<usize>,

    /// Maximum concurrent validator fetches
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Competitors that must use a property before it is recommended
    #[arg(long)]
    pub gap_threshold: Option<usize>,

    /// Per-fetch timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Structured-data source
    #[arg(long, value_enum)]
    pub validator: Option<ValidatorKind>,

    /// JSON catalog file (defaults to the built-in catalog)
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print a text summary instead of JSON
    #[arg(short, long)]
    pub summary: bool,

    /// Also write the output to a file
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,
}

impl Cli {
    /// Layer command-line flags over loaded settings
    pub fn apply(&self, mut settings: Settings) -> Settings {
        let analysis = &mut settings.analysis;
        if let Some(count) = self.competitor_count {
            analysis.competitor_count = count;
        }
        if let Some(concurrency) = self.concurrency {
            analysis.competitor_fetch_concurrency = concurrency;
        }
        if let Some(threshold) = self.gap_threshold {
            analysis.competitor_gap_threshold = threshold;
        }
        if let Some(timeout) = self.timeout_ms {
            analysis.fetch_timeout_ms = Some(timeout);
        }
        if let Some(kind) = self.validator {
            settings.validator.kind = kind;
        }
        if let Some(path) = &self.catalog {
            settings.catalog.path = Some(path.clone());
        }
        if let Some(key) = &self.api_key {
            settings.search.api_key = Some(key.clone());
        }
        settings
    }

    /// The input URL, checked for a usable scheme and host
    pub fn input_url(&self) -> Result<Url> {
        let parsed = Url::parse(&self.url).context("invalid URL")?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("unsupported URL scheme: {}", parsed.scheme());
        }
        Ok(parsed)
    }
}

/// Load the reference catalog named by the settings
pub fn load_catalog(settings: &Settings) -> Result<ReferenceCatalog> {
    match &settings.catalog.path {
        Some(path) => {
            let source = JsonCatalogSource::new(path).with_property_sets(Arc::new(BuiltinCatalog));
            ReferenceCatalog::load(&source)
                .with_context(|| format!("failed to load catalog {}", path.display()))
        }
        None => ReferenceCatalog::load(&BuiltinCatalog).context("failed to load built-in catalog"),
    }
}

fn build_search(cli: &Cli, settings: &Settings) -> Result<Arc<dyn RankedSearchProvider>> {
    if !cli.competitors.is_empty() {
        return Ok(Arc::new(StaticRankedList::new(cli.competitors.clone())));
    }

    match &settings.search.api_key {
        Some(key) if !key.trim().is_empty() => {
            let provider = match &settings.search.endpoint {
                Some(endpoint) => ValueSerpProvider::with_endpoint(key.trim(), endpoint),
                None => ValueSerpProvider::new(key.trim()),
            };
            Ok(Arc::new(provider?))
        }
        _ => {
            warn!("no search API key or competitor URLs; running against the catalog only");
            Ok(Arc::new(StaticRankedList::default()))
        }
    }
}

fn build_validator(settings: &Settings) -> Result<Arc<dyn StructuredDataValidator>> {
    let validator: Arc<dyn StructuredDataValidator> = match settings.validator.kind {
        ValidatorKind::SchemaOrg => Arc::new(match &settings.validator.endpoint {
            Some(endpoint) => SchemaOrgValidator::with_endpoint(endpoint)?,
            None => SchemaOrgValidator::new()?,
        }),
        ValidatorKind::JsonLd => Arc::new(JsonLdPageValidator::new()?),
    };
    Ok(validator)
}

/// Wire collaborators, catalog and options into an [`Analyzer`]
pub fn build_analyzer(cli: &Cli, settings: &Settings) -> Result<Analyzer> {
    let catalog = Arc::new(load_catalog(settings)?);
    let search = build_search(cli, settings)?;
    let validator = build_validator(settings)?;

    Ok(Analyzer::new(search, validator, catalog).with_options(settings.analysis.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("schemalens").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn url_and_keyword_are_required() {
        assert!(Cli::try_parse_from(["schemalens"]).is_err());
        assert!(Cli::try_parse_from(["schemalens", "https://shop.test"]).is_err());

        let cli = parse(&["https://shop.test/shoes", "running shoes"]);
        assert_eq!(cli.url, "https://shop.test/shoes");
        assert_eq!(cli.keyword, "running shoes");
        assert!(!cli.summary);
    }

    #[test]
    fn flags_override_settings() {
        let cli = parse(&[
            "https://shop.test",
            "kw",
            "-n",
            "4",
            "--gap-threshold",
            "3",
            "--timeout-ms",
            "500",
            "--validator",
            "json-ld",
            "--competitor",
            "https://a.test",
            "--competitor",
            "https://b.test",
            "--summary",
        ]);

        let settings = cli.apply(Settings::default());
        assert_eq!(settings.analysis.competitor_count, 4);
        assert_eq!(settings.analysis.competitor_gap_threshold, 3);
        assert_eq!(settings.analysis.competitor_fetch_concurrency, 5);
        assert_eq!(settings.analysis.fetch_timeout_ms, Some(500));
        assert_eq!(settings.validator.kind, ValidatorKind::JsonLd);
        assert_eq!(cli.competitors, vec!["https://a.test", "https://b.test"]);
        assert!(cli.summary);
    }

    #[test]
    fn unset_flags_keep_configured_values() {
        let cli = parse(&["https://shop.test", "kw"]);
        let mut configured = Settings::default();
        configured.analysis.competitor_count = 7;

        let settings = cli.apply(configured);
        assert_eq!(settings.analysis.competitor_count, 7);
    }

    #[test]
    fn rejects_non_http_urls() {
        assert!(parse(&["ftp://shop.test/", "kw"]).input_url().is_err());
        assert!(parse(&["not a url", "kw"]).input_url().is_err());
        assert!(parse(&["https://shop.test/", "kw"]).input_url().is_ok());
    }

    #[test]
    fn catalog_file_is_filled_from_builtin_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"[{"Name": "Product", "Description": "Products", "Schema URL": "https://schema.org/Product"}]"#,
        )
        .unwrap();

        let mut settings = Settings::default();
        settings.catalog.path = Some(path);
        let catalog = load_catalog(&settings).unwrap();

        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup("Product").unwrap().required.contains("name"));
    }
}
