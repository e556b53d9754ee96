//! Analysis pipeline
//!
//! Fetches the input page and the competitor pages through the configured
//! collaborators, runs each body through decode → normalize, and diffs the
//! result against the catalog and the competitor aggregate.
//!
//! Every validator fetch (input and competitors) shares one concurrency
//! limiter and carries its own timeout. A failed or timed-out competitor is
//! dropped from the aggregate; a failed input aborts the run. Dropping the
//! future returned by [`Analyzer::analyze`] cancels the run and aborts any
//! in-flight competitor fetch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::catalog::ReferenceCatalog;
use crate::decoder::decode;
use crate::diff::{
    CompetitorAggregate, DEFAULT_GAP_THRESHOLD, FailedFetch, diff_against_catalog,
    diff_against_competitors, missing_types_against_catalog, missing_types_against_competitors,
    unresolved_types,
};
use crate::error::{AnalysisError, Result};
use crate::normalizer::normalize;
use crate::recommend::generate;
use crate::report::Report;
use crate::types::PageSchemaProfile;
use crate::url_utils::normalize_page_url;

/// Timeout used when neither the options nor the validator specify one
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the top-ranking URLs for a keyword
#[async_trait]
pub trait RankedSearchProvider: Send + Sync {
    /// May return fewer URLs than requested.
    async fn top_results(&self, keyword: &str, count: usize) -> Result<Vec<String>>;
}

/// Returns the raw structured-data report for a URL
#[async_trait]
pub trait StructuredDataValidator: Send + Sync {
    async fn fetch_raw(&self, url: &str) -> Result<String>;

    /// Timeout applied when the run does not configure one
    fn default_timeout(&self) -> Duration {
        DEFAULT_FETCH_TIMEOUT
    }
}

/// Tunables for one analysis run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Number of competitor URLs to ask the search provider for
    pub competitor_count: usize,
    /// Maximum number of validator fetches in flight
    pub competitor_fetch_concurrency: usize,
    /// Minimum number of competitors that must use a property or type
    pub competitor_gap_threshold: usize,
    /// Per-fetch timeout; `None` defers to the validator
    pub fetch_timeout_ms: Option<u64>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            competitor_count: 10,
            competitor_fetch_concurrency: 5,
            competitor_gap_threshold: DEFAULT_GAP_THRESHOLD,
            fetch_timeout_ms: None,
        }
    }
}

/// A fixed, caller-supplied competitor list
#[derive(Debug, Clone, Default)]
pub struct StaticRankedList {
    urls: Vec<String>,
}

impl StaticRankedList {
    pub fn new(urls: Vec<String>) -> Self {
        Self { urls }
    }
}

#[async_trait]
impl RankedSearchProvider for StaticRankedList {
    async fn top_results(&self, _keyword: &str, count: usize) -> Result<Vec<String>> {
        Ok(self.urls.iter().take(count).cloned().collect())
    }
}

/// Runs analyses against a shared, read-only catalog
#[derive(Clone)]
pub struct Analyzer {
    search: Arc<dyn RankedSearchProvider>,
    validator: Arc<dyn StructuredDataValidator>,
    catalog: Arc<ReferenceCatalog>,
    options: AnalysisOptions,
}

impl Analyzer {
    pub fn new(
        search: Arc<dyn RankedSearchProvider>,
        validator: Arc<dyn StructuredDataValidator>,
        catalog: Arc<ReferenceCatalog>,
    ) -> Self {
        Self {
            search,
            validator,
            catalog,
            options: AnalysisOptions::default(),
        }
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn catalog(&self) -> &ReferenceCatalog {
        &self.catalog
    }

    /// Analyze one page for one keyword
    pub async fn analyze(&self, input_url: &str, keyword: &str) -> Result<Report> {
        let limiter = Arc::new(Semaphore::new(
            self.options.competitor_fetch_concurrency.max(1),
        ));
        let timeout = self.fetch_timeout();

        let input = async {
            let profile = fetch_profile(
                Arc::clone(&self.validator),
                Arc::clone(&limiter),
                input_url.to_string(),
                timeout,
            )
            .await
            .map_err(|source| AnalysisError::AnalysisFailed {
                url: input_url.to_string(),
                source: Box::new(source),
            })?;

            // The catalog comparison does not wait for competitors.
            let diffs = diff_against_catalog(&profile, &self.catalog);
            let unresolved = unresolved_types(&profile, &self.catalog);
            Ok::<_, AnalysisError>((profile, diffs, unresolved))
        };

        let competitors = async {
            Ok::<_, AnalysisError>(
                self.collect_competitors(input_url, keyword, Arc::clone(&limiter), timeout)
                    .await,
            )
        };

        let ((profile, diffs, unresolved), (aggregate, search_failed)) =
            tokio::try_join!(input, competitors)?;

        let threshold = self.options.competitor_gap_threshold;
        let mut competitor_items = diff_against_competitors(&profile, &aggregate, threshold);
        competitor_items.extend(missing_types_against_competitors(
            &profile, &aggregate, threshold,
        ));
        // Offered after the competitor items, so competitor evidence leads on merge.
        competitor_items.extend(missing_types_against_catalog(&profile, &self.catalog));

        let recommendations = generate(&diffs, &competitor_items, &self.catalog);

        info!(
            url = input_url,
            keyword,
            types = profile.comparable_types().count(),
            competitors = aggregate.len(),
            failed = aggregate.failed().len(),
            recommendations = recommendations.len(),
            "analysis complete"
        );

        Ok(Report::assemble(
            input_url,
            profile,
            diffs,
            unresolved,
            &aggregate,
            recommendations,
            search_failed,
        ))
    }

    fn fetch_timeout(&self) -> Duration {
        self.options
            .fetch_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.validator.default_timeout())
    }

    async fn collect_competitors(
        &self,
        input_url: &str,
        keyword: &str,
        limiter: Arc<Semaphore>,
        timeout: Duration,
    ) -> (CompetitorAggregate, bool) {
        let requested = self.options.competitor_count;
        if requested == 0 {
            return (
                CompetitorAggregate::from_profiles(keyword, Vec::new(), 0, Vec::new()),
                false,
            );
        }

        let search = self.search.top_results(keyword, search_window(requested));
        let (urls, search_failed) = match tokio::time::timeout(timeout, search).await {
            Ok(Ok(urls)) => (select_competitors(input_url, urls, requested), false),
            Ok(Err(err)) => {
                warn!(keyword, error = %err, "competitor search failed");
                (Vec::new(), true)
            }
            Err(_) => {
                warn!(keyword, "competitor search timed out");
                (Vec::new(), true)
            }
        };
        debug!(keyword, competitors = urls.len(), "fetching competitor markup");

        let mut tasks = JoinSet::new();
        // A JoinError only carries the task id.
        let mut spawned = HashMap::new();
        for (rank, url) in urls.into_iter().enumerate() {
            let validator = Arc::clone(&self.validator);
            let limiter = Arc::clone(&limiter);
            let task_url = url.clone();
            let handle = tasks.spawn(async move {
                let result = fetch_profile(validator, limiter, task_url.clone(), timeout).await;
                (rank, task_url, result)
            });
            spawned.insert(handle.id(), (rank, url));
        }

        let mut profiles = Vec::new();
        let mut failed = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((rank, _, Ok(profile))) => profiles.push((rank, profile)),
                Ok((rank, url, Err(err))) => {
                    warn!(url = %url, error = %err, "dropping competitor");
                    failed.push((
                        rank,
                        FailedFetch {
                            url,
                            reason: err.to_string(),
                        },
                    ));
                }
                Err(err) => {
                    warn!(error = %err, "competitor task did not complete");
                    if let Some((rank, url)) = spawned.remove(&err.id()) {
                        let reason = if err.is_panic() {
                            "competitor task panicked"
                        } else {
                            "competitor task was cancelled"
                        };
                        failed.push((
                            rank,
                            FailedFetch {
                                url,
                                reason: reason.to_string(),
                            },
                        ));
                    }
                }
            }
        }

        // Completion order is arbitrary; keep ranking order.
        profiles.sort_by_key(|(rank, _)| *rank);
        failed.sort_by_key(|(rank, _)| *rank);

        let aggregate = CompetitorAggregate::from_profiles(
            keyword,
            profiles.into_iter().map(|(_, profile)| profile).collect(),
            requested,
            failed.into_iter().map(|(_, failure)| failure).collect(),
        );
        (aggregate, search_failed)
    }
}

/// Fetch, decode and normalize one page
async fn fetch_profile(
    validator: Arc<dyn StructuredDataValidator>,
    limiter: Arc<Semaphore>,
    url: String,
    timeout: Duration,
) -> Result<PageSchemaProfile> {
    let raw = {
        let _permit = limiter
            .acquire_owned()
            .await
            .map_err(|_| AnalysisError::fetch(&url, "fetch limiter closed"))?;

        tokio::time::timeout(timeout, validator.fetch_raw(&url))
            .await
            .map_err(|_| {
                AnalysisError::fetch(&url, format!("timed out after {} ms", timeout.as_millis()))
            })??
    };

    let document = decode(&raw)?;
    Ok(normalize(&document, &url))
}

/// How many ranked URLs to ask for so that `requested` competitors survive
/// dropping the input page and duplicates
pub fn search_window(requested: usize) -> usize {
    requested.saturating_mul(2).saturating_add(1)
}

/// Deduplicate ranked URLs, drop the input page itself, keep ranking order
pub fn select_competitors(input_url: &str, urls: Vec<String>, limit: usize) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(normalize_page_url(input_url));

    urls.into_iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .filter(|url| seen.insert(normalize_page_url(url)))
        .take(limit)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_documented_values() {
        let options = AnalysisOptions::default();
        assert_eq!(options.competitor_count, 10);
        assert_eq!(options.competitor_fetch_concurrency, 5);
        assert_eq!(options.competitor_gap_threshold, 2);
        assert_eq!(options.fetch_timeout_ms, None);
    }

    #[test]
    fn options_fill_missing_fields_from_defaults() {
        let options: AnalysisOptions =
            serde_json::from_str(r#"{"competitor_gap_threshold": 3}"#).unwrap();
        assert_eq!(options.competitor_gap_threshold, 3);
        assert_eq!(options.competitor_count, 10);
    }

    #[test]
    fn competitor_selection_skips_input_and_duplicates() {
        let selected = select_competitors(
            "https://mine.test/page",
            vec![
                "https://mine.test/page/".to_string(),
                "https://a.test/".to_string(),
                "https://a.test#reviews".to_string(),
                " ".to_string(),
                "https://b.test/x".to_string(),
                "https://c.test/y".to_string(),
            ],
            2,
        );

        assert_eq!(selected, vec!["https://a.test/", "https://b.test/x"]);
    }

    #[tokio::test]
    async fn input_ranking_first_still_fills_the_requested_count() {
        let list = StaticRankedList::new(vec![
            "https://mine.test/page".to_string(),
            "https://a.test/".to_string(),
            "https://a.test/#top".to_string(),
            "https://b.test/".to_string(),
            "https://c.test/".to_string(),
        ]);

        let ranked = list.top_results("kw", search_window(2)).await.unwrap();
        let selected = select_competitors("https://mine.test/page", ranked, 2);
        assert_eq!(selected, vec!["https://a.test/", "https://b.test/"]);
        assert_eq!(search_window(0), 1);
        assert_eq!(search_window(10), 21);
    }

    #[tokio::test]
    async fn static_list_truncates_to_count() {
        let list = StaticRankedList::new(vec![
            "https://a.test".to_string(),
            "https://b.test".to_string(),
        ]);
        assert_eq!(list.top_results("kw", 1).await.unwrap(), vec!["https://a.test"]);
        assert_eq!(list.top_results("kw", 5).await.unwrap().len(), 2);
    }
}
