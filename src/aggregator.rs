use crate::database::ListingStore;
use crate::dedup::Deduplicator;
use crate::error::{FetchError, SearchError};
use crate::http_client::Fetcher;
use crate::models::{Listing, Platform, SearchRequest};
use crate::pacing::Pacer;
use crate::source_adapter::{AdapterRegistry, ParsedBatch};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Stages of one search pass. There is no failed state: platform errors are
/// recorded in the report and the pass still reaches `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Dispatching,
    Collecting,
    Merging,
    Persisting,
    Done,
}

/// What one platform contributed to a pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlatformOutcome {
    /// Net-new listings persisted
    pub count: usize,
    /// Listings parsed before dedup
    pub found: usize,
    /// Candidates dropped for malformed fields
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchReport {
    pub listings: Vec<Listing>,
    pub outcomes: BTreeMap<Platform, PlatformOutcome>,
    pub cancelled: bool,
}

impl SearchReport {
    pub fn failed_platforms(&self) -> Vec<Platform> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.error.is_some())
            .map(|(platform, _)| *platform)
            .collect()
    }

    pub fn total_found(&self) -> usize {
        self.outcomes.values().map(|o| o.found).sum()
    }
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (platform, outcome) in &self.outcomes {
            match &outcome.error {
                Some(error) => writeln!(f, "  {:<15} error: {}", platform.as_str(), error)?,
                None => writeln!(
                    f,
                    "  {:<15} {} new ({} found, {} skipped)",
                    platform.as_str(),
                    outcome.count,
                    outcome.found,
                    outcome.skipped
                )?,
            }
        }
        write!(
            f,
            "  {} new listings out of {} found{}",
            self.listings.len(),
            self.total_found(),
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }
}

/// Fans a search out to every requested platform and persists what is new
pub struct Aggregator {
    registry: Arc<AdapterRegistry>,
    fetcher: Arc<dyn Fetcher>,
    dedup: Deduplicator,
    pacer: Arc<Pacer>,
    request_delay: Duration,
}

impl Aggregator {
    /// `request_delay` both staggers platform dispatch within a pass and is the
    /// minimum gap between two requests to the same platform.
    pub fn new(
        registry: AdapterRegistry,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ListingStore>,
        request_delay: Duration,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            fetcher,
            dedup: Deduplicator::new(store),
            pacer: Arc::new(Pacer::new(request_delay)),
            request_delay,
        }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.registry.platforms()
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchReport, SearchError> {
        self.search_with_cancel(request, CancellationToken::new()).await
    }

    /// Run one pass. Cancelling `cancel` abandons in-flight platforms; listings
    /// from platforms that already finished are still persisted.
    pub async fn search_with_cancel(
        &self,
        request: &SearchRequest,
        cancel: CancellationToken,
    ) -> Result<SearchReport, SearchError> {
        let mut phase = SearchPhase::Idle;
        tracing::debug!("Search pass {:?} for keywords {:?}", phase, request.keywords);

        if request.max_results_per_platform == 0 {
            return Err(SearchError::InvalidMaxResults);
        }
        let adapters = self.registry.resolve(request)?;

        phase = SearchPhase::Dispatching;
        tracing::debug!("Search pass {:?} to {} platforms", phase, adapters.len());

        let mut report = SearchReport::default();
        let mut tasks = JoinSet::new();

        for (index, adapter) in adapters.into_iter().enumerate() {
            let platform = adapter.platform();
            report.outcomes.insert(platform, PlatformOutcome::default());

            let fetcher = self.fetcher.clone();
            let pacer = self.pacer.clone();
            let request = request.clone();
            let stagger = self.request_delay * index as u32;

            tasks.spawn(async move {
                // keep the polite gap between successive platforms
                tokio::time::sleep(stagger).await;
                pacer.wait_turn(platform).await;

                tracing::info!("Searching jobs on {}", platform);
                let result = adapter.fetch_and_parse(fetcher.as_ref(), &request).await;
                (platform, result)
            });
        }

        phase = SearchPhase::Collecting;
        tracing::debug!("Search pass {:?}", phase);

        let mut finished: HashSet<Platform> = HashSet::new();
        let mut batches: Vec<Vec<Listing>> = Vec::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!("Search pass cancelled, abandoning {} platforms", tasks.len());
                    report.cancelled = true;
                    tasks.abort_all();
                    // tasks that completed before the abort still yield their batch
                    while let Some(joined) = tasks.join_next().await {
                        if let Ok((platform, result)) = joined {
                            record_result(&mut report, &mut finished, &mut batches, platform, result);
                        }
                    }
                    break;
                }
                joined = tasks.join_next() => {
                    let Some(joined) = joined else { break };
                    match joined {
                        Ok((platform, result)) => {
                            record_result(&mut report, &mut finished, &mut batches, platform, result);
                        }
                        Err(e) => tracing::error!("Platform task failed: {}", e),
                    }
                }
            }
        }

        for (platform, outcome) in report.outcomes.iter_mut() {
            if !finished.contains(platform) {
                outcome.error = Some(if report.cancelled { "cancelled" } else { "task failed" }.to_string());
            }
        }

        phase = SearchPhase::Merging;
        tracing::debug!("Search pass {:?} {} batches", phase, batches.len());
        let merged: Vec<Listing> = batches.into_iter().flatten().collect();

        phase = SearchPhase::Persisting;
        tracing::debug!("Search pass {:?} {} listings", phase, merged.len());
        let persisted = self.dedup.filter_new(merged);

        for listing in &persisted {
            report.outcomes.entry(listing.source).or_default().count += 1;
        }
        report.listings = persisted;

        phase = SearchPhase::Done;
        tracing::info!(
            "Search pass {:?}: {} new of {} found, failed platforms: {:?}",
            phase,
            report.listings.len(),
            report.total_found(),
            report.failed_platforms()
        );

        Ok(report)
    }
}

fn record_result(
    report: &mut SearchReport,
    finished: &mut HashSet<Platform>,
    batches: &mut Vec<Vec<Listing>>,
    platform: Platform,
    result: Result<ParsedBatch, FetchError>,
) {
    finished.insert(platform);
    let outcome = report.outcomes.entry(platform).or_default();

    match result {
        Ok(batch) => {
            tracing::info!("Found {} jobs on {}", batch.listings.len(), platform);
            outcome.found = batch.listings.len();
            outcome.skipped = batch.skipped;
            batches.push(batch.listings);
        }
        Err(e) => {
            tracing::warn!("Error searching {} ({}): {}", platform, e.url, e);
            outcome.error = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteStore;
    use crate::error::FetchErrorKind;
    use crate::http_client::fake::FakeFetcher;
    use crate::http_client::FetchResponse;
    use crate::scrapers::default_registry;
    use async_trait::async_trait;

    const REMOTIVE_ONE: &str = r#"
        <div class="job-tile">
            <a href="/remote-jobs/ml-translation-1"><h3>Machine Learning Translation Specialist</h3></a>
            <h4>Lingua Labs</h4>
        </div>
    "#;

    const REMOTIVE_TWO: &str = r#"
        <div class="job-tile"><h3>Rust Engineer</h3><h4>Acme</h4><p>Async Rust services</p></div>
        <div class="job-tile"><h3>Data Analyst</h3><h4>Globex</h4></div>
    "#;

    const WWR_PAGE: &str = r#"
        <a class="feature" href="/remote-jobs/1"><span class="title">Rust Engineer</span><span class="company">Acme</span></a>
        <a class="feature" href="/remote-jobs/2"><span class="title">Go Engineer</span><span class="company">Initech</span></a>
        <a class="feature" href="/remote-jobs/3"><span class="title">Python Engineer</span><span class="company">Hooli</span></a>
    "#;

    fn aggregator(fetcher: Arc<FakeFetcher>, store: Arc<SqliteStore>, delay: Duration) -> Aggregator {
        Aggregator::new(default_registry(), fetcher, store, delay)
    }

    fn request(keywords: &[&str], platforms: Vec<Platform>) -> SearchRequest {
        SearchRequest::new(keywords.iter().map(|k| k.to_string()).collect()).with_platforms(platforms)
    }

    #[tokio::test]
    async fn test_single_listing_scored_and_persisted() {
        let fetcher = Arc::new(FakeFetcher::new().with_page("https://remotive.io", REMOTIVE_ONE));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher, store.clone(), Duration::ZERO);

        let report = aggregator
            .search(&request(&["machine learning", "translation"], vec![Platform::Remotive]))
            .await
            .unwrap();

        assert_eq!(report.listings.len(), 1);
        let listing = &report.listings[0];
        assert_eq!(listing.matched_keywords, vec!["machine learning".to_string(), "translation".to_string()]);
        assert_eq!(listing.relevance_score, 1.0);
        assert_eq!(store.recent(10).unwrap().len(), 1);
        assert_eq!(report.outcomes[&Platform::Remotive].count, 1);
    }

    #[tokio::test]
    async fn test_second_identical_pass_persists_nothing() {
        let fetcher = Arc::new(FakeFetcher::new().with_page("https://remotive.io", REMOTIVE_ONE));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher, store.clone(), Duration::ZERO);
        let request = request(&["machine learning", "translation"], vec![Platform::Remotive]);

        let first = aggregator.search(&request).await.unwrap();
        let second = aggregator.search(&request).await.unwrap();

        assert_eq!(first.listings.len(), 1);
        assert!(second.listings.is_empty());
        assert_eq!(
            second.outcomes[&Platform::Remotive],
            PlatformOutcome { count: 0, found: 1, skipped: 0, error: None }
        );
        assert_eq!(store.recent(10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_platform_is_isolated() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page("https://remotive.io", REMOTIVE_TWO)
                .with_error("https://www.toptal.com", FetchErrorKind::Timeout),
        );
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher, store, Duration::ZERO);

        let report = aggregator
            .search(&request(&["rust"], vec![Platform::Remotive, Platform::Toptal]))
            .await
            .unwrap();

        assert_eq!(report.listings.len(), 2);
        assert!(report.listings.iter().all(|l| l.source == Platform::Remotive));
        assert_eq!(report.outcomes[&Platform::Remotive].count, 2);
        assert_eq!(report.outcomes[&Platform::Remotive].error, None);
        assert_eq!(report.outcomes[&Platform::Toptal].count, 0);
        assert_eq!(report.outcomes[&Platform::Toptal].error.as_deref(), Some("timeout"));
        assert_eq!(report.failed_platforms(), vec![Platform::Toptal]);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_unknown_platform_rejected_before_dispatch() {
        let fetcher = Arc::new(FakeFetcher::new().with_page("https://remotive.io", REMOTIVE_ONE));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher.clone(), store, Duration::ZERO);

        let err = aggregator
            .search(&request(&["rust"], vec![Platform::Remotive, Platform::LinkedIn]))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::UnknownPlatform(Platform::LinkedIn)));
        assert!(fetcher.calls().is_empty(), "no platform should be contacted");
    }

    #[tokio::test]
    async fn test_zero_max_results_rejected() {
        let fetcher = Arc::new(FakeFetcher::new());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher, store, Duration::ZERO);

        let err = aggregator
            .search(&request(&["rust"], vec![Platform::Remotive]).with_max_results(0))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidMaxResults));
    }

    #[tokio::test]
    async fn test_truncation_keeps_source_order() {
        let fetcher = Arc::new(FakeFetcher::new().with_page("https://weworkremotely.com", WWR_PAGE));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher, store, Duration::ZERO);

        let report = aggregator
            .search(&request(&["engineer"], vec![Platform::WeWorkRemotely]).with_max_results(2))
            .await
            .unwrap();

        let titles: Vec<&str> = report.listings.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Rust Engineer", "Go Engineer"]);
    }

    #[tokio::test]
    async fn test_same_listing_on_two_platforms_is_kept_for_each() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page("https://remotive.io", REMOTIVE_TWO)
                .with_page("https://weworkremotely.com", WWR_PAGE),
        );
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher, store, Duration::ZERO);

        let report = aggregator
            .search(&request(&["rust"], vec![Platform::Remotive, Platform::WeWorkRemotely]))
            .await
            .unwrap();

        // "Rust Engineer @ Acme" appears on both; signatures include the source
        assert_eq!(report.listings.len(), 5);
        assert_eq!(report.outcomes[&Platform::WeWorkRemotely].count, 3);
    }

    #[tokio::test]
    async fn test_overlapping_passes_insert_each_signature_once() {
        let fetcher = Arc::new(FakeFetcher::new().with_page("https://remotive.io", REMOTIVE_TWO));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher, store.clone(), Duration::ZERO);
        let request = request(&["rust"], vec![Platform::Remotive]);

        let (a, b) = tokio::join!(aggregator.search(&request), aggregator.search(&request));

        let persisted = a.unwrap().listings.len() + b.unwrap().listings.len();
        assert_eq!(persisted, 2);
        assert_eq!(store.recent(10).unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_is_staggered_by_request_delay() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page("https://remotive.io", REMOTIVE_TWO)
                .with_page("https://weworkremotely.com", WWR_PAGE)
                .with_error("https://www.toptal.com", FetchErrorKind::Status(503)),
        );
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher.clone(), store, Duration::from_secs(2));

        aggregator
            .search(&request(
                &["rust"],
                vec![Platform::Remotive, Platform::WeWorkRemotely, Platform::Toptal],
            ))
            .await
            .unwrap();

        let mut times: Vec<_> = fetcher.calls().into_iter().map(|(_, at)| at).collect();
        times.sort();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_passes_respect_per_platform_pacing() {
        let fetcher = Arc::new(FakeFetcher::new().with_page("https://remotive.io", REMOTIVE_TWO));
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher.clone(), store, Duration::from_secs(2));
        let request = request(&["rust"], vec![Platform::Remotive]);

        let (a, b) = tokio::join!(aggregator.search(&request), aggregator.search(&request));
        a.unwrap();
        b.unwrap();

        let calls = fetcher.calls();
        assert_eq!(calls.len(), 2);
        let gap = if calls[1].1 > calls[0].1 { calls[1].1 - calls[0].1 } else { calls[0].1 - calls[1].1 };
        assert!(gap >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_finished_platforms() {
        let fetcher = Arc::new(
            FakeFetcher::new()
                .with_page("https://remotive.io", REMOTIVE_TWO)
                .with_page("https://www.toptal.com", "<h3>Senior Rust Developer</h3>"),
        );
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = aggregator(fetcher.clone(), store.clone(), Duration::from_secs(10));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        // toptal is staggered 10s behind remotive and never gets to run
        let report = aggregator
            .search_with_cancel(&request(&["rust"], vec![Platform::Remotive, Platform::Toptal]), cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.outcomes[&Platform::Remotive].count, 2);
        assert_eq!(report.outcomes[&Platform::Toptal].error.as_deref(), Some("cancelled"));
        assert_eq!(store.recent(10).unwrap().len(), 2);
        assert_eq!(fetcher.calls().len(), 1);
    }

    /// Serves pages like `FakeFetcher` but trips the token while answering `trigger_prefix`
    struct CancelOnFetch {
        inner: FakeFetcher,
        trigger_prefix: &'static str,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl Fetcher for CancelOnFetch {
        async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
            if url.starts_with(self.trigger_prefix) {
                self.cancel.cancel();
            }
            self.inner.get(url).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_keeps_platform_that_finished_but_was_not_joined() {
        let cancel = CancellationToken::new();
        let fetcher = Arc::new(CancelOnFetch {
            inner: FakeFetcher::new()
                .with_page("https://remotive.io", REMOTIVE_TWO)
                .with_page("https://www.toptal.com", "<h3>Senior Rust Developer</h3>"),
            trigger_prefix: "https://remotive.io",
            cancel: cancel.clone(),
        });
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let aggregator = Aggregator::new(default_registry(), fetcher, store.clone(), Duration::from_secs(10));

        // remotive completes in the same poll that fires the token
        let report = aggregator
            .search_with_cancel(&request(&["rust"], vec![Platform::Remotive, Platform::Toptal]), cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.outcomes[&Platform::Remotive].error, None);
        assert_eq!(report.outcomes[&Platform::Remotive].count, 2);
        assert_eq!(report.outcomes[&Platform::Toptal].error.as_deref(), Some("cancelled"));
        assert_eq!(store.recent(10).unwrap().len(), 2);
    }

    #[test]
    fn test_report_display_lists_each_platform() {
        let mut report = SearchReport::default();
        report.outcomes.insert(Platform::Remotive, PlatformOutcome { count: 2, found: 3, skipped: 1, error: None });
        report.outcomes.insert(
            Platform::Toptal,
            PlatformOutcome { error: Some("timeout".into()), ..Default::default() },
        );

        let text = report.to_string();
        assert!(text.contains("remotive        2 new (3 found, 1 skipped)"));
        assert!(text.contains("toptal          error: timeout"));
        assert!(text.contains("0 new listings out of 3 found"));
    }
}
