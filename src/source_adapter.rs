use crate::error::{FetchError, SearchError};
use crate::http_client::Fetcher;
use crate::models::{Listing, Platform, SearchRequest};
use crate::scorer;
use async_trait::async_trait;
use chrono::Utc;
use scraper::{ElementRef, Selector};
use std::sync::Arc;
use uuid::Uuid;

/// Fields a scraper pulls out of one job card, before scoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingDraft {
    pub title: String,
    pub company: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>,
    pub job_type: String,
    pub url: String,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    /// Set when `description` is stock text rather than the posting's own
    pub placeholder_description: bool,
}

impl ListingDraft {
    pub fn new(title: &str, company: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            company: company.trim().to_string(),
            location: "Remote".to_string(),
            job_type: "remote".to_string(),
            ..Self::default()
        }
    }

    /// Use stock text as the description. It is stored but never scored.
    pub fn with_placeholder_description(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self.placeholder_description = true;
        self
    }

    /// Text the relevance scorer looks at
    pub fn searchable_text(&self) -> String {
        if self.placeholder_description || self.description.is_empty() {
            self.title.clone()
        } else {
            format!("{} {}", self.title, self.description)
        }
    }

    /// Stamp an id and discovery time, and score against the request keywords
    pub fn into_listing(self, source: Platform, keywords: &[String]) -> Listing {
        let relevance = scorer::score(&self.searchable_text(), keywords);

        Listing {
            id: Uuid::new_v4(),
            title: self.title,
            company: self.company,
            description: self.description,
            location: self.location,
            salary: self.salary,
            job_type: self.job_type,
            source,
            url: self.url,
            requirements: self.requirements,
            benefits: self.benefits,
            matched_keywords: relevance.matched_keywords,
            relevance_score: relevance.score,
            discovered_at: Utc::now(),
            applied: false,
            applied_at: None,
        }
    }
}

/// Listings parsed from one payload, in source order
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub listings: Vec<Listing>,
    /// Candidates dropped for missing or malformed fields
    pub skipped: usize,
}

impl ParsedBatch {
    /// Turn candidates into listings until `cap` is reached. `None` candidates are
    /// counted as skipped and never fail the batch.
    pub fn collect<I>(source: Platform, candidates: I, request: &SearchRequest, cap: usize) -> Self
    where
        I: IntoIterator<Item = Option<ListingDraft>>,
    {
        let mut batch = ParsedBatch::default();

        for candidate in candidates {
            if batch.listings.len() >= cap {
                break;
            }
            match candidate {
                Some(draft) => batch.listings.push(draft.into_listing(source, &request.keywords)),
                None => batch.skipped += 1,
            }
        }

        batch
    }
}

/// Per-platform fetch and parse strategy
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Search page URL for this request
    fn search_url(&self, request: &SearchRequest) -> String;

    /// Parse a raw payload. Markup that matches nothing yields an empty batch.
    fn parse(&self, html: &str, request: &SearchRequest) -> ParsedBatch;

    /// Fetch the search page and parse it. Only transport failures are errors.
    async fn fetch_and_parse(
        &self,
        fetcher: &dyn Fetcher,
        request: &SearchRequest,
    ) -> Result<ParsedBatch, FetchError> {
        let url = self.search_url(request);
        tracing::debug!("Scraping {} from {}", self.platform(), url);

        let response = fetcher.get(&url).await?;
        let batch = self.parse(&response.body, request);

        if batch.listings.is_empty() {
            tracing::warn!(
                "No listing elements found on {}. Page structure may have changed.",
                self.platform()
            );
            tracing::debug!(
                "HTML preview (first 500 chars): {}",
                response.body.chars().take(500).collect::<String>()
            );
        }
        if batch.skipped > 0 {
            tracing::debug!("Skipped {} malformed candidates on {}", batch.skipped, self.platform());
        }

        Ok(batch)
    }
}

/// Maps platforms to their adapters, resolved once at startup
pub struct AdapterRegistry {
    adapters: Vec<Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Registering a platform twice replaces the earlier adapter
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.retain(|a| a.platform() != adapter.platform());
        self.adapters.push(adapter);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn SourceAdapter>> {
        self.adapters.iter().find(|a| a.platform() == platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.adapters.iter().map(|a| a.platform()).collect()
    }

    /// Adapters for the request's platforms, or every registered one when the
    /// request names none. Any platform without an adapter rejects the whole request.
    pub fn resolve(&self, request: &SearchRequest) -> Result<Vec<Arc<dyn SourceAdapter>>, SearchError> {
        let Some(platforms) = &request.platforms else {
            return Ok(self.adapters.clone());
        };

        let mut resolved: Vec<Arc<dyn SourceAdapter>> = Vec::new();
        for platform in platforms {
            let adapter = self.get(*platform).ok_or(SearchError::UnknownPlatform(*platform))?;
            if !resolved.iter().any(|a| a.platform() == *platform) {
                resolved.push(adapter);
            }
        }
        Ok(resolved)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Text content with whitespace collapsed, like a browser would render it
pub(crate) fn text_of(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first descendant matching `css`, if non-empty
pub(crate) fn first_text(element: &ElementRef, css: &str) -> Option<String> {
    let sel = selector(css)?;
    element
        .select(&sel)
        .map(|el| text_of(&el))
        .find(|text| !text.is_empty())
}

pub(crate) fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.is_empty() {
        String::new()
    } else {
        format!("{}{}", base, href)
    }
}
