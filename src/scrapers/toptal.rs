use crate::models::{Platform, SearchRequest};
use crate::source_adapter::{selector, text_of, ListingDraft, ParsedBatch, SourceAdapter};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;

const JOBS_URL: &str = "https://www.toptal.com/freelance-jobs";

/// Toptal has no public job board; its landing page lists open roles as
/// headings. Each role-like heading becomes a placeholder listing.
pub struct ToptalScraper;

impl ToptalScraper {
    fn role_pattern() -> Option<Regex> {
        Regex::new(r"(?i)developer|engineer|analyst").ok()
    }
}

#[async_trait]
impl SourceAdapter for ToptalScraper {
    fn platform(&self) -> Platform {
        Platform::Toptal
    }

    /// The page takes no query parameters
    fn search_url(&self, _request: &SearchRequest) -> String {
        JOBS_URL.to_string()
    }

    fn parse(&self, html: &str, request: &SearchRequest) -> ParsedBatch {
        let document = Html::parse_document(html);
        let (Some(heading_selector), Some(role_pattern)) = (selector("h3, h4"), Self::role_pattern()) else {
            return ParsedBatch::default();
        };

        let candidates = document
            .select(&heading_selector)
            .map(|heading| text_of(&heading))
            .filter(|title| role_pattern.is_match(title))
            .map(|title| {
                let mut draft = ListingDraft::new(&title, "Toptal Client")
                    .with_placeholder_description("Toptal freelance opportunity - application required");
                draft.job_type = "freelance".to_string();
                draft.url = JOBS_URL.to_string();
                Some(draft)
            });

        ParsedBatch::collect(self.platform(), candidates, request, request.max_results_per_platform)
    }
}
