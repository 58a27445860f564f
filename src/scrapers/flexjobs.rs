use crate::models::{Platform, SearchRequest};
use crate::source_adapter::{absolute_url, selector, text_of, ListingDraft, ParsedBatch, SourceAdapter};
use async_trait::async_trait;
use scraper::Html;

const BASE_URL: &str = "https://www.flexjobs.com";

/// Anonymous visitors only see the first few listings
const MAX_VISIBLE_LISTINGS: usize = 10;

/// FlexJobs hides employer and details behind a subscription, so listings
/// carry a placeholder company and a stock description.
pub struct FlexJobsScraper;

#[async_trait]
impl SourceAdapter for FlexJobsScraper {
    fn platform(&self) -> Platform {
        Platform::FlexJobs
    }

    /// Location is only honoured alongside a keyword search. Job type has no query parameter.
    fn search_url(&self, request: &SearchRequest) -> String {
        let query = request.query_string();
        let mut url = format!("{}/jobs", BASE_URL);
        if !query.is_empty() {
            url.push_str(&format!("?search={}", urlencoding::encode(&query)));
            if let Some(location) = request.location.as_deref().filter(|l| !l.trim().is_empty()) {
                url.push_str(&format!("&location={}", urlencoding::encode(location.trim())));
            }
        }
        url
    }

    fn parse(&self, html: &str, request: &SearchRequest) -> ParsedBatch {
        let document = Html::parse_document(html);
        let Some(link_selector) = selector("a[href*='/jobs/']") else {
            return ParsedBatch::default();
        };

        let candidates = document.select(&link_selector).map(|link| {
            let title = text_of(&link);
            // navigation links like "Jobs" share the href pattern
            if title.chars().count() <= 5 {
                return None;
            }

            let mut draft = ListingDraft::new(&title, "Various")
                .with_placeholder_description("FlexJobs listing - subscription required for details");
            draft.location = "Remote/Flexible".to_string();
            draft.job_type = "flexible".to_string();
            draft.url = absolute_url(BASE_URL, link.value().attr("href").unwrap_or(""));
            Some(draft)
        });

        let cap = request.max_results_per_platform.min(MAX_VISIBLE_LISTINGS);
        ParsedBatch::collect(self.platform(), candidates, request, cap)
    }
}
