use crate::models::{Platform, SearchRequest};
use crate::source_adapter::{absolute_url, first_text, selector, ListingDraft, ParsedBatch, SourceAdapter};
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const BASE_URL: &str = "https://remotive.io";

pub struct RemotiveScraper;

impl RemotiveScraper {
    fn parse_card(card: &ElementRef) -> Option<ListingDraft> {
        let title = first_text(card, "h3")?;
        let company = first_text(card, "h4")?;

        let mut draft = ListingDraft::new(&title, &company);
        draft.description = first_text(card, "p").unwrap_or_default();
        draft.url = selector("a")
            .and_then(|sel| card.select(&sel).next())
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute_url(BASE_URL, href))
            .unwrap_or_default();

        Some(draft)
    }
}

#[async_trait]
impl SourceAdapter for RemotiveScraper {
    fn platform(&self) -> Platform {
        Platform::Remotive
    }

    /// Every Remotive role is remote and the search box has no job type filter,
    /// so only the keywords are sent.
    fn search_url(&self, request: &SearchRequest) -> String {
        let query = request.query_string();
        if query.is_empty() {
            format!("{}/remote-jobs", BASE_URL)
        } else {
            format!("{}/remote-jobs?search={}", BASE_URL, urlencoding::encode(&query))
        }
    }

    fn parse(&self, html: &str, request: &SearchRequest) -> ParsedBatch {
        let document = Html::parse_document(html);
        let Some(card_selector) = selector("div.job-tile") else {
            return ParsedBatch::default();
        };

        let candidates = document.select(&card_selector).map(|card| Self::parse_card(&card));
        ParsedBatch::collect(self.platform(), candidates, request, request.max_results_per_platform)
    }
}
