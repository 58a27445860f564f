use crate::models::{Platform, SearchRequest};
use crate::source_adapter::{absolute_url, first_text, selector, text_of, ListingDraft, ParsedBatch, SourceAdapter};
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const BASE_URL: &str = "https://remote.co";

pub struct RemoteCoScraper;

impl RemoteCoScraper {
    fn parse_card(card: &ElementRef) -> Option<ListingDraft> {
        let link = selector("a.job_board_link").and_then(|sel| card.select(&sel).next())?;
        let title = text_of(&link);
        if title.is_empty() {
            return None;
        }
        let company = first_text(card, "p.job_board_company")?;

        let mut draft = ListingDraft::new(&title, &company);
        if let Some(location) = first_text(card, "p.job_board_location") {
            draft.location = location;
        }
        draft.url = absolute_url(BASE_URL, link.value().attr("href").unwrap_or(""));

        Some(draft)
    }
}

#[async_trait]
impl SourceAdapter for RemoteCoScraper {
    fn platform(&self) -> Platform {
        Platform::RemoteCo
    }

    /// Keywords and location map onto the board's search form. It has no job type field.
    fn search_url(&self, request: &SearchRequest) -> String {
        let query = request.query_string();
        let location = request.location.as_deref().map(str::trim).unwrap_or("");

        if query.is_empty() && location.is_empty() {
            return format!("{}/remote-jobs/", BASE_URL);
        }

        format!(
            "{}/remote-jobs/search/?search_keywords={}&search_location={}",
            BASE_URL,
            urlencoding::encode(&query),
            urlencoding::encode(location)
        )
    }

    fn parse(&self, html: &str, request: &SearchRequest) -> ParsedBatch {
        let document = Html::parse_document(html);
        let Some(card_selector) = selector("div.job_board_item") else {
            return ParsedBatch::default();
        };

        let candidates = document.select(&card_selector).map(|card| Self::parse_card(&card));
        ParsedBatch::collect(self.platform(), candidates, request, request.max_results_per_platform)
    }
}
