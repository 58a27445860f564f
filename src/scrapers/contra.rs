use crate::models::{Platform, SearchRequest};
use crate::source_adapter::{absolute_url, first_text, selector, ListingDraft, ParsedBatch, SourceAdapter};
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const BASE_URL: &str = "https://contra.com";

/// Contra renders most of its search client-side. Only server-rendered
/// project cards are visible here, without client names.
pub struct ContraScraper;

impl ContraScraper {
    fn parse_card(card: &ElementRef) -> Option<ListingDraft> {
        let title = first_text(card, "h3").or_else(|| first_text(card, "h2"))?;

        let mut draft = ListingDraft::new(&title, "Contra Client");
        draft.description = first_text(card, "p").unwrap_or_default();
        draft.job_type = "freelance".to_string();
        draft.url = selector("a[href]")
            .and_then(|sel| card.select(&sel).next())
            .and_then(|a| a.value().attr("href"))
            .map(|href| absolute_url(BASE_URL, href))
            .unwrap_or_else(|| BASE_URL.to_string());

        Some(draft)
    }
}

#[async_trait]
impl SourceAdapter for ContraScraper {
    fn platform(&self) -> Platform {
        Platform::Contra
    }

    /// Contra work is all freelance and location-free; only the query is sent.
    fn search_url(&self, request: &SearchRequest) -> String {
        let query = request.query_string();
        if query.is_empty() {
            format!("{}/search", BASE_URL)
        } else {
            format!("{}/search?query={}", BASE_URL, urlencoding::encode(&query))
        }
    }

    fn parse(&self, html: &str, request: &SearchRequest) -> ParsedBatch {
        let document = Html::parse_document(html);
        let Some(card_selector) = selector("div.project-card") else {
            return ParsedBatch::default();
        };

        let candidates = document.select(&card_selector).map(|card| Self::parse_card(&card));
        ParsedBatch::collect(self.platform(), candidates, request, request.max_results_per_platform)
    }
}
