use crate::models::{Platform, SearchRequest};
use crate::source_adapter::{absolute_url, first_text, selector, ListingDraft, ParsedBatch, SourceAdapter};
use async_trait::async_trait;
use scraper::{ElementRef, Html};

const BASE_URL: &str = "https://weworkremotely.com";

pub struct WeWorkRemotelyScraper;

impl WeWorkRemotelyScraper {
    /// Each job is an `a.feature` link wrapping title, company and region spans.
    /// The card carries no description; that would need the detail page.
    fn parse_link(link: &ElementRef) -> Option<ListingDraft> {
        let title = first_text(link, "span.title")?;
        let company = first_text(link, "span.company")?;

        let mut draft = ListingDraft::new(&title, &company);
        if let Some(region) = first_text(link, "span.region") {
            draft.location = region;
        }
        draft.url = absolute_url(BASE_URL, link.value().attr("href").unwrap_or(""));

        Some(draft)
    }
}

#[async_trait]
impl SourceAdapter for WeWorkRemotelyScraper {
    fn platform(&self) -> Platform {
        Platform::WeWorkRemotely
    }

    /// `term` is the only filter the search page takes; location and job type are dropped.
    fn search_url(&self, request: &SearchRequest) -> String {
        let query = request.query_string();
        if query.is_empty() {
            format!("{}/remote-jobs", BASE_URL)
        } else {
            format!("{}/remote-jobs/search?term={}", BASE_URL, urlencoding::encode(&query))
        }
    }

    fn parse(&self, html: &str, request: &SearchRequest) -> ParsedBatch {
        let document = Html::parse_document(html);
        let Some(link_selector) = selector("a.feature") else {
            return ParsedBatch::default();
        };

        let candidates = document.select(&link_selector).map(|link| Self::parse_link(&link));
        ParsedBatch::collect(self.platform(), candidates, request, request.max_results_per_platform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <section class="jobs">
            <ul>
                <li class="feature">
                    <a class="feature" href="/remote-jobs/acme-backend-engineer-rust">
                        <span class="company">Acme</span>
                        <span class="title">Backend Engineer (Rust)</span>
                        <span class="region company">Anywhere in the World</span>
                    </a>
                </li>
                <li>
                    <a class="feature" href="/remote-jobs/broken">
                        <span class="title">No company here</span>
                    </a>
                </li>
                <li>
                    <a class="feature" href="/remote-jobs/globex-support">
                        <span class="company">Globex</span>
                        <span class="title">Customer Support</span>
                    </a>
                </li>
            </ul>
        </section>
    "#;

    #[test]
    fn test_build_search_url_encodes_keywords() {
        let request = SearchRequest::new(vec!["rust".into(), "backend".into()]);
        assert_eq!(
            WeWorkRemotelyScraper.search_url(&request),
            "https://weworkremotely.com/remote-jobs/search?term=rust%20backend"
        );
    }

    #[test]
    fn test_parse_feature_links() {
        let request = SearchRequest::new(vec!["rust".into()]);
        let batch = WeWorkRemotelyScraper.parse(FIXTURE, &request);

        assert_eq!(batch.listings.len(), 2);
        assert_eq!(batch.skipped, 1);

        let first = &batch.listings[0];
        assert_eq!(first.title, "Backend Engineer (Rust)");
        // the region span also carries the company class; the first non-empty match wins
        assert_eq!(first.company, "Acme");
        assert_eq!(first.location, "Anywhere in the World");
        assert_eq!(first.url, "https://weworkremotely.com/remote-jobs/acme-backend-engineer-rust");
        assert_eq!(first.relevance_score, 1.0);

        let second = &batch.listings[1];
        assert_eq!(second.location, "Remote");
        assert_eq!(second.relevance_score, 0.0);
    }

    #[test]
    fn test_parse_respects_cap() {
        let request = SearchRequest::new(vec![]).with_max_results(1);
        let batch = WeWorkRemotelyScraper.parse(FIXTURE, &request);
        assert_eq!(batch.listings.len(), 1);
        assert_eq!(batch.listings[0].company, "Acme");
    }
}
