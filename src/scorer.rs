/// Result of matching search keywords against a listing's text
#[derive(Debug, Clone, PartialEq)]
pub struct Relevance {
    pub matched_keywords: Vec<String>,
    pub score: f64,
}

/// Case-insensitive substring match of each keyword against `text`.
///
/// Matches keep the request's keyword order and each keyword appears at most
/// once, even if the request repeats it. The score is matched / requested and
/// is 0.0 for an empty keyword list.
pub fn score(text: &str, keywords: &[String]) -> Relevance {
    if keywords.is_empty() {
        return Relevance {
            matched_keywords: Vec::new(),
            score: 0.0,
        };
    }

    let text_lower = text.to_lowercase();
    let mut matched: Vec<String> = Vec::new();

    for keyword in keywords {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() || matched.iter().any(|m| m == keyword) {
            continue;
        }
        if text_lower.contains(&needle) {
            matched.push(keyword.clone());
        }
    }

    let score = matched.len() as f64 / keywords.len() as f64;

    Relevance {
        matched_keywords: matched,
        score,
    }
}
