use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Job platforms a listing can come from.
///
/// Only some of these have a scraper; the rest exist so stored listings
/// and requests can name them, and are rejected at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Remotive,
    #[serde(rename = "weworkremotely")]
    WeWorkRemotely,
    RemoteCo,
    #[serde(rename = "flexjobs")]
    FlexJobs,
    Contra,
    Toptal,
    Upwork,
    Indeed,
    #[serde(rename = "ziprecruiter")]
    ZipRecruiter,
    Wellfound,
    #[serde(rename = "linkedin")]
    LinkedIn,
    Manual,
}

impl Platform {
    /// Platforms that have a scraper, in the order a default pass visits them
    pub const SCRAPED: [Platform; 6] = [
        Platform::FlexJobs,
        Platform::Remotive,
        Platform::WeWorkRemotely,
        Platform::RemoteCo,
        Platform::Contra,
        Platform::Toptal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Remotive => "remotive",
            Platform::WeWorkRemotely => "weworkremotely",
            Platform::RemoteCo => "remote_co",
            Platform::FlexJobs => "flexjobs",
            Platform::Contra => "contra",
            Platform::Toptal => "toptal",
            Platform::Upwork => "upwork",
            Platform::Indeed => "indeed",
            Platform::ZipRecruiter => "ziprecruiter",
            Platform::Wellfound => "wellfound",
            Platform::LinkedIn => "linkedin",
            Platform::Manual => "manual",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let platform = match s.trim().to_lowercase().as_str() {
            "remotive" => Platform::Remotive,
            "weworkremotely" | "wwr" => Platform::WeWorkRemotely,
            "remote_co" | "remoteco" | "remote.co" => Platform::RemoteCo,
            "flexjobs" => Platform::FlexJobs,
            "contra" => Platform::Contra,
            "toptal" => Platform::Toptal,
            "upwork" => Platform::Upwork,
            "indeed" => Platform::Indeed,
            "ziprecruiter" => Platform::ZipRecruiter,
            "wellfound" => Platform::Wellfound,
            "linkedin" => Platform::LinkedIn,
            "manual" => Platform::Manual,
            other => return Err(format!("unknown platform '{}'", other)),
        };
        Ok(platform)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    pub description: String,
    pub location: String,
    pub salary: Option<String>, // free text, platforms rarely agree on a format
    pub job_type: String,
    pub source: Platform,
    pub url: String,
    pub requirements: Vec<String>,
    pub benefits: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub relevance_score: f64,
    pub discovered_at: DateTime<Utc>,
    pub applied: bool,
    pub applied_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn summary_line(&self) -> String {
        let mut line = format!("[{}] {} @ {}", self.source, self.title, self.company);
        if !self.matched_keywords.is_empty() {
            line.push_str(&format!(
                " ({:.0}%: {})",
                self.relevance_score * 100.0,
                self.matched_keywords.join(", ")
            ));
        }
        if !self.url.is_empty() {
            line.push_str(&format!("\n    {}", self.url));
        }
        line
    }
}

fn default_max_results() -> usize {
    50
}

/// Input to one aggregation pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub keywords: Vec<String>,
    /// Advisory filters. Adapters put them in the query only where the board's
    /// search page accepts them, and never filter results themselves.
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>,
    /// `None` means every platform with a registered scraper
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
    #[serde(default = "default_max_results")]
    pub max_results_per_platform: usize,
}

impl SearchRequest {
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords,
            location: None,
            job_type: None,
            platforms: None,
            max_results_per_platform: default_max_results(),
        }
    }

    pub fn with_platforms(mut self, platforms: Vec<Platform>) -> Self {
        self.platforms = Some(platforms);
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results_per_platform = max;
        self
    }

    /// Keywords joined for use in a platform search query
    pub fn query_string(&self) -> String {
        self.keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
