use crate::models::Platform;

/// What went wrong talking to a platform
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchErrorKind {
    #[error("timeout")]
    Timeout,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("client setup failed: {0}")]
    Client(String),
}

/// Transport-level failure for a single request. Parse problems never end up here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}")]
pub struct FetchError {
    pub url: String,
    pub kind: FetchErrorKind,
}

impl FetchError {
    pub fn new(url: impl Into<String>, kind: FetchErrorKind) -> Self {
        Self {
            url: url.into(),
            kind,
        }
    }

    pub fn timeout(url: impl Into<String>) -> Self {
        Self::new(url, FetchErrorKind::Timeout)
    }

    pub fn status(&self) -> Option<u16> {
        match self.kind {
            FetchErrorKind::Status(code) => Some(code),
            _ => None,
        }
    }

    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FetchErrorKind::Timeout
        } else if let Some(status) = err.status() {
            FetchErrorKind::Status(status.as_u16())
        } else {
            FetchErrorKind::Transport(err.to_string())
        };
        Self::new(url, kind)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another insert with the same signature won the race
    #[error("listing already stored: {title} at {company} ({platform})")]
    DuplicateKey {
        title: String,
        company: String,
        platform: Platform,
    },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("listing store lock poisoned")]
    Poisoned,

    #[error("listing {0} not found")]
    NotFound(uuid::Uuid),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }
}

/// Failures that stop a search pass before any platform is contacted
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("no scraper registered for platform '{0}'")]
    UnknownPlatform(Platform),

    #[error("max_results_per_platform must be greater than zero")]
    InvalidMaxResults,
}
