use std::fmt;
use thiserror::Error;

/// Why a single HTTP GET did not produce a usable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    Timeout,
    Connect,
    Status(u16),
    Other(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "timed out"),
            FetchFailure::Connect => write!(f, "connection failed"),
            FetchFailure::Status(code) => write!(f, "HTTP status {code}"),
            FetchFailure::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<&reqwest::Error> for FetchFailure {
    fn from(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchFailure::Timeout
        } else if err.is_connect() {
            FetchFailure::Connect
        } else if let Some(status) = err.status() {
            FetchFailure::Status(status.as_u16())
        } else {
            FetchFailure::Other(err.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("fetch of {url} failed: {kind}")]
    Fetch { url: String, kind: FetchFailure },

    #[error("crawl aborted: {0}")]
    Crawl(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("geocoding failed: {0}")]
    Geocoding(String),

    #[error("weather lookup failed: {0}")]
    WeatherLookup(String),

    #[error("persistence failed: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScraperError {
    pub fn fetch(url: impl Into<String>, kind: FetchFailure) -> Self {
        ScraperError::Fetch {
            url: url.into(),
            kind,
        }
    }

    /// Errors that end the whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScraperError::Crawl(_)
                | ScraperError::Persistence(_)
                | ScraperError::Config(_)
                | ScraperError::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
