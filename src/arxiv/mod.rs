//! Full-text archive search against the arXiv query API.

mod atom;

use reqwest::Client;
use tracing::{debug, warn};

use crate::paper::{MAX_PAPERS, PaperRecord};

const API_BASE: &str = "https://export.arxiv.org";
const QUERY_PATH: &str = "/api/query";

#[derive(Debug, thiserror::Error)]
pub enum ArxivError {
    #[error("arXiv API returned HTTP {0}")]
    Status(u16),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed Atom feed: {0}")]
    Decode(String),
}

/// Literal-term lookup against a paper archive.
/// Implemented by `ArxivClient` for production; mock implementations used in tests.
pub trait FeedSearch {
    async fn search(&self, term: &str) -> Result<Vec<PaperRecord>, ArxivError>;
}

#[derive(Clone)]
pub struct ArxivClient {
    http: Client,
    base_url: String,
}

impl ArxivClient {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            base_url: API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.to_string(),
        }
    }
}

impl FeedSearch for ArxivClient {
    /// First page only (`start=0`), capped at [`MAX_PAPERS`]. The term goes out verbatim,
    /// including the empty string.
    async fn search(&self, term: &str) -> Result<Vec<PaperRecord>, ArxivError> {
        let url = format!("{}{QUERY_PATH}", self.base_url);
        let search_query = format!("all:{term}");
        let max_results = MAX_PAPERS.to_string();

        let response = self
            .http
            .get(&url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
            ])
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, term, "arXiv query failed");
            return Err(ArxivError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let mut feed = atom::parse_feed(&body)?;
        if feed.skipped > 0 {
            warn!(skipped = feed.skipped, term, "dropped malformed arXiv entries");
        }
        feed.records.truncate(MAX_PAPERS);

        debug!(term, papers = feed.records.len(), "arXiv query complete");
        Ok(feed.records)
    }
}
