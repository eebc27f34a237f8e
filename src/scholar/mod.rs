//! Scholarly-index search (Google Scholar via SerpAPI). Independent of the arXiv path:
//! no topic expansion happens here.

mod serpapi;

pub use serpapi::SerpApiClient;

use tracing::{debug, warn};

use crate::paper::{MAX_PAPERS, PaperRecord};

pub const NO_SUMMARY: &str = "No summary available";
pub const NO_LINK: &str = "No link available";
/// Upper bound on page requests per search, so a provider that keeps handing back
/// title-less items cannot keep us paging forever.
const MAX_PAGES: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ScholarError {
    #[error("SERPAPI_API_KEY not set. Get one at https://serpapi.com/manage-api-key")]
    ApiKeyNotSet,

    #[error("SerpAPI rejected the API key: {0}")]
    InvalidApiKey(String),

    #[error("SerpAPI rate limit or plan quota exceeded. Please retry later.")]
    RateLimited,

    #[error("SerpAPI error ({code}): {message}")]
    Api { code: u16, message: String },

    /// Built through `From`, which strips the request URL: it carries the API key.
    #[error("Network error: {0}")]
    Network(reqwest::Error),
}

impl From<reqwest::Error> for ScholarError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.without_url())
    }
}

/// One bibliographic hit as the index reports it. Only the title is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScholarItem {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub pub_url: Option<String>,
}

/// Paged access to a scholarly index. An empty page means the results are exhausted.
pub trait ScholarSource {
    async fn page(&self, query: &str, offset: usize) -> Result<Vec<ScholarItem>, ScholarError>;
}

/// Walk the provider's result pages until [`MAX_PAPERS`] records are collected or the
/// results run out. Provider errors propagate; "no results" is an empty `Ok`.
pub async fn search_scholar(
    source: &impl ScholarSource,
    query: &str,
) -> Result<Vec<PaperRecord>, ScholarError> {
    let mut papers = Vec::new();
    let mut offset = 0;

    for _ in 0..MAX_PAGES {
        let items = source.page(query, offset).await?;
        if items.is_empty() {
            break;
        }
        offset += items.len();

        for item in items {
            if papers.len() >= MAX_PAPERS {
                break;
            }
            match to_record(item) {
                Some(record) => papers.push(record),
                None => warn!(query, "skipping scholar result without a title"),
            }
        }
        if papers.len() >= MAX_PAPERS {
            break;
        }
    }

    debug!(query, papers = papers.len(), "scholar search complete");
    Ok(papers)
}

fn to_record(item: ScholarItem) -> Option<PaperRecord> {
    let title = item.title.filter(|t| !t.trim().is_empty())?;
    Some(PaperRecord::new(
        title,
        item.abstract_text.unwrap_or_else(|| NO_SUMMARY.to_string()),
        item.pub_url.unwrap_or_else(|| NO_LINK.to_string()),
    ))
}
