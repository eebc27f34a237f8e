use std::env;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ScholarError, ScholarItem, ScholarSource};

const API_BASE: &str = "https://serpapi.com";
/// Google Scholar's native page size.
const PAGE_SIZE: usize = 10;
/// SerpAPI answers an empty result set with HTTP 200 and this error text.
const NO_RESULTS_MARKER: &str = "hasn't returned any results";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    snippet: Option<String>,
    link: Option<String>,
}

impl From<OrganicResult> for ScholarItem {
    fn from(result: OrganicResult) -> Self {
        Self {
            title: result.title,
            abstract_text: result.snippet.filter(|s| !s.trim().is_empty()),
            pub_url: result.link.filter(|l| !l.trim().is_empty()),
        }
    }
}

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Google Scholar through SerpAPI's `google_scholar` engine.
#[derive(Clone)]
pub struct SerpApiClient {
    http: Client,
    api_key: ApiKey,
    base_url: String,
}

impl SerpApiClient {
    pub fn from_env(http: Client) -> Result<Self, ScholarError> {
        let api_key = env::var("SERPAPI_API_KEY").map_err(|_| ScholarError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(ScholarError::ApiKeyNotSet);
        }
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            base_url: API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(http: Client, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey("test-key".to_string()),
            base_url: base_url.to_string(),
        }
    }
}

impl ScholarSource for SerpApiClient {
    async fn page(&self, query: &str, offset: usize) -> Result<Vec<ScholarItem>, ScholarError> {
        let url = format!("{}/search.json", self.base_url);
        let start = offset.to_string();
        let num = PAGE_SIZE.to_string();

        debug_assert!(
            url.starts_with("https://") || cfg!(test),
            "API key must only be sent over HTTPS"
        );

        let response = self
            .http
            .get(&url)
            .query(&[
                ("engine", "google_scholar"),
                ("q", query),
                ("hl", "en"),
                ("start", start.as_str()),
                ("num", num.as_str()),
                ("api_key", self.api_key.0.as_str()),
            ])
            .header("User-Agent", crate::USER_AGENT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SearchResponse>(&text)
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            warn!(status = %status, %message, "SerpAPI error");
            return Err(match status.as_u16() {
                401 => ScholarError::InvalidApiKey(message),
                429 => ScholarError::RateLimited,
                code => ScholarError::Api { code, message },
            });
        }

        let body: SearchResponse = response.json().await?;
        if let Some(message) = body.error {
            if message.contains(NO_RESULTS_MARKER) {
                debug!(query, offset, "SerpAPI reported no results");
                return Ok(Vec::new());
            }
            warn!(%message, "SerpAPI error in 200 response");
            return Err(ScholarError::Api {
                code: status.as_u16(),
                message,
            });
        }

        debug!(query, offset, hits = body.organic_results.len(), "scholar page fetched");
        Ok(body
            .organic_results
            .into_iter()
            .map(ScholarItem::from)
            .collect())
    }
}
