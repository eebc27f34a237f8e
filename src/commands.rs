use std::time::Duration;

use reqwest::Client;
use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::arxiv::ArxivClient;
use crate::groq::{AgentConfig, GroqClient};
use crate::markdown::format_papers;
use crate::paper::PaperRecord;
use crate::scholar::{self, ScholarError, SerpApiClient};
use crate::topics::TopicExpander;

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Global HTTP client timeout covering DNS + connect + response body.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum redirect hops before aborting.
const MAX_REDIRECTS: usize = 5;

/// Papers found for one query.
#[derive(Debug)]
pub(crate) struct Report {
    pub source: &'static str,
    pub query: String,
    pub papers: Vec<PaperRecord>,
}

pub(crate) fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

/// Optional because expansion is a best-effort extra: without a key the arXiv search still runs.
pub(crate) fn topic_expander(http: Client) -> Option<TopicExpander<GroqClient>> {
    AgentConfig::from_env()
        .inspect_err(|e| warn!("topic expansion not available: {e}"))
        .ok()
        .map(|config| {
            info!(model = config.model(), "topic expansion enabled");
            TopicExpander::new(GroqClient::new(http, config))
        })
}

pub(crate) async fn arxiv(
    http: Client,
    query: &str,
    expander: Option<TopicExpander<GroqClient>>,
) -> Report {
    let aggregator = Aggregator::new(ArxivClient::new(http), expander);
    let papers = aggregator.fetch(query).await;
    info!(papers = papers.len(), "arxiv complete");
    Report {
        source: "arXiv",
        query: query.to_string(),
        papers,
    }
}

pub(crate) async fn scholar(http: Client, query: &str) -> Result<Report, ScholarError> {
    let client = SerpApiClient::from_env(http)?;
    let papers = scholar::search_scholar(&client, query).await?;
    info!(papers = papers.len(), "scholar complete");
    Ok(Report {
        source: "Google Scholar",
        query: query.to_string(),
        papers,
    })
}

pub(crate) fn render(report: &Report, json: bool) -> Result<String, serde_json::Error> {
    if json {
        return serde_json::to_string_pretty(&report.papers);
    }
    Ok(format_papers(report.source, &report.query, &report.papers))
}
