//! arXiv lookup that falls back to model-suggested topics when the direct search is sparse.

use tracing::{debug, info, warn};

use crate::arxiv::FeedSearch;
use crate::paper::{MAX_PAPERS, PaperRecord};
use crate::topics::{TopicSource, strip_bullet};

pub struct Aggregator<F, T> {
    feed: F,
    expander: Option<T>,
}

impl<F: FeedSearch, T: TopicSource> Aggregator<F, T> {
    pub fn new(feed: F, expander: Option<T>) -> Self {
        Self { feed, expander }
    }

    /// Up to [`MAX_PAPERS`] papers for `query`, in source order, never failing.
    ///
    /// Provider failures are logged and count as zero results. When the direct search
    /// comes up short, the expander is asked once for related topics, and each topic is
    /// searched in turn until the target is reached. Duplicates are kept.
    pub async fn fetch(&self, query: &str) -> Vec<PaperRecord> {
        let mut papers = self.search_or_empty(query).await;
        if papers.len() >= MAX_PAPERS {
            papers.truncate(MAX_PAPERS);
            return papers;
        }

        let Some(expander) = &self.expander else {
            debug!(query, papers = papers.len(), "topic expansion unavailable");
            return papers;
        };

        let topics = match expander.suggest_topics(query).await {
            Ok(topics) => topics,
            Err(e) => {
                warn!(error = %e, query, "topic expansion failed");
                return papers;
            }
        };
        info!(query, found = papers.len(), topics = topics.len(), "expanding sparse search");

        for topic in &topics {
            if papers.len() >= MAX_PAPERS {
                break;
            }
            let term = strip_bullet(topic);
            if term.is_empty() {
                continue;
            }
            papers.extend(self.search_or_empty(term).await);
            papers.truncate(MAX_PAPERS);
        }

        papers
    }

    async fn search_or_empty(&self, term: &str) -> Vec<PaperRecord> {
        match self.feed.search(term).await {
            Ok(papers) => papers,
            Err(e) => {
                warn!(error = %e, term, "arXiv search failed, treating as no results");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arxiv::ArxivError;
    use crate::groq::GroqError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockFeed {
        results: HashMap<String, Result<usize, u16>>,
        queries: Mutex<Vec<String>>,
    }

    impl MockFeed {
        fn with(results: &[(&str, usize)]) -> Self {
            Self {
                results: results
                    .iter()
                    .map(|(term, n)| (term.to_string(), Ok(*n)))
                    .collect(),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self, term: &str, status: u16) -> Self {
            self.results.insert(term.to_string(), Err(status));
            self
        }

        fn captured_queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl FeedSearch for &MockFeed {
        async fn search(&self, term: &str) -> Result<Vec<PaperRecord>, ArxivError> {
            self.queries.lock().unwrap().push(term.to_string());
            match self.results.get(term).copied().unwrap_or(Ok(0)) {
                Ok(n) => Ok((1..=n)
                    .map(|i| {
                        PaperRecord::new(
                            format!("{term} #{i}"),
                            "summary",
                            format!("http://arxiv.org/abs/{term}-{i}"),
                        )
                    })
                    .collect()),
                Err(status) => Err(ArxivError::Status(status)),
            }
        }
    }

    struct MockTopics {
        reply: Result<Vec<String>, ()>,
        calls: Mutex<usize>,
    }

    impl MockTopics {
        fn with(topics: &[&str]) -> Self {
            Self {
                reply: Ok(topics.iter().map(|t| t.to_string()).collect()),
                calls: Mutex::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(()),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl TopicSource for &MockTopics {
        async fn suggest_topics(&self, _query: &str) -> Result<Vec<String>, GroqError> {
            *self.calls.lock().unwrap() += 1;
            self.reply.clone().map_err(|_| GroqError::EmptyReply)
        }
    }

    #[tokio::test]
    async fn full_direct_result_skips_expansion() {
        let feed = MockFeed::with(&[("x", 5)]);
        let topics = MockTopics::with(&["- t1"]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 5);
        assert_eq!(topics.call_count(), 0);
        assert_eq!(feed.captured_queries(), vec!["x"]);
    }

    #[tokio::test]
    async fn sparse_result_expands_until_target() {
        let feed = MockFeed::with(&[("x", 2), ("t1", 3), ("t2", 1)]);
        let topics = MockTopics::with(&["- t1", "- t2", "- t3"]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 5);
        assert_eq!(topics.call_count(), 1);
        assert_eq!(feed.captured_queries(), vec!["x", "t1"]);
        assert_eq!(papers[0].title, "x #1");
        assert_eq!(papers[2].title, "t1 #1");
    }

    #[tokio::test]
    async fn overflow_from_expansion_is_truncated() {
        let feed = MockFeed::with(&[("x", 4), ("t1", 5)]);
        let topics = MockTopics::with(&["- t1", "- t2"]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 5);
        assert_eq!(papers[4].title, "t1 #1");
        assert_eq!(feed.captured_queries(), vec!["x", "t1"]);
    }

    #[tokio::test]
    async fn bullet_marker_is_stripped_before_searching() {
        let feed = MockFeed::with(&[("x", 0)]);
        let topics = MockTopics::with(&["- Graph neural networks", "-Message passing"]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        aggregator.fetch("x").await;

        assert_eq!(
            feed.captured_queries(),
            vec!["x", "Graph neural networks", "Message passing"]
        );
    }

    #[tokio::test]
    async fn exhausted_topics_return_short_list() {
        let feed = MockFeed::with(&[("x", 1), ("t1", 1), ("t2", 1)]);
        let topics = MockTopics::with(&["- t1", "-", "- t2"]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 3);
        assert_eq!(feed.captured_queries(), vec!["x", "t1", "t2"]);
    }

    #[tokio::test]
    async fn duplicates_across_queries_are_kept() {
        let feed = MockFeed::with(&[("x", 1)]);
        let topics = MockTopics::with(&["- x"]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0], papers[1]);
    }

    #[tokio::test]
    async fn no_expander_returns_direct_results() {
        let feed = MockFeed::with(&[("x", 2)]);
        let aggregator: Aggregator<&MockFeed, &MockTopics> = Aggregator::new(&feed, None);

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 2);
        assert_eq!(feed.captured_queries(), vec!["x"]);
    }

    #[tokio::test]
    async fn empty_suggestions_return_direct_results() {
        let feed = MockFeed::with(&[("x", 3)]);
        let topics = MockTopics::with(&[]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 3);
        assert_eq!(topics.call_count(), 1);
    }

    #[tokio::test]
    async fn expander_failure_returns_direct_results() {
        let feed = MockFeed::with(&[("x", 3)]);
        let topics = MockTopics::failing();
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 3);
        assert_eq!(feed.captured_queries(), vec!["x"]);
    }

    #[tokio::test]
    async fn failed_direct_search_still_expands() {
        let feed = MockFeed::with(&[("t1", 2)]).failing("x", 503);
        let topics = MockTopics::with(&["- t1"]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "t1 #1");
    }

    #[tokio::test]
    async fn failed_expanded_search_moves_to_next_topic() {
        let feed = MockFeed::with(&[("x", 1), ("t2", 1)]).failing("t1", 500);
        let topics = MockTopics::with(&["- t1", "- t2"]);
        let aggregator = Aggregator::new(&feed, Some(&topics));

        let papers = aggregator.fetch("x").await;

        assert_eq!(papers.len(), 2);
        assert_eq!(feed.captured_queries(), vec!["x", "t1", "t2"]);
    }

    #[tokio::test]
    async fn empty_query_is_forwarded() {
        let feed = MockFeed::with(&[]);
        let aggregator: Aggregator<&MockFeed, &MockTopics> = Aggregator::new(&feed, None);

        let papers = aggregator.fetch("").await;

        assert!(papers.is_empty());
        assert_eq!(feed.captured_queries(), vec![""]);
    }
}
