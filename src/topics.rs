//! Related-topic suggestions from a chat model, used to broaden sparse searches.

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::groq::{ChatMessage, ChatModel, GroqError};

/// Most suggestions a single call hands back.
pub const MAX_TOPICS: usize = 3;

const SYSTEM_PROMPT: &str = "\
You are a research assistant. Your task is to suggest 3 related research topics based on the user's query.
The topics should be concise, relevant, and directly related to the query.
Return the topics as a bulleted list, one topic per line, in the following format:

- Topic 1
- Topic 2
- Topic 3

For example:
If the query is \"machine learning,\" you should return:
- Deep learning algorithms and applications
- Reinforcement learning in robotics
- Natural language processing advancements

If the query is \"climate change,\" you should return:
- Impact of climate change on polar ice caps
- Renewable energy solutions for reducing carbon emissions
- Role of deforestation in global warming

Do not include any additional explanations, reasoning, or verbose text. Only return the bulleted list of topics.";

/// Source of related-topic suggestions for a query.
/// Implemented by `TopicExpander` for production; mock implementations used in tests.
pub trait TopicSource {
    async fn suggest_topics(&self, query: &str) -> Result<Vec<String>, GroqError>;
}

/// Long-lived chat session that turns a query into bulleted topic suggestions.
///
/// Every exchange stays in the session, so later requests see earlier ones. The
/// conversation lives behind an async mutex, so concurrent callers take turns and
/// each gets exactly one reply for its own request.
pub struct TopicExpander<M> {
    model: M,
    history: Mutex<Vec<ChatMessage>>,
}

impl<M: ChatModel> TopicExpander<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            history: Mutex::new(vec![ChatMessage::system(SYSTEM_PROMPT)]),
        }
    }

    #[cfg(test)]
    async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }
}

impl<M: ChatModel> TopicSource for TopicExpander<M> {
    async fn suggest_topics(&self, query: &str) -> Result<Vec<String>, GroqError> {
        let mut history = self.history.lock().await;
        history.push(ChatMessage::user(request_for(query)));
        let reply = match self.model.complete(&history).await {
            Ok(reply) => reply,
            Err(e) => {
                history.pop();
                return Err(e);
            }
        };

        let topics = extract_related_topics(&reply);
        history.push(ChatMessage::assistant(reply));

        if topics.is_empty() {
            info!(query, "model reply contained no bulleted topics");
        } else {
            debug!(query, topics = ?topics, "related topics suggested");
        }
        Ok(topics)
    }
}

fn request_for(query: &str) -> String {
    format!("Suggest 3 related research topics for '{query}'")
}

/// Keep the reply lines whose trimmed text starts with `-`, trimmed but otherwise verbatim
/// (the marker stays).
///
/// Unlike a plain line filter, a leading `<think>...</think>` block is dropped first:
/// reasoning models emit one before the answer, and bullets drafted inside it are not
/// suggestions. An unterminated block is left in place.
pub fn extract_related_topics(reply: &str) -> Vec<String> {
    strip_reasoning(reply)
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('-'))
        .take(MAX_TOPICS)
        .map(String::from)
        .collect()
}

fn strip_reasoning(reply: &str) -> &str {
    let trimmed = reply.trim_start();
    if trimmed.starts_with("<think>")
        && let Some(end) = trimmed.find("</think>")
    {
        return &trimmed[end + "</think>".len()..];
    }
    reply
}

/// Turn a suggestion line into a search term: `"- Graph neural nets"` -> `"Graph neural nets"`.
pub fn strip_bullet(topic: &str) -> &str {
    topic.trim().trim_start_matches('-').trim()
}
