//! Chat completions against Groq's OpenAI-compatible endpoint.

pub(crate) mod client;
pub(crate) mod types;

pub use client::{AgentConfig, ChatModel, GroqClient, GroqError};
pub use types::ChatMessage;
