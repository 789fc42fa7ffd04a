pub mod openai;

pub use openai::OpenAIClient;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Pre-compiled regex for stripping leading @mentions
static LEADING_MENTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*@\w+\s*").expect("static regex is valid"));

/// Persona used when no system prompt is configured
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an incredibly wise and smart tech mad scientist from silicon valley.
Your goal is to give a concise prediction in response to a piece of text from the user.

% RESPONSE TONE:
- Your prediction should be given in an active voice and be opinionated
- Your tone should be serious w/ a hint of wit and sarcasm

% RESPONSE FORMAT:
- Respond in under 200 characters
- Respond in two or less short sentences
- Do not respond with emojis

% RESPONSE CONTENT:
- Include specific examples of old tech if they are relevant
- If you don't have an answer, say, \"Sorry, my magic 8 ball isn't working right now\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message { role: MessageRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message { role: MessageRole::User, content: content.into() }
    }
}

/// Turns the text of a conversation root into reply text
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(&self, context_text: &str) -> Result<String, String>;
}

/// Drop the @handles a post opens with; keeps the text when nothing else is left
pub fn context_from_post(text: &str) -> String {
    let mut result = text.to_string();
    while LEADING_MENTION_PATTERN.is_match(&result) {
        result = LEADING_MENTION_PATTERN.replace(&result, "").to_string();
    }

    let result = result.trim();
    if result.is_empty() {
        text.trim().to_string()
    } else {
        result.to_string()
    }
}
