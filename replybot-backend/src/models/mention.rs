use chrono::{DateTime, Utc};

/// Platform-assigned post identifier (tweet id)
pub type PostId = String;

/// Platform-assigned account identifier (user id)
pub type AccountId = String;

/// A post that references the bot's account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub id: PostId,
    pub text: String,
    /// Id of the post that started the thread, when the platform reports one
    pub conversation_id: Option<PostId>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
impl Mention {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Mention {
            id: id.into(),
            text: text.into(),
            conversation_id: None,
            created_at: None,
        }
    }

    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

impl Mention {
    /// Short preview for log lines
    pub fn preview(&self) -> String {
        preview_text(&self.text, 50)
    }
}

/// A single post as returned by a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub text: String,
}

/// The post that began the thread a mention belongs to
pub type ConversationRoot = Post;

pub(crate) fn preview_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}
