pub mod mention;
pub mod run_stats;

pub use mention::{AccountId, ConversationRoot, Mention, Post, PostId};
pub use run_stats::{ReplyOutcome, Resolution, RunStats};
