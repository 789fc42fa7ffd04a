//! Social platform collaborators
//!
//! The mention pipeline only talks to the platform through [`SocialPlatform`];
//! [`TwitterClient`] is the production implementation.

pub mod oauth;
pub mod twitter;

pub use twitter::TwitterClient;

use crate::models::{AccountId, Mention, Post, PostId};
use async_trait::async_trait;

#[async_trait]
pub trait SocialPlatform: Send + Sync {
    /// Account id of the authenticated bot. Called once at startup.
    async fn resolve_self_identity(&self) -> Result<AccountId, String>;

    /// Mentions of `account_id` created at or after `window_start`
    /// (`%Y-%m-%dT%H:%M:%SZ`). An empty list is not an error.
    async fn fetch_mentions(&self, account_id: &str, window_start: &str) -> Result<Vec<Mention>, String>;

    /// Look up a single post. `Ok(None)` when the platform reports no such post.
    async fn fetch_post(&self, post_id: &str) -> Result<Option<Post>, String>;

    /// Post `text` as a reply to `in_reply_to_id`, returning the new post's id
    async fn post_reply(&self, text: &str, in_reply_to_id: &str) -> Result<PostId, String>;
}
