use crate::channels::SocialPlatform;
use crate::models::{Mention, ReplyOutcome};

/// Post `text` as a reply to the mention. Exactly one attempt; a failure of
/// any kind becomes [`ReplyOutcome::Failed`].
pub async fn dispatch_reply(platform: &dyn SocialPlatform, mention: &Mention, text: &str) -> ReplyOutcome {
    match platform.post_reply(text, &mention.id).await {
        Ok(reply_id) => ReplyOutcome::Posted { reply_id },
        Err(reason) => ReplyOutcome::Failed { reason },
    }
}
