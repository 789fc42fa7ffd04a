//! Conversation-root lookup and the reply eligibility rule

use crate::channels::SocialPlatform;
use crate::models::{ConversationRoot, Mention, Resolution};

/// Look up the post that started the mention's thread.
///
/// Lookup failures are reported as [`Resolution::Unresolved`], never as errors.
pub async fn resolve_conversation_root(platform: &dyn SocialPlatform, mention: &Mention) -> Resolution {
    let Some(conversation_id) = mention.conversation_id.as_deref() else {
        log::debug!("Mention {} has no conversation id", mention.id);
        return Resolution::Unresolved;
    };

    // The mention started its own thread; no lookup needed
    if conversation_id == mention.id {
        return Resolution::Resolved(ConversationRoot {
            id: mention.id.clone(),
            text: mention.text.clone(),
        });
    }

    match platform.fetch_post(conversation_id).await {
        Ok(Some(root)) => Resolution::Resolved(root),
        Ok(None) => {
            log::info!(
                "Conversation root {} for mention {} not found",
                conversation_id,
                mention.id
            );
            Resolution::Unresolved
        }
        Err(e) => {
            log::warn!(
                "Failed to look up conversation root {} for mention {}: {}",
                conversation_id,
                mention.id,
                e
            );
            Resolution::Unresolved
        }
    }
}

/// The root to reply about, if the mention warrants a reply: the root must be
/// resolved and must be a different post than the mention itself.
pub fn eligible_root<'a>(mention: &Mention, resolution: &'a Resolution) -> Option<&'a ConversationRoot> {
    resolution.root().filter(|root| root.id != mention.id)
}
