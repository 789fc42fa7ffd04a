//! Mention pipeline: fetch mentions in the lookback window, resolve each to
//! its conversation root, and reply to the eligible ones.
//!
//! One run handles mentions strictly in fetch order. Per-mention failures are
//! counted in [`RunStats`] and never stop the run; only a failed mention fetch
//! ends a run early.

pub mod dispatch;
pub mod resolver;
pub mod window;


use crate::ai::ReplyGenerator;
use crate::channels::SocialPlatform;
use crate::config::ResponderSettings;
use crate::models::{AccountId, Mention, ReplyOutcome, RunStats};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// What happened to one mention within a run
#[derive(Debug, Clone, PartialEq, Eq)]
enum MentionOutcome {
    /// Root unresolved, or the mention is its own root
    Skipped,
    Attempted(ReplyOutcome),
}

pub struct MentionResponder {
    platform: Arc<dyn SocialPlatform>,
    generator: Arc<dyn ReplyGenerator>,
    /// Resolved once at startup
    account_id: AccountId,
    settings: ResponderSettings,
}

impl MentionResponder {
    pub fn new(
        platform: Arc<dyn SocialPlatform>,
        generator: Arc<dyn ReplyGenerator>,
        account_id: AccountId,
        settings: ResponderSettings,
    ) -> Self {
        MentionResponder {
            platform,
            generator,
            account_id,
            settings,
        }
    }

    /// Resolve the bot's own account and build the responder.
    /// Fails when the identity lookup fails.
    pub async fn connect(
        platform: Arc<dyn SocialPlatform>,
        generator: Arc<dyn ReplyGenerator>,
        settings: ResponderSettings,
    ) -> Result<Self, String> {
        let account_id = platform
            .resolve_self_identity()
            .await
            .map_err(|e| format!("Failed to resolve bot identity: {}", e))?;
        Ok(Self::new(platform, generator, account_id, settings))
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Execute one pipeline run with `now` as the end of the lookback window.
    ///
    /// Returns `Err` only when the mention fetch fails.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<RunStats, String> {
        log::info!("Starting job at {}", now.to_rfc3339());

        let window_start = window::window_start(now, self.settings.lookback_minutes);
        let mentions = self
            .platform
            .fetch_mentions(&self.account_id, &window_start)
            .await
            .map_err(|e| format!("Failed to fetch mentions since {}: {}", window_start, e))?;

        let mut stats = RunStats::default();

        if mentions.is_empty() {
            log::info!("No mentions found since {}", window_start);
            log_summary(&stats);
            return Ok(stats);
        }

        stats.found = mentions.len();
        log::info!("Found {} mention(s) since {}", stats.found, window_start);

        for mention in mentions.iter().take(self.settings.response_limit) {
            match self.process_mention(mention).await {
                MentionOutcome::Skipped => stats.skipped += 1,
                MentionOutcome::Attempted(outcome) => stats.record(&outcome),
            }
        }

        if stats.deferred() > 0 {
            log::info!(
                "Reply cap of {} reached, {} mention(s) left for a later run",
                self.settings.response_limit,
                stats.deferred()
            );
        }

        log_summary(&stats);
        Ok(stats)
    }

    async fn process_mention(&self, mention: &Mention) -> MentionOutcome {
        log::debug!(
            "Processing mention {} (created {:?}): {}",
            mention.id,
            mention.created_at,
            mention.preview()
        );

        let resolution = resolver::resolve_conversation_root(self.platform.as_ref(), mention).await;
        let Some(root) = resolver::eligible_root(mention, &resolution) else {
            log::debug!("Skipping mention {} (no separate conversation root)", mention.id);
            return MentionOutcome::Skipped;
        };

        let reply_text = match self.generator.generate_reply(&root.text).await {
            Ok(text) => text,
            Err(reason) => {
                log::error!("Failed to generate reply for mention {}: {}", mention.id, reason);
                return MentionOutcome::Attempted(ReplyOutcome::Failed { reason });
            }
        };

        let outcome = dispatch::dispatch_reply(self.platform.as_ref(), mention, &reply_text).await;
        match &outcome {
            ReplyOutcome::Posted { reply_id } => {
                log::info!("Replied to mention {} with post {}", mention.id, reply_id)
            }
            ReplyOutcome::Failed { reason } => {
                log::error!("Failed to reply to mention {}: {}", mention.id, reason)
            }
        }
        MentionOutcome::Attempted(outcome)
    }
}

fn log_summary(stats: &RunStats) {
    log::info!(
        "Finished job at {}, found: {}, replied: {}, errors: {}, skipped: {}",
        Utc::now().to_rfc3339(),
        stats.found,
        stats.replied,
        stats.errors,
        stats.skipped
    );
}
