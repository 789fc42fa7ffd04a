use super::mention::{ConversationRoot, PostId};

/// Outcome of looking up the root of a mention's conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ConversationRoot),
    /// No conversation id on the mention, or the lookup failed
    Unresolved,
}

impl Resolution {
    pub fn root(&self) -> Option<&ConversationRoot> {
        match self {
            Resolution::Resolved(root) => Some(root),
            Resolution::Unresolved => None,
        }
    }
}

/// Result of the single reply attempt made for a mention
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Posted { reply_id: PostId },
    Failed { reason: String },
}

/// Per-run counters, built fresh for every run and returned to the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Mentions returned by the fetch, before the reply cap is applied
    pub found: usize,
    pub replied: usize,
    pub errors: usize,
    /// Processed mentions whose root was unresolved or was the mention itself
    pub skipped: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: &ReplyOutcome) {
        match outcome {
            ReplyOutcome::Posted { .. } => self.replied += 1,
            ReplyOutcome::Failed { .. } => self.errors += 1,
        }
    }

    /// Mentions returned by the fetch but left for a later run by the reply cap
    pub fn deferred(&self) -> usize {
        self.found.saturating_sub(self.processed())
    }

    pub fn processed(&self) -> usize {
        self.replied + self.errors + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let mut stats = RunStats { found: 3, ..Default::default() };
        stats.record(&ReplyOutcome::Posted { reply_id: "1".to_string() });
        stats.record(&ReplyOutcome::Failed { reason: "boom".to_string() });
        stats.skipped += 1;

        assert_eq!(stats.replied, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.processed(), 3);
        assert_eq!(stats.deferred(), 0);
    }

    #[test]
    fn test_resolution_root() {
        assert!(Resolution::Unresolved.root().is_none());
        let root = ConversationRoot { id: "5".to_string(), text: "hello".to_string() };
        assert_eq!(Resolution::Resolved(root.clone()).root(), Some(&root));
    }
}
