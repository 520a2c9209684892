use super::discord_service::{ChannelRef, GuildRef, ServiceError};
use serenity::model::id::{ChannelId, MessageId, UserId};

/// Result of one bulk delete call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The API confirmed this many deletions
    Deleted(usize),
    /// The API answered not-found; the messages are gone either way
    AlreadyGone(usize),
    Forbidden,
    Failed(String),
}

impl BatchOutcome {
    /// Number of messages counted as removed
    pub fn removed(&self) -> usize {
        match self {
            BatchOutcome::Deleted(count) | BatchOutcome::AlreadyGone(count) => *count,
            BatchOutcome::Forbidden | BatchOutcome::Failed(_) => 0,
        }
    }
}

/// Structured event emitted by a deletion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurgeEvent {
    RunStarted {
        rule: String,
        dry_run: bool,
    },
    RuleNotFound {
        rule: String,
    },
    ScopeEmpty {
        rule: String,
    },
    GuildStarted {
        guild: GuildRef,
    },
    GuildCompleted {
        guild: GuildRef,
    },
    ChannelStarted {
        guild: GuildRef,
        channel: ChannelRef,
    },
    ChannelCompleted {
        channel: ChannelRef,
        matched: u64,
        deleted: u64,
    },
    MessageMatched {
        channel: ChannelRef,
        message_id: MessageId,
        author_id: UserId,
        preview: String,
        dry_run: bool,
    },
    BatchFlushed {
        channel_id: ChannelId,
        requested: usize,
        outcome: BatchOutcome,
    },
    QuotaReached {
        limit: u64,
    },
    PermissionDenied {
        guild: GuildRef,
        channel: Option<ChannelRef>,
    },
    ServiceFailed {
        guild: Option<GuildRef>,
        channel: Option<ChannelRef>,
        error: ServiceError,
    },
    /// Matched messages left undeleted because the run was cancelled
    PendingDiscarded {
        channel_id: ChannelId,
        count: usize,
    },
    Cancelled,
    RunCompleted {
        rule: String,
        total: u64,
    },
}

/// Sink for run events
///
/// Injected into the pipeline so runs can be observed without a live logging backend.
pub trait PurgeReporter: Send + Sync {
    fn report(&self, event: PurgeEvent);
}
