// Trait definitions
pub mod discord_service;
pub mod purge_reporter;

// Implementations
pub mod serenity_discord_service;
pub mod tracing_reporter;

// Re-exports for convenience
pub use discord_service::{
    BULK_DELETE_MAX_AGE_SECS, ChannelRef, DiscordService, GuildRef, MAX_BULK_DELETE, MessageStream,
    ServiceError, is_bulk_deletable,
};
pub use purge_reporter::{BatchOutcome, PurgeEvent, PurgeReporter};
pub use serenity_discord_service::SerenityDiscordService;
pub use tracing_reporter::TracingReporter;
