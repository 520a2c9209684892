use super::purge_reporter::{BatchOutcome, PurgeEvent, PurgeReporter};
use tracing::{error, info, warn};

/// Implementation for reporting run events via tracing
pub struct TracingReporter;

impl PurgeReporter for TracingReporter {
    fn report(&self, event: PurgeEvent) {
        match event {
            PurgeEvent::RunStarted { rule, dry_run } => {
                info!(%rule, dry_run, "Starting deletion for rule");
            }
            PurgeEvent::RuleNotFound { rule } => {
                error!(%rule, "Rule not found");
            }
            PurgeEvent::ScopeEmpty { rule } => {
                warn!(%rule, "No guilds accessible");
            }
            PurgeEvent::GuildStarted { guild } => {
                info!(guild_id = %guild.id, guild_name = %guild.name, "Processing guild");
            }
            PurgeEvent::GuildCompleted { guild } => {
                info!(guild_id = %guild.id, guild_name = %guild.name, "Completed processing guild");
            }
            PurgeEvent::ChannelStarted { guild, channel } => {
                info!(
                    guild_id = %guild.id,
                    channel_id = %channel.id,
                    channel_name = %channel.name,
                    "Processing channel"
                );
            }
            PurgeEvent::ChannelCompleted {
                channel,
                matched,
                deleted,
            } => {
                info!(
                    channel_id = %channel.id,
                    channel_name = %channel.name,
                    matched,
                    deleted,
                    "Completed processing channel"
                );
            }
            PurgeEvent::MessageMatched {
                channel,
                message_id,
                author_id,
                preview,
                dry_run,
            } => {
                if dry_run {
                    info!(
                        %message_id,
                        %author_id,
                        channel_name = %channel.name,
                        content = %preview,
                        "[DRY RUN] Would delete message"
                    );
                } else {
                    info!(
                        %message_id,
                        %author_id,
                        channel_name = %channel.name,
                        content = %preview,
                        "Queued message for deletion"
                    );
                }
            }
            PurgeEvent::BatchFlushed {
                channel_id,
                requested,
                outcome,
            } => match outcome {
                BatchOutcome::Deleted(deleted) => {
                    info!(%channel_id, requested, deleted, "Deleted message batch");
                }
                BatchOutcome::AlreadyGone(count) => {
                    warn!(%channel_id, requested, count, "Messages not found, counting as deleted");
                }
                BatchOutcome::Forbidden => {
                    error!(%channel_id, requested, "Permission denied to delete messages");
                }
                BatchOutcome::Failed(err) => {
                    error!(%channel_id, requested, error = %err, "Failed to delete message batch");
                }
            },
            PurgeEvent::QuotaReached { limit } => {
                info!(limit, "Reached maximum deletions limit");
            }
            PurgeEvent::PermissionDenied { guild, channel } => match channel {
                Some(channel) => warn!(
                    guild_name = %guild.name,
                    channel_name = %channel.name,
                    "Permission denied for channel"
                ),
                None => warn!(guild_name = %guild.name, "Permission denied for guild"),
            },
            PurgeEvent::ServiceFailed {
                guild,
                channel,
                error,
            } => {
                let guild_name = guild.map(|g| g.name).unwrap_or_default();
                let channel_name = channel.map(|c| c.name).unwrap_or_default();
                error!(
                    %guild_name,
                    %channel_name,
                    %error,
                    "Discord API call failed"
                );
            }
            PurgeEvent::PendingDiscarded { channel_id, count } => {
                warn!(%channel_id, count, "Run cancelled, pending messages were not deleted");
            }
            PurgeEvent::Cancelled => {
                warn!("Run cancelled");
            }
            PurgeEvent::RunCompleted { rule, total } => {
                info!(%rule, total, "Deletion completed");
            }
        }
    }
}
