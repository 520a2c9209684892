use crate::adapters::{
    BatchOutcome, ChannelRef, DiscordService, GuildRef, PurgeEvent, PurgeReporter, ServiceError,
};
use crate::purge::batch_accumulator::BatchAccumulator;
use crate::purge::config::PurgeConfig;
use crate::purge::message_preview::preview_content;
use crate::purge::rate_limiter::RateLimiter;
use crate::purge::run_report::{AbortReason, RunCounters, RunOutcome, RunReport, RunSummary};
use crate::rules::{FilterableMessage, RuleSet};
use futures::StreamExt as _;
use serenity::model::id::{ChannelId, GuildId, RoleId, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Which guilds and channels a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every guild the bot has joined
    AllGuilds,
    Guild(GuildId),
    Channel {
        guild_id: GuildId,
        channel_id: ChannelId,
    },
}

/// A guild to process, with its channels when the scope already resolved them
struct Target {
    guild: GuildRef,
    channels: Option<Vec<ChannelRef>>,
}

/// Mutable state of one rule pass
struct PassState<'a> {
    rule: &'a str,
    needs_roles: bool,
    counters: RunCounters,
    /// Member roles of authors in the current guild
    roles: HashMap<UserId, Option<Vec<RoleId>>>,
    quota_reported: bool,
    cancelled: bool,
}

/// Find matching messages and delete them in rate-limited batches
///
/// One run processes guilds, channels and messages strictly in sequence.
/// The rule set is shared read-only; counters and batches belong to a single pass.
pub struct DeletionPipeline<S, R>
where
    S: DiscordService,
    R: PurgeReporter,
{
    service: Arc<S>,
    rules: Arc<RuleSet>,
    reporter: Arc<R>,
    config: PurgeConfig,
    rate_limiter: RateLimiter,
    cancel: CancellationToken,
}

impl<S, R> DeletionPipeline<S, R>
where
    S: DiscordService,
    R: PurgeReporter,
{
    /// Create a new DeletionPipeline
    ///
    /// # Arguments
    ///
    /// * `service` - The Discord service for history and delete calls
    /// * `rules` - Compiled rules to evaluate
    /// * `reporter` - Sink for run events
    /// * `config` - Dry-run flag, quota, batch size and call interval
    pub fn new(service: Arc<S>, rules: Arc<RuleSet>, reporter: Arc<R>, config: PurgeConfig) -> Self {
        let rate_limiter = RateLimiter::new(config.call_interval());
        Self {
            service,
            rules,
            reporter,
            config,
            rate_limiter,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop the run when `cancel` fires
    ///
    /// Cancellation is observed between guilds, channels and messages, never
    /// in the middle of a delete call.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &PurgeConfig {
        &self.config
    }

    /// Run each rule as an independent full pass over the scope
    pub async fn run<N: AsRef<str>>(&self, rule_names: &[N], scope: Scope) -> RunSummary {
        let mut summary = RunSummary::default();

        for rule in rule_names {
            if self.cancel.is_cancelled() {
                break;
            }
            summary.reports.push(self.run_rule(rule.as_ref(), scope).await);
        }

        summary
    }

    /// Run one rule over the scope
    ///
    /// Never fails: unknown rules and empty scopes end the pass with zero
    /// deletions and a reported event.
    pub async fn run_rule(&self, rule: &str, scope: Scope) -> RunReport {
        let dry_run = self.config.dry_run;
        self.reporter.report(PurgeEvent::RunStarted {
            rule: rule.to_string(),
            dry_run,
        });

        if !self.rules.contains(rule) {
            self.reporter.report(PurgeEvent::RuleNotFound {
                rule: rule.to_string(),
            });
            return RunReport::aborted(rule, dry_run, AbortReason::RuleNotFound);
        }

        let targets = self.resolve_scope(scope).await;
        if targets.is_empty() {
            self.reporter.report(PurgeEvent::ScopeEmpty {
                rule: rule.to_string(),
            });
            return RunReport::aborted(rule, dry_run, AbortReason::EmptyScope);
        }

        let mut pass = PassState {
            rule,
            needs_roles: self.rules.needs_role_context(rule),
            counters: RunCounters::default(),
            roles: HashMap::new(),
            quota_reported: false,
            cancelled: false,
        };

        for target in targets {
            if self.should_stop(&mut pass) {
                break;
            }
            self.process_guild(&mut pass, target).await;
        }

        let outcome = if pass.cancelled {
            RunOutcome::Aborted(AbortReason::Cancelled)
        } else {
            RunOutcome::Completed
        };

        self.reporter.report(PurgeEvent::RunCompleted {
            rule: rule.to_string(),
            total: pass.counters.deleted,
        });

        RunReport {
            rule: rule.to_string(),
            dry_run,
            outcome,
            counters: pass.counters,
        }
    }

    /// Resolve the scope into guilds (and channels, for a single-channel scope)
    async fn resolve_scope(&self, scope: Scope) -> Vec<Target> {
        let guilds = match self.service.guilds().await {
            Ok(guilds) => guilds,
            Err(error) => {
                self.reporter.report(PurgeEvent::ServiceFailed {
                    guild: None,
                    channel: None,
                    error,
                });
                return Vec::new();
            }
        };

        match scope {
            Scope::AllGuilds => guilds
                .into_iter()
                .map(|guild| Target {
                    guild,
                    channels: None,
                })
                .collect(),
            Scope::Guild(guild_id) => guilds
                .into_iter()
                .filter(|guild| guild.id == guild_id)
                .map(|guild| Target {
                    guild,
                    channels: None,
                })
                .collect(),
            Scope::Channel {
                guild_id,
                channel_id,
            } => {
                let Some(guild) = guilds.into_iter().find(|guild| guild.id == guild_id) else {
                    return Vec::new();
                };
                let Some(channels) = self.list_channels(&guild).await else {
                    return Vec::new();
                };
                let channels: Vec<ChannelRef> = channels
                    .into_iter()
                    .filter(|channel| channel.id == channel_id)
                    .collect();
                if channels.is_empty() {
                    return Vec::new();
                }
                vec![Target {
                    guild,
                    channels: Some(channels),
                }]
            }
        }
    }

    /// Text channels of a guild; failures are reported and yield `None`
    async fn list_channels(&self, guild: &GuildRef) -> Option<Vec<ChannelRef>> {
        match self.service.text_channels(guild.id).await {
            Ok(channels) => Some(channels),
            Err(ServiceError::Forbidden) => {
                self.reporter.report(PurgeEvent::PermissionDenied {
                    guild: guild.clone(),
                    channel: None,
                });
                None
            }
            Err(error) => {
                self.reporter.report(PurgeEvent::ServiceFailed {
                    guild: Some(guild.clone()),
                    channel: None,
                    error,
                });
                None
            }
        }
    }

    /// Check cancellation and quota, reporting each once per pass
    fn should_stop(&self, pass: &mut PassState<'_>) -> bool {
        if self.cancel.is_cancelled() {
            if !pass.cancelled {
                pass.cancelled = true;
                self.reporter.report(PurgeEvent::Cancelled);
            }
            return true;
        }

        if self.quota_reached(pass) {
            if !pass.quota_reported {
                pass.quota_reported = true;
                self.reporter.report(PurgeEvent::QuotaReached {
                    limit: self.config.max_deletions_per_run,
                });
            }
            return true;
        }

        false
    }

    /// Matches count against the quota at match time in both modes, so a
    /// pass never queues more than the quota.
    fn quota_reached(&self, pass: &PassState<'_>) -> bool {
        pass.counters.matched >= self.config.max_deletions_per_run
    }

    async fn process_guild(&self, pass: &mut PassState<'_>, target: Target) {
        let guild = target.guild;
        self.reporter.report(PurgeEvent::GuildStarted {
            guild: guild.clone(),
        });

        let channels = match target.channels {
            Some(channels) => channels,
            None => match self.list_channels(&guild).await {
                Some(channels) => channels,
                None => {
                    pass.counters.record_error();
                    self.reporter.report(PurgeEvent::GuildCompleted { guild });
                    return;
                }
            },
        };

        pass.roles.clear();

        for channel in &channels {
            if self.should_stop(pass) {
                break;
            }
            self.process_channel(pass, &guild, channel).await;
        }

        self.reporter.report(PurgeEvent::GuildCompleted { guild });
    }

    async fn process_channel(&self, pass: &mut PassState<'_>, guild: &GuildRef, channel: &ChannelRef) {
        self.reporter.report(PurgeEvent::ChannelStarted {
            guild: guild.clone(),
            channel: channel.clone(),
        });

        let mut history = self.service.message_history(guild.id, channel.id);
        let mut batch = BatchAccumulator::new(channel.id, self.config.batch_threshold());

        loop {
            if self.should_stop(pass) {
                break;
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => continue,
                next = history.next() => next,
            };

            let message = match next {
                None => break,
                Some(Ok(message)) => message,
                Some(Err(ServiceError::Forbidden)) => {
                    pass.counters.record_error();
                    self.reporter.report(PurgeEvent::PermissionDenied {
                        guild: guild.clone(),
                        channel: Some(channel.clone()),
                    });
                    break;
                }
                Some(Err(error)) => {
                    pass.counters.record_error();
                    self.reporter.report(PurgeEvent::ServiceFailed {
                        guild: Some(guild.clone()),
                        channel: Some(channel.clone()),
                        error,
                    });
                    break;
                }
            };

            let roles = self.resolve_roles(pass, guild.id, &message).await;
            if !self.rules.matches(pass.rule, &message, roles.as_deref()) {
                continue;
            }

            pass.counters.record_match(guild.id, channel.id);
            self.reporter.report(PurgeEvent::MessageMatched {
                channel: channel.clone(),
                message_id: message.message_id(),
                author_id: message.author_id(),
                preview: preview_content(message.content()),
                dry_run: self.config.dry_run,
            });

            if self.config.dry_run {
                // Simulated deletions count immediately
                pass.counters.record_deleted(guild.id, channel.id, 1);
                continue;
            }

            batch.add(message.message_id());
            if batch.should_flush() {
                self.flush(pass, guild.id, &mut batch).await;
            }
        }

        drop(history);

        if !batch.is_empty() {
            if pass.cancelled {
                let count = batch.drain().len();
                self.reporter.report(PurgeEvent::PendingDiscarded {
                    channel_id: channel.id,
                    count,
                });
            } else {
                // End of channel, quota or history error: flush what was matched
                self.flush(pass, guild.id, &mut batch).await;
            }
        }

        let counts = pass.counters.channel(channel.id);
        self.reporter.report(PurgeEvent::ChannelCompleted {
            channel: channel.clone(),
            matched: counts.matched,
            deleted: counts.deleted,
        });
    }

    /// Issue one bulk delete for everything pending, then wait out the interval
    ///
    /// Not retried on failure.
    async fn flush(&self, pass: &mut PassState<'_>, guild_id: GuildId, batch: &mut BatchAccumulator) {
        let channel_id = batch.channel_id();
        let message_ids = batch.drain();
        if message_ids.is_empty() {
            return;
        }

        let outcome = match self.service.delete_batch(channel_id, &message_ids).await {
            Ok(deleted) => BatchOutcome::Deleted(deleted),
            Err(ServiceError::NotFound) => BatchOutcome::AlreadyGone(message_ids.len()),
            Err(ServiceError::Forbidden) => BatchOutcome::Forbidden,
            Err(ServiceError::Other(err)) => BatchOutcome::Failed(err),
        };

        pass.counters.batches += 1;
        if matches!(outcome, BatchOutcome::Forbidden | BatchOutcome::Failed(_)) {
            pass.counters.record_error();
        }
        pass.counters
            .record_deleted(guild_id, channel_id, outcome.removed() as u64);

        self.reporter.report(PurgeEvent::BatchFlushed {
            channel_id,
            requested: message_ids.len(),
            outcome,
        });

        self.rate_limiter.wait().await;
    }

    /// Member roles of the message author, when the rule needs them
    ///
    /// Looked up once per author and guild. Lookup failures mean no role
    /// context, so role predicates evaluate to false.
    async fn resolve_roles(
        &self,
        pass: &mut PassState<'_>,
        guild_id: GuildId,
        message: &S::Message,
    ) -> Option<Vec<RoleId>> {
        if !pass.needs_roles || message.member_role_ids().is_some() {
            return None;
        }

        let author_id = message.author_id();
        if let Some(roles) = pass.roles.get(&author_id) {
            return roles.clone();
        }

        let roles = match self.service.member_roles(guild_id, author_id).await {
            Ok(roles) => roles,
            Err(err) => {
                debug!(
                    guild_id = %guild_id,
                    author_id = %author_id,
                    error = %err,
                    "Failed to resolve member roles"
                );
                None
            }
        };
        pass.roles.insert(author_id, roles.clone());
        roles
    }
}
