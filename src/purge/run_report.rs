use serenity::model::id::{ChannelId, GuildId};
use std::collections::BTreeMap;

/// Matched and deleted counts for one channel or guild
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub matched: u64,
    /// Confirmed deletions, or simulated ones in dry-run mode
    pub deleted: u64,
}

/// Running totals of one rule pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub matched: u64,
    pub deleted: u64,
    /// Bulk delete calls issued
    pub batches: u64,
    /// Recovered failures (permission, API)
    pub errors: u64,
    pub per_channel: BTreeMap<ChannelId, Counts>,
    pub per_guild: BTreeMap<GuildId, Counts>,
}

impl RunCounters {
    pub fn record_match(&mut self, guild_id: GuildId, channel_id: ChannelId) {
        self.matched += 1;
        self.per_channel.entry(channel_id).or_default().matched += 1;
        self.per_guild.entry(guild_id).or_default().matched += 1;
    }

    pub fn record_deleted(&mut self, guild_id: GuildId, channel_id: ChannelId, count: u64) {
        self.deleted += count;
        self.per_channel.entry(channel_id).or_default().deleted += count;
        self.per_guild.entry(guild_id).or_default().deleted += count;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn channel(&self, channel_id: ChannelId) -> Counts {
        self.per_channel.get(&channel_id).copied().unwrap_or_default()
    }

    pub fn guild(&self, guild_id: GuildId) -> Counts {
        self.per_guild.get(&guild_id).copied().unwrap_or_default()
    }
}

/// Why a pass ended before processing its scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    RuleNotFound,
    EmptyScope,
    Cancelled,
}

/// Terminal state of a rule pass
///
/// Reaching the deletion quota is a normal completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Aborted(AbortReason),
}

/// Result of one rule pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub rule: String,
    pub dry_run: bool,
    pub outcome: RunOutcome,
    pub counters: RunCounters,
}

impl RunReport {
    pub fn aborted(rule: &str, dry_run: bool, reason: AbortReason) -> Self {
        Self {
            rule: rule.to_string(),
            dry_run,
            outcome: RunOutcome::Aborted(reason),
            counters: RunCounters::default(),
        }
    }

    /// Messages deleted, or that would have been deleted in dry-run mode
    pub fn total(&self) -> u64 {
        self.counters.deleted
    }
}

/// Results of a multi-rule run, one report per rule in request order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub reports: Vec<RunReport>,
}

impl RunSummary {
    pub fn total(&self) -> u64 {
        self.reports.iter().map(RunReport::total).sum()
    }
}
