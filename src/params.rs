use anyhow::Context as _;
use serde::Deserialize;
use serenity::model::id::{ChannelId, GuildId};
use std::num::NonZeroU64;

use crate::purge::{PurgeConfig, Scope};
use crate::rules::RuleSet;

/// Default path of the rules file
fn default_rules_file() -> String {
    "rules.json".to_string()
}

fn default_dry_run() -> bool {
    PurgeConfig::default().dry_run
}

fn default_max_deletions_per_run() -> u64 {
    PurgeConfig::default().max_deletions_per_run
}

fn default_batch_size() -> usize {
    PurgeConfig::default().batch_size
}

fn default_api_call_interval() -> f64 {
    PurgeConfig::default().api_call_interval
}

/// Default maximum group nesting level in rule definitions
fn default_max_rule_depth() -> usize {
    RuleSet::DEFAULT_MAX_DEPTH
}

#[derive(Deserialize, Clone)]
pub struct Params {
    pub discord_token: String,

    // Rules
    #[serde(default = "default_rules_file")]
    pub rules_file: String,
    /// Comma separated rule names, run in order
    pub purge_rules: String,
    #[serde(default = "default_max_rule_depth")]
    pub max_rule_depth: usize,

    // Scope (snowflakes are never zero)
    #[serde(default)]
    pub guild_id: Option<NonZeroU64>,
    /// Requires `guild_id`
    #[serde(default)]
    pub channel_id: Option<NonZeroU64>,

    // Deletion
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    #[serde(default = "default_max_deletions_per_run")]
    pub max_deletions_per_run: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_api_call_interval")]
    pub api_call_interval: f64,
}

/// Mask sensitive strings by showing only first and last few characters
fn mask_token(s: &str) -> String {
    const VISIBLE_CHARS: usize = 4;

    if s.len() <= VISIBLE_CHARS * 2 {
        // If string is too short, mask everything except first char
        if s.is_empty() {
            return "<empty>".to_string();
        }
        return format!("{}***", &s[..1]);
    }

    format!(
        "{}***{}",
        &s[..VISIBLE_CHARS],
        &s[s.len() - VISIBLE_CHARS..]
    )
}

impl std::fmt::Debug for Params {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Params")
            .field("discord_token", &mask_token(&self.discord_token))
            .field("rules_file", &self.rules_file)
            .field("purge_rules", &self.purge_rules)
            .field("max_rule_depth", &self.max_rule_depth)
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .field("dry_run", &self.dry_run)
            .field("max_deletions_per_run", &self.max_deletions_per_run)
            .field("batch_size", &self.batch_size)
            .field("api_call_interval", &self.api_call_interval)
            .finish()
    }
}

impl Params {
    pub fn new() -> anyhow::Result<Params> {
        let params = envy::from_env::<Params>().context("Failed to load configuration")?;
        params.scope()?;
        Ok(params)
    }

    /// Rule names from PURGE_RULES, trimmed, empty entries dropped
    pub fn rule_names(&self) -> Vec<String> {
        self.purge_rules
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Guilds and channels the run covers
    ///
    /// A channel without its guild is rejected rather than widened to every guild.
    pub fn scope(&self) -> anyhow::Result<Scope> {
        match (self.guild_id, self.channel_id) {
            (Some(guild_id), Some(channel_id)) => Ok(Scope::Channel {
                guild_id: GuildId::new(guild_id.get()),
                channel_id: ChannelId::new(channel_id.get()),
            }),
            (Some(guild_id), None) => Ok(Scope::Guild(GuildId::new(guild_id.get()))),
            (None, None) => Ok(Scope::AllGuilds),
            (None, Some(_)) => anyhow::bail!("CHANNEL_ID requires GUILD_ID"),
        }
    }

    pub fn purge_config(&self) -> PurgeConfig {
        PurgeConfig {
            dry_run: self.dry_run,
            max_deletions_per_run: self.max_deletions_per_run,
            batch_size: self.batch_size,
            api_call_interval: self.api_call_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params() -> Params {
        Params {
            discord_token: "MTExMjIyMzMzNDQ0NTU1NjY2Nzc3ODg4OTk5".to_string(),
            rules_file: default_rules_file(),
            purge_rules: "spam".to_string(),
            max_rule_depth: default_max_rule_depth(),
            guild_id: None,
            channel_id: None,
            dry_run: default_dry_run(),
            max_deletions_per_run: default_max_deletions_per_run(),
            batch_size: default_batch_size(),
            api_call_interval: default_api_call_interval(),
        }
    }

    #[rstest]
    #[case::long_string("MTExMjIyMzMzNDQ0NTU1NjY2Nzc3ODg4OTk5", "MTEx***OTk5")]
    #[case::short_string("short", "s***")]
    #[case::empty_string("", "<empty>")]
    fn test_mask_token(#[case] input: &str, #[case] expected: &str) {
        let masked = mask_token(input);
        assert_eq!(masked, expected);
    }

    #[test]
    fn test_params_debug_masks_sensitive_data() {
        let debug_output = format!("{:?}", params());

        assert!(debug_output.contains("MTEx***OTk5"));
        assert!(!debug_output.contains("MTExMjIyMzMzNDQ0NTU1NjY2Nzc3ODg4OTk5"));

        // Non-secret settings stay visible
        assert!(debug_output.contains("rules.json"));
    }

    #[rstest]
    #[case::single("spam", vec!["spam"])]
    #[case::multiple("spam,old_posts", vec!["spam", "old_posts"])]
    #[case::whitespace(" spam , old_posts ", vec!["spam", "old_posts"])]
    #[case::empty_entries("spam,,", vec!["spam"])]
    #[case::empty("", vec![])]
    fn test_rule_names(#[case] input: &str, #[case] expected: Vec<&str>) {
        let params = Params {
            purge_rules: input.to_string(),
            ..params()
        };

        assert_eq!(params.rule_names(), expected);
    }

    fn from_vars(vars: &[(&str, &str)]) -> envy::Result<Params> {
        envy::from_iter(
            vars.iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        )
    }

    #[rstest]
    #[case::all_guilds(None, None, Scope::AllGuilds)]
    #[case::guild(Some(1), None, Scope::Guild(GuildId::new(1)))]
    #[case::channel(Some(1), Some(2), Scope::Channel { guild_id: GuildId::new(1), channel_id: ChannelId::new(2) })]
    fn test_scope(#[case] guild_id: Option<u64>, #[case] channel_id: Option<u64>, #[case] expected: Scope) {
        let params = Params {
            guild_id: guild_id.and_then(NonZeroU64::new),
            channel_id: channel_id.and_then(NonZeroU64::new),
            ..params()
        };

        assert_eq!(params.scope().unwrap(), expected);
    }

    #[test]
    fn test_channel_without_guild_is_rejected() {
        let params = Params {
            channel_id: NonZeroU64::new(2),
            ..params()
        };

        assert!(params.scope().is_err());
    }

    #[rstest]
    #[case::zero_guild(&[("GUILD_ID", "0")])]
    #[case::zero_channel(&[("GUILD_ID", "1"), ("CHANNEL_ID", "0")])]
    #[case::not_a_number(&[("GUILD_ID", "home")])]
    fn test_invalid_scope_ids_fail_to_load(#[case] scope_vars: &[(&str, &str)]) {
        let mut vars = vec![("DISCORD_TOKEN", "token"), ("PURGE_RULES", "spam")];
        vars.extend_from_slice(scope_vars);

        assert!(from_vars(&vars).is_err());
    }

    #[test]
    fn test_env_defaults_follow_purge_config() {
        let params = from_vars(&[("DISCORD_TOKEN", "token"), ("PURGE_RULES", "spam")]).unwrap();

        assert_eq!(params.purge_config(), PurgeConfig::default());
        assert_eq!(params.rules_file, "rules.json");
        assert_eq!(params.scope().unwrap(), Scope::AllGuilds);
    }

    #[test]
    fn test_purge_config_carries_deletion_settings() {
        let params = Params {
            dry_run: false,
            batch_size: 250,
            ..params()
        };

        let config = params.purge_config();

        assert!(!config.dry_run);
        assert_eq!(config.max_deletions_per_run, 1000);
        assert_eq!(config.batch_threshold(), 100);
        assert_eq!(config, PurgeConfig { dry_run: false, batch_size: 250, ..PurgeConfig::default() });
    }
}
