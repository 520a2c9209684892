use anyhow::Context as _;
use gatesweep::adapters::{SerenityDiscordService, TracingReporter};
use gatesweep::params::Params;
use gatesweep::purge::{AbortReason, DeletionPipeline, RunOutcome};
use gatesweep::rules::{RuleSet, parse_rules};
use serenity::http::Http;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    // Default: gatesweep=info, serenity=warn
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatesweep=info,serenity=warn".into()),
        )
        .init();

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        description = env!("CARGO_PKG_DESCRIPTION"),
        "Starting application"
    );

    let params = Params::new()?;
    info!(?params, "Application parameters loaded");

    let rule_names = params.rule_names();
    anyhow::ensure!(!rule_names.is_empty(), "PURGE_RULES names no rules");
    let scope = params.scope()?;

    let rules = load_rules(&params)?;

    let http = Arc::new(Http::new(&params.discord_token));
    let current_user = http
        .get_current_user()
        .await
        .context("Logging in to Discord")?;
    info!(
        display_name = %current_user.display_name(),
        user_id = %current_user.id,
        "Bot is connected"
    );

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping after the current call");
                cancel.cancel();
            }
        }
    });

    let pipeline = DeletionPipeline::new(
        Arc::new(SerenityDiscordService::new(http)),
        Arc::new(rules),
        Arc::new(TracingReporter),
        params.purge_config(),
    )
    .with_cancellation(cancel);

    let summary = pipeline.run(rule_names.as_slice(), scope).await;

    for report in &summary.reports {
        info!(
            rule = %report.rule,
            outcome = ?report.outcome,
            matched = report.counters.matched,
            deleted = report.counters.deleted,
            batches = report.counters.batches,
            errors = report.counters.errors,
            "Rule finished"
        );
    }
    info!(
        total = summary.total(),
        dry_run = params.dry_run,
        "All rules finished"
    );

    let cancelled = summary
        .reports
        .iter()
        .any(|report| report.outcome == RunOutcome::Aborted(AbortReason::Cancelled));
    anyhow::ensure!(!cancelled, "Run was cancelled");

    Ok(())
}

/// Read the rules file and compile every enabled rule
fn load_rules(params: &Params) -> anyhow::Result<RuleSet> {
    let json = std::fs::read_to_string(&params.rules_file)
        .with_context(|| format!("Reading rules file {}", params.rules_file))?;
    let specs = parse_rules(&json)
        .with_context(|| format!("Parsing rules file {}", params.rules_file))?;

    Ok(RuleSet::from_specs(&specs, params.max_rule_depth))
}
