//! tabtidy: rule-driven tab grouping and sorting.
//! Runs the engine and reconciler against JSON tab snapshots and host state
//! files; a browser bridge implements the same `TabHost` seam.

use anyhow::Context;
use clap::Parser;

mod cli;
mod cmd_plan;
mod cmd_state;
mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let prefs = config::Preferences::load(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(prefs.log_filter()))
        .with_writer(std::io::stderr)
        .init();

    let mut ctx = prefs.strategy_context(args.strategies.as_deref())?;
    if let Some(now) = args.now.as_deref() {
        let now = chrono::DateTime::parse_from_rfc3339(now)
            .with_context(|| format!("invalid --now {now:?}"))?;
        ctx = ctx.with_now(now.with_timezone(&chrono::Utc));
    }
    let strategies = prefs.strategy_ids(&args.strategy);
    let timeout = prefs.apply_timeout();
    tracing::debug!(?strategies, custom = ctx.custom_strategies().len(), "tabtidy starting");

    match args.command {
        cli::Command::Plan(opts) => cmd_plan::cmd_plan(&opts.tabs, &strategies, &ctx)?,
        cli::Command::Apply(opts) => cmd_state::cmd_apply(&opts, &strategies, &ctx, timeout).await?,
        cli::Command::Sort(opts) => cmd_state::cmd_sort(&opts, &strategies, &ctx, timeout).await?,
        cli::Command::Current(opts) => {
            cmd_state::cmd_current(&opts.state, &strategies, &ctx, timeout).await?
        }
        cli::Command::Strategies => cmd_plan::cmd_strategies(&ctx)?,
    }

    Ok(())
}
