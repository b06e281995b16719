//! `tabtidy plan` and `tabtidy strategies`: pure engine output, no host.

use std::path::Path;

use anyhow::Context;
use tabtidy_core::{Bucket, StrategyContext, TabRecord, group_tabs, sort_tabs, strategy_definitions};

pub fn load_tabs(path: &Path) -> anyhow::Result<Vec<TabRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading tabs {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing tabs {}", path.display()))
}

/// Buckets for a tab snapshot, each bucket's tabs sorted by the same ids.
pub fn plan(tabs: &[TabRecord], strategies: &[String], ctx: &StrategyContext) -> Vec<Bucket> {
    let mut buckets = group_tabs(tabs, strategies, ctx);
    for bucket in &mut buckets {
        bucket.tabs = sort_tabs(std::mem::take(&mut bucket.tabs), strategies, ctx);
    }
    buckets
}

pub fn cmd_plan(path: &Path, strategies: &[String], ctx: &StrategyContext) -> anyhow::Result<()> {
    let tabs = load_tabs(path)?;
    let buckets = plan(&tabs, strategies, ctx);
    tracing::info!(tabs = tabs.len(), buckets = buckets.len(), "planned");
    println!("{}", serde_json::to_string_pretty(&buckets)?);
    Ok(())
}

pub fn cmd_strategies(ctx: &StrategyContext) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&strategy_definitions(ctx))?);
    Ok(())
}
