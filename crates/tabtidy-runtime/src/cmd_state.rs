//! Commands that run against a host state file through `MemoryHost`:
//! `apply`, `sort` and `current`.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde_json::json;
use tabtidy_apply::{
    ArrangeReport, GroupingSelection, HeuristicEnricher, ReconcileReport, StepFailure,
    apply_tab_groups, apply_tab_sorting, calculate_tab_groups, fetch_current_tab_groups,
};
use tabtidy_core::StrategyContext;
use tabtidy_host::{HostState, MemoryHost};

use crate::cli::StateOpts;

pub fn load_state(path: &Path) -> anyhow::Result<HostState> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading state {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing state {}", path.display()))
}

fn save_state(path: &Path, state: &HostState) -> anyhow::Result<()> {
    let raw = serde_json::to_string_pretty(state)?;
    std::fs::write(path, raw + "\n").with_context(|| format!("writing state {}", path.display()))
}

async fn bounded<T>(timeout: Duration, fut: impl Future<Output = T>) -> anyhow::Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .with_context(|| format!("timed out after {}ms", timeout.as_millis()))
}

fn selection(opts: &StateOpts) -> GroupingSelection {
    GroupingSelection {
        window_ids: opts.windows.clone(),
        tab_ids: opts.tabs.clone(),
    }
}

fn failures_json(failures: &[StepFailure]) -> serde_json::Value {
    failures
        .iter()
        .map(|f| json!({ "subject": f.subject, "step": f.step.to_string(), "error": f.error.to_string() }))
        .collect()
}

pub(crate) fn reconcile_json(report: &ReconcileReport) -> serde_json::Value {
    json!({
        "appliedAt": chrono::Utc::now().to_rfc3339(),
        "buckets": report.buckets,
        "groupsCreated": report.groups_created,
        "groupsReused": report.groups_reused,
        "tabsMoved": report.tabs_moved,
        "tabsUngrouped": report.tabs_ungrouped,
        "failures": failures_json(&report.failures),
    })
}

pub(crate) fn arrange_json(report: &ArrangeReport) -> serde_json::Value {
    json!({
        "appliedAt": chrono::Utc::now().to_rfc3339(),
        "windows": report.windows,
        "tabsMoved": report.tabs_moved,
        "groupsMoved": report.groups_moved,
        "failures": failures_json(&report.failures),
    })
}

fn finish(host: MemoryHost, opts: &StateOpts, summary: serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&summary)?);
    if opts.write {
        save_state(&opts.state, &host.into_state())?;
        tracing::info!(path = %opts.state.display(), "state written");
    }
    Ok(())
}

pub async fn cmd_apply(
    opts: &StateOpts,
    strategies: &[String],
    ctx: &StrategyContext,
    timeout: Duration,
) -> anyhow::Result<()> {
    let host = MemoryHost::new(load_state(&opts.state)?);
    let selection = selection(opts);
    let report = bounded(timeout, async {
        let buckets =
            calculate_tab_groups(&host, ctx, strategies, &selection, &HeuristicEnricher).await?;
        anyhow::Ok(apply_tab_groups(&host, &buckets).await)
    })
    .await??;
    finish(host, opts, reconcile_json(&report))
}

pub async fn cmd_sort(
    opts: &StateOpts,
    strategies: &[String],
    ctx: &StrategyContext,
    timeout: Duration,
) -> anyhow::Result<()> {
    let host = MemoryHost::new(load_state(&opts.state)?);
    let selection = selection(opts);
    let report = bounded(
        timeout,
        apply_tab_sorting(&host, ctx, strategies, &selection, &HeuristicEnricher),
    )
    .await??;
    finish(host, opts, arrange_json(&report))
}

pub async fn cmd_current(
    path: &Path,
    strategies: &[String],
    ctx: &StrategyContext,
    timeout: Duration,
) -> anyhow::Result<()> {
    let host = MemoryHost::new(load_state(path)?);
    let buckets = bounded(timeout, fetch_current_tab_groups(&host, ctx, strategies)).await??;
    println!("{}", serde_json::to_string_pretty(&buckets)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/host_state.json")
    }

    #[test]
    fn loads_fixture_state() {
        let state = load_state(&fixture()).expect("state");
        assert_eq!(state.tabs.len(), 6);
        assert_eq!(state.groups.len(), 1);
    }

    #[test]
    fn save_round_trips() {
        let state = load_state(&fixture()).expect("state");
        let path = std::env::temp_dir().join(format!("tabtidy-state-{}.json", std::process::id()));
        save_state(&path, &state).expect("save");
        assert_eq!(load_state(&path).expect("reload"), state);
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn apply_writes_groups_back() {
        let path = std::env::temp_dir().join(format!("tabtidy-apply-{}.json", std::process::id()));
        save_state(&path, &load_state(&fixture()).expect("state")).expect("seed");
        let opts = StateOpts {
            state: path.clone(),
            write: true,
            windows: vec![1],
            tabs: vec![],
        };
        cmd_apply(&opts, &["domain".to_string()], &StrategyContext::default(), Duration::from_secs(5))
            .await
            .expect("apply");

        let state = load_state(&path).expect("reload");
        let tab2 = state.tabs.iter().find(|t| t.id == 2).expect("tab 2");
        assert!(tab2.is_grouped());
        // Window 2 was outside the selection.
        assert!(state.tabs.iter().filter(|t| t.window_id == 2).all(|t| !t.is_grouped()));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn report_json_lists_failures() {
        let report = ReconcileReport {
            buckets: 1,
            failures: vec![StepFailure {
                subject: "b".into(),
                step: tabtidy_apply::Step::UpdateGroup,
                error: tabtidy_host::HostError::NoSuchGroup(3),
            }],
            ..Default::default()
        };
        let v = reconcile_json(&report);
        assert_eq!(v["buckets"], 1);
        assert_eq!(v["failures"][0]["step"], "update_group");
        assert_eq!(v["failures"][0]["error"], "no group with id 3");
    }
}
