//! In-window arrangement: sort tabs inside each group, sort the loose tabs
//! to the front, and optionally reorder whole groups by their lead tabs.

use std::collections::HashMap;

use tabtidy_core::{
    GroupId, StrategyContext, TabId, TabRecord, WindowId, compare_group_leads, merge_sort_by,
    requires_context_analysis, sort_tabs,
};
use tabtidy_host::{HostError, MoveProperties, TabHost, TabQuery, to_tab_records};

use crate::enrich::ContextEnricher;
use crate::plan::{GroupingSelection, snapshot_tabs};
use crate::reconcile::{Step, StepFailure};

#[derive(Debug, Default)]
pub struct ArrangeReport {
    pub windows: usize,
    pub tabs_moved: usize,
    pub groups_moved: usize,
    pub failures: Vec<StepFailure>,
}

impl ArrangeReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, window_id: WindowId, step: Step, error: HostError) {
        tracing::warn!(window_id, %step, %error, "arrange step failed");
        self.failures.push(StepFailure {
            subject: format!("window-{window_id}"),
            step,
            error,
        });
    }
}

/// First requested custom strategy that orders whole groups.
fn group_order_strategy<'a, S: AsRef<str>>(strategies: &'a [S], ctx: &StrategyContext) -> Option<&'a str> {
    strategies.iter().map(AsRef::as_ref).find(|id| {
        ctx.custom(id)
            .is_some_and(|c| c.sort_groups || !c.group_sorting_rules.is_empty())
    })
}

fn ids(tabs: &[TabRecord]) -> Vec<TabId> {
    tabs.iter().map(|t| t.id).collect()
}

/// Sort tabs in every target window. Only the initial snapshot is fatal;
/// per-window host failures are recorded and skipped.
pub async fn apply_tab_sorting<H, E, S>(
    host: &H,
    ctx: &StrategyContext,
    strategies: &[S],
    selection: &GroupingSelection,
    enricher: &E,
) -> Result<ArrangeReport, HostError>
where
    H: TabHost,
    E: ContextEnricher,
    S: AsRef<str>,
{
    let snapshot = snapshot_tabs(host).await?;
    let windows = selection.target_windows(&snapshot);
    let enrich = requires_context_analysis(strategies, ctx);

    let mut report = ArrangeReport::default();
    for window_id in windows {
        report.windows += 1;
        arrange_window(host, ctx, strategies, window_id, enrich.then_some(enricher), &mut report).await;
    }
    tracing::info!(
        windows = report.windows,
        moved = report.tabs_moved,
        groups_moved = report.groups_moved,
        failures = report.failures.len(),
        "applied tab sorting"
    );
    Ok(report)
}

async fn arrange_window<H, E, S>(
    host: &H,
    ctx: &StrategyContext,
    strategies: &[S],
    window_id: WindowId,
    enricher: Option<&E>,
    report: &mut ArrangeReport,
) where
    H: TabHost,
    E: ContextEnricher,
    S: AsRef<str>,
{
    let mut tabs = match host.query_tabs(TabQuery::window(window_id)).await {
        Ok(t) => to_tab_records(&t),
        Err(e) => return report.fail(window_id, Step::QueryTabs, e),
    };
    tabs.sort_by_key(|t| t.index);
    if let Some(enricher) = enricher {
        enricher.enrich(&mut tabs).await;
    }

    let mut group_order: Vec<GroupId> = Vec::new();
    let mut members: HashMap<GroupId, Vec<TabRecord>> = HashMap::new();
    let mut loose: Vec<TabRecord> = Vec::new();
    for tab in &tabs {
        match tab.existing_group() {
            Some(gid) => {
                if !members.contains_key(&gid) {
                    group_order.push(gid);
                }
                members.entry(gid).or_default().push(tab.clone());
            }
            None => loose.push(tab.clone()),
        }
    }

    let mut leads: HashMap<GroupId, TabRecord> = HashMap::new();
    for gid in &group_order {
        let Some(current) = members.remove(gid) else {
            continue;
        };
        let start = current.iter().map(|t| t.index).min().unwrap_or(0);
        let sorted = sort_tabs(current.clone(), strategies, ctx);
        if let Some(lead) = sorted.first() {
            leads.insert(*gid, lead.clone());
        }
        if ids(&sorted) == ids(&current) {
            continue;
        }
        let to = MoveProperties {
            window_id: Some(window_id),
            index: start,
        };
        match host.move_tabs(&ids(&sorted), to).await {
            Ok(()) => report.tabs_moved += sorted.len(),
            Err(e) => report.fail(window_id, Step::MoveTabs, e),
        }
    }

    if !loose.is_empty() {
        let sorted = sort_tabs(loose.clone(), strategies, ctx);
        let in_place = ids(&sorted) == ids(&loose)
            && loose.iter().enumerate().all(|(i, t)| t.index == i as i64);
        if !in_place {
            let to = MoveProperties {
                window_id: Some(window_id),
                index: 0,
            };
            match host.move_tabs(&ids(&sorted), to).await {
                Ok(()) => report.tabs_moved += sorted.len(),
                Err(e) => report.fail(window_id, Step::MoveTabs, e),
            }
        }
    }

    let Some(strategy_id) = group_order_strategy(strategies, ctx) else {
        return;
    };
    let ordered = merge_sort_by(group_order.clone(), &mut |a, b| {
        match (leads.get(a), leads.get(b)) {
            (Some(la), Some(lb)) => compare_group_leads(la, lb, strategy_id, ctx),
            _ => std::cmp::Ordering::Equal,
        }
    });
    if ordered == group_order {
        return;
    }
    for gid in ordered {
        match host.move_group(gid, MoveProperties::at(-1)).await {
            Ok(()) => report.groups_moved += 1,
            Err(e) => report.fail(window_id, Step::MoveGroup, e),
        }
    }
}
