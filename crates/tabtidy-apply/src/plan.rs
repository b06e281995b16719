//! Snapshot the host and classify it into buckets.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tabtidy_core::{
    Bucket, StrategyContext, TabId, TabRecord, WindowId, WindowMode, group_tabs,
    requires_context_analysis, sort_tabs,
};
use tabtidy_host::{HostError, TabHost, TabQuery, to_tab_records};

use crate::enrich::ContextEnricher;

/// Which tabs a command acts on. Empty means every tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingSelection {
    #[serde(default)]
    pub window_ids: Vec<WindowId>,
    #[serde(default)]
    pub tab_ids: Vec<TabId>,
}

impl GroupingSelection {
    pub fn is_empty(&self) -> bool {
        self.window_ids.is_empty() && self.tab_ids.is_empty()
    }

    pub fn includes(&self, tab: &TabRecord) -> bool {
        self.is_empty() || self.window_ids.contains(&tab.window_id) || self.tab_ids.contains(&tab.id)
    }

    /// Windows touched by the selection; every window in `tabs` when empty.
    pub fn target_windows(&self, tabs: &[TabRecord]) -> BTreeSet<WindowId> {
        if self.is_empty() {
            return tabs.iter().map(|t| t.window_id).collect();
        }
        self.window_ids
            .iter()
            .copied()
            .chain(
                tabs.iter()
                    .filter(|t| self.tab_ids.contains(&t.id))
                    .map(|t| t.window_id),
            )
            .collect()
    }
}

/// Current host tabs as engine records, in host order.
pub async fn snapshot_tabs<H: TabHost>(host: &H) -> Result<Vec<TabRecord>, HostError> {
    let tabs = host.query_tabs(TabQuery::all()).await?;
    Ok(to_tab_records(&tabs))
}

/// Proposed buckets for the selected tabs, each bucket's tabs sorted by
/// the same strategies. Enrichment runs only when a requested strategy
/// reads enrichment fields.
pub async fn calculate_tab_groups<H, E, S>(
    host: &H,
    ctx: &StrategyContext,
    strategies: &[S],
    selection: &GroupingSelection,
    enricher: &E,
) -> Result<Vec<Bucket>, HostError>
where
    H: TabHost,
    E: ContextEnricher,
    S: AsRef<str>,
{
    let mut tabs: Vec<TabRecord> = snapshot_tabs(host)
        .await?
        .into_iter()
        .filter(|t| selection.includes(t))
        .collect();

    if requires_context_analysis(strategies, ctx) {
        enricher.enrich(&mut tabs).await;
    }

    let mut buckets = group_tabs(&tabs, strategies, ctx);
    for bucket in &mut buckets {
        bucket.tabs = sort_tabs(std::mem::take(&mut bucket.tabs), strategies, ctx);
    }
    tracing::info!(
        tabs = tabs.len(),
        buckets = buckets.len(),
        strategies = strategies.len(),
        "calculated tab groups"
    );
    Ok(buckets)
}

pub const UNGROUPED_LABEL: &str = "Ungrouped";
const UNTITLED_GROUP: &str = "Untitled Group";

/// The host's existing groups as buckets, members sorted by `strategies`,
/// followed by one bucket of ungrouped tabs per window.
pub async fn fetch_current_tab_groups<H, S>(
    host: &H,
    ctx: &StrategyContext,
    strategies: &[S],
) -> Result<Vec<Bucket>, HostError>
where
    H: TabHost,
    S: AsRef<str>,
{
    let tabs = snapshot_tabs(host).await?;
    let groups = host.query_groups(None).await?;

    let mut buckets = Vec::with_capacity(groups.len());
    for group in &groups {
        let members: Vec<TabRecord> = tabs
            .iter()
            .filter(|t| t.existing_group() == Some(group.id))
            .cloned()
            .collect();
        if members.is_empty() {
            continue;
        }
        buckets.push(Bucket {
            id: format!("group-{}", group.id),
            window_id: group.window_id,
            label: if group.title.is_empty() {
                UNTITLED_GROUP.to_string()
            } else {
                group.title.clone()
            },
            color: group.color.clone(),
            tabs: sort_tabs(members, strategies, ctx),
            reason: "Manual".to_string(),
            window_mode: WindowMode::Current,
        });
    }

    let windows: BTreeSet<WindowId> = tabs.iter().map(|t| t.window_id).collect();
    for window_id in windows {
        let loose: Vec<TabRecord> = tabs
            .iter()
            .filter(|t| t.window_id == window_id && t.existing_group().is_none())
            .cloned()
            .collect();
        if loose.is_empty() {
            continue;
        }
        buckets.push(Bucket {
            id: format!("ungrouped-{window_id}"),
            window_id,
            label: UNGROUPED_LABEL.to_string(),
            color: "grey".to_string(),
            tabs: sort_tabs(loose, strategies, ctx),
            reason: UNGROUPED_LABEL.to_string(),
            window_mode: WindowMode::Current,
        });
    }
    Ok(buckets)
}
