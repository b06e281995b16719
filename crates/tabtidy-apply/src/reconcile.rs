//! Group reconciler: make the host's tab groups match a set of buckets.
//!
//! Each bucket is placed (window mode), then partitioned by window, and
//! each partition adopts an existing group when it can: first by majority
//! vote of its tabs' current groups, then by a group in the window whose
//! title equals the bucket label. A group adopted once in a run is claimed
//! and never adopted again. Every host step is independent: a failure is
//! recorded and the run moves on.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tabtidy_core::{Bucket, GroupId, TabId, TabRecord, WindowId, WindowMode, is_palette_color};
use tabtidy_host::{GroupTarget, GroupUpdate, HostError, MoveProperties, TabHost, TabQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CreateWindow,
    MoveTabs,
    QueryTabs,
    QueryGroups,
    QueryMembers,
    Ungroup,
    AddToGroup,
    CreateGroup,
    UpdateGroup,
    MoveGroup,
    RemoveTabs,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::CreateWindow => "create_window",
            Self::MoveTabs => "move_tabs",
            Self::QueryTabs => "query_tabs",
            Self::QueryGroups => "query_groups",
            Self::QueryMembers => "query_members",
            Self::Ungroup => "ungroup",
            Self::AddToGroup => "add_to_group",
            Self::CreateGroup => "create_group",
            Self::UpdateGroup => "update_group",
            Self::MoveGroup => "move_group",
            Self::RemoveTabs => "remove_tabs",
        };
        f.write_str(s)
    }
}

#[derive(Debug)]
pub struct StepFailure {
    /// Bucket id, or the window for arrangement steps.
    pub subject: String,
    pub step: Step,
    pub error: HostError,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub buckets: usize,
    pub groups_created: Vec<GroupId>,
    pub groups_reused: Vec<GroupId>,
    /// Tabs moved into an existing window. The tab that opens a new
    /// window is not counted.
    pub tabs_moved: usize,
    pub tabs_ungrouped: usize,
    pub failures: Vec<StepFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One reconciliation run. Holds the claimed-group set across buckets.
pub struct ReconcileSession<H> {
    host: H,
    claimed: HashSet<GroupId>,
    report: ReconcileReport,
}

impl<H: TabHost> ReconcileSession<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            claimed: HashSet::new(),
            report: ReconcileReport::default(),
        }
    }

    pub fn is_claimed(&self, group_id: GroupId) -> bool {
        self.claimed.contains(&group_id)
    }

    pub fn finish(self) -> ReconcileReport {
        self.report
    }

    fn fail(&mut self, bucket: &Bucket, step: Step, error: HostError) {
        tracing::warn!(bucket = %bucket.id, %step, %error, "reconcile step failed");
        self.report.failures.push(StepFailure {
            subject: bucket.id.clone(),
            step,
            error,
        });
    }

    pub async fn apply_bucket(&mut self, bucket: &Bucket) {
        self.report.buckets += 1;
        if bucket.tabs.is_empty() {
            return;
        }
        let Some(partitions) = self.place(bucket).await else {
            return;
        };
        for (window_id, tabs) in partitions {
            self.apply_partition(bucket, window_id, &tabs).await;
        }
    }

    /// Move tabs per the bucket's window mode and return the per-window
    /// partitions to reconcile. `None` skips the bucket.
    async fn place<'b>(&mut self, bucket: &'b Bucket) -> Option<Vec<(WindowId, Vec<&'b TabRecord>)>> {
        let all: Vec<&TabRecord> = bucket.tabs.iter().collect();
        match bucket.window_mode {
            WindowMode::New => {
                let first = all[0].id;
                let window_id = match self.host.create_window(first).await {
                    Ok(w) => w,
                    Err(e) => {
                        self.fail(bucket, Step::CreateWindow, e);
                        return None;
                    }
                };
                let rest: Vec<TabId> = all[1..].iter().map(|t| t.id).collect();
                self.move_into(bucket, &rest, window_id).await;
                Some(vec![(window_id, all)])
            }
            WindowMode::Compound => {
                let target = majority_window(&all);
                let minority: Vec<TabId> = all
                    .iter()
                    .filter(|t| t.window_id != target)
                    .map(|t| t.id)
                    .collect();
                self.move_into(bucket, &minority, target).await;
                Some(vec![(target, all)])
            }
            WindowMode::Current => {
                let mut order: Vec<WindowId> = Vec::new();
                let mut by_window: HashMap<WindowId, Vec<&TabRecord>> = HashMap::new();
                for tab in all {
                    if !by_window.contains_key(&tab.window_id) {
                        order.push(tab.window_id);
                    }
                    by_window.entry(tab.window_id).or_default().push(tab);
                }
                Some(
                    order
                        .into_iter()
                        .filter_map(|w| by_window.remove(&w).map(|tabs| (w, tabs)))
                        .collect(),
                )
            }
        }
    }

    async fn move_into(&mut self, bucket: &Bucket, tab_ids: &[TabId], window_id: WindowId) {
        if tab_ids.is_empty() {
            return;
        }
        match self.host.move_tabs(tab_ids, MoveProperties::to_end(window_id)).await {
            Ok(()) => self.report.tabs_moved += tab_ids.len(),
            Err(e) => self.fail(bucket, Step::MoveTabs, e),
        }
    }

    async fn apply_partition(&mut self, bucket: &Bucket, window_id: WindowId, tabs: &[&TabRecord]) {
        let ids: Vec<TabId> = tabs.iter().map(|t| t.id).collect();
        let candidate = match self.vote(window_id, tabs) {
            Some(g) => Some(g),
            None => self.by_title(bucket, window_id).await,
        };

        let group_id = match candidate {
            Some(gid) => {
                self.claimed.insert(gid);
                self.report.groups_reused.push(gid);
                self.adopt(bucket, gid, &ids).await;
                gid
            }
            None => {
                let target = GroupTarget::New {
                    window_id: Some(window_id),
                };
                match self.host.group_tabs(&ids, target).await {
                    Ok(gid) => {
                        self.claimed.insert(gid);
                        self.report.groups_created.push(gid);
                        gid
                    }
                    Err(e) => {
                        self.fail(bucket, Step::CreateGroup, e);
                        return;
                    }
                }
            }
        };

        let update = GroupUpdate {
            title: Some(bucket.label.clone()),
            color: is_palette_color(&bucket.color).then(|| bucket.color.clone()),
            collapsed: None,
        };
        if let Err(e) = self.host.update_group(group_id, update).await {
            self.fail(bucket, Step::UpdateGroup, e);
        }
        tracing::debug!(bucket = %bucket.id, window_id, group_id, tabs = ids.len(), "bucket applied");
    }

    /// Most common unclaimed current group among tabs already in the
    /// window. Ties go to the group seen first.
    fn vote(&self, window_id: WindowId, tabs: &[&TabRecord]) -> Option<GroupId> {
        let mut order: Vec<GroupId> = Vec::new();
        let mut counts: HashMap<GroupId, usize> = HashMap::new();
        for gid in tabs
            .iter()
            .filter(|t| t.window_id == window_id)
            .filter_map(|t| t.existing_group())
            .filter(|g| !self.claimed.contains(g))
        {
            let n = counts.entry(gid).or_insert(0);
            if *n == 0 {
                order.push(gid);
            }
            *n += 1;
        }
        let mut best: Option<(GroupId, usize)> = None;
        for gid in order {
            let n = counts[&gid];
            if best.is_none_or(|(_, m)| n > m) {
                best = Some((gid, n));
            }
        }
        best.map(|(g, _)| g)
    }

    async fn by_title(&mut self, bucket: &Bucket, window_id: WindowId) -> Option<GroupId> {
        match self.host.query_groups(Some(window_id)).await {
            Ok(groups) => groups
                .into_iter()
                .find(|g| g.title == bucket.label && !self.claimed.contains(&g.id))
                .map(|g| g.id),
            Err(e) => {
                self.fail(bucket, Step::QueryGroups, e);
                None
            }
        }
    }

    /// Make `group_id` hold exactly `ids`. Missing tabs join before strays
    /// leave, so the group never empties out and vanishes mid-way.
    async fn adopt(&mut self, bucket: &Bucket, group_id: GroupId, ids: &[TabId]) {
        let members: Option<Vec<TabId>> = match self.host.query_tabs(TabQuery::group(group_id)).await {
            Ok(tabs) => Some(tabs.iter().map(|t| t.id).collect()),
            Err(e) => {
                self.fail(bucket, Step::QueryMembers, e);
                None
            }
        };

        let to_add: Vec<TabId> = match &members {
            Some(current) => ids.iter().copied().filter(|id| !current.contains(id)).collect(),
            None => ids.to_vec(),
        };
        if !to_add.is_empty() {
            if let Err(e) = self.host.group_tabs(&to_add, GroupTarget::Existing(group_id)).await {
                self.fail(bucket, Step::AddToGroup, e);
            }
        }

        let strays: Vec<TabId> = members
            .unwrap_or_default()
            .into_iter()
            .filter(|id| !ids.contains(id))
            .collect();
        if strays.is_empty() {
            return;
        }
        match self.host.ungroup_tabs(&strays).await {
            Ok(()) => self.report.tabs_ungrouped += strays.len(),
            Err(e) => self.fail(bucket, Step::Ungroup, e),
        }
    }
}

/// Window holding most of the tabs; ties go to the window seen first.
fn majority_window(tabs: &[&TabRecord]) -> WindowId {
    let mut order: Vec<WindowId> = Vec::new();
    let mut counts: HashMap<WindowId, usize> = HashMap::new();
    for t in tabs {
        let n = counts.entry(t.window_id).or_insert(0);
        if *n == 0 {
            order.push(t.window_id);
        }
        *n += 1;
    }
    let mut best = (tabs[0].window_id, 0);
    for w in order {
        if counts[&w] > best.1 {
            best = (w, counts[&w]);
        }
    }
    best.0
}

/// Apply every bucket in order within one session.
pub async fn apply_tab_groups<H: TabHost>(host: H, buckets: &[Bucket]) -> ReconcileReport {
    let mut session = ReconcileSession::new(host);
    for bucket in buckets {
        session.apply_bucket(bucket).await;
    }
    let report = session.finish();
    tracing::info!(
        buckets = report.buckets,
        created = report.groups_created.len(),
        reused = report.groups_reused.len(),
        moved = report.tabs_moved,
        ungrouped = report.tabs_ungrouped,
        failures = report.failures.len(),
        "applied tab groups"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: TabId, window_id: WindowId, group: Option<GroupId>) -> TabRecord {
        let mut t = TabRecord::new(id, window_id, "t", "https://a.example");
        t.group_id = group;
        t
    }

    #[test]
    fn majority_window_breaks_ties_by_first_seen() {
        let (a, b, c) = (rec(1, 5, None), rec(2, 3, None), rec(3, 3, None));
        assert_eq!(majority_window(&[&a, &b, &c]), 3);
        assert_eq!(majority_window(&[&a, &b]), 5);
    }

    #[test]
    fn vote_ignores_other_windows_and_claims() {
        let host = tabtidy_host::MemoryHost::default();
        let mut session = ReconcileSession::new(&host);
        let tabs = [rec(1, 1, Some(8)), rec(2, 1, Some(9)), rec(3, 1, Some(9)), rec(4, 2, Some(8))];
        let refs: Vec<&TabRecord> = tabs.iter().collect();
        assert_eq!(session.vote(1, &refs), Some(9));
        session.claimed.insert(9);
        assert_eq!(session.vote(1, &refs), Some(8));
        session.claimed.insert(8);
        assert_eq!(session.vote(1, &refs), None);
    }

    #[test]
    fn step_names() {
        assert_eq!(Step::AddToGroup.to_string(), "add_to_group");
    }
}
