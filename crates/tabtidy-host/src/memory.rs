//! In-process `TabHost` over a serializable state snapshot.
//!
//! Mirrors the browser behaviors the reconciler depends on: tabs moved to
//! another window leave their group, emptied groups disappear, pinned tabs
//! cannot be grouped, and indexes stay dense per window.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tabtidy_core::{GROUP_ID_NONE, GroupId, PALETTE, TabId, WindowId, is_palette_color};

use crate::error::HostError;
use crate::host::TabHost;
use crate::model::{GroupTarget, GroupUpdate, HostGroup, HostTab, MoveProperties, TabQuery};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOp {
    QueryTabs,
    GetTab,
    QueryWindows,
    QueryGroups,
    CreateWindow,
    MoveTabs,
    GroupTabs,
    UngroupTabs,
    UpdateGroup,
    MoveGroup,
    RemoveTabs,
}

impl HostOp {
    pub fn is_mutation(self) -> bool {
        !matches!(
            self,
            Self::QueryTabs | Self::GetTab | Self::QueryWindows | Self::QueryGroups
        )
    }
}

impl fmt::Display for HostOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whole-host snapshot. Tab order within a window follows `index`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostState {
    /// Windows with no tabs yet; windows holding tabs are implied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub windows: Vec<WindowId>,
    #[serde(default)]
    pub tabs: Vec<HostTab>,
    #[serde(default)]
    pub groups: Vec<HostGroup>,
}

impl HostState {
    pub fn window_ids(&self) -> Vec<WindowId> {
        let set: BTreeSet<WindowId> = self
            .windows
            .iter()
            .copied()
            .chain(self.tabs.iter().map(|t| t.window_id))
            .collect();
        set.into_iter().collect()
    }

    fn has_window(&self, window_id: WindowId) -> bool {
        self.windows.contains(&window_id) || self.tabs.iter().any(|t| t.window_id == window_id)
    }

    fn tab_mut(&mut self, tab_id: TabId) -> Result<&mut HostTab, HostError> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .ok_or(HostError::NoSuchTab(tab_id))
    }

    fn group(&self, group_id: GroupId) -> Result<&HostGroup, HostError> {
        self.groups
            .iter()
            .find(|g| g.id == group_id)
            .ok_or(HostError::NoSuchGroup(group_id))
    }

    fn require_tabs(&self, tab_ids: &[TabId]) -> Result<(), HostError> {
        if tab_ids.is_empty() {
            return Err(HostError::InvalidArgument("empty tab id list".into()));
        }
        match tab_ids.iter().find(|id| !self.tabs.iter().any(|t| t.id == **id)) {
            Some(missing) => Err(HostError::NoSuchTab(*missing)),
            None => Ok(()),
        }
    }

    /// Dense per-window indexes, then drop emptied groups and windows.
    pub fn normalize(&mut self) {
        self.renumber();
        self.prune();
    }

    /// Sort by (window, index) and renumber each window from 0.
    fn renumber(&mut self) {
        self.tabs.sort_by_key(|t| (t.window_id, t.index));
        let mut current = None;
        let mut next = 0;
        for tab in &mut self.tabs {
            if current != Some(tab.window_id) {
                current = Some(tab.window_id);
                next = 0;
            }
            tab.index = next;
            next += 1;
        }
    }

    fn prune(&mut self) {
        let live: BTreeSet<GroupId> = self
            .tabs
            .iter()
            .map(|t| t.group_id)
            .filter(|g| *g != GROUP_ID_NONE)
            .collect();
        self.groups.retain(|g| live.contains(&g.id));
        let tab_windows: BTreeSet<WindowId> = self.tabs.iter().map(|t| t.window_id).collect();
        self.windows.retain(|w| !tab_windows.contains(w));
    }

    /// Remove `tab_ids` from their windows and splice them, in order, into
    /// `window_id` at `index` (`-1` or past the end appends). Tabs arriving
    /// from another window leave their group.
    fn splice(&mut self, tab_ids: &[TabId], window_id: WindowId, index: i64) {
        self.renumber();
        let mut moving: Vec<HostTab> = Vec::with_capacity(tab_ids.len());
        for id in tab_ids {
            if let Some(pos) = self.tabs.iter().position(|t| t.id == *id) {
                moving.push(self.tabs.remove(pos));
            }
        }
        self.renumber();

        let count = self.tabs.iter().filter(|t| t.window_id == window_id).count() as i64;
        let at = if index < 0 || index > count { count } else { index };
        let width = moving.len() as i64;
        for t in self.tabs.iter_mut().filter(|t| t.window_id == window_id && t.index >= at) {
            t.index += width;
        }
        for (offset, mut tab) in moving.into_iter().enumerate() {
            if tab.window_id != window_id {
                tab.group_id = GROUP_ID_NONE;
                tab.window_id = window_id;
            }
            tab.index = at + offset as i64;
            self.tabs.push(tab);
        }
        self.normalize();
    }

    fn next_window_id(&self) -> WindowId {
        self.window_ids().last().copied().unwrap_or(0) + 1
    }

    fn next_group_id(&self) -> GroupId {
        self.groups.iter().map(|g| g.id).max().unwrap_or(0) + 1
    }
}

/// `TabHost` over an in-memory `HostState`, with one-shot failure injection.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
    failures: Mutex<Vec<HostOp>>,
    calls: Mutex<Vec<HostOp>>,
}

impl MemoryHost {
    pub fn new(mut state: HostState) -> Self {
        state.normalize();
        Self {
            state: Mutex::new(state),
            failures: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make the next call of `op` fail with `HostError::Injected`.
    pub fn fail_next(&self, op: HostOp) {
        self.failures.lock().push(op);
    }

    pub fn snapshot(&self) -> HostState {
        self.state.lock().clone()
    }

    pub fn into_state(self) -> HostState {
        self.state.into_inner()
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<HostOp> {
        self.calls.lock().clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls.lock().iter().filter(|op| op.is_mutation()).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn run<T>(
        &self,
        op: HostOp,
        f: impl FnOnce(&mut HostState) -> Result<T, HostError>,
    ) -> Result<T, HostError> {
        self.calls.lock().push(op);
        {
            let mut failures = self.failures.lock();
            if let Some(pos) = failures.iter().position(|f| *f == op) {
                failures.remove(pos);
                tracing::debug!(%op, "injecting host failure");
                return Err(HostError::Injected(op));
            }
        }
        let mut state = self.state.lock();
        f(&mut state)
    }
}

fn group_tabs_in(
    state: &mut HostState,
    tab_ids: &[TabId],
    target: GroupTarget,
) -> Result<GroupId, HostError> {
    state.require_tabs(tab_ids)?;
    if let Some(pinned) = state.tabs.iter().find(|t| t.pinned && tab_ids.contains(&t.id)) {
        return Err(HostError::Rejected {
            op: "group_tabs",
            detail: format!("tab {} is pinned", pinned.id),
        });
    }

    let window_id = match target {
        GroupTarget::Existing(gid) => state.group(gid)?.window_id,
        GroupTarget::New { window_id: Some(w) } if state.has_window(w) => w,
        GroupTarget::New { window_id: Some(w) } => return Err(HostError::NoSuchWindow(w)),
        GroupTarget::New { window_id: None } => state.tab_mut(tab_ids[0])?.window_id,
    };

    // Tabs from other windows land right after the existing members, or at
    // the end for a new group.
    let anchor = match target {
        GroupTarget::Existing(gid) => state
            .tabs
            .iter()
            .filter(|t| t.group_id == gid)
            .map(|t| t.index + 1)
            .max()
            .unwrap_or(-1),
        GroupTarget::New { .. } => -1,
    };
    let outsiders: Vec<TabId> = tab_ids
        .iter()
        .copied()
        .filter(|id| state.tabs.iter().any(|t| t.id == *id && t.window_id != window_id))
        .collect();
    if !outsiders.is_empty() {
        state.splice(&outsiders, window_id, anchor);
    }

    let group_id = match target {
        GroupTarget::Existing(gid) => gid,
        GroupTarget::New { .. } => {
            let gid = state.next_group_id();
            state.groups.push(HostGroup {
                id: gid,
                window_id,
                title: String::new(),
                color: PALETTE[gid.unsigned_abs() as usize % PALETTE.len()].to_string(),
                collapsed: false,
            });
            gid
        }
    };
    for id in tab_ids {
        state.tab_mut(*id)?.group_id = group_id;
    }

    // Keep the group contiguous, starting at its first member.
    let members: Vec<TabId> = state
        .tabs
        .iter()
        .filter(|t| t.group_id == group_id)
        .map(|t| t.id)
        .collect();
    let start = state
        .tabs
        .iter()
        .filter(|t| t.group_id == group_id)
        .map(|t| t.index)
        .min()
        .unwrap_or(0);
    state.splice(&members, window_id, start);
    Ok(group_id)
}

impl TabHost for MemoryHost {
    fn query_tabs(&self, query: TabQuery) -> impl Future<Output = Result<Vec<HostTab>, HostError>> + Send {
        async move {
            self.run(HostOp::QueryTabs, |s| {
                Ok(s.tabs
                    .iter()
                    .filter(|t| query.window_id.is_none_or(|w| t.window_id == w))
                    .filter(|t| query.group_id.is_none_or(|g| t.group_id == g))
                    .cloned()
                    .collect())
            })
        }
    }

    fn get_tab(&self, tab_id: TabId) -> impl Future<Output = Result<HostTab, HostError>> + Send {
        async move { self.run(HostOp::GetTab, |s| s.tab_mut(tab_id).map(|t| t.clone())) }
    }

    fn query_windows(&self) -> impl Future<Output = Result<Vec<WindowId>, HostError>> + Send {
        async move { self.run(HostOp::QueryWindows, |s| Ok(s.window_ids())) }
    }

    fn query_groups(
        &self,
        window_id: Option<WindowId>,
    ) -> impl Future<Output = Result<Vec<HostGroup>, HostError>> + Send {
        async move {
            self.run(HostOp::QueryGroups, |s| {
                Ok(s.groups
                    .iter()
                    .filter(|g| window_id.is_none_or(|w| g.window_id == w))
                    .cloned()
                    .collect())
            })
        }
    }

    fn create_window(&self, tab_id: TabId) -> impl Future<Output = Result<WindowId, HostError>> + Send {
        async move {
            self.run(HostOp::CreateWindow, |s| {
                s.require_tabs(&[tab_id])?;
                let window_id = s.next_window_id();
                s.windows.push(window_id);
                s.splice(&[tab_id], window_id, -1);
                Ok(window_id)
            })
        }
    }

    fn move_tabs(
        &self,
        tab_ids: &[TabId],
        to: MoveProperties,
    ) -> impl Future<Output = Result<(), HostError>> + Send {
        async move {
            self.run(HostOp::MoveTabs, |s| {
                s.require_tabs(tab_ids)?;
                let window_id = match to.window_id {
                    Some(w) if s.has_window(w) => w,
                    Some(w) => return Err(HostError::NoSuchWindow(w)),
                    None => s.tab_mut(tab_ids[0])?.window_id,
                };
                s.splice(tab_ids, window_id, to.index);
                Ok(())
            })
        }
    }

    fn group_tabs(
        &self,
        tab_ids: &[TabId],
        target: GroupTarget,
    ) -> impl Future<Output = Result<GroupId, HostError>> + Send {
        async move { self.run(HostOp::GroupTabs, |s| group_tabs_in(s, tab_ids, target)) }
    }

    fn ungroup_tabs(&self, tab_ids: &[TabId]) -> impl Future<Output = Result<(), HostError>> + Send {
        async move {
            self.run(HostOp::UngroupTabs, |s| {
                s.require_tabs(tab_ids)?;
                for id in tab_ids {
                    s.tab_mut(*id)?.group_id = GROUP_ID_NONE;
                }
                s.normalize();
                Ok(())
            })
        }
    }

    fn update_group(
        &self,
        group_id: GroupId,
        update: GroupUpdate,
    ) -> impl Future<Output = Result<(), HostError>> + Send {
        async move {
            self.run(HostOp::UpdateGroup, |s| {
                if let Some(color) = update.color.as_deref() {
                    if !is_palette_color(color) {
                        return Err(HostError::InvalidArgument(format!("unknown color {color:?}")));
                    }
                }
                let group = s
                    .groups
                    .iter_mut()
                    .find(|g| g.id == group_id)
                    .ok_or(HostError::NoSuchGroup(group_id))?;
                if let Some(title) = update.title {
                    group.title = title;
                }
                if let Some(color) = update.color {
                    group.color = color;
                }
                if let Some(collapsed) = update.collapsed {
                    group.collapsed = collapsed;
                }
                Ok(())
            })
        }
    }

    fn move_group(
        &self,
        group_id: GroupId,
        to: MoveProperties,
    ) -> impl Future<Output = Result<(), HostError>> + Send {
        async move {
            self.run(HostOp::MoveGroup, |s| {
                let current = s.group(group_id)?.window_id;
                let window_id = match to.window_id {
                    Some(w) if s.has_window(w) => w,
                    Some(w) => return Err(HostError::NoSuchWindow(w)),
                    None => current,
                };
                let members: Vec<TabId> = s
                    .tabs
                    .iter()
                    .filter(|t| t.group_id == group_id)
                    .map(|t| t.id)
                    .collect();
                // The group travels whole, so membership survives the window change.
                for t in s.tabs.iter_mut().filter(|t| t.group_id == group_id) {
                    t.window_id = window_id;
                }
                for g in s.groups.iter_mut().filter(|g| g.id == group_id) {
                    g.window_id = window_id;
                }
                s.splice(&members, window_id, to.index);
                Ok(())
            })
        }
    }

    fn remove_tabs(&self, tab_ids: &[TabId]) -> impl Future<Output = Result<(), HostError>> + Send {
        async move {
            self.run(HostOp::RemoveTabs, |s| {
                s.require_tabs(tab_ids)?;
                s.tabs.retain(|t| !tab_ids.contains(&t.id));
                s.normalize();
                Ok(())
            })
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> HostState {
        let mut tabs = Vec::new();
        for (i, id) in [1, 2, 3].into_iter().enumerate() {
            let mut t = HostTab::new(id, 1, format!("https://w1.example/{id}"));
            t.index = i as i64;
            tabs.push(t);
        }
        let mut t4 = HostTab::new(4, 2, "https://w2.example/4");
        t4.group_id = 10;
        tabs.push(t4);
        HostState {
            windows: vec![],
            tabs,
            groups: vec![HostGroup {
                id: 10,
                window_id: 2,
                title: "Old".into(),
                color: "red".into(),
                collapsed: false,
            }],
        }
    }

    fn order(host: &MemoryHost, window_id: WindowId) -> Vec<TabId> {
        host.snapshot()
            .tabs
            .iter()
            .filter(|t| t.window_id == window_id)
            .map(|t| t.id)
            .collect()
    }

    #[tokio::test]
    async fn move_within_window_reorders() {
        let host = MemoryHost::new(state());
        host.move_tabs(&[3], MoveProperties::at(0)).await.expect("move");
        assert_eq!(order(&host, 1), vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn cross_window_move_ungroups_and_prunes() {
        let host = MemoryHost::new(state());
        host.move_tabs(&[4], MoveProperties::to_end(1)).await.expect("move");
        assert_eq!(order(&host, 1), vec![1, 2, 3, 4]);
        let snap = host.snapshot();
        assert!(snap.tabs.iter().all(|t| t.group_id == GROUP_ID_NONE));
        assert!(snap.groups.is_empty());
        assert_eq!(snap.window_ids(), vec![1]);
    }

    #[tokio::test]
    async fn new_group_is_contiguous() {
        let host = MemoryHost::new(state());
        let gid = host
            .group_tabs(&[1, 3], GroupTarget::New { window_id: None })
            .await
            .expect("group");
        assert_eq!(gid, 11);
        assert_eq!(order(&host, 1), vec![1, 3, 2]);
        let groups = host.query_groups(Some(1)).await.expect("groups");
        assert_eq!(groups.len(), 1);
        assert!(is_palette_color(&groups[0].color));
    }

    #[tokio::test]
    async fn grouping_into_other_window_moves_tabs() {
        let host = MemoryHost::new(state());
        host.group_tabs(&[2], GroupTarget::Existing(10)).await.expect("group");
        assert_eq!(order(&host, 2), vec![4, 2]);
        let members = host.query_tabs(TabQuery::group(10)).await.expect("query");
        assert_eq!(members.len(), 2);
    }

    #[tokio::test]
    async fn pinned_tabs_are_rejected() {
        let mut st = state();
        st.tabs[0].pinned = true;
        let host = MemoryHost::new(st);
        let err = host
            .group_tabs(&[1], GroupTarget::New { window_id: None })
            .await
            .expect_err("pinned");
        assert!(matches!(err, HostError::Rejected { .. }));
    }

    #[tokio::test]
    async fn update_group_validates_color() {
        let host = MemoryHost::new(state());
        let bad = GroupUpdate {
            color: Some("magenta".into()),
            ..Default::default()
        };
        assert!(matches!(
            host.update_group(10, bad).await,
            Err(HostError::InvalidArgument(_))
        ));
        let good = GroupUpdate {
            title: Some("New".into()),
            color: Some("blue".into()),
            collapsed: None,
        };
        host.update_group(10, good).await.expect("update");
        let g = &host.snapshot().groups[0];
        assert_eq!((g.title.as_str(), g.color.as_str()), ("New", "blue"));
        assert!(matches!(
            host.update_group(99, GroupUpdate::default()).await,
            Err(HostError::NoSuchGroup(99))
        ));
    }

    #[tokio::test]
    async fn create_window_and_remove() {
        let host = MemoryHost::new(state());
        let w = host.create_window(2).await.expect("window");
        assert_eq!(w, 3);
        assert_eq!(order(&host, 3), vec![2]);
        host.remove_tabs(&[2]).await.expect("remove");
        assert_eq!(host.query_windows().await.expect("windows"), vec![1, 2]);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let host = MemoryHost::new(state());
        host.fail_next(HostOp::MoveTabs);
        assert!(matches!(
            host.move_tabs(&[1], MoveProperties::at(2)).await,
            Err(HostError::Injected(HostOp::MoveTabs))
        ));
        host.move_tabs(&[1], MoveProperties::at(2)).await.expect("second try");
        assert_eq!(order(&host, 1), vec![2, 3, 1]);
        assert_eq!(host.mutation_count(), 2);
    }

    #[tokio::test]
    async fn missing_ids_are_errors() {
        let host = MemoryHost::new(state());
        assert!(matches!(host.get_tab(42).await, Err(HostError::NoSuchTab(42))));
        assert!(matches!(
            host.move_tabs(&[1], MoveProperties::to_end(9)).await,
            Err(HostError::NoSuchWindow(9))
        ));
        assert!(matches!(
            host.ungroup_tabs(&[]).await,
            Err(HostError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn move_group_travels_whole() {
        let host = MemoryHost::new(state());
        host.group_tabs(&[1, 2], GroupTarget::New { window_id: None })
            .await
            .expect("group");
        host.move_group(11, MoveProperties::to_end(2)).await.expect("move group");
        assert_eq!(order(&host, 2), vec![4, 1, 2]);
        let members = host.query_tabs(TabQuery::group(11)).await.expect("query");
        assert_eq!(members.len(), 2);
    }
}
