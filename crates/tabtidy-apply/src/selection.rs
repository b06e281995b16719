//! Actions on an explicit set of tabs: merge, split, close.

use tabtidy_core::{Bucket, GroupId, TabId, WindowId};
use tabtidy_host::{GroupTarget, HostError, HostTab, MoveProperties, TabHost};

/// Live tabs for `tab_ids`, in the given order. Ids the host no longer
/// knows are dropped.
async fn resolve<H: TabHost>(host: &H, tab_ids: &[TabId]) -> Result<Vec<HostTab>, HostError> {
    let mut tabs = Vec::with_capacity(tab_ids.len());
    for id in tab_ids {
        match host.get_tab(*id).await {
            Ok(tab) => tabs.push(tab),
            Err(HostError::NoSuchTab(gone)) => tracing::debug!(tab_id = gone, "tab vanished"),
            Err(e) => return Err(e),
        }
    }
    Ok(tabs)
}

/// Gather the tabs into the first tab's window and one group: the first
/// tab's group if it has one, else the group of any passed tab already in
/// that window, else a new group.
pub async fn merge_tabs<H: TabHost>(host: &H, tab_ids: &[TabId]) -> Result<Option<GroupId>, HostError> {
    let tabs = resolve(host, tab_ids).await?;
    let Some(first) = tabs.first() else {
        return Ok(None);
    };
    let window_id = first.window_id;

    let strays: Vec<TabId> = tabs
        .iter()
        .filter(|t| t.window_id != window_id)
        .map(|t| t.id)
        .collect();
    if !strays.is_empty() {
        host.move_tabs(&strays, MoveProperties::to_end(window_id)).await?;
    }

    let existing = if first.is_grouped() {
        Some(first.group_id)
    } else {
        tabs.iter()
            .find(|t| t.window_id == window_id && t.is_grouped())
            .map(|t| t.group_id)
    };
    let target = match existing {
        Some(gid) => GroupTarget::Existing(gid),
        None => GroupTarget::New {
            window_id: Some(window_id),
        },
    };
    let ids: Vec<TabId> = tabs.iter().map(|t| t.id).collect();
    let gid = host.group_tabs(&ids, target).await?;
    tracing::info!(group_id = gid, tabs = ids.len(), "merged tabs");
    Ok(Some(gid))
}

/// Move the tabs into a fresh window, first tab first.
pub async fn split_tabs<H: TabHost>(host: &H, tab_ids: &[TabId]) -> Result<Option<WindowId>, HostError> {
    let tabs = resolve(host, tab_ids).await?;
    let Some(first) = tabs.first() else {
        return Ok(None);
    };
    let window_id = host.create_window(first.id).await?;
    let rest: Vec<TabId> = tabs[1..].iter().map(|t| t.id).collect();
    if !rest.is_empty() {
        host.move_tabs(&rest, MoveProperties::to_end(window_id)).await?;
    }
    tracing::info!(window_id, tabs = tabs.len(), "split tabs into new window");
    Ok(Some(window_id))
}

/// Close every tab in the bucket.
pub async fn close_bucket<H: TabHost>(host: &H, bucket: &Bucket) -> Result<usize, HostError> {
    let ids = bucket.tab_ids();
    if ids.is_empty() {
        return Ok(0);
    }
    host.remove_tabs(&ids).await?;
    tracing::info!(bucket = %bucket.id, tabs = ids.len(), "closed bucket");
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabtidy_core::{TabRecord, WindowMode};
    use tabtidy_host::{HostGroup, HostState, MemoryHost};

    fn host() -> MemoryHost {
        let mut tabs = vec![
            HostTab::new(1, 1, "https://a.example"),
            HostTab::new(2, 1, "https://b.example").with_group(5),
            HostTab::new(3, 2, "https://c.example"),
        ];
        tabs[1].index = 1;
        MemoryHost::new(HostState {
            windows: vec![],
            tabs,
            groups: vec![HostGroup {
                id: 5,
                window_id: 1,
                title: "Five".into(),
                color: "green".into(),
                collapsed: false,
            }],
        })
    }

    #[tokio::test]
    async fn merge_joins_existing_group_across_windows() {
        let host = host();
        let gid = merge_tabs(&host, &[1, 3, 2]).await.expect("merge");
        assert_eq!(gid, Some(5));
        let state = host.snapshot();
        assert!(state.tabs.iter().all(|t| t.window_id == 1 && t.group_id == 5));
    }

    #[tokio::test]
    async fn merge_reuses_group_of_later_tab() {
        let host = host();
        let gid = merge_tabs(&host, &[1, 2]).await.expect("merge");
        assert_eq!(gid, Some(5));
        let state = host.snapshot();
        assert_eq!(state.groups.len(), 1);
        assert!(state.tabs.iter().filter(|t| t.window_id == 1).all(|t| t.group_id == 5));
    }

    #[tokio::test]
    async fn merge_skips_vanished_tabs() {
        let host = host();
        assert_eq!(merge_tabs(&host, &[42]).await.expect("merge"), None);
        assert_eq!(host.mutation_count(), 0);
    }

    #[tokio::test]
    async fn split_opens_window() {
        let host = host();
        let window = split_tabs(&host, &[2, 3]).await.expect("split").expect("window");
        let state = host.snapshot();
        let moved: Vec<TabId> = state
            .tabs
            .iter()
            .filter(|t| t.window_id == window)
            .map(|t| t.id)
            .collect();
        assert_eq!(moved, vec![2, 3]);
        assert!(state.groups.is_empty());
    }

    #[tokio::test]
    async fn close_removes_bucket_tabs() {
        let host = host();
        let bucket = Bucket {
            id: "b".into(),
            window_id: 1,
            label: "B".into(),
            color: "grey".into(),
            tabs: vec![TabRecord::new(1, 1, "a", "https://a.example"), TabRecord::new(3, 2, "c", "https://c.example")],
            reason: "domain".into(),
            window_mode: WindowMode::Current,
        };
        assert_eq!(close_bucket(&host, &bucket).await.expect("close"), 2);
        let left: Vec<TabId> = host.snapshot().tabs.iter().map(|t| t.id).collect();
        assert_eq!(left, vec![2]);
    }
}
