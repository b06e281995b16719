//! `TabHost`: async access to live windows, tabs and tab groups.

use std::future::Future;

use tabtidy_core::{GroupId, TabId, WindowId};

use crate::error::HostError;
use crate::model::{GroupTarget, GroupUpdate, HostGroup, HostTab, MoveProperties, TabQuery};

/// Live tab system. Every call may observe state changed by someone else
/// since the previous call. Enables fake injection for testing.
pub trait TabHost: Send + Sync {
    fn query_tabs(&self, query: TabQuery) -> impl Future<Output = Result<Vec<HostTab>, HostError>> + Send;

    fn get_tab(&self, tab_id: TabId) -> impl Future<Output = Result<HostTab, HostError>> + Send;

    fn query_windows(&self) -> impl Future<Output = Result<Vec<WindowId>, HostError>> + Send;

    /// Groups in one window, or all groups when `window_id` is `None`.
    fn query_groups(
        &self,
        window_id: Option<WindowId>,
    ) -> impl Future<Output = Result<Vec<HostGroup>, HostError>> + Send;

    /// Open a new window holding `tab_id`; returns the window id.
    fn create_window(&self, tab_id: TabId) -> impl Future<Output = Result<WindowId, HostError>> + Send;

    fn move_tabs(
        &self,
        tab_ids: &[TabId],
        to: MoveProperties,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    /// Add tabs to a group; returns the group id (generated for `New`).
    fn group_tabs(
        &self,
        tab_ids: &[TabId],
        target: GroupTarget,
    ) -> impl Future<Output = Result<GroupId, HostError>> + Send;

    fn ungroup_tabs(&self, tab_ids: &[TabId]) -> impl Future<Output = Result<(), HostError>> + Send;

    fn update_group(
        &self,
        group_id: GroupId,
        update: GroupUpdate,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn move_group(
        &self,
        group_id: GroupId,
        to: MoveProperties,
    ) -> impl Future<Output = Result<(), HostError>> + Send;

    fn remove_tabs(&self, tab_ids: &[TabId]) -> impl Future<Output = Result<(), HostError>> + Send;
}

impl<T: TabHost + ?Sized> TabHost for &T {
    fn query_tabs(&self, query: TabQuery) -> impl Future<Output = Result<Vec<HostTab>, HostError>> + Send {
        (**self).query_tabs(query)
    }

    fn get_tab(&self, tab_id: TabId) -> impl Future<Output = Result<HostTab, HostError>> + Send {
        (**self).get_tab(tab_id)
    }

    fn query_windows(&self) -> impl Future<Output = Result<Vec<WindowId>, HostError>> + Send {
        (**self).query_windows()
    }

    fn query_groups(
        &self,
        window_id: Option<WindowId>,
    ) -> impl Future<Output = Result<Vec<HostGroup>, HostError>> + Send {
        (**self).query_groups(window_id)
    }

    fn create_window(&self, tab_id: TabId) -> impl Future<Output = Result<WindowId, HostError>> + Send {
        (**self).create_window(tab_id)
    }

    fn move_tabs(
        &self,
        tab_ids: &[TabId],
        to: MoveProperties,
    ) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).move_tabs(tab_ids, to)
    }

    fn group_tabs(
        &self,
        tab_ids: &[TabId],
        target: GroupTarget,
    ) -> impl Future<Output = Result<GroupId, HostError>> + Send {
        (**self).group_tabs(tab_ids, target)
    }

    fn ungroup_tabs(&self, tab_ids: &[TabId]) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).ungroup_tabs(tab_ids)
    }

    fn update_group(
        &self,
        group_id: GroupId,
        update: GroupUpdate,
    ) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).update_group(group_id, update)
    }

    fn move_group(
        &self,
        group_id: GroupId,
        to: MoveProperties,
    ) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).move_group(group_id, to)
    }

    fn remove_tabs(&self, tab_ids: &[TabId]) -> impl Future<Output = Result<(), HostError>> + Send {
        (**self).remove_tabs(tab_ids)
    }
}
