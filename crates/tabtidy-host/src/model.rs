//! Wire shapes exchanged with the host, camelCase like the browser API.

use serde::{Deserialize, Serialize};
use tabtidy_core::{GROUP_ID_NONE, GroupId, TabId, WindowId};

/// Id the host reports for tabs that are not real (devtools, prerender).
pub const TAB_ID_NONE: TabId = -1;

fn no_group() -> GroupId {
    GROUP_ID_NONE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostTab {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_url: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default = "no_group")]
    pub group_id: GroupId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
}

impl HostTab {
    pub fn new(id: TabId, window_id: WindowId, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            index: 0,
            title: None,
            url: Some(url.into()),
            pending_url: None,
            pinned: false,
            active: false,
            highlighted: false,
            status: None,
            group_id: GROUP_ID_NONE,
            opener_tab_id: None,
            last_accessed: None,
            fav_icon_url: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = group_id;
        self
    }

    pub fn is_grouped(&self) -> bool {
        self.group_id != GROUP_ID_NONE
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostGroup {
    pub id: GroupId,
    pub window_id: WindowId,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_group_color")]
    pub color: String,
    #[serde(default)]
    pub collapsed: bool,
}

fn default_group_color() -> String {
    "grey".to_string()
}

/// Tab filter; `None` fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabQuery {
    pub window_id: Option<WindowId>,
    pub group_id: Option<GroupId>,
}

impl TabQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn window(window_id: WindowId) -> Self {
        Self {
            window_id: Some(window_id),
            group_id: None,
        }
    }

    pub fn group(group_id: GroupId) -> Self {
        Self {
            window_id: None,
            group_id: Some(group_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupUpdate {
    pub title: Option<String>,
    pub color: Option<String>,
    pub collapsed: Option<bool>,
}

/// Destination for moved tabs or groups. `index == -1` appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveProperties {
    pub window_id: Option<WindowId>,
    pub index: i64,
}

impl MoveProperties {
    pub fn to_end(window_id: WindowId) -> Self {
        Self {
            window_id: Some(window_id),
            index: -1,
        }
    }

    pub fn at(index: i64) -> Self {
        Self {
            window_id: None,
            index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTarget {
    Existing(GroupId),
    /// New group; in the first tab's window when `window_id` is `None`.
    New { window_id: Option<WindowId> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_tab_defaults_to_ungrouped() {
        let tab: HostTab =
            serde_json::from_str(r#"{"id":3,"windowId":1,"url":"https://a.com"}"#).expect("parse");
        assert_eq!(tab.group_id, GROUP_ID_NONE);
        assert!(!tab.is_grouped());
        assert_eq!(tab.index, 0);
    }

    #[test]
    fn host_group_defaults_to_grey() {
        let g: HostGroup = serde_json::from_str(r#"{"id":9,"windowId":1}"#).expect("parse");
        assert_eq!(g.color, "grey");
        assert_eq!(g.title, "");
    }
}
