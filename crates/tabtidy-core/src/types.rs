use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── Identity ─────────────────────────────────────────────────────

pub type TabId = i64;
pub type WindowId = i64;
pub type GroupId = i64;

/// Host sentinel for a tab that belongs to no group.
pub const GROUP_ID_NONE: GroupId = -1;

// ─── Tab Snapshot ─────────────────────────────────────────────────

/// Read-only snapshot of one live tab, taken per operation.
///
/// `context_data` carries whatever the enrichment layer extracted for the
/// page (site name, genre, platform-specific blocks). The engine only reads
/// it through dotted field paths.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabRecord {
    pub id: TabId,
    pub window_id: WindowId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub pinned: bool,
    /// Milliseconds since the epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opener_tab_id: Option<TabId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_data: Option<serde_json::Value>,
}

impl TabRecord {
    pub fn new(id: TabId, window_id: WindowId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            title: title.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    /// The tab's group, treating the host sentinel as "no group".
    pub fn existing_group(&self) -> Option<GroupId> {
        self.group_id.filter(|&g| g != GROUP_ID_NONE)
    }
}

// ─── Window Placement ─────────────────────────────────────────────

/// Where a bucket's tabs should live once applied.
///
/// Variant order is the precedence order: `New` beats `Compound` beats
/// `Current`, so `Iterator::max` picks the winning hint.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    /// One bucket per existing window; tabs never move.
    #[default]
    Current,
    /// Merge into the window holding most of the bucket's tabs.
    Compound,
    /// Dedicated new window.
    New,
}

impl WindowMode {
    pub const PRECEDENCE_DESC: [Self; 3] = [Self::New, Self::Compound, Self::Current];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Compound => "compound",
            Self::New => "new",
        }
    }
}

impl fmt::Display for WindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "current" => Ok(Self::Current),
            "compound" => Ok(Self::Compound),
            "new" => Ok(Self::New),
            _ => Err(format!("unknown window mode: {s}")),
        }
    }
}

// ─── Bucket ───────────────────────────────────────────────────────

/// One classification output unit: a labeled, colored set of tabs.
///
/// Built fresh on every pass and handed straight to a preview or to the
/// reconciler; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: String,
    pub window_id: WindowId,
    pub label: String,
    pub color: String,
    pub tabs: Vec<TabRecord>,
    pub reason: String,
    #[serde(default)]
    pub window_mode: WindowMode,
}

impl Bucket {
    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.iter().map(|t| t.id).collect()
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_mode_precedence_matches_ord() {
        let modes = [WindowMode::Current, WindowMode::New, WindowMode::Compound];
        assert_eq!(modes.iter().copied().max(), Some(WindowMode::New));
        assert_eq!(
            [WindowMode::Current, WindowMode::Compound].iter().copied().max(),
            Some(WindowMode::Compound)
        );
        assert_eq!(WindowMode::PRECEDENCE_DESC[0], WindowMode::New);
    }

    #[test]
    fn window_mode_display_and_parse() {
        for mode in WindowMode::PRECEDENCE_DESC {
            assert_eq!(mode.to_string().parse::<WindowMode>(), Ok(mode));
        }
        assert!("sideways".parse::<WindowMode>().is_err());
    }

    #[test]
    fn tab_record_parses_camel_case_snapshot() {
        let json = r#"{
            "id": 7, "windowId": 2, "title": "Inbox", "url": "https://mail.example.com",
            "pinned": true, "lastAccessed": 1700000000000.5, "groupId": -1, "index": 3,
            "active": false, "contextData": {"siteName": "Example Mail"}
        }"#;
        let tab: TabRecord = serde_json::from_str(json).expect("parse");
        assert_eq!(tab.window_id, 2);
        assert!(tab.pinned);
        assert_eq!(tab.existing_group(), None);
        assert_eq!(tab.last_accessed, Some(1_700_000_000_000.5));
        assert_eq!(tab.context_data.as_ref().and_then(|d| d["siteName"].as_str()), Some("Example Mail"));
    }

    #[test]
    fn existing_group_ignores_sentinel() {
        let mut tab = TabRecord::new(1, 1, "t", "https://a.com");
        assert_eq!(tab.existing_group(), None);
        tab.group_id = Some(GROUP_ID_NONE);
        assert_eq!(tab.existing_group(), None);
        tab.group_id = Some(42);
        assert_eq!(tab.existing_group(), Some(42));
    }

    #[test]
    fn bucket_window_mode_defaults_to_current() {
        let json = r#"{"id":"b","windowId":1,"label":"L","color":"blue","tabs":[],"reason":"domain"}"#;
        let bucket: Bucket = serde_json::from_str(json).expect("parse");
        assert_eq!(bucket.window_mode, WindowMode::Current);
    }
}
