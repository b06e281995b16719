//! Host tab → engine `TabRecord`.

use tabtidy_core::TabRecord;

use crate::model::{HostTab, TAB_ID_NONE};

const UNTITLED: &str = "Untitled";
const BLANK_URL: &str = "about:blank";

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

/// `None` for sentinel tabs the engine must never touch.
pub fn to_tab_record(tab: &HostTab) -> Option<TabRecord> {
    if tab.id == TAB_ID_NONE {
        return None;
    }
    Some(TabRecord {
        id: tab.id,
        window_id: tab.window_id,
        title: non_empty(&tab.title).unwrap_or(UNTITLED).to_string(),
        url: non_empty(&tab.pending_url)
            .or_else(|| non_empty(&tab.url))
            .unwrap_or(BLANK_URL)
            .to_string(),
        pinned: tab.pinned,
        last_accessed: tab.last_accessed,
        opener_tab_id: tab.opener_tab_id,
        group_id: Some(tab.group_id),
        index: tab.index,
        active: tab.active,
        selected: Some(tab.highlighted),
        status: tab.status.clone(),
        fav_icon_url: tab.fav_icon_url.clone(),
        context: None,
        context_data: None,
    })
}

pub fn to_tab_records(tabs: &[HostTab]) -> Vec<TabRecord> {
    tabs.iter().filter_map(to_tab_record).collect()
}
