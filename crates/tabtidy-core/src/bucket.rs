//! Bucketizer: tabs × strategies → labeled, colored buckets.

use std::collections::{HashMap, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::color::{ColorRequest, resolve_bucket_color};
use crate::field::{FieldPath, domain_cached};
use crate::grouping::{
    age_label, context_or_default, grouping_result, semantic_bucket,
};
use crate::registry::{BuiltinStrategy, is_grouping_strategy};
use crate::strategy::StrategyContext;
use crate::transform::strip_tld;
use crate::types::{Bucket, TabId, TabRecord, WindowId, WindowMode};

/// Labels that say nothing about the bucket; dropped from composite labels.
const PLACEHOLDER_LABELS: [&str; 5] = ["Unknown", "Group", "URL Group", "Time Group", "Misc"];
const DEFAULT_LABEL: &str = "Group";
const PARENT_TITLE_MAX: usize = 20;

/// Per-tab classification output.
struct TabKey {
    value_key: String,
    applied: Vec<String>,
    mode: WindowMode,
}

struct Draft {
    key: String,
    window_id: WindowId,
    value_key: String,
    applied: Vec<String>,
    mode: WindowMode,
    tabs: Vec<TabRecord>,
}

/// Group `tabs` by the composite key of every grouping-capable strategy in
/// `strategy_ids`. Tabs with no key under any strategy are left out.
///
/// Buckets come back in creation order. A tab whose rule evaluation panics
/// is logged and skipped.
pub fn group_tabs<S: AsRef<str>>(
    tabs: &[TabRecord],
    strategy_ids: &[S],
    ctx: &StrategyContext,
) -> Vec<Bucket> {
    let strategies: Vec<&str> = strategy_ids
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| is_grouping_strategy(id, ctx))
        .collect();
    if strategies.is_empty() {
        return Vec::new();
    }

    let mut drafts: Vec<Draft> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for tab in tabs {
        let Some(key) = guarded(tab.id, || classify(tab, &strategies, ctx)) else {
            continue;
        };

        let bucket_key = match key.mode {
            WindowMode::Current => format!("window-{}::{}", tab.window_id, key.value_key),
            _ => format!("global::{}", key.value_key),
        };
        let slot = *index.entry(bucket_key.clone()).or_insert_with(|| {
            drafts.push(Draft {
                key: bucket_key,
                window_id: tab.window_id,
                value_key: key.value_key,
                applied: key.applied,
                mode: key.mode,
                tabs: Vec::new(),
            });
            drafts.len() - 1
        });
        let draft = &mut drafts[slot];
        draft.mode = draft.mode.max(key.mode);
        draft.tabs.push(tab.clone());
    }

    let by_id: HashMap<TabId, &TabRecord> = tabs.iter().map(|t| (t.id, t)).collect();
    let buckets: Vec<Bucket> = drafts
        .into_iter()
        .enumerate()
        .map(|(i, d)| finish(d, i, &by_id, ctx))
        .collect();
    tracing::debug!(tabs = tabs.len(), buckets = buckets.len(), "grouped tabs");
    buckets
}

/// Run one tab's classification, turning a panic into a skipped tab.
fn guarded<T>(tab_id: TabId, f: impl FnOnce() -> Option<T>) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(tab_id, "rule evaluation panicked, skipping tab");
            None
        }
    }
}

fn classify(tab: &TabRecord, strategies: &[&str], ctx: &StrategyContext) -> Option<TabKey> {
    let mut pairs = Vec::new();
    let mut applied = Vec::new();
    let mut mode = WindowMode::Current;
    for id in strategies {
        let result = grouping_result(tab, id, ctx);
        if let Some(key) = result.key {
            pairs.push(format!("{id}:{key}"));
            applied.push((*id).to_string());
            mode = mode.max(result.mode);
        }
    }
    if pairs.is_empty() {
        return None;
    }
    Some(TabKey {
        value_key: pairs.join("::"),
        applied,
        mode,
    })
}

fn finish(
    draft: Draft,
    creation_index: usize,
    by_id: &HashMap<TabId, &TabRecord>,
    ctx: &StrategyContext,
) -> Bucket {
    let applied: Vec<&str> = draft.applied.iter().map(String::as_str).collect();
    let color = resolve_bucket_color(
        &ColorRequest {
            strategies: &applied,
            value_key: &draft.value_key,
            bucket_key: &draft.key,
            creation_index,
            tabs: &draft.tabs,
        },
        ctx,
    );
    let label = generate_label(&applied, &draft.tabs, by_id, ctx);
    Bucket {
        id: draft.key,
        window_id: draft.window_id,
        label,
        color,
        reason: applied.join(" + "),
        window_mode: draft.mode,
        tabs: draft.tabs,
    }
}

// ─── Labels ───────────────────────────────────────────────────────

pub fn generate_label(
    strategies: &[&str],
    tabs: &[TabRecord],
    by_id: &HashMap<TabId, &TabRecord>,
    ctx: &StrategyContext,
) -> String {
    let mut seen = HashSet::new();
    let parts: Vec<String> = strategies
        .iter()
        .map(|id| label_component(id, tabs, by_id, ctx))
        .filter(|c| !c.is_empty() && !PLACEHOLDER_LABELS.contains(&c.as_str()))
        .filter(|c| seen.insert(c.clone()))
        .collect();
    if parts.is_empty() {
        DEFAULT_LABEL.to_string()
    } else {
        parts.join(" - ")
    }
}

/// Human-facing label piece for one strategy, read off the bucket's tabs.
pub fn label_component(
    strategy_id: &str,
    tabs: &[TabRecord],
    by_id: &HashMap<TabId, &TabRecord>,
    ctx: &StrategyContext,
) -> String {
    let Some(first) = tabs.first() else {
        return "Unknown".to_string();
    };
    if ctx.custom(strategy_id).is_some() {
        return grouping_result(first, strategy_id, ctx)
            .key
            .unwrap_or_else(|| "Unknown".to_string());
    }

    let Some(builtin) = BuiltinStrategy::from_id(strategy_id) else {
        let v = FieldPath::parse(strategy_id).resolve(first, ctx).to_text();
        return if v.is_empty() { "Unknown".to_string() } else { v };
    };

    match builtin {
        BuiltinStrategy::Domain => {
            let site_names: HashSet<String> = tabs
                .iter()
                .filter_map(|t| FieldPath::SiteName.resolve(t, ctx).as_text())
                .collect();
            match site_names.into_iter().collect::<Vec<_>>().as_slice() {
                [only] => strip_tld(only),
                _ => strip_tld(&domain_cached(&first.url, ctx)),
            }
        }
        BuiltinStrategy::DomainFull => domain_cached(&first.url, ctx),
        BuiltinStrategy::Topic => semantic_bucket(&first.title, &first.url).to_string(),
        BuiltinStrategy::Lineage => match first.opener_tab_id {
            Some(opener) => match by_id.get(&opener) {
                Some(parent) => format!("From: {}", truncate_title(&parent.title)),
                None => format!("From: Tab {opener}"),
            },
            None => format!("Window {}", first.window_id),
        },
        BuiltinStrategy::Context => context_or_default(first),
        BuiltinStrategy::Pinned => (if first.pinned { "Pinned" } else { "Unpinned" }).to_string(),
        BuiltinStrategy::Age => age_label(first, ctx.now_millis()).to_string(),
        BuiltinStrategy::Url => "URL Group".to_string(),
        BuiltinStrategy::Recency => "Time Group".to_string(),
        BuiltinStrategy::Nesting => {
            (if first.opener_tab_id.is_some() { "Children" } else { "Roots" }).to_string()
        }
        BuiltinStrategy::Title => {
            if first.title.is_empty() { "Unknown".to_string() } else { first.title.clone() }
        }
    }
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() > PARENT_TITLE_MAX {
        let head: String = title.chars().take(PARENT_TITLE_MAX).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

// ─── Tests ────────────────────────────────────────────────────────
