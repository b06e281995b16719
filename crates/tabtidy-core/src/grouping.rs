//! Grouping key engine: one (tab, strategy) → key + placement hint.

use crate::condition::{RuleCondition, check_condition, evaluate_condition, substitute_captures};
use crate::field::{FieldPath, domain_cached};
use crate::registry::BuiltinStrategy;
use crate::strategy::{CustomStrategy, GroupingRule, RuleSource, StrategyContext};
use crate::transform::{TransformKind, apply_transform};
use crate::types::{TabRecord, WindowMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupingResult {
    /// `None` excludes the tab from this strategy's grouping.
    pub key: Option<String>,
    pub mode: WindowMode,
}

impl GroupingResult {
    fn excluded() -> Self {
        Self {
            key: None,
            mode: WindowMode::Current,
        }
    }

    fn keyed(key: String, mode: WindowMode) -> Self {
        Self {
            key: Some(key),
            mode,
        }
    }
}

pub fn grouping_key(tab: &TabRecord, strategy_id: &str, ctx: &StrategyContext) -> Option<String> {
    grouping_result(tab, strategy_id, ctx).key
}

pub fn grouping_result(tab: &TabRecord, strategy_id: &str, ctx: &StrategyContext) -> GroupingResult {
    if let Some(custom) = ctx.custom(strategy_id) {
        return custom_result(tab, custom, ctx);
    }
    let key = match BuiltinStrategy::from_id(strategy_id) {
        Some(builtin) => builtin_key(tab, builtin, ctx),
        None => {
            let v = FieldPath::parse(strategy_id).resolve(tab, ctx).to_text();
            if v.is_empty() { "Unknown".to_string() } else { v }
        }
    };
    GroupingResult::keyed(key, WindowMode::Current)
}

// ─── Custom ───────────────────────────────────────────────────────

/// Membership test: filter groups are OR-of-AND, flat filters are AND,
/// neither means every tab matches.
pub fn strategy_matches(strategy: &CustomStrategy, tab: &TabRecord, ctx: &StrategyContext) -> bool {
    let all = |conds: &[RuleCondition]| conds.iter().all(|c| check_condition(c, tab, ctx));
    if !strategy.filter_groups.is_empty() {
        strategy.filter_groups.iter().any(|g| all(g.as_slice()))
    } else if !strategy.filters.is_empty() {
        all(strategy.filters.as_slice())
    } else {
        true
    }
}

/// Resolved (and transformed) value of one grouping rule.
pub fn rule_value(rule: &GroupingRule, tab: &TabRecord, ctx: &StrategyContext) -> String {
    let raw = match rule.source {
        RuleSource::Fixed => rule.value.clone(),
        RuleSource::Field => FieldPath::parse(&rule.value).resolve(tab, ctx).to_text(),
    };
    match rule.transform {
        Some(kind) if kind != TransformKind::None && !raw.is_empty() => apply_transform(
            &raw,
            kind,
            rule.transform_pattern.as_deref(),
            rule.transform_replacement.as_deref(),
            ctx,
        ),
        _ => raw,
    }
}

fn custom_result(tab: &TabRecord, strategy: &CustomStrategy, ctx: &StrategyContext) -> GroupingResult {
    if !strategy_matches(strategy, tab, ctx) {
        return GroupingResult::excluded();
    }

    if !strategy.grouping_rules.is_empty() {
        let mut parts = Vec::new();
        let mut mode = None;
        for rule in &strategy.grouping_rules {
            let part = rule_value(rule, tab, ctx);
            if part.is_empty() {
                continue;
            }
            parts.push(part);
            if let Some(m) = rule.window_mode {
                mode = mode.max(Some(m));
            }
        }
        let mode = mode.unwrap_or_default();
        if parts.is_empty() {
            return GroupingResult::keyed(strategy.fallback_key().to_string(), WindowMode::Current);
        }
        return GroupingResult::keyed(parts.join(" - "), mode);
    }

    for rule in &strategy.rules {
        let m = evaluate_condition(&rule.condition(), tab, ctx);
        if m.matched && !rule.result.is_empty() {
            return GroupingResult::keyed(
                substitute_captures(&rule.result, &m.captures),
                WindowMode::Current,
            );
        }
    }
    GroupingResult::keyed(strategy.fallback_key().to_string(), WindowMode::Current)
}

// ─── Built-in ─────────────────────────────────────────────────────

pub fn builtin_key(tab: &TabRecord, builtin: BuiltinStrategy, ctx: &StrategyContext) -> String {
    match builtin {
        BuiltinStrategy::Domain | BuiltinStrategy::DomainFull => domain_cached(&tab.url, ctx),
        BuiltinStrategy::Topic => semantic_bucket(&tab.title, &tab.url).to_string(),
        BuiltinStrategy::Lineage => lineage_key(tab),
        BuiltinStrategy::Context => context_or_default(tab),
        BuiltinStrategy::Pinned => (if tab.pinned { "pinned" } else { "unpinned" }).to_string(),
        BuiltinStrategy::Age => age_label(tab, ctx.now_millis()).to_string(),
        BuiltinStrategy::Url => tab.url.clone(),
        BuiltinStrategy::Title => tab.title.clone(),
        BuiltinStrategy::Recency => {
            crate::field::FieldValue::Number(tab.last_accessed.unwrap_or(0.0)).to_text()
        }
        BuiltinStrategy::Nesting => (if tab.opener_tab_id.is_some() { "child" } else { "root" }).to_string(),
    }
}

/// Coarse topic from substrings of title + url. First hit wins.
pub fn semantic_bucket(title: &str, url: &str) -> &'static str {
    const TAXONOMY: [(&[&str], &str); 5] = [
        (&["doc", "readme", "guide"], "Docs"),
        (&["mail", "inbox"], "Chat"),
        (&["dashboard", "console"], "Dash"),
        (&["issue", "ticket"], "Tasks"),
        (&["drive", "storage"], "Files"),
    ];
    let key = format!("{title} {url}").to_lowercase();
    TAXONOMY
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| key.contains(*n)))
        .map_or("Misc", |(_, label)| *label)
}

pub fn lineage_key(tab: &TabRecord) -> String {
    match tab.opener_tab_id {
        Some(opener) => format!("child-of-{opener}"),
        None => format!("window-{}", tab.window_id),
    }
}

pub fn context_or_default(tab: &TabRecord) -> String {
    match tab.context.as_deref() {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => "Uncategorized".to_string(),
    }
}

const HOUR_MS: f64 = 3_600_000.0;
const DAY_MS: f64 = 24.0 * HOUR_MS;

/// Recency bucket of `lastAccessed` (absent counts as the epoch).
pub fn age_label(tab: &TabRecord, now_ms: f64) -> &'static str {
    let diff = now_ms - tab.last_accessed.unwrap_or(0.0);
    if diff < HOUR_MS {
        "Just now"
    } else if diff < DAY_MS {
        "Today"
    } else if diff < 2.0 * DAY_MS {
        "Yesterday"
    } else if diff < 7.0 * DAY_MS {
        "This Week"
    } else {
        "Older"
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::RuleOperator;
    use crate::strategy::LegacyRule;
    use chrono::{TimeZone, Utc};

    fn ctx_with(strategies: Vec<CustomStrategy>) -> StrategyContext {
        StrategyContext::new(strategies)
            .with_now(Utc.timestamp_millis_opt(10 * DAY_MS as i64).single().expect("ts"))
    }

    fn tab(id: i64, url: &str) -> TabRecord {
        TabRecord::new(id, 1, format!("Tab {id}"), url)
    }

    #[test]
    fn builtin_keys() {
        let ctx = ctx_with(vec![]);
        let mut t = tab(1, "https://www.github.com/a");
        assert_eq!(grouping_key(&t, "domain", &ctx).as_deref(), Some("github.com"));
        assert_eq!(grouping_key(&t, "pinned", &ctx).as_deref(), Some("unpinned"));
        assert_eq!(grouping_key(&t, "lineage", &ctx).as_deref(), Some("window-1"));
        assert_eq!(grouping_key(&t, "nesting", &ctx).as_deref(), Some("root"));
        assert_eq!(grouping_key(&t, "context", &ctx).as_deref(), Some("Uncategorized"));
        assert_eq!(grouping_key(&t, "recency", &ctx).as_deref(), Some("0"));
        assert_eq!(grouping_key(&t, "age", &ctx).as_deref(), Some("Older"));
        t.opener_tab_id = Some(9);
        assert_eq!(grouping_key(&t, "lineage", &ctx).as_deref(), Some("child-of-9"));
        assert_eq!(grouping_key(&t, "nesting", &ctx).as_deref(), Some("child"));
    }

    #[test]
    fn generic_field_fallback() {
        let ctx = ctx_with(vec![]);
        let t = tab(1, "https://a.b.example.com");
        assert_eq!(grouping_key(&t, "subdomain", &ctx).as_deref(), Some("a.b"));
        assert_eq!(grouping_key(&t, "contextData.x", &ctx).as_deref(), Some("Unknown"));
    }

    #[test]
    fn topic_taxonomy() {
        assert_eq!(semantic_bucket("Project README", ""), "Docs");
        assert_eq!(semantic_bucket("", "https://mail.example.com"), "Chat");
        assert_eq!(semantic_bucket("AWS Console", ""), "Dash");
        assert_eq!(semantic_bucket("Issue #4", ""), "Tasks");
        assert_eq!(semantic_bucket("My Drive", ""), "Files");
        assert_eq!(semantic_bucket("News", "https://news.example"), "Misc");
    }

    #[test]
    fn age_thresholds() {
        let now = 10.0 * DAY_MS;
        let at = |ago: f64| {
            let mut t = tab(1, "");
            t.last_accessed = Some(now - ago);
            age_label(&t, now)
        };
        assert_eq!(at(0.0), "Just now");
        assert_eq!(at(2.0 * HOUR_MS), "Today");
        assert_eq!(at(30.0 * HOUR_MS), "Yesterday");
        assert_eq!(at(3.0 * DAY_MS), "This Week");
        assert_eq!(at(8.0 * DAY_MS), "Older");
    }

    #[test]
    fn grouping_rules_join_non_empty_parts() {
        let mut s = CustomStrategy::new("site", "Site");
        s.grouping_rules = vec![
            GroupingRule::field("domain").with_transform(TransformKind::StripTld, None),
            GroupingRule::field("contextData.missing"),
            GroupingRule::fixed("Work"),
        ];
        let ctx = ctx_with(vec![s]);
        let r = grouping_result(&tab(1, "https://github.com/x"), "site", &ctx);
        assert_eq!(r.key.as_deref(), Some("github - Work"));
        assert_eq!(r.mode, WindowMode::Current);
    }

    #[test]
    fn window_mode_takes_highest_contributing_rule() {
        let mut s = CustomStrategy::new("s", "S");
        s.grouping_rules = vec![
            GroupingRule::fixed("a").with_window_mode(WindowMode::Compound),
            GroupingRule::field("contextData.none").with_window_mode(WindowMode::New),
            GroupingRule::fixed("b"),
        ];
        let ctx = ctx_with(vec![s.clone()]);
        let r = grouping_result(&tab(1, "https://x.com"), "s", &ctx);
        assert_eq!(r.mode, WindowMode::Compound);

        s.grouping_rules[2] = GroupingRule::fixed("b").with_window_mode(WindowMode::New);
        let ctx = ctx_with(vec![s]);
        let r = grouping_result(&tab(1, "https://x.com"), "s", &ctx);
        assert_eq!(r.mode, WindowMode::New);
    }

    #[test]
    fn all_empty_parts_fall_back() {
        let mut s = CustomStrategy::new("s", "S");
        s.grouping_rules = vec![GroupingRule::field("contextData.none")];
        s.fallback = Some("Other".into());
        let ctx = ctx_with(vec![s]);
        assert_eq!(grouping_key(&tab(1, "https://x.com"), "s", &ctx).as_deref(), Some("Other"));
    }

    #[test]
    fn filters_exclude_non_matching_tabs() {
        let mut s = CustomStrategy::new("gh", "GitHub");
        s.filters = vec![RuleCondition::new("domain", RuleOperator::Equals, "github.com")];
        s.grouping_rules = vec![GroupingRule::fixed("Code")];
        let ctx = ctx_with(vec![s]);
        assert_eq!(grouping_key(&tab(1, "https://github.com"), "gh", &ctx).as_deref(), Some("Code"));
        let miss = grouping_result(&tab(2, "https://gitlab.com"), "gh", &ctx);
        assert_eq!(miss, GroupingResult::excluded());
    }

    #[test]
    fn empty_filter_group_matches_everything() {
        let mut s = CustomStrategy::new("s", "S");
        s.filter_groups = vec![
            vec![RuleCondition::new("title", RuleOperator::Equals, "nope")],
            vec![],
        ];
        s.grouping_rules = vec![GroupingRule::fixed("All")];
        let ctx = ctx_with(vec![s]);
        assert!(grouping_key(&tab(1, "https://x.com"), "s", &ctx).is_some());
    }

    #[test]
    fn legacy_rules_substitute_captures() {
        let mut s = CustomStrategy::new("legacy", "Legacy");
        s.rules = vec![
            LegacyRule {
                field: "title".into(),
                operator: RuleOperator::Contains,
                value: "never".into(),
                result: "Never".into(),
            },
            LegacyRule {
                field: "url".into(),
                operator: RuleOperator::Matches,
                value: r"https://(example)\.com/(.*)".into(),
                result: "Domain: $1, Path: $2".into(),
            },
        ];
        let ctx = ctx_with(vec![s]);
        let key = grouping_key(&tab(1, "https://example.com/page"), "legacy", &ctx);
        assert_eq!(key.as_deref(), Some("Domain: example, Path: page"));
        let key = grouping_key(&tab(2, "https://other.org"), "legacy", &ctx);
        assert_eq!(key.as_deref(), Some("Misc"));
    }

    #[test]
    fn custom_id_shadows_builtin() {
        let mut s = CustomStrategy::new("domain", "My domain");
        s.grouping_rules = vec![GroupingRule::fixed("Mine")];
        let ctx = ctx_with(vec![s]);
        assert_eq!(grouping_key(&tab(1, "https://a.com"), "domain", &ctx).as_deref(), Some("Mine"));
    }
}
