//! Multi-key tab comparator.

use std::cmp::Ordering;

use crate::field::FieldPath;
use crate::grouping::{builtin_key, grouping_key};
use crate::registry::BuiltinStrategy;
use crate::strategy::{SortOrder, SortingRule, StrategyContext};
use crate::types::TabRecord;

pub const DEFAULT_SORTING: [&str; 2] = ["pinned", "recency"];

/// Case-folded comparison with lower case ahead of upper case on ties,
/// close to how the browser UI orders strings.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

pub fn compare_by_sorting_rules(
    a: &TabRecord,
    b: &TabRecord,
    rules: &[SortingRule],
    ctx: &StrategyContext,
) -> Ordering {
    for rule in rules {
        let path = FieldPath::parse(&rule.field);
        let ord = path.resolve(a, ctx).loose_cmp(&path.resolve(b, ctx));
        let ord = match rule.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        };
        if ord.is_ne() {
            return ord;
        }
    }
    Ordering::Equal
}

/// Compare two tabs under one strategy.
pub fn compare_by(a: &TabRecord, b: &TabRecord, strategy_id: &str, ctx: &StrategyContext) -> Ordering {
    // Custom sorting rules win; a custom id without them sorts like the
    // same-named built-in.
    if let Some(custom) = ctx.custom(strategy_id).filter(|c| !c.sorting_rules.is_empty()) {
        return compare_by_sorting_rules(a, b, &custom.sorting_rules, ctx);
    }

    let Some(builtin) = BuiltinStrategy::from_id(strategy_id) else {
        let path = FieldPath::parse(strategy_id);
        let (va, vb) = (path.resolve(a, ctx), path.resolve(b, ctx));
        if !va.is_undefined() && !vb.is_undefined() {
            return va.loose_cmp(&vb);
        }
        return compare_keys(a, b, strategy_id, ctx);
    };

    match builtin {
        BuiltinStrategy::Recency => {
            let (la, lb) = (a.last_accessed.unwrap_or(0.0), b.last_accessed.unwrap_or(0.0));
            lb.partial_cmp(&la).unwrap_or(Ordering::Equal)
        }
        BuiltinStrategy::Nesting => a.opener_tab_id.is_some().cmp(&b.opener_tab_id.is_some()),
        BuiltinStrategy::Pinned => b.pinned.cmp(&a.pinned),
        BuiltinStrategy::Title => locale_cmp(&a.title, &b.title),
        BuiltinStrategy::Url => locale_cmp(&a.url, &b.url),
        BuiltinStrategy::Context => locale_cmp(
            a.context.as_deref().unwrap_or(""),
            b.context.as_deref().unwrap_or(""),
        ),
        BuiltinStrategy::Domain
        | BuiltinStrategy::DomainFull
        | BuiltinStrategy::Topic
        | BuiltinStrategy::Lineage
        | BuiltinStrategy::Age => {
            locale_cmp(&builtin_key(a, builtin, ctx), &builtin_key(b, builtin, ctx))
        }
    }
}

fn compare_keys(a: &TabRecord, b: &TabRecord, strategy_id: &str, ctx: &StrategyContext) -> Ordering {
    let ka = grouping_key(a, strategy_id, ctx).unwrap_or_default();
    let kb = grouping_key(b, strategy_id, ctx).unwrap_or_default();
    locale_cmp(&ka, &kb)
}

/// Order two groups by their lead tabs: the strategy's group sorting rules
/// when it has any, else its tab comparator.
pub fn compare_group_leads(
    a: &TabRecord,
    b: &TabRecord,
    strategy_id: &str,
    ctx: &StrategyContext,
) -> Ordering {
    match ctx.custom(strategy_id) {
        Some(custom) if !custom.group_sorting_rules.is_empty() => {
            compare_by_sorting_rules(a, b, &custom.group_sorting_rules, ctx)
        }
        _ => compare_by(a, b, strategy_id, ctx),
    }
}

/// Stable sort by each strategy in turn, then ascending id. With no
/// strategies, sorts pinned-first then most recent.
pub fn sort_tabs<S: AsRef<str>>(
    tabs: Vec<TabRecord>,
    strategies: &[S],
    ctx: &StrategyContext,
) -> Vec<TabRecord> {
    let keys: Vec<&str> = if strategies.is_empty() {
        DEFAULT_SORTING.to_vec()
    } else {
        strategies.iter().map(AsRef::as_ref).collect()
    };
    merge_sort_by(tabs, &mut |a, b| {
        keys.iter()
            .map(|k| compare_by(a, b, k, ctx))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    })
}

/// Stable merge sort. Unlike `slice::sort_by` it accepts comparators that
/// are not total orders (user sorting rules mix strings and numbers).
pub fn merge_sort_by<T>(items: Vec<T>, cmp: &mut impl FnMut(&T, &T) -> Ordering) -> Vec<T> {
    if items.len() <= 1 {
        return items;
    }
    let mut left = items;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort_by(left, cmp);
    let right = merge_sort_by(right, cmp);

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut l = left.into_iter().peekable();
    let mut r = right.into_iter().peekable();
    loop {
        let take_right = match (l.peek(), r.peek()) {
            (Some(a), Some(b)) => cmp(b, a) == Ordering::Less,
            _ => break,
        };
        if take_right {
            out.extend(r.next());
        } else {
            out.extend(l.next());
        }
    }
    out.extend(l);
    out.extend(r);
    out
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{CustomStrategy, GroupingRule};
    use serde_json::json;

    fn tab(id: i64, title: &str) -> TabRecord {
        TabRecord::new(id, 1, title, format!("https://example.com/{id}"))
    }

    fn ids(tabs: &[TabRecord]) -> Vec<i64> {
        tabs.iter().map(|t| t.id).collect()
    }

    #[test]
    fn default_is_pinned_then_recency_then_id() {
        let ctx = StrategyContext::default();
        let mut a = tab(3, "a");
        a.last_accessed = Some(10.0);
        let mut b = tab(1, "b");
        b.pinned = true;
        let mut c = tab(2, "c");
        c.last_accessed = Some(50.0);
        let d = tab(0, "d");
        let none: [&str; 0] = [];
        let sorted = sort_tabs(vec![a, b, c, d], &none, &ctx);
        assert_eq!(ids(&sorted), vec![1, 2, 3, 0]);
    }

    #[test]
    fn ties_end_in_id_order() {
        let ctx = StrategyContext::default();
        let tabs = vec![tab(5, "x"), tab(2, "x"), tab(9, "x"), tab(1, "x")];
        assert_eq!(ids(&sort_tabs(tabs, &["title"], &ctx)), vec![1, 2, 5, 9]);
    }

    #[test]
    fn locale_compare_folds_case() {
        assert_eq!(locale_cmp("apple", "Banana"), Ordering::Less);
        assert_eq!(locale_cmp("a", "A"), Ordering::Less);
        assert_eq!(locale_cmp("x", "x"), Ordering::Equal);
    }

    #[test]
    fn nesting_puts_roots_first() {
        let ctx = StrategyContext::default();
        let mut child = tab(1, "c");
        child.opener_tab_id = Some(2);
        let root = tab(2, "r");
        assert_eq!(ids(&sort_tabs(vec![child, root], &["nesting"], &ctx)), vec![2, 1]);
    }

    #[test]
    fn custom_sorting_rules_honor_order_and_types() {
        let mut s = CustomStrategy::new("dur", "Duration");
        s.sorting_rules = vec![
            SortingRule { field: "contextData.views".into(), order: SortOrder::Desc },
            SortingRule { field: "title".into(), order: SortOrder::Asc },
        ];
        let ctx = StrategyContext::new(vec![s]);
        let mut a = tab(1, "b");
        a.context_data = Some(json!({"views": 9}));
        let mut b = tab(2, "a");
        b.context_data = Some(json!({"views": 100}));
        let mut c = tab(3, "a");
        c.context_data = Some(json!({"views": 9}));
        let sorted = sort_tabs(vec![a, b, c], &["dur"], &ctx);
        assert_eq!(ids(&sorted), vec![2, 3, 1]);
    }

    #[test]
    fn custom_tie_does_not_fall_through_to_builtin() {
        let mut s = CustomStrategy::new("title", "Shadow");
        s.sorting_rules = vec![SortingRule { field: "pinned".into(), order: SortOrder::Asc }];
        let ctx = StrategyContext::new(vec![s]);
        assert_eq!(compare_by(&tab(1, "a"), &tab(2, "z"), "title", &ctx), Ordering::Equal);
    }

    #[test]
    fn custom_without_sorting_rules_compares_keys() {
        let mut s = CustomStrategy::new("k", "Key");
        s.grouping_rules = vec![GroupingRule::field("title")];
        let ctx = StrategyContext::new(vec![s]);
        assert_eq!(compare_by(&tab(1, "b"), &tab(2, "a"), "k", &ctx), Ordering::Greater);
    }

    #[test]
    fn custom_with_only_grouping_rules_keeps_builtin_order() {
        let mut s = CustomStrategy::new("title", "Sites");
        s.grouping_rules = vec![GroupingRule::field("url")];
        let ctx = StrategyContext::new(vec![s]);
        let (a, b) = (tab(1, "zebra"), tab(2, "apple"));
        assert_eq!(compare_by(&a, &b, "title", &ctx), Ordering::Greater);
        assert_eq!(ids(&sort_tabs(vec![a, b], &["title"], &ctx)), vec![2, 1]);
    }

    #[test]
    fn unknown_ids_compare_fields_when_defined() {
        let ctx = StrategyContext::default();
        let mut a = tab(1, "a");
        a.index = 5;
        let mut b = tab(2, "b");
        b.index = 2;
        assert_eq!(compare_by(&a, &b, "index", &ctx), Ordering::Greater);
        assert_eq!(compare_by(&a, &b, "contextData.none", &ctx), Ordering::Equal);
    }

    #[test]
    fn merge_sort_survives_inconsistent_comparator() {
        let items: Vec<i32> = (0..50).rev().collect();
        let mut flip = false;
        let out = merge_sort_by(items, &mut |a: &i32, b: &i32| {
            flip = !flip;
            if flip { a.cmp(b) } else { b.cmp(a) }
        });
        assert_eq!(out.len(), 50);
    }

    #[test]
    fn group_leads_prefer_group_sorting_rules() {
        let mut s = CustomStrategy::new("g", "G");
        s.sorting_rules = vec![SortingRule { field: "title".into(), order: SortOrder::Asc }];
        s.group_sorting_rules = vec![SortingRule { field: "title".into(), order: SortOrder::Desc }];
        let ctx = StrategyContext::new(vec![s]);
        let (a, b) = (tab(1, "a"), tab(2, "b"));
        assert_eq!(compare_by(&a, &b, "g", &ctx), Ordering::Less);
        assert_eq!(compare_group_leads(&a, &b, "g", &ctx), Ordering::Greater);
    }
}
