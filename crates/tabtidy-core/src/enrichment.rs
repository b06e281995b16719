//! Decide whether a grouping pass needs page enrichment first.

use crate::field::FieldPath;
use crate::registry::BuiltinStrategy;
use crate::strategy::{RuleSource, StrategyContext};

fn is_context_field(name: &str) -> bool {
    FieldPath::parse(name).reads_context()
}

/// True when `context` is requested or any requested custom strategy reads
/// an enrichment field in a rule or condition.
pub fn requires_context_analysis<S: AsRef<str>>(strategy_ids: &[S], ctx: &StrategyContext) -> bool {
    strategy_ids.iter().map(AsRef::as_ref).any(|id| {
        let Some(custom) = ctx.custom(id) else {
            return id == BuiltinStrategy::Context.as_str();
        };
        custom
            .grouping_rules
            .iter()
            .any(|r| r.source == RuleSource::Field && is_context_field(&r.value))
            || custom
                .sorting_rules
                .iter()
                .chain(&custom.group_sorting_rules)
                .any(|r| is_context_field(&r.field))
            || custom.all_conditions().any(|c| is_context_field(&c.field))
            || custom.rules.iter().any(|r| is_context_field(&r.field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{RuleCondition, RuleOperator};
    use crate::strategy::{CustomStrategy, GroupingRule, SortOrder, SortingRule};

    #[test]
    fn builtin_context_needs_enrichment() {
        let ctx = StrategyContext::default();
        assert!(requires_context_analysis(&["domain", "context"], &ctx));
        assert!(!requires_context_analysis(&["domain", "pinned"], &ctx));
    }

    #[test]
    fn custom_readers_are_detected() {
        let mut by_rule = CustomStrategy::new("a", "A");
        by_rule.grouping_rules = vec![GroupingRule::field("genre")];
        let mut by_sort = CustomStrategy::new("b", "B");
        by_sort.sorting_rules = vec![SortingRule {
            field: "contextData.youtube.channelName".into(),
            order: SortOrder::Asc,
        }];
        let mut by_filter_group = CustomStrategy::new("c", "C");
        by_filter_group.filter_groups = vec![vec![RuleCondition::new(
            "siteName",
            RuleOperator::Exists,
            "",
        )]];
        let mut plain = CustomStrategy::new("d", "D");
        plain.grouping_rules = vec![GroupingRule::field("domain"), GroupingRule::fixed("genre")];

        let ctx = StrategyContext::new(vec![by_rule, by_sort, by_filter_group, plain]);
        assert!(requires_context_analysis(&["a"], &ctx));
        assert!(requires_context_analysis(&["b"], &ctx));
        assert!(requires_context_analysis(&["c"], &ctx));
        assert!(!requires_context_analysis(&["d"], &ctx));
    }

    #[test]
    fn custom_context_id_replaces_builtin_check() {
        let mut s = CustomStrategy::new("context", "Mine");
        s.grouping_rules = vec![GroupingRule::field("title")];
        let ctx = StrategyContext::new(vec![s]);
        assert!(!requires_context_analysis(&["context"], &ctx));
    }
}
