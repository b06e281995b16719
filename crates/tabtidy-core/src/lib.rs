//! tabtidy-core: strategy-driven tab classification.
//! Resolves fields, evaluates filter/grouping/sorting/color rules, and turns a
//! flat tab snapshot into labeled, colored buckets. Pure: no IO, no async.

pub mod bucket;
pub mod cache;
pub mod color;
pub mod condition;
pub mod enrichment;
pub mod field;
pub mod grouping;
pub mod registry;
pub mod sorting;
pub mod strategy;
pub mod transform;
pub mod types;

pub use bucket::group_tabs;
pub use cache::EngineCaches;
pub use color::{PALETTE, color_for_key, hash_code, is_palette_color};
pub use condition::{ConditionMatch, RuleCondition, RuleOperator, check_condition, evaluate_condition};
pub use enrichment::requires_context_analysis;
pub use field::{FieldPath, FieldValue, domain_from_url, resolve_field, subdomain_from_url};
pub use grouping::{GroupingResult, grouping_key, grouping_result, strategy_matches};
pub use registry::{
    BuiltinStrategy, StrategyDefinition, is_grouping_strategy, is_sorting_strategy,
    strategy_definitions,
};
pub use sorting::{
    DEFAULT_SORTING, compare_by, compare_by_sorting_rules, compare_group_leads, locale_cmp,
    merge_sort_by, sort_tabs,
};
pub use strategy::{
    ColorSpec, CustomStrategy, GroupingRule, LegacyRule, RuleSource, SortOrder, SortingRule,
    StrategyContext, StrategyError, parse_strategies, validate_strategies,
};
pub use transform::{TransformKind, apply_transform};
pub use types::{Bucket, GROUP_ID_NONE, GroupId, TabId, TabRecord, WindowId, WindowMode};
