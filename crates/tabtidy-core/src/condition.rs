//! Single-condition evaluation for filters and legacy rules.

use serde::{Deserialize, Serialize};

use crate::field::{FieldPath, FieldValue};
use crate::strategy::{StrategyContext, string_or_scalar};
use crate::types::TabRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleOperator {
    Contains,
    DoesNotContain,
    Equals,
    StartsWith,
    EndsWith,
    Exists,
    DoesNotExist,
    IsNull,
    IsNotNull,
    /// Case-insensitive regex; yields captures.
    Matches,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub field: String,
    pub operator: RuleOperator,
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub value: String,
}

impl RuleCondition {
    pub fn new(field: impl Into<String>, operator: RuleOperator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// Outcome of one condition. `captures` is only populated by `Matches` and
/// holds groups 1..n; a group that did not participate is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionMatch {
    pub matched: bool,
    pub captures: Vec<Option<String>>,
}

impl ConditionMatch {
    fn bool(matched: bool) -> Self {
        Self {
            matched,
            captures: Vec::new(),
        }
    }
}

pub fn check_condition(cond: &RuleCondition, tab: &TabRecord, ctx: &StrategyContext) -> bool {
    evaluate_condition(cond, tab, ctx).matched
}

pub fn evaluate_condition(
    cond: &RuleCondition,
    tab: &TabRecord,
    ctx: &StrategyContext,
) -> ConditionMatch {
    let value = FieldPath::parse(&cond.field).resolve(tab, ctx);
    evaluate_operator(cond.operator, &value, &cond.value, ctx)
}

pub fn evaluate_operator(
    op: RuleOperator,
    value: &FieldValue,
    expected: &str,
    ctx: &StrategyContext,
) -> ConditionMatch {
    match op {
        RuleOperator::Exists => return ConditionMatch::bool(!value.is_undefined()),
        RuleOperator::DoesNotExist => return ConditionMatch::bool(value.is_undefined()),
        RuleOperator::IsNull => return ConditionMatch::bool(value.is_null()),
        RuleOperator::IsNotNull => return ConditionMatch::bool(!value.is_null()),
        RuleOperator::Matches => return regex_match(&value.to_text(), expected, ctx),
        _ => {}
    }

    let actual = value.to_text().to_lowercase();
    let expected = expected.to_lowercase();
    let matched = match op {
        RuleOperator::Contains => actual.contains(&expected),
        RuleOperator::DoesNotContain => !actual.contains(&expected),
        RuleOperator::Equals => actual == expected,
        RuleOperator::StartsWith => actual.starts_with(&expected),
        RuleOperator::EndsWith => actual.ends_with(&expected),
        _ => false,
    };
    ConditionMatch::bool(matched)
}

fn regex_match(text: &str, pattern: &str, ctx: &StrategyContext) -> ConditionMatch {
    let Some(re) = ctx.caches().regex(pattern, true) else {
        return ConditionMatch::default();
    };
    match re.captures(text) {
        Some(caps) => ConditionMatch {
            matched: true,
            captures: caps
                .iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()))
                .collect(),
        },
        None => ConditionMatch::default(),
    }
}

/// Replace `$1`..`$n` in `template` with the matching capture (missing
/// groups become empty). Higher indices go first so `$1` never eats `$12`.
pub fn substitute_captures(template: &str, captures: &[Option<String>]) -> String {
    let mut out = template.to_string();
    for (i, cap) in captures.iter().enumerate().rev() {
        let token = format!("${}", i + 1);
        out = out.replace(&token, cap.as_deref().unwrap_or(""));
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────
