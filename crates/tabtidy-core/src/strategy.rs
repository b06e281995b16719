//! User-authored strategy definitions and the context they are installed into.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::cache::EngineCaches;
use crate::condition::{RuleCondition, RuleOperator};
use crate::transform::TransformKind;
use crate::types::WindowMode;

// ─── Errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("failed to parse strategies: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid strategy {id:?}: {reason}")]
    Invalid { id: String, reason: String },
}

// ─── Rule Parts ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    /// `value` names a field to resolve on the tab.
    Field,
    /// `value` is used literally.
    Fixed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// How a grouping rule colors its bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorSpec {
    Random,
    /// Hash of the bucket's composite value key.
    Match,
    /// Hash of a (transformed) field value; see `GroupingRule::color_field`.
    Field,
    /// A literal color name.
    Named(String),
}

impl From<String> for ColorSpec {
    fn from(s: String) -> Self {
        match s.as_str() {
            "random" | "" => Self::Random,
            "match" => Self::Match,
            "field" => Self::Field,
            _ => Self::Named(s),
        }
    }
}

impl From<ColorSpec> for String {
    fn from(c: ColorSpec) -> Self {
        match c {
            ColorSpec::Random => "random".into(),
            ColorSpec::Match => "match".into(),
            ColorSpec::Field => "field".into(),
            ColorSpec::Named(s) => s,
        }
    }
}

/// One component of a composite grouping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingRule {
    pub source: RuleSource,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_replacement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_transform: Option<TransformKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_transform_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_mode: Option<WindowMode>,
}

impl GroupingRule {
    pub fn field(name: impl Into<String>) -> Self {
        Self::new(RuleSource::Field, name)
    }

    pub fn fixed(value: impl Into<String>) -> Self {
        Self::new(RuleSource::Fixed, value)
    }

    fn new(source: RuleSource, value: impl Into<String>) -> Self {
        Self {
            source,
            value: value.into(),
            transform: None,
            transform_pattern: None,
            transform_replacement: None,
            color: None,
            color_field: None,
            color_transform: None,
            color_transform_pattern: None,
            window_mode: None,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, kind: TransformKind, pattern: Option<&str>) -> Self {
        self.transform = Some(kind);
        self.transform_pattern = pattern.map(str::to_string);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: ColorSpec) -> Self {
        self.color = Some(color);
        self
    }

    #[must_use]
    pub fn with_window_mode(mut self, mode: WindowMode) -> Self {
        self.window_mode = Some(mode);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingRule {
    pub field: String,
    #[serde(default)]
    pub order: SortOrder,
}

/// Pre-`groupingRules` rule shape: first match wins, `result` may use `$n`
/// back-references into a `matches` capture list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRule {
    pub field: String,
    pub operator: RuleOperator,
    #[serde(default, deserialize_with = "string_or_scalar")]
    pub value: String,
    #[serde(default)]
    pub result: String,
}

impl LegacyRule {
    pub fn condition(&self) -> RuleCondition {
        RuleCondition {
            field: self.field.clone(),
            operator: self.operator,
            value: self.value.clone(),
        }
    }
}

// ─── Custom Strategy ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomStrategy {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<RuleCondition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_groups: Vec<Vec<RuleCondition>>,
    #[serde(default)]
    pub grouping_rules: Vec<GroupingRule>,
    #[serde(default)]
    pub sorting_rules: Vec<SortingRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_sorting_rules: Vec<SortingRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<LegacyRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default)]
    pub sort_groups: bool,
    #[serde(default)]
    pub auto_run: bool,
}

impl CustomStrategy {
    pub const DEFAULT_FALLBACK: &'static str = "Misc";

    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            ..Default::default()
        }
    }

    pub fn is_grouping(&self) -> bool {
        !self.grouping_rules.is_empty() || !self.rules.is_empty()
    }

    pub fn is_sorting(&self) -> bool {
        !self.sorting_rules.is_empty() || !self.rules.is_empty()
    }

    /// The fallback key; empty or missing means `"Misc"`.
    pub fn fallback_key(&self) -> &str {
        match self.fallback.as_deref() {
            Some(f) if !f.is_empty() => f,
            _ => Self::DEFAULT_FALLBACK,
        }
    }

    /// Conditions referenced anywhere in this strategy's membership test.
    pub fn all_conditions(&self) -> impl Iterator<Item = &RuleCondition> {
        self.filters
            .iter()
            .chain(self.filter_groups.iter().flatten())
    }
}

/// Parse a JSON array of custom strategies.
pub fn parse_strategies(json: &str) -> Result<Vec<CustomStrategy>, StrategyError> {
    let strategies: Vec<CustomStrategy> = serde_json::from_str(json)?;
    validate_strategies(&strategies)?;
    Ok(strategies)
}

pub fn validate_strategies(strategies: &[CustomStrategy]) -> Result<(), StrategyError> {
    for s in strategies {
        if s.id.trim().is_empty() {
            return Err(StrategyError::Invalid {
                id: s.id.clone(),
                reason: "id must not be empty".into(),
            });
        }
        if let Some(rule) = s
            .grouping_rules
            .iter()
            .find(|r| r.source == RuleSource::Field && r.value.trim().is_empty())
        {
            return Err(StrategyError::Invalid {
                id: s.id.clone(),
                reason: format!("grouping rule {:?} names no field", rule.value),
            });
        }
    }
    Ok(())
}

/// Condition values are stored as strings; authors sometimes write
/// `true` or `3` unquoted.
pub(crate) fn string_or_scalar<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(match v {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

// ─── Context ──────────────────────────────────────────────────────

/// Everything classification reads besides the tab itself: the installed
/// custom strategies, the memo caches, and the clock used for age buckets.
pub struct StrategyContext {
    strategies: Vec<CustomStrategy>,
    caches: EngineCaches,
    now: DateTime<Utc>,
}

impl fmt::Debug for StrategyContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyContext")
            .field("strategies", &self.strategies.len())
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl Default for StrategyContext {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl StrategyContext {
    pub fn new(strategies: Vec<CustomStrategy>) -> Self {
        Self {
            strategies,
            caches: EngineCaches::default(),
            now: Utc::now(),
        }
    }

    /// Pin the clock (tests, replays).
    #[must_use]
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Replace the installed strategies. Caches survive; they are keyed by
    /// URL and pattern, not by strategy.
    pub fn install(&mut self, strategies: Vec<CustomStrategy>) {
        self.strategies = strategies;
    }

    /// First custom strategy with this id.
    pub fn custom(&self, id: &str) -> Option<&CustomStrategy> {
        self.strategies.iter().find(|s| s.id == id)
    }

    pub fn custom_strategies(&self) -> &[CustomStrategy] {
        &self.strategies
    }

    pub fn caches(&self) -> &EngineCaches {
        &self.caches
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn now_millis(&self) -> f64 {
        self.now.timestamp_millis() as f64
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
      {
        "id": "work",
        "label": "Work",
        "filterGroups": [
          [{"field": "pinned", "operator": "equals", "value": true}],
          [{"field": "domain", "operator": "contains", "value": "mail"}]
        ],
        "groupingRules": [
          {"source": "field", "value": "domain", "transform": "stripTld", "color": "field",
           "colorField": "domain", "windowMode": "compound"},
          {"source": "fixed", "value": "Inbox", "color": "blue"}
        ],
        "sortingRules": [{"field": "title", "order": "desc"}],
        "fallback": "",
        "autoRun": true
      },
      {
        "id": "legacy",
        "label": "Legacy",
        "groupingRules": [],
        "sortingRules": [],
        "rules": [{"field": "url", "operator": "matches", "value": "x", "result": "$1"}]
      }
    ]"#;

    #[test]
    fn parses_camel_case_strategies() {
        let parsed = parse_strategies(SAMPLE).expect("parse");
        assert_eq!(parsed.len(), 2);

        let work = &parsed[0];
        assert_eq!(work.filter_groups.len(), 2);
        assert_eq!(work.filter_groups[0][0].value, "true");
        assert_eq!(work.grouping_rules[0].transform, Some(TransformKind::StripTld));
        assert_eq!(work.grouping_rules[0].color, Some(ColorSpec::Field));
        assert_eq!(work.grouping_rules[0].window_mode, Some(WindowMode::Compound));
        assert_eq!(
            work.grouping_rules[1].color,
            Some(ColorSpec::Named("blue".into()))
        );
        assert_eq!(work.sorting_rules[0].order, SortOrder::Desc);
        assert_eq!(work.fallback_key(), "Misc");
        assert!(work.auto_run);
        assert!(work.is_grouping() && work.is_sorting());

        let legacy = &parsed[1];
        assert!(legacy.is_grouping());
        assert!(legacy.is_sorting());
        assert_eq!(legacy.rules[0].operator, RuleOperator::Matches);
    }

    #[test]
    fn rejects_unknown_operator() {
        let json = r#"[{"id":"x","filters":[{"field":"url","operator":"fuzzy","value":"a"}]}]"#;
        assert!(matches!(parse_strategies(json), Err(StrategyError::Parse(_))));
    }

    #[test]
    fn rejects_unknown_transform_and_window_mode() {
        let bad_transform =
            r#"[{"id":"x","groupingRules":[{"source":"field","value":"url","transform":"reverse"}]}]"#;
        assert!(parse_strategies(bad_transform).is_err());

        let bad_mode =
            r#"[{"id":"x","groupingRules":[{"source":"fixed","value":"a","windowMode":"tiled"}]}]"#;
        assert!(parse_strategies(bad_mode).is_err());
    }

    #[test]
    fn rejects_empty_id() {
        let json = r#"[{"id":"  ","label":"Nameless"}]"#;
        assert!(matches!(
            parse_strategies(json),
            Err(StrategyError::Invalid { .. })
        ));
    }

    #[test]
    fn color_spec_round_trips_through_strings() {
        for (raw, spec) in [
            ("random", ColorSpec::Random),
            ("match", ColorSpec::Match),
            ("field", ColorSpec::Field),
            ("purple", ColorSpec::Named("purple".into())),
        ] {
            assert_eq!(ColorSpec::from(raw.to_string()), spec);
            assert_eq!(String::from(spec), raw);
        }
    }

    #[test]
    fn context_lookup_is_first_by_id() {
        let mut a = CustomStrategy::new("dup", "first");
        a.fallback = Some("A".into());
        let mut b = CustomStrategy::new("dup", "second");
        b.fallback = Some("B".into());
        let ctx = StrategyContext::new(vec![a, b]);
        assert_eq!(ctx.custom("dup").map(|s| s.label.as_str()), Some("first"));
        assert!(ctx.custom("missing").is_none());
    }
}
