//! Built-in strategy table and its merge with custom strategies.

use serde::Serialize;
use std::fmt;

use crate::strategy::StrategyContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinStrategy {
    Domain,
    DomainFull,
    Topic,
    Context,
    Lineage,
    Pinned,
    Recency,
    Age,
    Url,
    Nesting,
    Title,
}

impl BuiltinStrategy {
    pub const ALL: [Self; 11] = [
        Self::Domain,
        Self::DomainFull,
        Self::Topic,
        Self::Context,
        Self::Lineage,
        Self::Pinned,
        Self::Recency,
        Self::Age,
        Self::Url,
        Self::Nesting,
        Self::Title,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::DomainFull => "domain_full",
            Self::Topic => "topic",
            Self::Context => "context",
            Self::Lineage => "lineage",
            Self::Pinned => "pinned",
            Self::Recency => "recency",
            Self::Age => "age",
            Self::Url => "url",
            Self::Nesting => "nesting",
            Self::Title => "title",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Domain => "Domain",
            Self::DomainFull => "Full Domain",
            Self::Topic => "Topic",
            Self::Context => "Context",
            Self::Lineage => "Lineage",
            Self::Pinned => "Pinned",
            Self::Recency => "Recency",
            Self::Age => "Age",
            Self::Url => "URL",
            Self::Nesting => "Nesting",
            Self::Title => "Title",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.as_str() == id)
    }
}

impl fmt::Display for BuiltinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A strategy as offered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDefinition {
    pub id: String,
    pub label: String,
    pub is_grouping: bool,
    pub is_sorting: bool,
    pub tags: Vec<String>,
    pub auto_run: bool,
    pub is_custom: bool,
}

impl StrategyDefinition {
    fn new(id: String, label: String, is_grouping: bool, is_sorting: bool) -> Self {
        let mut tags = Vec::new();
        if is_grouping {
            tags.push("group".to_string());
        }
        if is_sorting {
            tags.push("sort".to_string());
        }
        Self {
            id,
            label,
            is_grouping,
            is_sorting,
            tags,
            auto_run: false,
            is_custom: false,
        }
    }
}

/// Built-ins followed by custom strategies. A custom id equal to a built-in
/// replaces it in place; duplicate custom ids keep the first.
pub fn strategy_definitions(ctx: &StrategyContext) -> Vec<StrategyDefinition> {
    let mut defs: Vec<StrategyDefinition> = BuiltinStrategy::ALL
        .iter()
        .map(|b| StrategyDefinition::new(b.as_str().into(), b.label().into(), true, true))
        .collect();
    let builtin_count = defs.len();

    for custom in ctx.custom_strategies() {
        let mut def = StrategyDefinition::new(
            custom.id.clone(),
            custom.label.clone(),
            custom.is_grouping(),
            custom.is_sorting(),
        );
        def.auto_run = custom.auto_run;
        def.is_custom = true;

        match defs.iter().position(|d| d.id == custom.id) {
            Some(i) if i < builtin_count => defs[i] = def,
            Some(_) => {}
            None => defs.push(def),
        }
    }
    defs
}

pub fn is_grouping_strategy(id: &str, ctx: &StrategyContext) -> bool {
    match ctx.custom(id) {
        Some(custom) => custom.is_grouping(),
        None => BuiltinStrategy::from_id(id).is_some(),
    }
}

pub fn is_sorting_strategy(id: &str, ctx: &StrategyContext) -> bool {
    match ctx.custom(id) {
        Some(custom) => custom.is_sorting(),
        None => BuiltinStrategy::from_id(id).is_some(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────
