//! Bucket color resolution.

use crate::strategy::{ColorSpec, GroupingRule, RuleSource, StrategyContext};
use crate::field::FieldPath;
use crate::transform::{TransformKind, apply_transform};
use crate::types::TabRecord;

/// Colors the host accepts for tab groups.
pub const PALETTE: [&str; 9] = [
    "grey", "blue", "red", "yellow", "green", "pink", "purple", "cyan", "orange",
];

pub fn is_palette_color(color: &str) -> bool {
    PALETTE.contains(&color)
}

/// 32-bit polynomial string hash over UTF-16 code units (`h * 31 + c`,
/// wrapping), so keys hash the same as in the browser UI.
pub fn hash_code(value: &str) -> i32 {
    value.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(i32::from(unit))
    })
}

pub fn color_for_key(key: &str, offset: usize) -> &'static str {
    let h = i64::from(hash_code(key)).unsigned_abs() as usize;
    PALETTE[(h + offset) % PALETTE.len()]
}

/// Inputs for one bucket's color.
pub struct ColorRequest<'a> {
    /// Applied strategy ids in application order.
    pub strategies: &'a [&'a str],
    pub value_key: &'a str,
    pub bucket_key: &'a str,
    /// Creation order of the bucket within this pass.
    pub creation_index: usize,
    pub tabs: &'a [TabRecord],
}

/// First non-random color rule across the applied custom strategies wins;
/// otherwise the bucket key hashed with its creation index.
pub fn resolve_bucket_color(req: &ColorRequest<'_>, ctx: &StrategyContext) -> String {
    for id in req.strategies {
        let Some(custom) = ctx.custom(id) else {
            continue;
        };
        for rule in &custom.grouping_rules {
            match &rule.color {
                None | Some(ColorSpec::Random) => {}
                Some(ColorSpec::Match) => return color_for_key(req.value_key, 0).to_string(),
                Some(ColorSpec::Field) => {
                    if let Some(value) = smallest_color_value(rule, req.tabs, ctx) {
                        return color_for_key(&value, 0).to_string();
                    }
                }
                Some(ColorSpec::Named(name)) => return name.clone(),
            }
        }
    }
    color_for_key(req.bucket_key, req.creation_index).to_string()
}

/// Lexicographically smallest non-empty color value among the tabs, which
/// makes the color independent of tab order.
fn smallest_color_value(rule: &GroupingRule, tabs: &[TabRecord], ctx: &StrategyContext) -> Option<String> {
    let field = match (&rule.color_field, rule.source) {
        (Some(f), _) if !f.is_empty() => f.as_str(),
        (_, RuleSource::Field) => rule.value.as_str(),
        _ => return None,
    };
    let path = FieldPath::parse(field);
    tabs.iter()
        .map(|tab| {
            let raw = path.resolve(tab, ctx).to_text();
            match rule.color_transform {
                Some(kind) if kind != TransformKind::None && !raw.is_empty() => apply_transform(
                    &raw,
                    kind,
                    rule.color_transform_pattern.as_deref(),
                    None,
                    ctx,
                ),
                _ => raw,
            }
        })
        .filter(|v| !v.is_empty())
        .min()
}

// ─── Tests ────────────────────────────────────────────────────────
