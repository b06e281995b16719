//! Pure string transforms applied to grouping and color values.

use serde::{Deserialize, Serialize};

use crate::field::domain_from_url;
use crate::strategy::StrategyContext;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformKind {
    #[default]
    None,
    StripTld,
    Lowercase,
    Uppercase,
    FirstChar,
    Domain,
    Hostname,
    /// First match; concatenation of all capture groups.
    Regex,
    /// Global replace with `$n`, `$&`, `$$` tokens.
    RegexReplace,
}

const STRIPPED_TLDS: [&str; 6] = ["com", "org", "gov", "net", "edu", "io"];

pub fn strip_tld(value: &str) -> String {
    for tld in STRIPPED_TLDS {
        let n = value.len();
        let suffix_len = tld.len() + 1;
        if n >= suffix_len && value.is_char_boundary(n - suffix_len) {
            let (head, tail) = value.split_at(n - suffix_len);
            if tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(tld) {
                return head.to_string();
            }
        }
    }
    value.to_string()
}

pub fn apply_transform(
    value: &str,
    kind: TransformKind,
    pattern: Option<&str>,
    replacement: Option<&str>,
    ctx: &StrategyContext,
) -> String {
    match kind {
        TransformKind::None => value.to_string(),
        TransformKind::StripTld => strip_tld(value),
        TransformKind::Lowercase => value.to_lowercase(),
        TransformKind::Uppercase => value.to_uppercase(),
        TransformKind::FirstChar => value.chars().next().map(String::from).unwrap_or_default(),
        TransformKind::Domain => domain_from_url(value),
        TransformKind::Hostname => match url::Url::parse(value) {
            Ok(u) => u.host_str().unwrap_or("").to_string(),
            Err(_) => value.to_string(),
        },
        TransformKind::Regex => extract(value, pattern, ctx),
        TransformKind::RegexReplace => replace(value, pattern, replacement.unwrap_or(""), ctx),
    }
}

fn extract(value: &str, pattern: Option<&str>, ctx: &StrategyContext) -> String {
    let Some(re) = pattern.and_then(|p| ctx.caches().regex(p, false)) else {
        return String::new();
    };
    let Some(caps) = re.captures(value) else {
        return String::new();
    };
    caps.iter()
        .skip(1)
        .map(|m| m.map_or("", |m| m.as_str()))
        .collect()
}

fn replace(value: &str, pattern: Option<&str>, replacement: &str, ctx: &StrategyContext) -> String {
    let Some(re) = pattern.and_then(|p| ctx.caches().regex(p, false)) else {
        return value.to_string();
    };
    let template = expand_replacement(replacement, re.captures_len() - 1);
    re.replace_all(value, template.as_str()).into_owned()
}

/// Rewrite `$`-tokens into the `regex` crate's `${..}` form.
///
/// `$$` → literal `$`, `$&` → whole match, `$n`/`$nn` → group n when it
/// exists (two digits preferred), `$<name>` → named group. Anything else,
/// including `$0` and out-of-range groups, stays literal.
fn expand_replacement(replacement: &str, groups: usize) -> String {
    let chars: Vec<char> = replacement.chars().collect();
    let mut out = String::with_capacity(replacement.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '$' || i + 1 >= chars.len() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }
        let next = chars[i + 1];
        match next {
            '$' => {
                out.push_str("$$");
                i += 2;
            }
            '&' => {
                out.push_str("${0}");
                i += 2;
            }
            '<' => {
                let close = chars[i + 2..].iter().position(|&c| c == '>');
                match close {
                    Some(len) => {
                        let name: String = chars[i + 2..i + 2 + len].iter().collect();
                        out.push_str(&format!("${{{name}}}"));
                        i += 3 + len;
                    }
                    None => {
                        out.push_str("$$");
                        i += 1;
                    }
                }
            }
            d if d.is_ascii_digit() => {
                let one = d.to_digit(10).unwrap_or(0) as usize;
                let two = chars
                    .get(i + 2)
                    .and_then(|c| c.to_digit(10))
                    .map(|d2| one * 10 + d2 as usize);
                if let Some(n) = two.filter(|&n| n >= 1 && n <= groups) {
                    out.push_str(&format!("${{{n}}}"));
                    i += 3;
                } else if one >= 1 && one <= groups {
                    out.push_str(&format!("${{{one}}}"));
                    i += 2;
                } else {
                    out.push_str("$$");
                    i += 1;
                }
            }
            _ => {
                out.push_str("$$");
                i += 1;
            }
        }
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '$' {
        out.push_str("$$");
    } else {
        out.push(c);
    }
}

// ─── Tests ────────────────────────────────────────────────────────
