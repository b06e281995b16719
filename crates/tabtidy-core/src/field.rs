//! Field resolution: well-known tab attributes, URL-derived values, and
//! dotted-path lookup into enrichment data.

use std::cmp::Ordering;

use serde_json::Value;

use crate::strategy::StrategyContext;
use crate::types::TabRecord;

// ─── Values ───────────────────────────────────────────────────────

/// A resolved field value. `Undefined` (no such field) and `Null` (an
/// explicit JSON null) are kept apart for the existence operators.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Object or array from enrichment data.
    Json(Value),
}

impl FieldValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Non-empty text payload, if this is text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    /// String form used by string operators, transforms and keys.
    /// Undefined and null render as "".
    pub fn to_text(&self) -> String {
        match self {
            Self::Undefined | Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::Text(s) => s.clone(),
            Self::Json(v) => v.to_string(),
        }
    }

    fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Self::Undefined, Self::Number),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Json(other.clone()),
        }
    }

    fn as_number(&self) -> f64 {
        match self {
            Self::Undefined | Self::Json(_) => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Text(s) => {
                let t = s.trim();
                if t.is_empty() { 0.0 } else { t.parse().unwrap_or(f64::NAN) }
            }
        }
    }

    /// Relational comparison with loose coercion: two strings compare
    /// lexically, anything else numerically. Values that cannot be ordered
    /// (undefined, NaN) compare equal.
    pub fn loose_cmp(&self, other: &Self) -> Ordering {
        if let (Self::Text(a), Self::Text(b)) = (self, other) {
            return a.cmp(b);
        }
        self.as_number()
            .partial_cmp(&other.as_number())
            .unwrap_or(Ordering::Equal)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

// ─── Paths ────────────────────────────────────────────────────────

/// Parsed field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Id,
    Index,
    WindowId,
    GroupId,
    Title,
    Url,
    Status,
    Active,
    Selected,
    Pinned,
    OpenerTabId,
    LastAccessed,
    FavIconUrl,
    Context,
    /// `contextData.genre`
    Genre,
    /// `contextData.siteName`
    SiteName,
    Domain,
    Subdomain,
    /// Dotted path: top-level attribute, then into `contextData`.
    Path(Vec<String>),
}

impl FieldPath {
    pub fn parse(name: &str) -> Self {
        match name {
            "id" => Self::Id,
            "index" => Self::Index,
            "windowId" => Self::WindowId,
            "groupId" => Self::GroupId,
            "title" => Self::Title,
            "url" => Self::Url,
            "status" => Self::Status,
            "active" => Self::Active,
            "selected" => Self::Selected,
            "pinned" => Self::Pinned,
            "openerTabId" => Self::OpenerTabId,
            "lastAccessed" => Self::LastAccessed,
            "favIconUrl" => Self::FavIconUrl,
            "context" => Self::Context,
            "genre" => Self::Genre,
            "siteName" => Self::SiteName,
            "domain" => Self::Domain,
            "subdomain" => Self::Subdomain,
            other => Self::Path(other.split('.').map(str::to_string).collect()),
        }
    }

    /// True for fields only populated by page enrichment.
    pub fn reads_context(&self) -> bool {
        match self {
            Self::Context | Self::Genre | Self::SiteName => true,
            Self::Path(segs) => segs.first().is_some_and(|h| h == "contextData" || h == "context"),
            _ => false,
        }
    }

    pub fn resolve(&self, tab: &TabRecord, ctx: &StrategyContext) -> FieldValue {
        match self {
            Self::Domain => FieldValue::Text(domain_cached(&tab.url, ctx)),
            Self::Subdomain => FieldValue::Text(subdomain_cached(&tab.url, ctx)),
            Self::Genre => context_data_path(tab, &["genre"]),
            Self::SiteName => context_data_path(tab, &["siteName"]),
            Self::Path(segs) => resolve_path(tab, segs),
            attr => attribute(tab, attr),
        }
    }
}

/// Resolve a field by name.
pub fn resolve_field(tab: &TabRecord, name: &str, ctx: &StrategyContext) -> FieldValue {
    FieldPath::parse(name).resolve(tab, ctx)
}

fn opt_num(v: Option<f64>) -> FieldValue {
    v.map_or(FieldValue::Undefined, FieldValue::Number)
}

fn opt_text(v: Option<&String>) -> FieldValue {
    v.map_or(FieldValue::Undefined, |s| FieldValue::Text(s.clone()))
}

fn attribute(tab: &TabRecord, path: &FieldPath) -> FieldValue {
    match path {
        FieldPath::Id => FieldValue::Number(tab.id as f64),
        FieldPath::Index => FieldValue::Number(tab.index as f64),
        FieldPath::WindowId => FieldValue::Number(tab.window_id as f64),
        FieldPath::GroupId => opt_num(tab.group_id.map(|g| g as f64)),
        FieldPath::Title => FieldValue::Text(tab.title.clone()),
        FieldPath::Url => FieldValue::Text(tab.url.clone()),
        FieldPath::Status => opt_text(tab.status.as_ref()),
        FieldPath::Active => FieldValue::Bool(tab.active),
        FieldPath::Selected => tab.selected.map_or(FieldValue::Undefined, FieldValue::Bool),
        FieldPath::Pinned => FieldValue::Bool(tab.pinned),
        FieldPath::OpenerTabId => opt_num(tab.opener_tab_id.map(|g| g as f64)),
        FieldPath::LastAccessed => opt_num(tab.last_accessed),
        FieldPath::FavIconUrl => opt_text(tab.fav_icon_url.as_ref()),
        FieldPath::Context => opt_text(tab.context.as_ref()),
        _ => FieldValue::Undefined,
    }
}

fn resolve_path(tab: &TabRecord, segs: &[String]) -> FieldValue {
    let Some((head, rest)) = segs.split_first() else {
        return FieldValue::Undefined;
    };
    if head == "contextData" {
        let rest: Vec<&str> = rest.iter().map(String::as_str).collect();
        return context_data_path(tab, &rest);
    }
    let top = attribute(tab, &FieldPath::parse(head));
    match (top, rest.is_empty()) {
        (v, true) => v,
        // Scalars have no members.
        (_, false) => FieldValue::Undefined,
    }
}

fn context_data_path(tab: &TabRecord, segs: &[&str]) -> FieldValue {
    let Some(mut cur) = tab.context_data.as_ref() else {
        return FieldValue::Undefined;
    };
    for seg in segs {
        let next = match cur {
            Value::Object(map) => map.get(*seg),
            Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => cur = v,
            None => return FieldValue::Undefined,
        }
    }
    FieldValue::from_json(cur)
}

// ─── URL-derived ──────────────────────────────────────────────────

/// Hostname without a leading `www.`; `"unknown"` when the URL does not
/// parse.
pub fn domain_from_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("");
            host.strip_prefix("www.").unwrap_or(host).to_string()
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "failed to parse domain");
            "unknown".to_string()
        }
    }
}

/// Every hostname label left of the registrable pair, or `""`. A leading
/// `www.` is dropped first.
pub fn subdomain_from_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url) else {
        return String::new();
    };
    let Some(host) = parsed.host_str() else {
        return String::new();
    };
    let host = host.strip_prefix("www.").unwrap_or(host);
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() > 2 {
        labels[..labels.len() - 2].join(".")
    } else {
        String::new()
    }
}

pub fn domain_cached(url: &str, ctx: &StrategyContext) -> String {
    ctx.caches()
        .domains
        .get_or_insert_with(url, || domain_from_url(url))
}

pub fn subdomain_cached(url: &str, ctx: &StrategyContext) -> String {
    ctx.caches()
        .subdomains
        .get_or_insert_with(url, || subdomain_from_url(url))
}

// ─── Tests ────────────────────────────────────────────────────────
