//! User preferences: strategy order, custom strategies, logging, timeouts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tabtidy_core::{
    CustomStrategy, DEFAULT_SORTING, StrategyContext, parse_strategies, validate_strategies,
};

const DEFAULT_CONFIG: &str = "tabtidy.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Strategy ids applied when no `--strategy` is given.
    pub sorting: Vec<String>,
    pub custom_strategies: Vec<CustomStrategy>,
    pub log_level: Option<String>,
    pub apply_timeout_ms: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sorting: DEFAULT_SORTING.iter().map(|s| s.to_string()).collect(),
            custom_strategies: Vec::new(),
            log_level: None,
            apply_timeout_ms: 10_000,
        }
    }
}

impl Preferences {
    /// Parse by extension: `.json` is JSON, anything else TOML.
    pub fn parse(raw: &str, path: &Path) -> anyhow::Result<Self> {
        let prefs: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(raw).context("invalid JSON preferences")?
        } else {
            toml::from_str(raw).context("invalid TOML preferences")?
        };
        validate_strategies(&prefs.custom_strategies)?;
        Ok(prefs)
    }

    /// Explicit path (must exist), else `./tabtidy.toml` when present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG);
                if !local.exists() {
                    return Ok(Self::default());
                }
                local
            }
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&raw, &path).with_context(|| format!("loading config {}", path.display()))
    }

    pub fn apply_timeout(&self) -> Duration {
        Duration::from_millis(self.apply_timeout_ms)
    }

    /// `TABTIDY_LOG`, then `RUST_LOG`, then `logLevel`, then `info`.
    pub fn log_filter(&self) -> String {
        std::env::var("TABTIDY_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
            .or_else(|| self.log_level.clone())
            .unwrap_or_else(|| "info".to_string())
    }

    /// Config strategies plus those from `extra`, in that order.
    pub fn strategy_context(&self, extra: Option<&Path>) -> anyhow::Result<StrategyContext> {
        let mut strategies = self.custom_strategies.clone();
        if let Some(path) = extra {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading strategies {}", path.display()))?;
            strategies.extend(
                parse_strategies(&raw)
                    .with_context(|| format!("parsing strategies {}", path.display()))?,
            );
        }
        Ok(StrategyContext::new(strategies))
    }

    /// `--strategy` values when given, else `sorting`.
    pub fn strategy_ids(&self, requested: &[String]) -> Vec<String> {
        if requested.is_empty() {
            self.sorting.clone()
        } else {
            requested.to_vec()
        }
    }
}
