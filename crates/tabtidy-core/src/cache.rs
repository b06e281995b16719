//! Memo tables shared by one `StrategyContext`.
//!
//! Each table grows until it reaches its capacity and is then cleared in
//! full. Locks are held only for the lookup or insert, never across user
//! code, so a context stays `Send + Sync`.

use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;

/// Capacity of the per-URL derived-field caches.
pub const URL_CACHE_CAPACITY: usize = 1000;
/// Capacity of the compiled-pattern cache.
pub const REGEX_CACHE_CAPACITY: usize = 256;

#[derive(Debug)]
pub struct BoundedCache<V> {
    capacity: usize,
    entries: Mutex<HashMap<String, V>>,
}

impl<V: Clone> BoundedCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    pub fn insert(&self, key: String, value: V) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            entries.clear();
        }
        entries.insert(key, value);
    }

    /// Return the cached value or compute, store and return it.
    ///
    /// `compute` runs without the lock held.
    pub fn get_or_insert_with(&self, key: &str, compute: impl FnOnce() -> V) -> V {
        if let Some(v) = self.get(key) {
            return v;
        }
        let value = compute();
        self.insert(key.to_string(), value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// All caches the engine consults while classifying.
#[derive(Debug)]
pub struct EngineCaches {
    pub domains: BoundedCache<String>,
    pub subdomains: BoundedCache<String>,
    /// Keyed by `"<i|s>:<pattern>"`; `None` records a pattern that failed to compile.
    pub regexes: BoundedCache<Option<Regex>>,
}

impl Default for EngineCaches {
    fn default() -> Self {
        Self {
            domains: BoundedCache::new(URL_CACHE_CAPACITY),
            subdomains: BoundedCache::new(URL_CACHE_CAPACITY),
            regexes: BoundedCache::new(REGEX_CACHE_CAPACITY),
        }
    }
}

impl EngineCaches {
    /// Compile (or fetch) `pattern`. Invalid patterns yield `None` and are
    /// logged once per cache lifetime.
    pub fn regex(&self, pattern: &str, case_insensitive: bool) -> Option<Regex> {
        let key = format!("{}:{pattern}", if case_insensitive { 'i' } else { 's' });
        self.regexes.get_or_insert_with(&key, || {
            match regex::RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
            {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::debug!(pattern, error = %e, "invalid rule pattern");
                    None
                }
            }
        })
    }

    pub fn clear(&self) {
        self.domains.clear();
        self.subdomains.clear();
        self.regexes.clear();
    }
}

// ─── Tests ────────────────────────────────────────────────────────
