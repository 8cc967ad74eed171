//! # Extraction Cache
//!
//! Remembers the outcome of every lookup by symbol name, so a name is
//! resolved and extracted at most once per cache.
//!
//! Both outcomes are cached: a found definition and a definitive "not found".
//! Lookups that could not run at all (the debugger failed to start) are not
//! cached and will be attempted again.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use symsrc_core::cache::{CacheEntry, ExtractionCache};
//!
//! let cache = Arc::new(ExtractionCache::new());
//! cache.insert("vanished", CacheEntry::NotFound);
//!
//! assert!(cache.contains("vanished"));
//! assert_eq!(cache.get("vanished").and_then(CacheEntry::into_found), None);
//! ```
//!
//! The cache is shared between batch workers through an `Arc`. Concurrent
//! lookups of the same name may both compute it; the last insert wins and both
//! values are equivalent.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::ExtractionResult;

/// Cached outcome of one lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry
{
    Found(Arc<ExtractionResult>),
    NotFound,
}

impl CacheEntry
{
    /// The cached definition, if there was one.
    #[must_use]
    pub fn into_found(self) -> Option<Arc<ExtractionResult>>
    {
        match self {
            Self::Found(result) => Some(result),
            Self::NotFound => None,
        }
    }
}

/// Thread-safe map from symbol name to [`CacheEntry`].
#[derive(Debug, Default)]
pub struct ExtractionCache
{
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ExtractionCache
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, symbol: &str) -> Option<CacheEntry>
    {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .cloned()
    }

    /// Store `entry`, replacing any earlier outcome for `symbol`.
    pub fn insert(&self, symbol: impl Into<String>, entry: CacheEntry)
    {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol.into(), entry);
    }

    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool
    {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(symbol)
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    pub fn clear(&self)
    {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
