//! Role cache keyed by lookup request
//!
//! The resolver only depends on the [`RoleCache`] contract. [`MemoryRoleCache`]
//! is the in-process store used by default; it never evicts.

use dashmap::DashMap;
use std::sync::Arc;

use crate::types::{RoleList, SearchScope, SessionId};

/// Identifies one cacheable role lookup
///
/// Equality and hashing cover all five fields. The filter is derived from the
/// user identifier when the key is built, so two keys for the same user, base
/// and scope on the same session are always equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    user_id: String,
    session: SessionId,
    search_base: String,
    filter: String,
    scope: SearchScope,
}

impl CacheKey {
    pub fn new(user_id: &str, session: SessionId, search_base: &str, scope: SearchScope) -> Self {
        Self {
            user_id: user_id.to_string(),
            session,
            search_base: search_base.to_string(),
            filter: Self::user_filter(user_id),
            scope,
        }
    }

    /// Filter matching a user by uid
    ///
    /// Filter metacharacters in `user_id` are not escaped.
    pub fn user_filter(user_id: &str) -> String {
        format!("(uid={})", user_id)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn search_base(&self) -> &str {
        &self.search_base
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn scope(&self) -> SearchScope {
        self.scope
    }
}

/// Storage contract used by the resolver
pub trait RoleCache: Send + Sync {
    /// Cached roles for a key, if present
    fn get(&self, key: &CacheKey) -> Option<RoleList>;

    /// Store roles under a key, replacing any previous entry
    fn put(&self, key: CacheKey, roles: RoleList);

    /// Remove an entry, returning what was stored
    fn remove(&self, key: &CacheKey) -> Option<RoleList>;

    /// Drop every entry
    fn clear(&self);
}

/// In-memory role cache
///
/// Thread-safe through `DashMap`; clones share the same storage.
#[derive(Clone, Default)]
pub struct MemoryRoleCache {
    entries: Arc<DashMap<CacheKey, RoleList>>,
    stats: Arc<DashMap<&'static str, usize>>,
}

impl MemoryRoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.get_stat("hits"),
            misses: self.get_stat("misses"),
            entries: self.entries.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn increment_stat(&self, key: &'static str) {
        self.stats
            .entry(key)
            .and_modify(|count| *count += 1)
            .or_insert(1);
    }

    fn get_stat(&self, key: &'static str) -> usize {
        self.stats.get(key).map(|v| *v).unwrap_or(0)
    }
}

impl RoleCache for MemoryRoleCache {
    fn get(&self, key: &CacheKey) -> Option<RoleList> {
        match self.entries.get(key) {
            Some(entry) => {
                self.increment_stat("hits");
                Some(entry.value().clone())
            }
            None => {
                self.increment_stat("misses");
                None
            }
        }
    }

    fn put(&self, key: CacheKey, roles: RoleList) {
        self.entries.insert(key, roles);
    }

    fn remove(&self, key: &CacheKey) -> Option<RoleList> {
        self.entries.remove(key).map(|(_, roles)| roles)
    }

    fn clear(&self) {
        self.entries.clear();
        self.stats.clear();
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
