//! Role resolver with cache-first lookup and directory fallback
//!
//! This module provides the `RoleResolver`, which maps a user identifier to
//! the common names of the groups listed in the user's group-membership
//! attribute:
//!
//! 1. Look the user up in the role cache
//! 2. On a miss (or an empty cached list) search the directory for `(uid=<user>)`
//! 3. Extract group names from the returned entry
//! 4. Optionally write the result back into the cache
//!
//! Directory failures never reach callers of [`RoleProvider::user_roles`];
//! they get an empty list instead. [`RoleResolver::lookup_roles`] keeps the
//! failure visible for callers that need to tell the two apart.
//!
//! # Example
//!
//! ```rust,no_run
//! use ldap_roles::{LdapDirectory, RoleProvider, RoleProviderConfig, RoleResolver};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RoleProviderConfig::new("ldap://ldap.example.com:389", "dc=example,dc=com");
//! let directory = LdapDirectory::connect(&config.directory).await?;
//! let resolver = RoleResolver::from_config(directory, &config);
//!
//! let roles = resolver.user_roles("alice").await;
//! println!("alice has roles {:?}", roles);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, MemoryRoleCache, RoleCache};
use crate::config::RoleProviderConfig;
use crate::directory::DirectorySearch;
use crate::error::{Result, RoleError};
use crate::extract::GroupExtractor;
use crate::types::{RoleList, SearchRequest, SearchScope};

/// Role lookup contract consumed by the authorization layer
#[async_trait]
pub trait RoleProvider: Send + Sync {
    /// Roles of a user; empty when the user has none or the directory is
    /// unavailable
    async fn user_roles(&self, user_id: &str) -> RoleList;

    /// Users belonging to a group
    async fn users_in_group(&self, group: &str) -> Result<Vec<String>>;

    /// Drop cached entries mentioning a role
    async fn flush_role_cache(&self, role: &str) -> Result<()>;

    /// Drop the cached entry of a user
    async fn flush_user_cache(&self, user_id: &str) -> Result<()>;
}

/// Outcome of a role lookup
#[derive(Debug)]
pub enum RoleLookup {
    /// Served from a non-empty cache entry
    Cached(RoleList),
    /// Resolved by searching the directory
    Directory(RoleList),
    /// Directory search or extraction failed
    Failed(RoleError),
}

impl RoleLookup {
    /// Role list, or an empty list if the lookup failed
    pub fn into_roles(self) -> RoleList {
        match self {
            Self::Cached(roles) | Self::Directory(roles) => roles,
            Self::Failed(_) => Vec::new(),
        }
    }

    /// Role list, or the error that prevented resolving it
    pub fn into_result(self) -> Result<RoleList> {
        match self {
            Self::Cached(roles) | Self::Directory(roles) => Ok(roles),
            Self::Failed(error) => Err(error),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Resolves user roles from a directory, fronted by a role cache
///
/// The resolver exclusively owns its directory session and never closes or
/// reconnects it. The cache is shared through `Arc` and may outlive the
/// resolver. Concurrent misses on the same user are not coalesced; each
/// runs its own search.
pub struct RoleResolver<D, C = MemoryRoleCache> {
    directory: D,
    cache: Arc<C>,
    search_base: String,
    extractor: GroupExtractor,
    write_back: bool,
}

impl<D: DirectorySearch> RoleResolver<D> {
    /// Resolver with a private in-memory cache and write-back enabled
    pub fn new(directory: D, search_base: impl Into<String>) -> Self {
        Self::with_cache(directory, Arc::new(MemoryRoleCache::new()), search_base)
    }

    /// Resolver configured from a loaded configuration
    pub fn from_config(directory: D, config: &RoleProviderConfig) -> Self {
        Self::new(directory, config.directory.search_base.clone())
            .with_group_attribute(config.directory.group_attribute.clone())
            .with_write_back(config.cache.write_back)
    }
}

impl<D: DirectorySearch, C: RoleCache> RoleResolver<D, C> {
    /// Resolver using a shared cache
    pub fn with_cache(directory: D, cache: Arc<C>, search_base: impl Into<String>) -> Self {
        Self {
            directory,
            cache,
            search_base: search_base.into(),
            extractor: GroupExtractor::default(),
            write_back: true,
        }
    }

    /// Read group DNs from a different attribute
    pub fn with_group_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.extractor = GroupExtractor::new(attribute);
        self
    }

    /// Enable or disable storing directory results in the cache
    pub fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }

    pub fn cache(&self) -> &Arc<C> {
        &self.cache
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn search_base(&self) -> &str {
        &self.search_base
    }

    /// Cache key for a user under this resolver's session and base
    pub fn cache_key(&self, user_id: &str) -> CacheKey {
        CacheKey::new(
            user_id,
            self.directory.session_id(),
            &self.search_base,
            SearchScope::Subtree,
        )
    }

    /// Resolve a user's roles, keeping failures visible
    #[instrument(skip(self))]
    pub async fn lookup_roles(&self, user_id: &str) -> RoleLookup {
        let key = self.cache_key(user_id);

        // An empty cached list is treated the same as a miss
        match self.cache.get(&key) {
            Some(roles) if !roles.is_empty() => {
                debug!(roles = roles.len(), "Role cache hit");
                return RoleLookup::Cached(roles);
            }
            _ => debug!("Role cache miss"),
        }

        match self.resolve_from_directory(&key).await {
            Ok(roles) => {
                if self.write_back && !roles.is_empty() {
                    self.cache.put(key, roles.clone());
                }
                RoleLookup::Directory(roles)
            }
            Err(error) => {
                warn!(error = %error, "Role lookup failed, returning no roles");
                RoleLookup::Failed(error)
            }
        }
    }

    async fn resolve_from_directory(&self, key: &CacheKey) -> Result<RoleList> {
        let request = SearchRequest {
            base: key.search_base().to_string(),
            filter: key.filter().to_string(),
            scope: key.scope(),
        };

        let record = self.directory.find_one(&request).await?;
        debug!(found = record.is_some(), filter = %request.filter, "Directory search returned");

        self.extractor.extract(record.as_ref())
    }
}

#[async_trait]
impl<D: DirectorySearch, C: RoleCache> RoleProvider for RoleResolver<D, C> {
    async fn user_roles(&self, user_id: &str) -> RoleList {
        self.lookup_roles(user_id).await.into_roles()
    }

    async fn users_in_group(&self, _group: &str) -> Result<Vec<String>> {
        Err(RoleError::Unsupported("users_in_group"))
    }

    async fn flush_role_cache(&self, _role: &str) -> Result<()> {
        Err(RoleError::Unsupported("flush_role_cache"))
    }

    async fn flush_user_cache(&self, _user_id: &str) -> Result<()> {
        Err(RoleError::Unsupported("flush_user_cache"))
    }
}

impl<D: std::fmt::Debug, C> std::fmt::Debug for RoleResolver<D, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleResolver")
            .field("directory", &self.directory)
            .field("search_base", &self.search_base)
            .field("group_attribute", &self.extractor.group_attribute())
            .field("write_back", &self.write_back)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DirectoryRecord, SessionId};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const BASE: &str = "dc=example,dc=com";

    struct StubDirectory {
        session: SessionId,
        record: Option<DirectoryRecord>,
        fail: bool,
        calls: AtomicUsize,
        requests: Mutex<Vec<SearchRequest>>,
    }

    impl StubDirectory {
        fn returning(record: Option<DirectoryRecord>) -> Self {
            Self {
                session: SessionId::new(),
                record,
                fail: false,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::returning(None)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DirectorySearch for StubDirectory {
        fn session_id(&self) -> SessionId {
            self.session
        }

        async fn find_one(&self, request: &SearchRequest) -> Result<Option<DirectoryRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(RoleError::Search("connection reset".to_string()));
            }
            Ok(self.record.clone())
        }
    }

    fn alice() -> DirectoryRecord {
        DirectoryRecord::new("uid=alice,ou=People,dc=example,dc=com").with_attribute(
            "memberOf",
            [
                "cn=Admins,ou=Groups,dc=example,dc=com",
                "ou=NoCn,dc=example,dc=com",
            ],
        )
    }

    #[tokio::test]
    async fn test_cache_hit_skips_directory() {
        let resolver = RoleResolver::new(StubDirectory::returning(Some(alice())), BASE);
        resolver
            .cache()
            .put(resolver.cache_key("alice"), vec!["Cached".to_string()]);

        let lookup = resolver.lookup_roles("alice").await;

        assert!(lookup.is_cached());
        assert_eq!(lookup.into_roles(), vec!["Cached"]);
        assert_eq!(resolver.directory().calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_searches_once_with_uid_filter() {
        let resolver = RoleResolver::new(StubDirectory::returning(Some(alice())), BASE);

        let roles = resolver.user_roles("alice").await;

        assert_eq!(roles, vec!["Admins"]);
        assert_eq!(resolver.directory().calls(), 1);

        let requests = resolver.directory().requests.lock().unwrap();
        assert_eq!(
            requests[0],
            SearchRequest {
                base: BASE.to_string(),
                filter: "(uid=alice)".to_string(),
                scope: SearchScope::Subtree,
            }
        );
    }

    #[tokio::test]
    async fn test_empty_cached_list_falls_back() {
        let resolver = RoleResolver::new(StubDirectory::returning(Some(alice())), BASE);
        resolver.cache().put(resolver.cache_key("alice"), Vec::new());

        let lookup = resolver.lookup_roles("alice").await;

        assert!(matches!(lookup, RoleLookup::Directory(_)));
        assert_eq!(resolver.directory().calls(), 1);
    }

    #[tokio::test]
    async fn test_write_back_populates_cache() {
        let resolver = RoleResolver::new(StubDirectory::returning(Some(alice())), BASE);

        let first = resolver.user_roles("alice").await;
        let second = resolver.lookup_roles("alice").await;

        assert!(second.is_cached());
        assert_eq!(second.into_roles(), first);
        assert_eq!(resolver.directory().calls(), 1);
    }

    #[tokio::test]
    async fn test_write_back_disabled_leaves_cache_untouched() {
        let resolver = RoleResolver::new(StubDirectory::returning(Some(alice())), BASE)
            .with_write_back(false);

        resolver.user_roles("alice").await;
        resolver.user_roles("alice").await;

        assert!(resolver.cache().is_empty());
        assert_eq!(resolver.directory().calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_not_cached() {
        let resolver = RoleResolver::new(StubDirectory::returning(None), BASE);

        let lookup = resolver.lookup_roles("ghost").await;

        assert!(matches!(lookup, RoleLookup::Directory(ref roles) if roles.is_empty()));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_yields_empty_roles() {
        let resolver = RoleResolver::new(StubDirectory::failing(), BASE);

        assert!(resolver.user_roles("alice").await.is_empty());

        let lookup = resolver.lookup_roles("alice").await;
        assert!(lookup.is_failed());
        assert!(matches!(lookup.into_result(), Err(RoleError::Search(_))));
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_group_dn_yields_empty_roles() {
        let record = DirectoryRecord::new("uid=bob,dc=example,dc=com")
            .with_attribute("memberOf", ["cn=Ops,dc=example,dc=com", "broken"]);
        let resolver = RoleResolver::new(StubDirectory::returning(Some(record)), BASE);

        let lookup = resolver.lookup_roles("bob").await;
        assert!(matches!(lookup, RoleLookup::Failed(RoleError::MalformedDn { .. })));
        assert!(resolver.user_roles("bob").await.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let resolver = RoleResolver::new(StubDirectory::returning(None), BASE);

        assert!(resolver.users_in_group("Admins").await.unwrap_err().is_unsupported());
        assert!(resolver.flush_role_cache("Admins").await.unwrap_err().is_unsupported());
        assert!(resolver.flush_user_cache("alice").await.unwrap_err().is_unsupported());
        assert_eq!(resolver.directory().calls(), 0);
    }

    #[tokio::test]
    async fn test_from_config_applies_options() {
        let mut config = RoleProviderConfig::new("ldap://localhost", "ou=People,dc=example,dc=com");
        config.directory.group_attribute = "isMemberOf".to_string();
        config.cache.write_back = false;

        let record = DirectoryRecord::new("uid=carol,dc=example,dc=com")
            .with_attribute("isMemberOf", ["cn=Auditors,dc=example,dc=com"]);
        let resolver = RoleResolver::from_config(StubDirectory::returning(Some(record)), &config);

        assert_eq!(resolver.search_base(), "ou=People,dc=example,dc=com");
        assert_eq!(resolver.user_roles("carol").await, vec!["Auditors"]);
        assert!(resolver.cache().is_empty());
    }
}
