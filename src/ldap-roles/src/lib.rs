//! # LDAP Role Provider
//!
//! Resolves the authorization roles of a user from the group memberships
//! recorded in a directory, with a cache in front of the directory.
//!
//! ## Features
//!
//! - **Cache-first lookup** keyed by user, session, search base, filter and scope
//! - **Directory fallback** through an `ldap3` session bound at construction
//! - **Group extraction** from `memberOf` DNs (first `cn` of each DN)
//! - **Fail-open** role resolution: directory errors yield an empty role list
//!
//! ## Example
//!
//! ```rust,no_run
//! use ldap_roles::{LdapDirectory, RoleProvider, RoleProviderConfig, RoleResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RoleProviderConfig::load("/etc/ldap-roles/roles.toml")?;
//!     let directory = LdapDirectory::connect(&config.directory).await?;
//!     let resolver = RoleResolver::from_config(directory, &config);
//!
//!     for role in resolver.user_roles("alice").await {
//!         println!("{}", role);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod directory;
pub mod dn;
pub mod error;
pub mod extract;
pub mod resolver;
pub mod types;

// Re-export commonly used types
pub use cache::{CacheKey, CacheStats, MemoryRoleCache, RoleCache};
pub use config::RoleProviderConfig;
pub use directory::{DirectorySearch, LdapDirectory};
pub use dn::{DistinguishedName, DnError};
pub use error::{Result, RoleError};
pub use extract::GroupExtractor;
pub use resolver::{RoleLookup, RoleProvider, RoleResolver};
pub use types::{DirectoryRecord, RoleList, SearchRequest, SearchScope, SessionId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
