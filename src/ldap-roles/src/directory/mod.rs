//! Directory search seam
//!
//! The resolver talks to the directory only through [`DirectorySearch`].
//! [`LdapDirectory`] is the `ldap3`-backed implementation.

mod ldap;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DirectoryRecord, SearchRequest, SessionId};

pub use ldap::LdapDirectory;

/// An established, bound directory session able to run searches
///
/// Implementations must be safe to share across tasks; the resolver issues
/// searches concurrently without coordination.
#[async_trait]
pub trait DirectorySearch: Send + Sync {
    /// Identity of the bound session
    fn session_id(&self) -> SessionId;

    /// Run a search and return the first matching entry, if any
    async fn find_one(&self, request: &SearchRequest) -> Result<Option<DirectoryRecord>>;
}
