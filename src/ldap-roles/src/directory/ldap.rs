//! LDAP session backed by `ldap3`

use async_trait::async_trait;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use tracing::{debug, info, instrument, warn};

use super::DirectorySearch;
use crate::config::DirectorySection;
use crate::error::{Result, RoleError};
use crate::types::{DirectoryRecord, SearchRequest, SearchScope, SessionId};

/// LDAP result code for invalid credentials
const RC_INVALID_CREDENTIALS: u32 = 49;

impl From<SearchScope> for Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => Scope::Base,
            SearchScope::OneLevel => Scope::OneLevel,
            SearchScope::Subtree => Scope::Subtree,
        }
    }
}

/// A bound LDAP session
///
/// The underlying `Ldap` handle multiplexes requests over one connection
/// driven by a background task; each search works on a clone of it.
pub struct LdapDirectory {
    ldap: Ldap,
    session_id: SessionId,
    server: String,
    attributes: Vec<String>,
}

impl LdapDirectory {
    /// Connect and bind to the configured server
    ///
    /// Binds anonymously when no bind DN is configured.
    ///
    /// # Errors
    ///
    /// Returns [`RoleError::InvalidConfig`] for an invalid configuration,
    /// [`RoleError::Connection`] if the server cannot be reached and
    /// [`RoleError::Bind`] if the bind is rejected. Nothing is retried.
    pub async fn connect(config: &DirectorySection) -> Result<Self> {
        config.validate()?;

        debug!(server = %config.server, starttls = config.starttls, "Connecting to directory");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(config.connect_timeout())
            .set_starttls(config.starttls);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.server)
            .await
            .map_err(|e| {
                RoleError::Connection(format!("Failed to connect to {}: {}", config.server, e))
            })?;

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        let bind_dn = config.bind_dn.as_deref().unwrap_or("");
        let bind_password = config.bind_password.as_deref().unwrap_or("");

        debug!(bind_dn = %bind_dn, anonymous = config.is_anonymous(), "Performing LDAP bind");

        let result = ldap
            .simple_bind(bind_dn, bind_password)
            .await
            .map_err(|e| RoleError::Bind {
                principal: bind_dn.to_string(),
                message: e.to_string(),
            })?;

        if result.rc != 0 {
            let message = if result.rc == RC_INVALID_CREDENTIALS {
                "invalid credentials".to_string()
            } else {
                format!("result code {}: {}", result.rc, result.text)
            };
            return Err(RoleError::Bind {
                principal: bind_dn.to_string(),
                message,
            });
        }

        let session_id = SessionId::new();
        info!(server = %config.server, session = %session_id, "Directory session established");

        Ok(Self {
            ldap,
            session_id,
            server: config.server.clone(),
            attributes: vec!["*".to_string(), config.group_attribute.clone()],
        })
    }

    /// Server URL this session is bound to
    pub fn server(&self) -> &str {
        &self.server
    }
}

#[async_trait]
impl DirectorySearch for LdapDirectory {
    fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[instrument(skip(self), fields(session = %self.session_id))]
    async fn find_one(&self, request: &SearchRequest) -> Result<Option<DirectoryRecord>> {
        let mut ldap = self.ldap.clone();

        let result = ldap
            .search(
                &request.base,
                request.scope.into(),
                &request.filter,
                self.attributes.clone(),
            )
            .await
            .map_err(|e| RoleError::Search(e.to_string()))?;

        let (entries, _) = result
            .success()
            .map_err(|e| RoleError::Search(e.to_string()))?;

        debug!(found = entries.len(), "LDAP search completed");

        Ok(entries.into_iter().next().map(|entry| {
            let entry = SearchEntry::construct(entry);
            DirectoryRecord::with_attributes(entry.dn, entry.attrs)
        }))
    }
}

impl std::fmt::Debug for LdapDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapDirectory")
            .field("server", &self.server)
            .field("session_id", &self.session_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_conversion() {
        assert!(matches!(Scope::from(SearchScope::Base), Scope::Base));
        assert!(matches!(Scope::from(SearchScope::OneLevel), Scope::OneLevel));
        assert!(matches!(Scope::from(SearchScope::Subtree), Scope::Subtree));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = DirectorySection::new("http://ldap.example.com", "dc=example,dc=com");

        let result = LdapDirectory::connect(&config).await;
        assert!(matches!(result, Err(RoleError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_connect_unreachable_server_is_fatal() {
        // Port 1 on loopback refuses connections.
        let mut config = DirectorySection::new("ldap://127.0.0.1:1", "dc=example,dc=com");
        config.connect_timeout_secs = 2;

        let result = LdapDirectory::connect(&config).await;
        assert!(matches!(result, Err(RoleError::Connection(_))));
    }
}
