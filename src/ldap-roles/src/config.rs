//! Role provider configuration loading and validation

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::dn::DistinguishedName;
use crate::error::{Result, RoleError};
use crate::extract::DEFAULT_GROUP_ATTRIBUTE;

/// Complete role provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoleProviderConfig {
    pub directory: DirectorySection,

    #[serde(default)]
    pub cache: CacheSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectorySection {
    /// Server URL, e.g. `ldap://ldap.example.com:389`
    pub server: String,
    /// Base DN for user searches
    pub search_base: String,
    /// Bind principal; anonymous bind when absent
    #[serde(default)]
    pub bind_dn: Option<String>,
    #[serde(default)]
    pub bind_password: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default)]
    pub starttls: bool,
    /// Multi-valued attribute listing group DNs
    #[serde(default = "default_group_attribute")]
    pub group_attribute: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSection {
    /// Store directory results back into the cache
    #[serde(default = "default_true")]
    pub write_back: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            write_back: default_true(),
        }
    }
}

fn default_true() -> bool { true }
fn default_connect_timeout() -> u64 { 10 }
fn default_group_attribute() -> String { DEFAULT_GROUP_ATTRIBUTE.to_string() }

const URL_SCHEMES: [&str; 3] = ["ldap://", "ldaps://", "ldapi://"];

impl RoleProviderConfig {
    /// Configuration with defaults for everything but server and base
    pub fn new(server: impl Into<String>, search_base: impl Into<String>) -> Self {
        Self {
            directory: DirectorySection::new(server, search_base),
            cache: CacheSection::default(),
        }
    }

    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| {
                format!("Failed to read configuration file {}", path.as_ref().display())
            })?;

        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let config: RoleProviderConfig = toml::from_str(contents)
            .context("Failed to parse configuration file")?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.directory.validate()
    }
}

impl DirectorySection {
    pub fn new(server: impl Into<String>, search_base: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            search_base: search_base.into(),
            bind_dn: None,
            bind_password: None,
            connect_timeout_secs: default_connect_timeout(),
            starttls: false,
            group_attribute: default_group_attribute(),
        }
    }

    /// Set bind credentials
    pub fn with_bind(
        mut self,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
    ) -> Self {
        self.bind_dn = Some(bind_dn.into());
        self.bind_password = Some(bind_password.into());
        self
    }

    /// Whether the session binds without a principal
    pub fn is_anonymous(&self) -> bool {
        self.bind_dn.is_none()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if !URL_SCHEMES.iter().any(|scheme| self.server.starts_with(scheme)) {
            return Err(RoleError::InvalidConfig(format!(
                "server must be an ldap://, ldaps:// or ldapi:// URL, got '{}'",
                self.server
            )));
        }

        if self.search_base.trim().is_empty() {
            return Err(RoleError::InvalidConfig(
                "search_base cannot be empty".to_string(),
            ));
        }

        DistinguishedName::parse(&self.search_base).map_err(|e| {
            RoleError::InvalidConfig(format!("search_base is not a valid DN: {}", e))
        })?;

        if self.bind_password.is_some() && self.bind_dn.is_none() {
            return Err(RoleError::InvalidConfig(
                "bind_password requires bind_dn".to_string(),
            ));
        }

        if self.connect_timeout_secs == 0 {
            return Err(RoleError::InvalidConfig(
                "connect_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.group_attribute.trim().is_empty() {
            return Err(RoleError::InvalidConfig(
                "group_attribute cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
