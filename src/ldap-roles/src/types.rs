//! Core types shared by the resolver, cache and directory layers

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Role list as returned to callers and stored in the cache
pub type RoleList = Vec<String>;

/// How far a directory search reaches below its base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Only the base entry itself
    Base,
    /// Immediate children of the base
    OneLevel,
    /// The base and everything below it
    #[default]
    Subtree,
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base => write!(f, "base"),
            Self::OneLevel => write!(f, "one_level"),
            Self::Subtree => write!(f, "subtree"),
        }
    }
}

/// Identity of an established directory session
///
/// Assigned once when a session is bound. Cache keys carry it so entries
/// resolved through different sessions never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh session identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Search parameters handed to the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub filter: String,
    pub scope: SearchScope,
}

/// A user entry returned by the directory
///
/// Attribute names are matched case-insensitively, as LDAP attribute
/// descriptions are.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryRecord {
    dn: String,
    attributes: HashMap<String, Vec<String>>,
}

impl DirectoryRecord {
    /// Create a record with no attributes
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Create a record from an attribute map
    pub fn with_attributes(
        dn: impl Into<String>,
        attributes: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            dn: dn.into(),
            attributes,
        }
    }

    /// Builder-style attribute insertion
    pub fn with_attribute<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// DN of the entry
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// Values of an attribute, looked up case-insensitively
    pub fn attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// Whether the entry carries no attributes at all
    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }
}
