//! Group extraction from directory records
//!
//! Turns the DN values of a group-membership attribute into flat group
//! names by taking the first `cn` of each DN.

use tracing::trace;

use crate::dn::DistinguishedName;
use crate::error::{Result, RoleError};
use crate::types::{DirectoryRecord, RoleList};

/// Attribute holding the DNs of the groups a user belongs to
pub const DEFAULT_GROUP_ATTRIBUTE: &str = "memberOf";

/// Extracts group common names from a user record
#[derive(Debug, Clone)]
pub struct GroupExtractor {
    group_attribute: String,
}

impl GroupExtractor {
    /// Extractor reading the given multi-valued attribute
    pub fn new(group_attribute: impl Into<String>) -> Self {
        Self {
            group_attribute: group_attribute.into(),
        }
    }

    pub fn group_attribute(&self) -> &str {
        &self.group_attribute
    }

    /// Extract group names from a record
    ///
    /// An absent record, a record without attributes, or a record without
    /// the group attribute all yield an empty list. Values are returned in
    /// attribute order without deduplication; DNs without a `cn` contribute
    /// nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RoleError::MalformedDn`] if any value fails to parse. No
    /// partial list is returned in that case.
    pub fn extract(&self, record: Option<&DirectoryRecord>) -> Result<RoleList> {
        let Some(record) = record else {
            trace!("no directory record, no groups");
            return Ok(Vec::new());
        };

        let Some(values) = record.attribute(&self.group_attribute) else {
            trace!(
                dn = %record.dn(),
                has_attributes = record.has_attributes(),
                attribute = %self.group_attribute,
                "group attribute absent"
            );
            return Ok(Vec::new());
        };

        values
            .iter()
            .map(|value| Self::group_name(value))
            .filter_map(|name| name.transpose())
            .collect()
    }

    fn group_name(value: &str) -> Result<Option<String>> {
        let dn = DistinguishedName::parse(value).map_err(|source| RoleError::MalformedDn {
            value: value.to_string(),
            source,
        })?;

        Ok(dn.common_name().map(str::to_string))
    }
}

impl Default for GroupExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_ATTRIBUTE)
    }
}
