//! Error types for directory role resolution

use thiserror::Error;

use crate::dn::DnError;

/// Role provider errors
#[derive(Debug, Error)]
pub enum RoleError {
    /// Invalid construction-time configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not reach the directory server
    #[error("Directory connection failed: {0}")]
    Connection(String),

    /// Directory rejected the bind
    #[error("Directory bind failed for '{principal}': {message}")]
    Bind { principal: String, message: String },

    /// Search could not be executed or returned a non-success result
    #[error("Directory search failed: {0}")]
    Search(String),

    /// A group-membership value is not a valid distinguished name
    #[error("Malformed distinguished name '{value}': {source}")]
    MalformedDn {
        value: String,
        #[source]
        source: DnError,
    },

    /// Operation is part of the provider contract but not available
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

impl RoleError {
    /// Whether this error signals a missing capability rather than a failure
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }

    /// Whether this error originated in the directory layer
    pub fn is_directory_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Bind { .. } | Self::Search(_)
        )
    }
}

/// Result type for role provider operations
pub type Result<T> = std::result::Result<T, RoleError>;
