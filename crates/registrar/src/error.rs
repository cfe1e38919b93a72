//! Registrar and tenant configuration error types.

use common::{Doi, TenantId};
use thiserror::Error;

/// Errors returned by a single registrar call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrarError {
    /// The registrar could not be reached, or the call timed out.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The registrar answered with a non-2xx status.
    #[error("Registrar responded {status}: {body}")]
    Status { status: u16, body: String },

    /// The identifier cannot be deleted because it is no longer a draft.
    #[error("Identifier {doi} is not a draft")]
    NotDraft { doi: Doi },

    /// The registrar reported an identifier state this client does not know.
    #[error("Unknown identifier state: {0:?}")]
    UnknownState(String),

    /// A 2xx response whose body could not be understood.
    #[error("Unexpected registrar response: {0}")]
    Decode(String),
}

impl RegistrarError {
    /// Returns the HTTP status the registrar answered with, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistrarError::Status { status, .. } => Some(*status),
            RegistrarError::NotDraft { .. } => Some(405),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RegistrarError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RegistrarError::Decode(err.to_string())
        } else {
            RegistrarError::Transport(err.to_string())
        }
    }
}

/// Errors raised while loading or looking up tenant configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration exists for the tenant.
    #[error("No registrar configuration for tenant {0}")]
    UnknownTenant(TenantId),

    /// A required field is empty or malformed.
    #[error("Incomplete registrar configuration for tenant {tenant}: {field} {reason}")]
    Incomplete {
        tenant: TenantId,
        field: &'static str,
        reason: String,
    },

    /// The same tenant appears twice.
    #[error("Duplicate registrar configuration for tenant {0}")]
    DuplicateTenant(TenantId),

    /// The configuration file could not be read.
    #[error("Failed to read tenant configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON.
    #[error("Failed to parse tenant configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Convenience type alias for registrar results.
pub type Result<T> = std::result::Result<T, RegistrarError>;
