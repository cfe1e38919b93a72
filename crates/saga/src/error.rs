//! Saga error types.

use common::Doi;
use registrar::{ConfigError, RegistrarError, RegistrarOperation};
use thiserror::Error;

use crate::relations::MetadataError;
use crate::resolver::ResolverError;

/// Errors that can occur during saga execution.
///
/// Every registrar failure is reported with the operation that failed and,
/// once one exists, the identifier it targeted.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A registrar call failed; nothing needed compensating.
    #[error("Registrar call '{operation}' failed for {}: {source}", target_label(.doi))]
    Remote {
        operation: RegistrarOperation,
        doi: Option<Doi>,
        source: RegistrarError,
    },

    /// A step failed and the compensating call failed too.
    #[error(
        "'{failed}' failed for {doi} ({original}) and compensating '{compensation}' also failed ({compensation_error}); identifier {doi} must be remediated manually"
    )]
    CompensationFailed {
        doi: Doi,
        failed: RegistrarOperation,
        original: RegistrarError,
        compensation: RegistrarOperation,
        compensation_error: RegistrarError,
    },

    /// Tenant configuration is missing or incomplete.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The source resource could not be resolved to a known outcome.
    #[error("Resource resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// The registrar's metadata could not be rewritten.
    #[error("Metadata for {doi} could not be rewritten: {source}")]
    Metadata { doi: Doi, source: MetadataError },
}

fn target_label(doi: &Option<Doi>) -> String {
    match doi {
        Some(doi) => doi.to_string(),
        None => "a new identifier".to_string(),
    }
}

impl SagaError {
    /// Wraps a registrar failure with the operation and identifier involved.
    pub fn remote(operation: RegistrarOperation, doi: Option<&Doi>, source: RegistrarError) -> Self {
        SagaError::Remote {
            operation,
            doi: doi.cloned(),
            source,
        }
    }

    /// Returns the identifier the failure concerns, if known.
    pub fn doi(&self) -> Option<&Doi> {
        match self {
            SagaError::Remote { doi, .. } => doi.as_ref(),
            SagaError::CompensationFailed { doi, .. } | SagaError::Metadata { doi, .. } => {
                Some(doi)
            }
            _ => None,
        }
    }

    /// Returns the registrar operation that failed first, if any.
    pub fn operation(&self) -> Option<RegistrarOperation> {
        match self {
            SagaError::Remote { operation, .. } => Some(*operation),
            SagaError::CompensationFailed { failed, .. } => Some(*failed),
            _ => None,
        }
    }

    /// Returns the registrar error behind the failure, if any.
    pub fn registrar_error(&self) -> Option<&RegistrarError> {
        match self {
            SagaError::Remote { source, .. } => Some(source),
            SagaError::CompensationFailed { original, .. } => Some(original),
            _ => None,
        }
    }

    /// Returns true if the identifier was not a draft when deletion was attempted.
    pub fn is_not_draft(&self) -> bool {
        matches!(
            self,
            SagaError::Remote {
                source: RegistrarError::NotDraft { .. },
                ..
            }
        )
    }

    /// Returns true if an operator has to repair remote state by hand.
    pub fn requires_manual_remediation(&self) -> bool {
        matches!(self, SagaError::CompensationFailed { .. })
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
