//! Registrar-side identifier lifecycle state.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistrarError;

/// The state of an identifier as reported by the registrar.
///
/// State transitions:
/// ```text
/// (minted) ──► Draft ──► Findable ──► Registered
///                │
///                └──► (deleted)
/// ```
///
/// Only drafts may be deleted. Registered identifiers are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierState {
    /// Minted but not public.
    Draft,

    /// Has metadata but no active landing page; de-listed.
    Registered,

    /// Public and resolvable.
    Findable,
}

impl IdentifierState {
    /// Returns true if the registrar accepts deleting the identifier.
    pub fn can_delete(&self) -> bool {
        matches!(self, IdentifierState::Draft)
    }

    /// Returns the state name as the registrar spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierState::Draft => "draft",
            IdentifierState::Registered => "registered",
            IdentifierState::Findable => "findable",
        }
    }
}

impl std::fmt::Display for IdentifierState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IdentifierState {
    type Err = RegistrarError;

    /// Unrecognized states are an error and are never defaulted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(IdentifierState::Draft),
            "registered" => Ok(IdentifierState::Registered),
            "findable" => Ok(IdentifierState::Findable),
            other => Err(RegistrarError::UnknownState(other.to_string())),
        }
    }
}
