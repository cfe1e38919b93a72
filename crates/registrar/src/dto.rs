//! JSON:API documents exchanged with the registrar's REST API.

use common::Doi;
use serde::{Deserialize, Serialize};

use crate::error::RegistrarError;
use crate::state::IdentifierState;

/// Content type of JSON:API request bodies.
pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Resource type of identifier documents.
pub const DOIS_TYPE: &str = "dois";

/// Request body for minting a draft identifier.
#[derive(Debug, Clone, Serialize)]
pub struct CreateDraftRequest {
    pub data: CreateDraftData,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDraftData {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: CreateDraftAttributes,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateDraftAttributes {
    pub prefix: String,
}

impl CreateDraftRequest {
    /// Builds a request for a draft under `prefix`.
    pub fn for_prefix(prefix: impl Into<String>) -> Self {
        Self {
            data: CreateDraftData {
                kind: DOIS_TYPE,
                attributes: CreateDraftAttributes {
                    prefix: prefix.into(),
                },
            },
        }
    }
}

/// An identifier document as returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct DoiDocument {
    pub data: DoiData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoiData {
    #[serde(default)]
    pub id: Option<String>,
    pub attributes: DoiAttributes,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoiAttributes {
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

impl DoiDocument {
    /// Extracts the identifier, preferring explicit prefix and suffix.
    pub fn doi(&self) -> Result<Doi, RegistrarError> {
        let attributes = &self.data.attributes;
        if let (Some(prefix), Some(suffix)) = (&attributes.prefix, &attributes.suffix) {
            return Doi::new(prefix.as_str(), suffix.as_str())
                .map_err(|e| RegistrarError::Decode(e.to_string()));
        }

        attributes
            .doi
            .as_deref()
            .or(self.data.id.as_deref())
            .ok_or_else(|| RegistrarError::Decode("identifier document has no doi".to_string()))?
            .parse()
            .map_err(|e: common::DoiParseError| RegistrarError::Decode(e.to_string()))
    }

    /// Extracts the lifecycle state. A missing or unknown state is an error.
    pub fn state(&self) -> Result<IdentifierState, RegistrarError> {
        self.data
            .attributes
            .state
            .as_deref()
            .ok_or_else(|| RegistrarError::UnknownState(String::new()))?
            .parse()
    }
}

/// Body for registering a landing page on the metadata API.
pub fn landing_page_body(doi: &Doi, url: &url::Url) -> String {
    format!("doi={}\nurl={}", doi.to_compact(), url)
}
