//! Source-resource resolution.
//!
//! A transition depends on what the source resource currently looks like:
//! still available (with its metadata document), permanently moved, or gone.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use registrar::MetadataDocument;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use url::Url;

/// Media type requested from resource endpoints.
pub const DATACITE_XML: &str = "application/vnd.datacite.datacite+xml";

/// What the source resource currently looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The resource exists; this is its identifier metadata.
    Document(MetadataDocument),

    /// The resource moved permanently, usually because it was merged into another.
    Moved { location: Option<Url> },

    /// The resource was removed.
    Gone,
}

impl Resolution {
    /// Returns the outcome name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Document(_) => "document",
            Resolution::Moved { .. } => "moved",
            Resolution::Gone => "gone",
        }
    }
}

/// Failures that leave the resource's state unknown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolverError {
    /// The HTTP client could not be built.
    #[error("Failed to build resolver client: {0}")]
    Client(String),

    /// The resource could not be reached.
    #[error("Failed to reach resource {uri}: {reason}")]
    Transport { uri: Url, reason: String },

    /// The resource answered with a status that maps to no known outcome.
    #[error("Resource {uri} answered with unexpected status {status}")]
    UnexpectedStatus { uri: Url, status: u16 },

    /// The resource must be available but was resolved as moved or gone.
    #[error("Resource {uri} is {resolution}, expected a metadata document")]
    Unavailable {
        uri: Url,
        resolution: &'static str,
    },
}

/// Looks up the current state of a source resource.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Resolves `uri` to a document, moved or gone. Anything else is an error.
    async fn resolve(&self, uri: &Url) -> Result<Resolution, ResolverError>;
}

/// Resolver that fetches resources over HTTP without following redirects.
#[derive(Debug, Clone)]
pub struct HttpResourceResolver {
    http: Client,
}

impl HttpResourceResolver {
    /// Creates a resolver whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ResolverError> {
        let http = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| ResolverError::Client(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ResourceResolver for HttpResourceResolver {
    #[tracing::instrument(skip_all, fields(%uri))]
    async fn resolve(&self, uri: &Url) -> Result<Resolution, ResolverError> {
        let transport = |e: reqwest::Error| ResolverError::Transport {
            uri: uri.clone(),
            reason: e.to_string(),
        };

        let response = self
            .http
            .get(uri.clone())
            .header(ACCEPT, DATACITE_XML)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let resolution = match status {
            s if s.is_success() => {
                Resolution::Document(MetadataDocument::new(response.text().await.map_err(transport)?))
            }
            StatusCode::MOVED_PERMANENTLY | StatusCode::PERMANENT_REDIRECT => {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| uri.join(v).ok());
                Resolution::Moved { location }
            }
            StatusCode::GONE => Resolution::Gone,
            other => {
                return Err(ResolverError::UnexpectedStatus {
                    uri: uri.clone(),
                    status: other.as_u16(),
                });
            }
        };

        tracing::debug!(resolution = resolution.as_str(), "resource resolved");
        Ok(resolution)
    }
}

#[derive(Debug, Default)]
struct InMemoryResolverState {
    resources: HashMap<Url, Result<Resolution, ResolverError>>,
    lookups: Vec<Url>,
}

/// In-memory resolver for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResolver {
    state: Arc<RwLock<InMemoryResolverState>>,
}

impl InMemoryResolver {
    /// Creates a resolver that knows no resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `uri` resolve to `document`.
    pub fn set_document(&self, uri: &Url, document: MetadataDocument) {
        self.set(uri, Ok(Resolution::Document(document)));
    }

    /// Makes `uri` resolve as gone.
    pub fn set_gone(&self, uri: &Url) {
        self.set(uri, Ok(Resolution::Gone));
    }

    /// Makes `uri` resolve as moved to `location`.
    pub fn set_moved(&self, uri: &Url, location: Option<Url>) {
        self.set(uri, Ok(Resolution::Moved { location }));
    }

    /// Makes `uri` fail with `error`.
    pub fn set_error(&self, uri: &Url, error: ResolverError) {
        self.set(uri, Err(error));
    }

    /// Returns the number of lookups performed.
    pub fn lookup_count(&self) -> usize {
        self.state.read().unwrap().lookups.len()
    }

    fn set(&self, uri: &Url, outcome: Result<Resolution, ResolverError>) {
        self.state
            .write()
            .unwrap()
            .resources
            .insert(uri.clone(), outcome);
    }
}

#[async_trait]
impl ResourceResolver for InMemoryResolver {
    async fn resolve(&self, uri: &Url) -> Result<Resolution, ResolverError> {
        let mut state = self.state.write().unwrap();
        state.lookups.push(uri.clone());
        state
            .resources
            .get(uri)
            .cloned()
            .unwrap_or_else(|| {
                Err(ResolverError::UnexpectedStatus {
                    uri: uri.clone(),
                    status: 404,
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_outcomes() {
        let resolver = InMemoryResolver::new();
        let present = Url::parse("https://x/pub/1").unwrap();
        let gone = Url::parse("https://x/pub/2").unwrap();
        let unknown = Url::parse("https://x/pub/3").unwrap();
        resolver.set_document(&present, MetadataDocument::new("<resource/>"));
        resolver.set_gone(&gone);

        assert!(matches!(
            resolver.resolve(&present).await.unwrap(),
            Resolution::Document(_)
        ));
        assert_eq!(resolver.resolve(&gone).await.unwrap(), Resolution::Gone);
        assert!(matches!(
            resolver.resolve(&unknown).await,
            Err(ResolverError::UnexpectedStatus { status: 404, .. })
        ));
        assert_eq!(resolver.lookup_count(), 3);
    }

    #[test]
    fn test_resolution_names() {
        assert_eq!(Resolution::Gone.as_str(), "gone");
        assert_eq!(Resolution::Moved { location: None }.as_str(), "moved");
        assert_eq!(
            Resolution::Document(MetadataDocument::new("")).as_str(),
            "document"
        );
    }
}
