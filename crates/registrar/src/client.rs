//! Registrar client trait.

use async_trait::async_trait;
use common::Doi;
use url::Url;

use crate::error::Result;
use crate::metadata::MetadataDocument;
use crate::state::IdentifierState;
use crate::tenant::TenantConfig;

/// A remote primitive offered by the registrar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrarOperation {
    CreateDraft,
    SetMetadata,
    SetLandingPage,
    DeleteMetadata,
    DeleteDraft,
    FetchState,
    FetchMetadata,
    FetchLandingPage,
}

impl RegistrarOperation {
    /// Returns the operation name used in logs, metrics and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrarOperation::CreateDraft => "create_draft",
            RegistrarOperation::SetMetadata => "set_metadata",
            RegistrarOperation::SetLandingPage => "set_landing_page",
            RegistrarOperation::DeleteMetadata => "delete_metadata",
            RegistrarOperation::DeleteDraft => "delete_draft",
            RegistrarOperation::FetchState => "fetch_state",
            RegistrarOperation::FetchMetadata => "fetch_metadata",
            RegistrarOperation::FetchLandingPage => "fetch_landing_page",
        }
    }
}

impl std::fmt::Display for RegistrarOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tenant-scoped registrar operations.
///
/// Each method is one network round trip. Implementations must not retry,
/// and must turn every non-2xx answer into an error carrying status and body.
/// Credentials travel with every call through the [`TenantConfig`].
#[async_trait]
pub trait RegistrarClient: Send + Sync {
    /// Mints a new draft identifier under the tenant's prefix.
    async fn create_draft(&self, tenant: &TenantConfig) -> Result<Doi>;

    /// Creates or replaces the identifier's metadata.
    async fn set_metadata(
        &self,
        tenant: &TenantConfig,
        doi: &Doi,
        document: &MetadataDocument,
    ) -> Result<()>;

    /// Registers the URL the identifier resolves to.
    ///
    /// On the metadata API this also promotes a new identifier with metadata
    /// towards findable.
    async fn set_landing_page(&self, tenant: &TenantConfig, doi: &Doi, url: &Url) -> Result<()>;

    /// Marks the identifier's metadata inactive.
    async fn delete_metadata(&self, tenant: &TenantConfig, doi: &Doi) -> Result<()>;

    /// Deletes a draft identifier. Fails with `NotDraft` for any other state.
    async fn delete_draft(&self, tenant: &TenantConfig, doi: &Doi) -> Result<()>;

    /// Returns the identifier's current lifecycle state.
    async fn fetch_state(&self, tenant: &TenantConfig, doi: &Doi) -> Result<IdentifierState>;

    /// Returns the identifier's current metadata document.
    async fn fetch_metadata(&self, tenant: &TenantConfig, doi: &Doi) -> Result<MetadataDocument>;

    /// Returns the URL the identifier currently resolves to.
    async fn fetch_landing_page(&self, tenant: &TenantConfig, doi: &Doi) -> Result<Url>;
}
