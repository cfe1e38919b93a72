//! Identifier creation saga.
//!
//! Mints a draft identifier, registers its metadata and then its landing
//! page. The registrar offers these as three separate calls, so a failed
//! landing page is compensated by deleting the metadata again.
//!
//! A failure while setting metadata leaves the draft behind. Drafts are
//! never public, and cleaning them up is left to operators.

use common::{Doi, TenantId};
use registrar::{
    MetadataDocument, RegistrarClient, RegistrarError, RegistrarOperation, TenantConfig,
    TenantConfigProvider,
};
use url::Url;

use crate::error::{Result, SagaError};
use crate::state::SagaRun;

/// The saga type identifier for identifier creation.
pub const SAGA_TYPE: &str = "DoiCreation";

/// Step name: mint a draft identifier.
pub const STEP_CREATE_DRAFT: &str = "create_draft";

/// Step name: register the metadata document.
pub const STEP_SET_METADATA: &str = "set_metadata";

/// Step name: register the landing page.
pub const STEP_SET_LANDING_PAGE: &str = "set_landing_page";

/// Creates identifiers with compensation on landing-page failure.
#[derive(Debug, Clone)]
pub struct CreationSaga<R> {
    registrar: R,
    tenants: TenantConfigProvider,
}

impl<R: RegistrarClient> CreationSaga<R> {
    /// Creates a new creation saga.
    pub fn new(registrar: R, tenants: TenantConfigProvider) -> Self {
        Self { registrar, tenants }
    }

    /// Mints an identifier for `tenant_id` pointing at `landing_page`.
    ///
    /// Returns the identifier only once metadata and landing page are both
    /// confirmed. If the landing page fails and the metadata is deleted
    /// again, the landing-page error is returned. If that deletion fails
    /// too, [`SagaError::CompensationFailed`] names the identifier.
    #[tracing::instrument(skip_all, fields(saga_type = SAGA_TYPE, tenant = %tenant_id))]
    pub async fn execute(
        &self,
        tenant_id: &TenantId,
        document: &MetadataDocument,
        landing_page: &Url,
    ) -> Result<Doi> {
        let mut run = SagaRun::start(SAGA_TYPE);
        let result = self.run(&mut run, tenant_id, document, landing_page).await;
        run.finish(result)
    }

    async fn run(
        &self,
        run: &mut SagaRun,
        tenant_id: &TenantId,
        document: &MetadataDocument,
        landing_page: &Url,
    ) -> Result<Doi> {
        let tenant = self.tenants.get(tenant_id)?;

        run.step(STEP_CREATE_DRAFT);
        let doi = self
            .registrar
            .create_draft(tenant)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::CreateDraft, None, e))?;
        tracing::info!(%doi, "draft identifier created");

        run.step(STEP_SET_METADATA);
        self.registrar
            .set_metadata(tenant, &doi, document)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::SetMetadata, Some(&doi), e))?;

        run.step(STEP_SET_LANDING_PAGE);
        if let Err(e) = self
            .registrar
            .set_landing_page(tenant, &doi, landing_page)
            .await
        {
            run.compensate(STEP_SET_LANDING_PAGE);
            return Err(self.compensate(tenant, &doi, e).await);
        }

        tracing::info!(%doi, %landing_page, "identifier created");
        Ok(doi)
    }

    /// Deletes the metadata registered for `doi` after its landing page failed.
    async fn compensate(
        &self,
        tenant: &TenantConfig,
        doi: &Doi,
        original: RegistrarError,
    ) -> SagaError {
        match self.registrar.delete_metadata(tenant, doi).await {
            Ok(()) => {
                tracing::warn!(%doi, error = %original, "landing page failed, metadata deleted");
                SagaError::remote(RegistrarOperation::SetLandingPage, Some(doi), original)
            }
            Err(compensation_error) => {
                tracing::error!(
                    %doi,
                    error = %original,
                    compensation_error = %compensation_error,
                    "compensation failed, identifier needs manual remediation"
                );
                SagaError::CompensationFailed {
                    doi: doi.clone(),
                    failed: RegistrarOperation::SetLandingPage,
                    original,
                    compensation: RegistrarOperation::DeleteMetadata,
                    compensation_error,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registrar::{IdentifierState, InMemoryRegistrar};

    fn tenants() -> TenantConfigProvider {
        TenantConfigProvider::from_json_str(
            r#"[{
                "tenant_id": "unit",
                "prefix": "10.5072",
                "username": "UNIT.REPO",
                "password": "pw",
                "mds_url": "https://mds.test/",
                "rest_url": "https://api.test/"
            }]"#,
        )
        .unwrap()
    }

    fn landing_page() -> Url {
        Url::parse("https://x/pub/1").unwrap()
    }

    #[tokio::test]
    async fn test_unknown_tenant_makes_no_calls() {
        let registrar = InMemoryRegistrar::new();
        let saga = CreationSaga::new(registrar.clone(), tenants());

        let err = saga
            .execute(
                &TenantId::new("other"),
                &MetadataDocument::new("<resource/>"),
                &landing_page(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SagaError::Configuration(_)));
        assert!(registrar.calls().is_empty());
    }

    #[tokio::test]
    async fn test_draft_failure_has_nothing_to_compensate() {
        let registrar = InMemoryRegistrar::new();
        registrar.set_failure(
            RegistrarOperation::CreateDraft,
            RegistrarError::Transport("timeout".to_string()),
        );
        let saga = CreationSaga::new(registrar.clone(), tenants());

        let err = saga
            .execute(
                &TenantId::new("unit"),
                &MetadataDocument::new("<resource/>"),
                &landing_page(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.operation(), Some(RegistrarOperation::CreateDraft));
        assert_eq!(registrar.operations(), vec![RegistrarOperation::CreateDraft]);
    }

    #[tokio::test]
    async fn test_metadata_failure_leaves_draft() {
        let registrar = InMemoryRegistrar::new();
        registrar.set_failure(
            RegistrarOperation::SetMetadata,
            RegistrarError::Status {
                status: 422,
                body: "invalid schema".to_string(),
            },
        );
        let saga = CreationSaga::new(registrar.clone(), tenants());

        let err = saga
            .execute(
                &TenantId::new("unit"),
                &MetadataDocument::new("<resource/>"),
                &landing_page(),
            )
            .await
            .unwrap_err();

        let doi = err.doi().cloned().unwrap();
        assert_eq!(registrar.state_of(&doi), Some(IdentifierState::Draft));
        assert_eq!(registrar.call_count(RegistrarOperation::DeleteMetadata), 0);
        assert_eq!(registrar.call_count(RegistrarOperation::DeleteDraft), 0);
    }
}
