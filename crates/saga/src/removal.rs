//! Removal saga for identifiers whose resource was deleted.
//!
//! Only drafts may be deleted. Registered and findable identifiers are
//! persistent by definition, so a removal for one is rejected with
//! [`RegistrarError::NotDraft`] before the registrar is asked to delete it.

use common::{Doi, TenantId};
use registrar::{
    IdentifierState, RegistrarClient, RegistrarError, RegistrarOperation, TenantConfigProvider,
};

use crate::error::{Result, SagaError};
use crate::state::SagaRun;

/// The saga type identifier for identifier removal.
pub const SAGA_TYPE: &str = "DoiRemoval";

/// Deletes draft identifiers.
#[derive(Debug, Clone)]
pub struct RemovalSaga<R> {
    registrar: R,
    tenants: TenantConfigProvider,
}

impl<R: RegistrarClient> RemovalSaga<R> {
    /// Creates a new removal saga.
    pub fn new(registrar: R, tenants: TenantConfigProvider) -> Self {
        Self { registrar, tenants }
    }

    /// Deletes `doi` if it is still a draft.
    #[tracing::instrument(skip_all, fields(saga_type = SAGA_TYPE, tenant = %tenant_id, %doi))]
    pub async fn execute(&self, tenant_id: &TenantId, doi: &Doi) -> Result<()> {
        let run = SagaRun::start(SAGA_TYPE);
        let result = self.run(&run, tenant_id, doi).await;
        run.finish(result)
    }

    async fn run(&self, run: &SagaRun, tenant_id: &TenantId, doi: &Doi) -> Result<()> {
        let tenant = self.tenants.get(tenant_id)?;

        run.step("fetch_state");
        let state = self
            .registrar
            .fetch_state(tenant, doi)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::FetchState, Some(doi), e))?;

        if state != IdentifierState::Draft {
            return Err(SagaError::remote(
                RegistrarOperation::DeleteDraft,
                Some(doi),
                RegistrarError::NotDraft { doi: doi.clone() },
            ));
        }

        run.step("delete_draft");
        self.registrar
            .delete_draft(tenant, doi)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::DeleteDraft, Some(doi), e))?;
        tracing::info!("draft identifier deleted");
        Ok(())
    }
}
