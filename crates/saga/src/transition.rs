//! Identifier transition saga.
//!
//! Decides what happens to an identifier by looking at two things it does
//! not own: the registrar's state for the identifier and the current state
//! of the source resource.
//!
//! | resource  | identifier   | action                                              |
//! |-----------|--------------|-----------------------------------------------------|
//! | document  | any / none   | (mint draft), set metadata, set landing page        |
//! | gone/moved| `Findable`   | fetch metadata, add duplicate relation, set, delete |
//! | gone/moved| `Draft`      | delete draft                                        |
//! | gone/moved| `Registered` | nothing                                             |
//!
//! Failures are never retried here. Redelivery of the triggering event is the
//! retry mechanism, and every step is safe to repeat.

use common::events::MakeFindableData;
use common::{Doi, TenantId};
use registrar::{
    IdentifierState, MetadataDocument, RegistrarClient, RegistrarOperation, TenantConfig,
    TenantConfigProvider,
};
use url::Url;

use crate::error::{Result, SagaError};
use crate::relations::add_duplicate_relation;
use crate::resolver::{Resolution, ResourceResolver};
use crate::state::SagaRun;

/// The saga type identifier for identifier transitions.
pub const SAGA_TYPE: &str = "DoiTransition";

/// Step name: resolve the source resource.
pub const STEP_RESOLVE: &str = "resolve_resource";

/// Step name: register metadata and landing page.
pub const STEP_REGISTER: &str = "register";

/// Step name: observe the registrar state of the identifier.
pub const STEP_FETCH_STATE: &str = "fetch_state";

/// Step name: move a findable identifier back to registered.
pub const STEP_DEREGISTER: &str = "deregister";

/// Step name: delete a draft identifier.
pub const STEP_DELETE_DRAFT: &str = "delete_draft";

/// Input for one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub tenant_id: TenantId,
    /// Identifier to transition. Minted when absent and the resource exists.
    pub doi: Option<Doi>,
    pub resource_uri: Url,
    /// Resource this one duplicates, recorded before de-registration.
    pub duplicate_of: Option<Url>,
}

impl TransitionRequest {
    /// Creates a request for an existing identifier.
    pub fn new(tenant_id: impl Into<TenantId>, doi: Option<Doi>, resource_uri: Url) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            doi,
            resource_uri,
            duplicate_of: None,
        }
    }

    /// Sets the resource this one duplicates.
    pub fn with_duplicate_of(mut self, duplicate_of: Url) -> Self {
        self.duplicate_of = Some(duplicate_of);
        self
    }
}

impl From<&MakeFindableData> for TransitionRequest {
    fn from(data: &MakeFindableData) -> Self {
        Self {
            tenant_id: data.tenant_id.clone(),
            doi: data.effective_doi().cloned(),
            resource_uri: data.resource_uri.clone(),
            duplicate_of: data.duplicate_of.clone(),
        }
    }
}

/// What a transition did.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Metadata and landing page were registered.
    Findable { doi: Doi, minted: bool },

    /// A findable identifier was moved back to registered.
    Deregistered {
        doi: Doi,
        duplicate_of: Option<Url>,
    },

    /// A draft was deleted because its resource no longer exists.
    DraftDeleted { doi: Doi },

    /// Nothing needed to change.
    Unchanged {
        doi: Option<Doi>,
        state: Option<IdentifierState>,
    },
}

impl TransitionOutcome {
    /// Returns the identifier the transition touched, if any.
    pub fn doi(&self) -> Option<&Doi> {
        match self {
            TransitionOutcome::Findable { doi, .. }
            | TransitionOutcome::Deregistered { doi, .. }
            | TransitionOutcome::DraftDeleted { doi } => Some(doi),
            TransitionOutcome::Unchanged { doi, .. } => doi.as_ref(),
        }
    }
}

/// Runs identifier transitions against the registrar.
#[derive(Debug, Clone)]
pub struct TransitionSaga<R, V> {
    registrar: R,
    resolver: V,
    tenants: TenantConfigProvider,
}

impl<R, V> TransitionSaga<R, V>
where
    R: RegistrarClient,
    V: ResourceResolver,
{
    /// Creates a new transition saga.
    pub fn new(registrar: R, resolver: V, tenants: TenantConfigProvider) -> Self {
        Self {
            registrar,
            resolver,
            tenants,
        }
    }

    /// Resolves the resource, observes the identifier and runs the matching transition.
    #[tracing::instrument(
        skip_all,
        fields(saga_type = SAGA_TYPE, tenant = %request.tenant_id, uri = %request.resource_uri)
    )]
    pub async fn execute(&self, request: &TransitionRequest) -> Result<TransitionOutcome> {
        let run = SagaRun::start(SAGA_TYPE);
        let result = self.run(&run, request).await;
        run.finish(result)
    }

    async fn run(&self, run: &SagaRun, request: &TransitionRequest) -> Result<TransitionOutcome> {
        let tenant = self.tenants.get(&request.tenant_id)?;

        run.step(STEP_RESOLVE);
        let resolution = self.resolver.resolve(&request.resource_uri).await?;
        tracing::info!(resolution = resolution.as_str(), "resource resolved");

        match resolution {
            Resolution::Document(document) => {
                run.step(STEP_REGISTER);
                self.register(tenant, request, &document).await
            }
            Resolution::Moved { location } => {
                tracing::info!(location = ?location.as_ref().map(Url::as_str), "resource moved");
                self.retire(run, tenant, request.doi.as_ref(), request.duplicate_of.clone())
                    .await
            }
            Resolution::Gone => {
                self.retire(run, tenant, request.doi.as_ref(), request.duplicate_of.clone())
                    .await
            }
        }
    }

    async fn register(
        &self,
        tenant: &TenantConfig,
        request: &TransitionRequest,
        document: &MetadataDocument,
    ) -> Result<TransitionOutcome> {
        let (doi, minted) = match &request.doi {
            Some(doi) => (doi.clone(), false),
            None => {
                let doi = self
                    .registrar
                    .create_draft(tenant)
                    .await
                    .map_err(|e| SagaError::remote(RegistrarOperation::CreateDraft, None, e))?;
                tracing::info!(%doi, "draft identifier created");
                (doi, true)
            }
        };

        self.registrar
            .set_metadata(tenant, &doi, document)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::SetMetadata, Some(&doi), e))?;
        self.registrar
            .set_landing_page(tenant, &doi, &request.resource_uri)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::SetLandingPage, Some(&doi), e))?;

        tracing::info!(%doi, minted, "identifier findable");
        Ok(TransitionOutcome::Findable { doi, minted })
    }

    async fn retire(
        &self,
        run: &SagaRun,
        tenant: &TenantConfig,
        doi: Option<&Doi>,
        duplicate_of: Option<Url>,
    ) -> Result<TransitionOutcome> {
        let Some(doi) = doi else {
            tracing::info!("resource unavailable and no identifier exists");
            return Ok(TransitionOutcome::Unchanged {
                doi: None,
                state: None,
            });
        };

        run.step(STEP_FETCH_STATE);
        let state = self
            .registrar
            .fetch_state(tenant, doi)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::FetchState, Some(doi), e))?;
        tracing::info!(%doi, %state, "identifier state observed");

        match state {
            IdentifierState::Findable => {
                run.step(STEP_DEREGISTER);
                self.deregister(tenant, doi, duplicate_of).await
            }
            IdentifierState::Draft => {
                run.step(STEP_DELETE_DRAFT);
                self.registrar.delete_draft(tenant, doi).await.map_err(|e| {
                    SagaError::remote(RegistrarOperation::DeleteDraft, Some(doi), e)
                })?;
                tracing::info!(%doi, "draft identifier deleted");
                Ok(TransitionOutcome::DraftDeleted { doi: doi.clone() })
            }
            IdentifierState::Registered => Ok(TransitionOutcome::Unchanged {
                doi: Some(doi.clone()),
                state: Some(state),
            }),
        }
    }

    async fn deregister(
        &self,
        tenant: &TenantConfig,
        doi: &Doi,
        duplicate_of: Option<Url>,
    ) -> Result<TransitionOutcome> {
        let current = self
            .registrar
            .fetch_metadata(tenant, doi)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::FetchMetadata, Some(doi), e))?;

        let document = match &duplicate_of {
            Some(original) => {
                add_duplicate_relation(&current, original).map_err(|source| {
                    SagaError::Metadata {
                        doi: doi.clone(),
                        source,
                    }
                })?
            }
            None => current,
        };

        self.registrar
            .set_metadata(tenant, doi, &document)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::SetMetadata, Some(doi), e))?;
        self.registrar
            .delete_metadata(tenant, doi)
            .await
            .map_err(|e| SagaError::remote(RegistrarOperation::DeleteMetadata, Some(doi), e))?;

        tracing::info!(%doi, duplicate = duplicate_of.is_some(), "identifier deregistered");
        Ok(TransitionOutcome::Deregistered {
            doi: doi.clone(),
            duplicate_of,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_make_findable_prefers_doi() {
        let doi = Doi::new("10.5072", "a").unwrap();
        let existing = Doi::new("10.5072", "b").unwrap();
        let data = MakeFindableData {
            doi: None,
            existing_doi: Some(existing.clone()),
            resource_uri: Url::parse("https://x/pub/1").unwrap(),
            tenant_id: TenantId::new("unit"),
            duplicate_of: None,
        };
        assert_eq!(TransitionRequest::from(&data).doi, Some(existing));

        let data = MakeFindableData {
            doi: Some(doi.clone()),
            ..data
        };
        assert_eq!(TransitionRequest::from(&data).doi, Some(doi));
    }

    #[test]
    fn test_outcome_doi() {
        let doi = Doi::new("10.5072", "a").unwrap();
        assert_eq!(
            TransitionOutcome::DraftDeleted { doi: doi.clone() }.doi(),
            Some(&doi)
        );
        assert_eq!(
            TransitionOutcome::Unchanged {
                doi: None,
                state: None
            }
            .doi(),
            None
        );
    }
}
