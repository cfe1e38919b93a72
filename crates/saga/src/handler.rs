//! Routes lifecycle events to their saga.

use common::LifecycleEvent;
use common::events::{IdentifierApprovedData, MakeFindableData, ResourceRemovedData};
use registrar::{RegistrarClient, TenantConfigProvider};

use crate::creation::CreationSaga;
use crate::error::Result;
use crate::events::{DoiEvent, EventSink};
use crate::removal::RemovalSaga;
use crate::resolver::{Resolution, ResolverError, ResourceResolver};
use crate::transition::{TransitionOutcome, TransitionRequest, TransitionSaga};

/// Runs exactly one saga per lifecycle event and announces the result.
///
/// The outbound event is emitted only after the saga succeeded. A failed
/// emission does not fail the handled event: the registrar change already
/// happened, and redelivering an approval would mint a second identifier.
/// Emission failures are logged and counted in `doi_events_emit_failed_total`.
pub struct LifecycleHandler<R, V, E> {
    creation: CreationSaga<R>,
    transition: TransitionSaga<R, V>,
    removal: RemovalSaga<R>,
    resolver: V,
    events: E,
}

impl<R, V, E> LifecycleHandler<R, V, E>
where
    R: RegistrarClient + Clone,
    V: ResourceResolver + Clone,
    E: EventSink,
{
    /// Creates a handler whose sagas share one registrar client and tenant lookup.
    pub fn new(registrar: R, resolver: V, tenants: TenantConfigProvider, events: E) -> Self {
        Self {
            creation: CreationSaga::new(registrar.clone(), tenants.clone()),
            transition: TransitionSaga::new(registrar.clone(), resolver.clone(), tenants.clone()),
            removal: RemovalSaga::new(registrar, tenants),
            resolver,
            events,
        }
    }

    /// Handles one lifecycle event and returns the outbound event for it.
    #[tracing::instrument(skip_all, fields(event_type = event.event_type(), tenant = %event.tenant_id()))]
    pub async fn handle(&self, event: &LifecycleEvent) -> Result<DoiEvent> {
        let outbound = match event {
            LifecycleEvent::IdentifierApproved(data) => self.approved(data).await?,
            LifecycleEvent::MakeFindable(data) => self.make_findable(data).await?,
            LifecycleEvent::ResourceRemoved(data) => self.removed(data).await?,
        };

        if let Err(e) = self.events.emit(&outbound).await {
            metrics::counter!(
                "doi_events_emit_failed_total",
                "event_type" => outbound.event_type()
            )
            .increment(1);
            tracing::error!(
                event_type = outbound.event_type(),
                doi = ?outbound.data().doi,
                error = %e,
                "registrar change applied but outbound event was not emitted"
            );
        }
        Ok(outbound)
    }

    async fn approved(&self, data: &IdentifierApprovedData) -> Result<DoiEvent> {
        let document = match self.resolver.resolve(&data.resource_uri).await? {
            Resolution::Document(document) => document,
            other => {
                return Err(ResolverError::Unavailable {
                    uri: data.resource_uri.clone(),
                    resolution: other.as_str(),
                }
                .into());
            }
        };

        let doi = self
            .creation
            .execute(&data.tenant_id, &document, &data.resource_uri)
            .await?;
        Ok(DoiEvent::created(&data.tenant_id, &doi, &data.resource_uri))
    }

    async fn make_findable(&self, data: &MakeFindableData) -> Result<DoiEvent> {
        let request = TransitionRequest::from(data);
        let tenant_id = &request.tenant_id;
        let event = match self.transition.execute(&request).await? {
            TransitionOutcome::Findable { doi, minted: true } => {
                DoiEvent::created(tenant_id, &doi, &request.resource_uri)
            }
            TransitionOutcome::Findable { doi, minted: false } => {
                DoiEvent::findable(tenant_id, &doi, &request.resource_uri)
            }
            TransitionOutcome::Deregistered { doi, duplicate_of } => {
                DoiEvent::deregistered(tenant_id, &doi, duplicate_of.as_ref())
            }
            TransitionOutcome::DraftDeleted { doi } => DoiEvent::draft_deleted(tenant_id, &doi),
            TransitionOutcome::Unchanged { doi, state } => {
                DoiEvent::unchanged(tenant_id, doi.as_ref(), state)
            }
        };
        Ok(event)
    }

    async fn removed(&self, data: &ResourceRemovedData) -> Result<DoiEvent> {
        tracing::debug!(resource_id = %data.resource_id, "resource removed");
        self.removal.execute(&data.tenant_id, &data.doi).await?;
        Ok(DoiEvent::draft_deleted(&data.tenant_id, &data.doi))
    }
}
