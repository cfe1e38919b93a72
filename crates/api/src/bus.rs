//! In-process bus delivering fan-out entries straight to the lifecycle handler.

use std::sync::Arc;

use async_trait::async_trait;
use fanout::{Batch, BatchTransport, FailedEntry, PartialResult, TransportError};
use registrar::RegistrarClient;
use saga::{EventSink, LifecycleHandler, ResourceResolver, SagaError};

/// Bus for single-process deployments: an entry is accepted once its saga succeeds.
///
/// Entries are handled one after another, in batch order.
pub struct InProcessBus<R, V, E> {
    handler: Arc<LifecycleHandler<R, V, E>>,
}

impl<R, V, E> InProcessBus<R, V, E> {
    pub fn new(handler: Arc<LifecycleHandler<R, V, E>>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<R, V, E> BatchTransport for InProcessBus<R, V, E>
where
    R: RegistrarClient + Clone + 'static,
    V: ResourceResolver + Clone + 'static,
    E: EventSink + 'static,
{
    async fn submit(&self, batch: &Batch) -> Result<PartialResult, TransportError> {
        let mut result = PartialResult::success();
        for entry in batch.entries() {
            let event = match entry.to_event() {
                Ok(event) => event,
                Err(e) => {
                    result
                        .failed
                        .push(FailedEntry::new(entry.clone()).with_error("InvalidPayload", e.to_string()));
                    continue;
                }
            };
            if let Err(e) = self.handler.handle(&event).await {
                tracing::warn!(source_ref = %entry.source_ref, error = %e, "entry not processed");
                result
                    .failed
                    .push(FailedEntry::new(entry.clone()).with_error(error_code(&e), e.to_string()));
            }
        }
        Ok(result)
    }
}

/// Short code naming the kind of saga failure.
pub fn error_code(err: &SagaError) -> &'static str {
    match err {
        _ if err.is_not_draft() => "NotDraft",
        SagaError::Remote { .. } => "RegistrarError",
        SagaError::CompensationFailed { .. } => "CompensationFailed",
        SagaError::Configuration(_) => "ConfigurationError",
        SagaError::Resolver(_) => "ResolverError",
        SagaError::Metadata { .. } => "MetadataError",
    }
}
