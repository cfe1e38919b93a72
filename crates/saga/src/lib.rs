//! Saga pattern implementation for the DOI lifecycle.
//!
//! The registrar offers no multi-step transactions, so each lifecycle change
//! is a saga: a sequence of registrar calls with a compensating action for
//! every step that can leave remote state half-done.
//!
//! - [`CreationSaga`]: create draft, set metadata, set landing page. A failed
//!   landing page deletes the metadata again.
//! - [`TransitionSaga`]: makes an identifier findable, moves it back to
//!   registered, or deletes its draft, depending on the observed registrar
//!   state and source resource.
//! - [`RemovalSaga`]: deletes draft identifiers of removed resources.
//!
//! [`LifecycleHandler`] routes each inbound lifecycle event to one saga run and
//! emits a [`DoiEvent`] once it succeeds. Nothing is persisted between runs;
//! callers re-drive failures by redelivering the event.

pub mod creation;
pub mod error;
pub mod events;
pub mod handler;
pub mod relations;
pub mod removal;
pub mod resolver;
pub mod state;
pub mod transition;

pub use creation::CreationSaga;
pub use error::{Result, SagaError};
pub use events::{DoiEvent, DoiEventData, EventSink, InMemoryEventSink, SinkError, TracingEventSink};
pub use handler::LifecycleHandler;
pub use relations::{MetadataError, RelatedIdentifier, add_duplicate_relation};
pub use removal::RemovalSaga;
pub use resolver::{
    HttpResourceResolver, InMemoryResolver, Resolution, ResolverError, ResourceResolver,
};
pub use state::SagaState;
pub use transition::{TransitionOutcome, TransitionRequest, TransitionSaga};
