//! Fan-out of resource changes to the lifecycle event bus.
//!
//! This crate turns storage change records into lifecycle events and
//! delivers them in batches:
//! - [`ChangeRecord::classify`] decides which change triggers which event
//! - [`BatchPublisher`] submits a batch and resubmits only the failed subset,
//!   up to a bounded number of attempts
//! - [`FanOut`] ties both together and sends the residue to a [`DeadLetterSink`]

pub mod batch;
pub mod change;
pub mod dead_letter;
pub mod error;
pub mod publisher;
pub mod stage;
pub mod transport;

pub use batch::{Batch, BatchEntry, FailedEntry, PartialResult};
pub use change::{ChangeRecord, DoiRequest, ResourceImage, ResourceStatus};
pub use dead_letter::{DeadLetterSink, InMemoryDeadLetterSink, TracingDeadLetterSink};
pub use error::{FanOutError, Result, TransportError};
pub use publisher::{BatchPublisher, DEFAULT_MAX_ATTEMPTS};
pub use stage::{FanOut, FanOutReport};
pub use transport::{BatchTransport, InMemoryBusTransport};
