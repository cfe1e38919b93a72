//! Shared types for DOI lifecycle orchestration.
//!
//! Holds the identifier value types and the inbound lifecycle events that
//! every other crate in the workspace speaks.

pub mod events;
pub mod types;

pub use events::LifecycleEvent;
pub use types::{Doi, DoiParseError, TenantId};
