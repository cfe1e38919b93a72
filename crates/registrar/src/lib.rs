//! Client for the DOI registrar.
//!
//! The registrar exposes two independent HTTP APIs: the legacy metadata API
//! (MDS), which takes XML metadata and landing pages, and the REST API, which
//! mints draft identifiers and reports their state. [`RegistrarClient`] maps
//! each remote primitive to one request and one typed result; it never retries.
//! Retries belong to the sagas' callers, which know the compensation semantics.

pub mod client;
pub mod datacite;
pub mod dto;
pub mod error;
pub mod memory;
pub mod metadata;
pub mod state;
pub mod tenant;

pub use client::{RegistrarClient, RegistrarOperation};
pub use datacite::DataCiteClient;
pub use error::{ConfigError, RegistrarError, Result};
pub use memory::{InMemoryRegistrar, RegistrarCall};
pub use metadata::MetadataDocument;
pub use state::IdentifierState;
pub use tenant::{TenantConfig, TenantConfigProvider};
