//! In-memory registrar for testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::Doi;
use url::Url;

use crate::client::{RegistrarClient, RegistrarOperation};
use crate::error::{RegistrarError, Result};
use crate::metadata::MetadataDocument;
use crate::state::IdentifierState;
use crate::tenant::TenantConfig;

/// A call received by the in-memory registrar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrarCall {
    /// The primitive that was invoked.
    pub operation: RegistrarOperation,
    /// The identifier it targeted; `None` for draft creation.
    pub doi: Option<Doi>,
    /// Metadata submitted with `set_metadata`.
    pub document: Option<MetadataDocument>,
}

#[derive(Debug, Clone)]
struct IdentifierRecord {
    state: IdentifierState,
    metadata: Option<MetadataDocument>,
    metadata_active: bool,
    landing_page: Option<Url>,
}

impl IdentifierRecord {
    fn draft() -> Self {
        Self {
            state: IdentifierState::Draft,
            metadata: None,
            metadata_active: false,
            landing_page: None,
        }
    }
}

#[derive(Debug, Default)]
struct InMemoryRegistrarState {
    identifiers: HashMap<Doi, IdentifierRecord>,
    failures: HashMap<RegistrarOperation, RegistrarError>,
    calls: Vec<RegistrarCall>,
    next_id: u32,
}

/// In-memory registrar modelling the remote lifecycle, for testing.
///
/// Failures can be injected per operation; every call is recorded.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistrar {
    state: Arc<RwLock<InMemoryRegistrarState>>,
}

impl InMemoryRegistrar {
    /// Creates an empty in-memory registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call to `operation` fail with `error`.
    pub fn set_failure(&self, operation: RegistrarOperation, error: RegistrarError) {
        self.state.write().unwrap().failures.insert(operation, error);
    }

    /// Removes an injected failure.
    pub fn clear_failure(&self, operation: RegistrarOperation) {
        self.state.write().unwrap().failures.remove(&operation);
    }

    /// Registers an identifier that already exists remotely.
    pub fn seed(&self, doi: Doi, state: IdentifierState, metadata: Option<MetadataDocument>) {
        let active = metadata.is_some() && state != IdentifierState::Registered;
        let landing_page = (state == IdentifierState::Findable)
            .then(|| Url::parse(&doi.to_uri()).ok())
            .flatten();
        self.state.write().unwrap().identifiers.insert(
            doi,
            IdentifierRecord {
                state,
                metadata,
                metadata_active: active,
                landing_page,
            },
        );
    }

    /// Returns every call received so far, in order.
    pub fn calls(&self) -> Vec<RegistrarCall> {
        self.state.read().unwrap().calls.clone()
    }

    /// Returns the operations received so far, in order.
    pub fn operations(&self) -> Vec<RegistrarOperation> {
        self.state
            .read()
            .unwrap()
            .calls
            .iter()
            .map(|call| call.operation)
            .collect()
    }

    /// Returns how many times `operation` was called.
    pub fn call_count(&self, operation: RegistrarOperation) -> usize {
        self.state
            .read()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Returns the identifier's state, or `None` if it does not exist.
    pub fn state_of(&self, doi: &Doi) -> Option<IdentifierState> {
        self.state.read().unwrap().identifiers.get(doi).map(|r| r.state)
    }

    /// Returns the stored metadata, active or not.
    pub fn metadata_of(&self, doi: &Doi) -> Option<MetadataDocument> {
        self.state
            .read()
            .unwrap()
            .identifiers
            .get(doi)
            .and_then(|r| r.metadata.clone())
    }

    /// Returns true if the identifier has active metadata.
    pub fn has_active_metadata(&self, doi: &Doi) -> bool {
        self.state
            .read()
            .unwrap()
            .identifiers
            .get(doi)
            .is_some_and(|r| r.metadata.is_some() && r.metadata_active)
    }

    /// Returns the registered landing page.
    pub fn landing_page_of(&self, doi: &Doi) -> Option<Url> {
        self.state
            .read()
            .unwrap()
            .identifiers
            .get(doi)
            .and_then(|r| r.landing_page.clone())
    }

    /// Returns the number of identifiers known to the registrar.
    pub fn identifier_count(&self) -> usize {
        self.state.read().unwrap().identifiers.len()
    }

    fn record_call(
        state: &mut InMemoryRegistrarState,
        operation: RegistrarOperation,
        doi: Option<&Doi>,
        document: Option<&MetadataDocument>,
    ) -> Result<()> {
        state.calls.push(RegistrarCall {
            operation,
            doi: doi.cloned(),
            document: document.cloned(),
        });
        match state.failures.get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn not_found(doi: &Doi) -> RegistrarError {
    RegistrarError::Status {
        status: 404,
        body: format!("DOI {doi} not found"),
    }
}

#[async_trait]
impl RegistrarClient for InMemoryRegistrar {
    async fn create_draft(&self, tenant: &TenantConfig) -> Result<Doi> {
        let mut state = self.state.write().unwrap();
        Self::record_call(&mut state, RegistrarOperation::CreateDraft, None, None)?;

        state.next_id += 1;
        let doi = Doi::new(tenant.prefix.as_str(), format!("draft-{:04}", state.next_id))
            .map_err(|e| RegistrarError::Status {
                status: 422,
                body: e.to_string(),
            })?;
        state.identifiers.insert(doi.clone(), IdentifierRecord::draft());
        Ok(doi)
    }

    async fn set_metadata(
        &self,
        _tenant: &TenantConfig,
        doi: &Doi,
        document: &MetadataDocument,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        Self::record_call(
            &mut state,
            RegistrarOperation::SetMetadata,
            Some(doi),
            Some(document),
        )?;

        let record = state
            .identifiers
            .entry(doi.clone())
            .or_insert_with(IdentifierRecord::draft);
        record.metadata = Some(document.clone());
        record.metadata_active = true;
        Ok(())
    }

    async fn set_landing_page(&self, _tenant: &TenantConfig, doi: &Doi, url: &Url) -> Result<()> {
        let mut state = self.state.write().unwrap();
        Self::record_call(&mut state, RegistrarOperation::SetLandingPage, Some(doi), None)?;

        let record = state.identifiers.get_mut(doi).ok_or_else(|| not_found(doi))?;
        if record.metadata.is_none() {
            return Err(RegistrarError::Status {
                status: 412,
                body: "metadata must be uploaded first".to_string(),
            });
        }
        record.landing_page = Some(url.clone());
        if record.metadata_active {
            record.state = IdentifierState::Findable;
        }
        Ok(())
    }

    async fn delete_metadata(&self, _tenant: &TenantConfig, doi: &Doi) -> Result<()> {
        let mut state = self.state.write().unwrap();
        Self::record_call(&mut state, RegistrarOperation::DeleteMetadata, Some(doi), None)?;

        let record = state.identifiers.get_mut(doi).ok_or_else(|| not_found(doi))?;
        record.metadata_active = false;
        if record.state == IdentifierState::Findable {
            record.state = IdentifierState::Registered;
        }
        Ok(())
    }

    async fn delete_draft(&self, _tenant: &TenantConfig, doi: &Doi) -> Result<()> {
        let mut state = self.state.write().unwrap();
        Self::record_call(&mut state, RegistrarOperation::DeleteDraft, Some(doi), None)?;

        let record = state.identifiers.get(doi).ok_or_else(|| not_found(doi))?;
        if !record.state.can_delete() {
            return Err(RegistrarError::NotDraft { doi: doi.clone() });
        }
        state.identifiers.remove(doi);
        Ok(())
    }

    async fn fetch_state(&self, _tenant: &TenantConfig, doi: &Doi) -> Result<IdentifierState> {
        let mut state = self.state.write().unwrap();
        Self::record_call(&mut state, RegistrarOperation::FetchState, Some(doi), None)?;

        state
            .identifiers
            .get(doi)
            .map(|r| r.state)
            .ok_or_else(|| not_found(doi))
    }

    async fn fetch_metadata(&self, _tenant: &TenantConfig, doi: &Doi) -> Result<MetadataDocument> {
        let mut state = self.state.write().unwrap();
        Self::record_call(&mut state, RegistrarOperation::FetchMetadata, Some(doi), None)?;

        state
            .identifiers
            .get(doi)
            .and_then(|r| r.metadata.clone())
            .ok_or_else(|| not_found(doi))
    }

    async fn fetch_landing_page(&self, _tenant: &TenantConfig, doi: &Doi) -> Result<Url> {
        let mut state = self.state.write().unwrap();
        Self::record_call(&mut state, RegistrarOperation::FetchLandingPage, Some(doi), None)?;

        state
            .identifiers
            .get(doi)
            .and_then(|r| r.landing_page.clone())
            .ok_or_else(|| not_found(doi))
    }
}
