//! Inbound lifecycle events that trigger saga runs.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::types::{Doi, TenantId};

/// A lifecycle event delivered by the messaging layer.
///
/// Each event drives exactly one saga run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum LifecycleEvent {
    /// A tenant's request for a new identifier was approved.
    IdentifierApproved(IdentifierApprovedData),

    /// A resource changed and its identifier should reflect the change.
    MakeFindable(MakeFindableData),

    /// A resource was removed before its identifier became public.
    ResourceRemoved(ResourceRemovedData),
}

/// Data for IdentifierApproved event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierApprovedData {
    /// Tenant whose prefix the identifier is minted under.
    pub tenant_id: TenantId,
    /// Resource the identifier will point at.
    pub resource_uri: Url,
}

/// Data for MakeFindable event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MakeFindableData {
    /// Identifier carried by the event, if one was already assigned.
    #[serde(default)]
    pub doi: Option<Doi>,
    /// Identifier previously recorded on the resource.
    #[serde(default)]
    pub existing_doi: Option<Doi>,
    /// Landing page of the resource.
    pub resource_uri: Url,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Resource this one duplicates, when it was merged into another.
    #[serde(default)]
    pub duplicate_of: Option<Url>,
}

impl MakeFindableData {
    /// Identifier the transition applies to: the event's own, else the one
    /// already recorded on the resource.
    pub fn effective_doi(&self) -> Option<&Doi> {
        self.doi.as_ref().or(self.existing_doi.as_ref())
    }
}

/// Data for ResourceRemoved event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRemovedData {
    /// Identifier reserved for the removed resource.
    pub doi: Doi,
    /// Local identifier of the removed resource.
    pub resource_id: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
}

impl LifecycleEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            LifecycleEvent::IdentifierApproved(_) => "IdentifierApproved",
            LifecycleEvent::MakeFindable(_) => "MakeFindable",
            LifecycleEvent::ResourceRemoved(_) => "ResourceRemoved",
        }
    }

    /// Returns the tenant the event belongs to.
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            LifecycleEvent::IdentifierApproved(data) => &data.tenant_id,
            LifecycleEvent::MakeFindable(data) => &data.tenant_id,
            LifecycleEvent::ResourceRemoved(data) => &data.tenant_id,
        }
    }

    /// Creates an IdentifierApproved event.
    pub fn identifier_approved(tenant_id: impl Into<TenantId>, resource_uri: Url) -> Self {
        LifecycleEvent::IdentifierApproved(IdentifierApprovedData {
            tenant_id: tenant_id.into(),
            resource_uri,
        })
    }

    /// Creates a MakeFindable event for an identifier that already exists.
    pub fn make_findable(doi: Doi, tenant_id: impl Into<TenantId>, resource_uri: Url) -> Self {
        LifecycleEvent::MakeFindable(MakeFindableData {
            doi: Some(doi),
            existing_doi: None,
            resource_uri,
            tenant_id: tenant_id.into(),
            duplicate_of: None,
        })
    }

    /// Creates a ResourceRemoved event.
    pub fn resource_removed(
        doi: Doi,
        resource_id: impl Into<String>,
        tenant_id: impl Into<TenantId>,
    ) -> Self {
        LifecycleEvent::ResourceRemoved(ResourceRemovedData {
            doi,
            resource_id: resource_id.into(),
            tenant_id: tenant_id.into(),
        })
    }
}
