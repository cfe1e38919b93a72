//! Classification of resource change records into lifecycle events.
//!
//! A change record carries the resource as it was before and after a write.
//! Only transitions that matter for the identifier produce an event:
//!
//! - a DOI request becomes approved while no DOI exists: `IdentifierApproved`
//! - a resource with a DOI is published or changed while published: `MakeFindable`
//! - a resource with a DOI is unpublished or marked duplicate: `MakeFindable`,
//!   carrying the duplicate target; the resolver then reports it gone or moved
//! - a resource with a DOI is deleted: `ResourceRemoved` for a draft DOI,
//!   `MakeFindable` for a public one so it is de-registered instead

use common::events::MakeFindableData;
use common::{Doi, LifecycleEvent, TenantId};
use serde::{Deserialize, Serialize};
use url::Url;

/// Publication status of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Draft,
    Published,
    Unpublished,
    Duplicate,
    Deleted,
}

/// Progress of a tenant's request for a DOI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoiRequest {
    #[default]
    None,
    Requested,
    Approved,
}

/// A resource as stored at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceImage {
    pub status: ResourceStatus,
    pub resource_uri: Url,
    #[serde(default)]
    pub doi: Option<Doi>,
    #[serde(default)]
    pub doi_request: DoiRequest,
    /// True once the DOI has been made findable at least once.
    #[serde(default)]
    pub doi_public: bool,
    #[serde(default)]
    pub duplicate_of: Option<Url>,
}

/// One storage change of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub resource_id: String,
    pub tenant_id: TenantId,
    #[serde(default)]
    pub old_image: Option<ResourceImage>,
    #[serde(default)]
    pub new_image: Option<ResourceImage>,
}

impl ChangeRecord {
    /// Returns the lifecycle event this change triggers, if any.
    pub fn classify(&self) -> Option<LifecycleEvent> {
        let old = self.old_image.as_ref();
        let new = match &self.new_image {
            Some(new) if new.status != ResourceStatus::Deleted => new,
            deleted => return self.removed(deleted.as_ref().or(old)),
        };

        let Some(doi) = &new.doi else {
            let newly_approved = new.doi_request == DoiRequest::Approved
                && old.is_none_or(|o| o.doi_request != DoiRequest::Approved);
            return newly_approved.then(|| {
                LifecycleEvent::identifier_approved(
                    self.tenant_id.clone(),
                    new.resource_uri.clone(),
                )
            });
        };

        match new.status {
            ResourceStatus::Published if old != Some(new) => Some(self.make_findable(doi, new)),
            ResourceStatus::Unpublished | ResourceStatus::Duplicate
                if old.is_none_or(|o| o.status != new.status) =>
            {
                Some(self.make_findable(doi, new))
            }
            _ => None,
        }
    }

    fn removed(&self, last: Option<&ResourceImage>) -> Option<LifecycleEvent> {
        let last = last?;
        let doi = last
            .doi
            .as_ref()
            .or_else(|| self.old_image.as_ref().and_then(|o| o.doi.as_ref()))?;
        let public = last.doi_public || self.old_image.as_ref().is_some_and(|o| o.doi_public);

        if public {
            Some(self.make_findable(doi, last))
        } else {
            Some(LifecycleEvent::resource_removed(
                doi.clone(),
                self.resource_id.clone(),
                self.tenant_id.clone(),
            ))
        }
    }

    fn make_findable(&self, doi: &Doi, image: &ResourceImage) -> LifecycleEvent {
        LifecycleEvent::MakeFindable(MakeFindableData {
            doi: Some(doi.clone()),
            existing_doi: None,
            resource_uri: image.resource_uri.clone(),
            tenant_id: self.tenant_id.clone(),
            duplicate_of: image.duplicate_of.clone(),
        })
    }
}
