//! HTTP implementation of [`RegistrarClient`] against DataCite.

use std::time::Duration;

use async_trait::async_trait;
use common::Doi;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use url::Url;

use crate::client::{RegistrarClient, RegistrarOperation};
use crate::dto::{self, CreateDraftRequest, DoiDocument, JSON_API_CONTENT_TYPE};
use crate::error::{RegistrarError, Result};
use crate::metadata::{METADATA_CONTENT_TYPE, MetadataDocument};
use crate::state::IdentifierState;
use crate::tenant::TenantConfig;

/// Registrar client speaking the DataCite MDS and REST APIs.
///
/// Holds one connection pool shared by all tenants; it is safe to use from
/// concurrent saga runs.
#[derive(Debug, Clone)]
pub struct DataCiteClient {
    http: Client,
}

impl DataCiteClient {
    /// Timeout applied to every registrar call unless configured otherwise.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Creates a client whose calls time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistrarError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    fn mds(&self, tenant: &TenantConfig, resource: &str, doi: &Doi) -> Result<Url> {
        doi_endpoint(&tenant.mds_url, resource, doi)
    }

    fn authorized(&self, builder: RequestBuilder, tenant: &TenantConfig) -> RequestBuilder {
        builder.basic_auth(&tenant.username, Some(&tenant.password))
    }

    async fn send(&self, operation: RegistrarOperation, request: RequestBuilder) -> Result<Response> {
        let result = request.send().await;
        let outcome = match &result {
            Ok(response) if response.status().is_success() => "success",
            Ok(_) => "rejected",
            Err(_) => "transport_error",
        };
        metrics::counter!(
            "registrar_requests_total",
            "operation" => operation.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        let response = result?;
        tracing::debug!(%operation, status = response.status().as_u16(), "registrar responded");
        Ok(response)
    }
}

/// Appends path segments to a configured base URL, keeping any base path.
///
/// Each segment is percent-encoded, so `?` or `#` never leave the path.
fn endpoint<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| RegistrarError::Decode(format!("registrar URL {base} cannot carry a path")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `{base}/{resource}/{prefix}/{suffix}`. Slashes inside the suffix stay
/// path separators, as the registrar expects.
fn doi_endpoint(base: &Url, resource: &str, doi: &Doi) -> Result<Url> {
    endpoint(
        base,
        [resource, doi.prefix()]
            .into_iter()
            .chain(doi.suffix().split('/')),
    )
}

/// Turns a non-2xx response into an error carrying status and body.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable response body: {e}>"),
    };
    Err(RegistrarError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RegistrarClient for DataCiteClient {
    #[tracing::instrument(skip_all, fields(tenant = %tenant.tenant_id, prefix = %tenant.prefix))]
    async fn create_draft(&self, tenant: &TenantConfig) -> Result<Doi> {
        let url = endpoint(&tenant.rest_url, ["dois"])?;
        let body = serde_json::to_vec(&CreateDraftRequest::for_prefix(&tenant.prefix))
            .map_err(|e| RegistrarError::Decode(e.to_string()))?;
        let request = self
            .authorized(self.http.post(url), tenant)
            .header(CONTENT_TYPE, JSON_API_CONTENT_TYPE)
            .body(body);

        let response = ensure_success(self.send(RegistrarOperation::CreateDraft, request).await?).await?;
        let document: DoiDocument = response.json().await?;
        let doi = document.doi()?;
        tracing::info!(%doi, "draft identifier created");
        Ok(doi)
    }

    #[tracing::instrument(skip_all, fields(tenant = %tenant.tenant_id, %doi))]
    async fn set_metadata(
        &self,
        tenant: &TenantConfig,
        doi: &Doi,
        document: &MetadataDocument,
    ) -> Result<()> {
        let url = self.mds(tenant, "metadata", doi)?;
        let request = self
            .authorized(self.http.post(url), tenant)
            .header(CONTENT_TYPE, METADATA_CONTENT_TYPE)
            .body(document.as_str().to_string());
        ensure_success(self.send(RegistrarOperation::SetMetadata, request).await?).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(tenant = %tenant.tenant_id, %doi, %url))]
    async fn set_landing_page(&self, tenant: &TenantConfig, doi: &Doi, url: &Url) -> Result<()> {
        let endpoint = self.mds(tenant, "doi", doi)?;
        let request = self
            .authorized(self.http.put(endpoint), tenant)
            .header(CONTENT_TYPE, "text/plain; charset=UTF-8")
            .body(dto::landing_page_body(doi, url));
        ensure_success(self.send(RegistrarOperation::SetLandingPage, request).await?).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(tenant = %tenant.tenant_id, %doi))]
    async fn delete_metadata(&self, tenant: &TenantConfig, doi: &Doi) -> Result<()> {
        let url = self.mds(tenant, "metadata", doi)?;
        let request = self.authorized(self.http.delete(url), tenant);
        ensure_success(self.send(RegistrarOperation::DeleteMetadata, request).await?).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(tenant = %tenant.tenant_id, %doi))]
    async fn delete_draft(&self, tenant: &TenantConfig, doi: &Doi) -> Result<()> {
        let url = self.mds(tenant, "doi", doi)?;
        let request = self.authorized(self.http.delete(url), tenant);
        let response = self.send(RegistrarOperation::DeleteDraft, request).await?;
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            return Err(RegistrarError::NotDraft { doi: doi.clone() });
        }
        ensure_success(response).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(tenant = %tenant.tenant_id, %doi))]
    async fn fetch_state(&self, tenant: &TenantConfig, doi: &Doi) -> Result<IdentifierState> {
        let url = doi_endpoint(&tenant.rest_url, "dois", doi)?;
        let request = self
            .authorized(self.http.get(url), tenant)
            .header(ACCEPT, JSON_API_CONTENT_TYPE);
        let response = ensure_success(self.send(RegistrarOperation::FetchState, request).await?).await?;
        let document: DoiDocument = response.json().await?;
        document.state()
    }

    #[tracing::instrument(skip_all, fields(tenant = %tenant.tenant_id, %doi))]
    async fn fetch_metadata(&self, tenant: &TenantConfig, doi: &Doi) -> Result<MetadataDocument> {
        let url = self.mds(tenant, "metadata", doi)?;
        let request = self
            .authorized(self.http.get(url), tenant)
            .header(ACCEPT, "application/xml");
        let response =
            ensure_success(self.send(RegistrarOperation::FetchMetadata, request).await?).await?;
        Ok(MetadataDocument::new(response.text().await?))
    }

    #[tracing::instrument(skip_all, fields(tenant = %tenant.tenant_id, %doi))]
    async fn fetch_landing_page(&self, tenant: &TenantConfig, doi: &Doi) -> Result<Url> {
        let url = self.mds(tenant, "doi", doi)?;
        let request = self.authorized(self.http.get(url), tenant);
        let response =
            ensure_success(self.send(RegistrarOperation::FetchLandingPage, request).await?).await?;
        let text = response.text().await?;
        Url::parse(text.trim()).map_err(|e| RegistrarError::Decode(format!("landing page {text:?}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_keeps_base_path() {
        let doi = Doi::new("10.5072", "abc").unwrap();
        let base = Url::parse("https://registrar.example/api/").unwrap();
        let url = doi_endpoint(&base, "dois", &doi).unwrap();
        assert_eq!(url.as_str(), "https://registrar.example/api/dois/10.5072/abc");

        let bare = Url::parse("https://mds.example").unwrap();
        let url = doi_endpoint(&bare, "metadata", &doi).unwrap();
        assert_eq!(url.as_str(), "https://mds.example/metadata/10.5072/abc");

        let url = endpoint(&bare, ["dois"]).unwrap();
        assert_eq!(url.as_str(), "https://mds.example/dois");
    }

    #[test]
    fn test_suffix_is_percent_encoded() {
        let doi = Doi::new("10.5072", "a?b#c d").unwrap();
        let base = Url::parse("https://mds.example/").unwrap();

        let url = doi_endpoint(&base, "metadata", &doi).unwrap();

        assert_eq!(url.path(), "/metadata/10.5072/a%3Fb%23c%20d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_suffix_slashes_stay_path_separators() {
        let doi: Doi = "10.5072/zenodo/123".parse().unwrap();
        let base = Url::parse("https://mds.example/").unwrap();

        let url = doi_endpoint(&base, "doi", &doi).unwrap();

        assert_eq!(url.path(), "/doi/10.5072/zenodo/123");
    }

    #[test]
    fn test_opaque_base_url_is_rejected() {
        let base = Url::parse("mailto:registrar@example.org").unwrap();
        assert!(matches!(
            endpoint(&base, ["dois"]),
            Err(RegistrarError::Decode(_))
        ));
    }
}
