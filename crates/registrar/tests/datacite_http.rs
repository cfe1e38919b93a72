//! Integration tests for the HTTP registrar client against a fake registrar.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use common::{Doi, TenantId};
use registrar::{
    DataCiteClient, IdentifierState, MetadataDocument, RegistrarClient, RegistrarError,
    TenantConfig,
};
use url::Url;

const EXPECTED_AUTH: &str = "Basic VU5JVC5SRVBPOnB3";

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    fn push(&self, line: String) {
        self.requests.lock().unwrap().push(line);
    }

    fn all(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(EXPECTED_AUTH)
}

fn doi_path(raw: &str) -> String {
    raw.trim_start_matches('/').to_string()
}

async fn create_doi(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    rec.push(format!("POST /dois {body}"));
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, "bad credentials".to_string());
    }
    let request: serde_json::Value = serde_json::from_str(&body).unwrap();
    let prefix = request["data"]["attributes"]["prefix"].as_str().unwrap().to_string();
    let response = serde_json::json!({
        "data": {
            "id": format!("{prefix}/minted-1"),
            "type": "dois",
            "attributes": {
                "doi": format!("{prefix}/minted-1"),
                "prefix": prefix,
                "suffix": "minted-1",
                "state": "draft"
            }
        }
    });
    (StatusCode::CREATED, response.to_string())
}

async fn get_doi_state(Path(doi): Path<String>) -> impl IntoResponse {
    let doi = doi_path(&doi);
    if doi.ends_with("slow") {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    let state = if doi.ends_with("findable") {
        "findable"
    } else if doi.ends_with("odd") {
        "flagged"
    } else {
        "draft"
    };
    let body = serde_json::json!({"data": {"id": doi, "attributes": {"state": state}}});
    (StatusCode::OK, body.to_string())
}

async fn post_metadata(
    State(rec): State<Recorded>,
    Path(doi): Path<String>,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    rec.push(format!("POST /metadata/{} [{content_type}] {body}", doi_path(&doi)));
    if authorized(&headers) {
        StatusCode::CREATED
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn get_metadata(Path(doi): Path<String>) -> impl IntoResponse {
    if doi_path(&doi).ends_with("missing") {
        return (StatusCode::NOT_FOUND, "DOI not found".to_string());
    }
    (StatusCode::OK, "<resource><title>t</title></resource>".to_string())
}

async fn delete_metadata(State(rec): State<Recorded>, Path(doi): Path<String>) -> StatusCode {
    rec.push(format!("DELETE /metadata/{}", doi_path(&doi)));
    StatusCode::OK
}

async fn put_landing_page(
    State(rec): State<Recorded>,
    Path(doi): Path<String>,
    body: String,
) -> impl IntoResponse {
    let doi = doi_path(&doi);
    rec.push(format!("PUT /doi/{doi} {body}"));
    if doi.ends_with("locked") {
        return (StatusCode::UNAUTHORIZED, "bad credentials".to_string());
    }
    (StatusCode::CREATED, "OK".to_string())
}

async fn get_landing_page(Path(_doi): Path<String>) -> &'static str {
    "https://x/pub/1\n"
}

async fn delete_draft(Path(doi): Path<String>) -> StatusCode {
    if doi_path(&doi).ends_with("findable") {
        StatusCode::METHOD_NOT_ALLOWED
    } else {
        StatusCode::OK
    }
}

async fn spawn_registrar() -> (Url, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/dois", post(create_doi))
        .route("/dois/{*doi}", get(get_doi_state))
        .route("/metadata/{*doi}", post(post_metadata).get(get_metadata).delete(delete_metadata))
        .route("/doi/{*doi}", get(get_landing_page).put(put_landing_page).delete(delete_draft))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (Url::parse(&format!("http://{addr}")).unwrap(), recorded)
}

fn tenant(base: &Url) -> TenantConfig {
    TenantConfig {
        tenant_id: TenantId::new("unit"),
        prefix: "10.5072".to_string(),
        username: "UNIT.REPO".to_string(),
        password: "pw".to_string(),
        mds_url: base.clone(),
        rest_url: base.clone(),
    }
}

fn client() -> DataCiteClient {
    DataCiteClient::new(DataCiteClient::DEFAULT_TIMEOUT).unwrap()
}

#[tokio::test]
async fn test_create_draft_returns_minted_identifier() {
    let (base, recorded) = spawn_registrar().await;

    let doi = client().create_draft(&tenant(&base)).await.unwrap();

    assert_eq!(doi, Doi::new("10.5072", "minted-1").unwrap());
    let requests = recorded.all();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].contains(r#""type":"dois""#));
    assert!(requests[0].contains(r#""prefix":"10.5072""#));
}

#[tokio::test]
async fn test_wrong_credentials_surface_status_and_body() {
    let (base, _) = spawn_registrar().await;
    let mut tenant = tenant(&base);
    tenant.password = "wrong".to_string();

    let err = client().create_draft(&tenant).await.unwrap_err();

    assert_eq!(
        err,
        RegistrarError::Status {
            status: 401,
            body: "bad credentials".to_string()
        }
    );
}

#[tokio::test]
async fn test_set_metadata_posts_xml() {
    let (base, recorded) = spawn_registrar().await;
    let doi = Doi::new("10.5072", "abc").unwrap();

    client()
        .set_metadata(&tenant(&base), &doi, &MetadataDocument::new("<resource/>"))
        .await
        .unwrap();

    assert_eq!(
        recorded.all(),
        vec!["POST /metadata/10.5072/abc [application/xml; charset=UTF-8] <resource/>"]
    );
}

#[tokio::test]
async fn test_set_landing_page_sends_doi_and_url() {
    let (base, recorded) = spawn_registrar().await;
    let doi = Doi::new("10.5072", "abc").unwrap();
    let url = Url::parse("https://x/pub/1").unwrap();

    client().set_landing_page(&tenant(&base), &doi, &url).await.unwrap();

    assert_eq!(
        recorded.all(),
        vec!["PUT /doi/10.5072/abc doi=10.5072/abc\nurl=https://x/pub/1"]
    );
}

#[tokio::test]
async fn test_landing_page_rejection_is_typed() {
    let (base, _) = spawn_registrar().await;
    let doi = Doi::new("10.5072", "locked").unwrap();
    let url = Url::parse("https://x/pub/1").unwrap();

    let err = client()
        .set_landing_page(&tenant(&base), &doi, &url)
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
}

#[tokio::test]
async fn test_delete_draft_of_findable_is_not_draft() {
    let (base, _) = spawn_registrar().await;
    let findable = Doi::new("10.5072", "findable").unwrap();
    let draft = Doi::new("10.5072", "draft").unwrap();

    let err = client().delete_draft(&tenant(&base), &findable).await.unwrap_err();
    assert_eq!(err, RegistrarError::NotDraft { doi: findable });

    client().delete_draft(&tenant(&base), &draft).await.unwrap();
}

#[tokio::test]
async fn test_delete_metadata() {
    let (base, recorded) = spawn_registrar().await;
    let doi = Doi::new("10.5072", "abc").unwrap();

    client().delete_metadata(&tenant(&base), &doi).await.unwrap();

    assert_eq!(recorded.all(), vec!["DELETE /metadata/10.5072/abc"]);
}

#[tokio::test]
async fn test_fetch_state() {
    let (base, _) = spawn_registrar().await;
    let tenant = tenant(&base);

    let findable = Doi::new("10.5072", "findable").unwrap();
    assert_eq!(
        client().fetch_state(&tenant, &findable).await.unwrap(),
        IdentifierState::Findable
    );

    let odd = Doi::new("10.5072", "odd").unwrap();
    assert_eq!(
        client().fetch_state(&tenant, &odd).await.unwrap_err(),
        RegistrarError::UnknownState("flagged".to_string())
    );
}

#[tokio::test]
async fn test_fetch_metadata_and_landing_page() {
    let (base, _) = spawn_registrar().await;
    let tenant = tenant(&base);
    let doi = Doi::new("10.5072", "abc").unwrap();

    let document = client().fetch_metadata(&tenant, &doi).await.unwrap();
    assert_eq!(document.as_str(), "<resource><title>t</title></resource>");

    let landing_page = client().fetch_landing_page(&tenant, &doi).await.unwrap();
    assert_eq!(landing_page.as_str(), "https://x/pub/1");

    let missing = Doi::new("10.5072", "missing").unwrap();
    let err = client().fetch_metadata(&tenant, &missing).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let (base, _) = spawn_registrar().await;
    let client = DataCiteClient::new(Duration::from_millis(100)).unwrap();
    let doi = Doi::new("10.5072", "slow").unwrap();

    let err = client.fetch_state(&tenant(&base), &doi).await.unwrap_err();

    assert!(matches!(err, RegistrarError::Transport(_)));
}

#[tokio::test]
async fn test_unreachable_registrar_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = Url::parse(&format!("http://{addr}")).unwrap();

    let err = client().create_draft(&tenant(&base)).await.unwrap_err();

    assert!(matches!(err, RegistrarError::Transport(_)));
}

#[tokio::test]
async fn test_suffix_with_reserved_characters_stays_in_path() {
    let (base, recorded) = spawn_registrar().await;
    let doi = Doi::new("10.5072", "a?b#c").unwrap();

    client().delete_metadata(&tenant(&base), &doi).await.unwrap();

    assert_eq!(recorded.all(), vec!["DELETE /metadata/10.5072/a?b#c"]);
}

#[tokio::test]
async fn test_unreadable_error_body_is_reported() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Promises more body than it sends, then hangs up.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 4096];
        let _ = socket.read(&mut request).await;
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });
    let base = Url::parse(&format!("http://{addr}")).unwrap();
    let doi = Doi::new("10.5072", "abc").unwrap();

    let err = client().delete_metadata(&tenant(&base), &doi).await.unwrap_err();

    let RegistrarError::Status { status, body } = err else {
        panic!("expected status error, got {err:?}");
    };
    assert_eq!(status, 500);
    assert!(body.starts_with("<unreadable response body:"), "{body}");
}
