//! `reqwest` implementation of [`FileApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};
use url::Url;

use cloudnest_core::config::api::ApiConfig;
use cloudnest_core::error::{AppError, ErrorKind};
use cloudnest_core::result::AppResult;
use cloudnest_core::types::{ItemId, PageRequest, PageResponse};
use cloudnest_entity::Item;

use crate::api::{FileApi, ListQuery, MoveDestination, UploadFile};
use crate::envelope::{DownloadEnvelope, ItemEnvelope, ListEnvelope, UploadEnvelope};
use crate::token::TokenStore;

/// Longest response body excerpt carried into error messages.
const BODY_EXCERPT: usize = 200;

/// HTTP client for the file backend.
#[derive(Debug, Clone)]
pub struct HttpFileApi {
    /// Shared connection pool.
    client: Client,
    /// API root, always ending in `/`.
    base_url: Url,
    /// Bearer token source.
    tokens: TokenStore,
    /// Page size for listings.
    page_size: u32,
}

impl HttpFileApi {
    /// Build a client from configuration.
    pub fn new(config: &ApiConfig, tokens: TokenStore) -> AppResult<Self> {
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).map_err(|e| {
            AppError::with_source(
                ErrorKind::Configuration,
                format!("Invalid api.base_url '{}'", config.base_url),
                e,
            )
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url,
            tokens,
            page_size: config.page_size,
        })
    }

    /// The API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        self.base_url.join(path).map_err(|e| {
            AppError::with_source(ErrorKind::Internal, format!("Bad endpoint path '{path}'"), e)
        })
    }

    fn list_url(&self, query: &ListQuery) -> AppResult<Url> {
        let mut url = self.endpoint("files")?;
        let page = if query.page == PageRequest::default() {
            PageRequest::new(query.page.page, self.page_size)
        } else {
            query.page
        };
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(parent) = &query.parent_id {
                pairs.append_pair("parent_id", parent.as_str());
            }
            if let Some(search) = &query.search {
                pairs.append_pair("search", search);
            }
            if let Some(id) = &query.id {
                pairs.append_pair("id", id.as_str());
            }
            if let Some(user) = &query.user_id {
                pairs.append_pair("user_id", user);
            }
            pairs.append_pair("page", &page.page.to_string());
            pairs.append_pair("per_page", &page.per_page.to_string());
        }
        Ok(url)
    }

    /// Attach the bearer token, or fail before any network traffic.
    fn authorize(&self, request: RequestBuilder) -> AppResult<RequestBuilder> {
        match self.tokens.token()? {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Err(AppError::authentication("No access token stored")),
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> AppResult<Response> {
        let response = self
            .authorize(request)?
            .send()
            .await
            .map_err(|e| transport_error(e, what))?;
        check_response(response, what).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> AppResult<T> {
        let response = self.send(request, what).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, what))?;
        serde_json::from_slice(&body).map_err(|e| {
            AppError::with_source(
                ErrorKind::Serialization,
                format!("{what}: unexpected response shape"),
                e,
            )
        })
    }

    async fn post_ids(&self, path: &str, ids: &[ItemId], what: &str) -> AppResult<()> {
        let ids: Vec<&str> = ids.iter().map(ItemId::as_str).collect();
        let request = self
            .client
            .post(self.endpoint(path)?)
            .json(&json!({ "file_ids": ids }));
        self.send(request, what).await?;
        Ok(())
    }
}

#[async_trait]
impl FileApi for HttpFileApi {
    async fn list_items(&self, query: &ListQuery) -> AppResult<PageResponse<Item>> {
        let url = self.list_url(query)?;
        debug!(%url, "Listing items");
        let envelope: ListEnvelope = self.send_json(self.client.get(url), "List items").await?;
        Ok(envelope.into_page(query.page))
    }

    async fn folder_tree(&self) -> AppResult<Vec<Item>> {
        let request = self.client.get(self.endpoint("folders/tree")?);
        let envelope: ListEnvelope = self.send_json(request, "Folder tree").await?;
        Ok(envelope.into_items())
    }

    async fn create_folder(&self, name: &str, parent_id: Option<&ItemId>) -> AppResult<Item> {
        let request = self.client.post(self.endpoint("folders")?).json(&json!({
            "name": name,
            "parent_id": parent_id.map(ItemId::as_str),
        }));
        let envelope: ItemEnvelope = self.send_json(request, "Create folder").await?;
        let folder = envelope.into_item();
        info!(folder_id = %folder.id, name, "Created folder");
        Ok(folder)
    }

    async fn upload_file(&self, file: &UploadFile, parent_id: Option<&ItemId>) -> AppResult<Vec<Item>> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Validation,
                    format!("Invalid MIME type '{}'", file.mime_type),
                    e,
                )
            })?;
        let mut form = Form::new().part("files[]", part);
        if let Some(parent) = parent_id {
            form = form.text("parent_id", parent.as_str().to_string());
        }

        let request = self
            .client
            .post(self.endpoint("files/upload")?)
            .multipart(form);
        let envelope: UploadEnvelope = self.send_json(request, "Upload").await?;
        Ok(envelope.into_items())
    }

    async fn move_item(&self, id: &ItemId, destination: &MoveDestination) -> AppResult<()> {
        let request = self.client.post(self.endpoint("files/move")?).json(&json!({
            "file_id": id.as_str(),
            "new_parent_id": destination.wire_value(),
        }));
        self.send(request, "Move").await?;
        Ok(())
    }

    async fn rename(&self, id: &ItemId, name: &str) -> AppResult<()> {
        let request = self
            .client
            .put(self.endpoint(&format!("files/{id}/rename"))?)
            .json(&json!({ "name": name }));
        self.send(request, "Rename").await?;
        Ok(())
    }

    async fn trash(&self, id: &ItemId) -> AppResult<()> {
        let request = self.client.post(self.endpoint(&format!("files/{id}/trash"))?);
        self.send(request, "Trash").await?;
        Ok(())
    }

    async fn restore(&self, id: &ItemId) -> AppResult<()> {
        let request = self
            .client
            .post(self.endpoint(&format!("files/{id}/restore"))?);
        self.send(request, "Restore").await?;
        Ok(())
    }

    async fn bulk_trash(&self, ids: &[ItemId]) -> AppResult<()> {
        self.post_ids("files/bulk-trash", ids, "Bulk trash").await
    }

    async fn bulk_restore(&self, ids: &[ItemId]) -> AppResult<()> {
        self.post_ids("files/bulk-restore", ids, "Bulk restore").await
    }

    async fn bulk_delete(&self, ids: &[ItemId]) -> AppResult<()> {
        self.post_ids("files/bulk-delete", ids, "Permanent delete").await
    }

    async fn set_starred(&self, id: &ItemId, starred: bool) -> AppResult<()> {
        let url = self.endpoint(&format!("files/{id}/star"))?;
        let request = if starred {
            self.client.post(url)
        } else {
            self.client.delete(url)
        };
        self.send(request, if starred { "Star" } else { "Unstar" })
            .await?;
        Ok(())
    }

    async fn download_url(&self, id: &ItemId) -> AppResult<String> {
        let request = self
            .client
            .get(self.endpoint(&format!("files/{id}/download"))?);
        let envelope: DownloadEnvelope = self.send_json(request, "Download link").await?;
        Ok(envelope.into_url())
    }
}

/// Map a `reqwest` transport failure.
fn transport_error(err: reqwest::Error, what: &str) -> AppError {
    let kind = if err.is_decode() {
        ErrorKind::Serialization
    } else {
        ErrorKind::Network
    };
    AppError::with_source(kind, format!("{what} failed: {err}"), err)
}

/// Classify a response: an HTML page means the session is gone.
async fn check_response(response: Response, what: &str) -> AppResult<Response> {
    let status = response.status();
    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("text/html"));

    if is_html {
        return Err(AppError::authentication(format!(
            "{what}: received an HTML page instead of JSON ({status})"
        )));
    }
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(BODY_EXCERPT).collect();
    let message = format!("{what} failed ({status}): {excerpt}");
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::authentication(message),
        StatusCode::NOT_FOUND => AppError::not_found(message),
        StatusCode::CONFLICT => AppError::conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::validation(message)
        }
        _ => AppError::external_service(message),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, Path, Query, State};
    use axum::http::{HeaderMap, StatusCode as AxumStatus, header};
    use axum::response::{Html, IntoResponse};
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use serde_json::Value;

    use cloudnest_cache::storage::MemoryStorage;
    use cloudnest_core::traits::DurableStorage;

    use super::*;

    #[derive(Clone, Default)]
    struct Recorded {
        bodies: Arc<Mutex<Vec<(String, Value)>>>,
        auth: Arc<Mutex<Vec<String>>>,
    }

    impl Recorded {
        fn push(&self, route: &str, body: Value, headers: &HeaderMap) {
            self.bodies.lock().unwrap().push((route.to_string(), body));
            if let Some(v) = headers.get(header::AUTHORIZATION) {
                self.auth.lock().unwrap().push(v.to_str().unwrap().to_string());
            }
        }
    }

    async fn list(
        State(rec): State<Recorded>,
        headers: HeaderMap,
        Query(q): Query<std::collections::HashMap<String, String>>,
    ) -> Json<Value> {
        rec.push("list", serde_json::to_value(&q).unwrap(), &headers);
        let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
        Json(json!({
            "data": [{"id": page * 10, "name": format!("item-{page}"), "type": "file", "parent_id": 1}],
            "current_page": page,
            "last_page": 2
        }))
    }

    async fn move_item(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        rec.push("move", body, &headers);
        Json(json!({"message": "ok"}))
    }

    async fn rename(
        State(rec): State<Recorded>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        rec.push(&format!("rename:{id}"), body, &headers);
        Json(json!({"message": "ok"}))
    }

    async fn bulk_trash(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        rec.push("bulk-trash", body, &headers);
        Json(json!({}))
    }

    async fn upload(State(rec): State<Recorded>, headers: HeaderMap, mut multipart: Multipart) -> Json<Value> {
        let mut fields = serde_json::Map::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);
            let data = field.bytes().await.unwrap();
            let value = match file_name {
                Some(f) => json!({"file_name": f, "len": data.len()}),
                None => json!(String::from_utf8_lossy(&data)),
            };
            fields.insert(name, value);
        }
        rec.push("upload", Value::Object(fields), &headers);
        Json(json!({"data": [{"id": 77, "name": "a.txt", "type": "file", "parent_id": 3}]}))
    }

    async fn login_page() -> impl IntoResponse {
        Html("<html><body>Please log in</body></html>")
    }

    async fn unauthorized() -> impl IntoResponse {
        (AxumStatus::UNAUTHORIZED, Json(json!({"message": "Unauthenticated."})))
    }

    async fn server_error() -> impl IntoResponse {
        (AxumStatus::INTERNAL_SERVER_ERROR, "boom")
    }

    async fn download(Path(id): Path<String>) -> Json<Value> {
        Json(json!({"url": format!("https://cdn.example.com/{id}")}))
    }

    async fn spawn_stub() -> (String, Recorded) {
        let rec = Recorded::default();
        let api = Router::new()
            .route("/files", get(list))
            .route("/files/move", post(move_item))
            .route("/files/upload", post(upload))
            .route("/files/bulk-trash", post(bulk_trash))
            .route("/files/{id}/rename", put(rename))
            .route("/files/{id}/download", get(download))
            .route("/files/{id}/trash", post(login_page))
            .route("/files/{id}/restore", post(unauthorized))
            .route("/folders/tree", get(server_error))
            .with_state(rec.clone());
        let app = Router::new().nest("/api", api);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/api"), rec)
    }

    fn client(base_url: &str, token: Option<&str>) -> HttpFileApi {
        let storage = Arc::new(MemoryStorage::new());
        if let Some(token) = token {
            storage.write("auth_token", token).unwrap();
        }
        let config = ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        };
        HttpFileApi::new(&config, TokenStore::new(storage, "auth_token")).unwrap()
    }

    #[tokio::test]
    async fn test_list_all_follows_pages_with_bearer_token() {
        let (base, rec) = spawn_stub().await;
        let api = client(&base, Some("secret"));

        let items = api
            .list_all(&ListQuery::children_of(Some(ItemId::from("1"))))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].id, ItemId::from("20"));

        let bodies = rec.bodies.lock().unwrap();
        assert_eq!(bodies[0].1["parent_id"], "1");
        assert_eq!(bodies[1].1["page"], "2");
        assert!(rec.auth.lock().unwrap().iter().all(|a| a == "Bearer secret"));
    }

    #[tokio::test]
    async fn test_move_to_root_sends_empty_parent() {
        let (base, rec) = spawn_stub().await;
        let api = client(&base, Some("t"));

        api.move_item(&ItemId::from("5"), &MoveDestination::Root)
            .await
            .unwrap();
        api.move_item(&ItemId::from("5"), &MoveDestination::Folder(ItemId::from("9")))
            .await
            .unwrap();

        let bodies = rec.bodies.lock().unwrap();
        assert_eq!(bodies[0].1, json!({"file_id": "5", "new_parent_id": ""}));
        assert_eq!(bodies[1].1["new_parent_id"], "9");
    }

    #[tokio::test]
    async fn test_rename_and_bulk_trash_payloads() {
        let (base, rec) = spawn_stub().await;
        let api = client(&base, Some("t"));

        api.rename(&ItemId::from("4"), "new.txt").await.unwrap();
        api.bulk_trash(&[ItemId::from("1"), ItemId::from("2")])
            .await
            .unwrap();

        let bodies = rec.bodies.lock().unwrap();
        assert_eq!(bodies[0].0, "rename:4");
        assert_eq!(bodies[0].1["name"], "new.txt");
        assert_eq!(bodies[1].1["file_ids"], json!(["1", "2"]));
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_files_and_parent() {
        let (base, rec) = spawn_stub().await;
        let api = client(&base, Some("t"));

        let file = UploadFile::new("a.txt", "text/plain", b"hello".to_vec());
        let items = api
            .upload_file(&file, Some(&ItemId::from("3")))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, ItemId::from("77"));

        let bodies = rec.bodies.lock().unwrap();
        assert_eq!(bodies[0].1["files[]"]["file_name"], "a.txt");
        assert_eq!(bodies[0].1["files[]"]["len"], 5);
        assert_eq!(bodies[0].1["parent_id"], "3");
    }

    #[tokio::test]
    async fn test_html_response_is_authentication_failure() {
        let (base, _) = spawn_stub().await;
        let api = client(&base, Some("t"));

        let err = api.trash(&ItemId::from("1")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(err.user_message().contains("sign in"));
    }

    #[tokio::test]
    async fn test_status_codes_are_classified() {
        let (base, _) = spawn_stub().await;
        let api = client(&base, Some("t"));

        let err = api.restore(&ItemId::from("1")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);

        let err = api.folder_tree().await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_missing_token_fails_without_request() {
        let (base, rec) = spawn_stub().await;
        let api = client(&base, None);

        let err = api.list_items(&ListQuery::default()).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
        assert!(rec.bodies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let api = client("http://127.0.0.1:1/api", Some("t"));
        let err = api.download_url(&ItemId::from("1")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Network);
    }

    #[tokio::test]
    async fn test_download_url() {
        let (base, _) = spawn_stub().await;
        let api = client(&base, Some("t"));
        let url = api.download_url(&ItemId::from("12")).await.unwrap();
        assert_eq!(url, "https://cdn.example.com/12");
    }

    #[test]
    fn test_invalid_base_url_is_configuration_error() {
        let config = ApiConfig {
            base_url: "not a url".to_string(),
            ..ApiConfig::default()
        };
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()), "auth_token");
        let err = HttpFileApi::new(&config, tokens).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
