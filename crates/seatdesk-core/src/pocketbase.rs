//! PocketBase REST implementation of [`RecordGateway`].
//!
//! Speaks the records API (`/api/collections/{collection}/records`) and the
//! password login of an auth collection. One client is built at startup and
//! cloned per session with [`PocketBaseClient::authorized`]; clones share the
//! underlying connection pool.

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collection::CollectionName;
use crate::error::SeatError;
use crate::gateway::RecordGateway;
use crate::query::{ListQuery, Page};
use crate::record::{RecordFields, SeatRecord};

#[derive(Clone, Debug)]
pub struct PocketBaseClient {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

/// Successful password login.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub record: AuthRecord,
}

/// The authenticated account, as returned by the auth collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRecord {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    page: u32,
    per_page: u32,
    total_items: u64,
    total_pages: u32,
    items: Vec<SeatRecord>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Map<String, serde_json::Value>,
}

impl PocketBaseClient {
    /// Build a client for the store at `base_url`, e.g. `http://127.0.0.1:8090`.
    pub fn new(base_url: &str) -> Result<Self, SeatError> {
        let base = Url::parse(base_url)
            .map_err(|e| SeatError::Config(format!("invalid record store URL '{base_url}': {e}")))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SeatError::Config(format!("unsupported URL scheme '{}'", base.scheme())));
        }
        Ok(Self { http: reqwest::Client::new(), base, token: None })
    }

    /// Replace the HTTP client (timeouts, proxies, TLS settings).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// A copy of this client that sends `token` with every request.
    pub fn authorized(&self, token: impl Into<String>) -> Self {
        Self { http: self.http.clone(), base: self.base.clone(), token: Some(token.into()) }
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Log in against `auth_collection` (normally `users`).
    pub async fn auth_with_password(
        &self,
        auth_collection: &CollectionName,
        identity: &str,
        password: &str,
    ) -> Result<AuthResponse, SeatError> {
        let url = self.endpoint(&format!("api/collections/{auth_collection}/auth-with-password"));
        let body = serde_json::json!({ "identity": identity, "password": password });
        debug!(collection = %auth_collection, "password login");
        let resp = self.request(Method::POST, url).json(&body).send().await?;
        decode(resp, None).await
    }

    fn endpoint(&self, tail: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{prefix}/{tail}"));
        url.set_query(None);
        url
    }

    fn records_url(&self, collection: &CollectionName) -> Url {
        self.endpoint(&format!("api/collections/{collection}/records"))
    }

    fn record_url(&self, collection: &CollectionName, id: &str) -> Result<Url, SeatError> {
        check_record_id(id)?;
        Ok(self.endpoint(&format!("api/collections/{collection}/records/{id}")))
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.token {
            Some(token) => builder.header(AUTHORIZATION, token.as_str()),
            None => builder,
        }
    }
}

impl RecordGateway for PocketBaseClient {
    async fn list(&self, collection: &CollectionName, query: &ListQuery) -> Result<Page<SeatRecord>, SeatError> {
        let mut url = self.records_url(collection);
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("page", &query.page.to_string())
                .append_pair("perPage", &query.per_page.to_string())
                .append_pair("sort", &query.sort.to_expr());
            if let Some(filter) = &query.filter {
                pairs.append_pair("filter", &filter.to_expr());
            }
        }
        debug!(%collection, page = query.page, filtered = query.filter.is_some(), "listing records");
        let resp = self.request(Method::GET, url).send().await?;
        let body: ListResponse = decode(resp, None).await?;
        Ok(Page {
            items: body.items,
            page: body.page,
            per_page: body.per_page,
            total_items: body.total_items,
            total_pages: body.total_pages,
        })
    }

    async fn create(&self, collection: &CollectionName, fields: &RecordFields) -> Result<SeatRecord, SeatError> {
        let url = self.records_url(collection);
        debug!(%collection, name = %fields.name, "creating record");
        let resp = self.request(Method::POST, url).json(fields).send().await?;
        decode(resp, None).await
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &str,
        fields: &RecordFields,
    ) -> Result<SeatRecord, SeatError> {
        let url = self.record_url(collection, id)?;
        debug!(%collection, id, "updating record");
        let resp = self.request(Method::PATCH, url).json(fields).send().await?;
        decode(resp, Some(id)).await
    }

    async fn delete(&self, collection: &CollectionName, id: &str) -> Result<(), SeatError> {
        let url = self.record_url(collection, id)?;
        debug!(%collection, id, "deleting record");
        let resp = self.request(Method::DELETE, url).send().await?;
        check(resp, Some(id)).await.map(|_| ())
    }

    async fn get(&self, collection: &CollectionName, id: &str) -> Result<SeatRecord, SeatError> {
        let url = self.record_url(collection, id)?;
        let resp = self.request(Method::GET, url).send().await?;
        decode(resp, Some(id)).await
    }
}

/// Record ids are opaque but never contain path syntax.
fn check_record_id(id: &str) -> Result<(), SeatError> {
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(SeatError::Validation(format!("invalid record id '{id}'")))
    }
}

async fn decode<T: DeserializeOwned>(resp: Response, id: Option<&str>) -> Result<T, SeatError> {
    let resp = check(resp, id).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Turn a non-2xx response into [`SeatError`].
async fn check(resp: Response, id: Option<&str>) -> Result<Response, SeatError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = id {
            return Err(SeatError::NotFound(id.to_owned()));
        }
    }
    let text = resp.text().await.unwrap_or_default();
    let message = store_message(&text, status);
    warn!(status = status.as_u16(), %message, "record store returned an error");
    Err(SeatError::Store { status: status.as_u16(), message })
}

/// `"Failed to create record. name: Value must be unique."`
fn store_message(text: &str, status: StatusCode) -> String {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let mut message = if body.message.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_owned()
    } else {
        body.message
    };
    let mut fields: Vec<String> = body
        .data
        .iter()
        .filter_map(|(field, detail)| {
            detail.get("message").and_then(|m| m.as_str()).map(|m| format!("{field}: {m}"))
        })
        .collect();
    fields.sort();
    if !fields.is_empty() {
        message.push(' ');
        message.push_str(&fields.join("; "));
    }
    message
}
