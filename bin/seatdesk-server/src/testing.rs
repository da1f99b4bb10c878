//! Test harness: the real router talking to a stand-in PocketBase.
//!
//! The stand-in serves the PocketBase record and auth endpoints on an
//! ephemeral port, backed by a [`MemoryGateway`]. Password `secret` logs any
//! identity in; record routes require an `Authorization` header.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use http_body_util::BodyExt;
use seatdesk_core::record::pb_time;
use seatdesk_core::{
    CollectionName, ListQuery, MemoryGateway, PocketBaseClient, RecordFields, RecordGateway, RenewalCadence,
    SearchFilter, SeatError, SeatRecord, SortSpec,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::config::Config;
use crate::routes;
use crate::session::fake_token;
use crate::state::AppState;

pub const DEFAULT_COLLECTION: &str = "baidu_edu_users";

/// A record expiring `offset` from now, on a whole second.
pub fn seat(id: &str, name: &str, offset: Duration) -> SeatRecord {
    let now = Utc::now().trunc_subsecs(0);
    SeatRecord {
        id: id.to_owned(),
        name: name.to_owned(),
        remark: String::new(),
        exp_time: now + offset,
        limit: 0,
        xufei_type: Some(RenewalCadence::Day),
        created: Some(now),
        updated: Some(now),
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub gateway: Arc<MemoryGateway>,
    router: Router,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let gateway = Arc::new(MemoryGateway::new().with_unique_names());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let fake = fake_pocketbase(Arc::clone(&gateway));
        tokio::spawn(async move {
            axum::serve(listener, fake).await.unwrap();
        });

        let base = format!("http://{addr}");
        let config = Config::from_source(|key| match key {
            "SEATDESK_POCKETBASE_URL" => Some(base.clone()),
            "SEATDESK_COLLECTIONS" => Some(format!("{DEFAULT_COLLECTION},trial_users")),
            _ => None,
        })
        .unwrap();
        let store = PocketBaseClient::new(&config.pocketbase_url).unwrap();
        let state = Arc::new(AppState::new(config, store));
        let router = routes::build(Arc::clone(&state));
        Self { state, gateway, router }
    }

    /// Log in as `admin` and return the session id.
    pub async fn login(&self) -> String {
        let (status, body) = self.post("/auth/login", None, json!({ "identity": "admin", "password": "secret" })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["session_id"].as_str().unwrap().to_owned()
    }

    pub fn default_collection() -> CollectionName {
        CollectionName::new(DEFAULT_COLLECTION).unwrap()
    }

    /// Seed into the default collection; returns the record's expiry.
    pub fn seed_default(&self, record: SeatRecord) -> DateTime<Utc> {
        let exp = record.exp_time;
        self.gateway.seed(&Self::default_collection(), record);
        exp
    }

    pub fn default_records(&self) -> Vec<SeatRecord> {
        self.gateway.records(&Self::default_collection())
    }

    /// Make every listing of `collection` fail in the store.
    pub fn fail_listing(&self, collection: &str) {
        self.gateway.fail_on(collection);
    }

    pub async fn get(&self, path: &str, session: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, path, session, None).await
    }

    pub async fn post(&self, path: &str, session: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, path, session, Some(body)).await
    }

    pub async fn put(&self, path: &str, session: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, path, session, Some(body)).await
    }

    pub async fn delete(&self, path: &str, session: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::DELETE, path, session, None).await
    }

    async fn send(&self, method: Method, path: &str, session: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(sid) = session {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {sid}"));
        }
        let request = match body {
            Some(v) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(v.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }
}

// ── stand-in PocketBase ───────────────────────────────────────────────────────

type Store = Arc<MemoryGateway>;

fn fake_pocketbase(store: Store) -> Router {
    Router::new()
        .route("/api/collections/{collection}/auth-with-password", post(fake_auth))
        .route("/api/collections/{collection}/records", get(fake_list).post(fake_create))
        .route("/api/collections/{collection}/records/{id}", get(fake_get).patch(fake_update).delete(fake_delete))
        .with_state(store)
}

fn pb_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": status.as_u16(), "message": message, "data": {} }))).into_response()
}

fn store_error(e: SeatError) -> Response {
    match e {
        SeatError::NotFound(_) => pb_error(StatusCode::NOT_FOUND, "The requested resource wasn't found."),
        SeatError::Store { status, message } => {
            pb_error(StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR), &message)
        }
        SeatError::Validation(m) => pb_error(StatusCode::BAD_REQUEST, &m),
        other => pb_error(StatusCode::INTERNAL_SERVER_ERROR, &other.to_string()),
    }
}

fn authorised(headers: &HeaderMap) -> Result<(), Response> {
    match headers.get(header::AUTHORIZATION) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(pb_error(StatusCode::UNAUTHORIZED, "The request requires valid record authorization token.")),
    }
}

fn collection(raw: &str) -> Result<CollectionName, Response> {
    CollectionName::new(raw).map_err(|e| pb_error(StatusCode::BAD_REQUEST, &e.to_string()))
}

#[derive(Deserialize)]
struct AuthBody {
    identity: String,
    password: String,
}

async fn fake_auth(Path(_collection): Path<String>, Json(body): Json<AuthBody>) -> Response {
    if body.password != "secret" {
        return pb_error(StatusCode::BAD_REQUEST, "Failed to authenticate.");
    }
    Json(json!({
        "token": fake_token(Utc::now() + Duration::hours(1)),
        "record": { "id": "u1", "username": body.identity, "email": "", "name": "" },
    }))
    .into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListParams {
    page: Option<u32>,
    per_page: Option<u32>,
    sort: Option<String>,
    filter: Option<String>,
}

/// The term inside the first single-quoted literal of a filter expression.
fn filter_term(expr: &str) -> Option<String> {
    let (_, rest) = expr.split_once('\'')?;
    let mut term = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => term.push(chars.next()?),
            '\'' => return Some(term),
            c => term.push(c),
        }
    }
    None
}

async fn fake_list(
    State(store): State<Store>,
    Path(raw): Path<String>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Response {
    if let Err(resp) = authorised(&headers) {
        return resp;
    }
    let collection = match collection(&raw) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let sort = match params.sort.as_deref() {
        Some(s) => match s.strip_prefix('-') {
            Some(field) => SortSpec::descending(field),
            None => SortSpec { field: s.to_owned(), descending: false },
        },
        None => SortSpec::by_expiry(),
    };
    let query = ListQuery {
        page: params.page.unwrap_or(1),
        per_page: params.per_page.unwrap_or(30),
        sort,
        filter: params.filter.as_deref().and_then(filter_term).and_then(|t| SearchFilter::new(&t)),
    };
    match store.list(&collection, &query).await {
        Ok(page) => Json(json!({
            "page": page.page,
            "perPage": page.per_page,
            "totalItems": page.total_items,
            "totalPages": page.total_pages,
            "items": page.items,
        }))
        .into_response(),
        Err(e) => store_error(e),
    }
}

#[derive(Deserialize)]
struct FieldsBody {
    name: String,
    #[serde(default)]
    remark: String,
    exp_time: String,
    limit: Option<u64>,
    xufei_type: Option<RenewalCadence>,
}

impl FieldsBody {
    fn into_fields(self) -> Result<RecordFields, Response> {
        let exp_time = pb_time::parse(&self.exp_time).map_err(|e| pb_error(StatusCode::BAD_REQUEST, &e))?;
        Ok(RecordFields {
            name: self.name,
            remark: self.remark,
            exp_time,
            limit: self.limit,
            xufei_type: self.xufei_type,
        })
    }
}

async fn fake_create(
    State(store): State<Store>,
    Path(raw): Path<String>,
    headers: HeaderMap,
    Json(body): Json<FieldsBody>,
) -> Response {
    let prepared = authorised(&headers).and_then(|_| Ok((collection(&raw)?, body.into_fields()?)));
    let (collection, fields) = match prepared {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.create(&collection, &fields).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => store_error(e),
    }
}

async fn fake_get(
    State(store): State<Store>,
    Path((raw, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let collection = match authorised(&headers).and_then(|_| collection(&raw)) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match store.get(&collection, &id).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => store_error(e),
    }
}

async fn fake_update(
    State(store): State<Store>,
    Path((raw, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<FieldsBody>,
) -> Response {
    let prepared = authorised(&headers).and_then(|_| Ok((collection(&raw)?, body.into_fields()?)));
    let (collection, fields) = match prepared {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.update(&collection, &id, &fields).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => store_error(e),
    }
}

async fn fake_delete(
    State(store): State<Store>,
    Path((raw, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let collection = match authorised(&headers).and_then(|_| collection(&raw)) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    match store.delete(&collection, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error(e),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn filter_term_unescapes_quotes() {
        let expr = SearchFilter::new(r"o'brien\x").unwrap().to_expr();
        assert_eq!(filter_term(&expr).as_deref(), Some(r"o'brien\x"));
        assert_eq!(filter_term("no quotes"), None);
    }
}
