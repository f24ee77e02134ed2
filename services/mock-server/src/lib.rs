//! # Mock Server
//!
//! Records every request it receives and answers with a JSON echo of it,
//! unless a canned response was registered for the method and path.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument};

/// A request as the server saw it
#[derive(Debug, Clone, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub form: BTreeMap<String, String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

#[derive(Debug, Clone)]
pub struct CannedResponse {
    pub status: u16,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CannedResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8".to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl IntoResponse for CannedResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        let mut response =
            (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response();
        for (name, value) in self.headers {
            let name = header::HeaderName::from_bytes(name.as_bytes());
            let value = header::HeaderValue::from_str(&value);
            if let (Ok(name), Ok(value)) = (name, value) {
                response.headers_mut().append(name, value);
            }
        }
        response
    }
}

#[derive(Clone, Debug, Default)]
struct ServerState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    routes: Arc<DashMap<String, CannedResponse>>,
    once: Arc<DashMap<String, VecDeque<CannedResponse>>>,
}

fn route_key(method: &str, path: &str) -> String {
    format!("{} {}", method.to_ascii_uppercase(), path)
}

/// One-shot responses first, then an exact `METHOD path` match, then routes
/// ending in `*` by prefix.
fn next_response(state: &ServerState, method: &str, path: &str) -> Option<CannedResponse> {
    let key = route_key(method, path);
    if let Some(canned) = state.once.get_mut(&key).and_then(|mut queue| queue.pop_front()) {
        return Some(canned);
    }
    find_route(&state.routes, method, path)
}

fn find_route(routes: &DashMap<String, CannedResponse>, method: &str, path: &str) -> Option<CannedResponse> {
    let key = route_key(method, path);
    if let Some(canned) = routes.get(&key) {
        return Some(canned.clone());
    }
    routes
        .iter()
        .find(|entry| {
            entry
                .key()
                .strip_suffix('*')
                .is_some_and(|prefix| key.starts_with(prefix))
        })
        .map(|entry| entry.value().clone())
}

/// Header values by lowercase name; repeated headers are joined with `, `.
fn joined_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut joined: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        match joined.get_mut(name.as_str()) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                joined.insert(name.to_string(), value.into_owned());
            }
        }
    }
    joined
}

/// Router answering every path with the recording handler.
fn router(state: ServerState) -> Router {
    Router::new().fallback(record).with_state(state)
}

#[instrument(skip(state, headers, body))]
async fn record(
    State(state): State<ServerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body = String::from_utf8_lossy(&body).into_owned();
    let is_form = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"));
    let form = if is_form {
        url::form_urlencoded::parse(body.as_bytes())
            .into_owned()
            .collect()
    } else {
        BTreeMap::new()
    };

    let request = RecordedRequest {
        method: method.to_string(),
        uri: uri.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: joined_headers(&headers),
        body,
        form,
    };
    debug!(method = %request.method, uri = %request.uri, "request recorded");
    state.requests.lock().push(request.clone());

    if let Some(canned) = next_response(&state, method.as_str(), uri.path()) {
        return canned.into_response();
    }

    axum::Json(request).into_response()
}

/// In-process server bound to a local port
#[derive(Debug)]
pub struct MockServer {
    addr: SocketAddr,
    state: ServerState,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl MockServer {
    /// Start on an ephemeral localhost port.
    pub async fn start() -> std::io::Result<Self> {
        Self::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await
    }

    pub async fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let state = ServerState::default();
        let (tx, rx) = oneshot::channel::<()>();

        let app = router(state.clone());
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = rx.await;
            });
            if let Err(e) = server.await {
                tracing::error!(error = %e, "mock server stopped");
            }
        });
        info!("Mock server listening on {}", addr);

        Ok(Self {
            addr,
            state,
            shutdown: Mutex::new(Some(tx)),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Server root with a trailing slash, the way Nextcloud reports it.
    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests.lock().last().cloned()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Answer `method path` with `response` instead of the echo. A path
    /// ending in `*` matches every path with that prefix.
    pub fn respond_with(&self, method: &str, path: &str, response: CannedResponse) {
        self.state.routes.insert(route_key(method, path), response);
    }

    /// Answer the next `method path` request with `response`, then fall back
    /// to the registered routes. Queued responses are served in order.
    pub fn respond_once(&self, method: &str, path: &str, response: CannedResponse) {
        self.state
            .once
            .entry(route_key(method, path))
            .or_default()
            .push_back(response);
    }

    /// Forget recorded requests and canned responses.
    pub fn reset(&self) {
        self.state.requests.lock().clear();
        self.state.routes.clear();
        self.state.once.clear();
    }

    pub fn stop(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}
