//! HTTP plumbing: per-user cookie jars, sticky custom headers and the
//! record of the last exchange

use bdd_core::{BddError, Result};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::auth::Credentials;
use crate::payload::Body;

/// A response as the assertion steps see it
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Default for ApiResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What went over the wire last
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub user: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

/// Everything needed to send one request
#[derive(Debug)]
pub struct OutgoingRequest<'a> {
    pub method: Method,
    pub url: String,
    pub user: Option<&'a str>,
    pub credentials: Option<Credentials>,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

#[derive(Debug)]
pub struct HttpSession {
    anonymous: Client,
    clients: HashMap<String, Client>,
    cookie_jars: HashMap<String, Arc<Jar>>,
    custom_headers: BTreeMap<String, String>,
    last_request: Option<RecordedRequest>,
}

impl Default for HttpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpSession {
    pub fn new() -> Self {
        Self {
            anonymous: Client::new(),
            clients: HashMap::new(),
            cookie_jars: HashMap::new(),
            custom_headers: BTreeMap::new(),
            last_request: None,
        }
    }

    /// The cookie jar of `user`, created on first use.
    pub fn cookie_jar(&mut self, user: &str) -> Arc<Jar> {
        self.cookie_jars
            .entry(user.to_string())
            .or_insert_with(|| Arc::new(Jar::default()))
            .clone()
    }

    fn client_for(&mut self, user: Option<&str>) -> Result<Client> {
        let Some(user) = user.filter(|u| !u.is_empty()) else {
            return Ok(self.anonymous.clone());
        };
        if let Some(client) = self.clients.get(user) {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .cookie_provider(self.cookie_jar(user))
            .build()
            .map_err(|e| BddError::Transport {
                reason: e.to_string(),
            })?;
        self.clients.insert(user.to_string(), client.clone());
        Ok(client)
    }

    /// Set a header sent with every following request; an empty value
    /// removes it.
    pub fn set_custom_header(&mut self, name: &str, value: String) {
        if value.is_empty() {
            self.custom_headers.remove(name);
        } else {
            self.custom_headers.insert(name.to_string(), value);
        }
    }

    pub fn custom_headers(&self) -> &BTreeMap<String, String> {
        &self.custom_headers
    }

    pub fn last_request(&self) -> Option<&RecordedRequest> {
        self.last_request.as_ref()
    }

    /// Send `request`. Error statuses are returned as responses; only
    /// transport failures are errors.
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url, user = ?request.user))]
    pub async fn send(&mut self, request: OutgoingRequest<'_>) -> Result<ApiResponse> {
        let client = self.client_for(request.user)?;

        let mut headers = HeaderMap::new();
        let accept = [("Accept".to_string(), "application/json".to_string())];
        let custom = self.custom_headers.iter().map(|(k, v)| (k.clone(), v.clone()));
        for (name, value) in request.headers.iter().cloned().chain(accept).chain(custom) {
            headers.insert(header_name(&name)?, header_value(&name, &value)?);
        }
        // The acting user's credentials replace any Authorization set above.
        if let Some(credentials) = &request.credentials {
            headers.insert(AUTHORIZATION, credentials.basic_header()?);
        }

        let mut builder = client
            .request(request.method.clone(), request.url.as_str())
            .headers(headers.clone());
        builder = match &request.body {
            Body::Empty => builder,
            Body::Form(pairs) => builder.form(pairs),
            Body::Json(payload) => builder.json(payload),
        };

        self.last_request = Some(RecordedRequest {
            method: request.method,
            url: request.url,
            user: request.user.map(str::to_string),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect(),
            body: request.body,
        });

        let response = builder.send().await.map_err(|e| BddError::Transport {
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response.text().await.map_err(|e| BddError::Transport {
            reason: e.to_string(),
        })?;
        debug!(status, bytes = body.len(), "response received");

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|_| BddError::Transport {
        reason: format!("invalid header name: {name}"),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| BddError::Transport {
        reason: format!("invalid value for header {name}: {value}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_jars_are_per_user() {
        let mut session = HttpSession::new();
        let alice = session.cookie_jar("alice");
        let again = session.cookie_jar("alice");
        let bob = session.cookie_jar("bob");
        assert!(Arc::ptr_eq(&alice, &again));
        assert!(!Arc::ptr_eq(&alice, &bob));
    }

    #[test]
    fn empty_custom_header_removes_it() {
        let mut session = HttpSession::new();
        session.set_custom_header("X-Trace", "1".to_string());
        assert_eq!(session.custom_headers().get("X-Trace").map(String::as_str), Some("1"));
        session.set_custom_header("X-Trace", String::new());
        assert!(session.custom_headers().is_empty());
    }

    #[test]
    fn response_headers_are_case_insensitive() {
        let response = ApiResponse {
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            ..ApiResponse::default()
        };
        assert_eq!(response.header("Content-Type"), Some("text/html"));
    }
}
