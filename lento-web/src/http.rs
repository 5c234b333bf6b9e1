//! Transport-independent request and response model.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::IntoResponse;
use bytes::Bytes;
use fxhash::FxHashMap;
use lento_router::method::HttpMethod;
use lento_router::path::normalize_path;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::form_urlencoded;

/// Header marking a request as accepting partial (layout-less) views.
pub const ACCEPT_HEADER: &str = "x-lento-accept";

pub const JSON_CONTENT_TYPE: &str = "application/json";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Incoming request with parsed query string and body.
#[derive(Clone, Debug)]
pub struct Request {
    method: HttpMethod,
    path: String,
    query: FxHashMap<String, String>,
    headers: FxHashMap<String, String>,
    body: Value,
}

impl Request {
    /// Creates an empty request. The path gets normalized.
    pub fn new(method: HttpMethod, path: &str) -> Self {
        Self {
            method,
            path: normalize_path(path),
            query: Default::default(),
            headers: Default::default(),
            body: Value::Object(Map::new()),
        }
    }

    /// Creates a request from raw transport data. A JSON body is preferred, with a fallback to an
    /// url-encoded form if the content type says so. Other bodies become an empty object.
    pub fn from_parts<I, K, V>(
        method: HttpMethod,
        path: &str,
        query: Option<&str>,
        headers: I,
        body: &[u8],
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::new(method, path);
        if let Some(query) = query {
            request.query = form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect();
        }

        request.headers = headers
            .into_iter()
            .map(|(name, value)| (name.as_ref().to_ascii_lowercase(), value.into()))
            .collect();
        let form = request
            .header(CONTENT_TYPE.as_str())
            .map(|content_type| content_type.starts_with(FORM_CONTENT_TYPE))
            .unwrap_or(false);
        request.body = parse_body(body, form);
        request
    }

    pub fn with_query<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_header<N: AsRef<str>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    #[inline]
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Normalized request path.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[inline]
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn accepts_partial(&self) -> bool {
        self.header(ACCEPT_HEADER)
            .map(|value| value.trim().eq_ignore_ascii_case("partial"))
            .unwrap_or(false)
    }
}

fn parse_body(body: &[u8], form: bool) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }

    if let Ok(value) = serde_json::from_slice(body) {
        return value;
    }

    if !form {
        return Value::Object(Map::new());
    }

    Value::Object(
        form_urlencoded::parse(body)
            .into_owned()
            .map(|(name, value)| (name, Value::String(value)))
            .collect(),
    )
}

/// Status and headers of the response being built, shared between the dispatcher and handlers.
#[derive(Clone, Debug)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }
}

/// Live response handed to handlers. Clones share the same head.
#[derive(Clone, Debug, Default)]
pub struct ResponseHandle {
    head: Arc<Mutex<ResponseHead>>,
}

impl ResponseHandle {
    pub fn set_status(&self, status: StatusCode) {
        self.head.lock().status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.head.lock().status
    }

    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.head.lock().headers.insert(name, value);
    }

    pub fn header(&self, name: &HeaderName) -> Option<HeaderValue> {
        self.head.lock().headers.get(name).cloned()
    }

    pub fn head(&self) -> ResponseHead {
        self.head.lock().clone()
    }
}

/// Complete response.
#[derive(Clone, Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new<B: Into<Bytes>>(status: StatusCode, content_type: HeaderValue, body: B) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type);

        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn json(status: StatusCode, value: &Value) -> Self {
        Self::new(
            status,
            HeaderValue::from_static(JSON_CONTENT_TYPE),
            value.to_string(),
        )
    }

    pub fn not_found() -> Self {
        Self::json(StatusCode::NOT_FOUND, &json!({ "error": "Not found" }))
    }

    pub fn validation_failed(details: &BTreeMap<String, String>) -> Self {
        Self::json(
            StatusCode::BAD_REQUEST,
            &json!({ "error": "Validation failed", "details": details }),
        )
    }

    pub fn internal_error() -> Self {
        Self::json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({ "error": "Internal server error" }),
        )
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Parses the body as JSON.
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}
