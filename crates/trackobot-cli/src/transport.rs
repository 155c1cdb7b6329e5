use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use ureq::typestate::WithBody;
use ureq::{Agent, RequestBuilder, http};

use crate::credentials::Credentials;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://trackobot.com";
const TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("trackobot-cli/", env!("CARGO_PKG_VERSION"));

/// Characters left as-is in query strings and form bodies.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    /// Form fields in order; keys may repeat.
    Form(Vec<(String, String)>),
}

impl Payload {
    /// Content type and encoded bytes, or `None` for an empty body.
    pub fn encode(&self) -> Result<Option<(&'static str, Vec<u8>)>> {
        match self {
            Self::Empty => Ok(None),
            Self::Json(value) => Ok(Some(("application/json", serde_json::to_vec(value)?))),
            Self::Form(fields) => Ok(Some((
                "application/x-www-form-urlencoded",
                encode_pairs(fields).into_bytes(),
            ))),
        }
    }
}

/// A fully described request, built before anything touches the network.
#[derive(Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub payload: Payload,
    pub authorization: Option<String>,
}

impl std::fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("payload", &self.payload)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            payload: Payload::Empty,
            authorization: None,
        }
    }

    pub fn auth(mut self, credentials: &Credentials) -> Self {
        self.authorization = Some(credentials.authorization());
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.payload = Payload::Json(body);
        self
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.payload = Payload::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Value of the first query parameter named `key`.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.query.is_empty() {
            format!("{base}{}", self.path)
        } else {
            format!("{base}{}?{}", self.path, encode_pairs(&self.query))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn non-2xx responses into `Error::Http`.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let message = serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|body| {
                ["error", "message"]
                    .iter()
                    .find_map(|k| body.get(*k).and_then(Value::as_str).map(str::to_string))
            })
            .unwrap_or_else(|| self.body.clone());
        Err(Error::Http {
            status: self.status,
            message,
            body: self.body,
        })
    }

    /// Decode a successful body. Empty bodies become `null`, non-JSON text a string.
    pub fn into_json(self) -> Result<Value> {
        let resp = self.error_for_status()?;
        if resp.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        match serde_json::from_str::<Value>(&resp.body) {
            Ok(body) => Ok(body),
            Err(_) => Ok(Value::String(resp.body)),
        }
    }
}

/// Sends one request and returns the raw response, whatever its status.
pub trait Transport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse>;
}

/// Blocking HTTP transport backed by a `ureq` agent.
pub struct UreqTransport {
    agent: Agent,
    base_url: String,
}

impl std::fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl UreqTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(TIMEOUT))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn with_headers<B>(builder: RequestBuilder<B>, request: &ApiRequest) -> RequestBuilder<B> {
    let builder = builder.header("User-Agent", USER_AGENT);
    match &request.authorization {
        Some(auth) => builder.header("Authorization", auth),
        None => builder,
    }
}

fn send_payload(
    builder: RequestBuilder<WithBody>,
    payload: &Payload,
) -> Result<http::Response<ureq::Body>> {
    let resp = match payload.encode()? {
        Some((content_type, bytes)) => builder.header("Content-Type", content_type).send(&bytes)?,
        None => builder.send_empty()?,
    };
    Ok(resp)
}

impl Transport for UreqTransport {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = request.url(&self.base_url);
        tracing::debug!(method = request.method.as_str(), path = %request.path, "sending request");
        let mut resp = match request.method {
            Method::Get => with_headers(self.agent.get(&url), request).call()?,
            Method::Delete => with_headers(self.agent.delete(&url), request).call()?,
            Method::Post => send_payload(with_headers(self.agent.post(&url), request), &request.payload)?,
            Method::Put => send_payload(with_headers(self.agent.put(&url), request), &request.payload)?,
        };
        let status = resp.status().as_u16();
        let body = resp.body_mut().read_to_string()?;
        tracing::debug!(status, path = %request.path, "received response");
        Ok(ApiResponse { status, body })
    }
}
