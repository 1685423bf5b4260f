//! HTTP transport seam.
//!
//! Every client in the workspace talks to the platform through
//! [`HttpTransport`]. Production code uses [`ReqwestTransport`]; tests swap in
//! the in-memory `StubTransport` (feature `stub`).

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{vendor_message, ApsError, ApsResult, Upstream};

pub use reqwest::Method;

/// How a request authenticates itself
#[derive(Clone, Default)]
pub enum Authorization {
    #[default]
    None,
    /// Client authentication against the token endpoint
    Basic { username: String, password: String },
    Bearer(String),
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authorization::None => write!(f, "None"),
            Authorization::Basic { username, .. } => write!(f, "Basic({username}, <redacted>)"),
            Authorization::Bearer(_) => write!(f, "Bearer(<redacted>)"),
        }
    }
}

/// Request payload
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    Binary { content: Bytes, content_type: String },
}

/// A single outbound call
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub auth: Authorization,
    pub body: RequestBody,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            auth: Authorization::None,
            body: RequestBody::Empty,
            timeout,
        }
    }

    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Method::GET, url, timeout)
    }

    pub fn post(url: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Method::POST, url, timeout)
    }

    pub fn put(url: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Method::PUT, url, timeout)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.auth = Authorization::Bearer(token.into());
        self
    }

    pub fn basic(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Authorization::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn binary(mut self, content: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = RequestBody::Binary {
            content: content.into(),
            content_type: content_type.into(),
        };
        self
    }

    /// Path component of the URL, without scheme, host or query
    pub fn path(&self) -> &str {
        let rest = match self.url.find("://") {
            Some(idx) => &self.url[idx + 3..],
            None => self.url.as_str(),
        };
        let path = match rest.find('/') {
            Some(idx) => &rest[idx..],
            None => "/",
        };
        match path.find('?') {
            Some(idx) => &path[..idx],
            None => path,
        }
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of a form field, if the body is form-encoded
    pub fn form_value(&self, name: &str) -> Option<&str> {
        match &self.body {
            RequestBody::Form(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// Status and raw body of a vendor response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Response with a JSON body
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body
    pub fn json<T: DeserializeOwned>(&self) -> ApsResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Turn a non-success status into the upstream error for `kind`
    pub fn error_for(self, kind: Upstream) -> ApsResult<Self> {
        if self.is_success() {
            return Ok(self);
        }
        Err(ApsError::upstream(kind, self.status, vendor_message(&self.body)))
    }
}

/// Sends requests to the platform
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> ApsResult<HttpResponse>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> ApsResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("aps-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApsError::transport)?;
        Ok(Self { client })
    }

    /// Reuse an existing client (connection pool, proxy settings, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ApsResult<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            auth,
            body,
            timeout,
        } = request;

        debug!(%method, %url, timeout_secs = timeout.as_secs(), "Sending platform request");

        let mut builder = self.client.request(method.clone(), &url).timeout(timeout);

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match auth {
            Authorization::None => builder,
            Authorization::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Authorization::Bearer(token) => builder.bearer_auth(token),
        };

        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Binary { content, content_type } => builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(content),
        };

        let response = builder.send().await.map_err(ApsError::transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ApsError::transport)?;

        debug!(%method, %url, status, bytes = body.len(), "Platform responded");
        Ok(HttpResponse { status, body })
    }
}
