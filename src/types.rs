use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::key_value::{KeyValue, KeyValueList};

/// Header names offered as completions in the headers editor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownHeader {
    Authorization,
    ContentType,
    Accept,
    RequestId,
    UserAgent,
    CacheControl,
    AcceptEncoding,
    AcceptLanguage,
}

impl KnownHeader {
    pub fn name(&self) -> &'static str {
        match self {
            KnownHeader::Authorization => "Authorization",
            KnownHeader::ContentType => "Content-Type",
            KnownHeader::Accept => "Accept",
            KnownHeader::RequestId => "X-Request-ID",
            KnownHeader::UserAgent => "User-Agent",
            KnownHeader::CacheControl => "Cache-Control",
            KnownHeader::AcceptEncoding => "Accept-Encoding",
            KnownHeader::AcceptLanguage => "Accept-Language",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            KnownHeader::Authorization,
            KnownHeader::ContentType,
            KnownHeader::Accept,
            KnownHeader::RequestId,
            KnownHeader::UserAgent,
            KnownHeader::CacheControl,
            KnownHeader::AcceptEncoding,
            KnownHeader::AcceptLanguage,
        ]
    }
}

/// HTTP methods the composer can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::GET => "GET",
            HttpMethod::POST => "POST",
            HttpMethod::PUT => "PUT",
            HttpMethod::PATCH => "PATCH",
            HttpMethod::DELETE => "DELETE",
        }
    }

    pub fn all() -> Vec<Self> {
        vec![
            HttpMethod::GET,
            HttpMethod::POST,
            HttpMethod::PUT,
            HttpMethod::PATCH,
            HttpMethod::DELETE,
        ]
    }

    /// Parse a method name, case-insensitively. Anything outside the closed set is `None`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Some(HttpMethod::GET),
            "POST" => Some(HttpMethod::POST),
            "PUT" => Some(HttpMethod::PUT),
            "PATCH" => Some(HttpMethod::PATCH),
            "DELETE" => Some(HttpMethod::DELETE),
            _ => None,
        }
    }

    /// Whether a request body is sent with this method.
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::GET)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Authorization attached to outgoing requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Auth {
    #[default]
    None,
    Bearer { token: String },
}

/// The live, editable request owned by the request builder
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestDraft {
    pub method: HttpMethod,
    pub url: String,
    pub query_params: KeyValueList,
    pub headers: KeyValueList,
    pub body: String,
    pub auth: Auth,
}

/// Copy of the request fields that can be stored, replayed or bulk-loaded.
///
/// Auth is deliberately absent: bulk population never changes the auth selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub query_params: Vec<KeyValue>,
    #[serde(default)]
    pub headers: Vec<KeyValue>,
    #[serde(default)]
    pub body: String,
}

impl RequestSnapshot {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Short display title, e.g. `GET users`.
    pub fn title(&self) -> String {
        if self.url.is_empty() {
            return "New Request".to_string();
        }

        let path = self
            .url
            .split('?')
            .next()
            .and_then(|s| s.split('/').last())
            .filter(|s| !s.is_empty())
            .unwrap_or("Untitled");

        format!("{} {}", self.method.as_str(), path)
    }
}

/// A request ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ResolvedRequest {
    /// First header value with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Normalized response summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseData {
    pub status: u16,
    pub status_text: String,
    pub elapsed_ms: u64,
    pub size_bytes: u64,
    pub headers: BTreeMap<String, String>,
    pub body_text: String,
}

impl ResponseData {
    pub const CLIENT_ERROR_STATUS: u16 = 500;
    pub const CLIENT_ERROR_TEXT: &'static str = "Client Error";

    /// Summary used when the request never produced an HTTP response.
    pub fn client_error(message: &str, elapsed_ms: u64) -> Self {
        let body = serde_json::json!({ "error": message });
        Self {
            status: Self::CLIENT_ERROR_STATUS,
            status_text: Self::CLIENT_ERROR_TEXT.to_string(),
            elapsed_ms,
            size_bytes: 0,
            headers: BTreeMap::new(),
            body_text: serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()),
        }
    }

    /// Elapsed time as shown to the user, e.g. `120ms`.
    pub fn time_display(&self) -> String {
        format!("{}ms", self.elapsed_ms)
    }

    /// Body size in kilobytes with two decimals, e.g. `1.25 KB`.
    pub fn size_display(&self) -> String {
        format!("{:.2} KB", self.size_bytes as f64 / 1024.0)
    }
}

/// Result of executing a request. Transport failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "response", rename_all = "lowercase")]
pub enum ResponseOutcome {
    Success(ResponseData),
    Failure(ResponseData),
}

impl ResponseOutcome {
    pub fn data(&self) -> &ResponseData {
        match self {
            ResponseOutcome::Success(data) | ResponseOutcome::Failure(data) => data,
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        matches!(self, ResponseOutcome::Failure(_))
    }

    pub fn status_line(&self) -> String {
        let data = self.data();
        if self.is_transport_failure() {
            format!("ERROR - {}", data.status_text)
        } else {
            format!("{} {}", data.status, data.status_text)
        }
    }
}

/// History item: the request that was sent and what came back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: String,
    pub request: RequestSnapshot,
    pub outcome: ResponseOutcome,
}
