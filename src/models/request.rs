//! Request model
//!
//! Represents a single request as seen by the web view's network layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Reserved header marking requests the engine issued itself.
///
/// Outbound fetches carry this header so the interceptor never re-claims
/// its own traffic; it is stripped from any redirect target handed back to
/// the caller, because that redirect becomes a new top-level request which
/// must be eligible for interception again.
pub const MARKER_HEADER: &str = "x-webcache-fetch";

/// HTTP methods the web view issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Convert from string (lossy, defaults to GET)
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => HttpMethod::Get,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            "HEAD" => HttpMethod::Head,
            "OPTIONS" => HttpMethod::Options,
            _ => HttpMethod::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HttpMethod::from_str_lossy(s))
    }
}

/// A single request handed to the interceptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebRequest {
    /// Unique identifier for this request, used to address it in `stop`
    pub id: String,

    /// Absolute request URL
    pub url: Url,

    /// HTTP method
    pub method: HttpMethod,

    /// Request headers
    pub headers: HashMap<String, String>,
}

impl WebRequest {
    pub fn new(method: HttpMethod, url: Url, headers: HashMap<String, String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url,
            method,
            headers,
        }
    }

    /// Convenience constructor for a plain GET
    pub fn get(url: Url) -> Self {
        Self::new(HttpMethod::Get, url, HashMap::new())
    }

    /// Host component of the URL, empty when the URL has none
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or("")
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        super::header_value(&self.headers, name)
    }

    /// Whether this request carries the internal fetch marker
    pub fn is_marked(&self) -> bool {
        self.header(MARKER_HEADER).is_some()
    }

    /// Copy of this request with the fetch marker attached, for handing to
    /// the outbound transport. Gets a fresh id: it is a distinct in-flight
    /// request from the one the caller gave us.
    pub fn marked_for_fetch(&self) -> WebRequest {
        let mut headers = self.headers.clone();
        headers.insert(MARKER_HEADER.to_string(), String::new());
        WebRequest::new(self.method, self.url.clone(), headers)
    }
}
