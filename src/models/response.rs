//! Response metadata model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Head of an HTTP response, preserved verbatim from the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Effective URL the response was served from
    pub url: Url,

    /// HTTP status code
    pub status: u16,

    /// Status reason phrase, when the transport reports one
    pub reason: Option<String>,

    /// HTTP version (e.g., "HTTP/1.1")
    pub version: String,

    /// Response headers
    pub headers: HashMap<String, String>,
}

impl ResponseMetadata {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        super::header_value(&self.headers, name)
    }

    /// Whether this response is a redirect the engine should act on:
    /// a 3xx status carrying a Location header
    pub fn is_redirect(&self) -> bool {
        (300..=399).contains(&self.status) && self.header("location").is_some()
    }
}
