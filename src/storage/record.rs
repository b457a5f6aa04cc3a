//! Cache record codec
//!
//! A record holds everything needed to replay one response offline: the
//! response head, the full body, and, for redirect hops, the follow-up
//! request. Encoding is tagged JSON with the body as a base64 field;
//! decoding is defensive and degrades to absence instead of erroring, so a
//! corrupt file on disk behaves exactly like a cache miss.

use crate::models::{HttpMethod, ResponseMetadata, WebRequest};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// Format tag checked on decode; bump when the layout changes
const RECORD_VERSION: u32 = 1;

/// Follow-up request stored for a cached redirect hop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedirectTarget {
    pub url: Url,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
}

impl RedirectTarget {
    /// Materialize the stored target as a fresh top-level request
    pub fn into_request(self) -> WebRequest {
        WebRequest::new(self.method, self.url, self.headers)
    }
}

impl From<&WebRequest> for RedirectTarget {
    fn from(request: &WebRequest) -> Self {
        Self {
            url: request.url.clone(),
            method: request.method,
            headers: request.headers.clone(),
        }
    }
}

/// One persisted cache entry
///
/// A record is either a response record (metadata + body, no redirect) or
/// a redirect record (metadata + target, empty body); the constructors are
/// the only way to build one. Records are immutable once written — a new
/// fetch for the same key overwrites the file wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub version: u32,

    /// Response head captured when the transport delivered it
    pub metadata: ResponseMetadata,

    /// Full response body; empty for redirect records
    #[serde(with = "body_encoding")]
    pub body: Vec<u8>,

    /// Present only for redirect records
    pub redirect: Option<RedirectTarget>,

    /// When the record was written, milliseconds since epoch
    pub stored_at_ms: i64,
}

impl CacheRecord {
    /// Record for a completed response
    pub fn from_response(metadata: ResponseMetadata, body: Vec<u8>) -> Self {
        Self {
            version: RECORD_VERSION,
            metadata,
            body,
            redirect: None,
            stored_at_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Record for a redirect hop
    pub fn from_redirect(metadata: ResponseMetadata, target: RedirectTarget) -> Self {
        Self {
            version: RECORD_VERSION,
            metadata,
            body: Vec::new(),
            redirect: Some(target),
            stored_at_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a stored record. Returns `None` on malformed bytes or an
    /// unknown version tag — callers treat both as a cache miss.
    pub fn decode(bytes: &[u8]) -> Option<CacheRecord> {
        let record: CacheRecord = serde_json::from_slice(bytes).ok()?;
        if record.version != RECORD_VERSION {
            return None;
        }
        Some(record)
    }
}

mod body_encoding {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> ResponseMetadata {
        let headers = [("content-type", "text/html"), ("etag", "\"abc\"")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ResponseMetadata {
            url: Url::parse("http://example.com/page").expect("valid url"),
            status: 200,
            reason: Some("OK".to_string()),
            version: "HTTP/1.1".to_string(),
            headers,
        }
    }

    #[test]
    fn response_record_round_trips_exactly() {
        let body = b"<html>hello \x00\xff</html>".to_vec();
        let record = CacheRecord::from_response(sample_metadata(), body);

        let encoded = record.encode().expect("encode ok");
        let decoded = CacheRecord::decode(&encoded).expect("decode ok");

        assert_eq!(decoded, record);
        assert!(decoded.redirect.is_none());
    }

    #[test]
    fn redirect_record_round_trips_exactly() {
        let mut metadata = sample_metadata();
        metadata.status = 302;
        let target = RedirectTarget {
            url: Url::parse("http://example.com/next").expect("valid url"),
            method: HttpMethod::Get,
            headers: HashMap::new(),
        };
        let record = CacheRecord::from_redirect(metadata, target.clone());

        let encoded = record.encode().expect("encode ok");
        let decoded = CacheRecord::decode(&encoded).expect("decode ok");

        assert_eq!(decoded, record);
        assert_eq!(decoded.redirect, Some(target));
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn decode_degrades_to_absence_on_garbage() {
        assert!(CacheRecord::decode(b"").is_none());
        assert!(CacheRecord::decode(b"not json at all").is_none());
        assert!(CacheRecord::decode(br#"{"version":1}"#).is_none());
    }

    #[test]
    fn decode_rejects_unknown_version() {
        let mut record = CacheRecord::from_response(sample_metadata(), b"body".to_vec());
        record.version = 99;
        let encoded = record.encode().expect("encode ok");
        assert!(CacheRecord::decode(&encoded).is_none());
    }

    #[test]
    fn stored_target_becomes_a_fresh_request() {
        let target = RedirectTarget {
            url: Url::parse("http://example.com/next").expect("valid url"),
            method: HttpMethod::Get,
            headers: HashMap::new(),
        };
        let first = target.clone().into_request();
        let second = target.into_request();
        assert_ne!(first.id, second.id, "each replay is a new request");
        assert_eq!(first.url, second.url);
    }
}
