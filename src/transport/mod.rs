//! Outbound HTTP transport
//!
//! The seam through which the interceptor reaches the real network. One
//! live request per fetching session; redirects are never followed here —
//! a 3xx comes back as-is so the interceptor can record the hop — and the
//! transport never consults the cache.

use crate::models::{ResponseMetadata, WebRequest};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::collections::HashMap;
use std::pin::Pin;
use thiserror::Error;

/// Streamed response body: zero or more chunks, each of which may fail
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Errors surfaced by a live fetch
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Response head plus its body stream
pub struct FetchReply {
    pub metadata: ResponseMetadata,
    pub body: BodyStream,
}

/// Transport primitive the interceptor issues live requests through
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, request: &WebRequest) -> Result<FetchReply, TransportError>;
}

/// Production transport over a reqwest client
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &WebRequest) -> Result<FetchReply, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, request.url.clone());
        for (key, value) in &request.headers {
            if let Ok(name) = reqwest::header::HeaderName::try_from(key.as_str()) {
                if let Ok(value) = reqwest::header::HeaderValue::from_str(value) {
                    builder = builder.header(name, value);
                }
            }
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let reason = response.status().canonical_reason().map(String::from);
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let metadata = ResponseMetadata {
            url: response.url().clone(),
            status,
            reason,
            version: format!("{:?}", response.version()),
            headers,
        };

        let body: BodyStream = Box::pin(response.bytes_stream().map_err(TransportError::from));
        Ok(FetchReply { metadata, body })
    }
}
