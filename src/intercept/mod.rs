//! The caching interceptor
//!
//! Sits between the web view's network layer and the outside world. Per
//! request it consults reachability once, then either replays the persisted
//! record (offline) or performs a live fetch through the transport,
//! relaying the streamed response to the caller while mirroring it into the
//! store. Redirect hops are persisted as first-class records so a later
//! run, online or offline, can short-circuit straight to the final
//! destination's entry.

use crate::models::{ResponseMetadata, WebRequest, MARKER_HEADER};
use crate::reachability::{self, ReachabilityProbe};
use crate::storage::{CacheRecord, CacheStore, RedirectTarget};
use crate::transport::{FetchReply, Transport, TransportError};
use bytes::Bytes;
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::AbortHandle;

/// Whether the caller may apply its own response caching on top.
///
/// Always `NotAllowed` from this engine: caching is owned here, and a
/// second cache layer would serve stale copies the engine cannot see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStoragePolicy {
    Allowed,
    NotAllowed,
}

/// Failure delivered on a request's completion channel
#[derive(Debug, Error)]
pub enum FetchFailure {
    /// Offline and nothing usable in the store: fail fast instead of
    /// attempting network access that is known unreachable
    #[error("cannot connect to host {host}")]
    CannotConnect { host: String },

    /// The live fetch failed; forwarded verbatim, no retry here
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Ordered lifecycle callbacks for one intercepted request.
///
/// Per request the calls arrive in this relative order:
/// `on_response_metadata` before any `on_data`, every `on_data` before
/// `on_complete`. Exactly one terminal call is made — `on_redirect`,
/// `on_complete` or `on_failed` — unless the request is stopped first.
pub trait EventSink: Send + Sync {
    /// The request is being redirected; `new_request` is ready to be
    /// re-issued as a fresh top-level request
    fn on_redirect(&self, new_request: WebRequest, response: ResponseMetadata);

    /// Response head arrived (live or replayed)
    fn on_response_metadata(&self, response: ResponseMetadata, policy: CacheStoragePolicy);

    /// One body chunk; chunks concatenate to the full body
    fn on_data(&self, chunk: Bytes);

    /// The response finished cleanly
    fn on_complete(&self);

    /// The request failed; no further calls follow
    fn on_failed(&self, error: FetchFailure);
}

struct InFlightRequest {
    abort: AbortHandle,
    canceled: Arc<AtomicBool>,
}

/// Protocol handler deciding cache-vs-network per request
pub struct CachingInterceptor {
    store: Arc<CacheStore>,
    transport: Arc<dyn Transport>,
    probe: Arc<dyn ReachabilityProbe>,
    in_flight: Arc<DashMap<String, InFlightRequest>>,
}

impl CachingInterceptor {
    pub fn new(
        store: Arc<CacheStore>,
        transport: Arc<dyn Transport>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        Self {
            store,
            transport,
            probe,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Whether this engine claims `request`.
    ///
    /// Only plain HTTP, and never a request carrying the fetch marker —
    /// those are our own outbound fetches and must pass through to the
    /// underlying network stack untouched.
    pub fn can_handle(&self, request: &WebRequest) -> bool {
        request.url.scheme() == "http" && !request.is_marked()
    }

    /// Begin handling `request`, delivering its lifecycle to `sink`.
    ///
    /// One task per request; all mutable in-flight state (accumulation
    /// buffer, captured metadata) lives inside that task.
    pub fn start(&self, request: WebRequest, sink: Arc<dyn EventSink>) {
        let store = Arc::clone(&self.store);
        let transport = Arc::clone(&self.transport);
        let probe = Arc::clone(&self.probe);
        let in_flight = Arc::clone(&self.in_flight);
        let canceled = Arc::new(AtomicBool::new(false));
        let request_id = request.id.clone();

        // The task deregisters itself on exit, so it must not begin until
        // the registry entry exists.
        let (registered_tx, registered_rx) = tokio::sync::oneshot::channel::<()>();

        let task_canceled = Arc::clone(&canceled);
        let task_id = request_id.clone();
        let handle = tokio::spawn(async move {
            let _ = registered_rx.await;
            handle_request(
                &store,
                transport.as_ref(),
                probe.as_ref(),
                &request,
                sink.as_ref(),
                &task_canceled,
            )
            .await;
            in_flight.remove(&task_id);
        });

        self.in_flight.insert(
            request_id,
            InFlightRequest {
                abort: handle.abort_handle(),
                canceled,
            },
        );
        let _ = registered_tx.send(());
    }

    /// Cancel the in-flight handling of `request`, if any.
    ///
    /// The underlying fetch is aborted and no record is written for the
    /// request's key, even if the transport surfaces trailing events.
    pub fn stop(&self, request: &WebRequest) {
        if let Some((_, entry)) = self.in_flight.remove(&request.id) {
            entry.canceled.store(true, Ordering::SeqCst);
            entry.abort.abort();
            tracing::debug!(url = %request.url, "request stopped");
        }
    }

    /// Number of requests currently being handled
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Drive one request from decision to terminal notification
async fn handle_request(
    store: &CacheStore,
    transport: &dyn Transport,
    probe: &dyn ReachabilityProbe,
    request: &WebRequest,
    sink: &dyn EventSink,
    canceled: &AtomicBool,
) {
    if reachability::is_host_reachable(probe, request.host()).await {
        live_fetch(store, transport, request, sink, canceled).await;
    } else {
        replay_from_cache(store, request, sink).await;
    }
}

/// Serve a request from the store while the host is unreachable
async fn replay_from_cache(store: &CacheStore, request: &WebRequest, sink: &dyn EventSink) {
    match store.load(&request.url).await {
        Some(record) => {
            let CacheRecord {
                metadata,
                body,
                redirect,
                ..
            } = record;
            if let Some(target) = redirect {
                tracing::debug!(url = %request.url, target = %target.url, "replaying cached redirect");
                sink.on_redirect(target.into_request(), metadata);
            } else {
                tracing::debug!(url = %request.url, bytes = body.len(), "replaying cached response");
                sink.on_response_metadata(metadata, CacheStoragePolicy::NotAllowed);
                sink.on_data(Bytes::from(body));
                sink.on_complete();
            }
        }
        None => {
            tracing::debug!(url = %request.url, "offline with no cached entry");
            sink.on_failed(FetchFailure::CannotConnect {
                host: request.host().to_string(),
            });
        }
    }
}

/// Fetch live, relaying the streamed response while mirroring it into the
/// store
async fn live_fetch(
    store: &CacheStore,
    transport: &dyn Transport,
    request: &WebRequest,
    sink: &dyn EventSink,
    canceled: &AtomicBool,
) {
    let outbound = request.marked_for_fetch();
    tracing::debug!(url = %outbound.url, "fetching live");

    let FetchReply { metadata, mut body } = match transport.fetch(&outbound).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(url = %request.url, error = %err, "live fetch failed");
            sink.on_failed(FetchFailure::Transport(err));
            return;
        }
    };

    if let Some(target) = redirect_target(request, &metadata) {
        tracing::debug!(url = %request.url, target = %target.url, "caching redirect hop");
        let record = CacheRecord::from_redirect(metadata.clone(), RedirectTarget::from(&target));
        persist_best_effort(store, request, &record).await;
        sink.on_redirect(target, metadata);
        return;
    }

    // We cache ourselves; the caller must not add a second layer.
    sink.on_response_metadata(metadata.clone(), CacheStoragePolicy::NotAllowed);

    let mut buffered: Vec<u8> = Vec::new();
    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(chunk) => {
                buffered.extend_from_slice(&chunk);
                sink.on_data(chunk);
            }
            Err(err) => {
                // A failed fetch must not overwrite an existing good entry,
                // nor leave a partial one behind.
                tracing::warn!(url = %request.url, error = %err, "body stream failed mid-transfer");
                sink.on_failed(FetchFailure::Transport(err));
                return;
            }
        }
    }

    if canceled.load(Ordering::SeqCst) {
        tracing::debug!(url = %request.url, "fetch canceled, discarding buffered body");
        return;
    }

    let record = CacheRecord::from_response(metadata, buffered);
    persist_best_effort(store, request, &record).await;
    sink.on_complete();
}

/// Build the follow-up request for a redirect response, or `None` when the
/// response is not a redirect we can act on.
///
/// The target inherits the original request's method and headers with the
/// fetch marker stripped: the redirect becomes a new top-level request from
/// the caller's network layer and must be eligible for interception again.
fn redirect_target(request: &WebRequest, metadata: &ResponseMetadata) -> Option<WebRequest> {
    if !metadata.is_redirect() {
        return None;
    }
    let location = metadata.header("location")?;
    let target_url = match metadata.url.join(location) {
        Ok(url) => url,
        Err(err) => {
            tracing::warn!(url = %metadata.url, location, error = %err, "unresolvable Location header");
            return None;
        }
    };
    let mut headers = request.headers.clone();
    headers.retain(|name, _| !name.eq_ignore_ascii_case(MARKER_HEADER));
    Some(WebRequest::new(request.method, target_url, headers))
}

/// Cache writes are best-effort: a full disk or revoked directory must not
/// fail the request that produced the response.
async fn persist_best_effort(store: &CacheStore, request: &WebRequest, record: &CacheRecord) {
    if let Err(err) = store.save(&request.url, record).await {
        tracing::warn!(url = %request.url, error = %err, "failed to persist cache record");
    }
}
