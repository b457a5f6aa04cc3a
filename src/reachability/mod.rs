//! Host reachability probing
//!
//! The policy gate between replaying persisted content and attempting a
//! fresh network round trip. Flags are queried live on every call, never
//! cached, and any failure to obtain them counts as unreachable so the
//! engine falls back to the cache.

use async_trait::async_trait;
use std::time::Duration;

/// Connectivity flags for one host at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReachabilityFlags {
    /// The system believes the host is reachable at all
    pub reachable: bool,

    /// Reaching the host would first require establishing a connection
    /// (e.g. dial-up, VPN, association with an access point)
    pub connection_required: bool,

    /// The only path to the host is a metered WAN-style interface
    pub wan_only: bool,
}

/// Source of connectivity flags
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Snapshot of the flags for `host`, or `None` when they cannot be
    /// obtained. Implementations must return within a bounded time.
    async fn flags(&self, host: &str) -> Option<ReachabilityFlags>;
}

/// Whether `host` can be reached without establishing a new connection.
///
/// An empty host is never reachable. A WAN-only path counts as reachable
/// even when the connection-required flag is set: the network stack brings
/// the WAN link up on demand, so going live is preferred over assuming
/// only a cache exists.
pub async fn is_host_reachable(probe: &dyn ReachabilityProbe, host: &str) -> bool {
    if host.is_empty() {
        return false;
    }
    match probe.flags(host).await {
        Some(flags) => reachable_without_new_connection(flags),
        None => false,
    }
}

fn reachable_without_new_connection(flags: ReachabilityFlags) -> bool {
    let mut no_connection_required = !flags.connection_required;
    if flags.wan_only {
        no_connection_required = true;
    }
    flags.reachable && no_connection_required
}

/// Probe backed by a bounded DNS lookup.
///
/// Resolution going through at all is taken as "reachable without a new
/// connection"; a resolver failure maps to unreachable and a timeout maps
/// to flags-unavailable. Coarser than a routing-table query, but it never
/// blocks past the configured bound and needs no platform bindings.
pub struct DnsProbe {
    timeout: Duration,
}

impl DnsProbe {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(1))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for DnsProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReachabilityProbe for DnsProbe {
    async fn flags(&self, host: &str) -> Option<ReachabilityFlags> {
        // Port is irrelevant for resolution; lookup_host requires one.
        let lookup = tokio::net::lookup_host((host, 80u16));
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(mut addrs)) => Some(ReachabilityFlags {
                reachable: addrs.next().is_some(),
                connection_required: false,
                wan_only: false,
            }),
            Ok(Err(err)) => {
                tracing::debug!(host, error = %err, "host resolution failed");
                Some(ReachabilityFlags::default())
            }
            Err(_) => {
                tracing::debug!(host, "reachability probe timed out");
                None
            }
        }
    }
}
