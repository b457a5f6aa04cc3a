//! # Webcache
//!
//! Transparent offline caching engine for embedded web view traffic.
//! Built with Rust for speed and reliability.
//!
//! ## Features
//!
//! - Per-request cache-vs-network decision driven by live reachability
//! - Streaming pass-through of live responses while mirroring them to disk
//! - Redirect hops cached as first-class entries for offline replay
//! - Defensive record codec: corrupt entries degrade to cache misses
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Web View Network Layer                   │
//! ├─────────────────────────────────────────────────────────┤
//! │                 Caching Interceptor                      │
//! │  ┌──────────────┐  ┌───────────┐  ┌─────────────────┐   │
//! │  │ Reachability │  │ Transport │  │     Storage     │   │
//! │  │    Oracle    │──│ (reqwest) │──│ (record files)  │   │
//! │  └──────────────┘  └───────────┘  └─────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```

// Public modules
pub mod intercept;
pub mod models;
pub mod reachability;
pub mod storage;
pub mod transport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
