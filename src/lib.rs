//! # Net Reachability
//!
//! A reusable network reachability monitoring library with
//! connectivity-gated retry.
//!
//! This crate provides cross-platform connectivity tracking, including:
//! - Live reachability status with replay-one subscriptions
//! - Pluggable connectivity sources (platform bridges, HTTP probing)
//! - Retry of failed operations gated on connectivity restoration
//! - An in-memory transition log for diagnostics
//!
//! ## Platform Separation
//!
//! This crate focuses on cross-platform connectivity logic. Platform-specific
//! code (e.g., Android ConnectivityManager or iOS NWPathMonitor callbacks)
//! should remain in the application crate and feed state changes through a
//! [`ManualSource`]. Environments without a native connectivity API can
//! enable the `probe` feature for an HTTP-probing source instead.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use net_reachability::{retry_on_reachable, ManualSource, ReachabilityService};
//!
//! let source = ManualSource::new();
//! let reporter = source.reporter();
//! let service = ReachabilityService::new(Box::new(source))?;
//!
//! // Platform callbacks push state changes through `reporter`; failed
//! // fetches then retry automatically once connectivity returns.
//! let mut posts = retry_on_reachable(|| fetch_posts(&client), Vec::new(), &service);
//! while let Some(page) = posts.next().await {
//!     render(page);
//! }
//! ```

pub mod models;
pub mod retry;
pub mod service;
pub mod source;

#[cfg(feature = "probe")]
pub mod probe;

pub use models::{ReachabilityStatus, TransitionLogEntry};
pub use retry::{retry_on_reachable, RetryOnReachable};
pub use service::{
    ReachabilityError, ReachabilityResult, ReachabilityService, ReachabilitySubscription,
};
pub use source::{ConnectivitySource, ManualReporter, ManualSource, SourceHandle};

#[cfg(feature = "probe")]
pub use probe::{HttpProbeSource, ProbeConfig};
