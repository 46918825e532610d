//! Connectivity sources that feed the reachability service
//!
//! A source pushes [`ReachabilityStatus`] events through a [`SourceHandle`].
//! Platform-specific connectivity detection (Android ConnectivityManager,
//! iOS NWPathMonitor) should remain in the application crate and be bridged
//! through a [`ManualSource`].

use crate::models::ReachabilityStatus;
use crate::service::{ReachabilityError, ReachabilityResult};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Handle a connectivity source uses to push status events into the service
#[derive(Debug, Clone)]
pub struct SourceHandle {
    tx: mpsc::UnboundedSender<ReachabilityStatus>,
}

impl SourceHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ReachabilityStatus>) -> Self {
        Self { tx }
    }

    /// Report a status change. Never blocks the reporting thread; returns
    /// false once the receiving service is gone.
    pub fn report(&self, status: ReachabilityStatus) -> bool {
        self.tx.send(status).is_ok()
    }
}

/// A pluggable origin of connectivity change events
pub trait ConnectivitySource: Send + 'static {
    /// Start delivering events through `handle`.
    ///
    /// The source keeps the handle for as long as it runs and must release
    /// it in [`stop`](ConnectivitySource::stop); the service treats a fully
    /// released handle as the end of the event feed.
    fn start(&mut self, handle: SourceHandle) -> ReachabilityResult<()>;

    /// Stop delivering events and release the handle
    fn stop(&mut self);
}

/// Source for applications that receive connectivity callbacks themselves.
///
/// Create the source, keep a [`ManualReporter`], and hand the source to the
/// service. Platform callbacks then forward each state change through the
/// reporter.
pub struct ManualSource {
    shared: Arc<Mutex<Option<SourceHandle>>>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a reporter for pushing status changes once the source is started
    pub fn reporter(&self) -> ManualReporter {
        ManualReporter {
            shared: self.shared.clone(),
        }
    }
}

impl Default for ManualSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivitySource for ManualSource {
    fn start(&mut self, handle: SourceHandle) -> ReachabilityResult<()> {
        match self.shared.lock() {
            Ok(mut guard) => {
                *guard = Some(handle);
                Ok(())
            }
            Err(_) => Err(ReachabilityError::Unavailable(
                "reporter state lock poisoned".to_string(),
            )),
        }
    }

    fn stop(&mut self) {
        if let Ok(mut guard) = self.shared.lock() {
            *guard = None;
        }
    }
}

/// Reporting side of a [`ManualSource`]
#[derive(Clone)]
pub struct ManualReporter {
    shared: Arc<Mutex<Option<SourceHandle>>>,
}

impl ManualReporter {
    /// Report a status change. Returns false while the source is not
    /// started or after it has been stopped.
    pub fn report(&self, status: ReachabilityStatus) -> bool {
        match self.shared.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(handle) => handle.report(status),
                None => false,
            },
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_reporter_lifecycle() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut source = ManualSource::new();
        let reporter = source.reporter();

        // Not started yet
        assert!(!reporter.report(ReachabilityStatus::Unreachable));

        source.start(SourceHandle::new(tx)).unwrap();
        assert!(reporter.report(ReachabilityStatus::Reachable { via_wifi: true }));
        assert_eq!(
            rx.try_recv().unwrap(),
            ReachabilityStatus::Reachable { via_wifi: true }
        );

        source.stop();
        assert!(!reporter.report(ReachabilityStatus::Unreachable));
    }
}
