//! Reachability monitoring service
//!
//! Wraps a [`ConnectivitySource`] and exposes its events as a shared,
//! replay-one subscription feed. The service starts its source on creation
//! and stops it again when explicitly stopped or when the last clone is
//! dropped.

use crate::models::{ReachabilityStatus, TransitionLogEntry};
use crate::source::{ConnectivitySource, SourceHandle};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc;

/// Maximum number of retained transition log entries
const TRANSITION_LOG_CAP: usize = 500;

/// Result type for reachability operations
pub type ReachabilityResult<T> = Result<T, ReachabilityError>;

/// Errors that can occur while setting up reachability monitoring
#[derive(Debug)]
pub enum ReachabilityError {
    /// The connectivity source could not be started
    Unavailable(String),
    /// A source configuration was rejected
    InvalidConfig(String),
}

impl std::fmt::Display for ReachabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReachabilityError::Unavailable(msg) => write!(f, "Reachability unavailable: {}", msg),
            ReachabilityError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ReachabilityError {}

struct Subscriber {
    id: u64,
    tx: mpsc::UnboundedSender<ReachabilityStatus>,
}

struct Inner {
    current: ReachabilityStatus,
    subscribers: Vec<Subscriber>,
    next_subscriber_id: u64,
    transition_log: Vec<TransitionLogEntry>,
    stopped: bool,
}

struct Shared {
    inner: Mutex<Inner>,
    source: Mutex<Option<Box<dyn ConnectivitySource>>>,
}

impl Shared {
    /// Publish one source event: update the current status, log the
    /// transition and fan it out to every live subscription.
    fn publish(&self, status: ReachabilityStatus) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.stopped {
                return;
            }
            inner.current = status;
            inner.transition_log.push(TransitionLogEntry {
                ts_ms: chrono::Utc::now().timestamp_millis(),
                status,
            });
            let len = inner.transition_log.len();
            if len > TRANSITION_LOG_CAP {
                let remove = len - TRANSITION_LOG_CAP;
                inner.transition_log.drain(0..remove);
            }
            inner.subscribers.retain(|s| s.tx.send(status).is_ok());
        }
    }

    /// Close the feed; every open subscription ends after its queued values
    fn close(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.stopped = true;
            inner.subscribers.clear();
        }
    }

    fn stop_source(&self) {
        if let Ok(mut guard) = self.source.lock() {
            if let Some(mut source) = guard.take() {
                source.stop();
            }
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.stop_source();
    }
}

/// Shared reachability monitor.
///
/// Cloning is cheap; all clones observe the same source. The source is
/// stopped when [`stop`](ReachabilityService::stop) is called or when the
/// last clone is dropped.
#[derive(Clone)]
pub struct ReachabilityService {
    shared: Arc<Shared>,
}

impl ReachabilityService {
    /// Create a service and start its connectivity source.
    ///
    /// The status is `Unreachable` until the source reports for the first
    /// time. Must be called within a Tokio runtime: events are drained on a
    /// background task so the reporting thread is never blocked by
    /// subscribers.
    pub fn new(mut source: Box<dyn ConnectivitySource>) -> ReachabilityResult<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        source.start(SourceHandle::new(tx))?;

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                current: ReachabilityStatus::Unreachable,
                subscribers: Vec::new(),
                next_subscriber_id: 0,
                transition_log: Vec::new(),
                stopped: false,
            }),
            source: Mutex::new(Some(source)),
        });

        let weak = Arc::downgrade(&shared);
        tokio::spawn(async move {
            while let Some(status) = rx.recv().await {
                match weak.upgrade() {
                    Some(shared) => shared.publish(status),
                    None => return,
                }
            }
            // Source released its handle: end of feed
            if let Some(shared) = weak.upgrade() {
                log::debug!("Connectivity source released its handle, closing reachability feed");
                shared.close();
            }
        });

        Ok(Self { shared })
    }

    /// The most recently observed status; `Unreachable` before the source
    /// has reported anything
    pub fn current_status(&self) -> ReachabilityStatus {
        match self.shared.inner.lock() {
            Ok(inner) => inner.current,
            Err(_) => ReachabilityStatus::Unreachable,
        }
    }

    /// Subscribe to status events.
    ///
    /// The subscription immediately carries the status current at subscribe
    /// time, then every later event in publication order. It ends once the
    /// service has been stopped.
    pub fn subscribe(&self) -> ReachabilitySubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut id = 0;
        if let Ok(mut inner) = self.shared.inner.lock() {
            let _ = tx.send(inner.current);
            if !inner.stopped {
                inner.next_subscriber_id += 1;
                id = inner.next_subscriber_id;
                inner.subscribers.push(Subscriber { id, tx });
            }
        }
        // On a stopped service the sender is dropped right here, so the
        // subscription ends after the replayed value.
        ReachabilitySubscription {
            rx,
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        match self.shared.inner.lock() {
            Ok(inner) => inner.subscribers.len(),
            Err(_) => 0,
        }
    }

    /// Recent transitions, oldest first
    pub fn transition_log(&self) -> Vec<TransitionLogEntry> {
        match self.shared.inner.lock() {
            Ok(inner) => inner.transition_log.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// Stop the connectivity source.
    ///
    /// Open subscriptions end after their already queued values; a gated
    /// retry waiting on this service gives up silently.
    pub fn stop(&self) {
        log::info!("Stopping reachability monitoring");
        self.shared.stop_source();
    }
}

/// A live feed of reachability status values.
///
/// The first value is the status current at subscribe time; every following
/// value is a source event in publication order. Dropping the subscription
/// unregisters it from the service.
pub struct ReachabilitySubscription {
    rx: mpsc::UnboundedReceiver<ReachabilityStatus>,
    shared: Weak<Shared>,
    id: u64,
}

impl ReachabilitySubscription {
    /// Next status value; `None` once the service has been stopped
    pub async fn next(&mut self) -> Option<ReachabilityStatus> {
        self.rx.recv().await
    }

    /// Discard the replayed current status so only genuine transitions
    /// remain. Only meaningful before any value has been consumed.
    pub fn skip_replayed(&mut self) {
        let _ = self.rx.try_recv();
    }

    /// Wait for the next `Reachable` value, discarding everything else;
    /// `None` once the service has been stopped
    pub async fn reachable(&mut self) -> Option<ReachabilityStatus> {
        while let Some(status) = self.next().await {
            if status.is_reachable() {
                return Some(status);
            }
        }
        None
    }
}

impl Drop for ReachabilitySubscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            if let Ok(mut inner) = shared.inner.lock() {
                inner.subscribers.retain(|s| s.id != self.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ManualSource;

    fn reachable(via_wifi: bool) -> ReachabilityStatus {
        ReachabilityStatus::Reachable { via_wifi }
    }

    struct FailingSource;

    impl ConnectivitySource for FailingSource {
        fn start(&mut self, _handle: SourceHandle) -> ReachabilityResult<()> {
            Err(ReachabilityError::Unavailable("no notifier".to_string()))
        }

        fn stop(&mut self) {}
    }

    #[tokio::test]
    async fn test_initial_status_is_unreachable() {
        let service = ReachabilityService::new(Box::new(ManualSource::new())).unwrap();
        assert_eq!(service.current_status(), ReachabilityStatus::Unreachable);

        let mut sub = service.subscribe();
        assert_eq!(sub.next().await, Some(ReachabilityStatus::Unreachable));
    }

    #[tokio::test]
    async fn test_construction_fails_when_source_unavailable() {
        let result = ReachabilityService::new(Box::new(FailingSource));
        assert!(matches!(result, Err(ReachabilityError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_replay_one_for_late_subscribers() {
        let source = ManualSource::new();
        let reporter = source.reporter();
        let service = ReachabilityService::new(Box::new(source)).unwrap();

        let mut early = service.subscribe();
        assert_eq!(early.next().await, Some(ReachabilityStatus::Unreachable));

        assert!(reporter.report(reachable(true)));
        // The early subscription observing the event guarantees it has been published
        assert_eq!(early.next().await, Some(reachable(true)));
        assert_eq!(service.current_status(), reachable(true));

        let mut late = service.subscribe();
        assert_eq!(late.next().await, Some(reachable(true)));
    }

    #[tokio::test]
    async fn test_events_delivered_in_order_to_all_subscribers() {
        let source = ManualSource::new();
        let reporter = source.reporter();
        let service = ReachabilityService::new(Box::new(source)).unwrap();

        let mut first = service.subscribe();
        let mut second = service.subscribe();

        reporter.report(reachable(false));
        reporter.report(ReachabilityStatus::Unreachable);
        reporter.report(reachable(true));

        let expected = [
            ReachabilityStatus::Unreachable,
            reachable(false),
            ReachabilityStatus::Unreachable,
            reachable(true),
        ];
        for status in expected {
            assert_eq!(first.next().await, Some(status));
        }
        for status in expected {
            assert_eq!(second.next().await, Some(status));
        }
    }

    #[tokio::test]
    async fn test_subscription_drop_unregisters() {
        let service = ReachabilityService::new(Box::new(ManualSource::new())).unwrap();

        let first = service.subscribe();
        let second = service.subscribe();
        assert_eq!(service.subscriber_count(), 2);

        drop(first);
        assert_eq!(service.subscriber_count(), 1);
        drop(second);
        assert_eq!(service.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stop_ends_subscriptions() {
        let source = ManualSource::new();
        let reporter = source.reporter();
        let service = ReachabilityService::new(Box::new(source)).unwrap();

        let mut sub = service.subscribe();
        assert_eq!(sub.next().await, Some(ReachabilityStatus::Unreachable));

        service.stop();
        assert!(!reporter.report(reachable(true)));
        assert_eq!(sub.next().await, None);

        // Subscriptions made after stopping still replay the last status
        let mut late = service.subscribe();
        assert_eq!(late.next().await, Some(ReachabilityStatus::Unreachable));
        assert_eq!(late.next().await, None);
    }

    #[tokio::test]
    async fn test_transition_log_records_events() {
        let source = ManualSource::new();
        let reporter = source.reporter();
        let service = ReachabilityService::new(Box::new(source)).unwrap();

        let mut sub = service.subscribe();
        assert_eq!(sub.next().await, Some(ReachabilityStatus::Unreachable));

        reporter.report(reachable(false));
        reporter.report(ReachabilityStatus::Unreachable);
        assert_eq!(sub.next().await, Some(reachable(false)));
        assert_eq!(sub.next().await, Some(ReachabilityStatus::Unreachable));

        let log = service.transition_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].status, reachable(false));
        assert_eq!(log[1].status, ReachabilityStatus::Unreachable);
        assert!(log[0].ts_ms > 0);
        assert!(log[0].ts_ms <= log[1].ts_ms);
    }
}
