//! Connectivity-gated retry for fallible network operations
//!
//! A failed operation is not retried on a timer: the retry waits until the
//! reachability feed reports a fresh `Reachable` status and then re-invokes
//! the operation from the top. Consumers immediately receive a fallback
//! value for every failure so a UI can render a default instead of blocking.

use crate::service::{ReachabilityService, ReachabilitySubscription};
use std::future::Future;

enum RetryState {
    /// Ready to run the operation
    Idle,
    /// Operation failed; watching the feed for the next `Reachable` status
    WaitingForReachability(ReachabilitySubscription),
    /// Operation succeeded or the service was stopped
    Done,
}

/// Gate an operation's retries on connectivity restoration.
///
/// `operation` is invoked anew for each attempt. On failure the error is
/// logged, `value_on_failure` is emitted in its place, and the next attempt
/// waits for the reachability feed to report `Reachable` again. The replayed
/// status at subscribe time is skipped: a failure that happens while the
/// network is already reachable is only retried once the source reports
/// reachability again, not immediately.
pub fn retry_on_reachable<T, E, F, Fut>(
    operation: F,
    value_on_failure: T,
    service: &ReachabilityService,
) -> RetryOnReachable<T, F>
where
    T: Clone,
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    RetryOnReachable {
        operation,
        value_on_failure,
        service: service.clone(),
        state: RetryState::Idle,
    }
}

/// A connectivity-gated retry in progress.
///
/// Values are pulled with [`next`](RetryOnReachable::next); dropping the
/// handle cancels the operation and any pending reachability wait.
pub struct RetryOnReachable<T, F> {
    operation: F,
    value_on_failure: T,
    service: ReachabilityService,
    state: RetryState,
}

impl<T, F> RetryOnReachable<T, F> {
    /// Produce the next value.
    ///
    /// Returns the operation's result on success (after which the retry is
    /// complete and `next` returns `None`), or `value_on_failure` for each
    /// failed attempt. Between a failure and the next attempt this waits,
    /// without polling, for the reachability feed; if the service is
    /// stopped during that wait the retry gives up and returns `None`.
    ///
    /// Cancellation-safe: state only advances at completed awaits, so a
    /// timed-out `next` call can simply be issued again.
    pub async fn next<E, Fut>(&mut self) -> Option<T>
    where
        T: Clone,
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        loop {
            match &mut self.state {
                RetryState::Done => return None,
                RetryState::WaitingForReachability(subscription) => {
                    match subscription.reachable().await {
                        Some(_) => {
                            log::info!("Connectivity restored, retrying operation");
                            self.state = RetryState::Idle;
                        }
                        None => {
                            log::debug!("Reachability feed closed while waiting, giving up");
                            self.state = RetryState::Done;
                            return None;
                        }
                    }
                }
                RetryState::Idle => match (self.operation)().await {
                    Ok(value) => {
                        self.state = RetryState::Done;
                        return Some(value);
                    }
                    Err(e) => {
                        log::warn!("Operation failed, waiting for connectivity: {}", e);
                        let mut subscription = self.service.subscribe();
                        subscription.skip_replayed();
                        self.state = RetryState::WaitingForReachability(subscription);
                        return Some(self.value_on_failure.clone());
                    }
                },
            }
        }
    }

    /// True while a failed attempt is parked on the reachability feed
    pub fn is_waiting_for_reachability(&self) -> bool {
        matches!(self.state, RetryState::WaitingForReachability(_))
    }
}
