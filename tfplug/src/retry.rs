//! Polling helpers for remote objects that change state asynchronously
//!
//! `StateChangeConf` repeatedly refreshes an object until its state string
//! reaches one of the target states, tolerating a bounded number of "not
//! found" answers while the remote API catches up. `retry_context` re-runs an
//! operation until it stops failing with a retryable error.
//!
//! Both share the same polling schedule: exponential backoff starting from
//! 100 ms, clamped between the configured minimum and 10 seconds, unless a
//! fixed poll interval below three minutes is set.

use crate::context::Context;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(10);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);
const RETRY_MIN_TIMEOUT: Duration = Duration::from_millis(500);

pub const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Result of a single refresh: the object (None when it does not exist) and
/// its current state string, or an error that aborts the wait
pub type RefreshResult<T> = std::result::Result<(Option<T>, String), String>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateChangeError {
    #[error("{0}")]
    Refresh(String),

    #[error("couldn't find resource ({retries} retries)")]
    NotFound { retries: u32 },

    #[error("unexpected state '{state}', wanted target '{expected}'")]
    UnexpectedState { state: String, expected: String },

    #[error(
        "timeout while waiting for state to become '{expected}' (last state: '{last_state}', timeout: {timeout:?})"
    )]
    Timeout {
        last_state: String,
        expected: String,
        timeout: Duration,
    },

    #[error("context cancelled while waiting for state change")]
    Cancelled,
}

/// Waits for a remote object to reach a target state
pub struct StateChangeConf<F> {
    /// States that are allowed while waiting
    pub pending: Vec<String>,
    /// States that end the wait; empty means "wait until the object is gone"
    pub target: Vec<String>,
    pub refresh: F,
    pub timeout: Duration,
    /// Sleep before the first refresh
    pub delay: Duration,
    /// Smallest wait between refreshes
    pub min_timeout: Duration,
    /// Fixed wait between refreshes, overriding backoff when below 3 minutes
    pub poll_interval: Duration,
    /// Consecutive "not found" refreshes tolerated before failing
    pub not_found_checks: u32,
    /// Consecutive target observations required before succeeding
    pub continuous_target_occurence: u32,
}

impl<F> StateChangeConf<F> {
    pub fn new(refresh: F) -> Self {
        Self {
            pending: Vec::new(),
            target: Vec::new(),
            refresh,
            timeout: DEFAULT_TIMEOUT,
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: Duration::ZERO,
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurence: 1,
        }
    }

    pub fn pending<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn target<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn continuous_target_occurence(mut self, occurrences: u32) -> Self {
        self.continuous_target_occurence = occurrences;
        self
    }

    /// Polls until a target state is observed. Returns the last refreshed
    /// object, or `None` when waiting for the object to disappear.
    pub async fn wait_for_state<T, Fut>(
        mut self,
        ctx: &Context,
    ) -> Result<Option<T>, StateChangeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RefreshResult<T>>,
    {
        let expected = self.target.join(", ");
        let timeout = self.timeout;
        let (last_state_tx, last_state_rx) = watch::channel(String::new());

        tracing::debug!(
            "Waiting for state to become: [{}] (pending: [{}])",
            expected,
            self.pending.join(", ")
        );

        tokio::select! {
            result = self.poll(&last_state_tx) => result,
            _ = sleep(timeout) => {
                let last_state = last_state_rx.borrow().clone();
                tracing::warn!(
                    "Timeout after {:?} waiting for [{}], last state '{}'",
                    timeout,
                    expected,
                    last_state
                );
                Err(StateChangeError::Timeout { last_state, expected, timeout })
            }
            _ = ctx.cancelled() => Err(StateChangeError::Cancelled),
        }
    }

    async fn poll<T, Fut>(
        &mut self,
        last_state: &watch::Sender<String>,
    ) -> Result<Option<T>, StateChangeError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RefreshResult<T>>,
    {
        let not_found_checks = match self.not_found_checks {
            0 => DEFAULT_NOT_FOUND_CHECKS,
            n => n,
        };
        let wanted_occurrences = self.continuous_target_occurence.max(1);

        let mut not_found_ticks = 0u32;
        let mut target_occurence = 0u32;
        let mut wait = INITIAL_WAIT;

        if !self.delay.is_zero() {
            tracing::debug!("Waiting {:?} before first refresh", self.delay);
            sleep(self.delay).await;
        }

        loop {
            let (object, state) = (self.refresh)().await.map_err(StateChangeError::Refresh)?;
            last_state.send_replace(state.clone());

            match object {
                None if self.target.is_empty() => {
                    target_occurence += 1;
                    if target_occurence >= wanted_occurrences {
                        return Ok(None);
                    }
                }
                None => {
                    not_found_ticks += 1;
                    tracing::debug!(
                        "Object not found ({}/{} checks)",
                        not_found_ticks,
                        not_found_checks
                    );
                    if not_found_ticks > not_found_checks {
                        return Err(StateChangeError::NotFound {
                            retries: not_found_ticks,
                        });
                    }
                }
                Some(object) => {
                    not_found_ticks = 0;
                    if self.target.contains(&state) {
                        target_occurence += 1;
                        if target_occurence >= wanted_occurrences {
                            tracing::debug!("Reached target state '{}'", state);
                            return Ok(Some(object));
                        }
                    } else if self.pending.contains(&state) {
                        target_occurence = 0;
                    } else if !self.pending.is_empty() {
                        return Err(StateChangeError::UnexpectedState {
                            state,
                            expected: self.target.join(", "),
                        });
                    }
                }
            }

            // backoff only while the target has not been seen
            if target_occurence == 0 {
                wait *= 2;
            }
            wait = next_wait(wait, self.min_timeout, self.poll_interval);
            tracing::trace!("Waiting {:?} before next refresh", wait);
            sleep(wait).await;
        }
    }
}

fn next_wait(wait: Duration, min_timeout: Duration, poll_interval: Duration) -> Duration {
    if !poll_interval.is_zero() && poll_interval < MAX_POLL_INTERVAL {
        return poll_interval;
    }
    if wait < min_timeout {
        min_timeout
    } else if wait > MAX_WAIT {
        MAX_WAIT
    } else {
        wait
    }
}

/// Outcome of one attempt inside `retry_context`
#[derive(Debug)]
pub enum RetryError<E> {
    Retryable(E),
    NonRetryable(E),
}

#[derive(Debug, thiserror::Error)]
pub enum RetryFailure<E> {
    /// The last error returned by the operation
    #[error("{0}")]
    Failed(E),

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("context cancelled")]
    Cancelled,
}

/// Runs `f` until it succeeds, fails with a non-retryable error, or `timeout`
/// elapses. On timeout the last retryable error is returned when there is one.
pub async fn retry_context<T, E, F, Fut>(
    ctx: &Context,
    timeout: Duration,
    mut f: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
    E: std::fmt::Display,
{
    let deadline = Instant::now() + timeout;
    let mut wait = INITIAL_WAIT;
    let mut last_error: Option<E> = None;
    let timed_out = |last_error: Option<E>| match last_error {
        Some(e) => RetryFailure::Failed(e),
        None => RetryFailure::Timeout(timeout),
    };

    loop {
        let attempt = tokio::select! {
            attempt = tokio::time::timeout_at(deadline, f()) => attempt,
            _ = ctx.cancelled() => return Err(RetryFailure::Cancelled),
        };

        match attempt {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(RetryError::NonRetryable(e))) => return Err(RetryFailure::Failed(e)),
            Ok(Err(RetryError::Retryable(e))) => {
                tracing::debug!("Retryable error: {}", e);
                last_error = Some(e);
            }
            Err(_) => return Err(timed_out(last_error)),
        }

        wait = next_wait(wait * 2, RETRY_MIN_TIMEOUT, Duration::ZERO);
        let wake = std::cmp::min(Instant::now() + wait, deadline);
        tokio::select! {
            _ = tokio::time::sleep_until(wake) => {}
            _ = ctx.cancelled() => return Err(RetryFailure::Cancelled),
        }
        if Instant::now() >= deadline {
            return Err(timed_out(last_error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Refresh function replaying a fixed sequence of (exists, state) pairs;
    /// the last entry repeats forever
    fn scripted(
        steps: Vec<(bool, &'static str)>,
    ) -> (
        Arc<AtomicU32>,
        impl FnMut() -> std::future::Ready<RefreshResult<u32>>,
    ) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let refresh = move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let (exists, state) = steps[(n as usize).min(steps.len() - 1)];
            std::future::ready(Ok((exists.then_some(n), state.to_string())))
        };
        (calls, refresh)
    }

    #[tokio::test(start_paused = true)]
    async fn reaches_target_after_pending_states() {
        let (calls, refresh) = scripted(vec![
            (true, "pending"),
            (true, "installing"),
            (true, "active"),
        ]);

        let result = StateChangeConf::new(refresh)
            .pending(["pending", "installing"])
            .target(["active"])
            .timeout(Duration::from_secs(60))
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(result, Ok(Some(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_for_delay_before_first_refresh() {
        let (calls, refresh) = scripted(vec![(true, "active")]);
        let start = Instant::now();

        StateChangeConf::new(refresh)
            .target(["active"])
            .delay(Duration::from_secs(10))
            .wait_for_state(&Context::new())
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_secs(10));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fails_after_too_many_not_found_refreshes() {
        let (calls, refresh) = scripted(vec![(false, "")]);

        let result = StateChangeConf::new(refresh)
            .pending(["pending"])
            .target(["active"])
            .not_found_checks(3)
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(result, Err(StateChangeError::NotFound { retries: 4 }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn found_object_resets_not_found_counter() {
        let (_, refresh) = scripted(vec![
            (false, ""),
            (false, ""),
            (true, "pending"),
            (false, ""),
            (false, ""),
            (true, "active"),
        ]);

        let result = StateChangeConf::new(refresh)
            .pending(["pending"])
            .target(["active"])
            .not_found_checks(2)
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(result, Ok(Some(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_target_waits_for_absence() {
        let (calls, refresh) = scripted(vec![
            (true, "deleting"),
            (true, "deleting"),
            (false, ""),
        ]);

        let result = StateChangeConf::new(refresh)
            .pending(["deleting"])
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(result, Ok(None));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_state_fails_when_pending_is_set() {
        let (_, refresh) = scripted(vec![(true, "pending"), (true, "error")]);

        let result = StateChangeConf::new(refresh)
            .pending(["pending"])
            .target(["active"])
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(
            result,
            Err(StateChangeError::UnexpectedState {
                state: "error".to_string(),
                expected: "active".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unlisted_states_are_tolerated_without_pending() {
        let (_, refresh) = scripted(vec![(true, "resizing"), (true, "active")]);

        let result = StateChangeConf::new(refresh)
            .target(["active"])
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(result, Ok(Some(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_with_last_state() {
        let (_, refresh) = scripted(vec![(true, "pending")]);

        let result = StateChangeConf::new(refresh)
            .pending(["pending"])
            .target(["active"])
            .timeout(Duration::from_secs(30))
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(
            result,
            Err(StateChangeError::Timeout {
                last_state: "pending".to_string(),
                expected: "active".to_string(),
                timeout: Duration::from_secs(30),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_target_occurence_requires_consecutive_hits() {
        let (calls, refresh) = scripted(vec![
            (true, "active"),
            (true, "pending"),
            (true, "active"),
            (true, "active"),
        ]);

        let result = StateChangeConf::new(refresh)
            .pending(["pending"])
            .target(["active"])
            .continuous_target_occurence(2)
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(result, Ok(Some(3)));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_error_aborts_wait() {
        let refresh = || std::future::ready(Err::<(Option<u32>, String), _>("boom".to_string()));

        let result = StateChangeConf::new(refresh)
            .target(["active"])
            .wait_for_state(&Context::new())
            .await;

        assert_eq!(result, Err(StateChangeError::Refresh("boom".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_context_stops_waiting() {
        let (_, refresh) = scripted(vec![(true, "pending")]);
        let ctx = Context::new();
        ctx.cancel();

        let result = StateChangeConf::new(refresh)
            .pending(["pending"])
            .target(["active"])
            .wait_for_state(&ctx)
            .await;

        assert_eq!(result, Err(StateChangeError::Cancelled));
    }

    #[test]
    fn next_wait_clamps_and_honours_poll_interval() {
        let min = Duration::from_secs(3);
        assert_eq!(next_wait(Duration::from_millis(200), min, Duration::ZERO), min);
        assert_eq!(
            next_wait(Duration::from_secs(5), min, Duration::ZERO),
            Duration::from_secs(5)
        );
        assert_eq!(next_wait(Duration::from_secs(40), min, Duration::ZERO), MAX_WAIT);
        assert_eq!(
            next_wait(Duration::from_secs(40), min, Duration::from_secs(1)),
            Duration::from_secs(1)
        );
        // intervals of three minutes or more fall back to backoff
        assert_eq!(
            next_wait(Duration::from_secs(40), min, Duration::from_secs(300)),
            MAX_WAIT
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retry_context_retries_until_success() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result: Result<&str, RetryFailure<String>> =
            retry_context(&Context::new(), Duration::from_secs(60), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RetryError::Retryable("vpc is attached".to_string()))
                    } else {
                        Ok("deleted")
                    }
                }
            })
            .await;

        assert_eq!(tokio_test::assert_ok!(result), "deleted");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_context_stops_on_non_retryable() {
        let result: Result<(), RetryFailure<String>> =
            retry_context(&Context::new(), Duration::from_secs(60), || async {
                Err(RetryError::NonRetryable("forbidden".to_string()))
            })
            .await;

        let failure = tokio_test::assert_err!(result);
        assert!(matches!(failure, RetryFailure::Failed(e) if e == "forbidden"));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_context_timeout_returns_last_error() {
        let result: Result<(), RetryFailure<String>> =
            retry_context(&Context::new(), Duration::from_secs(5), || async {
                Err(RetryError::Retryable("still attached".to_string()))
            })
            .await;

        assert!(matches!(result, Err(RetryFailure::Failed(e)) if e == "still attached"));
    }
}
