//! Bounded fixed-interval polling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::AlertError;

/// Longest single sleep between cancel-flag checks.
const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct Poller {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Wall-clock budget for the whole loop, measured from the first fetch.
    pub deadline: Option<Duration>,
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Poller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Poller {
            interval,
            max_attempts,
            deadline: None,
            cancel: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Sleep one interval in slices so a cancel lands promptly.
    /// Returns false if cancelled mid-sleep.
    fn wait(&self) -> bool {
        let mut remaining = self.interval;
        while !remaining.is_zero() {
            if self.cancelled() {
                return false;
            }
            let step = remaining.min(CANCEL_CHECK_SLICE);
            thread::sleep(step);
            remaining -= step;
        }
        !self.cancelled()
    }

    /// Call `fetch` until `is_in_progress` is false for its result.
    ///
    /// Fetch errors propagate immediately. Running out of attempts or
    /// deadline yields `Timeout`; a raised cancel flag yields `Cancelled`.
    pub fn poll_until_ready<S, F, P>(&self, mut fetch: F, is_in_progress: P) -> Result<S, AlertError>
    where
        S: std::fmt::Debug,
        F: FnMut() -> Result<S, AlertError>,
        P: Fn(&S) -> bool,
    {
        let start = Instant::now();
        let mut attempts = 0u32;

        while attempts < self.max_attempts {
            if self.cancelled() {
                return Err(AlertError::Cancelled { attempts });
            }

            attempts += 1;
            let status = fetch()?;
            if !is_in_progress(&status) {
                debug!(attempts, ?status, "poll complete");
                return Ok(status);
            }
            debug!(attempts, max = self.max_attempts, ?status, "still in progress");

            if attempts == self.max_attempts {
                break;
            }
            if let Some(deadline) = self.deadline {
                if start.elapsed() + self.interval > deadline {
                    return Err(AlertError::Timeout { attempts });
                }
            }
            if !self.wait() {
                return Err(AlertError::Cancelled { attempts });
            }
        }

        Err(AlertError::Timeout { attempts })
    }
}

/// Free-function form of [`Poller::poll_until_ready`].
pub fn poll_until_ready<S, F, P>(fetch: F, is_in_progress: P, poller: &Poller) -> Result<S, AlertError>
where
    S: std::fmt::Debug,
    F: FnMut() -> Result<S, AlertError>,
    P: Fn(&S) -> bool,
{
    poller.poll_until_ready(fetch, is_in_progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast(max_attempts: u32) -> Poller {
        Poller::new(Duration::ZERO, max_attempts)
    }

    #[test]
    fn returns_first_terminal_status() {
        let mut states = vec!["PENDING", "RUNNING", "TERMINATED"].into_iter();
        let mut calls = 0;
        let result = fast(10).poll_until_ready(
            || {
                calls += 1;
                Ok(states.next().unwrap_or("TERMINATED"))
            },
            |s| *s != "TERMINATED",
        );
        assert_eq!(result.unwrap(), "TERMINATED");
        assert_eq!(calls, 3);
    }

    #[test]
    fn exhausting_attempts_is_timeout() {
        let mut calls = 0;
        let err = fast(4)
            .poll_until_ready(
                || {
                    calls += 1;
                    Ok("RUNNING")
                },
                |_| true,
            )
            .unwrap_err();
        assert!(matches!(err, AlertError::Timeout { attempts: 4 }));
        assert_eq!(calls, 4);
    }

    #[test]
    fn zero_attempts_never_fetches() {
        let err = fast(0)
            .poll_until_ready(|| -> Result<&str, AlertError> { panic!("fetched") }, |_| true)
            .unwrap_err();
        assert!(matches!(err, AlertError::Timeout { attempts: 0 }));
    }

    #[test]
    fn fetch_error_propagates_without_retry() {
        let mut calls = 0;
        let err = fast(5)
            .poll_until_ready(
                || -> Result<&str, AlertError> {
                    calls += 1;
                    Err(AlertError::Http { status: 403, body: "denied".into() })
                },
                |_| true,
            )
            .unwrap_err();
        assert!(matches!(err, AlertError::Http { status: 403, .. }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn deadline_stops_before_next_sleep() {
        let poller = Poller::new(Duration::from_millis(50), 1000).with_deadline(Duration::from_millis(120));
        let started = Instant::now();
        let err = poller.poll_until_ready(|| Ok(1), |_| true).unwrap_err();
        match err {
            AlertError::Timeout { attempts } => assert!((2..=3).contains(&attempts), "attempts = {attempts}"),
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn cancel_flag_stops_loop() {
        let flag = Arc::new(AtomicBool::new(false));
        let poller = fast(100).with_cancel(Arc::clone(&flag));
        let mut calls = 0;
        let err = poll_until_ready(
            || {
                calls += 1;
                if calls == 2 {
                    flag.store(true, Ordering::SeqCst);
                }
                Ok(calls)
            },
            |_| true,
            &poller,
        )
        .unwrap_err();
        assert!(matches!(err, AlertError::Cancelled { attempts: 2 }));
    }

    #[test]
    fn already_cancelled_never_fetches() {
        let flag = Arc::new(AtomicBool::new(true));
        let err = fast(3)
            .with_cancel(flag)
            .poll_until_ready(|| -> Result<u8, AlertError> { panic!("fetched") }, |_| true)
            .unwrap_err();
        assert!(matches!(err, AlertError::Cancelled { attempts: 0 }));
    }
}
