use std::time::Duration;

use tracing::debug;

use crate::error::TransportError;
use crate::shutdown::Shutdown;

pub const FETCH_ATTEMPTS: u32 = 3;
pub const FETCH_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: FETCH_ATTEMPTS,
            delay: FETCH_RETRY_DELAY,
        }
    }
}

/// Call `operation` until it yields a value or the policy runs out of attempts.
///
/// `Ok(None)` and `Err(_)` both consume one attempt; errors are logged and
/// never returned. The delay between attempts waits on `shutdown`, and an
/// interrupt ends the loop early with `None`.
pub fn retrying_fetch<T, F>(
    label: &str,
    policy: &RetryPolicy,
    shutdown: &Shutdown,
    mut operation: F,
) -> Option<T>
where
    F: FnMut() -> Result<Option<T>, TransportError>,
{
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        match operation() {
            Ok(Some(value)) => return Some(value),
            Ok(None) => debug!(label, attempt, attempts, "fetch returned nothing"),
            Err(e) => debug!(label, attempt, attempts, error = %e, "fetch failed"),
        }

        if attempt < attempts && !shutdown.sleep(policy.delay) {
            debug!(label, "retry abandoned on shutdown");
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn stops_at_first_value() {
        let mut calls = 0;
        let result = retrying_fetch("test", &quick(3), &Shutdown::new(), || {
            calls += 1;
            Ok(if calls == 2 { Some("story") } else { None })
        });
        assert_eq!(result, Some("story"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn gives_up_after_all_attempts() {
        let mut calls = 0;
        let result: Option<u32> = retrying_fetch("test", &quick(3), &Shutdown::new(), || {
            calls += 1;
            Ok(None)
        });
        assert_eq!(result, None);
        assert_eq!(calls, 3);
    }

    #[test]
    fn transport_errors_count_as_attempts() {
        let mut calls = 0;
        let result = retrying_fetch("test", &quick(3), &Shutdown::new(), || {
            calls += 1;
            if calls < 3 {
                Err(TransportError::Connect("refused".into()))
            } else {
                Ok(Some(7))
            }
        });
        assert_eq!(result, Some(7));
        assert_eq!(calls, 3);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let mut calls = 0;
        let _: Option<()> = retrying_fetch("test", &quick(0), &Shutdown::new(), || {
            calls += 1;
            Ok(None)
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn delay_between_attempts_not_after_the_last() {
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(200),
        };
        let mut calls = Vec::new();
        let started = Instant::now();
        let result: Option<()> = retrying_fetch("test", &policy, &Shutdown::new(), || {
            calls.push(started.elapsed());
            Ok(None)
        });
        let total = started.elapsed();

        assert_eq!(result, None);
        assert_eq!(calls.len(), 3);
        for pair in calls.windows(2) {
            assert!(pair[1] - pair[0] >= policy.delay, "attempts at {calls:?}");
        }
        // two waits, not three
        assert!(total >= Duration::from_millis(400), "took {total:?}");
        assert!(total < Duration::from_millis(600), "took {total:?}");
    }

    #[test]
    fn first_hit_does_not_wait() {
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_secs(5),
        };
        let started = Instant::now();
        let result = retrying_fetch("test", &policy, &Shutdown::new(), || Ok(Some(1)));
        assert_eq!(result, Some(1));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn shutdown_cuts_retries_short() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        let mut calls = 0;
        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_secs(60),
        };
        let result: Option<()> = retrying_fetch("test", &policy, &shutdown, || {
            calls += 1;
            Ok(None)
        });
        assert_eq!(result, None);
        assert_eq!(calls, 1);
    }
}
