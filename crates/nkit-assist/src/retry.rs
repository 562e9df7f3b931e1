//! Retry policy for Messages API calls.
//!
//! | Failure                      | Wait before retry `n` (0-based)  |
//! |------------------------------|----------------------------------|
//! | 529 overloaded               | `2 * 2^n` s                      |
//! | 429 rate limited             | `Retry-After` s if numeric, else 60 s |
//! | 500, 502, 503, 504           | `2^n` s                          |
//! | transport error or timeout   | `2^n` s                          |
//! | any other status             | not retried                      |

use std::time::Duration;

use tracing::warn;

/// One failed call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("HTTP {status}: {body}")]
    Status {
        status: u16,
        retry_after: Option<String>,
        body: String,
    },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connect(String),
}

impl CallError {
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why a retried call finally failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError {
    #[error("{0}")]
    Permanent(CallError),

    #[error("failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: CallError },
}

impl RetryError {
    /// The error of the last attempt.
    #[must_use]
    pub const fn last(&self) -> &CallError {
        match self {
            Self::Permanent(last) | Self::Exhausted { last, .. } => last,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RetryPolicy {
    /// Wait before retry number `retry` (0-based), or `None` when `err` is
    /// not worth retrying.
    #[must_use]
    pub fn delay(&self, err: &CallError, retry: u32) -> Option<Duration> {
        let exp = 2_u64.saturating_pow(retry);
        let secs = match err {
            CallError::Status { status: 529, .. } => exp.saturating_mul(2),
            CallError::Status {
                status: 429,
                retry_after,
                ..
            } => retry_after
                .as_deref()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(60),
            CallError::Status {
                status: 500 | 502 | 503 | 504,
                ..
            }
            | CallError::Timeout(_)
            | CallError::Connect(_) => exp,
            CallError::Status { .. } => return None,
        };
        Some(Duration::from_secs(secs))
    }
}

/// Run `op` until it succeeds, fails permanently or runs out of retries.
///
/// `op` receives the 0-based attempt number. `sleep` is called with each
/// backoff; production code passes `std::thread::sleep`.
///
/// # Errors
///
/// Returns [`RetryError::Permanent`] for a non-retryable failure and
/// [`RetryError::Exhausted`] once `max_retries` retries have failed.
pub fn execute_with_retry<T, F, S>(
    policy: &RetryPolicy,
    mut op: F,
    mut sleep: S,
) -> Result<T, RetryError>
where
    F: FnMut(u32) -> Result<T, CallError>,
    S: FnMut(Duration),
{
    let mut attempt = 0;
    loop {
        let err = match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let Some(wait) = policy.delay(&err, attempt) else {
            return Err(RetryError::Permanent(err));
        };
        if attempt >= policy.max_retries {
            return Err(RetryError::Exhausted {
                attempts: attempt + 1,
                last: err,
            });
        }
        warn!(
            attempt = attempt + 1,
            wait_secs = wait.as_secs(),
            error = %err,
            "assistant call failed; retrying"
        );
        sleep(wait);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn status(code: u16) -> CallError {
        CallError::Status {
            status: code,
            retry_after: None,
            body: String::new(),
        }
    }

    #[test]
    fn overloaded_backs_off_from_two_seconds() {
        let policy = RetryPolicy::default();
        let waits: Vec<u64> = (0..3)
            .filter_map(|n| policy.delay(&status(529), n))
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(waits, vec![2, 4, 8]);
    }

    #[test]
    fn rate_limit_honors_numeric_retry_after() {
        let policy = RetryPolicy::default();
        let err = CallError::Status {
            status: 429,
            retry_after: Some("7".to_string()),
            body: String::new(),
        };
        assert_eq!(policy.delay(&err, 2), Some(Duration::from_secs(7)));

        let http_date = CallError::Status {
            status: 429,
            retry_after: Some("Wed, 21 Oct 2015 07:28:00 GMT".to_string()),
            body: String::new(),
        };
        assert_eq!(policy.delay(&http_date, 0), Some(Duration::from_secs(60)));
        assert_eq!(policy.delay(&status(429), 0), Some(Duration::from_secs(60)));
    }

    #[test]
    fn server_and_transport_errors_back_off_exponentially() {
        let policy = RetryPolicy::default();
        for code in [500, 502, 503, 504] {
            assert_eq!(policy.delay(&status(code), 1), Some(Duration::from_secs(2)));
        }
        assert_eq!(
            policy.delay(&CallError::Timeout("read".to_string()), 2),
            Some(Duration::from_secs(4))
        );
        assert_eq!(
            policy.delay(&CallError::Connect("dns".to_string()), 0),
            Some(Duration::from_secs(1))
        );
    }

    #[test]
    fn client_errors_are_permanent() {
        let policy = RetryPolicy::default();
        for code in [400, 401, 403, 404, 501] {
            assert_eq!(policy.delay(&status(code), 0), None);
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let mut slept = Vec::new();
        let result = execute_with_retry(
            &RetryPolicy::default(),
            |attempt| if attempt < 2 { Err(status(503)) } else { Ok("done") },
            |d| slept.push(d.as_secs()),
        );
        assert_eq!(result, Ok("done"));
        assert_eq!(slept, vec![1, 2]);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let mut calls = 0;
        let mut slept = Vec::new();
        let result: Result<(), _> = execute_with_retry(
            &RetryPolicy { max_retries: 3 },
            |_| {
                calls += 1;
                Err(status(529))
            },
            |d| slept.push(d.as_secs()),
        );
        assert_eq!(calls, 4);
        assert_eq!(slept, vec![2, 4, 8]);
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 4, .. })));
    }

    #[test]
    fn permanent_failure_stops_immediately() {
        let mut calls = 0;
        let result: Result<(), _> = execute_with_retry(
            &RetryPolicy::default(),
            |_| {
                calls += 1;
                Err(status(401))
            },
            |_| panic!("must not sleep"),
        );
        assert_eq!(calls, 1);
        assert_eq!(result.map_err(|e| e.last().status()), Err(Some(401)));
    }

    proptest! {
        #[test]
        fn delay_never_shrinks_with_retries(code in 400_u16..600, retry in 0_u32..20) {
            let policy = RetryPolicy::default();
            let err = status(code);
            match (policy.delay(&err, retry), policy.delay(&err, retry + 1)) {
                (Some(now), Some(next)) => prop_assert!(next >= now),
                (None, None) => {}
                other => prop_assert!(false, "inconsistent delays: {other:?}"),
            }
        }
    }
}
