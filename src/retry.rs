//! Retry policy, classification predicates, and the retry executor.
//!
//! [`with_retry`] wraps an arbitrary asynchronous operation with bounded
//! attempts and jittered backoff. Progress is observable through
//! [`RetryEvent`]s, so a CLI, service, or the stateful
//! [`RetryController`](crate::RetryController) can all watch a run the same
//! way.

use crate::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Fraction of the computed wait added as random jitter.
const JITTER_FRACTION: f64 = 0.1;

/// Ceiling on server-requested `Retry-After` waits.
const RETRY_AFTER_CAP: Duration = Duration::from_secs(60);

/// How many times to attempt an operation and how long to wait in between.
///
/// `max_attempts` counts every invocation, including the first; it is never
/// less than 1. With `backoff` enabled the wait doubles per attempt
/// (`delay * 2^(attempt - 1)`), otherwise it stays fixed at `delay`. Every
/// wait gets up to 10% of random jitter added so concurrent callers do not
/// retry in lockstep.
///
/// # Examples
///
/// ```
/// use decanter::RetryPolicy;
/// use std::time::Duration;
///
/// // Defaults: 3 attempts, 1s initial delay, exponential backoff.
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, 3);
///
/// // Fixed 250ms between at most 5 attempts.
/// let fixed = RetryPolicy::fixed(Duration::from_millis(250)).with_max_attempts(5);
/// assert!(!fixed.backoff);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Wait before the first retry (and every retry, when `backoff` is off).
    pub delay: Duration,
    /// Double the wait on every subsequent retry.
    pub backoff: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
            backoff: true,
        }
    }
}

impl RetryPolicy {
    /// A policy making `max_attempts` attempts with the default delay and backoff.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// A policy with a fixed wait between attempts instead of backoff.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay,
            backoff: false,
            ..Self::default()
        }
    }

    /// Sets the total attempt budget. Clamped to at least 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Sets the base wait between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Enables or disables exponential backoff.
    pub fn with_backoff(mut self, backoff: bool) -> Self {
        self.backoff = backoff;
        self
    }

    /// The wait before the retry that follows failed attempt `attempt`
    /// (1-indexed), without jitter.
    fn base_delay(&self, attempt: u32) -> Duration {
        if self.backoff {
            let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.delay.saturating_mul(multiplier)
        } else {
            self.delay
        }
    }

    /// The wait before the retry that follows failed attempt `attempt`,
    /// jitter included.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay(attempt);
        let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..=JITTER_FRACTION));
        base + jitter
    }
}

/// Trait for deciding whether a failed attempt should be retried.
///
/// The default, [`RetryTransient`], retries whatever
/// [`Error::is_retryable`] classifies as transient. Implement this trait to
/// retry on other criteria.
///
/// # Examples
///
/// ```
/// use decanter::{Error, RetryPredicate};
///
/// struct RetryOnlyRateLimits;
///
/// impl RetryPredicate for RetryOnlyRateLimits {
///     fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
///         matches!(error, Error::Http { status, .. } if status.as_u16() == 429)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// Decides whether `error`, raised on 1-indexed `attempt`, warrants
    /// another try.
    fn should_retry(&self, error: &Error, attempt: u32) -> bool;
}

/// The default classifier: retry transport failures, timeouts, and the
/// transient HTTP statuses (408, 429, 500, 502, 503, 504).
#[derive(Debug, Clone, Copy)]
pub struct RetryTransient;

impl RetryPredicate for RetryTransient {
    fn should_retry(&self, error: &Error, _attempt: u32) -> bool {
        error.is_retryable()
    }
}

/// Progress notification emitted by the retry executor.
#[derive(Debug)]
pub enum RetryEvent<'a> {
    /// Attempt `attempt` (1-indexed) is about to run.
    AttemptStarted {
        /// The attempt number.
        attempt: u32,
    },
    /// Attempt `attempt` failed. `retry_in` is the wait before the next
    /// attempt, or `None` when this failure is terminal.
    AttemptFailed {
        /// The attempt number.
        attempt: u32,
        /// The failure the attempt produced.
        error: &'a Error,
        /// Wait before the next attempt, if one is coming.
        retry_in: Option<Duration>,
    },
    /// The operation succeeded after `attempts` attempts.
    Succeeded {
        /// Total attempts made.
        attempts: u32,
    },
    /// Retrying stopped without success: attempts exhausted or the last
    /// failure was not retryable.
    GaveUp {
        /// Total attempts made.
        attempts: u32,
    },
}

/// Runs `operation` under `policy`, retrying transient failures.
///
/// The operation's success value is returned as soon as any attempt
/// succeeds. On failure the most recent error is propagated unchanged once
/// the attempt budget is spent or the failure is judged non-retryable by the
/// default classifier.
///
/// # Examples
///
/// ```no_run
/// use decanter::{with_retry, RetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> decanter::Result<()> {
/// let inventory = with_retry(
///     || async { fetch_inventory().await },
///     RetryPolicy::default().with_delay(Duration::from_millis(200)),
/// )
/// .await?;
/// # Ok(())
/// # }
/// # async fn fetch_inventory() -> decanter::Result<u32> { Ok(12) }
/// ```
pub async fn with_retry<T, F, Fut>(mut operation: F, policy: RetryPolicy) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    execute(&mut operation, &policy, &RetryTransient, |_| {}).await
}

/// Like [`with_retry`], but with a caller-supplied retry predicate.
pub async fn with_retry_if<T, F, Fut, P>(
    mut operation: F,
    policy: RetryPolicy,
    predicate: P,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: RetryPredicate,
{
    execute(&mut operation, &policy, &predicate, |_| {}).await
}

/// Like [`with_retry`], but reporting progress through `observer`.
pub async fn with_retry_observed<T, F, Fut, O>(
    mut operation: F,
    policy: RetryPolicy,
    observer: O,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    O: FnMut(RetryEvent<'_>),
{
    execute(&mut operation, &policy, &RetryTransient, observer).await
}

/// The retry loop shared by the free functions, the client, and the
/// controller.
///
/// Attempts never exceed `policy.max_attempts`, and no attempt follows a
/// failure the predicate rejects. A server-provided `Retry-After` hint on
/// the failure overrides the computed backoff, capped at one minute.
pub(crate) async fn execute<T, F, Fut, O>(
    operation: &mut F,
    policy: &RetryPolicy,
    predicate: &dyn RetryPredicate,
    mut observer: O,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    O: FnMut(RetryEvent<'_>),
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        observer(RetryEvent::AttemptStarted { attempt });

        match operation().await {
            Ok(value) => {
                observer(RetryEvent::Succeeded { attempts: attempt });
                return Ok(value);
            }
            Err(error) => {
                let is_last = attempt >= max_attempts;
                if is_last || !predicate.should_retry(&error, attempt) {
                    observer(RetryEvent::AttemptFailed {
                        attempt,
                        error: &error,
                        retry_in: None,
                    });
                    observer(RetryEvent::GaveUp { attempts: attempt });
                    tracing::warn!(error = %error, attempt, "giving up");
                    return Err(error);
                }

                let wait = match error.retry_after() {
                    Some(hint) => hint.min(RETRY_AFTER_CAP),
                    None => policy.delay_for_attempt(attempt),
                };

                observer(RetryEvent::AttemptFailed {
                    attempt,
                    error: &error,
                    retry_in: Some(wait),
                });
                tracing::info!(
                    error = %error,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "retrying after delay"
                );

                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
