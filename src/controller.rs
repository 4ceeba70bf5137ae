//! Observable retry state for interactive consumers.
//!
//! [`RetryController`] owns an operation and re-runs it under a
//! [`RetryPolicy`], publishing progress through a watch channel instead of
//! relying on any particular UI framework. Consumers either poll
//! [`RetryController::state`] or subscribe and await changes.

use crate::retry::{self, RetryEvent, RetryPolicy, RetryPredicate, RetryTransient};
use crate::{Error, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of a controller's progress.
///
/// The default value is the idle state: not retrying, zero attempts, no
/// error.
#[derive(Debug, Clone, Default)]
pub struct RetryState {
    /// A run is currently in flight.
    pub is_retrying: bool,
    /// Attempts made so far in the current run, or by the final failed run.
    pub attempts: u32,
    /// The failure that ended the last run, if it failed.
    pub error: Option<Arc<Error>>,
}

/// Re-runs a stored operation with retries, exposing observable progress.
///
/// Each call to [`retry`](RetryController::retry) resets the state, runs the
/// operation to completion under the configured policy, and leaves the state
/// reflecting the outcome. [`reset`](RetryController::reset) forces the idle
/// state from anywhere.
///
/// # Examples
///
/// ```no_run
/// use decanter::{RetryController, RetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() {
/// let mut controller = RetryController::new(|| async { fetch_stock().await })
///     .with_policy(RetryPolicy::default().with_delay(Duration::from_millis(250)));
///
/// let mut updates = controller.subscribe();
/// tokio::spawn(async move {
///     while updates.changed().await.is_ok() {
///         let state = updates.borrow().clone();
///         println!("attempt {} in flight: {}", state.attempts, state.is_retrying);
///     }
/// });
///
/// match controller.retry().await {
///     Ok(stock) => println!("{stock} bottles left"),
///     Err(e) => eprintln!("{}", e.user_message()),
/// }
/// # }
/// # async fn fetch_stock() -> decanter::Result<u32> { Ok(3) }
/// ```
pub struct RetryController<F> {
    operation: F,
    policy: RetryPolicy,
    predicate: Box<dyn RetryPredicate>,
    state: watch::Sender<RetryState>,
}

impl<F, Fut, T> RetryController<F>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    /// Creates a controller around `operation` with the default policy and
    /// classifier.
    pub fn new(operation: F) -> Self {
        let (state, _) = watch::channel(RetryState::default());
        Self {
            operation,
            policy: RetryPolicy::default(),
            predicate: Box::new(RetryTransient),
            state,
        }
    }

    /// Replaces the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the retry predicate.
    pub fn with_predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.predicate = predicate;
        self
    }

    /// The current state snapshot.
    pub fn state(&self) -> RetryState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    ///
    /// The receiver yields every terminal state and whatever intermediate
    /// states it is fast enough to observe; a watch channel only keeps the
    /// latest value.
    pub fn subscribe(&self) -> watch::Receiver<RetryState> {
        self.state.subscribe()
    }

    /// Forces the idle state, whatever the controller was doing before.
    pub fn reset(&self) {
        self.state.send_replace(RetryState::default());
    }

    /// Runs the operation to completion under the configured policy.
    ///
    /// State transitions: resets to `{is_retrying: true, attempts: 0}` on
    /// entry, bumps `attempts` after every failed attempt (visible before
    /// the inter-attempt wait), and lands on either the idle state (success)
    /// or `{is_retrying: false, attempts, error}` (failure). The final error
    /// is both stored and returned.
    pub async fn retry(&mut self) -> std::result::Result<T, Arc<Error>> {
        self.state.send_replace(RetryState {
            is_retrying: true,
            attempts: 0,
            error: None,
        });

        let state = &self.state;
        let mut final_attempts = 0;
        let result = retry::execute(
            &mut self.operation,
            &self.policy,
            self.predicate.as_ref(),
            |event| {
                if let RetryEvent::AttemptFailed { attempt, .. } = event {
                    final_attempts = attempt;
                    state.send_modify(|s| s.attempts = attempt);
                }
            },
        )
        .await;

        match result {
            Ok(value) => {
                self.state.send_replace(RetryState::default());
                Ok(value)
            }
            Err(error) => {
                let error = Arc::new(error);
                self.state.send_replace(RetryState {
                    is_retrying: false,
                    attempts: final_attempts,
                    error: Some(Arc::clone(&error)),
                });
                Err(error)
            }
        }
    }
}
