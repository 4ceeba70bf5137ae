//! Retry executor and controller behavior, no network required.
//!
//! Run with: `cargo run --example retry_behavior`

use decanter::{with_retry_observed, Error, RetryController, RetryEvent, RetryPolicy};
use std::cell::Cell;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter("decanter=info,retry_behavior=info")
        .init();

    println!("=== observed retries ===");
    let calls = Cell::new(0u32);
    let result = with_retry_observed(
        || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(Error::Timeout)
                } else {
                    Ok("shipment confirmed")
                }
            }
        },
        RetryPolicy::default().with_delay(Duration::from_millis(200)),
        |event| match event {
            RetryEvent::AttemptStarted { attempt } => println!("  attempt {attempt} starting"),
            RetryEvent::AttemptFailed {
                attempt, retry_in, ..
            } => match retry_in {
                Some(wait) => println!("  attempt {attempt} failed, retrying in {wait:?}"),
                None => println!("  attempt {attempt} failed, done"),
            },
            RetryEvent::Succeeded { attempts } => println!("  succeeded after {attempts}"),
            RetryEvent::GaveUp { attempts } => println!("  gave up after {attempts}"),
        },
    )
    .await;
    println!("result: {result:?}");

    println!();
    println!("=== stateful controller ===");
    let flaky_calls = Cell::new(0u32);
    let mut controller = RetryController::new(|| {
        flaky_calls.set(flaky_calls.get() + 1);
        let n = flaky_calls.get();
        async move {
            if n < 2 {
                Err(Error::Timeout)
            } else {
                Ok(format!("inventory synced on call {n}"))
            }
        }
    })
    .with_policy(RetryPolicy::new(4).with_delay(Duration::from_millis(150)));

    match controller.retry().await {
        Ok(message) => println!("{message}"),
        Err(e) => println!("failed: {}", e.user_message()),
    }

    let state = controller.state();
    println!(
        "final state: retrying={} attempts={} error={}",
        state.is_retrying,
        state.attempts,
        state.error.is_some()
    );
}
