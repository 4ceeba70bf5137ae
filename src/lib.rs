//! # Decanter - a retry-aware HTTP API client
//!
//! Decanter wraps `reqwest` with the three things storefront services keep
//! re-implementing: a bounded retry executor with jittered exponential
//! backoff, a stateful controller whose progress interactive callers can
//! observe, and a small JSON client that turns non-success responses into
//! errors you can classify structurally instead of by message-matching.
//!
//! ## Quick start
//!
//! ```no_run
//! use decanter::{Client, RetryPolicy};
//! use serde::Deserialize;
//! use std::time::Duration;
//!
//! #[derive(Deserialize)]
//! struct Wine {
//!     id: u64,
//!     name: String,
//!     price_cents: u64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), decanter::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.tastywine.example")?
//!         .timeout(Duration::from_secs(10))
//!         .retry_policy(RetryPolicy::default().with_delay(Duration::from_millis(500)))
//!         .build()?;
//!
//!     let wine = client.get::<Wine>("/wines/42").await?;
//!     println!("{} costs {} cents", wine.name, wine.price_cents);
//!     println!("took {:?} over {} attempts", wine.latency, wine.attempts);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Retrying arbitrary operations
//!
//! The executor is not tied to the HTTP client; anything async that returns
//! [`Result`] can be wrapped:
//!
//! ```no_run
//! use decanter::{with_retry, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn refresh_inventory_cache() -> decanter::Result<()> { Ok(()) }
//! # async fn example() -> decanter::Result<()> {
//! with_retry(
//!     || async { refresh_inventory_cache().await },
//!     RetryPolicy::new(5).with_delay(Duration::from_millis(250)),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Retry decisions come from a [`RetryPredicate`]; the default retries
//! transport failures, timeouts, and the transient HTTP statuses (408, 429,
//! 500, 502, 503, 504). Everything else fails fast, and the final error is
//! always the underlying one, unwrapped.
//!
//! ## Observing progress
//!
//! Interactive callers hold a [`RetryController`] and either poll
//! [`RetryController::state`] or subscribe to its watch channel; batch
//! callers can pass an observer to
//! [`with_retry_observed`](retry::with_retry_observed) and receive
//! [`RetryEvent`]s directly.

mod client;
mod controller;
mod error;
pub mod request;
mod response;
pub mod retry;

pub use client::{Client, ClientBuilder};
pub use controller::{RetryController, RetryState};
pub use error::{Error, Result};
pub use request::RequestSpec;
pub use response::Response;
pub use retry::{
    with_retry, with_retry_if, with_retry_observed, RetryEvent, RetryPolicy, RetryPredicate,
    RetryTransient,
};
