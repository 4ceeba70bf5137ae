//! Response envelope for successful calls.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successful response: the decoded body plus transaction metadata.
///
/// Dereferences to the decoded data, so most callers can treat it as the
/// body and only reach for the metadata when they care about timing or
/// retries.
///
/// # Examples
///
/// ```no_run
/// use decanter::Client;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Wine {
///     name: String,
/// }
///
/// # async fn example() -> Result<(), decanter::Error> {
/// # let client = Client::builder().base_url("https://api.tastywine.example")?.build()?;
/// let response = client.get::<Wine>("/wines/42").await?;
/// println!("{} ({:?}, {} attempts)", response.name, response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response body.
    pub data: T,
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// Wall-clock time from first dispatch to this response, retries
    /// included.
    pub latency: Duration,
    /// Attempts made to get this response; `1` means no retries were needed.
    pub attempts: u32,
}

impl<T> Response<T> {
    pub(crate) fn new(data: T, status: StatusCode, headers: HeaderMap) -> Self {
        Self {
            data,
            status,
            headers,
            latency: Duration::ZERO,
            attempts: 1,
        }
    }

    /// `true` when the call needed more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// A response header by name, when present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Maps the decoded data, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
