//! Error types for storefront API calls.
//!
//! Failures are classified once, at the call site that produced them, into a
//! closed set of variants. Retryability is then a structural question (which
//! variant, which status) rather than string inspection of error messages.

use http::StatusCode;
use std::time::Duration;

/// HTTP statuses treated as transient by the default classifier.
const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// The main error type for storefront API calls.
///
/// # Examples
///
/// ```no_run
/// use decanter::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.tastywine.example")?
///     .build()?;
///
/// match client.get::<serde_json::Value>("/wines/42").await {
///     Ok(response) => println!("wine: {:?}", response.data),
///     Err(Error::Http { status, message, .. }) => {
///         eprintln!("server said no ({status}): {message}");
///     }
///     Err(e) => eprintln!("{}", e.user_message()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Connectivity failed before any HTTP response arrived: DNS, refused
    /// connection, broken transport.
    #[error("network error: {0}")]
    Network(reqwest::Error),

    /// The request ran out of time.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// The HTTP status code.
        status: StatusCode,
        /// Human-readable message, taken from the server's error payload when
        /// it sent one, otherwise derived from the raw body or status.
        message: String,
        /// Machine-readable error code from the payload, if any.
        code: Option<String>,
        /// Structured detail the server attached to the error, if any.
        details: Option<serde_json::Value>,
        /// Server-requested wait before trying again, from `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// A success response whose body did not match the expected shape.
    #[error("failed to decode response (status {status}): {reason}")]
    Deserialization {
        /// The HTTP status code of the response.
        status: StatusCode,
        /// The serde error message.
        reason: String,
        /// The body that failed to decode, kept for debugging.
        raw_body: String,
    },

    /// The request body could not be encoded as JSON.
    #[error("failed to encode request body: {0}")]
    Serialization(String),

    /// The client or request was misconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An invalid URL was provided.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(err)
        }
    }
}

impl Error {
    /// Returns `true` if this failure is worth another attempt.
    ///
    /// Transport failures and timeouts are retryable, as are the transient
    /// HTTP statuses 408, 429, 500, 502, 503 and 504. Every other status
    /// (including all remaining 4xx and 5xx) and every other variant is not.
    ///
    /// # Examples
    ///
    /// ```
    /// use decanter::Error;
    /// use http::StatusCode;
    ///
    /// let unavailable = Error::Http {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     message: "cellar flooded".to_string(),
    ///     code: None,
    ///     details: None,
    ///     retry_after: None,
    /// };
    /// assert!(unavailable.is_retryable());
    ///
    /// let not_found = Error::Http {
    ///     status: StatusCode::NOT_FOUND,
    ///     message: "no such wine".to_string(),
    ///     code: None,
    ///     details: None,
    ///     retry_after: None,
    /// };
    /// assert!(!not_found.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::Timeout => true,
            Error::Http { status, .. } => RETRYABLE_STATUSES.contains(&status.as_u16()),
            Error::Deserialization { .. }
            | Error::Serialization(_)
            | Error::Configuration(_)
            | Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the HTTP status code if this error carries one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Deserialization { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the server's machine-readable error code, if it sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Http { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Returns the wait the server asked for via `Retry-After`, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::Http { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// A message suitable for showing directly to an end user.
    ///
    /// Transport failures map to a connectivity hint, classified HTTP
    /// failures carry the server's own message, and everything else falls
    /// back to a generic apology.
    pub fn user_message(&self) -> String {
        match self {
            Error::Network(_) | Error::Timeout => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            Error::Http { message, .. } => message.clone(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// A specialized `Result` type for storefront API calls.
pub type Result<T> = std::result::Result<T, Error>;
