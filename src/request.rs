//! Per-request configuration.

use crate::retry::RetryPolicy;
use crate::Error;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// Everything that describes one HTTP request: method, path, headers, query
/// parameters, and an optional retry policy overriding the client default.
///
/// # Examples
///
/// ```
/// use decanter::{RequestSpec, RetryPolicy};
/// use http::Method;
///
/// let spec = RequestSpec::new(Method::GET, "/wines")
///     .with_query("region", "rift-valley")
///     .with_query("page", "2")
///     .with_retry(RetryPolicy::new(5));
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// The HTTP method.
    pub method: Method,
    /// Path relative to the client's base URL.
    pub path: String,
    /// Headers for this request, merged over the client defaults.
    pub headers: HeaderMap,
    /// Query parameters, appended in order.
    pub query: Vec<(String, String)>,
    /// Retry policy for this request; `None` uses the client default.
    pub retry: Option<RetryPolicy>,
}

impl RequestSpec {
    /// A spec with the given method and path and nothing else.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            retry: None,
        }
    }

    /// Adds a header.
    ///
    /// # Errors
    ///
    /// Fails when the name or value is not a valid header.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header value: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Sets a retry policy for this request only.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }
}
