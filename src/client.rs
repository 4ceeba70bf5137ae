//! HTTP client for JSON APIs, with opt-in retries.
//!
//! [`Client`] is the main entry point. Build one with [`ClientBuilder`],
//! then call [`get`](Client::get), [`post`](Client::post), and friends, or
//! [`send`](Client::send) with a [`RequestSpec`] for per-request headers,
//! query parameters, or a retry override.

use crate::request::RequestSpec;
use crate::response::Response;
use crate::retry::{self, RetryEvent, RetryPolicy, RetryPredicate, RetryTransient};
use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use url::Url;

/// Error payload shape the storefront services return on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
    details: Option<serde_json::Value>,
}

/// An HTTP client for making JSON API calls.
///
/// Clients are cheap to clone and reuse a connection pool, so build one per
/// upstream service and share it. Retries are off unless a policy is set on
/// the builder or on an individual [`RequestSpec`].
///
/// # Examples
///
/// ```no_run
/// use decanter::{Client, RetryPolicy};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct NewOrder {
///     wine_id: u64,
///     quantity: u32,
/// }
///
/// #[derive(Deserialize)]
/// struct Order {
///     id: u64,
///     total_cents: u64,
/// }
///
/// # async fn example() -> Result<(), decanter::Error> {
/// let client = Client::builder()
///     .base_url("https://api.tastywine.example")?
///     .timeout(Duration::from_secs(10))
///     .retry_policy(RetryPolicy::default())
///     .build()?;
///
/// let order = NewOrder { wine_id: 42, quantity: 6 };
/// let placed = client.post::<_, Order>("/orders", &order).await?;
/// println!("order {} for {} cents", placed.id, placed.total_cents);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    retry_predicate: Box<dyn RetryPredicate>,
    timeout: Option<Duration>,
}

impl Client {
    /// Creates a new [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends a request described by `spec`, retrying per its policy (or the
    /// client default), and decodes the JSON response into `Res`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use decanter::{Client, RequestSpec, RetryPolicy};
    /// use http::Method;
    ///
    /// # async fn example() -> Result<(), decanter::Error> {
    /// # let client = Client::builder().base_url("https://api.tastywine.example")?.build()?;
    /// let spec = RequestSpec::new(Method::GET, "/wines")
    ///     .with_query("search", "syrah")
    ///     .with_retry(RetryPolicy::new(5));
    ///
    /// let wines = client.send::<(), serde_json::Value>(spec, None).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn send<Req, Res>(&self, spec: RequestSpec, body: Option<&Req>) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let policy = spec.retry.unwrap_or(self.inner.retry_policy);
        let start = Instant::now();
        let mut attempts = 0;

        let mut operation = || self.dispatch(&spec, body);
        let result = retry::execute(
            &mut operation,
            &policy,
            self.inner.retry_predicate.as_ref(),
            |event| {
                if let RetryEvent::AttemptStarted { attempt } = event {
                    attempts = attempt;
                }
            },
        )
        .await;

        let mut response = result?;
        response.latency = start.elapsed();
        response.attempts = attempts;

        tracing::info!(
            status = response.status.as_u16(),
            latency_ms = response.latency.as_millis() as u64,
            attempts,
            "request completed"
        );

        Ok(response)
    }

    /// One attempt: build the request, send it, classify the outcome.
    async fn dispatch<Req, Res>(&self, spec: &RequestSpec, body: Option<&Req>) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let mut url = self.inner.base_url.clone();
        url.set_path(&spec.path);
        for (key, value) in &spec.query {
            url.query_pairs_mut().append_pair(key, value);
        }

        tracing::debug!(method = %spec.method, url = %url, "dispatching request");

        let mut request = self.inner.http.request(spec.method.clone(), url);
        for (name, value) in &self.inner.default_headers {
            request = request.header(name, value);
        }
        for (name, value) in &spec.headers {
            request = request.header(name, value);
        }
        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = body {
            let json =
                serde_json::to_value(body).map_err(|e| Error::Serialization(e.to_string()))?;
            request = request.json(&json);
        }

        let response = request.send().await?;
        self.read_response(response).await
    }

    /// Turns a wire response into either a decoded [`Response`] or a
    /// classified [`Error`].
    async fn read_response<Res>(&self, response: reqwest::Response) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let retry_after = parse_retry_after(&headers);
            let raw = response.text().await.unwrap_or_default();
            let payload: Option<ErrorBody> = serde_json::from_str(&raw).ok();
            let (message, code, details) = match payload {
                Some(body) => (body.message, body.code, body.details),
                None => (None, None, None),
            };
            let message = message.unwrap_or_else(|| {
                if raw.is_empty() {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                } else {
                    raw.clone()
                }
            });

            if status.is_client_error() {
                tracing::error!(status = status.as_u16(), %message, "client error response");
            } else {
                tracing::warn!(status = status.as_u16(), %message, "server error response");
            }

            return Err(Error::Http {
                status,
                message,
                code,
                details,
                retry_after,
            });
        }

        let raw = response.text().await?;
        // Empty bodies (204s and friends) decode as JSON null.
        let decoded = if raw.is_empty() {
            serde_json::from_str::<Res>("null")
        } else {
            serde_json::from_str::<Res>(&raw)
        };

        match decoded {
            Ok(data) => Ok(Response::new(data, status, headers)),
            Err(e) => {
                tracing::error!(error = %e, status = status.as_u16(), "failed to decode response body");
                Err(Error::Deserialization {
                    status,
                    reason: e.to_string(),
                    raw_body: raw,
                })
            }
        }
    }

    /// GET `path` and decode the response.
    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.send::<(), Res>(RequestSpec::new(Method::GET, path), None)
            .await
    }

    /// POST `body` to `path` as JSON and decode the response.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.send(RequestSpec::new(Method::POST, path), Some(body))
            .await
    }

    /// PUT `body` to `path` as JSON and decode the response.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.send(RequestSpec::new(Method::PUT, path), Some(body))
            .await
    }

    /// PATCH `body` to `path` as JSON and decode the response.
    pub async fn patch<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.send(RequestSpec::new(Method::PATCH, path), Some(body))
            .await
    }

    /// DELETE `path` and decode the response. Empty bodies decode into
    /// `()` or `Option<T>`.
    pub async fn delete<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.send::<(), Res>(RequestSpec::new(Method::DELETE, path), None)
            .await
    }
}

/// Builder for a [`Client`].
pub struct ClientBuilder {
    base_url: Option<Url>,
    default_headers: HeaderMap,
    retry_policy: RetryPolicy,
    retry_predicate: Option<Box<dyn RetryPredicate>>,
    timeout: Option<Duration>,
}

impl ClientBuilder {
    /// A builder with no base URL, no default headers, no timeout, and no
    /// retries.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            retry_policy: RetryPolicy::none(),
            retry_predicate: None,
            timeout: None,
        }
    }

    /// Sets the base URL all request paths resolve against. Required.
    ///
    /// # Errors
    ///
    /// Fails when the URL does not parse.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a header sent with every request.
    ///
    /// # Errors
    ///
    /// Fails when the name or value is not a valid header.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header name: {e}")))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("invalid header value: {e}")))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the default retry policy for all requests.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Sets the retry predicate. Defaults to the transient-failure
    /// classifier.
    pub fn retry_predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.retry_predicate = Some(predicate);
        self
    }

    /// Sets a per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Fails without a base URL, or when the underlying HTTP client cannot
    /// be constructed.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Configuration("base URL is required".to_string()))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                default_headers: self.default_headers,
                retry_policy: self.retry_policy,
                retry_predicate: self
                    .retry_predicate
                    .unwrap_or_else(|| Box::new(RetryTransient)),
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a `Retry-After` header, in either delay-seconds or HTTP-date
/// form.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(http::header::RETRY_AFTER)?.to_str().ok()?;

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = httpdate::parse_http_date(value).ok()?;
    date.duration_since(SystemTime::now()).ok()
}
