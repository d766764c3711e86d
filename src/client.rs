//! TFE API client.
//!
//! Low-level HTTP client that handles authentication, request construction,
//! rate limiting, retries and error translation. Resource operations live on
//! the service types returned by accessors such as
//! [`TfeClient::workspaces`].

use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::error::{translate_error_response, Result, TfeError};
use crate::jsonapi::{self, Document, RequestBody, MEDIA_TYPE_JSONAPI};
use crate::pagination::Page;
use crate::query::QueryParams;
use crate::rate_limit::{RateLimitInfo, RateLimiter};
use crate::retry::{AttemptOutcome, RetryDecision, RetryLogHook, RetryPolicy};

const USER_AGENT_VALUE: &str = concat!("tfeapi/", env!("CARGO_PKG_VERSION"));

/// Header reporting the API version of the remote service.
const HEADER_API_VERSION: &str = "tfp-api-version";

/// Accept value for raw payloads fetched outside the API.
const MEDIA_TYPE_TEXT: &str = "text/plain";

/// Low-level TFE API client.
///
/// This struct is cheaply cloneable; clones share the connection pool,
/// rate limiter and configuration.
///
/// # Example
///
/// ```no_run
/// use tfeapi::{Config, TfeClient};
///
/// # async fn example() -> tfeapi::Result<()> {
/// // Create from environment variables, reading rate limits from the server
/// let client = TfeClient::connect(Config::from_env()?).await?;
///
/// let orgs = client.organizations().list(&Default::default()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TfeClient {
    inner: Arc<Inner>,
    cancel: Option<CancellationToken>,
}

struct Inner {
    http: Client,
    base_url: Url,
    registry_base_url: Url,
    token: String,
    headers: HeaderMap,
    retry: RetryPolicy,
    retry_hook: Option<RetryLogHook>,
    limiter: RateLimiter,
    remote_api_version: RwLock<Option<String>>,
}

impl std::fmt::Debug for TfeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfeClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("registry_base_url", &self.inner.registry_base_url.as_str())
            .finish_non_exhaustive()
    }
}

fn join_base(address: &Url, path: &str) -> Url {
    let mut url = address.clone();
    let mut path = path.to_string();
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if !path.ends_with('/') {
        path.push('/');
    }
    url.set_path(&path);
    url.set_query(None);
    url
}

impl TfeClient {
    /// Create a client from environment variables without contacting the server.
    ///
    /// See [`Config::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(Config::from_env()?)
    }

    /// Create a new client from `config`.
    ///
    /// The rate limiter starts unlimited; use [`TfeClient::connect`] to
    /// configure it from the server's advertised limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the HTTP client cannot
    /// be built.
    pub fn new(config: Config) -> Result<Self> {
        let address = Url::parse(&config.address)?;
        let base_url = join_base(&address, &config.base_path);
        let registry_base_url = join_base(&address, &config.registry_base_path);

        let http = match config.http_client.clone() {
            Some(http) => http,
            None => Client::builder()
                .user_agent(USER_AGENT_VALUE)
                .brotli(true)
                .gzip(true)
                .deflate(true)
                .build()
                .map_err(TfeError::HttpError)?,
        };

        let retry = config.retry_policy();

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url,
                registry_base_url,
                token: config.token,
                headers: config.headers,
                retry,
                retry_hook: config.retry_log_hook,
                limiter: RateLimiter::new(),
                remote_api_version: RwLock::new(None),
            }),
            cancel: None,
        })
    }

    /// Create a client and read API metadata from the server.
    ///
    /// Pings the API once to record its version and configure the rate
    /// limiter from `X-RateLimit-Limit`.
    pub async fn connect(config: Config) -> Result<Self> {
        let client = Self::new(config)?;
        client.refresh_metadata().await?;
        Ok(client)
    }

    /// Ping the API and update the remote version and rate limiter.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_metadata(&self) -> Result<()> {
        let response = self.request(Method::GET, "ping")?.send().await?;
        let headers = response.headers();

        let version = headers
            .get(HEADER_API_VERSION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if let Ok(mut slot) = self.inner.remote_api_version.write() {
            *slot = version;
        }

        let info = RateLimitInfo::from_headers(headers);
        self.inner.limiter.configure(info.limit);
        Ok(())
    }

    /// The API version reported by the server on the last metadata refresh.
    pub fn remote_api_version(&self) -> Option<String> {
        self.inner
            .remote_api_version
            .read()
            .ok()
            .and_then(|v| v.clone())
    }

    /// Get the base URL of the JSON:API endpoints.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Get the base URL of the module registry endpoints.
    pub fn registry_base_url(&self) -> &Url {
        &self.inner.registry_base_url
    }

    /// The limiter every outgoing attempt draws from.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// A client sharing this one's pool and configuration whose requests
    /// stop as soon as `token` is cancelled.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: Some(token),
        }
    }

    /// Start a request for `path`, relative to the API base URL.
    pub fn request(&self, method: Method, path: &str) -> Result<ApiRequest<'_>> {
        let url = self.inner.base_url.join(path)?;
        Ok(ApiRequest::new(self, method, url))
    }

    /// Start a request for `path`, relative to the registry base URL.
    pub fn registry_request(&self, method: Method, path: &str) -> Result<ApiRequest<'_>> {
        let url = self.inner.registry_base_url.join(path)?;
        Ok(ApiRequest::new(self, method, url))
    }

    /// GET an absolute URL without API credentials.
    ///
    /// Used for pre-signed URLs such as log archives that live outside the
    /// API. The request carries the client's default headers and goes through
    /// the same rate limiting and retry policy as API requests.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_url(&self, url: &Url) -> Result<Response> {
        ApiRequest::new(self, Method::GET, url.clone())
            .anonymous()
            .accept(MEDIA_TYPE_TEXT)
            .send()
            .await
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Sleep for `delay`, returning early with an error on cancellation.
    pub(crate) async fn sleep(&self, delay: Duration) -> Result<()> {
        match &self.cancel {
            Some(token) => tokio::select! {
                _ = tokio::time::sleep(delay) => Ok(()),
                _ = token.cancelled() => Err(TfeError::Cancelled),
            },
            None => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }

    /// Check response status and convert errors.
    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();

        if (200..400).contains(&status.as_u16()) {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        Err(translate_error_response(status, &body))
    }
}

/// A request under construction, bound to the client that will send it.
///
/// Query parameters are encoded with [`QueryParams::encode`]; bodies are
/// only attached to mutating methods.
#[derive(Debug)]
pub struct ApiRequest<'a> {
    client: &'a TfeClient,
    method: Method,
    url: Url,
    query: QueryParams,
    body: Option<RequestBody>,
    accept: Option<&'static str>,
    authenticated: bool,
}

impl<'a> ApiRequest<'a> {
    fn new(client: &'a TfeClient, method: Method, url: Url) -> Self {
        Self {
            client,
            method,
            url,
            query: QueryParams::new(),
            body: None,
            accept: None,
            authenticated: true,
        }
    }

    /// Add query parameters from a serializable options struct.
    pub fn query<Q: Serialize + ?Sized>(mut self, options: &Q) -> Result<Self> {
        let params = QueryParams::from_options(options)?;
        self.extend_query(params);
        Ok(self)
    }

    /// Add already-built query parameters.
    pub fn params(mut self, params: QueryParams) -> Self {
        self.extend_query(params);
        self
    }

    fn extend_query(&mut self, params: QueryParams) {
        self.query.extend(params);
    }

    /// Attach a body. Ignored for methods that don't carry one.
    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Override the `Accept` header.
    pub fn accept(mut self, media_type: &'static str) -> Self {
        self.accept = Some(media_type);
        self
    }

    /// Send without the `Authorization` header.
    pub fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The full URL including the encoded query string.
    pub fn url(&self) -> Url {
        let mut url = self.url.clone();
        let query = self.query.encode();
        if !query.is_empty() {
            url.set_query(Some(&query));
        }
        url
    }

    fn carries_body(&self) -> bool {
        matches!(
            self.method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }

    /// Headers for this request: client defaults overlaid with
    /// authentication and content negotiation.
    pub fn headers(&self) -> Result<HeaderMap> {
        let inner = &self.client.inner;
        let mut headers = inner.headers.clone();

        if self.authenticated {
            let auth = HeaderValue::from_str(&format!("Bearer {}", inner.token))
                .map_err(|_| TfeError::InvalidHeader("authorization token".to_string()))?;
            headers.insert(AUTHORIZATION, auth);
        }
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let body_media = self
            .body
            .as_ref()
            .filter(|_| self.carries_body())
            .map(|b| b.format().media_type());

        let accept = self.accept.or(body_media).unwrap_or(MEDIA_TYPE_JSONAPI);
        headers.insert(ACCEPT, HeaderValue::from_static(accept));
        if let Some(media) = body_media {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(media));
        }

        Ok(headers)
    }

    fn encoded_body(&self) -> Result<Option<Vec<u8>>> {
        match &self.body {
            Some(body) if self.carries_body() => Ok(Some(body.to_bytes()?)),
            Some(_) => {
                tracing::debug!(method = %self.method, "ignoring body on non-mutating request");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Send the request, retrying per the client's policy, and return the
    /// successful response.
    #[tracing::instrument(skip(self), fields(method = %self.method, url = %self.url))]
    pub async fn send(self) -> Result<Response> {
        let client = self.client;
        let inner = &client.inner;
        let policy = &inner.retry;

        let url = self.url();
        let headers = self.headers()?;
        let body = self.encoded_body()?;

        let mut retries = 0u32;
        loop {
            if client.is_cancelled() {
                return Err(TfeError::Cancelled);
            }

            match &client.cancel {
                Some(token) => tokio::select! {
                    _ = inner.limiter.acquire() => {}
                    _ = token.cancelled() => return Err(TfeError::Cancelled),
                },
                None => inner.limiter.acquire().await,
            }

            let mut builder = inner
                .http
                .request(self.method.clone(), url.clone())
                .headers(headers.clone());
            if let Some(bytes) = &body {
                builder = builder.body(bytes.clone());
            }

            tracing::debug!(attempt = retries + 1, "dispatching request");
            let result = match &client.cancel {
                Some(token) => tokio::select! {
                    r = builder.send() => r,
                    _ = token.cancelled() => return Err(TfeError::Cancelled),
                },
                None => builder.send().await,
            };

            let delay = match &result {
                Ok(response) => {
                    let outcome = AttemptOutcome::Response {
                        status: response.status(),
                        headers: response.headers(),
                    };
                    match policy.decide(client.cancel.as_ref(), &outcome) {
                        RetryDecision::Cancelled => return Err(TfeError::Cancelled),
                        RetryDecision::Stop => None,
                        RetryDecision::Retry if retries >= policy.max_retries => None,
                        RetryDecision::Retry => Some(self.backoff(retries + 1, &outcome)),
                    }
                }
                Err(_) => {
                    let outcome = AttemptOutcome::TransportError;
                    match policy.decide(client.cancel.as_ref(), &outcome) {
                        RetryDecision::Cancelled => return Err(TfeError::Cancelled),
                        RetryDecision::Stop => None,
                        RetryDecision::Retry if retries >= policy.max_retries => None,
                        RetryDecision::Retry => Some(self.backoff(retries + 1, &outcome)),
                    }
                }
            };

            let Some(delay) = delay else {
                let response = result.map_err(TfeError::HttpError)?;
                return TfeClient::check_response(response).await;
            };

            drop(result);
            retries += 1;
            client.sleep(delay).await?;
        }
    }

    fn backoff(&self, retry: u32, outcome: &AttemptOutcome<'_>) -> Duration {
        let inner = &self.client.inner;
        let delay = inner.retry.backoff(retry, outcome);
        let event = inner.retry.event(retry, outcome, delay);

        tracing::warn!(
            retry,
            status = ?event.status,
            delay_ms = delay.as_millis() as u64,
            "retrying request"
        );
        if let Some(hook) = &inner.retry_hook {
            hook.call(&event);
        }
        delay
    }

    /// Send and decode a single-resource JSON:API document.
    pub async fn fetch_one<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.send().await?.bytes().await?;
        jsonapi::decode_one(&bytes)
    }

    /// Send and decode a single-resource document with its `included` section.
    pub async fn fetch_document<T: DeserializeOwned>(self) -> Result<Document<T>> {
        let bytes = self.send().await?.bytes().await?;
        jsonapi::decode_document(&bytes)
    }

    /// Send and decode a collection document.
    pub async fn fetch_list<T, P>(self) -> Result<Page<T, P>>
    where
        T: DeserializeOwned,
        P: DeserializeOwned + Default,
    {
        let bytes = self.send().await?.bytes().await?;
        jsonapi::decode_list(&bytes)
    }

    /// Send and decode a plain JSON response.
    pub async fn fetch_json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.send().await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send and discard the response body.
    pub async fn execute(self) -> Result<()> {
        self.send().await?;
        Ok(())
    }
}
