//! Request dispatch and the typed endpoint operations.

use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;

use crate::catalog::CatalogCache;
use crate::error::ApiError;
use crate::rate_limit::{RateInfo, RateLimiter};
use crate::transport::{ApiRequest, HttpTransport, Transport};
use crate::types::{NewTimeEntry, TimeEntryPatch, TimeEntryQuery, TimerStart, TimerStop};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://app.hakuna.ch/api/v1";
/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const AUTH_HEADER: HeaderName = HeaderName::from_static("x-auth-token");
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Query-string parameters.
///
/// Parameters without a value, or with an empty string value, are left out
/// of the encoded URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: Vec<(&'static str, Option<String>)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.params.push((key, Some(value.to_string())));
        self
    }

    #[must_use]
    pub fn opt(mut self, key: &'static str, value: Option<impl fmt::Display>) -> Self {
        self.params.push((key, value.map(|v| v.to_string())));
        self
    }

    /// The pairs that will actually be sent.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| (*key, v))
        })
    }

    /// Appends the pairs to `url`, percent-encoding values.
    ///
    /// `query_pairs_mut` writes spaces as `+`. A literal `+` is always
    /// escaped as `%2B`, so every remaining `+` stands for a space and is
    /// rewritten as `%20`.
    fn apply(&self, url: &mut Url) {
        let mut pairs = self.pairs().peekable();
        if pairs.peek().is_none() {
            return;
        }
        url.query_pairs_mut().extend_pairs(pairs);
        let encoded = url.query().map(|query| query.replace('+', "%20"));
        url.set_query(encoded.as_deref());
    }
}

/// A parsed response body plus the rate-limit metadata it carried.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<RateInfo>,
}

/// Connection settings for [`Client`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Value of the `X-Auth-Token` header. Calls fail with
    /// [`ApiError::MissingToken`] while this is unset or blank.
    pub token: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Hakuna API client.
///
/// Owns the rate-limit budget and the catalog cache, so two clients never
/// share throttling or cached data.
///
/// # Thread Safety
///
/// All operations take `&self`; the client can sit in an `Arc` and be used
/// from several tasks at once.
pub struct Client<T = HttpTransport> {
    transport: T,
    base_url: String,
    token: Option<String>,
    rate_limiter: RateLimiter,
    pub(crate) catalog: CatalogCache,
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client<HttpTransport> {
    /// Creates a client talking to the real API over HTTPS.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(config.timeout)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> Client<T> {
    /// Creates a client over any transport.
    ///
    /// The base URL is validated here; a missing token is only reported when
    /// a request is made.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|err| ApiError::InvalidUrl {
            url: base_url.clone(),
            reason: err.to_string(),
        })?;

        Ok(Self {
            transport,
            base_url,
            token: config.token,
            rate_limiter: RateLimiter::new(),
            catalog: CatalogCache::default(),
        })
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub const fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    fn token(&self) -> Result<&str, ApiError> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ApiError::MissingToken)
    }

    fn url(&self, path: &str, query: Option<&Query>) -> Result<Url, ApiError> {
        let raw = format!("{}{path}", self.base_url);
        let mut url = Url::parse(&raw).map_err(|err| ApiError::InvalidUrl {
            url: raw.clone(),
            reason: err.to_string(),
        })?;
        if let Some(query) = query {
            query.apply(&mut url);
        }
        Ok(url)
    }

    /// Sends one authenticated request and parses the JSON response.
    ///
    /// Waits first if the rate-limit budget is exhausted. A status of 400 or
    /// above becomes [`ApiError::Upstream`] carrying the raw body text. An
    /// empty success body parses as `null`.
    pub async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: Option<&Query>,
    ) -> Result<ApiResponse, ApiError> {
        let token = self.token()?;

        self.rate_limiter.wait_for_quota().await;

        let url = self.url(path, query)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTH_HEADER,
            HeaderValue::from_str(token).map_err(|_| ApiError::InvalidToken)?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let body = body.map(Value::to_string);
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }

        tracing::debug!(%method, path, "sending request");
        let response = self
            .transport
            .send(ApiRequest {
                method: method.clone(),
                url,
                headers,
                body,
            })
            .await?;

        let rate = RateInfo::from_headers(&response.headers);
        if let Some(info) = &rate {
            self.rate_limiter.record(info);
        }

        let status = response.status.as_u16();
        if status >= 400 {
            tracing::debug!(%method, path, status, "request failed");
            return Err(ApiError::Upstream {
                status,
                body: response.body,
            });
        }

        let data = if response.body.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&response.body)
                .map_err(|err| ApiError::InvalidResponse(err.to_string()))?
        };
        Ok(ApiResponse { data, rate })
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> Result<ApiResponse, ApiError> {
        let body = serde_json::to_value(body).map_err(ApiError::Encode)?;
        self.call(method, path, Some(&body), None).await
    }

    // ---- time entries ----

    pub async fn list_time_entries(&self, query: &TimeEntryQuery) -> Result<ApiResponse, ApiError> {
        self.call(Method::GET, "/time_entries", None, Some(&query.to_query()))
            .await
    }

    pub async fn get_time_entry(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.call(Method::GET, &format!("/time_entries/{id}"), None, None)
            .await
    }

    pub async fn create_time_entry(&self, entry: &NewTimeEntry) -> Result<ApiResponse, ApiError> {
        self.send_json(Method::POST, "/time_entries", entry).await
    }

    pub async fn update_time_entry(
        &self,
        id: i64,
        patch: &TimeEntryPatch,
    ) -> Result<ApiResponse, ApiError> {
        self.send_json(Method::PATCH, &format!("/time_entries/{id}"), patch)
            .await
    }

    pub async fn delete_time_entry(&self, id: i64) -> Result<ApiResponse, ApiError> {
        self.call(Method::DELETE, &format!("/time_entries/{id}"), None, None)
            .await
    }

    // ---- timer ----

    pub async fn get_timer(&self, user_id: Option<i64>) -> Result<ApiResponse, ApiError> {
        let query = Query::new().opt("user_id", user_id);
        self.call(Method::GET, "/timer", None, Some(&query)).await
    }

    /// Starts a timer. A JSON object body is always sent, even when empty.
    pub async fn start_timer(&self, start: &TimerStart) -> Result<ApiResponse, ApiError> {
        self.send_json(Method::POST, "/timer", start).await
    }

    pub async fn stop_timer(&self, stop: &TimerStop) -> Result<ApiResponse, ApiError> {
        self.call(Method::PUT, "/timer", None, Some(&stop.to_query()))
            .await
    }
}
