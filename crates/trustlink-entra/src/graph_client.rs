//! Thin Microsoft Graph transport: bearer auth, paging and throttling.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::{EntraError, EntraResult, TokenCache};

/// Upper bound on how long a `Retry-After` header can make us wait.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Error envelope Graph wraps failures in.
#[derive(Debug, Deserialize)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub inner_error: Option<serde_json::Value>,
}

/// One page of a Graph collection.
#[derive(Debug, Deserialize)]
pub struct ODataResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

/// How often throttled (429) or transient (502/503/504) answers are retried.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// First wait when the server sends no `Retry-After`; doubles per retry.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

/// Graph client scoped to one endpoint and API version.
#[derive(Debug)]
pub struct GraphClient {
    http: reqwest::Client,
    tokens: Arc<TokenCache>,
    base_url: String,
    retry: RetryPolicy,
}

impl GraphClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn new(
        token_cache: Arc<TokenCache>,
        graph_endpoint: impl Into<String>,
        api_version: impl Into<String>,
    ) -> EntraResult<Self> {
        Self::with_retry_policy(token_cache, graph_endpoint, api_version, RetryPolicy::default())
    }

    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be built.
    pub fn with_retry_policy(
        token_cache: Arc<TokenCache>,
        graph_endpoint: impl Into<String>,
        api_version: impl Into<String>,
        retry: RetryPolicy,
    ) -> EntraResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EntraError::Config(format!("cannot build Graph HTTP client: {e}")))?;

        Ok(Self {
            http,
            tokens: token_cache,
            base_url: format!("{}/{}", graph_endpoint.into(), api_version.into()),
            retry,
        })
    }

    /// `{graph_endpoint}/{api_version}`, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url.clone()
    }

    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> EntraResult<T> {
        self.execute(Method::GET, url, None::<&()>).await
    }

    #[instrument(skip(self, body))]
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> EntraResult<T> {
        self.execute(Method::POST, url, Some(body)).await
    }

    /// Graph answers most PATCHes with 204; ask for `()` in that case.
    #[instrument(skip(self, body))]
    pub async fn patch<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> EntraResult<T> {
        self.execute(Method::PATCH, url, Some(body)).await
    }

    /// Collects every page of a collection by following `@odata.nextLink`.
    #[instrument(skip(self))]
    pub async fn get_all<T: DeserializeOwned>(&self, url: &str) -> EntraResult<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());

        while let Some(page_url) = next {
            let page: ODataResponse<T> = self.get(&page_url).await?;
            debug!(count = page.value.len(), "Fetched page");
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }

    async fn execute<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> EntraResult<T> {
        let mut attempt = 0u32;
        let mut backoff = self.retry.initial_backoff;

        loop {
            let token = self.tokens.get_token().await?;
            let mut request = self.http.request(method.clone(), url).bearer_auth(token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if is_transient(status) {
                if attempt >= self.retry.max_retries {
                    return Err(EntraError::MaxRetriesExceeded {
                        attempts: attempt,
                        status: status.as_u16(),
                    });
                }
                let wait = retry_after(response.headers()).unwrap_or(backoff);
                attempt += 1;
                warn!(%status, attempt, ?wait, "Graph asked us to back off");
                tokio::time::sleep(wait).await;
                backoff *= 2;
                continue;
            }

            if status.is_success() {
                let bytes = response.bytes().await?;
                // 204 and other empty bodies decode as JSON null, which fits `()`.
                let payload: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
                return Ok(serde_json::from_slice(payload)?);
            }

            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            let text = response.text().await.unwrap_or_default();
            return Err(graph_error(status, text));
        }
    }
}

fn is_transient(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn graph_error(status: StatusCode, text: String) -> EntraError {
    match serde_json::from_str::<ODataError>(&text) {
        Ok(ODataError { error }) => EntraError::GraphApi {
            status: status.as_u16(),
            code: error.code,
            message: error.message,
            inner_error: error.inner_error.map(|v| v.to_string()),
        },
        Err(_) => EntraError::GraphApi {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: text,
            inner_error: None,
        },
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: u64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}
