use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::common::{ApiErrorResponse, ApiQueryParams, ListOptions, Meta};
use super::error::ApiError;
use super::pool::{ConnectionPoolConfig, ConnectionStats, RequestCounters};

pub const DEFAULT_ENDPOINT: &str = "https://api.vultr.com/v2";

/// Vultr API client
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: String,
    auth_header: String,
    retry_config: RetryConfig,
    /// Minimum spacing between two requests
    rate_limit: Duration,
    last_request: Mutex<Option<Instant>>,
    counters: RequestCounters,
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10000,
            timeout_seconds: 60,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based): doubles from
    /// `initial_backoff_ms`, capped at `max_backoff_ms`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u64
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

impl Client {
    /// Create a new API client with default configuration
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, ApiError> {
        Self::with_config(
            endpoint,
            api_key,
            RetryConfig::default(),
            Duration::from_millis(500),
        )
    }

    /// Create a new API client with custom retry configuration and request spacing
    pub fn with_config(
        endpoint: &str,
        api_key: &str,
        retry_config: RetryConfig,
        rate_limit: Duration,
    ) -> Result<Self, ApiError> {
        let pool_config = ConnectionPoolConfig {
            request_timeout: Duration::from_secs(retry_config.timeout_seconds),
            ..Default::default()
        };

        let http_client = pool_config.build_client()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: endpoint.trim_end_matches('/').to_string(),
                auth_header: format!("Bearer {}", api_key),
                retry_config,
                rate_limit,
                last_request: Mutex::new(None),
                counters: RequestCounters::default(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execute a GET request with retry logic
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || {
                self.inner
                    .http_client
                    .get(self.url(path))
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
            },
            "GET",
            path,
        )
        .await
    }

    /// Execute a GET request with query parameters
    pub async fn get_with_params<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &ApiQueryParams,
    ) -> Result<T, ApiError> {
        let full_path = format!("{}{}", path, params.to_query_string());
        self.get(&full_path).await
    }

    /// Execute a POST request with retry logic
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || {
                self.inner
                    .http_client
                    .post(self.url(path))
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .json(body)
                    .send()
            },
            "POST",
            path,
        )
        .await
    }

    /// Execute a PUT request with retry logic
    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || {
                self.inner
                    .http_client
                    .put(self.url(path))
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .json(body)
                    .send()
            },
            "PUT",
            path,
        )
        .await
    }

    /// Execute a PATCH request with retry logic
    pub async fn patch<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.execute_with_retry(
            || {
                self.inner
                    .http_client
                    .patch(self.url(path))
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .json(body)
                    .send()
            },
            "PATCH",
            path,
        )
        .await
    }

    /// Execute a DELETE request with retry logic
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute_with_retry(
            || {
                self.inner
                    .http_client
                    .delete(self.url(path))
                    .header(AUTHORIZATION, &self.inner.auth_header)
                    .send()
            },
            "DELETE",
            path,
        )
        .await
    }

    /// Follows the `meta.links.next` cursor until every page of a list
    /// endpoint has been read. `key` names the array in the response body.
    pub async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &str,
    ) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut options = ListOptions::new();

        loop {
            let page: serde_json::Value = self
                .get_with_params(path, &options.to_query_params())
                .await?;
            let (mut page_items, meta) = split_page::<T>(page, key)?;
            items.append(&mut page_items);

            let next = meta.links.next;
            if next.is_empty() || options.cursor.as_deref() == Some(next.as_str()) {
                break;
            }
            options = options.with_cursor(next);
        }

        tracing::debug!("Listed {} {} from {}", items.len(), key, path);
        Ok(items)
    }

    /// Request counters of this client and all its clones
    pub fn connection_stats(&self) -> ConnectionStats {
        self.inner.counters.snapshot()
    }

    pub fn account(&self) -> super::account::AccountApi<'_> {
        super::account::AccountApi::new(self)
    }

    pub fn regions(&self) -> super::regions::RegionsApi<'_> {
        super::regions::RegionsApi::new(self)
    }

    pub fn plans(&self) -> super::plans::PlansApi<'_> {
        super::plans::PlansApi::new(self)
    }

    pub fn os(&self) -> super::os::OsApi<'_> {
        super::os::OsApi::new(self)
    }

    pub fn instances(&self) -> super::instances::InstancesApi<'_> {
        super::instances::InstancesApi::new(self)
    }

    pub fn ssh_keys(&self) -> super::ssh_keys::SshKeysApi<'_> {
        super::ssh_keys::SshKeysApi::new(self)
    }

    pub fn startup_scripts(&self) -> super::startup_scripts::StartupScriptsApi<'_> {
        super::startup_scripts::StartupScriptsApi::new(self)
    }

    pub fn domains(&self) -> super::domains::DomainsApi<'_> {
        super::domains::DomainsApi::new(self)
    }

    pub fn vpcs(&self) -> super::vpcs::VpcsApi<'_> {
        super::vpcs::VpcsApi::new(self)
    }

    pub fn firewalls(&self) -> super::firewalls::FirewallsApi<'_> {
        super::firewalls::FirewallsApi::new(self)
    }

    pub fn blocks(&self) -> super::blocks::BlocksApi<'_> {
        super::blocks::BlocksApi::new(self)
    }

    pub fn reserved_ips(&self) -> super::reserved_ips::ReservedIpsApi<'_> {
        super::reserved_ips::ReservedIpsApi::new(self)
    }

    pub fn load_balancers(&self) -> super::load_balancers::LoadBalancersApi<'_> {
        super::load_balancers::LoadBalancersApi::new(self)
    }

    pub fn databases(&self) -> super::databases::DatabasesApi<'_> {
        super::databases::DatabasesApi::new(self)
    }

    pub fn kubernetes(&self) -> super::kubernetes::KubernetesApi<'_> {
        super::kubernetes::KubernetesApi::new(self)
    }

    pub fn object_storage(&self) -> super::object_storage::ObjectStorageApi<'_> {
        super::object_storage::ObjectStorageApi::new(self)
    }

    pub fn iso(&self) -> super::iso::IsoApi<'_> {
        super::iso::IsoApi::new(self)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Sleeps until at least `rate_limit` has passed since the previous request
    async fn throttle(&self) {
        if self.inner.rate_limit.is_zero() {
            return;
        }

        let mut last_request = self.inner.last_request.lock().await;
        if let Some(last) = *last_request {
            let ready_at = last + self.inner.rate_limit;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_request = Some(Instant::now());
    }

    /// Execute request with retry logic
    async fn execute_with_retry<F, Fut, T>(
        &self,
        request_fn: F,
        method: &str,
        path: &str,
    ) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
        T: DeserializeOwned,
    {
        let max_retries = self.inner.retry_config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let backoff = self.inner.retry_config.backoff(attempt);
                tracing::debug!(
                    "Retrying {} {} after {:?} (attempt {})",
                    method,
                    path,
                    backoff,
                    attempt
                );
                tokio::time::sleep(backoff).await;
            }

            self.throttle().await;
            tracing::debug!("{} request to: {}{}", method, self.inner.base_url, path);

            match request_fn().await {
                Ok(response) => {
                    let status = response.status();
                    tracing::debug!("{} {} returned {}", method, path, status);

                    if status.is_success() {
                        self.inner.counters.record_request(true);
                        return self.parse_success_response(response).await;
                    }

                    self.inner.counters.record_request(false);

                    if status == reqwest::StatusCode::UNAUTHORIZED {
                        return Err(ApiError::AuthError);
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.inner.counters.record_rate_limited();
                        last_error = Some(ApiError::RateLimited);
                    } else if status.is_server_error() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return self.handle_error_response(response).await;
                    }
                }
                Err(e) => {
                    self.inner.counters.record_request(false);

                    if e.is_timeout() {
                        last_error =
                            Some(ApiError::Timeout(self.inner.retry_config.timeout_seconds));
                    } else if e.is_connect() {
                        last_error = Some(ApiError::ServiceUnavailable);
                    } else {
                        return Err(ApiError::RequestError(e));
                    }
                }
            }
        }

        let stats = self.connection_stats();
        tracing::warn!(
            "{} {} failed after {} attempts ({} of {} requests failed, {} rate limited)",
            method,
            path,
            u64::from(max_retries) + 1,
            stats.failed_requests,
            stats.total_requests,
            stats.rate_limited_requests
        );
        Err(last_error.unwrap_or(ApiError::ServiceUnavailable))
    }

    /// Parse successful response; an empty body (204) parses as `null`
    async fn parse_success_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        tracing::debug!("API response body: {}", text);

        let body = if text.trim().is_empty() {
            "null"
        } else {
            text.as_str()
        };

        serde_json::from_str::<T>(body).map_err(|e| {
            tracing::error!("Failed to deserialize response: {}, body: {}", e, text);
            ApiError::ParseError(format!("Failed to parse response: {}", e))
        })
    }

    /// Handle error response
    async fn handle_error_response<T>(&self, response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(err_resp) => err_resp.error,
            Err(_) => text,
        };

        Err(ApiError::ApiError { status, message })
    }
}

fn split_page<T: DeserializeOwned>(
    mut page: serde_json::Value,
    key: &str,
) -> Result<(Vec<T>, Meta), ApiError> {
    let items = match page.get_mut(key).map(serde_json::Value::take) {
        Some(serde_json::Value::Null) | None => Vec::new(),
        Some(items) => serde_json::from_value(items)
            .map_err(|e| ApiError::ParseError(format!("Failed to parse {}: {}", key, e)))?,
    };

    let meta = match page.get_mut("meta").map(serde_json::Value::take) {
        Some(serde_json::Value::Null) | None => Meta::default(),
        Some(meta) => serde_json::from_value(meta)
            .map_err(|e| ApiError::ParseError(format!("Failed to parse meta: {}", e)))?,
    };

    Ok((items, meta))
}
