//! Test helpers for the Vultr API

#[cfg(test)]
use std::time::Duration;

/// A client for a mock server: one retry, short backoff, no request spacing
#[cfg(test)]
pub fn create_test_client(url: &str) -> super::Client {
    super::Client::with_config(
        url,
        "test-api-key",
        super::RetryConfig {
            max_retries: 1,
            initial_backoff_ms: 1,
            max_backoff_ms: 10,
            timeout_seconds: 5,
        },
        Duration::ZERO,
    )
    .unwrap()
}

/// Provider data around a test client, with waits that poll immediately
#[cfg(test)]
pub fn create_test_data(url: &str) -> crate::VultrProviderData {
    crate::VultrProviderData::new(create_test_client(url), crate::wait::WaitConfig::immediate())
}

/// A JSON mock; finish it with `create_async().await`
#[cfg(test)]
pub fn json_response(
    server: &mut mockito::Server,
    method: &str,
    path: &str,
    status: usize,
    body: &str,
) -> mockito::Mock {
    server
        .mock(method, path)
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
}
