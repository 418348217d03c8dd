//! Polling helpers for Vultr objects that change state asynchronously
//!
//! Each helper wraps `StateChangeConf` around a GET of one object. A 404
//! counts as "not found" (tolerated `not_found_checks` times, since freshly
//! created objects take a moment to show up); any other API error aborts the
//! wait.

use crate::api::blocks::BlockStorage;
use crate::api::databases::Database;
use crate::api::instances::Instance;
use crate::api::iso::Iso;
use crate::api::kubernetes::Cluster;
use crate::api::load_balancers::LoadBalancer;
use crate::api::object_storage::ObjectStorage;
use crate::api::{ApiError, Client};
use std::future::Future;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::retry::{StateChangeConf, StateChangeError};

pub const INSTANCE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const DATABASE_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const LOAD_BALANCER_TIMEOUT: Duration = Duration::from_secs(30 * 60);
pub const KUBERNETES_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const ISO_TIMEOUT: Duration = Duration::from_secs(60 * 60);
pub const OBJECT_STORAGE_TIMEOUT: Duration = Duration::from_secs(20 * 60);
pub const BLOCK_STORAGE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

/// Polling schedule shared by every wait helper
#[derive(Debug, Clone, PartialEq)]
pub struct WaitConfig {
    /// Sleep before the first refresh
    pub delay: Duration,
    /// Smallest wait between refreshes
    pub min_timeout: Duration,
    /// Fixed wait between refreshes; zero keeps the exponential backoff
    pub poll_interval: Duration,
    pub not_found_checks: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            min_timeout: Duration::from_secs(3),
            poll_interval: Duration::ZERO,
            not_found_checks: 60,
        }
    }
}

impl WaitConfig {
    /// Polls right away and every 10ms, for mocked APIs
    pub fn immediate() -> Self {
        Self {
            delay: Duration::ZERO,
            min_timeout: Duration::ZERO,
            poll_interval: Duration::from_millis(10),
            not_found_checks: 3,
        }
    }
}

/// Pending and target states plus the overall timeout of one wait
#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub pending: &'a [&'a str],
    pub target: &'a [&'a str],
    pub timeout: Duration,
}

impl<'a> Transition<'a> {
    pub fn new(pending: &'a [&'a str], target: &'a [&'a str], timeout: Duration) -> Self {
        Self {
            pending,
            target,
            timeout,
        }
    }
}

/// Which of the three instance state fields to watch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceAttribute {
    /// pending, active, suspended, resizing
    Status,
    /// running, stopped
    PowerStatus,
    /// none, locked, installingbooting, ok
    ServerStatus,
}

impl InstanceAttribute {
    fn reader(self) -> fn(&Instance) -> String {
        match self {
            InstanceAttribute::Status => |i: &Instance| i.status.clone(),
            InstanceAttribute::PowerStatus => |i: &Instance| i.power_status.clone(),
            InstanceAttribute::ServerStatus => |i: &Instance| i.server_status.clone(),
        }
    }
}

async fn wait_until<T, G, Fut>(
    ctx: &Context,
    config: &WaitConfig,
    kind: &str,
    transition: Transition<'_>,
    mut get: G,
    state_of: fn(&T) -> String,
) -> Result<T, StateChangeError>
where
    G: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    tracing::info!(
        "Waiting for {} to become {:?} (timeout {:?})",
        kind,
        transition.target,
        transition.timeout
    );

    let refresh = move || {
        let fetch = get();
        async move {
            match fetch.await {
                Ok(object) => {
                    let state = state_of(&object);
                    Ok((Some(object), state))
                }
                Err(e) if e.is_not_found() => Ok((None, String::new())),
                Err(e) => Err(format!("error retrieving {}: {}", kind, e)),
            }
        }
    };

    let object = StateChangeConf::new(refresh)
        .pending(transition.pending.iter().copied())
        .target(transition.target.iter().copied())
        .timeout(transition.timeout)
        .delay(config.delay)
        .min_timeout(config.min_timeout)
        .poll_interval(config.poll_interval)
        .not_found_checks(config.not_found_checks)
        .wait_for_state(ctx)
        .await?;

    object.ok_or(StateChangeError::NotFound {
        retries: config.not_found_checks,
    })
}

pub async fn wait_for_instance(
    ctx: &Context,
    client: &Client,
    config: &WaitConfig,
    id: &str,
    attribute: InstanceAttribute,
    transition: Transition<'_>,
) -> Result<Instance, StateChangeError> {
    wait_until(
        ctx,
        config,
        "instance",
        transition,
        move || async move { client.instances().get(id).await },
        attribute.reader(),
    )
    .await
}

pub async fn wait_for_database(
    ctx: &Context,
    client: &Client,
    config: &WaitConfig,
    id: &str,
    transition: Transition<'_>,
) -> Result<Database, StateChangeError> {
    wait_until(
        ctx,
        config,
        "database",
        transition,
        move || async move { client.databases().get(id).await },
        |db: &Database| db.status.clone(),
    )
    .await
}

pub async fn wait_for_load_balancer(
    ctx: &Context,
    client: &Client,
    config: &WaitConfig,
    id: &str,
    transition: Transition<'_>,
) -> Result<LoadBalancer, StateChangeError> {
    wait_until(
        ctx,
        config,
        "load balancer",
        transition,
        move || async move { client.load_balancers().get(id).await },
        |lb: &LoadBalancer| lb.status.clone(),
    )
    .await
}

pub async fn wait_for_kubernetes(
    ctx: &Context,
    client: &Client,
    config: &WaitConfig,
    id: &str,
    transition: Transition<'_>,
) -> Result<Cluster, StateChangeError> {
    wait_until(
        ctx,
        config,
        "kubernetes cluster",
        transition,
        move || async move { client.kubernetes().get(id).await },
        |cluster: &Cluster| cluster.status.clone(),
    )
    .await
}

pub async fn wait_for_iso(
    ctx: &Context,
    client: &Client,
    config: &WaitConfig,
    id: &str,
    transition: Transition<'_>,
) -> Result<Iso, StateChangeError> {
    wait_until(
        ctx,
        config,
        "ISO",
        transition,
        move || async move { client.iso().get(id).await },
        |iso: &Iso| iso.status.clone(),
    )
    .await
}

pub async fn wait_for_object_storage(
    ctx: &Context,
    client: &Client,
    config: &WaitConfig,
    id: &str,
    transition: Transition<'_>,
) -> Result<ObjectStorage, StateChangeError> {
    wait_until(
        ctx,
        config,
        "object storage",
        transition,
        move || async move { client.object_storage().get(id).await },
        |storage: &ObjectStorage| storage.status.clone(),
    )
    .await
}

pub async fn wait_for_block_storage(
    ctx: &Context,
    client: &Client,
    config: &WaitConfig,
    id: &str,
    transition: Transition<'_>,
) -> Result<BlockStorage, StateChangeError> {
    wait_until(
        ctx,
        config,
        "block storage",
        transition,
        move || async move { client.blocks().get(id).await },
        |block: &BlockStorage| block.status.clone(),
    )
    .await
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::instances::tests::instance_json;
    use crate::api::test_helpers::{create_test_client, json_response};
    use mockito::Server;

    #[test]
    fn default_schedule() {
        let config = WaitConfig::default();
        assert_eq!(config.delay, Duration::from_secs(10));
        assert_eq!(config.min_timeout, Duration::from_secs(3));
        assert_eq!(config.not_found_checks, 60);
    }

    #[tokio::test]
    async fn instance_wait_returns_object_in_target_state() {
        let mut server = Server::new_async().await;
        let mock = json_response(
            &mut server,
            "GET",
            "/instances/abc",
            200,
            &instance_json("active", "running", "ok"),
        )
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let instance = wait_for_instance(
            &Context::new(),
            &client,
            &WaitConfig::immediate(),
            "abc",
            InstanceAttribute::PowerStatus,
            Transition::new(&["stopped"], &["running"], Duration::from_secs(5)),
        )
        .await
        .unwrap();

        assert_eq!(instance.power_status, "running");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unexpected_state_fails_the_wait() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/instances/abc",
            200,
            &instance_json("suspended", "stopped", "none"),
        )
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let err = wait_for_instance(
            &Context::new(),
            &client,
            &WaitConfig::immediate(),
            "abc",
            InstanceAttribute::Status,
            Transition::new(&["pending"], &["active"], Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err,
            StateChangeError::UnexpectedState {
                state: "suspended".to_string(),
                expected: "active".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn missing_object_fails_after_not_found_checks() {
        let mut server = Server::new_async().await;
        let mock = json_response(
            &mut server,
            "GET",
            "/blocks/blk-1",
            404,
            r#"{"error": "block storage not found", "status": 404}"#,
        )
        .expect(4)
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let err = wait_for_block_storage(
            &Context::new(),
            &client,
            &WaitConfig::immediate(),
            "blk-1",
            Transition::new(&["pending"], &["active"], Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert_eq!(err, StateChangeError::NotFound { retries: 4 });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_errors_abort_the_wait() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/databases/db-1",
            400,
            r#"{"error": "malformed request", "status": 400}"#,
        )
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let err = wait_for_database(
            &Context::new(),
            &client,
            &WaitConfig::immediate(),
            "db-1",
            Transition::new(&["Rebuilding"], &["Running"], Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        match err {
            StateChangeError::Refresh(message) => {
                assert!(message.contains("error retrieving database"));
                assert!(message.contains("malformed request"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
