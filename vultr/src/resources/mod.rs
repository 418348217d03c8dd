//! Managed Vultr objects
//!
//! Every resource translates schema values into API request structs and
//! API objects back into state. Reads that hit a vanished object return no
//! state so Terraform plans a re-create; any other read failure keeps the
//! prior state and reports the error.

pub mod block_storage;
pub mod database;
pub mod dns_domain;
pub mod dns_record;
pub mod firewall_group;
pub mod firewall_rule;
pub mod instance;
pub mod iso_private;
pub mod kubernetes;
pub mod load_balancer;
pub mod object_storage;
pub mod reserved_ip;
pub mod ssh_key;
pub mod startup_script;
pub mod vpc;

pub use block_storage::BlockStorageResource;
pub use database::DatabaseResource;
pub use dns_domain::DnsDomainResource;
pub use dns_record::DnsRecordResource;
pub use firewall_group::FirewallGroupResource;
pub use firewall_rule::FirewallRuleResource;
pub use instance::InstanceResource;
pub use iso_private::IsoPrivateResource;
pub use kubernetes::KubernetesResource;
pub use load_balancer::LoadBalancerResource;
pub use object_storage::ObjectStorageResource;
pub use reserved_ip::ReservedIpResource;
pub use ssh_key::SshKeyResource;
pub use startup_script::StartupScriptResource;
pub use vpc::VpcResource;

use crate::api::ApiError;
use std::future::Future;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::plan_modifier::UseStateForUnknown;
use tfplug::request::ReadResponse;
use tfplug::retry::{retry_context, RetryError, RetryFailure, StateChangeError};
use tfplug::types::State;
use tfplug::{AttributeBuilder, Diagnostics};

/// How long deletes keep retrying while the object is still referenced
pub(crate) const DELETE_RETRY_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// The computed `id` every resource carries
pub(crate) fn id_attribute() -> AttributeBuilder {
    AttributeBuilder::string("id")
        .computed()
        .description("Vultr ID of the object")
        .plan_modifier(UseStateForUnknown)
}

/// The `id` of a prior state; a state without one cannot address anything
pub(crate) fn state_id(state: &State) -> Result<String, Diagnostics> {
    state
        .get_non_empty_string("id")
        .ok_or_else(|| Diagnostics::error("Missing id", "The resource state has no id"))
}

/// Maps a failed read to the response Terraform expects
pub(crate) fn read_failed(kind: &str, id: &str, err: ApiError, state: State) -> ReadResponse {
    if err.is_not_found() {
        tracing::warn!("{} {} no longer exists, removing it from state", kind, id);
        return ReadResponse {
            state: None,
            diagnostics: Diagnostics::new(),
        };
    }

    tracing::error!("Failed to read {} {}: {}", kind, id, err);
    ReadResponse {
        state: Some(state),
        diagnostics: Diagnostics::error(
            format!("Failed to read {} {}", kind, id),
            err.to_string(),
        ),
    }
}

/// Diagnostics for a failed delete; a vanished object counts as deleted
pub(crate) fn delete_diagnostics(
    kind: &str,
    id: &str,
    result: Result<(), ApiError>,
) -> Diagnostics {
    match result {
        Ok(()) => {
            tracing::info!("Deleted {} {}", kind, id);
            Diagnostics::new()
        }
        Err(e) if e.is_not_found() => {
            tracing::warn!("{} {} was already deleted", kind, id);
            Diagnostics::new()
        }
        Err(e) => Diagnostics::error(format!("Failed to delete {} {}", kind, id), e.to_string()),
    }
}

/// Diagnostics for a poll that never reached its target state
pub(crate) fn wait_failed(kind: &str, id: &str, err: StateChangeError) -> Diagnostics {
    tracing::error!("Waiting for {} {} failed: {}", kind, id, err);
    Diagnostics::error(format!("Error waiting for {} {}", kind, id), err.to_string())
}

/// Deletes an object that stays referenced for a while after its dependents
/// are gone, retrying "in use" failures until `timeout`
pub(crate) async fn delete_when_released<F, Fut>(
    ctx: &Context,
    kind: &str,
    id: &str,
    timeout: Duration,
    mut delete: F,
) -> Diagnostics
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), ApiError>>,
{
    let result = retry_context(ctx, timeout, || {
        let attempt = delete();
        async move {
            match attempt.await {
                Ok(()) => Ok(()),
                Err(e) if e.is_in_use() => {
                    tracing::debug!("{} {} is still in use, retrying delete", kind, id);
                    Err(RetryError::Retryable(e))
                }
                Err(e) => Err(RetryError::NonRetryable(e)),
            }
        }
    })
    .await;

    match result {
        Ok(()) => delete_diagnostics(kind, id, Ok(())),
        Err(RetryFailure::Failed(e)) => delete_diagnostics(kind, id, Err(e)),
        Err(other) => {
            Diagnostics::error(format!("Failed to delete {} {}", kind, id), other.to_string())
        }
    }
}

/// The planned value when it differs from the current one
pub(crate) fn changed<T: PartialEq>(planned: Option<T>, current: Option<T>) -> Option<T> {
    if planned != current {
        planned
    } else {
        None
    }
}

/// Splits a `parent,child` import ID
pub(crate) fn split_import_id(id: &str, format: &str) -> Result<(String, String), Diagnostics> {
    match id.split_once(',') {
        Some((parent, child)) if !parent.is_empty() && !child.is_empty() => {
            Ok((parent.to_string(), child.to_string()))
        }
        _ => Err(Diagnostics::error(
            "Unexpected import ID",
            format!("Expected {}, got {:?}", format, id),
        )),
    }
}
