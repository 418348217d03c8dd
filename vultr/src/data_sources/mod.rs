//! Read-only lookups of Vultr objects
//!
//! Most data sources list every object of a kind and keep the single one
//! matching all `filter` blocks. The match is flattened into state under its
//! API field names, so a data source schema simply declares those names.

pub mod account;
pub mod dns_domain;
pub mod firewall_group;
pub mod instance;
pub mod os;
pub mod plan;
pub mod region;
pub mod ssh_key;
pub mod vpc;

pub use account::AccountDataSource;
pub use dns_domain::DnsDomainDataSource;
pub use firewall_group::FirewallGroupDataSource;
pub use instance::InstanceDataSource;
pub use os::OsDataSource;
pub use plan::PlanDataSource;
pub use region::RegionDataSource;
pub use ssh_key::SshKeyDataSource;
pub use vpc::VpcDataSource;

use crate::api::ApiError;
use crate::filter::{build_filters, find_one, flatten_object, FilterError};
use serde::Serialize;
use tfplug::request::ReadDataSourceResponse;
use tfplug::types::{Config, State};
use tfplug::{AttributeBuilder, AttributeType, Diagnostics, Dynamic, SchemaBuilder};

/// Adds one computed attribute per `(name, type)` pair
pub(crate) fn computed_fields(schema: SchemaBuilder, fields: &[(&str, AttributeType)]) -> SchemaBuilder {
    fields.iter().fold(schema, |schema, (name, type_)| {
        schema.attribute(AttributeBuilder::new(name, type_.clone()).computed())
    })
}

/// Writes every serialized field of `item` into `state`
pub(crate) fn apply_object<T: Serialize>(item: &T, state: &mut State) -> Result<(), FilterError> {
    for (name, value) in flatten_object(item)? {
        let value: Dynamic =
            serde_json::from_value(value).map_err(|e| FilterError::Flatten(e.to_string()))?;
        state.set(&name, value);
    }
    Ok(())
}

/// Shared read of the filtering data sources: select one listed object,
/// flatten it and key the state by `id_of`
pub(crate) fn read_filtered<T: Serialize>(
    config: &Config,
    kind: &str,
    listed: Result<Vec<T>, ApiError>,
    id_of: impl Fn(&T) -> String,
) -> ReadDataSourceResponse {
    let filters = build_filters(config);
    if filters.is_empty() {
        return failed(
            format!("No filter given for {}", kind),
            "At least one filter block is required",
        );
    }

    let items = match listed {
        Ok(items) => items,
        Err(e) => return failed(format!("Failed to list {}s", kind), e.to_string()),
    };

    let item = match find_one(items, &filters, kind) {
        Ok(item) => item,
        Err(e) => return failed(format!("Error looking up {}", kind), e.to_string()),
    };

    let mut state = config.clone();
    if let Err(e) = apply_object(&item, &mut state) {
        return failed(format!("Error reading {}", kind), e.to_string());
    }
    state.set_string("id", id_of(&item));

    ReadDataSourceResponse {
        state: Some(state),
        diagnostics: Diagnostics::new(),
    }
}

pub(crate) fn failed(summary: impl Into<String>, detail: impl Into<String>) -> ReadDataSourceResponse {
    ReadDataSourceResponse {
        state: None,
        diagnostics: Diagnostics::error(summary, detail),
    }
}
