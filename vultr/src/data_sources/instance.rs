//! `vultr_instance`
//!
//! Looks up an existing server, typically by `label`, `main_ip` or `tags`.
//! The root password is never listed and is not exposed here.

use super::{computed_fields, read_filtered};
use crate::filter::filter_schema;
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, AttributeType, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct InstanceDataSource {
    data: VultrProviderData,
}

impl InstanceDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("An existing virtual machine")
            .attribute(AttributeBuilder::string("id").computed())
            .attribute(AttributeBuilder::string("kvm").computed().sensitive());

        computed_fields(
            schema,
            &[
                ("os", AttributeType::String),
                ("ram", AttributeType::Number),
                ("disk", AttributeType::Number),
                ("main_ip", AttributeType::String),
                ("vcpu_count", AttributeType::Number),
                ("region", AttributeType::String),
                ("plan", AttributeType::String),
                ("date_created", AttributeType::String),
                ("status", AttributeType::String),
                ("allowed_bandwidth", AttributeType::Number),
                ("netmask_v4", AttributeType::String),
                ("gateway_v4", AttributeType::String),
                ("power_status", AttributeType::String),
                ("server_status", AttributeType::String),
                ("v6_network", AttributeType::String),
                ("v6_main_ip", AttributeType::String),
                ("v6_network_size", AttributeType::Number),
                ("label", AttributeType::String),
                ("internal_ip", AttributeType::String),
                ("hostname", AttributeType::String),
                ("os_id", AttributeType::Number),
                ("app_id", AttributeType::Number),
                ("image_id", AttributeType::String),
                ("firewall_group_id", AttributeType::String),
                ("features", AttributeType::list_of(AttributeType::String)),
                ("tags", AttributeType::list_of(AttributeType::String)),
            ],
        )
        .block(filter_schema())
        .build()
    }
}

#[async_trait]
impl DataSourceV2 for InstanceDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let instances = self.data.client.instances().list().await;
        read_filtered(&request.config, "instance", instances, |i| i.id.clone())
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_data, json_response};
    use crate::data_sources::tests::filter_config;
    use mockito::Server;
    use tfplug::context::Context;

    fn instance_json(id: &str, label: &str, tags: &str) -> String {
        format!(
            r#"{{"id": "{id}", "os": "Ubuntu 22.04 LTS x64", "ram": 1024, "disk": 25,
                "main_ip": "192.0.2.10", "vcpu_count": 1, "region": "ewr", "plan": "vc2-1c-1gb",
                "date_created": "2024-01-01", "status": "active", "allowed_bandwidth": 1000,
                "netmask_v4": "255.255.254.0", "gateway_v4": "192.0.2.1", "power_status": "running",
                "server_status": "ok", "v6_network": "", "v6_main_ip": "", "v6_network_size": 0,
                "label": "{label}", "internal_ip": "", "kvm": "https://my.vultr.com/subs/vps/novnc",
                "hostname": "{label}", "os_id": 1743, "app_id": 0, "image_id": "",
                "firewall_group_id": "", "features": null, "tags": {tags}}}"#
        )
    }

    #[tokio::test]
    async fn finds_instance_by_tag() {
        let mut server = Server::new_async().await;
        let body = format!(
            r#"{{"instances": [{}, {}], "meta": {{"total": 2, "links": {{"next": "", "prev": ""}}}}}}"#,
            instance_json("i-1", "web-1", r#"["web", "prod"]"#),
            instance_json("i-2", "db-1", r#"["db"]"#),
        );
        let _m = json_response(&mut server, "GET", "/instances?per_page=100", 200, &body)
            .create_async()
            .await;

        let data_source = InstanceDataSource::new(create_test_data(&server.url()));
        let response = data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: filter_config("tags", &["prod"]),
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        let state = response.state.unwrap();
        assert_eq!(state.get_string("id").as_deref(), Some("i-1"));
        assert_eq!(state.get_string("label").as_deref(), Some("web-1"));
        assert_eq!(state.get_string_list("tags"), vec!["web", "prod"]);
        assert!(state.get_string_list("features").is_empty());
    }
}
