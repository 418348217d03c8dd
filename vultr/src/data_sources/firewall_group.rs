//! `vultr_firewall_group`

use super::{computed_fields, read_filtered};
use crate::filter::filter_schema;
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, AttributeType, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct FirewallGroupDataSource {
    data: VultrProviderData,
}

impl FirewallGroupDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("A firewall group and its usage counters")
            .attribute(AttributeBuilder::string("id").computed());

        computed_fields(
            schema,
            &[
                ("description", AttributeType::String),
                ("date_created", AttributeType::String),
                ("date_modified", AttributeType::String),
                ("instance_count", AttributeType::Number),
                ("rule_count", AttributeType::Number),
                ("max_rule_count", AttributeType::Number),
            ],
        )
        .block(filter_schema())
        .build()
    }
}

#[async_trait]
impl DataSourceV2 for FirewallGroupDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let groups = self.data.client.firewalls().list().await;
        read_filtered(&request.config, "firewall group", groups, |g| g.id.clone())
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

    #[tokio::test]
    async fn matches_numeric_counters_as_text() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/firewalls?per_page=100",
            200,
            r#"{"firewall_groups": [
                {"id": "fw-1", "description": "web", "date_created": "2024-01-01",
                 "date_modified": "2024-01-02", "instance_count": 3, "rule_count": 4,
                 "max_rule_count": 50},
                {"id": "fw-2", "description": "db", "date_created": "2024-01-01",
                 "date_modified": "2024-01-01", "instance_count": 0, "rule_count": 1,
                 "max_rule_count": 50}
            ], "meta": {"total": 2, "links": {"next": "", "prev": ""}}}"#,
        )
        .create_async()
        .await;

        let data_source = FirewallGroupDataSource::new(create_test_data(&server.url()));
        let response = data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: filter_config("instance_count", &["3"]),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("id").as_deref(), Some("fw-1"));
        assert_eq!(state.get_string("description").as_deref(), Some("web"));
        assert_eq!(state.get_i64("rule_count"), Some(4));
    }
}
