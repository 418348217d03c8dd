//! `vultr_plan`

use super::{computed_fields, read_filtered};
use crate::filter::filter_schema;
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, AttributeType, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct PlanDataSource {
    data: VultrProviderData,
}

impl PlanDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("A compute plan. Filter on `type`, `vcpu_count`, `monthly_cost` or `locations`")
            .attribute(AttributeBuilder::string("id").computed());

        computed_fields(
            schema,
            &[
                ("vcpu_count", AttributeType::Number),
                ("ram", AttributeType::Number),
                ("disk", AttributeType::Number),
                ("disk_count", AttributeType::Number),
                ("bandwidth", AttributeType::Number),
                ("monthly_cost", AttributeType::Number),
                ("type", AttributeType::String),
                ("locations", AttributeType::list_of(AttributeType::String)),
            ],
        )
        .block(filter_schema())
        .build()
    }
}

#[async_trait]
impl DataSourceV2 for PlanDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let plans = self.data.client.plans().list().await;
        read_filtered(&request.config, "plan", plans, |p| p.id.clone())
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
    use tfplug::types::DynamicValue;

    const PLANS: &str = r#"{"plans": [
        {"id": "vc2-1c-1gb", "vcpu_count": 1, "ram": 1024, "disk": 25, "disk_count": 1,
         "bandwidth": 1024, "monthly_cost": 5, "type": "vc2", "locations": ["ewr", "ams"]},
        {"id": "vc2-1c-2gb", "vcpu_count": 1, "ram": 2048, "disk": 55, "disk_count": 1,
         "bandwidth": 2048, "monthly_cost": 10, "type": "vc2", "locations": ["ewr"]},
        {"id": "vhf-1c-1gb", "vcpu_count": 1, "ram": 1024, "disk": 32, "disk_count": 1,
         "bandwidth": 1024, "monthly_cost": 6, "type": "vhf", "locations": ["ams"]}
    ], "meta": {"total": 3, "links": {"next": "", "prev": ""}}}"#;

    async fn read(server: &mut Server, config: tfplug::types::Config) -> ReadDataSourceResponse {
        let _m = json_response(server, "GET", "/plans?per_page=100", 200, PLANS)
            .create_async()
            .await;

        PlanDataSource::new(create_test_data(&server.url()))
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config,
            })
            .await
    }

    #[tokio::test]
    async fn every_filter_must_match() {
        let mut server = Server::new_async().await;

        let mut config = filter_config("type", &["vc2"]);
        let mut cost = DynamicValue::new();
        cost.set_string("name", "monthly_cost");
        cost.set_string_list("values", ["10"]);
        let mut filters = config.get_blocks("filter");
        filters.push(cost);
        config.set_blocks("filter", filters);

        let response = read(&mut server, config).await;

        assert!(!response.diagnostics.has_errors());
        let state = response.state.unwrap();
        assert_eq!(state.get_string("id").as_deref(), Some("vc2-1c-2gb"));
        assert_eq!(state.get_i64("ram"), Some(2048));
        assert_eq!(state.get_string_list("locations"), vec!["ewr"]);
    }

    #[tokio::test]
    async fn several_matches_are_ambiguous() {
        let mut server = Server::new_async().await;
        let response = read(&mut server, filter_config("type", &["vc2"])).await;

        assert!(response.state.is_none());
        assert!(response.diagnostics.has_errors());
    }
}
