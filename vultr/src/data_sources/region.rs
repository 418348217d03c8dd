//! `vultr_region`

use super::{computed_fields, read_filtered};
use crate::filter::filter_schema;
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, AttributeType, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct RegionDataSource {
    data: VultrProviderData,
}

impl RegionDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("A data center location")
            .attribute(AttributeBuilder::string("id").computed());

        computed_fields(
            schema,
            &[
                ("city", AttributeType::String),
                ("country", AttributeType::String),
                ("continent", AttributeType::String),
                ("options", AttributeType::list_of(AttributeType::String)),
            ],
        )
        .block(filter_schema())
        .build()
    }
}

#[async_trait]
impl DataSourceV2 for RegionDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let regions = self.data.client.regions().list().await;
        read_filtered(&request.config, "region", regions, |r| r.id.clone())
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
    async fn matches_on_list_option() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/regions?per_page=100",
            200,
            r#"{"regions": [
                {"id": "ams", "city": "Amsterdam", "country": "NL", "continent": "Europe",
                 "options": ["ddos_protection", "block_storage_storage_opt"]},
                {"id": "ewr", "city": "New Jersey", "country": "US", "continent": "North America",
                 "options": ["block_storage_high_perf"]}
            ], "meta": {"total": 2, "links": {"next": "", "prev": ""}}}"#,
        )
        .create_async()
        .await;

        let data_source = RegionDataSource::new(create_test_data(&server.url()));
        let response = data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: filter_config("options", &["ddos_protection"]),
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        let state = response.state.unwrap();
        assert_eq!(state.get_string("id").as_deref(), Some("ams"));
        assert_eq!(state.get_string("city").as_deref(), Some("Amsterdam"));
    }
}
