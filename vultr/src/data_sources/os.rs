//! `vultr_os`

use super::{computed_fields, read_filtered};
use crate::filter::filter_schema;
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, AttributeType, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct OsDataSource {
    data: VultrProviderData,
}

impl OsDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("An operating system image instances can be installed from")
            .attribute(AttributeBuilder::string("id").computed());

        computed_fields(
            schema,
            &[
                ("name", AttributeType::String),
                ("arch", AttributeType::String),
                ("family", AttributeType::String),
            ],
        )
        .block(filter_schema())
        .build()
    }
}

#[async_trait]
impl DataSourceV2 for OsDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let images = self.data.client.os().list().await;
        // numeric in the API, a string ID in state
        read_filtered(&request.config, "os", images, |os| os.id.to_string())
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
    async fn finds_image_by_name() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/os?per_page=100",
            200,
            r#"{"os": [
                {"id": 1743, "name": "Ubuntu 22.04 LTS x64", "arch": "x64", "family": "ubuntu"},
                {"id": 2136, "name": "Debian 12 x64 (bookworm)", "arch": "x64", "family": "debian"}
            ], "meta": {"total": 2, "links": {"next": "", "prev": ""}}}"#,
        )
        .create_async()
        .await;

        let data_source = OsDataSource::new(create_test_data(&server.url()));
        let response = data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: filter_config("name", &["Debian 12 x64 (bookworm)"]),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("id").as_deref(), Some("2136"));
        assert_eq!(state.get_string("family").as_deref(), Some("debian"));
    }

    #[tokio::test]
    async fn no_match_is_reported() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/os?per_page=100",
            200,
            r#"{"os": [{"id": 1743, "name": "Ubuntu 22.04 LTS x64", "arch": "x64", "family": "ubuntu"}],
                "meta": {"total": 1, "links": {"next": "", "prev": ""}}}"#,
        )
        .create_async()
        .await;

        let data_source = OsDataSource::new(create_test_data(&server.url()));
        let response = data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: filter_config("family", &["windows"]),
            })
            .await;

        assert!(response.state.is_none());
        let detail = response.diagnostics.errors[0].detail.clone().unwrap_or_default();
        assert_eq!(detail, "no results were found");
    }
}
