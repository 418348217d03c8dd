//! `vultr_ssh_key`

use super::{computed_fields, read_filtered};
use crate::filter::filter_schema;
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, AttributeType, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct SshKeyDataSource {
    data: VultrProviderData,
}

impl SshKeyDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("An SSH public key stored in the account")
            .attribute(AttributeBuilder::string("id").computed());

        computed_fields(
            schema,
            &[
                ("name", AttributeType::String),
                ("ssh_key", AttributeType::String),
                ("date_created", AttributeType::String),
            ],
        )
        .block(filter_schema())
        .build()
    }
}

#[async_trait]
impl DataSourceV2 for SshKeyDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let keys = self.data.client.ssh_keys().list().await;
        read_filtered(&request.config, "SSH key", keys, |k| k.id.clone())
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
    async fn finds_key_by_name() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/ssh-keys?per_page=100",
            200,
            r#"{"ssh_keys": [
                {"id": "key-1", "date_created": "2024-01-01", "name": "deploy",
                 "ssh_key": "ssh-ed25519 AAAAC3Nza deploy@ci"},
                {"id": "key-2", "date_created": "2024-01-02", "name": "laptop",
                 "ssh_key": "ssh-ed25519 AAAAC3Nzb me@laptop"}
            ], "meta": {"total": 2, "links": {"next": "", "prev": ""}}}"#,
        )
        .create_async()
        .await;

        let data_source = SshKeyDataSource::new(create_test_data(&server.url()));
        let response = data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: filter_config("name", &["laptop"]),
            })
            .await;

        let state = response.state.unwrap();
        assert_eq!(state.get_string("id").as_deref(), Some("key-2"));
        assert_eq!(
            state.get_string("ssh_key").as_deref(),
            Some("ssh-ed25519 AAAAC3Nzb me@laptop")
        );
    }
}
