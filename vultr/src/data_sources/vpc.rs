//! `vultr_vpc`

use super::{computed_fields, read_filtered};
use crate::filter::filter_schema;
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, AttributeType, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct VpcDataSource {
    data: VultrProviderData,
}

impl VpcDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("A private network")
            .attribute(AttributeBuilder::string("id").computed());

        computed_fields(
            schema,
            &[
                ("region", AttributeType::String),
                ("description", AttributeType::String),
                ("date_created", AttributeType::String),
                ("v4_subnet", AttributeType::String),
                ("v4_subnet_mask", AttributeType::Number),
            ],
        )
        .block(filter_schema())
        .build()
    }
}

#[async_trait]
impl DataSourceV2 for VpcDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let vpcs = self.data.client.vpcs().list().await;
        read_filtered(&request.config, "VPC", vpcs, |v| v.id.clone())
    }
}
