//! `vultr_dns_domain`
//!
//! Domains are addressed by name, so this data source takes the `domain`
//! directly instead of filters.

use super::{apply_object, failed};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct DnsDomainDataSource {
    data: VultrProviderData,
}

impl DnsDomainDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A DNS domain managed by Vultr")
            .attribute(AttributeBuilder::string("id").computed())
            .attribute(
                AttributeBuilder::string("domain")
                    .required()
                    .description("Fully qualified domain name"),
            )
            .attribute(AttributeBuilder::string("date_created").computed())
            .attribute(AttributeBuilder::string("dns_sec").computed())
            .build()
    }
}

#[async_trait]
impl DataSourceV2 for DnsDomainDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let name = match request.config.get_non_empty_string("domain") {
            Some(name) => name,
            None => return failed("Missing domain", "The domain attribute must be set"),
        };

        let domain = match self.data.client.domains().get(&name).await {
            Ok(domain) => domain,
            Err(e) if e.is_not_found() => {
                return failed(format!("Domain {} not found", name), e.to_string())
            }
            Err(e) => return failed(format!("Failed to read domain {}", name), e.to_string()),
        };

        let mut state = request.config;
        if let Err(e) = apply_object(&domain, &mut state) {
            return failed(format!("Error reading domain {}", name), e.to_string());
        }
        state.set_string("id", &domain.domain);

        ReadDataSourceResponse {
            state: Some(state),
            diagnostics: Diagnostics::new(),
        }
    }
}
