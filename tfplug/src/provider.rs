//! Provider, resource and data source traits
//!
//! Providers are factories: every RPC that touches a resource or data source
//! asks the provider for a fresh instance by type name, so instances never
//! need locking and can hold a clone of the configured API client.

use crate::request::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DataSourceSchemaResponse,
    DeleteRequest, DeleteResponse, ImportRequest, ImportResponse, ReadDataSourceRequest,
    ReadDataSourceResponse, ReadRequest, ReadResponse, ResourceSchemaResponse, SchemaRequest,
    UpdateRequest, UpdateResponse, ValidateRequest, ValidateResponse,
};
use crate::types::{Diagnostics, State};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub use crate::schema::{DataSourceSchema, ProviderSchema, ResourceSchema};

#[async_trait]
pub trait ProviderV2: Send + Sync {
    /// Schema of the `provider` configuration block
    async fn provider_schema(&self) -> ProviderSchema;

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse;

    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>>;

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSourceV2>>;

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema>;

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema>;
}

#[async_trait]
pub trait ResourceV2: Send + Sync {
    async fn schema(&self, request: SchemaRequest) -> ResourceSchemaResponse;

    /// Cross-field checks beyond what the schema expresses
    async fn validate(&self, _request: ValidateRequest) -> ValidateResponse {
        ValidateResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse;

    /// Returns `state: None` when the remote object no longer exists
    async fn read(&self, request: ReadRequest) -> ReadResponse;

    async fn update(&self, request: UpdateRequest) -> UpdateResponse;

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse;

    /// Builds the state to read after `terraform import`; the default stores
    /// the import ID as `id` and lets the following read fill in the rest
    async fn import_state(&self, request: ImportRequest) -> ImportResponse {
        let mut state = State::new();
        state.set_string("id", request.id);
        ImportResponse {
            state: Some(state),
            diagnostics: Diagnostics::new(),
        }
    }
}

#[async_trait]
pub trait DataSourceV2: Send + Sync {
    async fn schema(&self, request: SchemaRequest) -> DataSourceSchemaResponse;

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse;
}
