//! `vultr_account`: the account the API key belongs to

use super::{apply_object, computed_fields, failed};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::DataSourceSchema;
use tfplug::request::{
    DataSourceSchemaResponse, ReadDataSourceRequest, ReadDataSourceResponse, SchemaRequest,
};
use tfplug::{AttributeBuilder, AttributeType, DataSourceV2, Diagnostics, SchemaBuilder};

pub struct AccountDataSource {
    data: VultrProviderData,
}

impl AccountDataSource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> DataSourceSchema {
        let schema = SchemaBuilder::new()
            .version(0)
            .description("Billing and access details of the configured account")
            .attribute(AttributeBuilder::string("id").computed());

        computed_fields(
            schema,
            &[
                ("name", AttributeType::String),
                ("email", AttributeType::String),
                ("acls", AttributeType::list_of(AttributeType::String)),
                ("balance", AttributeType::Number),
                ("pending_charges", AttributeType::Number),
                ("last_payment_date", AttributeType::String),
                ("last_payment_amount", AttributeType::Number),
            ],
        )
        .build()
    }
}

#[async_trait]
impl DataSourceV2 for AccountDataSource {
    async fn schema(&self, _request: SchemaRequest) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn read(&self, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let account = match self.data.client.account().get().await {
            Ok(account) => account,
            Err(e) => return failed("Failed to read account", e.to_string()),
        };

        let mut state = request.config;
        if let Err(e) = apply_object(&account, &mut state) {
            return failed("Error reading account", e.to_string());
        }
        state.set_string("id", &account.email);

        ReadDataSourceResponse {
            state: Some(state),
            diagnostics: Diagnostics::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_data, json_response};
    use mockito::Server;
    use tfplug::context::Context;
    use tfplug::types::Config;

    #[tokio::test]
    async fn reads_account_into_state() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/account",
            200,
            r#"{"account": {"name": "Ops", "email": "ops@example.com",
                "acls": ["manage_users", "billing"], "balance": -12.5,
                "pending_charges": 3.25, "last_payment_date": "2024-02-01T00:00:00+00:00",
                "last_payment_amount": -20}}"#,
        )
        .create_async()
        .await;

        let data_source = AccountDataSource::new(create_test_data(&server.url()));
        let response = data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: Config::new(),
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        let state = response.state.unwrap();
        assert_eq!(state.get_string("id").as_deref(), Some("ops@example.com"));
        assert_eq!(state.get_string_list("acls"), vec!["manage_users", "billing"]);
        assert_eq!(state.get_number("pending_charges"), Some(3.25));
    }

    #[tokio::test]
    async fn unauthorized_key_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = json_response(&mut server, "GET", "/account", 401, r#"{"error": "Invalid API token."}"#)
            .create_async()
            .await;

        let data_source = AccountDataSource::new(create_test_data(&server.url()));
        let response = data_source
            .read(ReadDataSourceRequest {
                context: Context::new(),
                config: Config::new(),
            })
            .await;

        assert!(response.state.is_none());
        assert!(response.diagnostics.has_errors());
    }
}
