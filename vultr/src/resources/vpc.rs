//! `vultr_vpc`

use super::{
    delete_when_released, id_attribute, read_failed, state_id, DELETE_RETRY_TIMEOUT,
};
use crate::api::vpcs::{Vpc, VpcCreateRequest, VpcUpdateRequest};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::NumberRangeValidator;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct VpcResource {
    data: VultrProviderData,
}

impl VpcResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A private network shared by instances in one region")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("region")
                    .required()
                    .requires_replace(),
            )
            .attribute(AttributeBuilder::string("description").optional().computed())
            .attribute(
                AttributeBuilder::string("v4_subnet")
                    .optional()
                    .computed()
                    .requires_replace()
                    .description("IPv4 network address; Vultr picks one when unset"),
            )
            .attribute(
                AttributeBuilder::number("v4_subnet_mask")
                    .optional()
                    .computed()
                    .requires_replace()
                    .validator(NumberRangeValidator {
                        min: Some(8.0),
                        max: Some(29.0),
                    }),
            )
            .attribute(AttributeBuilder::string("date_created").computed())
            .build()
    }
}

fn apply_vpc(vpc: &Vpc, state: &mut State) {
    state.set_string("id", &vpc.id);
    state.set_string("region", &vpc.region);
    state.set_string("description", &vpc.description);
    state.set_string("v4_subnet", &vpc.v4_subnet);
    state.set_i64("v4_subnet_mask", vpc.v4_subnet_mask);
    state.set_string("date_created", &vpc.date_created);
}

#[async_trait]
impl ResourceV2 for VpcResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = VpcCreateRequest {
            region: state.get_string("region").unwrap_or_default(),
            description: state.get_string("description"),
            v4_subnet: state.get_non_empty_string("v4_subnet"),
            v4_subnet_mask: state.get_i64("v4_subnet_mask"),
        };

        let diagnostics = match self.data.client.vpcs().create(&body).await {
            Ok(vpc) => {
                tracing::info!("Created VPC {} in {}", vpc.id, vpc.region);
                apply_vpc(&vpc, &mut state);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error("Failed to create VPC", e.to_string()),
        };

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut state = request.current_state;
        let id = match state_id(&state) {
            Ok(id) => id,
            Err(diagnostics) => {
                return ReadResponse {
                    state: Some(state),
                    diagnostics,
                }
            }
        };

        match self.data.client.vpcs().get(&id).await {
            Ok(vpc) => {
                apply_vpc(&vpc, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("VPC", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let current = request.current_state;
        let mut state = request.planned_state;
        let id = match state_id(&current) {
            Ok(id) => id,
            Err(diagnostics) => {
                return UpdateResponse {
                    state: current,
                    diagnostics,
                }
            }
        };

        let description = state.get_string("description").unwrap_or_default();
        if Some(&description) != current.get_string("description").as_ref() {
            let body = VpcUpdateRequest { description };
            if let Err(e) = self.data.client.vpcs().update(&id, &body).await {
                return UpdateResponse {
                    state: current,
                    diagnostics: Diagnostics::error(
                        format!("Failed to update VPC {}", id),
                        e.to_string(),
                    ),
                };
            }
        }

        state.set_string("id", &id);
        state.copy_from(&current, "date_created");
        UpdateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match state_id(&request.current_state) {
            Ok(id) => {
                let client = &self.data.client;
                let id = id.as_str();
                delete_when_released(
                    &request.context,
                    "VPC",
                    id,
                    DELETE_RETRY_TIMEOUT,
                    move || async move { client.vpcs().delete(id).await },
                )
                .await
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_data, json_response};
    use mockito::{Matcher, Server};
    use tfplug::context::Context;

    const VPC_JSON: &str = r#"{"vpc": {"id": "vpc-1", "region": "ewr",
        "date_created": "2024-01-01T00:00:00+00:00", "description": "backend",
        "v4_subnet": "10.10.0.0", "v4_subnet_mask": 24}}"#;

    fn vpc_state() -> State {
        let mut state = State::new();
        state.set_string("id", "vpc-1");
        state.set_string("region", "ewr");
        state.set_string("description", "backend");
        state
    }

    #[tokio::test]
    async fn create_lets_vultr_pick_the_subnet() {
        let mut server = Server::new_async().await;
        let mock = json_response(&mut server, "POST", "/vpcs", 201, VPC_JSON)
            .match_body(Matcher::Json(serde_json::json!({
                "region": "ewr",
                "description": "backend"
            })))
            .create_async()
            .await;

        let mut planned = State::new();
        planned.set_string("region", "ewr");
        planned.set_string("description", "backend");

        let resource = VpcResource::new(create_test_data(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: Context::new(),
                config: planned.clone(),
                planned_state: planned,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("v4_subnet").as_deref(), Some("10.10.0.0"));
        assert_eq!(response.state.get_i64("v4_subnet_mask"), Some(24));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn delete_retries_while_instances_are_attached() {
        let mut server = Server::new_async().await;
        let attached = json_response(
            &mut server,
            "DELETE",
            "/vpcs/vpc-1",
            400,
            r#"{"error": "Unable to delete VPC: instances still attached", "status": 400}"#,
        )
        .expect(1)
        .create_async()
        .await;
        let deleted = server
            .mock("DELETE", "/vpcs/vpc-1")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let resource = VpcResource::new(create_test_data(&server.url()));
        let response = resource
            .delete(DeleteRequest {
                context: Context::new(),
                current_state: vpc_state(),
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        attached.assert_async().await;
        deleted.assert_async().await;
    }

    #[tokio::test]
    async fn delete_fails_fast_on_other_errors() {
        let mut server = Server::new_async().await;
        let mock = json_response(
            &mut server,
            "DELETE",
            "/vpcs/vpc-1",
            403,
            r#"{"error": "Unauthorized subaccount", "status": 403}"#,
        )
        .expect(1)
        .create_async()
        .await;

        let resource = VpcResource::new(create_test_data(&server.url()));
        let response = resource
            .delete(DeleteRequest {
                context: Context::new(),
                current_state: vpc_state(),
            })
            .await;

        assert!(response.diagnostics.has_errors());
        mock.assert_async().await;
    }
}
