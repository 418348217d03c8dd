//! `vultr_firewall_group`

use super::{
    delete_when_released, id_attribute, read_failed, state_id, DELETE_RETRY_TIMEOUT,
};
use crate::api::firewalls::{FirewallGroup, FirewallGroupRequest};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct FirewallGroupResource {
    data: VultrProviderData,
}

impl FirewallGroupResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A named set of firewall rules instances can join")
            .attribute(id_attribute())
            .attribute(AttributeBuilder::string("description").optional().computed())
            .attribute(AttributeBuilder::string("date_created").computed())
            .attribute(AttributeBuilder::string("date_modified").computed())
            .attribute(
                AttributeBuilder::number("instance_count")
                    .computed()
                    .description("Instances using the group"),
            )
            .attribute(AttributeBuilder::number("rule_count").computed())
            .attribute(AttributeBuilder::number("max_rule_count").computed())
            .build()
    }
}

fn apply_group(group: &FirewallGroup, state: &mut State) {
    state.set_string("id", &group.id);
    state.set_string("description", &group.description);
    state.set_string("date_created", &group.date_created);
    state.set_string("date_modified", &group.date_modified);
    state.set_i64("instance_count", group.instance_count);
    state.set_i64("rule_count", group.rule_count);
    state.set_i64("max_rule_count", group.max_rule_count);
}

#[async_trait]
impl ResourceV2 for FirewallGroupResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = FirewallGroupRequest {
            description: state.get_string("description"),
        };

        let diagnostics = match self.data.client.firewalls().create(&body).await {
            Ok(group) => {
                tracing::info!("Created firewall group {}", group.id);
                apply_group(&group, &mut state);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error("Failed to create firewall group", e.to_string()),
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

        match self.data.client.firewalls().get(&id).await {
            Ok(group) => {
                apply_group(&group, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("firewall group", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let current = request.current_state;
        let id = match state_id(&current) {
            Ok(id) => id,
            Err(diagnostics) => {
                return UpdateResponse {
                    state: current,
                    diagnostics,
                }
            }
        };

        let client = &self.data.client;
        let body = FirewallGroupRequest {
            description: Some(request.planned_state.get_string("description").unwrap_or_default()),
        };
        let result = match client.firewalls().update(&id, &body).await {
            Ok(()) => client.firewalls().get(&id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(group) => {
                let mut state = request.planned_state;
                apply_group(&group, &mut state);
                UpdateResponse {
                    state,
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => UpdateResponse {
                state: current,
                diagnostics: Diagnostics::error(
                    format!("Failed to update firewall group {}", id),
                    e.to_string(),
                ),
            },
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match state_id(&request.current_state) {
            Ok(id) => {
                let client = &self.data.client;
                let id = id.as_str();
                delete_when_released(
                    &request.context,
                    "firewall group",
                    id,
                    DELETE_RETRY_TIMEOUT,
                    move || async move { client.firewalls().delete(id).await },
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

    fn group_json(description: &str, rules: i64) -> String {
        format!(
            r#"{{"firewall_group": {{"id": "fw-1", "description": "{}",
                "date_created": "2024-01-01", "date_modified": "2024-01-02",
                "instance_count": 2, "rule_count": {}, "max_rule_count": 50}}}}"#,
            description, rules
        )
    }

    #[tokio::test]
    async fn create_reports_counters() {
        let mut server = Server::new_async().await;
        let _m = json_response(&mut server, "POST", "/firewalls", 201, &group_json("web", 0))
            .match_body(Matcher::Json(serde_json::json!({"description": "web"})))
            .create_async()
            .await;

        let mut planned = State::new();
        planned.set_string("description", "web");

        let resource = FirewallGroupResource::new(create_test_data(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: Context::new(),
                config: planned.clone(),
                planned_state: planned,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("id").as_deref(), Some("fw-1"));
        assert_eq!(response.state.get_i64("max_rule_count"), Some(50));
    }

    #[tokio::test]
    async fn update_puts_description_and_refreshes() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/firewalls/fw-1")
            .match_body(Matcher::Json(serde_json::json!({"description": "frontend"})))
            .with_status(204)
            .create_async()
            .await;
        let _get = json_response(
            &mut server,
            "GET",
            "/firewalls/fw-1",
            200,
            &group_json("frontend", 3),
        )
        .create_async()
        .await;

        let mut current = State::new();
        current.set_string("id", "fw-1");
        current.set_string("description", "web");
        let mut planned = current.clone();
        planned.set_string("description", "frontend");

        let resource = FirewallGroupResource::new(create_test_data(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: Context::new(),
                config: planned.clone(),
                planned_state: planned,
                current_state: current,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_i64("rule_count"), Some(3));
        put.assert_async().await;
    }

    #[tokio::test]
    async fn delete_retries_while_group_is_in_use() {
        let mut server = Server::new_async().await;
        let in_use = json_response(
            &mut server,
            "DELETE",
            "/firewalls/fw-1",
            400,
            r#"{"error": "firewall group is in use by 1 instance", "status": 400}"#,
        )
        .expect(1)
        .create_async()
        .await;
        let deleted = server
            .mock("DELETE", "/firewalls/fw-1")
            .with_status(204)
            .create_async()
            .await;

        let mut state = State::new();
        state.set_string("id", "fw-1");

        let resource = FirewallGroupResource::new(create_test_data(&server.url()));
        let response = resource
            .delete(DeleteRequest {
                context: Context::new(),
                current_state: state,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        in_use.assert_async().await;
        deleted.assert_async().await;
    }
}
