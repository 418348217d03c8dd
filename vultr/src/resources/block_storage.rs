//! `vultr_block_storage`
//!
//! Volumes are created detached and become `active` asynchronously; when
//! `attached_to_instance` is set the volume is attached once active.

use super::{changed, delete_diagnostics, id_attribute, read_failed, state_id, wait_failed};
use crate::api::blocks::{BlockStorage, BlockStorageCreateRequest, BlockStorageUpdateRequest};
use crate::api::ApiError;
use crate::wait::{wait_for_block_storage, Transition, BLOCK_STORAGE_TIMEOUT};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{PlanModifyRequest, RequiresReplaceIf};
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::{NumberRangeValidator, OneOfValidator};
use tfplug::{AttributeBuilder, Diagnostics, Dynamic, ResourceV2, SchemaBuilder};

pub struct BlockStorageResource {
    data: VultrProviderData,
}

impl BlockStorageResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A block storage volume")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("region")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::number("size_gb")
                    .required()
                    .description("Volume size; volumes can grow in place but not shrink")
                    .validator(NumberRangeValidator {
                        min: Some(10.0),
                        max: Some(40000.0),
                    })
                    .plan_modifier(RequiresReplaceIf::new(
                        |req: &PlanModifyRequest| {
                            matches!((&req.state, &req.plan),
                                (Dynamic::Number(old), Dynamic::Number(new)) if new < old)
                        },
                        "Shrinking a block storage volume replaces it",
                    )),
            )
            .attribute(AttributeBuilder::string("label").optional().computed())
            .attribute(
                AttributeBuilder::string("block_type")
                    .optional()
                    .computed()
                    .requires_replace()
                    .validator(OneOfValidator::new(["high_perf", "storage_opt"])),
            )
            .attribute(
                AttributeBuilder::string("attached_to_instance")
                    .optional()
                    .description("ID of the instance the volume is attached to"),
            )
            .attribute(
                AttributeBuilder::bool("live")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false))
                    .description("Attach and detach without restarting the instance"),
            )
            .attribute(AttributeBuilder::number("cost").computed())
            .attribute(AttributeBuilder::string("status").computed())
            .attribute(AttributeBuilder::string("mount_id").computed())
            .attribute(AttributeBuilder::string("date_created").computed())
            .build()
    }

    /// Moves the volume to `target`, detaching it from its current instance first
    async fn reattach(
        &self,
        id: &str,
        current: Option<&str>,
        target: Option<&str>,
        live: bool,
    ) -> Result<(), ApiError> {
        if current == target {
            return Ok(());
        }
        let blocks = self.data.client.blocks();
        if let Some(instance) = current {
            tracing::info!("Detaching block storage {} from {}", id, instance);
            blocks.detach(id, live).await?;
        }
        if let Some(instance) = target {
            tracing::info!("Attaching block storage {} to {}", id, instance);
            blocks.attach(id, instance, live).await?;
        }
        Ok(())
    }

    async fn wait_active(&self, ctx: &Context, id: &str) -> Result<BlockStorage, Diagnostics> {
        wait_for_block_storage(
            ctx,
            &self.data.client,
            &self.data.wait,
            id,
            Transition::new(&["pending"], &["active"], BLOCK_STORAGE_TIMEOUT),
        )
        .await
        .map_err(|e| wait_failed("block storage", id, e))
    }
}

fn apply_block(block: &BlockStorage, state: &mut State) {
    state.set_string("id", &block.id);
    state.set_string("region", &block.region);
    state.set_i64("size_gb", block.size_gb);
    state.set_string("label", &block.label);
    state.set_string("block_type", &block.block_type);
    state.set_optional_string(
        "attached_to_instance",
        Some(&block.attached_to_instance).filter(|i| !i.is_empty()),
    );
    state.set_number("cost", block.cost);
    state.set_string("status", &block.status);
    state.set_string("mount_id", &block.mount_id);
    state.set_string("date_created", &block.date_created);
}

#[async_trait]
impl ResourceV2 for BlockStorageResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = BlockStorageCreateRequest {
            region: state.get_string("region").unwrap_or_default(),
            size_gb: state.get_i64("size_gb").unwrap_or_default(),
            label: state.get_string("label"),
            block_type: state.get_non_empty_string("block_type"),
        };

        let block = match self.data.client.blocks().create(&body).await {
            Ok(block) => block,
            Err(e) => {
                return CreateResponse {
                    state,
                    diagnostics: Diagnostics::error("Failed to create block storage", e.to_string()),
                }
            }
        };
        tracing::info!("Created block storage {}", block.id);
        state.set_string("id", &block.id);

        let mut block = match self.wait_active(&request.context, &block.id).await {
            Ok(block) => block,
            Err(diagnostics) => return CreateResponse { state, diagnostics },
        };

        let target = state.get_non_empty_string("attached_to_instance");
        let live = state.get_bool("live").unwrap_or(false);
        if target.is_some() {
            let attached = match self.reattach(&block.id, None, target.as_deref(), live).await {
                Ok(()) => self.data.client.blocks().get(&block.id).await,
                Err(e) => Err(e),
            };
            match attached {
                Ok(refreshed) => block = refreshed,
                Err(e) => {
                    return CreateResponse {
                        state,
                        diagnostics: Diagnostics::error(
                            format!("Failed to attach block storage {}", block.id),
                            e.to_string(),
                        ),
                    }
                }
            }
        }

        apply_block(&block, &mut state);
        CreateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
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

        match self.data.client.blocks().get(&id).await {
            Ok(block) => {
                apply_block(&block, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("block storage", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let current = request.current_state;
        let planned = request.planned_state;
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
        let body = BlockStorageUpdateRequest {
            label: changed(planned.get_string("label"), current.get_string("label")),
            size_gb: changed(planned.get_i64("size_gb"), current.get_i64("size_gb")),
        };
        let live = planned.get_bool("live").unwrap_or(false);
        let current_instance = current.get_non_empty_string("attached_to_instance");
        let target_instance = planned.get_non_empty_string("attached_to_instance");

        let mut patched = false;
        let result: Result<BlockStorage, ApiError> = async {
            if body.label.is_some() || body.size_gb.is_some() {
                client.blocks().update(&id, &body).await?;
                patched = true;
            }
            self.reattach(
                &id,
                current_instance.as_deref(),
                target_instance.as_deref(),
                live,
            )
            .await?;
            client.blocks().get(&id).await
        }
        .await;

        match result {
            Ok(block) => {
                let mut state = planned;
                apply_block(&block, &mut state);
                UpdateResponse {
                    state,
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => {
                // Record whatever already changed remotely
                let mut state = current;
                match client.blocks().get(&id).await {
                    Ok(block) => apply_block(&block, &mut state),
                    Err(_) if patched => {
                        state.copy_from(&planned, "label");
                        state.copy_from(&planned, "size_gb");
                    }
                    Err(_) => {}
                }
                UpdateResponse {
                    state,
                    diagnostics: Diagnostics::error(
                        format!("Failed to update block storage {}", id),
                        e.to_string(),
                    ),
                }
            }
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let state = request.current_state;
        let id = match state_id(&state) {
            Ok(id) => id,
            Err(diagnostics) => return DeleteResponse { diagnostics },
        };

        let blocks = self.data.client.blocks();
        if state.get_non_empty_string("attached_to_instance").is_some() {
            let live = state.get_bool("live").unwrap_or(false);
            if let Err(e) = blocks.detach(&id, live).await {
                if !e.is_not_found() {
                    return DeleteResponse {
                        diagnostics: Diagnostics::error(
                            format!("Failed to detach block storage {}", id),
                            e.to_string(),
                        ),
                    };
                }
            }
        }

        DeleteResponse {
            diagnostics: delete_diagnostics("block storage", &id, blocks.delete(&id).await),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_data, json_response};
    use mockito::{Matcher, Server};

    #[test]
    fn shrinking_requires_replacement() {
        let schema = BlockStorageResource::schema_static();
        let modifier = &schema.attributes["size_gb"].plan_modifiers[0];
        let plan = |old: f64, new: f64| PlanModifyRequest {
            state: Dynamic::Number(old),
            plan: Dynamic::Number(new),
            config: Dynamic::Number(new),
            attribute_path: "size_gb".to_string(),
        };

        assert!(modifier.modify_plan(plan(50.0, 40.0)).requires_replace);
        assert!(!modifier.modify_plan(plan(50.0, 100.0)).requires_replace);
        assert!(!modifier.modify_plan(plan(50.0, 50.0)).requires_replace);
    }

    fn block_json(status: &str, attached: &str, size: i64) -> String {
        format!(
            r#"{{"block": {{"id": "blk-1", "cost": 1.0, "status": "{}", "size_gb": {},
                "region": "ewr", "attached_to_instance": "{}", "date_created": "2024-01-01",
                "label": "data", "mount_id": "ewr-abc", "block_type": "high_perf"}}}}"#,
            status, size, attached
        )
    }

    fn planned(attached: Option<&str>) -> State {
        let mut state = State::new();
        state.set_string("region", "ewr");
        state.set_i64("size_gb", 10);
        state.set_string("label", "data");
        state.set_optional_string("attached_to_instance", attached);
        state.set_bool("live", true);
        state
    }

    #[tokio::test]
    async fn create_waits_then_attaches() {
        let mut server = Server::new_async().await;
        let _create = json_response(&mut server, "POST", "/blocks", 202, &block_json("pending", "", 10))
            .create_async()
            .await;
        let _active = json_response(&mut server, "GET", "/blocks/blk-1", 200, &block_json("active", "", 10))
            .expect(1)
            .create_async()
            .await;
        let attach = server
            .mock("POST", "/blocks/blk-1/attach")
            .match_body(Matcher::Json(serde_json::json!({"instance_id": "inst-1", "live": true})))
            .with_status(204)
            .create_async()
            .await;
        let _attached = json_response(
            &mut server,
            "GET",
            "/blocks/blk-1",
            200,
            &block_json("active", "inst-1", 10),
        )
        .create_async()
        .await;

        let resource = BlockStorageResource::new(create_test_data(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: Context::new(),
                config: planned(Some("inst-1")),
                planned_state: planned(Some("inst-1")),
            })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        assert_eq!(
            response.state.get_string("attached_to_instance").as_deref(),
            Some("inst-1")
        );
        assert_eq!(response.state.get_string("mount_id").as_deref(), Some("ewr-abc"));
        attach.assert_async().await;
    }

    #[tokio::test]
    async fn failed_wait_keeps_the_id() {
        let mut server = Server::new_async().await;
        let _create = json_response(&mut server, "POST", "/blocks", 202, &block_json("pending", "", 10))
            .create_async()
            .await;
        let _broken = json_response(
            &mut server,
            "GET",
            "/blocks/blk-1",
            200,
            &block_json("failed", "", 10),
        )
        .create_async()
        .await;

        let resource = BlockStorageResource::new(create_test_data(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: Context::new(),
                config: planned(None),
                planned_state: planned(None),
            })
            .await;

        assert!(response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("id").as_deref(), Some("blk-1"));
    }

    #[tokio::test]
    async fn update_resizes_and_detaches() {
        let mut server = Server::new_async().await;
        let resize = server
            .mock("PATCH", "/blocks/blk-1")
            .match_body(Matcher::Json(serde_json::json!({"size_gb": 20})))
            .with_status(204)
            .create_async()
            .await;
        let detach = server
            .mock("POST", "/blocks/blk-1/detach")
            .match_body(Matcher::Json(serde_json::json!({"live": true})))
            .with_status(204)
            .create_async()
            .await;
        let _get = json_response(&mut server, "GET", "/blocks/blk-1", 200, &block_json("active", "", 20))
            .create_async()
            .await;

        let mut current = planned(Some("inst-1"));
        current.set_string("id", "blk-1");
        let mut next = planned(None);
        next.set_string("id", "blk-1");
        next.set_i64("size_gb", 20);

        let resource = BlockStorageResource::new(create_test_data(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: Context::new(),
                config: next.clone(),
                planned_state: next,
                current_state: current,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_i64("size_gb"), Some(20));
        assert_eq!(response.state.get_string("attached_to_instance"), None);
        resize.assert_async().await;
        detach.assert_async().await;
    }

    #[tokio::test]
    async fn failed_detach_keeps_the_applied_resize() {
        let mut server = Server::new_async().await;
        let resize = server
            .mock("PATCH", "/blocks/blk-1")
            .match_body(Matcher::Json(serde_json::json!({"size_gb": 20, "label": "scratch"})))
            .with_status(204)
            .create_async()
            .await;
        let _detach = json_response(
            &mut server,
            "POST",
            "/blocks/blk-1/detach",
            400,
            r#"{"error": "Instance is locked", "status": 400}"#,
        )
        .create_async()
        .await;
        let mut resized: serde_json::Value =
            serde_json::from_str(&block_json("active", "inst-1", 20)).unwrap();
        resized["block"]["label"] = serde_json::json!("scratch");
        let _get = json_response(&mut server, "GET", "/blocks/blk-1", 200, &resized.to_string())
            .create_async()
            .await;

        let mut current = planned(Some("inst-1"));
        current.set_string("id", "blk-1");
        let mut next = planned(None);
        next.set_string("id", "blk-1");
        next.set_i64("size_gb", 20);
        next.set_string("label", "scratch");

        let resource = BlockStorageResource::new(create_test_data(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: Context::new(),
                config: next.clone(),
                planned_state: next,
                current_state: current,
            })
            .await;

        assert!(response.diagnostics.has_errors());
        assert_eq!(response.state.get_i64("size_gb"), Some(20));
        assert_eq!(response.state.get_string("label").as_deref(), Some("scratch"));
        assert_eq!(
            response.state.get_string("attached_to_instance").as_deref(),
            Some("inst-1")
        );
        resize.assert_async().await;
    }
}
