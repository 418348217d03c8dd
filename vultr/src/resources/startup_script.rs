//! `vultr_startup_script`
//!
//! The script is kept in plain text in state and base64 encoded on the wire.

use super::{changed, delete_diagnostics, id_attribute, read_failed, state_id};
use crate::api::startup_scripts::{StartupScript, StartupScriptRequest};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::defaults::StaticDefault;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::OneOfValidator;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct StartupScriptResource {
    data: VultrProviderData,
}

impl StartupScriptResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A boot or PXE script run when an instance is deployed")
            .attribute(id_attribute())
            .attribute(AttributeBuilder::string("name").required())
            .attribute(
                AttributeBuilder::string("script")
                    .required()
                    .description("Script contents in plain text"),
            )
            .attribute(
                AttributeBuilder::string("type")
                    .optional()
                    .computed()
                    .description("boot or pxe")
                    .validator(OneOfValidator::new(["boot", "pxe"]))
                    .default(StaticDefault::string("boot"))
                    .requires_replace(),
            )
            .attribute(AttributeBuilder::string("date_created").computed())
            .attribute(AttributeBuilder::string("date_modified").computed())
            .build()
    }
}

fn apply_script(script: &StartupScript, state: &mut State) {
    state.set_string("id", &script.id);
    state.set_string("name", &script.name);
    state.set_string("script", script.decoded_script());
    state.set_string("type", &script.script_type);
    state.set_string("date_created", &script.date_created);
    state.set_string("date_modified", &script.date_modified);
}

#[async_trait]
impl ResourceV2 for StartupScriptResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = StartupScriptRequest {
            name: state.get_string("name"),
            script_type: state.get_string("type"),
            script: state
                .get_string("script")
                .map(|s| StartupScriptRequest::encode_script(&s)),
        };

        let diagnostics = match self.data.client.startup_scripts().create(&body).await {
            Ok(script) => {
                tracing::info!("Created startup script {}", script.id);
                apply_script(&script, &mut state);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error("Failed to create startup script", e.to_string()),
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

        match self.data.client.startup_scripts().get(&id).await {
            Ok(script) => {
                apply_script(&script, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("startup script", &id, e, state),
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

        let planned = request.planned_state;
        let body = StartupScriptRequest {
            name: changed(planned.get_string("name"), current.get_string("name")),
            script_type: None,
            script: changed(planned.get_string("script"), current.get_string("script"))
                .map(|s| StartupScriptRequest::encode_script(&s)),
        };

        let client = &self.data.client;
        let result = match client.startup_scripts().update(&id, &body).await {
            Ok(()) => client.startup_scripts().get(&id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(script) => {
                let mut state = planned;
                apply_script(&script, &mut state);
                UpdateResponse {
                    state,
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => UpdateResponse {
                state: current,
                diagnostics: Diagnostics::error(
                    format!("Failed to update startup script {}", id),
                    e.to_string(),
                ),
            },
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match state_id(&request.current_state) {
            Ok(id) => {
                let result = self.data.client.startup_scripts().delete(&id).await;
                delete_diagnostics("startup script", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}
