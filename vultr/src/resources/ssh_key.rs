//! `vultr_ssh_key`

use super::{changed, delete_diagnostics, id_attribute, read_failed, state_id};
use crate::api::ssh_keys::{SshKey, SshKeyRequest};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct SshKeyResource {
    data: VultrProviderData,
}

impl SshKeyResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("An SSH public key that can be installed on new instances")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("Name of the SSH key"),
            )
            .attribute(
                AttributeBuilder::string("ssh_key")
                    .required()
                    .description("The public key, e.g. `ssh-ed25519 AAAA... user@host`"),
            )
            .attribute(
                AttributeBuilder::string("date_created")
                    .computed()
                    .description("When the key was added"),
            )
            .build()
    }
}

fn apply_key(key: &SshKey, state: &mut State) {
    state.set_string("id", &key.id);
    state.set_string("name", &key.name);
    state.set_string("ssh_key", &key.ssh_key);
    state.set_string("date_created", &key.date_created);
}

#[async_trait]
impl ResourceV2 for SshKeyResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = SshKeyRequest {
            name: request.config.get_string("name"),
            ssh_key: request.config.get_string("ssh_key"),
        };

        let diagnostics = match self.data.client.ssh_keys().create(&body).await {
            Ok(key) => {
                tracing::info!("Created SSH key {}", key.id);
                apply_key(&key, &mut state);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error("Failed to create SSH key", e.to_string()),
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

        match self.data.client.ssh_keys().get(&id).await {
            Ok(key) => {
                apply_key(&key, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("SSH key", &id, e, state),
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

        let body = SshKeyRequest {
            name: changed(state.get_string("name"), current.get_string("name")),
            ssh_key: changed(state.get_string("ssh_key"), current.get_string("ssh_key")),
        };

        if let Err(e) = self.data.client.ssh_keys().update(&id, &body).await {
            return UpdateResponse {
                state: current,
                diagnostics: Diagnostics::error(
                    format!("Failed to update SSH key {}", id),
                    e.to_string(),
                ),
            };
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
                let result = self.data.client.ssh_keys().delete(&id).await;
                delete_diagnostics("SSH key", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}
