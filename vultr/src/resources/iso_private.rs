//! `vultr_iso_private`
//!
//! Vultr downloads the image from `url` in the background; the ISO is
//! usable once its status is `complete`. Nothing about an ISO can be
//! changed afterwards.

use super::{delete_diagnostics, id_attribute, read_failed, state_id, wait_failed};
use crate::api::iso::{Iso, IsoCreateRequest};
use crate::wait::{wait_for_iso, Transition, ISO_TIMEOUT};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::StringLengthValidator;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct IsoPrivateResource {
    data: VultrProviderData,
}

impl IsoPrivateResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A private ISO image uploaded from a URL")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("url")
                    .required()
                    .requires_replace()
                    .validator(StringLengthValidator {
                        min: Some(1),
                        max: None,
                    }),
            )
            .attribute(AttributeBuilder::string("date_created").computed())
            .attribute(AttributeBuilder::string("filename").computed())
            .attribute(AttributeBuilder::number("size").computed())
            .attribute(AttributeBuilder::string("md5sum").computed())
            .attribute(AttributeBuilder::string("sha512sum").computed())
            .attribute(AttributeBuilder::string("status").computed())
            .build()
    }
}

fn apply_iso(iso: &Iso, state: &mut State) {
    state.set_string("id", &iso.id);
    state.set_string("date_created", &iso.date_created);
    state.set_string("filename", &iso.filename);
    state.set_i64("size", iso.size);
    state.set_string("md5sum", &iso.md5sum);
    state.set_string("sha512sum", &iso.sha512sum);
    state.set_string("status", &iso.status);
}

#[async_trait]
impl ResourceV2 for IsoPrivateResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = IsoCreateRequest {
            url: state.get_string("url").unwrap_or_default(),
        };

        let iso = match self.data.client.iso().create(&body).await {
            Ok(iso) => iso,
            Err(e) => {
                return CreateResponse {
                    state,
                    diagnostics: Diagnostics::error(
                        format!("Failed to create ISO from {}", body.url),
                        e.to_string(),
                    ),
                }
            }
        };
        tracing::info!("Downloading ISO {} from {}", iso.id, body.url);
        state.set_string("id", &iso.id);

        let waited = wait_for_iso(
            &request.context,
            &self.data.client,
            &self.data.wait,
            &iso.id,
            Transition::new(&["pending"], &["complete"], ISO_TIMEOUT),
        )
        .await;

        let diagnostics = match waited {
            Ok(iso) => {
                apply_iso(&iso, &mut state);
                Diagnostics::new()
            }
            Err(e) => wait_failed("ISO", &iso.id, e),
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

        match self.data.client.iso().get(&id).await {
            Ok(iso) => {
                apply_iso(&iso, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("ISO", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let mut state = request.current_state;
        state.copy_from(&request.planned_state, "url");
        UpdateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match state_id(&request.current_state) {
            Ok(id) => {
                let result = self.data.client.iso().delete(&id).await;
                delete_diagnostics("ISO", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}
