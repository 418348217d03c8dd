//! `vultr_reserved_ip`

use super::{delete_diagnostics, id_attribute, read_failed, state_id};
use crate::api::reserved_ips::{ReservedIp, ReservedIpCreateRequest, ReservedIpUpdateRequest};
use crate::api::ApiError;
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::OneOfValidator;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct ReservedIpResource {
    data: VultrProviderData,
}

impl ReservedIpResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("An IP address reserved independently of any instance")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("region")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("ip_type")
                    .required()
                    .requires_replace()
                    .validator(OneOfValidator::new(["v4", "v6"])),
            )
            .attribute(AttributeBuilder::string("label").optional().computed())
            .attribute(
                AttributeBuilder::string("instance_id")
                    .optional()
                    .description("Instance the address is attached to"),
            )
            .attribute(AttributeBuilder::string("subnet").computed())
            .attribute(AttributeBuilder::number("subnet_size").computed())
            .build()
    }
}

fn apply_reserved_ip(ip: &ReservedIp, state: &mut State) {
    state.set_string("id", &ip.id);
    state.set_string("region", &ip.region);
    state.set_string("ip_type", &ip.ip_type);
    state.set_string("label", &ip.label);
    state.set_optional_string("instance_id", Some(&ip.instance_id).filter(|i| !i.is_empty()));
    state.set_string("subnet", &ip.subnet);
    state.set_i64("subnet_size", ip.subnet_size);
}

#[async_trait]
impl ResourceV2 for ReservedIpResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let client = &self.data.client;
        let body = ReservedIpCreateRequest {
            region: state.get_string("region").unwrap_or_default(),
            ip_type: state.get_string("ip_type").unwrap_or_default(),
            label: state.get_string("label"),
        };

        let ip = match client.reserved_ips().create(&body).await {
            Ok(ip) => ip,
            Err(e) => {
                return CreateResponse {
                    state,
                    diagnostics: Diagnostics::error("Failed to create reserved IP", e.to_string()),
                }
            }
        };
        tracing::info!("Reserved IP {} ({})", ip.subnet, ip.id);
        apply_reserved_ip(&ip, &mut state);

        if let Some(instance_id) = request.config.get_non_empty_string("instance_id") {
            let attached = match client.reserved_ips().attach(&ip.id, &instance_id).await {
                Ok(()) => client.reserved_ips().get(&ip.id).await,
                Err(e) => Err(e),
            };
            match attached {
                Ok(ip) => apply_reserved_ip(&ip, &mut state),
                Err(e) => {
                    return CreateResponse {
                        state,
                        diagnostics: Diagnostics::error(
                            format!("Failed to attach reserved IP {} to {}", ip.id, instance_id),
                            e.to_string(),
                        ),
                    }
                }
            }
        }

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

        match self.data.client.reserved_ips().get(&id).await {
            Ok(ip) => {
                apply_reserved_ip(&ip, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("reserved IP", &id, e, state),
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

        let api = self.data.client.reserved_ips();
        let label = planned.get_string("label");
        let current_instance = current.get_non_empty_string("instance_id");
        let target_instance = planned.get_non_empty_string("instance_id");

        let result: Result<ReservedIp, ApiError> = async {
            if let Some(label) = label.filter(|l| Some(l) != current.get_string("label").as_ref()) {
                api.update(&id, &ReservedIpUpdateRequest { label }).await?;
            }
            if current_instance != target_instance {
                if current_instance.is_some() {
                    api.detach(&id).await?;
                }
                if let Some(instance_id) = &target_instance {
                    api.attach(&id, instance_id).await?;
                }
            }
            api.get(&id).await
        }
        .await;

        match result {
            Ok(ip) => {
                let mut state = planned;
                apply_reserved_ip(&ip, &mut state);
                UpdateResponse {
                    state,
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => UpdateResponse {
                state: current,
                diagnostics: Diagnostics::error(
                    format!("Failed to update reserved IP {}", id),
                    e.to_string(),
                ),
            },
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let state = request.current_state;
        let id = match state_id(&state) {
            Ok(id) => id,
            Err(diagnostics) => return DeleteResponse { diagnostics },
        };

        let api = self.data.client.reserved_ips();
        if state.get_non_empty_string("instance_id").is_some() {
            if let Err(e) = api.detach(&id).await {
                tracing::warn!("Detaching reserved IP {} before delete failed: {}", id, e);
            }
        }

        DeleteResponse {
            diagnostics: delete_diagnostics("reserved IP", &id, api.delete(&id).await),
        }
    }
}
