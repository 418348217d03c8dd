//! `vultr_instance`
//!
//! A new instance is only usable once three independent fields settle:
//! `status` reaches active, `power_status` running and `server_status` ok.
//! Create waits for each in turn. A plan change resizes the instance, which
//! passes through `resizing` before it is active again.

use super::{delete_diagnostics, id_attribute, read_failed, state_id, wait_failed};
use crate::api::common::enabled_flag;
use crate::api::instances::{Instance, InstanceCreateRequest, InstanceUpdateRequest};
use crate::api::ApiError;
use crate::wait::{wait_for_instance, InstanceAttribute, Transition, INSTANCE_TIMEOUT};
use crate::VultrProviderData;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::OneOfValidator;
use tfplug::{AttributeBuilder, AttributeType, Diagnostics, ResourceV2, SchemaBuilder};

pub struct InstanceResource {
    data: VultrProviderData,
}

impl InstanceResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        let computed_string = |name: &str| AttributeBuilder::string(name).computed();
        let computed_number = |name: &str| AttributeBuilder::number(name).computed();

        SchemaBuilder::new()
            .version(0)
            .description("A Vultr cloud compute instance")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("region")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("plan")
                    .required()
                    .description("Changing the plan resizes the instance in place"),
            )
            .attribute(
                AttributeBuilder::number("os_id")
                    .optional()
                    .computed()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("iso_id")
                    .optional()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("snapshot_id")
                    .optional()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::number("app_id")
                    .optional()
                    .computed()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("image_id")
                    .optional()
                    .computed()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("script_id")
                    .optional()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::list("ssh_key_ids", AttributeType::String)
                    .optional()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::list("vpc_ids", AttributeType::String)
                    .optional()
                    .computed()
                    .description("VPCs the instance is attached to"),
            )
            .attribute(AttributeBuilder::bool("enable_ipv6").optional().computed())
            .attribute(
                AttributeBuilder::bool("disable_public_ipv4")
                    .optional()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("backups")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("disabled"))
                    .validator(OneOfValidator::new(["enabled", "disabled"])),
            )
            .attribute(
                AttributeBuilder::bool("ddos_protection")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false)),
            )
            .attribute(
                AttributeBuilder::bool("activation_email")
                    .optional()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("hostname")
                    .optional()
                    .computed()
                    .requires_replace(),
            )
            .attribute(AttributeBuilder::string("label").optional().computed())
            .attribute(AttributeBuilder::list("tags", AttributeType::String).optional().computed())
            .attribute(
                AttributeBuilder::string("user_data")
                    .optional()
                    .sensitive()
                    .description("Plain text; encoded before it is sent"),
            )
            .attribute(AttributeBuilder::string("firewall_group_id").optional().computed())
            .attribute(
                AttributeBuilder::string("reserved_ip_id")
                    .optional()
                    .requires_replace(),
            )
            .attribute(computed_string("os"))
            .attribute(computed_number("ram"))
            .attribute(computed_number("disk"))
            .attribute(computed_string("main_ip"))
            .attribute(computed_number("vcpu_count"))
            .attribute(computed_string("date_created"))
            .attribute(computed_string("status"))
            .attribute(computed_string("power_status"))
            .attribute(computed_string("server_status"))
            .attribute(computed_number("allowed_bandwidth"))
            .attribute(computed_string("netmask_v4"))
            .attribute(computed_string("gateway_v4"))
            .attribute(computed_string("v6_network"))
            .attribute(computed_string("v6_main_ip"))
            .attribute(computed_number("v6_network_size"))
            .attribute(computed_string("internal_ip"))
            .attribute(computed_string("kvm").sensitive())
            .attribute(AttributeBuilder::list("features", AttributeType::String).computed())
            .attribute(
                computed_string("default_password")
                    .sensitive()
                    .description("Root password, only known right after create"),
            )
            .build()
    }

    /// Waits until the instance is active, powered on and booted
    async fn wait_ready(&self, ctx: &Context, id: &str) -> Result<Instance, Diagnostics> {
        let stages = [
            (
                InstanceAttribute::Status,
                Transition::new(&["pending"], &["active"], INSTANCE_TIMEOUT),
            ),
            (
                InstanceAttribute::PowerStatus,
                Transition::new(&["stopped"], &["running"], INSTANCE_TIMEOUT),
            ),
            (
                InstanceAttribute::ServerStatus,
                Transition::new(&["none", "locked", "installingbooting"], &["ok"], INSTANCE_TIMEOUT),
            ),
        ];

        let mut ready = None;
        for (attribute, transition) in stages {
            let instance = wait_for_instance(
                ctx,
                &self.data.client,
                &self.data.wait,
                id,
                attribute,
                transition,
            )
            .await
            .map_err(|e| wait_failed("instance", id, e))?;
            ready = Some(instance);
        }

        match ready {
            Some(instance) => Ok(instance),
            None => self.fetch(id).await.map_err(|e| {
                Diagnostics::error(format!("Failed to read instance {}", id), e.to_string())
            }),
        }
    }

    async fn wait_resized(&self, ctx: &Context, id: &str) -> Result<Instance, Diagnostics> {
        wait_for_instance(
            ctx,
            &self.data.client,
            &self.data.wait,
            id,
            InstanceAttribute::Status,
            Transition::new(&["pending", "resizing"], &["active"], INSTANCE_TIMEOUT),
        )
        .await
        .map_err(|e| wait_failed("instance", id, e))
    }

    async fn fetch(&self, id: &str) -> Result<Instance, ApiError> {
        self.data.client.instances().get(id).await
    }

    async fn vpc_ids(&self, id: &str) -> Result<Vec<String>, ApiError> {
        let vpcs = self.data.client.instances().list_vpcs(id).await?;
        Ok(vpcs.into_iter().map(|vpc| vpc.id).collect())
    }
}

fn encode_user_data(user_data: &str) -> String {
    STANDARD.encode(user_data.as_bytes())
}

fn has_feature(instance: &Instance, feature: &str) -> bool {
    instance.features.iter().any(|f| f == feature)
}

fn apply_instance(instance: &Instance, state: &mut State) {
    state.set_string("id", &instance.id);
    state.set_string("region", &instance.region);
    state.set_string("plan", &instance.plan);
    state.set_i64("os_id", instance.os_id);
    state.set_i64("app_id", instance.app_id);
    state.set_string("image_id", &instance.image_id);
    state.set_bool("enable_ipv6", !instance.v6_main_ip.is_empty());
    state.set_string(
        "backups",
        enabled_flag(has_feature(instance, "auto_backups")),
    );
    state.set_bool("ddos_protection", has_feature(instance, "ddos_protection"));
    state.set_string("hostname", &instance.hostname);
    state.set_string("label", &instance.label);
    state.set_string_list("tags", instance.tags.iter().cloned());
    state.set_string("firewall_group_id", &instance.firewall_group_id);
    state.set_string("os", &instance.os);
    state.set_i64("ram", instance.ram);
    state.set_i64("disk", instance.disk);
    state.set_string("main_ip", &instance.main_ip);
    state.set_i64("vcpu_count", instance.vcpu_count);
    state.set_string("date_created", &instance.date_created);
    state.set_string("status", &instance.status);
    state.set_string("power_status", &instance.power_status);
    state.set_string("server_status", &instance.server_status);
    state.set_i64("allowed_bandwidth", instance.allowed_bandwidth);
    state.set_string("netmask_v4", &instance.netmask_v4);
    state.set_string("gateway_v4", &instance.gateway_v4);
    state.set_string("v6_network", &instance.v6_network);
    state.set_string("v6_main_ip", &instance.v6_main_ip);
    state.set_i64("v6_network_size", instance.v6_network_size);
    state.set_string("internal_ip", &instance.internal_ip);
    state.set_string("kvm", &instance.kvm);
    state.set_string_list("features", instance.features.iter().cloned());
}

fn create_request(state: &State) -> InstanceCreateRequest {
    InstanceCreateRequest {
        region: state.get_string("region").unwrap_or_default(),
        plan: state.get_string("plan").unwrap_or_default(),
        os_id: state.get_i64("os_id"),
        iso_id: state.get_non_empty_string("iso_id"),
        snapshot_id: state.get_non_empty_string("snapshot_id"),
        app_id: state.get_i64("app_id"),
        image_id: state.get_non_empty_string("image_id"),
        script_id: state.get_non_empty_string("script_id"),
        enable_ipv6: state.get_bool("enable_ipv6"),
        disable_public_ipv4: state.get_bool("disable_public_ipv4"),
        attach_vpc: state.get_string_list("vpc_ids"),
        sshkey_id: state.get_string_list("ssh_key_ids"),
        backups: state.get_string("backups"),
        ddos_protection: state.get_bool("ddos_protection"),
        activation_email: state.get_bool("activation_email"),
        hostname: state.get_non_empty_string("hostname"),
        label: state.get_string("label"),
        tags: state.get_string_list("tags"),
        user_data: state
            .get_non_empty_string("user_data")
            .map(|data| encode_user_data(&data)),
        firewall_group_id: state.get_non_empty_string("firewall_group_id"),
        reserved_ipv4: state.get_non_empty_string("reserved_ip_id"),
    }
}

fn update_request(planned: &State, current: &State) -> InstanceUpdateRequest {
    let differs = |name: &str| planned.get(name).is_some() && planned.get(name) != current.get(name);

    let (attach_vpc, detach_vpc) = if planned.get("vpc_ids").is_some() {
        let target = planned.get_string_list("vpc_ids");
        let existing = current.get_string_list("vpc_ids");
        (
            target.iter().filter(|id| !existing.contains(id)).cloned().collect(),
            existing.iter().filter(|id| !target.contains(id)).cloned().collect(),
        )
    } else {
        (Vec::new(), Vec::new())
    };

    InstanceUpdateRequest {
        label: planned.get_string("label").filter(|_| differs("label")),
        tags: differs("tags").then(|| planned.get_string_list("tags")),
        plan: planned.get_string("plan").filter(|_| differs("plan")),
        firewall_group_id: planned
            .get_string("firewall_group_id")
            .filter(|_| differs("firewall_group_id")),
        enable_ipv6: planned.get_bool("enable_ipv6").filter(|_| differs("enable_ipv6")),
        backups: planned.get_string("backups").filter(|_| differs("backups")),
        ddos_protection: planned
            .get_bool("ddos_protection")
            .filter(|_| differs("ddos_protection")),
        user_data: planned
            .get_string("user_data")
            .filter(|_| differs("user_data"))
            .map(|data| encode_user_data(&data)),
        attach_vpc,
        detach_vpc,
    }
}

fn is_empty_update(request: &InstanceUpdateRequest) -> bool {
    request.label.is_none()
        && request.tags.is_none()
        && request.plan.is_none()
        && request.firewall_group_id.is_none()
        && request.enable_ipv6.is_none()
        && request.backups.is_none()
        && request.ddos_protection.is_none()
        && request.user_data.is_none()
        && request.attach_vpc.is_empty()
        && request.detach_vpc.is_empty()
}

#[async_trait]
impl ResourceV2 for InstanceResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = create_request(&state);

        let created = match self.data.client.instances().create(&body).await {
            Ok(instance) => instance,
            Err(e) => {
                return CreateResponse {
                    state,
                    diagnostics: Diagnostics::error("Failed to create instance", e.to_string()),
                }
            }
        };
        tracing::info!("Created instance {} in {}", created.id, created.region);
        state.set_string("id", &created.id);
        state.set_optional_string("default_password", created.default_password.clone());

        let instance = match self.wait_ready(&request.context, &created.id).await {
            Ok(instance) => instance,
            Err(diagnostics) => return CreateResponse { state, diagnostics },
        };
        apply_instance(&instance, &mut state);

        let diagnostics = match self.vpc_ids(&instance.id).await {
            Ok(ids) => {
                state.set_string_list("vpc_ids", ids);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error(
                format!("Failed to list VPCs of instance {}", instance.id),
                e.to_string(),
            ),
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

        let refreshed = match self.fetch(&id).await {
            Ok(instance) => self.vpc_ids(&id).await.map(|ids| (instance, ids)),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok((instance, ids)) => {
                apply_instance(&instance, &mut state);
                state.set_string_list("vpc_ids", ids);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("instance", &id, e, state),
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

        let body = update_request(&planned, &current);
        if !is_empty_update(&body) {
            tracing::debug!("Updating instance {}", id);
            if let Err(e) = self.data.client.instances().update(&id, &body).await {
                return UpdateResponse {
                    state: current,
                    diagnostics: Diagnostics::error(
                        format!("Failed to update instance {}", id),
                        e.to_string(),
                    ),
                };
            }
        }

        let instance = if body.plan.is_some() {
            tracing::info!("Resizing instance {}", id);
            self.wait_resized(&request.context, &id).await
        } else {
            self.fetch(&id).await.map_err(|e| {
                Diagnostics::error(format!("Failed to read instance {}", id), e.to_string())
            })
        };
        let refreshed = match instance {
            Ok(instance) => match self.vpc_ids(&id).await {
                Ok(ids) => Ok((instance, ids)),
                Err(e) => Err(Diagnostics::error(
                    format!("Failed to list VPCs of instance {}", id),
                    e.to_string(),
                )),
            },
            Err(diagnostics) => Err(diagnostics),
        };

        match refreshed {
            Ok((instance, ids)) => {
                let mut state = planned;
                apply_instance(&instance, &mut state);
                state.set_string_list("vpc_ids", ids);
                state.copy_from(&current, "default_password");
                UpdateResponse {
                    state,
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(diagnostics) => UpdateResponse {
                state: current,
                diagnostics,
            },
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match state_id(&request.current_state) {
            Ok(id) => {
                let result = self.data.client.instances().delete(&id).await;
                delete_diagnostics("instance", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}
