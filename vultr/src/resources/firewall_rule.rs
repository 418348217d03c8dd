//! `vultr_firewall_rule`
//!
//! Rules cannot be edited through the API, so every attribute forces a new
//! rule. Imported as `group_id,rule_id`.

use super::{delete_diagnostics, id_attribute, read_failed, split_import_id, state_id};
use crate::api::firewalls::{FirewallRule, FirewallRuleRequest};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportRequest, ImportResponse,
    ReadRequest, ReadResponse, ResourceSchemaResponse, SchemaRequest, UpdateRequest,
    UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::OneOfValidator;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct FirewallRuleResource {
    data: VultrProviderData,
}

impl FirewallRuleResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A single inbound rule of a firewall group")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("firewall_group_id")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("ip_type")
                    .required()
                    .requires_replace()
                    .validator(OneOfValidator::new(["v4", "v6"])),
            )
            .attribute(
                AttributeBuilder::string("protocol")
                    .required()
                    .requires_replace()
                    .validator(OneOfValidator::new(["icmp", "tcp", "udp", "gre", "esp", "ah"])),
            )
            .attribute(
                AttributeBuilder::string("subnet")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::number("subnet_size")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("port")
                    .optional()
                    .requires_replace()
                    .description("Single port or range such as 8000:9000"),
            )
            .attribute(
                AttributeBuilder::string("source")
                    .optional()
                    .requires_replace()
                    .description("Empty or `cloudflare`"),
            )
            .attribute(
                AttributeBuilder::string("notes")
                    .optional()
                    .requires_replace(),
            )
            .build()
    }
}

fn apply_rule(rule: &FirewallRule, state: &mut State) {
    state.set_string("id", rule.id.to_string());
    state.set_string("ip_type", &rule.ip_type);
    state.set_string("protocol", rule.protocol.to_lowercase());
    state.set_string("subnet", &rule.subnet);
    state.set_i64("subnet_size", rule.subnet_size);
    state.set_optional_string("port", Some(&rule.port).filter(|p| !p.is_empty()));
    state.set_optional_string("source", Some(&rule.source).filter(|s| !s.is_empty()));
    state.set_optional_string("notes", Some(&rule.notes).filter(|n| !n.is_empty()));
}

fn rule_ids(state: &State) -> Result<(String, String), Diagnostics> {
    let id = state_id(state)?;
    let group_id = state.get_non_empty_string("firewall_group_id").ok_or_else(|| {
        Diagnostics::error("Missing firewall_group_id", "The rule state has no group")
    })?;
    Ok((group_id, id))
}

#[async_trait]
impl ResourceV2 for FirewallRuleResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let group_id = state.get_string("firewall_group_id").unwrap_or_default();
        let body = FirewallRuleRequest {
            ip_type: state.get_string("ip_type").unwrap_or_default(),
            protocol: state.get_string("protocol").unwrap_or_default(),
            subnet: state.get_string("subnet").unwrap_or_default(),
            subnet_size: state.get_i64("subnet_size").unwrap_or_default(),
            port: state.get_non_empty_string("port"),
            source: state.get_non_empty_string("source"),
            notes: state.get_non_empty_string("notes"),
        };

        let diagnostics = match self.data.client.firewalls().create_rule(&group_id, &body).await {
            Ok(rule) => {
                tracing::info!("Created firewall rule {} in group {}", rule.id, group_id);
                apply_rule(&rule, &mut state);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error(
                format!("Failed to create firewall rule in group {}", group_id),
                e.to_string(),
            ),
        };

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut state = request.current_state;
        let (group_id, id) = match rule_ids(&state) {
            Ok(ids) => ids,
            Err(diagnostics) => {
                return ReadResponse {
                    state: Some(state),
                    diagnostics,
                }
            }
        };

        match self.data.client.firewalls().get_rule(&group_id, &id).await {
            Ok(rule) => {
                apply_rule(&rule, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("firewall rule", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        // every attribute requires replacement, so only the ID carries over
        let mut state = request.planned_state;
        state.copy_from(&request.current_state, "id");
        UpdateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match rule_ids(&request.current_state) {
            Ok((group_id, id)) => {
                let result = self.data.client.firewalls().delete_rule(&group_id, &id).await;
                delete_diagnostics("firewall rule", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportRequest) -> ImportResponse {
        match split_import_id(&request.id, "group_id,rule_id") {
            Ok((group_id, id)) => {
                let mut state = State::new();
                state.set_string("firewall_group_id", group_id);
                state.set_string("id", id);
                ImportResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(diagnostics) => ImportResponse {
                state: None,
                diagnostics,
            },
        }
    }
}
