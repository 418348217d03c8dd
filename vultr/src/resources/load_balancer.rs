//! `vultr_load_balancer`
//!
//! Forwarding rules and the health check live in nested blocks. A refresh
//! only writes the health check settings the configuration already holds, so
//! the API's defaults for the rest never show up as drift.

use super::{delete_diagnostics, id_attribute, read_failed, state_id, wait_failed};
use crate::api::load_balancers::{ForwardingRule, HealthCheck, LoadBalancer, LoadBalancerRequest};
use crate::api::ApiError;
use crate::wait::{wait_for_load_balancer, Transition, LOAD_BALANCER_TIMEOUT};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::defaults::StaticDefault;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::{NumberRangeValidator, OneOfValidator};
use tfplug::{AttributeBuilder, AttributeType, BlockBuilder, Diagnostics, ResourceV2, SchemaBuilder};

const PROTOCOLS: [&str; 3] = ["http", "https", "tcp"];

pub struct LoadBalancerResource {
    data: VultrProviderData,
}

impl LoadBalancerResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        let port = || NumberRangeValidator {
            min: Some(1.0),
            max: Some(65535.0),
        };

        SchemaBuilder::new()
            .version(0)
            .description("A managed layer 4/7 load balancer")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("region")
                    .required()
                    .requires_replace(),
            )
            .attribute(AttributeBuilder::string("label").optional().computed())
            .attribute(
                AttributeBuilder::string("balancing_algorithm")
                    .optional()
                    .computed()
                    .default(StaticDefault::string("roundrobin"))
                    .validator(OneOfValidator::new(["roundrobin", "leastconn"])),
            )
            .attribute(
                AttributeBuilder::bool("ssl_redirect")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false)),
            )
            .attribute(
                AttributeBuilder::bool("proxy_protocol")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false)),
            )
            .attribute(
                AttributeBuilder::list("attached_instances", AttributeType::String)
                    .optional()
                    .computed()
                    .description("Instances receiving traffic"),
            )
            .attribute(AttributeBuilder::string("vpc").optional().computed())
            .attribute(AttributeBuilder::string("status").computed())
            .attribute(AttributeBuilder::string("ipv4").computed())
            .attribute(AttributeBuilder::string("ipv6").computed())
            .attribute(AttributeBuilder::bool("has_ssl").computed())
            .attribute(AttributeBuilder::string("date_created").computed())
            .block(
                BlockBuilder::list("forwarding_rules")
                    .min_items(1)
                    .attribute(
                        AttributeBuilder::string("frontend_protocol")
                            .required()
                            .validator(OneOfValidator::new(PROTOCOLS)),
                    )
                    .attribute(AttributeBuilder::number("frontend_port").required().validator(port()))
                    .attribute(
                        AttributeBuilder::string("backend_protocol")
                            .required()
                            .validator(OneOfValidator::new(PROTOCOLS)),
                    )
                    .attribute(AttributeBuilder::number("backend_port").required().validator(port())),
            )
            .block(
                BlockBuilder::list("health_check")
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::string("protocol")
                            .required()
                            .validator(OneOfValidator::new(PROTOCOLS)),
                    )
                    .attribute(AttributeBuilder::number("port").required().validator(port()))
                    .attribute(AttributeBuilder::string("path").optional())
                    .attribute(AttributeBuilder::number("check_interval").optional())
                    .attribute(AttributeBuilder::number("response_timeout").optional())
                    .attribute(AttributeBuilder::number("unhealthy_threshold").optional())
                    .attribute(AttributeBuilder::number("healthy_threshold").optional()),
            )
            .build()
    }

    async fn wait_active(&self, ctx: &Context, id: &str) -> Result<LoadBalancer, Diagnostics> {
        wait_for_load_balancer(
            ctx,
            &self.data.client,
            &self.data.wait,
            id,
            Transition::new(&["pending"], &["active"], LOAD_BALANCER_TIMEOUT),
        )
        .await
        .map_err(|e| wait_failed("load balancer", id, e))
    }
}

fn forwarding_rules(state: &State) -> Vec<ForwardingRule> {
    state
        .get_blocks("forwarding_rules")
        .iter()
        .map(|rule| ForwardingRule {
            id: String::new(),
            frontend_protocol: rule.get_string("frontend_protocol").unwrap_or_default(),
            frontend_port: rule.get_i64("frontend_port").unwrap_or_default(),
            backend_protocol: rule.get_string("backend_protocol").unwrap_or_default(),
            backend_port: rule.get_i64("backend_port").unwrap_or_default(),
        })
        .collect()
}

fn health_check(state: &State) -> Option<HealthCheck> {
    state.get_block("health_check").map(|check| HealthCheck {
        protocol: check.get_string("protocol").unwrap_or_default(),
        port: check.get_i64("port").unwrap_or_default(),
        path: check.get_string("path").unwrap_or_else(|| "/".to_string()),
        check_interval: check.get_i64("check_interval").unwrap_or(15),
        response_timeout: check.get_i64("response_timeout").unwrap_or(5),
        unhealthy_threshold: check.get_i64("unhealthy_threshold").unwrap_or(5),
        healthy_threshold: check.get_i64("healthy_threshold").unwrap_or(5),
    })
}

/// Rules without their API IDs, comparable with configured rules
fn rules_without_ids(rules: &[ForwardingRule]) -> Vec<ForwardingRule> {
    rules
        .iter()
        .map(|rule| ForwardingRule {
            id: String::new(),
            ..rule.clone()
        })
        .collect()
}

fn apply_load_balancer(lb: &LoadBalancer, state: &mut State) {
    state.set_string("id", &lb.id);
    state.set_string("region", &lb.region);
    state.set_string("label", &lb.label);
    state.set_string("balancing_algorithm", &lb.generic_info.balancing_algorithm);
    state.set_bool("ssl_redirect", lb.generic_info.ssl_redirect);
    state.set_bool("proxy_protocol", lb.generic_info.proxy_protocol);
    state.set_string_list("attached_instances", lb.instances.iter().cloned());
    state.set_string("vpc", &lb.generic_info.vpc);
    state.set_string("status", &lb.status);
    state.set_string("ipv4", &lb.ipv4);
    state.set_string("ipv6", &lb.ipv6);
    state.set_bool("has_ssl", lb.has_ssl);
    state.set_string("date_created", &lb.date_created);
}

/// Refreshes the nested blocks from the API, used by read only
fn apply_blocks(lb: &LoadBalancer, state: &mut State) {
    let rules = lb
        .forwarding_rules
        .iter()
        .map(|rule| {
            let mut block = State::new();
            block.set_string("frontend_protocol", &rule.frontend_protocol);
            block.set_i64("frontend_port", rule.frontend_port);
            block.set_string("backend_protocol", &rule.backend_protocol);
            block.set_i64("backend_port", rule.backend_port);
            block
        })
        .collect();
    state.set_blocks("forwarding_rules", rules);

    let Some(mut block) = state.get_block("health_check") else {
        return;
    };
    let check = &lb.health_check;
    block.set_string("protocol", &check.protocol);
    block.set_i64("port", check.port);
    let optional = [
        ("check_interval", check.check_interval),
        ("response_timeout", check.response_timeout),
        ("unhealthy_threshold", check.unhealthy_threshold),
        ("healthy_threshold", check.healthy_threshold),
    ];
    for (name, value) in optional {
        if block.get(name).is_some() {
            block.set_i64(name, value);
        }
    }
    if block.get("path").is_some() {
        block.set_string("path", &check.path);
    }
    state.set_blocks("health_check", vec![block]);
}

#[async_trait]
impl ResourceV2 for LoadBalancerResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let instances = state.get_string_list("attached_instances");
        let body = LoadBalancerRequest {
            region: state.get_string("region"),
            label: state.get_string("label"),
            balancing_algorithm: state.get_string("balancing_algorithm"),
            ssl_redirect: state.get_bool("ssl_redirect"),
            proxy_protocol: state.get_bool("proxy_protocol"),
            forwarding_rules: Some(forwarding_rules(&state)),
            health_check: health_check(&state),
            instances: Some(instances).filter(|i| !i.is_empty()),
            vpc: state.get_non_empty_string("vpc"),
        };

        let lb = match self.data.client.load_balancers().create(&body).await {
            Ok(lb) => lb,
            Err(e) => {
                return CreateResponse {
                    state,
                    diagnostics: Diagnostics::error("Failed to create load balancer", e.to_string()),
                }
            }
        };
        tracing::info!("Created load balancer {} in {}", lb.id, lb.region);
        state.set_string("id", &lb.id);

        let diagnostics = match self.wait_active(&request.context, &lb.id).await {
            Ok(lb) => {
                apply_load_balancer(&lb, &mut state);
                Diagnostics::new()
            }
            Err(diagnostics) => diagnostics,
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

        match self.data.client.load_balancers().get(&id).await {
            Ok(lb) => {
                apply_load_balancer(&lb, &mut state);
                apply_blocks(&lb, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("load balancer", &id, e, state),
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

        let api = self.data.client.load_balancers();
        let result: Result<(), ApiError> = async {
            let existing = api.get(&id).await?;
            let rules = forwarding_rules(&planned);
            let check = health_check(&planned);
            let instances = planned.get_string_list("attached_instances");
            let generic = &existing.generic_info;

            let body = LoadBalancerRequest {
                region: None,
                label: planned.get_string("label").filter(|l| *l != existing.label),
                balancing_algorithm: planned
                    .get_string("balancing_algorithm")
                    .filter(|a| *a != generic.balancing_algorithm),
                ssl_redirect: planned
                    .get_bool("ssl_redirect")
                    .filter(|r| *r != generic.ssl_redirect),
                proxy_protocol: planned
                    .get_bool("proxy_protocol")
                    .filter(|p| *p != generic.proxy_protocol),
                forwarding_rules: Some(rules)
                    .filter(|r| *r != rules_without_ids(&existing.forwarding_rules)),
                health_check: check.filter(|c| *c != existing.health_check),
                instances: planned
                    .get("attached_instances")
                    .map(|_| instances)
                    .filter(|i| *i != existing.instances),
                vpc: planned
                    .get_string("vpc")
                    .filter(|v| *v != generic.vpc),
            };

            let unchanged = body.label.is_none()
                && body.balancing_algorithm.is_none()
                && body.ssl_redirect.is_none()
                && body.proxy_protocol.is_none()
                && body.forwarding_rules.is_none()
                && body.health_check.is_none()
                && body.instances.is_none()
                && body.vpc.is_none();
            if unchanged {
                return Ok(());
            }
            api.update(&id, &body).await
        }
        .await;

        if let Err(e) = result {
            return UpdateResponse {
                state: current,
                diagnostics: Diagnostics::error(
                    format!("Failed to update load balancer {}", id),
                    e.to_string(),
                ),
            };
        }

        match self.wait_active(&request.context, &id).await {
            Ok(lb) => {
                let mut state = planned;
                apply_load_balancer(&lb, &mut state);
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
                let result = self.data.client.load_balancers().delete(&id).await;
                delete_diagnostics("load balancer", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}
