//! `vultr_kubernetes`
//!
//! The cluster's default node pool is described by the `node_pool_*`
//! attributes alongside the cluster's own. Scaling the pool is done in
//! place; every other pool setting forces a new cluster.

use super::{changed, delete_diagnostics, id_attribute, read_failed, state_id, wait_failed};
use crate::api::kubernetes::{Cluster, ClusterCreateRequest, ClusterUpdateRequest, NodePoolRequest};
use crate::api::ApiError;
use crate::wait::{wait_for_kubernetes, Transition, KUBERNETES_TIMEOUT};
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
use tfplug::validator::NumberRangeValidator;
use tfplug::{AttributeBuilder, AttributeType, Diagnostics, ResourceV2, SchemaBuilder};

pub struct KubernetesResource {
    data: VultrProviderData,
}

impl KubernetesResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A Vultr Kubernetes Engine cluster with its default node pool")
            .attribute(id_attribute())
            .attribute(AttributeBuilder::string("label").required())
            .attribute(
                AttributeBuilder::string("region")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("version")
                    .required()
                    .requires_replace()
                    .description("Kubernetes version such as v1.28.2+1"),
            )
            .attribute(
                AttributeBuilder::string("node_pool_label")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("node_pool_plan")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::number("node_quantity")
                    .required()
                    .validator(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    }),
            )
            .attribute(AttributeBuilder::string("node_pool_tag").optional().computed())
            .attribute(
                AttributeBuilder::bool("auto_scaler")
                    .optional()
                    .computed()
                    .default(StaticDefault::bool(false)),
            )
            .attribute(AttributeBuilder::number("min_nodes").optional().computed())
            .attribute(AttributeBuilder::number("max_nodes").optional().computed())
            .attribute(AttributeBuilder::string("node_pool_id").computed())
            .attribute(AttributeBuilder::string("node_pool_status").computed())
            .attribute(AttributeBuilder::list("node_ids", AttributeType::String).computed())
            .attribute(AttributeBuilder::string("date_created").computed())
            .attribute(AttributeBuilder::string("cluster_subnet").computed())
            .attribute(AttributeBuilder::string("service_subnet").computed())
            .attribute(AttributeBuilder::string("ip").computed())
            .attribute(AttributeBuilder::string("endpoint").computed())
            .attribute(AttributeBuilder::string("status").computed())
            .attribute(
                AttributeBuilder::string("kube_config")
                    .computed()
                    .sensitive()
                    .description("Decoded kubeconfig of the cluster admin"),
            )
            .build()
    }

    async fn wait_active(&self, ctx: &Context, id: &str) -> Result<Cluster, Diagnostics> {
        wait_for_kubernetes(
            ctx,
            &self.data.client,
            &self.data.wait,
            id,
            Transition::new(&["pending"], &["active"], KUBERNETES_TIMEOUT),
        )
        .await
        .map_err(|e| wait_failed("kubernetes cluster", id, e))
    }
}

fn node_pool_request(state: &State) -> NodePoolRequest {
    NodePoolRequest {
        node_quantity: state.get_i64("node_quantity"),
        label: state.get_string("node_pool_label"),
        plan: state.get_string("node_pool_plan"),
        tag: state.get_non_empty_string("node_pool_tag"),
        auto_scaler: state.get_bool("auto_scaler"),
        min_nodes: state.get_i64("min_nodes"),
        max_nodes: state.get_i64("max_nodes"),
    }
}

fn apply_cluster(cluster: &Cluster, state: &mut State) {
    state.set_string("id", &cluster.id);
    state.set_string("label", &cluster.label);
    state.set_string("region", &cluster.region);
    state.set_string("version", &cluster.version);
    state.set_string("date_created", &cluster.date_created);
    state.set_string("cluster_subnet", &cluster.cluster_subnet);
    state.set_string("service_subnet", &cluster.service_subnet);
    state.set_string("ip", &cluster.ip);
    state.set_string("endpoint", &cluster.endpoint);
    state.set_string("status", &cluster.status);

    let Some(pool) = cluster.node_pools.first() else {
        tracing::warn!("Kubernetes cluster {} has no node pools", cluster.id);
        return;
    };
    state.set_string("node_pool_id", &pool.id);
    state.set_string("node_pool_label", &pool.label);
    state.set_string("node_pool_plan", &pool.plan);
    state.set_string("node_pool_status", &pool.status);
    state.set_string("node_pool_tag", &pool.tag);
    state.set_i64("node_quantity", pool.node_quantity);
    state.set_bool("auto_scaler", pool.auto_scaler);
    state.set_i64("min_nodes", pool.min_nodes);
    state.set_i64("max_nodes", pool.max_nodes);
    state.set_string_list("node_ids", pool.nodes.iter().map(|node| node.id.clone()));
}

#[async_trait]
impl ResourceV2 for KubernetesResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = ClusterCreateRequest {
            label: state.get_string("label").unwrap_or_default(),
            region: state.get_string("region").unwrap_or_default(),
            version: state.get_string("version").unwrap_or_default(),
            node_pools: vec![node_pool_request(&state)],
        };

        let api = self.data.client.kubernetes();
        let cluster = match api.create(&body).await {
            Ok(cluster) => cluster,
            Err(e) => {
                return CreateResponse {
                    state,
                    diagnostics: Diagnostics::error(
                        "Failed to create kubernetes cluster",
                        e.to_string(),
                    ),
                }
            }
        };
        tracing::info!("Created kubernetes cluster {} in {}", cluster.id, cluster.region);
        state.set_string("id", &cluster.id);

        let cluster = match self.wait_active(&request.context, &cluster.id).await {
            Ok(cluster) => cluster,
            Err(diagnostics) => return CreateResponse { state, diagnostics },
        };
        apply_cluster(&cluster, &mut state);

        let diagnostics = match api.kubeconfig(&cluster.id).await {
            Ok(config) => {
                state.set_string("kube_config", config);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error(
                format!("Failed to fetch kubeconfig of cluster {}", cluster.id),
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

        let api = self.data.client.kubernetes();
        let refreshed = match api.get(&id).await {
            Ok(cluster) => api.kubeconfig(&id).await.map(|config| (cluster, config)),
            Err(e) => Err(e),
        };

        match refreshed {
            Ok((cluster, config)) => {
                apply_cluster(&cluster, &mut state);
                state.set_string("kube_config", config);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("kubernetes cluster", &id, e, state),
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

        let api = self.data.client.kubernetes();
        let number = |name: &str| changed(planned.get_i64(name), current.get_i64(name));
        let pool = NodePoolRequest {
            node_quantity: number("node_quantity"),
            label: None,
            plan: None,
            tag: changed(planned.get_string("node_pool_tag"), current.get_string("node_pool_tag")),
            auto_scaler: changed(planned.get_bool("auto_scaler"), current.get_bool("auto_scaler")),
            min_nodes: number("min_nodes"),
            max_nodes: number("max_nodes"),
        };
        let scaled = pool.node_quantity.is_some()
            || pool.tag.is_some()
            || pool.auto_scaler.is_some()
            || pool.min_nodes.is_some()
            || pool.max_nodes.is_some();

        let result: Result<(), ApiError> = async {
            if let Some(label) = changed(planned.get_string("label"), current.get_string("label")) {
                api.update(&id, &ClusterUpdateRequest { label }).await?;
            }
            if scaled {
                let pool_id = current.get_string("node_pool_id").unwrap_or_default();
                let updated = api.update_node_pool(&id, &pool_id, &pool).await?;
                tracing::info!(
                    "Node pool {} of cluster {} now has {} nodes",
                    updated.id,
                    id,
                    updated.node_quantity
                );
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            return UpdateResponse {
                state: current,
                diagnostics: Diagnostics::error(
                    format!("Failed to update kubernetes cluster {}", id),
                    e.to_string(),
                ),
            };
        }

        let cluster = if scaled {
            self.wait_active(&request.context, &id).await
        } else {
            api.get(&id).await.map_err(|e| {
                Diagnostics::error(
                    format!("Failed to read kubernetes cluster {}", id),
                    e.to_string(),
                )
            })
        };

        match cluster {
            Ok(cluster) => {
                let mut state = planned;
                apply_cluster(&cluster, &mut state);
                state.copy_from(&current, "kube_config");
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
                let result = self.data.client.kubernetes().delete(&id).await;
                delete_diagnostics("kubernetes cluster", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}
