//! Kubernetes (VKE) clusters and node pools

use super::common::null_as_default;
use super::{ApiError, Client};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub status: String,
    pub date_created: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodePool {
    pub id: String,
    pub date_created: String,
    pub label: String,
    pub plan: String,
    pub status: String,
    pub node_quantity: i64,
    pub tag: String,
    pub auto_scaler: bool,
    pub min_nodes: i64,
    pub max_nodes: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub id: String,
    pub label: String,
    pub date_created: String,
    pub cluster_subnet: String,
    pub service_subnet: String,
    pub ip: String,
    pub endpoint: String,
    pub version: String,
    pub region: String,
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub node_pools: Vec<NodePool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NodePoolRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_scaler: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_nodes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nodes: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterCreateRequest {
    pub label: String,
    pub region: String,
    pub version: String,
    pub node_pools: Vec<NodePoolRequest>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClusterUpdateRequest {
    pub label: String,
}

#[derive(Debug, Deserialize)]
struct ClusterWrapper {
    vke_cluster: Cluster,
}

#[derive(Debug, Deserialize)]
struct NodePoolWrapper {
    node_pool: NodePool,
}

#[derive(Debug, Deserialize)]
struct KubeConfigWrapper {
    kube_config: String,
}

pub struct KubernetesApi<'a> {
    client: &'a Client,
}

impl<'a> KubernetesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /kubernetes/clusters/{id}
    pub async fn get(&self, id: &str) -> Result<Cluster, ApiError> {
        let wrapper: ClusterWrapper = self
            .client
            .get(&format!("/kubernetes/clusters/{}", id))
            .await?;
        Ok(wrapper.vke_cluster)
    }

    /// POST /kubernetes/clusters
    pub async fn create(&self, request: &ClusterCreateRequest) -> Result<Cluster, ApiError> {
        let wrapper: ClusterWrapper = self.client.post("/kubernetes/clusters", request).await?;
        Ok(wrapper.vke_cluster)
    }

    /// PUT /kubernetes/clusters/{id}
    pub async fn update(&self, id: &str, request: &ClusterUpdateRequest) -> Result<(), ApiError> {
        self.client
            .put(&format!("/kubernetes/clusters/{}", id), request)
            .await
    }

    /// DELETE /kubernetes/clusters/{id}/delete-with-linked-resources
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!(
                "/kubernetes/clusters/{}/delete-with-linked-resources",
                id
            ))
            .await
    }

    /// PATCH /kubernetes/clusters/{id}/node-pools/{pool_id}
    pub async fn update_node_pool(
        &self,
        id: &str,
        pool_id: &str,
        request: &NodePoolRequest,
    ) -> Result<NodePool, ApiError> {
        let wrapper: NodePoolWrapper = self
            .client
            .patch(
                &format!("/kubernetes/clusters/{}/node-pools/{}", id, pool_id),
                request,
            )
            .await?;
        Ok(wrapper.node_pool)
    }

    /// GET /kubernetes/clusters/{id}/config, decoded from base64
    pub async fn kubeconfig(&self, id: &str) -> Result<String, ApiError> {
        let wrapper: KubeConfigWrapper = self
            .client
            .get(&format!("/kubernetes/clusters/{}/config", id))
            .await?;
        let bytes = STANDARD
            .decode(wrapper.kube_config.as_bytes())
            .map_err(|e| ApiError::ParseError(format!("kube_config is not base64: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| ApiError::ParseError(format!("kube_config is not UTF-8: {}", e)))
    }
}
