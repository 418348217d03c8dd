//! Cloud compute instances

use super::common::null_as_default;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Instance {
    pub id: String,
    pub os: String,
    pub ram: i64,
    pub disk: i64,
    pub main_ip: String,
    pub vcpu_count: i64,
    pub region: String,
    pub plan: String,
    pub date_created: String,
    pub status: String,
    pub allowed_bandwidth: i64,
    pub netmask_v4: String,
    pub gateway_v4: String,
    pub power_status: String,
    pub server_status: String,
    pub v6_network: String,
    pub v6_main_ip: String,
    pub v6_network_size: i64,
    pub label: String,
    pub internal_ip: String,
    pub kvm: String,
    pub hostname: String,
    pub os_id: i64,
    pub app_id: i64,
    pub image_id: String,
    pub firewall_group_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub features: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    /// Only returned by the create call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceCreateRequest {
    pub region: String,
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_ipv6: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_public_ipv4: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attach_vpc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sshkey_id: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backups: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddos_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation_email: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Base64 encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reserved_ipv4: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firewall_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_ipv6: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backups: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ddos_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attach_vpc: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub detach_vpc: Vec<String>,
}

/// A VPC attachment as listed by GET /instances/{id}/vpcs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceVpc {
    pub id: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub ip_address: String,
}

#[derive(Debug, Deserialize)]
struct InstanceWrapper {
    instance: Instance,
}

pub struct InstancesApi<'a> {
    client: &'a Client,
}

impl<'a> InstancesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /instances, every page
    pub async fn list(&self) -> Result<Vec<Instance>, ApiError> {
        self.client.list_all("/instances", "instances").await
    }

    /// GET /instances/{id}
    pub async fn get(&self, id: &str) -> Result<Instance, ApiError> {
        let wrapper: InstanceWrapper = self.client.get(&format!("/instances/{}", id)).await?;
        Ok(wrapper.instance)
    }

    /// POST /instances
    pub async fn create(&self, request: &InstanceCreateRequest) -> Result<Instance, ApiError> {
        let wrapper: InstanceWrapper = self.client.post("/instances", request).await?;
        Ok(wrapper.instance)
    }

    /// PATCH /instances/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &InstanceUpdateRequest,
    ) -> Result<Instance, ApiError> {
        let wrapper: InstanceWrapper = self
            .client
            .patch(&format!("/instances/{}", id), request)
            .await?;
        Ok(wrapper.instance)
    }

    /// DELETE /instances/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/instances/{}", id)).await
    }

    /// GET /instances/{id}/vpcs, every page
    pub async fn list_vpcs(&self, id: &str) -> Result<Vec<InstanceVpc>, ApiError> {
        self.client
            .list_all(&format!("/instances/{}/vpcs", id), "vpcs")
            .await
    }
}
