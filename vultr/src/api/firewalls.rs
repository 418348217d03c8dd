//! Firewall groups and their rules

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallGroup {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub date_modified: String,
    #[serde(default)]
    pub instance_count: i64,
    #[serde(default)]
    pub rule_count: i64,
    #[serde(default)]
    pub max_rule_count: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FirewallGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirewallRule {
    pub id: i64,
    pub ip_type: String,
    #[serde(default)]
    pub action: String,
    pub protocol: String,
    #[serde(default)]
    pub port: String,
    pub subnet: String,
    pub subnet_size: i64,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FirewallRuleRequest {
    pub ip_type: String,
    pub protocol: String,
    pub subnet: String,
    pub subnet_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FirewallGroupWrapper {
    firewall_group: FirewallGroup,
}

#[derive(Debug, Deserialize)]
struct FirewallRuleWrapper {
    firewall_rule: FirewallRule,
}

pub struct FirewallsApi<'a> {
    client: &'a Client,
}

impl<'a> FirewallsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /firewalls, every page
    pub async fn list(&self) -> Result<Vec<FirewallGroup>, ApiError> {
        self.client.list_all("/firewalls", "firewall_groups").await
    }

    /// GET /firewalls/{id}
    pub async fn get(&self, id: &str) -> Result<FirewallGroup, ApiError> {
        let wrapper: FirewallGroupWrapper = self.client.get(&format!("/firewalls/{}", id)).await?;
        Ok(wrapper.firewall_group)
    }

    /// POST /firewalls
    pub async fn create(&self, request: &FirewallGroupRequest) -> Result<FirewallGroup, ApiError> {
        let wrapper: FirewallGroupWrapper = self.client.post("/firewalls", request).await?;
        Ok(wrapper.firewall_group)
    }

    /// PUT /firewalls/{id}
    pub async fn update(&self, id: &str, request: &FirewallGroupRequest) -> Result<(), ApiError> {
        self.client.put(&format!("/firewalls/{}", id), request).await
    }

    /// DELETE /firewalls/{id}; fails while instances still use the group
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/firewalls/{}", id)).await
    }

    /// GET /firewalls/{id}/rules/{rule_id}
    pub async fn get_rule(&self, group_id: &str, rule_id: &str) -> Result<FirewallRule, ApiError> {
        let wrapper: FirewallRuleWrapper = self
            .client
            .get(&format!("/firewalls/{}/rules/{}", group_id, rule_id))
            .await?;
        Ok(wrapper.firewall_rule)
    }

    /// POST /firewalls/{id}/rules
    pub async fn create_rule(
        &self,
        group_id: &str,
        request: &FirewallRuleRequest,
    ) -> Result<FirewallRule, ApiError> {
        let wrapper: FirewallRuleWrapper = self
            .client
            .post(&format!("/firewalls/{}/rules", group_id), request)
            .await?;
        Ok(wrapper.firewall_rule)
    }

    /// DELETE /firewalls/{id}/rules/{rule_id}
    pub async fn delete_rule(&self, group_id: &str, rule_id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/firewalls/{}/rules/{}", group_id, rule_id))
            .await
    }
}
