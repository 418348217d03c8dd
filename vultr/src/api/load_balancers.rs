//! Load balancers

use super::common::null_as_default;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardingRule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub frontend_protocol: String,
    pub frontend_port: i64,
    pub backend_protocol: String,
    pub backend_port: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheck {
    pub protocol: String,
    pub port: i64,
    pub path: String,
    pub check_interval: i64,
    pub response_timeout: i64,
    pub unhealthy_threshold: i64,
    pub healthy_threshold: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StickySessions {
    pub cookie_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenericInfo {
    pub balancing_algorithm: String,
    pub ssl_redirect: bool,
    pub proxy_protocol: bool,
    pub sticky_sessions: StickySessions,
    pub vpc: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancer {
    pub id: String,
    pub date_created: String,
    pub region: String,
    pub label: String,
    pub status: String,
    pub ipv4: String,
    pub ipv6: String,
    pub generic_info: GenericInfo,
    pub health_check: HealthCheck,
    pub has_ssl: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub forwarding_rules: Vec<ForwardingRule>,
    #[serde(deserialize_with = "null_as_default")]
    pub instances: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadBalancerRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balancing_algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_redirect: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_protocol: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarding_rules: Option<Vec<ForwardingRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoadBalancerWrapper {
    load_balancer: LoadBalancer,
}

pub struct LoadBalancersApi<'a> {
    client: &'a Client,
}

impl<'a> LoadBalancersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /load-balancers/{id}
    pub async fn get(&self, id: &str) -> Result<LoadBalancer, ApiError> {
        let wrapper: LoadBalancerWrapper =
            self.client.get(&format!("/load-balancers/{}", id)).await?;
        Ok(wrapper.load_balancer)
    }

    /// POST /load-balancers
    pub async fn create(&self, request: &LoadBalancerRequest) -> Result<LoadBalancer, ApiError> {
        let wrapper: LoadBalancerWrapper = self.client.post("/load-balancers", request).await?;
        Ok(wrapper.load_balancer)
    }

    /// PATCH /load-balancers/{id}
    pub async fn update(&self, id: &str, request: &LoadBalancerRequest) -> Result<(), ApiError> {
        self.client
            .patch(&format!("/load-balancers/{}", id), request)
            .await
    }

    /// DELETE /load-balancers/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/load-balancers/{}", id))
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, json_response};
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn get_load_balancer_with_nested_info() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/load-balancers/lb-1",
            200,
            r#"{"load_balancer": {
                "id": "lb-1", "date_created": "", "region": "ewr", "label": "web",
                "status": "active", "ipv4": "192.0.2.1", "ipv6": "",
                "generic_info": {"balancing_algorithm": "roundrobin", "ssl_redirect": false,
                    "proxy_protocol": false, "sticky_sessions": {"cookie_name": ""}, "vpc": ""},
                "health_check": {"protocol": "http", "port": 80, "path": "/", "check_interval": 15,
                    "response_timeout": 5, "unhealthy_threshold": 5, "healthy_threshold": 5},
                "has_ssl": false,
                "forwarding_rules": [{"id": "r1", "frontend_protocol": "http", "frontend_port": 80,
                    "backend_protocol": "http", "backend_port": 8080}],
                "instances": null
            }}"#,
        )
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let lb = client.load_balancers().get("lb-1").await.unwrap();

        assert_eq!(lb.generic_info.balancing_algorithm, "roundrobin");
        assert_eq!(lb.health_check.check_interval, 15);
        assert_eq!(lb.forwarding_rules[0].backend_port, 8080);
        assert!(lb.instances.is_empty());
    }

    #[tokio::test]
    async fn new_forwarding_rules_are_sent_without_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/load-balancers/lb-1")
            .match_body(Matcher::Json(serde_json::json!({
                "forwarding_rules": [{"frontend_protocol": "tcp", "frontend_port": 443,
                    "backend_protocol": "tcp", "backend_port": 443}]
            })))
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client
            .load_balancers()
            .update(
                "lb-1",
                &LoadBalancerRequest {
                    forwarding_rules: Some(vec![ForwardingRule {
                        id: String::new(),
                        frontend_protocol: "tcp".to_string(),
                        frontend_port: 443,
                        backend_protocol: "tcp".to_string(),
                        backend_port: 443,
                    }]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }
}
