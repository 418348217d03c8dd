//! Reserved IP addresses

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservedIp {
    pub id: String,
    pub region: String,
    pub ip_type: String,
    pub subnet: String,
    pub subnet_size: i64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub instance_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReservedIpCreateRequest {
    pub region: String,
    pub ip_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservedIpUpdateRequest {
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
struct AttachRequest<'a> {
    instance_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReservedIpWrapper {
    reserved_ip: ReservedIp,
}

pub struct ReservedIpsApi<'a> {
    client: &'a Client,
}

impl<'a> ReservedIpsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /reserved-ips/{id}
    pub async fn get(&self, id: &str) -> Result<ReservedIp, ApiError> {
        let wrapper: ReservedIpWrapper = self.client.get(&format!("/reserved-ips/{}", id)).await?;
        Ok(wrapper.reserved_ip)
    }

    /// POST /reserved-ips
    pub async fn create(&self, request: &ReservedIpCreateRequest) -> Result<ReservedIp, ApiError> {
        let wrapper: ReservedIpWrapper = self.client.post("/reserved-ips", request).await?;
        Ok(wrapper.reserved_ip)
    }

    /// PATCH /reserved-ips/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &ReservedIpUpdateRequest,
    ) -> Result<ReservedIp, ApiError> {
        let wrapper: ReservedIpWrapper = self
            .client
            .patch(&format!("/reserved-ips/{}", id), request)
            .await?;
        Ok(wrapper.reserved_ip)
    }

    /// DELETE /reserved-ips/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/reserved-ips/{}", id)).await
    }

    /// POST /reserved-ips/{id}/attach
    pub async fn attach(&self, id: &str, instance_id: &str) -> Result<(), ApiError> {
        self.client
            .post(
                &format!("/reserved-ips/{}/attach", id),
                &AttachRequest { instance_id },
            )
            .await
    }

    /// POST /reserved-ips/{id}/detach
    pub async fn detach(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .post(
                &format!("/reserved-ips/{}/detach", id),
                &serde_json::json!({}),
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, json_response};
    use mockito::Server;

    #[tokio::test]
    async fn update_returns_reserved_ip() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "PATCH",
            "/reserved-ips/rip-1",
            202,
            r#"{"reserved_ip": {"id": "rip-1", "region": "ewr", "ip_type": "v4",
                "subnet": "192.0.2.123", "subnet_size": 32, "label": "renamed", "instance_id": ""}}"#,
        )
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let ip = client
            .reserved_ips()
            .update(
                "rip-1",
                &ReservedIpUpdateRequest {
                    label: "renamed".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(ip.label, "renamed");
        assert_eq!(ip.subnet_size, 32);
    }
}
