//! Virtual private clouds

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vpc {
    pub id: String,
    pub region: String,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub v4_subnet: String,
    #[serde(default)]
    pub v4_subnet_mask: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VpcCreateRequest {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v4_subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v4_subnet_mask: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VpcUpdateRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct VpcWrapper {
    vpc: Vpc,
}

pub struct VpcsApi<'a> {
    client: &'a Client,
}

impl<'a> VpcsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /vpcs, every page
    pub async fn list(&self) -> Result<Vec<Vpc>, ApiError> {
        self.client.list_all("/vpcs", "vpcs").await
    }

    /// GET /vpcs/{id}
    pub async fn get(&self, id: &str) -> Result<Vpc, ApiError> {
        let wrapper: VpcWrapper = self.client.get(&format!("/vpcs/{}", id)).await?;
        Ok(wrapper.vpc)
    }

    /// POST /vpcs
    pub async fn create(&self, request: &VpcCreateRequest) -> Result<Vpc, ApiError> {
        let wrapper: VpcWrapper = self.client.post("/vpcs", request).await?;
        Ok(wrapper.vpc)
    }

    /// PUT /vpcs/{id}
    pub async fn update(&self, id: &str, request: &VpcUpdateRequest) -> Result<(), ApiError> {
        self.client.put(&format!("/vpcs/{}", id), request).await
    }

    /// DELETE /vpcs/{id}; fails while instances are still attached
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/vpcs/{}", id)).await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, json_response};
    use mockito::Server;

    #[tokio::test]
    async fn create_and_get_vpc() {
        let mut server = Server::new_async().await;
        let body = r#"{"vpc": {"id": "vpc-1", "region": "ewr", "date_created": "2020-10-10T01:56:20+00:00",
            "description": "private", "v4_subnet": "10.99.0.0", "v4_subnet_mask": 24}}"#;
        let _create = json_response(&mut server, "POST", "/vpcs", 201, body)
            .create_async()
            .await;
        let _get = json_response(&mut server, "GET", "/vpcs/vpc-1", 200, body)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let created = client
            .vpcs()
            .create(&VpcCreateRequest {
                region: "ewr".to_string(),
                description: Some("private".to_string()),
                v4_subnet: Some("10.99.0.0".to_string()),
                v4_subnet_mask: Some(24),
            })
            .await
            .unwrap();
        let fetched = client.vpcs().get(&created.id).await.unwrap();

        assert_eq!(fetched.v4_subnet_mask, 24);
        assert_eq!(fetched.description, "private");
    }
}
