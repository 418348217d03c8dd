//! Managed databases

use super::common::null_as_default;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Database {
    pub id: String,
    pub date_created: String,
    pub plan: String,
    pub plan_disk: i64,
    pub plan_ram: i64,
    pub plan_vcpus: i64,
    pub plan_replicas: i64,
    pub region: String,
    pub database_engine: String,
    pub database_engine_version: String,
    pub vpc_id: String,
    pub status: String,
    pub label: String,
    pub tag: String,
    pub dbname: String,
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: String,
    pub maintenance_dow: String,
    pub maintenance_time: String,
    pub latest_backup: String,
    #[serde(deserialize_with = "null_as_default")]
    pub trusted_ips: Vec<String>,
    pub cluster_time_zone: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseCreateRequest {
    pub database_engine: String,
    pub database_engine_version: String,
    pub region: String,
    pub plan: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_dow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_time: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trusted_ips: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_dow: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trusted_ips: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct DatabaseWrapper {
    database: Database,
}

pub struct DatabasesApi<'a> {
    client: &'a Client,
}

impl<'a> DatabasesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /databases/{id}
    pub async fn get(&self, id: &str) -> Result<Database, ApiError> {
        let wrapper: DatabaseWrapper = self.client.get(&format!("/databases/{}", id)).await?;
        Ok(wrapper.database)
    }

    /// POST /databases
    pub async fn create(&self, request: &DatabaseCreateRequest) -> Result<Database, ApiError> {
        let wrapper: DatabaseWrapper = self.client.post("/databases", request).await?;
        Ok(wrapper.database)
    }

    /// PUT /databases/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &DatabaseUpdateRequest,
    ) -> Result<Database, ApiError> {
        let wrapper: DatabaseWrapper = self
            .client
            .put(&format!("/databases/{}", id), request)
            .await?;
        Ok(wrapper.database)
    }

    /// DELETE /databases/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/databases/{}", id)).await
    }
}
