//! Object storage subscriptions and the clusters that host them

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectStorage {
    pub id: String,
    pub date_created: String,
    pub cluster_id: i64,
    pub region: String,
    pub location: String,
    pub label: String,
    pub status: String,
    pub s3_hostname: String,
    pub s3_access_key: String,
    pub s3_secret_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageCluster {
    pub id: i64,
    pub region: String,
    pub hostname: String,
    pub deploy: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectStorageCreateRequest {
    pub cluster_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectStorageUpdateRequest {
    pub label: String,
}

#[derive(Debug, Deserialize)]
struct ObjectStorageWrapper {
    object_storage: ObjectStorage,
}

pub struct ObjectStorageApi<'a> {
    client: &'a Client,
}

impl<'a> ObjectStorageApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /object-storage/{id}
    pub async fn get(&self, id: &str) -> Result<ObjectStorage, ApiError> {
        let wrapper: ObjectStorageWrapper =
            self.client.get(&format!("/object-storage/{}", id)).await?;
        Ok(wrapper.object_storage)
    }

    /// POST /object-storage
    pub async fn create(
        &self,
        request: &ObjectStorageCreateRequest,
    ) -> Result<ObjectStorage, ApiError> {
        let wrapper: ObjectStorageWrapper = self.client.post("/object-storage", request).await?;
        Ok(wrapper.object_storage)
    }

    /// PUT /object-storage/{id}
    pub async fn update(
        &self,
        id: &str,
        request: &ObjectStorageUpdateRequest,
    ) -> Result<(), ApiError> {
        self.client
            .put(&format!("/object-storage/{}", id), request)
            .await
    }

    /// DELETE /object-storage/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/object-storage/{}", id))
            .await
    }

    /// GET /object-storage/clusters, every page
    pub async fn list_clusters(&self) -> Result<Vec<ObjectStorageCluster>, ApiError> {
        self.client
            .list_all("/object-storage/clusters", "clusters")
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use crate::api::test_helpers::{create_test_client, json_response};
    use mockito::Server;

    #[tokio::test]
    async fn list_clusters() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/object-storage/clusters?per_page=100",
            200,
            r#"{"clusters": [{"id": 2, "region": "ewr", "hostname": "ewr1.vultrobjects.com",
                "deploy": "yes"}], "meta": {"total": 1, "links": {"next": "", "prev": ""}}}"#,
        )
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let clusters = client.object_storage().list_clusters().await.unwrap();
        assert_eq!(clusters[0].hostname, "ewr1.vultrobjects.com");
    }
}
