//! Block storage volumes

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockStorage {
    pub id: String,
    #[serde(default)]
    pub cost: f64,
    pub status: String,
    pub size_gb: i64,
    pub region: String,
    #[serde(default)]
    pub attached_to_instance: String,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub mount_id: String,
    #[serde(default)]
    pub block_type: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockStorageCreateRequest {
    pub region: String,
    pub size_gb: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BlockStorageUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
struct AttachRequest<'a> {
    instance_id: &'a str,
    live: bool,
}

#[derive(Debug, Clone, Serialize)]
struct DetachRequest {
    live: bool,
}

#[derive(Debug, Deserialize)]
struct BlockWrapper {
    block: BlockStorage,
}

pub struct BlocksApi<'a> {
    client: &'a Client,
}

impl<'a> BlocksApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /blocks/{id}
    pub async fn get(&self, id: &str) -> Result<BlockStorage, ApiError> {
        let wrapper: BlockWrapper = self.client.get(&format!("/blocks/{}", id)).await?;
        Ok(wrapper.block)
    }

    /// POST /blocks
    pub async fn create(&self, request: &BlockStorageCreateRequest) -> Result<BlockStorage, ApiError> {
        let wrapper: BlockWrapper = self.client.post("/blocks", request).await?;
        Ok(wrapper.block)
    }

    /// PATCH /blocks/{id}
    pub async fn update(&self, id: &str, request: &BlockStorageUpdateRequest) -> Result<(), ApiError> {
        self.client.patch(&format!("/blocks/{}", id), request).await
    }

    /// DELETE /blocks/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/blocks/{}", id)).await
    }

    /// POST /blocks/{id}/attach; `live` skips the instance restart
    pub async fn attach(&self, id: &str, instance_id: &str, live: bool) -> Result<(), ApiError> {
        self.client
            .post(
                &format!("/blocks/{}/attach", id),
                &AttachRequest { instance_id, live },
            )
            .await
    }

    /// POST /blocks/{id}/detach
    pub async fn detach(&self, id: &str, live: bool) -> Result<(), ApiError> {
        self.client
            .post(&format!("/blocks/{}/detach", id), &DetachRequest { live })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use crate::api::test_helpers::{create_test_client, json_response};
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn attach_and_detach_send_live_flag() {
        let mut server = Server::new_async().await;
        let attach = server
            .mock("POST", "/blocks/blk-1/attach")
            .match_body(Matcher::Json(serde_json::json!({
                "instance_id": "inst-1",
                "live": true
            })))
            .with_status(204)
            .create_async()
            .await;
        let detach = server
            .mock("POST", "/blocks/blk-1/detach")
            .match_body(Matcher::Json(serde_json::json!({"live": false})))
            .with_status(204)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.blocks().attach("blk-1", "inst-1", true).await.unwrap();
        client.blocks().detach("blk-1", false).await.unwrap();

        attach.assert_async().await;
        detach.assert_async().await;
    }

    #[tokio::test]
    async fn get_block() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/blocks/blk-1",
            200,
            r#"{"block": {"id": "blk-1", "cost": 1, "status": "active", "size_gb": 10,
                "region": "ewr", "attached_to_instance": "", "date_created": "", "label": "data",
                "mount_id": "ewr-2f5d7a314fe44b", "block_type": "high_perf"}}"#,
        )
        .create_async()
        .await;

        let client = create_test_client(&server.url());
        let block = client.blocks().get("blk-1").await.unwrap();
        assert_eq!(block.size_gb, 10);
        assert_eq!(block.block_type, "high_perf");
    }
}
