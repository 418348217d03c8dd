//! SSH keys

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshKey {
    pub id: String,
    pub date_created: String,
    pub name: String,
    pub ssh_key: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SshKeyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SshKeyWrapper {
    ssh_key: SshKey,
}

pub struct SshKeysApi<'a> {
    client: &'a Client,
}

impl<'a> SshKeysApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /ssh-keys, every page
    pub async fn list(&self) -> Result<Vec<SshKey>, ApiError> {
        self.client.list_all("/ssh-keys", "ssh_keys").await
    }

    /// GET /ssh-keys/{id}
    pub async fn get(&self, id: &str) -> Result<SshKey, ApiError> {
        let wrapper: SshKeyWrapper = self.client.get(&format!("/ssh-keys/{}", id)).await?;
        Ok(wrapper.ssh_key)
    }

    /// POST /ssh-keys
    pub async fn create(&self, request: &SshKeyRequest) -> Result<SshKey, ApiError> {
        let wrapper: SshKeyWrapper = self.client.post("/ssh-keys", request).await?;
        Ok(wrapper.ssh_key)
    }

    /// PATCH /ssh-keys/{id}
    pub async fn update(&self, id: &str, request: &SshKeyRequest) -> Result<(), ApiError> {
        self.client
            .patch(&format!("/ssh-keys/{}", id), request)
            .await
    }

    /// DELETE /ssh-keys/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/ssh-keys/{}", id)).await
    }
}
