//! Private ISO images fetched from a URL

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Iso {
    pub id: String,
    pub date_created: String,
    pub filename: String,
    pub size: i64,
    pub md5sum: String,
    pub sha512sum: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IsoCreateRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct IsoWrapper {
    iso: Iso,
}

pub struct IsoApi<'a> {
    client: &'a Client,
}

impl<'a> IsoApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /iso/{id}
    pub async fn get(&self, id: &str) -> Result<Iso, ApiError> {
        let wrapper: IsoWrapper = self.client.get(&format!("/iso/{}", id)).await?;
        Ok(wrapper.iso)
    }

    /// POST /iso
    pub async fn create(&self, request: &IsoCreateRequest) -> Result<Iso, ApiError> {
        let wrapper: IsoWrapper = self.client.post("/iso", request).await?;
        Ok(wrapper.iso)
    }

    /// DELETE /iso/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&format!("/iso/{}", id)).await
    }
}
