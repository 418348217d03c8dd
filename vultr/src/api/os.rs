//! Operating system images

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Os {
    pub id: i64,
    pub name: String,
    pub arch: String,
    pub family: String,
}

pub struct OsApi<'a> {
    client: &'a Client,
}

impl<'a> OsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /os, every page
    pub async fn list(&self) -> Result<Vec<Os>, ApiError> {
        self.client.list_all("/os", "os").await
    }
}
