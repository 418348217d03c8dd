//! Regions (data center locations)

use super::common::null_as_default;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: String,
    pub city: String,
    pub country: String,
    pub continent: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<String>,
}

pub struct RegionsApi<'a> {
    client: &'a Client,
}

impl<'a> RegionsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /regions, every page
    pub async fn list(&self) -> Result<Vec<Region>, ApiError> {
        self.client.list_all("/regions", "regions").await
    }
}
