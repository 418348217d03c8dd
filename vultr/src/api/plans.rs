//! Compute plans

use super::common::null_as_default;
use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub vcpu_count: i64,
    pub ram: i64,
    pub disk: i64,
    #[serde(default)]
    pub disk_count: i64,
    pub bandwidth: i64,
    pub monthly_cost: f64,
    #[serde(rename = "type")]
    pub plan_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub locations: Vec<String>,
}

pub struct PlansApi<'a> {
    client: &'a Client,
}

impl<'a> PlansApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /plans, every page
    pub async fn list(&self) -> Result<Vec<Plan>, ApiError> {
        self.client.list_all("/plans", "plans").await
    }
}
