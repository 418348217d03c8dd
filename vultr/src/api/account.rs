//! Account information

use super::{ApiError, Client};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub acls: Vec<String>,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub pending_charges: f64,
    #[serde(default)]
    pub last_payment_date: String,
    #[serde(default)]
    pub last_payment_amount: f64,
}

#[derive(Debug, Deserialize)]
struct AccountWrapper {
    account: Account,
}

pub struct AccountApi<'a> {
    client: &'a Client,
}

impl<'a> AccountApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /account
    pub async fn get(&self) -> Result<Account, ApiError> {
        let wrapper: AccountWrapper = self.client.get("/account").await?;
        Ok(wrapper.account)
    }
}
