//! Provider data handed to every resource and data source

use crate::api::Client;
use crate::wait::WaitConfig;

/// The configured API client plus the polling schedule for async objects
#[derive(Clone)]
pub struct VultrProviderData {
    pub client: Client,
    pub wait: WaitConfig,
}

impl VultrProviderData {
    pub fn new(client: Client, wait: WaitConfig) -> Self {
        Self { client, wait }
    }
}
