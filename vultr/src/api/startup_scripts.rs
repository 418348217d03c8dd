//! Startup scripts; the script body travels base64 encoded

use super::{ApiError, Client};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupScript {
    pub id: String,
    #[serde(default)]
    pub date_created: String,
    #[serde(default)]
    pub date_modified: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub script_type: String,
    /// Base64 encoded
    #[serde(default)]
    pub script: String,
}

impl StartupScript {
    /// The decoded script, or the raw value when it is not valid base64
    pub fn decoded_script(&self) -> String {
        STANDARD
            .decode(self.script.as_bytes())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_else(|| self.script.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StartupScriptRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub script_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl StartupScriptRequest {
    /// Encodes a plain-text script for the request body
    pub fn encode_script(script: &str) -> String {
        STANDARD.encode(script.as_bytes())
    }
}

#[derive(Debug, Deserialize)]
struct StartupScriptWrapper {
    startup_script: StartupScript,
}

pub struct StartupScriptsApi<'a> {
    client: &'a Client,
}

impl<'a> StartupScriptsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /startup-scripts/{id}
    pub async fn get(&self, id: &str) -> Result<StartupScript, ApiError> {
        let wrapper: StartupScriptWrapper = self
            .client
            .get(&format!("/startup-scripts/{}", id))
            .await?;
        Ok(wrapper.startup_script)
    }

    /// POST /startup-scripts
    pub async fn create(&self, request: &StartupScriptRequest) -> Result<StartupScript, ApiError> {
        let wrapper: StartupScriptWrapper = self.client.post("/startup-scripts", request).await?;
        Ok(wrapper.startup_script)
    }

    /// PATCH /startup-scripts/{id}
    pub async fn update(&self, id: &str, request: &StartupScriptRequest) -> Result<(), ApiError> {
        self.client
            .patch(&format!("/startup-scripts/{}", id), request)
            .await
    }

    /// DELETE /startup-scripts/{id}
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .delete(&format!("/startup-scripts/{}", id))
            .await
    }
}
