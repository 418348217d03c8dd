//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when an optional attribute is not
//! set in configuration. The planned value becomes the default, so the
//! resource sees it on create and Terraform shows it in the plan.
//!
//! # Examples
//!
//! ```ignore
//! use tfplug::schema::AttributeBuilder;
//! use tfplug::defaults::StaticDefault;
//!
//! let enable_ipv6 = AttributeBuilder::bool("enable_ipv6")
//!     .optional()
//!     .computed()
//!     .default(StaticDefault::bool(false));
//! ```

use crate::types::Dynamic;
use std::env;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct DefaultRequest {
    pub attribute_path: String,
}

#[derive(Debug, Clone)]
pub struct DefaultResponse {
    pub value: Dynamic,
}

/// Default provides the planned value of an attribute absent from config
pub trait Default: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    /// Provide default value
    fn default_value(&self, request: DefaultRequest) -> DefaultResponse;
}

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    /// Create a new static default provider with the given value
    pub fn create(value: Dynamic) -> Arc<dyn Default> {
        Arc::new(Self { value })
    }

    pub fn string(value: &str) -> Arc<dyn Default> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Arc<dyn Default> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Arc<dyn Default> {
        Self::create(Dynamic::Bool(value))
    }

    pub fn list(values: Vec<Dynamic>) -> Arc<dyn Default> {
        Self::create(Dynamic::List(values))
    }
}

impl Default for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        DefaultResponse {
            value: self.value.clone(),
        }
    }
}

/// EnvDefault gets the default value from an environment variable
pub struct EnvDefault {
    env_var: String,
    fallback: Option<String>,
}

impl EnvDefault {
    pub fn create(env_var: &str, fallback: &str) -> Arc<dyn Default> {
        Arc::new(Self {
            env_var: env_var.to_string(),
            fallback: Some(fallback.to_string()),
        })
    }

    /// Null when the variable is unset
    pub fn create_required(env_var: &str) -> Arc<dyn Default> {
        Arc::new(Self {
            env_var: env_var.to_string(),
            fallback: None,
        })
    }
}

impl Default for EnvDefault {
    fn description(&self) -> String {
        match &self.fallback {
            Some(fallback) => format!(
                "default from environment variable {} (fallback: {})",
                self.env_var, fallback
            ),
            None => format!("default from environment variable {}", self.env_var),
        }
    }

    fn default_value(&self, _request: DefaultRequest) -> DefaultResponse {
        let value = match env::var(&self.env_var) {
            Ok(val) => Dynamic::String(val),
            Err(_) => match &self.fallback {
                Some(fallback) => Dynamic::String(fallback.clone()),
                None => Dynamic::Null,
            },
        };

        DefaultResponse { value }
    }
}
