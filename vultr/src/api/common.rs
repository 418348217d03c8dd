//! Common types and utilities for the Vultr API

use serde::{Deserialize, Deserializer};

/// Error body returned by the API, e.g. `{"error": "invalid instance ID", "status": 404}`
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(default)]
    pub status: Option<u16>,
}

/// Pagination metadata attached to every list response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub links: Links,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Links {
    #[serde(default, deserialize_with = "null_as_default")]
    pub next: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub prev: String,
}

/// Cursor paging options for list endpoints
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub per_page: Option<u32>,
    pub cursor: Option<String>,
}

pub const DEFAULT_PER_PAGE: u32 = 100;

impl ListOptions {
    pub fn new() -> Self {
        Self {
            per_page: Some(DEFAULT_PER_PAGE),
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn to_query_params(&self) -> ApiQueryParams {
        ApiQueryParams::new()
            .add_optional("per_page", self.per_page)
            .add_optional("cursor", self.cursor.as_deref())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApiQueryParams {
    params: Vec<(String, String)>,
}

impl ApiQueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    pub fn add_optional<K: Into<String>, V: ToString>(mut self, key: K, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.params.push((key.into(), v.to_string()));
        }
        self
    }

    pub fn to_query_string(&self) -> String {
        if self.params.is_empty() {
            String::new()
        } else {
            format!(
                "?{}",
                self.params
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                    .collect::<Vec<_>>()
                    .join("&")
            )
        }
    }
}

/// Deserializes `null` as the type's default; the API sends null for unset
/// strings and lists on some objects
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The API toggles some features with "enabled"/"disabled" strings
pub fn enabled_flag(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
