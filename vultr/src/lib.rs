pub mod api;
pub mod data_sources;
pub mod filter;
pub mod provider_data;
pub mod resources;
pub mod wait;

pub use provider_data::VultrProviderData;

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tfplug::provider::{DataSourceSchema, ProviderSchema, ResourceSchema};
use tfplug::request::{ConfigureRequest, ConfigureResponse};
use tfplug::types::Config;
use tfplug::validator::NumberRangeValidator;
use tfplug::{AttributeBuilder, DataSourceV2, Diagnostics, ProviderV2, ResourceV2, SchemaBuilder};

const DEFAULT_RATE_LIMIT_MS: i64 = 500;
const DEFAULT_RETRY_LIMIT: i64 = 3;

pub struct VultrProvider {
    data: Option<VultrProviderData>,
}

impl Default for VultrProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl VultrProvider {
    pub fn new() -> Self {
        Self { data: None }
    }
}

/// A numeric provider setting, falling back to its environment variable
fn number_setting(config: &Config, name: &str, env: &str) -> Result<Option<i64>, String> {
    if let Some(value) = config.get_i64(name) {
        return Ok(Some(value));
    }
    match std::env::var(env) {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("{} must be a whole number, got {:?}", env, raw)),
        Err(_) => Ok(None),
    }
}

fn endpoint_setting() -> Result<String, String> {
    match std::env::var("VULTR_API_ENDPOINT") {
        Ok(raw) if !raw.trim().is_empty() => url::Url::parse(raw.trim())
            .map(|url| url.as_str().trim_end_matches('/').to_string())
            .map_err(|e| format!("VULTR_API_ENDPOINT is not a valid URL: {}", e)),
        _ => Ok(api::DEFAULT_ENDPOINT.to_string()),
    }
}

#[async_trait]
impl ProviderV2 for VultrProvider {
    async fn provider_schema(&self) -> ProviderSchema {
        SchemaBuilder::new()
            .version(0)
            .description("Manage Vultr cloud infrastructure")
            .attribute(
                AttributeBuilder::string("api_key")
                    .optional()
                    .sensitive()
                    .description("Vultr API key. May also be set with VULTR_API_KEY"),
            )
            .attribute(
                AttributeBuilder::number("rate_limit")
                    .optional()
                    .description("Minimum milliseconds between API requests. Defaults to 500")
                    .validator(NumberRangeValidator {
                        min: Some(0.0),
                        max: None,
                    }),
            )
            .attribute(
                AttributeBuilder::number("retry_limit")
                    .optional()
                    .description("Retries for rate limited or failed requests. Defaults to 3")
                    .validator(NumberRangeValidator {
                        min: Some(0.0),
                        max: None,
                    }),
            )
            .build()
    }

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse {
        let config = request.config;
        let mut diags = Diagnostics::new();

        let api_key = config
            .get_non_empty_string("api_key")
            .or_else(|| std::env::var("VULTR_API_KEY").ok().filter(|k| !k.is_empty()));

        let rate_limit = number_setting(&config, "rate_limit", "VULTR_RATE_LIMIT");
        let retry_limit = number_setting(&config, "retry_limit", "VULTR_RETRY_LIMIT");
        let endpoint = endpoint_setting();

        match (api_key, rate_limit, retry_limit, endpoint) {
            (None, ..) => {
                diags.add_error(
                    "api_key is required (set in provider config or VULTR_API_KEY env var)",
                    None::<String>,
                );
            }
            (_, Err(e), ..) | (_, _, Err(e), _) | (.., Err(e)) => {
                diags.add_error("Invalid provider configuration", Some(e));
            }
            (Some(api_key), Ok(rate_limit), Ok(retry_limit), Ok(endpoint)) => {
                let rate_limit = rate_limit.unwrap_or(DEFAULT_RATE_LIMIT_MS).max(0);
                let retry_config = api::RetryConfig {
                    max_retries: retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT).clamp(0, u32::MAX as i64)
                        as u32,
                    ..Default::default()
                };

                match api::Client::with_config(
                    &endpoint,
                    &api_key,
                    retry_config,
                    Duration::from_millis(rate_limit as u64),
                ) {
                    Ok(client) => {
                        tracing::info!(
                            "Configured Vultr client for {} ({} ms between requests)",
                            endpoint,
                            rate_limit
                        );
                        self.data = Some(VultrProviderData::new(client, wait::WaitConfig::default()));
                    }
                    Err(e) => {
                        diags.add_error(
                            format!("Failed to create API client: {}", e),
                            None::<String>,
                        );
                    }
                }
            }
        }

        ConfigureResponse { diagnostics: diags }
    }

    async fn create_resource(&self, name: &str) -> tfplug::Result<Box<dyn ResourceV2>> {
        let data = self.data.as_ref().ok_or("Provider not configured")?.clone();

        match name {
            "vultr_instance" => Ok(Box::new(resources::InstanceResource::new(data))),
            "vultr_ssh_key" => Ok(Box::new(resources::SshKeyResource::new(data))),
            "vultr_startup_script" => Ok(Box::new(resources::StartupScriptResource::new(data))),
            "vultr_dns_domain" => Ok(Box::new(resources::DnsDomainResource::new(data))),
            "vultr_dns_record" => Ok(Box::new(resources::DnsRecordResource::new(data))),
            "vultr_vpc" => Ok(Box::new(resources::VpcResource::new(data))),
            "vultr_firewall_group" => Ok(Box::new(resources::FirewallGroupResource::new(data))),
            "vultr_firewall_rule" => Ok(Box::new(resources::FirewallRuleResource::new(data))),
            "vultr_block_storage" => Ok(Box::new(resources::BlockStorageResource::new(data))),
            "vultr_reserved_ip" => Ok(Box::new(resources::ReservedIpResource::new(data))),
            "vultr_load_balancer" => Ok(Box::new(resources::LoadBalancerResource::new(data))),
            "vultr_database" => Ok(Box::new(resources::DatabaseResource::new(data))),
            "vultr_kubernetes" => Ok(Box::new(resources::KubernetesResource::new(data))),
            "vultr_object_storage" => Ok(Box::new(resources::ObjectStorageResource::new(data))),
            "vultr_iso_private" => Ok(Box::new(resources::IsoPrivateResource::new(data))),
            _ => Err(format!("Unknown resource: {}", name).into()),
        }
    }

    async fn create_data_source(&self, name: &str) -> tfplug::Result<Box<dyn DataSourceV2>> {
        let data = self.data.as_ref().ok_or("Provider not configured")?.clone();

        match name {
            "vultr_account" => Ok(Box::new(data_sources::AccountDataSource::new(data))),
            "vultr_region" => Ok(Box::new(data_sources::RegionDataSource::new(data))),
            "vultr_plan" => Ok(Box::new(data_sources::PlanDataSource::new(data))),
            "vultr_os" => Ok(Box::new(data_sources::OsDataSource::new(data))),
            "vultr_ssh_key" => Ok(Box::new(data_sources::SshKeyDataSource::new(data))),
            "vultr_instance" => Ok(Box::new(data_sources::InstanceDataSource::new(data))),
            "vultr_vpc" => Ok(Box::new(data_sources::VpcDataSource::new(data))),
            "vultr_dns_domain" => Ok(Box::new(data_sources::DnsDomainDataSource::new(data))),
            "vultr_firewall_group" => {
                Ok(Box::new(data_sources::FirewallGroupDataSource::new(data)))
            }
            _ => Err(format!("Unknown data source: {}", name).into()),
        }
    }

    async fn resource_schemas(&self) -> HashMap<String, ResourceSchema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, ResourceSchema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                [
                    ("vultr_instance", resources::InstanceResource::schema_static()),
                    ("vultr_ssh_key", resources::SshKeyResource::schema_static()),
                    ("vultr_startup_script", resources::StartupScriptResource::schema_static()),
                    ("vultr_dns_domain", resources::DnsDomainResource::schema_static()),
                    ("vultr_dns_record", resources::DnsRecordResource::schema_static()),
                    ("vultr_vpc", resources::VpcResource::schema_static()),
                    ("vultr_firewall_group", resources::FirewallGroupResource::schema_static()),
                    ("vultr_firewall_rule", resources::FirewallRuleResource::schema_static()),
                    ("vultr_block_storage", resources::BlockStorageResource::schema_static()),
                    ("vultr_reserved_ip", resources::ReservedIpResource::schema_static()),
                    ("vultr_load_balancer", resources::LoadBalancerResource::schema_static()),
                    ("vultr_database", resources::DatabaseResource::schema_static()),
                    ("vultr_kubernetes", resources::KubernetesResource::schema_static()),
                    ("vultr_object_storage", resources::ObjectStorageResource::schema_static()),
                    ("vultr_iso_private", resources::IsoPrivateResource::schema_static()),
                ]
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect()
            })
            .clone()
    }

    async fn data_source_schemas(&self) -> HashMap<String, DataSourceSchema> {
        static SCHEMAS: std::sync::OnceLock<HashMap<String, DataSourceSchema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                [
                    ("vultr_account", data_sources::AccountDataSource::schema_static()),
                    ("vultr_region", data_sources::RegionDataSource::schema_static()),
                    ("vultr_plan", data_sources::PlanDataSource::schema_static()),
                    ("vultr_os", data_sources::OsDataSource::schema_static()),
                    ("vultr_ssh_key", data_sources::SshKeyDataSource::schema_static()),
                    ("vultr_instance", data_sources::InstanceDataSource::schema_static()),
                    ("vultr_vpc", data_sources::VpcDataSource::schema_static()),
                    ("vultr_dns_domain", data_sources::DnsDomainDataSource::schema_static()),
                    (
                        "vultr_firewall_group",
                        data_sources::FirewallGroupDataSource::schema_static(),
                    ),
                ]
                .into_iter()
                .map(|(name, schema)| (name.to_string(), schema))
                .collect()
            })
            .clone()
    }
}
