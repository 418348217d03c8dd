//! `vultr_dns_domain`; the domain name doubles as the ID

use super::{delete_diagnostics, id_attribute, read_failed, state_id};
use crate::api::domains::{Domain, DomainCreateRequest, DomainUpdateRequest};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::OneOfValidator;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct DnsDomainResource {
    data: VultrProviderData,
}

impl DnsDomainResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A DNS zone hosted by Vultr")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("domain")
                    .required()
                    .requires_replace()
                    .description("Domain name, e.g. example.com"),
            )
            .attribute(
                AttributeBuilder::string("ip")
                    .optional()
                    .requires_replace()
                    .description("IP address for the default A records created with the zone"),
            )
            .attribute(
                AttributeBuilder::string("dns_sec")
                    .optional()
                    .computed()
                    .description("enabled or disabled")
                    .validator(OneOfValidator::new(["enabled", "disabled"])),
            )
            .attribute(AttributeBuilder::string("date_created").computed())
            .build()
    }
}

fn apply_domain(domain: &Domain, state: &mut State) {
    state.set_string("id", &domain.domain);
    state.set_string("domain", &domain.domain);
    state.set_string("dns_sec", &domain.dns_sec);
    state.set_string("date_created", &domain.date_created);
}

#[async_trait]
impl ResourceV2 for DnsDomainResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = DomainCreateRequest {
            domain: state.get_string("domain").unwrap_or_default(),
            ip: state.get_non_empty_string("ip"),
            dns_sec: state.get_string("dns_sec"),
        };

        let diagnostics = match self.data.client.domains().create(&body).await {
            Ok(domain) => {
                tracing::info!("Created DNS domain {}", domain.domain);
                apply_domain(&domain, &mut state);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error(
                format!("Failed to create DNS domain {}", body.domain),
                e.to_string(),
            ),
        };

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut state = request.current_state;
        let id = match state_id(&state) {
            Ok(id) => id,
            Err(diagnostics) => {
                return ReadResponse {
                    state: Some(state),
                    diagnostics,
                }
            }
        };

        match self.data.client.domains().get(&id).await {
            Ok(domain) => {
                apply_domain(&domain, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("DNS domain", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let current = request.current_state;
        let mut state = request.planned_state;
        let id = match state_id(&current) {
            Ok(id) => id,
            Err(diagnostics) => {
                return UpdateResponse {
                    state: current,
                    diagnostics,
                }
            }
        };

        if let Some(dns_sec) = state.get_string("dns_sec") {
            if Some(&dns_sec) != current.get_string("dns_sec").as_ref() {
                let body = DomainUpdateRequest { dns_sec };
                if let Err(e) = self.data.client.domains().update(&id, &body).await {
                    return UpdateResponse {
                        state: current,
                        diagnostics: Diagnostics::error(
                            format!("Failed to update DNS domain {}", id),
                            e.to_string(),
                        ),
                    };
                }
            }
        }

        state.set_string("id", &id);
        state.copy_from(&current, "date_created");
        UpdateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match state_id(&request.current_state) {
            Ok(id) => {
                let result = self.data.client.domains().delete(&id).await;
                delete_diagnostics("DNS domain", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}
