//! `vultr_dns_record`, imported as `domain,record_id`

use super::{changed, delete_diagnostics, id_attribute, read_failed, split_import_id, state_id};
use crate::api::domains::{DomainRecord, DomainRecordRequest};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::defaults::StaticDefault;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportRequest, ImportResponse,
    ReadRequest, ReadResponse, ResourceSchemaResponse, SchemaRequest, UpdateRequest,
    UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::OneOfValidator;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

const RECORD_TYPES: [&str; 9] = ["A", "AAAA", "CNAME", "NS", "MX", "SRV", "TXT", "CAA", "SSHFP"];

pub struct DnsRecordResource {
    data: VultrProviderData,
}

impl DnsRecordResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A record inside a Vultr DNS zone")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("domain")
                    .required()
                    .requires_replace()
                    .description("Zone the record belongs to"),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .description("Record name; empty for the zone apex"),
            )
            .attribute(
                AttributeBuilder::string("type")
                    .required()
                    .requires_replace()
                    .validator(OneOfValidator::new(RECORD_TYPES)),
            )
            .attribute(AttributeBuilder::string("data").required())
            .attribute(
                AttributeBuilder::number("ttl")
                    .optional()
                    .computed()
                    .default(StaticDefault::number(300.0)),
            )
            .attribute(
                AttributeBuilder::number("priority")
                    .optional()
                    .computed()
                    .description("Only used by MX and SRV records"),
            )
            .build()
    }
}

fn apply_record(record: &DomainRecord, state: &mut State) {
    state.set_string("id", &record.id);
    state.set_string("name", &record.name);
    state.set_string("type", &record.record_type);
    state.set_string("data", &record.data);
    state.set_i64("ttl", record.ttl);
    state.set_i64("priority", record.priority);
}

/// The zone and record ID of a state
fn record_ids(state: &State) -> Result<(String, String), Diagnostics> {
    let id = state_id(state)?;
    let domain = state
        .get_non_empty_string("domain")
        .ok_or_else(|| Diagnostics::error("Missing domain", "The record state has no domain"))?;
    Ok((domain, id))
}

#[async_trait]
impl ResourceV2 for DnsRecordResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let domain = state.get_string("domain").unwrap_or_default();
        let body = DomainRecordRequest {
            name: state.get_string("name"),
            record_type: state.get_string("type"),
            data: state.get_string("data"),
            ttl: state.get_i64("ttl"),
            priority: state.get_i64("priority"),
        };

        let diagnostics = match self.data.client.domains().create_record(&domain, &body).await {
            Ok(record) => {
                tracing::info!("Created DNS record {} in {}", record.id, domain);
                apply_record(&record, &mut state);
                Diagnostics::new()
            }
            Err(e) => Diagnostics::error(
                format!("Failed to create DNS record in {}", domain),
                e.to_string(),
            ),
        };

        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut state = request.current_state;
        let (domain, id) = match record_ids(&state) {
            Ok(ids) => ids,
            Err(diagnostics) => {
                return ReadResponse {
                    state: Some(state),
                    diagnostics,
                }
            }
        };

        match self.data.client.domains().get_record(&domain, &id).await {
            Ok(record) => {
                apply_record(&record, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("DNS record", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let current = request.current_state;
        let mut state = request.planned_state;
        let (domain, id) = match record_ids(&current) {
            Ok(ids) => ids,
            Err(diagnostics) => {
                return UpdateResponse {
                    state: current,
                    diagnostics,
                }
            }
        };

        let body = DomainRecordRequest {
            name: changed(state.get_string("name"), current.get_string("name")),
            record_type: None,
            data: changed(state.get_string("data"), current.get_string("data")),
            ttl: changed(state.get_i64("ttl"), current.get_i64("ttl")),
            priority: changed(state.get_i64("priority"), current.get_i64("priority")),
        };

        if let Err(e) = self
            .data
            .client
            .domains()
            .update_record(&domain, &id, &body)
            .await
        {
            return UpdateResponse {
                state: current,
                diagnostics: Diagnostics::error(
                    format!("Failed to update DNS record {}", id),
                    e.to_string(),
                ),
            };
        }

        state.set_string("id", &id);
        if state.is_unknown("priority") {
            state.copy_from(&current, "priority");
        }
        UpdateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match record_ids(&request.current_state) {
            Ok((domain, id)) => {
                let result = self.data.client.domains().delete_record(&domain, &id).await;
                delete_diagnostics("DNS record", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportRequest) -> ImportResponse {
        match split_import_id(&request.id, "domain,record_id") {
            Ok((domain, id)) => {
                let mut state = State::new();
                state.set_string("domain", domain);
                state.set_string("id", id);
                ImportResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(diagnostics) => ImportResponse {
                state: None,
                diagnostics,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_data, json_response};
    use mockito::{Matcher, Server};
    use tfplug::context::Context;
    use tfplug::Dynamic;

    const RECORD_JSON: &str = r#"{"record": {"id": "rec-1", "type": "A", "name": "www",
        "data": "192.0.2.10", "priority": 0, "ttl": 300}}"#;

    fn record_state() -> State {
        let mut state = State::new();
        state.set_string("id", "rec-1");
        state.set_string("domain", "example.com");
        state.set_string("name", "www");
        state.set_string("type", "A");
        state.set_string("data", "192.0.2.10");
        state.set_i64("ttl", 300);
        state.set_i64("priority", 0);
        state
    }

    #[tokio::test]
    async fn import_splits_the_composite_id() {
        let resource = DnsRecordResource::new(create_test_data("http://127.0.0.1:1"));
        let state = resource
            .import_state(ImportRequest {
                context: Context::new(),
                id: "example.com,rec-1".to_string(),
            })
            .await
            .state
            .unwrap();

        assert_eq!(state.get_string("domain").as_deref(), Some("example.com"));
        assert_eq!(state.get_string("id").as_deref(), Some("rec-1"));

        let bad = resource
            .import_state(ImportRequest {
                context: Context::new(),
                id: "rec-1".to_string(),
            })
            .await;
        assert!(bad.state.is_none());
        assert!(bad.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn create_posts_to_the_zone() {
        let mut server = Server::new_async().await;
        let mock = json_response(
            &mut server,
            "POST",
            "/domains/example.com/records",
            201,
            RECORD_JSON,
        )
        .match_body(Matcher::Json(serde_json::json!({
            "name": "www",
            "type": "A",
            "data": "192.0.2.10",
            "ttl": 300
        })))
        .create_async()
        .await;

        let mut planned = record_state();
        planned.set_null("id");
        planned.set("priority", Dynamic::Unknown);

        let resource = DnsRecordResource::new(create_test_data(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: Context::new(),
                config: planned.clone(),
                planned_state: planned,
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("id").as_deref(), Some("rec-1"));
        assert_eq!(response.state.get_i64("priority"), Some(0));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_patches_changed_data() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", "/domains/example.com/records/rec-1")
            .match_body(Matcher::Json(serde_json::json!({"data": "192.0.2.20"})))
            .with_status(204)
            .create_async()
            .await;

        let mut planned = record_state();
        planned.set_string("data", "192.0.2.20");

        let resource = DnsRecordResource::new(create_test_data(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: Context::new(),
                config: planned.clone(),
                planned_state: planned,
                current_state: record_state(),
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        assert_eq!(response.state.get_string("data").as_deref(), Some("192.0.2.20"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn read_drops_deleted_record() {
        let mut server = Server::new_async().await;
        let _m = json_response(
            &mut server,
            "GET",
            "/domains/example.com/records/rec-1",
            404,
            r#"{"error": "Invalid record", "status": 404}"#,
        )
        .create_async()
        .await;

        let resource = DnsRecordResource::new(create_test_data(&server.url()));
        let response = resource
            .read(ReadRequest {
                context: Context::new(),
                current_state: record_state(),
            })
            .await;

        assert!(response.state.is_none());
    }
}
