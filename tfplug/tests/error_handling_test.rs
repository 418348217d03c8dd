//! Failure paths: failed creates, failed reads, and cancellation of
//! long-running waits through StopProvider or a context deadline.

#![allow(clippy::disallowed_methods)] // Allow unwrap() in tests for clarity

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tfplug::context::Context;
use tfplug::grpc::ProviderService;
use tfplug::proto::{self, provider_server::Provider};
use tfplug::request::{
    ConfigureRequest, ConfigureResponse, CreateRequest, CreateResponse, DeleteRequest,
    DeleteResponse, ReadRequest, ReadResponse, ResourceSchemaResponse, SchemaRequest,
    UpdateRequest, UpdateResponse,
};
use tfplug::retry::{StateChangeConf, StateChangeError};
use tfplug::types::{Diagnostics, DynamicValue};
use tfplug::{AttributeBuilder, Result, Schema, SchemaBuilder};
use tfplug::{DataSourceV2, ProviderV2, ResourceV2};

struct FlakyProvider;

fn flaky_schema() -> Schema {
    SchemaBuilder::new()
        .attribute(AttributeBuilder::string("id").computed())
        .attribute(AttributeBuilder::string("mode").required())
        .build()
}

#[async_trait]
impl ProviderV2 for FlakyProvider {
    async fn provider_schema(&self) -> Schema {
        SchemaBuilder::new().build()
    }

    async fn configure(&mut self, _request: ConfigureRequest) -> ConfigureResponse {
        ConfigureResponse {
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceV2>> {
        match name {
            "flaky" => Ok(Box::new(FlakyResource)),
            _ => Err(format!("Unknown resource: {}", name).into()),
        }
    }

    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSourceV2>> {
        Err(format!("Unknown data source: {}", name).into())
    }

    async fn resource_schemas(&self) -> HashMap<String, Schema> {
        HashMap::from([("flaky".to_string(), flaky_schema())])
    }

    async fn data_source_schemas(&self) -> HashMap<String, Schema> {
        HashMap::new()
    }
}

/// Waits forever for a state that never arrives
async fn wait_forever(ctx: &Context) -> std::result::Result<Option<()>, StateChangeError> {
    StateChangeConf::new(|| async { Ok((Some(()), "pending".to_string())) })
        .pending(["pending"])
        .target(["active"])
        .timeout(Duration::from_secs(3600))
        .wait_for_state(ctx)
        .await
}

struct FlakyResource;

#[async_trait]
impl ResourceV2 for FlakyResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: flaky_schema(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mode = request.config.get_string("mode").unwrap_or_default();
        let mut state = request.planned_state;
        match mode.as_str() {
            "reject" => CreateResponse {
                state: DynamicValue::new(),
                diagnostics: Diagnostics::error("Error creating flaky", "400 bad request"),
            },
            "stuck" => {
                state.set_string("id", "flaky-1");
                let diagnostics = match wait_forever(&request.context).await {
                    Ok(_) => Diagnostics::new(),
                    Err(e) => Diagnostics::error("Error waiting for flaky", e.to_string()),
                };
                CreateResponse { state, diagnostics }
            }
            _ => {
                state.set_string("id", "flaky-1");
                CreateResponse {
                    state,
                    diagnostics: Diagnostics::new(),
                }
            }
        }
    }

    async fn read(&self, _request: ReadRequest) -> ReadResponse {
        ReadResponse {
            state: None,
            diagnostics: Diagnostics::error("Error getting flaky", "503 service unavailable"),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        UpdateResponse {
            state: request.planned_state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, _request: DeleteRequest) -> DeleteResponse {
        DeleteResponse {
            diagnostics: Diagnostics::error("Error deleting flaky", "still attached"),
        }
    }
}

fn encode(value: Option<&DynamicValue>) -> Option<proto::DynamicValue> {
    let msgpack = match value {
        Some(value) => value.encode_msgpack().unwrap(),
        None => DynamicValue::encode_null_msgpack().unwrap(),
    };
    Some(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn decode(value: Option<proto::DynamicValue>) -> Option<DynamicValue> {
    DynamicValue::decode_msgpack_nullable(&value.unwrap().msgpack).unwrap()
}

fn create_request(mode: &str) -> proto::apply_resource_change::Request {
    let mut config = DynamicValue::new();
    config.set_string("mode", mode);
    config.set_null("id");
    proto::apply_resource_change::Request {
        type_name: "flaky".to_string(),
        prior_state: encode(None),
        planned_state: encode(Some(&config)),
        config: encode(Some(&config)),
        ..Default::default()
    }
}

#[tokio::test]
async fn rejected_create_returns_null_state() {
    let service = ProviderService::new(FlakyProvider);

    let response = service
        .apply_resource_change(tonic::Request::new(create_request("reject")))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(decode(response.new_state), None);
    assert_eq!(response.diagnostics[0].summary, "Error creating flaky");
    assert_eq!(response.diagnostics[0].detail, "400 bad request");
}

#[tokio::test]
async fn stop_provider_cancels_in_flight_create_and_keeps_partial_state() {
    let service = Arc::new(ProviderService::new(FlakyProvider));

    let applying = service.clone();
    let handle = tokio::spawn(async move {
        applying
            .apply_resource_change(tonic::Request::new(create_request("stuck")))
            .await
            .unwrap()
            .into_inner()
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    service
        .stop_provider(tonic::Request::new(proto::stop_provider::Request {}))
        .await
        .unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("apply should finish after StopProvider")
        .unwrap();

    assert!(response.diagnostics[0].detail.contains("cancelled"));
    // the object exists remotely, so its ID is kept for tainting
    let state = decode(response.new_state).unwrap();
    assert_eq!(state.get_string("id"), Some("flaky-1".to_string()));
}

#[tokio::test]
async fn failed_read_keeps_current_state() {
    let service = ProviderService::new(FlakyProvider);
    let mut state = DynamicValue::new();
    state.set_string("id", "flaky-1");
    state.set_string("mode", "ok");

    let response = service
        .read_resource(tonic::Request::new(proto::read_resource::Request {
            type_name: "flaky".to_string(),
            current_state: encode(Some(&state)),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(decode(response.new_state), Some(state));
    assert_eq!(response.diagnostics.len(), 1);
}

#[tokio::test]
async fn failed_delete_keeps_prior_state() {
    let service = ProviderService::new(FlakyProvider);
    let mut state = DynamicValue::new();
    state.set_string("id", "flaky-1");
    state.set_string("mode", "ok");

    let response = service
        .apply_resource_change(tonic::Request::new(proto::apply_resource_change::Request {
            type_name: "flaky".to_string(),
            prior_state: encode(Some(&state)),
            planned_state: encode(None),
            config: encode(None),
            ..Default::default()
        }))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(decode(response.new_state), Some(state));
    assert_eq!(response.diagnostics[0].detail, "still attached");
}

#[tokio::test]
async fn context_deadline_stops_waiting() {
    let ctx = Context::new().with_timeout(Duration::from_millis(100));

    let result = wait_forever(&ctx).await;

    assert_eq!(result, Err(StateChangeError::Cancelled));
}
