//! gRPC service implementation for ProviderV2
//!
//! Implements the Terraform Plugin Protocol v6.9 on top of the factory-based
//! ProviderV2 traits. Every resource RPC asks the provider for a fresh
//! resource instance, so only configuration needs the provider write lock.
//!
//! The schema drives the protocol plumbing done here: planned values are
//! shaped to the schema, computed attributes are marked unknown, defaults and
//! plan modifiers run, and every state returned to Terraform is conformed.

use crate::context::Context;
use crate::plan_modifier::PlanModifyRequest;
use crate::proto::{self, provider_server::Provider as ProtoProvider};
use crate::provider::ProviderV2;
use crate::request::{
    ConfigureRequest, CreateRequest, DeleteRequest, ImportRequest, ReadDataSourceRequest,
    ReadRequest, SchemaRequest, UpdateRequest, ValidateRequest,
};
use crate::schema::{Attribute, Block, NestingMode, Schema};
use crate::types::{AttributePath, AttributePathStep, Diagnostics, Dynamic, DynamicValue};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

type RpcResult<T> = std::result::Result<Response<T>, Status>;

pub struct ProviderService<P: ProviderV2> {
    provider: Arc<RwLock<P>>,
    /// Parent of every request context; cancelled by StopProvider
    stop: Context,
}

impl<P: ProviderV2 + 'static> ProviderService<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            stop: Context::new(),
        }
    }

    fn context(&self) -> Context {
        self.stop.child()
    }

    async fn resource(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn crate::provider::ResourceV2>, Vec<proto::Diagnostic>> {
        let provider = self.provider.read().await;
        provider
            .create_resource(type_name)
            .await
            .map_err(|e| error_diagnostics("Unknown resource type", e.to_string()))
    }

    async fn data_source(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn crate::provider::DataSourceV2>, Vec<proto::Diagnostic>> {
        let provider = self.provider.read().await;
        provider
            .create_data_source(type_name)
            .await
            .map_err(|e| error_diagnostics("Unknown data source type", e.to_string()))
    }
}

#[tonic::async_trait]
impl<P: ProviderV2 + 'static> ProtoProvider for ProviderService<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> RpcResult<proto::get_metadata::Response> {
        let provider = self.provider.read().await;
        let mut resources: Vec<String> = provider.resource_schemas().await.into_keys().collect();
        let mut data_sources: Vec<String> =
            provider.data_source_schemas().await.into_keys().collect();
        resources.sort();
        data_sources.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            resources: resources
                .into_iter()
                .map(|type_name| proto::get_metadata::ResourceMetadata { type_name })
                .collect(),
            data_sources: data_sources
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            ..Default::default()
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> RpcResult<proto::get_provider_schema::Response> {
        let provider = self.provider.read().await;
        let provider_schema = provider.provider_schema().await;
        let resource_schemas = provider.resource_schemas().await;
        let data_source_schemas = provider.data_source_schemas().await;

        tracing::debug!(
            resources = resource_schemas.len(),
            data_sources = data_source_schemas.len(),
            "GetProviderSchema"
        );

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider_schema)),
            resource_schemas: schemas_to_proto(&resource_schemas),
            data_source_schemas: schemas_to_proto(&data_source_schemas),
            server_capabilities: Some(server_capabilities()),
            ..Default::default()
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> RpcResult<proto::validate_provider_config::Response> {
        let req = request.into_inner();
        let config = decode_value(&req.config)?.unwrap_or_default();
        let schema = self.provider.read().await.provider_schema().await;

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(schema.validate(&config)),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<proto::validate_resource_config::Request>,
    ) -> RpcResult<proto::validate_resource_config::Response> {
        let req = request.into_inner();
        let resource = match self.resource(&req.type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::validate_resource_config::Response {
                    diagnostics,
                }))
            }
        };

        let config = decode_value(&req.config)?.unwrap_or_default();
        let schema = resource
            .schema(SchemaRequest {
                context: self.context(),
            })
            .await;

        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(schema.schema.validate(&config));
        if !diagnostics.has_errors() {
            let response = resource
                .validate(ValidateRequest {
                    context: self.context(),
                    config,
                })
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> RpcResult<proto::validate_data_resource_config::Response> {
        let req = request.into_inner();
        let data_source = match self.data_source(&req.type_name).await {
            Ok(data_source) => data_source,
            Err(diagnostics) => {
                return Ok(Response::new(
                    proto::validate_data_resource_config::Response { diagnostics },
                ))
            }
        };

        let config = decode_value(&req.config)?.unwrap_or_default();
        let schema = data_source
            .schema(SchemaRequest {
                context: self.context(),
            })
            .await;

        let mut diagnostics = schema.diagnostics;
        diagnostics.extend(schema.schema.validate(&config));

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<proto::upgrade_resource_state::Request>,
    ) -> RpcResult<proto::upgrade_resource_state::Response> {
        let req = request.into_inner();
        let resource = match self.resource(&req.type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::upgrade_resource_state::Response {
                    diagnostics,
                    ..Default::default()
                }))
            }
        };

        let schema = resource
            .schema(SchemaRequest {
                context: self.context(),
            })
            .await
            .schema;
        if req.version != schema.version {
            tracing::debug!(
                type_name = %req.type_name,
                from = req.version,
                to = schema.version,
                "Upgrading resource state"
            );
        }

        let raw = req.raw_state.unwrap_or_default();
        let state = DynamicValue::decode_json_nullable(&raw.json)?.map(|mut state| {
            schema.conform(&mut state);
            state
        });

        Ok(Response::new(proto::upgrade_resource_state::Response {
            upgraded_state: Some(encode_value(state.as_ref())?),
            diagnostics: vec![],
        }))
    }

    async fn get_resource_identity_schemas(
        &self,
        _request: Request<proto::get_resource_identity_schemas::Request>,
    ) -> RpcResult<proto::get_resource_identity_schemas::Response> {
        Ok(Response::new(
            proto::get_resource_identity_schemas::Response::default(),
        ))
    }

    async fn upgrade_resource_identity(
        &self,
        request: Request<proto::upgrade_resource_identity::Request>,
    ) -> RpcResult<proto::upgrade_resource_identity::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::upgrade_resource_identity::Response {
            upgraded_identity: None,
            diagnostics: error_diagnostics(
                "Resource identity not supported",
                format!("{} does not define a resource identity", req.type_name),
            ),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> RpcResult<proto::configure_provider::Response> {
        let req = request.into_inner();
        let config = decode_value(&req.config)?.unwrap_or_default();

        tracing::info!(
            terraform_version = %req.terraform_version,
            "Configuring provider"
        );

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(ConfigureRequest {
                context: self.context(),
                config,
            })
            .await;

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<proto::read_resource::Request>,
    ) -> RpcResult<proto::read_resource::Response> {
        let req = request.into_inner();
        let resource = match self.resource(&req.type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::read_resource::Response {
                    new_state: req.current_state,
                    diagnostics,
                    ..Default::default()
                }))
            }
        };

        let Some(current_state) = decode_value(&req.current_state)? else {
            return Ok(Response::new(proto::read_resource::Response {
                new_state: Some(encode_value(None)?),
                ..Default::default()
            }));
        };

        tracing::debug!(type_name = %req.type_name, "ReadResource");

        let response = resource
            .read(ReadRequest {
                context: self.context(),
                current_state: current_state.clone(),
            })
            .await;

        let new_state = match response.state {
            Some(mut state) => {
                let schema = resource
                    .schema(SchemaRequest {
                        context: self.context(),
                    })
                    .await
                    .schema;
                schema.conform(&mut state);
                Some(state)
            }
            // keep what we had when the read itself failed
            None if response.diagnostics.has_errors() => Some(current_state),
            None => {
                tracing::info!(type_name = %req.type_name, "Resource no longer exists, removing from state");
                None
            }
        };

        Ok(Response::new(proto::read_resource::Response {
            new_state: Some(encode_value(new_state.as_ref())?),
            diagnostics: diagnostics_to_proto(response.diagnostics),
            private: req.private,
            ..Default::default()
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<proto::plan_resource_change::Request>,
    ) -> RpcResult<proto::plan_resource_change::Response> {
        let req = request.into_inner();
        let resource = match self.resource(&req.type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::plan_resource_change::Response {
                    diagnostics,
                    ..Default::default()
                }))
            }
        };

        let prior_state = decode_value(&req.prior_state)?;
        let Some(mut planned) = decode_value(&req.proposed_new_state)? else {
            // destroy plans are returned untouched
            return Ok(Response::new(proto::plan_resource_change::Response {
                planned_state: Some(encode_value(None)?),
                planned_private: req.prior_private,
                ..Default::default()
            }));
        };
        let config = decode_value(&req.config)?.unwrap_or_default();
        let schema_response = resource
            .schema(SchemaRequest {
                context: self.context(),
            })
            .await;
        let schema = schema_response.schema;
        let mut diagnostics = schema_response.diagnostics;

        schema.apply_defaults(&mut planned, &config);
        match &prior_state {
            None => schema.mark_computed_unknown(&mut planned, &config),
            Some(prior) if prior.values != planned.values => {
                schema.mark_unconfigured_computed_unknown(&mut planned, &config)
            }
            Some(_) => {}
        }

        let empty = DynamicValue::new();
        let prior_values = prior_state.as_ref().unwrap_or(&empty);
        let mut requires_replace = Vec::new();

        let mut names: Vec<&String> = schema.attributes.keys().collect();
        names.sort();
        for name in names {
            let attribute = &schema.attributes[name];
            for modifier in &attribute.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: value_or_null(prior_values, name),
                    plan: value_or_null(&planned, name),
                    config: value_or_null(&config, name),
                    attribute_path: name.clone(),
                });
                planned.set(name, response.plan_value);
                diagnostics.extend(response.diagnostics);

                let path = AttributePath::new(name);
                if response.requires_replace
                    && prior_state.is_some()
                    && !requires_replace.contains(&path)
                {
                    requires_replace.push(path);
                }
            }
        }

        schema.conform(&mut planned);

        if !requires_replace.is_empty() {
            tracing::debug!(
                type_name = %req.type_name,
                attributes = ?requires_replace.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
                "Plan requires replacement"
            );
        }

        Ok(Response::new(proto::plan_resource_change::Response {
            planned_state: Some(encode_value(Some(&planned))?),
            requires_replace: requires_replace.iter().map(attribute_path_to_proto).collect(),
            planned_private: req.prior_private,
            diagnostics: diagnostics_to_proto(diagnostics),
            ..Default::default()
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<proto::apply_resource_change::Request>,
    ) -> RpcResult<proto::apply_resource_change::Response> {
        let req = request.into_inner();
        let resource = match self.resource(&req.type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::apply_resource_change::Response {
                    new_state: req.prior_state,
                    diagnostics,
                    ..Default::default()
                }))
            }
        };

        let prior_state = decode_value(&req.prior_state)?;
        let planned_state = decode_value(&req.planned_state)?;
        let config = decode_value(&req.config)?.unwrap_or_default();
        let context = self.context();

        let (new_state, diagnostics) = match (prior_state, planned_state) {
            (None, None) => (None, Diagnostics::new()),
            (Some(prior), None) => {
                tracing::info!(type_name = %req.type_name, "Deleting resource");
                let response = resource
                    .delete(DeleteRequest {
                        context,
                        current_state: prior.clone(),
                    })
                    .await;
                let state = response.diagnostics.has_errors().then_some(prior);
                (state, response.diagnostics)
            }
            (None, Some(planned)) => {
                tracing::info!(type_name = %req.type_name, "Creating resource");
                let response = resource
                    .create(CreateRequest {
                        context,
                        config,
                        planned_state: planned,
                    })
                    .await;
                // a failed create that already has an ID is kept so it can be tainted
                let created = response.state.get_string("id").is_some();
                let state = (created || !response.diagnostics.has_errors()).then_some(response.state);
                (state, response.diagnostics)
            }
            (Some(prior), Some(planned)) => {
                tracing::info!(type_name = %req.type_name, "Updating resource");
                let response = resource
                    .update(UpdateRequest {
                        context,
                        config,
                        planned_state: planned,
                        current_state: prior.clone(),
                    })
                    .await;
                let state = if response.diagnostics.has_errors() && response.state.is_empty() {
                    prior
                } else {
                    response.state
                };
                (Some(state), response.diagnostics)
            }
        };

        let new_state = match new_state {
            Some(mut state) => {
                let schema = resource
                    .schema(SchemaRequest {
                        context: self.context(),
                    })
                    .await
                    .schema;
                schema.conform(&mut state);
                resolve_unknowns(&mut state);
                Some(state)
            }
            None => None,
        };

        Ok(Response::new(proto::apply_resource_change::Response {
            new_state: Some(encode_value(new_state.as_ref())?),
            private: req.planned_private,
            diagnostics: diagnostics_to_proto(diagnostics),
            ..Default::default()
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<proto::import_resource_state::Request>,
    ) -> RpcResult<proto::import_resource_state::Response> {
        let req = request.into_inner();
        let resource = match self.resource(&req.type_name).await {
            Ok(resource) => resource,
            Err(diagnostics) => {
                return Ok(Response::new(proto::import_resource_state::Response {
                    diagnostics,
                    ..Default::default()
                }))
            }
        };

        tracing::info!(type_name = %req.type_name, id = %req.id, "Importing resource");

        let response = resource
            .import_state(ImportRequest {
                context: self.context(),
                id: req.id,
            })
            .await;

        let mut imported_resources = Vec::new();
        if let Some(mut state) = response.state {
            let schema = resource
                .schema(SchemaRequest {
                    context: self.context(),
                })
                .await
                .schema;
            schema.conform(&mut state);
            imported_resources.push(proto::import_resource_state::ImportedResource {
                type_name: req.type_name,
                state: Some(encode_value(Some(&state))?),
                private: vec![],
                identity: None,
            });
        }

        Ok(Response::new(proto::import_resource_state::Response {
            imported_resources,
            diagnostics: diagnostics_to_proto(response.diagnostics),
            deferred: None,
        }))
    }

    async fn move_resource_state(
        &self,
        request: Request<proto::move_resource_state::Request>,
    ) -> RpcResult<proto::move_resource_state::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::move_resource_state::Response {
            diagnostics: error_diagnostics(
                "Move resource state not supported",
                format!(
                    "{} cannot be moved from {}",
                    req.target_type_name, req.source_type_name
                ),
            ),
            ..Default::default()
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> RpcResult<proto::read_data_source::Response> {
        let req = request.into_inner();
        let data_source = match self.data_source(&req.type_name).await {
            Ok(data_source) => data_source,
            Err(diagnostics) => {
                return Ok(Response::new(proto::read_data_source::Response {
                    diagnostics,
                    ..Default::default()
                }))
            }
        };

        let config = decode_value(&req.config)?.unwrap_or_default();
        tracing::debug!(type_name = %req.type_name, "ReadDataSource");

        let response = data_source
            .read(ReadDataSourceRequest {
                context: self.context(),
                config: config.clone(),
            })
            .await;

        let mut state = response.state.unwrap_or(config);
        let schema = data_source
            .schema(SchemaRequest {
                context: self.context(),
            })
            .await
            .schema;
        schema.conform(&mut state);
        resolve_unknowns(&mut state);

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_value(Some(&state))?),
            diagnostics: diagnostics_to_proto(response.diagnostics),
            deferred: None,
        }))
    }

    async fn validate_ephemeral_resource_config(
        &self,
        request: Request<proto::validate_ephemeral_resource_config::Request>,
    ) -> RpcResult<proto::validate_ephemeral_resource_config::Response> {
        let req = request.into_inner();
        Ok(Response::new(
            proto::validate_ephemeral_resource_config::Response {
                diagnostics: unknown_ephemeral(&req.type_name),
            },
        ))
    }

    async fn open_ephemeral_resource(
        &self,
        request: Request<proto::open_ephemeral_resource::Request>,
    ) -> RpcResult<proto::open_ephemeral_resource::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::open_ephemeral_resource::Response {
            diagnostics: unknown_ephemeral(&req.type_name),
            ..Default::default()
        }))
    }

    async fn renew_ephemeral_resource(
        &self,
        request: Request<proto::renew_ephemeral_resource::Request>,
    ) -> RpcResult<proto::renew_ephemeral_resource::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::renew_ephemeral_resource::Response {
            diagnostics: unknown_ephemeral(&req.type_name),
            ..Default::default()
        }))
    }

    async fn close_ephemeral_resource(
        &self,
        request: Request<proto::close_ephemeral_resource::Request>,
    ) -> RpcResult<proto::close_ephemeral_resource::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::close_ephemeral_resource::Response {
            diagnostics: unknown_ephemeral(&req.type_name),
        }))
    }

    async fn get_functions(
        &self,
        _request: Request<proto::get_functions::Request>,
    ) -> RpcResult<proto::get_functions::Response> {
        Ok(Response::new(proto::get_functions::Response::default()))
    }

    async fn call_function(
        &self,
        request: Request<proto::call_function::Request>,
    ) -> RpcResult<proto::call_function::Response> {
        let req = request.into_inner();
        Ok(Response::new(proto::call_function::Response {
            result: None,
            error: Some(proto::FunctionError {
                text: format!("Unknown function: {}", req.name),
                function_argument: None,
            }),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> RpcResult<proto::stop_provider::Response> {
        tracing::info!("StopProvider received, cancelling in-flight operations");
        self.stop.cancel();
        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: true,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

fn value_or_null(value: &DynamicValue, name: &str) -> Dynamic {
    value.values.get(name).cloned().unwrap_or(Dynamic::Null)
}

/// Terraform rejects unknown values after apply; anything the resource did not
/// fill in becomes null
fn resolve_unknowns(state: &mut DynamicValue) {
    fn resolve(value: &mut Dynamic) {
        match value {
            Dynamic::Unknown => *value = Dynamic::Null,
            Dynamic::List(items) => items.iter_mut().for_each(resolve),
            Dynamic::Map(map) => map.values_mut().for_each(resolve),
            _ => {}
        }
    }
    state.values.values_mut().for_each(resolve);
}

#[allow(clippy::result_large_err)]
fn decode_value(
    value: &Option<proto::DynamicValue>,
) -> std::result::Result<Option<DynamicValue>, Status> {
    let Some(value) = value else {
        return Ok(None);
    };

    let decoded = if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack_nullable(&value.msgpack)
    } else {
        DynamicValue::decode_json_nullable(&value.json)
    };
    decoded.map_err(Status::from)
}

#[allow(clippy::result_large_err)]
fn encode_value(value: Option<&DynamicValue>) -> std::result::Result<proto::DynamicValue, Status> {
    let msgpack = match value {
        Some(value) => value.encode_msgpack()?,
        None => DynamicValue::encode_null_msgpack()?,
    };

    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}

fn schemas_to_proto(schemas: &HashMap<String, Schema>) -> HashMap<String, proto::Schema> {
    schemas
        .iter()
        .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
        .collect()
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(block_to_proto(
            schema.version,
            &schema.description,
            &schema.attributes,
            &schema.blocks,
        )),
    }
}

fn block_to_proto(
    version: i64,
    description: &str,
    attributes: &HashMap<String, Attribute>,
    blocks: &HashMap<String, Block>,
) -> proto::schema::Block {
    let mut attributes: Vec<&Attribute> = attributes.values().collect();
    attributes.sort_by(|a, b| a.name.cmp(&b.name));
    let mut blocks: Vec<&Block> = blocks.values().collect();
    blocks.sort_by(|a, b| a.name.cmp(&b.name));

    proto::schema::Block {
        version,
        attributes: attributes.into_iter().map(attribute_to_proto).collect(),
        block_types: blocks.into_iter().map(nested_block_to_proto).collect(),
        description: description.to_string(),
        description_kind: proto::StringKind::Plain as i32,
        deprecated: false,
    }
}

fn attribute_to_proto(attribute: &Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attribute.name.clone(),
        r#type: attribute.r#type.to_json_bytes(),
        nested_type: None,
        description: attribute.description.clone(),
        required: attribute.required,
        optional: attribute.optional,
        computed: attribute.computed,
        sensitive: attribute.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: attribute.deprecated,
        write_only: false,
    }
}

fn nested_block_to_proto(block: &Block) -> proto::schema::NestedBlock {
    use proto::schema::nested_block::NestingMode as ProtoNesting;

    let nesting = match block.nesting {
        NestingMode::Single => ProtoNesting::Single,
        NestingMode::List => ProtoNesting::List,
        NestingMode::Set => ProtoNesting::Set,
    };

    proto::schema::NestedBlock {
        type_name: block.name.clone(),
        block: Some(block_to_proto(
            0,
            &block.description,
            &block.attributes,
            &block.blocks,
        )),
        nesting: nesting as i32,
        min_items: block.min_items,
        max_items: block.max_items,
    }
}

fn attribute_path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::{step::Selector, Step};

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| Step {
                selector: Some(match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                }),
            })
            .collect(),
    }
}

fn diagnostics_to_proto(diagnostics: Diagnostics) -> Vec<proto::Diagnostic> {
    let errors = diagnostics
        .errors
        .into_iter()
        .map(|d| (proto::diagnostic::Severity::Error, d));
    let warnings = diagnostics
        .warnings
        .into_iter()
        .map(|d| (proto::diagnostic::Severity::Warning, d));

    errors
        .chain(warnings)
        .map(|(severity, diag)| proto::Diagnostic {
            severity: severity as i32,
            summary: diag.summary,
            detail: diag.detail.unwrap_or_default(),
            attribute: diag.attribute.as_ref().map(attribute_path_to_proto),
        })
        .collect()
}

fn error_diagnostics(summary: &str, detail: impl Into<String>) -> Vec<proto::Diagnostic> {
    diagnostics_to_proto(Diagnostics::error(summary, detail))
}

fn unknown_ephemeral(type_name: &str) -> Vec<proto::Diagnostic> {
    error_diagnostics(
        "Unknown ephemeral resource type",
        format!("Ephemeral resource {} is not supported", type_name),
    )
}
