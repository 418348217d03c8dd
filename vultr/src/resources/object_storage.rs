//! `vultr_object_storage`

use super::{delete_diagnostics, id_attribute, read_failed, state_id, wait_failed};
use crate::api::object_storage::{ObjectStorage, ObjectStorageCreateRequest, ObjectStorageUpdateRequest};
use crate::api::ApiError;
use crate::wait::{wait_for_object_storage, Transition, OBJECT_STORAGE_TIMEOUT};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::{AttributeBuilder, Diagnostics, ResourceV2, SchemaBuilder};

pub struct ObjectStorageResource {
    data: VultrProviderData,
}

impl ObjectStorageResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("An S3 compatible object storage subscription")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::number("cluster_id")
                    .required()
                    .requires_replace()
                    .description("Object storage cluster hosting the subscription"),
            )
            .attribute(AttributeBuilder::string("label").optional().computed())
            .attribute(AttributeBuilder::string("date_created").computed())
            .attribute(AttributeBuilder::string("region").computed())
            .attribute(AttributeBuilder::string("location").computed())
            .attribute(AttributeBuilder::string("status").computed())
            .attribute(AttributeBuilder::string("s3_hostname").computed())
            .attribute(AttributeBuilder::string("s3_access_key").computed().sensitive())
            .attribute(AttributeBuilder::string("s3_secret_key").computed().sensitive())
            .build()
    }
}

impl ObjectStorageResource {
    /// The clusters on offer when `cluster_id` is not one of them
    async fn unknown_cluster(&self, cluster_id: i64) -> Option<String> {
        let clusters = match self.data.client.object_storage().list_clusters().await {
            Ok(clusters) => clusters,
            Err(e) => {
                tracing::debug!("Could not list object storage clusters: {}", e);
                return None;
            }
        };
        if clusters.iter().any(|cluster| cluster.id == cluster_id) {
            return None;
        }
        Some(
            clusters
                .iter()
                .map(|cluster| format!("{} ({})", cluster.id, cluster.region))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

fn apply_object_storage(storage: &ObjectStorage, state: &mut State) {
    state.set_string("id", &storage.id);
    state.set_i64("cluster_id", storage.cluster_id);
    state.set_string("label", &storage.label);
    state.set_string("date_created", &storage.date_created);
    state.set_string("region", &storage.region);
    state.set_string("location", &storage.location);
    state.set_string("status", &storage.status);
    state.set_string("s3_hostname", &storage.s3_hostname);
    state.set_string("s3_access_key", &storage.s3_access_key);
    state.set_string("s3_secret_key", &storage.s3_secret_key);
}

#[async_trait]
impl ResourceV2 for ObjectStorageResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = ObjectStorageCreateRequest {
            cluster_id: state.get_i64("cluster_id").unwrap_or_default(),
            label: state.get_non_empty_string("label"),
        };

        let created = match self.data.client.object_storage().create(&body).await {
            Ok(storage) => storage,
            Err(e) => {
                let detail = match &e {
                    ApiError::ApiError { .. } => match self.unknown_cluster(body.cluster_id).await {
                        Some(available) => format!(
                            "{}. cluster_id {} is not an object storage cluster, available: {}",
                            e, body.cluster_id, available
                        ),
                        None => e.to_string(),
                    },
                    _ => e.to_string(),
                };
                return CreateResponse {
                    state,
                    diagnostics: Diagnostics::error("Failed to create object storage", detail),
                };
            }
        };
        tracing::info!("Created object storage {} on cluster {}", created.id, body.cluster_id);
        state.set_string("id", &created.id);

        let waited = wait_for_object_storage(
            &request.context,
            &self.data.client,
            &self.data.wait,
            &created.id,
            Transition::new(&["pending"], &["active"], OBJECT_STORAGE_TIMEOUT),
        )
        .await;

        let diagnostics = match waited {
            Ok(storage) => {
                apply_object_storage(&storage, &mut state);
                Diagnostics::new()
            }
            Err(e) => wait_failed("object storage", &created.id, e),
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

        match self.data.client.object_storage().get(&id).await {
            Ok(storage) => {
                apply_object_storage(&storage, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("object storage", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let current = request.current_state;
        let id = match state_id(&current) {
            Ok(id) => id,
            Err(diagnostics) => {
                return UpdateResponse {
                    state: current,
                    diagnostics,
                }
            }
        };

        let api = self.data.client.object_storage();
        let body = ObjectStorageUpdateRequest {
            label: request.planned_state.get_string("label").unwrap_or_default(),
        };
        let result = match api.update(&id, &body).await {
            Ok(()) => api.get(&id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(storage) => {
                let mut state = request.planned_state;
                apply_object_storage(&storage, &mut state);
                UpdateResponse {
                    state,
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => UpdateResponse {
                state: current,
                diagnostics: Diagnostics::error(
                    format!("Failed to update object storage {}", id),
                    e.to_string(),
                ),
            },
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match state_id(&request.current_state) {
            Ok(id) => {
                let result = self.data.client.object_storage().delete(&id).await;
                delete_diagnostics("object storage", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}
