//! `vultr_database`
//!
//! Managed database clusters report `Rebuilding` while they provision or
//! change plan and `Running` once usable.

use super::{changed, delete_diagnostics, id_attribute, read_failed, state_id, wait_failed};
use crate::api::databases::{Database, DatabaseCreateRequest, DatabaseUpdateRequest};
use crate::wait::{wait_for_database, Transition, DATABASE_TIMEOUT};
use crate::VultrProviderData;
use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::provider::ResourceSchema;
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    ResourceSchemaResponse, SchemaRequest, UpdateRequest, UpdateResponse,
};
use tfplug::types::State;
use tfplug::validator::{OneOfValidator, StringPatternValidator};
use tfplug::{AttributeBuilder, AttributeType, Diagnostics, ResourceV2, SchemaBuilder};

const WEEKDAYS: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

fn maintenance_time() -> AttributeBuilder {
    let attribute = AttributeBuilder::string("maintenance_time")
        .optional()
        .computed()
        .description("Start of the maintenance window as HH:MM");

    match StringPatternValidator::new(r"^([01]\d|2[0-3]):[0-5]\d$", "HH:MM") {
        Ok(validator) => attribute.validator(validator),
        Err(_) => attribute,
    }
}

pub struct DatabaseResource {
    data: VultrProviderData,
}

impl DatabaseResource {
    pub fn new(data: VultrProviderData) -> Self {
        Self { data }
    }

    pub fn schema_static() -> ResourceSchema {
        SchemaBuilder::new()
            .version(0)
            .description("A managed database cluster")
            .attribute(id_attribute())
            .attribute(
                AttributeBuilder::string("database_engine")
                    .required()
                    .requires_replace()
                    .validator(OneOfValidator::new(["mysql", "pg", "redis", "kafka"])),
            )
            .attribute(
                AttributeBuilder::string("database_engine_version")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("region")
                    .required()
                    .requires_replace(),
            )
            .attribute(
                AttributeBuilder::string("plan")
                    .required()
                    .description("Changing the plan migrates the cluster in place"),
            )
            .attribute(AttributeBuilder::string("label").required())
            .attribute(AttributeBuilder::string("tag").optional().computed())
            .attribute(AttributeBuilder::string("vpc_id").optional().computed())
            .attribute(
                AttributeBuilder::string("maintenance_dow")
                    .optional()
                    .computed()
                    .validator(OneOfValidator::new(WEEKDAYS)),
            )
            .attribute(maintenance_time())
            .attribute(
                AttributeBuilder::list("trusted_ips", AttributeType::String)
                    .optional()
                    .computed(),
            )
            .attribute(AttributeBuilder::string("date_created").computed())
            .attribute(AttributeBuilder::number("plan_disk").computed())
            .attribute(AttributeBuilder::number("plan_ram").computed())
            .attribute(AttributeBuilder::number("plan_vcpus").computed())
            .attribute(AttributeBuilder::number("plan_replicas").computed())
            .attribute(AttributeBuilder::string("status").computed())
            .attribute(AttributeBuilder::string("dbname").computed())
            .attribute(AttributeBuilder::string("host").computed())
            .attribute(AttributeBuilder::string("user").computed())
            .attribute(AttributeBuilder::string("password").computed().sensitive())
            .attribute(AttributeBuilder::string("port").computed())
            .attribute(AttributeBuilder::string("latest_backup").computed())
            .attribute(AttributeBuilder::string("cluster_time_zone").computed())
            .build()
    }

    async fn wait_running(&self, ctx: &Context, id: &str) -> Result<Database, Diagnostics> {
        wait_for_database(
            ctx,
            &self.data.client,
            &self.data.wait,
            id,
            Transition::new(&["Rebuilding"], &["Running"], DATABASE_TIMEOUT),
        )
        .await
        .map_err(|e| wait_failed("database", id, e))
    }
}

fn apply_database(db: &Database, state: &mut State) {
    state.set_string("id", &db.id);
    state.set_string("database_engine", &db.database_engine);
    state.set_string("database_engine_version", &db.database_engine_version);
    state.set_string("region", &db.region);
    state.set_string("plan", &db.plan);
    state.set_string("label", &db.label);
    state.set_string("tag", &db.tag);
    state.set_string("vpc_id", &db.vpc_id);
    state.set_string("maintenance_dow", &db.maintenance_dow);
    state.set_string("maintenance_time", &db.maintenance_time);
    state.set_string_list("trusted_ips", db.trusted_ips.iter().cloned());
    state.set_string("date_created", &db.date_created);
    state.set_i64("plan_disk", db.plan_disk);
    state.set_i64("plan_ram", db.plan_ram);
    state.set_i64("plan_vcpus", db.plan_vcpus);
    state.set_i64("plan_replicas", db.plan_replicas);
    state.set_string("status", &db.status);
    state.set_string("dbname", &db.dbname);
    state.set_string("host", &db.host);
    state.set_string("user", &db.user);
    state.set_string("password", &db.password);
    state.set_string("port", &db.port);
    state.set_string("latest_backup", &db.latest_backup);
    state.set_string("cluster_time_zone", &db.cluster_time_zone);
}

#[async_trait]
impl ResourceV2 for DatabaseResource {
    async fn schema(&self, _request: SchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: Diagnostics::new(),
        }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut state = request.planned_state;
        let body = DatabaseCreateRequest {
            database_engine: state.get_string("database_engine").unwrap_or_default(),
            database_engine_version: state.get_string("database_engine_version").unwrap_or_default(),
            region: state.get_string("region").unwrap_or_default(),
            plan: state.get_string("plan").unwrap_or_default(),
            label: state.get_string("label").unwrap_or_default(),
            tag: state.get_non_empty_string("tag"),
            vpc_id: state.get_non_empty_string("vpc_id"),
            maintenance_dow: state.get_non_empty_string("maintenance_dow"),
            maintenance_time: state.get_non_empty_string("maintenance_time"),
            trusted_ips: state.get_string_list("trusted_ips"),
        };

        let db = match self.data.client.databases().create(&body).await {
            Ok(db) => db,
            Err(e) => {
                return CreateResponse {
                    state,
                    diagnostics: Diagnostics::error("Failed to create database", e.to_string()),
                }
            }
        };
        tracing::info!("Created {} database {}", db.database_engine, db.id);
        state.set_string("id", &db.id);

        let diagnostics = match self.wait_running(&request.context, &db.id).await {
            Ok(db) => {
                apply_database(&db, &mut state);
                Diagnostics::new()
            }
            Err(diagnostics) => diagnostics,
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

        match self.data.client.databases().get(&id).await {
            Ok(db) => {
                apply_database(&db, &mut state);
                ReadResponse {
                    state: Some(state),
                    diagnostics: Diagnostics::new(),
                }
            }
            Err(e) => read_failed("database", &id, e, state),
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let current = request.current_state;
        let planned = request.planned_state;
        let id = match state_id(&current) {
            Ok(id) => id,
            Err(diagnostics) => {
                return UpdateResponse {
                    state: current,
                    diagnostics,
                }
            }
        };

        let field = |name: &str| changed(planned.get_string(name), current.get_string(name));
        let trusted_ips = planned
            .get("trusted_ips")
            .map(|_| planned.get_string_list("trusted_ips"))
            .filter(|ips| *ips != current.get_string_list("trusted_ips"));
        let body = DatabaseUpdateRequest {
            plan: field("plan"),
            label: field("label"),
            tag: field("tag"),
            vpc_id: field("vpc_id"),
            maintenance_dow: field("maintenance_dow"),
            maintenance_time: field("maintenance_time"),
            trusted_ips,
        };

        let updated = match self.data.client.databases().update(&id, &body).await {
            Ok(db) => db,
            Err(e) => {
                return UpdateResponse {
                    state: current,
                    diagnostics: Diagnostics::error(
                        format!("Failed to update database {}", id),
                        e.to_string(),
                    ),
                }
            }
        };

        let db = if body.plan.is_some() {
            tracing::info!("Database {} is moving to plan {}", id, updated.plan);
            match self.wait_running(&request.context, &id).await {
                Ok(db) => db,
                Err(diagnostics) => {
                    return UpdateResponse {
                        state: current,
                        diagnostics,
                    }
                }
            }
        } else {
            updated
        };

        let mut state = planned;
        apply_database(&db, &mut state);
        UpdateResponse {
            state,
            diagnostics: Diagnostics::new(),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let diagnostics = match state_id(&request.current_state) {
            Ok(id) => {
                let result = self.data.client.databases().delete(&id).await;
                delete_diagnostics("database", &id, result)
            }
            Err(diagnostics) => diagnostics,
        };
        DeleteResponse { diagnostics }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::databases::tests::database_json;
    use crate::api::test_helpers::{create_test_data, json_response};
    use mockito::{Matcher, Server};

    const HOBBYIST: &str = "vultr-dbaas-hobbyist-cc-1-25-1";
    const STARTUP: &str = "vultr-dbaas-startup-cc-1-55-2";

    fn current() -> State {
        let mut state = State::new();
        state.set_string("id", "db-1");
        state.set_string("plan", HOBBYIST);
        state.set_string("label", "app-db");
        state.set_string("maintenance_dow", "sunday");
        state.set_string_list("trusted_ips", Vec::<String>::new());
        state
    }

    #[tokio::test]
    async fn create_waits_for_running() {
        let mut server = Server::new_async().await;
        let create = json_response(&mut server, "POST", "/databases", 202, &database_json("Rebuilding", HOBBYIST))
            .match_body(Matcher::Json(serde_json::json!({
                "database_engine": "pg",
                "database_engine_version": "15",
                "region": "ewr",
                "plan": HOBBYIST,
                "label": "app-db",
                "trusted_ips": ["203.0.113.4/32"]
            })))
            .create_async()
            .await;
        let _rebuilding = json_response(&mut server, "GET", "/databases/db-1", 200, &database_json("Rebuilding", HOBBYIST))
            .expect(2)
            .create_async()
            .await;
        let _running = json_response(&mut server, "GET", "/databases/db-1", 200, &database_json("Running", HOBBYIST))
            .create_async()
            .await;

        let mut planned = State::new();
        planned.set_string("database_engine", "pg");
        planned.set_string("database_engine_version", "15");
        planned.set_string("region", "ewr");
        planned.set_string("plan", HOBBYIST);
        planned.set_string("label", "app-db");
        planned.set_string_list("trusted_ips", ["203.0.113.4/32"]);

        let resource = DatabaseResource::new(create_test_data(&server.url()));
        let response = resource
            .create(CreateRequest {
                context: Context::new(),
                config: planned.clone(),
                planned_state: planned,
            })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        assert_eq!(response.state.get_string("status").as_deref(), Some("Running"));
        assert_eq!(response.state.get_string("password").as_deref(), Some("s3cret"));
        create.assert_async().await;
    }

    #[tokio::test]
    async fn label_change_does_not_wait() {
        let mut server = Server::new_async().await;
        let put = json_response(&mut server, "PUT", "/databases/db-1", 202, &database_json("Running", HOBBYIST))
            .match_body(Matcher::Json(serde_json::json!({"label": "app-db-2"})))
            .create_async()
            .await;
        let get = server
            .mock("GET", "/databases/db-1")
            .expect(0)
            .create_async()
            .await;

        let mut planned = current();
        planned.set_string("label", "app-db-2");

        let resource = DatabaseResource::new(create_test_data(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: Context::new(),
                config: planned.clone(),
                planned_state: planned,
                current_state: current(),
            })
            .await;

        assert!(!response.diagnostics.has_errors());
        put.assert_async().await;
        get.assert_async().await;
    }

    #[tokio::test]
    async fn plan_change_waits_for_migration() {
        let mut server = Server::new_async().await;
        let put = json_response(&mut server, "PUT", "/databases/db-1", 202, &database_json("Rebuilding", STARTUP))
            .match_body(Matcher::Json(serde_json::json!({"plan": STARTUP})))
            .create_async()
            .await;
        let _rebuilding = json_response(&mut server, "GET", "/databases/db-1", 200, &database_json("Rebuilding", STARTUP))
            .expect(1)
            .create_async()
            .await;
        let _running = json_response(&mut server, "GET", "/databases/db-1", 200, &database_json("Running", STARTUP))
            .create_async()
            .await;

        let mut planned = current();
        planned.set_string("plan", STARTUP);

        let resource = DatabaseResource::new(create_test_data(&server.url()));
        let response = resource
            .update(UpdateRequest {
                context: Context::new(),
                config: planned.clone(),
                planned_state: planned,
                current_state: current(),
            })
            .await;

        assert!(!response.diagnostics.has_errors(), "{:?}", response.diagnostics);
        assert_eq!(response.state.get_string("plan").as_deref(), Some(STARTUP));
        assert_eq!(response.state.get_string("status").as_deref(), Some("Running"));
        put.assert_async().await;
    }
}
