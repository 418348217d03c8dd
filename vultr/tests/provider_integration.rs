#![allow(clippy::disallowed_methods)]

use mockito::{Matcher, Server};
use serial_test::serial;
use tfplug::context::Context;
use tfplug::request::{
    ConfigureRequest, CreateRequest, DeleteRequest, ImportRequest, ReadDataSourceRequest,
    ReadRequest,
};
use tfplug::types::{Config, DynamicValue, State};
use tfplug::{DataSourceV2, ProviderV2, ResourceV2};
use vultr::VultrProvider;

const API_KEY: &str = "integration-key";
const PUBLIC_KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIB deploy@ci";

async fn configured_provider(server: &Server) -> VultrProvider {
    std::env::set_var("VULTR_API_ENDPOINT", server.url());
    std::env::remove_var("VULTR_API_KEY");

    let mut config = Config::new();
    config.set_string("api_key", API_KEY);
    config.set_i64("rate_limit", 0);
    config.set_i64("retry_limit", 0);

    let mut provider = VultrProvider::new();
    let response = provider
        .configure(ConfigureRequest {
            context: Context::new(),
            config,
        })
        .await;
    assert!(!response.diagnostics.has_errors());

    std::env::remove_var("VULTR_API_ENDPOINT");
    provider
}

fn bearer() -> String {
    format!("Bearer {}", API_KEY)
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn ssh_key_lifecycle_against_mock_api() {
    let mut server = Server::new_async().await;
    let key_json = format!(
        r#"{{"ssh_key": {{"id": "key-1", "date_created": "2024-01-01T00:00:00+00:00",
            "name": "deploy", "ssh_key": "{}"}}}}"#,
        PUBLIC_KEY
    );

    let create = server
        .mock("POST", "/ssh-keys")
        .match_header("authorization", bearer().as_str())
        .match_body(Matcher::PartialJson(serde_json::json!({"name": "deploy"})))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(&key_json)
        .create_async()
        .await;
    let _get = server
        .mock("GET", "/ssh-keys/key-1")
        .match_header("authorization", bearer().as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(&key_json)
        .create_async()
        .await;
    let delete = server
        .mock("DELETE", "/ssh-keys/key-1")
        .with_status(204)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let resource = provider.create_resource("vultr_ssh_key").await.unwrap();

    let mut planned = State::new();
    planned.set_string("name", "deploy");
    planned.set_string("ssh_key", PUBLIC_KEY);
    let created = resource
        .create(CreateRequest {
            context: Context::new(),
            config: planned.clone(),
            planned_state: planned,
        })
        .await;
    assert!(!created.diagnostics.has_errors());
    assert_eq!(created.state.get_string("id").as_deref(), Some("key-1"));

    let imported = resource
        .import_state(ImportRequest {
            context: Context::new(),
            id: "key-1".to_string(),
        })
        .await;
    let read = resource
        .read(ReadRequest {
            context: Context::new(),
            current_state: imported.state.unwrap(),
        })
        .await;
    let read_state = read.state.unwrap();
    assert_eq!(read_state.get_string("name").as_deref(), Some("deploy"));
    assert_eq!(read_state.get_string("ssh_key").as_deref(), Some(PUBLIC_KEY));

    let deleted = resource
        .delete(DeleteRequest {
            context: Context::new(),
            current_state: read_state,
        })
        .await;
    assert!(!deleted.diagnostics.has_errors());

    create.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn plan_lookup_through_data_source() {
    let mut server = Server::new_async().await;
    let _plans = server
        .mock("GET", "/plans?per_page=100")
        .match_header("authorization", bearer().as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"plans": [
                {"id": "vc2-1c-1gb", "vcpu_count": 1, "ram": 1024, "disk": 25, "disk_count": 1,
                 "bandwidth": 1024, "monthly_cost": 5, "type": "vc2", "locations": ["ewr"]},
                {"id": "vc2-2c-4gb", "vcpu_count": 2, "ram": 4096, "disk": 80, "disk_count": 1,
                 "bandwidth": 3072, "monthly_cost": 20, "type": "vc2", "locations": ["ewr", "ams"]}
            ], "meta": {"total": 2, "links": {"next": "", "prev": ""}}}"#,
        )
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let data_source = provider.create_data_source("vultr_plan").await.unwrap();

    let mut filter = DynamicValue::new();
    filter.set_string("name", "locations");
    filter.set_string_list("values", ["ams"]);
    let mut config = Config::new();
    config.set_blocks("filter", vec![filter]);

    let response = data_source
        .read(ReadDataSourceRequest {
            context: Context::new(),
            config,
        })
        .await;

    assert!(!response.diagnostics.has_errors());
    let state = response.state.unwrap();
    assert_eq!(state.get_string("id").as_deref(), Some("vc2-2c-4gb"));
    assert_eq!(state.get_i64("vcpu_count"), Some(2));
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn rejected_api_key_surfaces_as_diagnostic() {
    let mut server = Server::new_async().await;
    let _account = server
        .mock("GET", "/account")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "Invalid API token.", "status": 401}"#)
        .create_async()
        .await;

    let provider = configured_provider(&server).await;
    let data_source = provider.create_data_source("vultr_account").await.unwrap();
    let response = data_source
        .read(ReadDataSourceRequest {
            context: Context::new(),
            config: Config::new(),
        })
        .await;

    assert!(response.state.is_none());
    assert!(response.diagnostics.has_errors());
}
