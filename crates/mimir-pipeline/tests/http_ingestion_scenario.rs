//! §8 Scenario 1: `http_request` -> `parse_json` against a stubbed HTTP
//! response, executed end to end through `PipelineEngine::execute`.

use std::sync::Arc;

use mimir_pipeline::{from_toml, PipelineEngine};
use mimir_plugin::{DefaultPlugin, Registry};
use mimir_types::{ExecutionStatus, TriggerType};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn http_ingestion_then_parse_json_populates_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 42})))
        .mount(&server)
        .await;

    let toml = format!(
        r#"
        [pipeline]
        name = "ingest"
        type = "ingestion"

        [[pipeline.steps]]
        name = "A"
        plugin = "default"
        action = "http_request"
        config = {{ url = "{}/x" }}

        [[pipeline.steps]]
        name = "B"
        plugin = "default"
        action = "parse_json"
        config = {{ data = "{{{{context.A.response.body}}}}" }}
        "#,
        server.uri()
    );
    let def = from_toml(&toml).unwrap();

    let registry = Registry::new();
    registry.register(Arc::new(DefaultPlugin::new())).unwrap();
    let engine = PipelineEngine::new(Arc::new(registry));

    let exec = engine
        .execute(&def, TriggerType::Manual, "test", Default::default())
        .await;

    assert_eq!(exec.status, ExecutionStatus::Completed);
    let snapshot = exec.final_context.unwrap();
    assert_eq!(snapshot["B"]["parsed"], serde_json::json!({"id": 42}));
}
