//! Remote `$ref` resolution by [`JsonSchemaCheck`] against a wiremock host.
//!
//! Schema compilation makes blocking requests, so each check runs on a
//! blocking thread while the test runtime serves the mock.

use std::time::{Duration, Instant};

use mcpreg_schema::{CheckError, FetchConfig, JsonSchemaCheck, SchemaCheck};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NAME_SCHEMA_PATH: &str = "/schemas/name.schema.json";

fn schema_with_name_ref(server: &MockServer) -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "properties": {
            "name": {"$ref": format!("{}{NAME_SCHEMA_PATH}", server.uri())}
        }
    })
}

async fn check(config: FetchConfig, document: Value, schema: Value) -> Result<(), CheckError> {
    tokio::task::spawn_blocking(move || JsonSchemaCheck::new(config).check(&document, &schema))
        .await
        .unwrap()
}

#[tokio::test]
async fn remote_ref_is_fetched_and_applied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NAME_SCHEMA_PATH))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": "string"})))
        .expect(1..)
        .mount(&server)
        .await;
    let schema = schema_with_name_ref(&server);

    check(FetchConfig::default(), json!({"name": "weather"}), schema.clone())
        .await
        .unwrap();

    match check(FetchConfig::default(), json!({"name": 7}), schema).await {
        Err(CheckError::DocumentInvalid(violation)) => {
            assert_eq!(violation.display_path(), "name");
            assert_eq!(violation.message, r#"7 is not of type "string""#);
        }
        other => panic!("expected DocumentInvalid, got: {other:?}"),
    }
}

#[tokio::test]
async fn slow_remote_ref_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NAME_SCHEMA_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"type": "string"}))
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;

    let config = FetchConfig {
        timeout: Duration::from_secs(1),
        ..FetchConfig::default()
    };
    let started = Instant::now();
    let result = check(config, json!({"name": "weather"}), schema_with_name_ref(&server)).await;
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    match result {
        Err(CheckError::SchemaFetch { url, reason }) => {
            assert_eq!(url, format!("{}{NAME_SCHEMA_PATH}", server.uri()));
            assert!(reason.contains("timed out"), "reason: {reason}");
        }
        other => panic!("expected SchemaFetch, got: {other:?}"),
    }
}

#[tokio::test]
async fn missing_remote_ref_is_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NAME_SCHEMA_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = check(
        FetchConfig::default(),
        json!({"name": "weather"}),
        schema_with_name_ref(&server),
    )
    .await;

    assert!(
        matches!(&result, Err(CheckError::SchemaFetch { reason, .. }) if reason.starts_with("HTTP 404")),
        "got: {result:?}"
    );
}

#[tokio::test]
async fn remote_ref_redirects_are_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(NAME_SCHEMA_PATH))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", NAME_SCHEMA_PATH),
        )
        .mount(&server)
        .await;

    let config = FetchConfig {
        max_redirects: 2,
        ..FetchConfig::default()
    };
    let result = check(config, json!({"name": "weather"}), schema_with_name_ref(&server)).await;

    assert!(
        matches!(&result, Err(CheckError::SchemaFetch { reason, .. }) if reason.contains("redirect")),
        "got: {result:?}"
    );
}
