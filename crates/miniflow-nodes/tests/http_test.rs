// crates/miniflow-nodes/tests/http_test.rs

use miniflow_core::{keys, EventEmitter, ExecutionContext, Node, NodeContext, NodeError, NodeSpec, Value};
use miniflow_nodes::HttpRequestNode;
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run(spec: &NodeSpec, vars: &mut ExecutionContext) -> Result<(), NodeError> {
    let node = HttpRequestNode::new();
    let mut ctx = NodeContext::new(spec, vars, EventEmitter::detached(spec.id.clone()));
    node.execute(&mut ctx).await
}

fn object(pairs: &[(&str, &str)]) -> Value {
    let map: HashMap<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect();
    Value::Object(map)
}

#[tokio::test]
async fn test_retries_primary_then_uses_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/primary"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fallback"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/never"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", format!("{}/primary", server.uri()))
        .with_config(
            "fallbackUrls",
            Value::Array(vec![
                Value::from(format!("{}/fallback", server.uri())),
                Value::from(format!("{}/never", server.uri())),
            ]),
        )
        .with_config("retries", 2i64);

    let mut vars = ExecutionContext::new();
    run(&spec, &mut vars).await.unwrap();

    assert_eq!(vars.get(keys::STATUS), Some(&Value::Integer(200)));
    assert_eq!(vars.get(keys::HTTP_STATUS), Some(&Value::Integer(200)));
    assert_eq!(vars.get(keys::HTTP_BODY), Some(&Value::from("ok")));
    // expectations are verified when the server drops
}

#[tokio::test]
async fn test_timeouts_retry_primary_then_use_fallback() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fallback"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"payload": "7"}"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/never"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", format!("{}/slow", server.uri()))
        .with_config(
            "fallbackUrls",
            Value::Array(vec![
                Value::from(format!("{}/fallback", server.uri())),
                Value::from(format!("{}/never", server.uri())),
            ]),
        )
        .with_config("retries", 2i64)
        .with_config("timeoutMs", 200i64)
        .with_config("map", object(&[("d", "$.payload")]));

    let mut vars = ExecutionContext::new();
    run(&spec, &mut vars).await.unwrap();

    assert_eq!(vars.get(keys::STATUS), Some(&Value::Integer(200)));
    assert_eq!(vars.get("d"), Some(&Value::Integer(7)));
    server.verify().await;
}

#[tokio::test]
async fn test_output_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"id": "17", "name": "Ana"},
            "meta": {"page": {"size": "2.5"}}
        })))
        .mount(&server)
        .await;

    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", format!("{}/user", server.uri()))
        .with_config(
            "outputMapping",
            object(&[
                ("userId", "$.data.id"),
                ("size", "$.meta.page.size"),
                ("code", "$.status"),
                ("raw", "$.body"),
                ("nothing", "$.meta.missing"),
            ]),
        );

    let mut vars = ExecutionContext::new();
    run(&spec, &mut vars).await.unwrap();

    assert_eq!(vars.get("userId"), Some(&Value::Integer(17)));
    assert_eq!(vars.get("size"), Some(&Value::Float(2.5)));
    assert_eq!(vars.get("code"), Some(&Value::Integer(200)));
    assert!(vars.get("raw").unwrap().to_string().contains("\"name\""));
    assert_eq!(vars.get("nothing"), Some(&Value::Null));
}

#[tokio::test]
async fn test_post_sends_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/items"))
        .and(header("x-token", "abc"))
        .and(body_string("hello"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", format!("{}/items", server.uri()))
        .with_config("method", "post")
        .with_config("headers", object(&[("X-Token", "abc")]))
        .with_config("body", "hello");

    let mut vars = ExecutionContext::new();
    run(&spec, &mut vars).await.unwrap();
    assert_eq!(vars.get(keys::STATUS), Some(&Value::Integer(201)));
}

#[tokio::test]
async fn test_error_status_fails_under_default_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"data\": 1}"))
        .expect(1)
        .mount(&server)
        .await;

    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", format!("{}/missing", server.uri()))
        .with_config("outputMapping", object(&[("d", "$.data")]));

    let mut vars = ExecutionContext::new();
    let err = run(&spec, &mut vars).await.unwrap_err();

    assert_eq!(
        err,
        NodeError::HttpStatus {
            status: 404,
            url: format!("{}/missing", server.uri())
        }
    );
    assert_eq!(vars.get(keys::STATUS), Some(&Value::Integer(404)));
    // mapping only runs for accepted responses
    assert!(vars.get("d").is_none());
}

#[tokio::test]
async fn test_error_status_tolerated_by_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", server.uri())
        .with_config("onError", "continue_on_fail")
        .with_config("retries", 4i64);

    let mut vars = ExecutionContext::new();
    run(&spec, &mut vars).await.unwrap();
    assert_eq!(vars.get(keys::HTTP_STATUS), Some(&Value::Integer(503)));
}

#[tokio::test]
async fn test_transport_failure_exhausts_all_urls() {
    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", "http://127.0.0.1:1/down")
        .with_config("fallbackUrls", Value::Array(vec![Value::from("http://127.0.0.1:1/also-down")]))
        .with_config("retries", 1i64)
        .with_config("timeoutMs", 500i64);

    let mut vars = ExecutionContext::new();
    let err = run(&spec, &mut vars).await.unwrap_err();

    assert_eq!(err.kind(), "TransportError");
    assert!(err.message().contains("also-down"));
    assert_eq!(vars.get(keys::STATUS), Some(&Value::Integer(0)));
}

#[tokio::test]
async fn test_invalid_config_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut vars = ExecutionContext::new();

    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", server.uri())
        .with_config("method", "GE T");
    assert_eq!(run(&spec, &mut vars).await.unwrap_err().kind(), "ConfigurationError");

    let spec = NodeSpec::new("h", "HttpRequest")
        .with_config("url", server.uri())
        .with_config("timeoutMs", "soon");
    assert_eq!(run(&spec, &mut vars).await.unwrap_err().kind(), "ConfigurationError");

    let spec = NodeSpec::new("h", "HttpRequest").with_config("url", "   ");
    assert_eq!(
        run(&spec, &mut vars).await.unwrap_err().message(),
        "Missing url in node config"
    );
}
