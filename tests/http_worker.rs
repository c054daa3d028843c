// tests/http_worker.rs

//! End-to-end tests for the HTTP executor: a real `httpcmd` worker process
//! talking to a scripted local HTTP server, with the orchestrator relaying
//! cookies through the shared jar.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use cmdrelay::command::{ExecutorOptions, HttpDescriptor, HttpExecutor, SharedCookieJar};
use cmdrelay::cookies::{group_set_cookies, CookieJar};
use cmdrelay::errors::CommandError;
use cmdrelay::protocol::ContentType;

use cmdrelay_test_utils::mock_http::{http_response, MockServer};
use cmdrelay_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn new_jar() -> SharedCookieJar {
    Arc::new(Mutex::new(CookieJar::new()))
}

fn worker_options() -> ExecutorOptions {
    ExecutorOptions {
        worker_binary: Some(PathBuf::from(env!("CARGO_BIN_EXE_httpcmd"))),
        ..Default::default()
    }
}

fn http_executor(url: &str, method: &str, jar: SharedCookieJar) -> HttpExecutor {
    let descriptor = HttpDescriptor {
        url: url.to_string(),
        method: method.to_string(),
        content_type: ContentType::FormUrlencoded,
        data: BTreeMap::new(),
    };
    HttpExecutor::new(descriptor, &worker_options(), jar)
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn follows_redirect_and_delivers_json_result() -> TestResult {
    init_tracing();

    let mut server = MockServer::bind().await?;
    let location = server.url("/b");
    server.serve(vec![
        http_response(302, "Found", &[("location", &location)], ""),
        http_response(
            200,
            "OK",
            &[("content-type", "application/json")],
            r#"{"ok":true}"#,
        ),
    ]);

    let executor = http_executor(&server.url("/a"), "GET", new_jar());
    let handle = executor.exec(&BTreeMap::new())?;
    let result = with_timeout(handle.result()).await;
    assert_eq!(result, Some(json!({"ok": true})));

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("GET /a "), "first hop: {}", requests[0]);
    assert!(requests[1].starts_with("GET /b "), "second hop: {}", requests[1]);
    Ok(())
}

#[tokio::test]
async fn redirect_clears_the_prior_hop_cookie() -> TestResult {
    init_tracing();

    let jar = new_jar();
    let mut server = MockServer::bind().await?;
    jar.lock()
        .await
        .merge(&server.host(), group_set_cookies(["sid=abc; Path=/"]));

    let location = server.url("/b");
    server.serve(vec![
        http_response(302, "Found", &[("location", &location)], ""),
        http_response(200, "OK", &[("content-type", "text/plain")], "done"),
    ]);

    let executor = http_executor(&server.url("/a"), "GET", jar);
    let handle = executor.exec(&BTreeMap::new())?;
    let result = with_timeout(handle.result()).await;
    assert_eq!(result, Some(Value::String("done".into())));

    let requests = server.requests();
    assert!(
        requests[0].to_lowercase().contains("cookie: sid=abc"),
        "first hop should carry the jar cookie: {}",
        requests[0]
    );
    assert!(
        !requests[1].to_lowercase().contains("cookie:"),
        "redirected hop must not reuse the cookie header: {}",
        requests[1]
    );
    Ok(())
}

#[tokio::test]
async fn set_cookie_lands_in_jar_and_on_the_next_request() -> TestResult {
    init_tracing();

    let jar = new_jar();

    let mut first = MockServer::bind().await?;
    first.serve(vec![http_response(
        200,
        "OK",
        &[
            ("content-type", "text/plain"),
            ("set-cookie", "sid=abc; Path=/app"),
        ],
        "ok",
    )]);

    let executor = http_executor(&first.url("/app"), "GET", jar.clone());
    let handle = executor.exec(&BTreeMap::new())?;
    let result = with_timeout(handle.result()).await;
    assert_eq!(result, Some(Value::String("ok".into())));

    assert_eq!(jar.lock().await.get(&first.host(), "/app", "sid"), Some("abc"));

    // A subsequent request to the same domain/path gets the cookie back.
    let mut second = MockServer::bind().await?;
    second.serve(vec![http_response(
        200,
        "OK",
        &[("content-type", "text/plain")],
        "again",
    )]);

    let executor = http_executor(&second.url("/app/settings"), "GET", jar);
    let handle = executor.exec(&BTreeMap::new())?;
    let result = with_timeout(handle.result()).await;
    assert_eq!(result, Some(Value::String("again".into())));

    let requests = second.requests();
    assert!(
        requests[0].to_lowercase().contains("cookie: sid=abc"),
        "jar cookie missing from: {}",
        requests[0]
    );
    Ok(())
}

#[tokio::test]
async fn post_params_merge_defaults_under_call_time_values() -> TestResult {
    init_tracing();

    let mut server = MockServer::bind().await?;
    server.serve(vec![http_response(
        200,
        "OK",
        &[("content-type", "text/plain")],
        "ok",
    )]);

    let descriptor = HttpDescriptor {
        url: server.url("/submit"),
        method: "post".to_string(),
        content_type: ContentType::FormUrlencoded,
        data: params(&[("origin", "gateway"), ("user", "default")]),
    };
    let executor = HttpExecutor::new(descriptor, &worker_options(), new_jar());

    let handle = executor.exec(&params(&[("user", "toha")]))?;
    let result = with_timeout(handle.result()).await;
    assert_eq!(result, Some(Value::String("ok".into())));

    let request = server.requests().remove(0);
    assert!(request.starts_with("POST /submit "), "{request}");
    assert!(request.ends_with("origin=gateway&user=toha"), "{request}");
    assert!(
        request
            .to_lowercase()
            .contains("content-type: application/x-www-form-urlencoded"),
        "{request}"
    );
    Ok(())
}

#[tokio::test]
async fn redirect_without_location_yields_no_result() -> TestResult {
    init_tracing();

    let mut server = MockServer::bind().await?;
    server.serve(vec![http_response(302, "Found", &[], "")]);

    let executor = http_executor(&server.url("/a"), "GET", new_jar());
    let handle = executor.exec(&BTreeMap::new())?;
    let result = with_timeout(handle.result()).await;
    assert_eq!(result, None);

    // No second hop was attempted.
    assert_eq!(server.requests().len(), 1);
    Ok(())
}

#[tokio::test]
async fn transport_error_yields_no_result() -> TestResult {
    init_tracing();

    // Bind to learn a free port, then close the listener again.
    let server = MockServer::bind().await?;
    let url = server.url("/x");
    drop(server);

    let executor = http_executor(&url, "GET", new_jar());
    let handle = executor.exec(&BTreeMap::new())?;
    let result = with_timeout(handle.result()).await;
    assert_eq!(result, None);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_is_synchronous() -> TestResult {
    init_tracing();

    let options = ExecutorOptions {
        worker_binary: Some(PathBuf::from("/nonexistent/httpcmd")),
        ..Default::default()
    };
    let descriptor = HttpDescriptor {
        url: "http://localhost:1/".to_string(),
        method: "GET".to_string(),
        content_type: ContentType::FormUrlencoded,
        data: BTreeMap::new(),
    };
    let executor = HttpExecutor::new(descriptor, &options, new_jar());

    let err = executor.exec(&BTreeMap::new()).unwrap_err();
    assert!(matches!(err, CommandError::SpawnFailure { .. }));
    Ok(())
}
