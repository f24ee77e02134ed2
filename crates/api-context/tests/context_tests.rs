use api_context::{ApiContext, ContextConfig, ExpectedValue, Payload};
use mock_server::{CannedResponse, MockServer};
use serde_json::{json, Value};

fn context_for(server: &MockServer) -> ApiContext {
    ApiContext::new(ContextConfig {
        base_url: server.url(),
        ..ContextConfig::default()
    })
}

#[tokio::test]
async fn created_users_are_deleted_on_tear_down() {
    let server = MockServer::start().await.unwrap();
    server.respond_once("GET", "/ocs/v2.php/cloud/users/alice", CannedResponse::json(404, "{}"));
    let mut ctx = context_for(&server);

    ctx.assure_user_exists("alice").await.unwrap();
    assert_eq!(ctx.created_users(), ["alice".to_string()]);

    let create = &server.requests()[1];
    assert_eq!(create.method, "POST");
    assert_eq!(create.form.get("userid").map(String::as_str), Some("alice"));
    assert_eq!(create.form.get("password").map(String::as_str), Some("123456"));

    ctx.tear_down().await;
    assert!(ctx.created_users().is_empty());
    let last = server.last_request().unwrap();
    assert_eq!(last.method, "DELETE");
    assert_eq!(last.uri, "/ocs/v2.php/cloud/users/alice");
}

#[tokio::test]
async fn failed_creation_is_reported() {
    let server = MockServer::start().await.unwrap();
    server.respond_with("GET", "/ocs/v2.php/cloud/users/*", CannedResponse::json(404, "{}"));
    server.respond_with("POST", "/ocs/v2.php/cloud/users", CannedResponse::json(400, "{}"));
    let mut ctx = context_for(&server);

    let err = ctx.assure_user_exists("bob").await.unwrap_err();
    assert!(err.to_string().starts_with("Failed to create user"));
    assert!(ctx.created_users().is_empty());
}

#[tokio::test]
async fn first_login_failure_is_reported() {
    let server = MockServer::start().await.unwrap();
    server.respond_with("GET", "/ocs/v2.php/cloud/users/*", CannedResponse::json(404, "{}"));
    let mut ctx = context_for(&server);

    let err = ctx.assure_user_exists("carol").await.unwrap_err();
    assert!(err.to_string().starts_with("Failed to do first login"));
    assert_eq!(ctx.current_user(), None);
}

#[tokio::test]
async fn status_mismatch_reports_the_body() {
    let server = MockServer::start().await.unwrap();
    server.respond_with("GET", "/index.php/apps/missing", CannedResponse::html(404, "Page not found"));
    let mut ctx = context_for(&server);

    let response = ctx.send_request("get", "/apps/missing", None, Vec::new()).await.unwrap();
    assert_eq!(response.status, 404);

    let err = ctx.assert_status(200).unwrap_err();
    assert!(err.to_string().starts_with("Page not found"));
    ctx.assert_status(404).unwrap();
}

#[tokio::test]
async fn missing_keys_name_the_response() {
    let server = MockServer::start().await.unwrap();
    let mut ctx = context_for(&server);

    ctx.send_ocs_request("get", "/cloud/capabilities", None).await.unwrap();
    let err = ctx
        .assert_json_values(&[ExpectedValue::new("capabilities", "{}")])
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Not found: \"capabilities\" at array:"));

    let err = ctx.fetch_field("headers.x-missing").await.unwrap_err();
    assert!(err.to_string().starts_with("Key [x-missing] of path [headers.x-missing]"));
}

#[tokio::test]
async fn captured_quotes_stay_inside_json_cells() {
    let server = MockServer::start().await.unwrap();
    let person = json!({"name": "O\"Brien"}).to_string();
    server.respond_with("GET", "/index.php/apps/person", CannedResponse::json(200, person));
    server.respond_with("POST", "/index.php/apps/echo", CannedResponse::json(200, "{}"));
    let mut ctx = context_for(&server);

    ctx.send_request("get", "/apps/person", None, Vec::new()).await.unwrap();
    ctx.fetch_field("(name)name").await.unwrap();

    let mut payload = Payload::new();
    payload.insert("data".to_string(), Value::String(r#"{"name":"<name>"}"#.to_string()));
    ctx.send_request("post", "/apps/echo", Some(payload), Vec::new()).await.unwrap();

    let sent = server.last_request().unwrap();
    assert!(sent.header("content-type").unwrap_or_default().starts_with("application/json"));
    assert_eq!(sent.json(), Some(json!({"data": {"name": "O\"Brien"}})));
}

#[tokio::test]
async fn acting_user_sends_a_single_authorization_header() {
    let server = MockServer::start().await.unwrap();
    let mut ctx = context_for(&server);
    ctx.set_custom_header("Authorization", "Bearer tok");

    ctx.send_request("get", "/apps/files", None, Vec::new()).await.unwrap();
    assert_eq!(server.last_request().unwrap().header("authorization"), Some("Bearer tok"));

    ctx.set_current_user("alice");
    ctx.send_request("get", "/apps/files", None, Vec::new()).await.unwrap();
    assert_eq!(
        server.last_request().unwrap().header("authorization"),
        Some("Basic YWxpY2U6MTIzNDU2")
    );

    let sent = ctx.last_request().unwrap();
    let authorization: Vec<_> = sent
        .headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("authorization"))
        .collect();
    assert_eq!(authorization.len(), 1, "headers: {:?}", sent.headers);
}
