use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use server::{config::AppConfig, http::build_router, state_with_store};
use suite_tests::TestCrm;
use tower::ServiceExt;

async fn app() -> Router {
    let crm = TestCrm::new().await;
    build_router(state_with_store(crm.store, AppConfig::default()))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_client(app: &Router, company: &str) -> i64 {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/marketing/clients",
        Some(json!({
            "employeeID": 1,
            "company_name": company,
            "customer_name": "Buyer",
            "contacts": [{"name": "Asha", "phone": "98400"}]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn create_append_list_and_count() {
    let app = app().await;
    let id = create_client(&app, "Acme").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/marketing/followups",
        Some(json!({
            "clientID": id,
            "employeeID": 1,
            "status": "first_followup",
            "remarks": "called",
            "nextFollowupDate": "2025-03-05"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["followupId"].as_i64().is_some());

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/marketing/followups?status=first_followup&asOf=2025-03-10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let leads = body["data"].as_array().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0]["clientID"], id);
    assert_eq!(leads[0]["missed"], true);
    assert_eq!(leads[0]["latest_status"]["status"], "first_followup");
    assert_eq!(leads[0]["client_details"]["contacts"][0]["name"], "Asha");

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/marketing/followups/counts?employeeID=1&asOf=2025-03-10",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["first_followup"], 1);
    assert_eq!(body["data"]["missed"], 1);
    assert_eq!(body["data"]["total"], 1);

    let (_, body) = call(
        &app,
        Method::GET,
        "/api/marketing/followups/counts?asOf=2025-03-04",
        None,
    )
    .await;
    assert_eq!(body["data"]["missed"], 0);
}

#[tokio::test]
async fn invalid_status_is_a_bad_request() {
    let app = app().await;
    let id = create_client(&app, "Acme").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/marketing/followups",
        Some(json!({"clientID": id, "employeeID": 1, "status": "won"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().starts_with("invalid status 'won'"));

    let (status, body) = call(&app, Method::GET, "/api/marketing/followups?status=lost", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (_, body) = call(&app, Method::GET, &format!("/api/marketing/clients/{id}/followups"), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn malformed_json_is_reported_in_the_envelope() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/marketing/followups")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn unknown_client_is_not_found() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/api/marketing/clients/4242", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "client 4242 not found");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/marketing/followups",
        Some(json!({"clientID": 4242, "employeeID": 1, "status": "first_followup"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(&app, Method::GET, "/api/marketing/clients/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn hand_over_and_management_counts() {
    let app = app().await;
    let id = create_client(&app, "Acme").await;
    call(
        &app,
        Method::POST,
        "/api/marketing/followups",
        Some(json!({"clientID": id, "employeeID": 1, "status": "converted"})),
    )
    .await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/management/handover",
        Some(json!({"clientID": id, "employeeID": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/management/handover",
        Some(json!({"clientID": id, "employeeID": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, body) = call(
        &app,
        Method::GET,
        "/api/management/followups/counts?employeeID=5&asOf=2025-03-10",
        None,
    )
    .await;
    assert_eq!(body["data"]["lead"], 1);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/management/followups/history?clientID={id}&isMarketing=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["status"], "lead");
}

#[tokio::test]
async fn health_reports_the_database() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["db_ok"], true);
}

#[tokio::test]
async fn graphql_serves_dashboard_counts() {
    let app = app().await;
    create_client(&app, "Acme").await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/graphql",
        Some(json!({"query": "{ marketingCounts(asOf: \"2025-03-10\") }"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("errors").is_none(), "{body}");
    assert_eq!(body["data"]["marketingCounts"]["no_followup"], 1);
    assert_eq!(body["data"]["marketingCounts"]["total_first_followup"], 1);
}

#[tokio::test]
async fn request_id_is_echoed() {
    let router = app().await;
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn legacy_contact_import_appends() {
    let router = app().await;
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/management/clients",
        Some(json!({"employeeID": 3, "company_name": "Legacy", "customer_name": "Buyer"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let id = body["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/management/clients/{id}/contacts/legacy");
    let payload = json!([{"name": "Asha", "phone": "98400"}]);

    let (status, body) = call(&router, Method::POST, &uri, Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Every import adds rows, so the same payload twice yields two contacts.
    let (status, body) = call(&router, Method::POST, &uri, Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = call(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let contacts = body["data"].as_array().unwrap();
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[1]["name"], "Asha");

    let (status, _) = call(&router, Method::PUT, &uri, Some(json!([{"name": "Ravi"}]))).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
