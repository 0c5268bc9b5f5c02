use crate::routes::app;
use crate::services::relay::PROXY_ERROR;
use crate::state::AppState;
use crate::state::test_helpers::test_app_state;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header as header_eq, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn send(state: AppState, request: Request<Body>) -> Response {
    app(state).oneshot(request).await.unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_value(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn post_booking_is_relayed_with_body_and_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bookings"))
        .and(header_eq("authorization", "Bearer T"))
        .and(header_eq("content-type", "application/json"))
        .and(body_json(json!({"unit": 12, "start": "2026-11-01"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 501, "status": "pending"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/proxy/bookings")
        .header(header::AUTHORIZATION, "Bearer T")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"unit":12,"start":"2026-11-01"}"#))
        .unwrap();
    let response = send(test_app_state(&server.uri()), request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(body_value(response).await, json!({"id": 501, "status": "pending"}));
}

#[tokio::test]
async fn unreachable_upstream_returns_500_error_body() {
    let response = send(test_app_state("http://127.0.0.1:1"), get("/api/proxy/properties")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_value(response).await;
    assert_eq!(body["error"], PROXY_ERROR);
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

// =============================================================================
// Response mirroring
// =============================================================================

#[tokio::test]
async fn upstream_status_and_json_are_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/properties/7/units"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({"errors": ["bad unit"]})))
        .mount(&server)
        .await;

    let response = send(test_app_state(&server.uri()), get("/api/proxy/properties/7/units")).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_value(response).await, json!({"errors": ["bad unit"]}));
}

#[tokio::test]
async fn non_json_reply_is_relayed_as_text_with_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/leases/3/document"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<h1>Lease</h1>", "text/html"))
        .mount(&server)
        .await;

    let response = send(test_app_state(&server.uri()), get("/api/proxy/leases/3/document")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    assert_eq!(body_bytes(response).await, b"<h1>Lease</h1>");
}

#[tokio::test]
async fn reply_without_content_type_is_text_plain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ok".to_vec()))
        .mount(&server)
        .await;

    let response = send(test_app_state(&server.uri()), get("/api/proxy/status")).await;
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_bytes(response).await, b"ok");
}

#[tokio::test]
async fn malformed_upstream_json_is_a_relay_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tenants"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("[{", "application/json"))
        .mount(&server)
        .await;

    let response = send(test_app_state(&server.uri()), get("/api/proxy/tenants")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_value(response).await["error"], PROXY_ERROR);
}

// =============================================================================
// Request shaping
// =============================================================================

#[tokio::test]
async fn invalid_request_body_proceeds_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/units/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("PUT")
        .uri("/api/proxy/units/4")
        .body(Body::from("rent=900"))
        .unwrap();
    let response = send(test_app_state(&server.uri()), request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].body.is_empty());
}

#[tokio::test]
async fn body_larger_than_default_limit_is_relayed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/properties"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 77})))
        .expect(1)
        .mount(&server)
        .await;

    let description = "x".repeat(3 * 1024 * 1024);
    let payload = json!({"name": "Harbour View", "description": description});
    let request = Request::builder()
        .method("POST")
        .uri("/api/proxy/properties")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();
    let response = send(test_app_state(&server.uri()), request).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let forwarded: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(forwarded, payload);
}

#[tokio::test]
async fn only_authorization_and_content_type_are_sent_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/bookings/8"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/proxy/bookings/8")
        .header(header::AUTHORIZATION, "Bearer keep-me")
        .header(header::COOKIE, "sid=drop-me")
        .header("x-tenant-id", "drop-me-too")
        .body(Body::empty())
        .unwrap();
    let response = send(test_app_state(&server.uri()), request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let received = server.received_requests().await.unwrap();
    let headers = &received[0].headers;
    assert_eq!(headers[header::AUTHORIZATION], "Bearer keep-me");
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    assert!(headers.get(header::COOKIE).is_none());
    assert!(headers.get("x-tenant-id").is_none());
}

#[tokio::test]
async fn query_string_is_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/properties"))
        .and(query_param("city", "Lisbon"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(test_app_state(&server.uri()), get("/api/proxy/properties?city=Lisbon&page=2")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn patch_is_relayed_with_same_method() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/maintenance/11"))
        .and(body_json(json!({"status": "done"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 11})))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder()
        .method("PATCH")
        .uri("/api/proxy/maintenance/11")
        .body(Body::from(r#"{"status":"done"}"#))
        .unwrap();
    let response = send(test_app_state(&server.uri()), request).await;
    assert_eq!(body_value(response).await, json!({"id": 11}));
}

#[tokio::test]
async fn head_is_served_without_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/units"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let request = Request::builder().method("HEAD").uri("/api/proxy/units").body(Body::empty()).unwrap();
    let response = send(test_app_state(&server.uri()), request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_bytes(response).await.is_empty());
}

// =============================================================================
// Router extras
// =============================================================================

#[tokio::test]
async fn healthz_is_ok() {
    let response = send(test_app_state("http://127.0.0.1:1"), get("/healthz")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn permissive_cors_allows_any_origin() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let request = Request::builder()
        .uri("/api/proxy/ping")
        .header(header::ORIGIN, "http://app.rentals.test")
        .body(Body::empty())
        .unwrap();
    let response = send(test_app_state(&server.uri()), request).await;
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn strict_cors_adds_no_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let mut state = test_app_state(&server.uri());
    state.cors_permissive = false;
    let request = Request::builder()
        .uri("/api/proxy/ping")
        .header(header::ORIGIN, "http://app.rentals.test")
        .body(Body::empty())
        .unwrap();
    let response = send(state, request).await;
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}
