use super::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn endpoint_joins_base_without_double_slash() {
    let verifier = HttpTokenVerifier::new("http://api.rentals.test/").unwrap();
    assert_eq!(verifier.endpoint(), "http://api.rentals.test/api/auth/verify");
}

#[tokio::test]
async fn verify_success_returns_profile_and_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "id": 12, "email": "lee@rentals.test", "role": "landlord" },
            "valid": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let verifier = HttpTokenVerifier::new(&server.uri()).unwrap();
    let outcome = verifier.verify("tok-123").await;

    let VerificationOutcome::Valid { user, valid } = outcome else {
        panic!("expected Valid, got {outcome:?}");
    };
    assert!(valid);
    assert_eq!(user.role, "landlord");
    assert_eq!(user.email, "lee@rentals.test");
}

#[tokio::test]
async fn verify_success_defaults_missing_flag_to_valid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": { "id": "u1", "role": "tenant" } })))
        .mount(&server)
        .await;

    let outcome = HttpTokenVerifier::new(&server.uri())
        .unwrap()
        .verify("t")
        .await;
    assert!(matches!(outcome, VerificationOutcome::Valid { valid: true, .. }));
}

#[tokio::test]
async fn verify_non_2xx_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "bad token" })))
        .mount(&server)
        .await;

    let outcome = HttpTokenVerifier::new(&server.uri())
        .unwrap()
        .verify("stale")
        .await;
    assert_eq!(outcome, VerificationOutcome::Invalid { status: 401 });
}

#[tokio::test]
async fn verify_unreadable_success_body_is_invalid() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let outcome = HttpTokenVerifier::new(&server.uri())
        .unwrap()
        .verify("t")
        .await;
    assert_eq!(outcome, VerificationOutcome::Invalid { status: 200 });
}

#[tokio::test]
async fn verify_transport_failure_is_network_error() {
    // Port 1 on loopback refuses connections.
    let outcome = HttpTokenVerifier::new("http://127.0.0.1:1")
        .unwrap()
        .verify("t")
        .await;
    let VerificationOutcome::NetworkError { message } = outcome else {
        panic!("expected NetworkError, got {outcome:?}");
    };
    assert!(!message.is_empty());
}
