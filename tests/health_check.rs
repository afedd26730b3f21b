mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_reports_healthy() {
    let app = TestApp::spawn().await;

    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("Invalid JSON body");
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["store"], "up");
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("Failed to execute request");

    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response
            .headers()
            .get("x-content-type-options")
            .and_then(|v| v.to_str().ok()),
        Some("nosniff")
    );
}

#[tokio::test]
async fn request_id_is_propagated_when_supplied() {
    let app = TestApp::spawn().await;

    let response = reqwest::Client::new()
        .get(format!("{}/health", app.address))
        .header("x-request-id", "abc-123")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok()),
        Some("abc-123")
    );
}
