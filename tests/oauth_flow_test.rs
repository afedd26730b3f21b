mod common;

use common::{extract_query_param, TestApp};

async fn setup_completed(app: &TestApp, uid: &str) -> bool {
    let response = reqwest::get(format!("{}/setup/splitwise?uid={}", app.address, uid))
        .await
        .expect("Failed to fetch setup status");
    let body: serde_json::Value = response.json().await.expect("Invalid JSON body");
    body["is_setup_completed"].as_bool().unwrap_or(false)
}

#[tokio::test]
async fn auth_redirects_to_splitwise_with_scoped_state() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let response = client
        .get(format!("{}/auth/splitwise?uid=user-1", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_redirection());

    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Missing redirect location");
    assert!(location.starts_with(&format!("{}/oauth/authorize", app.stub.base_url)));
    assert_eq!(
        extract_query_param(location, "client_id").as_deref(),
        Some("test-key")
    );

    let state = extract_query_param(location, "state").expect("Missing state parameter");
    assert!(state.starts_with("user-1:"));
}

#[tokio::test]
async fn auth_without_uid_is_rejected() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let response = client
        .get(format!("{}/auth/splitwise", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn full_oauth_round_trip_connects_the_account() {
    let app = TestApp::spawn().await;

    assert!(!setup_completed(&app, "user-2").await);
    app.connect("user-2").await;
    assert!(setup_completed(&app, "user-2").await);
}

#[tokio::test]
async fn tampered_state_leaves_user_unauthenticated() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    // Start a legitimate flow so a pending state exists
    let response = client
        .get(format!("{}/auth/splitwise?uid=user-3", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_redirection());

    let response = client
        .get(format!(
            "{}/auth/splitwise/callback?code=test-code&state=user-3%3Aforged-nonce",
            app.address
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.expect("Invalid JSON body");
    assert!(body["error"]
        .as_str()
        .unwrap_or("")
        .contains("Invalid callback parameters"));

    assert!(!setup_completed(&app, "user-3").await);
}

#[tokio::test]
async fn callback_state_is_single_use() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let response = client
        .get(format!("{}/auth/splitwise?uid=user-4", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Missing redirect location")
        .to_string();
    let state = extract_query_param(&location, "state").expect("Missing state parameter");

    let callback_url = format!(
        "{}/auth/splitwise/callback?code=test-code&state={}",
        app.address,
        urlencoding::encode(&state)
    );

    let first = client.get(&callback_url).send().await.unwrap();
    assert!(first.status().is_redirection());

    let second = client.get(&callback_url).send().await.unwrap();
    assert_eq!(second.status().as_u16(), 400);
}

#[tokio::test]
async fn provider_denial_is_rejected() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    let response = client
        .get(format!(
            "{}/auth/splitwise/callback?error=access_denied",
            app.address
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn disconnect_removes_the_connection() {
    let app = TestApp::spawn().await;
    let client = TestApp::client();

    app.connect("user-5").await;
    assert!(setup_completed(&app, "user-5").await);

    let response = client
        .get(format!("{}/disconnect?uid=user-5", app.address))
        .send()
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_redirection());

    assert!(!setup_completed(&app, "user-5").await);
}
