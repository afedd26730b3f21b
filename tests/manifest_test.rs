mod common;

use common::TestApp;

#[tokio::test]
async fn manifest_lists_chat_tools() {
    let app = TestApp::spawn().await;

    let response = reqwest::get(format!("{}/.well-known/omi-tools.json", app.address))
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert!(response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .starts_with("application/json"));
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("public, max-age=3600")
    );

    let body: serde_json::Value = response.json().await.expect("Invalid JSON body");
    let tools = body["tools"].as_array().expect("tools must be an array");

    let names: Vec<&str> = tools
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"create_expense"));
    assert!(names.contains(&"get_friends"));

    let create = tools
        .iter()
        .find(|t| t["name"] == "create_expense")
        .unwrap();
    assert_eq!(create["parameters"]["required"], serde_json::json!(["amount"]));
    assert_eq!(create["auth_required"], true);
}
