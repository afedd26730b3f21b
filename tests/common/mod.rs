#![allow(dead_code)]

use axum::{
    extract::{Form, State},
    routing::{get, post},
    Json, Router,
};
use secrecy::Secret;
use serde_json::json;
use splitwise_omi_service::config::{
    Config, Environment, SecurityConfig, SplitwiseConfig, StoreBackend, StoreConfig, SwaggerConfig,
    SwaggerMode,
};
use splitwise_omi_service::startup::Application;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const TEST_UID: &str = "test-user";

/// In-process stand-in for the Splitwise API: canned friends/groups and a
/// recorder for create_expense form submissions.
pub struct SplitwiseStub {
    pub base_url: String,
    pub expense_forms: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl SplitwiseStub {
    pub async fn spawn() -> Self {
        let expense_forms: Arc<Mutex<Vec<HashMap<String, String>>>> =
            Arc::new(Mutex::new(Vec::new()));

        let router = Router::new()
            .route(
                "/oauth/token",
                post(|| async {
                    Json(json!({ "access_token": "stub-access-token", "token_type": "Bearer" }))
                }),
            )
            .route(
                "/api/get_current_user",
                get(|| async {
                    Json(json!({
                        "user": {
                            "id": 1,
                            "first_name": "Me",
                            "last_name": null,
                            "email": "me@example.com",
                            "default_currency": "USD"
                        }
                    }))
                }),
            )
            .route(
                "/api/get_friends",
                get(|| async {
                    Json(json!({
                        "friends": [
                            { "id": 9, "first_name": "Johnathan", "last_name": null, "email": null },
                            { "id": 10, "first_name": "Alice", "last_name": "Smith", "email": "alice@example.com" }
                        ]
                    }))
                }),
            )
            .route(
                "/api/get_groups",
                get(|| async {
                    Json(json!({
                        "groups": [
                            { "id": 0, "name": "Non-group expenses" },
                            { "id": 42, "name": "Roommates" }
                        ]
                    }))
                }),
            )
            .route(
                "/api/create_expense",
                post(
                    |State(forms): State<Arc<Mutex<Vec<HashMap<String, String>>>>>,
                     Form(body): Form<HashMap<String, String>>| async move {
                        forms.lock().unwrap().push(body.clone());
                        Json(json!({
                            "expenses": [{
                                "id": 777,
                                "description": body.get("description"),
                                "cost": body.get("cost"),
                                "currency_code": body.get("currency_code")
                            }],
                            "errors": {}
                        }))
                    },
                ),
            )
            .with_state(expense_forms.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub listener");
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            expense_forms,
        }
    }
}

pub struct TestApp {
    pub address: String,
    pub stub: SplitwiseStub,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let stub = SplitwiseStub::spawn().await;

        let config = Config {
            environment: Environment::Dev,
            service_name: "splitwise-omi-service-test".to_string(),
            service_version: "test".to_string(),
            log_level: "warn".to_string(),
            port: 0, // Random port
            splitwise: SplitwiseConfig {
                consumer_key: "test-key".to_string(),
                consumer_secret: Secret::new("test-secret".to_string()),
                redirect_uri: "http://localhost/auth/splitwise/callback".to_string(),
                authorize_url: format!("{}/oauth/authorize", stub.base_url),
                token_url: format!("{}/oauth/token", stub.base_url),
                api_base_url: format!("{}/api", stub.base_url),
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                redis_url: None,
                oauth_state_ttl_seconds: 600,
            },
            security: SecurityConfig {
                allowed_origins: vec!["*".to_string()],
            },
            swagger: SwaggerConfig {
                enabled: SwaggerMode::Disabled,
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let address = format!("http://127.0.0.1:{}", port);

        // Wait for the server to come up
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, stub }
    }

    /// A client that does not follow redirects, so tests can inspect them.
    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client")
    }

    /// Run the full OAuth round trip for `uid` against the stub.
    pub async fn connect(&self, uid: &str) {
        let client = Self::client();

        let response = client
            .get(format!("{}/auth/splitwise?uid={}", self.address, uid))
            .send()
            .await
            .expect("Failed to start OAuth");
        assert!(response.status().is_redirection());

        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .expect("Missing redirect location")
            .to_string();
        let state = extract_query_param(&location, "state").expect("Missing state parameter");

        let response = client
            .get(format!(
                "{}/auth/splitwise/callback?code=test-code&state={}",
                self.address,
                urlencoding::encode(&state)
            ))
            .send()
            .await
            .expect("Failed to finish OAuth");
        assert!(
            response.status().is_redirection(),
            "callback failed: {}",
            response.status()
        );
    }

    pub fn last_expense_form(&self) -> HashMap<String, String> {
        self.stub
            .expense_forms
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("No expense was recorded")
    }
}

/// Pull a single query parameter out of a URL, percent-decoded.
pub fn extract_query_param(url: &str, name: &str) -> Option<String> {
    let query = url.split_once('?')?.1;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key == name {
            Some(urlencoding::decode(value).ok()?.into_owned())
        } else {
            None
        }
    })
}
