pub mod config;
pub mod dtos;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;
pub mod startup;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::error::AppError;
use crate::services::{ExpenseService, SplitwiseClient, TokenStore};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::setup::setup_status,
        handlers::manifest::omi_tools_manifest,
        handlers::tools::create_expense,
        handlers::tools::get_friends,
    ),
    components(
        schemas(
            dtos::CreateExpenseRequest,
            dtos::ChatToolResponse,
            dtos::SetupStatusResponse,
            models::Friend,
            models::Group,
            models::CurrentUser,
        )
    ),
    tags(
        (name = "Chat Tools", description = "Omi chat tool invocations"),
        (name = "Setup", description = "App setup and connection status"),
        (name = "Well-Known", description = "Public service metadata"),
        (name = "Observability", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TokenStore>,
    pub splitwise: SplitwiseClient,
    pub expense_service: ExpenseService,
}

pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        config::Environment::Dev => true,
        config::Environment::Prod => state.config.swagger.enabled == config::SwaggerMode::Public,
    };

    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let cors = if state.config.security.allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        CorsLayer::new().allow_origin(
            state
                .config
                .security
                .allowed_origins
                .iter()
                .filter_map(|o| {
                    o.parse::<HeaderValue>()
                        .map_err(|e| {
                            tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                            e
                        })
                        .ok()
                })
                .collect::<Vec<HeaderValue>>(),
        )
    }
    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
    .allow_headers([
        axum::http::header::AUTHORIZATION,
        axum::http::header::CONTENT_TYPE,
    ]);

    app.route("/", get(handlers::setup::home))
        .route("/setup/splitwise", get(handlers::setup::setup_status))
        .route("/auth/splitwise", get(handlers::auth::splitwise_auth))
        .route(
            "/auth/splitwise/callback",
            get(handlers::auth::splitwise_callback),
        )
        .route("/disconnect", get(handlers::auth::disconnect))
        .route(
            "/.well-known/omi-tools.json",
            get(handlers::manifest::omi_tools_manifest),
        )
        .route("/tools/create_expense", post(handlers::tools::create_expense))
        .route("/tools/get_friends", post(handlers::tools::get_friends))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(middleware::REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            },
        ))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(cors)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Token store is unreachable")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Token store health check failed");
        AppError::StoreError(e)
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "store": "up"
        }
    })))
}
