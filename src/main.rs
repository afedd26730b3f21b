use splitwise_omi_service::{config::Config, observability::init_tracing, startup::Application};

#[tokio::main]
async fn main() -> Result<(), splitwise_omi_service::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = Config::from_env()?;

    init_tracing(&config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting Splitwise Omi service"
    );

    if !splitwise_omi_service::services::SplitwiseClient::new(config.splitwise.clone())
        .is_configured()
    {
        tracing::warn!("Splitwise credentials not configured; OAuth will fail until they are set");
    }

    let app = Application::build(config).await?;
    app.run_until_stopped().await
}
