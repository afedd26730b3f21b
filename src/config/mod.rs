use secrecy::Secret;
use serde::Deserialize;
use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub port: u16,
    pub splitwise: SplitwiseConfig,
    pub store: StoreConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct SplitwiseConfig {
    pub consumer_key: String,
    pub consumer_secret: Secret<String>,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub redis_url: Option<String>,
    pub oauth_state_ttl_seconds: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SwaggerMode {
    Public,
    Disabled,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = Config {
            environment,
            service_name: get_env("SERVICE_NAME", Some("splitwise-omi-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            port: get_env("PORT", Some("8080"), is_prod)?
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                })?,
            splitwise: SplitwiseConfig {
                consumer_key: get_env("SPLITWISE_CONSUMER_KEY", Some(""), is_prod)?,
                consumer_secret: Secret::new(get_env(
                    "SPLITWISE_CONSUMER_SECRET",
                    Some(""),
                    is_prod,
                )?),
                redirect_uri: get_env(
                    "SPLITWISE_REDIRECT_URI",
                    Some("http://localhost:8080/auth/splitwise/callback"),
                    is_prod,
                )?,
                authorize_url: get_env(
                    "SPLITWISE_AUTHORIZE_URL",
                    Some("https://secure.splitwise.com/oauth/authorize"),
                    is_prod,
                )?,
                token_url: get_env(
                    "SPLITWISE_TOKEN_URL",
                    Some("https://secure.splitwise.com/oauth/token"),
                    is_prod,
                )?,
                api_base_url: get_env(
                    "SPLITWISE_API_BASE_URL",
                    Some("https://secure.splitwise.com/api/v3.0"),
                    is_prod,
                )?,
            },
            store: StoreConfig {
                backend: get_env("TOKEN_STORE", Some("memory"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                redis_url: env::var("REDIS_URL").ok(),
                oauth_state_ttl_seconds: get_env("OAUTH_STATE_TTL_SECONDS", Some("600"), is_prod)?
                    .parse()
                    .unwrap_or(600),
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("*"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            swagger: SwaggerConfig {
                enabled: get_env("ENABLE_SWAGGER", Some("public"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 && self.environment == Environment::Prod {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.store.oauth_state_ttl_seconds <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "OAUTH_STATE_TTL_SECONDS must be positive"
            )));
        }

        if self.store.backend == StoreBackend::Redis && self.store.redis_url.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "REDIS_URL is required when TOKEN_STORE=redis"
            )));
        }

        if self.environment == Environment::Prod {
            if self.splitwise.consumer_key.is_empty() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SPLITWISE_CONSUMER_KEY is required in production"
                )));
            }
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod && default.is_none() {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            _ => Err(format!("Invalid token store backend: {}", s)),
        }
    }
}

impl std::str::FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}
