use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OAuth credential persisted per Omi user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn new(access_token: String, token_type: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            access_token,
            token_type: token_type.unwrap_or_else(|| "Bearer".to_string()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Splitwise friend, fetched transiently per request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Friend {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

impl Friend {
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) if !last.is_empty() => format!("{} {}", self.first_name, last),
            _ => self.first_name.clone(),
        }
    }
}

/// Splitwise group, fetched transiently per request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Group {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// The authenticated Splitwise user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CurrentUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub default_currency: Option<String>,
}
