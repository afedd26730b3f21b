//! Splitwise API client.
//!
//! Covers the OAuth2 authorization-code exchange and the handful of REST
//! calls this service needs: current user, friends, groups and expense
//! creation. All endpoint URLs come from configuration so tests can point
//! the client at a local stub.

use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::config::SplitwiseConfig;
use crate::error::ServiceError;
use crate::models::{CurrentUser, Friend, Group};

#[derive(Clone)]
pub struct SplitwiseClient {
    client: Client,
    config: SplitwiseConfig,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentUserEnvelope {
    user: CurrentUser,
}

#[derive(Debug, Deserialize)]
struct FriendsEnvelope {
    friends: Vec<Friend>,
}

#[derive(Debug, Deserialize)]
struct GroupsEnvelope {
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
struct CreateExpenseEnvelope {
    #[serde(default)]
    expenses: Vec<CreatedExpense>,
    #[serde(default)]
    errors: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedExpense {
    pub id: i64,
    pub description: Option<String>,
    pub cost: Option<String>,
    pub currency_code: Option<String>,
}

/// One participant's share of an expense.
#[derive(Debug, Clone)]
pub struct ExpenseShare {
    pub user_id: i64,
    pub paid_share: Decimal,
    pub owed_share: Decimal,
}

/// Fully resolved expense, ready to dispatch.
#[derive(Debug, Clone)]
pub struct ExpensePayload {
    pub cost: Decimal,
    pub description: String,
    pub date: chrono::NaiveDate,
    pub group_id: i64,
    pub currency_code: Option<String>,
    pub details: Option<String>,
    pub users: Vec<ExpenseShare>,
}

impl ExpensePayload {
    /// Flatten into Splitwise's `users__{i}__{field}` form encoding.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("cost".to_string(), format!("{:.2}", self.cost)),
            ("description".to_string(), self.description.clone()),
            (
                "date".to_string(),
                format!("{}T00:00:00Z", self.date.format("%Y-%m-%d")),
            ),
            ("group_id".to_string(), self.group_id.to_string()),
        ];
        if let Some(currency) = &self.currency_code {
            form.push(("currency_code".to_string(), currency.clone()));
        }
        if let Some(details) = &self.details {
            form.push(("details".to_string(), details.clone()));
        }
        for (i, user) in self.users.iter().enumerate() {
            form.push((format!("users__{}__user_id", i), user.user_id.to_string()));
            form.push((
                format!("users__{}__paid_share", i),
                format!("{:.2}", user.paid_share),
            ));
            form.push((
                format!("users__{}__owed_share", i),
                format!("{:.2}", user.owed_share),
            ));
        }
        form
    }
}

impl SplitwiseClient {
    pub fn new(config: SplitwiseConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Splitwise credentials are set.
    pub fn is_configured(&self) -> bool {
        !self.config.consumer_key.is_empty()
            && !self.config.consumer_secret.expose_secret().is_empty()
    }

    /// Build the authorize URL the user is redirected to.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&state={}",
            self.config.authorize_url,
            urlencoding::encode(&self.config.consumer_key),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, ServiceError> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.consumer_key.as_str()),
                ("client_secret", self.config.consumer_secret.expose_secret()),
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reach Splitwise token endpoint");
                ServiceError::Upstream("token exchange failed".to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Splitwise token exchange error");
            return Err(ServiceError::InvalidCallback(
                "authorization code rejected".to_string(),
            ));
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Splitwise token response");
            ServiceError::Upstream("malformed token response".to_string())
        })
    }

    pub async fn get_current_user(&self, access_token: &str) -> Result<CurrentUser, ServiceError> {
        let envelope: CurrentUserEnvelope = self.get("get_current_user", access_token).await?;
        Ok(envelope.user)
    }

    pub async fn get_friends(&self, access_token: &str) -> Result<Vec<Friend>, ServiceError> {
        let envelope: FriendsEnvelope = self.get("get_friends", access_token).await?;
        Ok(envelope.friends)
    }

    /// Groups, excluding Splitwise's synthetic "non-group" group (id 0).
    pub async fn get_groups(&self, access_token: &str) -> Result<Vec<Group>, ServiceError> {
        let envelope: GroupsEnvelope = self.get("get_groups", access_token).await?;
        Ok(envelope.groups.into_iter().filter(|g| g.id != 0).collect())
    }

    pub async fn create_expense(
        &self,
        access_token: &str,
        payload: &ExpensePayload,
    ) -> Result<CreatedExpense, ServiceError> {
        let url = format!("{}/create_expense", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .form(&payload.to_form())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to reach Splitwise create_expense");
                ServiceError::Upstream("expense creation failed".to_string())
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = %status, body = %body, "Splitwise create_expense response");

        if !status.is_success() {
            return Err(ServiceError::Upstream(format!(
                "create_expense returned {}",
                status
            )));
        }

        let envelope: CreateExpenseEnvelope = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse create_expense response");
            ServiceError::Upstream("malformed create_expense response".to_string())
        })?;

        if let Some(object) = envelope.errors.as_object() {
            if !object.is_empty() {
                tracing::error!(errors = %envelope.errors, "Splitwise rejected the expense");
                return Err(ServiceError::Upstream(envelope.errors.to_string()));
            }
        }

        envelope.expenses.into_iter().next().ok_or_else(|| {
            ServiceError::Upstream("create_expense returned no expense".to_string())
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<T, ServiceError> {
        let url = format!("{}/{}", self.config.api_base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, endpoint = %endpoint, "Splitwise request failed");
                ServiceError::Upstream(format!("{} failed", endpoint))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, endpoint = %endpoint, "Splitwise error response");
            return Err(ServiceError::Upstream(format!(
                "{} returned {}",
                endpoint, status
            )));
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, endpoint = %endpoint, "Failed to parse Splitwise response");
            ServiceError::Upstream(format!("malformed {} response", endpoint))
        })
    }
}
