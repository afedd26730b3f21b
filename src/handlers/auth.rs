use axum::{
    extract::{Query, State},
    response::Redirect,
};
use uuid::Uuid;

use crate::dtos::{CallbackQuery, UidQuery};
use crate::error::{AppError, ServiceError};
use crate::models::StoredToken;
use crate::AppState;

/// Start the Splitwise OAuth2 flow: stash a `uid:nonce` state and redirect
/// the user to Splitwise's authorize page.
pub async fn splitwise_auth(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
) -> Result<Redirect, AppError> {
    let uid = query
        .uid
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("User ID is required")))?;

    if !state.splitwise.is_configured() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "Splitwise credentials not configured"
        )));
    }

    // uid rides inside the state so the callback can find the pending request
    let oauth_state = format!("{}:{}", uid, Uuid::new_v4());
    state
        .store
        .put_oauth_state(&uid, &oauth_state, state.config.store.oauth_state_ttl_seconds)
        .await
        .map_err(AppError::StoreError)?;

    let url = state.splitwise.authorize_url(&oauth_state);
    tracing::info!(uid = %uid, "Redirecting to Splitwise authorization");

    Ok(Redirect::to(&url))
}

/// Finish the OAuth2 flow: validate the state against the pending request,
/// exchange the code and persist the token.
pub async fn splitwise_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, AppError> {
    if let Some(error) = query.error {
        tracing::warn!(error = %error, "Splitwise authorization denied");
        return Err(ServiceError::InvalidCallback(format!("authorization failed: {}", error)).into());
    }

    let (Some(code), Some(callback_state)) = (query.code, query.state) else {
        return Err(ServiceError::InvalidCallback("missing code or state".to_string()).into());
    };

    let Some((uid, _nonce)) = callback_state.split_once(':') else {
        return Err(ServiceError::InvalidCallback("malformed state parameter".to_string()).into());
    };

    // The pending state is consumed on first use, valid or not
    let stored = state
        .store
        .take_oauth_state(uid)
        .await
        .map_err(AppError::StoreError)?;
    if stored.as_deref() != Some(callback_state.as_str()) {
        tracing::warn!(uid = %uid, "OAuth state mismatch");
        return Err(ServiceError::InvalidCallback("state mismatch".to_string()).into());
    }

    let token_response = state.splitwise.exchange_code(&code).await?;
    let token = StoredToken::new(token_response.access_token, token_response.token_type);

    state
        .store
        .put_token(uid, &token)
        .await
        .map_err(AppError::StoreError)?;

    tracing::info!(uid = %uid, "Splitwise account connected");

    Ok(Redirect::to(&format!("/?uid={}", urlencoding::encode(uid))))
}

/// Disconnect the Splitwise account: delete the stored token.
pub async fn disconnect(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
) -> Result<Redirect, AppError> {
    let uid = query
        .uid
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("User ID is required")))?;

    state
        .store
        .delete_token(&uid)
        .await
        .map_err(AppError::StoreError)?;

    tracing::info!(uid = %uid, "Splitwise account disconnected");

    Ok(Redirect::to(&format!("/?uid={}", urlencoding::encode(&uid))))
}
