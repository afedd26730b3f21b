use axum::{
    extract::{Query, State},
    response::Html,
    Json,
};

use crate::dtos::{SetupStatusResponse, UidQuery};
use crate::error::AppError;
use crate::AppState;

/// Home / app settings page: shows connection status and the connect or
/// disconnect link for the given uid.
pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
) -> Result<Html<String>, AppError> {
    let Some(uid) = query.uid.filter(|uid| !uid.is_empty()) else {
        return Ok(Html(render_page(None, false)));
    };

    let connected = state
        .store
        .get_token(&uid)
        .await
        .map_err(AppError::StoreError)?
        .is_some();

    Ok(Html(render_page(Some(&uid), connected)))
}

/// Setup completion check, polled by Omi after app installation.
#[utoipa::path(
    get,
    path = "/setup/splitwise",
    params(UidQuery),
    responses(
        (status = 200, description = "Setup status for the user", body = SetupStatusResponse)
    ),
    tag = "Setup"
)]
pub async fn setup_status(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
) -> Result<Json<SetupStatusResponse>, AppError> {
    let is_setup_completed = match query.uid.filter(|uid| !uid.is_empty()) {
        Some(uid) => state
            .store
            .get_token(&uid)
            .await
            .map_err(AppError::StoreError)?
            .is_some(),
        None => false,
    };

    Ok(Json(SetupStatusResponse { is_setup_completed }))
}

fn render_page(uid: Option<&str>, connected: bool) -> String {
    let body = match (uid, connected) {
        (None, _) => {
            "<p>Missing user ID. Open this page from the Omi app.</p>".to_string()
        }
        (Some(uid), true) => format!(
            "<p>Splitwise is connected.</p>\
             <p><a href=\"/disconnect?uid={uid}\">Disconnect</a></p>",
            uid = urlencoding::encode(uid)
        ),
        (Some(uid), false) => format!(
            "<p>Splitwise is not connected.</p>\
             <p><a href=\"/auth/splitwise?uid={uid}\">Connect Splitwise</a></p>",
            uid = urlencoding::encode(uid)
        ),
    };

    format!(
        "<!DOCTYPE html>\
         <html><head><title>Splitwise for Omi</title></head>\
         <body><h1>Splitwise for Omi</h1>{}</body></html>",
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offers_connect_when_disconnected() {
        let page = render_page(Some("u1"), false);
        assert!(page.contains("/auth/splitwise?uid=u1"));
        assert!(!page.contains("/disconnect"));
    }

    #[test]
    fn page_offers_disconnect_when_connected() {
        let page = render_page(Some("u1"), true);
        assert!(page.contains("/disconnect?uid=u1"));
    }

    #[test]
    fn page_explains_missing_uid() {
        let page = render_page(None, false);
        assert!(page.contains("Missing user ID"));
    }
}
