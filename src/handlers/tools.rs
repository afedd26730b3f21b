use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use validator::Validate;

use crate::dtos::{ChatToolResponse, CreateExpenseRequest, GetFriendsRequest, UidQuery};
use crate::error::{AppError, ServiceError};
use crate::services::expense::ExpenseOutcome;
use crate::AppState;

/// Create a Splitwise expense split equally with the named friends.
///
/// Recoverable failures (not connected, bad amount, unmatched name, upstream
/// rejection) come back as a chat `error` message with HTTP 200; only store
/// failures produce a 5xx.
#[utoipa::path(
    post,
    path = "/tools/create_expense",
    params(UidQuery),
    request_body = CreateExpenseRequest,
    responses(
        (status = 200, description = "Chat tool result or user-facing error", body = ChatToolResponse)
    ),
    tag = "Chat Tools"
)]
pub async fn create_expense(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<Json<ChatToolResponse>, AppError> {
    // Omi appends uid to the query string; the body copy is a fallback
    let Some(uid) = query.uid.or_else(|| request.uid.clone()).filter(|u| !u.is_empty()) else {
        return Ok(Json(ChatToolResponse::error("User ID is required")));
    };

    if let Err(errors) = request.validate() {
        tracing::warn!(uid = %uid, "create_expense payload failed validation");
        return Ok(Json(ChatToolResponse::error(validation_message(&errors))));
    }

    tracing::info!(uid = %uid, description = %request.description, "create_expense tool invoked");

    match state.expense_service.create_expense(&uid, &request).await {
        Ok(outcome) => Ok(Json(ChatToolResponse::result(format_outcome(&outcome)))),
        Err(ServiceError::Store(e)) => Err(AppError::StoreError(e)),
        Err(err) => {
            tracing::warn!(uid = %uid, error = %err, "create_expense tool failed");
            Ok(Json(ChatToolResponse::error(err.user_message())))
        }
    }
}

/// List the user's Splitwise friends.
#[utoipa::path(
    post,
    path = "/tools/get_friends",
    params(UidQuery),
    responses(
        (status = 200, description = "Chat tool result or user-facing error", body = ChatToolResponse)
    ),
    tag = "Chat Tools"
)]
pub async fn get_friends(
    State(state): State<AppState>,
    Query(query): Query<UidQuery>,
    Json(request): Json<GetFriendsRequest>,
) -> Result<Json<ChatToolResponse>, AppError> {
    let Some(uid) = query.uid.or(request.uid).filter(|u| !u.is_empty()) else {
        return Ok(Json(ChatToolResponse::error("User ID is required")));
    };

    match state.expense_service.list_friends(&uid).await {
        Ok(friends) if friends.is_empty() => Ok(Json(ChatToolResponse::result(
            "You don't have any friends on Splitwise yet.",
        ))),
        Ok(friends) => {
            let mut lines = vec![format!("**Your Splitwise Friends ({})**", friends.len()), String::new()];
            for (i, friend) in friends.iter().enumerate() {
                let email = friend
                    .email
                    .as_deref()
                    .map(|e| format!(" ({})", e))
                    .unwrap_or_default();
                lines.push(format!("{}. {}{}", i + 1, friend.display_name(), email));
            }
            Ok(Json(ChatToolResponse::result(lines.join("\n"))))
        }
        Err(ServiceError::Store(e)) => Err(AppError::StoreError(e)),
        Err(err) => {
            tracing::warn!(uid = %uid, error = %err, "get_friends tool failed");
            Ok(Json(ChatToolResponse::error(err.user_message())))
        }
    }
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|field| field.iter())
        .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
        .unwrap_or_else(|| errors.to_string())
}

fn currency_symbol(code: &str) -> String {
    match code {
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "INR" => "₹".to_string(),
        "JPY" => "¥".to_string(),
        other => format!("{} ", other),
    }
}

fn format_money(value: Decimal) -> String {
    format!("{:.2}", value)
}

fn format_outcome(outcome: &ExpenseOutcome) -> String {
    let symbol = currency_symbol(&outcome.currency_code);

    let mut parts = vec![
        "**Expense Created!**".to_string(),
        String::new(),
        format!(
            "**{}** - {}{}",
            outcome.description,
            symbol,
            format_money(outcome.amount)
        ),
        format!("Split with: {}", outcome.participants.join(", ")),
        format!(
            "Each person owes: {}{}",
            symbol,
            format_money(outcome.per_person_share)
        ),
    ];

    if let Some(group) = &outcome.group_name {
        parts.push(format!("Group: {}", group));
    }

    parts.push(format!("Date: {}", outcome.date.format("%B %d, %Y")));

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn empty_amount_fails_validation_with_a_user_message() {
        let request: CreateExpenseRequest =
            serde_json::from_value(serde_json::json!({ "amount": "" })).unwrap();

        let errors = request.validate().unwrap_err();
        assert_eq!(validation_message(&errors), "Amount is required");
    }

    #[test]
    fn non_empty_amount_passes_validation() {
        let request: CreateExpenseRequest =
            serde_json::from_value(serde_json::json!({ "amount": "25", "person": "John" }))
                .unwrap();
        assert!(request.validate().is_ok());
    }

    #[test]
    fn outcome_message_lists_split_details() {
        let outcome = ExpenseOutcome {
            expense_id: 77,
            description: "lunch".to_string(),
            amount: "25".parse().unwrap(),
            currency_code: "USD".to_string(),
            per_person_share: "12.50".parse().unwrap(),
            participants: vec!["Johnathan".to_string()],
            group_name: None,
            date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
        };

        let message = format_outcome(&outcome);
        assert!(message.contains("**lunch** - $25.00"));
        assert!(message.contains("Split with: Johnathan"));
        assert!(message.contains("Each person owes: $12.50"));
        assert!(message.contains("Date: January 20, 2026"));
        assert!(!message.contains("Group:"));
    }

    #[test]
    fn outcome_message_includes_group_when_present() {
        let outcome = ExpenseOutcome {
            expense_id: 78,
            description: "rent".to_string(),
            amount: "900".parse().unwrap(),
            currency_code: "EUR".to_string(),
            per_person_share: "300.00".parse().unwrap(),
            participants: vec!["Alice".to_string(), "Bob".to_string()],
            group_name: Some("Roommates".to_string()),
            date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        };

        let message = format_outcome(&outcome);
        assert!(message.contains("Group: Roommates"));
        assert!(message.contains("€900.00"));
    }

    #[test]
    fn unknown_currency_falls_back_to_code() {
        assert_eq!(currency_symbol("CAD"), "CAD ");
    }
}
