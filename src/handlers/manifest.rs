use axum::{http::header, response::IntoResponse, Json};
use serde_json::json;

/// Omi chat-tools manifest.
///
/// Omi fetches this document when the app is created or updated and uses it
/// to decide when to invoke the tools. The document is static.
#[utoipa::path(
    get,
    path = "/.well-known/omi-tools.json",
    responses(
        (status = 200, description = "Chat tool manifest")
    ),
    tag = "Well-Known"
)]
pub async fn omi_tools_manifest() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        Json(manifest()),
    )
}

fn manifest() -> serde_json::Value {
    json!({
        "tools": [
            {
                "name": "create_expense",
                "description": "Create a Splitwise expense and split it with friends. Use this when the user wants to split costs, share expenses, divide bills, or log shared purchases with people. The expense will be split equally among the user and the specified friends. By default creates a non-group expense unless a group is specified.",
                "endpoint": "/tools/create_expense",
                "method": "POST",
                "parameters": {
                    "properties": {
                        "amount": {
                            "type": "string",
                            "description": "The total expense amount (e.g., '25', '25.50', '$30'). Required."
                        },
                        "description": {
                            "type": "string",
                            "description": "What the expense is for (e.g., 'lunch', 'groceries', 'dinner', 'uber'). Defaults to 'Expense' if not provided."
                        },
                        "date": {
                            "type": "string",
                            "description": "When the expense occurred. Supports: 'today', 'yesterday', or dates like '2026-01-20', 'Jan 15', 'January 15, 2026'. Defaults to today."
                        },
                        "person": {
                            "type": "string",
                            "description": "Name of a single person to split with (fuzzy matched to Splitwise friends). Use this OR 'people', not both."
                        },
                        "people": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Names of multiple people to split with (each fuzzy matched to Splitwise friends). Use this when splitting with 2+ people."
                        },
                        "group": {
                            "type": "string",
                            "description": "Name of a Splitwise group to add this expense to (fuzzy matched). If not provided, creates a non-group expense."
                        },
                        "currency_code": {
                            "type": "string",
                            "description": "Currency code (e.g., 'USD', 'EUR', 'GBP'). Defaults to user's Splitwise default currency."
                        },
                        "details": {
                            "type": "string",
                            "description": "Additional notes or details about the expense."
                        }
                    },
                    "required": ["amount"]
                },
                "auth_required": true,
                "status_message": "Creating Splitwise expense..."
            },
            {
                "name": "get_friends",
                "description": "Get the user's Splitwise friends list. Use this when the user wants to see their friends, check who they can split expenses with, or find someone's name on Splitwise.",
                "endpoint": "/tools/get_friends",
                "method": "POST",
                "parameters": {
                    "properties": {},
                    "required": []
                },
                "auth_required": true,
                "status_message": "Getting your Splitwise friends..."
            }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_describes_create_expense() {
        let doc = manifest();
        let tools = doc["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);

        let create = &tools[0];
        assert_eq!(create["name"], "create_expense");
        assert_eq!(create["endpoint"], "/tools/create_expense");
        assert_eq!(create["method"], "POST");
        assert_eq!(create["parameters"]["required"], json!(["amount"]));
        assert!(create["parameters"]["properties"]
            .as_object()
            .unwrap()
            .contains_key("people"));
    }
}
