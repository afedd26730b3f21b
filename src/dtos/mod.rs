use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Arguments Omi extracts from the user's utterance for the create_expense
/// tool. `uid` normally arrives as a query parameter appended by the
/// platform, but is also accepted in the body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateExpenseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "omi-user-123")]
    pub uid: Option<String>,

    #[validate(length(min = 1, message = "Amount is required"))]
    #[schema(example = "25.50")]
    pub amount: String,

    #[serde(default = "default_description")]
    #[schema(example = "lunch")]
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "yesterday")]
    pub date: Option<String>,

    /// Single person to split with. Use this or `people`, not both.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "John")]
    pub person: Option<String>,

    /// Multiple people to split with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people: Option<Vec<String>>,

    /// Group name, fuzzy matched against the user's Splitwise groups.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Roommates")]
    pub group: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "USD")]
    pub currency_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

fn default_description() -> String {
    "Expense".to_string()
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GetFriendsRequest {
    pub uid: Option<String>,
}

/// Chat-tool result envelope: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatToolResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatToolResponse {
    pub fn result(message: impl Into<String>) -> Self {
        Self {
            result: Some(message.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SetupStatusResponse {
    #[schema(example = true)]
    pub is_setup_completed: bool,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UidQuery {
    #[param(example = "omi-user-123")]
    pub uid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
