//! Expense request translation and orchestration.
//!
//! Turns the chat-tool payload into a validated, fully resolved Splitwise
//! expense: amount/date/currency parsing, participant and group resolution
//! against the live account, equal-split share computation and the final
//! create call. Validation failures short-circuit before any Splitwise
//! request is made.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

use crate::dtos::CreateExpenseRequest;
use crate::error::ServiceError;
use crate::models::{CurrentUser, Friend, Group, StoredToken};
use crate::services::matcher::{match_friend, match_group};
use crate::services::splitwise::{ExpensePayload, ExpenseShare, SplitwiseClient};
use crate::services::token_store::TokenStore;

/// Currency keywords and symbols recognized inside a spoken amount.
const CURRENCY_HINTS: &[(&str, &str)] = &[
    ("$", "USD"),
    ("dollar", "USD"),
    ("usd", "USD"),
    ("€", "EUR"),
    ("euro", "EUR"),
    ("eur", "EUR"),
    ("£", "GBP"),
    ("pound", "GBP"),
    ("gbp", "GBP"),
    ("¥", "JPY"),
    ("yen", "JPY"),
    ("jpy", "JPY"),
    ("₹", "INR"),
    ("rupee", "INR"),
    ("inr", "INR"),
    ("cad", "CAD"),
    ("aud", "AUD"),
];

// Longest first so "dollars" is stripped before "dollar"
const AMOUNT_NOISE: &[&str] = &[
    "dollars", "dollar", "rupees", "rupee", "pounds", "pound", "euros", "euro", "yen", "usd",
    "eur", "gbp", "inr", "jpy", "cad", "aud", "$", "€", "£", "¥", "₹", ",",
];

/// A validated expense request, not yet resolved against the account.
#[derive(Debug, Clone)]
pub struct ValidatedExpense {
    pub amount: Decimal,
    pub detected_currency: Option<String>,
    pub description: String,
    pub date: NaiveDate,
    pub participant_names: Vec<String>,
    pub group_name: Option<String>,
    pub currency_code: Option<String>,
    pub details: Option<String>,
}

/// Result of a successful expense creation, for the chat reply.
#[derive(Debug, Clone)]
pub struct ExpenseOutcome {
    pub expense_id: i64,
    pub description: String,
    pub amount: Decimal,
    pub currency_code: String,
    pub per_person_share: Decimal,
    pub participants: Vec<String>,
    pub group_name: Option<String>,
    pub date: NaiveDate,
}

/// Detect a currency from symbols or keywords inside the amount string.
pub fn detect_currency(amount: &str) -> Option<String> {
    let lower = amount.to_lowercase();
    CURRENCY_HINTS
        .iter()
        .find(|(hint, _)| lower.contains(hint))
        .map(|(_, code)| code.to_string())
}

/// Parse a spoken amount like "25", "25.50" or "$30" into a `Decimal`,
/// also reporting any currency it carried.
pub fn parse_amount(amount: &str) -> Result<(Decimal, Option<String>), ServiceError> {
    let detected = detect_currency(amount);

    let mut cleaned = amount.trim().to_lowercase();
    for noise in AMOUNT_NOISE {
        cleaned = cleaned.replace(noise, "");
    }
    let cleaned = cleaned.trim();

    let value: Decimal = cleaned
        .parse()
        .map_err(|_| ServiceError::Validation(format!("Invalid amount: {}", amount)))?;

    if value <= Decimal::ZERO {
        return Err(ServiceError::Validation(
            "Amount must be greater than zero".to_string(),
        ));
    }
    if value.scale() > 2 {
        return Err(ServiceError::Validation(
            "Amount cannot have more than two decimal places".to_string(),
        ));
    }

    Ok((value, detected))
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

// Year-less forms like "January 20"; the current year is appended
const YEARLESS_DATE_FORMATS: &[&str] = &["%B %d %Y", "%b %d %Y"];

/// Resolve "today"/"yesterday"/explicit dates to a calendar date.
/// Unrecognized input falls back to today.
pub fn parse_date(input: Option<&str>) -> NaiveDate {
    let today = Utc::now().date_naive();

    let Some(raw) = input else {
        return today;
    };
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        return today;
    }

    match text.as_str() {
        "today" | "now" => return today,
        "yesterday" => return today - Duration::days(1),
        _ => {}
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&text, format) {
            return date;
        }
    }

    let with_year = format!("{} {}", text, today.format("%Y"));
    for format in YEARLESS_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, format) {
            return date;
        }
    }

    today
}

/// Split `total` into `count` equal shares that sum exactly to `total`.
/// Truncated to cents; remainder cents go to the earliest shares.
pub fn equal_shares(total: Decimal, count: usize) -> Vec<Decimal> {
    debug_assert!(count > 0);
    let divisor = Decimal::from(count as u64);
    let base = (total / divisor).round_dp_with_strategy(2, RoundingStrategy::ToZero);
    let remainder_cents = ((total - base * divisor) * Decimal::from(100))
        .to_i64()
        .unwrap_or(0);

    let cent = Decimal::new(1, 2);
    (0..count)
        .map(|i| {
            if (i as i64) < remainder_cents {
                base + cent
            } else {
                base
            }
        })
        .collect()
}

/// Validate the raw tool payload. Fails before any Splitwise call.
pub fn translate(request: &CreateExpenseRequest) -> Result<ValidatedExpense, ServiceError> {
    if request.amount.trim().is_empty() {
        return Err(ServiceError::Validation("Amount is required".to_string()));
    }

    let (amount, detected_currency) = parse_amount(&request.amount)?;

    let description = if request.description.trim().is_empty() {
        "Expense".to_string()
    } else {
        request.description.trim().to_string()
    };

    let mut participant_names: Vec<String> = Vec::new();
    if let Some(person) = &request.person {
        if !person.trim().is_empty() {
            participant_names.push(person.trim().to_string());
        }
    }
    if let Some(people) = &request.people {
        participant_names.extend(
            people
                .iter()
                .filter(|name| !name.trim().is_empty())
                .map(|name| name.trim().to_string()),
        );
    }

    if participant_names.is_empty() {
        return Err(ServiceError::Validation(
            "Please specify at least one person to split with (e.g., 'with John' or 'with Alice and Bob')"
                .to_string(),
        ));
    }

    Ok(ValidatedExpense {
        amount,
        detected_currency,
        description,
        date: parse_date(request.date.as_deref()),
        participant_names,
        group_name: request
            .group
            .as_ref()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty()),
        currency_code: request.currency_code.clone(),
        details: request.details.clone(),
    })
}

/// Match every requested participant name to exactly one friend.
pub fn resolve_participants<'a>(
    names: &[String],
    friends: &'a [Friend],
) -> Result<Vec<&'a Friend>, ServiceError> {
    if friends.is_empty() {
        return Err(ServiceError::Resolution(
            "Could not fetch your friends list. Please make sure you have friends on Splitwise."
                .to_string(),
        ));
    }

    let mut matched = Vec::with_capacity(names.len());
    for name in names {
        let outcome = match_friend(name, friends);
        match outcome.best {
            Some(friend) => matched.push(friend),
            None => {
                let suggestions: Vec<String> = outcome
                    .suggestions
                    .iter()
                    .map(|f| f.display_name())
                    .collect();
                let message = if suggestions.is_empty() {
                    format!(
                        "Could not find friend '{}' in your Splitwise friends list.",
                        name
                    )
                } else {
                    format!(
                        "Could not find friend '{}'. Did you mean: {}?",
                        name,
                        suggestions.join(", ")
                    )
                };
                return Err(ServiceError::Resolution(message));
            }
        }
    }

    let mut seen = std::collections::HashSet::new();
    for friend in &matched {
        if !seen.insert(friend.id) {
            return Err(ServiceError::Resolution(
                "Duplicate friends detected. Please specify each person only once.".to_string(),
            ));
        }
    }

    Ok(matched)
}

/// Match the named group, if any. Returns group id 0 for non-group expenses.
pub fn resolve_group<'a>(
    name: Option<&str>,
    groups: &'a [Group],
) -> Result<Option<&'a Group>, ServiceError> {
    let Some(name) = name else {
        return Ok(None);
    };

    let outcome = match_group(name, groups);
    match outcome.best {
        Some(group) => Ok(Some(group)),
        None => {
            let known: Vec<&str> = groups.iter().take(5).map(|g| g.name.as_str()).collect();
            let message = if known.is_empty() {
                format!("Could not find group '{}'. You don't have any groups.", name)
            } else {
                format!(
                    "Could not find group '{}'. Your groups: {}",
                    name,
                    known.join(", ")
                )
            };
            Err(ServiceError::Resolution(message))
        }
    }
}

/// Build the dispatchable payload: payer covers the full cost, everyone
/// (payer included) owes an equal share.
pub fn build_payload(
    validated: &ValidatedExpense,
    current_user: &CurrentUser,
    participants: &[&Friend],
    group_id: i64,
) -> ExpensePayload {
    let total_people = 1 + participants.len();
    let shares = equal_shares(validated.amount, total_people);

    let mut users = vec![ExpenseShare {
        user_id: current_user.id,
        paid_share: validated.amount,
        owed_share: shares[0],
    }];
    for (i, friend) in participants.iter().enumerate() {
        users.push(ExpenseShare {
            user_id: friend.id,
            paid_share: Decimal::ZERO,
            owed_share: shares[i + 1],
        });
    }

    // explicit parameter > currency detected in the amount > account default
    let currency_code = validated
        .currency_code
        .clone()
        .or_else(|| validated.detected_currency.clone())
        .or_else(|| current_user.default_currency.clone());

    ExpensePayload {
        cost: validated.amount,
        description: validated.description.clone(),
        date: validated.date,
        group_id,
        currency_code,
        details: validated.details.clone(),
        users,
    }
}

/// Orchestrates tool invocations against the token store and Splitwise.
#[derive(Clone)]
pub struct ExpenseService {
    store: Arc<dyn TokenStore>,
    splitwise: SplitwiseClient,
}

impl ExpenseService {
    pub fn new(store: Arc<dyn TokenStore>, splitwise: SplitwiseClient) -> Self {
        Self { store, splitwise }
    }

    async fn require_token(&self, uid: &str) -> Result<StoredToken, ServiceError> {
        self.store
            .get_token(uid)
            .await
            .map_err(ServiceError::Store)?
            .ok_or(ServiceError::AuthenticationRequired)
    }

    /// Create an equal-split expense from a validated tool payload.
    pub async fn create_expense(
        &self,
        uid: &str,
        request: &CreateExpenseRequest,
    ) -> Result<ExpenseOutcome, ServiceError> {
        let validated = translate(request)?;
        let token = self.require_token(uid).await?;

        let current_user = self.splitwise.get_current_user(&token.access_token).await?;

        // Friend and group lists are independent fetches
        let (friends, groups) = if validated.group_name.is_some() {
            futures::try_join!(
                self.splitwise.get_friends(&token.access_token),
                self.splitwise.get_groups(&token.access_token),
            )?
        } else {
            (self.splitwise.get_friends(&token.access_token).await?, Vec::new())
        };

        let participants = resolve_participants(&validated.participant_names, &friends)?;
        let group = resolve_group(validated.group_name.as_deref(), &groups)?;
        let group_id = group.map(|g| g.id).unwrap_or(0);

        let payload = build_payload(&validated, &current_user, &participants, group_id);

        tracing::info!(
            uid = %uid,
            cost = %payload.cost,
            participants = participants.len(),
            group_id = group_id,
            "Creating Splitwise expense"
        );

        let created = self.splitwise.create_expense(&token.access_token, &payload).await?;

        let per_person_share = payload
            .users
            .get(1)
            .map(|u| u.owed_share)
            .unwrap_or(payload.users[0].owed_share);

        Ok(ExpenseOutcome {
            expense_id: created.id,
            description: payload.description.clone(),
            amount: payload.cost,
            currency_code: payload
                .currency_code
                .clone()
                .unwrap_or_else(|| "USD".to_string()),
            per_person_share,
            participants: participants.iter().map(|f| f.display_name()).collect(),
            group_name: group.map(|g| g.name.clone()),
            date: payload.date,
        })
    }

    /// The user's Splitwise friends, for the get_friends tool.
    pub async fn list_friends(&self, uid: &str) -> Result<Vec<Friend>, ServiceError> {
        let token = self.require_token(uid).await?;
        self.splitwise.get_friends(&token.access_token).await
    }

    pub async fn is_connected(&self, uid: &str) -> Result<bool, ServiceError> {
        Ok(self
            .store
            .get_token(uid)
            .await
            .map_err(ServiceError::Store)?
            .is_some())
    }
}
