//! Scheduled-action data model — status machine and money representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Micro-units per whole currency unit. Amounts travel as decimal
/// strings at the tool boundary and are stored as integer micro-units so
/// reservation SUMs are exact.
pub const MICROS_PER_UNIT: i64 = 1_000_000;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status machine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lifecycle of a scheduled action. Legal edges:
/// `pending → executing → {executed, failed}` and `pending → cancelled`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Executing,
    Executed,
    Failed,
    Cancelled,
}

impl ActionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Executing => "executing",
            ActionStatus::Executed => "executed",
            ActionStatus::Failed => "failed",
            ActionStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ActionStatus::Pending),
            "executing" => Some(ActionStatus::Executing),
            "executed" => Some(ActionStatus::Executed),
            "failed" => Some(ActionStatus::Failed),
            "cancelled" => Some(ActionStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: ActionStatus) -> bool {
        matches!(
            (self, next),
            (ActionStatus::Pending, ActionStatus::Executing)
                | (ActionStatus::Pending, ActionStatus::Cancelled)
                | (ActionStatus::Executing, ActionStatus::Executed)
                | (ActionStatus::Executing, ActionStatus::Failed)
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scheduled action
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One persisted scheduled payment (one table row).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub id: String,
    pub owner_id: String,
    pub recipient: String,
    pub amount_micros: i64,
    pub currency: String,
    pub note: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub status: ActionStatus,
    pub error: Option<String>,
}

impl ScheduledAction {
    /// Decimal-string form of the amount (e.g. `"10"` or `"10.50"`).
    pub fn amount(&self) -> String {
        micros_to_amount(self.amount_micros)
    }
}

/// Input for inserting a new scheduled action.
#[derive(Clone, Debug)]
pub struct NewAction {
    pub owner_id: String,
    pub recipient: String,
    pub amount_micros: i64,
    pub currency: String,
    pub note: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Money parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse a decimal amount string into micro-units. Accepts up to six
/// fractional digits; rejects empty, negative, zero, and malformed input.
pub fn amount_to_micros(s: &str) -> Result<i64, String> {
    let micros = decimal_to_micros(s)?;
    if micros <= 0 {
        return Err(format!("amount must be positive: {s}"));
    }
    Ok(micros)
}

/// Like [`amount_to_micros`] but permits zero — balances can be empty,
/// payment amounts cannot.
pub fn decimal_to_micros(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("amount is empty".into());
    }
    if s.starts_with('-') || s.starts_with('+') {
        return Err(format!("invalid amount: {s}"));
    }

    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(format!("invalid amount: {s}"));
    }
    if frac.len() > 6 {
        return Err(format!("amount has more than 6 decimal places: {s}"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid amount: {s}"));
    }

    let whole_part: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| format!("amount too large: {s}"))?
    };
    let mut frac_micros: i64 = 0;
    if !frac.is_empty() {
        let padded = format!("{frac:0<6}");
        frac_micros = padded.parse().map_err(|_| format!("invalid amount: {s}"))?;
    }

    whole_part
        .checked_mul(MICROS_PER_UNIT)
        .and_then(|m| m.checked_add(frac_micros))
        .ok_or_else(|| format!("amount too large: {s}"))
}

/// Render micro-units back to a decimal string with trailing zeros
/// trimmed (`10_500_000 → "10.5"`, `10_000_000 → "10"`).
pub fn micros_to_amount(micros: i64) -> String {
    let whole = micros / MICROS_PER_UNIT;
    let frac = (micros % MICROS_PER_UNIT).abs();
    if frac == 0 {
        return whole.to_string();
    }
    let frac_str = format!("{frac:06}");
    let trimmed = frac_str.trim_end_matches('0');
    format!("{whole}.{trimmed}")
}
