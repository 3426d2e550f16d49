//! Available-balance arithmetic shared by the write tools.
//!
//! `available = live_balance(currency) − Σ pending_amount(currency)`.
//! Pending scheduled payments reserve funds; a send or a new schedule
//! must fit in what remains.

use std::sync::Arc;

use serde_json::{json, Value};

use la_custodian::Custodian;
use la_schedules::{decimal_to_micros, ScheduleStore};

/// Compute the spendable micro-units for one owner + currency. Errors
/// are returned as display strings that become tool failures.
pub(crate) async fn available_micros(
    custodian: &Arc<dyn Custodian>,
    schedules: &Arc<ScheduleStore>,
    owner_id: &str,
    currency: &str,
    request_id: &str,
) -> Result<i64, String> {
    let outcome = custodian
        .execute(
            owner_id,
            "get_balance",
            &json!({ "currency": currency }),
            request_id,
        )
        .await
        .map_err(|e| format!("balance lookup failed: {e}"))?;

    if !outcome.success {
        return Err(outcome
            .error
            .unwrap_or_else(|| "balance lookup failed".into()));
    }

    let live = parse_balance(&outcome.data, currency)?;
    let reserved = schedules
        .reserved_total(owner_id, currency)
        .map_err(|e| format!("reservation lookup failed: {e}"))?;
    Ok(live - reserved)
}

/// The custodian reports balances as decimal strings under `balance`
/// (single-currency query) or keyed by currency code.
fn parse_balance(data: &Value, currency: &str) -> Result<i64, String> {
    let raw = data
        .get("balance")
        .or_else(|| data.get(currency))
        .or_else(|| data.get(currency.to_lowercase().as_str()));
    match raw {
        Some(Value::String(s)) => decimal_to_micros(s),
        Some(Value::Number(n)) => decimal_to_micros(&n.to_string()),
        _ => Err(format!("could not determine live balance for {currency}")),
    }
}
