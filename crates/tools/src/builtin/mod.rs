//! Built-in financial tool set.
//!
//! Reads are forwarded to the custodian as-is; writes run in-process so
//! the available-balance guard applies before anything reaches the
//! custodial API. All writes require confirmation.

pub mod balance;
pub mod dispatch;
pub mod reads;
pub mod schedule;
pub mod send;

use std::sync::Arc;

use serde_json::Value;

use la_custodian::Custodian;
use la_schedules::ScheduleStore;

use crate::registry::{RegistryError, ToolRegistry};

/// Register the full built-in tool set.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    custodian: Arc<dyn Custodian>,
    schedules: Arc<ScheduleStore>,
) -> Result<(), RegistryError> {
    registry.register(reads::get_balance())?;
    registry.register(reads::search_users())?;
    registry.register(reads::get_profile())?;
    registry.register(reads::get_transactions())?;
    registry.register(reads::analyze_spending())?;
    registry.register(schedule::list_scheduled_payments(schedules.clone()))?;
    registry.register(send::send_money(custodian.clone(), schedules.clone()))?;
    registry.register(schedule::schedule_payment(custodian, schedules.clone()))?;
    registry.register(schedule::cancel_scheduled_payment(schedules))?;
    Ok(())
}

/// Read a required string field from a tool input blob.
pub(crate) fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, String> {
    match input.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(format!("invalid input: missing required field '{key}'")),
    }
}

pub(crate) fn optional_str(input: &Value, key: &str) -> Option<String> {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(String::from)
}
