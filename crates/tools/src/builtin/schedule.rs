//! Scheduled-payment tools: schedule, cancel, list.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use la_custodian::Custodian;
use la_domain::error::Result;
use la_domain::schema::ObjectSchema;
use la_domain::tool::{ToolDefinition, ToolOutcome, ToolParams};
use la_schedules::{amount_to_micros, NewAction, ScheduleStore, ScheduledAction};

use super::balance::available_micros;
use super::{optional_str, required_str};
use crate::tool::{Tool, ToolHandler};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// schedule_payment
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn schedule_payment(custodian: Arc<dyn Custodian>, schedules: Arc<ScheduleStore>) -> Tool {
    Tool::local(
        ToolDefinition {
            name: "schedule_payment".into(),
            description: "Schedule a future payment. The amount is reserved against the \
                          balance until the payment executes or is cancelled."
                .into(),
            input_schema: ObjectSchema::new()
                .string_property("recipient", "Recipient handle or user id")
                .string_property("amount", "Decimal amount to send")
                .string_property("currency", "Currency code (e.g. USDC)")
                .string_property("scheduled_at", "Execution time, RFC 3339 (must be in the future)")
                .string_property("note", "Optional note attached to the payment")
                .require(&["recipient", "amount", "currency", "scheduled_at"])
                .with_thought(true)
                .build(),
            requires_confirmation: true,
            summary_template: Some(
                "Schedule {amount} {currency} to {recipient} at {scheduled_at}".into(),
            ),
        },
        Arc::new(SchedulePaymentHandler {
            custodian,
            schedules,
        }),
    )
}

struct SchedulePaymentHandler {
    custodian: Arc<dyn Custodian>,
    schedules: Arc<ScheduleStore>,
}

#[async_trait]
impl ToolHandler for SchedulePaymentHandler {
    async fn call(&self, params: ToolParams) -> Result<ToolOutcome> {
        let recipient = match required_str(&params.input, "recipient") {
            Ok(r) => r,
            Err(e) => return Ok(ToolOutcome::err(e)),
        };
        let amount = match required_str(&params.input, "amount") {
            Ok(a) => a,
            Err(e) => return Ok(ToolOutcome::err(e)),
        };
        let currency = match required_str(&params.input, "currency") {
            Ok(c) => c,
            Err(e) => return Ok(ToolOutcome::err(e)),
        };
        let scheduled_at = match required_str(&params.input, "scheduled_at") {
            Ok(s) => s,
            Err(e) => return Ok(ToolOutcome::err(e)),
        };

        let amount_micros = match amount_to_micros(amount) {
            Ok(m) => m,
            Err(e) => return Ok(ToolOutcome::err(format!("invalid input: {e}"))),
        };
        let scheduled_at = match DateTime::parse_from_rfc3339(scheduled_at) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                return Ok(ToolOutcome::err(format!(
                    "invalid input: scheduled_at must be RFC 3339: {e}"
                )))
            }
        };
        if scheduled_at <= Utc::now() {
            return Ok(ToolOutcome::err(
                "invalid input: scheduled_at must be in the future",
            ));
        }

        // The new payment must fit in what is left after existing
        // reservations.
        let available = match available_micros(
            &self.custodian,
            &self.schedules,
            &params.owner_id,
            currency,
            &params.request_id,
        )
        .await
        {
            Ok(a) => a,
            Err(e) => return Ok(ToolOutcome::err(e)),
        };
        if amount_micros > available {
            return Ok(ToolOutcome::err(format!(
                "insufficient available balance to reserve {amount} {currency}"
            )));
        }

        let action = match self.schedules.insert(NewAction {
            owner_id: params.owner_id.clone(),
            recipient: recipient.to_string(),
            amount_micros,
            currency: currency.to_string(),
            note: optional_str(&params.input, "note"),
            scheduled_at,
        }) {
            Ok(a) => a,
            Err(e) => return Ok(ToolOutcome::err(e.to_string())),
        };

        Ok(ToolOutcome::ok(action_view(&action)))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// cancel_scheduled_payment
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn cancel_scheduled_payment(schedules: Arc<ScheduleStore>) -> Tool {
    Tool::local(
        ToolDefinition {
            name: "cancel_scheduled_payment".into(),
            description: "Cancel a scheduled payment that has not executed yet.".into(),
            input_schema: ObjectSchema::new()
                .string_property("payment_id", "Id of the scheduled payment")
                .require(&["payment_id"])
                .with_thought(true)
                .build(),
            requires_confirmation: true,
            summary_template: Some("Cancel scheduled payment {payment_id}".into()),
        },
        Arc::new(CancelScheduledHandler { schedules }),
    )
}

struct CancelScheduledHandler {
    schedules: Arc<ScheduleStore>,
}

#[async_trait]
impl ToolHandler for CancelScheduledHandler {
    async fn call(&self, params: ToolParams) -> Result<ToolOutcome> {
        let payment_id = match required_str(&params.input, "payment_id") {
            Ok(p) => p,
            Err(e) => return Ok(ToolOutcome::err(e)),
        };

        // Cancellation must not leak across owners.
        match self.schedules.get(payment_id) {
            Ok(Some(action)) if action.owner_id == params.owner_id => {}
            Ok(_) => {
                return Ok(ToolOutcome::err(format!(
                    "scheduled payment not found: {payment_id}"
                )))
            }
            Err(e) => return Ok(ToolOutcome::err(e.to_string())),
        }

        match self.schedules.cancel(payment_id) {
            Ok(action) => Ok(ToolOutcome::ok(action_view(&action))),
            Err(e) => Ok(ToolOutcome::err(e.to_string())),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// list_scheduled_payments
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn list_scheduled_payments(schedules: Arc<ScheduleStore>) -> Tool {
    Tool::local(
        ToolDefinition {
            name: "list_scheduled_payments".into(),
            description: "List the owner's scheduled payments with their status.".into(),
            input_schema: ObjectSchema::new().with_thought(false).build(),
            requires_confirmation: false,
            summary_template: None,
        },
        Arc::new(ListScheduledHandler { schedules }),
    )
}

struct ListScheduledHandler {
    schedules: Arc<ScheduleStore>,
}

#[async_trait]
impl ToolHandler for ListScheduledHandler {
    async fn call(&self, params: ToolParams) -> Result<ToolOutcome> {
        match self.schedules.list(&params.owner_id) {
            Ok(actions) => {
                let payments: Vec<Value> = actions.iter().map(action_view).collect();
                Ok(ToolOutcome::ok(json!({
                    "count": payments.len(),
                    "payments": payments,
                })))
            }
            Err(e) => Ok(ToolOutcome::err(e.to_string())),
        }
    }
}

/// The tool-facing view of a scheduled action (amounts as decimal
/// strings, no internal micro-units).
fn action_view(action: &ScheduledAction) -> Value {
    json!({
        "payment_id": action.id,
        "recipient": action.recipient,
        "amount": action.amount(),
        "currency": action.currency,
        "note": action.note,
        "scheduled_at": action.scheduled_at.to_rfc3339(),
        "status": action.status.as_str(),
        "error": action.error,
    })
}
