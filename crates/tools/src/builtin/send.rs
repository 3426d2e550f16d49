//! `send_money` — the confirmation-gated transfer tool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use la_custodian::Custodian;
use la_domain::error::Result;
use la_domain::schema::ObjectSchema;
use la_domain::tool::{ToolDefinition, ToolOutcome, ToolParams};
use la_schedules::{amount_to_micros, micros_to_amount, ScheduleStore};

use super::balance::available_micros;
use super::{optional_str, required_str};
use crate::tool::{Tool, ToolHandler};

pub fn send_money(custodian: Arc<dyn Custodian>, schedules: Arc<ScheduleStore>) -> Tool {
    Tool::local(
        ToolDefinition {
            name: "send_money".into(),
            description:
                "Send funds to another user. Requires user confirmation before executing."
                    .into(),
            input_schema: ObjectSchema::new()
                .string_property("recipient", "Recipient handle or user id (e.g. @alice)")
                .string_property("amount", "Decimal amount to send (e.g. \"50\")")
                .string_property("currency", "Currency code (e.g. USDC)")
                .string_property("note", "Optional note attached to the transfer")
                .require(&["recipient", "amount", "currency"])
                .with_thought(true)
                .build(),
            requires_confirmation: true,
            summary_template: Some("Send {amount} {currency} to {recipient}".into()),
        },
        Arc::new(SendMoneyHandler {
            custodian,
            schedules,
        }),
    )
}

struct SendMoneyHandler {
    custodian: Arc<dyn Custodian>,
    schedules: Arc<ScheduleStore>,
}

#[async_trait]
impl ToolHandler for SendMoneyHandler {
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
        let requested = match amount_to_micros(amount) {
            Ok(m) => m,
            Err(e) => return Ok(ToolOutcome::err(format!("invalid input: {e}"))),
        };

        // Pending scheduled payments hold part of the balance.
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
        if requested > available {
            return Ok(ToolOutcome::err(format!(
                "insufficient available balance: requested {amount} {currency}, \
                 available {} (pending scheduled payments reserve the rest)",
                micros_to_amount(available.max(0)),
            )));
        }

        // Everything the custodian needs; the thought stays local.
        let mut forwarded = serde_json::Map::new();
        forwarded.insert("recipient".into(), Value::String(recipient.to_string()));
        forwarded.insert("amount".into(), Value::String(amount.to_string()));
        forwarded.insert("currency".into(), Value::String(currency.to_string()));
        if let Some(note) = optional_str(&params.input, "note") {
            forwarded.insert("note".into(), Value::String(note));
        }

        let confirmation_id = params.confirmation_id.as_deref().unwrap_or("");
        self.custodian
            .execute_write(
                &params.owner_id,
                "send_money",
                &Value::Object(forwarded),
                &params.request_id,
                confirmation_id,
            )
            .await
    }

    fn format_observation(&self, outcome: &ToolOutcome) -> Option<String> {
        if !outcome.success {
            return None;
        }
        let tx = outcome.data.get("tx_id").and_then(Value::as_str)?;
        Some(format!("Transfer submitted (tx {tx})"))
    }
}
