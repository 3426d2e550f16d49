//! Bridges the scheduler to the custodial send path.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use la_custodian::Custodian;
use la_schedules::{ActionDispatcher, ScheduledAction};

/// Dispatches a claimed scheduled action as a `send_money` write. The
/// row is already `executing` (and no longer reserving), so no balance
/// guard runs here — the custodian has the final word.
pub struct CustodialSendDispatcher {
    custodian: Arc<dyn Custodian>,
}

impl CustodialSendDispatcher {
    pub fn new(custodian: Arc<dyn Custodian>) -> Self {
        Self { custodian }
    }
}

#[async_trait]
impl ActionDispatcher for CustodialSendDispatcher {
    async fn dispatch(&self, action: &ScheduledAction) -> std::result::Result<(), String> {
        let input = json!({
            "recipient": action.recipient,
            "amount": action.amount(),
            "currency": action.currency,
            "note": action.note,
        });
        let request_id = format!("sched-{}", action.id);

        let outcome = self
            .custodian
            .execute_write(&action.owner_id, "send_money", &input, &request_id, "")
            .await
            .map_err(|e| e.to_string())?;

        if outcome.success {
            Ok(())
        } else {
            Err(outcome
                .error
                .unwrap_or_else(|| "send_money failed".into()))
        }
    }
}
