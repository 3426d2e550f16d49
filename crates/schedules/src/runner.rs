//! Scheduler loop — claims due actions and dispatches them.
//!
//! Runs as a supervised long-lived task with cooperative shutdown. Each
//! tick claims every due `pending` row (the claim itself excludes double
//! execution) and dispatches through an [`ActionDispatcher`], marking
//! the row `executed` or `failed` by outcome. An in-flight dispatch
//! finishes its attempt; the next tick observes cancellation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::model::ScheduledAction;
use crate::store::ScheduleStore;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Dispatches one claimed action through the write tool surface.
/// Implemented by the engine wiring; the scheduler stays ignorant of
/// tool plumbing.
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(&self, action: &ScheduledAction) -> std::result::Result<(), String>;
}

pub struct Scheduler {
    store: Arc<ScheduleStore>,
    dispatcher: Arc<dyn ActionDispatcher>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<ScheduleStore>, dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            interval: DEFAULT_TICK_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the loop. Returns the task handle; cancel `shutdown` to
    /// stop after the current tick.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            // Stuck rows from a previous process are an operator concern,
            // not something to silently re-run.
            match self.store.stale_executing() {
                Ok(stale) if !stale.is_empty() => {
                    tracing::warn!(
                        count = stale.len(),
                        "scheduled actions stuck in executing state; manual reconciliation needed"
                    );
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "failed to check for stale actions"),
            }

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("scheduler shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(self.interval) => {
                        self.tick().await;
                    }
                }
            }
        })
    }

    /// One scheduler pass: claim due rows, dispatch each, record outcome.
    pub async fn tick(&self) {
        let due = match self.store.claim_due(Utc::now()) {
            Ok(due) => due,
            Err(e) => {
                tracing::warn!(error = %e, "failed to claim due actions");
                return;
            }
        };

        for action in due {
            tracing::info!(
                action_id = %action.id,
                recipient = %action.recipient,
                amount = %action.amount(),
                currency = %action.currency,
                "dispatching scheduled action"
            );
            let result = self.dispatcher.dispatch(&action).await;
            let mark = match result {
                Ok(()) => self.store.mark_executed(&action.id),
                Err(reason) => self.store.mark_failed(&action.id, &reason),
            };
            if let Err(e) = mark {
                tracing::warn!(action_id = %action.id, error = %e, "failed to record action outcome");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{amount_to_micros, ActionStatus, NewAction};
    use parking_lot::Mutex;

    struct FakeDispatcher {
        fail_recipients: Vec<String>,
        dispatched: Mutex<Vec<String>>,
    }

    impl FakeDispatcher {
        fn new(fail_recipients: &[&str]) -> Self {
            Self {
                fail_recipients: fail_recipients.iter().map(|s| s.to_string()).collect(),
                dispatched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ActionDispatcher for FakeDispatcher {
        async fn dispatch(&self, action: &ScheduledAction) -> std::result::Result<(), String> {
            self.dispatched.lock().push(action.id.clone());
            if self.fail_recipients.contains(&action.recipient) {
                Err("send rejected".into())
            } else {
                Ok(())
            }
        }
    }

    fn due_action(store: &ScheduleStore, recipient: &str) -> ScheduledAction {
        store
            .insert(NewAction {
                owner_id: "owner_1".into(),
                recipient: recipient.into(),
                amount_micros: amount_to_micros("10").unwrap(),
                currency: "USDC".into(),
                note: None,
                scheduled_at: Utc::now() + chrono::Duration::milliseconds(5),
            })
            .unwrap()
    }

    #[tokio::test]
    async fn tick_executes_due_actions() {
        let store = Arc::new(ScheduleStore::in_memory().unwrap());
        let action = due_action(&store, "@alice");
        tokio::time::sleep(Duration::from_millis(10)).await;

        let dispatcher = Arc::new(FakeDispatcher::new(&[]));
        let scheduler = Scheduler::new(store.clone(), dispatcher.clone());
        scheduler.tick().await;

        assert_eq!(dispatcher.dispatched.lock().len(), 1);
        assert_eq!(
            store.get(&action.id).unwrap().unwrap().status,
            ActionStatus::Executed
        );
    }

    #[tokio::test]
    async fn tick_marks_failures() {
        let store = Arc::new(ScheduleStore::in_memory().unwrap());
        let action = due_action(&store, "@mallory");
        tokio::time::sleep(Duration::from_millis(10)).await;

        let dispatcher = Arc::new(FakeDispatcher::new(&["@mallory"]));
        Scheduler::new(store.clone(), dispatcher).tick().await;

        let loaded = store.get(&action.id).unwrap().unwrap();
        assert_eq!(loaded.status, ActionStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("send rejected"));
    }

    #[tokio::test]
    async fn second_tick_does_not_redispatch() {
        let store = Arc::new(ScheduleStore::in_memory().unwrap());
        due_action(&store, "@alice");
        tokio::time::sleep(Duration::from_millis(10)).await;

        let dispatcher = Arc::new(FakeDispatcher::new(&[]));
        let scheduler = Scheduler::new(store.clone(), dispatcher.clone());
        scheduler.tick().await;
        scheduler.tick().await;

        assert_eq!(dispatcher.dispatched.lock().len(), 1);
    }

    #[tokio::test]
    async fn spawn_stops_on_cancellation() {
        let store = Arc::new(ScheduleStore::in_memory().unwrap());
        let dispatcher = Arc::new(FakeDispatcher::new(&[]));
        let scheduler =
            Scheduler::new(store, dispatcher).with_interval(Duration::from_millis(10));

        let shutdown = CancellationToken::new();
        let handle = scheduler.spawn(shutdown.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
