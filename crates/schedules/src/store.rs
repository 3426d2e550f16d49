//! ScheduleStore — relational storage for scheduled actions.
//!
//! One row per action. All mutations run through a single
//! `Mutex<Connection>`, which is the single-writer discipline that makes
//! the `pending → executing` claim the mutual exclusion against double
//! execution.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use la_domain::error::{Error, Result};

use crate::model::{ActionStatus, NewAction, ScheduledAction};

pub struct ScheduleStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS scheduled_actions (
    id            TEXT PRIMARY KEY,
    owner_id      TEXT NOT NULL,
    recipient     TEXT NOT NULL,
    amount_micros INTEGER NOT NULL,
    currency      TEXT NOT NULL,
    note          TEXT,
    scheduled_at  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    status        TEXT NOT NULL,
    error         TEXT
);
CREATE INDEX IF NOT EXISTS idx_actions_due
    ON scheduled_actions (status, scheduled_at);
CREATE INDEX IF NOT EXISTS idx_actions_owner
    ON scheduled_actions (owner_id, currency, status);
";

impl ScheduleStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(sql_err)?;
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory store, used by tests and ephemeral deployments.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(sql_err)?;
        conn.execute_batch(SCHEMA).map_err(sql_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    // ── writes ───────────────────────────────────────────────────────

    /// Insert a new action as `pending`. The scheduled time must be in
    /// the future.
    pub fn insert(&self, new: NewAction) -> Result<ScheduledAction> {
        let created_at = Utc::now();
        if new.scheduled_at <= created_at {
            return Err(Error::Schedule(
                "scheduled_at must be in the future".into(),
            ));
        }
        if new.amount_micros <= 0 {
            return Err(Error::Schedule("amount must be positive".into()));
        }

        let action = ScheduledAction {
            id: Uuid::new_v4().to_string(),
            owner_id: new.owner_id,
            recipient: new.recipient,
            amount_micros: new.amount_micros,
            currency: new.currency,
            note: new.note,
            scheduled_at: new.scheduled_at,
            created_at,
            status: ActionStatus::Pending,
            error: None,
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO scheduled_actions
             (id, owner_id, recipient, amount_micros, currency, note,
              scheduled_at, created_at, status, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)",
            params![
                action.id,
                action.owner_id,
                action.recipient,
                action.amount_micros,
                action.currency,
                action.note,
                action.scheduled_at.to_rfc3339(),
                action.created_at.to_rfc3339(),
                action.status.as_str(),
            ],
        )
        .map_err(sql_err)?;
        Ok(action)
    }

    /// Cancel a `pending` action. Any other state (including a row that
    /// is already cancelled, or missing entirely) returns the same
    /// deterministic not-found error and flips nothing.
    pub fn cancel(&self, id: &str) -> Result<ScheduledAction> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE scheduled_actions SET status = 'cancelled'
                 WHERE id = ?1 AND status = 'pending'",
                params![id],
            )
            .map_err(sql_err)?;
        if changed == 0 {
            return Err(Error::Schedule(format!(
                "no pending scheduled action with id {id}"
            )));
        }
        Self::get_locked(&conn, id)?
            .ok_or_else(|| Error::Schedule(format!("no pending scheduled action with id {id}")))
    }

    /// Claim every due `pending` row by transitioning it to `executing`,
    /// atomically, and return the claimed rows in due order.
    pub fn claim_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledAction>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(sql_err)?;
        let claimed = {
            let mut stmt = tx
                .prepare(
                    "SELECT id, owner_id, recipient, amount_micros, currency, note,
                            scheduled_at, created_at, status, error
                     FROM scheduled_actions
                     WHERE status = 'pending' AND scheduled_at <= ?1
                     ORDER BY scheduled_at ASC",
                )
                .map_err(sql_err)?;
            let rows = stmt
                .query_map(params![now.to_rfc3339()], row_to_action)
                .map_err(sql_err)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(sql_err)?;
            for action in &rows {
                tx.execute(
                    "UPDATE scheduled_actions SET status = 'executing' WHERE id = ?1",
                    params![action.id],
                )
                .map_err(sql_err)?;
            }
            rows
        };
        tx.commit().map_err(sql_err)?;

        Ok(claimed
            .into_iter()
            .map(|mut a| {
                a.status = ActionStatus::Executing;
                a
            })
            .collect())
    }

    /// `executing → executed`. Irreversible.
    pub fn mark_executed(&self, id: &str) -> Result<()> {
        self.finish(id, ActionStatus::Executed, None)
    }

    /// `executing → failed` with the failure reason.
    pub fn mark_failed(&self, id: &str, error: &str) -> Result<()> {
        self.finish(id, ActionStatus::Failed, Some(error))
    }

    fn finish(&self, id: &str, status: ActionStatus, error: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE scheduled_actions SET status = ?2, error = ?3
                 WHERE id = ?1 AND status = 'executing'",
                params![id, status.as_str(), error],
            )
            .map_err(sql_err)?;
        if changed == 0 {
            return Err(Error::Schedule(format!(
                "scheduled action {id} is not executing"
            )));
        }
        Ok(())
    }

    // ── reads ────────────────────────────────────────────────────────

    pub fn get(&self, id: &str) -> Result<Option<ScheduledAction>> {
        let conn = self.conn.lock();
        Self::get_locked(&conn, id)
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<ScheduledAction>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, recipient, amount_micros, currency, note,
                        scheduled_at, created_at, status, error
                 FROM scheduled_actions WHERE id = ?1",
            )
            .map_err(sql_err)?;
        let mut rows = stmt
            .query_map(params![id], row_to_action)
            .map_err(sql_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(sql_err)?)),
            None => Ok(None),
        }
    }

    /// All actions for an owner, newest scheduled first.
    pub fn list(&self, owner_id: &str) -> Result<Vec<ScheduledAction>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, recipient, amount_micros, currency, note,
                        scheduled_at, created_at, status, error
                 FROM scheduled_actions WHERE owner_id = ?1
                 ORDER BY scheduled_at DESC",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map(params![owner_id], row_to_action)
            .map_err(sql_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }

    /// Micro-units reserved by `pending` rows for one owner + currency.
    pub fn reserved_total(&self, owner_id: &str, currency: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let total: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(amount_micros), 0) FROM scheduled_actions
                 WHERE owner_id = ?1 AND currency = ?2 AND status = 'pending'",
                params![owner_id, currency],
                |r| r.get(0),
            )
            .map_err(sql_err)?;
        Ok(total)
    }

    /// Rows stuck in `executing` (e.g. after a crash mid-dispatch).
    /// Surfaced at startup for operator reconciliation; never
    /// auto-recovered.
    pub fn stale_executing(&self) -> Result<Vec<ScheduledAction>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, owner_id, recipient, amount_micros, currency, note,
                        scheduled_at, created_at, status, error
                 FROM scheduled_actions WHERE status = 'executing'
                 ORDER BY scheduled_at ASC",
            )
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], row_to_action)
            .map_err(sql_err)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(sql_err)?;
        Ok(rows)
    }
}

fn row_to_action(row: &Row<'_>) -> rusqlite::Result<ScheduledAction> {
    let scheduled_at: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let status: String = row.get(8)?;
    Ok(ScheduledAction {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        recipient: row.get(2)?,
        amount_micros: row.get(3)?,
        currency: row.get(4)?,
        note: row.get(5)?,
        scheduled_at: parse_ts(&scheduled_at),
        created_at: parse_ts(&created_at),
        status: ActionStatus::parse(&status).unwrap_or(ActionStatus::Failed),
        error: row.get(9)?,
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn sql_err(e: rusqlite::Error) -> Error {
    Error::Schedule(e.to_string())
}
