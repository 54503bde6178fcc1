//! Vehicle session repository
//!
//! Database operations for vehicle sessions. Active sessions and the history
//! share the `vehicle_sessions` table: a row is active while `exit_time` is
//! NULL and becomes history when its exit fields are attached.
//!
//! This module provides:
//! - `SessionRepository` trait defining the interface for session data access
//! - `SqlxSessionRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{SessionExit, SpotCategory, VehicleSession};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Money collected across all sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RevenueTotals {
    /// Upfront amounts collected at entry
    pub prepaid: f64,
    /// Additional amounts collected at exit
    pub additional: f64,
}

impl RevenueTotals {
    pub fn total(&self) -> f64 {
        self.prepaid + self.additional
    }
}

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert an active session, returning it with its assigned id
    async fn create(&self, session: &VehicleSession) -> Result<VehicleSession>;

    /// Get the active session for a plate
    async fn get_active_by_plate(&self, plate: &str) -> Result<Option<VehicleSession>>;

    /// Get the active session parked on a spot
    async fn get_active_by_spot(&self, spot_id: &str) -> Result<Option<VehicleSession>>;

    /// All active sessions, oldest entry first
    async fn list_active(&self) -> Result<Vec<VehicleSession>>;

    /// Closed sessions, most recent exit first
    async fn list_history(&self, limit: i64, offset: i64) -> Result<Vec<VehicleSession>>;

    /// Attach exit fields to an active session.
    /// Returns false when the session is missing or already closed.
    async fn close(&self, id: i64, exit: &SessionExit) -> Result<bool>;

    /// Aggregate collected amounts
    async fn revenue(&self) -> Result<RevenueTotals>;
}

/// SQLx-based session repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

const SESSION_COLUMNS: &str = "id, plate_number, spot_id, requested_category, entry_time, \
    plan_hours, base_rate_snapshot, overtime_rate_snapshot, amount_paid, exit_time, \
    billed_hours, base_billed, overtime_billed, total_amount, additional_due";

const INSERT_SQL: &str = r#"
    INSERT INTO vehicle_sessions (
        plate_number, spot_id, requested_category, entry_time, plan_hours,
        base_rate_snapshot, overtime_rate_snapshot, amount_paid
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

const CLOSE_SQL: &str = r#"
    UPDATE vehicle_sessions
    SET exit_time = ?, billed_hours = ?, base_billed = ?, overtime_billed = ?,
        total_amount = ?, additional_due = ?
    WHERE id = ? AND exit_time IS NULL
"#;

const REVENUE_SQL: &str = r#"
    SELECT
        COALESCE(SUM(amount_paid), 0.0) AS prepaid,
        COALESCE(SUM(additional_due), 0.0) AS additional
    FROM vehicle_sessions
"#;

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &VehicleSession) -> Result<VehicleSession> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_session_sqlite(self.pool.as_sqlite().unwrap(), session).await?
            }
            DatabaseDriver::Mysql => {
                create_session_mysql(self.pool.as_mysql().unwrap(), session).await?
            }
        };

        let mut created = session.clone();
        created.id = id;
        Ok(created)
    }

    async fn get_active_by_plate(&self, plate: &str) -> Result<Option<VehicleSession>> {
        let sql = format!(
            "SELECT {} FROM vehicle_sessions WHERE plate_number = ? AND exit_time IS NULL",
            SESSION_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(plate)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get active session by plate")?;
                row.map(|r| row_to_session_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(plate)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get active session by plate")?;
                row.map(|r| row_to_session_mysql(&r)).transpose()
            }
        }
    }

    async fn get_active_by_spot(&self, spot_id: &str) -> Result<Option<VehicleSession>> {
        let sql = format!(
            "SELECT {} FROM vehicle_sessions WHERE spot_id = ? AND exit_time IS NULL",
            SESSION_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(spot_id)
                    .fetch_optional(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to get active session by spot")?;
                row.map(|r| row_to_session_sqlite(&r)).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(spot_id)
                    .fetch_optional(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to get active session by spot")?;
                row.map(|r| row_to_session_mysql(&r)).transpose()
            }
        }
    }

    async fn list_active(&self) -> Result<Vec<VehicleSession>> {
        let sql = format!(
            "SELECT {} FROM vehicle_sessions WHERE exit_time IS NULL ORDER BY entry_time, id",
            SESSION_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list active sessions")?;
                rows.iter().map(row_to_session_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list active sessions")?;
                rows.iter().map(row_to_session_mysql).collect()
            }
        }
    }

    async fn list_history(&self, limit: i64, offset: i64) -> Result<Vec<VehicleSession>> {
        let sql = format!(
            "SELECT {} FROM vehicle_sessions WHERE exit_time IS NOT NULL \
             ORDER BY exit_time DESC, id DESC LIMIT ? OFFSET ?",
            SESSION_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to list session history")?;
                rows.iter().map(row_to_session_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(limit)
                    .bind(offset)
                    .fetch_all(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to list session history")?;
                rows.iter().map(row_to_session_mysql).collect()
            }
        }
    }

    async fn close(&self, id: i64, exit: &SessionExit) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(CLOSE_SQL)
                    .bind(exit.exit_time)
                    .bind(exit.billed_hours)
                    .bind(exit.base_billed)
                    .bind(exit.overtime_billed)
                    .bind(exit.total_amount)
                    .bind(exit.additional_due)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to close session")?
                    .rows_affected()
            }
            DatabaseDriver::Mysql => {
                sqlx::query(CLOSE_SQL)
                    .bind(exit.exit_time)
                    .bind(exit.billed_hours)
                    .bind(exit.base_billed)
                    .bind(exit.overtime_billed)
                    .bind(exit.total_amount)
                    .bind(exit.additional_due)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to close session")?
                    .rows_affected()
            }
        };
        Ok(affected == 1)
    }

    async fn revenue(&self) -> Result<RevenueTotals> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(REVENUE_SQL)
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to aggregate revenue")?;
                Ok(RevenueTotals {
                    prepaid: row.get("prepaid"),
                    additional: row.get("additional"),
                })
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(REVENUE_SQL)
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to aggregate revenue")?;
                Ok(RevenueTotals {
                    prepaid: row.get("prepaid"),
                    additional: row.get("additional"),
                })
            }
        }
    }
}

/// Assemble the exit fields from their nullable columns
fn exit_from_columns(
    exit_time: Option<i64>,
    billed_hours: Option<f64>,
    base_billed: Option<f64>,
    overtime_billed: Option<f64>,
    total_amount: Option<f64>,
    additional_due: Option<f64>,
) -> Option<SessionExit> {
    exit_time.map(|exit_time| SessionExit {
        exit_time,
        billed_hours: billed_hours.unwrap_or_default(),
        base_billed: base_billed.unwrap_or_default(),
        overtime_billed: overtime_billed.unwrap_or_default(),
        total_amount: total_amount.unwrap_or_default(),
        additional_due: additional_due.unwrap_or_default(),
    })
}

fn parse_category(raw: &str) -> Result<SpotCategory> {
    raw.parse()
        .with_context(|| format!("Corrupt requested category in store: {}", raw))
}

fn parse_plan_hours(raw: i64) -> Result<u32> {
    u32::try_from(raw).with_context(|| format!("Corrupt plan hours in store: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(pool: &SqlitePool, session: &VehicleSession) -> Result<i64> {
    let result = sqlx::query(INSERT_SQL)
        .bind(&session.plate_number)
        .bind(&session.spot_id)
        .bind(session.requested_category.to_string())
        .bind(session.entry_time)
        .bind(session.plan_hours as i64)
        .bind(session.base_rate_snapshot)
        .bind(session.overtime_rate_snapshot)
        .bind(session.amount_paid)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(result.last_insert_rowid())
}

fn row_to_session_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<VehicleSession> {
    let category: String = row.get("requested_category");
    Ok(VehicleSession {
        id: row.get("id"),
        plate_number: row.get("plate_number"),
        spot_id: row.get("spot_id"),
        requested_category: parse_category(&category)?,
        entry_time: row.get("entry_time"),
        plan_hours: parse_plan_hours(row.get("plan_hours"))?,
        base_rate_snapshot: row.get("base_rate_snapshot"),
        overtime_rate_snapshot: row.get("overtime_rate_snapshot"),
        amount_paid: row.get("amount_paid"),
        exit: exit_from_columns(
            row.get("exit_time"),
            row.get("billed_hours"),
            row.get("base_billed"),
            row.get("overtime_billed"),
            row.get("total_amount"),
            row.get("additional_due"),
        ),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_session_mysql(pool: &MySqlPool, session: &VehicleSession) -> Result<i64> {
    let result = sqlx::query(INSERT_SQL)
        .bind(&session.plate_number)
        .bind(&session.spot_id)
        .bind(session.requested_category.to_string())
        .bind(session.entry_time)
        .bind(session.plan_hours as i64)
        .bind(session.base_rate_snapshot)
        .bind(session.overtime_rate_snapshot)
        .bind(session.amount_paid)
        .execute(pool)
        .await
        .context("Failed to create session")?;

    Ok(result.last_insert_id() as i64)
}

fn row_to_session_mysql(row: &sqlx::mysql::MySqlRow) -> Result<VehicleSession> {
    let category: String = row.get("requested_category");
    Ok(VehicleSession {
        id: row.get("id"),
        plate_number: row.get("plate_number"),
        spot_id: row.get("spot_id"),
        requested_category: parse_category(&category)?,
        entry_time: row.get("entry_time"),
        plan_hours: parse_plan_hours(row.get("plan_hours"))?,
        base_rate_snapshot: row.get("base_rate_snapshot"),
        overtime_rate_snapshot: row.get("overtime_rate_snapshot"),
        amount_paid: row.get("amount_paid"),
        exit: exit_from_columns(
            row.get("exit_time"),
            row.get("billed_hours"),
            row.get("base_billed"),
            row.get("overtime_billed"),
            row.get("total_amount"),
            row.get("additional_due"),
        ),
    })
}
