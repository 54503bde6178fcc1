//! Rate schedule repository
//!
//! The schedule is a single row (`id = 1`) shared by every spot.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::RateSchedule;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Rate schedule repository trait
#[async_trait]
pub trait RateRepository: Send + Sync {
    /// Current schedule, or None before it is first stored
    async fn get(&self) -> Result<Option<RateSchedule>>;

    /// Store the schedule, replacing any previous one
    async fn set(&self, rates: &RateSchedule) -> Result<()>;

    /// Store the schedule only when none exists yet.
    /// Returns true if a row was written.
    async fn insert_if_missing(&self, rates: &RateSchedule) -> Result<bool>;
}

/// SQLx-based rate schedule repository implementation
pub struct SqlxRateRepository {
    pool: DynDatabasePool,
}

impl SqlxRateRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn RateRepository> {
        Arc::new(Self::new(pool))
    }
}

const SELECT_SQL: &str =
    "SELECT base_hourly_rate, overtime_hourly_rate, updated_at FROM rate_schedule WHERE id = 1";

#[async_trait]
impl RateRepository for SqlxRateRepository {
    async fn get(&self) -> Result<Option<RateSchedule>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_rates_sqlite(self.pool.as_sqlite().unwrap()).await,
            DatabaseDriver::Mysql => get_rates_mysql(self.pool.as_mysql().unwrap()).await,
        }
    }

    async fn set(&self, rates: &RateSchedule) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => set_rates_sqlite(self.pool.as_sqlite().unwrap(), rates).await,
            DatabaseDriver::Mysql => set_rates_mysql(self.pool.as_mysql().unwrap(), rates).await,
        }
    }

    async fn insert_if_missing(&self, rates: &RateSchedule) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO rate_schedule
                        (id, base_hourly_rate, overtime_hourly_rate, updated_at)
                    VALUES (1, ?, ?, ?)
                    "#,
                )
                .bind(rates.base_hourly_rate)
                .bind(rates.overtime_hourly_rate)
                .bind(rates.updated_at)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to seed rate schedule")?
                .rows_affected()
            }
            DatabaseDriver::Mysql => {
                sqlx::query(
                    r#"
                    INSERT IGNORE INTO rate_schedule
                        (id, base_hourly_rate, overtime_hourly_rate, updated_at)
                    VALUES (1, ?, ?, ?)
                    "#,
                )
                .bind(rates.base_hourly_rate)
                .bind(rates.overtime_hourly_rate)
                .bind(rates.updated_at)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to seed rate schedule")?
                .rows_affected()
            }
        };
        Ok(affected == 1)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_rates_sqlite(pool: &SqlitePool) -> Result<Option<RateSchedule>> {
    let row = sqlx::query(SELECT_SQL)
        .fetch_optional(pool)
        .await
        .context("Failed to get rate schedule")?;

    Ok(row.map(|row| RateSchedule {
        base_hourly_rate: row.get("base_hourly_rate"),
        overtime_hourly_rate: row.get("overtime_hourly_rate"),
        updated_at: row.get("updated_at"),
    }))
}

async fn set_rates_sqlite(pool: &SqlitePool, rates: &RateSchedule) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rate_schedule (id, base_hourly_rate, overtime_hourly_rate, updated_at)
        VALUES (1, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            base_hourly_rate = excluded.base_hourly_rate,
            overtime_hourly_rate = excluded.overtime_hourly_rate,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(rates.base_hourly_rate)
    .bind(rates.overtime_hourly_rate)
    .bind(rates.updated_at)
    .execute(pool)
    .await
    .context("Failed to store rate schedule")?;

    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn get_rates_mysql(pool: &MySqlPool) -> Result<Option<RateSchedule>> {
    let row = sqlx::query(SELECT_SQL)
        .fetch_optional(pool)
        .await
        .context("Failed to get rate schedule")?;

    Ok(row.map(|row| RateSchedule {
        base_hourly_rate: row.get("base_hourly_rate"),
        overtime_hourly_rate: row.get("overtime_hourly_rate"),
        updated_at: row.get("updated_at"),
    }))
}

async fn set_rates_mysql(pool: &MySqlPool, rates: &RateSchedule) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO rate_schedule (id, base_hourly_rate, overtime_hourly_rate, updated_at)
        VALUES (1, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            base_hourly_rate = VALUES(base_hourly_rate),
            overtime_hourly_rate = VALUES(overtime_hourly_rate),
            updated_at = VALUES(updated_at)
        "#,
    )
    .bind(rates.base_hourly_rate)
    .bind(rates.overtime_hourly_rate)
    .bind(rates.updated_at)
    .execute(pool)
    .await
    .context("Failed to store rate schedule")?;

    Ok(())
}
