//! Database migrations module
//!
//! Code-embedded migrations for the facility store, with SQL for both SQLite
//! and MySQL so the binary ships without external migration files.
//!
//! # Usage
//!
//! ```ignore
//! use parkwise::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in order.
pub const MIGRATIONS: &[Migration] = &[
    // Spot inventory. The CHECK keeps the occupancy flag and plate in step.
    Migration {
        version: 1,
        name: "create_spots",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS spots (
                id VARCHAR(32) PRIMARY KEY,
                category VARCHAR(20) NOT NULL DEFAULT 'regular',
                occupied BOOLEAN NOT NULL DEFAULT 0,
                occupant_plate VARCHAR(32),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (
                    (occupied = 1 AND occupant_plate IS NOT NULL AND occupant_plate <> '')
                    OR (occupied = 0 AND occupant_plate IS NULL)
                )
            );
            CREATE INDEX IF NOT EXISTS idx_spots_category ON spots(category, occupied);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS spots (
                id VARCHAR(32) PRIMARY KEY,
                category VARCHAR(20) NOT NULL DEFAULT 'regular',
                occupied BOOLEAN NOT NULL DEFAULT FALSE,
                occupant_plate VARCHAR(32),
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (
                    (occupied = TRUE AND occupant_plate IS NOT NULL AND occupant_plate <> '')
                    OR (occupied = FALSE AND occupant_plate IS NULL)
                )
            );
            CREATE INDEX idx_spots_category ON spots(category, occupied);
        "#,
    },
    // Vehicle sessions: active rows have exit_time NULL, closed rows form the history.
    Migration {
        version: 2,
        name: "create_vehicle_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS vehicle_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plate_number VARCHAR(32) NOT NULL,
                spot_id VARCHAR(32) NOT NULL,
                requested_category VARCHAR(20) NOT NULL DEFAULT 'regular',
                entry_time BIGINT NOT NULL,
                plan_hours INTEGER NOT NULL,
                base_rate_snapshot REAL NOT NULL,
                overtime_rate_snapshot REAL NOT NULL,
                amount_paid REAL NOT NULL DEFAULT 0,
                exit_time BIGINT,
                billed_hours REAL,
                base_billed REAL,
                overtime_billed REAL,
                total_amount REAL,
                additional_due REAL
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_active_plate
                ON vehicle_sessions(plate_number) WHERE exit_time IS NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_active_spot
                ON vehicle_sessions(spot_id) WHERE exit_time IS NULL;
            CREATE INDEX IF NOT EXISTS idx_sessions_exit_time ON vehicle_sessions(exit_time);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS vehicle_sessions (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                plate_number VARCHAR(32) NOT NULL,
                spot_id VARCHAR(32) NOT NULL,
                requested_category VARCHAR(20) NOT NULL DEFAULT 'regular',
                entry_time BIGINT NOT NULL,
                plan_hours BIGINT NOT NULL,
                base_rate_snapshot DOUBLE NOT NULL,
                overtime_rate_snapshot DOUBLE NOT NULL,
                amount_paid DOUBLE NOT NULL DEFAULT 0,
                exit_time BIGINT NULL,
                billed_hours DOUBLE NULL,
                base_billed DOUBLE NULL,
                overtime_billed DOUBLE NULL,
                total_amount DOUBLE NULL,
                additional_due DOUBLE NULL
            );
            CREATE INDEX idx_sessions_plate ON vehicle_sessions(plate_number, exit_time);
            CREATE INDEX idx_sessions_spot ON vehicle_sessions(spot_id, exit_time);
            CREATE INDEX idx_sessions_exit_time ON vehicle_sessions(exit_time);
        "#,
    },
    // Single-row rate schedule
    Migration {
        version: 3,
        name: "create_rate_schedule",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS rate_schedule (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                base_hourly_rate REAL NOT NULL,
                overtime_hourly_rate REAL NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS rate_schedule (
                id INT PRIMARY KEY,
                base_hourly_rate DOUBLE NOT NULL,
                overtime_hourly_rate DOUBLE NOT NULL,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                CHECK (id = 1)
            );
        "#,
    },
];

/// Run all pending migrations
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool, migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
        DatabaseDriver::Mysql => {
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#
        }
    };

    pool.execute(sql).await?;
    Ok(())
}

async fn get_applied_migrations(pool: &DynDatabasePool) -> Result<Vec<MigrationRecord>> {
    match pool.driver() {
        DatabaseDriver::Sqlite => get_applied_migrations_sqlite(pool.as_sqlite().unwrap()).await,
        DatabaseDriver::Mysql => get_applied_migrations_mysql(pool.as_mysql().unwrap()).await,
    }
}

async fn get_applied_migrations_sqlite(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn get_applied_migrations_mysql(pool: &MySqlPool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        })
        .collect())
}

async fn apply_migration(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    let sql = match pool.driver() {
        DatabaseDriver::Sqlite => migration.up_sqlite,
        DatabaseDriver::Mysql => migration.up_mysql,
    };

    for statement in split_sql_statements(sql) {
        pool.execute(statement)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    let record = format!(
        "INSERT INTO _migrations (version, name) VALUES ({}, '{}')",
        migration.version, migration.name
    );
    pool.execute(&record).await?;

    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}
