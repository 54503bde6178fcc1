//! Database layer
//!
//! Storage for the facility: spot inventory, vehicle sessions (active and
//! history share one table) and the rate schedule. Supports:
//! - SQLite (default, single-binary deployment)
//! - MySQL
//!
//! # Usage
//!
//! ```ignore
//! use parkwise::config::DatabaseConfig;
//! use parkwise::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
