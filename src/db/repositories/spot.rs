//! Spot repository
//!
//! Database operations for the spot inventory.
//!
//! This module provides:
//! - `SpotRepository` trait defining the interface for spot data access
//! - `SqlxSpotRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Spot, SpotCategory, SpotFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Spot repository trait
#[async_trait]
pub trait SpotRepository: Send + Sync {
    /// Insert a new spot
    async fn create(&self, spot: &Spot) -> Result<Spot>;

    /// Get a spot by id
    async fn get_by_id(&self, id: &str) -> Result<Option<Spot>>;

    /// List spots matching the filter, ordered by id
    async fn list(&self, filter: &SpotFilter) -> Result<Vec<Spot>>;

    /// Mark a free spot occupied by `plate`.
    /// Returns false when the spot is missing or already occupied.
    async fn occupy(&self, id: &str, plate: &str) -> Result<bool>;

    /// Clear occupancy unconditionally
    async fn release(&self, id: &str) -> Result<()>;

    /// Delete a spot. Returns false when it did not exist.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Number of spots in the inventory
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based spot repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxSpotRepository {
    pool: DynDatabasePool,
}

impl SqlxSpotRepository {
    /// Create a new SQLx spot repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SpotRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SpotRepository for SqlxSpotRepository {
    async fn create(&self, spot: &Spot) -> Result<Spot> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_spot_sqlite(self.pool.as_sqlite().unwrap(), spot).await,
            DatabaseDriver::Mysql => create_spot_mysql(self.pool.as_mysql().unwrap(), spot).await,
        }
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Spot>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_spot_sqlite(self.pool.as_sqlite().unwrap(), id).await,
            DatabaseDriver::Mysql => get_spot_mysql(self.pool.as_mysql().unwrap(), id).await,
        }
    }

    async fn list(&self, filter: &SpotFilter) -> Result<Vec<Spot>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_spots_sqlite(self.pool.as_sqlite().unwrap(), filter).await,
            DatabaseDriver::Mysql => list_spots_mysql(self.pool.as_mysql().unwrap(), filter).await,
        }
    }

    async fn occupy(&self, id: &str, plate: &str) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(OCCUPY_SQL)
                    .bind(plate)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to occupy spot")?
                    .rows_affected()
            }
            DatabaseDriver::Mysql => {
                sqlx::query(OCCUPY_SQL)
                    .bind(plate)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to occupy spot")?
                    .rows_affected()
            }
        };
        Ok(affected == 1)
    }

    async fn release(&self, id: &str) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(RELEASE_SQL)
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to release spot")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(RELEASE_SQL)
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to release spot")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query("DELETE FROM spots WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to delete spot")?
                    .rows_affected()
            }
            DatabaseDriver::Mysql => {
                sqlx::query("DELETE FROM spots WHERE id = ?")
                    .bind(id)
                    .execute(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to delete spot")?
                    .rows_affected()
            }
        };
        Ok(affected > 0)
    }

    async fn count(&self) -> Result<i64> {
        let row = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query("SELECT COUNT(*) AS total FROM spots")
                    .fetch_one(self.pool.as_sqlite().unwrap())
                    .await
                    .context("Failed to count spots")?;
                row.get::<i64, _>("total")
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query("SELECT COUNT(*) AS total FROM spots")
                    .fetch_one(self.pool.as_mysql().unwrap())
                    .await
                    .context("Failed to count spots")?;
                row.get::<i64, _>("total")
            }
        };
        Ok(row)
    }
}

const SPOT_COLUMNS: &str = "id, category, occupied, occupant_plate, created_at";

// Only a free spot can be taken, so two writers can never both succeed.
const OCCUPY_SQL: &str =
    "UPDATE spots SET occupied = TRUE, occupant_plate = ? WHERE id = ? AND occupied = FALSE";

const RELEASE_SQL: &str = "UPDATE spots SET occupied = FALSE, occupant_plate = NULL WHERE id = ?";

/// Build the listing query; binds follow the order category, occupied.
fn list_query(filter: &SpotFilter) -> String {
    let mut sql = format!("SELECT {} FROM spots WHERE 1 = 1", SPOT_COLUMNS);
    if filter.category.is_some() {
        sql.push_str(" AND category = ?");
    }
    if filter.free.is_some() {
        sql.push_str(" AND occupied = ?");
    }
    sql.push_str(" ORDER BY id");
    sql
}

fn parse_category(raw: &str) -> Result<SpotCategory> {
    raw.parse()
        .with_context(|| format!("Corrupt spot category in store: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_spot_sqlite(pool: &SqlitePool, spot: &Spot) -> Result<Spot> {
    sqlx::query(
        r#"
        INSERT INTO spots (id, category, occupied, occupant_plate, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&spot.id)
    .bind(spot.category.to_string())
    .bind(spot.occupied)
    .bind(&spot.occupant_plate)
    .bind(spot.created_at)
    .execute(pool)
    .await
    .context("Failed to create spot")?;

    Ok(spot.clone())
}

async fn get_spot_sqlite(pool: &SqlitePool, id: &str) -> Result<Option<Spot>> {
    let row = sqlx::query(&format!("SELECT {} FROM spots WHERE id = ?", SPOT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get spot by ID")?;

    row.map(|r| row_to_spot_sqlite(&r)).transpose()
}

async fn list_spots_sqlite(pool: &SqlitePool, filter: &SpotFilter) -> Result<Vec<Spot>> {
    let sql = list_query(filter);
    let mut query = sqlx::query::<sqlx::Sqlite>(&sql);
    if let Some(category) = filter.category {
        query = query.bind(category.to_string());
    }
    if let Some(free) = filter.free {
        query = query.bind(!free);
    }

    let rows = query.fetch_all(pool).await.context("Failed to list spots")?;
    rows.iter().map(row_to_spot_sqlite).collect()
}

fn row_to_spot_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Spot> {
    let category: String = row.get("category");
    Ok(Spot {
        id: row.get("id"),
        category: parse_category(&category)?,
        occupied: row.get("occupied"),
        occupant_plate: row.get("occupant_plate"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_spot_mysql(pool: &MySqlPool, spot: &Spot) -> Result<Spot> {
    sqlx::query(
        r#"
        INSERT INTO spots (id, category, occupied, occupant_plate, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&spot.id)
    .bind(spot.category.to_string())
    .bind(spot.occupied)
    .bind(&spot.occupant_plate)
    .bind(spot.created_at)
    .execute(pool)
    .await
    .context("Failed to create spot")?;

    Ok(spot.clone())
}

async fn get_spot_mysql(pool: &MySqlPool, id: &str) -> Result<Option<Spot>> {
    let row = sqlx::query(&format!("SELECT {} FROM spots WHERE id = ?", SPOT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get spot by ID")?;

    row.map(|r| row_to_spot_mysql(&r)).transpose()
}

async fn list_spots_mysql(pool: &MySqlPool, filter: &SpotFilter) -> Result<Vec<Spot>> {
    let sql = list_query(filter);
    let mut query = sqlx::query::<sqlx::MySql>(&sql);
    if let Some(category) = filter.category {
        query = query.bind(category.to_string());
    }
    if let Some(free) = filter.free {
        query = query.bind(!free);
    }

    let rows = query.fetch_all(pool).await.context("Failed to list spots")?;
    rows.iter().map(row_to_spot_mysql).collect()
}

fn row_to_spot_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Spot> {
    let category: String = row.get("category");
    Ok(Spot {
        id: row.get("id"),
        category: parse_category(&category)?,
        occupied: row.get("occupied"),
        occupant_plate: row.get("occupant_plate"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxSpotRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxSpotRepository::new(pool)
    }

    async fn seed(repo: &SqlxSpotRepository) {
        for (id, category) in [
            ("A-1", SpotCategory::Regular),
            ("A-2", SpotCategory::Regular),
            ("D-1", SpotCategory::Disability),
        ] {
            repo.create(&Spot::new(id, category))
                .await
                .expect("Failed to create spot");
        }
    }

    #[tokio::test]
    async fn test_create_and_get_spot() {
        let repo = setup_test_repo().await;
        repo.create(&Spot::new("E-1", SpotCategory::Electric))
            .await
            .expect("Failed to create spot");

        let found = repo
            .get_by_id("E-1")
            .await
            .expect("Failed to get spot")
            .expect("Spot not found");
        assert_eq!(found.category, SpotCategory::Electric);
        assert!(!found.occupied);
        assert!(found.occupant_plate.is_none());

        assert!(repo.get_by_id("E-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected_by_store() {
        let repo = setup_test_repo().await;
        repo.create(&Spot::new("A-1", SpotCategory::Regular)).await.unwrap();
        assert!(repo.create(&Spot::new("A-1", SpotCategory::Disability)).await.is_err());
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let repo = setup_test_repo().await;
        seed(&repo).await;

        let all = repo.list(&SpotFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let regular = repo
            .list(&SpotFilter {
                category: Some(SpotCategory::Regular),
                free: None,
            })
            .await
            .unwrap();
        assert_eq!(regular.len(), 2);

        assert!(repo.occupy("A-1", "KA01").await.unwrap());

        let free_regular = repo
            .list(&SpotFilter {
                category: Some(SpotCategory::Regular),
                free: Some(true),
            })
            .await
            .unwrap();
        assert_eq!(free_regular.len(), 1);
        assert_eq!(free_regular[0].id, "A-2");

        let occupied = repo
            .list(&SpotFilter {
                category: None,
                free: Some(false),
            })
            .await
            .unwrap();
        assert_eq!(occupied.len(), 1);
        assert_eq!(occupied[0].occupant_plate.as_deref(), Some("KA01"));
    }

    #[tokio::test]
    async fn test_occupy_is_conditional() {
        let repo = setup_test_repo().await;
        seed(&repo).await;

        assert!(repo.occupy("A-1", "KA01").await.unwrap());
        // Second occupant is refused
        assert!(!repo.occupy("A-1", "MH02").await.unwrap());
        // Missing spot
        assert!(!repo.occupy("Z-1", "MH02").await.unwrap());

        let spot = repo.get_by_id("A-1").await.unwrap().unwrap();
        assert_eq!(spot.occupant_plate.as_deref(), Some("KA01"));
        assert!(spot.is_consistent());
    }

    #[tokio::test]
    async fn test_release_twice_keeps_spot_consistent() {
        let repo = setup_test_repo().await;
        seed(&repo).await;

        repo.occupy("D-1", "KA01").await.unwrap();
        repo.release("D-1").await.unwrap();
        repo.release("D-1").await.unwrap();

        let spot = repo.get_by_id("D-1").await.unwrap().unwrap();
        assert!(spot.is_free());
        assert!(spot.is_consistent());
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let repo = setup_test_repo().await;
        seed(&repo).await;
        assert_eq!(repo.count().await.unwrap(), 3);

        assert!(repo.delete("A-2").await.unwrap());
        assert!(!repo.delete("A-2").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
