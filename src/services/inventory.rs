//! Spot inventory service
//!
//! Owns the set of spots and their occupancy. Transitions that must stay in
//! step with the session ledger go through the allocator, which serializes
//! them; the methods here only guarantee that each single change is valid.

use super::ParkingError;
use crate::db::repositories::SpotRepository;
use crate::models::{
    compare_spot_ids, next_spot_id, CreateSpotInput, OccupancySummary, Spot, SpotCategory, SpotFilter,
};
use anyhow::Context;
use std::sync::Arc;

pub struct SpotInventory {
    repo: Arc<dyn SpotRepository>,
}

impl SpotInventory {
    pub fn new(repo: Arc<dyn SpotRepository>) -> Self {
        Self { repo }
    }

    /// List spots in natural id order (`A-2` before `A-10`)
    pub async fn list(&self, filter: &SpotFilter) -> Result<Vec<Spot>, ParkingError> {
        let mut spots = self
            .repo
            .list(filter)
            .await
            .context("Failed to list spots")?;
        spots.sort_by(|a, b| compare_spot_ids(&a.id, &b.id));
        Ok(spots)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Spot>, ParkingError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get spot")
            .map_err(Into::into)
    }

    /// Free spots of a category
    pub async fn list_free(&self, category: SpotCategory) -> Result<Vec<Spot>, ParkingError> {
        self.list(&SpotFilter {
            category: Some(category),
            free: Some(true),
        })
        .await
    }

    /// Mark a free spot as taken by `plate`.
    ///
    /// # Errors
    /// - `SpotNotFound` if the spot does not exist
    /// - `SpotAlreadyOccupied` if it is already taken
    pub async fn occupy(&self, id: &str, plate: &str) -> Result<Spot, ParkingError> {
        let taken = self
            .repo
            .occupy(id, plate)
            .await
            .context("Failed to occupy spot")?;

        let spot = self
            .get(id)
            .await?
            .ok_or_else(|| ParkingError::SpotNotFound(id.to_string()))?;

        if !taken {
            return Err(ParkingError::SpotAlreadyOccupied(id.to_string()));
        }
        Ok(spot)
    }

    /// Clear a spot's occupancy. Releasing a free spot succeeds and changes nothing.
    pub async fn release(&self, id: &str) -> Result<Spot, ParkingError> {
        let mut spot = self
            .get(id)
            .await?
            .ok_or_else(|| ParkingError::SpotNotFound(id.to_string()))?;

        self.repo
            .release(id)
            .await
            .context("Failed to release spot")?;

        spot.occupied = false;
        spot.occupant_plate = None;
        Ok(spot)
    }

    /// Add a spot. Without an explicit id the next `<prefix>-<n>` id is used.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank id, or when no generated id is left
    /// - `DuplicateId` if the id is taken
    pub async fn add(&self, input: &CreateSpotInput) -> Result<Spot, ParkingError> {
        let id = match &input.id {
            Some(id) => {
                let id = id.trim();
                if id.is_empty() {
                    return Err(ParkingError::InvalidInput(
                        "Spot id cannot be empty".to_string(),
                    ));
                }
                id.to_string()
            }
            None => {
                let existing = self.list(&SpotFilter::default()).await?;
                next_spot_id(input.category, existing.iter().map(|s| s.id.as_str()))
                    .ok_or_else(|| {
                        ParkingError::InvalidInput(format!(
                            "No sequence id left for {} spots, give an explicit id",
                            input.category
                        ))
                    })?
            }
        };

        if self.get(&id).await?.is_some() {
            return Err(ParkingError::DuplicateId(id));
        }

        let created = self
            .repo
            .create(&Spot::new(id, input.category))
            .await
            .context("Failed to create spot")?;
        Ok(created)
    }

    /// Remove a free spot.
    ///
    /// # Errors
    /// - `SpotNotFound` if the spot does not exist
    /// - `SpotAlreadyOccupied` if a vehicle is parked on it
    pub async fn remove(&self, id: &str) -> Result<(), ParkingError> {
        let spot = self
            .get(id)
            .await?
            .ok_or_else(|| ParkingError::SpotNotFound(id.to_string()))?;

        if spot.occupied {
            return Err(ParkingError::SpotAlreadyOccupied(id.to_string()));
        }

        let deleted = self.repo.delete(id).await.context("Failed to delete spot")?;
        if !deleted {
            return Err(ParkingError::SpotNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Total, occupied and free counts for every category
    pub async fn occupancy_summary(&self) -> Result<Vec<OccupancySummary>, ParkingError> {
        let spots = self.list(&SpotFilter::default()).await?;

        Ok(SpotCategory::ALL
            .iter()
            .map(|&category| {
                let (total, occupied) = spots
                    .iter()
                    .filter(|s| s.category == category)
                    .fold((0u32, 0u32), |(total, occupied), s| {
                        (total + 1, occupied + u32::from(s.occupied))
                    });
                OccupancySummary {
                    category,
                    total,
                    occupied,
                    free: total - occupied,
                }
            })
            .collect())
    }

    /// Populate an empty inventory with `<prefix>-1..=n` spots per category.
    ///
    /// Returns the number of spots created; an inventory that already has
    /// spots is left alone.
    pub async fn seed_defaults(&self, counts: &[(SpotCategory, u32)]) -> Result<usize, ParkingError> {
        let existing = self.repo.count().await.context("Failed to count spots")?;
        if existing > 0 {
            return Ok(0);
        }

        let mut created = 0;
        for &(category, count) in counts {
            for n in 1..=count {
                let id = format!("{}-{}", category.id_prefix(), n);
                self.repo
                    .create(&Spot::new(id, category))
                    .await
                    .context("Failed to seed spot")?;
                created += 1;
            }
        }

        if created > 0 {
            tracing::info!("Seeded {} parking spot(s)", created);
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSpotRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_inventory() -> SpotInventory {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SpotInventory::new(SqlxSpotRepository::boxed(pool))
    }

    async fn seeded_inventory() -> SpotInventory {
        let inventory = setup_test_inventory().await;
        inventory
            .seed_defaults(&[(SpotCategory::Regular, 2), (SpotCategory::Disability, 1)])
            .await
            .expect("Failed to seed");
        inventory
    }

    #[tokio::test]
    async fn test_seed_defaults_only_when_empty() {
        let inventory = setup_test_inventory().await;
        let counts = [(SpotCategory::Regular, 2), (SpotCategory::Disability, 1)];

        assert_eq!(inventory.seed_defaults(&counts).await.unwrap(), 3);
        assert_eq!(inventory.seed_defaults(&counts).await.unwrap(), 0);

        let ids: Vec<_> = inventory
            .list(&SpotFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["A-1", "A-2", "D-1"]);
    }

    #[tokio::test]
    async fn test_occupy_and_release() {
        let inventory = seeded_inventory().await;

        let spot = inventory.occupy("A-1", "KA01").await.unwrap();
        assert!(spot.occupied);
        assert_eq!(spot.occupant_plate.as_deref(), Some("KA01"));
        assert!(spot.is_consistent());

        let result = inventory.occupy("A-1", "MH02").await;
        assert!(matches!(result, Err(ParkingError::SpotAlreadyOccupied(_))));

        let result = inventory.occupy("Z-9", "MH02").await;
        assert!(matches!(result, Err(ParkingError::SpotNotFound(_))));

        let released = inventory.release("A-1").await.unwrap();
        assert!(released.is_free());
        assert!(released.is_consistent());
    }

    #[tokio::test]
    async fn test_double_release_is_noop() {
        let inventory = seeded_inventory().await;
        inventory.occupy("D-1", "KA01").await.unwrap();

        inventory.release("D-1").await.unwrap();
        let again = inventory.release("D-1").await.unwrap();
        assert!(again.is_free());

        let stored = inventory.get("D-1").await.unwrap().unwrap();
        assert!(stored.is_free());
        assert!(stored.is_consistent());

        let result = inventory.release("Z-9").await;
        assert!(matches!(result, Err(ParkingError::SpotNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_free_by_category() {
        let inventory = seeded_inventory().await;
        inventory.occupy("A-1", "KA01").await.unwrap();

        let free_regular = inventory.list_free(SpotCategory::Regular).await.unwrap();
        assert_eq!(free_regular.len(), 1);
        assert_eq!(free_regular[0].id, "A-2");

        let free_electric = inventory.list_free(SpotCategory::Electric).await.unwrap();
        assert!(free_electric.is_empty());
    }

    #[tokio::test]
    async fn test_add_generates_next_id() {
        let inventory = seeded_inventory().await;

        let spot = inventory
            .add(&CreateSpotInput {
                id: None,
                category: SpotCategory::Regular,
            })
            .await
            .unwrap();
        assert_eq!(spot.id, "A-3");

        let spot = inventory
            .add(&CreateSpotInput {
                id: None,
                category: SpotCategory::Electric,
            })
            .await
            .unwrap();
        assert_eq!(spot.id, "E-1");
        assert_eq!(spot.category, SpotCategory::Electric);
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_and_blank_ids() {
        let inventory = seeded_inventory().await;

        let result = inventory
            .add(&CreateSpotInput {
                id: Some("A-1".to_string()),
                category: SpotCategory::Regular,
            })
            .await;
        assert!(matches!(result, Err(ParkingError::DuplicateId(id)) if id == "A-1"));

        let result = inventory
            .add(&CreateSpotInput {
                id: Some("   ".to_string()),
                category: SpotCategory::Regular,
            })
            .await;
        assert!(matches!(result, Err(ParkingError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_add_rejects_exhausted_sequence() {
        let inventory = seeded_inventory().await;
        inventory
            .add(&CreateSpotInput {
                id: Some("A-18446744073709551615".to_string()),
                category: SpotCategory::Regular,
            })
            .await
            .unwrap();

        let result = inventory
            .add(&CreateSpotInput {
                id: None,
                category: SpotCategory::Regular,
            })
            .await;
        assert!(matches!(result, Err(ParkingError::InvalidInput(_))));

        let spot = inventory
            .add(&CreateSpotInput {
                id: None,
                category: SpotCategory::Disability,
            })
            .await
            .unwrap();
        assert_eq!(spot.id, "D-2");
    }

    #[tokio::test]
    async fn test_remove_rules() {
        let inventory = seeded_inventory().await;
        inventory.occupy("A-1", "KA01").await.unwrap();

        let result = inventory.remove("A-1").await;
        assert!(matches!(result, Err(ParkingError::SpotAlreadyOccupied(_))));

        let result = inventory.remove("Z-9").await;
        assert!(matches!(result, Err(ParkingError::SpotNotFound(_))));

        inventory.remove("A-2").await.unwrap();
        assert!(inventory.get("A-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_occupancy_summary() {
        let inventory = seeded_inventory().await;
        inventory.occupy("A-2", "KA01").await.unwrap();

        let summary = inventory.occupancy_summary().await.unwrap();
        assert_eq!(summary.len(), 3);

        let regular = &summary[0];
        assert_eq!(regular.category, SpotCategory::Regular);
        assert_eq!((regular.total, regular.occupied, regular.free), (2, 1, 1));

        let disability = &summary[1];
        assert_eq!((disability.total, disability.occupied, disability.free), (1, 0, 1));

        let electric = &summary[2];
        assert_eq!((electric.total, electric.occupied, electric.free), (0, 0, 0));
    }
}
