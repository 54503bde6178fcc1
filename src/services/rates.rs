//! Rate schedule service
//!
//! Holds the hourly rates applied to new sessions. Open sessions carry their
//! own snapshot, so changing rates here never re-prices them.

use super::ParkingError;
use crate::db::repositories::RateRepository;
use crate::models::{round_cents, RateSchedule, UpdateRatesInput, MAX_HOURLY_RATE};
use anyhow::Context;
use std::sync::Arc;

pub struct RateScheduleService {
    repo: Arc<dyn RateRepository>,
    default_base_rate: f64,
    default_overtime_rate: f64,
}

impl RateScheduleService {
    /// Create a rate service with the configured defaults
    pub fn new(
        repo: Arc<dyn RateRepository>,
        default_base_rate: f64,
        default_overtime_rate: f64,
    ) -> Self {
        Self {
            repo,
            default_base_rate,
            default_overtime_rate,
        }
    }

    fn defaults(&self) -> RateSchedule {
        RateSchedule::new(self.default_base_rate, self.default_overtime_rate)
    }

    /// Current rates; the configured defaults when nothing is stored yet
    pub async fn get(&self) -> Result<RateSchedule, ParkingError> {
        let stored = self
            .repo
            .get()
            .await
            .context("Failed to load rate schedule")?;
        Ok(stored.unwrap_or_else(|| self.defaults()))
    }

    /// Replace the rates.
    ///
    /// # Errors
    /// `InvalidRate` if either value is negative, not finite, or above
    /// `MAX_HOURLY_RATE`.
    pub async fn set(&self, input: &UpdateRatesInput) -> Result<RateSchedule, ParkingError> {
        validate_rate("base", input.base_hourly_rate)?;
        validate_rate("overtime", input.overtime_hourly_rate)?;

        let rates = RateSchedule::new(
            round_cents(input.base_hourly_rate),
            round_cents(input.overtime_hourly_rate),
        );
        self.repo
            .set(&rates)
            .await
            .context("Failed to store rate schedule")?;

        tracing::info!(
            base = rates.base_hourly_rate,
            overtime = rates.overtime_hourly_rate,
            "Rate schedule updated"
        );
        Ok(rates)
    }

    /// Restore the configured default rates
    pub async fn reset(&self) -> Result<RateSchedule, ParkingError> {
        let rates = self.defaults();
        self.repo
            .set(&rates)
            .await
            .context("Failed to reset rate schedule")?;

        tracing::info!(
            base = rates.base_hourly_rate,
            overtime = rates.overtime_hourly_rate,
            "Rate schedule reset to defaults"
        );
        Ok(rates)
    }

    /// Store the default rates if no schedule exists yet
    pub async fn ensure_initialized(&self) -> Result<(), ParkingError> {
        let seeded = self
            .repo
            .insert_if_missing(&self.defaults())
            .await
            .context("Failed to seed rate schedule")?;
        if seeded {
            tracing::info!("Seeded default rate schedule");
        }
        Ok(())
    }
}

fn validate_rate(name: &str, value: f64) -> Result<(), ParkingError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ParkingError::InvalidRate(format!(
            "{} hourly rate must be a non-negative number, got {}",
            name, value
        )));
    }
    if value > MAX_HOURLY_RATE {
        return Err(ParkingError::InvalidRate(format!(
            "{} hourly rate must not exceed {}, got {}",
            name, MAX_HOURLY_RATE, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxRateRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> RateScheduleService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        RateScheduleService::new(SqlxRateRepository::boxed(pool), 40.0, 60.0)
    }

    fn input(base: f64, overtime: f64) -> UpdateRatesInput {
        UpdateRatesInput {
            base_hourly_rate: base,
            overtime_hourly_rate: overtime,
        }
    }

    #[tokio::test]
    async fn test_get_falls_back_to_defaults() {
        let service = setup_test_service().await;
        let rates = service.get().await.unwrap();
        assert_eq!(rates.base_hourly_rate, 40.0);
        assert_eq!(rates.overtime_hourly_rate, 60.0);
    }

    #[tokio::test]
    async fn test_set_rounds_to_cents() {
        let service = setup_test_service().await;
        let rates = service.set(&input(45.567, 70.0)).await.unwrap();
        assert_eq!(rates.base_hourly_rate, 45.57);

        let stored = service.get().await.unwrap();
        assert_eq!(stored.base_hourly_rate, 45.57);
        assert_eq!(stored.overtime_hourly_rate, 70.0);
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_rates() {
        let service = setup_test_service().await;
        service.set(&input(50.0, 75.0)).await.unwrap();

        for (base, overtime) in [(-1.0, 60.0), (40.0, f64::NAN), (f64::INFINITY, 60.0)] {
            let result = service.set(&input(base, overtime)).await;
            assert!(matches!(result, Err(ParkingError::InvalidRate(_))));
        }

        // Rejected updates leave the stored schedule untouched
        let stored = service.get().await.unwrap();
        assert_eq!(stored.base_hourly_rate, 50.0);
        assert_eq!(stored.overtime_hourly_rate, 75.0);
    }

    #[tokio::test]
    async fn test_set_rejects_rates_above_cap() {
        let service = setup_test_service().await;

        for (base, overtime) in [(1e307, 60.0), (40.0, f64::MAX), (MAX_HOURLY_RATE + 0.01, 60.0)] {
            let result = service.set(&input(base, overtime)).await;
            assert!(matches!(result, Err(ParkingError::InvalidRate(_))));
        }
        assert_eq!(service.get().await.unwrap().base_hourly_rate, 40.0);

        let rates = service.set(&input(MAX_HOURLY_RATE, MAX_HOURLY_RATE)).await.unwrap();
        assert_eq!(rates.base_hourly_rate, MAX_HOURLY_RATE);
        assert!(rates.upfront_amount(8).is_finite());
    }

    #[tokio::test]
    async fn test_zero_rates_allowed() {
        let service = setup_test_service().await;
        let rates = service.set(&input(0.0, 0.0)).await.unwrap();
        assert_eq!(rates.base_hourly_rate, 0.0);
    }

    #[tokio::test]
    async fn test_reset_and_initialize() {
        let service = setup_test_service().await;
        service.ensure_initialized().await.unwrap();
        service.set(&input(99.0, 120.0)).await.unwrap();

        // Initialization never clobbers a stored schedule
        service.ensure_initialized().await.unwrap();
        assert_eq!(service.get().await.unwrap().base_hourly_rate, 99.0);

        let rates = service.reset().await.unwrap();
        assert_eq!(rates.base_hourly_rate, 40.0);
        assert_eq!(service.get().await.unwrap().overtime_hourly_rate, 60.0);
    }
}
