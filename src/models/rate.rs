//! Rate schedule model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest hourly rate the schedule accepts
pub const MAX_HOURLY_RATE: f64 = 1_000_000.0;

/// Hourly rates shared by every spot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    /// Charged for hours within the selected plan
    pub base_hourly_rate: f64,
    /// Charged for hours exceeding the selected plan
    pub overtime_hourly_rate: f64,
    pub updated_at: DateTime<Utc>,
}

impl RateSchedule {
    pub fn new(base_hourly_rate: f64, overtime_hourly_rate: f64) -> Self {
        Self {
            base_hourly_rate,
            overtime_hourly_rate,
            updated_at: Utc::now(),
        }
    }

    /// Amount collected at entry for a plan: `plan_hours * base_rate`
    pub fn upfront_amount(&self, plan_hours: u32) -> f64 {
        round_cents(plan_hours as f64 * self.base_hourly_rate)
    }
}

/// Round a currency amount to 2 decimal places
pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Input for the "set rates" admin operation
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRatesInput {
    pub base_hourly_rate: f64,
    pub overtime_hourly_rate: f64,
}
