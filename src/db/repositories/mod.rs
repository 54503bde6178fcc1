//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the storage operations for one part of the facility.

pub mod rate;
pub mod session;
pub mod spot;

pub use rate::{RateRepository, SqlxRateRepository};
pub use session::{RevenueTotals, SessionRepository, SqlxSessionRepository};
pub use spot::{SpotRepository, SqlxSpotRepository};
