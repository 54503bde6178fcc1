//! Parking spot model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Spot classification governing matching and fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpotCategory {
    #[default]
    Regular,
    Disability,
    Electric,
}

impl SpotCategory {
    pub const ALL: [SpotCategory; 3] = [Self::Regular, Self::Disability, Self::Electric];

    /// Id prefix used for generated spot ids (`A-1`, `D-1`, `E-1`)
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Regular => "A",
            Self::Disability => "D",
            Self::Electric => "E",
        }
    }

    /// Category to retry with when this one has no free spot.
    /// Regular vehicles never fall back to special categories.
    pub fn fallback(&self) -> Option<SpotCategory> {
        match self {
            Self::Regular => None,
            Self::Disability | Self::Electric => Some(Self::Regular),
        }
    }
}

impl std::fmt::Display for SpotCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular => write!(f, "regular"),
            Self::Disability => write!(f, "disability"),
            Self::Electric => write!(f, "electric"),
        }
    }
}

impl std::str::FromStr for SpotCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regular" => Ok(Self::Regular),
            "disability" => Ok(Self::Disability),
            "electric" => Ok(Self::Electric),
            _ => Err(anyhow::anyhow!("Invalid spot category: {}", s)),
        }
    }
}

/// A parking spot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    pub id: String,
    pub category: SpotCategory,
    pub occupied: bool,
    /// Set iff `occupied`
    pub occupant_plate: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Spot {
    /// Create a free spot
    pub fn new(id: impl Into<String>, category: SpotCategory) -> Self {
        Self {
            id: id.into(),
            category,
            occupied: false,
            occupant_plate: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_free(&self) -> bool {
        !self.occupied
    }

    /// Occupancy flag and occupant plate agree
    pub fn is_consistent(&self) -> bool {
        match &self.occupant_plate {
            Some(plate) => self.occupied && !plate.is_empty(),
            None => !self.occupied,
        }
    }
}

/// Natural ordering of spot ids: `A-2` sorts before `A-10`.
pub fn compare_spot_ids(a: &str, b: &str) -> Ordering {
    split_spot_id(a)
        .cmp(&split_spot_id(b))
        .then_with(|| a.cmp(b))
}

fn split_spot_id(id: &str) -> (&str, u64) {
    match id.rsplit_once('-') {
        Some((prefix, seq)) => match seq.parse::<u64>() {
            Ok(n) => (prefix, n),
            Err(_) => (id, 0),
        },
        None => (id, 0),
    }
}

/// Next free sequence id for a category given the ids already in use.
///
/// `None` when the highest sequence number in use is `u64::MAX`.
pub fn next_spot_id<'a>(
    category: SpotCategory,
    existing: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let prefix = category.id_prefix();
    let max = existing
        .into_iter()
        .filter_map(|id| {
            let (p, n) = split_spot_id(id);
            (p == prefix).then_some(n)
        })
        .max()
        .unwrap_or(0);
    let next = max.checked_add(1)?;
    Some(format!("{}-{}", prefix, next))
}

/// Input for adding a spot
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSpotInput {
    /// Explicit id; generated from the category prefix when absent
    #[serde(default)]
    pub id: Option<String>,
    pub category: SpotCategory,
}

/// Listing filter for spots
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotFilter {
    pub category: Option<SpotCategory>,
    /// `Some(true)` for free spots only, `Some(false)` for occupied only
    pub free: Option<bool>,
}

/// Occupancy counts for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OccupancySummary {
    pub category: SpotCategory,
    pub total: u32,
    pub occupied: u32,
    pub free: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_and_display() {
        for category in SpotCategory::ALL {
            let parsed: SpotCategory = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
        assert_eq!("Disability".parse::<SpotCategory>().unwrap(), SpotCategory::Disability);
        assert!("motorcycle".parse::<SpotCategory>().is_err());
    }

    #[test]
    fn test_fallback_rules() {
        assert_eq!(SpotCategory::Regular.fallback(), None);
        assert_eq!(SpotCategory::Disability.fallback(), Some(SpotCategory::Regular));
        assert_eq!(SpotCategory::Electric.fallback(), Some(SpotCategory::Regular));
    }

    #[test]
    fn test_natural_id_order() {
        let mut ids = vec!["A-10", "A-2", "D-1", "A-1"];
        ids.sort_by(|a, b| compare_spot_ids(a, b));
        assert_eq!(ids, vec!["A-1", "A-2", "A-10", "D-1"]);
    }

    #[test]
    fn test_natural_order_with_irregular_ids() {
        assert_eq!(compare_spot_ids("VIP", "VIP"), Ordering::Equal);
        assert_eq!(compare_spot_ids("A-x", "A-y"), Ordering::Less);
    }

    #[test]
    fn test_next_spot_id() {
        let existing = ["A-1", "A-7", "D-2", "custom"];
        assert_eq!(next_spot_id(SpotCategory::Regular, existing).as_deref(), Some("A-8"));
        assert_eq!(next_spot_id(SpotCategory::Disability, existing).as_deref(), Some("D-3"));
        assert_eq!(next_spot_id(SpotCategory::Electric, existing).as_deref(), Some("E-1"));
    }

    #[test]
    fn test_next_spot_id_exhausted() {
        let existing = ["A-18446744073709551615", "D-4"];
        assert_eq!(next_spot_id(SpotCategory::Regular, existing), None);
        assert_eq!(next_spot_id(SpotCategory::Disability, existing).as_deref(), Some("D-5"));
    }

    #[test]
    fn test_spot_consistency() {
        let mut spot = Spot::new("A-1", SpotCategory::Regular);
        assert!(spot.is_free());
        assert!(spot.is_consistent());

        spot.occupied = true;
        assert!(!spot.is_consistent());

        spot.occupant_plate = Some("KA01".to_string());
        assert!(spot.is_consistent());
    }
}
