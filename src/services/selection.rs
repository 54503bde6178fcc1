//! Spot selection strategies
//!
//! Given the free candidate spots for a request, a selector picks the one to
//! assign. Random selection spreads wear across the lot; lowest-id selection
//! is deterministic.

use crate::config::SelectionStrategy;
use crate::models::{compare_spot_ids, Spot};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

/// Picks one spot out of a non-empty candidate list
pub trait SpotSelector: Send + Sync {
    fn select<'a>(&self, candidates: &'a [Spot]) -> Option<&'a Spot>;

    /// Strategy name for logs
    fn name(&self) -> &'static str;
}

/// Uniformly random choice
pub struct RandomSelector {
    rng: Mutex<StdRng>,
}

impl RandomSelector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence of choices
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl SpotSelector for RandomSelector {
    fn select<'a>(&self, candidates: &'a [Spot]) -> Option<&'a Spot> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        candidates.choose(&mut *rng)
    }

    fn name(&self) -> &'static str {
        "random"
    }
}

/// Lowest id in natural order (`A-2` before `A-10`)
#[derive(Debug, Default, Clone, Copy)]
pub struct LowestIdSelector;

impl SpotSelector for LowestIdSelector {
    fn select<'a>(&self, candidates: &'a [Spot]) -> Option<&'a Spot> {
        candidates
            .iter()
            .min_by(|a, b| compare_spot_ids(&a.id, &b.id))
    }

    fn name(&self) -> &'static str {
        "lowest_id"
    }
}

/// Build the configured selector
pub fn from_config(strategy: SelectionStrategy, seed: Option<u64>) -> Arc<dyn SpotSelector> {
    match strategy {
        SelectionStrategy::Random => match seed {
            Some(seed) => Arc::new(RandomSelector::seeded(seed)),
            None => Arc::new(RandomSelector::new()),
        },
        SelectionStrategy::LowestId => Arc::new(LowestIdSelector),
    }
}
