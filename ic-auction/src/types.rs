// Core ID types and type aliases

use serde::{Deserialize, Serialize};

// === TYPE ALIASES ===

pub type Price = f64;
pub type Quantity = f64;

/// 1-based settlement period within a trading day.
pub type Period = u32;

/// Tolerance used when comparing accumulated capacities.
pub const CAPACITY_EPSILON: f64 = 1e-9;

/// Utility assigned to every generator before the first sweep.
pub const DEFAULT_UTILITY: f64 = -1e10;

// === NEWTYPE IDS ===

/// Dense generator index. Generators are stored in `Vec`s and this indexes them.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GeneratorId(pub usize);

impl GeneratorId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// All ids for a market of `count` generators, in sweep order.
    pub fn all(count: usize) -> impl Iterator<Item = GeneratorId> {
        (0..count).map(GeneratorId)
    }
}

impl std::fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

// === PRICES ===

/// A (domestic, foreign) price observation for one period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PricePair {
    pub domestic: Price,
    pub foreign: Price,
}

impl PricePair {
    pub fn new(domestic: Price, foreign: Price) -> Self {
        Self { domestic, foreign }
    }

    /// Foreign minus domestic, floored at zero.
    pub fn positive_spread(&self) -> Price {
        (self.foreign - self.domestic).max(0.0)
    }
}
