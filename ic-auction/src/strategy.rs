//! Generator bidding strategies and their encoding as optimizer decision vectors.

use serde::{Deserialize, Serialize};

use crate::optimizer::Bounds;
use crate::types::{GeneratorId, Price, PricePair, Quantity};

pub const ALPHA_BOUNDS: (f64, f64) = (-5.0, 5.0);
pub const BETA_BOUNDS: (f64, f64) = (0.0, 2.0);

// === STRATEGY ===

/// Bid rule for one generator on one date.
///
/// Bid price is `max(alpha + beta * max(foreign - domestic, 0), 0)` on the
/// generator's private signal, and zero when the foreign signal does not
/// exceed marginal cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub alpha: f64,
    pub beta: f64,
    /// Capacity bid into the auction, one entry per period.
    pub capacity_schedule: Vec<Quantity>,
}

impl Strategy {
    /// alpha = 0, beta = 1, capacity split evenly across the periods.
    pub fn neutral(periods: usize, generator_capacity: Quantity) -> Self {
        let share = if periods > 0 {
            generator_capacity / periods as f64
        } else {
            0.0
        };
        Self {
            alpha: 0.0,
            beta: 1.0,
            capacity_schedule: vec![share; periods],
        }
    }

    pub fn bid_price(&self, signal: PricePair, marginal_cost: Price) -> Price {
        if signal.foreign <= marginal_cost {
            return 0.0;
        }
        (self.alpha + self.beta * signal.positive_spread()).max(0.0)
    }

    pub fn bid_capacity(&self, period_index: usize) -> Quantity {
        self.capacity_schedule
            .get(period_index)
            .copied()
            .unwrap_or(0.0)
    }
}

// === DECISION SPACE ===

/// Maps strategies to and from the bounded vectors the optimizer searches.
///
/// Layout: `[alpha, beta]`, followed by one capacity entry per period when
/// `optimise_capacity` is set.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrategySpace {
    pub periods: usize,
    pub generator_capacity: Quantity,
    pub optimise_capacity: bool,
}

impl StrategySpace {
    pub fn dimensions(&self) -> usize {
        if self.optimise_capacity {
            2 + self.periods
        } else {
            2
        }
    }

    pub fn bounds(&self) -> Bounds {
        let mut lower = vec![ALPHA_BOUNDS.0, BETA_BOUNDS.0];
        let mut upper = vec![ALPHA_BOUNDS.1, BETA_BOUNDS.1];
        if self.optimise_capacity {
            lower.extend(std::iter::repeat_n(0.0, self.periods));
            upper.extend(std::iter::repeat_n(self.generator_capacity, self.periods));
        }
        Bounds { lower, upper }
    }

    pub fn encode(&self, strategy: &Strategy) -> Vec<f64> {
        let mut x = vec![strategy.alpha, strategy.beta];
        if self.optimise_capacity {
            x.extend((0..self.periods).map(|p| strategy.bid_capacity(p)));
        }
        self.bounds().clamp(&mut x);
        x
    }

    /// Strategy for decision vector `x`. Parts of the strategy not in the
    /// search space are taken from `base`.
    pub fn decode(&self, x: &[f64], base: &Strategy) -> Strategy {
        let mut x = x.to_vec();
        x.resize(self.dimensions(), 0.0);
        self.bounds().clamp(&mut x);

        let capacity_schedule = if self.optimise_capacity {
            x[2..].to_vec()
        } else {
            base.capacity_schedule.clone()
        };
        Strategy {
            alpha: x[0],
            beta: x[1],
            capacity_schedule,
        }
    }

    pub fn contains(&self, strategy: &Strategy) -> bool {
        let in_range = |v: f64, (lo, hi): (f64, f64)| v.is_finite() && v >= lo && v <= hi;
        in_range(strategy.alpha, ALPHA_BOUNDS)
            && in_range(strategy.beta, BETA_BOUNDS)
            && strategy.capacity_schedule.len() == self.periods
            && strategy
                .capacity_schedule
                .iter()
                .all(|&c| in_range(c, (0.0, self.generator_capacity)))
    }
}

// === PROFILE ===

/// One strategy per generator, indexed by [`GeneratorId`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub strategies: Vec<Strategy>,
}

impl StrategyProfile {
    pub fn neutral(generators: usize, periods: usize, generator_capacity: Quantity) -> Self {
        Self {
            strategies: vec![Strategy::neutral(periods, generator_capacity); generators],
        }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn get(&self, generator: GeneratorId) -> Option<&Strategy> {
        self.strategies.get(generator.index())
    }

    pub fn set(&mut self, generator: GeneratorId, strategy: Strategy) {
        if let Some(slot) = self.strategies.get_mut(generator.index()) {
            *slot = strategy;
        }
    }

    /// Copy of this profile with one generator's strategy replaced.
    pub fn with_strategy(&self, generator: GeneratorId, strategy: Strategy) -> Self {
        let mut profile = self.clone();
        profile.set(generator, strategy);
        profile
    }

    pub fn iter(&self) -> impl Iterator<Item = (GeneratorId, &Strategy)> {
        self.strategies
            .iter()
            .enumerate()
            .map(|(i, s)| (GeneratorId(i), s))
    }
}
