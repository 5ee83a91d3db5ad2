//! Derivative-free maximisation over bounded boxes.
//!
//! The objective is a Monte Carlo utility estimate: noisy, piecewise constant
//! in the bid parameters, and only defined inside the box. Backends never
//! call it outside `bounds` and never report an optimum they did not evaluate.

pub mod halton;
pub mod probe;
pub mod simplex;

use rand::rngs::StdRng;

use crate::config::{OptimizerKind, SimulationConfig};
use crate::error::OptimizerError;

pub use probe::ProbeRefine;
pub use simplex::NelderMead;

// === BOUNDS ===

#[derive(Clone, Debug, PartialEq)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, OptimizerError> {
        let bounds = Self { lower, upper };
        bounds.validate()?;
        Ok(bounds)
    }

    pub fn validate(&self) -> Result<(), OptimizerError> {
        if self.lower.len() != self.upper.len() {
            return Err(OptimizerError::InvalidBounds(format!(
                "{} lower vs {} upper entries",
                self.lower.len(),
                self.upper.len()
            )));
        }
        if self.lower.is_empty() {
            return Err(OptimizerError::InvalidBounds("no dimensions".into()));
        }
        for (i, (lo, hi)) in self.lower.iter().zip(&self.upper).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(OptimizerError::InvalidBounds(format!(
                    "dimension {i}: [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }

    pub fn dimensions(&self) -> usize {
        self.lower.len()
    }

    pub fn width(&self, i: usize) -> f64 {
        self.upper[i] - self.lower[i]
    }

    pub fn clamp(&self, x: &mut [f64]) {
        for (i, v) in x.iter_mut().enumerate().take(self.dimensions()) {
            *v = if v.is_finite() {
                v.clamp(self.lower[i], self.upper[i])
            } else {
                self.lower[i]
            };
        }
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dimensions()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }

    /// Map a point of the unit cube into the box.
    pub fn from_unit(&self, u: &[f64]) -> Vec<f64> {
        u.iter()
            .enumerate()
            .map(|(i, t)| self.lower[i] + t.clamp(0.0, 1.0) * self.width(i))
            .collect()
    }
}

// === SEARCH CONTRACT ===

/// How many objective evaluations a search may spend beyond the start point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvaluationBudget {
    /// Space-filling probes before any local search.
    pub probes: usize,
    pub iterations: usize,
}

impl EvaluationBudget {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            probes: config.initial_random_evaluations,
            iterations: config.number_of_optimisation_iterations,
        }
    }

    pub fn total(&self) -> usize {
        self.probes + self.iterations
    }
}

/// Best point a search evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct Optimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
}

/// Bounded derivative-free maximiser.
pub trait StrategyOptimizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Maximise `objective` over `bounds` from `start`. Non-finite objective
    /// values count against the budget but can never be the optimum.
    fn maximize(
        &self,
        objective: &mut dyn FnMut(&[f64]) -> f64,
        bounds: &Bounds,
        start: &[f64],
        budget: EvaluationBudget,
        rng: &mut StdRng,
    ) -> Result<Optimum, OptimizerError>;
}

pub fn optimizer_for(kind: OptimizerKind) -> Box<dyn StrategyOptimizer> {
    match kind {
        OptimizerKind::ProbeRefine => Box::new(ProbeRefine::default()),
        OptimizerKind::NelderMead => Box::new(NelderMead::default()),
    }
}

// === SHARED BOOKKEEPING ===

/// Start point clamped into a validated box.
fn prepare_start(bounds: &Bounds, start: &[f64]) -> Result<Vec<f64>, OptimizerError> {
    bounds.validate()?;
    if start.len() != bounds.dimensions() {
        return Err(OptimizerError::InvalidBounds(format!(
            "start point has {} entries for {} dimensions",
            start.len(),
            bounds.dimensions()
        )));
    }
    let mut x = start.to_vec();
    bounds.clamp(&mut x);
    Ok(x)
}

/// Counts evaluations and remembers the best finite one.
struct Tracker<'o> {
    objective: &'o mut dyn FnMut(&[f64]) -> f64,
    evaluations: usize,
    best: Option<(Vec<f64>, f64)>,
}

impl<'o> Tracker<'o> {
    fn new(objective: &'o mut dyn FnMut(&[f64]) -> f64) -> Self {
        Self {
            objective,
            evaluations: 0,
            best: None,
        }
    }

    /// Objective value at `x`, with non-finite results mapped to -inf.
    fn eval(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        let value = (self.objective)(x);
        if !value.is_finite() {
            return f64::NEG_INFINITY;
        }
        let improves = self.best.as_ref().is_none_or(|(_, best)| value > *best);
        if improves {
            self.best = Some((x.to_vec(), value));
        }
        value
    }

    fn best(&self) -> Option<(&[f64], f64)> {
        self.best.as_ref().map(|(x, v)| (x.as_slice(), *v))
    }

    fn finish(self) -> Result<Optimum, OptimizerError> {
        match self.best {
            Some((x, value)) => Ok(Optimum {
                x,
                value,
                evaluations: self.evaluations,
            }),
            None => Err(OptimizerError::NoFiniteEvaluation {
                evaluations: self.evaluations,
            }),
        }
    }
}
