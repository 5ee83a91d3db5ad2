use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::ConfigError;

// ============================================================================
// Optimizer selection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    /// Incumbent + low-discrepancy probes, then adaptive local refinement.
    #[default]
    ProbeRefine,
    /// Bounded simplex direct search.
    NelderMead,
}

// ============================================================================
// Simulation config
// ============================================================================

/// Every tunable of a day's equilibrium search.
///
/// Unknown JSON fields are rejected; missing ones take the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub number_of_simulations: usize,
    pub number_of_generators: usize,
    pub generator_marginal_cost: f64,
    pub generator_capacity: f64,
    pub risk_aversion: f64,
    pub optimisation_tolerance: f64,
    pub initial_random_evaluations: usize,
    pub number_of_optimisation_iterations: usize,
    pub max_sweeps: usize,

    /// Root of every random draw in a run.
    pub seed: u64,
    /// Include the per-period capacity schedule in the best-response search.
    pub optimise_capacity: bool,
    pub optimizer: OptimizerKind,
    /// Run Monte Carlo trials on the rayon pool (needs the `parallel` feature).
    pub parallel_trials: bool,
    /// How many earlier days a missing forecast value may be filled from.
    pub max_lookback_days: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            number_of_simulations: 200,
            number_of_generators: 3,
            generator_marginal_cost: 0.0,
            generator_capacity: 100.0,
            risk_aversion: 0.0,
            optimisation_tolerance: 1e-3,
            initial_random_evaluations: 5,
            number_of_optimisation_iterations: 20,
            max_sweeps: 25,
            seed: 42,
            optimise_capacity: false,
            optimizer: OptimizerKind::ProbeRefine,
            parallel_trials: true,
            max_lookback_days: 7,
        }
    }
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn check(
            ok: bool,
            field: &'static str,
            requirement: &'static str,
            value: f64,
        ) -> Result<(), ConfigError> {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::OutOfRange {
                    field,
                    requirement,
                    value,
                })
            }
        }

        check(
            self.number_of_simulations > 0,
            "number_of_simulations",
            "at least 1",
            self.number_of_simulations as f64,
        )?;
        check(
            self.number_of_generators > 0,
            "number_of_generators",
            "at least 1",
            self.number_of_generators as f64,
        )?;
        check(
            self.generator_marginal_cost.is_finite(),
            "generator_marginal_cost",
            "finite",
            self.generator_marginal_cost,
        )?;
        check(
            self.generator_capacity.is_finite() && self.generator_capacity >= 0.0,
            "generator_capacity",
            "finite and non-negative",
            self.generator_capacity,
        )?;
        check(
            self.risk_aversion.is_finite() && self.risk_aversion >= 0.0,
            "risk_aversion",
            "finite and non-negative",
            self.risk_aversion,
        )?;
        check(
            self.optimisation_tolerance.is_finite() && self.optimisation_tolerance > 0.0,
            "optimisation_tolerance",
            "finite and positive",
            self.optimisation_tolerance,
        )?;
        check(
            self.initial_random_evaluations + self.number_of_optimisation_iterations > 0,
            "number_of_optimisation_iterations",
            "positive when initial_random_evaluations is 0",
            self.number_of_optimisation_iterations as f64,
        )?;
        check(
            self.max_sweeps > 0,
            "max_sweeps",
            "at least 1",
            self.max_sweeps as f64,
        )?;
        Ok(())
    }
}
