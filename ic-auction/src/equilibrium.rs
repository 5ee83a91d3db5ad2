//! Iterated best-response search for a day's bidding equilibrium.
//!
//! Each sweep visits generators in index order. A generator's strategy is
//! replaced only when the optimizer's candidate beats the incumbent on a fresh,
//! independent Monte Carlo estimate. After a full pass every generator's
//! utility is re-estimated on one shared draw and compared with the previous
//! sweep's.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::{OptimizerError, SimError, SimResult};
use crate::forecast::DayForecast;
use crate::optimizer::{EvaluationBudget, Optimum, StrategyOptimizer, optimizer_for};
use crate::simulation::seeds::date_seed;
use crate::simulation::{SeedStream, SimulationEngine};
use crate::strategy::{Strategy, StrategyProfile, StrategySpace};
use crate::types::{DEFAULT_UTILITY, GeneratorId, Period, Price};

// === STATE ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverPhase {
    Initializing,
    Sweeping,
    Converged,
    /// Sweep cap reached without convergence.
    Failed,
}

impl SolverPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Sweeping => "sweeping",
            Self::Converged => "converged",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Failed)
    }
}

/// What happened to one generator during one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestResponseRecord {
    pub generator: GeneratorId,
    /// Incumbent utility on a fresh draw.
    pub baseline: f64,
    /// Candidate utility on another fresh draw, if the optimizer produced one.
    pub candidate: Option<f64>,
    pub accepted: bool,
    pub evaluations: usize,
    pub failure: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// 1-based sweep number.
    pub sweep: usize,
    pub responses: Vec<BestResponseRecord>,
    pub utilities: Vec<f64>,
    pub max_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumState {
    pub phase: SolverPhase,
    pub profile: StrategyProfile,
    pub utilities: Vec<f64>,
    pub sweeps: usize,
    pub history: Vec<SweepSummary>,
}

/// Final result of a date's search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquilibriumReport {
    pub date: NaiveDate,
    pub strategies: StrategyProfile,
    pub utilities: Vec<f64>,
    pub converged: bool,
    pub phase: SolverPhase,
    pub sweeps: usize,
    pub periods: Vec<Period>,
    /// Zero-noise clear of the final strategies against the mean forecast.
    pub clearing_prices: Vec<Price>,
    pub history: Vec<SweepSummary>,
}

// === SOLVER ===

pub struct EquilibriumSolver<'a> {
    config: &'a SimulationConfig,
    forecast: &'a DayForecast,
    engine: SimulationEngine<'a>,
    optimizer: Box<dyn StrategyOptimizer>,
    space: StrategySpace,
    seeds: SeedStream,
    state: EquilibriumState,
}

impl<'a> EquilibriumSolver<'a> {
    /// Solver in the `Initializing` phase: neutral strategies, sentinel
    /// utilities, seed derived from the configured seed and the date.
    pub fn new(forecast: &'a DayForecast, config: &'a SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        let periods = forecast.len();
        Ok(Self {
            config,
            forecast,
            engine: SimulationEngine::from_config(forecast, config),
            optimizer: optimizer_for(config.optimizer),
            space: StrategySpace {
                periods,
                generator_capacity: config.generator_capacity,
                optimise_capacity: config.optimise_capacity,
            },
            seeds: SeedStream::new(date_seed(config.seed, forecast.date)),
            state: EquilibriumState {
                phase: SolverPhase::Initializing,
                profile: StrategyProfile::neutral(
                    config.number_of_generators,
                    periods,
                    config.generator_capacity,
                ),
                utilities: vec![DEFAULT_UTILITY; config.number_of_generators],
                sweeps: 0,
                history: Vec::new(),
            },
        })
    }

    pub fn with_optimizer(mut self, optimizer: Box<dyn StrategyOptimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn state(&self) -> &EquilibriumState {
        &self.state
    }

    pub fn phase(&self) -> SolverPhase {
        self.state.phase
    }

    /// Search for `generator`'s best response to the current profile.
    ///
    /// Every candidate is scored on the same seed. Optimizer failures come
    /// back as [`SimError::Optimizer`].
    pub fn best_response(&mut self, generator: GeneratorId) -> SimResult<(Strategy, Optimum)> {
        let base = self
            .state
            .profile
            .get(generator)
            .ok_or(SimError::UnknownGenerator {
                generator,
                count: self.state.profile.len(),
            })?
            .clone();

        let seed = self.seeds.next_seed();
        let bounds = self.space.bounds();
        let start = self.space.encode(&base);
        let budget = EvaluationBudget::from_config(self.config);
        let trials = self.config.number_of_simulations;

        let engine = &self.engine;
        let profile = &self.state.profile;
        let space = self.space;
        let mut hard_error: Option<SimError> = None;
        let mut objective = |x: &[f64]| {
            let candidate = profile.with_strategy(generator, space.decode(x, &base));
            match engine.estimate_utility(generator, &candidate, trials, seed) {
                Ok(estimate) => estimate.utility,
                Err(e) => {
                    hard_error.get_or_insert(e);
                    f64::NAN
                }
            }
        };

        let result = self.optimizer.maximize(
            &mut objective,
            &bounds,
            &start,
            budget,
            self.seeds.rng(),
        );
        if let Some(e) = hard_error {
            return Err(e);
        }
        let optimum = result?;
        Ok((space.decode(&optimum.x, &base), optimum))
    }

    /// One full pass over the generators. Returns the sweep's summary.
    pub fn sweep(&mut self) -> SimResult<&SweepSummary> {
        self.state.phase = SolverPhase::Sweeping;
        let sweep = self.state.sweeps + 1;
        let trials = self.config.number_of_simulations;

        let mut responses = Vec::with_capacity(self.state.profile.len());
        for generator in GeneratorId::all(self.state.profile.len()) {
            let baseline = self
                .engine
                .estimate_utility(generator, &self.state.profile, trials, self.seeds.next_seed())?
                .utility;

            let record = match self.best_response(generator) {
                Ok((strategy, optimum)) => {
                    let trial_profile = self.state.profile.with_strategy(generator, strategy.clone());
                    let candidate = self
                        .engine
                        .estimate_utility(generator, &trial_profile, trials, self.seeds.next_seed())?
                        .utility;
                    let accepted = candidate > baseline;
                    if accepted {
                        self.state.profile.set(generator, strategy);
                    }
                    BestResponseRecord {
                        generator,
                        baseline,
                        candidate: Some(candidate),
                        accepted,
                        evaluations: optimum.evaluations,
                        failure: None,
                    }
                }
                Err(SimError::Optimizer(e)) => failed_response(generator, baseline, &e),
                Err(other) => return Err(other),
            };

            #[cfg(feature = "instrument")]
            {
                let kept = self.state.profile.get(generator);
                let (alpha, beta) = kept.map(|s| (s.alpha, s.beta)).unwrap_or_default();
                tracing::info!(
                    target: "best_response",
                    date = %self.forecast.date,
                    sweep = sweep,
                    generator = generator.index(),
                    baseline = record.baseline,
                    candidate = record.candidate.unwrap_or(f64::NAN),
                    accepted = record.accepted,
                    evaluations = record.evaluations,
                    failed = record.failure.is_some(),
                    alpha = alpha,
                    beta = beta,
                );
            }
            responses.push(record);
        }

        let estimates = self.engine.utility_by_generator(
            &self.state.profile,
            trials,
            self.seeds.next_seed(),
        )?;
        let utilities: Vec<f64> = estimates.iter().map(|e| e.utility).collect();
        let max_change = utilities
            .iter()
            .zip(&self.state.utilities)
            .map(|(new, old)| (new - old).abs())
            .fold(0.0, f64::max);

        #[cfg(feature = "instrument")]
        {
            for ((generator, strategy), estimate) in self.state.profile.iter().zip(&estimates) {
                tracing::info!(
                    target: "sweep",
                    date = %self.forecast.date,
                    sweep = sweep,
                    generator = generator.index(),
                    utility = estimate.utility,
                    mean_profit = estimate.mean,
                    profit_variance = estimate.variance,
                    alpha = strategy.alpha,
                    beta = strategy.beta,
                    max_change = max_change,
                );
            }
        }

        self.state.utilities = utilities.clone();
        self.state.sweeps = sweep;
        self.state.phase = if max_change < self.config.optimisation_tolerance {
            SolverPhase::Converged
        } else if sweep >= self.config.max_sweeps {
            SolverPhase::Failed
        } else {
            SolverPhase::Sweeping
        };

        self.state.history.push(SweepSummary {
            sweep,
            responses,
            utilities,
            max_change,
        });
        // Just pushed.
        Ok(&self.state.history[self.state.history.len() - 1])
    }

    /// Sweep until converged or out of sweeps, then clear the final strategies
    /// at the mean forecast.
    pub fn solve(mut self) -> SimResult<EquilibriumReport> {
        while !self.state.phase.is_terminal() {
            self.sweep()?;
        }

        let representative = self.engine.simulator().clear_at_mean(&self.state.profile)?;
        let converged = self.state.phase == SolverPhase::Converged;

        #[cfg(feature = "instrument")]
        tracing::info!(
            target: "equilibrium",
            date = %self.forecast.date,
            sweeps = self.state.sweeps,
            converged = converged,
            phase = self.state.phase.as_str(),
            generators = self.state.profile.len(),
        );

        Ok(EquilibriumReport {
            date: self.forecast.date,
            strategies: self.state.profile,
            utilities: self.state.utilities,
            converged,
            phase: self.state.phase,
            sweeps: self.state.sweeps,
            periods: self.forecast.periods.iter().map(|p| p.period).collect(),
            clearing_prices: representative.clearing_prices(),
            history: self.state.history,
        })
    }
}

fn failed_response(generator: GeneratorId, baseline: f64, error: &OptimizerError) -> BestResponseRecord {
    #[cfg(feature = "instrument")]
    tracing::warn!(
        target: "best_response",
        generator = generator.index(),
        baseline = baseline,
        error = %error,
    );
    BestResponseRecord {
        generator,
        baseline,
        candidate: None,
        accepted: false,
        evaluations: 0,
        failure: Some(error.to_string()),
    }
}

/// Solve one date with the given config.
pub fn solve_day(forecast: &DayForecast, config: &SimulationConfig) -> SimResult<EquilibriumReport> {
    EquilibriumSolver::new(forecast, config)?.solve()
}
