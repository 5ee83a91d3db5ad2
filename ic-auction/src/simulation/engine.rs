use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::forecast::DayForecast;
use crate::parallel;
use crate::strategy::StrategyProfile;
use crate::types::GeneratorId;

use super::day::DaySimulator;
use super::seeds::trial_rng;

/// Mean-variance utility of a profit sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UtilityEstimate {
    pub mean: f64,
    /// Population variance (divides by the number of trials).
    pub variance: f64,
    pub utility: f64,
    pub trials: usize,
}

impl UtilityEstimate {
    pub fn from_profits(profits: &[f64], risk_aversion: f64) -> SimResult<Self> {
        if profits.is_empty() {
            return Err(SimError::NoTrials);
        }
        let n = profits.len() as f64;
        let mean = profits.iter().sum::<f64>() / n;
        let variance = profits.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        Ok(Self {
            mean,
            variance,
            utility: mean - risk_aversion * variance,
            trials: profits.len(),
        })
    }
}

/// Monte Carlo utility estimates over repeated simulated days.
///
/// Trial `t` of an evaluation with seed `s` always draws from the same RNG
/// stream, so estimates are identical whether trials run on the pool or not.
#[derive(Clone, Copy, Debug)]
pub struct SimulationEngine<'a> {
    simulator: DaySimulator<'a>,
    risk_aversion: f64,
    parallel_trials: bool,
}

impl<'a> SimulationEngine<'a> {
    pub fn new(simulator: DaySimulator<'a>, risk_aversion: f64) -> Self {
        Self {
            simulator,
            risk_aversion,
            parallel_trials: true,
        }
    }

    pub fn from_config(forecast: &'a DayForecast, config: &SimulationConfig) -> Self {
        Self::new(DaySimulator::from_config(forecast, config), config.risk_aversion)
            .with_parallel_trials(config.parallel_trials)
    }

    pub fn with_parallel_trials(mut self, parallel_trials: bool) -> Self {
        self.parallel_trials = parallel_trials;
        self
    }

    pub fn simulator(&self) -> &DaySimulator<'a> {
        &self.simulator
    }

    pub fn estimate_utility(
        &self,
        generator: GeneratorId,
        profile: &StrategyProfile,
        trials: usize,
        seed: u64,
    ) -> SimResult<UtilityEstimate> {
        if generator.index() >= profile.len() {
            return Err(SimError::UnknownGenerator {
                generator,
                count: profile.len(),
            });
        }
        let runs = self.run_trials(profile, trials, seed)?;
        let profits: Vec<f64> = runs.iter().map(|r| r[generator.index()]).collect();
        UtilityEstimate::from_profits(&profits, self.risk_aversion)
    }

    /// Utility of every generator, all estimated from the same draws.
    pub fn utility_by_generator(
        &self,
        profile: &StrategyProfile,
        trials: usize,
        seed: u64,
    ) -> SimResult<Vec<UtilityEstimate>> {
        let runs = self.run_trials(profile, trials, seed)?;
        (0..profile.len())
            .map(|g| {
                let profits: Vec<f64> = runs.iter().map(|r| r[g]).collect();
                UtilityEstimate::from_profits(&profits, self.risk_aversion)
            })
            .collect()
    }

    /// Profit vector of each trial, in trial order.
    fn run_trials(
        &self,
        profile: &StrategyProfile,
        trials: usize,
        seed: u64,
    ) -> SimResult<Vec<Vec<f64>>> {
        if trials == 0 {
            return Err(SimError::NoTrials);
        }
        self.simulator.check_profile(profile)?;

        let simulator = &self.simulator;
        parallel::map_range(
            trials,
            |t| {
                simulator
                    .simulate(profile, &mut trial_rng(seed, t))
                    .map(|outcome| outcome.profits)
            },
            !self.parallel_trials,
        )
        .into_iter()
        .collect()
    }
}
