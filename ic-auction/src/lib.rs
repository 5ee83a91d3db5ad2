//! Day-ahead interconnector capacity auction with Monte Carlo utility
//! estimation and an iterated best-response equilibrium search.

pub mod auction;
pub mod config;
pub mod equilibrium;
pub mod error;
pub mod forecast;
pub mod optimizer;
mod parallel;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod simulation;
pub mod strategy;
pub mod types;
mod wasm;

#[cfg(feature = "instrument")]
pub use instrument;

pub use auction::{Bid, BidBook, DayClearing, PeriodClearing, clear_day, clear_period};
pub use config::{OptimizerKind, SimulationConfig};
pub use equilibrium::{
    BestResponseRecord, EquilibriumReport, EquilibriumSolver, EquilibriumState, SolverPhase,
    SweepSummary, solve_day,
};
pub use error::{AuctionError, ConfigError, ForecastError, OptimizerError, SimError, SimResult};
pub use forecast::{DayForecast, ForecastRecord, ForecastTable, PeriodForecast};
pub use optimizer::{Bounds, EvaluationBudget, Optimum, StrategyOptimizer};
pub use report::{ClearingPriceRow, StrategyRow};
pub use runner::{RunOutcome, Runner};
pub use scenario::{DayScenario, PeriodScenario, PriceScenarioGenerator};
pub use simulation::{DayOutcome, DaySimulator, SeedStream, SimulationEngine, UtilityEstimate};
pub use strategy::{Strategy, StrategyProfile, StrategySpace};
pub use types::*;
pub use wasm::EquilibriumSession;
