//! Simulated trading days and Monte Carlo utility estimation.

pub mod day;
pub mod engine;
pub mod seeds;

pub use day::{DayOutcome, DaySimulator};
pub use engine::{SimulationEngine, UtilityEstimate};
pub use seeds::SeedStream;
