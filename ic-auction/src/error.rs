//! Error types for forecast loading, auction assembly, optimisation and solving.
//!
//! Degenerate auctions are not errors; they clear to zero. Everything here is
//! a condition the caller has to act on.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::{GeneratorId, Period};

/// Problems with the per-period forecast input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("forecast for {date} period {period} is missing `{field}`")]
    MissingValue {
        date: NaiveDate,
        period: Period,
        field: &'static str,
    },

    #[error("forecast for {date} period {period} has invalid `{field}` = {value}")]
    InvalidValue {
        date: NaiveDate,
        period: Period,
        field: &'static str,
        value: f64,
    },

    #[error(
        "forecast for {date} period {period} is missing `{field}` and no value was found within {lookback_days} earlier days"
    )]
    LookbackExhausted {
        date: NaiveDate,
        period: Period,
        field: &'static str,
        lookback_days: u32,
    },

    #[error("duplicate forecast row for {date} period {period}")]
    DuplicateRow { date: NaiveDate, period: Period },

    #[error("no forecast rows for {date}")]
    UnknownDate { date: NaiveDate },

    #[error("forecast for {date} skips period {period}")]
    MissingPeriod { date: NaiveDate, period: Period },

    #[error("unparseable forecast date `{raw}`")]
    BadDate { raw: String },

    #[error("forecast row {row} has no date or period")]
    MissingKey { row: usize },
}

/// Bid tables that cannot be cleared as a day.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuctionError {
    #[error("bid table has {bid_periods} periods but capacity vector has {capacity_periods}")]
    PeriodMismatch {
        bid_periods: usize,
        capacity_periods: usize,
    },
}

/// Outcomes of a derivative-free search that must not be adopted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("evaluation budget is empty")]
    EmptyBudget,

    #[error("bounds are invalid: {0}")]
    InvalidBounds(String),

    #[error("objective never returned a finite value in {evaluations} evaluations")]
    NoFiniteEvaluation { evaluations: usize },

    #[error("search did not converge within {evaluations} evaluations (spread {spread:.3e})")]
    NotConverged { evaluations: usize, spread: f64 },
}

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("`{field}` must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("config is not valid JSON: {0}")]
    Json(String),
}

/// Top-level error for simulation and equilibrium runs.
#[derive(Error, Debug)]
pub enum SimError {
    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Auction(#[from] AuctionError),

    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("monte carlo estimate needs at least one trial")]
    NoTrials,

    #[error("{generator} is not part of a {count}-generator market")]
    UnknownGenerator { generator: GeneratorId, count: usize },

    #[error("strategy profile has {actual} schedules for {expected} periods")]
    ScheduleLength { expected: usize, actual: usize },

    #[cfg(feature = "frames")]
    #[error("dataframe error: {0}")]
    Frame(#[from] polars::prelude::PolarsError),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;
