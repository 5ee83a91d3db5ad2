//! Output tables: clearing prices per (date, period) and the equilibrium
//! strategy of every generator.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::equilibrium::EquilibriumReport;
use crate::types::{Period, Price, Quantity};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearingPriceRow {
    pub date: NaiveDate,
    pub period: Period,
    pub clearing_price: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRow {
    pub date: NaiveDate,
    pub generator: usize,
    pub alpha: f64,
    pub beta: f64,
    pub utility: f64,
    pub converged: bool,
    pub capacity_schedule: Vec<Quantity>,
}

impl EquilibriumReport {
    pub fn clearing_price_rows(&self) -> Vec<ClearingPriceRow> {
        self.periods
            .iter()
            .zip(&self.clearing_prices)
            .map(|(&period, &clearing_price)| ClearingPriceRow {
                date: self.date,
                period,
                clearing_price,
            })
            .collect()
    }

    pub fn strategy_rows(&self) -> Vec<StrategyRow> {
        self.strategies
            .iter()
            .map(|(generator, strategy)| StrategyRow {
                date: self.date,
                generator: generator.index(),
                alpha: strategy.alpha,
                beta: strategy.beta,
                utility: self
                    .utilities
                    .get(generator.index())
                    .copied()
                    .unwrap_or(f64::NAN),
                converged: self.converged,
                capacity_schedule: strategy.capacity_schedule.clone(),
            })
            .collect()
    }
}

#[cfg(feature = "frames")]
pub use frames::{clearing_price_frame, strategy_frame};

#[cfg(feature = "frames")]
mod frames {
    use polars::prelude::*;

    use super::{ClearingPriceRow, StrategyRow};

    fn dates<T>(rows: &[T], date: impl Fn(&T) -> chrono::NaiveDate) -> Vec<String> {
        rows.iter().map(|r| date(r).to_string()).collect()
    }

    /// Columns: date (ISO string), period, clearing_price.
    pub fn clearing_price_frame(rows: &[ClearingPriceRow]) -> PolarsResult<DataFrame> {
        let period: Vec<u32> = rows.iter().map(|r| r.period).collect();
        let price: Vec<f64> = rows.iter().map(|r| r.clearing_price).collect();
        DataFrame::new(vec![
            Column::new("date".into(), dates(rows, |r| r.date)),
            Column::new("period".into(), period),
            Column::new("clearing_price".into(), price),
        ])
    }

    /// One row per (date, generator). The schedule is summarised by its total.
    pub fn strategy_frame(rows: &[StrategyRow]) -> PolarsResult<DataFrame> {
        let generator: Vec<u64> = rows.iter().map(|r| r.generator as u64).collect();
        let alpha: Vec<f64> = rows.iter().map(|r| r.alpha).collect();
        let beta: Vec<f64> = rows.iter().map(|r| r.beta).collect();
        let utility: Vec<f64> = rows.iter().map(|r| r.utility).collect();
        let converged: Vec<bool> = rows.iter().map(|r| r.converged).collect();
        let capacity: Vec<f64> = rows
            .iter()
            .map(|r| r.capacity_schedule.iter().sum())
            .collect();
        DataFrame::new(vec![
            Column::new("date".into(), dates(rows, |r| r.date)),
            Column::new("generator".into(), generator),
            Column::new("alpha".into(), alpha),
            Column::new("beta".into(), beta),
            Column::new("utility".into(), utility),
            Column::new("converged".into(), converged),
            Column::new("capacity_bid_total".into(), capacity),
        ])
    }
}
