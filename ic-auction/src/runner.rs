//! Equilibrium searches over many dates of one interconnector.
//!
//! Dates share nothing: each gets its own solver and a seed derived from the
//! configured seed and the date, so a run gives the same reports whether dates
//! are solved one after another or on the pool.

use chrono::NaiveDate;

use crate::config::SimulationConfig;
use crate::equilibrium::{EquilibriumReport, solve_day};
use crate::error::{SimError, SimResult};
use crate::forecast::ForecastTable;
use crate::parallel;
use crate::report::{ClearingPriceRow, StrategyRow};

/// A date whose search could not run.
#[derive(Debug)]
pub struct DateFailure {
    pub date: NaiveDate,
    pub error: SimError,
}

#[derive(Debug, Default)]
pub struct RunOutcome {
    pub interconnector: String,
    /// Reports in date order.
    pub reports: Vec<EquilibriumReport>,
    pub failures: Vec<DateFailure>,
}

impl RunOutcome {
    pub fn clearing_price_rows(&self) -> Vec<ClearingPriceRow> {
        self.reports
            .iter()
            .flat_map(|r| r.clearing_price_rows())
            .collect()
    }

    pub fn strategy_rows(&self) -> Vec<StrategyRow> {
        self.reports.iter().flat_map(|r| r.strategy_rows()).collect()
    }
}

pub struct Runner<'a> {
    table: &'a ForecastTable,
    config: &'a SimulationConfig,
    parallel_dates: bool,
}

impl<'a> Runner<'a> {
    pub fn new(table: &'a ForecastTable, config: &'a SimulationConfig) -> Self {
        Self {
            table,
            config,
            parallel_dates: true,
        }
    }

    pub fn with_parallel_dates(mut self, parallel_dates: bool) -> Self {
        self.parallel_dates = parallel_dates;
        self
    }

    /// Load the date's forecast (backfilling within the configured window)
    /// and solve it.
    pub fn solve_date(&self, date: NaiveDate) -> SimResult<EquilibriumReport> {
        let forecast = self
            .table
            .day_with_backfill(date, self.config.max_lookback_days)?;
        solve_day(&forecast, self.config)
    }

    pub fn run(&self, dates: &[NaiveDate]) -> RunOutcome {
        let results = parallel::map_slice(
            dates,
            |&date| (date, self.solve_date(date)),
            !self.parallel_dates,
        );

        let mut outcome = RunOutcome {
            interconnector: self.table.interconnector.clone(),
            ..Default::default()
        };
        for (date, result) in results {
            match result {
                Ok(report) => outcome.reports.push(report),
                Err(error) => {
                    #[cfg(feature = "instrument")]
                    tracing::warn!(
                        target: "equilibrium",
                        interconnector = %outcome.interconnector,
                        date = %date,
                        error = %error,
                    );
                    outcome.failures.push(DateFailure { date, error });
                }
            }
        }
        outcome
    }

    /// Every date in the table.
    pub fn run_all(&self) -> RunOutcome {
        self.run(&self.table.dates())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForecastError;
    use crate::forecast::ForecastRecord;

    fn table() -> ForecastTable {
        let mut records = Vec::new();
        for day in ["2024-03-01", "2024-03-02"] {
            for period in 1..=2 {
                records.push(ForecastRecord::complete(
                    day.parse().unwrap(),
                    period,
                    45.0,
                    60.0,
                    4.0,
                    6.0,
                    0.4,
                    120.0,
                ));
            }
        }
        // Third day is missing a value with nothing to backfill from.
        let mut broken = ForecastRecord::complete(
            "2024-03-05".parse().unwrap(),
            1,
            45.0,
            60.0,
            4.0,
            6.0,
            0.4,
            120.0,
        );
        broken.forecast_foreign_price = None;
        records.push(broken);
        ForecastTable::new("IFA 1", records).unwrap()
    }

    fn config() -> SimulationConfig {
        SimulationConfig {
            number_of_simulations: 10,
            number_of_generators: 2,
            initial_random_evaluations: 2,
            number_of_optimisation_iterations: 2,
            max_sweeps: 2,
            max_lookback_days: 2,
            ..Default::default()
        }
    }

    #[test]
    fn failed_dates_do_not_stop_the_run() {
        let table = table();
        let config = config();
        let outcome = Runner::new(&table, &config).run_all();

        assert_eq!(outcome.interconnector, "IFA 1");
        assert_eq!(outcome.reports.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0].error,
            SimError::Forecast(ForecastError::LookbackExhausted { .. })
        ));
        assert_eq!(outcome.clearing_price_rows().len(), 4);
        assert_eq!(outcome.strategy_rows().len(), 4);
    }

    #[test]
    fn parallel_and_sequential_dates_agree() {
        let table = table();
        let config = config();
        let dates = table.dates();
        let par = Runner::new(&table, &config).run(&dates);
        let seq = Runner::new(&table, &config)
            .with_parallel_dates(false)
            .run(&dates);
        assert_eq!(par.reports, seq.reports);
    }
}
