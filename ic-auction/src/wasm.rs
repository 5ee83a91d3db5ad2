// ============================================================================
// WASM API - equilibrium sessions
// ============================================================================

use chrono::NaiveDate;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

use crate::config::SimulationConfig;
use crate::error::{ForecastError, SimError, SimResult};
use crate::forecast::{ForecastRecord, ForecastTable};
use crate::runner::Runner;

/// Forecast rows for one interconnector, as sent from JS.
#[derive(Debug, Deserialize)]
struct ForecastPayload {
    interconnector: String,
    rows: Vec<ForecastRecord>,
}

/// A loaded forecast table plus the config to solve its dates with.
#[wasm_bindgen]
pub struct EquilibriumSession {
    table: ForecastTable,
    config: SimulationConfig,
}

impl EquilibriumSession {
    pub fn try_new(config: SimulationConfig, forecast_json: &str) -> SimResult<Self> {
        config.validate()?;
        let payload: ForecastPayload = serde_json::from_str(forecast_json)?;
        let table = ForecastTable::new(payload.interconnector, payload.rows)?;
        Ok(Self { table, config })
    }

    pub fn table(&self) -> &ForecastTable {
        &self.table
    }

    /// Solve `date` (ISO `YYYY-MM-DD`) and serialize the report.
    pub fn solve_date_json(&self, date: &str) -> SimResult<String> {
        let date = parse_date(date)?;
        let report = Runner::new(&self.table, &self.config).solve_date(date)?;
        Ok(serde_json::to_string(&report)?)
    }

    pub fn clearing_prices_json(&self, date: &str) -> SimResult<String> {
        let date = parse_date(date)?;
        let report = Runner::new(&self.table, &self.config).solve_date(date)?;
        Ok(serde_json::to_string(&report.clearing_price_rows())?)
    }
}

#[wasm_bindgen]
impl EquilibriumSession {
    #[wasm_bindgen(constructor)]
    pub fn new(config: SimulationConfig, forecast_json: &str) -> Result<EquilibriumSession, JsError> {
        // Better panic messages in browser console
        console_error_panic_hook::set_once();
        Self::try_new(config, forecast_json).map_err(js_error)
    }

    /// Build a session from a JSON config instead of a typed one.
    #[wasm_bindgen]
    pub fn from_json(config_json: &str, forecast_json: &str) -> Result<EquilibriumSession, JsError> {
        console_error_panic_hook::set_once();
        let config = SimulationConfig::from_json(config_json)
            .map_err(|e| js_error(SimError::from(e)))?;
        Self::try_new(config, forecast_json).map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn interconnector(&self) -> String {
        self.table.interconnector.clone()
    }

    /// Dates with forecast rows, ISO formatted.
    #[wasm_bindgen]
    pub fn dates(&self) -> Vec<String> {
        self.table.dates().iter().map(|d| d.to_string()).collect()
    }

    #[wasm_bindgen]
    pub fn get_config(&self) -> SimulationConfig {
        self.config.clone()
    }

    /// Full equilibrium report for `date` as JSON.
    #[wasm_bindgen]
    pub fn solve_date(&self, date: &str) -> Result<String, JsError> {
        self.solve_date_json(date).map_err(js_error)
    }

    /// `[{date, period, clearing_price}]` for `date` as JSON.
    #[wasm_bindgen]
    pub fn clearing_prices(&self, date: &str) -> Result<String, JsError> {
        self.clearing_prices_json(date).map_err(js_error)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ForecastError> {
    raw.parse().map_err(|_| ForecastError::BadDate {
        raw: raw.to_string(),
    })
}

fn js_error(error: SimError) -> JsError {
    JsError::new(&error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST: &str = r#"{
        "interconnector": "BritNed",
        "rows": [
            {"date": "2024-03-02", "period": 1,
             "forecast_domestic_price": 48.0, "forecast_foreign_price": 66.0,
             "domestic_forecast_error_stdev": 5.0, "foreign_forecast_error_stdev": 7.0,
             "rolling_correlation": 0.5, "available_capacity": 150.0},
            {"date": "2024-03-02", "period": 2,
             "forecast_domestic_price": 52.0, "forecast_foreign_price": 61.0,
             "domestic_forecast_error_stdev": 5.0, "foreign_forecast_error_stdev": 7.0,
             "rolling_correlation": 0.5, "available_capacity": 150.0}
        ]
    }"#;

    fn config() -> SimulationConfig {
        SimulationConfig {
            number_of_simulations: 10,
            number_of_generators: 2,
            initial_random_evaluations: 1,
            number_of_optimisation_iterations: 2,
            max_sweeps: 2,
            ..Default::default()
        }
    }

    #[test]
    fn session_solves_a_date_to_json() {
        let session = EquilibriumSession::try_new(config(), FORECAST).unwrap();
        assert_eq!(session.dates(), vec!["2024-03-02".to_string()]);
        assert_eq!(session.interconnector(), "BritNed");

        let json = session.solve_date_json("2024-03-02").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["date"], "2024-03-02");
        assert_eq!(value["strategies"]["strategies"].as_array().unwrap().len(), 2);
        assert_eq!(value["clearing_prices"].as_array().unwrap().len(), 2);

        let rows = session.clearing_prices_json("2024-03-02").unwrap();
        let rows: Vec<serde_json::Value> = serde_json::from_str(&rows).unwrap();
        assert_eq!(rows[1]["period"], 2);
    }

    #[test]
    fn bad_input_is_reported() {
        assert!(matches!(
            EquilibriumSession::try_new(config(), "{\"rows\": []}"),
            Err(SimError::Json(_))
        ));

        let session = EquilibriumSession::try_new(config(), FORECAST).unwrap();
        assert!(matches!(
            session.solve_date_json("02/03/2024"),
            Err(SimError::Forecast(ForecastError::BadDate { .. }))
        ));
        assert!(matches!(
            session.solve_date_json("2024-03-09"),
            Err(SimError::Forecast(ForecastError::UnknownDate { .. }))
        ));
    }
}
