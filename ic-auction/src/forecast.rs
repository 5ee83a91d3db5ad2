//! Per-interconnector forecast input.
//!
//! Rows arrive from the forecasting side with possibly missing values. A
//! [`DayForecast`] only exists once every period of the date has been checked,
//! so downstream arithmetic never sees a NaN.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;
use crate::types::{Period, PricePair, Quantity};

/// Correlations this far outside [-1, 1] are rounding noise and get clamped.
const CORRELATION_SLACK: f64 = 1e-9;

// === RAW ROWS ===

/// One (date, period) row as supplied by the forecasting subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub date: NaiveDate,
    #[serde(alias = "delivery_period")]
    pub period: Period,
    pub forecast_domestic_price: Option<f64>,
    pub forecast_foreign_price: Option<f64>,
    pub domestic_forecast_error_stdev: Option<f64>,
    pub foreign_forecast_error_stdev: Option<f64>,
    pub rolling_correlation: Option<f64>,
    pub available_capacity: Option<f64>,
}

impl ForecastRecord {
    /// A fully populated row.
    #[allow(clippy::too_many_arguments)]
    pub fn complete(
        date: NaiveDate,
        period: Period,
        domestic: f64,
        foreign: f64,
        domestic_stdev: f64,
        foreign_stdev: f64,
        correlation: f64,
        available_capacity: f64,
    ) -> Self {
        Self {
            date,
            period,
            forecast_domestic_price: Some(domestic),
            forecast_foreign_price: Some(foreign),
            domestic_forecast_error_stdev: Some(domestic_stdev),
            foreign_forecast_error_stdev: Some(foreign_stdev),
            rolling_correlation: Some(correlation),
            available_capacity: Some(available_capacity),
        }
    }
}

/// The value columns of a forecast row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastField {
    DomesticPrice,
    ForeignPrice,
    DomesticStdev,
    ForeignStdev,
    Correlation,
    AvailableCapacity,
}

impl ForecastField {
    pub const ALL: [ForecastField; 6] = [
        ForecastField::DomesticPrice,
        ForecastField::ForeignPrice,
        ForecastField::DomesticStdev,
        ForecastField::ForeignStdev,
        ForecastField::Correlation,
        ForecastField::AvailableCapacity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::DomesticPrice => "forecast_domestic_price",
            Self::ForeignPrice => "forecast_foreign_price",
            Self::DomesticStdev => "domestic_forecast_error_stdev",
            Self::ForeignStdev => "foreign_forecast_error_stdev",
            Self::Correlation => "rolling_correlation",
            Self::AvailableCapacity => "available_capacity",
        }
    }

    /// The field's value, treating NaN the same as absent.
    pub fn get(self, record: &ForecastRecord) -> Option<f64> {
        let value = match self {
            Self::DomesticPrice => record.forecast_domestic_price,
            Self::ForeignPrice => record.forecast_foreign_price,
            Self::DomesticStdev => record.domestic_forecast_error_stdev,
            Self::ForeignStdev => record.foreign_forecast_error_stdev,
            Self::Correlation => record.rolling_correlation,
            Self::AvailableCapacity => record.available_capacity,
        };
        value.filter(|v| !v.is_nan())
    }

    fn set(self, record: &mut ForecastRecord, value: f64) {
        let slot = match self {
            Self::DomesticPrice => &mut record.forecast_domestic_price,
            Self::ForeignPrice => &mut record.forecast_foreign_price,
            Self::DomesticStdev => &mut record.domestic_forecast_error_stdev,
            Self::ForeignStdev => &mut record.foreign_forecast_error_stdev,
            Self::Correlation => &mut record.rolling_correlation,
            Self::AvailableCapacity => &mut record.available_capacity,
        };
        *slot = Some(value);
    }
}

// === VALIDATED FORECASTS ===

/// Validated forecast for one delivery period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodForecast {
    pub period: Period,
    pub mean: PricePair,
    pub domestic_stdev: f64,
    pub foreign_stdev: f64,
    pub correlation: f64,
    pub available_capacity: Quantity,
}

impl PeriodForecast {
    fn from_record(record: &ForecastRecord) -> Result<Self, ForecastError> {
        let value = |field: ForecastField| -> Result<f64, ForecastError> {
            let v = field.get(record).ok_or(ForecastError::MissingValue {
                date: record.date,
                period: record.period,
                field: field.name(),
            })?;
            if v.is_finite() {
                Ok(v)
            } else {
                Err(invalid(record, field, v))
            }
        };

        let domestic = value(ForecastField::DomesticPrice)?;
        let foreign = value(ForecastField::ForeignPrice)?;
        let domestic_stdev = value(ForecastField::DomesticStdev)?;
        let foreign_stdev = value(ForecastField::ForeignStdev)?;
        let correlation = value(ForecastField::Correlation)?;
        let available_capacity = value(ForecastField::AvailableCapacity)?;

        if domestic_stdev < 0.0 {
            return Err(invalid(record, ForecastField::DomesticStdev, domestic_stdev));
        }
        if foreign_stdev < 0.0 {
            return Err(invalid(record, ForecastField::ForeignStdev, foreign_stdev));
        }
        if correlation.abs() > 1.0 + CORRELATION_SLACK {
            return Err(invalid(record, ForecastField::Correlation, correlation));
        }
        if available_capacity < 0.0 {
            return Err(invalid(
                record,
                ForecastField::AvailableCapacity,
                available_capacity,
            ));
        }

        Ok(Self {
            period: record.period,
            mean: PricePair::new(domestic, foreign),
            domestic_stdev,
            foreign_stdev,
            correlation: correlation.clamp(-1.0, 1.0),
            available_capacity,
        })
    }
}

fn invalid(record: &ForecastRecord, field: ForecastField, value: f64) -> ForecastError {
    ForecastError::InvalidValue {
        date: record.date,
        period: record.period,
        field: field.name(),
        value,
    }
}

/// All periods of one date, ordered by period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayForecast {
    pub date: NaiveDate,
    pub periods: Vec<PeriodForecast>,
}

impl DayForecast {
    pub fn new(date: NaiveDate, mut periods: Vec<PeriodForecast>) -> Self {
        periods.sort_by_key(|p| p.period);
        Self { date, periods }
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn capacity_offered(&self) -> Vec<Quantity> {
        self.periods.iter().map(|p| p.available_capacity).collect()
    }
}

// === TABLE ===

/// Forecast rows for one interconnector, keyed by (date, period).
#[derive(Debug, Clone, Default)]
pub struct ForecastTable {
    pub interconnector: String,
    rows: BTreeMap<(NaiveDate, Period), ForecastRecord>,
}

impl ForecastTable {
    pub fn new(
        interconnector: impl Into<String>,
        records: impl IntoIterator<Item = ForecastRecord>,
    ) -> Result<Self, ForecastError> {
        let mut rows = BTreeMap::new();
        for record in records {
            let key = (record.date, record.period);
            if rows.insert(key, record).is_some() {
                return Err(ForecastError::DuplicateRow {
                    date: key.0,
                    period: key.1,
                });
            }
        }
        Ok(Self {
            interconnector: interconnector.into(),
            rows,
        })
    }

    /// Distinct dates in ascending order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.rows.keys().map(|(d, _)| *d).collect();
        dates.dedup();
        dates
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn records_for(&self, date: NaiveDate) -> impl Iterator<Item = &ForecastRecord> {
        self.rows
            .range((date, Period::MIN)..=(date, Period::MAX))
            .map(|(_, r)| r)
    }

    /// Validated forecast for `date`. Any missing value is an error.
    pub fn day(&self, date: NaiveDate) -> Result<DayForecast, ForecastError> {
        self.day_with_backfill(date, 0)
    }

    /// Validated forecast for `date`, filling missing values from the same
    /// period on up to `max_lookback_days` earlier days (nearest day first).
    ///
    /// Periods must run without gaps from the first one present.
    pub fn day_with_backfill(
        &self,
        date: NaiveDate,
        max_lookback_days: u32,
    ) -> Result<DayForecast, ForecastError> {
        let mut periods: Vec<PeriodForecast> = Vec::new();
        for record in self.records_for(date) {
            if let Some(previous) = periods.last() {
                let expected = previous.period + 1;
                if record.period != expected {
                    return Err(ForecastError::MissingPeriod {
                        date,
                        period: expected,
                    });
                }
            }
            let mut filled = record.clone();
            for field in ForecastField::ALL {
                if field.get(&filled).is_some() {
                    continue;
                }
                if max_lookback_days == 0 {
                    return Err(ForecastError::MissingValue {
                        date,
                        period: record.period,
                        field: field.name(),
                    });
                }
                let value = self.lookback(date, record.period, field, max_lookback_days)?;
                field.set(&mut filled, value);
            }
            periods.push(PeriodForecast::from_record(&filled)?);
        }

        if periods.is_empty() {
            return Err(ForecastError::UnknownDate { date });
        }
        Ok(DayForecast::new(date, periods))
    }

    fn lookback(
        &self,
        date: NaiveDate,
        period: Period,
        field: ForecastField,
        max_lookback_days: u32,
    ) -> Result<f64, ForecastError> {
        for days_back in 1..=max_lookback_days {
            let Some(earlier) = date.checked_sub_days(Days::new(u64::from(days_back))) else {
                break;
            };
            let found = self
                .rows
                .get(&(earlier, period))
                .and_then(|r| field.get(r));
            if let Some(value) = found {
                #[cfg(feature = "instrument")]
                tracing::info!(
                    target: "forecast",
                    date = %date,
                    period = period,
                    field = field.name(),
                    days_back = days_back,
                    value = value,
                );
                return Ok(value);
            }
        }

        Err(ForecastError::LookbackExhausted {
            date,
            period,
            field: field.name(),
            lookback_days: max_lookback_days,
        })
    }
}

// === DATAFRAME INPUT ===

#[cfg(feature = "frames")]
mod frames {
    use polars::prelude::*;

    use super::*;
    use crate::error::SimResult;

    fn float_column(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    }

    impl ForecastTable {
        /// Build a table from a frame with the forecast columns. `date` is an
        /// ISO `YYYY-MM-DD` string column; `period` may also be named
        /// `delivery_period`. Nulls become missing values.
        pub fn from_dataframe(interconnector: impl Into<String>, df: &DataFrame) -> SimResult<Self> {
            let dates: Vec<Option<String>> = df
                .column("date")?
                .cast(&DataType::String)?
                .str()?
                .into_iter()
                .map(|d| d.map(str::to_owned))
                .collect();
            let period_column = df
                .column("period")
                .or_else(|_| df.column("delivery_period"))?
                .cast(&DataType::UInt32)?;
            let periods: Vec<Option<u32>> = period_column.u32()?.into_iter().collect();

            let mut values = Vec::with_capacity(ForecastField::ALL.len());
            for field in ForecastField::ALL {
                values.push(float_column(df, field.name())?);
            }

            let mut records = Vec::with_capacity(df.height());
            for row in 0..df.height() {
                let (Some(raw_date), Some(period)) = (dates[row].as_deref(), periods[row]) else {
                    return Err(ForecastError::MissingKey { row }.into());
                };
                let date = raw_date
                    .parse::<NaiveDate>()
                    .map_err(|_| ForecastError::BadDate {
                        raw: raw_date.to_string(),
                    })?;
                records.push(ForecastRecord {
                    date,
                    period,
                    forecast_domestic_price: values[0][row],
                    forecast_foreign_price: values[1][row],
                    domestic_forecast_error_stdev: values[2][row],
                    foreign_forecast_error_stdev: values[3][row],
                    rolling_correlation: values[4][row],
                    available_capacity: values[5][row],
                });
            }

            Ok(ForecastTable::new(interconnector, records)?)
        }
    }
}
