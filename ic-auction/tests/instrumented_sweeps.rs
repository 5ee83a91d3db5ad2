//! Sweep-level telemetry recorded through `tracing` and analysed as DataFrames.

#![cfg(feature = "instrument")]

use ic_auction::instrument::RecordingScope;
use ic_auction::{ForecastRecord, ForecastTable, Runner, SimulationConfig};
use polars::prelude::*;

fn table() -> ForecastTable {
    let mut records = Vec::new();
    for day in ["2024-04-01", "2024-04-02"] {
        for period in 1..=3 {
            records.push(ForecastRecord::complete(
                day.parse().unwrap(),
                period,
                50.0,
                66.0 + period as f64,
                5.0,
                7.0,
                0.5,
                150.0,
            ));
        }
    }
    // Period 2 on the second day needs its capacity from the day before.
    records[4].available_capacity = None;
    ForecastTable::new("IFA 2", records).unwrap()
}

fn config() -> SimulationConfig {
    SimulationConfig {
        number_of_simulations: 25,
        number_of_generators: 3,
        initial_random_evaluations: 2,
        number_of_optimisation_iterations: 4,
        max_sweeps: 3,
        ..Default::default()
    }
}

fn col_f64(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

#[test]
fn sweeps_are_recorded_per_generator() {
    let table = table();
    let config = config();

    let scope = RecordingScope::start();
    let report = Runner::new(&table, &config)
        .solve_date("2024-04-01".parse().unwrap())
        .unwrap();
    let recorder = scope.finish();

    let generators = config.number_of_generators;
    assert_eq!(recorder.rows("sweep"), report.sweeps * generators);
    assert!(recorder.rows("best_response") >= report.sweeps * generators);
    assert_eq!(recorder.rows("equilibrium"), 1);
    assert_eq!(recorder.rows("forecast"), 0);

    let sweeps = recorder.table("sweep").unwrap().to_dataframe().unwrap();
    let by_sweep = sweeps
        .lazy()
        .group_by([col("sweep")])
        .agg([
            col("utility").mean().alias("mean_utility"),
            col("max_change").first().alias("max_change"),
            col("generator").count().alias("generators"),
        ])
        .sort(["sweep"], Default::default())
        .collect()
        .unwrap();

    assert_eq!(by_sweep.height(), report.sweeps);
    let final_mean = *col_f64(&by_sweep, "mean_utility").last().unwrap();
    let expected = report.utilities.iter().sum::<f64>() / generators as f64;
    assert!((final_mean - expected).abs() < 1e-6 * expected.abs().max(1.0));

    let changes = col_f64(&by_sweep, "max_change");
    assert!(changes[0] > 1e9, "first sweep moves off the sentinel");
    assert_eq!(*changes.last().unwrap(), report.history.last().unwrap().max_change);
}

#[test]
fn accepted_responses_match_the_report() {
    let table = table();
    let config = config();

    let scope = RecordingScope::for_targets(&["best_response"]);
    let report = Runner::new(&table, &config)
        .solve_date("2024-04-01".parse().unwrap())
        .unwrap();
    let recorder = scope.finish();

    let responses = recorder.table("best_response").unwrap();
    let accepted = responses
        .bool_column("accepted")
        .unwrap()
        .iter()
        .filter(|a| **a)
        .count();
    let reported = report
        .history
        .iter()
        .flat_map(|s| &s.responses)
        .filter(|r| r.accepted)
        .count();
    assert_eq!(accepted, reported);
    assert_eq!(recorder.rows("sweep"), 0, "filtered out");
}

#[test]
fn backfill_is_logged() {
    let table = table();
    let config = config();

    let scope = RecordingScope::for_targets(&["forecast"]);
    Runner::new(&table, &config)
        .solve_date("2024-04-02".parse().unwrap())
        .unwrap();
    let recorder = scope.finish();

    let fills = recorder.table("forecast").unwrap();
    assert_eq!(fills.row_count, 1);
    assert_eq!(fills.u64_column("days_back"), Some(&[1][..]));
    assert_eq!(fills.f64_column("value"), Some(&[150.0][..]));
    assert_eq!(
        fills.str_column("field").unwrap()[0],
        "available_capacity"
    );
}
