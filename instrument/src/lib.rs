//! Collects `tracing` events into column-oriented tables, one per target.
//!
//! Columns are created from event fields as they are first seen, so the schema
//! emerges from what the code under observation records.
//!
//! # Usage
//!
//! ```ignore
//! // In library code:
//! tracing::info!(target: "sweep", sweep, generator, utility);
//!
//! // In a test:
//! let scope = instrument::RecordingScope::for_targets(&["sweep"]);
//! // ... run a search ...
//! let recorder = scope.finish();
//! let sweeps = recorder.table("sweep").unwrap().to_dataframe()?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use polars::prelude::*;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Record};
use tracing::subscriber::{DefaultGuard, Interest};
use tracing::{Event, Id, Metadata, Subscriber};

// === TABLES ===

#[derive(Debug, Clone, PartialEq)]
pub enum TypedColumn {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Str(Vec<String>),
}

impl TypedColumn {
    pub fn len(&self) -> usize {
        match self {
            TypedColumn::U64(v) => v.len(),
            TypedColumn::I64(v) => v.len(),
            TypedColumn::F64(v) => v.len(),
            TypedColumn::Bool(v) => v.len(),
            TypedColumn::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pad_to(&mut self, rows: usize) {
        let missing = rows.saturating_sub(self.len());
        if missing == 0 {
            return;
        }
        match self {
            TypedColumn::U64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::I64(v) => v.extend(std::iter::repeat_n(0, missing)),
            TypedColumn::F64(v) => v.extend(std::iter::repeat_n(f64::NAN, missing)),
            TypedColumn::Bool(v) => v.extend(std::iter::repeat_n(false, missing)),
            TypedColumn::Str(v) => v.extend(std::iter::repeat_n(String::new(), missing)),
        }
    }

    fn to_column(&self, name: &str) -> Column {
        match self {
            TypedColumn::U64(v) => Column::new(name.into(), v),
            TypedColumn::I64(v) => Column::new(name.into(), v),
            TypedColumn::F64(v) => Column::new(name.into(), v),
            TypedColumn::Bool(v) => Column::new(name.into(), v),
            TypedColumn::Str(v) => Column::new(name.into(), v),
        }
    }
}

/// Rows recorded under one target. Every column has `row_count` entries;
/// fields an event did not carry are filled with 0, NaN, false or "".
#[derive(Debug, Clone, Default)]
pub struct DynamicTable {
    pub columns: HashMap<String, TypedColumn>,
    pub row_count: usize,
}

impl DynamicTable {
    fn pad_columns(&mut self) {
        for column in self.columns.values_mut() {
            column.pad_to(self.row_count);
        }
    }

    pub fn f64_column(&self, name: &str) -> Option<&[f64]> {
        match self.columns.get(name)? {
            TypedColumn::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn u64_column(&self, name: &str) -> Option<&[u64]> {
        match self.columns.get(name)? {
            TypedColumn::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn bool_column(&self, name: &str) -> Option<&[bool]> {
        match self.columns.get(name)? {
            TypedColumn::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn str_column(&self, name: &str) -> Option<&[String]> {
        match self.columns.get(name)? {
            TypedColumn::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Polars frame with columns in name order.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut names: Vec<&String> = self.columns.keys().collect();
        names.sort();
        let columns = names
            .into_iter()
            .map(|name| self.columns[name].to_column(name))
            .collect();
        DataFrame::new(columns)
    }
}

/// Tables keyed by tracing target.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    pub tables: HashMap<String, DynamicTable>,
}

impl Recorder {
    pub fn table(&self, target: &str) -> Option<&DynamicTable> {
        self.tables.get(target)
    }

    pub fn rows(&self, target: &str) -> usize {
        self.table(target).map_or(0, |t| t.row_count)
    }

    pub fn to_dataframes(&self) -> PolarsResult<HashMap<String, DataFrame>> {
        self.tables
            .iter()
            .map(|(name, table)| Ok((name.clone(), table.to_dataframe()?)))
            .collect()
    }

    fn push_event(&mut self, event: &Event<'_>) {
        let target = event.metadata().target().to_string();
        let table = self.tables.entry(target).or_default();
        let row_count = table.row_count;
        event.record(&mut ColumnVisitor { table, row_count });
        table.row_count += 1;
        table.pad_columns();
    }
}

// === FIELD VISITOR ===

struct ColumnVisitor<'a> {
    table: &'a mut DynamicTable,
    /// Rows recorded before this event; new columns are back-filled to it.
    row_count: usize,
}

impl ColumnVisitor<'_> {
    fn column(&mut self, field: &Field, empty: impl FnOnce() -> TypedColumn) -> &mut TypedColumn {
        let row_count = self.row_count;
        self.table
            .columns
            .entry(field.name().to_string())
            .or_insert_with(|| {
                let mut column = empty();
                column.pad_to(row_count);
                column
            })
    }
}

impl Visit for ColumnVisitor<'_> {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if let TypedColumn::U64(v) = self.column(field, || TypedColumn::U64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let TypedColumn::I64(v) = self.column(field, || TypedColumn::I64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let TypedColumn::F64(v) = self.column(field, || TypedColumn::F64(Vec::new())) {
            v.push(value);
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        if let TypedColumn::Bool(v) = self.column(field, || TypedColumn::Bool(Vec::new())) {
            v.push(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if let TypedColumn::Str(v) = self.column(field, || TypedColumn::Str(Vec::new())) {
            v.push(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // Display-formatted fields (`%value`) also arrive here.
        self.record_str(field, &format!("{value:?}"));
    }
}

// === SUBSCRIBER ===

/// Subscriber that records info-and-above events, optionally only for some
/// targets. Spans are ignored.
#[derive(Clone, Default)]
pub struct EventRecorder {
    targets: Option<HashSet<String>>,
    store: Arc<Mutex<Recorder>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(targets: &[&str]) -> Self {
        Self {
            targets: Some(targets.iter().map(|t| t.to_string()).collect()),
            store: Arc::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recorder> {
        // A panic while recording leaves a partial row at worst.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Everything recorded so far, leaving the store empty.
    pub fn take(&self) -> Recorder {
        std::mem::take(&mut *self.lock())
    }

    pub fn snapshot(&self) -> Recorder {
        self.lock().clone()
    }
}

impl Subscriber for EventRecorder {
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        // Scoped recorders come and go, so never let a callsite be cached as off.
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.is_event()
            && *metadata.level() <= tracing::Level::INFO
            && self
                .targets
                .as_ref()
                .is_none_or(|targets| targets.contains(metadata.target()))
    }

    fn new_span(&self, _span: &Attributes<'_>) -> Id {
        Id::from_u64(1)
    }

    fn record(&self, _span: &Id, _values: &Record<'_>) {}

    fn record_follows_from(&self, _span: &Id, _follows: &Id) {}

    fn event(&self, event: &Event<'_>) {
        self.lock().push_event(event);
    }

    fn enter(&self, _span: &Id) {}

    fn exit(&self, _span: &Id) {}
}

/// Records events on the current thread until finished or dropped.
///
/// ```ignore
/// let scope = instrument::RecordingScope::start();
/// solver.solve()?;
/// let recorder = scope.finish();
/// ```
pub struct RecordingScope {
    recorder: EventRecorder,
    _guard: DefaultGuard,
}

impl RecordingScope {
    pub fn start() -> Self {
        Self::install(EventRecorder::new())
    }

    pub fn for_targets(targets: &[&str]) -> Self {
        Self::install(EventRecorder::with_targets(targets))
    }

    fn install(recorder: EventRecorder) -> Self {
        let guard = tracing::subscriber::set_default(recorder.clone());
        Self {
            recorder,
            _guard: guard,
        }
    }

    pub fn snapshot(&self) -> Recorder {
        self.recorder.snapshot()
    }

    /// Uninstall the subscriber and return what it recorded.
    pub fn finish(self) -> Recorder {
        let RecordingScope { recorder, _guard } = self;
        drop(_guard);
        recorder.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_become_rows() {
        let scope = RecordingScope::start();
        tracing::info!(target: "sweep", sweep = 1u64, utility = 10.5f64, generator = "gen0");
        tracing::info!(target: "sweep", sweep = 2u64, utility = 20.5f64, generator = "gen1");
        tracing::info!(target: "sweep", sweep = 3u64, utility = 30.5f64);
        let recorder = scope.finish();

        let table = recorder.table("sweep").expect("sweep table");
        assert_eq!(table.row_count, 3);
        assert_eq!(table.u64_column("sweep"), Some(&[1, 2, 3][..]));
        assert_eq!(table.f64_column("utility"), Some(&[10.5, 20.5, 30.5][..]));

        let names = table.str_column("generator").unwrap();
        assert_eq!(names, &["gen0", "gen1", ""]);
    }

    #[test]
    fn late_columns_are_backfilled() {
        let scope = RecordingScope::start();
        tracing::info!(target: "best_response", generator = 0u64);
        tracing::info!(target: "best_response", generator = 1u64, baseline = 4.0f64, accepted = true);
        let recorder = scope.finish();

        let table = recorder.table("best_response").unwrap();
        let baseline = table.f64_column("baseline").unwrap();
        assert!(baseline[0].is_nan());
        assert_eq!(baseline[1], 4.0);
        assert_eq!(table.bool_column("accepted"), Some(&[false, true][..]));
        assert!(table.columns.values().all(|c| c.len() == 2));
    }

    #[test]
    fn target_filter_and_levels() {
        let scope = RecordingScope::for_targets(&["sweep"]);
        tracing::info!(target: "sweep", sweep = 1u64);
        tracing::info!(target: "forecast", days_back = 2u64);
        tracing::warn!(target: "sweep", sweep = 2u64);
        tracing::debug!(target: "sweep", sweep = 3u64);
        let recorder = scope.finish();

        assert_eq!(recorder.rows("sweep"), 2);
        assert_eq!(recorder.rows("forecast"), 0);
    }

    #[test]
    fn nothing_is_recorded_after_finish() {
        let scope = RecordingScope::start();
        tracing::info!(target: "equilibrium", sweeps = 4u64);
        let recorder = scope.finish();
        tracing::info!(target: "equilibrium", sweeps = 5u64);
        assert_eq!(recorder.rows("equilibrium"), 1);
    }

    #[test]
    fn tables_convert_to_sorted_frames() {
        let mut table = DynamicTable::default();
        table
            .columns
            .insert("utility".to_string(), TypedColumn::F64(vec![1.0, 2.0]));
        table
            .columns
            .insert("generator".to_string(), TypedColumn::U64(vec![0, 1]));
        table.row_count = 2;

        let df = table.to_dataframe().unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["generator", "utility"]);

        let recorder = Recorder {
            tables: HashMap::from([("sweep".to_string(), table)]),
        };
        let frames = recorder.to_dataframes().unwrap();
        assert_eq!(frames["sweep"].width(), 2);
    }
}
