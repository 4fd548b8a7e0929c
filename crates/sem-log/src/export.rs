//! Step-indexed export of all series.

use std::collections::BTreeSet;
use std::path::Path;

use sem_types::{LogError, LogResult, MetricStore, Step};

/// Header of the index column in exported files.
pub const STEP_COLUMN: &str = "step";

/// Outer join of every series on step.
///
/// One row per distinct step, ascending; one column per metric in
/// first-insertion order. A cell is `None` when the metric has no sample at
/// that step. If a metric was recorded several times at one step, the last
/// value wins.
///
/// In the CSV, missing cells and recorded `NaN` values are both written as
/// empty fields, the way pandas writes missing data.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<(Step, Vec<Option<f64>>)>,
}

impl ExportTable {
    pub fn from_store(store: &MetricStore) -> LogResult<Self> {
        if store.is_empty() {
            return Err(LogError::NothingToExport);
        }

        let steps: BTreeSet<Step> = store
            .iter()
            .flat_map(|(_, series)| series.samples().iter().map(|s| s.step))
            .collect();

        let rows = steps
            .into_iter()
            .map(|step| {
                let cells = store
                    .iter()
                    .map(|(_, series)| series.value_at(step))
                    .collect();
                (step, cells)
            })
            .collect();

        Ok(Self {
            columns: store.names().to_vec(),
            rows,
        })
    }

    /// Write the table as CSV, replacing any previous export at `path`.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> LogResult<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path).map_err(|e| {
            LogError::Export(format!("Failed to open {}: {}", path.display(), e))
        })?;

        let header = std::iter::once(STEP_COLUMN).chain(self.columns.iter().map(String::as_str));
        writer
            .write_record(header)
            .map_err(|e| LogError::Export(format!("Failed to write CSV header: {}", e)))?;

        for (step, cells) in &self.rows {
            let record = std::iter::once(step.to_string()).chain(
                cells
                    .iter()
                    .map(|cell| match cell {
                        Some(v) if !v.is_nan() => v.to_string(),
                        _ => String::new(),
                    }),
            );
            writer.write_record(record).map_err(|e| {
                LogError::Export(format!("Failed to write CSV row for step {}: {}", step, e))
            })?;
        }

        writer.flush()?;
        Ok(())
    }
}
