//! Aligned single-row progress tables.
//!
//! Each report is one row: the step followed by one formatted value per
//! metric. Columns are right-aligned and at least two characters wider than
//! their header, so rows printed without a header still line up under the
//! one printed by the first report.

use sem_types::Step;

/// Header of the step column.
pub const STEP_HEADER: &str = "epoch";

const MIN_PADDING: usize = 2;
const COLUMN_SEP: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    headers: Vec<String>,
    cells: Vec<String>,
}

impl TableRow {
    /// Build a row from `(metric name, formatted value)` pairs.
    pub fn new<I, N, V>(step: Step, entries: I) -> Self
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut headers = vec![STEP_HEADER.to_string()];
        let mut cells = vec![step.to_string()];
        for (name, value) in entries {
            headers.push(name.into());
            cells.push(value.into());
        }
        Self { headers, cells }
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .zip(&self.cells)
            .map(|(h, c)| (h.chars().count() + MIN_PADDING).max(c.chars().count()))
            .collect()
    }

    fn join(widths: &[usize], values: impl Iterator<Item = String>) -> String {
        widths
            .iter()
            .zip(values)
            .map(|(w, v)| format!("{v:>w$}", w = *w))
            .collect::<Vec<_>>()
            .join(COLUMN_SEP)
    }

    /// Column names followed by a dashed rule.
    pub fn render_header(&self) -> String {
        let widths = self.widths();
        let names = Self::join(&widths, self.headers.iter().cloned());
        let rule = Self::join(&widths, widths.iter().map(|w| "-".repeat(*w)));
        format!("{names}\n{rule}")
    }

    pub fn render_row(&self) -> String {
        Self::join(&self.widths(), self.cells.iter().cloned())
    }

    pub fn render_with_header(&self) -> String {
        format!("{}\n{}", self.render_header(), self.render_row())
    }
}
