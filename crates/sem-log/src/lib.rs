//! # sem-log
//!
//! Scalar metric logger for seminar training runs.
//!
//! Records named series during a run, prints a scrolling progress table to
//! the console and a `.out` mirror, and exports all series to CSV.

pub mod config;
pub mod export;
pub mod logger;
pub mod paths;
pub mod sink;
pub mod table;

pub use config::LoggerConfig;
pub use export::{ExportTable, STEP_COLUMN};
pub use logger::{LogState, MetricLog, MetricLogBuilder, Report, ReportEntry};
pub use paths::RunPaths;
pub use sink::TeeSink;
pub use table::TableRow;

pub use sem_types::{FormatPolicy, FormatSpec, LogError, LogResult, Step};
