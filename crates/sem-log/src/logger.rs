//! The run-scoped metric logger.
//!
//! A [`MetricLog`] is created once per training run. It records scalar
//! series in memory, prints a scrolling progress table (header on the first
//! report only) to the console and to `<stem>.out`, and exports everything
//! to `<stem>.csv` on request.
//!
//! ```no_run
//! use sem_log::MetricLog;
//!
//! # fn main() -> sem_types::LogResult<()> {
//! let mut log = MetricLog::new("gp", None)?;
//! log.record(0, "loss", 2.5);
//! log.record(0, "acc", 0.1);
//! log.report_latest(None)?;
//! log.export_all()?;
//! # Ok(())
//! # }
//! ```

use chrono::{Local, NaiveDateTime, Utc};
use rand::RngCore;
use std::fmt::Write as _;
use std::io::{Stdout, Write};
use std::path::Path;
use tracing::{debug, info, warn};

use sem_types::{config_error, FormatPolicy, LogError, LogResult, MetricStore, Series, Step};

use crate::config::LoggerConfig;
use crate::export::ExportTable;
use crate::paths::{program_fragment, random_tag, RunPaths};
use crate::sink::TeeSink;
use crate::table::TableRow;

/// Whether the table header has been printed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    /// No report emitted; the next one carries the header.
    Fresh,
    /// At least one report emitted; later ones print bare rows.
    Reporting,
}

/// One metric's contribution to a report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub name: String,
    /// Step of the sample the value came from.
    pub step: Step,
    pub value: f64,
    pub formatted: String,
}

/// Result of [`MetricLog::report_latest`].
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Furthest-along latest step among the reported metrics.
    pub step: Step,
    pub entries: Vec<ReportEntry>,
    /// Exactly the text written to the console and `.out` file.
    pub rendered: String,
}

impl Report {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.value)
    }
}

/// Accumulates scalar series for one run and writes reports and exports.
#[derive(Debug)]
pub struct MetricLog<W: Write = Stdout> {
    label: String,
    paths: RunPaths,
    formats: FormatPolicy,
    store: MetricStore,
    sink: TeeSink<W>,
    state: LogState,
}

impl MetricLog<Stdout> {
    /// Create a log under `./logs` that echoes to stdout.
    ///
    /// `formats` overrides how individual metrics are displayed; metrics
    /// without an override use `.1f`.
    pub fn new(label: &str, formats: Option<FormatPolicy>) -> LogResult<Self> {
        let mut config = LoggerConfig::default();
        if let Some(formats) = formats {
            config.formats = formats;
        }
        Self::builder(label).config(config).build()
    }

    pub fn with_config(label: &str, config: LoggerConfig) -> LogResult<Self> {
        Self::builder(label).config(config).build()
    }

    pub fn builder(label: &str) -> MetricLogBuilder<Stdout> {
        MetricLogBuilder::new(label)
    }
}

impl<W: Write> MetricLog<W> {
    /// Append `(step, value)` to the series called `name`.
    pub fn record(&mut self, step: Step, name: &str, value: f64) {
        if self.store.record(step, name, value) {
            debug!("New metric series '{}' in run '{}'", name, self.label);
        }
    }

    /// Print the latest value of each metric as one table row.
    ///
    /// `order` selects and orders the columns; `None` (or an empty slice)
    /// reports every metric in first-insertion order. The row's step is the
    /// largest latest step among the selected metrics.
    pub fn report_latest(&mut self, order: Option<&[&str]>) -> LogResult<Report> {
        let names: Vec<&str> = match order {
            Some(order) if !order.is_empty() => order.to_vec(),
            _ => self.store.names().iter().map(String::as_str).collect(),
        };
        if names.is_empty() {
            return Err(LogError::NothingToReport);
        }

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let latest = self
                .store
                .get(name)
                .and_then(Series::latest)
                .ok_or_else(|| LogError::MetricNotRecorded {
                    name: name.to_string(),
                })?;
            entries.push(ReportEntry {
                name: name.to_string(),
                step: latest.step,
                value: latest.value,
                formatted: self.formats.format(name, latest.value),
            });
        }

        let step = entries
            .iter()
            .map(|e| e.step)
            .max()
            .ok_or(LogError::NothingToReport)?;

        let row = TableRow::new(
            step,
            entries.iter().map(|e| (e.name.as_str(), e.formatted.as_str())),
        );
        let rendered = match self.state {
            LogState::Fresh => row.render_with_header(),
            LogState::Reporting => row.render_row(),
        };

        // The header counts as printed once it is in the `.out` file, even if
        // the console write below fails.
        self.sink.append_file(&rendered)?;
        self.state = LogState::Reporting;
        self.sink.echo_console(&rendered)?;
        debug!("Reported step {} for {} metrics", step, entries.len());

        Ok(Report {
            step,
            entries,
            rendered,
        })
    }

    /// Outer join of all series on step, without touching the disk.
    pub fn export_table(&self) -> LogResult<ExportTable> {
        ExportTable::from_store(&self.store)
    }

    /// Write every series to `<stem>.csv` and announce the run's paths.
    pub fn export_all(&mut self) -> LogResult<ExportTable> {
        let table = self.export_table()?;
        table.write_csv(self.paths.csv())?;
        info!(
            "Exported {} rows x {} metrics to {}",
            table.rows.len(),
            table.columns.len(),
            self.paths.csv().display()
        );

        self.sink
            .emit(&format!("The log/output/model have been saved to: {}", self.paths))?;
        Ok(table)
    }

    /// Append a free-form line to the console and `<stem>.out`.
    pub fn print(&mut self, message: &str) -> LogResult<()> {
        self.sink.emit(message)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn paths(&self) -> &RunPaths {
        &self.paths
    }

    pub fn stem(&self) -> &Path {
        self.paths.stem()
    }

    pub fn csv_path(&self) -> &Path {
        self.paths.csv()
    }

    pub fn out_path(&self) -> &Path {
        self.paths.out()
    }

    /// Reserved for checkpoint writers; the log never creates this file.
    pub fn checkpoint_path(&self) -> &Path {
        self.paths.checkpoint()
    }

    pub fn formats(&self) -> &FormatPolicy {
        &self.formats
    }

    pub fn metric_names(&self) -> &[String] {
        self.store.names()
    }

    pub fn series(&self, name: &str) -> Option<&Series> {
        self.store.get(name)
    }

    pub fn state(&self) -> LogState {
        self.state
    }

    pub fn console(&self) -> &W {
        self.sink.console()
    }

    pub fn into_console(self) -> W {
        self.sink.into_console()
    }
}

/// Builder for [`MetricLog`] with every process-wide input made explicit.
///
/// Anything left unset falls back to the process: stdout, the thread RNG,
/// `argv[0]` and the current clock.
pub struct MetricLogBuilder<W: Write> {
    label: String,
    config: LoggerConfig,
    console: W,
    program: Option<String>,
    timestamp: Option<NaiveDateTime>,
    rng: Option<Box<dyn RngCore>>,
}

impl MetricLogBuilder<Stdout> {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            config: LoggerConfig::default(),
            console: std::io::stdout(),
            program: None,
            timestamp: None,
            rng: None,
        }
    }
}

impl<W: Write> MetricLogBuilder<W> {
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn console<C: Write>(self, console: C) -> MetricLogBuilder<C> {
        MetricLogBuilder {
            label: self.label,
            config: self.config,
            console,
            program: self.program,
            timestamp: self.timestamp,
            rng: self.rng,
        }
    }

    /// Program path used for the stem instead of `argv[0]`.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Source of the random stem tag.
    pub fn rng(mut self, rng: impl RngCore + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    pub fn build(self) -> LogResult<MetricLog<W>> {
        let config = self.config;
        config.validate()?;
        std::fs::create_dir_all(&config.base_dir)?;

        let program = self
            .program
            .unwrap_or_else(|| std::env::args().next().unwrap_or_default());
        let fragment = program_fragment(&program, config.program_segments);
        if fragment.is_empty() {
            warn!("Program path is empty; log stem starts with '-'");
        }

        let tag = match self.rng {
            Some(mut rng) => random_tag(rng.as_mut(), config.tag_len),
            None => random_tag(&mut rand::thread_rng(), config.tag_len),
        };

        let timestamp = self.timestamp.unwrap_or_else(|| {
            if config.utc {
                Utc::now().naive_utc()
            } else {
                Local::now().naive_local()
            }
        });
        let mut stamp = String::new();
        write!(stamp, "{}", timestamp.format(&config.timestamp_format)).map_err(|_| {
            config_error!("invalid timestamp_format: {}", config.timestamp_format)
        })?;

        let paths = RunPaths::new(&config.base_dir, &fragment, &self.label, &tag, &stamp);
        info!("Metric log '{}' writing to {}", self.label, paths.stem().display());

        Ok(MetricLog {
            label: self.label,
            sink: TeeSink::new(paths.out(), self.console, config.echo_console),
            paths,
            formats: config.formats,
            store: MetricStore::new(),
            state: LogState::Fresh,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use sem_types::FormatSpec;
    use tempfile::TempDir;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    fn test_log(dir: &TempDir, formats: FormatPolicy) -> MetricLog<Vec<u8>> {
        let config = LoggerConfig::new()
            .with_base_dir(dir.path().join("logs"))
            .with_formats(formats);
        MetricLog::builder("gp")
            .config(config)
            .console(Vec::new())
            .program("/srv/seminars/day6/train")
            .timestamp(fixed_time())
            .rng(ChaCha8Rng::seed_from_u64(1))
            .build()
            .unwrap()
    }

    #[test]
    fn stem_combines_program_label_tag_and_time() {
        let dir = TempDir::new().unwrap();
        let log = test_log(&dir, FormatPolicy::default());

        let name = log.stem().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("seminars-day6-train-gp-"), "stem: {name}");
        assert!(name.ends_with("-03-07-09:05"), "stem: {name}");

        let tag = &name["seminars-day6-train-gp-".len()..name.len() - "-03-07-09:05".len()];
        assert_eq!(tag.len(), 3);
        assert!(tag.chars().all(|c| c.is_ascii_lowercase()));

        assert_eq!(log.label(), "gp");
        assert!(dir.path().join("logs").is_dir());
        assert!(!log.out_path().exists());
        assert!(!log.checkpoint_path().exists());
    }

    #[test]
    fn report_uses_latest_values_and_max_step() {
        let dir = TempDir::new().unwrap();
        let mut log = test_log(&dir, FormatPolicy::default());
        log.record(0, "loss", 2.5);
        log.record(0, "acc", 0.1);
        log.record(1, "loss", 1.9);

        let report = log.report_latest(None).unwrap();
        assert_eq!(report.step, 1);
        assert_eq!(report.value("loss"), Some(1.9));
        assert_eq!(report.value("acc"), Some(0.1));
        assert_eq!(report.entries[1].step, 0);
        assert_eq!(
            report.rendered,
            "  epoch    loss    acc\n-------  ------  -----\n      1     1.9    0.1"
        );
    }

    #[test]
    fn header_only_on_first_report() {
        let dir = TempDir::new().unwrap();
        let mut log = test_log(&dir, FormatPolicy::default());
        assert_eq!(log.state(), LogState::Fresh);

        for step in 0..4 {
            log.record(step, "loss", 1.0 / (step + 1) as f64);
            log.report_latest(None).unwrap();
        }
        assert_eq!(log.state(), LogState::Reporting);

        let out = std::fs::read_to_string(log.out_path()).unwrap();
        assert_eq!(out.matches("epoch").count(), 1);
        assert!(out.starts_with("  epoch"));
        assert_eq!(out.lines().count(), 2 + 4);

        let console = String::from_utf8(log.into_console()).unwrap();
        assert_eq!(console, out);
    }

    #[test]
    fn explicit_order_selects_columns() {
        let dir = TempDir::new().unwrap();
        let mut log = test_log(&dir, FormatPolicy::default());
        log.record(0, "loss", 2.5);
        log.record(3, "acc", 0.75);
        log.record(7, "lr", 0.01);

        let report = log.report_latest(Some(&["acc", "loss"])).unwrap();
        let names: Vec<&str> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["acc", "loss"]);
        assert_eq!(report.step, 3);
        assert!(!report.rendered.contains("lr"));

        let all = log.report_latest(Some(&[])).unwrap();
        assert_eq!(all.entries.len(), 3);
        assert_eq!(all.step, 7);
    }

    #[test]
    fn unrecorded_metric_fails_report() {
        let dir = TempDir::new().unwrap();
        let mut log = test_log(&dir, FormatPolicy::default());
        log.record(0, "loss", 2.5);

        match log.report_latest(Some(&["loss", "val_loss"])) {
            Err(LogError::MetricNotRecorded { name }) => assert_eq!(name, "val_loss"),
            other => panic!("expected MetricNotRecorded, got {other:?}"),
        }
        // A failed report does not consume the header.
        assert_eq!(log.state(), LogState::Fresh);
        assert!(!log.out_path().exists());
    }

    #[test]
    fn empty_log_cannot_report_or_export() {
        let dir = TempDir::new().unwrap();
        let mut log = test_log(&dir, FormatPolicy::default());

        assert!(matches!(log.report_latest(None), Err(LogError::NothingToReport)));
        assert!(matches!(log.export_all(), Err(LogError::NothingToExport)));
        assert!(!log.csv_path().exists());
    }

    #[test]
    fn per_metric_formats_apply() {
        let dir = TempDir::new().unwrap();
        let formats = FormatPolicy::new().with_override("lr", FormatSpec::Exponent(1));
        let mut log = test_log(&dir, formats);
        log.record(2, "loss", 0.123);
        log.record(2, "lr", 0.0003);

        assert_eq!(log.formats().resolve("lr"), FormatSpec::Exponent(1));
        assert_eq!(log.formats().resolve("loss"), FormatSpec::Fixed(1));

        let report = log.report_latest(None).unwrap();
        assert_eq!(report.entries[0].formatted, "0.1");
        assert_eq!(report.entries[1].formatted, "3.0e-04");
    }

    #[test]
    fn export_writes_csv_and_announces_paths() {
        let dir = TempDir::new().unwrap();
        let mut log = test_log(&dir, FormatPolicy::default());
        log.record(0, "loss", 2.5);
        log.record(0, "acc", 0.1);
        log.record(1, "loss", 1.9);

        let table = log.export_all().unwrap();
        assert_eq!(table.rows.len(), 2);

        let csv = std::fs::read_to_string(log.csv_path()).unwrap();
        assert_eq!(csv, "step,loss,acc\n0,2.5,0.1\n1,1.9,\n");

        let out = std::fs::read_to_string(log.out_path()).unwrap();
        assert!(out.contains("have been saved to"));
        assert!(out.contains(&log.stem().display().to_string()));
        assert!(out.trim_end().ends_with(".csv/.out/.cpt"));
        assert!(!log.checkpoint_path().exists());
    }

    #[test]
    fn print_goes_to_both_outputs() {
        let dir = TempDir::new().unwrap();
        let mut log = test_log(&dir, FormatPolicy::default());

        log.print("starting run").unwrap();

        assert_eq!(std::fs::read_to_string(log.out_path()).unwrap(), "starting run\n");
        assert_eq!(log.console().as_slice(), b"starting run\n");
        assert_eq!(log.state(), LogState::Fresh);
    }

    #[test]
    fn same_minute_same_label_gives_distinct_stems() {
        let dir = TempDir::new().unwrap();
        let build = |seed: u64| {
            MetricLog::builder("gp")
                .config(LoggerConfig::new().with_base_dir(dir.path()))
                .console(Vec::new())
                .program("train")
                .timestamp(fixed_time())
                .rng(ChaCha8Rng::seed_from_u64(seed))
                .build()
                .unwrap()
        };

        let a = build(1);
        let b = build(2);
        assert_ne!(a.stem(), b.stem());
    }

    #[test]
    fn invalid_timestamp_format_is_config_error() {
        let dir = TempDir::new().unwrap();
        let mut config = LoggerConfig::new().with_base_dir(dir.path());
        config.timestamp_format = "%Q".to_string();

        let result = MetricLog::builder("gp")
            .config(config)
            .console(Vec::new())
            .build();
        assert!(matches!(result, Err(LogError::Config(_))));
    }

    /// Console that rejects its first write, like a closed pipe.
    struct BrokenOnce {
        failed: bool,
        written: Vec<u8>,
    }

    impl Write for BrokenOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn console_failure_does_not_repeat_header() {
        let dir = TempDir::new().unwrap();
        let mut log = MetricLog::builder("gp")
            .config(LoggerConfig::new().with_base_dir(dir.path()))
            .console(BrokenOnce {
                failed: false,
                written: Vec::new(),
            })
            .program("train")
            .timestamp(fixed_time())
            .build()
            .unwrap();

        log.record(0, "loss", 1.0);
        assert!(matches!(log.report_latest(None), Err(LogError::Io(_))));
        assert_eq!(log.state(), LogState::Reporting);

        log.record(1, "loss", 0.5);
        let report = log.report_latest(None).unwrap();
        assert!(!report.rendered.contains("epoch"));

        let out = std::fs::read_to_string(log.out_path()).unwrap();
        assert_eq!(out.matches("epoch").count(), 1);
        assert_eq!(
            out,
            "  epoch    loss\n-------  ------\n      0     1.0\n      1     0.5\n"
        );
        assert_eq!(log.console().written, b"      1     0.5\n");
    }

    fn stem_name(log: &MetricLog<Vec<u8>>) -> String {
        log.stem().file_name().unwrap().to_string_lossy().to_string()
    }

    #[test]
    fn tag_len_and_program_segments_shape_the_stem() {
        let dir = TempDir::new().unwrap();
        let mut config = LoggerConfig::new().with_base_dir(dir.path()).with_tag_len(5);
        config.program_segments = 1;

        let log = MetricLog::builder("gp")
            .config(config)
            .console(Vec::new())
            .program("/srv/seminars/day6/train")
            .timestamp(fixed_time())
            .rng(ChaCha8Rng::seed_from_u64(4))
            .build()
            .unwrap();

        let name = stem_name(&log);
        assert!(name.starts_with("train-gp-"), "stem: {name}");
        assert!(name.ends_with("-03-07-09:05"), "stem: {name}");
        let tag = &name["train-gp-".len()..name.len() - "-03-07-09:05".len()];
        assert_eq!(tag.len(), 5);
        assert!(tag.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn base_dir_that_is_a_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("logs");
        std::fs::write(&blocker, "not a directory").unwrap();

        let result = MetricLog::builder("gp")
            .config(LoggerConfig::new().with_base_dir(&blocker))
            .console(Vec::new())
            .program("train")
            .build();
        assert!(matches!(result, Err(LogError::Io(_))));
    }

    fn build_on_clock(dir: &TempDir, utc: bool) -> (String, Vec<String>) {
        let pattern = "%m-%d-%H:%M";
        let now = || {
            if utc {
                Utc::now().format(pattern).to_string()
            } else {
                Local::now().format(pattern).to_string()
            }
        };

        let before = now();
        let log = MetricLog::builder("gp")
            .config(LoggerConfig::new().with_base_dir(dir.path()).with_utc(utc))
            .console(Vec::new())
            .program("train")
            .build()
            .unwrap();
        let after = now();

        (stem_name(&log), vec![before, after])
    }

    fn assert_clock_stamp(name: &str, candidates: &[String]) {
        let stamp = &name[name.len() - "MM-DD-HH:MM".len()..];
        let bytes = stamp.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            match i {
                2 | 5 => assert_eq!(*b, b'-', "stamp: {stamp}"),
                8 => assert_eq!(*b, b':', "stamp: {stamp}"),
                _ => assert!(b.is_ascii_digit(), "stamp: {stamp}"),
            }
        }
        assert!(
            candidates.iter().any(|c| c == stamp),
            "stamp {stamp} not in {candidates:?}"
        );
    }

    #[test]
    fn stamps_local_time_by_default() {
        let dir = TempDir::new().unwrap();
        let (name, candidates) = build_on_clock(&dir, false);
        assert_clock_stamp(&name, &candidates);
    }

    #[test]
    fn stamps_utc_when_configured() {
        let dir = TempDir::new().unwrap();
        let (name, candidates) = build_on_clock(&dir, true);
        assert_clock_stamp(&name, &candidates);
    }
}
