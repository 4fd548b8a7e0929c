use thiserror::Error;

/// Main error type for the metric logger
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Metric has no recorded values: {name}")]
    MetricNotRecorded { name: String },

    #[error("No metrics recorded, nothing to report")]
    NothingToReport,

    #[error("No metrics recorded, nothing to export")]
    NothingToExport,

    #[error("Invalid format specifier {spec:?}: {message}")]
    InvalidFormat { spec: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for logger operations
pub type LogResult<T> = Result<T, LogError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::LogError::Config(format!($($arg)*))
    };
}
