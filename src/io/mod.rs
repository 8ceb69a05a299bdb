pub mod csv;
pub mod json;

use thiserror::Error;

pub use self::csv::{read_telemetry_file, write_telemetry, write_telemetry_file, TelemetryRecord};
pub use self::json::{write_report, write_report_file, FlightSummary};

/// Failures while writing telemetry or reports.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
