use std::path::PathBuf;
use thiserror::Error;

use super::worker_status::WorkerStatus;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilenameError {
    #[error("File name {0} does not match any supported naming grammar")]
    NoMatch(String),
    #[error("File name {0} has an unparsable primary energy {1}")]
    BadEnergy(String, String),
    #[error("File name {0} has an unparsable card number {1}")]
    BadCard(String, String),
    #[error("File name {0} has an unparsable cycle id {1}")]
    BadCycle(String, String),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to read text file due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Could not decode {0:?} with any of the configured text codecs")]
    Exhausted(PathBuf),
    #[error("No text codecs configured")]
    NoCodecs,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("Could not parse an angle center from detector name '{0}'")]
    HeaderAngleUnresolvable(String),
    #[error("Malformed numeric row at line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },
    #[error("File ended before line {0}")]
    MissingLine(usize),
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Dataset failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Dataset failed due to Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),
    #[error("Dataset failed due to Parquet error: {0}")]
    ParquetError(#[from] parquet::errors::ParquetError),
    #[error("Dataset is missing required column {0}")]
    MissingColumn(String),
    #[error("Dataset column {0} has an unexpected type")]
    BadColumnType(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
    #[error("Config has an invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Error)]
pub enum LetError {
    #[error("No rows left after filtering to primary_energy={0} (tol={1})")]
    EmptySelection(f64, f64),
    #[error("LET calculation requires a {expected} dataset, got a {found} dataset")]
    WrongCategory {
        expected: &'static str,
        found: &'static str,
    },
    #[error("LET calculation failed due to Dataset error: {0}")]
    DatasetError(#[from] DatasetError),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor produced zero rows across all categories; check paths & naming patterns")]
    EmptyResultSet,
    #[error("Processor failed due to Dataset error: {0}")]
    DatasetError(#[from] DatasetError),
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed while walking the input directory: {0}")]
    WalkError(#[from] walkdir::Error),
    #[error("Processor failed to write the issue report: {0}")]
    ReportError(#[from] serde_yaml::Error),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
