use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while ingesting, resampling and exporting recordings.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file name does not follow the `participant-label-category…` convention.
    #[error("Malformed recording identifier {path}: {reason}")]
    MalformedIdentifier { path: PathBuf, reason: String },

    /// The file name names neither sensor, or both.
    #[error("Cannot determine sensor type of {path}: expected exactly one of \"Accelerometer\" or \"Gyroscope\"")]
    AmbiguousSensor { path: PathBuf },

    /// A required CSV column is absent from the header.
    #[error("Missing required column \"{column}\" in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// A cell could not be converted to the expected type.
    #[error("Invalid value {value:?} for column \"{column}\" in {path} at line {line}")]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    /// The CSV reader rejected the file.
    #[error("Failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// The expected input directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// No CSV recordings were found under the given directory.
    #[error("No CSV files found in {0}")]
    NoDataFiles(PathBuf),

    /// Writing or reading the exported table failed.
    #[error("Export error: {0}")]
    Export(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the barbell crates.
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = PipelineError::FileRead {
            path: PathBuf::from("/data/A-bench-heavy_Accelerometer.csv"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("A-bench-heavy_Accelerometer.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_malformed_identifier() {
        let err = PipelineError::MalformedIdentifier {
            path: PathBuf::from("bench.csv"),
            reason: "expected at least 3 '-' separated fields, found 1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Malformed recording identifier bench.csv: expected at least 3 '-' separated fields, found 1"
        );
    }

    #[test]
    fn test_error_display_ambiguous_sensor_names_file() {
        let err = PipelineError::AmbiguousSensor {
            path: PathBuf::from("A-bench-heavy_Magnetometer.csv"),
        };
        let msg = err.to_string();
        assert!(msg.contains("A-bench-heavy_Magnetometer.csv"));
        assert!(msg.contains("Accelerometer"));
        assert!(msg.contains("Gyroscope"));
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = PipelineError::MissingColumn {
            path: PathBuf::from("a.csv"),
            column: "epoch (ms)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required column \"epoch (ms)\" in a.csv"
        );
    }

    #[test]
    fn test_error_display_invalid_value() {
        let err = PipelineError::InvalidValue {
            path: PathBuf::from("a.csv"),
            line: 4,
            column: "x-axis (g)".to_string(),
            value: "abc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value \"abc\" for column \"x-axis (g)\" in a.csv at line 4"
        );
    }

    #[test]
    fn test_error_display_data_path_not_found() {
        let err = PipelineError::DataPathNotFound(PathBuf::from("/missing/dir"));
        assert_eq!(err.to_string(), "Data path not found: /missing/dir");
    }

    #[test]
    fn test_error_display_no_data_files() {
        let err = PipelineError::NoDataFiles(PathBuf::from("/empty/dir"));
        assert_eq!(err.to_string(), "No CSV files found in /empty/dir");
    }

    #[test]
    fn test_error_display_config() {
        let err = PipelineError::Config("bucket width must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: bucket width must be positive"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: PipelineError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: PipelineError = json_err.into();
        assert!(err.to_string().contains("Failed to process JSON"));
    }
}
