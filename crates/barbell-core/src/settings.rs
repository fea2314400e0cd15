use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chrono::TimeDelta;

use crate::error::{PipelineError, Result};
use crate::naming::{CategoryNormalizer, DEFAULT_DEVICE_SUFFIX};
use crate::time_utils::{bucket_width, TimezoneHandler, DEFAULT_BUCKET_MS};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Preprocess barbell accelerometer and gyroscope recordings into a resampled table
#[derive(Parser, Debug, Clone)]
#[command(
    name = "barbell",
    about = "Preprocess barbell accelerometer and gyroscope recordings into a resampled table",
    version
)]
pub struct Settings {
    /// Directory containing the raw recording CSV files
    #[arg(long, env = "BARBELL_DATA_DIR", default_value = "data/raw/MetaMotion")]
    pub data_dir: PathBuf,

    /// Parquet file the resampled table is written to
    #[arg(long, env = "BARBELL_OUTPUT", default_value = "data/interim/01_data_processed.parquet")]
    pub output: PathBuf,

    /// Optional JSON run summary path
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Resampling bucket width in milliseconds (must divide one minute)
    #[arg(long, default_value_t = DEFAULT_BUCKET_MS)]
    pub bucket_ms: i64,

    /// IANA timezone used to split recordings into calendar days
    #[arg(long, default_value = "UTC")]
    pub timezone: String,

    /// Device token stripped from the category field of file names
    #[arg(long, default_value = DEFAULT_DEVICE_SUFFIX)]
    pub device_suffix: String,

    /// Log a diagnostic resample of the first N merged rows
    #[arg(long)]
    pub preview: Option<usize>,

    /// JSON config file (defaults to the platform config dir)
    #[arg(long, env = "BARBELL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Persist the effective settings to the config file
    #[arg(long)]
    pub save_config: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── ConfigFile ─────────────────────────────────────────────────────────────────

/// Persisted pipeline defaults, stored as JSON.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_suffix: Option<String>,
}

impl ConfigFile {
    /// Return the default config path: `<config dir>/barbell/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("barbell")
            .join("config.json")
    }

    /// Load a config file.
    ///
    /// A missing file yields the default (empty) config; a file that exists
    /// but cannot be parsed is a configuration error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PipelineError::Config(format!("invalid config file {}: {}", path.display(), e))
        })
    }

    /// Atomically write the config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Validated configuration consumed by the preprocessing pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub summary: Option<PathBuf>,
    pub bucket_width: TimeDelta,
    pub timezone: TimezoneHandler,
    pub normalizer: CategoryNormalizer,
    pub preview: Option<usize>,
}

impl PipelineConfig {
    /// Config with default bucket width, UTC days and the MetaWear suffix.
    pub fn new(data_dir: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output: output.into(),
            summary: None,
            bucket_width: TimeDelta::milliseconds(DEFAULT_BUCKET_MS),
            timezone: TimezoneHandler::utc(),
            normalizer: CategoryNormalizer::default(),
            preview: None,
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments and merge them with the config file.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but accepts an explicit argument list,
    /// enabling unit-testing without spawning subprocesses.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Result<Self> {
        // Build raw ArgMatches so we can query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        let config_path = settings
            .config
            .clone()
            .unwrap_or_else(ConfigFile::default_path);
        let file = ConfigFile::load_from(&config_path)?;

        // Values given on the command line (or via env) win over the file.
        if !is_arg_explicitly_set(&matches, "data_dir") {
            if let Some(v) = file.data_dir {
                settings.data_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output") {
            if let Some(v) = file.output {
                settings.output = v;
            }
        }
        if settings.summary.is_none() {
            settings.summary = file.summary;
        }
        if !is_arg_explicitly_set(&matches, "bucket_ms") {
            if let Some(v) = file.bucket_ms {
                settings.bucket_ms = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = file.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "device_suffix") {
            if let Some(v) = file.device_suffix {
                settings.device_suffix = v;
            }
        }

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        if settings.save_config {
            ConfigFile::from(&settings).save_to(&config_path)?;
        }

        Ok(settings)
    }

    /// Validate the settings into a [`PipelineConfig`].
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        if !TimezoneHandler::validate_timezone(&self.timezone) {
            return Err(PipelineError::Config(format!(
                "unknown timezone \"{}\"",
                self.timezone
            )));
        }

        Ok(PipelineConfig {
            data_dir: self.data_dir.clone(),
            output: self.output.clone(),
            summary: self.summary.clone(),
            bucket_width: bucket_width(self.bucket_ms)?,
            timezone: TimezoneHandler::new(&self.timezone),
            normalizer: CategoryNormalizer::new(&self.device_suffix)?,
            preview: self.preview,
        })
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for ConfigFile {
    fn from(s: &Settings) -> Self {
        ConfigFile {
            data_dir: Some(s.data_dir.clone()),
            output: Some(s.output.clone()),
            summary: s.summary.clone(),
            bucket_ms: Some(s.bucket_ms),
            timezone: Some(s.timezone.clone()),
            device_suffix: Some(s.device_suffix.clone()),
        }
    }
}

// ── Helper: check if an arg was explicitly set ──────────────────────────────────

/// Returns `true` when `name` was supplied on the command line or through its
/// environment variable (not via default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine) | Some(clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
