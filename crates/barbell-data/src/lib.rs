//! Data processing layer for the barbell pipeline.
//!
//! Responsible for discovering and parsing the raw recording CSV files,
//! assembling per-sensor tables, merging the two sensors, resampling into
//! fixed-width buckets, exporting to Parquet and running the whole chain.

pub mod aggregator;
pub mod analysis;
pub mod exporter;
pub mod merger;
pub mod reader;
pub mod resampler;

pub use barbell_core as core;
