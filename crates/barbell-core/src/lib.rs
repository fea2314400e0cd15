//! Shared model, error and configuration types for the barbell pipeline.
//!
//! Everything downstream (ingestion, resampling, export, evaluation) speaks
//! in terms of the typed rows defined in [`models`].

pub mod error;
pub mod models;
pub mod naming;
pub mod settings;
pub mod time_utils;

pub use error::{PipelineError, Result};
