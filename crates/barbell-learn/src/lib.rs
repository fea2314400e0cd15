//! Training and evaluation harness for exercise classification.
//!
//! Turns resampled rows into feature tables, splits them, drives a
//! [`Learner`](learner::Learner) implementation over several feature sets and
//! scores the results.

pub mod error;
pub mod evaluation;
pub mod features;
pub mod learner;
pub mod metrics;
pub mod split;

pub use error::{LearnError, Result};
