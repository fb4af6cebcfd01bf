//! Core analysis for comparing InSAR displacement with GNSS station motion.
//!
//! Stations are matched to nearby InSAR points, the matched displacements are
//! averaged per epoch and linear trends are fitted to the resulting series.

pub mod dataset;
pub mod geodesy;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{AnalysisConfig, AnalysisError, AnalysisResult};
