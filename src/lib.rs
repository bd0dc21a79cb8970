//! Cleaning, feature derivation and summary insights for a snapshot of
//! property sales.
//!
//! The pipeline runs in three steps, each reading the previous step's CSV:
//! [`Pipeline::clean`], [`Pipeline::features`] and [`Pipeline::insights`].

pub mod cleaner;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod insights;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod suburb;

pub use cleaner::CleaningSummary;
pub use config::{PipelineConfig, SuburbComparison};
pub use error::{PipelineError, Result};
pub use features::FeatureSummary;
pub use insights::InsightReport;
pub use pipeline::{Pipeline, PipelinePaths, RunSummary};
pub use suburb::SuburbCanonicalizer;
