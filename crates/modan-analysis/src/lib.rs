//! Multivariate analyses of superimposed landmark data
//!
//! # Modules
//!
//! - [`pca`]: Principal component analysis
//! - [`cva`]: Canonical variate analysis with nearest-centroid classification
//! - [`manova`]: One-way MANOVA with the four classical test statistics
//! - [`pipeline`]: Superimposition followed by PCA, CVA and MANOVA
//! - [`report`]: Serializable result tables
//!
//! All engines take a data matrix with one observation per row. Grouping
//! variables are given as one label per observation; groups are ordered by
//! label.

pub use self::{
    error::AnalysisError,
    pipeline::{AnalysisRequest, AnalysisResult, ObjectInfo, run_analysis},
    settings::{AnalysisSettings, SuperimpositionSetting},
};

pub mod cva;
mod error;
mod groups;
pub mod manova;
pub mod pca;
pub mod pipeline;
pub mod report;
mod settings;
