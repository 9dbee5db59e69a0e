//! Serializable result tables
//!
//! The analysis engines work on `nalgebra` matrices. The types here turn
//! their results into row-major tables that serialize to JSON.

use modan_shape::{Dataset, SuperimposedSet};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    cva::CanonicalVariates,
    manova::ManovaResult,
    pca::PrincipalComponents,
};

/// Rows of a matrix as nested vectors.
#[must_use]
pub fn matrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

/// Aligned configurations together with the consensus shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperimpositionReport {
    pub method: String,
    pub iterations: usize,
    pub object_names: Vec<String>,
    /// Consensus configuration, one landmark per row.
    pub mean_shape: Vec<Vec<f64>>,
    /// Aligned configurations, in object order.
    pub aligned: Vec<Vec<Vec<f64>>>,
    pub centroid_sizes: Vec<f64>,
    pub procrustes_distances: Vec<f64>,
}

impl SuperimpositionReport {
    #[must_use]
    pub fn new(set: &SuperimposedSet, dataset: &Dataset) -> Self {
        Self {
            method: set.method.to_string(),
            iterations: set.iterations,
            object_names: dataset.specimens().iter().map(|s| s.name.clone()).collect(),
            mean_shape: matrix_rows(&set.mean_shape),
            aligned: set.aligned.iter().map(matrix_rows).collect(),
            centroid_sizes: set.centroid_sizes.clone(),
            procrustes_distances: set.procrustes_distances.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcaReport {
    pub eigenvalues: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
    pub cumulative_variance_ratio: Vec<f64>,
    /// Components needed to exceed 95% of the total variance.
    pub n_significant: usize,
    /// Components whose share of the variance reaches the effective ratio.
    pub n_effective: usize,
    pub mean: Vec<f64>,
    /// Loadings, one variable per row and one component per column.
    pub rotation: Vec<Vec<f64>>,
    pub scores: Vec<Vec<f64>>,
}

impl PcaReport {
    #[must_use]
    pub fn new(pca: &PrincipalComponents, effective_ratio: f64) -> Self {
        Self {
            eigenvalues: pca.eigenvalues.clone(),
            explained_variance_ratio: pca.explained_variance_ratio.clone(),
            cumulative_variance_ratio: pca.cumulative_variance_ratio.clone(),
            n_significant: pca.n_significant(),
            n_effective: pca.n_effective(effective_ratio),
            mean: pca.mean.iter().copied().collect(),
            rotation: matrix_rows(&pca.rotation),
            scores: matrix_rows(&pca.scores),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvaReport {
    pub group_variable: String,
    /// Number of PCA components the analysis was run on.
    pub n_components: usize,
    pub group_names: Vec<String>,
    pub group_sizes: Vec<usize>,
    pub eigenvalues: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
    pub cumulative_variance_ratio: Vec<f64>,
    pub rotation: Vec<Vec<f64>>,
    pub scores: Vec<Vec<f64>>,
    pub group_centroids: Vec<Vec<f64>>,
    pub dropped_variables: Vec<usize>,
    pub predicted_groups: Vec<String>,
    /// Percentage of objects assigned to their own group.
    pub accuracy: f64,
}

impl CvaReport {
    #[must_use]
    pub fn new(group_variable: String, cva: &CanonicalVariates) -> Self {
        Self {
            group_variable,
            n_components: cva.rotation.nrows(),
            group_names: cva.group_names.clone(),
            group_sizes: cva.group_sizes.clone(),
            eigenvalues: cva.eigenvalues.clone(),
            explained_variance_ratio: cva.explained_variance_ratio.clone(),
            cumulative_variance_ratio: cva.cumulative_variance_ratio.clone(),
            rotation: matrix_rows(&cva.rotation),
            scores: matrix_rows(&cva.scores),
            group_centroids: matrix_rows(&cva.group_centroids),
            dropped_variables: cva.dropped_variables.clone(),
            predicted_groups: cva.predicted_groups.clone(),
            accuracy: cva.accuracy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManovaReport {
    pub group_variable: String,
    /// Number of leading PCA components the test was run on.
    pub n_components: usize,
    #[serde(flatten)]
    pub result: ManovaResult,
}
