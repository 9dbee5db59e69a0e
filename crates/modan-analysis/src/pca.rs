//! Principal component analysis
//!
//! The data matrix is centered on its column means and the population
//! covariance `Xcᵀ Xc / n` is decomposed by SVD. Because the covariance is
//! symmetric positive semi-definite, its singular values are the eigenvalues
//! and the left singular vectors are the principal axes.
//!
//! Each axis is oriented so that its largest-magnitude loading is positive,
//! which makes the result independent of the sign chosen by the SVD.
//!
//! # Examples
//!
//! ```
//! use modan_analysis::pca::PrincipalComponents;
//! use nalgebra::DMatrix;
//!
//! // Points scattered along the diagonal y = x
//! let data = DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
//! let pca = PrincipalComponents::fit(&data)?;
//! assert!((pca.explained_variance_ratio[0] - 1.0).abs() < 1e-12);
//! assert_eq!(pca.components_for_cumulative(0.9), 1);
//! # Ok::<(), modan_analysis::AnalysisError>(())
//! ```

use nalgebra::{DMatrix, DVector};

use crate::AnalysisError;

/// Cumulative explained-variance threshold for [`PrincipalComponents::n_significant`].
pub const SIGNIFICANT_CUMULATIVE_VARIANCE: f64 = 0.95;

/// Result of a principal component analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponents {
    /// Column means of the input data.
    pub mean: DVector<f64>,
    /// Variances along the principal axes, in decreasing order.
    pub eigenvalues: Vec<f64>,
    /// `eigenvalue / Σ eigenvalues`; all zero when the data has no variance.
    pub explained_variance_ratio: Vec<f64>,
    pub cumulative_variance_ratio: Vec<f64>,
    /// `p × p` matrix whose columns are the principal axes (loadings).
    pub rotation: DMatrix<f64>,
    /// `n × p` coordinates of the observations on the principal axes.
    pub scores: DMatrix<f64>,
}

impl PrincipalComponents {
    /// Fits the principal axes of `data` (rows are observations).
    #[expect(clippy::cast_precision_loss)]
    pub fn fit(data: &DMatrix<f64>) -> Result<Self, AnalysisError> {
        let (n, p) = data.shape();
        if n < 2 {
            return Err(AnalysisError::TooFewObservations {
                required: 2,
                found: n,
            });
        }
        if p == 0 {
            return Err(AnalysisError::NoVariables);
        }
        log::debug!("PCA on {n} observations x {p} variables");

        let mean = data.row_mean().transpose();
        let centered = center_columns(data, &mean);
        let covariance = centered.transpose() * &centered / n as f64;

        let svd = covariance.svd(true, false);
        let u = svd.u.ok_or(AnalysisError::SingularMatrix {
            matrix: "covariance",
        })?;
        let singular_values = svd.singular_values;

        let mut order = (0..p).collect::<Vec<_>>();
        order.sort_by(|&a, &b| singular_values[b].total_cmp(&singular_values[a]));

        let eigenvalues = order.iter().map(|&i| singular_values[i]).collect::<Vec<_>>();
        let mut rotation = u.select_columns(&order);
        for mut axis in rotation.column_iter_mut() {
            let dominant = axis.iter().copied().max_by(|a, b| a.abs().total_cmp(&b.abs()));
            if dominant.is_some_and(|v| v < 0.0) {
                axis.neg_mut();
            }
        }

        let (explained_variance_ratio, cumulative_variance_ratio) = variance_ratios(&eigenvalues);
        let scores = &centered * &rotation;
        Ok(Self {
            mean,
            eigenvalues,
            explained_variance_ratio,
            cumulative_variance_ratio,
            rotation,
            scores,
        })
    }

    /// Number of principal axes.
    #[must_use]
    pub fn n_components(&self) -> usize {
        self.eigenvalues.len()
    }

    /// Number of components needed to exceed 95% of the total variance.
    #[must_use]
    pub fn n_significant(&self) -> usize {
        self.components_for_cumulative(SIGNIFICANT_CUMULATIVE_VARIANCE)
    }

    /// Number of components whose share of the total variance is at least `ratio`.
    #[must_use]
    pub fn n_effective(&self, ratio: f64) -> usize {
        self.explained_variance_ratio
            .iter()
            .take_while(|r| **r >= ratio)
            .count()
    }

    /// Number of leading components whose cumulative share first exceeds `threshold`.
    ///
    /// Returns all components when the threshold is never exceeded.
    #[must_use]
    pub fn components_for_cumulative(&self, threshold: f64) -> usize {
        self.cumulative_variance_ratio
            .iter()
            .position(|c| *c > threshold)
            .map_or(self.n_components(), |i| i + 1)
    }

    /// Scores on the first `n_components` axes.
    #[must_use]
    pub fn leading_scores(&self, n_components: usize) -> DMatrix<f64> {
        self.scores
            .columns(0, n_components.min(self.n_components()))
            .into_owned()
    }

    /// Approximates an observation from its scores on the first `n_components` axes.
    ///
    /// Extra scores beyond `n_components` are ignored.
    #[must_use]
    pub fn reconstruct(&self, scores: &[f64], n_components: usize) -> DVector<f64> {
        let mut out = self.mean.clone();
        for (axis, score) in self
            .rotation
            .column_iter()
            .zip(scores)
            .take(n_components)
        {
            out += axis * *score;
        }
        out
    }
}

fn center_columns(data: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    let mut centered = data.clone();
    for (mut column, m) in centered.column_iter_mut().zip(mean.iter()) {
        column.add_scalar_mut(-m);
    }
    centered
}

/// Per-component and cumulative shares of the total.
pub(crate) fn variance_ratios(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let total = values.iter().sum::<f64>();
    let ratios = values
        .iter()
        .map(|v| if total > 0.0 { v / total } else { 0.0 })
        .collect::<Vec<_>>();
    let cumulative = ratios
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect();
    (ratios, cumulative)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn random_data(n: usize, stds: &[f64], seed: u64) -> DMatrix<f64> {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        DMatrix::from_fn(n, stds.len(), |_, c| {
            Normal::new(10.0, stds[c]).unwrap().sample(&mut rng)
        })
    }

    #[test]
    fn test_eigenvalues_are_sorted_and_sum_to_total_variance() {
        let data = random_data(200, &[3.0, 0.5, 1.5, 0.1], 1);
        let pca = PrincipalComponents::fit(&data).unwrap();
        assert!(pca.eigenvalues.windows(2).all(|w| w[0] >= w[1]));

        let n = 200.0;
        let total_variance = data
            .column_iter()
            .map(|c| {
                let m = c.mean();
                c.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n
            })
            .sum::<f64>();
        let sum = pca.eigenvalues.iter().sum::<f64>();
        assert!((sum - total_variance).abs() < 1e-9);
        assert!((pca.cumulative_variance_ratio[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scores_are_uncorrelated_with_eigenvalue_variance() {
        let data = random_data(150, &[2.0, 1.0, 0.5], 2);
        let pca = PrincipalComponents::fit(&data).unwrap();
        let cov = pca.scores.transpose() * &pca.scores / 150.0;
        for i in 0..3 {
            assert!((cov[(i, i)] - pca.eigenvalues[i]).abs() < 1e-9);
            for j in 0..3 {
                if i != j {
                    assert!(cov[(i, j)].abs() < 1e-9);
                }
            }
        }
        let rotation_t_rotation = pca.rotation.transpose() * &pca.rotation;
        assert!((rotation_t_rotation - DMatrix::<f64>::identity(3, 3)).norm() < 1e-9);
    }

    #[test]
    fn test_axis_orientation() {
        let data = random_data(50, &[1.0, 2.0], 3);
        let pca = PrincipalComponents::fit(&data).unwrap();
        for axis in pca.rotation.column_iter() {
            let dominant = axis
                .iter()
                .copied()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                .unwrap();
            assert!(dominant > 0.0);
        }
    }

    #[test]
    fn test_full_reconstruction() {
        let data = random_data(20, &[1.0, 2.0, 3.0], 4);
        let pca = PrincipalComponents::fit(&data).unwrap();
        let scores = pca.scores.row(5).iter().copied().collect::<Vec<_>>();
        let restored = pca.reconstruct(&scores, 3);
        let original = data.row(5).transpose();
        assert!((restored - original).norm() < 1e-9);

        let mean_only = pca.reconstruct(&scores, 0);
        assert_eq!(mean_only, pca.mean);
    }

    #[test]
    fn test_component_counts() {
        let data = DMatrix::from_row_slice(
            4,
            3,
            &[
                0.0, 0.0, 0.0, //
                4.0, 1.0, 0.0, //
                8.0, 0.0, 0.0, //
                12.0, 1.0, 0.0,
            ],
        );
        let pca = PrincipalComponents::fit(&data).unwrap();
        assert_eq!(pca.n_components(), 3);
        assert_eq!(pca.n_effective(1e-5), 2);
        assert_eq!(pca.components_for_cumulative(0.9), 1);
        assert_eq!(pca.n_significant(), 1);
        assert_eq!(pca.leading_scores(2).shape(), (4, 2));
    }

    #[test]
    fn test_constant_data_has_zero_ratios() {
        let data = DMatrix::from_element(3, 2, 5.0);
        let pca = PrincipalComponents::fit(&data).unwrap();
        assert!(pca.explained_variance_ratio.iter().all(|r| *r == 0.0));
        assert_eq!(pca.components_for_cumulative(0.9), 2);
        assert_eq!(pca.n_effective(1e-5), 0);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            PrincipalComponents::fit(&DMatrix::zeros(1, 3)).unwrap_err(),
            AnalysisError::TooFewObservations {
                required: 2,
                found: 1
            }
        );
        assert_eq!(
            PrincipalComponents::fit(&DMatrix::zeros(3, 0)).unwrap_err(),
            AnalysisError::NoVariables
        );
    }
}
