//! Canonical variate analysis
//!
//! Finds the axes that best separate predefined groups relative to the
//! variation within groups:
//!
//! 1. Variables with zero variance are set aside.
//! 2. The within-group covariance `W = E / (N − G)` and the between-group
//!    covariance `B = H / G` are formed from the group SSCP matrices.
//! 3. `W⁻¹ B` is decomposed by SVD; its singular values are the canonical
//!    eigenvalues and its left singular vectors the canonical axes.
//!
//! Scores are the centered data projected onto the canonical axes. Each
//! observation is then assigned to the group with the nearest centroid in
//! the space of the first `min(G − 1, p)` axes.

use nalgebra::{Cholesky, DMatrix, RowDVector};

use crate::{AnalysisError, groups::Groups, pca::variance_ratios};

/// Variables whose variance does not exceed this value are dropped.
const ZERO_VARIANCE: f64 = 1e-20;

/// Result of a canonical variate analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalVariates {
    /// Group names in sorted order.
    pub group_names: Vec<String>,
    pub group_sizes: Vec<usize>,
    /// Canonical eigenvalues, in decreasing order.
    pub eigenvalues: Vec<f64>,
    pub explained_variance_ratio: Vec<f64>,
    pub cumulative_variance_ratio: Vec<f64>,
    /// `p × p` canonical axes (columns); rows and columns of dropped variables are zero.
    pub rotation: DMatrix<f64>,
    /// `n × p` canonical scores.
    pub scores: DMatrix<f64>,
    /// Column means of the input data.
    pub grand_mean: RowDVector<f64>,
    /// `G × p` group centroids in canonical space, in `group_names` order.
    pub group_centroids: DMatrix<f64>,
    /// Indices of the zero-variance variables that were dropped.
    pub dropped_variables: Vec<usize>,
    /// Nearest-centroid group of each observation.
    pub predicted_groups: Vec<String>,
    /// Percentage of observations assigned to their own group.
    pub accuracy: f64,
}

impl CanonicalVariates {
    /// Fits canonical axes separating the groups given by `labels`.
    #[expect(clippy::cast_precision_loss)]
    pub fn fit(data: &DMatrix<f64>, labels: &[String]) -> Result<Self, AnalysisError> {
        let (n, p) = data.shape();
        if p == 0 {
            return Err(AnalysisError::NoVariables);
        }
        let groups = Groups::new(labels, n)?;
        let g = groups.len();
        if n <= g {
            return Err(AnalysisError::TooFewObservations {
                required: g + 1,
                found: n,
            });
        }
        log::debug!("CVA on {n} observations x {p} variables, {g} groups");

        let grand_mean = data.row_mean();
        let (kept, dropped_variables) = split_zero_variance(data, &grand_mean);
        if kept.is_empty() {
            return Err(AnalysisError::NoVariables);
        }
        if !dropped_variables.is_empty() {
            log::debug!("CVA: dropping zero-variance variables {dropped_variables:?}");
        }

        let reduced = data.select_columns(&kept);
        let group_means = groups.means(&reduced);
        let (within, between) = groups.sscp(&reduced, &group_means, &reduced.row_mean());
        let within = within / (n - g) as f64;
        let between = between / g as f64;

        let within_inverse = Cholesky::new(within)
            .ok_or(AnalysisError::SingularMatrix {
                matrix: "within-group covariance",
            })?
            .inverse();
        let svd = (within_inverse * between).svd(true, false);
        let u = svd.u.ok_or(AnalysisError::SingularMatrix {
            matrix: "within-group covariance",
        })?;
        let singular_values = svd.singular_values;

        let q = kept.len();
        let mut order = (0..q).collect::<Vec<_>>();
        order.sort_by(|&a, &b| singular_values[b].total_cmp(&singular_values[a]));
        let eigenvalues = order.iter().map(|&i| singular_values[i]).collect::<Vec<_>>();
        let (explained_variance_ratio, cumulative_variance_ratio) = variance_ratios(&eigenvalues);

        let mut rotation = DMatrix::zeros(p, p);
        for (col, &src) in order.iter().enumerate() {
            let dominant = u
                .column(src)
                .iter()
                .copied()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                .unwrap_or(0.0);
            let sign = if dominant < 0.0 { -1.0 } else { 1.0 };
            for (row, &var) in kept.iter().enumerate() {
                rotation[(var, col)] = sign * u[(row, src)];
            }
        }

        let mut centered = data.clone();
        for mut row in centered.row_iter_mut() {
            row -= &grand_mean;
        }
        let scores = centered * &rotation;
        let group_centroids = groups.means(&scores);

        let axes = (g - 1).min(q);
        let centroids = group_centroids.columns(0, axes).into_owned();
        let predicted = scores
            .columns(0, axes)
            .row_iter()
            .map(|row| nearest_centroid(&row.into_owned(), &centroids))
            .collect::<Vec<_>>();
        let correct = predicted
            .iter()
            .zip(&groups.membership)
            .filter(|(a, b)| a == b)
            .count();
        let accuracy = 100.0 * correct as f64 / n as f64;
        log::debug!("CVA: nearest-centroid accuracy {accuracy:.1}%");

        Ok(Self {
            predicted_groups: predicted
                .iter()
                .map(|&i| groups.names[i].clone())
                .collect(),
            group_names: groups.names,
            group_sizes: groups.sizes,
            eigenvalues,
            explained_variance_ratio,
            cumulative_variance_ratio,
            rotation,
            scores,
            grand_mean,
            group_centroids,
            dropped_variables,
            accuracy,
        })
    }

    /// Number of discriminating axes, `min(G − 1, p)`.
    #[must_use]
    pub fn n_discriminant_axes(&self) -> usize {
        (self.group_names.len() - 1).min(self.eigenvalues.len())
    }
}

/// Splits variable indices into those with variance and those without.
fn split_zero_variance(data: &DMatrix<f64>, mean: &RowDVector<f64>) -> (Vec<usize>, Vec<usize>) {
    (0..data.ncols()).partition(|&c| {
        data.column(c)
            .iter()
            .map(|v| (v - mean[c]).powi(2))
            .sum::<f64>()
            > ZERO_VARIANCE
    })
}

/// Index of the centroid (row) closest to `point`.
fn nearest_centroid(point: &RowDVector<f64>, centroids: &DMatrix<f64>) -> usize {
    centroids
        .row_iter()
        .enumerate()
        .map(|(g, centroid)| (g, (centroid - point).norm_squared()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map_or(0, |(g, _)| g)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    /// Groups of `per_group` observations scattered around `centers`.
    fn grouped_data(centers: &[[f64; 3]], per_group: usize, seed: u64) -> (DMatrix<f64>, Vec<String>) {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let noise = Normal::new(0.0, 0.3).unwrap();
        let n = centers.len() * per_group;
        let data = DMatrix::from_fn(n, 3, |r, c| centers[r / per_group][c] + noise.sample(&mut rng));
        let labels = (0..n).map(|r| format!("g{}", r / per_group)).collect();
        (data, labels)
    }

    #[test]
    fn test_separated_groups_are_classified() {
        let (data, labels) = grouped_data(&[[0.0, 0.0, 0.0], [5.0, 0.0, 1.0], [0.0, 5.0, -1.0]], 20, 7);
        let cva = CanonicalVariates::fit(&data, &labels).unwrap();

        assert_eq!(cva.group_names, ["g0", "g1", "g2"]);
        assert_eq!(cva.group_sizes, [20, 20, 20]);
        assert_eq!(cva.n_discriminant_axes(), 2);
        assert!(cva.eigenvalues.windows(2).all(|w| w[0] >= w[1]));
        assert!((cva.cumulative_variance_ratio[2] - 1.0).abs() < 1e-12);
        assert!((cva.accuracy - 100.0).abs() < 1e-12);
        assert_eq!(cva.predicted_groups, labels);
        assert_eq!(cva.scores.shape(), (60, 3));
        assert_eq!(cva.group_centroids.shape(), (3, 3));
    }

    #[test]
    fn test_scores_are_centered() {
        let (data, labels) = grouped_data(&[[1.0, 2.0, 3.0], [3.0, 2.0, 1.0]], 10, 8);
        let cva = CanonicalVariates::fit(&data, &labels).unwrap();
        for column in cva.scores.column_iter() {
            assert!(column.mean().abs() < 1e-9);
        }
        for axis in cva.rotation.column_iter() {
            let dominant = axis
                .iter()
                .copied()
                .max_by(|a, b| a.abs().total_cmp(&b.abs()))
                .unwrap();
            assert!(dominant >= 0.0);
        }
    }

    #[test]
    fn test_zero_variance_variable_is_dropped() {
        let (mut data, labels) = grouped_data(&[[0.0, 0.0, 0.0], [4.0, 4.0, 0.0]], 10, 9);
        data.column_mut(2).fill(1.5);
        let cva = CanonicalVariates::fit(&data, &labels).unwrap();
        assert_eq!(cva.dropped_variables, [2]);
        assert!(cva.rotation.row(2).iter().all(|v| *v == 0.0));
        assert!(cva.rotation.column(2).iter().all(|v| *v == 0.0));
        assert!((cva.accuracy - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_within_group_covariance() {
        // The second variable is an exact multiple of the first.
        let data = DMatrix::from_row_slice(
            6,
            2,
            &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 7.0, 14.0, 8.0, 16.0, 9.0, 18.0],
        );
        let labels = ["a", "a", "a", "b", "b", "b"].map(String::from);
        assert_eq!(
            CanonicalVariates::fit(&data, &labels).unwrap_err(),
            AnalysisError::SingularMatrix {
                matrix: "within-group covariance"
            }
        );
    }

    #[test]
    fn test_errors() {
        let data = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        let labels = ["a", "b"].map(String::from);
        assert_eq!(
            CanonicalVariates::fit(&data, &labels).unwrap_err(),
            AnalysisError::TooFewObservations {
                required: 3,
                found: 2
            }
        );
        assert_eq!(
            CanonicalVariates::fit(&data, &labels[..1]).unwrap_err(),
            AnalysisError::LengthMismatch {
                observations: 2,
                labels: 1
            }
        );
        assert_eq!(
            CanonicalVariates::fit(&DMatrix::zeros(3, 0), &["a", "b", "b"].map(String::from))
                .unwrap_err(),
            AnalysisError::NoVariables
        );
    }
}
