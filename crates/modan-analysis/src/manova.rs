//! Multivariate analysis of variance
//!
//! Tests whether the group mean vectors differ, using the eigenvalues `λᵢ` of
//! `E⁻¹ H` where `E` is the error (within-group) and `H` the hypothesis
//! (between-group) sums of squares and cross-products.
//!
//! Four classical statistics are reported together with their F
//! approximations and p-values:
//!
//! | Statistic              | Value               |
//! |------------------------|---------------------|
//! | Wilks' lambda          | `Π 1 / (1 + λᵢ)`    |
//! | Pillai's trace         | `Σ λᵢ / (1 + λᵢ)`   |
//! | Hotelling-Lawley trace | `Σ λᵢ`              |
//! | Roy's greatest root    | `max λᵢ`            |
//!
//! # Examples
//!
//! ```
//! use modan_analysis::manova::{Manova, StatisticKind};
//! use nalgebra::DMatrix;
//!
//! let data = DMatrix::from_row_slice(4, 1, &[1.0, 3.0, 10.0, 14.0]);
//! let labels = ["a", "a", "b", "b"].map(String::from);
//! let result = Manova::fit(&data, &labels)?;
//!
//! let wilks = result.statistic(StatisticKind::WilksLambda).unwrap();
//! assert!((wilks.f_value - 20.0).abs() < 1e-9);
//! # Ok::<(), modan_analysis::AnalysisError>(())
//! ```

use modan_stats::f_distribution::FDistribution;
use nalgebra::{Cholesky, DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::{AnalysisError, groups::Groups};

/// Multivariate test statistic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StatisticKind {
    #[display("Wilks' lambda")]
    WilksLambda,
    #[display("Pillai's trace")]
    PillaiTrace,
    #[display("Hotelling-Lawley trace")]
    HotellingLawleyTrace,
    #[display("Roy's greatest root")]
    RoysGreatestRoot,
}

impl StatisticKind {
    pub const ALL: [Self; 4] = [
        Self::WilksLambda,
        Self::PillaiTrace,
        Self::HotellingLawleyTrace,
        Self::RoysGreatestRoot,
    ];
}

/// Value of one statistic with its F approximation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStatistic {
    pub kind: StatisticKind,
    pub value: f64,
    pub df_num: f64,
    pub df_den: f64,
    pub f_value: f64,
    /// `None` when the degrees of freedom are not positive or F is not finite.
    pub p_value: Option<f64>,
}

impl TestStatistic {
    fn new(kind: StatisticKind, value: f64, df_num: f64, df_den: f64, f_value: f64) -> Self {
        let p_value = FDistribution::new(df_num, df_den)
            .filter(|_| f_value.is_finite())
            .map(|dist| dist.sf(f_value));
        Self {
            kind,
            value,
            df_num,
            df_den,
            f_value,
            p_value,
        }
    }
}

/// Result of a one-way MANOVA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManovaResult {
    /// One entry per [`StatisticKind`], in [`StatisticKind::ALL`] order.
    pub statistics: Vec<TestStatistic>,
    pub group_names: Vec<String>,
    pub group_sizes: Vec<usize>,
    /// Per-group mean vectors, in `group_names` order.
    pub group_means: Vec<Vec<f64>>,
    pub overall_mean: Vec<f64>,
    pub n_observations: usize,
    pub n_variables: usize,
    /// Eigenvalues of `E⁻¹ H`, in decreasing order.
    pub eigenvalues: Vec<f64>,
}

impl ManovaResult {
    #[must_use]
    pub fn statistic(&self, kind: StatisticKind) -> Option<&TestStatistic> {
        self.statistics.iter().find(|s| s.kind == kind)
    }
}

/// One-way MANOVA on a data matrix grouped by labels.
#[derive(Debug, Clone, Copy)]
pub struct Manova;

impl Manova {
    #[expect(clippy::cast_precision_loss)]
    pub fn fit(data: &DMatrix<f64>, labels: &[String]) -> Result<ManovaResult, AnalysisError> {
        let (n_observations, n_variables) = data.shape();
        if n_variables == 0 {
            return Err(AnalysisError::NoVariables);
        }
        let groups = Groups::new(labels, n_observations)?;
        let g = groups.len();
        if n_observations <= g {
            return Err(AnalysisError::TooFewObservations {
                required: g + 1,
                found: n_observations,
            });
        }
        log::debug!("MANOVA on {n_observations} observations x {n_variables} variables, {g} groups");

        let overall_mean = data.row_mean();
        let group_means = groups.means(data);
        let (error, hypothesis) = groups.sscp(data, &group_means, &overall_mean);
        let eigenvalues = relative_eigenvalues(error, &hypothesis)?;

        let p = n_variables as f64;
        let q = (g - 1) as f64;
        let v = (n_observations - g) as f64;
        let statistics = multivariate_tests(&eigenvalues, p, q, v);
        for s in &statistics {
            log::debug!(
                "MANOVA {}: value={:.6} F={:.4} p={:?}",
                s.kind,
                s.value,
                s.f_value,
                s.p_value
            );
        }

        Ok(ManovaResult {
            statistics,
            group_names: groups.names,
            group_sizes: groups.sizes,
            group_means: group_means
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
            overall_mean: overall_mean.iter().copied().collect(),
            n_observations,
            n_variables,
            eigenvalues,
        })
    }
}

/// Eigenvalues of `E⁻¹ H` in decreasing order.
///
/// With `E = L Lᵀ`, these are the eigenvalues of the symmetric matrix
/// `L⁻¹ H L⁻ᵀ`. Small negative round-off values are clamped to zero.
fn relative_eigenvalues(
    error: DMatrix<f64>,
    hypothesis: &DMatrix<f64>,
) -> Result<Vec<f64>, AnalysisError> {
    let singular = AnalysisError::SingularMatrix {
        matrix: "error SSCP",
    };
    let p = error.nrows();
    let l = Cholesky::new(error).ok_or(singular.clone())?.l();
    let l_inv = l
        .solve_lower_triangular(&DMatrix::identity(p, p))
        .ok_or(singular)?;
    let reduced = &l_inv * hypothesis * l_inv.transpose();
    let mut eigenvalues = SymmetricEigen::new(reduced)
        .eigenvalues
        .iter()
        .map(|v| v.max(0.0))
        .collect::<Vec<_>>();
    eigenvalues.sort_by(|a, b| b.total_cmp(a));
    Ok(eigenvalues)
}

/// The four statistics for `p` variables, `q` hypothesis and `v` error degrees of freedom.
fn multivariate_tests(eigenvalues: &[f64], p: f64, q: f64, v: f64) -> Vec<TestStatistic> {
    let s = p.min(q);
    let m = ((p - q).abs() - 1.0) / 2.0;
    let n = (v - p - 1.0) / 2.0;

    let wilks = eigenvalues.iter().map(|l| 1.0 / (1.0 + l)).product::<f64>();
    let pillai = eigenvalues.iter().map(|l| l / (1.0 + l)).sum::<f64>();
    let hotelling = eigenvalues.iter().sum::<f64>();
    let roy = eigenvalues.first().copied().unwrap_or(0.0);

    // Rao's F for Wilks' lambda
    let wilks_stat = {
        let t_den = p * p + q * q - 5.0;
        let t = if t_den > 0.0 {
            ((p * p * q * q - 4.0) / t_den).sqrt()
        } else {
            1.0
        };
        let r = v - (p - q + 1.0) / 2.0;
        let u = (p * q - 2.0) / 4.0;
        let df1 = p * q;
        let df2 = r * t - 2.0 * u;
        let root = wilks.powf(1.0 / t);
        let f = (1.0 - root) / root * df2 / df1;
        TestStatistic::new(StatisticKind::WilksLambda, wilks, df1, df2, f)
    };

    let pillai_stat = {
        let df1 = s * (2.0 * m + s + 1.0);
        let df2 = s * (2.0 * n + s + 1.0);
        let f = df2 / df1 * pillai / (s - pillai);
        TestStatistic::new(StatisticKind::PillaiTrace, pillai, df1, df2, f)
    };

    let hotelling_stat = if n > 0.0 {
        // McKeon's approximation
        let b = (p + 2.0 * n) * (q + 2.0 * n) / (2.0 * (2.0 * n + 1.0) * (n - 1.0));
        let df1 = p * q;
        let df2 = 4.0 + (p * q + 2.0) / (b - 1.0);
        let c = (df2 - 2.0) / (2.0 * n);
        let f = df2 / df1 * hotelling / c;
        TestStatistic::new(StatisticKind::HotellingLawleyTrace, hotelling, df1, df2, f)
    } else {
        let df1 = s * (2.0 * m + s + 1.0);
        let df2 = s * (s * n + 1.0);
        let f = df2 / df1 / s * hotelling;
        TestStatistic::new(StatisticKind::HotellingLawleyTrace, hotelling, df1, df2, f)
    };

    let roy_stat = {
        let df1 = p.max(q);
        let df2 = v - df1 + q;
        let f = df2 / df1 * roy;
        TestStatistic::new(StatisticKind::RoysGreatestRoot, roy, df1, df2, f)
    };

    vec![wilks_stat, pillai_stat, hotelling_stat, roy_stat]
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_single_variable_matches_anova() {
        // E = 10, H = 100, so the one-way ANOVA F is (100 / 1) / (10 / 2) = 20.
        let data = DMatrix::from_row_slice(4, 1, &[1.0, 3.0, 10.0, 14.0]);
        let result = Manova::fit(&data, &labels(&["x", "x", "y", "y"])).unwrap();

        assert_eq!(result.eigenvalues.len(), 1);
        assert!((result.eigenvalues[0] - 10.0).abs() < 1e-9);
        assert_eq!(result.group_means, [vec![2.0], vec![12.0]]);
        assert_eq!(result.overall_mean, [7.0]);

        let wilks = result.statistic(StatisticKind::WilksLambda).unwrap();
        assert!((wilks.value - 1.0 / 11.0).abs() < 1e-12);
        assert!((wilks.df_num - 1.0).abs() < 1e-12);
        assert!((wilks.df_den - 2.0).abs() < 1e-12);
        assert!((wilks.f_value - 20.0).abs() < 1e-9);
        // F(1, 2) survival at 20 is 1 - sqrt(10 / 11).
        let expected_p = 1.0 - (10.0_f64 / 11.0).sqrt();
        assert!((wilks.p_value.unwrap() - expected_p).abs() < 1e-6);

        let pillai = result.statistic(StatisticKind::PillaiTrace).unwrap();
        assert!((pillai.value - 10.0 / 11.0).abs() < 1e-12);
        assert!((pillai.f_value - 20.0).abs() < 1e-9);

        let roy = result.statistic(StatisticKind::RoysGreatestRoot).unwrap();
        assert!((roy.value - 10.0).abs() < 1e-9);
        assert!((roy.f_value - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_on_random_groups() {
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let shifts = [0.0, 0.5, 3.0];
        let data = DMatrix::from_fn(45, 3, |r, c| {
            noise.sample(&mut rng) + if c == 0 { shifts[r / 15] } else { 0.0 }
        });
        let groups = (0..45).map(|r| format!("g{}", r / 15)).collect::<Vec<_>>();
        let result = Manova::fit(&data, &groups).unwrap();

        assert_eq!(result.n_observations, 45);
        assert_eq!(result.n_variables, 3);
        assert_eq!(result.group_sizes, [15, 15, 15]);
        assert_eq!(
            result.statistics.iter().map(|s| s.kind).collect::<Vec<_>>(),
            StatisticKind::ALL
        );
        assert!(result.eigenvalues.windows(2).all(|w| w[0] >= w[1]));

        let wilks = result.statistic(StatisticKind::WilksLambda).unwrap();
        assert!(wilks.value > 0.0 && wilks.value < 1.0);
        let pillai = result.statistic(StatisticKind::PillaiTrace).unwrap();
        assert!(pillai.value > 0.0 && pillai.value < 2.0);
        for s in &result.statistics {
            let p = s.p_value.unwrap();
            assert!(p < 1e-4, "{} p-value {p}", s.kind);
        }
    }

    #[test]
    fn test_identical_groups_have_no_effect() {
        let data = DMatrix::from_row_slice(
            6,
            2,
            &[1.0, 2.0, 2.0, 1.0, 3.0, 3.0, 1.0, 2.0, 2.0, 1.0, 3.0, 3.0],
        );
        let result = Manova::fit(&data, &labels(&["a", "a", "a", "b", "b", "b"])).unwrap();
        let wilks = result.statistic(StatisticKind::WilksLambda).unwrap();
        assert!((wilks.value - 1.0).abs() < 1e-12);
        assert!(wilks.p_value.unwrap() > 0.99);
    }

    #[test]
    fn test_singular_error_matrix() {
        let data = DMatrix::from_row_slice(
            6,
            2,
            &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0, 7.0, 14.0, 8.0, 16.0, 9.0, 18.0],
        );
        assert_eq!(
            Manova::fit(&data, &labels(&["a", "a", "a", "b", "b", "b"])).unwrap_err(),
            AnalysisError::SingularMatrix {
                matrix: "error SSCP"
            }
        );
    }

    #[test]
    fn test_serialized_kind_names() {
        let json = serde_json::to_string(&StatisticKind::HotellingLawleyTrace).unwrap();
        assert_eq!(json, "\"hotelling_lawley_trace\"");
    }
}
