//! Ordinary and generalized Procrustes superimposition
//!
//! Configurations are `k × d` matrices (one landmark per row). Rotations are
//! found with the SVD solution of the orthogonal Procrustes problem: for a
//! centered configuration `X` and target `Y`, `R = U Vᵀ` where
//! `Xᵀ Y = U Σ Vᵀ`, so that `X R` is as close as possible to `Y`.
//!
//! # Examples
//!
//! ```
//! use modan_shape::procrustes::{self, ProcrustesOptions};
//! use nalgebra::DMatrix;
//!
//! let triangle = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 2.0, 0.0, 0.0, 1.0]);
//! // The same triangle rotated by 90 degrees, doubled in size and moved
//! let moved = DMatrix::from_row_slice(3, 2, &[5.0, 5.0, 5.0, 9.0, 3.0, 5.0]);
//!
//! let set = procrustes::generalized(&[triangle, moved], &ProcrustesOptions::default())?;
//! assert!(set.total_squared_residual() < 1e-12);
//! # Ok::<(), modan_shape::ShapeError>(())
//! ```

use nalgebra::{DMatrix, RowDVector};
use serde::{Deserialize, Serialize};

use crate::{ShapeError, SuperimposedSet, SuperimpositionMethod, superimposition};

/// Settings of a Procrustes fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcrustesOptions {
    /// Scale configurations to unit centroid size.
    pub scaling: bool,
    /// Allow improper rotations (reflections) when fitting.
    pub allow_reflection: bool,
    pub max_iterations: usize,
    /// Convergence threshold on the change of the mean shape (Frobenius norm).
    pub tolerance: f64,
}

impl Default for ProcrustesOptions {
    fn default() -> Self {
        Self {
            scaling: true,
            allow_reflection: false,
            max_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

/// Similarity transform fitted by [`align_to`].
///
/// The aligned configuration is `scale · X · rotation + translation`, with the
/// translation added to every row.
#[derive(Debug, Clone, PartialEq)]
pub struct OrdinaryFit {
    pub aligned: DMatrix<f64>,
    pub rotation: DMatrix<f64>,
    pub scale: f64,
    pub translation: RowDVector<f64>,
}

impl OrdinaryFit {
    /// Applies the fitted transform to another configuration of the same dimension.
    #[must_use]
    pub fn apply(&self, config: &DMatrix<f64>) -> DMatrix<f64> {
        let mut out = config * &self.rotation * self.scale;
        for mut row in out.row_iter_mut() {
            row += &self.translation;
        }
        out
    }
}

/// Fits `config` onto `reference` with a single ordinary Procrustes fit.
///
/// The configuration is translated onto the reference centroid, rotated, and
/// (when `options.scaling`) scaled to minimize the squared distance to the
/// reference.
pub fn align_to(
    config: &DMatrix<f64>,
    reference: &DMatrix<f64>,
    options: &ProcrustesOptions,
) -> Result<OrdinaryFit, ShapeError> {
    check_shape(config, reference.nrows(), reference.ncols(), 0)?;

    let config_centroid = centroid(config);
    let reference_centroid = centroid(reference);
    let x = center(config);
    let y = center(reference);
    let norm_squared = x.norm_squared();
    if norm_squared <= f64::EPSILON {
        return Err(ShapeError::DegenerateConfiguration { index: 0 });
    }

    let (rotation, trace) = optimal_rotation(&x, &y, options.allow_reflection);
    let scale = if options.scaling {
        trace / norm_squared
    } else {
        1.0
    };
    let translation = reference_centroid - config_centroid * &rotation * scale;

    let mut fit = OrdinaryFit {
        aligned: DMatrix::zeros(0, 0),
        rotation,
        scale,
        translation,
    };
    fit.aligned = fit.apply(config);
    Ok(fit)
}

/// Generalized Procrustes analysis.
///
/// Every configuration is centered, scaled to unit centroid size when
/// `options.scaling`, then rotated repeatedly onto the running mean until the
/// mean changes by less than `options.tolerance`.
pub fn generalized(
    configs: &[DMatrix<f64>],
    options: &ProcrustesOptions,
) -> Result<SuperimposedSet, ShapeError> {
    let dimension = superimposition::validate(configs, 2, "Procrustes superimposition")?;
    let centroid_sizes = configs.iter().map(centroid_size).collect::<Vec<_>>();

    let mut aligned = configs
        .iter()
        .zip(&centroid_sizes)
        .enumerate()
        .map(|(index, (config, &size))| {
            if size <= f64::EPSILON {
                return Err(ShapeError::DegenerateConfiguration { index });
            }
            let centered = center(config);
            Ok(if options.scaling {
                centered / size
            } else {
                centered
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut mean = aligned[0].clone();
    let mut iterations = 0;
    while iterations < options.max_iterations {
        iterations += 1;
        for config in &mut aligned {
            let (rotation, _) = optimal_rotation(config, &mean, options.allow_reflection);
            *config = &*config * rotation;
        }

        let mut new_mean = mean_shape(&aligned);
        if options.scaling {
            let size = new_mean.norm();
            if size > f64::EPSILON {
                new_mean /= size;
            }
        }
        let change = (&new_mean - &mean).norm();
        mean = new_mean;
        log::debug!("GPA iteration {iterations}: mean shape change {change:e}");
        if change < options.tolerance {
            break;
        }
    }
    log::debug!("GPA finished after {iterations} iterations");

    Ok(SuperimposedSet::new(
        SuperimpositionMethod::Procrustes(*options),
        dimension,
        mean,
        aligned,
        centroid_sizes,
        iterations,
    ))
}

/// Best rotation of centered `x` onto centered `y`, with the trace of `Rᵀ Xᵀ Y`.
///
/// Without reflections, the singular vector of the smallest singular value is
/// flipped when the unconstrained solution has a negative determinant.
pub(crate) fn optimal_rotation(
    x: &DMatrix<f64>,
    y: &DMatrix<f64>,
    allow_reflection: bool,
) -> (DMatrix<f64>, f64) {
    let dim = x.ncols();
    let svd = (x.transpose() * y).svd(true, true);
    let (Some(mut u), Some(v_t)) = (svd.u, svd.v_t) else {
        return (DMatrix::identity(dim, dim), 0.0);
    };
    let mut singular_values = svd.singular_values;

    let mut rotation = &u * &v_t;
    if !allow_reflection && rotation.determinant() < 0.0 {
        let last = smallest_index(singular_values.as_slice());
        u.column_mut(last).neg_mut();
        singular_values[last] = -singular_values[last];
        rotation = &u * &v_t;
    }
    (rotation, singular_values.sum())
}

fn smallest_index(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(0, |(i, _)| i)
}

pub(crate) fn centroid(config: &DMatrix<f64>) -> RowDVector<f64> {
    config.row_mean()
}

pub(crate) fn center(config: &DMatrix<f64>) -> DMatrix<f64> {
    let c = centroid(config);
    let mut out = config.clone();
    for mut row in out.row_iter_mut() {
        row -= &c;
    }
    out
}

/// Square root of the summed squared distances of the landmarks from their centroid.
#[must_use]
pub fn centroid_size(config: &DMatrix<f64>) -> f64 {
    center(config).norm()
}

#[expect(clippy::cast_precision_loss)]
pub(crate) fn mean_shape(configs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let mut sum = DMatrix::zeros(configs[0].nrows(), configs[0].ncols());
    for config in configs {
        sum += config;
    }
    sum / configs.len() as f64
}

pub(crate) fn check_shape(
    config: &DMatrix<f64>,
    landmarks: usize,
    dimension: usize,
    index: usize,
) -> Result<(), ShapeError> {
    if config.ncols() != dimension {
        return Err(ShapeError::DimensionMismatch {
            index,
            expected: dimension,
            found: config.ncols(),
        });
    }
    if config.nrows() != landmarks {
        return Err(ShapeError::LandmarkCountMismatch {
            index,
            expected: landmarks,
            found: config.nrows(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{Rng as _, SeedableRng as _};
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn rotation_2d(angle: f64) -> DMatrix<f64> {
        let (s, c) = angle.sin_cos();
        // Row-vector convention: p' = p R
        DMatrix::from_row_slice(2, 2, &[c, s, -s, c])
    }

    fn base_shape() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            5,
            2,
            &[0.0, 0.0, 4.0, 0.5, 5.0, 3.0, 2.0, 5.0, -1.0, 2.5],
        )
    }

    fn noisy_copies(n: usize, sigma: f64, seed: u64) -> Vec<DMatrix<f64>> {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let noise = Normal::new(0.0, sigma).unwrap();
        let base = base_shape();
        (0..n)
            .map(|_| {
                let angle = rng.random_range(-3.0..3.0);
                let scale = rng.random_range(0.5..3.0);
                let shift = RowDVector::from_row_slice(&[
                    rng.random_range(-10.0..10.0),
                    rng.random_range(-10.0..10.0),
                ]);
                let mut config = &base * rotation_2d(angle) * scale;
                for mut row in config.row_iter_mut() {
                    row += &shift;
                }
                config.map(|v| v + noise.sample(&mut rng))
            })
            .collect()
    }

    #[test]
    fn test_align_to_recovers_similarity_transform() {
        let reference = base_shape();
        let mut config = &reference * rotation_2d(0.7) * 2.5;
        for mut row in config.row_iter_mut() {
            row += RowDVector::from_row_slice(&[3.0, -1.0]);
        }
        let fit = align_to(&config, &reference, &ProcrustesOptions::default()).unwrap();
        assert!((fit.aligned.clone() - &reference).norm() < 1e-10);
        assert!((fit.scale - 0.4).abs() < 1e-10);
        assert!((fit.rotation.determinant() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_align_to_without_scaling_keeps_size() {
        let reference = base_shape();
        let config = &reference * rotation_2d(-1.2) * 3.0;
        let options = ProcrustesOptions {
            scaling: false,
            ..ProcrustesOptions::default()
        };
        let fit = align_to(&config, &reference, &options).unwrap();
        assert_eq!(fit.scale, 1.0);
        assert!((centroid_size(&fit.aligned) - 3.0 * centroid_size(&reference)).abs() < 1e-9);
    }

    #[test]
    fn test_reflection_is_not_used_by_default() {
        let reference = base_shape();
        let mirror = DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 0.0, 1.0]);
        let config = &reference * mirror;

        let proper = align_to(&config, &reference, &ProcrustesOptions::default()).unwrap();
        assert!((proper.rotation.determinant() - 1.0).abs() < 1e-10);
        assert!((proper.aligned - &reference).norm() > 1e-3);

        let options = ProcrustesOptions {
            allow_reflection: true,
            ..ProcrustesOptions::default()
        };
        let improper = align_to(&config, &reference, &options).unwrap();
        assert!((improper.rotation.determinant() + 1.0).abs() < 1e-10);
        assert!((improper.aligned - &reference).norm() < 1e-10);
    }

    #[test]
    fn test_generalized_properties() {
        let configs = noisy_copies(12, 0.05, 7);
        let options = ProcrustesOptions::default();
        let set = generalized(&configs, &options).unwrap();

        assert_eq!(set.aligned.len(), 12);
        assert!(set.iterations >= 1 && set.iterations <= options.max_iterations);
        assert!((set.mean_shape.norm() - 1.0).abs() < 1e-9);
        for config in &set.aligned {
            assert!(centroid(config).norm() < 1e-9);
            assert!((centroid_size(config) - 1.0).abs() < 1e-9);
        }
        for (config, size) in configs.iter().zip(&set.centroid_sizes) {
            assert!((centroid_size(config) - size).abs() < 1e-12);
        }

        // Each aligned configuration is already optimally rotated onto the mean
        for config in &set.aligned {
            let (rotation, _) = optimal_rotation(config, &set.mean_shape, false);
            assert!((rotation - DMatrix::<f64>::identity(2, 2)).norm() < 1e-6);
        }
    }

    #[test]
    fn test_generalized_exact_copies_have_no_residual() {
        let configs = noisy_copies(5, 0.0, 3);
        let set = generalized(&configs, &ProcrustesOptions::default()).unwrap();
        assert!(set.total_squared_residual() < 1e-18);
        assert!(set.procrustes_distances.iter().all(|d| *d < 1e-9));
    }

    #[test]
    fn test_generalized_errors() {
        let one = vec![base_shape()];
        assert_eq!(
            generalized(&one, &ProcrustesOptions::default()).unwrap_err(),
            ShapeError::TooFewSpecimens {
                required: 2,
                found: 1
            }
        );

        let point = DMatrix::from_row_slice(5, 2, &[1.0; 10]);
        assert_eq!(
            generalized(&[base_shape(), point], &ProcrustesOptions::default()).unwrap_err(),
            ShapeError::DegenerateConfiguration { index: 1 }
        );

        let short = DMatrix::from_row_slice(4, 2, &[0.0; 8]);
        assert!(matches!(
            generalized(&[base_shape(), short], &ProcrustesOptions::default()),
            Err(ShapeError::LandmarkCountMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn test_generalized_3d() {
        let a = DMatrix::from_row_slice(
            4,
            3,
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0],
        );
        // Rotation of 90 degrees about the z axis
        let rz = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let b = &a * rz * 2.0;
        let set = generalized(&[a, b], &ProcrustesOptions::default()).unwrap();
        assert!(set.total_squared_residual() < 1e-18);
    }
}
