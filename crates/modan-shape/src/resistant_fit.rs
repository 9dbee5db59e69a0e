//! Resistant-fit superimposition (Siegel-Benson repeated medians, 2D only).
//!
//! Instead of least squares, scale and rotation are estimated with repeated
//! medians over all landmark pairs, which keeps a few badly placed landmarks
//! from dragging the whole fit. For a configuration `X` fitted onto `Y`:
//!
//! - scale: `med_i med_{j≠i} |Yi - Yj| / |Xi - Xj|`
//! - angle: `med_i med_{j≠i} (arg(Yi - Yj) - arg(Xi - Xj))`
//! - translation: coordinate-wise `med_i (Yi - s R Xi)`
//!
//! The reference starts as the first configuration and is replaced by the
//! coordinate-wise median of the fitted shapes until it stops changing.

use std::f64::consts::{PI, TAU};

use modan_formats::Dimension;
use modan_stats::descriptive::median;
use nalgebra::DMatrix;

use crate::{ShapeError, SuperimposedSet, SuperimpositionMethod, procrustes, superimposition};

const MAX_ITERATIONS: usize = 100;
const TOLERANCE: f64 = 1e-10;

/// Fits every configuration onto a common median reference.
pub fn fit(configs: &[DMatrix<f64>]) -> Result<SuperimposedSet, ShapeError> {
    let dimension = superimposition::validate(configs, 3, "resistant fit")?;
    if dimension != Dimension::Two {
        return Err(ShapeError::UnsupportedDimension {
            method: "resistant fit",
            dimension: dimension.as_usize(),
        });
    }

    let centroid_sizes = configs
        .iter()
        .map(procrustes::centroid_size)
        .collect::<Vec<_>>();
    if let Some(index) = centroid_sizes.iter().position(|s| *s <= f64::EPSILON) {
        return Err(ShapeError::DegenerateConfiguration { index });
    }
    let centered = configs.iter().map(procrustes::center).collect::<Vec<_>>();

    let mut reference = normalize(&centered[0]).ok_or(ShapeError::DegenerateConfiguration { index: 0 })?;
    let mut fitted = centered.clone();
    let mut iterations = 0;
    while iterations < MAX_ITERATIONS {
        iterations += 1;
        for (index, (config, out)) in centered.iter().zip(&mut fitted).enumerate() {
            *out = fit_one(config, &reference)
                .ok_or(ShapeError::DegenerateConfiguration { index })?;
        }
        let new_reference = normalize(&median_shape(&fitted))
            .ok_or(ShapeError::DegenerateConfiguration { index: 0 })?;
        let change = (&new_reference - &reference).norm();
        reference = new_reference;
        log::debug!("resistant fit iteration {iterations}: reference change {change:e}");
        if change < TOLERANCE {
            break;
        }
    }

    // Express the fitted shapes in the units of the unit-size reference
    let aligned = fitted
        .iter()
        .map(|config| fit_one(config, &reference).unwrap_or_else(|| config.clone()))
        .collect();
    Ok(SuperimposedSet::new(
        SuperimpositionMethod::ResistantFit,
        dimension,
        reference,
        aligned,
        centroid_sizes,
        iterations,
    ))
}

/// Fits `x` onto `y` with repeated-median scale, rotation and translation.
///
/// Returns `None` when `x` has no pair of distinct landmarks.
fn fit_one(x: &DMatrix<f64>, y: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let k = x.nrows();
    let mut scales = Vec::with_capacity(k);
    let mut angles = Vec::with_capacity(k);
    for i in 0..k {
        let mut pair_scales = Vec::with_capacity(k - 1);
        let mut pair_angles = Vec::with_capacity(k - 1);
        for j in (0..k).filter(|&j| j != i) {
            let (xdx, xdy) = (x[(i, 0)] - x[(j, 0)], x[(i, 1)] - x[(j, 1)]);
            let (ydx, ydy) = (y[(i, 0)] - y[(j, 0)], y[(i, 1)] - y[(j, 1)]);
            let x_len = xdx.hypot(xdy);
            if x_len <= f64::EPSILON {
                continue;
            }
            pair_scales.push(ydx.hypot(ydy) / x_len);
            pair_angles.push(wrap_angle(ydy.atan2(ydx) - xdy.atan2(xdx)));
        }
        scales.extend(median(pair_scales));
        angles.extend(median(pair_angles));
    }
    let scale = median(scales)?;
    let angle = median(angles)?;

    let (sin, cos) = angle.sin_cos();
    let transformed = DMatrix::from_fn(k, 2, |r, c| {
        let (px, py) = (x[(r, 0)], x[(r, 1)]);
        scale
            * if c == 0 {
                px * cos - py * sin
            } else {
                px * sin + py * cos
            }
    });
    let tx = median((0..k).map(|r| y[(r, 0)] - transformed[(r, 0)]))?;
    let ty = median((0..k).map(|r| y[(r, 1)] - transformed[(r, 1)]))?;
    Some(DMatrix::from_fn(k, 2, |r, c| {
        transformed[(r, c)] + if c == 0 { tx } else { ty }
    }))
}

/// Coordinate-wise median of the configurations.
fn median_shape(configs: &[DMatrix<f64>]) -> DMatrix<f64> {
    let (rows, cols) = configs[0].shape();
    DMatrix::from_fn(rows, cols, |r, c| {
        median(configs.iter().map(|m| m[(r, c)])).unwrap_or(0.0)
    })
}

/// Centers and scales to unit centroid size.
fn normalize(config: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let centered = procrustes::center(config);
    let size = centered.norm();
    (size > f64::EPSILON).then(|| centered / size)
}

/// Wraps an angle into `(-π, π]`.
fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    if wrapped > PI { wrapped - TAU } else { wrapped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            6,
            2,
            &[0.0, 0.0, 3.0, 0.2, 4.0, 2.0, 3.0, 4.0, 0.5, 3.5, -1.0, 1.5],
        )
    }

    fn similar(config: &DMatrix<f64>, angle: f64, scale: f64, shift: (f64, f64)) -> DMatrix<f64> {
        let (sin, cos) = angle.sin_cos();
        DMatrix::from_fn(config.nrows(), 2, |r, c| {
            let (x, y) = (config[(r, 0)], config[(r, 1)]);
            if c == 0 {
                scale * (x * cos - y * sin) + shift.0
            } else {
                scale * (x * sin + y * cos) + shift.1
            }
        })
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_angle(-0.25) + 0.25).abs() < 1e-12);
        assert!((wrap_angle(PI) - PI).abs() < 1e-12);
    }

    #[test]
    fn test_fit_one_recovers_similarity() {
        let y = shape();
        let x = similar(&y, 0.6, 2.0, (5.0, -3.0));
        let fitted = fit_one(&x, &y).unwrap();
        assert!((fitted - &y).norm() < 1e-9);
    }

    #[test]
    fn test_similar_shapes_coincide() {
        let base = shape();
        let configs = [
            base.clone(),
            similar(&base, 1.0, 0.5, (2.0, 2.0)),
            similar(&base, -0.4, 3.0, (-7.0, 1.0)),
        ];
        let set = fit(&configs).unwrap();
        assert!((procrustes::centroid_size(&set.mean_shape) - 1.0).abs() < 1e-9);
        assert!(set.total_squared_residual() < 1e-16);
    }

    #[test]
    fn test_outlier_landmark_does_not_move_the_others() {
        let base = shape();
        let mut displaced = similar(&base, 0.3, 1.0, (0.0, 0.0));
        displaced[(5, 0)] += 4.0;
        let configs = [base.clone(), base.clone(), base.clone(), displaced];
        let set = fit(&configs).unwrap();
        let residual = &set.aligned[3] - &set.mean_shape;
        for r in 0..5 {
            assert!(residual.row(r).norm() < 1e-9, "landmark {r}");
        }
        assert!(residual.row(5).norm() > 0.1);
    }

    #[test]
    fn test_requires_three_landmarks() {
        let config = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]);
        assert_eq!(
            fit(&[config.clone(), config]).unwrap_err(),
            ShapeError::TooFewLandmarks {
                required: 3,
                found: 2
            }
        );
    }
}
