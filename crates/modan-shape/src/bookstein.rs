//! Bookstein two-point registration (2D only).
//!
//! Each configuration is translated so that the midpoint of the baseline is
//! at the origin, rotated so that the baseline points along the positive x
//! axis, and scaled so that the baseline has unit length. The baseline
//! landmarks therefore end up at `(-0.5, 0)` and `(0.5, 0)`.

use modan_formats::Dimension;
use nalgebra::DMatrix;

use crate::{ShapeError, SuperimposedSet, SuperimpositionMethod, procrustes, superimposition};

/// Registers every configuration on the baseline `(first, second)` (0-based).
pub fn register(
    configs: &[DMatrix<f64>],
    baseline: (usize, usize),
) -> Result<SuperimposedSet, ShapeError> {
    let dimension = superimposition::validate(configs, 2, "Bookstein registration")?;
    if dimension != Dimension::Two {
        return Err(ShapeError::UnsupportedDimension {
            method: "Bookstein registration",
            dimension: dimension.as_usize(),
        });
    }

    let (first, second) = baseline;
    let landmarks = configs[0].nrows();
    if first == second || first >= landmarks || second >= landmarks {
        return Err(ShapeError::InvalidBaseline {
            first,
            second,
            landmarks,
        });
    }

    let aligned = configs
        .iter()
        .enumerate()
        .map(|(index, config)| {
            let (ax, ay) = (config[(first, 0)], config[(first, 1)]);
            let (bx, by) = (config[(second, 0)], config[(second, 1)]);
            let (dx, dy) = (bx - ax, by - ay);
            let length = dx.hypot(dy);
            if length <= f64::EPSILON {
                return Err(ShapeError::DegenerateConfiguration { index });
            }
            let (mx, my) = (f64::midpoint(ax, bx), f64::midpoint(ay, by));
            let (cos, sin) = (dx / length, dy / length);
            Ok(DMatrix::from_fn(config.nrows(), 2, |r, c| {
                let (x, y) = (config[(r, 0)] - mx, config[(r, 1)] - my);
                let value = if c == 0 {
                    x * cos + y * sin
                } else {
                    -x * sin + y * cos
                };
                value / length
            }))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mean_shape = procrustes::mean_shape(&aligned);
    let centroid_sizes = configs.iter().map(procrustes::centroid_size).collect();
    Ok(SuperimposedSet::new(
        SuperimpositionMethod::Bookstein { baseline },
        dimension,
        mean_shape,
        aligned,
        centroid_sizes,
        1,
    ))
}
