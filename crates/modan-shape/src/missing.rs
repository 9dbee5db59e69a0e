//! Estimation of missing landmarks from the mean shape of complete specimens.
//!
//! The complete specimens are superimposed with generalized Procrustes
//! analysis. For each incomplete specimen, the mean shape is fitted onto the
//! landmarks that are present (translation, rotation and scale), and the
//! missing landmarks are taken from the fitted mean.
//!
//! The mean shape follows the caller's Procrustes options. The fit onto each
//! incomplete specimen always scales, so the estimate matches that specimen's size.

use nalgebra::DMatrix;

use crate::{
    Dataset, ShapeError,
    procrustes::{self, ProcrustesOptions},
};

/// Returns a copy of `dataset` in which every missing landmark is estimated.
///
/// Requires at least two complete specimens, and at least two present
/// landmarks in every incomplete specimen.
pub fn estimate_missing(
    dataset: &Dataset,
    options: &ProcrustesOptions,
) -> Result<Dataset, ShapeError> {
    let total_missing = dataset.missing_landmark_count();
    if total_missing == 0 {
        return Ok(dataset.clone());
    }

    let complete = dataset
        .specimens()
        .iter()
        .filter(|s| s.configuration.is_complete())
        .map(|s| s.configuration.to_matrix())
        .collect::<Result<Vec<_>, _>>()?;
    if complete.len() < 2 {
        return Err(ShapeError::MissingLandmarks {
            count: total_missing,
        });
    }
    let mean = procrustes::generalized(&complete, options)?.mean_shape;
    let fit_options = ProcrustesOptions {
        scaling: true,
        ..*options
    };

    let configurations = dataset
        .specimens()
        .iter()
        .map(|specimen| {
            let config = &specimen.configuration;
            let missing = config.missing_indices();
            if missing.is_empty() {
                return Ok(config.clone());
            }
            let present = (0..config.len())
                .filter(|i| !missing.contains(i))
                .collect::<Vec<_>>();
            if present.len() < 2 {
                return Err(ShapeError::MissingLandmarks {
                    count: missing.len(),
                });
            }

            let dim = mean.ncols();
            let target = DMatrix::from_fn(present.len(), dim, |r, c| {
                config.points()[present[r]].map_or(0.0, |p| p[c])
            });
            let source = mean.select_rows(&present);
            let fit = procrustes::align_to(&source, &target, &fit_options)?;
            log::warn!(
                "estimating {} missing landmarks of {:?}",
                missing.len(),
                specimen.name
            );
            Ok(config.filled_from(&fit.apply(&mean)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    dataset.with_configurations(configurations)
}
