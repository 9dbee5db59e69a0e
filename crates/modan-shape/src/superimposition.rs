use std::fmt;

use modan_formats::Dimension;
use nalgebra::DMatrix;

use crate::{
    Dataset, LandmarkConfiguration, ShapeError, bookstein, landmark::flatten_matrix, missing,
    procrustes::{self, ProcrustesOptions},
    resistant_fit,
};

/// How configurations are brought into a common coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::IsVariant)]
pub enum SuperimpositionMethod {
    Procrustes(ProcrustesOptions),
    /// Two-point registration on a baseline of 0-based landmark indices.
    Bookstein { baseline: (usize, usize) },
    /// Siegel-Benson repeated-median fit.
    ResistantFit,
}

impl SuperimpositionMethod {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SuperimpositionMethod::Procrustes(_) => "procrustes",
            SuperimpositionMethod::Bookstein { .. } => "bookstein",
            SuperimpositionMethod::ResistantFit => "resistant_fit",
        }
    }
}

impl Default for SuperimpositionMethod {
    fn default() -> Self {
        SuperimpositionMethod::Procrustes(ProcrustesOptions::default())
    }
}

impl fmt::Display for SuperimpositionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuperimpositionMethod::Bookstein { baseline: (a, b) } => {
                write!(f, "bookstein({}, {})", a + 1, b + 1)
            }
            _ => f.write_str(self.name()),
        }
    }
}

/// Configurations aligned to a common mean shape.
#[derive(Debug, Clone, PartialEq)]
pub struct SuperimposedSet {
    pub method: SuperimpositionMethod,
    pub dimension: Dimension,
    /// `k × d` consensus configuration.
    pub mean_shape: DMatrix<f64>,
    /// Aligned `k × d` configurations, in specimen order.
    pub aligned: Vec<DMatrix<f64>>,
    /// Centroid sizes of the configurations before alignment.
    pub centroid_sizes: Vec<f64>,
    pub iterations: usize,
    /// Frobenius distance of each aligned configuration to the mean shape.
    pub procrustes_distances: Vec<f64>,
}

impl SuperimposedSet {
    pub(crate) fn new(
        method: SuperimpositionMethod,
        dimension: Dimension,
        mean_shape: DMatrix<f64>,
        aligned: Vec<DMatrix<f64>>,
        centroid_sizes: Vec<f64>,
        iterations: usize,
    ) -> Self {
        let procrustes_distances = aligned.iter().map(|a| (a - &mean_shape).norm()).collect();
        Self {
            method,
            dimension,
            mean_shape,
            aligned,
            centroid_sizes,
            iterations,
            procrustes_distances,
        }
    }

    /// Aligned configuration minus the mean shape, per specimen.
    #[must_use]
    pub fn residuals(&self) -> Vec<DMatrix<f64>> {
        self.aligned.iter().map(|a| a - &self.mean_shape).collect()
    }

    #[must_use]
    pub fn total_squared_residual(&self) -> f64 {
        self.aligned
            .iter()
            .map(|a| (a - &self.mean_shape).norm_squared())
            .sum()
    }

    /// Aligned coordinates as an `n × (k·d)` matrix, one specimen per row.
    #[must_use]
    pub fn data_matrix(&self) -> DMatrix<f64> {
        let cols = self.mean_shape.len();
        let values = self.aligned.iter().flat_map(flatten_matrix).collect::<Vec<_>>();
        DMatrix::from_row_slice(self.aligned.len(), cols, &values)
    }

    /// Aligned configurations as a dataset sharing the metadata of `source`.
    pub fn to_dataset(&self, source: &Dataset) -> Result<Dataset, ShapeError> {
        let configurations = self
            .aligned
            .iter()
            .map(LandmarkConfiguration::from_matrix)
            .collect::<Result<Vec<_>, _>>()?;
        source.with_configurations(configurations)
    }
}

/// Superimposes every specimen of a dataset.
///
/// Missing landmarks are estimated first (see [`missing::estimate_missing`]).
pub fn superimpose(
    dataset: &Dataset,
    method: &SuperimpositionMethod,
) -> Result<SuperimposedSet, ShapeError> {
    log::info!(
        "superimposing {} specimens of {:?} ({method})",
        dataset.len(),
        dataset.name()
    );
    let estimated;
    let dataset = if dataset.is_complete() {
        dataset
    } else {
        let options = match method {
            SuperimpositionMethod::Procrustes(options) => *options,
            _ => ProcrustesOptions::default(),
        };
        estimated = missing::estimate_missing(dataset, &options)?;
        &estimated
    };

    let configs = dataset.matrices()?;
    let set = match method {
        SuperimpositionMethod::Procrustes(options) => procrustes::generalized(&configs, options)?,
        SuperimpositionMethod::Bookstein { baseline } => bookstein::register(&configs, *baseline)?,
        SuperimpositionMethod::ResistantFit => resistant_fit::fit(&configs)?,
    };
    log::info!(
        "superimposition done: {} iterations, total squared residual {:.6e}",
        set.iterations,
        set.total_squared_residual()
    );
    Ok(set)
}

/// Checks that `configs` share one shape and have enough specimens and landmarks.
pub(crate) fn validate(
    configs: &[DMatrix<f64>],
    min_landmarks: usize,
    method: &'static str,
) -> Result<Dimension, ShapeError> {
    if configs.len() < 2 {
        return Err(ShapeError::TooFewSpecimens {
            required: 2,
            found: configs.len(),
        });
    }
    let (landmarks, dim) = configs[0].shape();
    for (index, config) in configs.iter().enumerate() {
        procrustes::check_shape(config, landmarks, dim, index)?;
    }
    if landmarks < min_landmarks {
        return Err(ShapeError::TooFewLandmarks {
            required: min_landmarks,
            found: landmarks,
        });
    }
    Dimension::try_from(dim).map_err(|_| ShapeError::UnsupportedDimension {
        method,
        dimension: dim,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Specimen;

    fn dataset(points: &[&[[f64; 2]]]) -> Dataset {
        let specimens = points
            .iter()
            .enumerate()
            .map(|(i, pts)| {
                let config = LandmarkConfiguration::new(
                    Dimension::Two,
                    pts.iter().map(|p| Some([p[0], p[1], 0.0])).collect(),
                );
                Specimen::new(format!("s{i}"), config)
            })
            .collect();
        Dataset::new("test", Dimension::Two, specimens).unwrap()
    }

    #[test]
    fn test_data_matrix_and_residuals() {
        let ds = dataset(&[
            &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            &[[0.0, 0.0], [2.0, 0.0], [0.0, 2.1]],
            &[[1.0, 1.0], [2.0, 1.0], [1.0, 1.9]],
        ]);
        let set = superimpose(&ds, &SuperimpositionMethod::default()).unwrap();
        let data = set.data_matrix();
        assert_eq!(data.shape(), (3, 6));
        assert_eq!(data[(1, 3)], set.aligned[1][(1, 1)]);

        let residual_sum = set.residuals().iter().map(|r| r.norm_squared()).sum::<f64>();
        assert!((residual_sum - set.total_squared_residual()).abs() < 1e-15);
        assert_eq!(set.procrustes_distances.len(), 3);
    }

    #[test]
    fn test_to_dataset_keeps_names() {
        let ds = dataset(&[
            &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            &[[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]],
        ]);
        let set = superimpose(&ds, &SuperimpositionMethod::default()).unwrap();
        let aligned = set.to_dataset(&ds).unwrap();
        assert_eq!(aligned.specimens()[1].name, "s1");
        assert!((aligned.specimens()[1].configuration.centroid_size() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_method_display() {
        assert_eq!(SuperimpositionMethod::default().to_string(), "procrustes");
        assert_eq!(
            SuperimpositionMethod::Bookstein { baseline: (0, 3) }.to_string(),
            "bookstein(1, 4)"
        );
        assert_eq!(SuperimpositionMethod::ResistantFit.name(), "resistant_fit");
    }
}
