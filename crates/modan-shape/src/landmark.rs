use modan_formats::{Dimension, RawLandmark};
use nalgebra::DMatrix;

use crate::ShapeError;

/// One landmark position; `z` is 0 for 2D data.
pub type Point = [f64; 3];

/// Ordered landmarks of one specimen, possibly with missing entries.
///
/// # Examples
///
/// ```
/// use modan_shape::{Dimension, LandmarkConfiguration};
///
/// let config = LandmarkConfiguration::new(
///     Dimension::Two,
///     vec![Some([0.0, 0.0, 0.0]), Some([2.0, 0.0, 0.0]), None],
/// );
/// assert_eq!(config.missing_indices(), [2]);
/// assert_eq!(config.centroid(), Some([1.0, 0.0, 0.0]));
/// assert!((config.centroid_size() - 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkConfiguration {
    dimension: Dimension,
    points: Vec<Option<Point>>,
}

impl LandmarkConfiguration {
    /// Creates a configuration; coordinates beyond `dimension` are zeroed.
    #[must_use]
    pub fn new(dimension: Dimension, mut points: Vec<Option<Point>>) -> Self {
        if dimension == Dimension::Two {
            for point in points.iter_mut().flatten() {
                point[2] = 0.0;
            }
        }
        Self { dimension, points }
    }

    /// Builds a configuration from imported coordinates.
    ///
    /// A landmark with any missing coordinate is treated as missing.
    #[must_use]
    pub fn from_raw(dimension: Dimension, landmarks: &[RawLandmark]) -> Self {
        let points = landmarks
            .iter()
            .map(|coords| {
                let mut point = [0.0; 3];
                for (slot, coord) in point.iter_mut().zip(coords.iter().take(dimension.as_usize())) {
                    *slot = (*coord)?;
                }
                Some(point)
            })
            .collect();
        Self::new(dimension, points)
    }

    /// Builds a complete configuration from a `k × d` matrix.
    pub fn from_matrix(matrix: &DMatrix<f64>) -> Result<Self, ShapeError> {
        let dimension =
            Dimension::try_from(matrix.ncols()).map_err(|_| ShapeError::UnsupportedDimension {
                method: "landmark configuration",
                dimension: matrix.ncols(),
            })?;
        let points = matrix
            .row_iter()
            .map(|row| {
                let mut point = [0.0; 3];
                for (slot, value) in point.iter_mut().zip(row.iter()) {
                    *slot = *value;
                }
                Some(point)
            })
            .collect();
        Ok(Self::new(dimension, points))
    }

    /// Returns the landmarks as a `k × d` matrix.
    ///
    /// Fails with [`ShapeError::MissingLandmarks`] when any landmark is missing.
    pub fn to_matrix(&self) -> Result<DMatrix<f64>, ShapeError> {
        let dim = self.dimension.as_usize();
        let missing = self.missing_indices().len();
        if missing > 0 {
            return Err(ShapeError::MissingLandmarks { count: missing });
        }
        Ok(DMatrix::from_fn(self.points.len(), dim, |r, c| {
            self.points[r].map_or(0.0, |p| p[c])
        }))
    }

    #[must_use]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn points(&self) -> &[Option<Point>] {
        &self.points
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.points.iter().all(Option::is_some)
    }

    #[must_use]
    pub fn missing_indices(&self) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.is_none().then_some(i))
            .collect()
    }

    /// Mean position of the present landmarks, `None` when all are missing.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn centroid(&self) -> Option<Point> {
        let mut sum = [0.0; 3];
        let mut count = 0_usize;
        for point in self.points.iter().flatten() {
            for (s, v) in sum.iter_mut().zip(point) {
                *s += v;
            }
            count += 1;
        }
        (count > 0).then(|| sum.map(|s| s / count as f64))
    }

    /// Square root of the summed squared distances from the centroid.
    #[must_use]
    pub fn centroid_size(&self) -> f64 {
        let Some(centroid) = self.centroid() else {
            return 0.0;
        };
        self.points
            .iter()
            .flatten()
            .map(|p| {
                p.iter()
                    .zip(&centroid)
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
            })
            .sum::<f64>()
            .sqrt()
    }

    /// Coordinates in landmark order: `x1, y1, [z1], x2, ...`.
    #[must_use]
    pub fn flatten(&self) -> Vec<Option<f64>> {
        let dim = self.dimension.as_usize();
        self.points
            .iter()
            .flat_map(|p| (0..dim).map(move |c| p.map(|p| p[c])))
            .collect()
    }

    /// Coordinates as imported-file landmarks.
    #[must_use]
    pub fn to_raw(&self) -> Vec<RawLandmark> {
        let dim = self.dimension.as_usize();
        self.points
            .iter()
            .map(|p| (0..dim).map(|c| p.map(|p| p[c])).collect())
            .collect()
    }

    /// Returns a copy with the missing landmarks taken from `fill` (a `k × d` matrix).
    pub(crate) fn filled_from(&self, fill: &DMatrix<f64>) -> Self {
        let points = self
            .points
            .iter()
            .enumerate()
            .map(|(r, p)| {
                p.or_else(|| {
                    let mut point = [0.0; 3];
                    for (c, slot) in point.iter_mut().enumerate().take(fill.ncols()) {
                        *slot = fill[(r, c)];
                    }
                    Some(point)
                })
            })
            .collect();
        Self::new(self.dimension, points)
    }
}

/// Flattens a `k × d` matrix row by row into `x1, y1, [z1], x2, ...`.
pub(crate) fn flatten_matrix(matrix: &DMatrix<f64>) -> impl Iterator<Item = f64> + '_ {
    (0..matrix.nrows()).flat_map(move |r| (0..matrix.ncols()).map(move |c| matrix[(r, c)]))
}
