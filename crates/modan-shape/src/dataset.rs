use modan_formats::{Dimension, FileFormat, ImportedDataset, ImportedObject};
use nalgebra::DMatrix;

use crate::{LandmarkConfiguration, ShapeError};

/// Group label used when a specimen has no value for a variable.
pub const UNKNOWN_GROUP: &str = "Unknown";

/// One digitized specimen.
#[derive(Debug, Clone, PartialEq)]
pub struct Specimen {
    pub name: String,
    pub configuration: LandmarkConfiguration,
    /// Values of the dataset's variables, in `variable_names` order.
    pub variables: Vec<String>,
    pub comment: Option<String>,
    pub image_path: Option<String>,
    pub pixels_per_mm: Option<f64>,
}

impl Specimen {
    #[must_use]
    pub fn new(name: impl Into<String>, configuration: LandmarkConfiguration) -> Self {
        Self {
            name: name.into(),
            configuration,
            variables: vec![],
            comment: None,
            image_path: None,
            pixels_per_mm: None,
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = variables;
        self
    }
}

/// A set of specimens sharing dimension and landmark count.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    name: String,
    dimension: Dimension,
    variable_names: Vec<String>,
    specimens: Vec<Specimen>,
    edges: Vec<[usize; 2]>,
    polygons: Vec<Vec<usize>>,
}

impl Dataset {
    /// Creates a dataset, checking that every specimen matches the first one.
    pub fn new(
        name: impl Into<String>,
        dimension: Dimension,
        specimens: Vec<Specimen>,
    ) -> Result<Self, ShapeError> {
        let first = specimens.first().ok_or(ShapeError::EmptyDataset)?;
        let landmarks = first.configuration.len();
        for (index, specimen) in specimens.iter().enumerate() {
            let config = &specimen.configuration;
            if config.dimension() != dimension {
                return Err(ShapeError::DimensionMismatch {
                    index,
                    expected: dimension.as_usize(),
                    found: config.dimension().as_usize(),
                });
            }
            if config.len() != landmarks {
                return Err(ShapeError::LandmarkCountMismatch {
                    index,
                    expected: landmarks,
                    found: config.len(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            dimension,
            variable_names: vec![],
            specimens,
            edges: vec![],
            polygons: vec![],
        })
    }

    /// Builds a dataset from the content of an imported file.
    ///
    /// # Examples
    ///
    /// ```
    /// use modan_formats::{FileFormat, ImportOptions};
    /// use modan_shape::Dataset;
    ///
    /// let text = "LM=2\n0 0\n1 0\nID=a\nLM=2\n0 0\n2 0\nID=b\n";
    /// let imported = modan_formats::parse(FileFormat::Tps, text, &ImportOptions::named("d"))?;
    /// let dataset = Dataset::from_imported(imported)?;
    /// assert_eq!(dataset.len(), 2);
    /// assert_eq!(dataset.landmark_count(), 2);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_imported(imported: ImportedDataset) -> Result<Self, ShapeError> {
        let dimension = imported.dimension;
        let specimens = imported
            .objects
            .into_iter()
            .map(|obj| Specimen {
                configuration: LandmarkConfiguration::from_raw(dimension, &obj.landmarks),
                name: obj.name,
                variables: obj.variables,
                comment: obj.comment,
                image_path: obj.image_path,
                pixels_per_mm: obj.pixels_per_mm,
            })
            .collect();
        let mut dataset = Self::new(imported.name, dimension, specimens)?;
        dataset.variable_names = imported.variable_names;
        dataset.edges = imported.edges;
        dataset.polygons = imported.polygons;
        Ok(dataset)
    }

    /// Converts back to the format-neutral representation for export.
    #[must_use]
    pub fn to_imported(&self, format: FileFormat) -> ImportedDataset {
        ImportedDataset {
            name: self.name.clone(),
            format,
            dimension: self.dimension,
            objects: self
                .specimens
                .iter()
                .map(|s| ImportedObject {
                    name: s.name.clone(),
                    landmarks: s.configuration.to_raw(),
                    comment: s.comment.clone(),
                    image_path: s.image_path.clone(),
                    pixels_per_mm: s.pixels_per_mm,
                    variables: s.variables.clone(),
                })
                .collect(),
            variable_names: self.variable_names.clone(),
            edges: self.edges.clone(),
            polygons: self.polygons.clone(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_variable_names(mut self, names: Vec<String>) -> Self {
        self.variable_names = names;
        self
    }

    /// Returns a copy with the configurations replaced, in specimen order.
    pub fn with_configurations(
        &self,
        configurations: Vec<LandmarkConfiguration>,
    ) -> Result<Self, ShapeError> {
        if configurations.len() != self.specimens.len() {
            return Err(ShapeError::TooFewSpecimens {
                required: self.specimens.len(),
                found: configurations.len(),
            });
        }
        let specimens = self
            .specimens
            .iter()
            .zip(configurations)
            .map(|(s, configuration)| Specimen {
                configuration,
                ..s.clone()
            })
            .collect();
        let mut dataset = Self::new(self.name.clone(), self.dimension, specimens)?;
        dataset.variable_names.clone_from(&self.variable_names);
        dataset.edges.clone_from(&self.edges);
        dataset.polygons.clone_from(&self.polygons);
        Ok(dataset)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    #[must_use]
    pub fn specimens(&self) -> &[Specimen] {
        &self.specimens
    }

    #[must_use]
    pub fn variable_names(&self) -> &[String] {
        &self.variable_names
    }

    /// Wireframe edges as 0-based landmark index pairs.
    #[must_use]
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    #[must_use]
    pub fn polygons(&self) -> &[Vec<usize>] {
        &self.polygons
    }

    /// Number of specimens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specimens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specimens.is_empty()
    }

    #[must_use]
    pub fn landmark_count(&self) -> usize {
        self.specimens.first().map_or(0, |s| s.configuration.len())
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.specimens.iter().all(|s| s.configuration.is_complete())
    }

    #[must_use]
    pub fn missing_landmark_count(&self) -> usize {
        self.specimens
            .iter()
            .map(|s| s.configuration.missing_indices().len())
            .sum()
    }

    #[must_use]
    pub fn centroid_sizes(&self) -> Vec<f64> {
        self.specimens
            .iter()
            .map(|s| s.configuration.centroid_size())
            .collect()
    }

    /// Resolves a variable given by name or by 1-based index.
    ///
    /// Names take precedence over indices.
    ///
    /// ```
    /// # use modan_shape::{Dataset, Dimension, LandmarkConfiguration, Specimen};
    /// # let config = LandmarkConfiguration::new(Dimension::Two, vec![Some([0.0; 3])]);
    /// let dataset = Dataset::new("d", Dimension::Two, vec![Specimen::new("a", config)])?
    ///     .with_variable_names(vec!["sex".into(), "site".into()]);
    /// assert_eq!(dataset.variable_index("site")?, 1);
    /// assert_eq!(dataset.variable_index("1")?, 0);
    /// assert!(dataset.variable_index("3").is_err());
    /// # Ok::<(), modan_shape::ShapeError>(())
    /// ```
    pub fn variable_index(&self, name_or_index: &str) -> Result<usize, ShapeError> {
        if let Some(index) = self.variable_names.iter().position(|n| n == name_or_index) {
            return Ok(index);
        }
        name_or_index
            .parse::<usize>()
            .ok()
            .filter(|i| (1..=self.variable_names.len()).contains(i))
            .map(|i| i - 1)
            .ok_or_else(|| ShapeError::UnknownVariable {
                name: name_or_index.to_owned(),
            })
    }

    /// Value of the given variable for every specimen.
    ///
    /// Specimens without a value get [`UNKNOWN_GROUP`].
    #[must_use]
    pub fn group_labels(&self, index: usize) -> Vec<String> {
        self.specimens
            .iter()
            .map(|s| {
                s.variables
                    .get(index)
                    .filter(|v| !v.is_empty())
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_GROUP.to_owned())
            })
            .collect()
    }

    /// Raw coordinates as an `n × (k·d)` matrix, one specimen per row.
    pub fn data_matrix(&self) -> Result<DMatrix<f64>, ShapeError> {
        let rows = self
            .specimens
            .iter()
            .map(|s| {
                let flat = s.configuration.flatten();
                flat.iter()
                    .copied()
                    .collect::<Option<Vec<_>>>()
                    .ok_or(ShapeError::MissingLandmarks {
                        count: s.configuration.missing_indices().len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let cols = self.landmark_count() * self.dimension.as_usize();
        Ok(DMatrix::from_fn(rows.len(), cols, |r, c| rows[r][c]))
    }

    /// Complete configurations as `k × d` matrices.
    pub fn matrices(&self) -> Result<Vec<DMatrix<f64>>, ShapeError> {
        self.specimens
            .iter()
            .map(|s| s.configuration.to_matrix())
            .collect()
    }
}
