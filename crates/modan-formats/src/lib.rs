//! Readers and writers for plain-text landmark file formats
//!
//! This crate parses the landmark formats in common use in geometric
//! morphometrics into a format-neutral [`ImportedDataset`], and writes a
//! [`ImportedDataset`] back out for export.
//!
//! | Format       | Extension | Read | Write |
//! |--------------|-----------|------|-------|
//! | TPS          | `.tps`    | yes  | yes   |
//! | NTS (NTSYS)  | `.nts`    | yes  | no    |
//! | X1Y1         | `.x1y1`   | yes  | yes   |
//! | Morphologika | `.txt`    | yes  | yes   |
//!
//! Missing coordinates may be written as `Missing` or `NA` in any format and
//! are represented as `None`.
//!
//! # Examples
//!
//! ```
//! use modan_formats::{FileFormat, ImportOptions, Dimension};
//!
//! let text = "LM=3\n0 0\n1 0\n0 1\nID=tri\n";
//! let options = ImportOptions::named("demo");
//! let dataset = modan_formats::parse(FileFormat::Tps, text, &options)?;
//! assert_eq!(dataset.dimension, Dimension::Two);
//! assert_eq!(dataset.objects[0].name, "tri");
//! assert_eq!(dataset.objects[0].landmarks.len(), 3);
//! # Ok::<(), modan_formats::ParseError>(())
//! ```

use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

pub use self::error::ParseError;

mod error;
pub mod morphologika;
pub mod nts;
mod token;
pub mod tps;
pub mod x1y1;

/// Coordinates of one landmark; `None` marks a missing coordinate.
pub type RawLandmark = Vec<Option<f64>>;

/// Number of coordinates per landmark.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant,
)]
#[serde(try_from = "usize", into = "usize")]
pub enum Dimension {
    Two,
    Three,
}

impl Dimension {
    #[must_use]
    pub const fn as_usize(self) -> usize {
        match self {
            Dimension::Two => 2,
            Dimension::Three => 3,
        }
    }
}

impl From<Dimension> for usize {
    fn from(dimension: Dimension) -> Self {
        dimension.as_usize()
    }
}

impl TryFrom<usize> for Dimension {
    type Error = ParseError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Dimension::Two),
            3 => Ok(Dimension::Three),
            _ => Err(ParseError::InvalidDimension { value }),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}D", self.as_usize())
    }
}

/// Supported landmark file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Tps,
    Nts,
    X1y1,
    Morphologika,
}

impl FileFormat {
    /// Detects the format from the file extension (case-insensitive).
    ///
    /// `.txt` files are read as Morphologika.
    ///
    /// ```
    /// use modan_formats::FileFormat;
    ///
    /// assert_eq!(FileFormat::from_path("wings.TPS"), Some(FileFormat::Tps));
    /// assert_eq!(FileFormat::from_path("skulls.txt"), Some(FileFormat::Morphologika));
    /// assert_eq!(FileFormat::from_path("notes.md"), None);
    /// ```
    pub fn from_path<P>(path: P) -> Option<Self>
    where
        P: AsRef<Path>,
    {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "tps" => Some(FileFormat::Tps),
            "nts" => Some(FileFormat::Nts),
            "x1y1" => Some(FileFormat::X1y1),
            "txt" => Some(FileFormat::Morphologika),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            FileFormat::Tps => "TPS",
            FileFormat::Nts => "NTS",
            FileFormat::X1y1 => "X1Y1",
            FileFormat::Morphologika => "Morphologika",
        }
    }

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            FileFormat::Tps => "tps",
            FileFormat::Nts => "nts",
            FileFormat::X1y1 => "x1y1",
            FileFormat::Morphologika => "txt",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options applied while reading a landmark file.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Dataset name; also the prefix of generated object names (`<name>_<k>`).
    /// Defaults to the file stem in [`read_path`].
    pub dataset_name: Option<String>,
    /// Negate the y coordinate of 2D data (image coordinates grow downwards).
    pub invert_y: bool,
}

impl ImportOptions {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            dataset_name: Some(name.into()),
            invert_y: false,
        }
    }

    pub(crate) fn name_or_default(&self) -> &str {
        self.dataset_name.as_deref().unwrap_or("dataset")
    }

    pub(crate) fn generated_object_name(&self, index: usize) -> String {
        format!("{}_{}", self.name_or_default(), index + 1)
    }
}

/// One specimen as read from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedObject {
    pub name: String,
    /// Landmarks in file order; each has exactly `dimension` coordinates.
    pub landmarks: Vec<RawLandmark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixels_per_mm: Option<f64>,
    /// Values of the dataset's grouping variables, in `variable_names` order.
    #[serde(default)]
    pub variables: Vec<String>,
}

impl ImportedObject {
    #[must_use]
    pub fn new(name: impl Into<String>, landmarks: Vec<RawLandmark>) -> Self {
        Self {
            name: name.into(),
            landmarks,
            comment: None,
            image_path: None,
            pixels_per_mm: None,
            variables: vec![],
        }
    }

    /// Number of landmarks with at least one missing coordinate.
    #[must_use]
    pub fn missing_landmark_count(&self) -> usize {
        self.landmarks
            .iter()
            .filter(|lm| lm.iter().any(Option::is_none))
            .count()
    }
}

/// Format-neutral content of a landmark file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedDataset {
    pub name: String,
    pub format: FileFormat,
    pub dimension: Dimension,
    pub objects: Vec<ImportedObject>,
    #[serde(default)]
    pub variable_names: Vec<String>,
    /// Wireframe edges as 0-based landmark index pairs, each pair sorted.
    #[serde(default)]
    pub edges: Vec<[usize; 2]>,
    /// Polygons as 0-based landmark indices.
    #[serde(default)]
    pub polygons: Vec<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ImportedDataset {
    pub(crate) fn new(
        name: impl Into<String>,
        format: FileFormat,
        dimension: Dimension,
        objects: Vec<ImportedObject>,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            dimension,
            objects,
            variable_names: vec![],
            edges: vec![],
            polygons: vec![],
            description: None,
        }
    }

    /// Landmark count of the first object, or 0 for an empty dataset.
    #[must_use]
    pub fn landmark_count(&self) -> usize {
        self.objects.first().map_or(0, |obj| obj.landmarks.len())
    }

    pub(crate) fn apply_invert_y(&mut self, invert_y: bool) {
        if !invert_y || self.dimension != Dimension::Two {
            return;
        }
        for landmark in self.objects.iter_mut().flat_map(|obj| &mut obj.landmarks) {
            if let Some(Some(y)) = landmark.get_mut(1) {
                *y = -*y;
            }
        }
    }
}

/// Reads and parses a landmark file, detecting its format from the extension.
pub fn read_path<P>(path: P, options: &ImportOptions) -> Result<ImportedDataset, ParseError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let format = FileFormat::from_path(path).ok_or_else(|| ParseError::UnknownFormat {
        path: path.to_path_buf(),
    })?;
    read_path_as(path, format, options)
}

/// Reads and parses a landmark file in the given format.
pub fn read_path_as<P>(
    path: P,
    format: FileFormat,
    options: &ImportOptions,
) -> Result<ImportedDataset, ParseError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut options = options.clone();
    if options.dataset_name.is_none() {
        options.dataset_name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_owned);
    }

    log::debug!("reading {} file {}", format, path.display());
    let dataset = parse(format, &text, &options)?;
    log::info!(
        "read {} objects ({} landmarks, {}) from {}",
        dataset.objects.len(),
        dataset.landmark_count(),
        dataset.dimension,
        path.display()
    );
    Ok(dataset)
}

/// Parses landmark file content in the given format.
pub fn parse(
    format: FileFormat,
    text: &str,
    options: &ImportOptions,
) -> Result<ImportedDataset, ParseError> {
    let dataset = match format {
        FileFormat::Tps => tps::parse(text, options)?,
        FileFormat::Nts => nts::parse(text, options)?,
        FileFormat::X1y1 => x1y1::parse(text, options)?,
        FileFormat::Morphologika => morphologika::parse(text, options)?,
    };
    if dataset.objects.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(dataset)
}
