//! Landmark data model and superimposition
//!
//! This crate turns imported landmark files into validated [`Dataset`]s and
//! brings their configurations into a common coordinate system.
//!
//! # Modules
//!
//! - [`procrustes`]: Ordinary and generalized Procrustes analysis
//! - [`bookstein`]: Two-point (baseline) registration for 2D data
//! - [`resistant_fit`]: Repeated-median superimposition for 2D data
//! - [`missing`]: Estimation of missing landmarks before superimposition
//!
//! # Examples
//!
//! ```
//! use modan_formats::{FileFormat, ImportOptions};
//! use modan_shape::{Dataset, SuperimpositionMethod};
//!
//! let text = "\
//! LM=3\n0 0\n2 0\n0 1\nID=a\n\
//! LM=3\n1 1\n1 3\n0 1\nID=b\n\
//! LM=3\n0 0\n4 0\n0 2.2\nID=c\n";
//! let imported = modan_formats::parse(FileFormat::Tps, text, &ImportOptions::named("tri"))?;
//! let dataset = Dataset::from_imported(imported)?;
//!
//! let set = modan_shape::superimpose(&dataset, &SuperimpositionMethod::default())?;
//! assert_eq!(set.aligned.len(), 3);
//! assert_eq!(set.data_matrix().shape(), (3, 6));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use modan_formats::Dimension;

pub use self::{
    dataset::{Dataset, Specimen, UNKNOWN_GROUP},
    error::ShapeError,
    landmark::{LandmarkConfiguration, Point},
    procrustes::ProcrustesOptions,
    superimposition::{SuperimposedSet, SuperimpositionMethod, superimpose},
};

pub mod bookstein;
mod dataset;
mod error;
mod landmark;
pub mod missing;
pub mod procrustes;
pub mod resistant_fit;
mod superimposition;
