/// Error returned by dataset construction and superimposition.
///
/// Specimen indices are 0-based in the fields and shown 1-based in messages.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum ShapeError {
    #[display("dataset has no specimens")]
    EmptyDataset,
    #[display("specimen {}: expected {expected}D landmarks, found {found}D", index + 1)]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[display("specimen {}: expected {expected} landmarks, found {found}", index + 1)]
    LandmarkCountMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[display("at least {required} specimens are required, found {found}")]
    TooFewSpecimens { required: usize, found: usize },
    #[display("at least {required} landmarks are required, found {found}")]
    TooFewLandmarks { required: usize, found: usize },
    #[display("{count} missing landmarks cannot be used or estimated")]
    MissingLandmarks { count: usize },
    #[display("specimen {}: landmarks are coincident", index + 1)]
    DegenerateConfiguration { index: usize },
    #[display("{method} is not available for {dimension}D data")]
    UnsupportedDimension {
        method: &'static str,
        dimension: usize,
    },
    #[display("invalid baseline ({}, {}) for {landmarks} landmarks", first + 1, second + 1)]
    InvalidBaseline {
        first: usize,
        second: usize,
        landmarks: usize,
    },
    #[display("unknown variable {name:?}")]
    UnknownVariable { name: String },
}
