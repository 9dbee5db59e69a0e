use std::{io, path::PathBuf};

/// Error returned while reading or parsing a landmark file.
///
/// Line numbers are 1-based and refer to the original text.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ParseError {
    #[display("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[error(source)]
        source: io::Error,
    },
    #[display("missing {expected} header")]
    MissingHeader { expected: &'static str },
    #[display("line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },
    #[display("line {line}: expected {expected} values, found {found}")]
    InconsistentLandmarkCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[display("unsupported dimension {value} (expected 2 or 3)")]
    InvalidDimension { value: usize },
    #[display("missing [{name}] section")]
    MissingSection { name: &'static str },
    #[display("cannot detect landmark file format of {}", path.display())]
    UnknownFormat { path: PathBuf },
    #[display("no objects found")]
    Empty,
}
