use modan_shape::ShapeError;

/// Error returned by the multivariate analyses.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum AnalysisError {
    #[display("at least {required} observations are required, found {found}")]
    #[from(ignore)]
    TooFewObservations { required: usize, found: usize },
    #[display("data matrix has no variables")]
    #[from(ignore)]
    NoVariables,
    #[display("{labels} group labels given for {observations} observations")]
    #[from(ignore)]
    LengthMismatch { observations: usize, labels: usize },
    #[display("at least 2 groups are required, found {found}")]
    #[from(ignore)]
    TooFewGroups { found: usize },
    #[display("{matrix} matrix is singular")]
    #[from(ignore)]
    SingularMatrix { matrix: &'static str },
    #[display("baseline landmarks are numbered from 1, found ({first}, {second})")]
    #[from(ignore)]
    InvalidBaseline { first: usize, second: usize },
    #[display("{_0}")]
    Shape(#[error(source)] ShapeError),
}
