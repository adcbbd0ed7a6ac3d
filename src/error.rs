use thiserror::Error;

use crate::biharmonic::SolverFailure;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No image data have been provided")]
    NoData,
    #[error("Dimensions between image {image:?} and mask {mask:?} don't match.")]
    ShapeMismatch {
        image: (usize, usize),
        mask: (usize, usize),
    },
    #[error("Invalid mask: {0}")]
    InvalidMask(InvalidMask),
    #[error("Reconstruction of region {region} failed: {source}")]
    NumericalFailure {
        region: usize,
        /// `None` when the system failed before any channel was solved.
        channel: Option<usize>,
        #[source]
        source: SolverFailure,
    },
    #[error("NDArray had an error during initialization of shape: {0}")]
    NDArray(#[from] ndarray::ShapeError),
}

/// Reason a mask cannot be used for reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidMask {
    #[error("no pixel is marked for reconstruction")]
    Empty,
    #[error("every pixel is marked, nothing is left to reconstruct from")]
    Full,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "python-bindings")]
impl From<Error> for pyo3::PyErr {
    fn from(error: Error) -> Self {
        pyo3::exceptions::PyValueError::new_err(error.to_string())
    }
}
