// ============================================================
// Layer 4 — Data Errors
// ============================================================
// Typed failures for everything between the files on disk and
// a Vec<LabeledSample>. Callers that only need to report the
// problem can `?` these straight into anyhow; tests match on
// the variants.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// A sample ID has no entry in the label map
    #[error("sample '{0}' has no class label")]
    MissingLabel(String),

    /// A sample ID has no entry in the location map
    #[error("sample '{0}' has no file location")]
    MissingLocation(String),

    /// Label does not fit the configured number of classes
    #[error("label {label} is outside [0, {n_classes})")]
    LabelOutOfRange { label: usize, n_classes: usize },

    /// Same fsID found on two manifest rows
    #[error("sample ID '{0}' appears more than once in the manifest")]
    DuplicateId(String),

    /// Fold index or fold lists that cannot form a partition
    #[error("invalid fold selection: {0}")]
    InvalidFolds(String),

    /// Generator parameters that can never produce a batch
    #[error("invalid generator configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot read manifest '{path}': {source}")]
    Manifest {
        path:   PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("cannot read array '{path}': {source}")]
    Npy {
        path:   PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    #[error("cannot decode image '{path}': {source}")]
    Image {
        path:   PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("array '{path}' has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        path:     PathBuf,
        expected: Vec<usize>,
        actual:   Vec<usize>,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
}
