use std::path::PathBuf;

use thiserror::Error;

/// Result type used throughout `pkgzip`.
pub type Result<T> = std::result::Result<T, PackageError>;

/// The primary error type for all operations in the `pkgzip` crate.
///
/// None of these are recovered from internally: every error aborts the run.
#[derive(Debug, Error)]
pub enum PackageError {
    /// A writer setting (compression type/level, default mode, timestamp) was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A manifest entry carried a mode string that is not an octal number.
    #[error("invalid mode: {mode:?}")]
    InvalidMode { mode: String },

    /// The manifest file could not be decoded.
    #[error("invalid manifest '{}': {source}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The status file has no `BUILD_TIMESTAMP` line.
    #[error("invalid status file '{}': expected to find BUILD_TIMESTAMP", path.display())]
    MissingStampKey { path: PathBuf },

    /// The status file's `BUILD_TIMESTAMP` value is not an integer.
    #[error("invalid BUILD_TIMESTAMP {value:?} in '{}'", path.display())]
    InvalidStamp { path: PathBuf, value: String },

    /// An I/O error occurred while reading or writing a file.
    /// Includes the path where the error happened.
    #[error("I/O error on path '{}': {source}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// A walked path did not lie under the tree it was reached from.
    #[error("could not strip prefix '{}' from path '{}'", prefix.display(), path.display())]
    StripPrefix { prefix: PathBuf, path: PathBuf },

    /// The output archive could not be created or written.
    #[error("failed to write archive '{}': {source}", path.display())]
    Output {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Walking a tree artifact failed.
    #[error("failed to walk tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// The archive container rejected a record or could not be finalised.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The finished archive could not be moved into place.
    #[error("failed to persist archive: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// Coarse classification of a [`PackageError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any output exists.
    Config,
    /// Manifest, status file or a referenced source could not be used.
    Input,
    /// The output archive could not be created, written or finalised.
    Output,
}

impl PackageError {
    pub(crate) fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        PackageError::Io { source, path: path.into() }
    }

    /// Classifies the error for reporting.
    ///
    /// `Io` errors are attributed to the input side; the writer reports its
    /// own failures as `Output`, `Zip` or `Persist`.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PackageError::InvalidConfig(_) | PackageError::InvalidMode { .. } => ErrorKind::Config,
            PackageError::Manifest { .. }
            | PackageError::MissingStampKey { .. }
            | PackageError::InvalidStamp { .. }
            | PackageError::Io { .. }
            | PackageError::StripPrefix { .. }
            | PackageError::Walk(_) => ErrorKind::Input,
            PackageError::Output { .. } | PackageError::Zip(_) | PackageError::Persist(_) => {
                ErrorKind::Output
            }
        }
    }
}
