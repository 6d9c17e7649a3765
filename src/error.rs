//! Error taxonomy for split operations.
//!
//! Every failure aborts the split that raised it; nothing is retried or
//! swallowed. Variants carry the path they concern so the message is useful
//! without a backtrace.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = SplitError> = std::result::Result<T, E>;

/// Errors raised while configuring or running a split.
#[derive(Debug, Error)]
pub enum SplitError {
    /// The source file does not exist.
    #[error("source not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Read or write failure on the source, a shard, or the output directory.
    #[error("{action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration value is out of range or unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The source cannot be split as requested (e.g. no header row to keep).
    #[error("malformed input {}: {message}", path.display())]
    MalformedInput { path: PathBuf, message: String },

    /// The delimited syntax of a record could not be parsed or written.
    #[error("csv error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl SplitError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Wrap an I/O error, promoting `NotFound` on open to [`SplitError::NotFound`].
    pub(crate) fn open(path: &Path, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            Self::io("open", path, err)
        }
    }

    pub(crate) fn io(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        // csv wraps plain I/O failures; surface those under the I/O variant.
        if let csv::ErrorKind::Io(err) = source.kind() {
            let err = io::Error::new(err.kind(), err.to_string());
            return Self::io("read/write", path, err);
        }
        Self::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Short stable name of the variant, used in logs and CLI output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Io { .. } => "io",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::MalformedInput { .. } => "malformed_input",
            Self::Csv { .. } => "csv",
        }
    }
}
