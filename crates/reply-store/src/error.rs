//! Error types for reply-store

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Failures reading or rewriting a backing table.
///
/// Malformed user input is not an error; mutations report it by returning
/// `Ok(false)`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed row at line {line} in {}", path.display())]
    MalformedRow { path: PathBuf, line: u64 },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Error::Csv {
            path: path.into(),
            source,
        }
    }

    /// True when the backing file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            Error::Csv { source, .. } => matches!(
                source.kind(),
                csv::ErrorKind::Io(e) if e.kind() == io::ErrorKind::NotFound
            ),
            Error::MalformedRow { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = Error::io(
            "replies.csv",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.to_string(), "I/O error on replies.csv: missing");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_malformed_row_display() {
        let err = Error::MalformedRow {
            path: PathBuf::from("replies.csv"),
            line: 3,
        };
        assert_eq!(err.to_string(), "Malformed row at line 3 in replies.csv");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_result_err() {
        let r: Result<i32> = Err(Error::io(
            "locks.csv",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        ));
        assert!(r.is_err());
    }
}
