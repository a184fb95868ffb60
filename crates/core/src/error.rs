//! Error taxonomy shared by the store, the guess engine and the ledger.

use std::{collections::TryReserveError, fmt, io, path::PathBuf};

/// Convenience alias used throughout the core crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// How a failure should be surfaced to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Recoverable; reported, state unchanged, the caller may retry.
    Warning,
    /// The process cannot continue safely and should exit non-zero.
    Fatal,
}

/// Failures produced by core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Memory for the item array could not be obtained.
    #[error("could not allocate memory for {what}")]
    Allocation {
        /// Which buffer was being created or grown.
        what: &'static str,
        /// Underlying allocator failure.
        #[source]
        source: TryReserveError,
    },

    /// No item matched the query.
    #[error("no item found matching \"{query}\"")]
    NotFound {
        /// The query as typed by the operator.
        query: String,
    },

    /// Difficulty code outside `1..=5`.
    #[error("difficulty must be between 1 and 5 (got {0})")]
    InvalidDifficulty(i64),

    /// Input rejected at the boundary; the caller should prompt again.
    #[error("{0}")]
    Validation(String),

    /// A round was requested while the store holds no items.
    #[error("there are no items registered to play with")]
    EmptyStore,

    /// A file that had to be read or written could not be.
    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        /// What was being attempted (`open`, `write`, ...).
        action: &'static str,
        /// File involved.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Build a validation error from any displayable message.
    pub fn validation(message: impl fmt::Display) -> Self {
        Self::Validation(message.to_string())
    }

    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Severity class used when rendering a status line.
    pub fn severity(&self) -> Severity {
        match self {
            Error::Allocation { .. } | Error::Io { .. } => Severity::Fatal,
            Error::NotFound { .. }
            | Error::InvalidDifficulty(_)
            | Error::Validation(_)
            | Error::EmptyStore => Severity::Warning,
        }
    }

    /// Whether the error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// A recoverable persistence condition reported alongside the data that was
/// still loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The file did not exist; an empty collection was substituted.
    Missing(PathBuf),
    /// The file ended in the middle of a record.
    Truncated {
        /// File involved.
        path: PathBuf,
        /// Records recovered before the cut.
        recovered: usize,
        /// Records announced by the header, when the format has one.
        expected: Option<usize>,
    },
    /// A record held data that cannot be represented; loading stopped there.
    Corrupt {
        /// File involved.
        path: PathBuf,
        /// Zero-based index of the offending record.
        record: usize,
        /// What was wrong with it.
        reason: String,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::Missing(path) => write!(f, "{} not found, starting empty", path.display()),
            LoadWarning::Truncated {
                path,
                recovered,
                expected: Some(expected),
            } => write!(
                f,
                "{} is truncated: recovered {recovered} of {expected} records",
                path.display()
            ),
            LoadWarning::Truncated {
                path,
                recovered,
                expected: None,
            } => write!(
                f,
                "{} ends with a partial record: kept {recovered} complete records",
                path.display()
            ),
            LoadWarning::Corrupt {
                path,
                record,
                reason,
            } => write!(
                f,
                "{} record {} is unreadable ({reason}); kept the {record} before it",
                path.display(),
                record + 1
            ),
        }
    }
}
