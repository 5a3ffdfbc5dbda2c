use std::fmt;
use std::io;
use std::path::PathBuf;

/// Machine-readable error codes for script-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ArchiveFormat,
    MarkupParse,
    ConfigParseError,
    InvalidState,
    UnknownParagraph,
    PersistenceFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ArchiveFormat => "E1001",
            Self::MarkupParse => "E1002",
            Self::ConfigParseError => "E1003",
            Self::InvalidState => "E2001",
            Self::UnknownParagraph => "E2002",
            Self::PersistenceFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ArchiveFormat => "Input is not a usable EPUB archive",
            Self::MarkupParse => "Markup file could not be parsed",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidState => "Operation not valid in the current session state",
            Self::UnknownParagraph => "Paragraph index out of range",
            Self::PersistenceFailed => "Writing a working file failed",
            Self::LockContention => "Working directory is locked",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to users and scripts.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ArchiveFormat => Some("Check that the file is a valid .epub (zip) archive."),
            Self::MarkupParse => Some("Repair the listed XHTML file or remove it from the book."),
            Self::ConfigParseError => Some("Fix syntax in rejoin/config.toml and retry."),
            Self::InvalidState => {
                Some("Accept and skip need a pending suggestion; back needs a prior decision.")
            }
            Self::UnknownParagraph => None,
            Self::PersistenceFailed => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Another rejoin session owns the working directory; close it first.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by loading, reviewing, and saving a book.
#[derive(Debug, thiserror::Error)]
pub enum RejoinError {
    /// The input is not a zip archive or contains entries we refuse to extract.
    #[error("invalid archive {path}: {reason}")]
    ArchiveFormat { path: PathBuf, reason: String },

    /// A markup file inside the archive is not well-formed enough to edit.
    #[error("cannot parse {path}: {message}")]
    Markup { path: PathBuf, message: String },

    /// Config file exists but does not parse.
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// Operation called outside the state it is valid in. Nothing was mutated.
    #[error("cannot {op}: {reason}")]
    InvalidState {
        op: &'static str,
        reason: &'static str,
    },

    /// A paragraph index outside the document index.
    #[error("paragraph {0} is not in the document index")]
    UnknownParagraph(usize),

    /// Writing a working file or output failed. In-memory state may already
    /// reflect the change.
    #[error("failed to write {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The working directory lock is held by someone else.
    #[error("lock error: {0}")]
    Lock(#[from] crate::lock::LockError),

    /// Any other I/O failure while reading inputs.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RejoinError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ArchiveFormat { .. } => ErrorCode::ArchiveFormat,
            Self::Markup { .. } => ErrorCode::MarkupParse,
            Self::Config { .. } => ErrorCode::ConfigParseError,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::UnknownParagraph(_) => ErrorCode::UnknownParagraph,
            Self::Persistence { .. } => ErrorCode::PersistenceFailed,
            Self::Lock(err) => err.code(),
            Self::Io(_) => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint for users and scripts.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ArchiveFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = RejoinError> = std::result::Result<T, E>;
