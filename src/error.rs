//! Error types for the pdf-workbench library.
//!
//! Every fallible operation returns [`WorkbenchError`]. Each variant carries
//! enough detail for the caller to act on it: which file was missing and
//! which paths were tried, which candidates made a selection ambiguous,
//! which page numbers were rejected.
//!
//! The outward layers (CLI, HTTP) never match on individual variants to
//! choose a status. They call [`WorkbenchError::kind`] and map the coarse
//! [`ErrorKind`] instead, so adding a variant never silently changes the
//! status code of an existing one.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the pdf-workbench library.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    // ── Lookup errors ─────────────────────────────────────────────────────
    /// A session, input file or artifact does not exist.
    #[error("{what} not found: {detail}")]
    NotFound { what: &'static str, detail: String },

    /// An absent selector matched more than one input PDF.
    #[error("Multiple PDFs found in {dir}: {listing}. Please specify a filename.")]
    AmbiguousSelection { dir: PathBuf, listing: String },

    // ── Request errors ────────────────────────────────────────────────────
    /// Malformed page range or page list.
    #[error("Invalid page selection: {0}")]
    InvalidSelection(String),

    /// An uploaded or ingested file is not a PDF.
    #[error("Only PDF files allowed: '{name}'")]
    NotAPdf { name: String },

    /// A caller-supplied file name would escape its directory or is empty.
    #[error("Invalid file name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A filesystem operation failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Building a zip archive failed.
    #[error("Failed to create archive '{path}': {detail}")]
    Archive { path: PathBuf, detail: String },

    // ── Collaborator errors ───────────────────────────────────────────────
    /// A renderer, OCR engine, Markdown converter or PDF library failed.
    /// The message is the collaborator's own, unmodified.
    #[error("{collaborator} failed: {detail}")]
    Upstream {
        collaborator: &'static str,
        detail: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (worker panicked, lock poisoned).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used by outward layers to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Ambiguous,
    InvalidSelection,
    Io,
    Upstream,
    Internal,
}

impl WorkbenchError {
    /// Shorthand for a [`WorkbenchError::NotFound`].
    pub fn not_found(what: &'static str, detail: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            detail: detail.into(),
        }
    }

    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a collaborator failure, keeping its message verbatim.
    pub fn upstream(collaborator: &'static str, detail: impl std::fmt::Display) -> Self {
        Self::Upstream {
            collaborator,
            detail: detail.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AmbiguousSelection { .. } => ErrorKind::Ambiguous,
            Self::InvalidSelection(_) | Self::NotAPdf { .. } | Self::InvalidName { .. } => {
                ErrorKind::InvalidSelection
            }
            Self::Io { .. } | Self::Archive { .. } => ErrorKind::Io,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::InvalidConfig(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = WorkbenchError> = std::result::Result<T, E>;
