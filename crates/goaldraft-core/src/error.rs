// Error types for the draft core.

use thiserror::Error;

use crate::draft::pick::PickRejection;
use crate::draft::roster::LeagueId;

/// Failures raised by a `DraftStore` backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A concurrent writer committed first; nothing was written.
    #[error("write conflict: draft state changed underneath the commit")]
    Conflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt stored value in {field}: {message}")]
    Corrupt { field: String, message: String },
}

/// Failures reading league data from the membership / goal collaborator.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("unknown league: {0}")]
    UnknownLeague(LeagueId),

    #[error("league directory unavailable: {0}")]
    Unavailable(String),
}

/// Everything a scheduler operation can fail with.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error(transparent)]
    Rejected(#[from] PickRejection),

    #[error("league {league} has no managers to draft")]
    EmptyRoster { league: LeagueId },

    /// Lost a race against a concurrent commit. Safe to retry after
    /// refreshing state.
    #[error("another pick was committed first; refresh and try again")]
    Conflict,

    #[error("draft store failure: {0}")]
    Backend(#[source] StoreError),

    #[error("league directory failure: {0}")]
    Directory(#[from] DirectoryError),
}

impl From<StoreError> for DraftError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => DraftError::Conflict,
            other => DraftError::Backend(other),
        }
    }
}

impl DraftError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            DraftError::Rejected(r) => r.code(),
            DraftError::EmptyRoster { .. } => "empty_roster",
            DraftError::Conflict => "conflict",
            DraftError::Backend(_) | DraftError::Directory(_) => "backend_unavailable",
        }
    }

    /// Whether the caller may simply try the same intent again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DraftError::Conflict)
    }

    /// Whether this is a caller mistake rather than an infrastructure fault.
    pub fn is_validation(&self) -> bool {
        matches!(self, DraftError::Rejected(_) | DraftError::EmptyRoster { .. })
    }

    pub fn rejection(&self) -> Option<&PickRejection> {
        match self {
            DraftError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}

pub type DraftResult<T> = Result<T, DraftError>;
