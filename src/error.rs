//! Crate-wide error types.
//!
//! Following the split the teacher uses between a small, closed typed
//! error at a module boundary (`BackendError` in the language layer)
//! and `anyhow` for internal propagation: [`IndexError`] is the public
//! error enum returned by [`crate::index::MasterIndex`] and
//! [`crate::search::SearchEngine`] entry points, shaped after the §7
//! error taxonomy. Internal helpers that fail for reasons a caller
//! cannot act on return `anyhow::Result` and get `.context(...)`
//! annotated at the call site.

use thiserror::Error;

use crate::objectid::ObjectIdError;

/// Convenience result alias for public entry points.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Public error surface for the engine.
///
/// Variants map to the §7 taxonomy: `EmptyPattern`/`InvalidObjectId`
/// are input-validation errors rejected at entry; `PathNotFound` and
/// `Io` cover recoverable-per-file or pre-flight failures; `Invariant`
/// is reserved for internal-bug conditions (a `SymbolId` with no
/// backing `FileId`, a trigram posting referencing an evicted file)
/// that should never occur and are never expected to be handled by
/// callers beyond surfacing them.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("search pattern must not be empty")]
    EmptyPattern,

    #[error("invalid object id: {0}")]
    InvalidObjectId(#[from] ObjectIdError),

    #[error("path does not exist: {0}")]
    PathNotFound(String),

    #[error("resource limit exceeded: {0}")]
    ResourceExhausted(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Regex(#[from] regex::Error),
}
