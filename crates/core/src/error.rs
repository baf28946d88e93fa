// crates/core/src/error.rs
//! Error taxonomy (§7). One `thiserror` enum per concern, following the
//! shape of the teacher's `ParseError`/`DiscoveryError` split: a handful of
//! named variants plus an `io()` constructor that classifies `io::ErrorKind`
//! instead of drowning every failure in a generic `Io` variant.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the Repository Cache and anything that shells out to `git`.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("clone of {repo_url} failed: {message}")]
    CloneFailed { repo_url: String, message: String },

    #[error("fetch of {repo_url} failed: {message}")]
    FetchFailed { repo_url: String, message: String },

    #[error("repository not cached: {repo_url}")]
    NotCached { repo_url: String },

    #[error("git operation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RepoError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// Errors surfaced by the Job Store and Worker Pool.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Unsupported(String),

    #[error("job {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    Db(#[from] sqlx::Error),

    #[error("{0}")]
    Fatal(String),
}

/// Errors surfaced by the Code-Intelligence Ingester while decoding the wire format.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum IndexError {
    #[error("truncated message: expected {expected} more bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("invalid varint: too many continuation bytes")]
    VarintOverflow,

    #[error("occurrence range has {0} integers, need at least 4")]
    ShortRange(usize),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
}

/// Errors surfaced by the Query Facade.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("not authorized")]
    NotAuthorized,

    #[error("not found")]
    NotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Db(#[from] sqlx::Error),
}
