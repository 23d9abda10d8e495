//! Error types for loading, resolution, composition and the pipeline.

use thiserror::Error;

use crate::types::JsonPath;

/// Exit code for cancelled runs (matches the shell convention for SIGINT).
const EXIT_CANCELLED: i32 = 130;

/// Errors from the artifact store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("artifact '{key}' already exists; the store is append-only")]
    AlreadyExists { key: String },
}

/// Errors while loading documents and resolving their references.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("input file '{uri}' not found")]
    FileNotFound { uri: String },

    #[error("cannot read {uri}: {source}")]
    ReadError {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {uri}: {source}")]
    NetworkError {
        uri: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot load '{uri}': unsupported URI scheme")]
    UnsupportedScheme { uri: String },

    // Content errors (exit code 2)
    #[error("invalid URI '{uri}': {message}")]
    InvalidUri { uri: String, message: String },

    #[error("invalid document {uri}: {source}")]
    InvalidDocument {
        uri: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid document {uri}: {message}")]
    MalformedDocument { uri: String, message: String },

    #[error("unresolved reference '{pointer}' at {path} in {document}")]
    UnresolvedReference {
        document: String,
        path: JsonPath,
        pointer: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("resolution cancelled")]
    Cancelled,
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. }
            | ResolveError::ReadError { .. }
            | ResolveError::UnsupportedScheme { .. } => 3,
            #[cfg(feature = "remote")]
            ResolveError::NetworkError { .. } => 3,
            ResolveError::Cancelled => EXIT_CANCELLED,
            _ => 2,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResolveError::Cancelled)
    }
}

/// Errors while composing resolved documents.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("{path} has incompatible values in '{existing}' and '{incoming}'")]
    MergeConflict {
        path: JsonPath,
        existing: String,
        incoming: String,
    },

    #[error("document '{key}' cannot be composed: {message}")]
    InvalidDocument { key: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("composition cancelled")]
    Cancelled,
}

impl ComposeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ComposeError::Cancelled => EXIT_CANCELLED,
            _ => 2,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ComposeError::Cancelled)
    }
}

/// Errors from a full pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration {uri}: {message}")]
    Config { uri: String, message: String },

    #[error("configuration {uri} names no input files")]
    NoInputs { uri: String },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Compose(#[from] ComposeError),
}

impl PipelineError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Resolve(e) => e.exit_code(),
            PipelineError::Compose(e) => e.exit_code(),
            _ => 2,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            PipelineError::Resolve(e) => e.is_cancelled(),
            PipelineError::Compose(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
