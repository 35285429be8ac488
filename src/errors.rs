//! Error types for the completion engine
//!
//! Malformed-tree errors are raised by the tree accessors and are caught by the
//! classifier and resolver rules that consume them: a rule that hits one simply
//! does not match. Only the request boundary in the engine sees
//! [`CompletionError`], and it turns every variant into the fallback candidate set.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::ir::syntax::{NodeId, SyntaxKind};

/// A structural expectation about the syntax tree did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTree {
    #[error("node {0:?} does not exist in this tree")]
    MissingNode(NodeId),

    #[error("node {parent:?} has no form at index {index} (it has {len})")]
    ChildOutOfRange {
        parent: NodeId,
        index: usize,
        len: usize,
    },

    #[error("node {node:?} is a {found:?}, expected a {expected:?}")]
    UnexpectedKind {
        node: NodeId,
        expected: SyntaxKind,
        found: SyntaxKind,
    },
}

/// Failure to load a [`crate::config::CompletionConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid completion config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

/// Failure while enumerating or reading project source files.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("project root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk project directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Anything that can abort a single completion request.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error(transparent)]
    Malformed(#[from] MalformedTree),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("cursor offset {offset} is outside the source ({len} bytes)")]
    OffsetOutOfBounds { offset: usize, len: usize },

    #[error("cursor position {line}:{character} is outside the document")]
    PositionOutOfBounds { line: u32, character: u32 },
}

pub type CompletionResult<T> = Result<T, CompletionError>;
