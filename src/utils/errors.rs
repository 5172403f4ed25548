//! Error types for the schedule tree and search layers.
//!
//! Structural errors (malformed annotations, unknown ids, bad action
//! parameters) are programmer errors and abort whatever operation raised
//! them. Oracle errors are reported separately so the search layer can
//! turn them into a rejected candidate instead of a failed search.

use crate::tree::IteratorId;
use thiserror::Error;

/// Top-level error type for the crate.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// A node was built with one of its required fields missing or
    /// inconsistent with the rest of the annotation.
    #[error("Invalid node spec for {node}: {message}")]
    InvalidNodeSpec {
        /// The node being built
        node: String,
        /// What was wrong
        message: String,
    },

    /// An annotation entry names a parent that is not part of the annotation.
    #[error("Iterator {node} references missing parent {parent}")]
    MissingParent {
        /// The child entry
        node: IteratorId,
        /// The parent it references
        parent: IteratorId,
    },

    /// No node with this id exists in the tree.
    #[error("Unknown iterator: {0}")]
    UnknownNode(IteratorId),

    /// No node owns a computation with this name.
    #[error("Unknown computation: {0}")]
    UnknownComputation(String),

    /// The requested ancestor level is deeper than the owning node.
    #[error("Level {requested} out of range for computation {computation} (owner depth {depth})")]
    LevelOutOfRange {
        /// The computation that was looked up
        computation: String,
        /// The level asked for
        requested: usize,
        /// Depth of the node owning the computation
        depth: usize,
    },

    /// One of the nodes handed to `interchange` does not exist.
    #[error("Cannot interchange {first} and {second}: {missing} is not in the tree")]
    DisconnectedNodes {
        /// First node of the pair
        first: IteratorId,
        /// Second node of the pair
        second: IteratorId,
        /// The id that could not be found
        missing: IteratorId,
    },

    /// A transformation was given the wrong number of parameters.
    #[error("{kind} takes {expected} parameters, got {found}")]
    InvalidParameterCount {
        /// Transformation kind
        kind: &'static str,
        /// Arity of the kind
        expected: usize,
        /// Number supplied
        found: usize,
    },

    /// A transformation parameter has the wrong shape at its position.
    #[error("{kind} parameter {index} must be a {expected}")]
    InvalidParameter {
        /// Transformation kind
        kind: &'static str,
        /// Position of the offending parameter
        index: usize,
        /// Expected shape ("loop" or "factor")
        expected: &'static str,
    },

    /// A transformation was built without target computations.
    #[error("{0} requires at least one target computation")]
    EmptyTargetSet(&'static str),

    /// The annotation document itself is malformed.
    #[error("Invalid annotation: {0}")]
    InvalidAnnotation(String),

    /// The skewing solver found no factors for the requested loops.
    #[error("Skewing solver returned no factors for levels {outer} and {inner}")]
    SolverFailure {
        /// Outer loop level
        outer: usize,
        /// Inner loop level
        inner: usize,
    },

    /// The oracle could not be reached, timed out or answered garbage.
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScheduleError {
    /// True for failures that come from the oracle rather than from the
    /// caller. The search layer rejects the candidate and carries on.
    pub fn is_oracle_failure(&self) -> bool {
        matches!(
            self,
            ScheduleError::SolverFailure { .. } | ScheduleError::OracleUnavailable(_)
        )
    }

    pub(crate) fn invalid_node(node: impl Into<String>, message: impl Into<String>) -> Self {
        ScheduleError::InvalidNodeSpec {
            node: node.into(),
            message: message.into(),
        }
    }
}

/// Result type using ScheduleError.
pub type SchedResult<T> = Result<T, ScheduleError>;
