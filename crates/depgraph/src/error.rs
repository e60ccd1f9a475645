//! Error types for graph validation and ordering.

use std::fmt;
use thiserror::Error;

/// Structural errors reported by DAG validation and ordering operations.
///
/// These are never transient: each one describes a defect in the graph the
/// caller built, and carries the offending vertices so a diagnostic can name
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error<V: fmt::Debug> {
    /// The graph is empty, or every vertex has at least one incoming edge.
    #[error("graph has no root vertex")]
    NoRoot,

    /// More than one vertex has no incoming edges.
    #[error("graph has multiple root vertices: {roots:?}")]
    MultipleRoots {
        /// Every vertex with zero in-degree.
        roots: Vec<V>,
    },

    /// The edge relation contains at least one directed cycle.
    #[error("dependency cycles detected: {cycles:?}")]
    Cycle {
        /// The members of each offending cycle.
        cycles: Vec<Vec<V>>,
    },
}
