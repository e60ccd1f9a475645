//! Directed-graph engine for dependency ordering.
//!
//! This crate provides the graph machinery a planning pipeline needs to
//! validate and order a dependency graph before acting on it: vertex/edge
//! management over dual adjacency indexes, cycle detection via strongly
//! connected components, transitive reduction, depth-first walks, and a
//! dependency-ordered parallel walker with bounded concurrency.
//!
//! # Key Types
//!
//! - [`Graph`]: directed-graph storage with O(1) neighbor lookup in both
//!   directions
//! - [`Dag`]: DAG-specific operations (root discovery, validation, walks,
//!   transitive reduction) over the same storage
//! - [`Walker`]: runs an async operation per vertex, starting each vertex
//!   only after its dependencies completed
//! - [`Set`]: the unordered collection backing vertices, edges, and
//!   adjacency
//!
//! Vertices are opaque to the engine: any `Clone + Eq + Hash + Debug` type
//! works, and vertex content is never inspected. What a vertex means, how
//! graphs are produced from configuration, and what happens during a walk
//! are all the caller's concern.
//!
//! # Example
//!
//! ```
//! use depgraph::Dag;
//!
//! let mut dag = Dag::new();
//! dag.connect("app", "lib");
//! dag.connect("app", "util");
//! dag.connect("lib", "util");
//!
//! dag.validate().expect("no cycles");
//! assert_eq!(dag.root().unwrap(), &"app");
//!
//! // Visit everything "app" transitively depends on.
//! let mut seen = Vec::new();
//! dag.depth_first_walk(["app"], |v, _depth| {
//!     seen.push(*v);
//!     Ok::<(), ()>(())
//! })
//! .unwrap();
//! assert_eq!(seen.len(), 3);
//! ```

mod dag;
mod error;
mod graph;
mod set;
mod tarjan;
mod walk;

pub use dag::Dag;
pub use error::Error;
pub use graph::{Edge, Graph};
pub use set::Set;
pub use tarjan::strongly_connected;
pub use walk::{WalkError, Walker, WalkerConfig};
