//! Directed-graph storage with dual adjacency indexes.
//!
//! The graph owns its vertex set, edge set, and two adjacency maps:
//! `down_edges` (direct successors of a vertex) and `up_edges` (direct
//! predecessors). Keeping both directions gives O(1) neighbor lookup both
//! ways, which the traversals and the parallel walker rely on. Every
//! mutation keeps the three stores mutually consistent: an edge `(u, v)`
//! exists iff `v` is in `down_edges[u]` and `u` is in `up_edges[v]`.

use crate::Set;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use tracing::debug;

/// A directed edge from `source` to `target`.
///
/// Edges are simple: the graph holds at most one edge per ordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge<V> {
    source: V,
    target: V,
}

impl<V> Edge<V> {
    /// Creates an edge from `source` to `target`.
    pub const fn new(source: V, target: V) -> Self {
        Self { source, target }
    }

    /// The vertex this edge leaves.
    pub const fn source(&self) -> &V {
        &self.source
    }

    /// The vertex this edge enters.
    pub const fn target(&self) -> &V {
        &self.target
    }
}

/// A directed graph over caller-supplied vertices.
///
/// Vertices are opaque: the graph only requires hashable identity
/// (`Eq + Hash`), cloning for index keys, and `Debug` so diagnostics and
/// validation errors can name vertices. Vertex content is never inspected.
///
/// All operations are total: queries on absent vertices see empty adjacency,
/// and mutations are idempotent. Mutation is not safe for concurrent
/// callers; the engine assumes single-writer access while a graph is built
/// and validated.
#[derive(Debug, Clone)]
pub struct Graph<V> {
    vertices: Set<V>,
    edges: Set<Edge<V>>,
    down_edges: HashMap<V, Set<V>>,
    up_edges: HashMap<V, Set<V>>,
}

impl<V> Graph<V>
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Returns `true` if the graph has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Returns `true` if `v` is a vertex of the graph.
    #[must_use]
    pub fn has_vertex(&self, v: &V) -> bool {
        self.vertices.contains(v)
    }

    /// Returns `true` if the edge `(source, target)` is present.
    #[must_use]
    pub fn has_edge(&self, source: &V, target: &V) -> bool {
        self.down_edges
            .get(source)
            .is_some_and(|targets| targets.contains(target))
    }

    /// Inserts a vertex if absent.
    pub fn add_vertex(&mut self, v: V) {
        if self.vertices.contains(&v) {
            return;
        }
        debug!(vertex = ?v, "added vertex");
        self.down_edges.entry(v.clone()).or_default();
        self.up_edges.entry(v.clone()).or_default();
        self.vertices.add(v);
    }

    /// Removes a vertex and every edge touching it.
    ///
    /// No-op if `v` is absent. After removal, `v` appears in no other
    /// vertex's adjacency.
    pub fn remove_vertex(&mut self, v: &V) {
        if !self.vertices.contains(v) {
            return;
        }

        let sources: Vec<V> = self
            .up_edges
            .get(v)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        let targets: Vec<V> = self
            .down_edges
            .get(v)
            .map(|t| t.iter().cloned().collect())
            .unwrap_or_default();

        for source in &sources {
            self.remove_edge(source, v);
        }
        for target in &targets {
            self.remove_edge(v, target);
        }

        self.down_edges.remove(v);
        self.up_edges.remove(v);
        self.vertices.remove(v);
        debug!(vertex = ?v, "removed vertex");
    }

    /// Adds the directed edge `(source, target)`.
    ///
    /// Absent endpoints become vertices, so the adjacency invariant holds by
    /// construction. Idempotent: connecting an existing pair has no further
    /// effect.
    pub fn connect(&mut self, source: V, target: V) {
        if self.has_edge(&source, &target) {
            return;
        }

        self.add_vertex(source.clone());
        self.add_vertex(target.clone());

        debug!(source = ?source, target = ?target, "connected");
        self.edges.add(Edge::new(source.clone(), target.clone()));
        self.down_edges.entry(source.clone()).or_default().add(target.clone());
        self.up_edges.entry(target).or_default().add(source);
    }

    /// Removes the directed edge `(source, target)`; no-op if absent.
    pub fn remove_edge(&mut self, source: &V, target: &V) {
        let edge = Edge::new(source.clone(), target.clone());
        if !self.edges.remove(&edge) {
            return;
        }

        if let Some(targets) = self.down_edges.get_mut(source) {
            targets.remove(target);
        }
        if let Some(sources) = self.up_edges.get_mut(target) {
            sources.remove(source);
        }
        debug!(source = ?source, target = ?target, "removed edge");
    }

    /// Returns a copy of the direct successors of `v`.
    ///
    /// Empty if `v` has no outgoing edges or is not a vertex.
    #[must_use]
    pub fn down_edges(&self, v: &V) -> Set<V> {
        self.down_edges.get(v).cloned().unwrap_or_default()
    }

    /// Returns a copy of the direct predecessors of `v`.
    ///
    /// Empty if `v` has no incoming edges or is not a vertex.
    #[must_use]
    pub fn up_edges(&self, v: &V) -> Set<V> {
        self.up_edges.get(v).cloned().unwrap_or_default()
    }

    /// Borrows the direct successors of `v` without copying.
    ///
    /// For hot traversal paths; `None` only when `v` is not a vertex.
    #[must_use]
    pub fn down_edges_ref(&self, v: &V) -> Option<&Set<V>> {
        self.down_edges.get(v)
    }

    /// Borrows the direct predecessors of `v` without copying.
    ///
    /// For hot traversal paths; `None` only when `v` is not a vertex.
    #[must_use]
    pub fn up_edges_ref(&self, v: &V) -> Option<&Set<V>> {
        self.up_edges.get(v)
    }

    /// The vertex set.
    #[must_use]
    pub fn vertices(&self) -> &Set<V> {
        &self.vertices
    }

    /// The edge set.
    #[must_use]
    pub fn edges(&self) -> &Set<Edge<V>> {
        &self.edges
    }
}

impl<V> Default for Graph<V> {
    fn default() -> Self {
        Self {
            vertices: Set::default(),
            edges: Set::default(),
            down_edges: HashMap::new(),
            up_edges: HashMap::new(),
        }
    }
}

/// Renders one line per vertex with its direct successors indented beneath
/// it, sorted by debug representation for stable output.
impl<V> fmt::Display for Graph<V>
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<(String, &V)> = self
            .vertices
            .iter()
            .map(|v| (format!("{v:?}"), v))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, v) in entries {
            writeln!(f, "{name}")?;
            let mut targets: Vec<String> = self
                .down_edges
                .get(v)
                .map(|t| t.iter().map(|target| format!("{target:?}")).collect())
                .unwrap_or_default();
            targets.sort();
            for target in targets {
                writeln!(f, "  {target}")?;
            }
        }
        Ok(())
    }
}
