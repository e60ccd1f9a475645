//! DAG operations layered over [`Graph`].
//!
//! [`Dag`] shares its storage with [`Graph`] (construction and queries go
//! through `Deref`) and adds the operations that only make sense on an
//! acyclic edge relation: root discovery, cycle validation, depth-first
//! walks, transitive reduction, and topological ordering.
//!
//! Acyclicity is enforced by [`Dag::validate`], not by construction. Apart
//! from `validate` itself, the operations here assume a validated graph;
//! their behavior on a graph containing a cycle is unspecified, and they do
//! not re-run validation on every call.

use crate::{Error, Graph, Set, tarjan};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Which adjacency index a traversal follows.
#[derive(Clone, Copy)]
enum Direction {
    Down,
    Up,
}

/// A directed acyclic graph.
///
/// Dereferences to [`Graph`] for construction and queries:
///
/// ```
/// use depgraph::Dag;
///
/// let mut dag = Dag::new();
/// dag.connect("app", "lib");
/// dag.connect("app", "util");
/// dag.validate().unwrap();
/// assert_eq!(dag.root().unwrap(), &"app");
/// ```
#[derive(Debug, Clone)]
pub struct Dag<V> {
    graph: Graph<V>,
}

impl<V> Default for Dag<V> {
    fn default() -> Self {
        Self {
            graph: Graph::default(),
        }
    }
}

impl<V> Dag<V>
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    /// Creates an empty DAG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
        }
    }

    /// Consumes the wrapper and returns the underlying graph.
    #[must_use]
    pub fn into_graph(self) -> Graph<V> {
        self.graph
    }

    /// Returns the unique vertex with no incoming edges.
    ///
    /// # Errors
    ///
    /// [`Error::NoRoot`] if the graph is empty or every vertex has an
    /// incoming edge (the latter is impossible for a validated DAG and
    /// signals malformed input upstream); [`Error::MultipleRoots`] if more
    /// than one vertex has zero in-degree.
    pub fn root(&self) -> Result<&V, Error<V>> {
        let roots: Vec<&V> = self
            .graph
            .vertices()
            .iter()
            .filter(|v| self.graph.up_edges_ref(v).is_none_or(Set::is_empty))
            .collect();

        match roots.len() {
            0 => Err(Error::NoRoot),
            1 => Ok(roots[0]),
            _ => Err(Error::MultipleRoots {
                roots: roots.into_iter().cloned().collect(),
            }),
        }
    }

    /// Checks that the edge relation contains no directed cycle.
    ///
    /// Cycles are found by strongly-connected-component analysis: any
    /// component with more than one vertex is a cycle, as is any vertex with
    /// a self-edge.
    ///
    /// # Errors
    ///
    /// [`Error::Cycle`] carrying the members of every offending cycle.
    pub fn validate(&self) -> Result<(), Error<V>> {
        let mut cycles: Vec<Vec<V>> = tarjan::strongly_connected(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .collect();

        // Self-loops form size-1 components and need their own check.
        for v in self.graph.vertices().iter() {
            if self
                .graph
                .down_edges_ref(v)
                .is_some_and(|targets| targets.contains(v))
            {
                cycles.push(vec![v.clone()]);
            }
        }

        if cycles.is_empty() {
            Ok(())
        } else {
            Err(Error::Cycle { cycles })
        }
    }

    /// Walks the graph depth-first along down-edges from every vertex in
    /// `start`, visiting each reachable vertex exactly once.
    ///
    /// The traversal uses an explicit stack, so arbitrarily deep graphs
    /// cannot overflow the call stack. The `depth` passed to the callback is
    /// the stack depth at first discovery - a discovery-order hint, not a
    /// shortest-path distance, because the stack may interleave branches.
    ///
    /// # Errors
    ///
    /// The first error returned by `visit` halts the walk immediately and is
    /// propagated; side effects for already-visited vertices stand.
    pub fn depth_first_walk<I, F, E>(&self, start: I, visit: F) -> Result<(), E>
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V, usize) -> Result<(), E>,
    {
        self.walk_from(start, Direction::Down, visit)
    }

    /// Like [`Dag::depth_first_walk`], but traverses up-edges.
    ///
    /// # Errors
    ///
    /// Same contract as [`Dag::depth_first_walk`].
    pub fn reverse_depth_first_walk<I, F, E>(&self, start: I, visit: F) -> Result<(), E>
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V, usize) -> Result<(), E>,
    {
        self.walk_from(start, Direction::Up, visit)
    }

    /// Shared traversal routine; the forward and reverse walks differ only
    /// in which adjacency index they consult.
    fn walk_from<I, F, E>(&self, start: I, direction: Direction, mut visit: F) -> Result<(), E>
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&V, usize) -> Result<(), E>,
    {
        let mut stack: Vec<(V, usize)> = start.into_iter().map(|v| (v, 0)).collect();
        let mut seen: Set<V> = Set::new();

        while let Some((v, depth)) = stack.pop() {
            if !seen.add(v.clone()) {
                continue;
            }
            visit(&v, depth)?;

            let neighbors = match direction {
                Direction::Down => self.graph.down_edges_ref(&v),
                Direction::Up => self.graph.up_edges_ref(&v),
            };
            if let Some(neighbors) = neighbors {
                for neighbor in neighbors.iter() {
                    if !seen.contains(neighbor) {
                        stack.push((neighbor.clone(), depth + 1));
                    }
                }
            }
        }
        Ok(())
    }

    /// All vertices reachable from `v` through down-edges, excluding `v`.
    #[must_use]
    pub fn descendants(&self, v: &V) -> Set<V> {
        self.reachable(v, Direction::Down)
    }

    /// All vertices reachable from `v` through up-edges, excluding `v`.
    #[must_use]
    pub fn ancestors(&self, v: &V) -> Set<V> {
        self.reachable(v, Direction::Up)
    }

    fn reachable(&self, v: &V, direction: Direction) -> Set<V> {
        let start: Vec<V> = match direction {
            Direction::Down => self.graph.down_edges(v),
            Direction::Up => self.graph.up_edges(v),
        }
        .into_iter()
        .collect();

        let mut out = Set::new();
        let _: Result<(), std::convert::Infallible> =
            self.walk_from(start, direction, |reached, _depth| {
                out.add(reached.clone());
                Ok(())
            });
        out
    }

    /// Removes every edge whose endpoints are also connected by a longer
    /// path, in place.
    ///
    /// For each vertex `u` and direct successor `v`, anything reachable from
    /// `v`'s successors that is also a direct successor of `u` is redundant
    /// and its direct edge from `u` is removed. The reachability relation is
    /// unchanged. Requires a validated DAG; behavior on a cyclic graph is
    /// unspecified. Complexity O(V*(V+E)).
    pub fn transitive_reduction(&mut self) {
        let vertices: Vec<V> = self.graph.vertices().iter().cloned().collect();

        for u in &vertices {
            let direct: Vec<V> = self.graph.down_edges(u).into_iter().collect();

            for v in &direct {
                let start: Vec<V> = self.graph.down_edges(v).into_iter().collect();

                let mut redundant: Vec<V> = Vec::new();
                let _: Result<(), std::convert::Infallible> =
                    self.walk_from(start, Direction::Down, |reached, _depth| {
                        if self.graph.has_edge(u, reached) {
                            redundant.push(reached.clone());
                        }
                        Ok(())
                    });

                for w in redundant {
                    debug!(source = ?u, target = ?w, "removed transitive edge");
                    self.graph.remove_edge(u, &w);
                }
            }
        }
    }

    /// Returns the vertices ordered so that every vertex appears after all
    /// of its down-edge targets.
    ///
    /// This is the dependency order the parallel walker executes in: a
    /// vertex's targets are its dependencies. Order among vertices with no
    /// dependency relation is unspecified.
    ///
    /// # Errors
    ///
    /// [`Error::Cycle`] listing the vertices left unordered when the graph
    /// is cyclic. Detection falls out of the in-degree scheduling itself;
    /// this method never runs a separate validation pass.
    pub fn topological_sort(&self) -> Result<Vec<V>, Error<V>> {
        let mut waiting_on: HashMap<&V, usize> = self
            .graph
            .vertices()
            .iter()
            .map(|v| (v, self.graph.down_edges_ref(v).map_or(0, Set::len)))
            .collect();

        let mut queue: VecDeque<&V> = waiting_on
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(&v, _)| v)
            .collect();

        let mut order: Vec<V> = Vec::with_capacity(self.graph.len());
        while let Some(v) = queue.pop_front() {
            order.push(v.clone());

            if let Some(dependents) = self.graph.up_edges_ref(v) {
                for dependent in dependents.iter() {
                    if let Some(count) = waiting_on.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            queue.push_back(dependent);
                        }
                    }
                }
            }
        }

        if order.len() == self.graph.len() {
            Ok(order)
        } else {
            // Everything still waiting on a dependency sits on a cycle or
            // behind one.
            let leftover: Vec<V> = waiting_on
                .into_iter()
                .filter(|&(_, count)| count > 0)
                .map(|(v, _)| v.clone())
                .collect();
            Err(Error::Cycle {
                cycles: vec![leftover],
            })
        }
    }
}

impl<V> Deref for Dag<V> {
    type Target = Graph<V>;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}

impl<V> DerefMut for Dag<V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.graph
    }
}

impl<V> From<Graph<V>> for Dag<V> {
    fn from(graph: Graph<V>) -> Self {
        Self { graph }
    }
}
