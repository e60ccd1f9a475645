//! Strongly connected components via Tarjan's algorithm.
//!
//! Each vertex gets a discovery index and a low-link value; a vertex whose
//! low-link equals its own index is the root of a component, and everything
//! above it on the component stack belongs to that component. Low-link
//! updates only consider neighbors still on the stack - edges into already
//! emitted components say nothing about mutual reachability.
//!
//! The traversal keeps an explicit frame stack instead of recursing, so
//! component analysis of deep dependency chains cannot overflow the call
//! stack.

use crate::{Graph, Set};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

struct State<V> {
    counter: usize,
    index: HashMap<V, usize>,
    low_link: HashMap<V, usize>,
    stack: Vec<V>,
    on_stack: Set<V>,
    components: Vec<Vec<V>>,
}

/// One suspended visit: the vertex, its successor snapshot, and how many
/// successors have been examined so far.
struct Frame<V> {
    vertex: V,
    neighbors: Vec<V>,
    next: usize,
}

/// Computes the strongly connected components of `graph`.
///
/// Order across components is unspecified; within a component, vertices
/// appear in stack pop order (reverse discovery). A component of size one
/// whose vertex has no self-edge is acyclic; any larger component, or a
/// self-edge, is a cycle.
#[must_use]
pub fn strongly_connected<V>(graph: &Graph<V>) -> Vec<Vec<V>>
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    let mut state = State {
        counter: 0,
        index: HashMap::new(),
        low_link: HashMap::new(),
        stack: Vec::new(),
        on_stack: Set::new(),
        components: Vec::new(),
    };

    for v in graph.vertices().iter() {
        if !state.index.contains_key(v) {
            visit(graph, v.clone(), &mut state);
        }
    }

    state.components
}

/// Runs one depth-first exploration rooted at `root`, emitting every
/// component whose root lies on this exploration's path.
fn visit<V>(graph: &Graph<V>, root: V, state: &mut State<V>)
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    let mut frames: Vec<Frame<V>> = Vec::new();
    push_frame(graph, root, state, &mut frames);

    loop {
        // Take the next unexamined successor of the top frame, or finish it.
        let step = {
            let Some(frame) = frames.last_mut() else {
                break;
            };
            if frame.next < frame.neighbors.len() {
                let neighbor = frame.neighbors[frame.next].clone();
                frame.next += 1;
                Some((frame.vertex.clone(), neighbor))
            } else {
                None
            }
        };

        match step {
            Some((v, w)) => {
                if !state.index.contains_key(&w) {
                    push_frame(graph, w, state, &mut frames);
                } else if state.on_stack.contains(&w) {
                    let w_index = state.index[&w];
                    if let Some(low) = state.low_link.get_mut(&v) {
                        *low = (*low).min(w_index);
                    }
                }
            }
            None => {
                if let Some(frame) = frames.pop() {
                    finish_frame(frame.vertex, state, frames.last());
                }
            }
        }
    }
}

fn push_frame<V>(graph: &Graph<V>, v: V, state: &mut State<V>, frames: &mut Vec<Frame<V>>)
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    state.index.insert(v.clone(), state.counter);
    state.low_link.insert(v.clone(), state.counter);
    state.counter += 1;

    state.stack.push(v.clone());
    state.on_stack.add(v.clone());

    let neighbors: Vec<V> = graph
        .down_edges_ref(&v)
        .map(|targets| targets.iter().cloned().collect())
        .unwrap_or_default();
    frames.push(Frame {
        vertex: v,
        neighbors,
        next: 0,
    });
}

/// Emits `v`'s component if `v` is a component root, then folds its low-link
/// into the parent frame.
fn finish_frame<V>(v: V, state: &mut State<V>, parent: Option<&Frame<V>>)
where
    V: Clone + Eq + Hash + fmt::Debug,
{
    let v_index = state.index[&v];
    let v_low = state.low_link[&v];

    if v_low == v_index {
        let mut component = Vec::new();
        while let Some(member) = state.stack.pop() {
            state.on_stack.remove(&member);
            let done = member == v;
            component.push(member);
            if done {
                break;
            }
        }
        state.components.push(component);
    }

    if let Some(parent) = parent
        && let Some(parent_low) = state.low_link.get_mut(&parent.vertex)
    {
        *parent_low = (*parent_low).min(v_low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_single_cycle_is_one_component() {
        let mut graph = Graph::new();
        graph.connect("a", "b");
        graph.connect("b", "c");
        graph.connect("c", "a");

        let components = strongly_connected(&graph);
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 3);
    }

    #[test]
    fn test_dag_yields_singletons() {
        let mut graph = Graph::new();
        graph.connect(1, 2);
        graph.connect(1, 3);
        graph.connect(2, 4);
        graph.connect(3, 4);

        let components = strongly_connected(&graph);
        assert_eq!(components.len(), 4);
        assert!(components.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn test_two_cycles_are_distinct_components() {
        let mut graph = Graph::new();
        // cycle a <-> b, cycle c <-> d, bridged by b -> c
        graph.connect("a", "b");
        graph.connect("b", "a");
        graph.connect("c", "d");
        graph.connect("d", "c");
        graph.connect("b", "c");

        let mut sizes: Vec<usize> = strongly_connected(&graph)
            .iter()
            .map(Vec::len)
            .collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![2, 2]);
    }

    #[test]
    fn test_self_loop_is_singleton_component() {
        let mut graph = Graph::new();
        graph.connect(1, 1);

        let components = strongly_connected(&graph);
        assert_eq!(components, vec![vec![1]]);
    }

    #[test]
    fn test_cycle_attached_to_dag_tail() {
        let mut graph = Graph::new();
        graph.connect("start", "a");
        graph.connect("a", "b");
        graph.connect("b", "c");
        graph.connect("c", "a");
        graph.connect("c", "end");

        let components = strongly_connected(&graph);
        assert_eq!(components.len(), 3);

        let cycle = components
            .iter()
            .find(|c| c.len() == 3)
            .expect("cycle component");
        let members: HashSet<&&str> = cycle.iter().collect();
        assert!(members.contains(&"a"));
        assert!(members.contains(&"b"));
        assert!(members.contains(&"c"));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut graph = Graph::new();
        for i in 0..50_000_u32 {
            graph.connect(i, i + 1);
        }

        let components = strongly_connected(&graph);
        assert_eq!(components.len(), 50_001);
    }

    #[test]
    fn test_empty_graph() {
        let graph: Graph<u32> = Graph::new();
        assert!(strongly_connected(&graph).is_empty());
    }
}
