//! Dependency-ordered parallel traversal.
//!
//! [`Walker`] runs a caller-supplied operation for every vertex of a DAG,
//! starting a vertex only after the operations of all its direct
//! dependencies (down-edge targets) have completed successfully. Concurrency
//! is bounded by a semaphore. Shutdown on failure is cooperative: no new
//! vertex is dispatched once a failure is observed, in-flight operations run
//! to completion, and every collected failure is surfaced after the drain.

use crate::{Dag, Set};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Walker configuration.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Maximum concurrent vertex operations (0 = available parallelism).
    pub max_parallel: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkerConfig {
    /// Creates the default configuration: parallelism bound by the number of
    /// available CPUs.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_parallel: 0 }
    }

    /// Sets the maximum number of concurrent vertex operations.
    #[must_use]
    pub const fn with_max_parallel(mut self, max: usize) -> Self {
        self.max_parallel = max;
        self
    }

    /// Gets the effective parallelism level.
    #[must_use]
    pub fn effective_parallelism(&self) -> usize {
        if self.max_parallel == 0 {
            std::thread::available_parallelism()
                .map(std::num::NonZero::get)
                .unwrap_or(1)
        } else {
            self.max_parallel
        }
    }
}

/// The failures collected by a parallel walk.
///
/// Failures are gathered, never discarded: every vertex whose operation
/// returned an error appears here, in completion order.
#[derive(Debug, Error)]
#[error("walk failed on {} vertex operations", .failures.len())]
pub struct WalkError<V: fmt::Debug, E: fmt::Debug> {
    failures: Vec<(V, E)>,
}

impl<V: fmt::Debug, E: fmt::Debug> WalkError<V, E> {
    /// The failed vertices and their errors.
    #[must_use]
    pub fn failures(&self) -> &[(V, E)] {
        &self.failures
    }

    /// Consumes the error, returning the failed vertices and their errors.
    #[must_use]
    pub fn into_failures(self) -> Vec<(V, E)> {
        self.failures
    }
}

/// Dependency-ordered parallel executor over a [`Dag`].
///
/// The scheduler keeps, per vertex, a count of not-yet-completed
/// dependencies; vertices reaching zero are dispatched onto a bounded worker
/// pool. Requires a validated DAG: on a cyclic graph the cycle's members are
/// never dispatched and the walker logs a warning instead of hanging.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    config: WalkerConfig,
}

impl Walker {
    /// Creates a walker with the given configuration.
    #[must_use]
    pub const fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Runs `op` for every vertex, respecting dependency order.
    ///
    /// A vertex's operation never starts before the operations of all its
    /// down-edge targets have completed; no ordering holds among vertices
    /// with no dependency relation.
    ///
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use depgraph::{Dag, Walker, WalkerConfig};
    ///
    /// let mut dag = Dag::new();
    /// dag.connect("app", "lib");
    /// dag.validate().unwrap();
    ///
    /// let walker = Walker::new(WalkerConfig::new().with_max_parallel(4));
    /// walker
    ///     .walk(&dag, |vertex| async move {
    ///         println!("building {vertex}");
    ///         Ok::<(), String>(())
    ///     })
    ///     .await
    ///     .unwrap();
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// [`WalkError`] carrying every vertex whose operation failed, returned
    /// only after all in-flight operations have drained.
    ///
    /// # Panics
    ///
    /// A panic inside `op` is resumed on the calling task after the join.
    pub async fn walk<V, F, Fut, E>(&self, dag: &Dag<V>, op: F) -> Result<(), WalkError<V, E>>
    where
        V: Clone + Eq + Hash + fmt::Debug + Send + 'static,
        F: Fn(V) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Debug + Send + 'static,
    {
        let total = dag.len();
        if total == 0 {
            return Ok(());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.effective_parallelism()));
        let mut join_set: JoinSet<(V, Result<(), E>)> = JoinSet::new();

        let dispatch = |v: V, join_set: &mut JoinSet<(V, Result<(), E>)>| {
            debug!(vertex = ?v, "dispatching vertex operation");
            let operation = op(v.clone());
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (v, operation.await)
            });
        };

        // Remaining-dependency counts; zero means ready to run.
        let mut waiting_on: HashMap<V, usize> = dag
            .vertices()
            .iter()
            .map(|v| (v.clone(), dag.down_edges_ref(v).map_or(0, Set::len)))
            .collect();

        let ready: Vec<V> = waiting_on
            .iter()
            .filter(|&(_, &count)| count == 0)
            .map(|(v, _)| v.clone())
            .collect();
        debug!(total, ready = ready.len(), "starting walk");
        for v in ready {
            dispatch(v, &mut join_set);
        }

        let mut failures: Vec<(V, E)> = Vec::new();
        let mut completed = 0_usize;

        while let Some(joined) = join_set.join_next().await {
            let (v, result) = match joined {
                Ok(output) => output,
                Err(join_error) => {
                    if join_error.is_panic() {
                        std::panic::resume_unwind(join_error.into_panic());
                    }
                    // The walker never aborts tasks, so a non-panic join
                    // error cannot carry a vertex result.
                    continue;
                }
            };

            match result {
                Ok(()) => {
                    completed += 1;
                    debug!(vertex = ?v, completed, total, "vertex operation completed");
                    if failures.is_empty()
                        && let Some(dependents) = dag.up_edges_ref(&v)
                    {
                        for dependent in dependents.iter() {
                            if let Some(count) = waiting_on.get_mut(dependent) {
                                *count -= 1;
                                if *count == 0 {
                                    dispatch(dependent.clone(), &mut join_set);
                                }
                            }
                        }
                    }
                }
                Err(error) => {
                    warn!(vertex = ?v, error = ?error, "vertex operation failed; draining in-flight work");
                    failures.push((v, error));
                }
            }
        }

        if failures.is_empty() {
            if completed != total {
                warn!(completed, total, "walk left vertices undispatched; graph was not a validated DAG");
            }
            Ok(())
        } else {
            Err(WalkError { failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn walker() -> Walker {
        Walker::new(WalkerConfig::new().with_max_parallel(4))
    }

    #[tokio::test]
    async fn test_walk_empty_dag() {
        let dag: Dag<u32> = Dag::new();
        walker()
            .walk(&dag, |_| async { Ok::<(), ()>(()) })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_walk_visits_every_vertex() {
        let mut dag = Dag::new();
        dag.connect("a", "b");
        dag.connect("a", "c");
        dag.connect("b", "d");
        dag.connect("c", "d");

        let visited = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&visited);
        walker()
            .walk(&dag, move |v| {
                let recorder = Arc::clone(&recorder);
                async move {
                    recorder.lock().unwrap().push(v);
                    Ok::<(), ()>(())
                }
            })
            .await
            .unwrap();

        let mut visited = visited.lock().unwrap().clone();
        visited.sort_unstable();
        assert_eq!(visited, vec!["a", "b", "c", "d"]);
    }

    #[tokio::test]
    async fn test_walk_respects_dependency_order() {
        let mut dag = Dag::new();
        dag.connect("a", "b");
        dag.connect("a", "c");
        dag.connect("b", "d");
        dag.connect("c", "d");

        // Record start/finish sequence numbers per vertex.
        let events = Arc::new(Mutex::new((0_u64, Vec::new())));
        let recorder = Arc::clone(&events);
        walker()
            .walk(&dag, move |v| {
                let recorder = Arc::clone(&recorder);
                async move {
                    {
                        let mut guard = recorder.lock().unwrap();
                        guard.0 += 1;
                        let tick = guard.0;
                        guard.1.push((v, "start", tick));
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    {
                        let mut guard = recorder.lock().unwrap();
                        guard.0 += 1;
                        let tick = guard.0;
                        guard.1.push((v, "finish", tick));
                    }
                    Ok::<(), ()>(())
                }
            })
            .await
            .unwrap();

        let log = events.lock().unwrap().1.clone();
        let tick_of = |vertex: &str, kind: &str| {
            log.iter()
                .find(|(v, k, _)| *v == vertex && *k == kind)
                .map(|(_, _, t)| *t)
                .unwrap()
        };

        // Every source starts only after its targets finished.
        for edge in dag.edges().iter() {
            assert!(tick_of(edge.target(), "finish") < tick_of(edge.source(), "start"));
        }
    }

    #[tokio::test]
    async fn test_walk_bounds_concurrency() {
        let mut dag = Dag::new();
        for i in 0..20_u32 {
            dag.add_vertex(i);
        }

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let walker = Walker::new(WalkerConfig::new().with_max_parallel(3));
        let (in_flight_ref, peak_ref) = (Arc::clone(&in_flight), Arc::clone(&peak));
        walker
            .walk(&dag, move |_| {
                let in_flight = Arc::clone(&in_flight_ref);
                let peak = Arc::clone(&peak_ref);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), ()>(())
                }
            })
            .await
            .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_walk_failure_stops_dependents() {
        let mut dag = Dag::new();
        dag.connect("top", "failing");
        dag.connect("failing", "base");

        let visited = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&visited);
        let result = walker()
            .walk(&dag, move |v| {
                let recorder = Arc::clone(&recorder);
                async move {
                    recorder.lock().unwrap().push(v);
                    if v == "failing" { Err("boom") } else { Ok(()) }
                }
            })
            .await;

        let error = result.unwrap_err();
        assert_eq!(error.failures().len(), 1);
        assert_eq!(error.failures()[0], ("failing", "boom"));

        // "top" depends on the failed vertex and must never start.
        let visited = visited.lock().unwrap();
        assert!(visited.contains(&"base"));
        assert!(visited.contains(&"failing"));
        assert!(!visited.contains(&"top"));
    }

    #[tokio::test]
    async fn test_walk_collects_independent_failures() {
        let mut dag = Dag::new();
        dag.add_vertex("a");
        dag.add_vertex("b");
        dag.add_vertex("c");

        let result = Walker::new(WalkerConfig::new().with_max_parallel(1))
            .walk(&dag, |v| async move {
                if v == "c" { Ok(()) } else { Err(format!("{v} failed")) }
            })
            .await;

        let failures = result.unwrap_err().into_failures();
        assert_eq!(failures.len(), 2);
    }

    #[tokio::test]
    async fn test_walk_on_cycle_returns_without_hanging() {
        let mut dag = Dag::new();
        dag.connect(1, 2);
        dag.connect(2, 1);
        dag.connect(2, 3);

        // Documented-precondition violation: the cycle is never dispatched,
        // but the walk still terminates.
        walker()
            .walk(&dag, |_| async { Ok::<(), ()>(()) })
            .await
            .unwrap();
    }
}
