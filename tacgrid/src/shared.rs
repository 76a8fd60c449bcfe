// Thread-safe front end: shared grid, background searches, stale detection.
//
// `SharedNavGrid` wraps a `NavGrid` in `Arc<RwLock<_>>`:
//
// - Writers go through `write(|grid| ...)` and hold the lock exclusively for
//   the duration of the closure. Every graph mutation made inside bumps the
//   graph generation.
// - Background searches (`spawn_find_path`, `spawn_is_path_possible`) run on
//   their own thread and hold a read lock for the whole search. A writer
//   therefore cannot interleave with an in-flight search; it waits for the
//   search to finish. Any number of searches can run concurrently.
//
// Each answer carries the generation it was computed against. By the time a
// caller looks at it a writer may have run, so `validate(&answer)` compares
// that generation with the current one and reports `StaleGraph` if they
// differ. Whether to retry is the caller's decision.
//
// Cancellation is cooperative: the task's `CancelToken` is checked before the
// search starts and every `cancel_poll_interval` expansions. A cancelled task
// resolves to `GridError::Cancelled`.
//
// A writer that panics poisons the lock; every later access reports
// `LockPoisoned` rather than reading possibly half-updated state.
//
// See also: `nav_grid.rs` for the wrapped manager, `pathfinding.rs` for the
// search and the `CancelToken`.

use crate::error::GridError;
use crate::nav_grid::NavGrid;
use crate::pathfinding::CancelToken;
use crate::types::CellCoord;
use std::sync::{Arc, RwLock};
use std::thread;

/// A query result tagged with the graph generation it was computed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathAnswer<T> {
    pub value: T,
    pub generation: u64,
}

/// Handle to a background search.
pub struct PathTask<T> {
    cancel: CancelToken,
    handle: thread::JoinHandle<Result<PathAnswer<T>, GridError>>,
}

impl<T> PathTask<T> {
    /// Ask the search to stop at its next poll.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the search completes.
    pub fn wait(self) -> Result<PathAnswer<T>, GridError> {
        self.handle.join().map_err(|_| GridError::WorkerPanicked)?
    }
}

/// `NavGrid` shared between a writer and concurrent readers.
#[derive(Clone)]
pub struct SharedNavGrid {
    inner: Arc<RwLock<NavGrid>>,
}

impl SharedNavGrid {
    pub fn new(grid: NavGrid) -> Self {
        Self {
            inner: Arc::new(RwLock::new(grid)),
        }
    }

    /// Run `f` with shared access.
    pub fn read<R>(&self, f: impl FnOnce(&NavGrid) -> R) -> Result<R, GridError> {
        let guard = self.inner.read().map_err(|_| GridError::LockPoisoned)?;
        Ok(f(&*guard))
    }

    /// Run `f` with exclusive access. Blocks until in-flight searches finish.
    pub fn write<R>(&self, f: impl FnOnce(&mut NavGrid) -> R) -> Result<R, GridError> {
        let mut guard = self.inner.write().map_err(|_| GridError::LockPoisoned)?;
        Ok(f(&mut *guard))
    }

    pub fn generation(&self) -> Result<u64, GridError> {
        self.read(NavGrid::generation)
    }

    /// `Ok` if the graph has not changed since `answer` was computed.
    pub fn validate<T>(&self, answer: &PathAnswer<T>) -> Result<(), GridError> {
        let found = self.generation()?;
        if found == answer.generation {
            Ok(())
        } else {
            Err(GridError::StaleGraph {
                expected: answer.generation,
                found,
            })
        }
    }

    /// Search for a path on a background thread.
    pub fn spawn_find_path(
        &self,
        start: CellCoord,
        goal: CellCoord,
        adjacent_is_valid: bool,
        cancel: CancelToken,
    ) -> PathTask<Vec<CellCoord>> {
        self.spawn(cancel, move |grid, token| {
            grid.find_path_cancellable(start, goal, adjacent_is_valid, token)
                .into_path()
        })
    }

    /// Check reachability on a background thread.
    pub fn spawn_is_path_possible(
        &self,
        start: CellCoord,
        goal: CellCoord,
        adjacent_is_valid: bool,
        cancel: CancelToken,
    ) -> PathTask<bool> {
        self.spawn(cancel, move |grid, token| {
            grid.is_path_possible_cancellable(start, goal, adjacent_is_valid, token)
        })
    }

    fn spawn<T, F>(&self, cancel: CancelToken, query: F) -> PathTask<T>
    where
        T: Send + 'static,
        F: FnOnce(&NavGrid, &CancelToken) -> Result<T, GridError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let handle = thread::spawn(move || -> Result<PathAnswer<T>, GridError> {
            let guard = inner.read().map_err(|_| GridError::LockPoisoned)?;
            let generation = guard.generation();
            let value = query(&*guard, &token)?;
            Ok(PathAnswer { value, generation })
        });
        PathTask { cancel, handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellFlags;
    use crate::config::GridConfig;
    use crate::corridor::NoObstacles;

    fn c(x: i32, y: i32, z: i32) -> CellCoord {
        CellCoord::new(x, y, z)
    }

    fn shared_floor(sx: u32, sz: u32) -> SharedNavGrid {
        let config = GridConfig::with_dimensions(sx, 1, sz);
        let mut nav = NavGrid::new(config, Box::new(NoObstacles)).unwrap();
        let far = c(sx as i32 - 1, 0, sz as i32 - 1);
        nav.apply_area_override(c(0, 0, 0), far, CellFlags::GROUND);
        SharedNavGrid::new(nav)
    }

    #[test]
    fn background_search_matches_direct_search() {
        let shared = shared_floor(6, 6);
        let direct = shared.read(|g| g.find_path(c(0, 0, 0), c(5, 0, 3), false)).unwrap();
        let answer = shared
            .spawn_find_path(c(0, 0, 0), c(5, 0, 3), false, CancelToken::new())
            .wait()
            .unwrap();
        assert_eq!(answer.value, direct);
        shared.validate(&answer).unwrap();
    }

    #[test]
    fn mutation_makes_answer_stale() {
        let shared = shared_floor(4, 1);
        let answer = shared
            .spawn_is_path_possible(c(0, 0, 0), c(3, 0, 0), false, CancelToken::new())
            .wait()
            .unwrap();
        assert!(answer.value);

        shared.write(|g| g.set_obstructed(c(1, 0, 0), true)).unwrap();
        match shared.validate(&answer) {
            Err(GridError::StaleGraph { expected, found }) => {
                assert_eq!(expected, answer.generation);
                assert!(found > expected);
            }
            other => panic!("expected stale graph, got {other:?}"),
        }
        let fresh = shared
            .spawn_is_path_possible(c(0, 0, 0), c(3, 0, 0), false, CancelToken::new())
            .wait()
            .unwrap();
        assert!(!fresh.value);
        shared.validate(&fresh).unwrap();
    }

    #[test]
    fn pre_cancelled_task_reports_cancelled() {
        let shared = shared_floor(4, 4);
        let token = CancelToken::new();
        token.cancel();
        let task = shared.spawn_find_path(c(0, 0, 0), c(3, 0, 3), false, token);
        assert!(matches!(task.wait(), Err(GridError::Cancelled)));
    }

    #[test]
    fn concurrent_readers() {
        let shared = shared_floor(8, 8);
        let tasks: Vec<_> = (0..8)
            .map(|z| shared.spawn_find_path(c(0, 0, 0), c(7, 0, z), false, CancelToken::new()))
            .collect();
        for (z, task) in tasks.into_iter().enumerate() {
            let answer = task.wait().unwrap();
            assert_eq!(answer.value.last(), Some(&c(7, 0, z as i32)));
        }
    }
}
