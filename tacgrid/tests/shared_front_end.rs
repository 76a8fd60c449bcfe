// Integration tests for `SharedNavGrid`: background searches racing a
// writer, stale-answer detection, cancellation, and lock poisoning.

use std::panic::{self, AssertUnwindSafe};
use std::thread;
use tacgrid::terrain::SolidField;
use tacgrid::{CancelToken, CellCoord, GridConfig, GridError, NavGrid, SharedNavGrid};

fn c(x: i32, y: i32, z: i32) -> CellCoord {
    CellCoord::new(x, y, z)
}

fn shared_floor(sx: u32, sz: u32) -> SharedNavGrid {
    let terrain = SolidField::new(sx, 1, sz).with_bedrock(true);
    let mut nav = NavGrid::new(GridConfig::with_dimensions(sx, 1, sz), Box::new(terrain.clone()))
        .unwrap();
    nav.classify(&terrain);
    nav.rebuild_graph();
    SharedNavGrid::new(nav)
}

// ---------------------------------------------------------------------------
// Generations and staleness
// ---------------------------------------------------------------------------

#[test]
fn answers_survive_no_op_writes() {
    let shared = shared_floor(5, 5);
    let answer = shared
        .spawn_find_path(c(0, 0, 0), c(4, 0, 4), false, CancelToken::new())
        .wait()
        .unwrap();

    // Re-deriving an unchanged neighbourhood mutates nothing.
    let report = shared.write(|g| g.update_neighborhood(c(2, 0, 2))).unwrap();
    assert!(report.is_noop());
    shared.validate(&answer).unwrap();
}

#[test]
fn door_toggle_invalidates_and_recovers() {
    let shared = shared_floor(3, 1);
    let open = shared
        .spawn_is_path_possible(c(0, 0, 0), c(2, 0, 0), false, CancelToken::new())
        .wait()
        .unwrap();
    assert!(open.value);

    shared.write(|g| g.set_obstructed(c(1, 0, 0), true)).unwrap();
    assert!(matches!(shared.validate(&open), Err(GridError::StaleGraph { .. })));

    let closed = shared
        .spawn_is_path_possible(c(0, 0, 0), c(2, 0, 0), false, CancelToken::new())
        .wait()
        .unwrap();
    assert!(!closed.value);

    shared.write(|g| g.set_obstructed(c(1, 0, 0), false)).unwrap();
    let reopened = shared
        .spawn_is_path_possible(c(0, 0, 0), c(2, 0, 0), false, CancelToken::new())
        .wait()
        .unwrap();
    assert!(reopened.value);
    assert!(reopened.generation > open.generation);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn readers_and_writer_interleave_safely() {
    let shared = shared_floor(12, 12);
    let writer = {
        let shared = shared.clone();
        thread::spawn(move || {
            for z in 0..12 {
                shared.write(|g| g.set_obstructed(c(6, 0, z), z % 2 == 0)).unwrap();
            }
        })
    };
    let tasks: Vec<_> = (0..16)
        .map(|i| shared.spawn_find_path(c(0, 0, i % 12), c(11, 0, 11), true, CancelToken::new()))
        .collect();
    for task in tasks {
        let answer = task.wait().unwrap();
        // Odd z rows stay open at every generation, so a path always exists.
        assert!(!answer.value.is_empty());
        assert!(answer.value.last().unwrap().is_adjacent(c(11, 0, 11)));
    }
    writer.join().unwrap();

    let generation = shared.generation().unwrap();
    let answer = shared
        .spawn_find_path(c(0, 0, 0), c(11, 0, 0), false, CancelToken::new())
        .wait()
        .unwrap();
    assert_eq!(answer.generation, generation);
    assert!(answer.value.iter().all(|p| p.x != 6 || p.z % 2 == 1));
}

#[test]
fn cancelling_a_finished_task_is_harmless() {
    let shared = shared_floor(4, 4);
    let task = shared.spawn_find_path(c(0, 0, 0), c(3, 0, 3), false, CancelToken::new());
    while !task.is_finished() {
        thread::yield_now();
    }
    task.cancel();
    assert_eq!(task.wait().unwrap().value.last(), Some(&c(3, 0, 3)));
}

// ---------------------------------------------------------------------------
// Poisoning
// ---------------------------------------------------------------------------

#[test]
fn panicking_writer_poisons_the_grid() {
    let shared = shared_floor(3, 3);
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _: Result<(), GridError> = shared.write(|g| {
            g.set_obstructed(c(1, 0, 1), true);
            panic!("writer failed mid-update");
        });
    }));
    assert!(result.is_err());

    assert!(matches!(shared.generation(), Err(GridError::LockPoisoned)));
    assert!(matches!(shared.read(NavGrid::edge_count), Err(GridError::LockPoisoned)));
    let task = shared.spawn_find_path(c(0, 0, 0), c(2, 0, 2), false, CancelToken::new());
    assert!(matches!(task.wait(), Err(GridError::LockPoisoned)));
}
