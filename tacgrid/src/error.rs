// Error type for the fallible edges of the crate.
//
// Lookups and path queries never fail: a missing cell is `None`, an
// unreachable goal is an empty path. `GridError` covers the places where
// something genuinely went wrong: bad configuration or map data, I/O, and the
// shared front end (cancelled or stale searches, poisoned locks).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid dimensions {x}x{y}x{z} are invalid")]
    InvalidDimensions { x: u32, y: u32, z: u32 },

    #[error("cell size must be finite and positive, got {0}")]
    InvalidCellSize(f32),

    #[error("invalid `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("malformed map: {0}")]
    MalformedMap(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("search was cancelled")]
    Cancelled,

    #[error("graph changed since the query ran (generation {found}, expected {expected})")]
    StaleGraph { expected: u64, found: u64 },

    #[error("grid lock poisoned by a panicking writer")]
    LockPoisoned,

    #[error("background search thread panicked")]
    WorkerPanicked,
}
