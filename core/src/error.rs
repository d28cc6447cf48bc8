//! Error types for maze-core.

use crate::grid::{Direction, Position};
use thiserror::Error;

/// Configuration violations rejected before any game state is touched.
///
/// Normal gameplay never produces an error: walking into a wall is a no-op
/// and an unreachable goal stalls the smart agent instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MazeError {
    /// A maze dimension is zero or larger than `MAX_MAZE_DIMENSION`.
    #[error("invalid maze dimensions: {rows}x{cols}")]
    InvalidDimensions {
        /// Requested row count.
        rows: usize,
        /// Requested column count.
        cols: usize,
    },

    /// A position lies outside the grid.
    #[error("position {position} is outside a {rows}x{cols} grid")]
    OutOfBounds {
        /// Offending position.
        position: Position,
        /// Grid row count.
        rows: usize,
        /// Grid column count.
        cols: usize,
    },

    /// A passage was requested across the outer boundary.
    #[error("no neighbor {direction} of {position}")]
    NoNeighbor {
        /// Cell the passage starts from.
        position: Position,
        /// Direction pointing off the grid.
        direction: Direction,
    },

    /// Speed multiplier is not a positive finite number.
    #[error("invalid speed multiplier: {0}")]
    InvalidSpeed(f64),

    /// A timing setting is unusable.
    #[error("invalid timing configuration: {0}")]
    InvalidTiming(&'static str),

    /// Deserialized grid data breaks the wall-pairing invariant.
    #[error("corrupt grid: {0}")]
    CorruptGrid(&'static str),

    /// Snapshot written by an unknown format version.
    #[error("unsupported snapshot version {0}")]
    UnsupportedSnapshot(u32),
}
