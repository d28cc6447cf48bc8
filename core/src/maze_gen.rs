//! Maze generation using Recursive Backtracker algorithm
//!
//! Algorithm: Recursive Backtracker (DFS with backtracking), iterative
//! with an explicit stack so large grids cannot exhaust the call stack.
//! 1. Start at (0, 0), mark as visited
//! 2. While the stack is not empty:
//!    - Peek the cell on top of the stack
//!    - Walk its remaining directions in a Fisher–Yates shuffled order
//!    - First unvisited in-bounds neighbor: open the wall, mark it visited,
//!      push it
//!    - No directions left: backtrack (pop)
//!
//! Each frame keeps its own shuffled direction list and a cursor into it,
//! which is exactly the order a recursive implementation would try them in.
//! The result is a spanning tree over all cells: a perfect maze.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::MazeError;
use crate::grid::{Direction, Grid, Position};

/// One pending cell on the backtracking stack
struct Frame {
    pos: Position,
    directions: [Direction; 4],
    next: usize,
}

impl Frame {
    fn new<R: Rng + ?Sized>(pos: Position, rng: &mut R) -> Self {
        let mut directions = Direction::ALL;
        directions.shuffle(rng);
        Self {
            pos,
            directions,
            next: 0,
        }
    }
}

/// Generate a perfect maze of `rows × cols` cells
///
/// # Returns
/// A freshly carved grid where every cell is reachable from (0, 0) and
/// there are exactly `rows * cols - 1` passages.
pub fn generate<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Result<Grid, MazeError> {
    let mut grid = Grid::new(rows, cols)?;
    recursive_backtracker(&mut grid, rng)?;
    grid.clear_visited();

    tracing::debug!(
        "Generated {}x{} maze with {} passages",
        rows,
        cols,
        grid.passage_count()
    );
    Ok(grid)
}

/// Generate a maze from a seed (deterministic)
///
/// Same seed and dimensions always produce the same maze, so a stored seed
/// is enough to rebuild a grid.
pub fn generate_seeded(rows: usize, cols: usize, seed: u64) -> Result<Grid, MazeError> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate(rows, cols, &mut rng)
}

fn recursive_backtracker<R: Rng + ?Sized>(grid: &mut Grid, rng: &mut R) -> Result<(), MazeError> {
    let start = Position::ORIGIN;
    grid.mark_visited(start);

    let mut stack = Vec::with_capacity(grid.rows() * grid.cols());
    stack.push(Frame::new(start, rng));

    while let Some(frame) = stack.last_mut() {
        if frame.next == frame.directions.len() {
            // All directions tried, backtrack
            stack.pop();
            continue;
        }

        let dir = frame.directions[frame.next];
        frame.next += 1;
        let current = frame.pos;

        let Some(next) = grid.neighbor(current, dir) else {
            continue;
        };
        if grid.is_visited(next) {
            continue;
        }

        // Remove walls between current cell and neighbor
        grid.open_passage(current, dir)?;
        grid.mark_visited(next);
        stack.push(Frame::new(next, rng));
    }

    Ok(())
}
