//! Shortest routes through a maze
//!
//! Breadth-first search over open passages. Neighbors are expanded in
//! wall-index order (NORTH, EAST, SOUTH, WEST), so when several shortest
//! routes exist the same one is always returned.

use std::collections::{HashMap, VecDeque};

use crate::grid::{Direction, Grid, Position};

/// Ordered positions from a start cell to a goal cell, both inclusive
pub type Path = Vec<Position>;

/// Find a fewest-steps route from `start` to `goal`
///
/// Returns an empty path if the goal cannot be reached, or if either end
/// lies outside the grid. `start == goal` yields `[start]`.
pub fn find_path(grid: &Grid, start: Position, goal: Position) -> Path {
    if !grid.contains(start) || !grid.contains(goal) {
        return Vec::new();
    }

    // Parent pointers double as the visited set; start points at itself
    let mut parent: HashMap<Position, Position> = HashMap::from([(start, start)]);
    let mut queue = VecDeque::from([start]);

    while let Some(pos) = queue.pop_front() {
        if pos == goal {
            return reconstruct(&parent, start, goal);
        }

        for (_, next) in grid.open_neighbors(pos) {
            if !parent.contains_key(&next) {
                parent.insert(next, pos);
                queue.push_back(next);
            }
        }
    }

    Vec::new()
}

fn reconstruct(parent: &HashMap<Position, Position>, start: Position, goal: Position) -> Path {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = parent[&current];
        path.push(current);
    }
    path.reverse();
    path
}

/// Directions that walk `path` step by step
///
/// Consecutive positions that are not orthogonal neighbors are skipped.
pub fn path_to_moves(path: &[Position]) -> Vec<Direction> {
    path.windows(2)
        .filter_map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            Direction::ALL.into_iter().find(|dir| {
                let (dx, dy) = dir.delta();
                from.x.checked_add_signed(dx) == Some(to.x)
                    && from.y.checked_add_signed(dy) == Some(to.y)
            })
        })
        .collect()
}

/// Check that every position is on the grid and every step crosses an
/// open passage
pub fn is_valid_path(grid: &Grid, path: &[Position]) -> bool {
    if !path.iter().all(|&pos| grid.contains(pos)) {
        return false;
    }
    path.windows(2).all(|pair| grid.opens_onto(pair[0], pair[1]))
}
