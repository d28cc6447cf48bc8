//! Maze cell storage and adjacency queries
//!
//! A grid is `rows × cols` cells, each carrying four walls indexed
//! `[NORTH, EAST, SOUTH, WEST]`. Walls are only ever removed in matched
//! pairs, so a passage is always open from both sides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MazeError;

/// One of the four wall directions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    /// All directions in wall-index order
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Wall index of this direction (0..4)
    pub fn index(self) -> usize {
        self as usize
    }

    /// The direction facing back, `(d + 2) mod 4`
    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 2) % 4]
    }

    /// Column and row deltas for one step
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::North => write!(f, "north"),
            Direction::East => write!(f, "east"),
            Direction::South => write!(f, "south"),
            Direction::West => write!(f, "west"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "north" | "up" | "n" => Ok(Direction::North),
            "east" | "right" | "e" => Ok(Direction::East),
            "south" | "down" | "s" => Ok(Direction::South),
            "west" | "left" | "w" => Ok(Direction::West),
            _ => Err(format!(
                "Invalid direction: '{}'. Use up, down, left, right or a compass name",
                s
            )),
        }
    }
}

/// Cell coordinates, `x` is the column and `y` the row
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another position
    pub fn manhattan(self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A cell in the maze with walls in four directions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// `[NORTH, EAST, SOUTH, WEST]`, true = wall present
    pub walls: [bool; 4],
    /// Generation scratch flag, meaningless once a maze is carved
    #[serde(skip)]
    pub visited: bool,
}

impl Cell {
    fn new() -> Self {
        Self {
            walls: [true, true, true, true], // All walls present initially
            visited: false,
        }
    }

    pub fn has_wall(&self, direction: Direction) -> bool {
        self.walls[direction.index()]
    }
}

/// Rectangular maze grid
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// Row-major, `cells[y * cols + x]`
    cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid with every wall closed and every cell unvisited
    pub fn new(rows: usize, cols: usize) -> Result<Self, MazeError> {
        crate::config::validate_dimensions(rows, cols)?;
        Ok(Self {
            rows,
            cols,
            cells: vec![Cell::new(); rows * cols],
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The goal cell, bottom-right corner
    pub fn exit(&self) -> Position {
        Position::new(self.cols - 1, self.rows - 1)
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.cols && pos.y < self.rows
    }

    /// Reject positions outside the grid
    pub fn check(&self, pos: Position) -> Result<(), MazeError> {
        if self.contains(pos) {
            Ok(())
        } else {
            Err(MazeError::OutOfBounds {
                position: pos,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    /// Cell at `pos`. Panics if `pos` is outside the grid.
    pub fn cell(&self, pos: Position) -> &Cell {
        &self.cells[pos.y * self.cols + pos.x]
    }

    fn cell_mut(&mut self, pos: Position) -> &mut Cell {
        &mut self.cells[pos.y * self.cols + pos.x]
    }

    /// Neighbor cell in `direction`, none when it would leave the grid
    pub fn neighbor(&self, pos: Position, direction: Direction) -> Option<Position> {
        let (dx, dy) = direction.delta();
        let x = pos.x.checked_add_signed(dx)?;
        let y = pos.y.checked_add_signed(dy)?;
        let next = Position::new(x, y);
        self.contains(next).then_some(next)
    }

    pub fn has_passage(&self, pos: Position, direction: Direction) -> bool {
        !self.cell(pos).has_wall(direction)
    }

    /// Neighbor in `direction` if the wall between them is open
    pub fn step(&self, pos: Position, direction: Direction) -> Option<Position> {
        if self.has_passage(pos, direction) {
            self.neighbor(pos, direction)
        } else {
            None
        }
    }

    /// Open the wall between `pos` and its neighbor in `direction` on both sides
    pub fn open_passage(
        &mut self,
        pos: Position,
        direction: Direction,
    ) -> Result<Position, MazeError> {
        self.check(pos)?;
        let next = self
            .neighbor(pos, direction)
            .ok_or(MazeError::NoNeighbor { position: pos, direction })?;

        self.cell_mut(pos).walls[direction.index()] = false;
        self.cell_mut(next).walls[direction.opposite().index()] = false;
        Ok(next)
    }

    /// Directions and neighbors reachable from `pos` through open walls,
    /// in wall-index order
    pub fn open_neighbors(
        &self,
        pos: Position,
    ) -> impl Iterator<Item = (Direction, Position)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.step(pos, dir).map(|next| (dir, next)))
    }

    /// True when `from` and `to` are adjacent through an open passage
    pub fn opens_onto(&self, from: Position, to: Position) -> bool {
        self.open_neighbors(from).any(|(_, next)| next == to)
    }

    /// Number of open passages, each counted once
    pub fn passage_count(&self) -> usize {
        // Count only east and south walls so every passage is seen once
        self.cells
            .iter()
            .map(|cell| {
                usize::from(!cell.has_wall(Direction::East))
                    + usize::from(!cell.has_wall(Direction::South))
            })
            .sum()
    }

    /// Check data that did not come from `Grid::new` (deserialized grids)
    ///
    /// Dimensions must be valid, the cell count must match, boundary walls
    /// must be closed and every open wall must be open from both sides.
    pub fn validate(&self) -> Result<(), MazeError> {
        crate::config::validate_dimensions(self.rows, self.cols)?;
        if self.cells.len() != self.rows * self.cols {
            return Err(MazeError::CorruptGrid("cell count does not match dimensions"));
        }

        for y in 0..self.rows {
            for x in 0..self.cols {
                let pos = Position::new(x, y);
                for dir in Direction::ALL {
                    if !self.has_passage(pos, dir) {
                        continue;
                    }
                    match self.neighbor(pos, dir) {
                        None => {
                            return Err(MazeError::CorruptGrid("open wall on the outer boundary"));
                        }
                        Some(next) if !self.has_passage(next, dir.opposite()) => {
                            return Err(MazeError::CorruptGrid("one-sided passage"));
                        }
                        Some(_) => {}
                    }
                }
            }
        }
        Ok(())
    }

    /// True when every cell is reachable and there are no loops
    pub fn is_perfect(&self) -> bool {
        if self.passage_count() + 1 != self.cells.len() {
            return false;
        }
        let mut seen = vec![false; self.cells.len()];
        let mut stack = vec![Position::ORIGIN];
        seen[0] = true;
        let mut reached = 1;
        while let Some(pos) = stack.pop() {
            for (_, next) in self.open_neighbors(pos) {
                let index = next.y * self.cols + next.x;
                if !seen[index] {
                    seen[index] = true;
                    reached += 1;
                    stack.push(next);
                }
            }
        }
        reached == self.cells.len()
    }

    pub(crate) fn mark_visited(&mut self, pos: Position) {
        self.cell_mut(pos).visited = true;
    }

    pub(crate) fn is_visited(&self, pos: Position) -> bool {
        self.cell(pos).visited
    }

    pub(crate) fn clear_visited(&mut self) {
        for cell in &mut self.cells {
            cell.visited = false;
        }
    }

    /// Convert the maze to its binary raster representation
    ///
    /// Creates a grid where:
    /// - 0 = wall
    /// - 1 = path (walkable cell or open passage)
    ///
    /// For a maze with R rows and C columns the raster is (R*2 + 1) × (C*2 + 1)
    /// and cell centers sit at (row*2+1, col*2+1). Indexed `[row][col]`.
    pub fn to_binary_grid(&self) -> Vec<Vec<u8>> {
        let mut grid = vec![vec![0u8; self.cols * 2 + 1]; self.rows * 2 + 1];

        for row in 0..self.rows {
            for col in 0..self.cols {
                let cell = self.cell(Position::new(col, row));

                // Cell center position in grid
                let gr = row * 2 + 1;
                let gc = col * 2 + 1;

                // Cell center is always a path
                grid[gr][gc] = 1;

                // Open passages based on walls
                if !cell.has_wall(Direction::North) {
                    grid[gr - 1][gc] = 1;
                }
                if !cell.has_wall(Direction::South) {
                    grid[gr + 1][gc] = 1;
                }
                if !cell.has_wall(Direction::East) {
                    grid[gr][gc + 1] = 1;
                }
                if !cell.has_wall(Direction::West) {
                    grid[gr][gc - 1] = 1;
                }
            }
        }

        grid
    }
}
