//! Exploration memory
//!
//! Positions seen by the autonomous agents. The random agent uses it for
//! loop avoidance and renderers draw it as a heat map.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::grid::Position;

/// Set of visited positions, serialized as a sorted list
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Position>", into = "Vec<Position>")]
pub struct VisitedSet {
    positions: HashSet<Position>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position, returns true if it was new
    pub fn insert(&mut self, pos: Position) -> bool {
        self.positions.insert(pos)
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.positions.contains(&pos)
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Position> + '_ {
        self.positions.iter().copied()
    }

    /// Positions in `(x, y)` order
    pub fn to_sorted_vec(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self.iter().collect();
        positions.sort_unstable();
        positions
    }
}

impl From<Vec<Position>> for VisitedSet {
    fn from(positions: Vec<Position>) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }
}

impl From<VisitedSet> for Vec<Position> {
    fn from(set: VisitedSet) -> Self {
        set.to_sorted_vec()
    }
}

impl FromIterator<Position> for VisitedSet {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_clear() {
        let mut set = VisitedSet::new();
        assert!(set.insert(Position::new(1, 2)));
        assert!(!set.insert(Position::new(1, 2)));
        assert!(set.contains(Position::new(1, 2)));
        assert_eq!(set.len(), 1);

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_serializes_as_sorted_list() {
        let set: VisitedSet = [Position::new(2, 0), Position::new(0, 1), Position::new(0, 0)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[{"x":0,"y":0},{"x":0,"y":1},{"x":2,"y":0}]"#);

        let back: VisitedSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
