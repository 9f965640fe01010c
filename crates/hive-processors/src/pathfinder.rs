//! Tile pathfinding.
//!
//! [`GridPathFinder`] runs A* over room tiles. The open set is a
//! `BTreeSet` ordered by `(f, h, insertion order, node)`, so equal-cost
//! ties resolve the same way on every run. Walking off an exit tile
//! continues on the opposite edge of the neighbouring room when that
//! room's terrain is loaded and the room budget allows it.
//!
//! A search that cannot reach a goal is not an error: it returns the path
//! to the closest node it found with `incomplete` set.

use std::collections::{BTreeMap, BTreeSet};

use hive_types::{Direction, Position, RoomName, RoomTerrain, TerrainType, ROOM_SIZE};

use crate::error::PathFinderError;

/// A tile in a specific room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomPosition {
    /// Room.
    pub room: RoomName,
    /// Tile inside the room.
    pub pos: Position,
}

impl RoomPosition {
    /// A tile of `room`.
    pub const fn new(room: RoomName, pos: Position) -> Self {
        Self { room, pos }
    }

    /// World tile coordinates, continuous across room borders.
    fn world(&self) -> Option<(i64, i64)> {
        let (rx, ry) = self.room.coordinates()?;
        let size = i64::from(ROOM_SIZE);
        Some((
            rx.checked_mul(size)?.checked_add(i64::from(self.pos.x))?,
            ry.checked_mul(size)?.checked_add(i64::from(self.pos.y))?,
        ))
    }

    /// Chebyshev distance in tiles, across rooms when both names parse.
    pub fn range_to(&self, other: &Self) -> u32 {
        if self.room == other.room {
            return u32::from(self.pos.range_to(other.pos));
        }
        match (self.world(), other.world()) {
            (Some((ax, ay)), Some((bx, by))) => {
                let range = ax.abs_diff(bx).max(ay.abs_diff(by));
                u32::try_from(range).unwrap_or(u32::MAX)
            }
            _ => u32::MAX,
        }
    }
}

/// Something to move toward (or away from, when fleeing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathGoal {
    /// Goal tile.
    pub target: RoomPosition,
    /// Acceptable distance from the tile.
    pub range: u8,
}

/// Cost value marking a tile impassable.
pub const BLOCKED: u8 = u8::MAX;

/// Per-room cost overrides. Zero keeps the terrain cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostMatrix {
    costs: Vec<u8>,
}

impl Default for CostMatrix {
    fn default() -> Self {
        let size = usize::from(ROOM_SIZE).saturating_mul(usize::from(ROOM_SIZE));
        Self {
            costs: vec![0; size],
        }
    }
}

impl CostMatrix {
    /// A matrix that overrides nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the cost of one tile.
    pub fn set(&mut self, pos: Position, cost: u8) {
        if let Some(slot) = self.costs.get_mut(pos.index()) {
            *slot = cost;
        }
    }

    /// Mark a tile impassable.
    pub fn block(&mut self, pos: Position) {
        self.set(pos, BLOCKED);
    }

    /// Override at `pos`, zero when none.
    pub fn get(&self, pos: Position) -> u8 {
        self.costs.get(pos.index()).copied().unwrap_or(0)
    }
}

/// Per-room cost matrix provider.
pub type RoomCallback<'a> = &'a dyn Fn(&RoomName) -> Option<CostMatrix>;

/// Search tuning.
pub struct SearchOptions<'a> {
    /// Cost of a plain tile.
    pub plain_cost: u32,
    /// Cost of a swamp tile.
    pub swamp_cost: u32,
    /// Move away from the goals instead of toward them.
    pub flee: bool,
    /// Most rooms the search may enter, the origin included.
    pub max_rooms: usize,
    /// Node expansion budget.
    pub max_ops: u32,
    /// Cost matrix for each room entered, asked once per room.
    pub room_callback: Option<RoomCallback<'a>>,
}

impl Default for SearchOptions<'_> {
    fn default() -> Self {
        Self {
            plain_cost: 1,
            swamp_cost: 5,
            flee: false,
            max_rooms: 16,
            max_ops: 2000,
            room_callback: None,
        }
    }
}

/// Outcome of a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Tiles to walk, origin excluded.
    pub path: Vec<RoomPosition>,
    /// Nodes expanded.
    pub ops: u32,
    /// Total path cost.
    pub cost: u32,
    /// Whether the path stops short of every goal.
    pub incomplete: bool,
}

/// Pathfinding over room tiles.
pub trait PathFinder: Send + Sync {
    /// Find a path from `origin` to any of `goals`.
    fn search(
        &self,
        origin: &RoomPosition,
        goals: &[PathGoal],
        options: &SearchOptions<'_>,
    ) -> Result<SearchResult, PathFinderError>;
}

/// Software A* over loaded room terrain.
#[derive(Debug, Clone, Default)]
pub struct GridPathFinder {
    terrain: BTreeMap<RoomName, RoomTerrain>,
}

impl GridPathFinder {
    /// A pathfinder that knows no rooms yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add terrain for `room`.
    #[must_use]
    pub fn with_room(mut self, room: RoomName, terrain: RoomTerrain) -> Self {
        self.insert_room(room, terrain);
        self
    }

    /// Add or replace terrain for `room`.
    pub fn insert_room(&mut self, room: RoomName, terrain: RoomTerrain) {
        self.terrain.insert(room, terrain);
    }

    /// Whether terrain for `room` is loaded.
    pub fn has_room(&self, room: &RoomName) -> bool {
        self.terrain.contains_key(room)
    }
}

/// Open-set entry: `(f, h, insertion order, node)`.
type OpenEntry = (u32, u32, u64, RoomPosition);

struct Search<'s, 'o> {
    finder: &'s GridPathFinder,
    goals: &'s [PathGoal],
    options: &'s SearchOptions<'o>,
    matrices: BTreeMap<RoomName, Option<CostMatrix>>,
}

impl Search<'_, '_> {
    fn heuristic(&self, node: &RoomPosition) -> u32 {
        if self.options.flee {
            self.goals
                .iter()
                .map(|g| u32::from(g.range).saturating_sub(node.range_to(&g.target)))
                .fold(0, u32::saturating_add)
        } else {
            self.goals
                .iter()
                .map(|g| node.range_to(&g.target).saturating_sub(u32::from(g.range)))
                .min()
                .unwrap_or(0)
        }
    }

    fn satisfied(&self, node: &RoomPosition) -> bool {
        if self.options.flee {
            self.goals
                .iter()
                .all(|g| node.range_to(&g.target) >= u32::from(g.range))
        } else {
            self.goals
                .iter()
                .any(|g| node.range_to(&g.target) <= u32::from(g.range))
        }
    }

    /// Cost of stepping onto `node`, `None` when impassable.
    fn step_cost(&mut self, node: &RoomPosition) -> Option<u32> {
        let terrain = self.finder.terrain.get(&node.room)?;
        let tile = terrain.get(node.pos);
        if tile == TerrainType::Wall {
            return None;
        }
        let options = self.options;
        let matrix = self
            .matrices
            .entry(node.room.clone())
            .or_insert_with(|| options.room_callback.and_then(|callback| callback(&node.room)));
        match matrix.as_ref().map_or(0, |m| m.get(node.pos)) {
            BLOCKED => None,
            0 => Some(match tile {
                TerrainType::Swamp => options.swamp_cost,
                _ => options.plain_cost,
            }),
            custom => Some(u32::from(custom)),
        }
    }

    fn neighbors(&self, node: &RoomPosition, rooms: &BTreeSet<RoomName>) -> Vec<RoomPosition> {
        let mut out: Vec<RoomPosition> = Direction::ALL
            .iter()
            .filter_map(|d| node.pos.offset(*d))
            .map(|pos| RoomPosition::new(node.room.clone(), pos))
            .collect();
        let crossing = node
            .pos
            .exit_crossing()
            .and_then(|(direction, landing)| Some((node.room.neighbor(direction)?, landing)));
        if let Some((room, landing)) = crossing {
            let known = self.finder.terrain.contains_key(&room);
            let budget = rooms.contains(&room) || rooms.len() < self.options.max_rooms;
            if known && budget {
                out.push(RoomPosition::new(room, landing));
            }
        }
        out
    }
}

fn reconstruct(
    parent: &BTreeMap<RoomPosition, RoomPosition>,
    origin: &RoomPosition,
    end: &RoomPosition,
) -> Vec<RoomPosition> {
    let mut path = Vec::new();
    let mut current = end.clone();
    while &current != origin {
        let Some(previous) = parent.get(&current) else {
            break;
        };
        path.push(current);
        current = previous.clone();
    }
    path.reverse();
    path
}

impl PathFinder for GridPathFinder {
    fn search(
        &self,
        origin: &RoomPosition,
        goals: &[PathGoal],
        options: &SearchOptions<'_>,
    ) -> Result<SearchResult, PathFinderError> {
        if !self.terrain.contains_key(&origin.room) {
            return Err(PathFinderError::Unavailable {
                room: origin.room.clone(),
            });
        }

        let mut search = Search {
            finder: self,
            goals,
            options,
            matrices: BTreeMap::new(),
        };

        let mut open: BTreeSet<OpenEntry> = BTreeSet::new();
        let mut best_g: BTreeMap<RoomPosition, u32> = BTreeMap::new();
        let mut parent: BTreeMap<RoomPosition, RoomPosition> = BTreeMap::new();
        let mut closed: BTreeSet<RoomPosition> = BTreeSet::new();
        let mut rooms: BTreeSet<RoomName> = BTreeSet::new();
        rooms.insert(origin.room.clone());

        let start_h = search.heuristic(origin);
        let mut closest = (start_h, 0_u32, origin.clone());
        let mut insertion = 0_u64;
        open.insert((start_h, start_h, insertion, origin.clone()));
        best_g.insert(origin.clone(), 0);

        let mut ops = 0_u32;
        while let Some((_, h, _, node)) = open.pop_first() {
            if closed.contains(&node) {
                continue;
            }
            let g = best_g.get(&node).copied().unwrap_or(u32::MAX);
            if search.satisfied(&node) {
                return Ok(SearchResult {
                    path: reconstruct(&parent, origin, &node),
                    ops,
                    cost: g,
                    incomplete: false,
                });
            }
            if ops >= options.max_ops {
                break;
            }
            ops = ops.saturating_add(1);
            if (h, g) < (closest.0, closest.1) {
                closest = (h, g, node.clone());
            }
            closed.insert(node.clone());

            for next in search.neighbors(&node, &rooms) {
                if closed.contains(&next) {
                    continue;
                }
                let Some(step) = search.step_cost(&next) else {
                    continue;
                };
                let tentative = g.saturating_add(step);
                if tentative >= best_g.get(&next).copied().unwrap_or(u32::MAX) {
                    continue;
                }
                rooms.insert(next.room.clone());
                best_g.insert(next.clone(), tentative);
                parent.insert(next.clone(), node.clone());
                let next_h = search.heuristic(&next);
                insertion = insertion.saturating_add(1);
                open.insert((tentative.saturating_add(next_h), next_h, insertion, next));
            }
        }

        let (_, cost, end) = closest;
        Ok(SearchResult {
            path: reconstruct(&parent, origin, &end),
            ops,
            cost,
            incomplete: true,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn w1n1() -> RoomName {
        RoomName::from("W1N1")
    }

    fn at(x: u8, y: u8) -> RoomPosition {
        RoomPosition::new(w1n1(), Position::new(x, y))
    }

    fn goal(x: u8, y: u8, range: u8) -> PathGoal {
        PathGoal {
            target: at(x, y),
            range,
        }
    }

    fn plain_finder() -> GridPathFinder {
        GridPathFinder::new().with_room(w1n1(), RoomTerrain::plain())
    }

    #[test]
    fn straight_line_on_plain() {
        let result = plain_finder()
            .search(&at(10, 10), &[goal(15, 10, 0)], &SearchOptions::default())
            .unwrap();
        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 5);
        assert_eq!(result.path.last(), Some(&at(15, 10)));
        assert_eq!(result.cost, 5);
    }

    #[test]
    fn range_stops_early() {
        let result = plain_finder()
            .search(&at(10, 10), &[goal(15, 10, 1)], &SearchOptions::default())
            .unwrap();
        assert_eq!(result.path.len(), 4);
    }

    #[test]
    fn walls_force_a_detour() {
        let mut terrain = RoomTerrain::plain();
        for y in 5..=15 {
            terrain.set(Position::new(12, y), TerrainType::Wall);
        }
        let finder = GridPathFinder::new().with_room(w1n1(), terrain);
        let result = finder
            .search(&at(10, 10), &[goal(14, 10, 0)], &SearchOptions::default())
            .unwrap();
        assert!(!result.incomplete);
        assert!(result.path.len() > 4);
        assert!(
            result
                .path
                .iter()
                .all(|p| !(p.pos.x == 12 && (5..=15).contains(&p.pos.y)))
        );
    }

    #[test]
    fn swamp_is_avoided_when_cheaper_around() {
        let mut terrain = RoomTerrain::plain();
        terrain.set(Position::new(11, 10), TerrainType::Swamp);
        let finder = GridPathFinder::new().with_room(w1n1(), terrain);
        let result = finder
            .search(&at(10, 10), &[goal(12, 10, 0)], &SearchOptions::default())
            .unwrap();
        assert_eq!(result.cost, 2);
        assert!(result.path.iter().all(|p| p.pos != Position::new(11, 10)));
    }

    #[test]
    fn enclosed_goal_is_incomplete_not_error() {
        let mut terrain = RoomTerrain::plain();
        for d in Direction::ALL {
            terrain.set(Position::new(30, 30).offset(d).unwrap(), TerrainType::Wall);
        }
        let finder = GridPathFinder::new().with_room(w1n1(), terrain);
        let options = SearchOptions {
            max_ops: 500,
            ..SearchOptions::default()
        };
        let result = finder
            .search(&at(20, 30), &[goal(30, 30, 0)], &options)
            .unwrap();
        assert!(result.incomplete);
        assert!(!result.path.is_empty());
        assert!(result.path.len() <= 10);
    }

    #[test]
    fn missing_terrain_is_unavailable() {
        let err = GridPathFinder::new()
            .search(&at(1, 1), &[goal(2, 2, 0)], &SearchOptions::default())
            .unwrap_err();
        assert!(matches!(err, PathFinderError::Unavailable { room } if room == w1n1()));
    }

    #[test]
    fn cost_matrix_blocks_tiles() {
        let callback = |_: &RoomName| {
            let mut matrix = CostMatrix::new();
            for y in 9..=11 {
                matrix.block(Position::new(11, y));
            }
            Some(matrix)
        };
        let options = SearchOptions {
            room_callback: Some(&callback),
            ..SearchOptions::default()
        };
        let result = plain_finder()
            .search(&at(10, 10), &[goal(12, 10, 0)], &options)
            .unwrap();
        assert!(!result.incomplete);
        assert!(
            result
                .path
                .iter()
                .all(|p| !(p.pos.x == 11 && (9..=11).contains(&p.pos.y)))
        );
    }

    #[test]
    fn flee_moves_out_of_range() {
        let options = SearchOptions {
            flee: true,
            ..SearchOptions::default()
        };
        let result = plain_finder()
            .search(&at(25, 25), &[goal(25, 25, 3)], &options)
            .unwrap();
        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 3);
        assert!(result.path.last().unwrap().range_to(&at(25, 25)) >= 3);
    }

    #[test]
    fn searches_are_deterministic() {
        let finder = plain_finder();
        let a = finder
            .search(&at(5, 5), &[goal(40, 30, 0)], &SearchOptions::default())
            .unwrap();
        let b = finder
            .search(&at(5, 5), &[goal(40, 30, 0)], &SearchOptions::default())
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn crosses_into_a_loaded_neighbour() {
        let west = RoomName::from("W2N1");
        let finder = plain_finder().with_room(west.clone(), RoomTerrain::plain());
        let target = PathGoal {
            target: RoomPosition::new(west.clone(), Position::new(45, 25)),
            range: 0,
        };

        let result = finder
            .search(&at(1, 25), &[target.clone()], &SearchOptions::default())
            .unwrap();
        assert!(!result.incomplete);
        assert_eq!(result.path.len(), 6);
        assert_eq!(result.path.last().unwrap().room, west);

        let single_room = SearchOptions {
            max_rooms: 1,
            ..SearchOptions::default()
        };
        let result = finder.search(&at(1, 25), &[target], &single_room).unwrap();
        assert!(result.incomplete);
        assert!(result.path.iter().all(|p| p.room == w1n1()));
    }
}
