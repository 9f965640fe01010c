//! Tile coordinates inside a room.

use serde::{Deserialize, Serialize};

use crate::enums::Direction;

/// Width and height of every room in tiles.
pub const ROOM_SIZE: u8 = 50;

/// A tile position inside a single room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Column, 0..=49.
    pub x: u8,
    /// Row, 0..=49.
    pub y: u8,
}

impl Position {
    /// Create a position. Coordinates are not range-checked.
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Build a position from signed coordinates, if inside the room.
    pub fn from_i32(x: i32, y: i32) -> Option<Self> {
        let x = u8::try_from(x).ok()?;
        let y = u8::try_from(y).ok()?;
        (x < ROOM_SIZE && y < ROOM_SIZE).then_some(Self { x, y })
    }

    /// Chebyshev distance between two tiles.
    pub const fn range_to(self, other: Self) -> u8 {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        if dx > dy { dx } else { dy }
    }

    /// Whether `other` is within `range` tiles.
    pub const fn in_range(self, other: Self, range: u8) -> bool {
        self.range_to(other) <= range
    }

    /// The adjacent tile in `direction`, if still inside the room.
    pub fn offset(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.offset();
        Self::from_i32(
            i32::from(self.x).saturating_add(i32::from(dx)),
            i32::from(self.y).saturating_add(i32::from(dy)),
        )
    }

    /// Whether the tile lies on the room border.
    pub const fn is_exit(self) -> bool {
        let last = ROOM_SIZE.saturating_sub(1);
        self.x == 0 || self.y == 0 || self.x == last || self.y == last
    }

    /// The tile a creep lands on after crossing this exit into the
    /// neighbouring room, together with the direction of travel.
    pub const fn exit_crossing(self) -> Option<(Direction, Self)> {
        let last = ROOM_SIZE.saturating_sub(1);
        if self.x == 0 {
            Some((Direction::Left, Self::new(last, self.y)))
        } else if self.x == last {
            Some((Direction::Right, Self::new(0, self.y)))
        } else if self.y == 0 {
            Some((Direction::Top, Self::new(self.x, last)))
        } else if self.y == last {
            Some((Direction::Bottom, Self::new(self.x, 0)))
        } else {
            None
        }
    }

    /// Row-major index into a 50x50 grid.
    pub fn index(self) -> usize {
        usize::from(self.y)
            .saturating_mul(usize::from(ROOM_SIZE))
            .saturating_add(usize::from(self.x))
    }
}
