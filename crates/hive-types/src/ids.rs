//! Type-safe identifier wrappers.
//!
//! Every persisted entity in the world is addressed by a stable string id.
//! Wrapping the raw strings in distinct newtypes prevents accidentally
//! mixing an object id with a user id or a room name at compile time.
//!
//! Freshly created objects get deterministic ids derived from the room,
//! tick, and a per-partition sequence number (UUID v5), so two engines fed
//! the same inputs produce byte-identical mutation sets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::Direction;

/// Namespace for deterministic object ids.
const OBJECT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6869_7665_2d6f_626a_6563_742d_6964_7321);

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing identifier string.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a room object (creep, structure, resource pile).
    ObjectId
}

define_id! {
    /// Unique identifier for a player account.
    UserId
}

define_id! {
    /// Unique identifier for a market order.
    OrderId
}

define_id! {
    /// Name of a room, e.g. `W1N1` or `E12S3`.
    RoomName
}

impl ObjectId {
    /// Derive a deterministic id for an object created during processing.
    ///
    /// The same `(partition, tick, sequence)` triple always yields the same
    /// id, which keeps repeated runs over identical inputs comparable.
    pub fn derive(partition: &str, tick: u64, sequence: u64) -> Self {
        let name = format!("{partition}:{tick}:{sequence}");
        let id = Uuid::new_v5(&OBJECT_ID_NAMESPACE, name.as_bytes());
        Self(id.simple().to_string())
    }
}

impl OrderId {
    /// Derive a deterministic order id, see [`ObjectId::derive`].
    pub fn derive(partition: &str, tick: u64, sequence: u64) -> Self {
        Self(ObjectId::derive(partition, tick, sequence).into_inner())
    }
}

impl RoomName {
    /// Parse the room name into world coordinates.
    ///
    /// `W0` maps to x = -1 and `E0` to x = 0; `N0` maps to y = -1 and `S0`
    /// to y = 0. Returns `None` for names outside the `[WE]n[NS]n` grammar.
    pub fn coordinates(&self) -> Option<(i64, i64)> {
        let s = self.0.as_str();
        let mut chars = s.char_indices();
        let (_, horizontal) = chars.next()?;
        let vertical_at = s.find(['N', 'S'])?;
        let x_part = s.get(1..vertical_at)?;
        let y_part = s.get(vertical_at.checked_add(1)?..)?;
        let vertical = s.get(vertical_at..=vertical_at)?;

        let x_raw: i64 = x_part.parse().ok()?;
        let y_raw: i64 = y_part.parse().ok()?;

        let x = match horizontal {
            'W' => x_raw.checked_neg()?.checked_sub(1)?,
            'E' => x_raw,
            _ => return None,
        };
        let y = match vertical {
            "N" => y_raw.checked_neg()?.checked_sub(1)?,
            "S" => y_raw,
            _ => return None,
        };
        Some((x, y))
    }

    /// Build a room name from world coordinates (inverse of [`coordinates`]).
    ///
    /// [`coordinates`]: RoomName::coordinates
    pub fn from_coordinates(x: i64, y: i64) -> Self {
        let horizontal = if x < 0 {
            format!("W{}", x.saturating_neg().saturating_sub(1))
        } else {
            format!("E{x}")
        };
        let vertical = if y < 0 {
            format!("N{}", y.saturating_neg().saturating_sub(1))
        } else {
            format!("S{y}")
        };
        Self(format!("{horizontal}{vertical}"))
    }

    /// The room adjacent to this one in the given direction.
    pub fn neighbor(&self, direction: Direction) -> Option<Self> {
        let (x, y) = self.coordinates()?;
        let (dx, dy) = direction.offset();
        Some(Self::from_coordinates(
            x.checked_add(i64::from(dx))?,
            y.checked_add(i64::from(dy))?,
        ))
    }

    /// Linear (Chebyshev) distance between two rooms in room units.
    pub fn linear_distance(&self, other: &Self) -> Option<u64> {
        let (ax, ay) = self.coordinates()?;
        let (bx, by) = other.coordinates()?;
        let dx = ax.abs_diff(bx);
        let dy = ay.abs_diff(by);
        Some(dx.max(dy))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn derived_ids_are_deterministic() {
        let a = ObjectId::derive("W1N1", 100, 0);
        let b = ObjectId::derive("W1N1", 100, 0);
        let c = ObjectId::derive("W1N1", 100, 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn room_coordinates_roundtrip() {
        for name in ["W0N0", "E0S0", "W12N7", "E3S44"] {
            let room = RoomName::from(name);
            let (x, y) = room.coordinates().unwrap();
            assert_eq!(RoomName::from_coordinates(x, y), room);
        }
        assert_eq!(RoomName::from("W0N0").coordinates(), Some((-1, -1)));
        assert_eq!(RoomName::from("E0S0").coordinates(), Some((0, 0)));
    }

    #[test]
    fn malformed_room_names_have_no_coordinates() {
        assert_eq!(RoomName::from("sim").coordinates(), None);
        assert_eq!(RoomName::from("X1N1").coordinates(), None);
        assert_eq!(RoomName::from("W1").coordinates(), None);
    }

    #[test]
    fn neighbors_cross_the_meridian() {
        let room = RoomName::from("E0N1");
        assert_eq!(room.neighbor(Direction::Left), Some(RoomName::from("W0N1")));
        assert_eq!(room.neighbor(Direction::Bottom), Some(RoomName::from("E0N0")));
        assert_eq!(
            RoomName::from("E0N0").neighbor(Direction::Bottom),
            Some(RoomName::from("E0S0"))
        );
    }

    #[test]
    fn linear_distance_is_chebyshev() {
        let a = RoomName::from("W1N1");
        let b = RoomName::from("E2N3");
        assert_eq!(a.linear_distance(&b), Some(4));
        assert_eq!(a.linear_distance(&a), Some(0));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ObjectId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
    }
}
