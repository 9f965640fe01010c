//! Room event log entries.
//!
//! Steps append events as they act; the `event-log` step serializes the
//! whole list into the room's event log side channel at the end of the
//! tick.

use hive_types::{ObjectId, ObjectType, RoomName};
use serde::Serialize;

/// One thing that happened in a room this tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RoomEvent {
    /// An object took damage.
    Attack {
        /// Attacker.
        object_id: ObjectId,
        /// Damaged object.
        target_id: ObjectId,
        /// Hit points removed.
        damage: i64,
    },
    /// A creep was healed.
    Heal {
        /// Healer.
        object_id: ObjectId,
        /// Healed creep.
        target_id: ObjectId,
        /// Hit points restored.
        amount: i64,
    },
    /// A structure was repaired.
    Repair {
        /// Repairer.
        object_id: ObjectId,
        /// Repaired structure.
        target_id: ObjectId,
        /// Hit points restored.
        amount: i64,
    },
    /// A creep harvested a source or mineral.
    Harvest {
        /// Harvesting creep.
        object_id: ObjectId,
        /// Source or mineral.
        target_id: ObjectId,
        /// Amount gained.
        amount: i64,
    },
    /// A creep upgraded the controller.
    UpgradeController {
        /// Upgrading creep.
        object_id: ObjectId,
        /// Controller.
        target_id: ObjectId,
        /// Progress added.
        amount: i64,
    },
    /// Resources moved between two objects.
    Transfer {
        /// Giver.
        object_id: ObjectId,
        /// Receiver.
        target_id: ObjectId,
        /// Resource moved.
        resource_type: String,
        /// Amount received.
        amount: i64,
    },
    /// An object was destroyed.
    ObjectDestroyed {
        /// Destroyed object.
        object_id: ObjectId,
        /// Its type.
        object_type: ObjectType,
    },
    /// A creep left the room.
    Exit {
        /// Leaving creep.
        object_id: ObjectId,
        /// Destination room.
        room: RoomName,
        /// Landing column.
        x: u8,
        /// Landing row.
        y: u8,
    },
}
