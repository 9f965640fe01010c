//! Controller level tables: structure allowances, upgrade thresholds and
//! downgrade timers.

use hive_types::ObjectType;

/// Highest controller level.
pub const MAX_LEVEL: u32 = 8;

/// Progress needed to advance from level `n` to `n + 1`, indexed by `n - 1`.
const LEVEL_PROGRESS: [i64; 7] = [200, 45_000, 135_000, 405_000, 1_215_000, 3_645_000, 10_935_000];

/// Downgrade period per level, indexed by level (level 0 unused).
const DOWNGRADE_TICKS: [u64; 9] = [0, 20_000, 10_000, 20_000, 40_000, 80_000, 120_000, 150_000, 200_000];

/// Number of structures of `object_type` permitted at controller `level`.
///
/// Types without a table entry (sources, creeps, piles) are unlimited.
pub fn structure_allowance(object_type: ObjectType, level: u32) -> u32 {
    let table: [u32; 9] = match object_type {
        ObjectType::Spawn => [0, 1, 1, 1, 1, 1, 1, 2, 3],
        ObjectType::Extension => [0, 0, 5, 10, 20, 30, 40, 50, 60],
        ObjectType::Link => [0, 0, 0, 0, 0, 2, 3, 4, 6],
        ObjectType::Tower => [0, 0, 0, 1, 1, 2, 2, 3, 6],
        ObjectType::Storage => [0, 0, 0, 0, 1, 1, 1, 1, 1],
        ObjectType::Lab => [0, 0, 0, 0, 0, 0, 3, 6, 10],
        ObjectType::Terminal | ObjectType::Extractor => [0, 0, 0, 0, 0, 0, 1, 1, 1],
        ObjectType::Factory => [0, 0, 0, 0, 0, 0, 0, 1, 1],
        ObjectType::Observer | ObjectType::PowerSpawn | ObjectType::Nuker => {
            [0, 0, 0, 0, 0, 0, 0, 0, 1]
        }
        ObjectType::Container => [5; 9],
        ObjectType::Road => [2500; 9],
        ObjectType::ConstructedWall => [0, 2500, 2500, 2500, 2500, 2500, 2500, 2500, 2500],
        ObjectType::Rampart => [0, 0, 2500, 2500, 2500, 2500, 2500, 2500, 2500],
        _ => return u32::MAX,
    };
    let index = usize::try_from(level.min(MAX_LEVEL)).unwrap_or(0);
    table.get(index).copied().unwrap_or(0)
}

/// Whether more than one instance of the type can exist per room, making
/// the distance-priority rank relevant.
pub fn is_multi_instance(object_type: ObjectType) -> bool {
    (1..=MAX_LEVEL).any(|level| {
        let allowed = structure_allowance(object_type, level);
        allowed > 1 && allowed != u32::MAX
    })
}

/// Progress needed to reach the next level, `None` at the maximum.
pub fn progress_to_next_level(level: u32) -> Option<i64> {
    let index = usize::try_from(level.checked_sub(1)?).ok()?;
    LEVEL_PROGRESS.get(index).copied()
}

/// Downgrade period of `level`; zero for unowned controllers.
pub fn downgrade_ticks(level: u32) -> u64 {
    usize::try_from(level)
        .ok()
        .and_then(|i| DOWNGRADE_TICKS.get(i))
        .copied()
        .unwrap_or(0)
}

/// Extension energy capacity at `level`.
pub const fn extension_capacity(level: u32) -> i64 {
    match level {
        8 => 200,
        7 => 100,
        _ => 50,
    }
}

/// Rampart hit point cap at `level`.
pub const fn rampart_hits_max(level: u32) -> i64 {
    match level {
        0..=2 => 300_000,
        3 => 1_000_000,
        4 => 3_000_000,
        5 => 10_000_000,
        6 => 30_000_000,
        7 => 100_000_000,
        _ => 300_000_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowances_follow_the_level_table() {
        assert_eq!(structure_allowance(ObjectType::Spawn, 1), 1);
        assert_eq!(structure_allowance(ObjectType::Spawn, 8), 3);
        assert_eq!(structure_allowance(ObjectType::Extension, 1), 0);
        assert_eq!(structure_allowance(ObjectType::Extension, 3), 10);
        assert_eq!(structure_allowance(ObjectType::Tower, 8), 6);
        assert_eq!(structure_allowance(ObjectType::Nuker, 7), 0);
        assert_eq!(structure_allowance(ObjectType::Source, 0), u32::MAX);
        assert_eq!(structure_allowance(ObjectType::Lab, 42), 10);
    }

    #[test]
    fn multi_instance_types() {
        assert!(is_multi_instance(ObjectType::Spawn));
        assert!(is_multi_instance(ObjectType::Extension));
        assert!(!is_multi_instance(ObjectType::Storage));
        assert!(!is_multi_instance(ObjectType::Nuker));
        assert!(!is_multi_instance(ObjectType::Creep));
    }

    #[test]
    fn level_progress_and_downgrade() {
        assert_eq!(progress_to_next_level(1), Some(200));
        assert_eq!(progress_to_next_level(7), Some(10_935_000));
        assert_eq!(progress_to_next_level(8), None);
        assert_eq!(progress_to_next_level(0), None);
        assert_eq!(downgrade_ticks(1), 20_000);
        assert_eq!(downgrade_ticks(8), 200_000);
        assert_eq!(downgrade_ticks(0), 0);
    }
}
