//! Document kinds and storage-neutral update operations.

use std::collections::BTreeMap;

use hive_types::FieldChanges;
use serde_json::{Map, Value};

/// A persisted document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    /// Room objects.
    RoomObjects,
    /// Room metadata.
    Rooms,
    /// User accounts.
    Users,
    /// Market orders.
    MarketOrders,
    /// Power creeps.
    PowerCreeps,
    /// Money ledger.
    UsersMoney,
    /// Market transactions.
    Transactions,
}

impl DocumentKind {
    /// Every kind, in flush order.
    pub const ALL: [Self; 7] = [
        Self::RoomObjects,
        Self::Rooms,
        Self::Users,
        Self::MarketOrders,
        Self::PowerCreeps,
        Self::UsersMoney,
        Self::Transactions,
    ];

    /// Collection name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoomObjects => "rooms.objects",
            Self::Rooms => "rooms",
            Self::Users => "users",
            Self::MarketOrders => "market.orders",
            Self::PowerCreeps => "users.power_creeps",
            Self::UsersMoney => "users.money",
            Self::Transactions => "transactions",
        }
    }
}

impl core::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A combined update of one document: `$set`, `$unset`, `$inc`,
/// `$addToSet` and `$pull` in one value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentUpdate {
    /// Paths to overwrite.
    pub set: Map<String, Value>,
    /// Paths to remove.
    pub unset: Vec<String>,
    /// Numeric increments.
    pub inc: BTreeMap<String, i64>,
    /// Values to add to array fields if absent.
    pub add_to_set: BTreeMap<String, Vec<Value>>,
    /// Values to remove from array fields.
    pub pull: BTreeMap<String, Vec<Value>>,
}

impl DocumentUpdate {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.unset.is_empty()
            && self.inc.is_empty()
            && self.add_to_set.is_empty()
            && self.pull.is_empty()
    }

    /// An increment-only update.
    pub fn increment(path: impl Into<String>, by: i64) -> Self {
        let mut update = Self::default();
        update.inc.insert(path.into(), by);
        update
    }

    /// Fold a later update into this one. Later set/unset win, increments
    /// add up, set operations concatenate.
    pub fn merge(&mut self, other: Self) {
        let mut changes = FieldChanges {
            set: std::mem::take(&mut self.set),
            unset: std::mem::take(&mut self.unset),
        };
        changes.merge(FieldChanges {
            set: other.set,
            unset: other.unset,
        });
        self.set = changes.set;
        self.unset = changes.unset;

        for (path, by) in other.inc {
            let entry = self.inc.entry(path).or_insert(0);
            *entry = entry.saturating_add(by);
        }
        for (path, values) in other.add_to_set {
            let entry = self.add_to_set.entry(path).or_default();
            for value in values {
                if !entry.contains(&value) {
                    entry.push(value);
                }
            }
        }
        for (path, values) in other.pull {
            self.pull.entry(path).or_default().extend(values);
        }
    }

    /// Apply the update to a JSON document in place.
    pub fn apply_to(&self, document: &mut Value) {
        let changes = FieldChanges {
            set: self.set.clone(),
            unset: self.unset.clone(),
        };
        changes.apply_to_value(document);

        for (path, by) in &self.inc {
            let current = read_path(document, path)
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let mut set = FieldChanges::default();
            set.set
                .insert(path.clone(), Value::from(current.saturating_add(*by)));
            set.apply_to_value(document);
        }
        for (path, values) in &self.add_to_set {
            let mut array = read_path(document, path)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for value in values {
                if !array.contains(value) {
                    array.push(value.clone());
                }
            }
            let mut set = FieldChanges::default();
            set.set.insert(path.clone(), Value::Array(array));
            set.apply_to_value(document);
        }
        for (path, values) in &self.pull {
            if let Some(array) = read_path(document, path).and_then(Value::as_array) {
                let kept: Vec<Value> = array
                    .iter()
                    .filter(|v| !values.contains(v))
                    .cloned()
                    .collect();
                let mut set = FieldChanges::default();
                set.set.insert(path.clone(), Value::Array(kept));
                set.apply_to_value(document);
            }
        }
    }
}

impl From<FieldChanges> for DocumentUpdate {
    fn from(changes: FieldChanges) -> Self {
        Self {
            set: changes.set,
            unset: changes.unset,
            ..Self::default()
        }
    }
}

fn read_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |value, segment| value.get(segment))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn increments_accumulate() {
        let mut a = DocumentUpdate::increment("power", 3);
        a.merge(DocumentUpdate::increment("power", 4));
        assert_eq!(a.inc.get("power"), Some(&7));

        let mut doc = json!({"_id": "u1", "power": 10});
        a.apply_to(&mut doc);
        assert_eq!(doc["power"], 17);
    }

    #[test]
    fn add_to_set_and_pull() {
        let mut update = DocumentUpdate::default();
        update
            .add_to_set
            .insert("tags".into(), vec![json!("a"), json!("b")]);
        let mut doc = json!({"tags": ["b", "c"]});
        update.apply_to(&mut doc);
        assert_eq!(doc["tags"], json!(["b", "c", "a"]));

        let mut pull = DocumentUpdate::default();
        pull.pull.insert("tags".into(), vec![json!("c")]);
        pull.apply_to(&mut doc);
        assert_eq!(doc["tags"], json!(["b", "a"]));
    }

    #[test]
    fn merged_set_paths_later_wins() {
        let mut a = DocumentUpdate::default();
        a.set.insert("hits".into(), json!(100));
        let mut b = DocumentUpdate::default();
        b.set.insert("hits".into(), json!(90));
        b.set.insert("store.energy".into(), json!(50));
        a.merge(b);
        assert_eq!(a.set.get("hits"), Some(&json!(90)));
        assert_eq!(a.set.len(), 2);
    }

    #[test]
    fn kind_names_match_collections() {
        assert_eq!(DocumentKind::RoomObjects.as_str(), "rooms.objects");
        assert_eq!(DocumentKind::PowerCreeps.to_string(), "users.power_creeps");
    }
}
