//! Per-kind bulk write batching.
//!
//! A [`BulkWriter`] collects logical operations for one document kind and
//! folds them per document id, so flushing the resulting [`BulkBatch`]
//! performs at most one physical write per touched document:
//!
//! - repeated updates to one id merge into a single [`DocumentUpdate`]
//! - an update to a document inserted in the same batch is applied to the
//!   inserted document before the write
//! - a removal supersedes every other operation on the id

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::document::{DocumentKind, DocumentUpdate};
use crate::error::DbError;

/// One physical write.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperation {
    /// Insert or replace a full document.
    Insert {
        /// Document id.
        id: String,
        /// Full document, including `_id`.
        document: Value,
    },
    /// Update an existing document.
    Update {
        /// Document id.
        id: String,
        /// Combined update.
        update: DocumentUpdate,
    },
    /// Delete a document.
    Remove {
        /// Document id.
        id: String,
    },
}

impl BulkOperation {
    /// Id of the touched document.
    pub fn id(&self) -> &str {
        match self {
            Self::Insert { id, .. } | Self::Update { id, .. } | Self::Remove { id } => id,
        }
    }
}

/// The flushed operations of one writer, one per touched id.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkBatch {
    /// Target collection.
    pub kind: DocumentKind,
    /// Operations in id order.
    pub operations: Vec<BulkOperation>,
}

impl BulkBatch {
    /// Whether nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of physical writes.
    pub fn len(&self) -> usize {
        self.operations.len()
    }
}

/// Accumulates operations for one document kind.
#[derive(Debug, Clone)]
pub struct BulkWriter {
    kind: DocumentKind,
    inserts: BTreeMap<String, Value>,
    updates: BTreeMap<String, DocumentUpdate>,
    removes: BTreeSet<String>,
}

impl BulkWriter {
    /// An empty writer for `kind`.
    pub const fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            inserts: BTreeMap::new(),
            updates: BTreeMap::new(),
            removes: BTreeSet::new(),
        }
    }

    /// Target collection.
    pub const fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Queue a full-document insert. The document must carry a string
    /// `_id`.
    pub fn insert(&mut self, document: Value) -> Result<(), DbError> {
        let id = document
            .get("_id")
            .and_then(Value::as_str)
            .ok_or(DbError::MissingId {
                kind: self.kind.as_str(),
            })?
            .to_owned();
        self.updates.remove(&id);
        self.inserts.insert(id, document);
        Ok(())
    }

    /// Queue an update. Empty updates are ignored.
    pub fn update(&mut self, id: impl Into<String>, update: DocumentUpdate) {
        if update.is_empty() {
            return;
        }
        let id = id.into();
        if let Some(document) = self.inserts.get_mut(&id) {
            update.apply_to(document);
            return;
        }
        match self.updates.get_mut(&id) {
            Some(existing) => existing.merge(update),
            None => {
                self.updates.insert(id, update);
            }
        }
    }

    /// Queue a removal.
    pub fn remove(&mut self, id: impl Into<String>) {
        self.removes.insert(id.into());
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.removes.is_empty()
    }

    /// Fold the queued operations into one write per id.
    pub fn finish(self) -> BulkBatch {
        let Self {
            kind,
            inserts,
            updates,
            removes,
        } = self;

        let mut operations: BTreeMap<String, BulkOperation> = BTreeMap::new();
        for (id, document) in inserts {
            if !removes.contains(&id) {
                operations.insert(id.clone(), BulkOperation::Insert { id, document });
            }
        }
        for (id, update) in updates {
            if !removes.contains(&id) {
                operations.insert(id.clone(), BulkOperation::Update { id, update });
            }
        }
        for id in removes {
            operations.insert(id.clone(), BulkOperation::Remove { id });
        }

        BulkBatch {
            kind,
            operations: operations.into_values().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn set(path: &str, value: Value) -> DocumentUpdate {
        let mut update = DocumentUpdate::default();
        update.set.insert(path.to_owned(), value);
        update
    }

    #[test]
    fn insert_without_id_is_rejected() {
        let mut writer = BulkWriter::new(DocumentKind::RoomObjects);
        let err = writer.insert(json!({"type": "creep"})).unwrap_err();
        assert!(matches!(err, DbError::MissingId { kind: "rooms.objects" }));
        assert!(writer.is_empty());
    }

    #[test]
    fn updates_to_same_id_merge_into_one_write() {
        let mut writer = BulkWriter::new(DocumentKind::RoomObjects);
        writer.update("a", set("hits", json!(100)));
        writer.update("a", set("store.energy", json!(50)));
        let batch = writer.finish();
        assert_eq!(batch.len(), 1);
        let BulkOperation::Update { update, .. } = &batch.operations[0] else {
            panic!("expected update");
        };
        assert_eq!(update.set.get("hits"), Some(&json!(100)));
        assert_eq!(update.set.get("store.energy"), Some(&json!(50)));
    }

    #[test]
    fn update_after_insert_is_folded_into_insert() {
        let mut writer = BulkWriter::new(DocumentKind::RoomObjects);
        writer.insert(json!({"_id": "c", "hits": 100})).unwrap();
        writer.update("c", set("hits", json!(40)));
        let batch = writer.finish();
        assert_eq!(
            batch.operations,
            vec![BulkOperation::Insert {
                id: "c".into(),
                document: json!({"_id": "c", "hits": 40}),
            }]
        );
    }

    #[test]
    fn removal_wins() {
        let mut writer = BulkWriter::new(DocumentKind::MarketOrders);
        writer.update("o", set("price", json!(5)));
        writer.insert(json!({"_id": "p"})).unwrap();
        writer.remove("o");
        writer.remove("p");
        let batch = writer.finish();
        assert_eq!(batch.len(), 2);
        assert!(
            batch
                .operations
                .iter()
                .all(|op| matches!(op, BulkOperation::Remove { .. }))
        );
    }

    #[test]
    fn empty_updates_are_dropped() {
        let mut writer = BulkWriter::new(DocumentKind::Users);
        writer.update("u", DocumentUpdate::default());
        assert!(writer.is_empty());
        assert!(writer.finish().is_empty());
    }
}
