//! Read-back of pending writes over snapshot state.
//!
//! Steps run in a fixed order and later steps must see what earlier steps
//! staged. A [`Pending`] captures everything staged for one document and
//! [`Pending::resolve`] lays it over the snapshot value.

use hive_types::{
    MarketOrderPatch, MarketOrderSnapshot, PowerCreepPatch, PowerCreepSnapshot, RoomInfoPatch,
    RoomInfoSnapshot, RoomObjectPatch, RoomObjectSnapshot, UserPatch, UserState,
};

/// A sparse patch that can be laid over a typed document.
pub trait Overlay<T> {
    /// The document with the patch applied.
    fn overlay(&self, base: &T) -> Result<T, serde_json::Error>;
}

macro_rules! impl_overlay {
    ($($patch:ty => $target:ty),+ $(,)?) => {
        $(
            impl Overlay<$target> for $patch {
                fn overlay(&self, base: &$target) -> Result<$target, serde_json::Error> {
                    self.apply_to(base)
                }
            }
        )+
    };
}

impl_overlay! {
    RoomObjectPatch => RoomObjectSnapshot,
    RoomInfoPatch => RoomInfoSnapshot,
    UserPatch => UserState,
    MarketOrderPatch => MarketOrderSnapshot,
    PowerCreepPatch => PowerCreepSnapshot,
}

/// Everything staged for one document id.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending<T, P> {
    /// Full replacement staged by an upsert.
    pub upsert: Option<T>,
    /// Merged sparse patch.
    pub patch: Option<P>,
    /// Whether the document is staged for removal.
    pub removed: bool,
}

impl<T, P> Default for Pending<T, P> {
    fn default() -> Self {
        Self {
            upsert: None,
            patch: None,
            removed: false,
        }
    }
}

impl<T: Clone, P: Overlay<T>> Pending<T, P> {
    /// Lay the pending state over `base`.
    ///
    /// Returns `None` when the document is removed, or when it neither
    /// exists in the snapshot nor was upserted.
    pub fn resolve(&self, base: Option<&T>) -> Result<Option<T>, serde_json::Error> {
        if self.removed {
            return Ok(None);
        }
        let Some(current) = self.upsert.as_ref().or(base) else {
            return Ok(None);
        };
        match &self.patch {
            Some(patch) => patch.overlay(current).map(Some),
            None => Ok(Some(current.clone())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::{ObjectId, ObjectType, RoomName};

    use super::*;

    fn container() -> RoomObjectSnapshot {
        let mut obj = RoomObjectSnapshot::new(
            ObjectId::from("box"),
            ObjectType::Container,
            RoomName::from("W1N1"),
            4,
            4,
        );
        obj.store.insert("energy".into(), 70);
        obj
    }

    #[test]
    fn nothing_staged_returns_base() {
        let pending: Pending<RoomObjectSnapshot, RoomObjectPatch> = Pending::default();
        assert_eq!(pending.resolve(Some(&container())).unwrap(), Some(container()));
        assert_eq!(pending.resolve(None).unwrap(), None);
    }

    #[test]
    fn patch_is_laid_over_base() {
        let pending = Pending {
            patch: Some(RoomObjectPatch::store_entry("energy", 20)),
            ..Pending::default()
        };
        let resolved = pending.resolve(Some(&container())).unwrap().unwrap();
        assert_eq!(resolved.store_amount("energy"), 20);
    }

    #[test]
    fn removal_hides_the_document() {
        let pending: Pending<RoomObjectSnapshot, RoomObjectPatch> = Pending {
            removed: true,
            ..Pending::default()
        };
        assert!(pending.resolve(Some(&container())).unwrap().is_none());
    }

    #[test]
    fn upsert_replaces_base() {
        let mut fresh = container();
        fresh.store.insert("energy".into(), 1);
        let pending = Pending {
            upsert: Some(fresh),
            patch: Some(RoomObjectPatch {
                hits: Some(9),
                ..RoomObjectPatch::default()
            }),
            removed: false,
        };
        let resolved = pending.resolve(Some(&container())).unwrap().unwrap();
        assert_eq!(resolved.store_amount("energy"), 1);
        assert_eq!(resolved.hits, Some(9));
    }
}
