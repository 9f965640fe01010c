//! Global snapshot builder.

use std::sync::Arc;

use hive_blueprints::enrich;
use hive_db::{DocumentKind, GlobalDocuments, WorldDataSource};
use hive_types::{
    GlobalMarketSnapshot, GlobalSnapshot, MarketOrderSnapshot, PowerCreepSnapshot,
    RoomInfoSnapshot, RoomName, RoomObjectSnapshot, UserState,
};

use crate::error::SnapshotError;
use crate::provider::SnapshotBuilder;
use crate::room::{parse_document, parse_object};
use crate::typing::type_user_intents;

fn parse_objects(
    documents: Vec<serde_json::Value>,
    game_time: u64,
) -> Result<Vec<RoomObjectSnapshot>, SnapshotError> {
    documents
        .into_iter()
        .map(|doc| {
            let room = RoomName::from(
                doc.get("room")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default(),
            );
            let mut object = parse_object(&room, game_time, doc)?;
            enrich(&mut object, 0);
            Ok(object)
        })
        .collect()
}

/// Assemble the global snapshot from raw documents.
pub fn assemble_global(
    game_time: u64,
    documents: GlobalDocuments,
) -> Result<GlobalSnapshot, SnapshotError> {
    let inter_room_creeps = parse_objects(documents.inter_room_creeps, game_time)?;
    let special_objects = parse_objects(documents.special_objects, game_time)?;

    let accessible_rooms = documents
        .rooms
        .into_iter()
        .map(|doc| {
            parse_document::<RoomInfoSnapshot>(DocumentKind::Rooms, game_time, doc)
                .map(|info| (info.room.clone(), info))
        })
        .collect::<Result<_, _>>()?;

    let orders = documents
        .orders
        .into_iter()
        .map(|doc| {
            parse_document::<MarketOrderSnapshot>(DocumentKind::MarketOrders, game_time, doc)
                .map(|order| (order.id.clone(), order))
        })
        .collect::<Result<_, _>>()?;

    let users = documents
        .users
        .into_iter()
        .map(|doc| {
            parse_document::<UserState>(DocumentKind::Users, game_time, doc)
                .map(|user| (user.id.clone(), user))
        })
        .collect::<Result<_, _>>()?;

    let power_creeps = documents
        .power_creeps
        .into_iter()
        .map(|doc| {
            parse_document::<PowerCreepSnapshot>(DocumentKind::PowerCreeps, game_time, doc)
                .map(|pc| (pc.id.clone(), pc))
        })
        .collect::<Result<_, _>>()?;

    let user_intents = documents
        .user_intents
        .as_ref()
        .map(type_user_intents)
        .unwrap_or_default();

    Ok(GlobalSnapshot {
        game_time,
        inter_room_creeps,
        accessible_rooms,
        special_objects,
        market: GlobalMarketSnapshot {
            orders,
            users,
            power_creeps,
            user_intents,
        },
    })
}

/// Builds the [`GlobalSnapshot`] from a [`WorldDataSource`].
///
/// The key is `()`: there is one global partition per tick.
pub struct GlobalSnapshotBuilder<S> {
    source: Arc<S>,
}

impl<S> GlobalSnapshotBuilder<S> {
    /// Read from `source`.
    pub const fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

impl<S: WorldDataSource> SnapshotBuilder for GlobalSnapshotBuilder<S> {
    type Key = ();
    type Snapshot = GlobalSnapshot;

    async fn build(&self, _key: &(), game_time: u64) -> Result<GlobalSnapshot, SnapshotError> {
        let documents = self.source.load_global().await?;
        let snapshot = assemble_global(game_time, documents)?;
        tracing::debug!(
            tick = game_time,
            rooms = snapshot.accessible_rooms.len(),
            orders = snapshot.market.orders.len(),
            user_intents = snapshot.market.user_intents.len(),
            "Assembled global snapshot"
        );
        Ok(snapshot)
    }
}
