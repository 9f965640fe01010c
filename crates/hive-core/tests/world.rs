//! End-to-end ticks over the in-memory store.
//!
//! Each test seeds raw documents and intents the way the player runtime
//! would, runs whole ticks through [`TickEngine`], and inspects the stored
//! documents afterwards.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::str::FromStr;
use std::sync::Arc;

use hive_core::{
    EngineEvent, EngineStopReason, EventBus, NoOpListener, OperatorState, TickEngine,
    TickEngineOptions, run_engine, seed_environment,
};
use hive_db::{DocumentKind, EnvKey, EnvironmentStore, IntentStore, MemoryStore};
use hive_types::BodyPartType;
use hive_types::test_support::{self, owner, room};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

fn store_with_spawn(energy: i64) -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.add_room(&room()).unwrap();
    for object in [
        test_support::controller("ctrl", 1, Some(&owner())),
        test_support::spawn("s1", &owner(), 10, 10, energy),
    ] {
        store
            .put_document(DocumentKind::RoomObjects, serde_json::to_value(object).unwrap())
            .unwrap();
    }
    store
        .put_document(
            DocumentKind::Users,
            serde_json::to_value(test_support::user(&owner(), dec!(100000))).unwrap(),
        )
        .unwrap();
    Arc::new(store)
}

fn engine(store: &Arc<MemoryStore>) -> TickEngine<MemoryStore, MemoryStore> {
    TickEngine::new(
        Arc::clone(store),
        Some(Arc::clone(store)),
        TickEngineOptions {
            history_chunk_size: 5,
            ..TickEngineOptions::default()
        },
        EventBus::default(),
    )
}

fn money(document: &Value) -> Decimal {
    match &document["money"] {
        Value::String(text) => Decimal::from_str(text).unwrap(),
        other => Decimal::from_str(&other.to_string()).unwrap(),
    }
}

fn create_creep(name: &str) -> Value {
    json!({"users": {"user1": {"objects": {"s1": {
        "createCreep": {"name": name, "body": ["move", "work", "carry"]}
    }}}}})
}

#[tokio::test]
async fn spawning_a_creep_drains_the_spawn() {
    let store = store_with_spawn(200);
    store
        .save_room_intents(&room(), create_creep("bob"))
        .await
        .unwrap();
    let engine = engine(&store);

    let summary = engine.run_tick(100).await.unwrap();

    assert!(summary.failed_rooms.is_empty());
    assert_eq!(summary.validation.accepted, 1);
    let spawn = store.document(DocumentKind::RoomObjects, "s1").unwrap();
    assert_eq!(spawn["store"]["energy"], 0);
    assert_eq!(spawn["spawningState"]["name"], "bob");
    assert_eq!(store.write_count(DocumentKind::RoomObjects, "s1"), 1);

    let creeps: Vec<Value> = store
        .documents(DocumentKind::RoomObjects)
        .into_iter()
        .filter(|o| o["type"] == "creep")
        .collect();
    assert_eq!(creeps.len(), 1);
    assert_eq!(creeps[0]["name"], "bob");
    assert_eq!(creeps[0]["spawning"], true);

    // Processed intents are gone before the next tick.
    assert!(store.room_intents(&room()).is_none());
}

#[tokio::test]
async fn unaffordable_creep_is_a_no_op() {
    let store = store_with_spawn(150);
    store
        .save_room_intents(&room(), create_creep("bob"))
        .await
        .unwrap();
    let engine = engine(&store);

    let summary = engine.run_tick(100).await.unwrap();

    assert!(summary.failed_rooms.is_empty());
    let spawn = store.document(DocumentKind::RoomObjects, "s1").unwrap();
    assert_eq!(spawn["store"]["energy"], 150);
    assert_eq!(store.write_count(DocumentKind::RoomObjects, "s1"), 0);
}

#[tokio::test]
async fn market_order_charges_the_listing_fee() {
    let store = store_with_spawn(0);
    store
        .save_user_intents(json!([{"user": "user1", "intents": {"createOrder": {
            "type": "sell", "resourceType": "energy", "price": 5, "totalAmount": 100
        }}}]))
        .await
        .unwrap();
    let engine = engine(&store);

    let summary = engine.run_tick(50).await.unwrap();

    assert!(summary.global_writes > 0);
    let orders = store.documents(DocumentKind::MarketOrders);
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["active"], false);

    let user = store.document(DocumentKind::Users, "user1").unwrap();
    assert_eq!(money(&user), dec!(99975));
    assert_eq!(store.documents(DocumentKind::UsersMoney).len(), 1);

    // The order is listed on the following tick.
    engine.run_tick(51).await.unwrap();
    let orders = store.documents(DocumentKind::MarketOrders);
    assert_eq!(orders[0]["active"], true);
}

#[tokio::test]
async fn unfunded_order_is_rejected() {
    let store = store_with_spawn(0);
    store
        .put_document(
            DocumentKind::Users,
            serde_json::to_value(test_support::user(&owner(), dec!(10))).unwrap(),
        )
        .unwrap();
    store
        .save_user_intents(json!([{"user": "user1", "intents": {"createOrder": {
            "type": "sell", "resourceType": "energy", "price": 5, "totalAmount": 100
        }}}]))
        .await
        .unwrap();
    let engine = engine(&store);

    let summary = engine.run_tick(50).await.unwrap();

    assert_eq!(summary.validation.rejected, 1);
    assert!(store.documents(DocumentKind::MarketOrders).is_empty());
    let user = store.document(DocumentKind::Users, "user1").unwrap();
    assert_eq!(money(&user), dec!(10));
}

#[tokio::test]
async fn every_entry_of_an_order_batch_is_listed() {
    let store = store_with_spawn(0);
    store
        .save_user_intents(json!([{"user": "user1", "intents": {"createOrder": [
            {"type": "sell", "resourceType": "energy", "price": 5, "totalAmount": 100},
            {"type": "buy", "resourceType": "H", "price": 1, "totalAmount": 200}
        ]}}]))
        .await
        .unwrap();
    let engine = engine(&store);

    let summary = engine.run_tick(50).await.unwrap();

    assert_eq!(summary.validation.accepted, 2);
    assert_eq!(store.documents(DocumentKind::MarketOrders).len(), 2);
    let user = store.document(DocumentKind::Users, "user1").unwrap();
    // 25 + 10 credits of listing fees.
    assert_eq!(money(&user), dec!(99965));
}

#[tokio::test]
async fn batched_orders_share_one_balance() {
    let store = store_with_spawn(0);
    store
        .put_document(
            DocumentKind::Users,
            serde_json::to_value(test_support::user(&owner(), dec!(30))).unwrap(),
        )
        .unwrap();
    let order = json!({"type": "sell", "resourceType": "energy", "price": 5, "totalAmount": 100});
    store
        .save_user_intents(json!([{"user": "user1", "intents": {"createOrder": [order, order]}}]))
        .await
        .unwrap();
    let engine = engine(&store);

    let summary = engine.run_tick(50).await.unwrap();

    assert_eq!(summary.validation.accepted, 1);
    assert_eq!(summary.validation.rejected, 1);
    assert_eq!(store.documents(DocumentKind::MarketOrders).len(), 1);
    let user = store.document(DocumentKind::Users, "user1").unwrap();
    assert_eq!(money(&user), dec!(5));
}

#[tokio::test]
async fn balance_may_go_negative_without_the_funds_policy() {
    let store = store_with_spawn(0);
    store
        .put_document(
            DocumentKind::Users,
            serde_json::to_value(test_support::user(&owner(), dec!(30))).unwrap(),
        )
        .unwrap();
    let order = json!({"type": "sell", "resourceType": "energy", "price": 5, "totalAmount": 100});
    store
        .save_user_intents(json!([{"user": "user1", "intents": {"createOrder": [order, order]}}]))
        .await
        .unwrap();
    let engine: TickEngine<MemoryStore, MemoryStore> = TickEngine::new(
        Arc::clone(&store),
        None,
        TickEngineOptions {
            reject_negative_balances: false,
            ..TickEngineOptions::default()
        },
        EventBus::default(),
    );

    engine.run_tick(50).await.unwrap();

    assert_eq!(store.documents(DocumentKind::MarketOrders).len(), 2);
    let user = store.document(DocumentKind::Users, "user1").unwrap();
    assert_eq!(money(&user), dec!(-20));
}

#[tokio::test]
async fn history_records_a_full_chunk() {
    let store = store_with_spawn(200);
    let engine = engine(&store);

    for tick in 10..15 {
        if tick == 11 {
            store
                .save_room_intents(&room(), create_creep("bob"))
                .await
                .unwrap();
        }
        engine.run_tick(tick).await.unwrap();
    }

    let chunks = store.history_chunks();
    assert_eq!(chunks.len(), 1);
    let chunk = &chunks[0];
    assert_eq!(chunk.base, 10);
    assert_eq!(chunk.ticks.len(), 5);
    // Full state first, then only what changed.
    assert!(chunk.ticks[&10].get("s1").is_some());
    assert_eq!(chunk.ticks[&11]["s1"]["store"]["energy"], 0);
    assert!(chunk.ticks[&11]["s1"].get("x").is_none());
}

#[tokio::test]
async fn driving_loop_emits_stage_events() {
    let store = store_with_spawn(200);
    let engine = engine(&store);
    let mut events = engine.events().subscribe();
    seed_environment(store.as_ref(), &hive_core::config::EngineSection::default())
        .await
        .unwrap();
    let operator = Arc::new(OperatorState::new(0, 2));

    let result = run_engine(&engine, &operator, &mut NoOpListener).await.unwrap();

    assert_eq!(result.stop_reason, EngineStopReason::MaxTicksReached);
    assert_eq!(result.total_ticks, 2);
    assert_eq!(
        store.get(EnvKey::GameTime).await.unwrap().as_deref(),
        Some("3")
    );

    let mut completed = Vec::new();
    let mut rooms = 0_u32;
    while let Some(event) = events.try_recv() {
        match event {
            EngineEvent::TickCompleted(summary) => completed.push(summary.tick),
            EngineEvent::RoomProcessed { .. } => rooms = rooms.saturating_add(1),
            _ => {}
        }
    }
    assert_eq!(completed, vec![1, 2]);
    assert_eq!(rooms, 2);
}

#[tokio::test]
async fn failed_room_leaves_no_cross_room_writes() {
    // No terrain is stored for the room, so the creep's path search fails
    // after the power spawn step has already run.
    let store = MemoryStore::new();
    store.add_room(&room()).unwrap();
    let mut power_spawn = test_support::structure(
        "ps",
        hive_types::ObjectType::PowerSpawn,
        &owner(),
        10,
        10,
        100,
        5000,
    );
    power_spawn.store.insert("power".into(), 3);
    power_spawn
        .store_capacity_resource
        .insert("power".into(), 100);
    for object in [
        test_support::controller("ctrl", 8, Some(&owner())),
        power_spawn,
        test_support::creep("c1", &owner(), 20, 20, &[BodyPartType::Move]),
    ] {
        store
            .put_document(DocumentKind::RoomObjects, serde_json::to_value(object).unwrap())
            .unwrap();
    }
    store
        .put_document(
            DocumentKind::Users,
            serde_json::to_value(test_support::user(&owner(), dec!(100))).unwrap(),
        )
        .unwrap();
    let store = Arc::new(store);
    store
        .save_room_intents(
            &room(),
            json!({"users": {"user1": {"objects": {
                "ps": {"processPower": {}},
                "c1": {"moveTo": {"x": 22, "y": 20}}
            }}}}),
        )
        .await
        .unwrap();
    let engine = engine(&store);

    let summary = engine.run_tick(10).await.unwrap();
    assert_eq!(summary.failed_rooms, vec![room()]);
    assert!(store.room_intents(&room()).is_none());

    let summary = engine.run_tick(11).await.unwrap();
    assert!(summary.failed_rooms.is_empty());

    let user = store.document(DocumentKind::Users, "user1").unwrap();
    assert_eq!(user.get("power").and_then(Value::as_i64).unwrap_or(0), 0);
    let spawn = store.document(DocumentKind::RoomObjects, "ps").unwrap();
    assert_eq!(spawn["store"]["power"], 3);
}
