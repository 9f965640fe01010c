//! Market order intents and order activation.
//!
//! Prices are kept in milli-credits on orders and converted to credits
//! only for balances and ledger rows. Listing fees are charged as 5% of
//! price times amount. Funds were checked during validation, so a
//! balance that goes negative here is recorded as is.

use hive_blueprints::{credits_to_millis, market_fee_millis, millis_to_credits};
use hive_types::intents::{names, target_room};
use hive_types::{
    GlobalUserIntent, MarketLogDetails, MarketOrderPatch, MarketOrderSnapshot, MoneyLogEntry,
    MoneyLogType, ObjectId, OrderId, OrderType, UserPatch,
};

use super::{GlobalProcessorContext, GlobalProcessorStep};
use crate::error::ProcessorError;

/// Id partition for new orders.
const ORDER_PARTITION: &str = "market.orders";
/// Id partition for money ledger rows.
const MONEY_PARTITION: &str = "users.money";

/// Applies `createOrder`, `changeOrderPrice`, `cancelOrder` and
/// `extendOrder`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketIntentsStep;

impl GlobalProcessorStep for MarketIntentsStep {
    fn name(&self) -> &'static str {
        "market-intents"
    }

    fn run(&self, ctx: &mut GlobalProcessorContext<'_>) -> Result<(), ProcessorError> {
        for intent in ctx.named(names::CREATE_ORDER) {
            create_order(ctx, intent)?;
        }
        for intent in ctx.named(names::CHANGE_ORDER_PRICE) {
            change_price(ctx, intent)?;
        }
        for intent in ctx.named(names::CANCEL_ORDER) {
            if let Some(order) = owned_order(ctx, intent)? {
                ctx.writer().remove_order(&order.id);
            }
        }
        for intent in ctx.named(names::EXTEND_ORDER) {
            extend_order(ctx, intent)?;
        }
        Ok(())
    }
}

/// Debit `fee_millis` from the order owner and record it in the ledger.
fn charge_fee(
    ctx: &mut GlobalProcessorContext<'_>,
    order: &MarketOrderSnapshot,
    fee_millis: i64,
    amount: i64,
) -> Result<(), ProcessorError> {
    if fee_millis <= 0 {
        return Ok(());
    }
    let Some(user) = ctx.user(&order.user)? else {
        return Ok(());
    };
    let change = millis_to_credits(fee_millis.saturating_neg());
    let balance = user.money.saturating_add(change);
    ctx.writer().patch_user(
        &order.user,
        UserPatch {
            money: Some(balance),
            ..UserPatch::default()
        },
    );

    let sequence = ctx.next_sequence();
    ctx.writer().log_money(MoneyLogEntry {
        id: ObjectId::derive(MONEY_PARTITION, ctx.game_time(), sequence),
        date: ctx.now_ms(),
        tick: ctx.game_time(),
        user: order.user.clone(),
        log_type: MoneyLogType::MarketFee,
        balance,
        change,
        market: Some(MarketLogDetails {
            order_id: order.id.clone(),
            order_type: order.order_type,
            resource_type: order.resource_type.clone(),
            room_name: order.room_name.clone(),
            price: millis_to_credits(order.price),
            amount,
        }),
    });
    tracing::debug!(
        tick = ctx.game_time(),
        user_id = %order.user,
        order_id = %order.id,
        fee = %change,
        "Market fee charged"
    );
    Ok(())
}

fn create_order(
    ctx: &mut GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<(), ProcessorError> {
    let Some(argument) = intent.record.first() else {
        return Ok(());
    };
    let order_type = argument.text("type").and_then(OrderType::parse);
    let resource = argument.text("resourceType");
    let price = argument.number("price").and_then(credits_to_millis);
    let total = argument.integer("totalAmount").filter(|n| *n > 0);
    let (Some(order_type), Some(resource), Some(price), Some(total)) =
        (order_type, resource, price, total)
    else {
        return Ok(());
    };

    let sequence = ctx.next_sequence();
    let order = MarketOrderSnapshot {
        id: OrderId::derive(ORDER_PARTITION, ctx.game_time(), sequence),
        created: ctx.game_time(),
        created_timestamp: ctx.now_ms(),
        user: intent.user.clone(),
        active: false,
        order_type,
        room_name: target_room(argument),
        resource_type: resource.to_owned(),
        price,
        amount: total,
        remaining_amount: total,
        total_amount: total,
    };
    ctx.writer().upsert_order(order.clone());
    charge_fee(ctx, &order, market_fee_millis(price, total), total)
}

/// The order an intent names, when it still exists and belongs to the
/// issuer.
fn owned_order(
    ctx: &GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<Option<MarketOrderSnapshot>, ProcessorError> {
    let Some(id) = intent
        .record
        .first()
        .and_then(|a| a.text("orderId"))
        .map(OrderId::from)
    else {
        return Ok(None);
    };
    Ok(ctx.order(&id)?.filter(|o| o.user == intent.user))
}

fn change_price(
    ctx: &mut GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<(), ProcessorError> {
    let Some(new_price) = intent
        .record
        .first()
        .and_then(|a| a.number("newPrice"))
        .and_then(credits_to_millis)
    else {
        return Ok(());
    };
    let Some(order) = owned_order(ctx, intent)? else {
        return Ok(());
    };
    if new_price == order.price {
        return Ok(());
    }
    ctx.writer().patch_order(
        &order.id,
        MarketOrderPatch {
            price: Some(new_price),
            ..MarketOrderPatch::default()
        },
    );
    let increase = new_price.saturating_sub(order.price);
    if increase > 0 {
        charge_fee(
            ctx,
            &order,
            market_fee_millis(increase, order.remaining_amount),
            order.remaining_amount,
        )?;
    }
    Ok(())
}

fn extend_order(
    ctx: &mut GlobalProcessorContext<'_>,
    intent: &GlobalUserIntent,
) -> Result<(), ProcessorError> {
    let Some(added) = intent
        .record
        .first()
        .and_then(|a| a.integer("addAmount"))
        .filter(|n| *n > 0)
    else {
        return Ok(());
    };
    let Some(order) = owned_order(ctx, intent)? else {
        return Ok(());
    };
    ctx.writer().patch_order(
        &order.id,
        MarketOrderPatch {
            amount: Some(order.amount.saturating_add(added)),
            remaining_amount: Some(order.remaining_amount.saturating_add(added)),
            total_amount: Some(order.total_amount.saturating_add(added)),
            ..MarketOrderPatch::default()
        },
    );
    charge_fee(ctx, &order, market_fee_millis(order.price, added), added)
}

/// Lists orders created in an earlier tick and delists exhausted ones.
///
/// An order tied to a room is only listed while its owner still owns
/// that room.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketActivationStep;

impl GlobalProcessorStep for MarketActivationStep {
    fn name(&self) -> &'static str {
        "market-activation"
    }

    fn run(&self, ctx: &mut GlobalProcessorContext<'_>) -> Result<(), ProcessorError> {
        let snapshot = ctx.snapshot();
        for id in snapshot.market.orders.keys() {
            let Some(order) = ctx.order(id)? else {
                continue;
            };
            let room_owned = order.room_name.as_ref().is_none_or(|room| {
                snapshot
                    .accessible_rooms
                    .get(room)
                    .and_then(|info| info.owner.as_ref())
                    == Some(&order.user)
            });
            let listable =
                order.created < ctx.game_time() && order.remaining_amount > 0 && room_owned;
            if listable != order.active {
                ctx.writer().patch_order(
                    id,
                    MarketOrderPatch {
                        active: Some(listable),
                        ..MarketOrderPatch::default()
                    },
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use hive_types::test_support::{self, intent, number, owner, text};
    use hive_types::{GlobalSnapshot, RoomInfoSnapshot, RoomName, UserId};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::global::testing::run_global;

    fn market(game_time: u64) -> GlobalSnapshot {
        let mut snapshot = GlobalSnapshot {
            game_time,
            ..GlobalSnapshot::default()
        };
        snapshot
            .market
            .users
            .insert(owner(), test_support::user(&owner(), dec!(100000)));
        snapshot
    }

    fn submit(snapshot: &mut GlobalSnapshot, user: &UserId, record: hive_types::IntentRecord) {
        snapshot.market.user_intents.push(GlobalUserIntent {
            user: user.clone(),
            record,
        });
    }

    fn order(id: &str, price: i64, remaining: i64) -> MarketOrderSnapshot {
        MarketOrderSnapshot {
            id: OrderId::from(id),
            created: 10,
            created_timestamp: 0,
            user: owner(),
            active: false,
            order_type: OrderType::Sell,
            room_name: None,
            resource_type: "energy".into(),
            price,
            amount: remaining,
            remaining_amount: remaining,
            total_amount: remaining,
        }
    }

    #[test]
    fn create_order_lists_inactive_and_charges_fee() {
        let mut snapshot = market(50);
        submit(
            &mut snapshot,
            &owner(),
            intent(
                names::CREATE_ORDER,
                vec![
                    ("type", text("sell")),
                    ("resourceType", text("energy")),
                    ("price", number(5)),
                    ("totalAmount", number(100)),
                ],
            ),
        );
        let batch = run_global(&snapshot, &[&MarketIntentsStep]);

        assert_eq!(batch.orders.upserts.len(), 1);
        let order = batch.orders.upserts.values().next().unwrap();
        assert!(!order.active);
        assert_eq!(order.price, 5000);
        assert_eq!(order.remaining_amount, 100);

        assert_eq!(batch.money_log.len(), 1);
        let entry = batch.money_log.first().unwrap();
        assert_eq!(entry.log_type, MoneyLogType::MarketFee);
        assert_eq!(entry.change, dec!(-25));
        assert_eq!(entry.balance, dec!(99975));
        assert_eq!(
            batch.user_patches.get(&owner()).unwrap().money,
            Some(dec!(99975))
        );
    }

    #[test]
    fn two_orders_debit_cumulatively() {
        let mut snapshot = market(50);
        for _ in 0..2 {
            submit(
                &mut snapshot,
                &owner(),
                intent(
                    names::CREATE_ORDER,
                    vec![
                        ("type", text("buy")),
                        ("resourceType", text("H")),
                        ("price", number(1)),
                        ("totalAmount", number(1000)),
                    ],
                ),
            );
        }
        let batch = run_global(&snapshot, &[&MarketIntentsStep]);
        assert_eq!(batch.orders.upserts.len(), 2);
        assert_eq!(
            batch.user_patches.get(&owner()).unwrap().money,
            Some(dec!(99900))
        );
    }

    #[test]
    fn overdrawn_balance_is_recorded_as_is() {
        let mut snapshot = market(50);
        snapshot
            .market
            .users
            .insert(owner(), test_support::user(&owner(), dec!(30)));
        for _ in 0..2 {
            submit(
                &mut snapshot,
                &owner(),
                intent(
                    names::CREATE_ORDER,
                    vec![
                        ("type", text("sell")),
                        ("resourceType", text("energy")),
                        ("price", number(5)),
                        ("totalAmount", number(100)),
                    ],
                ),
            );
        }
        let batch = run_global(&snapshot, &[&MarketIntentsStep]);
        assert_eq!(batch.orders.upserts.len(), 2);
        assert_eq!(
            batch.user_patches.get(&owner()).unwrap().money,
            Some(dec!(-20))
        );
        assert_eq!(batch.money_log.last().unwrap().balance, dec!(-20));
    }

    #[test]
    fn price_increase_is_charged_and_decrease_is_free() {
        let mut snapshot = market(50);
        snapshot
            .market
            .orders
            .insert(OrderId::from("o1"), order("o1", 2000, 100));
        snapshot
            .market
            .orders
            .insert(OrderId::from("o2"), order("o2", 2000, 100));
        submit(
            &mut snapshot,
            &owner(),
            intent(names::CHANGE_ORDER_PRICE, vec![("orderId", text("o1")), ("newPrice", number(4))]),
        );
        submit(
            &mut snapshot,
            &owner(),
            intent(names::CHANGE_ORDER_PRICE, vec![("orderId", text("o2")), ("newPrice", number(1))]),
        );
        let batch = run_global(&snapshot, &[&MarketIntentsStep]);
        assert_eq!(
            batch.orders.patches.get(&OrderId::from("o1")).unwrap().price,
            Some(4000)
        );
        assert_eq!(
            batch.orders.patches.get(&OrderId::from("o2")).unwrap().price,
            Some(1000)
        );
        // 2 credits x 100 x 5%.
        assert_eq!(batch.money_log.len(), 1);
        assert_eq!(batch.money_log.first().unwrap().change, dec!(-10));
    }

    #[test]
    fn cancel_and_extend() {
        let mut snapshot = market(50);
        snapshot
            .market
            .orders
            .insert(OrderId::from("o1"), order("o1", 1000, 100));
        snapshot
            .market
            .orders
            .insert(OrderId::from("o2"), order("o2", 1000, 100));
        submit(
            &mut snapshot,
            &owner(),
            intent(names::CANCEL_ORDER, vec![("orderId", text("o1"))]),
        );
        submit(
            &mut snapshot,
            &owner(),
            intent(names::EXTEND_ORDER, vec![("orderId", text("o2")), ("addAmount", number(40))]),
        );
        let batch = run_global(&snapshot, &[&MarketIntentsStep]);
        assert!(batch.orders.removals.contains(&OrderId::from("o1")));
        let patch = batch.orders.patches.get(&OrderId::from("o2")).unwrap();
        assert_eq!(patch.remaining_amount, Some(140));
        assert_eq!(patch.total_amount, Some(140));
        assert_eq!(batch.money_log.first().unwrap().change, dec!(-2));
    }

    #[test]
    fn activation_requires_an_earlier_tick_and_an_owned_room() {
        let mut snapshot = market(50);
        let mut fresh = order("fresh", 1000, 100);
        fresh.created = 50;
        let mut lost_room = order("lost", 1000, 100);
        lost_room.room_name = Some(RoomName::from("W2N2"));
        let mut exhausted = order("done", 1000, 0);
        exhausted.active = true;
        for o in [order("ready", 1000, 100), fresh, lost_room, exhausted] {
            snapshot.market.orders.insert(o.id.clone(), o);
        }
        snapshot.accessible_rooms.insert(
            RoomName::from("W2N2"),
            RoomInfoSnapshot::new(RoomName::from("W2N2")),
        );

        let batch = run_global(&snapshot, &[&MarketActivationStep]);
        let active = |id: &str| {
            batch
                .orders
                .patches
                .get(&OrderId::from(id))
                .and_then(|p| p.active)
        };
        assert_eq!(active("ready"), Some(true));
        assert_eq!(active("fresh"), None);
        assert_eq!(active("lost"), None);
        assert_eq!(active("done"), Some(false));
    }
}
