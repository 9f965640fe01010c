//! Standard global intent validators.
//!
//! Registered by [`ValidationPipeline::global_default`] in this order:
//! [`GlobalIntentSchemaValidator`], [`MarketOrderValidator`],
//! [`MarketFundsValidator`], [`PowerCreepValidator`].
//!
//! [`ValidationPipeline::global_default`]: crate::ValidationPipeline::global_default

use hive_blueprints::constants::{
    MARKET_MAX_ORDERS, POWER_CREEP_MAX_LEVEL, POWER_CREEP_NAME_MAX_LENGTH,
};
use hive_blueprints::{credits_to_millis, market_fee_millis, millis_to_credits, power_level};
use hive_types::intents::names;
use hive_types::{
    GlobalSnapshot, GlobalUserIntent, IntentArgument, MarketOrderSnapshot, OrderId, OrderType,
    PowerClass, PowerCreepSnapshot, UserId,
};

use crate::pipeline::{IntentValidator, ValidationPipeline, ValidationRun};
use crate::result::{ErrorCode, ValidationResult};
use crate::schema::global_schema;

const fn require(condition: bool, code: ErrorCode) -> Result<(), ErrorCode> {
    if condition { Ok(()) } else { Err(code) }
}

fn argument(intent: &GlobalUserIntent) -> Result<&IntentArgument, ErrorCode> {
    intent.record.first().ok_or(ErrorCode::InvalidArgs)
}

fn positive_integer(argument: &IntentArgument, field: &str) -> Result<i64, ErrorCode> {
    argument
        .integer(field)
        .filter(|n| *n > 0)
        .ok_or(ErrorCode::InvalidArgs)
}

fn price_millis(argument: &IntentArgument, field: &str) -> Result<i64, ErrorCode> {
    argument
        .number(field)
        .and_then(credits_to_millis)
        .ok_or(ErrorCode::InvalidArgs)
}

fn owned_order<'a>(
    intent: &GlobalUserIntent,
    snapshot: &'a GlobalSnapshot,
) -> Result<&'a MarketOrderSnapshot, ErrorCode> {
    let id = argument(intent)?
        .text("orderId")
        .map(OrderId::from)
        .ok_or(ErrorCode::InvalidArgs)?;
    let order = snapshot
        .market
        .orders
        .get(&id)
        .ok_or(ErrorCode::TargetNotFound)?;
    require(order.user == intent.user, ErrorCode::NotOwner)?;
    Ok(order)
}

fn owned_power_creep<'a>(
    intent: &GlobalUserIntent,
    snapshot: &'a GlobalSnapshot,
) -> Result<&'a PowerCreepSnapshot, ErrorCode> {
    let id = argument(intent)?
        .object_id("id")
        .ok_or(ErrorCode::InvalidArgs)?;
    let creep = snapshot
        .market
        .power_creeps
        .get(&id)
        .ok_or(ErrorCode::TargetNotFound)?;
    require(creep.user == intent.user, ErrorCode::NotOwner)?;
    Ok(creep)
}

/// Power levels of `user` not yet spent on power creeps.
///
/// Every power creep costs one level plus one per upgrade.
pub fn free_power_levels(snapshot: &GlobalSnapshot, user: &UserId) -> u32 {
    let Some(state) = snapshot.market.users.get(user) else {
        return 0;
    };
    let spent = snapshot
        .market
        .power_creeps
        .values()
        .filter(|pc| pc.user == *user)
        .fold(0_u32, |acc, pc| acc.saturating_add(pc.level).saturating_add(1));
    power_level(state.power).saturating_sub(spent)
}

/// Fee in milli-credits the intent will charge, if it charges one.
pub fn intent_fee_millis(intent: &GlobalUserIntent, snapshot: &GlobalSnapshot) -> Option<i64> {
    let argument = intent.record.first()?;
    match intent.record.name.as_str() {
        names::CREATE_ORDER => {
            let price = price_millis(argument, "price").ok()?;
            let amount = argument.integer("totalAmount")?;
            Some(market_fee_millis(price, amount))
        }
        names::CHANGE_ORDER_PRICE => {
            let order = owned_order(intent, snapshot).ok()?;
            let new_price = price_millis(argument, "newPrice").ok()?;
            let increase = new_price.saturating_sub(order.price);
            (increase > 0).then(|| market_fee_millis(increase, order.remaining_amount))
        }
        names::EXTEND_ORDER => {
            let order = owned_order(intent, snapshot).ok()?;
            let added = argument.integer("addAmount")?;
            Some(market_fee_millis(order.price, added))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// The intent exists, its fields are well formed, and the user is known.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalIntentSchemaValidator;

impl GlobalIntentSchemaValidator {
    fn check(intent: &GlobalUserIntent, snapshot: &GlobalSnapshot) -> Result<(), ErrorCode> {
        let schema = global_schema(&intent.record.name).ok_or(ErrorCode::UnknownIntent)?;
        if let ValidationResult::Failure(code) = schema.check_arguments(&intent.record) {
            return Err(code);
        }
        require(
            snapshot.market.users.contains_key(&intent.user),
            ErrorCode::ActorNotFound,
        )?;

        let argument = argument(intent)?;
        match intent.record.name.as_str() {
            names::CREATE_ORDER => {
                argument
                    .text("type")
                    .and_then(OrderType::parse)
                    .ok_or(ErrorCode::InvalidArgs)?;
                price_millis(argument, "price")?;
                positive_integer(argument, "totalAmount").map(|_| ())
            }
            names::CHANGE_ORDER_PRICE => price_millis(argument, "newPrice").map(|_| ()),
            names::EXTEND_ORDER => positive_integer(argument, "addAmount").map(|_| ()),
            names::CREATE_POWER_CREEP => argument
                .text("className")
                .and_then(PowerClass::parse)
                .map(|_| ())
                .ok_or(ErrorCode::InvalidArgs),
            _ => Ok(()),
        }
    }
}

impl IntentValidator<GlobalUserIntent, GlobalSnapshot> for GlobalIntentSchemaValidator {
    fn name(&self) -> &'static str {
        "global-intent-schema"
    }

    fn validate(&self, intent: &GlobalUserIntent, snapshot: &GlobalSnapshot) -> ValidationResult {
        Self::check(intent, snapshot).into()
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Orders named by an intent exist and belong to the user; order count
/// stays within the per-user limit.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarketOrderValidator;

impl MarketOrderValidator {
    fn check(intent: &GlobalUserIntent, snapshot: &GlobalSnapshot) -> Result<(), ErrorCode> {
        match intent.record.name.as_str() {
            names::CHANGE_ORDER_PRICE | names::CANCEL_ORDER | names::EXTEND_ORDER => {
                owned_order(intent, snapshot).map(|_| ())
            }
            names::CREATE_ORDER => {
                let count = snapshot
                    .market
                    .orders
                    .values()
                    .filter(|o| o.user == intent.user)
                    .count();
                require(count < MARKET_MAX_ORDERS, ErrorCode::Full)
            }
            _ => Ok(()),
        }
    }
}

impl IntentValidator<GlobalUserIntent, GlobalSnapshot> for MarketOrderValidator {
    fn name(&self) -> &'static str {
        "market-order"
    }

    fn validate(&self, intent: &GlobalUserIntent, snapshot: &GlobalSnapshot) -> ValidationResult {
        Self::check(intent, snapshot).into()
    }
}

/// Fees must not exceed the user's balance.
///
/// Fees of the user's intents accepted earlier in the same run count
/// against the balance too. The market step itself never refuses a fee;
/// balances may go negative when this validator is not registered.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarketFundsValidator;

impl IntentValidator<GlobalUserIntent, GlobalSnapshot> for MarketFundsValidator {
    fn name(&self) -> &'static str {
        "market-funds"
    }

    fn validate(&self, intent: &GlobalUserIntent, snapshot: &GlobalSnapshot) -> ValidationResult {
        self.validate_in_run(intent, snapshot, &ValidationRun::new())
    }

    fn validate_in_run(
        &self,
        intent: &GlobalUserIntent,
        snapshot: &GlobalSnapshot,
        run: &ValidationRun,
    ) -> ValidationResult {
        let Some(fee) = intent_fee_millis(intent, snapshot) else {
            return ValidationResult::Success;
        };
        let balance = snapshot
            .market
            .users
            .get(&intent.user)
            .map(|u| u.money)
            .unwrap_or_default()
            .saturating_sub(run.spent(&intent.user));
        ValidationResult::check(millis_to_credits(fee) <= balance, ErrorCode::NotEnoughMoney)
    }

    fn commit(&self, intent: &GlobalUserIntent, snapshot: &GlobalSnapshot, run: &mut ValidationRun) {
        if let Some(fee) = intent_fee_millis(intent, snapshot) {
            run.spend(&intent.user, millis_to_credits(fee));
        }
    }
}

// ---------------------------------------------------------------------------
// Power creeps
// ---------------------------------------------------------------------------

/// Power creep intents target an owned creep, use a valid name and have
/// free power levels to spend.
#[derive(Debug, Default, Clone, Copy)]
pub struct PowerCreepValidator;

impl PowerCreepValidator {
    fn check_name(
        snapshot: &GlobalSnapshot,
        user: &UserId,
        name: &str,
    ) -> Result<(), ErrorCode> {
        let length = name.chars().count();
        require(
            length > 0 && length <= POWER_CREEP_NAME_MAX_LENGTH,
            ErrorCode::InvalidArgs,
        )?;
        let taken = snapshot
            .market
            .power_creeps
            .values()
            .any(|pc| pc.user == *user && pc.name == name);
        require(!taken, ErrorCode::NameExists)
    }

    fn check(intent: &GlobalUserIntent, snapshot: &GlobalSnapshot) -> Result<(), ErrorCode> {
        match intent.record.name.as_str() {
            names::CREATE_POWER_CREEP => {
                let name = argument(intent)?.text("name").ok_or(ErrorCode::InvalidArgs)?;
                Self::check_name(snapshot, &intent.user, name)?;
                require(
                    free_power_levels(snapshot, &intent.user) > 0,
                    ErrorCode::NotEnoughResources,
                )
            }
            names::RENAME_POWER_CREEP => {
                let creep = owned_power_creep(intent, snapshot)?;
                require(!creep.is_spawned(), ErrorCode::Busy)?;
                let name = argument(intent)?.text("name").ok_or(ErrorCode::InvalidArgs)?;
                Self::check_name(snapshot, &intent.user, name)
            }
            names::DELETE_POWER_CREEP => {
                let creep = owned_power_creep(intent, snapshot)?;
                require(!creep.is_spawned(), ErrorCode::Busy)
            }
            names::UPGRADE_POWER_CREEP => {
                let creep = owned_power_creep(intent, snapshot)?;
                require(creep.level < POWER_CREEP_MAX_LEVEL, ErrorCode::InvalidArgs)?;
                require(
                    free_power_levels(snapshot, &intent.user) > 0,
                    ErrorCode::NotEnoughResources,
                )
            }
            _ => Ok(()),
        }
    }
}

impl IntentValidator<GlobalUserIntent, GlobalSnapshot> for PowerCreepValidator {
    fn name(&self) -> &'static str {
        "power-creep"
    }

    fn validate(&self, intent: &GlobalUserIntent, snapshot: &GlobalSnapshot) -> ValidationResult {
        Self::check(intent, snapshot).into()
    }
}

impl ValidationPipeline<GlobalUserIntent, GlobalSnapshot> {
    /// The standard global pipeline, rejecting fees the balance cannot
    /// cover.
    pub fn global_default() -> Self {
        Self::global(true)
    }

    /// The global pipeline with the funds check switched by
    /// `reject_negative_balances`.
    pub fn global(reject_negative_balances: bool) -> Self {
        let pipeline = Self::new()
            .with(GlobalIntentSchemaValidator)
            .with(MarketOrderValidator);
        let pipeline = if reject_negative_balances {
            pipeline.with(MarketFundsValidator)
        } else {
            pipeline
        };
        pipeline.with(PowerCreepValidator)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use hive_types::test_support::{intent, number, owner, rival, text, user};
    use hive_types::{IntentFieldValue, ObjectId};
    use rust_decimal_macros::dec;

    use super::*;

    fn market(money: rust_decimal::Decimal) -> GlobalSnapshot {
        let mut snapshot = GlobalSnapshot::default();
        snapshot
            .market
            .users
            .insert(owner(), user(&owner(), money));
        snapshot
            .market
            .users
            .insert(rival(), user(&rival(), dec!(0)));
        snapshot.market.orders.insert(
            OrderId::from("o1"),
            MarketOrderSnapshot {
                id: OrderId::from("o1"),
                created: 1,
                created_timestamp: 0,
                user: owner(),
                active: true,
                order_type: OrderType::Sell,
                room_name: None,
                resource_type: "energy".into(),
                price: 1000,
                amount: 50,
                remaining_amount: 50,
                total_amount: 50,
            },
        );
        snapshot
    }

    fn global(user: &UserId, record: hive_types::IntentRecord) -> GlobalUserIntent {
        GlobalUserIntent {
            user: user.clone(),
            record,
        }
    }

    fn create_order(price: i32, amount: i32) -> hive_types::IntentRecord {
        intent(
            names::CREATE_ORDER,
            vec![
                ("type", text("sell")),
                ("resourceType", text("energy")),
                ("price", number(price)),
                ("totalAmount", number(amount)),
            ],
        )
    }

    #[test]
    fn create_order_schema() {
        let snap = market(dec!(100));
        let ok = global(&owner(), create_order(5, 100));
        assert!(GlobalIntentSchemaValidator.validate(&ok, &snap).is_success());

        let bad_type = global(
            &owner(),
            intent(
                names::CREATE_ORDER,
                vec![
                    ("type", text("lend")),
                    ("resourceType", text("energy")),
                    ("price", number(5)),
                    ("totalAmount", number(100)),
                ],
            ),
        );
        assert_eq!(
            GlobalIntentSchemaValidator.validate(&bad_type, &snap),
            ValidationResult::Failure(ErrorCode::InvalidArgs)
        );

        let stranger = global(&UserId::from("nobody"), create_order(5, 100));
        assert_eq!(
            GlobalIntentSchemaValidator.validate(&stranger, &snap),
            ValidationResult::Failure(ErrorCode::ActorNotFound)
        );
    }

    #[test]
    fn foreign_order_is_not_owned() {
        let snap = market(dec!(100));
        let cancel = global(
            &rival(),
            intent(names::CANCEL_ORDER, vec![("orderId", text("o1"))]),
        );
        assert_eq!(
            MarketOrderValidator.validate(&cancel, &snap),
            ValidationResult::Failure(ErrorCode::NotOwner)
        );
        let missing = global(
            &owner(),
            intent(names::CANCEL_ORDER, vec![("orderId", text("o9"))]),
        );
        assert_eq!(
            MarketOrderValidator.validate(&missing, &snap),
            ValidationResult::Failure(ErrorCode::TargetNotFound)
        );
    }

    #[test]
    fn funds_cover_fee() {
        let rich = market(dec!(25));
        let order = global(&owner(), create_order(5, 100));
        assert!(MarketFundsValidator.validate(&order, &rich).is_success());

        let poor = market(dec!(24.999));
        assert_eq!(
            MarketFundsValidator.validate(&order, &poor),
            ValidationResult::Failure(ErrorCode::NotEnoughMoney)
        );
    }

    #[test]
    fn fees_of_one_user_add_up_within_a_run() {
        // 30 credits cover one 25-credit listing fee but not two.
        let mut snap = market(dec!(30));
        for _ in 0..2 {
            snap.market
                .user_intents
                .push(global(&owner(), create_order(5, 100)));
        }
        snap.market
            .user_intents
            .push(global(&owner(), intent(names::CANCEL_ORDER, vec![("orderId", text("o1"))])));

        let accepted = ValidationPipeline::global(true).validate(&snap);
        let accepted_names: Vec<&str> = accepted.iter().map(|i| i.record.name.as_str()).collect();
        assert_eq!(accepted_names, vec![names::CREATE_ORDER, names::CANCEL_ORDER]);
    }

    #[test]
    fn other_users_do_not_share_a_budget() {
        let mut snap = market(dec!(25));
        snap.market.users.insert(rival(), user(&rival(), dec!(25)));
        snap.market
            .user_intents
            .push(global(&owner(), create_order(5, 100)));
        snap.market
            .user_intents
            .push(global(&rival(), create_order(5, 100)));
        assert_eq!(ValidationPipeline::global(true).validate(&snap).len(), 2);
    }

    #[test]
    fn overdraw_is_accepted_without_the_funds_policy() {
        let mut snap = market(dec!(30));
        for _ in 0..2 {
            snap.market
                .user_intents
                .push(global(&owner(), create_order(5, 100)));
        }
        assert_eq!(ValidationPipeline::global(false).validate(&snap).len(), 2);
        assert_eq!(ValidationPipeline::global(true).validate(&snap).len(), 1);
    }

    #[test]
    fn price_decrease_is_free() {
        let snap = market(dec!(0));
        let cheaper = global(
            &owner(),
            intent(
                names::CHANGE_ORDER_PRICE,
                vec![
                    ("orderId", text("o1")),
                    ("newPrice", IntentFieldValue::Number(0.5)),
                ],
            ),
        );
        assert_eq!(intent_fee_millis(&cheaper, &snap), None);
        assert!(MarketFundsValidator.validate(&cheaper, &snap).is_success());
    }

    #[test]
    fn funds_check_is_optional() {
        assert_eq!(
            ValidationPipeline::global_default().validator_names(),
            vec!["global-intent-schema", "market-order", "market-funds", "power-creep"]
        );
        assert!(
            !ValidationPipeline::global(false)
                .validator_names()
                .contains(&"market-funds")
        );
    }

    #[test]
    fn power_creep_rules() {
        let mut snap = market(dec!(0));
        snap.market.users.get_mut(&owner()).unwrap().power = 4000;
        snap.market.power_creeps.insert(
            ObjectId::from("pc1"),
            PowerCreepSnapshot {
                id: ObjectId::from("pc1"),
                user: owner(),
                name: "Alpha".into(),
                class_name: PowerClass::Operator,
                level: 0,
                powers: BTreeMap::new(),
                room: None,
                spawn_cooldown_time: None,
                delete_time: None,
            },
        );
        assert_eq!(free_power_levels(&snap, &owner()), 1);

        let duplicate = global(
            &owner(),
            intent(
                names::CREATE_POWER_CREEP,
                vec![("name", text("Alpha")), ("className", text("operator"))],
            ),
        );
        assert_eq!(
            PowerCreepValidator.validate(&duplicate, &snap),
            ValidationResult::Failure(ErrorCode::NameExists)
        );

        let rename = global(
            &owner(),
            intent(
                names::RENAME_POWER_CREEP,
                vec![("id", text("pc1")), ("name", text("Beta"))],
            ),
        );
        assert!(PowerCreepValidator.validate(&rename, &snap).is_success());

        snap.market
            .power_creeps
            .get_mut(&ObjectId::from("pc1"))
            .unwrap()
            .room = Some(hive_types::RoomName::from("W1N1"));
        assert_eq!(
            PowerCreepValidator.validate(&rename, &snap),
            ValidationResult::Failure(ErrorCode::Busy)
        );
    }
}
