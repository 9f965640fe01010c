//! Market fees and global power levels.
//!
//! Prices travel through the engine as integer milli-credits; balances are
//! [`Decimal`] credits. Conversions happen only here.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::constants::{BASIS_POINTS, MARKET_FEE_BASIS_POINTS, MILLIS_PER_CREDIT, POWER_LEVEL_MULTIPLY};

/// Convert a credit price submitted by a player into milli-credits.
///
/// Returns `None` for non-finite, non-positive or out-of-range prices.
pub fn credits_to_millis(credits: f64) -> Option<i64> {
    if !credits.is_finite() || credits <= 0.0 {
        return None;
    }
    let millis = Decimal::try_from(credits)
        .ok()?
        .checked_mul(Decimal::from(MILLIS_PER_CREDIT))?
        .round();
    millis.to_i64().filter(|m| *m > 0)
}

/// Express milli-credits as a credit amount.
pub fn millis_to_credits(millis: i64) -> Decimal {
    Decimal::new(millis, 3)
}

/// Listing fee, in milli-credits, for `amount` units at `price_millis`.
///
/// The fee is `price * amount * 5%`, truncated toward zero.
pub fn market_fee_millis(price_millis: i64, amount: i64) -> i64 {
    price_millis
        .saturating_mul(amount)
        .saturating_mul(MARKET_FEE_BASIS_POINTS)
        .checked_div(BASIS_POINTS)
        .unwrap_or(0)
}

/// Global power level reached with `power` processed power.
pub fn power_level(power: i64) -> u32 {
    let Ok(units) = u64::try_from(power.checked_div(POWER_LEVEL_MULTIPLY).unwrap_or(0)) else {
        return 0;
    };
    u32::try_from(units.isqrt()).unwrap_or(u32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fee_for_hundred_units_at_five_credits() {
        let price = credits_to_millis(5.0).unwrap();
        assert_eq!(price, 5000);
        let fee = market_fee_millis(price, 100);
        assert_eq!(fee, 25_000);
        assert_eq!(millis_to_credits(fee), Decimal::from(25));
    }

    #[test]
    fn fractional_prices_convert_to_millis() {
        assert_eq!(credits_to_millis(0.25), Some(250));
        assert_eq!(credits_to_millis(1.5), Some(1500));
        assert_eq!(credits_to_millis(0.0), None);
        assert_eq!(credits_to_millis(-1.0), None);
        assert_eq!(credits_to_millis(f64::NAN), None);
    }

    #[test]
    fn power_levels_follow_square_curve() {
        assert_eq!(power_level(0), 0);
        assert_eq!(power_level(999), 0);
        assert_eq!(power_level(1000), 1);
        assert_eq!(power_level(3999), 1);
        assert_eq!(power_level(4000), 2);
        assert_eq!(power_level(-5), 0);
    }
}
