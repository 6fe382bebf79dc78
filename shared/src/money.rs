//! Unit / total money synchronization
//!
//! A cost (or price) is stored as a unit amount and a total amount that must
//! agree with the quantity. One side is the source the user typed, the other
//! is derived from it and rounded to cents.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest amount a `NUMERIC(14, 2)` column holds: 999,999,999,999.99
pub const MAX_MONEY: Decimal = Decimal::from_parts(0x107A_3FFF, 0x5AF3, 0, false, 2);

/// A synchronized amount would not fit the money columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("amount exceeds the maximum of {max}", max = MAX_MONEY)]
pub struct AmountTooLarge;

/// Which input the user changed last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangedField {
    Unit,
    Total,
    Qty,
}

impl ChangedField {
    /// Source side for a freshly supplied pair: unit wins over total
    pub fn from_supplied(unit: Option<Decimal>, total: Option<Decimal>) -> Option<Self> {
        match (unit, total) {
            (Some(_), _) => Some(ChangedField::Unit),
            (None, Some(_)) => Some(ChangedField::Total),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoneyInput {
    pub qty: i64,
    pub unit: Option<Decimal>,
    pub total: Option<Decimal>,
    pub changed_field: ChangedField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MoneyPair {
    pub unit: Option<Decimal>,
    pub total: Option<Decimal>,
}

impl MoneyPair {
    fn checked(self) -> Result<Self, AmountTooLarge> {
        let fits = |amount: Option<Decimal>| amount.map_or(true, |a| a.abs() <= MAX_MONEY);
        if fits(self.unit) && fits(self.total) {
            Ok(self)
        } else {
            Err(AmountTooLarge)
        }
    }
}

/// Round to cents, half away from zero
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Derive the missing side of a unit/total pair from the quantity.
///
/// With a non-positive quantity nothing is derived and the inputs are only
/// rounded. Fails when either side ends up above [`MAX_MONEY`].
pub fn sync_unit_total(input: &MoneyInput) -> Result<MoneyPair, AmountTooLarge> {
    let unit = input.unit.map(round_money);
    let total = input.total.map(round_money);

    if input.qty <= 0 {
        return MoneyPair { unit, total }.checked();
    }
    let qty = Decimal::from(input.qty);

    let from_unit = |u: Option<Decimal>| -> Result<MoneyPair, AmountTooLarge> {
        let total = u
            .map(|u| u.checked_mul(qty).map(round_money).ok_or(AmountTooLarge))
            .transpose()?;
        Ok(MoneyPair { unit: u, total })
    };
    // qty >= 1, so the division cannot grow the amount
    let from_total = |t: Option<Decimal>| MoneyPair {
        unit: t.map(|t| round_money(t / qty)),
        total: t,
    };

    let pair = match input.changed_field {
        ChangedField::Unit => from_unit(unit)?,
        ChangedField::Total => from_total(total),
        ChangedField::Qty => {
            if unit.is_some() {
                from_unit(unit)?
            } else if total.is_some() {
                from_total(total)
            } else {
                MoneyPair::default()
            }
        }
    };
    pair.checked()
}

/// Synchronize a freshly supplied pair, if either side was supplied
pub fn sync_supplied(
    qty: i64,
    unit: Option<Decimal>,
    total: Option<Decimal>,
) -> Result<MoneyPair, AmountTooLarge> {
    match ChangedField::from_supplied(unit, total) {
        Some(changed_field) => sync_unit_total(&MoneyInput {
            qty,
            unit,
            total,
            changed_field,
        }),
        None => Ok(MoneyPair::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_unit_drives_total() {
        let out = sync_unit_total(&MoneyInput {
            qty: 50,
            unit: Some(dec("2.00")),
            total: None,
            changed_field: ChangedField::Unit,
        })
        .unwrap();
        assert_eq!(out.unit, Some(dec("2.00")));
        assert_eq!(out.total, Some(dec("100.00")));
    }

    #[test]
    fn test_total_drives_unit_with_rounding() {
        let out = sync_unit_total(&MoneyInput {
            qty: 3,
            unit: Some(dec("9.99")),
            total: Some(dec("10")),
            changed_field: ChangedField::Total,
        })
        .unwrap();
        assert_eq!(out.unit, Some(dec("3.33")));
        assert_eq!(out.total, Some(dec("10")));
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        assert_eq!(round_money(dec("0.125")), dec("0.13"));
        assert_eq!(round_money(dec("2.675")), dec("2.68"));
    }

    #[test]
    fn test_cleared_unit_clears_total() {
        let out = sync_unit_total(&MoneyInput {
            qty: 5,
            unit: None,
            total: Some(dec("12")),
            changed_field: ChangedField::Unit,
        })
        .unwrap();
        assert_eq!(out, MoneyPair { unit: None, total: None });
    }

    #[test]
    fn test_qty_change_prefers_unit() {
        let out = sync_unit_total(&MoneyInput {
            qty: 4,
            unit: Some(dec("1.50")),
            total: Some(dec("3.00")),
            changed_field: ChangedField::Qty,
        })
        .unwrap();
        assert_eq!(out.total, Some(dec("6.00")));

        let out = sync_unit_total(&MoneyInput {
            qty: 4,
            unit: None,
            total: Some(dec("10.00")),
            changed_field: ChangedField::Qty,
        })
        .unwrap();
        assert_eq!(out.unit, Some(dec("2.50")));
    }

    #[test]
    fn test_non_positive_qty_passes_through() {
        let out = sync_unit_total(&MoneyInput {
            qty: 0,
            unit: Some(dec("1.005")),
            total: Some(dec("7")),
            changed_field: ChangedField::Total,
        })
        .unwrap();
        assert_eq!(out.unit, Some(dec("1.01")));
        assert_eq!(out.total, Some(dec("7")));
    }

    #[test]
    fn test_sync_supplied_nothing_supplied() {
        assert_eq!(sync_supplied(10, None, None), Ok(MoneyPair::default()));
    }

    #[test]
    fn test_max_money_value() {
        assert_eq!(MAX_MONEY, Decimal::new(99_999_999_999_999, 2));
    }

    #[test]
    fn test_derived_total_above_max_is_rejected() {
        let result = sync_unit_total(&MoneyInput {
            qty: 10,
            unit: Some(dec("100000000000")),
            total: None,
            changed_field: ChangedField::Unit,
        });
        assert_eq!(result, Err(AmountTooLarge));
    }

    #[test]
    fn test_multiplication_overflow_is_an_error() {
        let result = sync_supplied(i64::MAX, Some(Decimal::MAX), None);
        assert_eq!(result, Err(AmountTooLarge));
    }
}
