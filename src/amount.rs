use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// An exact monetary amount, counted in indivisible base units.
///
/// The amount is signed so that a malformed output carrying a negative value can be
/// represented and rejected by validation rather than by the type system.
#[derive(Copy, Clone, Default, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Amount(i64);

impl Amount {
    pub const UNITS_PER_COIN: i64 = 100_000_000;

    pub const fn new(units: i64) -> Self {
        Amount(units)
    }

    pub const fn zero() -> Self {
        Self::new(0)
    }

    /// Returns `None` if `coins` does not fit into base units.
    pub fn checked_from_coins(coins: i64) -> Option<Self> {
        coins.checked_mul(Self::UNITS_PER_COIN).map(Self::new)
    }

    /// # Panics
    ///
    /// Panics if `coins` does not fit into base units, see [`Amount::checked_from_coins`].
    pub fn from_coins(coins: i64) -> Self {
        match Self::checked_from_coins(coins) {
            Some(amount) => amount,
            None => panic!("Amount of {} coins overflows base units", coins),
        }
    }

    pub const fn units(&self) -> i64 {
        self.0
    }

    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Sums amounts without overflow. A batch would need more than 2^64 maximal
    /// amounts to overflow the 128-bit total.
    pub fn total<I>(amounts: I) -> i128
    where
        I: IntoIterator<Item = Amount>,
    {
        amounts.into_iter().map(|amount| amount.0 as i128).sum()
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<i32> for Amount {
    fn from(value: i32) -> Self {
        Self(value as i64)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let units = self.0.unsigned_abs();
        let per_coin = Self::UNITS_PER_COIN as u64;
        write!(f, "{}{}.{:08}", sign, units / per_coin, units % per_coin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_coins_scales_to_base_units() {
        assert_eq!(Amount::from_coins(3).units(), 300_000_000);
    }

    #[test]
    fn checked_from_coins_detects_overflow() {
        assert_eq!(Amount::checked_from_coins(-2), Some(Amount::new(-200_000_000)));
        assert_eq!(Amount::checked_from_coins(i64::MAX / 10), None);
        assert_eq!(Amount::checked_from_coins(i64::MIN), None);
    }

    #[test]
    #[should_panic(expected = "overflows base units")]
    fn from_coins_panics_on_overflow() {
        Amount::from_coins(i64::MAX);
    }

    #[test]
    fn total_does_not_overflow() {
        let total = Amount::total(vec![Amount::new(i64::MAX), Amount::new(i64::MAX)]);
        assert_eq!(total, 2 * i64::MAX as i128);
    }

    #[test]
    fn total_of_nothing_is_zero() {
        assert_eq!(Amount::total(Vec::new()), 0);
    }

    #[test]
    fn display_shows_coins_with_fraction() {
        assert_eq!(Amount::from_coins(7).to_string(), "7.00000000");
        assert_eq!(Amount::new(150_000_001).to_string(), "1.50000001");
        assert_eq!(Amount::new(-50_000_000).to_string(), "-0.50000000");
        assert_eq!(Amount::new(i64::MIN).to_string(), "-92233720368.54775808");
    }
}
