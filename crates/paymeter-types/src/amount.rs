//! Integer value arithmetic for escrow accounting.
//!
//! All monetary values are whole base units of their asset (the chain's
//! smallest denomination), carried in a `u128`. Arithmetic is checked:
//! overflow surfaces as [`MarketError::AmountOverflow`], never a wrap —
//! settlement math must be exact or fail loudly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::BPS_DENOMINATOR;
use crate::error::{MarketError, Result};

/// Unix timestamp in seconds, as reported by the injected [`crate::Clock`].
pub type Timestamp = u64;

/// A quantity of some asset, in whole base units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct Amount(pub u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[must_use]
    pub fn new(base_units: u128) -> Self {
        Self(base_units)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(MarketError::AmountOverflow)
    }

    /// Checked subtraction. Underflow is an overflow error — balances are
    /// range-checked before any debit, so hitting this is a defect.
    pub fn checked_sub(self, other: Amount) -> Result<Amount> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(MarketError::AmountOverflow)
    }

    /// Checked `price × units`, the consumed value of a session.
    pub fn checked_mul_units(self, units: u64) -> Result<Amount> {
        self.0
            .checked_mul(u128::from(units))
            .map(Amount)
            .ok_or(MarketError::AmountOverflow)
    }

    /// The basis-point share of this amount, rounded down.
    ///
    /// `1_000_000.bps_share(250)` is 25 000 (2.5%). The floor keeps the
    /// fee + remainder split exact.
    pub fn bps_share(self, bps: u16) -> Result<Amount> {
        let scaled = self
            .0
            .checked_mul(u128::from(bps))
            .ok_or(MarketError::AmountOverflow)?;
        Ok(Amount(scaled / BPS_DENOMINATOR))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u128> for Amount {
    fn from(v: u128) -> Self {
        Amount(v)
    }
}
