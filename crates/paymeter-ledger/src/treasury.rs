//! Platform fee accumulator.
//!
//! The settlement engine credits each session's platform fee here, per
//! asset. Only the privileged treasury-withdrawal entry point debits it.
//! Kept separate from host earnings so the platform's retained share is
//! auditable on its own.

use std::collections::HashMap;

use paymeter_types::{Amount, AssetId, MarketError, Result};

/// Per-asset accumulator of retained platform fees.
#[derive(Debug, Default)]
pub struct Treasury {
    accrued: HashMap<AssetId, Amount>,
}

impl Treasury {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accrue a settled session's platform fee.
    pub fn credit(&mut self, asset: &AssetId, amount: Amount) -> Result<()> {
        let entry = self.accrued.entry(asset.clone()).or_insert(Amount::ZERO);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    /// Pay out accrued fees.
    ///
    /// # Errors
    /// Returns `InsufficientTreasury` if the accumulator cannot cover
    /// `amount`.
    pub fn debit(&mut self, asset: &AssetId, amount: Amount) -> Result<()> {
        let entry = self
            .accrued
            .get_mut(asset)
            .ok_or(MarketError::InsufficientTreasury {
                requested: amount,
                available: Amount::ZERO,
            })?;
        if *entry < amount {
            return Err(MarketError::InsufficientTreasury {
                requested: amount,
                available: *entry,
            });
        }
        *entry = entry.checked_sub(amount)?;
        Ok(())
    }

    /// Accrued fees in one asset. Zero by default.
    #[must_use]
    pub fn balance(&self, asset: &AssetId) -> Amount {
        self.accrued.get(asset).copied().unwrap_or(Amount::ZERO)
    }
}
