//! Pre-funded escrow balances.
//!
//! Tracks per-(account, asset) balances, decoupled from any specific
//! session so a wallet can fund once and draw down across many sessions.
//! All mutations are atomic: either the full operation succeeds or the
//! balance is unchanged.

use std::collections::HashMap;

use paymeter_types::{Address, Amount, AssetId, MarketError, Result};

/// Source of truth for pre-funded deposit balances.
///
/// Balances are implicitly zero until first referenced, and can never go
/// negative — every debit is range-checked first.
#[derive(Debug, Default)]
pub struct EscrowLedger {
    balances: HashMap<(Address, AssetId), Amount>,
}

impl EscrowLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account's balance.
    pub fn credit(&mut self, account: Address, asset: &AssetId, amount: Amount) -> Result<()> {
        let entry = self
            .balances
            .entry((account, asset.clone()))
            .or_insert(Amount::ZERO);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    /// Debit an account's balance.
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if the balance cannot cover `amount`.
    pub fn debit(&mut self, account: Address, asset: &AssetId, amount: Amount) -> Result<()> {
        let entry = self.balances.get_mut(&(account, asset.clone())).ok_or(
            MarketError::InsufficientBalance {
                requested: amount,
                available: Amount::ZERO,
            },
        )?;
        if *entry < amount {
            return Err(MarketError::InsufficientBalance {
                requested: amount,
                available: *entry,
            });
        }
        *entry = entry.checked_sub(amount)?;
        Ok(())
    }

    /// Balance for an (account, asset) pair. Unknown pairs read as zero.
    #[must_use]
    pub fn balance_of(&self, account: Address, asset: &AssetId) -> Amount {
        self.balances
            .get(&(account, asset.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Batched read across several assets, in request order.
    #[must_use]
    pub fn balances_of(&self, account: Address, assets: &[AssetId]) -> Vec<Amount> {
        assets
            .iter()
            .map(|asset| self.balance_of(account, asset))
            .collect()
    }

    /// Sum of all accounts' balances in one asset.
    #[must_use]
    pub fn total(&self, asset: &AssetId) -> Amount {
        self.balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .fold(Amount::ZERO, |acc, (_, amount)| {
                Amount::new(acc.0.saturating_add(amount.0))
            })
    }
}
