//! Withdrawable host earnings.
//!
//! Per-(host, asset) accumulator of settlement proceeds. Credit is the
//! settlement engine's job alone — the controller never exposes a public
//! inbound-credit entry point, because an open credit path is the classic
//! way funds end up locked against no obligation. Debits happen only on
//! the host's own withdrawal calls.

use std::collections::HashMap;

use paymeter_types::{Address, Amount, AssetId, MarketError, Result};

/// Source of truth for hosts' withdrawable settlement proceeds.
#[derive(Debug, Default)]
pub struct EarningsLedger {
    balances: HashMap<(Address, AssetId), Amount>,
}

impl EarningsLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit settlement proceeds to a host.
    ///
    /// Reachable only through the settlement engine; see module docs.
    pub fn credit(&mut self, host: Address, asset: &AssetId, amount: Amount) -> Result<()> {
        let entry = self
            .balances
            .entry((host, asset.clone()))
            .or_insert(Amount::ZERO);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    /// Debit a host's withdrawable earnings.
    ///
    /// # Errors
    /// Returns `InsufficientEarnings` if the balance cannot cover `amount`.
    pub fn debit(&mut self, host: Address, asset: &AssetId, amount: Amount) -> Result<()> {
        let entry = self.balances.get_mut(&(host, asset.clone())).ok_or(
            MarketError::InsufficientEarnings {
                requested: amount,
                available: Amount::ZERO,
            },
        )?;
        if *entry < amount {
            return Err(MarketError::InsufficientEarnings {
                requested: amount,
                available: *entry,
            });
        }
        *entry = entry.checked_sub(amount)?;
        Ok(())
    }

    /// Withdrawable earnings for a (host, asset) pair. Zero by default.
    #[must_use]
    pub fn balance_of(&self, host: Address, asset: &AssetId) -> Amount {
        self.balances
            .get(&(host, asset.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Assets in which this host currently has a non-zero balance.
    #[must_use]
    pub fn assets_of(&self, host: Address) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self
            .balances
            .iter()
            .filter(|((h, _), amount)| *h == host && !amount.is_zero())
            .map(|((_, asset), _)| asset.clone())
            .collect();
        assets.sort();
        assets
    }

    /// Sum of all hosts' earnings in one asset.
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

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: Address = Address([7u8; 32]);

    #[test]
    fn credit_then_debit() {
        let mut ledger = EarningsLedger::new();
        ledger.credit(HOST, &AssetId::Native, Amount::new(270_000)).unwrap();
        ledger.debit(HOST, &AssetId::Native, Amount::new(70_000)).unwrap();
        assert_eq!(
            ledger.balance_of(HOST, &AssetId::Native),
            Amount::new(200_000)
        );
    }

    #[test]
    fn debit_insufficient_fails() {
        let mut ledger = EarningsLedger::new();
        ledger.credit(HOST, &AssetId::Native, Amount::new(50)).unwrap();
        let err = ledger
            .debit(HOST, &AssetId::Native, Amount::new(51))
            .unwrap_err();
        assert!(matches!(err, MarketError::InsufficientEarnings { .. }));
    }

    #[test]
    fn debit_unknown_host_fails() {
        let mut ledger = EarningsLedger::new();
        let err = ledger
            .debit(HOST, &AssetId::Native, Amount::new(1))
            .unwrap_err();
        assert!(matches!(
            err,
            MarketError::InsufficientEarnings {
                available: Amount::ZERO,
                ..
            }
        ));
    }

    #[test]
    fn assets_of_lists_nonzero_only() {
        let mut ledger = EarningsLedger::new();
        ledger.credit(HOST, &AssetId::Native, Amount::new(5)).unwrap();
        ledger.credit(HOST, &AssetId::token("USDC"), Amount::new(9)).unwrap();
        ledger.debit(HOST, &AssetId::token("USDC"), Amount::new(9)).unwrap();
        assert_eq!(ledger.assets_of(HOST), vec![AssetId::Native]);
    }

    #[test]
    fn totals_per_asset() {
        let mut ledger = EarningsLedger::new();
        let other = Address([8u8; 32]);
        ledger.credit(HOST, &AssetId::Native, Amount::new(5)).unwrap();
        ledger.credit(other, &AssetId::Native, Amount::new(7)).unwrap();
        assert_eq!(ledger.total(&AssetId::Native), Amount::new(12));
        assert_eq!(ledger.total(&AssetId::token("USDC")), Amount::ZERO);
    }
}
