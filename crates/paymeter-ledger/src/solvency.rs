//! Solvency invariant tracker.
//!
//! Mathematical invariant enforced over the whole marketplace:
//! ```text
//! ∀ asset: value held == Σ(escrow balances)
//!                      + Σ(deposits of ACTIVE sessions)
//!                      + Σ(host earnings)
//!                      + treasury accrual
//! ```
//!
//! "Value held" is tracked here as inflows minus outflows since genesis:
//! every deposit and inline session payment records an inflow, every
//! withdrawal and refund records an outflow. If the identity ever breaks,
//! something has gone catastrophically wrong — the error is not
//! recoverable and exists to make such defects testable.

use std::collections::HashMap;

use paymeter_types::{Amount, AssetId, MarketError, Result};

/// Tracks per-asset value held and validates the solvency identity.
#[derive(Debug, Default)]
pub struct SolvencyLedger {
    held: HashMap<AssetId, Amount>,
}

impl SolvencyLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record value entering the system (deposit, inline session payment,
    /// token pull).
    pub fn record_inflow(&mut self, asset: &AssetId, amount: Amount) -> Result<()> {
        let entry = self.held.entry(asset.clone()).or_insert(Amount::ZERO);
        *entry = entry.checked_add(amount)?;
        Ok(())
    }

    /// Record value leaving the system (withdrawal, refund, fee payout).
    ///
    /// An outflow exceeding the value held is itself a solvency violation —
    /// the system would be disbursing assets it does not hold.
    pub fn record_outflow(&mut self, asset: &AssetId, amount: Amount) -> Result<()> {
        let held = self.held(asset);
        if held < amount {
            return Err(MarketError::SolvencyViolation {
                reason: format!(
                    "outflow of {amount} {asset} exceeds {held} held"
                ),
            });
        }
        let entry = self
            .held
            .get_mut(asset)
            .ok_or(MarketError::SolvencyViolation {
                reason: format!("outflow from untracked asset {asset}"),
            })?;
        *entry = entry.checked_sub(amount)?;
        Ok(())
    }

    /// Value currently held in one asset.
    #[must_use]
    pub fn held(&self, asset: &AssetId) -> Amount {
        self.held.get(asset).copied().unwrap_or(Amount::ZERO)
    }

    /// All assets that ever saw an inflow.
    #[must_use]
    pub fn tracked_assets(&self) -> Vec<AssetId> {
        let mut assets: Vec<AssetId> = self.held.keys().cloned().collect();
        assets.sort();
        assets
    }

    /// Verify the solvency identity for one asset against the summed
    /// obligations the caller computed from the ledgers.
    ///
    /// # Errors
    /// Returns [`MarketError::SolvencyViolation`] if held ≠ obligations.
    pub fn verify(&self, asset: &AssetId, obligations: Amount) -> Result<()> {
        let held = self.held(asset);
        if held != obligations {
            return Err(MarketError::SolvencyViolation {
                reason: format!(
                    "asset {asset}: held {held} != outstanding obligations {obligations}"
                ),
            });
        }
        Ok(())
    }
}
