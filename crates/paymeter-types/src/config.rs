//! Marketplace configuration.
//!
//! One explicit [`MarketConfig`] object is built at startup and threaded
//! into the lifecycle controller and settlement engine — there are no
//! ambient globals. Mutation happens only through the controller's
//! admin-gated update entry points.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{constants, Address, Amount, AssetId, MarketError, Result};

/// Per-asset deposit policy. An asset is accepted iff a policy exists for
/// it; ceilings are per asset because decimal precision differs wildly
/// between assets (one shared numeric cap would be economically enormous
/// for one asset and modest for another).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPolicy {
    /// Smallest accepted session deposit / escrow top-up.
    pub min_deposit: Amount,
    /// Largest accepted session deposit.
    pub max_deposit: Amount,
}

impl AssetPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.min_deposit > self.max_deposit {
            return Err(MarketError::ConfigInvalid {
                reason: format!(
                    "min_deposit {} exceeds max_deposit {}",
                    self.min_deposit, self.max_deposit
                ),
            });
        }
        Ok(())
    }
}

/// Accepted ranges for the session parameters a depositor proposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionLimits {
    pub min_price_per_unit: Amount,
    pub max_price_per_unit: Amount,
    pub min_duration_secs: u64,
    pub max_duration_secs: u64,
    pub min_proof_interval_secs: u64,
    pub max_proof_interval_secs: u64,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            min_price_per_unit: Amount::new(constants::MIN_PRICE_PER_UNIT),
            max_price_per_unit: Amount::new(constants::MAX_PRICE_PER_UNIT),
            min_duration_secs: constants::MIN_SESSION_DURATION_SECS,
            max_duration_secs: constants::MAX_SESSION_DURATION_SECS,
            min_proof_interval_secs: constants::MIN_PROOF_INTERVAL_SECS,
            max_proof_interval_secs: constants::MAX_PROOF_INTERVAL_SECS,
        }
    }
}

/// Global marketplace configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Privileged identity for treasury withdrawal and config updates.
    pub admin: Address,
    /// Platform fee on the host's gross, in basis points.
    pub fee_bps: u16,
    /// Grace period after the last accepted proof during which only the
    /// depositor may force completion.
    pub dispute_window_secs: u64,
    /// A session may be force-closed once
    /// `proof_interval * timeout_multiplier` elapses without a proof.
    pub timeout_multiplier: u32,
    /// Bounds on proposed session parameters.
    pub limits: SessionLimits,
    /// Accepted assets and their deposit bounds.
    pub asset_policies: HashMap<AssetId, AssetPolicy>,
}

impl MarketConfig {
    /// A config accepting only the native asset, with default limits.
    #[must_use]
    pub fn new(admin: Address) -> Self {
        let mut asset_policies = HashMap::new();
        asset_policies.insert(
            AssetId::Native,
            AssetPolicy {
                min_deposit: Amount::new(constants::DEFAULT_MIN_DEPOSIT),
                max_deposit: Amount::new(constants::DEFAULT_MAX_DEPOSIT),
            },
        );
        Self {
            admin,
            fee_bps: constants::DEFAULT_FEE_BPS,
            dispute_window_secs: constants::DEFAULT_DISPUTE_WINDOW_SECS,
            timeout_multiplier: constants::DEFAULT_TIMEOUT_MULTIPLIER,
            limits: SessionLimits::default(),
            asset_policies,
        }
    }

    /// Look up the policy for an asset; `None` means not accepted.
    #[must_use]
    pub fn asset_policy(&self, asset: &AssetId) -> Option<&AssetPolicy> {
        self.asset_policies.get(asset)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fee_bps > constants::MAX_FEE_BPS {
            return Err(MarketError::ConfigInvalid {
                reason: format!("fee_bps {} exceeds {}", self.fee_bps, constants::MAX_FEE_BPS),
            });
        }
        if self.timeout_multiplier == 0 {
            return Err(MarketError::ConfigInvalid {
                reason: "timeout_multiplier must be at least 1".into(),
            });
        }
        if self.limits.min_price_per_unit > self.limits.max_price_per_unit
            || self.limits.min_duration_secs > self.limits.max_duration_secs
            || self.limits.min_proof_interval_secs > self.limits.max_proof_interval_secs
        {
            return Err(MarketError::ConfigInvalid {
                reason: "inverted session limit bounds".into(),
            });
        }
        for policy in self.asset_policies.values() {
            policy.validate()?;
        }
        Ok(())
    }
}
