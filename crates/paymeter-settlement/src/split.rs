//! The exact three-way settlement split.

use paymeter_types::{Amount, MarketError, Result};

/// How a terminal session's deposit divides between host, platform, and
/// depositor. Constructed only by [`SettlementSplit::compute`], so the
/// exact-sum identity holds for every value of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementSplit {
    /// `units_consumed × price_per_unit`.
    pub host_gross: Amount,
    /// Floor share of the gross at the configured fee rate.
    pub platform_fee: Amount,
    /// Gross minus fee — credited to the host's earnings.
    pub host_net: Amount,
    /// Unconsumed remainder — returned to the depositor.
    pub depositor_refund: Amount,
}

impl SettlementSplit {
    /// Compute the split for a terminal session.
    ///
    /// # Errors
    /// - `OverClaim` if `units × price` exceeds the deposit (the proof path
    ///   maintains this invariant; seeing it here is a defect upstream)
    /// - `AmountOverflow` on arithmetic overflow
    pub fn compute(
        deposit_amount: Amount,
        price_per_unit: Amount,
        units_consumed: u64,
        fee_bps: u16,
    ) -> Result<Self> {
        let host_gross = price_per_unit.checked_mul_units(units_consumed)?;
        if host_gross > deposit_amount {
            return Err(MarketError::OverClaim {
                claimed_value: host_gross,
                deposit: deposit_amount,
            });
        }
        let platform_fee = host_gross.bps_share(fee_bps)?;
        let host_net = host_gross.checked_sub(platform_fee)?;
        let depositor_refund = deposit_amount.checked_sub(host_gross)?;
        Ok(Self {
            host_gross,
            platform_fee,
            host_net,
            depositor_refund,
        })
    }

    /// The three disbursed legs, summed. Always equals the deposit.
    pub fn total(&self) -> Result<Amount> {
        self.host_net
            .checked_add(self.platform_fee)?
            .checked_add(self.depositor_refund)
    }
}
