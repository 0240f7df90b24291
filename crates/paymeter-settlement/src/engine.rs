//! Disbursement of a terminal session into the ledgers.
//!
//! The engine performs the *internal* legs of settlement — crediting the
//! host's earnings and the treasury — and flags the session so it can
//! never be disbursed twice. The refund leg crosses the trust boundary
//! (an outbound transfer to the depositor), so the lifecycle controller
//! executes it after this returns and calls [`SettlementEngine::revoke`]
//! if that transfer fails, unwinding the whole settlement.

use paymeter_ledger::{EarningsLedger, Treasury};
use paymeter_types::{MarketError, Result, Session};
use tracing::info;

use crate::split::SettlementSplit;

/// Settles terminal sessions. Stateless — configuration is threaded in by
/// the controller on every call.
#[derive(Debug, Default)]
pub struct SettlementEngine;

impl SettlementEngine {
    /// Credit the internal legs of the split for a terminal session and
    /// set the host-credited flag.
    ///
    /// Call order within the enclosing entry point is fixed: this runs
    /// first (effects), the refund transfer runs last (interaction).
    ///
    /// # Errors
    /// - `Internal` if the session is still active — the controller marks
    ///   the terminal status before settling
    /// - `AlreadyDisbursed` if a settlement flag is already set
    pub fn disburse(
        session: &mut Session,
        fee_bps: u16,
        earnings: &mut EarningsLedger,
        treasury: &mut Treasury,
    ) -> Result<SettlementSplit> {
        if session.is_active() {
            return Err(MarketError::Internal(format!(
                "settlement attempted on active session {}",
                session.id
            )));
        }
        if session.host_credited || session.depositor_refunded {
            return Err(MarketError::AlreadyDisbursed(session.id));
        }

        let split = SettlementSplit::compute(
            session.deposit_amount,
            session.price_per_unit,
            session.units_consumed,
            fee_bps,
        )?;

        if !split.host_net.is_zero() {
            earnings.credit(session.host, &session.asset, split.host_net)?;
        }
        session.host_credited = true;

        if !split.platform_fee.is_zero() {
            treasury.credit(&session.asset, split.platform_fee)?;
        }

        info!(
            session = %session.id,
            host = %session.host,
            asset = %session.asset,
            host_net = %split.host_net,
            platform_fee = %split.platform_fee,
            depositor_refund = %split.depositor_refund,
            "session disbursed"
        );
        Ok(split)
    }

    /// Unwind [`SettlementEngine::disburse`] after the refund transfer
    /// failed: pull the credits back out and clear the flag, restoring the
    /// pre-settlement ledger state.
    pub fn revoke(
        session: &mut Session,
        split: &SettlementSplit,
        earnings: &mut EarningsLedger,
        treasury: &mut Treasury,
    ) -> Result<()> {
        if !split.host_net.is_zero() {
            earnings.debit(session.host, &session.asset, split.host_net)?;
        }
        if !split.platform_fee.is_zero() {
            treasury.debit(&session.asset, split.platform_fee)?;
        }
        session.host_credited = false;
        Ok(())
    }
}
