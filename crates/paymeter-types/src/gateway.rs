//! The external asset-transfer seam.
//!
//! Moving value in or out of the marketplace crosses into untrusted code: a
//! token's transfer hook or a recipient's receive hook runs *during* the
//! gateway call, before the invoking entry point has returned. The gateway
//! therefore receives a [`MarketReentry`] handle to the public surface —
//! an honest gateway ignores it, and a malicious hook that calls back in is
//! rejected by the controller's call guard (which is held for the whole
//! entry point).

use crate::{Address, Amount, AssetId, Result, SessionId};

/// External asset-transfer primitive.
///
/// Implementations wrap the chain/bridge/bank actually holding the value.
/// Both methods are all-or-nothing: on `Err` no value moved, and the
/// calling operation unwinds its own effects.
pub trait AssetGateway {
    /// Push `amount` of `asset` out to `to`.
    fn transfer(
        &mut self,
        asset: &AssetId,
        to: Address,
        amount: Amount,
        market: &mut dyn MarketReentry,
    ) -> Result<()>;

    /// Pull `amount` of `asset` in from `from` under a prior allowance.
    /// Only meaningful for token assets — native value arrives attached to
    /// the call itself.
    fn pull(
        &mut self,
        asset: &AssetId,
        from: Address,
        amount: Amount,
        market: &mut dyn MarketReentry,
    ) -> Result<()>;
}

/// The slice of the marketplace surface reachable from inside a transfer
/// hook. Every method lands on a guarded entry point, so while a transfer
/// is in flight each returns [`crate::MarketError::ReentrancyBlocked`].
pub trait MarketReentry {
    fn withdraw(&mut self, caller: Address, asset: &AssetId, amount: Amount) -> Result<()>;

    fn withdraw_earnings(&mut self, host: Address, asset: &AssetId, amount: Amount) -> Result<()>;

    fn complete_session(
        &mut self,
        caller: Address,
        session: SessionId,
        content_ref: Option<String>,
    ) -> Result<()>;

    fn trigger_timeout(&mut self, caller: Address, session: SessionId) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Recording gateway for tests
// ---------------------------------------------------------------------------

/// Gateway that records transfers and succeeds (or fails on demand).
/// **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Default)]
pub struct RecordingGateway {
    /// Completed outbound transfers, in order.
    pub transfers: Vec<(AssetId, Address, Amount)>,
    /// Completed inbound pulls, in order.
    pub pulls: Vec<(AssetId, Address, Amount)>,
    /// When set, the next call fails with `TransferFailed` and clears it.
    pub fail_next: bool,
}

#[cfg(any(test, feature = "test-helpers"))]
impl RecordingGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_fail(&mut self) -> Result<()> {
        if self.fail_next {
            self.fail_next = false;
            return Err(crate::MarketError::TransferFailed {
                reason: "gateway rejected (test)".into(),
            });
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl AssetGateway for RecordingGateway {
    fn transfer(
        &mut self,
        asset: &AssetId,
        to: Address,
        amount: Amount,
        _market: &mut dyn MarketReentry,
    ) -> Result<()> {
        self.check_fail()?;
        self.transfers.push((asset.clone(), to, amount));
        Ok(())
    }

    fn pull(
        &mut self,
        asset: &AssetId,
        from: Address,
        amount: Amount,
        _market: &mut dyn MarketReentry,
    ) -> Result<()> {
        self.check_fail()?;
        self.pulls.push((asset.clone(), from, amount));
        Ok(())
    }
}
