//! The marketplace controller: shared state, funding entry points,
//! earnings and treasury payouts, configuration, and reads.
//!
//! Session creation, proofs, and terminal transitions live in
//! [`crate::lifecycle`]; both files implement the same [`Marketplace`]
//! type.
//!
//! ## Atomicity discipline
//!
//! Every entry point that performs an external transfer follows the same
//! shape: acquire the call guard, mutate local state, interact with the
//! gateway last, unwind this call's own mutations if the gateway fails,
//! release the guard on the way out. The guard is what makes the
//! mid-transfer window safe — any nested call from a transfer hook lands
//! back on a guarded entry point and is rejected.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use paymeter_ledger::{CallGuard, EarningsLedger, EscrowLedger, SolvencyLedger, Treasury};
use paymeter_types::{
    Address, Amount, AssetGateway, AssetId, AssetPolicy, Clock, Event, HostRegistry, MarketConfig,
    MarketError, MarketReentry, ModelRegistry, Result, Session, SessionId,
    constants::MAX_FEE_BPS,
};

/// The session settlement engine's public surface.
///
/// Owns every piece of shared mutable state; external collaborators come
/// in as narrow read-only capabilities, and the asset gateway is passed
/// into each entry point that moves value.
pub struct Marketplace {
    pub(crate) config: MarketConfig,
    pub(crate) escrow: EscrowLedger,
    pub(crate) earnings: EarningsLedger,
    pub(crate) treasury: Treasury,
    pub(crate) solvency: SolvencyLedger,
    pub(crate) guard: CallGuard,
    pub(crate) sessions: HashMap<SessionId, Session>,
    pub(crate) by_depositor: HashMap<Address, Vec<SessionId>>,
    pub(crate) by_host: HashMap<Address, Vec<SessionId>>,
    pub(crate) hosts: Arc<dyn HostRegistry>,
    pub(crate) models: Arc<dyn ModelRegistry>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) events: Vec<Event>,
}

impl Marketplace {
    /// Build a marketplace over the given collaborators.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` if the configuration is inconsistent.
    pub fn new(
        config: MarketConfig,
        hosts: Arc<dyn HostRegistry>,
        models: Arc<dyn ModelRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            escrow: EscrowLedger::new(),
            earnings: EarningsLedger::new(),
            treasury: Treasury::new(),
            solvency: SolvencyLedger::new(),
            guard: CallGuard::new(),
            sessions: HashMap::new(),
            by_depositor: HashMap::new(),
            by_host: HashMap::new(),
            hosts,
            models,
            clock,
            events: Vec::new(),
        })
    }

    // =====================================================================
    // Escrow funding
    // =====================================================================

    /// Credit the caller's pre-funded balance with the native value
    /// attached to the call.
    pub fn deposit_native(&mut self, caller: Address, attached: Amount) -> Result<()> {
        if attached.is_zero() {
            return Err(MarketError::InvalidAmount {
                reason: "deposit of zero".into(),
            });
        }
        self.require_accepted(&AssetId::Native)?;
        self.solvency.record_inflow(&AssetId::Native, attached)?;
        self.escrow.credit(caller, &AssetId::Native, attached)?;
        debug!(account = %caller, amount = %attached, "native deposit received");
        self.push_event(Event::DepositReceived {
            account: caller,
            asset: AssetId::Native,
            amount: attached,
        });
        Ok(())
    }

    /// Pull `amount` of a token from the caller (allowance-gated) and
    /// credit their pre-funded balance.
    pub fn deposit_token(
        &mut self,
        caller: Address,
        asset: &AssetId,
        amount: Amount,
        gateway: &mut dyn AssetGateway,
    ) -> Result<()> {
        self.guard.enter()?;
        let result = self.deposit_token_guarded(caller, asset, amount, gateway);
        self.guard.exit();
        result
    }

    fn deposit_token_guarded(
        &mut self,
        caller: Address,
        asset: &AssetId,
        amount: Amount,
        gateway: &mut dyn AssetGateway,
    ) -> Result<()> {
        if asset.is_native() {
            return Err(MarketError::TokenAssetRequired);
        }
        if amount.is_zero() {
            return Err(MarketError::InvalidAmount {
                reason: "deposit of zero".into(),
            });
        }
        self.require_accepted(asset)?;
        // the pull runs token hooks; nothing is credited until it lands
        gateway.pull(asset, caller, amount, self)?;
        self.solvency.record_inflow(asset, amount)?;
        self.escrow.credit(caller, asset, amount)?;
        debug!(account = %caller, asset = %asset, amount = %amount, "token deposit received");
        self.push_event(Event::DepositReceived {
            account: caller,
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    /// Pay out part of the caller's pre-funded balance.
    ///
    /// Decrements **before** the external transfer; a failed transfer
    /// unwinds the decrement.
    pub fn withdraw(
        &mut self,
        caller: Address,
        asset: &AssetId,
        amount: Amount,
        gateway: &mut dyn AssetGateway,
    ) -> Result<()> {
        self.guard.enter()?;
        let result = self.withdraw_guarded(caller, asset, amount, gateway);
        self.guard.exit();
        result
    }

    fn withdraw_guarded(
        &mut self,
        caller: Address,
        asset: &AssetId,
        amount: Amount,
        gateway: &mut dyn AssetGateway,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(MarketError::InvalidAmount {
                reason: "withdrawal of zero".into(),
            });
        }
        self.escrow.debit(caller, asset, amount)?;
        if let Err(err) = self.send(gateway, asset, caller, amount) {
            self.escrow.credit(caller, asset, amount)?;
            return Err(err);
        }
        info!(account = %caller, asset = %asset, amount = %amount, "withdrawal processed");
        self.push_event(Event::WithdrawalProcessed {
            account: caller,
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    /// Pre-funded balance for an (account, asset) pair. Unknown pairs and
    /// assets read as zero, never an error.
    #[must_use]
    pub fn balance_of(&self, account: Address, asset: &AssetId) -> Amount {
        self.escrow.balance_of(account, asset)
    }

    /// Batched balance read, in request order.
    #[must_use]
    pub fn balances_of(&self, account: Address, assets: &[AssetId]) -> Vec<Amount> {
        self.escrow.balances_of(account, assets)
    }

    // =====================================================================
    // Host earnings payouts
    // =====================================================================

    /// Pay out part of a host's settled earnings.
    pub fn withdraw_earnings(
        &mut self,
        host: Address,
        asset: &AssetId,
        amount: Amount,
        gateway: &mut dyn AssetGateway,
    ) -> Result<()> {
        self.guard.enter()?;
        let result = self.withdraw_earnings_guarded(host, asset, amount, gateway);
        self.guard.exit();
        result
    }

    fn withdraw_earnings_guarded(
        &mut self,
        host: Address,
        asset: &AssetId,
        amount: Amount,
        gateway: &mut dyn AssetGateway,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(MarketError::InvalidAmount {
                reason: "withdrawal of zero".into(),
            });
        }
        self.earnings.debit(host, asset, amount)?;
        if let Err(err) = self.send(gateway, asset, host, amount) {
            self.earnings.credit(host, asset, amount)?;
            return Err(err);
        }
        info!(host = %host, asset = %asset, amount = %amount, "earnings withdrawn");
        self.push_event(Event::EarningsWithdrawn {
            host,
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    /// Pay out a host's full balance in one asset. Returns the amount.
    pub fn withdraw_all_earnings(
        &mut self,
        host: Address,
        asset: &AssetId,
        gateway: &mut dyn AssetGateway,
    ) -> Result<Amount> {
        let amount = self.earnings.balance_of(host, asset);
        if amount.is_zero() {
            return Err(MarketError::NothingToWithdraw);
        }
        self.withdraw_earnings(host, asset, amount, gateway)?;
        Ok(amount)
    }

    /// Pay out a host's balances across several assets. Skips assets with
    /// nothing withdrawable; each paid leg settles independently and the
    /// first gateway failure stops the loop.
    ///
    /// # Errors
    /// Returns `NothingToWithdraw` when every requested asset is empty.
    pub fn withdraw_earnings_multiple(
        &mut self,
        host: Address,
        assets: &[AssetId],
        gateway: &mut dyn AssetGateway,
    ) -> Result<Vec<(AssetId, Amount)>> {
        let mut paid = Vec::new();
        for asset in assets {
            let amount = self.earnings.balance_of(host, asset);
            if amount.is_zero() {
                continue;
            }
            self.withdraw_earnings(host, asset, amount, gateway)?;
            paid.push((asset.clone(), amount));
        }
        if paid.is_empty() {
            return Err(MarketError::NothingToWithdraw);
        }
        Ok(paid)
    }

    /// Withdrawable earnings for a (host, asset) pair.
    #[must_use]
    pub fn earnings_of(&self, host: Address, asset: &AssetId) -> Amount {
        self.earnings.balance_of(host, asset)
    }

    // =====================================================================
    // Treasury
    // =====================================================================

    /// Pay out accrued platform fees to the admin. Admin-only.
    pub fn treasury_withdraw(
        &mut self,
        caller: Address,
        asset: &AssetId,
        amount: Amount,
        gateway: &mut dyn AssetGateway,
    ) -> Result<()> {
        self.require_admin(caller)?;
        self.guard.enter()?;
        let result = self.treasury_withdraw_guarded(caller, asset, amount, gateway);
        self.guard.exit();
        result
    }

    fn treasury_withdraw_guarded(
        &mut self,
        caller: Address,
        asset: &AssetId,
        amount: Amount,
        gateway: &mut dyn AssetGateway,
    ) -> Result<()> {
        if amount.is_zero() {
            return Err(MarketError::InvalidAmount {
                reason: "withdrawal of zero".into(),
            });
        }
        self.treasury.debit(asset, amount)?;
        if let Err(err) = self.send(gateway, asset, caller, amount) {
            self.treasury.credit(asset, amount)?;
            return Err(err);
        }
        info!(asset = %asset, amount = %amount, "treasury withdrawal");
        self.push_event(Event::TreasuryWithdrawn {
            asset: asset.clone(),
            amount,
        });
        Ok(())
    }

    /// Accrued platform fees in one asset.
    #[must_use]
    pub fn treasury_balance(&self, asset: &AssetId) -> Amount {
        self.treasury.balance(asset)
    }

    // =====================================================================
    // Configuration (admin-gated)
    // =====================================================================

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &MarketConfig {
        &self.config
    }

    pub fn set_fee_bps(&mut self, caller: Address, fee_bps: u16) -> Result<()> {
        self.require_admin(caller)?;
        if fee_bps > MAX_FEE_BPS {
            return Err(MarketError::ConfigInvalid {
                reason: format!("fee_bps {fee_bps} exceeds {MAX_FEE_BPS}"),
            });
        }
        self.config.fee_bps = fee_bps;
        self.push_event(Event::ConfigUpdated {
            field: "fee_bps".into(),
        });
        Ok(())
    }

    pub fn set_dispute_window(&mut self, caller: Address, secs: u64) -> Result<()> {
        self.require_admin(caller)?;
        self.config.dispute_window_secs = secs;
        self.push_event(Event::ConfigUpdated {
            field: "dispute_window_secs".into(),
        });
        Ok(())
    }

    pub fn set_timeout_multiplier(&mut self, caller: Address, multiplier: u32) -> Result<()> {
        self.require_admin(caller)?;
        if multiplier == 0 {
            return Err(MarketError::ConfigInvalid {
                reason: "timeout_multiplier must be at least 1".into(),
            });
        }
        self.config.timeout_multiplier = multiplier;
        self.push_event(Event::ConfigUpdated {
            field: "timeout_multiplier".into(),
        });
        Ok(())
    }

    /// Accept an asset (or update its bounds).
    pub fn set_asset_policy(
        &mut self,
        caller: Address,
        asset: AssetId,
        policy: AssetPolicy,
    ) -> Result<()> {
        self.require_admin(caller)?;
        policy.validate()?;
        self.config.asset_policies.insert(asset, policy);
        self.push_event(Event::ConfigUpdated {
            field: "asset_policies".into(),
        });
        Ok(())
    }

    // =====================================================================
    // Reads
    // =====================================================================

    /// Look up a session. Sessions are never deleted, so terminal history
    /// stays readable.
    #[must_use]
    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Sessions funded by this depositor, in creation order.
    #[must_use]
    pub fn sessions_of_depositor(&self, depositor: Address) -> &[SessionId] {
        self.by_depositor
            .get(&depositor)
            .map_or(&[], Vec::as_slice)
    }

    /// Sessions served by this host, in creation order.
    #[must_use]
    pub fn sessions_of_host(&self, host: Address) -> &[SessionId] {
        self.by_host.get(&host).map_or(&[], Vec::as_slice)
    }

    /// Drain the pending notification log.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Peek the pending notification log.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    // =====================================================================
    // Solvency
    // =====================================================================

    /// Verify the solvency identity for one asset:
    /// held == escrow + active session deposits + earnings + treasury.
    ///
    /// # Errors
    /// Returns `SolvencyViolation` on any mismatch — an unrecoverable
    /// defect, surfaced loudly.
    pub fn verify_solvency(&self, asset: &AssetId) -> Result<()> {
        let obligations = self
            .escrow
            .total(asset)
            .checked_add(self.active_deposits(asset))?
            .checked_add(self.earnings.total(asset))?
            .checked_add(self.treasury.balance(asset))?;
        self.solvency.verify(asset, obligations).inspect_err(|err| {
            warn!(asset = %asset, %err, "solvency check failed");
        })
    }

    /// Verify solvency for every asset that ever saw an inflow.
    pub fn verify_solvency_all(&self) -> Result<()> {
        for asset in self.solvency.tracked_assets() {
            self.verify_solvency(&asset)?;
        }
        Ok(())
    }

    fn active_deposits(&self, asset: &AssetId) -> Amount {
        self.sessions
            .values()
            .filter(|session| session.is_active() && session.asset == *asset)
            .fold(Amount::ZERO, |acc, session| {
                Amount::new(acc.0.saturating_add(session.deposit_amount.0))
            })
    }

    // =====================================================================
    // Internal helpers
    // =====================================================================

    pub(crate) fn require_admin(&self, caller: Address) -> Result<()> {
        if caller == self.config.admin {
            Ok(())
        } else {
            Err(MarketError::AdminOnly)
        }
    }

    pub(crate) fn require_accepted(&self, asset: &AssetId) -> Result<()> {
        if self.config.asset_policy(asset).is_some() {
            Ok(())
        } else {
            Err(MarketError::AssetNotAccepted(asset.clone()))
        }
    }

    /// Outbound transfer: gateway first, then the held-value bookkeeping.
    /// Callers unwind their own ledger mutations if this fails.
    pub(crate) fn send(
        &mut self,
        gateway: &mut dyn AssetGateway,
        asset: &AssetId,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        gateway.transfer(asset, to, amount, self)?;
        self.solvency.record_outflow(asset, amount)
    }

    pub(crate) fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// The reentry surface handed to asset gateways. Every method forwards to
/// a guarded entry point; while a transfer is in flight the guard is held,
/// so these calls fail with `ReentrancyBlocked` before touching state or
/// needing a usable gateway.
impl MarketReentry for Marketplace {
    fn withdraw(&mut self, caller: Address, asset: &AssetId, amount: Amount) -> Result<()> {
        Marketplace::withdraw(self, caller, asset, amount, &mut InertGateway)
    }

    fn withdraw_earnings(
        &mut self,
        host: Address,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<()> {
        Marketplace::withdraw_earnings(self, host, asset, amount, &mut InertGateway)
    }

    fn complete_session(
        &mut self,
        caller: Address,
        session: SessionId,
        content_ref: Option<String>,
    ) -> Result<()> {
        Marketplace::complete_session(self, caller, session, content_ref, &mut InertGateway)
            .map(|_| ())
    }

    fn trigger_timeout(&mut self, caller: Address, session: SessionId) -> Result<()> {
        Marketplace::trigger_timeout(self, caller, session, &mut InertGateway).map(|_| ())
    }
}

/// Gateway stub for reentrant contexts. The call guard rejects the
/// reentrant call before any transfer can be attempted, so this is never
/// actually invoked; it refuses everything in case that ever changes.
struct InertGateway;

impl AssetGateway for InertGateway {
    fn transfer(
        &mut self,
        _asset: &AssetId,
        _to: Address,
        _amount: Amount,
        _market: &mut dyn MarketReentry,
    ) -> Result<()> {
        Err(MarketError::TransferFailed {
            reason: "no gateway available in reentrant context".into(),
        })
    }

    fn pull(
        &mut self,
        _asset: &AssetId,
        _from: Address,
        _amount: Amount,
        _market: &mut dyn MarketReentry,
    ) -> Result<()> {
        Err(MarketError::TransferFailed {
            reason: "no gateway available in reentrant context".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paymeter_types::{ManualClock, RecordingGateway, StaticHostRegistry, StaticModelRegistry};

    const ALICE: Address = Address([1u8; 32]);
    const ADMIN: Address = Address([9u8; 32]);

    fn market() -> Marketplace {
        let mut config = MarketConfig::new(ADMIN);
        config.asset_policies.insert(
            AssetId::token("USDC"),
            AssetPolicy {
                min_deposit: Amount::new(1),
                max_deposit: Amount::new(u128::MAX),
            },
        );
        Marketplace::new(
            config,
            Arc::new(StaticHostRegistry::new()),
            Arc::new(StaticModelRegistry::new()),
            Arc::new(ManualClock::starting_at(1_000)),
        )
        .unwrap()
    }

    #[test]
    fn native_deposit_credits_and_notifies() {
        let mut market = market();
        market.deposit_native(ALICE, Amount::new(5_000)).unwrap();
        assert_eq!(market.balance_of(ALICE, &AssetId::Native), Amount::new(5_000));
        assert!(matches!(
            market.take_events().as_slice(),
            [Event::DepositReceived { .. }]
        ));
        market.verify_solvency(&AssetId::Native).unwrap();
    }

    #[test]
    fn zero_deposit_rejected() {
        let mut market = market();
        let err = market.deposit_native(ALICE, Amount::ZERO).unwrap_err();
        assert!(matches!(err, MarketError::InvalidAmount { .. }));
    }

    #[test]
    fn token_deposit_pulls_through_gateway() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        let usdc = AssetId::token("USDC");
        market
            .deposit_token(ALICE, &usdc, Amount::new(300), &mut gateway)
            .unwrap();
        assert_eq!(market.balance_of(ALICE, &usdc), Amount::new(300));
        assert_eq!(gateway.pulls, vec![(usdc.clone(), ALICE, Amount::new(300))]);
        market.verify_solvency(&usdc).unwrap();
    }

    #[test]
    fn token_deposit_with_native_asset_rejected() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        let err = market
            .deposit_token(ALICE, &AssetId::Native, Amount::new(1), &mut gateway)
            .unwrap_err();
        assert!(matches!(err, MarketError::TokenAssetRequired));
    }

    #[test]
    fn unaccepted_asset_rejected() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        let err = market
            .deposit_token(ALICE, &AssetId::token("SHADY"), Amount::new(1), &mut gateway)
            .unwrap_err();
        assert!(matches!(err, MarketError::AssetNotAccepted(_)));
        assert!(gateway.pulls.is_empty());
    }

    #[test]
    fn failed_pull_credits_nothing() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        gateway.fail_next = true;
        let usdc = AssetId::token("USDC");
        let err = market
            .deposit_token(ALICE, &usdc, Amount::new(300), &mut gateway)
            .unwrap_err();
        assert!(matches!(err, MarketError::TransferFailed { .. }));
        assert_eq!(market.balance_of(ALICE, &usdc), Amount::ZERO);
        market.verify_solvency(&usdc).unwrap();
    }

    #[test]
    fn withdraw_decrements_then_transfers() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        market.deposit_native(ALICE, Amount::new(1_000)).unwrap();
        market
            .withdraw(ALICE, &AssetId::Native, Amount::new(400), &mut gateway)
            .unwrap();
        assert_eq!(market.balance_of(ALICE, &AssetId::Native), Amount::new(600));
        assert_eq!(
            gateway.transfers,
            vec![(AssetId::Native, ALICE, Amount::new(400))]
        );
        market.verify_solvency(&AssetId::Native).unwrap();
    }

    #[test]
    fn failed_withdraw_transfer_unwinds_decrement() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        market.deposit_native(ALICE, Amount::new(1_000)).unwrap();
        gateway.fail_next = true;
        let err = market
            .withdraw(ALICE, &AssetId::Native, Amount::new(400), &mut gateway)
            .unwrap_err();
        assert!(matches!(err, MarketError::TransferFailed { .. }));
        assert_eq!(market.balance_of(ALICE, &AssetId::Native), Amount::new(1_000));
        market.verify_solvency(&AssetId::Native).unwrap();
        // guard was released on the failure path
        assert!(!market.guard.is_held());
    }

    #[test]
    fn overdraw_rejected() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        market.deposit_native(ALICE, Amount::new(100)).unwrap();
        let err = market
            .withdraw(ALICE, &AssetId::Native, Amount::new(101), &mut gateway)
            .unwrap_err();
        assert!(matches!(err, MarketError::InsufficientBalance { .. }));
        assert!(gateway.transfers.is_empty());
    }

    #[test]
    fn unknown_balances_read_zero() {
        let market = market();
        assert_eq!(market.balance_of(ALICE, &AssetId::token("DAI")), Amount::ZERO);
        assert_eq!(
            market.balances_of(ALICE, &[AssetId::Native, AssetId::token("DAI")]),
            vec![Amount::ZERO, Amount::ZERO]
        );
    }

    #[test]
    fn treasury_withdraw_is_admin_only() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        let err = market
            .treasury_withdraw(ALICE, &AssetId::Native, Amount::new(1), &mut gateway)
            .unwrap_err();
        assert!(matches!(err, MarketError::AdminOnly));
    }

    #[test]
    fn config_updates_are_admin_only() {
        let mut market = market();
        assert!(matches!(
            market.set_fee_bps(ALICE, 100).unwrap_err(),
            MarketError::AdminOnly
        ));
        market.set_fee_bps(ADMIN, 100).unwrap();
        assert_eq!(market.config().fee_bps, 100);
        assert!(market.set_fee_bps(ADMIN, 10_001).is_err());
    }

    #[test]
    fn empty_earnings_withdraw_all_rejected() {
        let mut market = market();
        let mut gateway = RecordingGateway::new();
        let err = market
            .withdraw_all_earnings(ALICE, &AssetId::Native, &mut gateway)
            .unwrap_err();
        assert!(matches!(err, MarketError::NothingToWithdraw));
    }
}
