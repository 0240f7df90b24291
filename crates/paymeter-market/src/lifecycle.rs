//! Session lifecycle: creation, proof acceptance, completion, timeout.
//!
//! All creation variants funnel through one validation/initialization
//! path; they differ only in how the deposit is funded (inline native
//! value, a token pull, or the pre-funded escrow balance) and whether the
//! session is bound to a governance-approved model.
//!
//! Terminal transitions settle through the settlement engine: ledger
//! credits first, the one-shot refund transfer last, and a failed refund
//! unwinds the whole call — the session stays active and nothing is
//! disbursed.

use tracing::{debug, info};

use paymeter_settlement::{SettlementEngine, SettlementSplit};
use paymeter_types::{
    Address, Amount, AssetGateway, AssetId, Event, MarketError, ModelId, Result, Session,
    SessionId,
};

use crate::marketplace::Marketplace;
use crate::proof::{proof_digest, verify_host_signature};

/// Parameters shared by every creation variant.
struct SessionRequest {
    depositor: Address,
    host: Address,
    asset: AssetId,
    deposit_amount: Amount,
    price_per_unit: Amount,
    max_duration_secs: u64,
    proof_interval_secs: u64,
    model: Option<ModelId>,
}

impl Marketplace {
    // =====================================================================
    // Creation
    // =====================================================================

    /// Open a session funded by the native value attached to the call.
    pub fn create_session(
        &mut self,
        depositor: Address,
        host: Address,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        attached: Amount,
    ) -> Result<SessionId> {
        self.create_native(
            depositor,
            host,
            price_per_unit,
            max_duration_secs,
            proof_interval_secs,
            attached,
            None,
        )
    }

    /// Open a model-bound session funded by attached native value.
    #[allow(clippy::too_many_arguments)]
    pub fn create_session_for_model(
        &mut self,
        depositor: Address,
        host: Address,
        model: ModelId,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        attached: Amount,
    ) -> Result<SessionId> {
        self.create_native(
            depositor,
            host,
            price_per_unit,
            max_duration_secs,
            proof_interval_secs,
            attached,
            Some(model),
        )
    }

    /// Open a session funded by an allowance-gated token pull.
    #[allow(clippy::too_many_arguments)]
    pub fn create_session_with_token(
        &mut self,
        depositor: Address,
        host: Address,
        asset: AssetId,
        deposit_amount: Amount,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SessionId> {
        self.create_with_token(
            depositor,
            host,
            asset,
            deposit_amount,
            price_per_unit,
            max_duration_secs,
            proof_interval_secs,
            None,
            gateway,
        )
    }

    /// Open a model-bound session funded by a token pull.
    #[allow(clippy::too_many_arguments)]
    pub fn create_session_for_model_with_token(
        &mut self,
        depositor: Address,
        host: Address,
        model: ModelId,
        asset: AssetId,
        deposit_amount: Amount,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SessionId> {
        self.create_with_token(
            depositor,
            host,
            asset,
            deposit_amount,
            price_per_unit,
            max_duration_secs,
            proof_interval_secs,
            Some(model),
            gateway,
        )
    }

    /// Open a session drawing on the depositor's pre-funded escrow
    /// balance. No external interaction — the value is already held.
    #[allow(clippy::too_many_arguments)]
    pub fn create_session_from_deposit(
        &mut self,
        depositor: Address,
        host: Address,
        asset: AssetId,
        deposit_amount: Amount,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        model: Option<ModelId>,
    ) -> Result<SessionId> {
        let request = SessionRequest {
            depositor,
            host,
            asset,
            deposit_amount,
            price_per_unit,
            max_duration_secs,
            proof_interval_secs,
            model,
        };
        self.validate_request(&request)?;
        self.escrow
            .debit(depositor, &request.asset, deposit_amount)?;
        Ok(self.open_session(request))
    }

    #[allow(clippy::too_many_arguments)]
    fn create_native(
        &mut self,
        depositor: Address,
        host: Address,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        attached: Amount,
        model: Option<ModelId>,
    ) -> Result<SessionId> {
        let request = SessionRequest {
            depositor,
            host,
            asset: AssetId::Native,
            deposit_amount: attached,
            price_per_unit,
            max_duration_secs,
            proof_interval_secs,
            model,
        };
        self.validate_request(&request)?;
        self.solvency.record_inflow(&AssetId::Native, attached)?;
        Ok(self.open_session(request))
    }

    #[allow(clippy::too_many_arguments)]
    fn create_with_token(
        &mut self,
        depositor: Address,
        host: Address,
        asset: AssetId,
        deposit_amount: Amount,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        model: Option<ModelId>,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SessionId> {
        self.guard.enter()?;
        let result = self.create_with_token_guarded(
            depositor,
            host,
            asset,
            deposit_amount,
            price_per_unit,
            max_duration_secs,
            proof_interval_secs,
            model,
            gateway,
        );
        self.guard.exit();
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn create_with_token_guarded(
        &mut self,
        depositor: Address,
        host: Address,
        asset: AssetId,
        deposit_amount: Amount,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        model: Option<ModelId>,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SessionId> {
        if asset.is_native() {
            return Err(MarketError::TokenAssetRequired);
        }
        let request = SessionRequest {
            depositor,
            host,
            asset,
            deposit_amount,
            price_per_unit,
            max_duration_secs,
            proof_interval_secs,
            model,
        };
        self.validate_request(&request)?;
        // the pull runs token hooks; validate everything first
        gateway.pull(&request.asset, depositor, deposit_amount, self)?;
        self.solvency.record_inflow(&request.asset, deposit_amount)?;
        Ok(self.open_session(request))
    }

    /// Shared validation for every creation variant. Pure checks — no
    /// state is touched, so any error leaves the marketplace unchanged.
    fn validate_request(&self, request: &SessionRequest) -> Result<()> {
        let limits = &self.config.limits;
        if request.price_per_unit < limits.min_price_per_unit
            || request.price_per_unit > limits.max_price_per_unit
        {
            return Err(MarketError::PriceOutOfRange {
                offered: request.price_per_unit,
                min: limits.min_price_per_unit,
                max: limits.max_price_per_unit,
            });
        }
        if request.max_duration_secs < limits.min_duration_secs
            || request.max_duration_secs > limits.max_duration_secs
        {
            return Err(MarketError::DurationOutOfRange {
                offered: request.max_duration_secs,
                min: limits.min_duration_secs,
                max: limits.max_duration_secs,
            });
        }
        if request.proof_interval_secs < limits.min_proof_interval_secs
            || request.proof_interval_secs > limits.max_proof_interval_secs
        {
            return Err(MarketError::ProofIntervalOutOfRange {
                offered: request.proof_interval_secs,
                min: limits.min_proof_interval_secs,
                max: limits.max_proof_interval_secs,
            });
        }

        if request.host.is_zero() {
            return Err(MarketError::InvalidHost {
                reason: "zero address".into(),
            });
        }
        if request.host == request.depositor {
            return Err(MarketError::InvalidHost {
                reason: "host and depositor must differ".into(),
            });
        }
        if !self.hosts.is_registered(&request.host) {
            return Err(MarketError::HostNotRegistered(request.host));
        }
        if let Some(model) = &request.model {
            if !self.models.is_approved(model) {
                return Err(MarketError::ModelNotApproved(model.clone()));
            }
            if !self.hosts.supports_model(&request.host, model) {
                return Err(MarketError::ModelNotSupported {
                    host: request.host,
                    model: model.clone(),
                });
            }
        }
        if let Some(minimum) = self.hosts.min_price(&request.host) {
            if request.price_per_unit < minimum {
                return Err(MarketError::PriceBelowHostMinimum {
                    offered: request.price_per_unit,
                    minimum,
                });
            }
        }

        let policy = self
            .config
            .asset_policy(&request.asset)
            .ok_or_else(|| MarketError::AssetNotAccepted(request.asset.clone()))?;
        if request.deposit_amount < policy.min_deposit
            || request.deposit_amount > policy.max_deposit
        {
            return Err(MarketError::DepositOutOfBounds {
                amount: request.deposit_amount,
                min: policy.min_deposit,
                max: policy.max_deposit,
            });
        }
        Ok(())
    }

    /// Register the funded session and index it under both parties.
    fn open_session(&mut self, request: SessionRequest) -> SessionId {
        let id = SessionId::new();
        let now = self.clock.now();
        let session = Session::open(
            id,
            request.depositor,
            request.host,
            request.asset,
            request.deposit_amount,
            request.price_per_unit,
            request.max_duration_secs,
            request.proof_interval_secs,
            request.model,
            now,
        );
        info!(
            session = %id,
            depositor = %session.depositor,
            host = %session.host,
            asset = %session.asset,
            deposit = %session.deposit_amount,
            price = %session.price_per_unit,
            "session created"
        );
        self.push_event(Event::SessionCreated {
            session: id,
            depositor: session.depositor,
            host: session.host,
            asset: session.asset.clone(),
            deposit_amount: session.deposit_amount,
            price_per_unit: session.price_per_unit,
            model: session.model.clone(),
        });
        self.by_depositor
            .entry(session.depositor)
            .or_default()
            .push(id);
        self.by_host.entry(session.host).or_default().push(id);
        self.sessions.insert(id, session);
        id
    }

    // =====================================================================
    // Proofs
    // =====================================================================

    /// Accept a host-signed cumulative consumption claim.
    ///
    /// Anyone may relay the call — authentication is the signature, which
    /// must verify against the session's registered host over a digest
    /// recomputed from the session's own fields.
    ///
    /// # Errors
    /// - `StaleClaim` unless the claim strictly exceeds recorded
    ///   consumption
    /// - `OverClaim` if the claimed value exceeds the deposit (rejected
    ///   outright, never clamped)
    /// - `HostSignatureMismatch` / `MalformedSignature` on bad signatures
    pub fn submit_proof(
        &mut self,
        session_id: SessionId,
        claimed_units: u64,
        content_ref: &str,
        signature: &[u8],
    ) -> Result<()> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(MarketError::SessionNotFound(session_id))?;
        if !session.is_active() {
            return Err(MarketError::SessionNotActive {
                session: session_id,
                status: session.status,
            });
        }

        if claimed_units <= session.units_consumed {
            return Err(MarketError::StaleClaim {
                claimed: claimed_units,
                recorded: session.units_consumed,
            });
        }
        let claimed_value = session.price_per_unit.checked_mul_units(claimed_units)?;
        if claimed_value > session.deposit_amount {
            return Err(MarketError::OverClaim {
                claimed_value,
                deposit: session.deposit_amount,
            });
        }

        let digest = proof_digest(session_id, &session.host, claimed_units, content_ref);
        verify_host_signature(session_id, &session.host, &digest, signature)?;

        let now = self.clock.now();
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(MarketError::SessionNotFound(session_id))?;
        session.record_claim(claimed_units, digest, content_ref.to_string(), now)?;

        debug!(
            session = %session_id,
            units = claimed_units,
            "proof accepted"
        );
        self.push_event(Event::ProofAccepted {
            session: session_id,
            units_consumed: claimed_units,
            digest,
        });
        Ok(())
    }

    // =====================================================================
    // Terminal transitions
    // =====================================================================

    /// Complete a session and settle it.
    ///
    /// The depositor may complete at any time. Any other caller must wait
    /// out the dispute window after the last accepted proof — the
    /// depositor's chance to contest before the host (or anyone) forces
    /// settlement.
    pub fn complete_session(
        &mut self,
        caller: Address,
        session_id: SessionId,
        content_ref: Option<String>,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SettlementSplit> {
        self.guard.enter()?;
        let result = self.complete_guarded(caller, session_id, content_ref, gateway);
        self.guard.exit();
        result
    }

    fn complete_guarded(
        &mut self,
        caller: Address,
        session_id: SessionId,
        content_ref: Option<String>,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SettlementSplit> {
        let now = self.clock.now();
        let session = self.active_session(session_id)?;

        if caller != session.depositor {
            let window_ends = session.dispute_window_ends(self.config.dispute_window_secs);
            if now < window_ends {
                return Err(MarketError::DisputeWindowOpen { until: window_ends });
            }
        }

        let mut staged = session.clone();
        staged.mark_completed(content_ref)?;
        let split = self.settle_and_commit(staged, gateway)?;
        info!(session = %session_id, by = %caller, "session completed");
        self.push_event(Event::SessionCompleted {
            session: session_id,
            by: caller,
            host_net: split.host_net,
            platform_fee: split.platform_fee,
            depositor_refund: split.depositor_refund,
        });
        Ok(split)
    }

    /// Force-close a session whose host went silent. Callable by anyone
    /// once `proof_interval × timeout_multiplier` elapses after the last
    /// accepted proof; pays the host only for proof-confirmed consumption
    /// and refunds the remainder.
    pub fn trigger_timeout(
        &mut self,
        caller: Address,
        session_id: SessionId,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SettlementSplit> {
        self.guard.enter()?;
        let result = self.timeout_guarded(caller, session_id, gateway);
        self.guard.exit();
        result
    }

    fn timeout_guarded(
        &mut self,
        caller: Address,
        session_id: SessionId,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SettlementSplit> {
        let now = self.clock.now();
        let session = self.active_session(session_id)?;

        let ready_at = session.timeout_threshold(self.config.timeout_multiplier);
        if now < ready_at {
            return Err(MarketError::TimeoutNotReached { ready_at });
        }

        let mut staged = session.clone();
        staged.mark_timed_out()?;
        let split = self.settle_and_commit(staged, gateway)?;
        info!(session = %session_id, by = %caller, "session timed out");
        self.push_event(Event::SessionTimedOut {
            session: session_id,
            by: caller,
            host_net: split.host_net,
            platform_fee: split.platform_fee,
            depositor_refund: split.depositor_refund,
        });
        Ok(split)
    }

    fn active_session(&self, session_id: SessionId) -> Result<&Session> {
        let session = self
            .sessions
            .get(&session_id)
            .ok_or(MarketError::SessionNotFound(session_id))?;
        if !session.is_active() {
            return Err(MarketError::SessionNotActive {
                session: session_id,
                status: session.status,
            });
        }
        Ok(session)
    }

    /// Disburse a terminal session and commit it to the registry.
    ///
    /// Works on a staged copy: ledger credits land first, then the
    /// one-shot refund transfer. If the transfer fails the credits are
    /// revoked and the staged copy is discarded — the stored session is
    /// still active and untouched.
    fn settle_and_commit(
        &mut self,
        mut staged: Session,
        gateway: &mut dyn AssetGateway,
    ) -> Result<SettlementSplit> {
        let split = SettlementEngine::disburse(
            &mut staged,
            self.config.fee_bps,
            &mut self.earnings,
            &mut self.treasury,
        )?;

        if split.depositor_refund.is_zero() {
            staged.depositor_refunded = true;
        } else {
            let asset = staged.asset.clone();
            let depositor = staged.depositor;
            if let Err(err) = self.send(gateway, &asset, depositor, split.depositor_refund) {
                SettlementEngine::revoke(&mut staged, &split, &mut self.earnings, &mut self.treasury)?;
                return Err(err);
            }
            staged.depositor_refunded = true;
        }

        self.sessions.insert(staged.id, staged);
        Ok(split)
    }
}
