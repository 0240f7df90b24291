//! # Session — the escrow + metering unit
//!
//! A `Session` spans one depositor/host engagement: the depositor locks a
//! fixed deposit at creation, the host submits signed cumulative consumption
//! claims against it, and a terminal transition settles the three-way split.
//!
//! ## State Machine
//!
//! ```text
//!              accepted proof (self-loop)
//!                 ┌────┐
//!                 ▼    │
//!   ┌─────────────────┬┘  complete   ┌───────────┐
//!   │     ACTIVE      ├─────────────▶│ COMPLETED │
//!   └───────┬─────────┘              └───────────┘
//!           │ timeout
//!           ▼
//!   ┌───────────┐
//!   │ TIMED_OUT │
//!   └───────────┘
//! ```
//!
//! Both terminal states are final: no field mutates afterwards except the
//! once-only settlement flags. Sessions are never deleted — the registry is
//! append-only history.
//!
//! ## Invariant
//!
//! `units_consumed * price_per_unit <= deposit_amount` holds at all times;
//! the proof path rejects any claim that would break it.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, AssetId, MarketError, ModelId, Result, SessionId, Timestamp};

/// The lifecycle state of a session.
///
/// Transitions are **monotonic** (never go backwards):
/// - `Active → Completed` (explicit completion)
/// - `Active → TimedOut` (force-closed past the timeout threshold)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Accepting proofs; deposit is locked.
    Active,
    /// Settled by an explicit completion. **Terminal.**
    Completed,
    /// Force-closed after the host went silent. Settled for proof-confirmed
    /// consumption only. **Terminal.**
    TimedOut,
}

impl SessionStatus {
    /// Can this session transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Completed | Self::TimedOut)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

/// One escrowed pay-per-use engagement between a depositor and a host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Globally unique session identifier.
    pub id: SessionId,
    /// The funding party; entitled to the unconsumed refund.
    pub depositor: Address,
    /// The compute-providing party; signs consumption proofs.
    pub host: Address,
    /// The asset the deposit is denominated in.
    pub asset: AssetId,
    /// Escrowed value, fixed at creation. Never increased.
    pub deposit_amount: Amount,
    /// Price per metered unit of consumption.
    pub price_per_unit: Amount,
    /// Cumulative proof-confirmed consumption. Monotonic, non-decreasing.
    pub units_consumed: u64,
    /// Advertised maximum engagement length, seconds.
    pub max_duration_secs: u64,
    /// Proof cadence the host committed to, seconds.
    pub proof_interval_secs: u64,
    /// When the session was opened.
    pub started_at: Timestamp,
    /// When the last proof was accepted (creation time until then).
    pub last_proof_at: Timestamp,
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Set once when the settlement engine credits the host's earnings.
    pub host_credited: bool,
    /// Set once when the unconsumed remainder is returned to the depositor.
    pub depositor_refunded: bool,
    /// Optional governance-approved model this session is bound to.
    pub model: Option<ModelId>,
    /// Opaque off-chain content reference from the latest proof or the
    /// completion call (e.g., a CID of session artifacts).
    pub content_ref: Option<String>,
    /// Digest the latest accepted proof was signed over.
    pub last_proof_digest: Option<[u8; 32]>,
}

impl Session {
    /// Open a new session. `last_proof_at` starts at the creation time, so
    /// the dispute window and timeout threshold are measured from the start
    /// until the first proof lands.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        id: SessionId,
        depositor: Address,
        host: Address,
        asset: AssetId,
        deposit_amount: Amount,
        price_per_unit: Amount,
        max_duration_secs: u64,
        proof_interval_secs: u64,
        model: Option<ModelId>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            depositor,
            host,
            asset,
            deposit_amount,
            price_per_unit,
            units_consumed: 0,
            max_duration_secs,
            proof_interval_secs,
            started_at: now,
            last_proof_at: now,
            status: SessionStatus::Active,
            host_credited: false,
            depositor_refunded: false,
            model,
            content_ref: None,
            last_proof_digest: None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Value of the proof-confirmed consumption so far.
    pub fn consumed_value(&self) -> Result<Amount> {
        self.price_per_unit.checked_mul_units(self.units_consumed)
    }

    /// Instant at which the dispute window closes and a non-depositor may
    /// force completion.
    #[must_use]
    pub fn dispute_window_ends(&self, dispute_window_secs: u64) -> Timestamp {
        self.last_proof_at.saturating_add(dispute_window_secs)
    }

    /// Instant at which any caller may force a timeout.
    #[must_use]
    pub fn timeout_threshold(&self, timeout_multiplier: u32) -> Timestamp {
        self.last_proof_at
            .saturating_add(self.proof_interval_secs.saturating_mul(u64::from(timeout_multiplier)))
    }

    /// Record an accepted consumption claim. The caller has already
    /// verified monotonicity, the deposit cap, and the host signature.
    pub fn record_claim(
        &mut self,
        claimed_units: u64,
        digest: [u8; 32],
        content_ref: String,
        now: Timestamp,
    ) -> Result<()> {
        self.ensure_active()?;
        self.units_consumed = claimed_units;
        self.last_proof_at = now;
        self.last_proof_digest = Some(digest);
        self.content_ref = Some(content_ref);
        Ok(())
    }

    /// Transition to COMPLETED, optionally recording a final content ref.
    pub fn mark_completed(&mut self, content_ref: Option<String>) -> Result<()> {
        self.transition(SessionStatus::Completed)?;
        if content_ref.is_some() {
            self.content_ref = content_ref;
        }
        Ok(())
    }

    /// Transition to TIMED_OUT.
    pub fn mark_timed_out(&mut self) -> Result<()> {
        self.transition(SessionStatus::TimedOut)
    }

    fn transition(&mut self, target: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(MarketError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(MarketError::SessionNotActive {
                session: self.id,
                status: self.status,
            })
        }
    }
}

/// Dummy session for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Session {
    /// Create a dummy active native-asset session for unit tests.
    pub fn dummy(deposit_amount: Amount, price_per_unit: Amount) -> Self {
        Self::open(
            SessionId::new(),
            Address([1u8; 32]),
            Address([2u8; 32]),
            AssetId::Native,
            deposit_amount,
            price_per_unit,
            3_600,
            100,
            None,
            1_000,
        )
    }
}
