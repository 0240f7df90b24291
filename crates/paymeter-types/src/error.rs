//! Error types for the paymeter settlement engine.
//!
//! All errors use the `PM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Creation / input validation errors
//! - 2xx: Authorization errors
//! - 3xx: Session state errors
//! - 4xx: Balance / funds errors
//! - 5xx: Proof errors (replay, over-claim, signatures)
//! - 6xx: External transfer / reentrancy errors
//! - 9xx: General / internal errors
//!
//! [`MarketError::kind`] collapses the variants onto the coarse taxonomy the
//! embedding application dispatches on (validation vs. authorization vs.
//! state vs. funds vs. replay vs. external transfer).

use thiserror::Error;

use crate::{Address, Amount, AssetId, ModelId, SessionId, Timestamp};

/// Central error enum for all paymeter operations.
#[derive(Debug, Error)]
pub enum MarketError {
    // =================================================================
    // Creation / Validation Errors (1xx)
    // =================================================================
    /// Price per unit outside the configured range.
    #[error("PM_ERR_100: Price per unit out of range: {offered} not in [{min}, {max}]")]
    PriceOutOfRange {
        offered: Amount,
        min: Amount,
        max: Amount,
    },

    /// Session duration outside the configured range.
    #[error("PM_ERR_101: Session duration out of range: {offered}s not in [{min}s, {max}s]")]
    DurationOutOfRange { offered: u64, min: u64, max: u64 },

    /// Proof interval outside the configured range.
    #[error("PM_ERR_102: Proof interval out of range: {offered}s not in [{min}s, {max}s]")]
    ProofIntervalOutOfRange { offered: u64, min: u64, max: u64 },

    /// The host address is structurally unusable (zero, or the depositor).
    #[error("PM_ERR_103: Invalid host address: {reason}")]
    InvalidHost { reason: String },

    /// The host is not present in the external host registry.
    #[error("PM_ERR_104: Host not registered: {0}")]
    HostNotRegistered(Address),

    /// The offered per-unit price is below the host's advertised minimum.
    #[error("PM_ERR_105: Price below host minimum: offered {offered}, minimum {minimum}")]
    PriceBelowHostMinimum { offered: Amount, minimum: Amount },

    /// The model identifier is not currently governance-approved.
    #[error("PM_ERR_106: Model not approved: {0}")]
    ModelNotApproved(ModelId),

    /// The host does not advertise support for the requested model.
    #[error("PM_ERR_107: Host {host} does not support {model}")]
    ModelNotSupported { host: Address, model: ModelId },

    /// The asset has no configured policy and is not accepted.
    #[error("PM_ERR_108: Asset not accepted: {0}")]
    AssetNotAccepted(AssetId),

    /// Deposit outside the asset's configured minimum/maximum bounds.
    #[error("PM_ERR_109: Deposit out of bounds: {amount} not in [{min}, {max}]")]
    DepositOutOfBounds {
        amount: Amount,
        min: Amount,
        max: Amount,
    },

    /// A zero or otherwise meaningless amount where value is required.
    #[error("PM_ERR_110: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// A token entry point was called with the native asset.
    #[error("PM_ERR_111: Token asset required; use the native entry point for NATIVE")]
    TokenAssetRequired,

    /// Rejected configuration update (fee above 100%, inverted bounds, ...).
    #[error("PM_ERR_112: Invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    // =================================================================
    // Authorization Errors (2xx)
    // =================================================================
    /// Only the depositor may complete while the dispute window is open.
    #[error("PM_ERR_200: Dispute window open until {until}; only the depositor may complete")]
    DisputeWindowOpen { until: Timestamp },

    /// The caller is not the configured admin identity.
    #[error("PM_ERR_201: Admin-only entry point")]
    AdminOnly,

    // =================================================================
    // Session State Errors (3xx)
    // =================================================================
    /// The requested session does not exist.
    #[error("PM_ERR_300: Session not found: {0}")]
    SessionNotFound(SessionId),

    /// The session is terminal and cannot accept this operation.
    #[error("PM_ERR_301: Session {session} is {status}, not ACTIVE")]
    SessionNotActive {
        session: SessionId,
        status: crate::SessionStatus,
    },

    /// The timeout threshold has not elapsed yet.
    #[error("PM_ERR_302: Timeout not reached; eligible at {ready_at}")]
    TimeoutNotReached { ready_at: Timestamp },

    /// A status transition that the state machine forbids.
    #[error("PM_ERR_303: Invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: crate::SessionStatus,
        to: crate::SessionStatus,
    },

    /// A settlement flag was already set (double-disbursement guard).
    #[error("PM_ERR_304: Session {0} already disbursed")]
    AlreadyDisbursed(SessionId),

    // =================================================================
    // Balance / Funds Errors (4xx)
    // =================================================================
    /// Not enough pre-funded escrow balance.
    #[error("PM_ERR_400: Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        requested: Amount,
        available: Amount,
    },

    /// Not enough withdrawable host earnings.
    #[error("PM_ERR_401: Insufficient earnings: requested {requested}, available {available}")]
    InsufficientEarnings {
        requested: Amount,
        available: Amount,
    },

    /// Not enough accrued treasury fees.
    #[error("PM_ERR_402: Insufficient treasury: requested {requested}, available {available}")]
    InsufficientTreasury {
        requested: Amount,
        available: Amount,
    },

    /// A withdraw-all style call found nothing to pay out.
    #[error("PM_ERR_403: Nothing to withdraw")]
    NothingToWithdraw,

    // =================================================================
    // Proof Errors (5xx)
    // =================================================================
    /// The claim does not strictly exceed recorded consumption (replay).
    #[error("PM_ERR_500: Stale claim: {claimed} units <= recorded {recorded}")]
    StaleClaim { claimed: u64, recorded: u64 },

    /// The claimed value exceeds the session deposit. Rejected outright,
    /// never clamped — accounting stays exact.
    #[error("PM_ERR_501: Over-claim: value {claimed_value} exceeds deposit {deposit}")]
    OverClaim {
        claimed_value: Amount,
        deposit: Amount,
    },

    /// The signature bytes could not be parsed.
    #[error("PM_ERR_502: Malformed signature: {reason}")]
    MalformedSignature { reason: String },

    /// The signature does not verify against the session's registered host.
    #[error("PM_ERR_503: Signature does not match registered host for {session}")]
    HostSignatureMismatch { session: SessionId },

    // =================================================================
    // External Transfer Errors (6xx)
    // =================================================================
    /// The external asset-transfer primitive failed; the enclosing
    /// operation has been unwound.
    #[error("PM_ERR_600: External transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// A nested call arrived while a guarded entry point was executing.
    #[error("PM_ERR_601: Reentrant call rejected")]
    ReentrancyBlocked,

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Solvency invariant violation — critical safety alert.
    #[error("PM_ERR_900: Solvency invariant violation: {reason}")]
    SolvencyViolation { reason: String },

    /// Arithmetic overflow in value computation.
    #[error("PM_ERR_901: Amount arithmetic overflow")]
    AmountOverflow,

    /// Unrecoverable internal error.
    #[error("PM_ERR_902: Internal error: {0}")]
    Internal(String),
}

/// Coarse error taxonomy, for callers that dispatch on failure class
/// rather than individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input; rejected pre-mutation.
    Validation,
    /// The caller lacks the required relationship or privilege.
    Authorization,
    /// Operation against a session or guard in the wrong state.
    State,
    /// Balance or deposit insufficient.
    InsufficientFunds,
    /// A claim that does not strictly advance recorded consumption.
    Replay,
    /// The external asset-transfer primitive failed.
    ExternalTransfer,
    /// Defects: solvency breaks, overflow, internal invariants.
    Internal,
}

impl MarketError {
    /// The coarse class of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PriceOutOfRange { .. }
            | Self::DurationOutOfRange { .. }
            | Self::ProofIntervalOutOfRange { .. }
            | Self::InvalidHost { .. }
            | Self::HostNotRegistered(_)
            | Self::PriceBelowHostMinimum { .. }
            | Self::ModelNotApproved(_)
            | Self::ModelNotSupported { .. }
            | Self::AssetNotAccepted(_)
            | Self::DepositOutOfBounds { .. }
            | Self::InvalidAmount { .. }
            | Self::TokenAssetRequired
            | Self::ConfigInvalid { .. }
            | Self::OverClaim { .. }
            | Self::MalformedSignature { .. } => ErrorKind::Validation,

            Self::DisputeWindowOpen { .. }
            | Self::AdminOnly
            | Self::HostSignatureMismatch { .. } => ErrorKind::Authorization,

            Self::SessionNotFound(_)
            | Self::SessionNotActive { .. }
            | Self::TimeoutNotReached { .. }
            | Self::InvalidTransition { .. }
            | Self::AlreadyDisbursed(_)
            | Self::ReentrancyBlocked => ErrorKind::State,

            Self::InsufficientBalance { .. }
            | Self::InsufficientEarnings { .. }
            | Self::InsufficientTreasury { .. }
            | Self::NothingToWithdraw => ErrorKind::InsufficientFunds,

            Self::StaleClaim { .. } => ErrorKind::Replay,

            Self::TransferFailed { .. } => ErrorKind::ExternalTransfer,

            Self::SolvencyViolation { .. } | Self::AmountOverflow | Self::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, MarketError>;
