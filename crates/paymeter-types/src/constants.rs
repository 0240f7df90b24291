//! System-wide constants for the paymeter settlement engine.

/// Basis-point denominator: 10 000 bps = 100%.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Maximum configurable platform fee, in basis points (100%).
pub const MAX_FEE_BPS: u16 = 10_000;

/// Default platform fee: 5%.
pub const DEFAULT_FEE_BPS: u16 = 500;

/// Default dispute window: one hour after the last accepted proof during
/// which only the depositor may force completion.
pub const DEFAULT_DISPUTE_WINDOW_SECS: u64 = 3_600;

/// Default timeout multiplier: a session may be force-closed once
/// `proof_interval * multiplier` seconds elapse without an accepted proof.
pub const DEFAULT_TIMEOUT_MULTIPLIER: u32 = 3;

/// Default minimum session deposit for the native asset.
pub const DEFAULT_MIN_DEPOSIT: u128 = 1;

/// Default maximum session deposit for the native asset.
pub const DEFAULT_MAX_DEPOSIT: u128 = 1_000_000_000_000_000_000;

/// Default lower bound on the per-unit price.
pub const MIN_PRICE_PER_UNIT: u128 = 1;

/// Default upper bound on the per-unit price.
pub const MAX_PRICE_PER_UNIT: u128 = 1_000_000_000_000;

/// Default lower bound on session duration (one minute).
pub const MIN_SESSION_DURATION_SECS: u64 = 60;

/// Default upper bound on session duration (30 days).
pub const MAX_SESSION_DURATION_SECS: u64 = 30 * 24 * 3_600;

/// Default lower bound on the proof interval (ten seconds).
pub const MIN_PROOF_INTERVAL_SECS: u64 = 10;

/// Default upper bound on the proof interval (seven days).
pub const MAX_PROOF_INTERVAL_SECS: u64 = 7 * 24 * 3_600;

/// Domain-separation prefix for consumption-proof digests.
pub const PROOF_DOMAIN: &[u8] = b"paymeter:proof:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "paymeter";
