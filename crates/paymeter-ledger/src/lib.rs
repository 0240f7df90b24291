//! # paymeter-ledger
//!
//! Balance state for the paymeter marketplace: the pre-funded escrow
//! ledger, the host earnings ledger, the platform treasury accumulator,
//! the solvency tracker, and the call-scoped reentrancy guard.
//!
//! ## Architecture
//!
//! These are plain in-memory state managers — the source of truth for all
//! balances. They never talk to the outside world themselves; the
//! lifecycle controller orchestrates external transfers around them and
//! keeps every mutation atomic (either the full operation lands or the
//! ledger is unchanged).
//!
//! ```text
//! Marketplace ──▶ EscrowLedger      (account, asset) → balance
//!            ──▶ EarningsLedger    (host, asset)    → withdrawable
//!            ──▶ Treasury          asset            → accrued fees
//!            ──▶ SolvencyLedger    asset            → value held
//!            ──▶ CallGuard         reentrancy gate
//! ```

pub mod earnings;
pub mod escrow;
pub mod guard;
pub mod solvency;
pub mod treasury;

pub use earnings::EarningsLedger;
pub use escrow::EscrowLedger;
pub use guard::CallGuard;
pub use solvency::SolvencyLedger;
pub use treasury::Treasury;
