//! # paymeter-market
//!
//! The session lifecycle controller — the public surface of the paymeter
//! settlement engine.
//!
//! ## Architecture
//!
//! [`Marketplace`] owns all shared mutable state (escrow, earnings,
//! treasury, solvency tracker, session registry) and composes the external
//! collaborators (host registry, model registry, clock, asset gateway):
//!
//! ```text
//!        deposits/withdrawals         session lifecycle
//!               │                            │
//!               ▼                            ▼
//!        ┌──────────────────────────────────────────┐
//!        │          Marketplace (guarded)           │
//!        │  EscrowLedger   sessions + indexes       │
//!        │  EarningsLedger SettlementEngine         │
//!        │  Treasury       SolvencyLedger           │
//!        └──────┬───────────────────┬───────────────┘
//!               ▼                   ▼
//!        HostRegistry /       AssetGateway
//!        ModelRegistry        (untrusted hooks)
//!        (read-only)
//! ```
//!
//! Every public entry point executes as one atomic unit: state is mutated
//! before any external transfer, failures unwind the call's own effects,
//! and the call guard rejects reentrant calls arriving from transfer hooks.

pub mod lifecycle;
pub mod marketplace;
pub mod proof;

pub use marketplace::Marketplace;
pub use proof::{proof_digest, verify_host_signature};
