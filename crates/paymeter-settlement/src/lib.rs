//! # paymeter-settlement
//!
//! Settlement of terminal sessions: the exact three-way split and its
//! disbursement into the ledgers.
//!
//! ## Split
//!
//! For a session with deposit `D`, price `P`, proof-confirmed consumption
//! `U` (with `U·P ≤ D` guaranteed by the proof path) and fee rate `F`
//! basis points:
//!
//! ```text
//! host_gross       = U · P
//! platform_fee     = ⌊host_gross · F / 10_000⌋
//! host_net         = host_gross − platform_fee
//! depositor_refund = D − host_gross
//! ```
//!
//! and `host_net + platform_fee + depositor_refund == D` exactly.
//!
//! ## Disbursement
//!
//! Effects before external interaction: host earnings and treasury are
//! credited first (both stay inside the system); the refund is a one-shot
//! outbound transfer executed by the controller afterwards. The session's
//! once-only flags make settlement idempotent, and [`SettlementEngine::revoke`]
//! unwinds the credits when the refund transfer fails.

pub mod engine;
pub mod split;

pub use engine::SettlementEngine;
pub use split::SettlementSplit;
