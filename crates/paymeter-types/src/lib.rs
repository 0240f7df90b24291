//! # paymeter-types
//!
//! Shared types, errors, and configuration for the **paymeter** session
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`SessionId`], [`Address`], [`ModelId`]
//! - **Value model**: [`Amount`], [`AssetId`], [`Timestamp`]
//! - **Session model**: [`Session`], [`SessionStatus`]
//! - **Configuration**: [`MarketConfig`], [`AssetPolicy`], [`SessionLimits`]
//! - **Events**: [`Event`] — the notification surface
//! - **Errors**: [`MarketError`] with `PM_ERR_` prefix codes, [`ErrorKind`]
//! - **Collaborator seams**: [`Clock`], [`HostRegistry`], [`ModelRegistry`],
//!   [`AssetGateway`], [`MarketReentry`]
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod asset;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod gateway;
pub mod ids;
pub mod registry;
pub mod session;

// Re-export all primary types at crate root for ergonomic imports:
//   use paymeter_types::{Session, Address, Amount, MarketError, ...};

pub use amount::*;
pub use asset::*;
pub use clock::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use gateway::*;
pub use ids::*;
pub use registry::*;
pub use session::*;

// Constants are accessed via `paymeter_types::constants::FOO`
// (not re-exported to avoid name collisions).
