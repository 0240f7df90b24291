//! Notification surface of the marketplace.
//!
//! Every state-mutating entry point appends an [`Event`] to the
//! controller's log; the embedding application drains the log and fans the
//! records out (API push, audit sink, indexer). Events carry the final
//! figures — a settlement event includes the exact three-way split.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, AssetId, ModelId, SessionId};

/// A notification emitted by a state-mutating operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Escrow balance credited.
    DepositReceived {
        account: Address,
        asset: AssetId,
        amount: Amount,
    },
    /// Escrow balance debited and paid out.
    WithdrawalProcessed {
        account: Address,
        asset: AssetId,
        amount: Amount,
    },
    /// A session was opened and its deposit locked.
    SessionCreated {
        session: SessionId,
        depositor: Address,
        host: Address,
        asset: AssetId,
        deposit_amount: Amount,
        price_per_unit: Amount,
        model: Option<ModelId>,
    },
    /// A signed consumption claim was accepted.
    ProofAccepted {
        session: SessionId,
        units_consumed: u64,
        digest: [u8; 32],
    },
    /// A session completed and settled.
    SessionCompleted {
        session: SessionId,
        by: Address,
        host_net: Amount,
        platform_fee: Amount,
        depositor_refund: Amount,
    },
    /// A session was force-closed past its timeout threshold and settled
    /// for proof-confirmed consumption only.
    SessionTimedOut {
        session: SessionId,
        by: Address,
        host_net: Amount,
        platform_fee: Amount,
        depositor_refund: Amount,
    },
    /// Host earnings paid out.
    EarningsWithdrawn {
        host: Address,
        asset: AssetId,
        amount: Amount,
    },
    /// Accrued platform fees paid out to the admin.
    TreasuryWithdrawn { asset: AssetId, amount: Amount },
    /// A privileged configuration update was applied.
    ConfigUpdated { field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        let ev = Event::SessionCompleted {
            session: SessionId::new(),
            by: Address([1u8; 32]),
            host_net: Amount::new(270_000),
            platform_fee: Amount::new(30_000),
            depositor_refund: Amount::new(700_000),
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }

    #[test]
    fn deposit_event_carries_asset() {
        let ev = Event::DepositReceived {
            account: Address([1u8; 32]),
            asset: AssetId::token("USDC"),
            amount: Amount::new(42),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("USDC"));
    }
}
