//! Reentrancy resistance.
//!
//! An asset transfer hands control to untrusted code before the invoking
//! entry point returns. A malicious recipient that calls back into the
//! marketplace during its own transfer must have the nested call rejected,
//! while the outer call still completes with exactly one disbursement.

use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey};
use paymeter_market::{Marketplace, proof_digest};
use paymeter_types::{
    Address, Amount, AssetGateway, AssetId, AssetPolicy, ManualClock, MarketConfig, MarketError,
    MarketReentry, Result, SessionId, SessionStatus, StaticHostRegistry, StaticModelRegistry,
};

const DEPOSITOR: Address = Address([1u8; 32]);
const ADMIN: Address = Address([9u8; 32]);

/// What the malicious hook should attempt mid-transfer.
enum Attack {
    /// Re-enter `withdraw` for the transferred amount.
    Withdraw,
    /// Re-enter `trigger_timeout` on a session.
    Timeout(SessionId),
    /// Re-enter `complete_session` on a session.
    Complete(SessionId),
}

/// A recipient whose receive hook attacks the marketplace. Records every
/// nested outcome and the number of transfers that actually landed.
struct MaliciousGateway {
    attack: Attack,
    nested_errors: Vec<String>,
    landed_transfers: usize,
}

impl MaliciousGateway {
    fn new(attack: Attack) -> Self {
        Self {
            attack,
            nested_errors: Vec::new(),
            landed_transfers: 0,
        }
    }
}

impl AssetGateway for MaliciousGateway {
    fn transfer(
        &mut self,
        asset: &AssetId,
        to: Address,
        amount: Amount,
        market: &mut dyn MarketReentry,
    ) -> Result<()> {
        // the hook runs *before* the transfer completes: try to re-enter
        let nested = match &self.attack {
            Attack::Withdraw => market.withdraw(to, asset, amount),
            Attack::Timeout(session) => market.trigger_timeout(to, *session),
            Attack::Complete(session) => market.complete_session(to, *session, None),
        };
        self.nested_errors
            .push(nested.expect_err("nested call must be rejected").to_string());
        self.landed_transfers += 1;
        Ok(())
    }

    fn pull(
        &mut self,
        _asset: &AssetId,
        _from: Address,
        _amount: Amount,
        _market: &mut dyn MarketReentry,
    ) -> Result<()> {
        Ok(())
    }
}

struct Fixture {
    market: Marketplace,
    clock: Arc<ManualClock>,
    host_key: SigningKey,
    host: Address,
}

impl Fixture {
    fn new() -> Self {
        let host_key = SigningKey::from_bytes(&[42u8; 32]);
        let host = Address::from_pubkey(host_key.verifying_key().to_bytes());

        let mut config = MarketConfig::new(ADMIN);
        config.fee_bps = 1_000;
        config.dispute_window_secs = 50;
        config.asset_policies.insert(
            AssetId::Native,
            AssetPolicy {
                min_deposit: Amount::new(1),
                max_deposit: Amount::new(1_000_000_000),
            },
        );

        let clock = Arc::new(ManualClock::starting_at(1_000));
        let market = Marketplace::new(
            config,
            Arc::new(StaticHostRegistry::new().with_host(host, Amount::new(1), [])),
            Arc::new(StaticModelRegistry::new()),
            clock.clone(),
        )
        .unwrap();
        Self {
            market,
            clock,
            host_key,
            host,
        }
    }

    fn open_session_with_proof(&mut self, units: u64) -> SessionId {
        let session = self
            .market
            .create_session(
                DEPOSITOR,
                self.host,
                Amount::new(100),
                3_600,
                100,
                Amount::new(1_000_000),
            )
            .unwrap();
        let digest = proof_digest(session, &self.host, units, "ref");
        let sig = self.host_key.sign(&digest).to_bytes();
        self.market
            .submit_proof(session, units, "ref", &sig)
            .unwrap();
        session
    }
}

#[test]
fn reentrant_withdraw_during_withdraw_rejected() {
    let mut fx = Fixture::new();
    fx.market.deposit_native(DEPOSITOR, Amount::new(1_000)).unwrap();

    let mut gateway = MaliciousGateway::new(Attack::Withdraw);
    fx.market
        .withdraw(DEPOSITOR, &AssetId::Native, Amount::new(400), &mut gateway)
        .unwrap();

    // the nested attempt was rejected by the guard...
    assert_eq!(gateway.nested_errors.len(), 1);
    assert!(
        gateway.nested_errors[0].starts_with("PM_ERR_601"),
        "expected reentrancy rejection, got: {}",
        gateway.nested_errors[0]
    );
    // ...and exactly one disbursement happened
    assert_eq!(gateway.landed_transfers, 1);
    assert_eq!(
        fx.market.balance_of(DEPOSITOR, &AssetId::Native),
        Amount::new(600)
    );
    fx.market.verify_solvency_all().unwrap();
}

#[test]
fn reentrant_timeout_during_refund_rejected() {
    let mut fx = Fixture::new();
    let session = fx.open_session_with_proof(1_000);

    // far past both the dispute window and the timeout threshold, so the
    // nested timeout would be time-eligible — only the guard stops it
    fx.clock.set(10_000);

    let mut gateway = MaliciousGateway::new(Attack::Timeout(session));
    let split = fx
        .market
        .complete_session(DEPOSITOR, session, None, &mut gateway)
        .unwrap();

    assert_eq!(split.depositor_refund, Amount::new(900_000));
    assert_eq!(gateway.nested_errors.len(), 1);
    assert!(gateway.nested_errors[0].starts_with("PM_ERR_601"));
    assert_eq!(gateway.landed_transfers, 1);

    // settled exactly once
    let stored = fx.market.session(&session).unwrap();
    assert_eq!(stored.status, SessionStatus::Completed);
    assert_eq!(
        fx.market.earnings_of(fx.host, &AssetId::Native),
        Amount::new(90_000)
    );
    fx.market.verify_solvency_all().unwrap();
}

#[test]
fn reentrant_complete_during_earnings_payout_rejected() {
    let mut fx = Fixture::new();
    let first = fx.open_session_with_proof(1_000);
    fx.clock.set(10_000);

    let mut honest = paymeter_types::RecordingGateway::new();
    fx.market
        .complete_session(DEPOSITOR, first, None, &mut honest)
        .unwrap();

    // a second active session the hook will try to complete mid-payout
    let second = fx.open_session_with_proof(2_000);

    let mut gateway = MaliciousGateway::new(Attack::Complete(second));
    fx.market
        .withdraw_all_earnings(fx.host, &AssetId::Native, &mut gateway)
        .unwrap();

    assert_eq!(gateway.nested_errors.len(), 1);
    assert!(gateway.nested_errors[0].starts_with("PM_ERR_601"));

    // the target session was untouched by the nested attempt
    assert_eq!(
        fx.market.session(&second).unwrap().status,
        SessionStatus::Active
    );
    fx.market.verify_solvency_all().unwrap();
}

#[test]
fn guard_releases_after_attacked_call() {
    let mut fx = Fixture::new();
    fx.market.deposit_native(DEPOSITOR, Amount::new(1_000)).unwrap();

    let mut gateway = MaliciousGateway::new(Attack::Withdraw);
    fx.market
        .withdraw(DEPOSITOR, &AssetId::Native, Amount::new(100), &mut gateway)
        .unwrap();

    // a fresh, legitimate call goes through — the guard did not stick
    let mut honest = paymeter_types::RecordingGateway::new();
    fx.market
        .withdraw(DEPOSITOR, &AssetId::Native, Amount::new(100), &mut honest)
        .unwrap();
    assert_eq!(
        fx.market.balance_of(DEPOSITOR, &AssetId::Native),
        Amount::new(800)
    );
}
