//! Solvency: for every asset, value held by the system equals open escrow
//! balances + deposits of active sessions + host earnings + the treasury
//! accumulator — after every single mutating operation.
//!
//! This suite walks a realistic multi-user, multi-asset history and
//! re-checks the identity at every step, including on failure paths.

use std::sync::Arc;

use ed25519_dalek::{Signer, SigningKey};
use paymeter_market::{Marketplace, proof_digest};
use paymeter_types::{
    Address, Amount, AssetId, AssetPolicy, ManualClock, MarketConfig, MarketError,
    RecordingGateway, SessionId, StaticHostRegistry, StaticModelRegistry,
};

const ALICE: Address = Address([1u8; 32]);
const BOB: Address = Address([3u8; 32]);
const ADMIN: Address = Address([9u8; 32]);

struct Fixture {
    market: Marketplace,
    clock: Arc<ManualClock>,
    gateway: RecordingGateway,
    host_key: SigningKey,
    host: Address,
}

fn usdc() -> AssetId {
    AssetId::token("USDC")
}

impl Fixture {
    fn new() -> Self {
        let host_key = SigningKey::from_bytes(&[42u8; 32]);
        let host = Address::from_pubkey(host_key.verifying_key().to_bytes());

        let mut config = MarketConfig::new(ADMIN);
        config.fee_bps = 250; // 2.5%
        config.dispute_window_secs = 100;
        config.asset_policies.insert(
            AssetId::Native,
            AssetPolicy {
                min_deposit: Amount::new(1),
                max_deposit: Amount::new(u128::MAX),
            },
        );
        config.asset_policies.insert(
            usdc(),
            AssetPolicy {
                min_deposit: Amount::new(1),
                max_deposit: Amount::new(u128::MAX),
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
            gateway: RecordingGateway::new(),
            host_key,
            host,
        }
    }

    fn prove(&mut self, session: SessionId, units: u64) {
        let digest = proof_digest(session, &self.host, units, "ref");
        let sig = self.host_key.sign(&digest).to_bytes();
        self.market.submit_proof(session, units, "ref", &sig).unwrap();
    }

    fn check(&self) {
        self.market.verify_solvency_all().unwrap();
    }
}

#[test]
fn solvency_holds_across_full_history() {
    let mut fx = Fixture::new();

    // --- funding ---
    fx.market.deposit_native(ALICE, Amount::new(5_000_000)).unwrap();
    fx.check();
    fx.market
        .deposit_token(BOB, &usdc(), Amount::new(2_000_000), &mut fx.gateway)
        .unwrap();
    fx.check();

    // --- session creation, three funding paths ---
    let inline = fx
        .market
        .create_session(ALICE, fx.host, Amount::new(100), 3_600, 100, Amount::new(1_000_000))
        .unwrap();
    fx.check();

    let from_deposit = fx
        .market
        .create_session_from_deposit(
            ALICE,
            fx.host,
            AssetId::Native,
            Amount::new(2_000_000),
            Amount::new(50),
            3_600,
            100,
            None,
        )
        .unwrap();
    fx.check();

    let token_session = fx
        .market
        .create_session_with_token(
            BOB,
            fx.host,
            usdc(),
            Amount::new(500_000),
            Amount::new(10),
            3_600,
            100,
            &mut fx.gateway,
        )
        .unwrap();
    fx.check();

    // --- proofs ---
    fx.prove(inline, 4_000);
    fx.check();
    fx.prove(from_deposit, 10_000);
    fx.check();
    fx.prove(token_session, 30_000);
    fx.check();

    // --- terminal transitions ---
    fx.market
        .complete_session(ALICE, inline, None, &mut fx.gateway)
        .unwrap();
    fx.check();

    fx.clock.advance(500); // past interval 100 × multiplier 3
    fx.market
        .trigger_timeout(BOB, from_deposit, &mut fx.gateway)
        .unwrap();
    fx.check();

    fx.market
        .complete_session(BOB, token_session, None, &mut fx.gateway)
        .unwrap();
    fx.check();

    // --- payouts ---
    fx.market
        .withdraw_all_earnings(fx.host, &AssetId::Native, &mut fx.gateway)
        .unwrap();
    fx.check();
    fx.market
        .withdraw_all_earnings(fx.host, &usdc(), &mut fx.gateway)
        .unwrap();
    fx.check();

    let native_fees = fx.market.treasury_balance(&AssetId::Native);
    fx.market
        .treasury_withdraw(ADMIN, &AssetId::Native, native_fees, &mut fx.gateway)
        .unwrap();
    fx.check();

    // --- remaining escrow withdrawn ---
    let rest = fx.market.balance_of(ALICE, &AssetId::Native);
    fx.market
        .withdraw(ALICE, &AssetId::Native, rest, &mut fx.gateway)
        .unwrap();
    fx.check();
    let rest = fx.market.balance_of(BOB, &usdc());
    fx.market
        .withdraw(BOB, &usdc(), rest, &mut fx.gateway)
        .unwrap();
    fx.check();
}

#[test]
fn solvency_holds_on_failure_paths() {
    let mut fx = Fixture::new();
    fx.market.deposit_native(ALICE, Amount::new(1_000_000)).unwrap();
    fx.check();

    // failed escrow withdrawal (gateway rejects)
    fx.gateway.fail_next = true;
    let err = fx
        .market
        .withdraw(ALICE, &AssetId::Native, Amount::new(500_000), &mut fx.gateway)
        .unwrap_err();
    assert!(matches!(err, MarketError::TransferFailed { .. }));
    fx.check();

    // failed token pull credits nothing
    fx.gateway.fail_next = true;
    let err = fx
        .market
        .deposit_token(BOB, &usdc(), Amount::new(100), &mut fx.gateway)
        .unwrap_err();
    assert!(matches!(err, MarketError::TransferFailed { .. }));
    fx.check();

    // failed refund leaves the session active and the identity intact
    let session = fx
        .market
        .create_session_from_deposit(
            ALICE,
            fx.host,
            AssetId::Native,
            Amount::new(500_000),
            Amount::new(100),
            3_600,
            100,
            None,
        )
        .unwrap();
    fx.check();
    fx.gateway.fail_next = true;
    let err = fx
        .market
        .complete_session(ALICE, session, None, &mut fx.gateway)
        .unwrap_err();
    assert!(matches!(err, MarketError::TransferFailed { .. }));
    fx.check();

    // rejected creation mutates nothing
    let err = fx
        .market
        .create_session(
            ALICE,
            Address([8u8; 32]),
            Amount::new(100),
            3_600,
            100,
            Amount::new(100),
        )
        .unwrap_err();
    assert!(matches!(err, MarketError::HostNotRegistered(_)));
    fx.check();
}

#[test]
fn escrow_balance_isolated_between_accounts_and_assets() {
    let mut fx = Fixture::new();
    fx.market.deposit_native(ALICE, Amount::new(100)).unwrap();
    fx.market
        .deposit_token(ALICE, &usdc(), Amount::new(200), &mut fx.gateway)
        .unwrap();
    fx.market.deposit_native(BOB, Amount::new(300)).unwrap();

    assert_eq!(fx.market.balance_of(ALICE, &AssetId::Native), Amount::new(100));
    assert_eq!(fx.market.balance_of(ALICE, &usdc()), Amount::new(200));
    assert_eq!(fx.market.balance_of(BOB, &AssetId::Native), Amount::new(300));
    assert_eq!(fx.market.balance_of(BOB, &usdc()), Amount::ZERO);
    fx.check();
}
