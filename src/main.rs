//! Batch Settlement Core Simulation.
//!
//! Demonstrates the full settlement lifecycle including batch notarization,
//! merkle spot checks, payout settlement with tier splits, replay and
//! double-settlement rejection, tier scaling, and saga compensation.

use ed25519_dalek::SigningKey;
use propledger::*;
use rust_decimal_macros::dec;

fn main() {
    println!("Funded-Account Settlement Core Simulation");
    println!("Append-Only Ledger, Merkle Proofs, Tier Splits\n");

    scenario_1_batch_and_audit();
    scenario_2_payout_flow();
    scenario_3_replay_rejection();
    scenario_4_double_settlement();
    scenario_5_tier_scaling();
    scenario_6_saga_compensation();

    println!("\nAll simulations completed successfully.");
}

fn operator_key() -> SigningKey {
    SigningKey::from_bytes(&[42; 32])
}

fn operator_address() -> Address {
    Address::new(operator_key().verifying_key().to_bytes())
}

fn recipient() -> Address {
    Address::new([9; 32])
}

fn sample_trades(trader: u64, first_trade_id: u64) -> Vec<Trade> {
    let pnls = [dec!(2500), dec!(-750), dec!(1800), dec!(1450)];
    pnls.iter()
        .enumerate()
        .map(|(i, pnl)| Trade {
            trader_id: TraderId(trader),
            trade_id: TradeId(first_trade_id + i as u64),
            symbol: "BTC-PERP".to_string(),
            side: if i % 2 == 0 { Side::Long } else { Side::Short },
            size: dec!(0.5),
            entry_price: dec!(50000),
            exit_price: dec!(52000),
            pnl: Quote::new(*pnl),
            fee: Quote::new(dec!(25)),
            executed_at: Timestamp::from_millis(1_000 + i as i64),
        })
        .collect()
}

fn new_orchestrator() -> Orchestrator<InMemoryRegistry, InMemoryCustodian, StaticOperatorSet> {
    let mut orchestrator = Orchestrator::new(
        CoreConfig::testnet(),
        InMemoryRegistry::with_default_tiers(),
        InMemoryCustodian::new(Quote::new(dec!(1_000_000))),
        StaticOperatorSet::with_operators([operator_address()]),
    );
    orchestrator.set_time(Timestamp::from_millis(1_000_000));
    orchestrator
}

fn submit_trades(
    orchestrator: &mut Orchestrator<InMemoryRegistry, InMemoryCustodian, StaticOperatorSet>,
    trades: &[Trade],
) -> (BatchId, MerkleTree) {
    let leaves: Vec<Hash32> = trades.iter().map(|t| t.leaf_hash()).collect();
    let tree = MerkleTree::from_leaves(&leaves);
    let net_pnl: Quote = trades.iter().map(|t| t.pnl).sum();

    let batch_id = orchestrator
        .submit_batch(BatchSubmission {
            batch_hash: sha256(b"execution-engine-batch"),
            merkle_root: tree.root(),
            submitter: operator_address(),
            trade_count: trades.len() as u32,
            total_volume: Quote::new(dec!(200_000)),
            net_pnl,
            metadata: "ipfs://QmTradeSet".to_string(),
        })
        .unwrap();

    (batch_id, tree)
}

/// Batch notarization and third-party audit spot checks.
fn scenario_1_batch_and_audit() {
    println!("Scenario 1: Batch Submission and Audit\n");

    let mut orchestrator = new_orchestrator();
    let trades = sample_trades(1, 100);
    let (batch_id, tree) = submit_trades(&mut orchestrator, &trades);

    let batch = orchestrator.ledger().get_batch(batch_id).unwrap();
    println!("  Batch {} committed", batch_id);
    println!("  Trades: {}, net PnL: ${}", batch.trade_count, batch.net_pnl);

    let proof = tree.proof(2).unwrap();
    let (valid, pnl) = orchestrator.ledger().verify_trade(batch_id, &proof, &trades[2]);
    println!("  Auditor checks trade #{}: valid={}, pnl=${}", trades[2].trade_id.0, valid, pnl);

    let mut corrupted = trades[2].clone();
    corrupted.pnl = Quote::new(dec!(1801)); // off by one
    let (valid, _) = orchestrator.ledger().verify_trade(batch_id, &proof, &corrupted);
    println!("  Auditor checks corrupted copy: valid={}", valid);

    let stats = orchestrator.ledger().global_stats();
    println!("  Global: {} batches, {} trades, cumulative PnL ${}\n", stats.total_batches, stats.total_trades, stats.cumulative_pnl);
}

/// Full payout: registration, settlement, tier split, custody transfer.
fn scenario_2_payout_flow() {
    println!("Scenario 2: Payout Settlement\n");

    let mut orchestrator = new_orchestrator();
    let key = operator_key();

    let reg_message = registration_message("propledger-testnet", TraderId(1), Tier(1), 0);
    orchestrator
        .register_trader(TraderId(1), Tier(1), &OperatorSignature::sign(&key, &reg_message))
        .unwrap();
    println!("  Trader 1 registered at T1, allocation ${}", orchestrator.custodian().allocation_of(TraderId(1)));

    let trades = sample_trades(1, 200);
    let (batch_id, tree) = submit_trades(&mut orchestrator, &trades);
    let proofs: Vec<MerkleProof> = (0..trades.len()).map(|i| tree.proof(i).unwrap()).collect();

    let nonce = orchestrator.trader_nonce(TraderId(1));
    let message = payout_message("propledger-testnet", TraderId(1), recipient(), batch_id, nonce);
    let receipt = orchestrator
        .request_payout(TraderId(1), recipient(), batch_id, &proofs, &trades, &OperatorSignature::sign(&key, &message))
        .unwrap();

    println!("  Gross verified PnL: ${}", receipt.gross_pnl);
    println!("  Trader share (7000 bps): ${}", receipt.trader_share);
    println!("  Pool share: ${}", receipt.pool_share);
    println!("  Pool liquidity after: ${}", orchestrator.custodian().liquidity());
    println!("  Lifetime PnL: ${}\n", orchestrator.registry().get_trader_info(TraderId(1)).unwrap().lifetime_pnl);
}

/// A consumed authorization message never works twice.
fn scenario_3_replay_rejection() {
    println!("Scenario 3: Replay Rejection\n");

    let mut orchestrator = new_orchestrator();
    let key = operator_key();

    let reg_message = registration_message("propledger-testnet", TraderId(1), Tier(2), 0);
    orchestrator
        .register_trader(TraderId(1), Tier(2), &OperatorSignature::sign(&key, &reg_message))
        .unwrap();

    let trades = sample_trades(1, 300);
    let (batch_id, tree) = submit_trades(&mut orchestrator, &trades);
    let proofs: Vec<MerkleProof> = (0..trades.len()).map(|i| tree.proof(i).unwrap()).collect();

    let nonce = orchestrator.trader_nonce(TraderId(1));
    let message = payout_message("propledger-testnet", TraderId(1), recipient(), batch_id, nonce);
    let auth = OperatorSignature::sign(&key, &message);

    orchestrator
        .request_payout(TraderId(1), recipient(), batch_id, &proofs, &trades, &auth)
        .unwrap();
    println!("  First settlement executed, nonce now {}", orchestrator.trader_nonce(TraderId(1)));

    orchestrator.advance_time(120_000); // well past cooldown
    let replay = orchestrator.request_payout(TraderId(1), recipient(), batch_id, &proofs, &trades, &auth);
    println!("  Replay of the same signed message: {}\n", replay.unwrap_err());
}

/// The settlement index blocks a trade from paying out twice, even across batches.
fn scenario_4_double_settlement() {
    println!("Scenario 4: Double Settlement Guard\n");

    let mut orchestrator = new_orchestrator();
    let key = operator_key();

    let reg_message = registration_message("propledger-testnet", TraderId(1), Tier(1), 0);
    orchestrator
        .register_trader(TraderId(1), Tier(1), &OperatorSignature::sign(&key, &reg_message))
        .unwrap();

    // the same trades notarized in two different batches
    let trades = sample_trades(1, 400);
    let (first, tree_a) = submit_trades(&mut orchestrator, &trades);
    let (second, tree_b) = submit_trades(&mut orchestrator, &trades);

    let proofs_a: Vec<MerkleProof> = (0..trades.len()).map(|i| tree_a.proof(i).unwrap()).collect();
    let proofs_b: Vec<MerkleProof> = (0..trades.len()).map(|i| tree_b.proof(i).unwrap()).collect();

    let nonce = orchestrator.trader_nonce(TraderId(1));
    let message = payout_message("propledger-testnet", TraderId(1), recipient(), first, nonce);
    orchestrator
        .request_payout(TraderId(1), recipient(), first, &proofs_a, &trades, &OperatorSignature::sign(&key, &message))
        .unwrap();
    println!("  Settled against batch {}", first);

    orchestrator.advance_time(120_000);
    let nonce = orchestrator.trader_nonce(TraderId(1));
    let message = payout_message("propledger-testnet", TraderId(1), recipient(), second, nonce);
    let result = orchestrator.request_payout(TraderId(1), recipient(), second, &proofs_b, &trades, &OperatorSignature::sign(&key, &message));
    println!("  Same trades against batch {}: {}\n", second, result.unwrap_err());
}

/// Tier upgrades: eligibility gates and capital allocation.
fn scenario_5_tier_scaling() {
    println!("Scenario 5: Tier Scaling\n");

    let mut orchestrator = new_orchestrator();
    let key = operator_key();

    for (trader, tier) in [(TraderId(1), Tier(1)), (TraderId(2), Tier(1))] {
        let message = registration_message("propledger-testnet", trader, tier, 0);
        orchestrator
            .register_trader(trader, tier, &OperatorSignature::sign(&key, &message))
            .unwrap();
    }

    orchestrator.registry_mut().set_consistency(TraderId(1), dec!(75));
    orchestrator.registry_mut().update_lifetime_pnl(TraderId(1), Quote::new(dec!(12_000))).unwrap();

    let result = orchestrator.authorize_scaling(operator_address(), TraderId(1), Tier(2)).unwrap();
    println!("  Trader 1: {} -> {}, capital delta ${}", result.old_tier, result.new_tier, result.allocated);
    println!("  Status: {:?}", orchestrator.registry().get_trader_info(TraderId(1)).unwrap().status);

    // one breach disqualifies regardless of performance
    orchestrator.registry_mut().set_consistency(TraderId(2), dec!(99));
    orchestrator.registry_mut().update_lifetime_pnl(TraderId(2), Quote::new(dec!(50_000))).unwrap();
    orchestrator.registry_mut().record_breach(TraderId(2)).unwrap();

    let result = orchestrator.authorize_scaling(operator_address(), TraderId(2), Tier(2));
    println!("  Trader 2 (one breach): {}\n", result.unwrap_err());
}

/// Custodian failure after verification re-opens the settlement slots.
fn scenario_6_saga_compensation() {
    println!("Scenario 6: Saga Compensation\n");

    let mut orchestrator = Orchestrator::new(
        CoreConfig::testnet(),
        InMemoryRegistry::with_default_tiers(),
        FailingCustodian::new(Quote::new(dec!(1_000_000))),
        StaticOperatorSet::with_operators([operator_address()]),
    );
    orchestrator.set_time(Timestamp::from_millis(1_000_000));
    let key = operator_key();

    let reg_message = registration_message("propledger-testnet", TraderId(1), Tier(1), 0);
    orchestrator
        .register_trader(TraderId(1), Tier(1), &OperatorSignature::sign(&key, &reg_message))
        .unwrap();

    let trades = sample_trades(1, 500);
    let leaves: Vec<Hash32> = trades.iter().map(|t| t.leaf_hash()).collect();
    let tree = MerkleTree::from_leaves(&leaves);
    let net_pnl: Quote = trades.iter().map(|t| t.pnl).sum();
    let batch_id = orchestrator
        .submit_batch(BatchSubmission {
            batch_hash: sha256(b"saga-batch"),
            merkle_root: tree.root(),
            submitter: operator_address(),
            trade_count: trades.len() as u32,
            total_volume: Quote::new(dec!(200_000)),
            net_pnl,
            metadata: "ipfs://QmSaga".to_string(),
        })
        .unwrap();
    let proofs: Vec<MerkleProof> = (0..trades.len()).map(|i| tree.proof(i).unwrap()).collect();

    let nonce = orchestrator.trader_nonce(TraderId(1));
    let message = payout_message("propledger-testnet", TraderId(1), recipient(), batch_id, nonce);
    let auth = OperatorSignature::sign(&key, &message);
    let result = orchestrator.request_payout(TraderId(1), recipient(), batch_id, &proofs, &trades, &auth);
    println!("  Payment rail down: {}", result.unwrap_err());
    println!("  Trade #{} settled: {:?}", trades[0].trade_id.0, orchestrator.ledger().settled_in(trades[0].trade_id).is_some());
    println!("  Payout requests persisted: {}", orchestrator.payout_request_count());

    // rail recovers; the identical request settles cleanly
    orchestrator.custodian_mut().fail_transfers = false;
    let receipt = orchestrator
        .request_payout(TraderId(1), recipient(), batch_id, &proofs, &trades, &auth)
        .unwrap();
    println!("  After recovery: trader share ${} paid", receipt.trader_share);
}
