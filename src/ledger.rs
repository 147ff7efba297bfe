// 3.0 ledger.rs: append-only batch settlement ledger. holds every committed
// batch, verifies trade membership against merkle roots, and owns the global
// settlement index that stops any trade from being paid twice.
//
// mutating calls assume total ordering (one writer at a time); reads never
// block and never mutate.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

use crate::authz::PermissionChecker;
use crate::merkle::{verify_proof, MerkleProof};
use crate::trade::Trade;
use crate::types::{Address, BatchId, Hash32, Quote, Timestamp, TradeId, TraderId};

// 3.1: one settlement submission, immutable once appended. aggregate figures
// are trusted operator inputs; the only content ever verified is individual
// trade membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub batch_hash: Hash32,
    pub merkle_root: Hash32,
    pub submitter: Address,
    pub trade_count: u32,
    pub total_volume: Quote,
    pub net_pnl: Quote,
    // opaque reference to the full trade set, e.g. a content address
    pub metadata: String,
    pub submitted_at: Timestamp,
}

// submission input, before an id exists.
#[derive(Debug, Clone)]
pub struct BatchSubmission {
    pub batch_hash: Hash32,
    pub merkle_root: Hash32,
    pub submitter: Address,
    pub trade_count: u32,
    pub total_volume: Quote,
    pub net_pnl: Quote,
    pub metadata: String,
}

// 3.2: verified per-trader result for one batch. written once, first time the
// trader's trades in that batch pass verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderPnlRecord {
    pub batch_id: BatchId,
    pub trader_id: TraderId,
    pub total_pnl: Quote,
    pub trade_count: u32,
    pub verified: bool,
    pub verified_at: Timestamp,
}

// running totals across every accepted submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalStats {
    pub total_batches: u64,
    pub total_trades: u64,
    pub total_volume: Quote,
    pub cumulative_pnl: Quote,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("Submitter {0} is not an authorized operator")]
    Unauthorized(Address),

    #[error("Batch hash and merkle root must be non-zero")]
    EmptyCommitment,

    #[error("Batch metadata must be non-empty")]
    EmptyMetadata,

    #[error("Batch must contain at least one trade")]
    ZeroTradeCount,

    #[error("Batch id {0} already exists")]
    DuplicateBatch(BatchId),

    #[error("Unknown batch {0}")]
    UnknownBatch(BatchId),

    #[error("No trades supplied")]
    NoTrades,

    #[error("Proof count {proofs} does not match trade count {trades}")]
    LengthMismatch { proofs: usize, trades: usize },

    #[error("Trade {trade:?} belongs to {found:?}, not {expected:?}")]
    ForeignTrade {
        expected: TraderId,
        found: TraderId,
        trade: TradeId,
    },

    #[error("Merkle proof for trade {0:?} does not match the batch root")]
    InvalidProof(TradeId),

    #[error("Trade {trade:?} already settled in batch {batch}")]
    TradeAlreadySettled { trade: TradeId, batch: BatchId },
}

// 3.3: the ledger itself. batches in submission order plus lookup indexes.
#[derive(Debug, Default)]
pub struct SettlementLedger {
    batches: Vec<Batch>,
    by_id: HashMap<BatchId, usize>,
    // trade id -> the batch whose verification consumed it. global, forever.
    settled_trades: HashMap<TradeId, BatchId>,
    pnl_records: HashMap<(BatchId, TraderId), TraderPnlRecord>,
    stats: GlobalStats,
    submission_counter: u64,
}

// batch ids are derived, not assigned: hashing the commitment, root,
// submitter, a monotonic counter, and the submission time makes them unique
// without coordination.
fn derive_batch_id(
    batch_hash: Hash32,
    merkle_root: Hash32,
    submitter: Address,
    counter: u64,
    at: Timestamp,
) -> BatchId {
    let mut hasher = Sha256::new();
    hasher.update(batch_hash.as_bytes());
    hasher.update(merkle_root.as_bytes());
    hasher.update(submitter.as_bytes());
    hasher.update(counter.to_be_bytes());
    hasher.update(at.as_millis().to_be_bytes());

    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash32::new(out)
}

impl SettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // 3.4: append a committed batch. aggregates are not re-derived from trade
    // content here; they are the operator's claim, checked later only trade
    // by trade through proofs.
    pub fn submit_batch(
        &mut self,
        submission: BatchSubmission,
        operators: &dyn PermissionChecker,
        now: Timestamp,
    ) -> Result<BatchId, LedgerError> {
        if !operators.is_operator(submission.submitter) {
            return Err(LedgerError::Unauthorized(submission.submitter));
        }
        if submission.batch_hash.is_zero() || submission.merkle_root.is_zero() {
            return Err(LedgerError::EmptyCommitment);
        }
        if submission.metadata.is_empty() {
            return Err(LedgerError::EmptyMetadata);
        }
        if submission.trade_count == 0 {
            return Err(LedgerError::ZeroTradeCount);
        }

        let id = derive_batch_id(
            submission.batch_hash,
            submission.merkle_root,
            submission.submitter,
            self.submission_counter,
            now,
        );

        // unreachable with the counter in the preimage, kept as a safety check
        if self.by_id.contains_key(&id) {
            return Err(LedgerError::DuplicateBatch(id));
        }

        let batch = Batch {
            id,
            batch_hash: submission.batch_hash,
            merkle_root: submission.merkle_root,
            submitter: submission.submitter,
            trade_count: submission.trade_count,
            total_volume: submission.total_volume,
            net_pnl: submission.net_pnl,
            metadata: submission.metadata,
            submitted_at: now,
        };

        self.submission_counter += 1;
        self.by_id.insert(id, self.batches.len());
        self.batches.push(batch);

        self.stats.total_batches += 1;
        self.stats.total_trades += submission.trade_count as u64;
        self.stats.total_volume = self.stats.total_volume.add(submission.total_volume);
        self.stats.cumulative_pnl = self.stats.cumulative_pnl.add(submission.net_pnl);

        Ok(id)
    }

    // 3.5: stateless membership spot check for auditors and third parties.
    // (false, 0) on unknown batch or mismatched proof; never mutates.
    pub fn verify_trade(&self, batch_id: BatchId, proof: &MerkleProof, trade: &Trade) -> (bool, Quote) {
        let Some(batch) = self.get_batch(batch_id) else {
            return (false, Quote::zero());
        };

        if verify_proof(trade.leaf_hash(), proof, batch.merkle_root) {
            (true, trade.pnl)
        } else {
            (false, Quote::zero())
        }
    }

    // 3.6: verify a trader's trades against a batch and consume them.
    // orchestrator-only (pub(crate)); a successful return permanently claims
    // every supplied trade id, so the caller must pair this with the payout
    // transfer or roll it back via release_trader_settlement.
    //
    // all-or-nothing: the validation pass runs to completion before any state
    // is touched, so a failing proof or an already-settled trade leaves the
    // ledger exactly as it was.
    pub(crate) fn verify_and_record_trader_pnl(
        &mut self,
        batch_id: BatchId,
        trader_id: TraderId,
        proofs: &[MerkleProof],
        trades: &[Trade],
        now: Timestamp,
    ) -> Result<Quote, LedgerError> {
        if trades.is_empty() || proofs.is_empty() {
            return Err(LedgerError::NoTrades);
        }
        if proofs.len() != trades.len() {
            return Err(LedgerError::LengthMismatch {
                proofs: proofs.len(),
                trades: trades.len(),
            });
        }

        let merkle_root = self
            .get_batch(batch_id)
            .ok_or(LedgerError::UnknownBatch(batch_id))?
            .merkle_root;

        // validation pass
        let mut seen = HashSet::with_capacity(trades.len());
        for (proof, trade) in proofs.iter().zip(trades) {
            if trade.trader_id != trader_id {
                return Err(LedgerError::ForeignTrade {
                    expected: trader_id,
                    found: trade.trader_id,
                    trade: trade.trade_id,
                });
            }
            if !verify_proof(trade.leaf_hash(), proof, merkle_root) {
                return Err(LedgerError::InvalidProof(trade.trade_id));
            }
            if let Some(batch) = self.settled_trades.get(&trade.trade_id) {
                return Err(LedgerError::TradeAlreadySettled {
                    trade: trade.trade_id,
                    batch: *batch,
                });
            }
            if !seen.insert(trade.trade_id) {
                return Err(LedgerError::TradeAlreadySettled {
                    trade: trade.trade_id,
                    batch: batch_id,
                });
            }
        }

        // commit pass
        let mut total_pnl = Quote::zero();
        for trade in trades {
            self.settled_trades.insert(trade.trade_id, batch_id);
            total_pnl = total_pnl.add(trade.pnl);
        }

        self.pnl_records.insert(
            (batch_id, trader_id),
            TraderPnlRecord {
                batch_id,
                trader_id,
                total_pnl,
                trade_count: trades.len() as u32,
                verified: true,
                verified_at: now,
            },
        );

        Ok(total_pnl)
    }

    // 3.7: saga compensation. re-opens the settlement slots claimed by a
    // verification whose payout transfer failed, as if the call never
    // happened. orchestrator-only.
    pub(crate) fn release_trader_settlement(
        &mut self,
        batch_id: BatchId,
        trader_id: TraderId,
        trades: &[Trade],
    ) {
        for trade in trades {
            if self.settled_trades.get(&trade.trade_id) == Some(&batch_id) {
                self.settled_trades.remove(&trade.trade_id);
            }
        }
        self.pnl_records.remove(&(batch_id, trader_id));
    }

    pub fn get_batch(&self, id: BatchId) -> Option<&Batch> {
        self.by_id.get(&id).map(|&i| &self.batches[i])
    }

    pub fn get_trader_pnl(&self, batch_id: BatchId, trader_id: TraderId) -> Option<&TraderPnlRecord> {
        self.pnl_records.get(&(batch_id, trader_id))
    }

    pub fn global_stats(&self) -> &GlobalStats {
        &self.stats
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    // single filtering pass over the owned ordered collection
    pub fn batches_by_submitter(&self, submitter: Address) -> Vec<&Batch> {
        self.batches
            .iter()
            .filter(|b| b.submitter == submitter)
            .collect()
    }

    pub fn settled_in(&self, trade: TradeId) -> Option<BatchId> {
        self.settled_trades.get(&trade).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::StaticOperatorSet;
    use crate::merkle::MerkleTree;
    use crate::types::Side;
    use rust_decimal_macros::dec;

    fn operator() -> Address {
        Address::new([7; 32])
    }

    fn operators() -> StaticOperatorSet {
        StaticOperatorSet::with_operators([operator()])
    }

    fn trade(trader: u64, id: u64, pnl: i64) -> Trade {
        Trade {
            trader_id: TraderId(trader),
            trade_id: TradeId(id),
            symbol: "BTC-PERP".to_string(),
            side: Side::Long,
            size: dec!(1),
            entry_price: dec!(50000),
            exit_price: dec!(51000),
            pnl: Quote::new(pnl.into()),
            fee: Quote::new(dec!(10)),
            executed_at: Timestamp::from_millis(1_000),
        }
    }

    fn committed_batch(
        ledger: &mut SettlementLedger,
        trades: &[Trade],
    ) -> (BatchId, MerkleTree) {
        let leaves: Vec<_> = trades.iter().map(|t| t.leaf_hash()).collect();
        let tree = MerkleTree::from_leaves(&leaves);
        let net_pnl: Quote = trades.iter().map(|t| t.pnl).sum();

        let id = ledger
            .submit_batch(
                BatchSubmission {
                    batch_hash: crate::merkle::sha256(b"batch"),
                    merkle_root: tree.root(),
                    submitter: operator(),
                    trade_count: trades.len() as u32,
                    total_volume: Quote::new(dec!(100000)),
                    net_pnl,
                    metadata: "ipfs://QmBatch".to_string(),
                },
                &operators(),
                Timestamp::from_millis(10_000),
            )
            .unwrap();

        (id, tree)
    }

    #[test]
    fn submit_updates_stats_and_stores_fields() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 5000), trade(1, 2, -1000), trade(2, 3, 1000)];
        let (id, tree) = committed_batch(&mut ledger, &trades);

        let batch = ledger.get_batch(id).unwrap();
        assert_eq!(batch.trade_count, 3);
        assert_eq!(batch.merkle_root, tree.root());
        assert_eq!(batch.net_pnl.value(), dec!(5000));

        let stats = ledger.global_stats();
        assert_eq!(stats.total_batches, 1);
        assert_eq!(stats.total_trades, 3);
        assert_eq!(stats.cumulative_pnl.value(), dec!(5000));
    }

    #[test]
    fn submit_rejects_non_operator() {
        let mut ledger = SettlementLedger::new();
        let result = ledger.submit_batch(
            BatchSubmission {
                batch_hash: crate::merkle::sha256(b"x"),
                merkle_root: crate::merkle::sha256(b"y"),
                submitter: Address::new([9; 32]),
                trade_count: 1,
                total_volume: Quote::zero(),
                net_pnl: Quote::zero(),
                metadata: "m".to_string(),
            },
            &operators(),
            Timestamp::from_millis(0),
        );
        assert!(matches!(result, Err(LedgerError::Unauthorized(_))));
    }

    #[test]
    fn submit_rejects_empty_inputs() {
        let mut ledger = SettlementLedger::new();
        let ops = operators();

        let base = BatchSubmission {
            batch_hash: crate::merkle::sha256(b"x"),
            merkle_root: crate::merkle::sha256(b"y"),
            submitter: operator(),
            trade_count: 1,
            total_volume: Quote::zero(),
            net_pnl: Quote::zero(),
            metadata: "m".to_string(),
        };

        let mut zero_root = base.clone();
        zero_root.merkle_root = Hash32::ZERO;
        assert!(matches!(
            ledger.submit_batch(zero_root, &ops, Timestamp::from_millis(0)),
            Err(LedgerError::EmptyCommitment)
        ));

        let mut no_meta = base.clone();
        no_meta.metadata = String::new();
        assert!(matches!(
            ledger.submit_batch(no_meta, &ops, Timestamp::from_millis(0)),
            Err(LedgerError::EmptyMetadata)
        ));

        let mut no_trades = base;
        no_trades.trade_count = 0;
        assert!(matches!(
            ledger.submit_batch(no_trades, &ops, Timestamp::from_millis(0)),
            Err(LedgerError::ZeroTradeCount)
        ));
    }

    #[test]
    fn batch_ids_are_unique_across_identical_submissions() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 100)];
        let (a, _) = committed_batch(&mut ledger, &trades);
        let (b, _) = committed_batch(&mut ledger, &trades);
        // same content, same timestamp: the counter still separates the ids
        assert_ne!(a, b);
        assert_eq!(ledger.batch_count(), 2);
    }

    #[test]
    fn verify_trade_spot_check() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 500), trade(1, 2, 300), trade(2, 3, -100), trade(2, 4, 50)];
        let (id, tree) = committed_batch(&mut ledger, &trades);

        let proof = tree.proof(2).unwrap();
        let (valid, pnl) = ledger.verify_trade(id, &proof, &trades[2]);
        assert!(valid);
        assert_eq!(pnl.value(), dec!(-100));

        // off-by-one pnl corruption
        let mut corrupted = trades[2].clone();
        corrupted.pnl = Quote::new(dec!(-99));
        let (valid, pnl) = ledger.verify_trade(id, &proof, &corrupted);
        assert!(!valid);
        assert!(pnl.is_zero());

        // unknown batch
        let (valid, _) = ledger.verify_trade(Hash32::ZERO, &proof, &trades[2]);
        assert!(!valid);
    }

    #[test]
    fn verify_and_record_accumulates_and_consumes() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 500), trade(1, 2, 300), trade(2, 3, 100)];
        let (id, tree) = committed_batch(&mut ledger, &trades);

        let proofs = [tree.proof(0).unwrap(), tree.proof(1).unwrap()];
        let total = ledger
            .verify_and_record_trader_pnl(
                id,
                TraderId(1),
                &proofs,
                &trades[..2],
                Timestamp::from_millis(20_000),
            )
            .unwrap();

        assert_eq!(total.value(), dec!(800));
        assert_eq!(ledger.settled_in(TradeId(1)), Some(id));
        assert_eq!(ledger.settled_in(TradeId(2)), Some(id));
        assert_eq!(ledger.settled_in(TradeId(3)), None);

        let record = ledger.get_trader_pnl(id, TraderId(1)).unwrap();
        assert!(record.verified);
        assert_eq!(record.trade_count, 2);
        assert_eq!(record.total_pnl.value(), dec!(800));
    }

    #[test]
    fn one_bad_proof_fails_whole_call_with_no_mutation() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 500), trade(1, 2, 300)];
        let (id, tree) = committed_batch(&mut ledger, &trades);

        // proof for the wrong leaf
        let proofs = [tree.proof(0).unwrap(), tree.proof(0).unwrap()];
        let result = ledger.verify_and_record_trader_pnl(
            id,
            TraderId(1),
            &proofs,
            &trades,
            Timestamp::from_millis(0),
        );
        assert!(matches!(result, Err(LedgerError::InvalidProof(TradeId(2)))));

        // nothing settled, no record written
        assert_eq!(ledger.settled_in(TradeId(1)), None);
        assert!(ledger.get_trader_pnl(id, TraderId(1)).is_none());
    }

    #[test]
    fn double_settlement_rejected_across_batches() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 500)];
        let (first, tree_a) = committed_batch(&mut ledger, &trades);
        let (second, tree_b) = committed_batch(&mut ledger, &trades);

        ledger
            .verify_and_record_trader_pnl(
                first,
                TraderId(1),
                &[tree_a.proof(0).unwrap()],
                &trades,
                Timestamp::from_millis(0),
            )
            .unwrap();

        let result = ledger.verify_and_record_trader_pnl(
            second,
            TraderId(1),
            &[tree_b.proof(0).unwrap()],
            &trades,
            Timestamp::from_millis(0),
        );
        assert!(matches!(
            result,
            Err(LedgerError::TradeAlreadySettled { trade: TradeId(1), batch }) if batch == first
        ));
    }

    #[test]
    fn duplicate_trade_within_request_rejected() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 500), trade(1, 2, 300)];
        let (id, tree) = committed_batch(&mut ledger, &trades);

        let doubled = [trades[0].clone(), trades[0].clone()];
        let proofs = [tree.proof(0).unwrap(), tree.proof(0).unwrap()];
        let result = ledger.verify_and_record_trader_pnl(
            id,
            TraderId(1),
            &proofs,
            &doubled,
            Timestamp::from_millis(0),
        );
        assert!(matches!(result, Err(LedgerError::TradeAlreadySettled { .. })));
        assert_eq!(ledger.settled_in(TradeId(1)), None);
    }

    #[test]
    fn foreign_trade_rejected() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 500), trade(2, 2, 300)];
        let (id, tree) = committed_batch(&mut ledger, &trades);

        let proofs = [tree.proof(0).unwrap(), tree.proof(1).unwrap()];
        let result = ledger.verify_and_record_trader_pnl(
            id,
            TraderId(1),
            &proofs,
            &trades,
            Timestamp::from_millis(0),
        );
        assert!(matches!(result, Err(LedgerError::ForeignTrade { .. })));
    }

    #[test]
    fn release_reopens_settlement_slots() {
        let mut ledger = SettlementLedger::new();
        let trades = [trade(1, 1, 500), trade(1, 2, 300)];
        let (id, tree) = committed_batch(&mut ledger, &trades);
        let proofs = [tree.proof(0).unwrap(), tree.proof(1).unwrap()];

        ledger
            .verify_and_record_trader_pnl(id, TraderId(1), &proofs, &trades, Timestamp::from_millis(0))
            .unwrap();
        ledger.release_trader_settlement(id, TraderId(1), &trades);

        assert_eq!(ledger.settled_in(TradeId(1)), None);
        assert!(ledger.get_trader_pnl(id, TraderId(1)).is_none());

        // and the trades settle cleanly again afterwards
        let total = ledger
            .verify_and_record_trader_pnl(id, TraderId(1), &proofs, &trades, Timestamp::from_millis(0))
            .unwrap();
        assert_eq!(total.value(), dec!(800));
    }

    #[test]
    fn batches_by_submitter_filters() {
        let mut ledger = SettlementLedger::new();
        let mut ops = StaticOperatorSet::with_operators([operator()]);
        let other = Address::new([8; 32]);
        ops.add(other);

        for (submitter, n) in [(operator(), 2), (other, 1)] {
            for i in 0..n {
                ledger
                    .submit_batch(
                        BatchSubmission {
                            batch_hash: crate::merkle::sha256(&[submitter.as_bytes()[0], i]),
                            merkle_root: crate::merkle::sha256(b"root"),
                            submitter,
                            trade_count: 1,
                            total_volume: Quote::zero(),
                            net_pnl: Quote::zero(),
                            metadata: "m".to_string(),
                        },
                        &ops,
                        Timestamp::from_millis(0),
                    )
                    .unwrap();
            }
        }

        assert_eq!(ledger.batches_by_submitter(operator()).len(), 2);
        assert_eq!(ledger.batches_by_submitter(other).len(), 1);
        assert_eq!(ledger.batches_by_submitter(Address::ZERO).len(), 0);
    }
}
