// 5.0 payout.rs: payout request records and the tier profit split rule.

use serde::{Deserialize, Serialize};

use crate::types::{Address, BatchId, Bps, Quote, RequestId, Timestamp, TraderId};

// lifecycle of a payout attempt. only Executed is ever observable from the
// outside: a request that fails any precondition is never persisted at all.
// Rejected and Cancelled are retained for audit extensibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Verified,
    Executed,
    Rejected,
    Cancelled,
}

// 5.1: one settled payout. gross figures come from ledger verification, the
// shares from the tier split, and the whole record exists only because the
// custodian transfer went through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: RequestId,
    pub trader: TraderId,
    pub recipient: Address,
    pub batch_id: BatchId,
    pub gross_pnl: Quote,
    pub trader_share: Quote,
    pub pool_share: Quote,
    pub trade_count: u32,
    pub status: PayoutStatus,
    pub requested_at: Timestamp,
    pub executed_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitSplit {
    pub trader_share: Quote,
    pub pool_share: Quote,
}

// 5.2: trader_share = floor(gross * bps / 10000), pool takes the rest.
// truncation always favors the pool; deterministic by construction, and
// trader_share + pool_share == gross exactly.
pub fn compute_split(gross: Quote, split_bps: Bps) -> ProfitSplit {
    let trader_share = gross.mul(split_bps.as_fraction()).floor();
    let pool_share = gross.sub(trader_share);
    ProfitSplit {
        trader_share,
        pool_share,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash32;
    use rust_decimal_macros::dec;

    #[test]
    fn split_example_from_the_program_docs() {
        let split = compute_split(Quote::new(dec!(1000)), Bps::new(7000));
        assert_eq!(split.trader_share.value(), dec!(700));
        assert_eq!(split.pool_share.value(), dec!(300));
    }

    #[test]
    fn truncation_favors_the_pool() {
        // 999 * 0.7 = 699.3, trader gets 699
        let split = compute_split(Quote::new(dec!(999)), Bps::new(7000));
        assert_eq!(split.trader_share.value(), dec!(699));
        assert_eq!(split.pool_share.value(), dec!(300));
    }

    #[test]
    fn shares_always_conserve_gross() {
        for gross in [1, 3, 999, 1000, 12_345, 1_000_001] {
            for bps in [0, 1, 4999, 7000, 9999, 10000] {
                let gross_quote = Quote::new(gross.into());
                let split = compute_split(gross_quote, Bps::new(bps));
                assert_eq!(
                    split.trader_share.add(split.pool_share),
                    gross_quote,
                    "leak at gross={} bps={}",
                    gross,
                    bps
                );
            }
        }
    }

    #[test]
    fn full_split_leaves_nothing_for_the_pool() {
        let split = compute_split(Quote::new(dec!(1234)), Bps::new(10000));
        assert_eq!(split.trader_share.value(), dec!(1234));
        assert!(split.pool_share.is_zero());
    }

    #[test]
    fn request_serde_round_trip() {
        let request = PayoutRequest {
            id: RequestId(1),
            trader: TraderId(7),
            recipient: Address::new([2; 32]),
            batch_id: Hash32::new([3; 32]),
            gross_pnl: Quote::new(dec!(1000)),
            trader_share: Quote::new(dec!(700)),
            pool_share: Quote::new(dec!(300)),
            trade_count: 4,
            status: PayoutStatus::Executed,
            requested_at: Timestamp::from_millis(1_000),
            executed_at: Some(Timestamp::from_millis(1_000)),
        };

        let json = serde_json::to_string(&request).unwrap();
        let back: PayoutRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.status, PayoutStatus::Executed);
        assert_eq!(back.trader_share, request.trader_share);
    }
}
