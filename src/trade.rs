// 2.5 trade.rs: the leaf content of a settlement batch. one finalized trade,
// already executed and closed off-system. the ledger only ever sees trades
// through merkle proofs, never as a bulk upload.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::merkle::sha256;
use crate::types::{Hash32, Quote, Side, Timestamp, TradeId, TraderId};

// fixed-order field tuple. the canonical encoding below must match the
// off-system tree builder exactly or every proof against the batch fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trader_id: TraderId,
    pub trade_id: TradeId,
    pub symbol: String,
    pub side: Side,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub pnl: Quote,
    pub fee: Quote,
    pub executed_at: Timestamp,
}

impl Trade {
    // canonical wire form: pipe-joined fields in declaration order, decimals
    // normalized so "1.50" and "1.5" encode identically.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.trader_id.0,
            self.trade_id.0,
            self.symbol,
            self.side.as_str(),
            self.size.normalize(),
            self.entry_price.normalize(),
            self.exit_price.normalize(),
            self.pnl.value().normalize(),
            self.fee.value().normalize(),
            self.executed_at.as_millis(),
        )
        .into_bytes()
    }

    pub fn leaf_hash(&self) -> Hash32 {
        sha256(&self.canonical_bytes())
    }
}
