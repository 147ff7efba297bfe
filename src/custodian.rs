// 4.1 custodian.rs: capital custodian collaborator. pooled funds live
// off-core; the orchestrator drives them through the CapitalCustodian trait.
// the in-memory implementation is the bridge used by the sim and tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Address, Quote, Timestamp, TraderId};

#[derive(Debug, Clone, thiserror::Error)]
pub enum CustodianError {
    #[error("Insufficient pool liquidity: available {available}, requested {requested}")]
    InsufficientLiquidity { available: Quote, requested: Quote },

    #[error("Transfer amount must be positive, got {0}")]
    InvalidAmount(Quote),

    #[error("Custodian unavailable: {0}")]
    Unavailable(String),
}

// a completed outbound transfer, kept for the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub trader: TraderId,
    pub recipient: Address,
    pub amount: Quote,
    pub executed_at: Timestamp,
}

// minimum contract the core requires from custody. transfer failure must
// leave the pool untouched; the orchestrator compensates the ledger side.
pub trait CapitalCustodian {
    fn transfer_to_trader(
        &mut self,
        trader: TraderId,
        recipient: Address,
        amount: Quote,
        now: Timestamp,
    ) -> Result<(), CustodianError>;

    fn allocate_to_trader(&mut self, trader: TraderId, amount: Quote)
        -> Result<(), CustodianError>;
}

// 4.1.1: in-memory custodian. tracks pool liquidity, per-trader allocation
// ledger, and every executed transfer.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustodian {
    liquidity: Quote,
    allocations: HashMap<TraderId, Quote>,
    transfers: Vec<TransferRecord>,
    total_transferred: Quote,
}

impl InMemoryCustodian {
    pub fn new(liquidity: Quote) -> Self {
        Self {
            liquidity,
            ..Self::default()
        }
    }

    pub fn liquidity(&self) -> Quote {
        self.liquidity
    }

    pub fn fund(&mut self, amount: Quote) {
        self.liquidity = self.liquidity.add(amount);
    }

    pub fn allocation_of(&self, trader: TraderId) -> Quote {
        self.allocations.get(&trader).copied().unwrap_or(Quote::zero())
    }

    pub fn transfers(&self) -> &[TransferRecord] {
        &self.transfers
    }

    pub fn total_transferred(&self) -> Quote {
        self.total_transferred
    }
}

impl CapitalCustodian for InMemoryCustodian {
    fn transfer_to_trader(
        &mut self,
        trader: TraderId,
        recipient: Address,
        amount: Quote,
        now: Timestamp,
    ) -> Result<(), CustodianError> {
        if !amount.is_positive() {
            return Err(CustodianError::InvalidAmount(amount));
        }
        if amount > self.liquidity {
            return Err(CustodianError::InsufficientLiquidity {
                available: self.liquidity,
                requested: amount,
            });
        }

        self.liquidity = self.liquidity.sub(amount);
        self.total_transferred = self.total_transferred.add(amount);
        self.transfers.push(TransferRecord {
            trader,
            recipient,
            amount,
            executed_at: now,
        });
        Ok(())
    }

    fn allocate_to_trader(
        &mut self,
        trader: TraderId,
        amount: Quote,
    ) -> Result<(), CustodianError> {
        if !amount.is_positive() {
            return Err(CustodianError::InvalidAmount(amount));
        }

        let entry = self.allocations.entry(trader).or_insert(Quote::zero());
        *entry = entry.add(amount);
        Ok(())
    }
}

// 4.1.2: fault-injecting custodian for compensation tests. fails every
// transfer while still accepting allocations.
#[derive(Debug, Clone, Default)]
pub struct FailingCustodian {
    inner: InMemoryCustodian,
    pub fail_transfers: bool,
}

impl FailingCustodian {
    pub fn new(liquidity: Quote) -> Self {
        Self {
            inner: InMemoryCustodian::new(liquidity),
            fail_transfers: true,
        }
    }

    pub fn transfers(&self) -> &[TransferRecord] {
        self.inner.transfers()
    }
}

impl CapitalCustodian for FailingCustodian {
    fn transfer_to_trader(
        &mut self,
        trader: TraderId,
        recipient: Address,
        amount: Quote,
        now: Timestamp,
    ) -> Result<(), CustodianError> {
        if self.fail_transfers {
            return Err(CustodianError::Unavailable("payment rail down".to_string()));
        }
        self.inner.transfer_to_trader(trader, recipient, amount, now)
    }

    fn allocate_to_trader(
        &mut self,
        trader: TraderId,
        amount: Quote,
    ) -> Result<(), CustodianError> {
        self.inner.allocate_to_trader(trader, amount)
    }
}
