// 6.0.2: result types and errors for orchestrator operations.

use rust_decimal::Decimal;

use crate::authz::AuthError;
use crate::custodian::CustodianError;
use crate::ledger::LedgerError;
use crate::registry::{RegistryError, TraderStatus};
use crate::types::{Address, BatchId, Quote, RequestId, Tier, Timestamp, TraderId};

#[derive(Debug, Clone)]
pub struct PayoutReceipt {
    pub request_id: RequestId,
    pub trader: TraderId,
    pub recipient: Address,
    pub batch_id: BatchId,
    pub gross_pnl: Quote,
    pub trader_share: Quote,
    pub pool_share: Quote,
    pub executed_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct ScalingResult {
    pub trader: TraderId,
    pub old_tier: Tier,
    pub new_tier: Tier,
    // capital newly allocated by this upgrade (zero when the ladder step
    // does not grow the account)
    pub allocated: Quote,
    pub activated: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Recipient address must be non-zero")]
    ZeroRecipient,

    #[error("No trades supplied")]
    NoTrades,

    #[error("Unknown trader {0:?}")]
    UnknownTrader(TraderId),

    #[error("Trader {0:?} has status {1:?}, payouts need Active or Promoted")]
    TraderNotPayable(TraderId, TraderStatus),

    #[error("Trader {0:?} is suspended")]
    TraderSuspended(TraderId),

    #[error("Payout cooldown for {trader:?} active until {ready_at:?}")]
    CooldownActive {
        trader: TraderId,
        ready_at: Timestamp,
    },

    #[error("Gross PnL {0} is not positive")]
    NonPositivePnl(Quote),

    #[error("Gross PnL {gross} below minimum payout {minimum}")]
    BelowMinimumPayout { gross: Quote, minimum: Quote },

    #[error("Tier {0} is outside the configured range")]
    TierOutOfRange(Tier),

    #[error("Tier {0} has no configuration in the registry")]
    UnknownTierConfig(Tier),

    #[error("New tier {new} must exceed current tier {current}")]
    NotAnUpgrade { current: Tier, new: Tier },

    #[error("Consistency score {score} below tier threshold {threshold}")]
    ConsistencyTooLow { score: Decimal, threshold: Decimal },

    #[error("No performance metrics recorded for trader {0:?}")]
    NoPerformanceData(TraderId),

    #[error("Trader {trader:?} has {count} recorded breaches")]
    BreachesRecorded { trader: TraderId, count: u32 },

    #[error("Lifetime PnL {0} must be positive to scale")]
    NonPositiveLifetimePnl(Quote),

    #[error("Authorization error: {0}")]
    Auth(#[from] AuthError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Custodian error: {0}")]
    Custodian(#[from] CustodianError),
}
