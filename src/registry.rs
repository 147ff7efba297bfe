// 4.0 registry.rs: identity & tier registry collaborator. the orchestrator
// only sees this through the TierRegistry trait; the in-memory implementation
// stands in for the external identity subsystem.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::types::{Bps, Quote, Tier, Timestamp, TraderId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraderStatus {
    Inactive,
    Active,
    // reached by a tier upgrade from Active
    Promoted,
    Suspended,
}

impl TraderStatus {
    pub fn is_payable(&self) -> bool {
        matches!(self, TraderStatus::Active | TraderStatus::Promoted)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderInfo {
    pub trader: TraderId,
    pub status: TraderStatus,
    pub tier: Tier,
    pub breach_count: u32,
    pub lifetime_pnl: Quote,
    pub registered_at: Timestamp,
}

// 4.0.1: one capital tier. allocation sizes the funded account, the split
// decides how verified profit divides between trader and pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierConfig {
    pub capital_allocation: Quote,
    pub profit_split_bps: Bps,
    // minimum consistency score (0-100) required to scale into this tier
    pub consistency_threshold: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub consistency_score: Decimal,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown trader {0:?}")]
    UnknownTrader(TraderId),

    #[error("Unknown tier {0}")]
    UnknownTier(Tier),

    #[error("Trader {0:?} already registered")]
    AlreadyRegistered(TraderId),
}

// minimum contract the core requires from the identity subsystem.
// mutating methods are only ever driven by the orchestrator.
pub trait TierRegistry {
    fn get_trader_info(&self, trader: TraderId) -> Option<TraderInfo>;
    fn get_tier_config(&self, tier: Tier) -> Option<TierConfig>;
    fn get_performance(&self, trader: TraderId) -> Option<PerformanceMetrics>;

    fn register_trader(&mut self, trader: TraderId, tier: Tier, now: Timestamp)
        -> Result<(), RegistryError>;
    fn set_tier(&mut self, trader: TraderId, tier: Tier) -> Result<(), RegistryError>;
    fn activate_account(&mut self, trader: TraderId) -> Result<(), RegistryError>;
    fn update_lifetime_pnl(&mut self, trader: TraderId, delta: Quote) -> Result<(), RegistryError>;
}

// 4.0.2: in-memory reference registry.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    traders: HashMap<TraderId, TraderInfo>,
    tiers: BTreeMap<Tier, TierConfig>,
    metrics: HashMap<TraderId, PerformanceMetrics>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // the standard five-tier program ladder
    pub fn with_default_tiers() -> Self {
        let mut registry = Self::new();
        let table: [(u8, i64, u32, i64); 5] = [
            (1, 25_000, 7000, 50),
            (2, 50_000, 7500, 60),
            (3, 100_000, 8000, 70),
            (4, 200_000, 8500, 80),
            (5, 400_000, 9000, 90),
        ];
        for (tier, allocation, split, threshold) in table {
            registry.set_tier_config(
                Tier(tier),
                TierConfig {
                    capital_allocation: Quote::new(allocation.into()),
                    profit_split_bps: Bps::new(split),
                    consistency_threshold: Decimal::from(threshold),
                },
            );
        }
        registry
    }

    pub fn set_tier_config(&mut self, tier: Tier, config: TierConfig) {
        self.tiers.insert(tier, config);
    }

    pub fn set_consistency(&mut self, trader: TraderId, score: Decimal) {
        self.metrics
            .insert(trader, PerformanceMetrics { consistency_score: score });
    }

    pub fn record_breach(&mut self, trader: TraderId) -> Result<(), RegistryError> {
        let info = self
            .traders
            .get_mut(&trader)
            .ok_or(RegistryError::UnknownTrader(trader))?;
        info.breach_count += 1;
        Ok(())
    }

    pub fn suspend(&mut self, trader: TraderId) -> Result<(), RegistryError> {
        let info = self
            .traders
            .get_mut(&trader)
            .ok_or(RegistryError::UnknownTrader(trader))?;
        info.status = TraderStatus::Suspended;
        Ok(())
    }

    pub fn deactivate(&mut self, trader: TraderId) -> Result<(), RegistryError> {
        let info = self
            .traders
            .get_mut(&trader)
            .ok_or(RegistryError::UnknownTrader(trader))?;
        info.status = TraderStatus::Inactive;
        Ok(())
    }

    pub fn trader_count(&self) -> usize {
        self.traders.len()
    }
}

impl TierRegistry for InMemoryRegistry {
    fn get_trader_info(&self, trader: TraderId) -> Option<TraderInfo> {
        self.traders.get(&trader).cloned()
    }

    fn get_tier_config(&self, tier: Tier) -> Option<TierConfig> {
        self.tiers.get(&tier).cloned()
    }

    fn get_performance(&self, trader: TraderId) -> Option<PerformanceMetrics> {
        self.metrics.get(&trader).cloned()
    }

    fn register_trader(
        &mut self,
        trader: TraderId,
        tier: Tier,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        if self.traders.contains_key(&trader) {
            return Err(RegistryError::AlreadyRegistered(trader));
        }
        if !self.tiers.contains_key(&tier) {
            return Err(RegistryError::UnknownTier(tier));
        }

        self.traders.insert(
            trader,
            TraderInfo {
                trader,
                status: TraderStatus::Active,
                tier,
                breach_count: 0,
                lifetime_pnl: Quote::zero(),
                registered_at: now,
            },
        );
        Ok(())
    }

    fn set_tier(&mut self, trader: TraderId, tier: Tier) -> Result<(), RegistryError> {
        if !self.tiers.contains_key(&tier) {
            return Err(RegistryError::UnknownTier(tier));
        }
        let info = self
            .traders
            .get_mut(&trader)
            .ok_or(RegistryError::UnknownTrader(trader))?;

        info.tier = tier;
        if info.status == TraderStatus::Active {
            info.status = TraderStatus::Promoted;
        }
        Ok(())
    }

    fn activate_account(&mut self, trader: TraderId) -> Result<(), RegistryError> {
        let info = self
            .traders
            .get_mut(&trader)
            .ok_or(RegistryError::UnknownTrader(trader))?;
        info.status = TraderStatus::Active;
        Ok(())
    }

    fn update_lifetime_pnl(&mut self, trader: TraderId, delta: Quote) -> Result<(), RegistryError> {
        let info = self
            .traders
            .get_mut(&trader)
            .ok_or(RegistryError::UnknownTrader(trader))?;
        info.lifetime_pnl = info.lifetime_pnl.add(delta);
        Ok(())
    }
}
