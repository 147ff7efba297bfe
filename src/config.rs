// 7.0 config.rs: all settings in one place. cooldowns, payout floor, signing
// domain, tier range, event retention.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Quote, Tier};

// complete configuration for the settlement core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    // minimum elapsed time between two successful payouts for one trader
    pub payout_cooldown_ms: i64,
    // smallest gross PnL a payout request may settle
    pub minimum_payout: Quote,
    // system/chain identity bound into every signed operator instruction
    pub signing_domain: String,
    // inclusive tier range the program operates
    pub min_tier: Tier,
    pub max_tier: Tier,
    // event buffer cap; oldest events are dropped past this
    pub max_events: usize,
    // print events as they are emitted
    pub verbose: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            payout_cooldown_ms: 24 * 60 * 60 * 1000, // daily
            minimum_payout: Quote::new(dec!(100)),
            signing_domain: "propledger-mainnet".to_string(),
            min_tier: Tier(1),
            max_tier: Tier(5),
            max_events: 10_000,
            verbose: false,
        }
    }
}

impl CoreConfig {
    // short cooldowns and a token payout floor for integration environments
    pub fn testnet() -> Self {
        Self {
            payout_cooldown_ms: 60 * 1000,
            minimum_payout: Quote::new(dec!(1)),
            signing_domain: "propledger-testnet".to_string(),
            ..Self::default()
        }
    }

    // weekly payouts with a higher floor
    pub fn conservative() -> Self {
        Self {
            payout_cooldown_ms: 7 * 24 * 60 * 60 * 1000,
            minimum_payout: Quote::new(dec!(500)),
            ..Self::default()
        }
    }

    // validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.payout_cooldown_ms < 0 {
            return Err(ConfigError::InvalidCooldown {
                reason: "Cooldown cannot be negative".to_string(),
            });
        }

        if !self.minimum_payout.is_positive() {
            return Err(ConfigError::InvalidPayoutFloor {
                reason: "Minimum payout must be positive".to_string(),
            });
        }

        if self.min_tier.value() == 0 || self.min_tier > self.max_tier {
            return Err(ConfigError::InvalidTierRange {
                reason: "Tiers start at 1 and min must not exceed max".to_string(),
            });
        }

        if self.signing_domain.is_empty() {
            return Err(ConfigError::InvalidDomain {
                reason: "Signing domain must be non-empty".to_string(),
            });
        }

        if self.max_events == 0 {
            return Err(ConfigError::InvalidEventCap {
                reason: "Event buffer needs room for at least one event".to_string(),
            });
        }

        Ok(())
    }

    pub fn tier_in_range(&self, tier: Tier) -> bool {
        tier >= self.min_tier && tier <= self.max_tier
    }
}

// configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidCooldown { reason: String },
    InvalidPayoutFloor { reason: String },
    InvalidTierRange { reason: String },
    InvalidDomain { reason: String },
    InvalidEventCap { reason: String },
}
