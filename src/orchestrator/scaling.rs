// 6.3 orchestrator/scaling.rs: identity-side operations. operator-signed
// trader registration and the tier upgrade flow. all checks read
// registry-reported values; nothing is recomputed here.

use super::core::Orchestrator;
use super::results::{OrchestratorError, ScalingResult};
use crate::authz::{registration_message, verify_operator_instruction, OperatorSignature, PermissionChecker};
use crate::custodian::CapitalCustodian;
use crate::events::{AccountActivatedEvent, EventPayload, TierUpgradedEvent, TraderRegisteredEvent};
use crate::registry::{TierRegistry, TraderStatus};
use crate::types::{Address, Quote, Tier, TraderId};

impl<R, C, P> Orchestrator<R, C, P>
where
    R: TierRegistry,
    C: CapitalCustodian,
    P: PermissionChecker,
{
    // 6.3.1: bring a trader into the program. the instruction is signed by an
    // operator over the trader's current nonce, so a captured registration
    // message cannot be replayed.
    pub fn register_trader(
        &mut self,
        trader: TraderId,
        tier: Tier,
        auth: &OperatorSignature,
    ) -> Result<(), OrchestratorError> {
        if !self.config.tier_in_range(tier) {
            return Err(OrchestratorError::TierOutOfRange(tier));
        }

        let nonce = self.nonces.current(trader);
        let message = registration_message(&self.config.signing_domain, trader, tier, nonce);
        let operator = verify_operator_instruction(&message, auth, &self.operators)?;

        let tier_config = self
            .registry
            .get_tier_config(tier)
            .ok_or(OrchestratorError::UnknownTierConfig(tier))?;

        self.registry.register_trader(trader, tier, self.current_time)?;
        self.nonces.consume(trader);
        self.custodian
            .allocate_to_trader(trader, tier_config.capital_allocation)?;

        self.emit_event(EventPayload::TraderRegistered(TraderRegisteredEvent {
            trader,
            tier,
            operator,
        }));

        Ok(())
    }

    // 6.3.2: move a trader up the capital ladder. operator-gated; every
    // eligibility figure comes from the registry at call time.
    pub fn authorize_scaling(
        &mut self,
        operator: Address,
        trader: TraderId,
        new_tier: Tier,
    ) -> Result<ScalingResult, OrchestratorError> {
        if !self.operators.is_operator(operator) {
            return Err(crate::authz::AuthError::NotOperator(operator).into());
        }

        let info = self
            .registry
            .get_trader_info(trader)
            .ok_or(OrchestratorError::UnknownTrader(trader))?;
        if info.status == TraderStatus::Suspended {
            return Err(OrchestratorError::TraderSuspended(trader));
        }

        if !self.config.tier_in_range(new_tier) {
            return Err(OrchestratorError::TierOutOfRange(new_tier));
        }
        if new_tier <= info.tier {
            return Err(OrchestratorError::NotAnUpgrade {
                current: info.tier,
                new: new_tier,
            });
        }

        let new_config = self
            .registry
            .get_tier_config(new_tier)
            .ok_or(OrchestratorError::UnknownTierConfig(new_tier))?;
        let old_config = self
            .registry
            .get_tier_config(info.tier)
            .ok_or(OrchestratorError::UnknownTierConfig(info.tier))?;

        let metrics = self
            .registry
            .get_performance(trader)
            .ok_or(OrchestratorError::NoPerformanceData(trader))?;
        if metrics.consistency_score < new_config.consistency_threshold {
            return Err(OrchestratorError::ConsistencyTooLow {
                score: metrics.consistency_score,
                threshold: new_config.consistency_threshold,
            });
        }

        if info.breach_count > 0 {
            return Err(OrchestratorError::BreachesRecorded {
                trader,
                count: info.breach_count,
            });
        }
        if !info.lifetime_pnl.is_positive() {
            return Err(OrchestratorError::NonPositiveLifetimePnl(info.lifetime_pnl));
        }

        let was_inactive = info.status == TraderStatus::Inactive;

        // flips Active to Promoted in the registry
        self.registry.set_tier(trader, new_tier)?;

        let allocated = if was_inactive {
            // dormant account coming back: activate and fund the full tier
            self.registry.activate_account(trader)?;
            self.custodian
                .allocate_to_trader(trader, new_config.capital_allocation)?;

            self.emit_event(EventPayload::AccountActivated(AccountActivatedEvent {
                trader,
                tier: new_tier,
                allocation: new_config.capital_allocation,
            }));

            new_config.capital_allocation
        } else if new_config.capital_allocation > old_config.capital_allocation {
            let delta = new_config
                .capital_allocation
                .sub(old_config.capital_allocation);
            self.custodian.allocate_to_trader(trader, delta)?;
            delta
        } else {
            Quote::zero()
        };

        self.emit_event(EventPayload::TierUpgraded(TierUpgradedEvent {
            trader,
            old_tier: info.tier,
            new_tier,
            allocation_delta: allocated,
        }));

        Ok(ScalingResult {
            trader,
            old_tier: info.tier,
            new_tier,
            allocated,
            activated: was_inactive,
        })
    }
}
