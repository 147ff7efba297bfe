// 6.2 orchestrator/payout.rs: the payout flow. every step is a hard
// precondition; the only externally observable outcomes are "request never
// existed" and Executed.

use super::core::Orchestrator;
use super::results::{OrchestratorError, PayoutReceipt};
use crate::authz::{payout_message, verify_operator_instruction, OperatorSignature, PermissionChecker};
use crate::custodian::CapitalCustodian;
use crate::events::{EventPayload, PayoutExecutedEvent, PayoutReversedEvent};
use crate::merkle::MerkleProof;
use crate::payout::{compute_split, PayoutRequest, PayoutStatus};
use crate::registry::TierRegistry;
use crate::trade::Trade;
use crate::types::{Address, BatchId, Quote, Tier, Timestamp, TraderId};

impl<R, C, P> Orchestrator<R, C, P>
where
    R: TierRegistry,
    C: CapitalCustodian,
    P: PermissionChecker,
{
    // 6.2.1: settle a trader's verified profit for one batch and pay the
    // trader's share out.
    //
    // the ledger write and the custodian transfer are not joined by a shared
    // transaction, so they run as a saga: once the trades are consumed, any
    // downstream failure re-opens their settlement slots before the error
    // surfaces. nonces are consumed only by fully settled requests, the same
    // observable behavior as a reverting ledger transaction.
    pub fn request_payout(
        &mut self,
        trader: TraderId,
        recipient: Address,
        batch_id: BatchId,
        proofs: &[MerkleProof],
        trades: &[Trade],
        auth: &OperatorSignature,
    ) -> Result<PayoutReceipt, OrchestratorError> {
        // 1: shape checks
        if recipient.is_zero() {
            return Err(OrchestratorError::ZeroRecipient);
        }
        if trades.is_empty() {
            return Err(OrchestratorError::NoTrades);
        }

        // 2: trader must exist and be payable
        let info = self
            .registry
            .get_trader_info(trader)
            .ok_or(OrchestratorError::UnknownTrader(trader))?;
        if !info.status.is_payable() {
            return Err(OrchestratorError::TraderNotPayable(trader, info.status));
        }

        // 3: cooldown
        if let Some(last) = self.last_payout.get(&trader) {
            let ready_at =
                Timestamp::from_millis(last.as_millis() + self.config.payout_cooldown_ms);
            if self.current_time < ready_at {
                return Err(OrchestratorError::CooldownActive { trader, ready_at });
            }
        }

        // 4: operator signature over the canonical message at the current nonce
        let nonce = self.nonces.current(trader);
        let message = payout_message(
            &self.config.signing_domain,
            trader,
            recipient,
            batch_id,
            nonce,
        );
        verify_operator_instruction(&message, auth, &self.operators)?;

        // 5: prove membership and consume the trades
        let gross = self.ledger.verify_and_record_trader_pnl(
            batch_id,
            trader,
            proofs,
            trades,
            self.current_time,
        )?;

        // 6-8 run against consumed trades; compensate on any failure
        match self.settle_verified(trader, recipient, batch_id, info.tier, trades.len() as u32, gross)
        {
            Ok(receipt) => Ok(receipt),
            Err(err) => {
                self.ledger.release_trader_settlement(batch_id, trader, trades);
                if matches!(err, OrchestratorError::Custodian(_)) {
                    self.emit_event(EventPayload::PayoutReversed(PayoutReversedEvent {
                        trader,
                        batch_id,
                        gross_pnl: gross,
                        reason: err.to_string(),
                    }));
                }
                Err(err)
            }
        }
    }

    // steps 6 through 8. caller handles ledger compensation on error.
    fn settle_verified(
        &mut self,
        trader: TraderId,
        recipient: Address,
        batch_id: BatchId,
        tier: Tier,
        trade_count: u32,
        gross: Quote,
    ) -> Result<PayoutReceipt, OrchestratorError> {
        // 6: profitability floor
        if !gross.is_positive() {
            return Err(OrchestratorError::NonPositivePnl(gross));
        }
        if gross < self.config.minimum_payout {
            return Err(OrchestratorError::BelowMinimumPayout {
                gross,
                minimum: self.config.minimum_payout,
            });
        }

        // 7: tier split
        let tier_config = self
            .registry
            .get_tier_config(tier)
            .ok_or(OrchestratorError::UnknownTierConfig(tier))?;
        let split = compute_split(gross, tier_config.profit_split_bps);

        // 8: transfer, then commit. lifetime PnL lands first so the transfer
        // is the last fallible step; a failed transfer unwinds it again.
        self.registry.update_lifetime_pnl(trader, gross)?;

        if let Err(err) =
            self.custodian
                .transfer_to_trader(trader, recipient, split.trader_share, self.current_time)
        {
            let _ = self
                .registry
                .update_lifetime_pnl(trader, Quote::zero().sub(gross));
            return Err(err.into());
        }

        // commit: everything below is in-memory and cannot fail
        self.nonces.consume(trader);

        let request_id = self.allocate_request_id();
        let mut request = PayoutRequest {
            id: request_id,
            trader,
            recipient,
            batch_id,
            gross_pnl: gross,
            trader_share: split.trader_share,
            pool_share: split.pool_share,
            trade_count,
            status: PayoutStatus::Verified,
            requested_at: self.current_time,
            executed_at: None,
        };
        request.status = PayoutStatus::Executed;
        request.executed_at = Some(self.current_time);

        self.request_index.insert(request_id, self.requests.len());
        self.requests.push(request);

        self.last_payout.insert(trader, self.current_time);
        self.total_paid_to_traders = self.total_paid_to_traders.add(split.trader_share);
        self.total_retained_pool = self.total_retained_pool.add(split.pool_share);

        self.emit_event(EventPayload::PayoutExecuted(PayoutExecutedEvent {
            request_id,
            trader,
            recipient,
            batch_id,
            gross_pnl: gross,
            trader_share: split.trader_share,
            pool_share: split.pool_share,
        }));

        Ok(PayoutReceipt {
            request_id,
            trader,
            recipient,
            batch_id,
            gross_pnl: gross,
            trader_share: split.trader_share,
            pool_share: split.pool_share,
            executed_at: self.current_time,
        })
    }
}
