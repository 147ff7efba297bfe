// 6.1 orchestrator/core.rs: main orchestrator struct. owns the ledger, the
// collaborator capabilities, nonces, executed payout requests, and the event
// stream. every mutating operation runs to completion or not at all.

use std::collections::HashMap;

use super::results::OrchestratorError;
use crate::authz::{NonceStore, PermissionChecker};
use crate::config::CoreConfig;
use crate::custodian::CapitalCustodian;
use crate::events::{BatchSubmittedEvent, Event, EventId, EventPayload};
use crate::ledger::{BatchSubmission, SettlementLedger};
use crate::payout::PayoutRequest;
use crate::registry::TierRegistry;
use crate::types::{BatchId, Quote, RequestId, Timestamp, TraderId};

#[derive(Debug)]
pub struct Orchestrator<R, C, P> {
    pub(super) config: CoreConfig,
    pub(super) ledger: SettlementLedger,
    pub(super) registry: R,
    pub(super) custodian: C,
    pub(super) operators: P,
    pub(super) nonces: NonceStore,
    // executed requests in settlement order; failed attempts never land here
    pub(super) requests: Vec<PayoutRequest>,
    pub(super) request_index: HashMap<RequestId, usize>,
    pub(super) last_payout: HashMap<TraderId, Timestamp>,
    pub(super) total_paid_to_traders: Quote,
    pub(super) total_retained_pool: Quote,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) next_request_id: u64,
    pub(super) current_time: Timestamp,
}

impl<R, C, P> Orchestrator<R, C, P>
where
    R: TierRegistry,
    C: CapitalCustodian,
    P: PermissionChecker,
{
    pub fn new(config: CoreConfig, registry: R, custodian: C, operators: P) -> Self {
        Self {
            config,
            ledger: SettlementLedger::new(),
            registry,
            custodian,
            operators,
            nonces: NonceStore::new(),
            requests: Vec::new(),
            request_index: HashMap::new(),
            last_payout: HashMap::new(),
            total_paid_to_traders: Quote::zero(),
            total_retained_pool: Quote::zero(),
            events: Vec::new(),
            next_event_id: 1,
            next_request_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    // 6.1.1: accept a committed trade batch. the ledger does the checking;
    // the orchestrator injects the operator capability and raises the event.
    pub fn submit_batch(
        &mut self,
        submission: BatchSubmission,
    ) -> Result<BatchId, OrchestratorError> {
        let submitter = submission.submitter;
        let trade_count = submission.trade_count;
        let total_volume = submission.total_volume;
        let net_pnl = submission.net_pnl;

        let batch_id = self
            .ledger
            .submit_batch(submission, &self.operators, self.current_time)?;

        self.emit_event(EventPayload::BatchSubmitted(BatchSubmittedEvent {
            batch_id,
            submitter,
            trade_count,
            total_volume,
            net_pnl,
        }));

        Ok(batch_id)
    }

    pub fn ledger(&self) -> &SettlementLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    // collaborator handles for program-side setup (seeding metrics, funding
    // the pool). core flows never reach around the traits.
    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn custodian(&self) -> &C {
        &self.custodian
    }

    pub fn custodian_mut(&mut self) -> &mut C {
        &mut self.custodian
    }

    pub fn operators_mut(&mut self) -> &mut P {
        &mut self.operators
    }

    pub fn get_payout_request(&self, id: RequestId) -> Option<&PayoutRequest> {
        self.request_index.get(&id).map(|&i| &self.requests[i])
    }

    // single filtering pass over the owned ordered collection
    pub fn payout_requests_for(&self, trader: TraderId) -> Vec<&PayoutRequest> {
        self.requests.iter().filter(|r| r.trader == trader).collect()
    }

    pub fn payout_request_count(&self) -> usize {
        self.requests.len()
    }

    pub fn trader_nonce(&self, trader: TraderId) -> u64 {
        self.nonces.current(trader)
    }

    pub fn last_payout_time(&self, trader: TraderId) -> Option<Timestamp> {
        self.last_payout.get(&trader).copied()
    }

    pub fn total_paid_to_traders(&self) -> Quote {
        self.total_paid_to_traders
    }

    pub fn total_retained_pool(&self) -> Quote {
        self.total_retained_pool
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    pub(super) fn allocate_request_id(&mut self) -> RequestId {
        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}
