// 8.0: every state change produces an event. used for audit trails, state
// reconstruction, and notifying the off-system program backend. the
// EventPayload enum lists all event types.

use crate::types::{Address, BatchId, Quote, RequestId, Tier, Timestamp, TraderId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // ledger events
    BatchSubmitted(BatchSubmittedEvent),

    // payout events
    PayoutExecuted(PayoutExecutedEvent),
    PayoutReversed(PayoutReversedEvent),

    // identity events
    TraderRegistered(TraderRegisteredEvent),
    TierUpgraded(TierUpgradedEvent),
    AccountActivated(AccountActivatedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSubmittedEvent {
    pub batch_id: BatchId,
    pub submitter: Address,
    pub trade_count: u32,
    pub total_volume: Quote,
    pub net_pnl: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutExecutedEvent {
    pub request_id: RequestId,
    pub trader: TraderId,
    pub recipient: Address,
    pub batch_id: BatchId,
    pub gross_pnl: Quote,
    pub trader_share: Quote,
    pub pool_share: Quote,
}

// emitted when a custodian transfer failed after ledger verification and the
// settlement slots were re-opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutReversedEvent {
    pub trader: TraderId,
    pub batch_id: BatchId,
    pub gross_pnl: Quote,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderRegisteredEvent {
    pub trader: TraderId,
    pub tier: Tier,
    pub operator: Address,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierUpgradedEvent {
    pub trader: TraderId,
    pub old_tier: Tier,
    pub new_tier: Tier,
    pub allocation_delta: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountActivatedEvent {
    pub trader: TraderId,
    pub tier: Tier,
    pub allocation: Quote,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
    next_id: u64,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}
