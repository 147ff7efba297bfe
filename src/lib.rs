// propledger: funded-account batch settlement core.
// proof-first architecture: merkle verification and the double-settlement
// guard take priority. all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: TraderId, TradeId, Tier, Address, Hash32, Quote, Bps
//   2.x  merkle.rs: SHA-256 sorted-pair hashing, membership proofs, tree builder
//   2.5  trade.rs: trade leaf tuple + canonical encoding
//   3.x  ledger.rs: append-only batch store, proof verification, settlement index
//   4.x  registry.rs: identity & tier registry collaborator
//   4.1  custodian.rs: capital custodian collaborator
//   4.2  authz.rs: operator capability, instruction signatures, nonces
//   5.x  payout.rs: payout request records + tier profit split
//   6.x  orchestrator/: payout orchestration, registration, tier scaling
//   7.x  config.rs: cooldown, payout floor, signing domain, presets
//   8.x  events.rs: state transition events for audit

// core settlement modules
pub mod ledger;
pub mod merkle;
pub mod trade;
pub mod types;

// collaborator interfaces
pub mod authz;
pub mod custodian;
pub mod registry;

// orchestration modules
pub mod events;
pub mod orchestrator;
pub mod payout;

// configuration
pub mod config;

// re exports for convenience
pub use authz::*;
pub use custodian::*;
pub use events::*;
pub use ledger::*;
pub use merkle::*;
pub use orchestrator::*;
pub use payout::*;
pub use registry::*;
pub use trade::*;
pub use types::*;
pub use config::{ConfigError, CoreConfig};
