// 4.2 authz.rs: operator authorization. capability-style permission checks,
// ed25519 instruction signatures, and per-trader nonces for replay protection.
// the operator set itself lives off-system; the core only consumes it through
// the PermissionChecker capability.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::collections::{HashMap, HashSet};

use crate::types::{Address, BatchId, Tier, TraderId};

#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Signer {0} is not an authorized operator")]
    NotOperator(Address),

    #[error("Signature does not verify against the supplied signer key")]
    BadSignature,

    #[error("Signer bytes are not a valid ed25519 verifying key")]
    MalformedKey,
}

// capability injected at every mutating call boundary. never ambient state.
pub trait PermissionChecker {
    fn is_operator(&self, address: Address) -> bool;
}

// reference implementation: a fixed set of operator addresses.
#[derive(Debug, Clone, Default)]
pub struct StaticOperatorSet {
    operators: HashSet<Address>,
}

impl StaticOperatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operators(operators: impl IntoIterator<Item = Address>) -> Self {
        Self {
            operators: operators.into_iter().collect(),
        }
    }

    pub fn add(&mut self, address: Address) {
        self.operators.insert(address);
    }

    pub fn remove(&mut self, address: Address) {
        self.operators.remove(&address);
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

impl PermissionChecker for StaticOperatorSet {
    fn is_operator(&self, address: Address) -> bool {
        self.operators.contains(&address)
    }
}

// 4.3: a signed operator instruction. ed25519 has no signer recovery, so the
// instruction carries the signer's verifying key; identity IS those 32 bytes.
#[derive(Debug, Clone)]
pub struct OperatorSignature {
    pub signer: Address,
    pub signature: [u8; 64],
}

impl OperatorSignature {
    // sign a canonical message with an operator key. operators normally sign
    // off-system; this exists for the sim binary and tests.
    pub fn sign(key: &SigningKey, message: &[u8]) -> Self {
        let signature = key.sign(message);
        Self {
            signer: Address::new(key.verifying_key().to_bytes()),
            signature: signature.to_bytes(),
        }
    }
}

// 4.4: canonical instruction messages. pipe-joined, domain-separated, and
// bound to the trader's current nonce. any byte difference is a different
// message, so a consumed nonce kills every replay.
pub fn payout_message(
    domain: &str,
    trader: TraderId,
    recipient: Address,
    batch: BatchId,
    nonce: u64,
) -> Vec<u8> {
    format!(
        "{}|payout|{}|{}|{}|{}",
        domain, trader.0, recipient, batch, nonce
    )
    .into_bytes()
}

pub fn registration_message(domain: &str, trader: TraderId, tier: Tier, nonce: u64) -> Vec<u8> {
    format!("{}|register|{}|{}|{}", domain, trader.0, tier.value(), nonce).into_bytes()
}

// 4.5: pure verification: message + signature -> signer identity, then the
// capability decides whether that identity may act.
pub fn verify_operator_instruction(
    message: &[u8],
    auth: &OperatorSignature,
    operators: &dyn PermissionChecker,
) -> Result<Address, AuthError> {
    let key =
        VerifyingKey::from_bytes(auth.signer.as_bytes()).map_err(|_| AuthError::MalformedKey)?;
    let signature = Signature::from_bytes(&auth.signature);

    key.verify(message, &signature)
        .map_err(|_| AuthError::BadSignature)?;

    if !operators.is_operator(auth.signer) {
        return Err(AuthError::NotOperator(auth.signer));
    }

    Ok(auth.signer)
}

// 4.6: strictly increasing per-trader counters. an instruction is only valid
// against the current value; consuming bumps it forever.
#[derive(Debug, Clone, Default)]
pub struct NonceStore {
    nonces: HashMap<TraderId, u64>,
}

impl NonceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, trader: TraderId) -> u64 {
        self.nonces.get(&trader).copied().unwrap_or(0)
    }

    pub fn consume(&mut self, trader: TraderId) -> u64 {
        let entry = self.nonces.entry(trader).or_insert(0);
        let consumed = *entry;
        *entry += 1;
        consumed
    }
}
