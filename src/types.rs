// 1.0: all the primitives live here. nothing in the ledger works without these types.
// IDs, identities, hashes, money, basis points, timestamps. each is a newtype so the
// compiler catches type mixups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TraderId(pub u64);

// globally unique trade identifier, assigned by the execution subsystem.
// the ledger never lets a settled one be claimed twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

// 1.1: capital tier. higher tier = larger allocation and better split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tier(pub u8);

impl Tier {
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// 1.2: a 32 byte identity. operators are identified by their ed25519 verifying
// key bytes, payout recipients by whatever address the custodian understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Address = Address([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

// 1.3: a 32 byte SHA-256 digest. batch commitments, merkle roots and nodes,
// derived batch ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    pub const ZERO: Hash32 = Hash32([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// batch ids are hash-derived, never sequential. see ledger.rs for the derivation.
pub type BatchId = Hash32;

// 1.4: which way the trade went. only carried as leaf data, the ledger does
// no directional math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    // canonical encoding used in leaf hashing. must match the off-system
    // tree builder byte for byte.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "long",
            Side::Short => "short",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// 1.5: signed quote-currency amount. PnL, volume, fees, payouts all use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote(Decimal);

impl Quote {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    pub fn add(&self, other: Quote) -> Self {
        Self(self.0 + other.0)
    }

    pub fn sub(&self, other: Quote) -> Self {
        Self(self.0 - other.0)
    }

    pub fn mul(&self, factor: Decimal) -> Self {
        Self(self.0 * factor)
    }

    // round toward negative infinity to a whole unit. the payout split uses
    // this so truncation always lands in the pool share.
    pub fn floor(&self) -> Self {
        Self(self.0.floor())
    }
}

impl Default for Quote {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for Quote {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quote {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl Sum for Quote {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.add(q))
    }
}

impl<'a> Sum<&'a Quote> for Quote {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, q| acc.add(*q))
    }
}

// 1.6: basis points. 100 bps = 1%. profit splits are always <= 10000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bps(u32);

impl Bps {
    pub fn new(bps: u32) -> Self {
        Self(bps)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0 as i64, 4)
    }
}

// 1.7: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn quote_floor_rounds_down() {
        assert_eq!(Quote::new(dec!(700.99)).floor().value(), dec!(700));
        assert_eq!(Quote::new(dec!(700)).floor().value(), dec!(700));
        // floor, not truncation: negative amounts round away from zero
        assert_eq!(Quote::new(dec!(-0.5)).floor().value(), dec!(-1));
    }

    #[test]
    fn bps_conversion() {
        assert_eq!(Bps::new(7000).as_fraction(), dec!(0.7));
        assert_eq!(Bps::new(100).as_fraction(), dec!(0.01));
        assert_eq!(Bps::new(10000).as_fraction(), dec!(1));
    }

    #[test]
    fn address_zero_detection() {
        assert!(Address::ZERO.is_zero());

        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        assert!(!Address::new(bytes).is_zero());
    }

    #[test]
    fn hash_hex_display() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0xab;
        let hash = Hash32::new(bytes);
        assert!(hash.to_hex().starts_with("ab00"));
        assert_eq!(hash.to_hex().len(), 64);
    }

    #[test]
    fn tier_ordering() {
        assert!(Tier(3) > Tier(1));
        assert_eq!(Tier(2).to_string(), "T2");
    }

    #[test]
    fn side_canonical_encoding() {
        assert_eq!(Side::Long.as_str(), "long");
        assert_eq!(Side::Short.as_str(), "short");
    }
}
