//! Digest, key, and counter types shared across the engine.

use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{ErrorInfo, SdgError};

fn decode_digest(code: &str, raw: &str) -> Result<[u8; 32], SdgError> {
    let bytes = hex::decode(raw).map_err(|err| {
        SdgError::Derivation(
            ErrorInfo::new(code, err.to_string()).with_context("value", raw.to_string()),
        )
    })?;
    bytes.as_slice().try_into().map_err(|_| {
        SdgError::Derivation(
            ErrorInfo::new(code, "digest must be exactly 32 bytes")
                .with_context("len", bytes.len().to_string()),
        )
    })
}

/// 256-bit content digest over all sealed governing inputs for a run.
///
/// Immutable once computed; feeds root-key derivation, so a one-bit change
/// produces an unrelated generated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ManifestFingerprint([u8; 32]);

impl ManifestFingerprint {
    /// Wraps raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses a digest from its lowercase hex representation.
    pub fn from_hex(raw: &str) -> Result<Self, SdgError> {
        decode_digest("fingerprint-parse", raw).map(Self)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Renders the digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ManifestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ManifestFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ManifestFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(|err| D::Error::custom(err.to_string()))
    }
}

/// 256-bit digest over governing coefficient/policy files.
///
/// Travels alongside audit events for provenance; never feeds key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParameterHash([u8; 32]);

impl ParameterHash {
    /// Wraps raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parses a digest from its lowercase hex representation.
    pub fn from_hex(raw: &str) -> Result<Self, SdgError> {
        decode_digest("parameter-hash-parse", raw).map(Self)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Renders the digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ParameterHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ParameterHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ParameterHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(|err| D::Error::custom(err.to_string()))
    }
}

/// 128-bit root key derived once per run from (seed, manifest fingerprint).
///
/// Owned exclusively by the run's engine instance; every substream key is
/// derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootKey([u64; 2]);

impl RootKey {
    /// Wraps the two little-endian key words.
    pub const fn from_words(words: [u64; 2]) -> Self {
        Self(words)
    }

    /// Returns the two key words.
    pub fn words(&self) -> [u64; 2] {
        self.0
    }

    /// Returns the key as 16 little-endian bytes for hashing.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.0[0].to_le_bytes());
        out[8..].copy_from_slice(&self.0[1].to_le_bytes());
        out
    }
}

/// 128-bit key addressing one independent substream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubKey([u64; 2]);

impl SubKey {
    /// Wraps the two little-endian key words.
    pub const fn from_words(words: [u64; 2]) -> Self {
        Self(words)
    }

    /// Returns the two key words.
    pub fn words(&self) -> [u64; 2] {
        self.0
    }

    /// Renders the key as lowercase hex for diagnostics.
    pub fn to_hex(&self) -> String {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&self.0[0].to_le_bytes());
        bytes[8..].copy_from_slice(&self.0[1].to_le_bytes());
        hex::encode(bytes)
    }
}

/// 128-bit monotone counter addressing one block of a substream.
///
/// Counters only advance; the advance past `u128::MAX` is a fatal
/// `counter-overflow` error, never a wrap, because wrapping would revisit
/// already-consumed pseudorandom state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct CounterState {
    /// High 64 bits of the counter.
    pub hi: u64,
    /// Low 64 bits of the counter.
    pub lo: u64,
}

impl CounterState {
    /// The origin counter assigned to every freshly derived substream.
    pub const ZERO: Self = Self { hi: 0, lo: 0 };

    /// Builds a counter from its two words.
    pub const fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    /// Returns the counter as a single 128-bit value.
    pub fn as_u128(&self) -> u128 {
        ((self.hi as u128) << 64) | self.lo as u128
    }

    /// Advances the counter by `blocks`, failing fast on 128-bit overflow.
    pub fn advance(&self, blocks: u64) -> Result<Self, SdgError> {
        let next = self.as_u128().checked_add(blocks as u128).ok_or_else(|| {
            SdgError::Counter(
                ErrorInfo::new("counter-overflow", "counter space exhausted for substream")
                    .with_context("hi", self.hi.to_string())
                    .with_context("lo", self.lo.to_string())
                    .with_context("blocks", blocks.to_string()),
            )
        })?;
        Ok(Self {
            hi: (next >> 64) as u64,
            lo: next as u64,
        })
    }

    /// Number of blocks between `self` and a later counter, if it is later.
    pub fn blocks_until(&self, later: &Self) -> Option<u128> {
        later.as_u128().checked_sub(self.as_u128())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_advance_carries_into_high_word() {
        let counter = CounterState::new(0, u64::MAX);
        let next = counter.advance(1).unwrap();
        assert_eq!(next, CounterState::new(1, 0));
    }

    #[test]
    fn counter_advance_overflow_is_fatal() {
        let counter = CounterState::new(u64::MAX, u64::MAX);
        let err = counter.advance(1).unwrap_err();
        assert_eq!(err.info().code, "counter-overflow");
    }

    #[test]
    fn fingerprint_hex_roundtrip() {
        let fingerprint = ManifestFingerprint::from_bytes([0xab; 32]);
        let parsed = ManifestFingerprint::from_hex(&fingerprint.to_hex()).unwrap();
        assert_eq!(fingerprint, parsed);
    }

    #[test]
    fn fingerprint_rejects_short_digest() {
        let err = ManifestFingerprint::from_hex("abcd").unwrap_err();
        assert_eq!(err.info().code, "fingerprint-parse");
    }
}
