//! Counter-based pseudorandom bijection and the draw scaling contract.
//!
//! The mixing path is integer-only; bit-reproducibility across machines
//! depends on it. Every constant in this module is a protocol constant:
//! changing any of them breaks replay compatibility with every existing
//! audit ledger.

use crate::types::{CounterState, SubKey};

/// Number of mixing rounds. Pinned by the replay protocol.
pub const PHILOX_ROUNDS: usize = 10;

/// Output words produced by one bijection invocation (one block).
pub const WORDS_PER_BLOCK: usize = 2;

/// Philox 2x64 round multiplier.
const PHILOX_M: u64 = 0xD2B7_4407_B1CE_6E93;

/// Weyl increment for the first key word (golden gamma).
const WEYL_HI: u64 = 0x9E37_79B9_7F4A_7C15;

/// Weyl increment for the second key word.
const WEYL_LO: u64 = 0xBB67_AE85_84CA_A73B;

/// Exact value of 2^-64 used by the draw scaling contract.
const UNIT_SCALE: f64 = 1.0 / 18_446_744_073_709_551_616.0;

/// Maps (128-bit key, 128-bit counter) to one pseudorandom output block.
///
/// Ten Philox 2x64-style rounds with a 128-bit key schedule: each round
/// multiplies the high lane by [`PHILOX_M`], folds the carry and both key
/// words back into the lanes, and bumps the key words by distinct Weyl
/// increments. For a fixed key the mapping is a bijection on the 128-bit
/// counter space, so distinct counters never produce identical blocks.
pub fn philox_block(key: &SubKey, counter: CounterState) -> [u64; WORDS_PER_BLOCK] {
    let [mut k0, mut k1] = key.words();
    let mut x0 = counter.hi;
    let mut x1 = counter.lo;
    for _ in 0..PHILOX_ROUNDS {
        let product = (x0 as u128).wrapping_mul(PHILOX_M as u128);
        let hi = (product >> 64) as u64;
        let lo = product as u64;
        x0 = hi ^ k0 ^ x1;
        x1 = lo ^ k1;
        k0 = k0.wrapping_add(WEYL_HI);
        k1 = k1.wrapping_add(WEYL_LO);
    }
    [x0, x1]
}

/// Maps one 64-bit output word into the open unit interval.
///
/// `(word + 0.5) * 2^-64`: the fixed bias and scale are part of the replay
/// contract, so a validator recomputing a draw reproduces it bit-for-bit.
/// For the topmost words the product rounds to 1.0 in f64; those clamp to
/// the largest double below 1.0, also part of the contract.
pub fn uniform_from_word(word: u64) -> f64 {
    let u = (word as f64 + 0.5) * UNIT_SCALE;
    if u < 1.0 {
        u
    } else {
        1.0_f64.next_down()
    }
}
