//! The shared random register and its feedback mixer.
//!
//! The register is the only state touched by both the entropy path (single
//! writer, one mix per debiased bit) and the serial path (single reader, one
//! byte at a time). Neither side ever waits for the other:
//!
//! ```text
//! tick → sample → Von Neumann → mix_in ──► RandomRegister ◄── byte() ← byte-complete
//! ```
//!
//! The word lives in an [`AtomicU32`], so a reader never sees a half-written
//! word. Two byte reads of the same transfer may still straddle a mix; output
//! only needs to be unpredictable, not a consistent snapshot.

use std::sync::atomic::{AtomicU32, Ordering};

/// Power-on value of the register. Non-zero, fits in [`ACTIVE_BITS`].
pub const SEED: u32 = 0b1_0101_0101_0101_0101_0101_0101;

/// Width of the live feedback-shift state inside the 32-bit word.
pub const ACTIVE_BITS: u32 = 25;

/// Mask selecting the live state.
pub const ACTIVE_MASK: u32 = (1 << ACTIVE_BITS) - 1;

/// Feedback taps XOR-ed with the incoming bit.
pub const TAPS: [u32; 2] = [0, 3];

/// Largest byte count a master may request in one counted transfer.
pub const MAX_REQUEST_BYTES: u8 = 2;

/// Fold one debiased bit into `value`.
///
/// Shifts the register right by one and injects
/// `bit ^ value[0] ^ value[3]` at the top active bit (bit 24).
/// For a fixed `bit` this is a bijection on 25-bit state, so the output is a
/// pure function of the seed and the ordered bit history.
#[inline]
pub fn mix(value: u32, bit: bool) -> u32 {
    let feedback = TAPS
        .iter()
        .fold(bit as u32, |acc, &tap| acc ^ (value >> tap));
    (value >> 1) | ((feedback & 1) << (ACTIVE_BITS - 1))
}

/// Lock-free single-writer / single-reader random register.
#[derive(Debug)]
pub struct RandomRegister {
    value: AtomicU32,
}

impl RandomRegister {
    /// Create a register holding `seed`.
    pub fn new(seed: u32) -> Self {
        Self {
            value: AtomicU32::new(seed),
        }
    }

    /// Current register word.
    pub fn load(&self) -> u32 {
        self.value.load(Ordering::Acquire)
    }

    /// Mix one bit in and return the new word.
    ///
    /// Must only be called from the tick handler. The load/store pair is not
    /// a read-modify-write; with a single writer no update is ever lost.
    pub fn mix_in(&self, bit: bool) -> u32 {
        let next = mix(self.value.load(Ordering::Relaxed), bit);
        self.value.store(next, Ordering::Release);
        next
    }

    /// Byte `index` of the current word, counted from the least significant.
    pub fn byte(&self, index: u8) -> u8 {
        (self.load() >> (8 * u32::from(index))) as u8
    }

    /// Overwrite the word. Only used at bring-up, before interrupts run.
    pub fn reset(&self, seed: u32) {
        self.value.store(seed, Ordering::Release);
    }
}

impl Default for RandomRegister {
    fn default() -> Self {
        Self::new(SEED)
    }
}
