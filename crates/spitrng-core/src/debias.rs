//! Streaming Von Neumann debiasing.
//!
//! Consecutive accepted samples are paired through a one-bit latch:
//!
//! | latch        | sample | result                         | latch after |
//! |--------------|--------|--------------------------------|-------------|
//! | `Empty`      | `b`    | [`Extraction::Latched`]        | `Pending(b)`|
//! | `Pending(p)` | `p`    | [`Extraction::Discarded`]      | `Pending(p)`|
//! | `Pending(p)` | `!p`   | [`Extraction::Bit(p)`]         | `Empty`     |
//!
//! An unequal pair emits the *earlier* bit. An equal pair is thrown away but
//! the newest sample stays pending, so a long run of one level keeps hunting
//! for the first transition instead of re-aligning pairs.

/// One-bit holding register of the debiasing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleLatch {
    /// No candidate waiting for its pair.
    #[default]
    Empty,
    /// A captured level waiting for the next sample.
    Pending(bool),
}

/// Outcome of feeding one raw sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Sample stored as the first half of a pair.
    Latched,
    /// Equal pair; nothing emitted.
    Discarded,
    /// Unequal pair; the debiased bit.
    Bit(bool),
}

/// Von Neumann extractor over a live sample stream.
#[derive(Debug, Clone, Default)]
pub struct VonNeumannFilter {
    latch: SampleLatch,
}

impl VonNeumannFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latch(&self) -> SampleLatch {
        self.latch
    }

    /// Feed one raw sample.
    pub fn push(&mut self, sample: bool) -> Extraction {
        match self.latch {
            SampleLatch::Empty => {
                self.latch = SampleLatch::Pending(sample);
                Extraction::Latched
            }
            SampleLatch::Pending(prev) if prev == sample => {
                self.latch = SampleLatch::Pending(sample);
                Extraction::Discarded
            }
            SampleLatch::Pending(prev) => {
                self.latch = SampleLatch::Empty;
                Extraction::Bit(prev)
            }
        }
    }

    /// Drop any pending sample.
    pub fn clear(&mut self) {
        self.latch = SampleLatch::Empty;
    }
}

/// Run a whole sample sequence through a fresh filter and collect the
/// debiased bits.
pub fn extract(samples: &[bool]) -> Vec<bool> {
    let mut filter = VonNeumannFilter::new();
    samples
        .iter()
        .filter_map(|&s| match filter.push(s) {
            Extraction::Bit(b) => Some(b),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == '1').collect()
    }

    #[test]
    fn test_latch_starts_empty() {
        assert_eq!(VonNeumannFilter::new().latch(), SampleLatch::Empty);
    }

    #[test]
    fn test_transition_table() {
        let mut f = VonNeumannFilter::new();
        assert_eq!(f.push(false), Extraction::Latched);
        assert_eq!(f.latch(), SampleLatch::Pending(false));
        assert_eq!(f.push(false), Extraction::Discarded);
        assert_eq!(f.latch(), SampleLatch::Pending(false));
        assert_eq!(f.push(true), Extraction::Bit(false));
        assert_eq!(f.latch(), SampleLatch::Empty);
        assert_eq!(f.push(true), Extraction::Latched);
        assert_eq!(f.push(false), Extraction::Bit(true));
    }

    #[test]
    fn test_repeated_zeros_then_transitions() {
        // 0 latched, 0 0 discarded, 1 closes the pair (emits 0),
        // 1 latched fresh, 0 closes the pair (emits 1).
        assert_eq!(extract(&bits("000110")), vec![false, true]);
    }

    #[test]
    fn test_equal_samples_never_emit() {
        assert!(extract(&bits("0000000000")).is_empty());
        assert!(extract(&bits("1111111111")).is_empty());
    }

    #[test]
    fn test_alternating_emits_every_other_sample() {
        let out = extract(&bits("10101010"));
        assert_eq!(out, vec![true; 4]);
    }

    #[test]
    fn test_emitted_bits_only_from_unequal_pairs() {
        let samples = bits("0110100111001011000111101");
        let mut f = VonNeumannFilter::new();
        let mut last = None;
        for &s in &samples {
            if let Extraction::Bit(b) = f.push(s) {
                assert_eq!(last, Some(b));
                assert_ne!(b, s);
            }
            last = Some(s);
        }
    }

    #[test]
    fn test_clear_drops_pending() {
        let mut f = VonNeumannFilter::new();
        f.push(true);
        f.clear();
        assert_eq!(f.push(false), Extraction::Latched);
    }
}
