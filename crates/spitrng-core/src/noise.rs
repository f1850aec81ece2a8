//! Noise input pin abstraction.
//!
//! The device reads one raw level from a dedicated noise pin per timer tick.
//! Every noise input implements [`NoiseInput`]; the simulator ships a held
//! level, a scripted replay, and a biased pseudo-physical source.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Metadata about a noise input.
#[derive(Debug, Clone)]
pub struct NoiseInfo {
    /// Unique identifier (e.g. `"biased"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
}

/// A digital input sampled once per tick.
pub trait NoiseInput: Send {
    /// Input metadata.
    fn info(&self) -> &NoiseInfo;

    /// Read the current pin level (`true` = high).
    fn sample(&mut self) -> bool;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

impl<T: NoiseInput + ?Sized> NoiseInput for Box<T> {
    fn info(&self) -> &NoiseInfo {
        (**self).info()
    }

    fn sample(&mut self) -> bool {
        (**self).sample()
    }
}

// ---------------------------------------------------------------------------
// Constant level
// ---------------------------------------------------------------------------

static CONSTANT_INFO: NoiseInfo = NoiseInfo {
    name: "constant",
    description: "Pin held at a fixed level; never produces a debiased bit",
};

/// A pin tied high or low.
#[derive(Debug, Clone, Copy)]
pub struct ConstantNoise {
    level: bool,
}

impl ConstantNoise {
    pub fn new(level: bool) -> Self {
        Self { level }
    }
}

impl NoiseInput for ConstantNoise {
    fn info(&self) -> &NoiseInfo {
        &CONSTANT_INFO
    }

    fn sample(&mut self) -> bool {
        self.level
    }
}

// ---------------------------------------------------------------------------
// Scripted replay
// ---------------------------------------------------------------------------

static SCRIPTED_INFO: NoiseInfo = NoiseInfo {
    name: "scripted",
    description: "Replays a fixed level sequence, then holds the last level",
};

/// Replays a recorded level sequence. Once exhausted the last level is held
/// (a pin that stopped toggling); an empty script reads low.
#[derive(Debug, Clone)]
pub struct ScriptedNoise {
    levels: Vec<bool>,
    pos: usize,
}

impl ScriptedNoise {
    pub fn new(levels: impl Into<Vec<bool>>) -> Self {
        Self {
            levels: levels.into(),
            pos: 0,
        }
    }

    /// Parse a script of `0`/`1` characters; anything else is ignored.
    pub fn from_digits(digits: &str) -> Self {
        Self::new(
            digits
                .chars()
                .filter_map(|c| match c {
                    '0' => Some(false),
                    '1' => Some(true),
                    _ => None,
                })
                .collect::<Vec<_>>(),
        )
    }

    /// Levels not yet replayed.
    pub fn remaining(&self) -> usize {
        self.levels.len().saturating_sub(self.pos)
    }
}

impl NoiseInput for ScriptedNoise {
    fn info(&self) -> &NoiseInfo {
        &SCRIPTED_INFO
    }

    fn sample(&mut self) -> bool {
        match self.levels.get(self.pos) {
            Some(&level) => {
                self.pos += 1;
                level
            }
            None => self.levels.last().copied().unwrap_or(false),
        }
    }
}

// ---------------------------------------------------------------------------
// Biased noise
// ---------------------------------------------------------------------------

static BIASED_INFO: NoiseInfo = NoiseInfo {
    name: "biased",
    description: "Independent samples with a configurable probability of reading high",
};

/// Stand-in for a noisy analog node read through a digital input: samples are
/// independent but not fair, which is exactly what the Von Neumann stage fixes.
#[derive(Debug, Clone)]
pub struct BiasedNoise {
    rng: StdRng,
    p_high: f64,
}

impl BiasedNoise {
    /// Seed from the OS CSPRNG.
    pub fn new(p_high: f64) -> Self {
        let mut seed = [0u8; 32];
        // A failing OS CSPRNG leaves the zero seed; the simulation still runs.
        if let Err(e) = getrandom::fill(&mut seed) {
            log::warn!("OS entropy unavailable ({e}); biased noise uses a fixed seed");
        }
        Self {
            rng: StdRng::from_seed(seed),
            p_high: probability(p_high),
        }
    }

    /// Deterministic stream for reproducible runs.
    pub fn with_seed(p_high: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            p_high: probability(p_high),
        }
    }

    pub fn p_high(&self) -> f64 {
        self.p_high
    }
}

fn probability(p: f64) -> f64 {
    if p.is_nan() { 0.5 } else { p.clamp(0.0, 1.0) }
}

impl NoiseInput for BiasedNoise {
    fn info(&self) -> &NoiseInfo {
        &BIASED_INFO
    }

    fn sample(&mut self) -> bool {
        self.rng.random_bool(self.p_high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_holds_level() {
        let mut pin = ConstantNoise::new(true);
        assert!((0..100).all(|_| pin.sample()));
        assert_eq!(pin.name(), "constant");
    }

    #[test]
    fn test_scripted_replays_then_holds_last() {
        let mut pin = ScriptedNoise::from_digits("01 1x0");
        assert_eq!(pin.remaining(), 4);
        let got: Vec<bool> = (0..6).map(|_| pin.sample()).collect();
        assert_eq!(got, vec![false, true, true, false, false, false]);
        assert_eq!(pin.remaining(), 0);
    }

    #[test]
    fn test_scripted_empty_reads_low() {
        let mut pin = ScriptedNoise::new(Vec::<bool>::new());
        assert!(!pin.sample());
    }

    #[test]
    fn test_biased_extremes() {
        let mut high = BiasedNoise::with_seed(1.0, 7);
        let mut low = BiasedNoise::with_seed(0.0, 7);
        assert!((0..100).all(|_| high.sample()));
        assert!((0..100).all(|_| !low.sample()));
    }

    #[test]
    fn test_biased_seed_is_reproducible() {
        let mut a = BiasedNoise::with_seed(0.7, 42);
        let mut b = BiasedNoise::with_seed(0.7, 42);
        for _ in 0..256 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_biased_probability_is_clamped() {
        assert_eq!(BiasedNoise::with_seed(3.0, 1).p_high(), 1.0);
        assert_eq!(BiasedNoise::with_seed(-1.0, 1).p_high(), 0.0);
        assert_eq!(BiasedNoise::with_seed(f64::NAN, 1).p_high(), 0.5);
    }
}
