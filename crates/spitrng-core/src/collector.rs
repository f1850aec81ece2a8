//! Entropy collector: the periodic tick handler.
//!
//! Each tick reads the noise pin once, pushes the level through the Von
//! Neumann filter and, when a pair closes with unequal levels, folds the
//! debiased bit into the shared register. The handler never blocks and never
//! fails; slower ticking only slows accumulation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::debias::{Extraction, SampleLatch, VonNeumannFilter};
use crate::noise::NoiseInput;
use crate::register::RandomRegister;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// First sample of a pair stored.
    Latched,
    /// Equal pair thrown away.
    Discarded,
    /// Debiased bit mixed in; carries the new register word.
    Mixed { bit: bool, register: u32 },
}

/// Running counters for the tick handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorStats {
    pub ticks: u64,
    pub latched: u64,
    pub discarded: u64,
    pub mixed: u64,
}

impl CollectorStats {
    /// Fraction of ticks that produced a mixed bit.
    pub fn yield_ratio(&self) -> f64 {
        if self.ticks == 0 {
            0.0
        } else {
            self.mixed as f64 / self.ticks as f64
        }
    }
}

/// Owner of the sampling side: noise pin, sample latch and the register's
/// write end.
pub struct EntropyCollector<N> {
    input: N,
    filter: VonNeumannFilter,
    register: Arc<RandomRegister>,
    stats: CollectorStats,
}

impl<N: NoiseInput> EntropyCollector<N> {
    pub fn new(input: N, register: Arc<RandomRegister>) -> Self {
        Self {
            input,
            filter: VonNeumannFilter::new(),
            register,
            stats: CollectorStats::default(),
        }
    }

    /// Timer overflow handler.
    pub fn on_tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;
        let level = self.input.sample();
        match self.filter.push(level) {
            Extraction::Latched => {
                self.stats.latched += 1;
                TickOutcome::Latched
            }
            Extraction::Discarded => {
                self.stats.discarded += 1;
                TickOutcome::Discarded
            }
            Extraction::Bit(bit) => {
                let register = self.register.mix_in(bit);
                self.stats.mixed += 1;
                log::trace!("mixed bit {} -> {register:#09x}", bit as u8);
                TickOutcome::Mixed { bit, register }
            }
        }
    }

    /// Run `n` ticks back to back; returns how many mixed a bit.
    pub fn run(&mut self, n: usize) -> usize {
        (0..n)
            .filter(|_| matches!(self.on_tick(), TickOutcome::Mixed { .. }))
            .count()
    }

    pub fn stats(&self) -> CollectorStats {
        self.stats
    }

    pub fn latch(&self) -> SampleLatch {
        self.filter.latch()
    }

    pub fn register(&self) -> &Arc<RandomRegister> {
        &self.register
    }

    pub fn input(&self) -> &N {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut N {
        &mut self.input
    }
}
