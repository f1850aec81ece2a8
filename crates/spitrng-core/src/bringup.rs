//! One-time device bring-up.
//!
//! Power and pin setup has no ongoing invariants, so it sits behind the
//! [`BringUp`] trait and runs exactly once, before any handler is live. The
//! simulator implementation records and logs each step.

use crate::config::{ClockEdge, DeviceConfig, Prescaler, WireMode};

/// A single configuration action applied at power-on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpStep {
    Watchdog { enabled: bool },
    Adc { powered: bool },
    AnalogComparator { enabled: bool },
    /// Interrupts masked while the rest is configured.
    MaskInterrupts,
    /// Data-Out is the only output pin.
    DataOutDirection,
    ChipSelectPullup { enabled: bool },
    ChipSelectEdgeInterrupt,
    SampleTimer { prescaler: Prescaler, period: u32 },
    SerialInterface { mode: WireMode, edge: ClockEdge },
    UnmaskInterrupts,
}

/// External collaborator that performs the power-on sequence.
pub trait BringUp {
    fn apply(&mut self, config: &DeviceConfig);
}

/// Ordered steps for `config`.
pub fn plan(config: &DeviceConfig) -> Vec<BringUpStep> {
    vec![
        BringUpStep::Watchdog {
            enabled: config.watchdog_enabled,
        },
        BringUpStep::Adc {
            powered: config.adc_powered,
        },
        BringUpStep::AnalogComparator {
            enabled: config.analog_comparator_enabled,
        },
        BringUpStep::MaskInterrupts,
        BringUpStep::DataOutDirection,
        BringUpStep::ChipSelectPullup {
            enabled: config.chip_select_pullup,
        },
        BringUpStep::ChipSelectEdgeInterrupt,
        BringUpStep::SampleTimer {
            prescaler: config.timer_prescaler,
            period: config.timer_period,
        },
        BringUpStep::SerialInterface {
            mode: config.wire_mode,
            edge: config.clock_edge,
        },
        BringUpStep::UnmaskInterrupts,
    ]
}

/// Bring-up for the host simulation: records what would be written.
#[derive(Debug, Default)]
pub struct SimulatedBringUp {
    applied: Vec<BringUpStep>,
    runs: u32,
}

impl SimulatedBringUp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> &[BringUpStep] {
        &self.applied
    }

    /// How many times [`BringUp::apply`] ran.
    pub fn runs(&self) -> u32 {
        self.runs
    }
}

impl BringUp for SimulatedBringUp {
    fn apply(&mut self, config: &DeviceConfig) {
        self.runs += 1;
        for step in plan(config) {
            log::debug!("bring-up: {step:?}");
            self.applied.push(step);
        }
        log::info!(
            "bring-up complete: sampling at {:.1} Hz, {} protocol",
            config.sample_rate_hz(),
            config.protocol
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_masks_before_configuring() {
        let steps = plan(&DeviceConfig::default());
        assert_eq!(steps.first(), Some(&BringUpStep::Watchdog { enabled: false }));
        let mask = steps
            .iter()
            .position(|s| *s == BringUpStep::MaskInterrupts)
            .unwrap();
        let timer = steps
            .iter()
            .position(|s| matches!(s, BringUpStep::SampleTimer { .. }))
            .unwrap();
        assert!(mask < timer);
        assert_eq!(steps.last(), Some(&BringUpStep::UnmaskInterrupts));
    }

    #[test]
    fn test_simulated_records_steps() {
        let mut b = SimulatedBringUp::new();
        let config = DeviceConfig::default();
        b.apply(&config);
        assert_eq!(b.runs(), 1);
        assert_eq!(b.applied(), plan(&config).as_slice());
        assert!(b.applied().contains(&BringUpStep::SampleTimer {
            prescaler: Prescaler::Div4,
            period: 256
        }));
    }
}
