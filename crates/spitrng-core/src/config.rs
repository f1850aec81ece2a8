//! Device bring-up configuration.
//!
//! The power-on sequence of the target (watchdog off, ADC and analog
//! comparator powered down, chip-select pull-up, timer prescaler, serial
//! interface mode) is expressed as named fields instead of register bit
//! masks. The config is consumed once by [`Device::init`](crate::Device::init)
//! and by the [`BringUp`](crate::BringUp) collaborator.
//!
//! Configs are JSON files; every field is optional and falls back to the
//! reference hardware values.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::register::{ACTIVE_MASK, SEED};
use crate::transport::Protocol;

/// Timer clock prescaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prescaler {
    Div1,
    Div2,
    Div4,
    Div8,
    Div16,
    Div64,
    Div256,
}

impl Prescaler {
    pub fn divisor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div2 => 2,
            Self::Div4 => 4,
            Self::Div8 => 8,
            Self::Div16 => 16,
            Self::Div64 => 64,
            Self::Div256 => 256,
        }
    }
}

/// Serial interface wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireMode {
    /// Clock, Data-In, Data-Out: SPI.
    ThreeWire,
    /// Shared data line (I²C-style). Not usable for this device.
    TwoWire,
}

/// Clock edge on which Data-In is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockEdge {
    Rising,
    Falling,
}

/// Named bring-up and runtime parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    /// System clock in Hz.
    pub clock_hz: u32,
    /// Prescaler between system clock and sampling timer.
    pub timer_prescaler: Prescaler,
    /// Timer counts per overflow (one sample tick per overflow).
    pub timer_period: u32,
    pub watchdog_enabled: bool,
    pub adc_powered: bool,
    pub analog_comparator_enabled: bool,
    /// Internal pull-up on the chip-select input.
    pub chip_select_pullup: bool,
    pub wire_mode: WireMode,
    pub clock_edge: ClockEdge,
    pub protocol: Protocol,
    /// Power-on register value.
    pub seed: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            clock_hz: 8_000_000,
            timer_prescaler: Prescaler::Div4,
            timer_period: 256,
            watchdog_enabled: false,
            adc_powered: false,
            analog_comparator_enabled: false,
            chip_select_pullup: true,
            wire_mode: WireMode::ThreeWire,
            clock_edge: ClockEdge::Rising,
            protocol: Protocol::Counted,
            seed: SEED,
        }
    }
}

impl DeviceConfig {
    /// Sampling ticks per second.
    pub fn sample_rate_hz(&self) -> f64 {
        f64::from(self.clock_hz)
            / f64::from(self.timer_prescaler.divisor())
            / f64::from(self.timer_period)
    }

    /// Interval between sampling ticks.
    pub fn tick_period(&self) -> Duration {
        let ns = u64::from(self.timer_prescaler.divisor())
            * u64::from(self.timer_period)
            * 1_000_000_000
            / u64::from(self.clock_hz.max(1));
        Duration::from_nanos(ns)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clock_hz == 0 {
            return Err(ConfigError::Invalid("clock_hz must be non-zero"));
        }
        if !(1..=256).contains(&self.timer_period) {
            return Err(ConfigError::Invalid("timer_period must be in 1..=256"));
        }
        if self.watchdog_enabled {
            return Err(ConfigError::Invalid(
                "watchdog must be disabled: nothing services it",
            ));
        }
        if self.wire_mode != WireMode::ThreeWire {
            return Err(ConfigError::Invalid("wire_mode must be three_wire for SPI"));
        }
        if self.seed == 0 {
            return Err(ConfigError::Invalid("seed must be non-zero"));
        }
        if self.seed & !ACTIVE_MASK != 0 {
            return Err(ConfigError::Invalid("seed must fit in 25 bits"));
        }
        if !self.chip_select_pullup {
            log::warn!("chip-select pull-up disabled; a floating CS line may select the device");
        }
        Ok(())
    }

    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
