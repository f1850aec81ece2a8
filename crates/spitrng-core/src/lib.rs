//! # spitrng-core
//!
//! **A noise pin, a Von Neumann latch, a 25-bit feedback register and an SPI
//! slave.**
//!
//! `spitrng-core` models a small true-random-number peripheral. A timer tick
//! samples a noisy digital input, pairs of samples are debiased, and each
//! surviving bit is mixed into a shared register. A master device selects the
//! peripheral and clocks bytes of that register out over SPI.
//!
//! ## Quick Start
//!
//! ```
//! use spitrng_core::{BiasedNoise, Device, DeviceConfig, SimulatedBringUp};
//!
//! let mut device = Device::init(
//!     DeviceConfig::default(),
//!     &mut SimulatedBringUp::new(),
//!     BiasedNoise::with_seed(0.6, 1),
//! )
//! .unwrap();
//!
//! for _ in 0..1000 {
//!     device.tick();
//! }
//!
//! // Counted protocol: ask for two bytes, most significant first.
//! let bytes = device.master().request(2);
//! assert_eq!(bytes.len(), 2);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! tick        → NoiseInput → VonNeumannFilter → mix ──► RandomRegister
//! chip-select → SerialSlave (arm / disarm)                    │
//! byte-done   → SerialSlave (load next byte) ◄────────────────┘
//! ```
//!
//! The two paths share only the register, an atomic word. Nothing blocks:
//! [`Device`] drives every handler from one thread for deterministic
//! interleavings, and [`Device::split`] + [`Sampler`] run the entropy path on
//! its own thread.
//!
//! Two wire protocols are served:
//! - **Counted**: a control byte of 1 or 2 requests that many bytes.
//! - **Streaming**: every unit returns the register's current low byte.

pub mod bringup;
pub mod capture;
pub mod collector;
pub mod config;
pub mod debias;
pub mod device;
pub mod error;
pub mod master;
pub mod noise;
pub mod register;
pub mod sampler;
pub mod transport;

pub use bringup::{BringUp, BringUpStep, SimulatedBringUp};
pub use capture::{CaptureConfig, CaptureMeta, CaptureStats, CaptureWriter, read_meta};
pub use collector::{CollectorStats, EntropyCollector, TickOutcome};
pub use config::{ClockEdge, DeviceConfig, Prescaler, WireMode};
pub use debias::{Extraction, SampleLatch, VonNeumannFilter, extract};
pub use device::Device;
pub use error::ConfigError;
pub use master::{FILLER, SpiMaster};
pub use noise::{BiasedNoise, ConstantNoise, NoiseInfo, NoiseInput, ScriptedNoise};
pub use register::{ACTIVE_BITS, MAX_REQUEST_BYTES, RandomRegister, SEED, mix};
pub use sampler::{Sampler, SamplerHandle, SamplerReport};
pub use transport::{
    ByteAction, IDLE_BYTE, Level, LinkState, Protocol, SerialEngine, SerialSlave, SlaveStats,
};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
