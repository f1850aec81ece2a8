//! Device wiring: register, tick handler and serial slave built from a
//! validated [`DeviceConfig`].
//!
//! [`Device`] drives all three handlers from the caller's thread, which makes
//! every interleaving reproducible. [`Device::split`] hands the two halves to
//! separate threads for a concurrent run.

use std::sync::Arc;

use crate::bringup::BringUp;
use crate::collector::{EntropyCollector, TickOutcome};
use crate::config::DeviceConfig;
use crate::error::ConfigError;
use crate::master::SpiMaster;
use crate::noise::NoiseInput;
use crate::register::RandomRegister;
use crate::transport::{Level, LinkState, SerialSlave};

pub struct Device<N> {
    config: DeviceConfig,
    collector: EntropyCollector<N>,
    slave: Arc<SerialSlave>,
}

impl<N: NoiseInput> Device<N> {
    /// Validate `config`, run bring-up once, seed the register and build
    /// both handlers. Handlers are live when this returns.
    pub fn init<B: BringUp + ?Sized>(
        config: DeviceConfig,
        bringup: &mut B,
        noise: N,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        bringup.apply(&config);

        let register = Arc::new(RandomRegister::new(config.seed));
        let collector = EntropyCollector::new(noise, Arc::clone(&register));
        let slave = Arc::new(SerialSlave::new(config.protocol, register));
        log::info!(
            "device ready: noise input '{}', seed {:#09x}",
            collector.input().name(),
            config.seed
        );

        Ok(Self {
            config,
            collector,
            slave,
        })
    }

    /// Sampling timer tick.
    pub fn tick(&mut self) -> TickOutcome {
        self.collector.on_tick()
    }

    /// Chip-select level change.
    pub fn set_chip_select(&self, level: Level) -> LinkState {
        self.slave.on_chip_select(level)
    }

    /// One serial clock.
    pub fn clock(&self, mosi: bool) -> Option<bool> {
        self.slave.clock(mosi)
    }

    pub fn master(&self) -> SpiMaster<'_> {
        SpiMaster::new(&self.slave)
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn register(&self) -> &Arc<RandomRegister> {
        self.collector.register()
    }

    pub fn collector(&self) -> &EntropyCollector<N> {
        &self.collector
    }

    pub fn slave(&self) -> &Arc<SerialSlave> {
        &self.slave
    }

    /// Separate the write path from the read path.
    pub fn split(self) -> (EntropyCollector<N>, Arc<SerialSlave>) {
        (self.collector, self.slave)
    }
}
