//! Simulated SPI master.
//!
//! Drives chip-select and the serial clock of a [`SerialSlave`] and samples
//! Data-Out, MSB first. A line nobody drives reads high (pull-up).
//!
//! Data-Out lags the slave's buffer loads by one unit, so both session
//! helpers clock one extra unit and drop the first byte they read.

use crate::register::MAX_REQUEST_BYTES;
use crate::transport::{BITS_PER_UNIT, Level, Protocol, SerialSlave};

/// Byte clocked out while waiting for data. Must not be a valid request.
pub const FILLER: u8 = 0x00;

pub struct SpiMaster<'a> {
    slave: &'a SerialSlave,
}

impl<'a> SpiMaster<'a> {
    pub fn new(slave: &'a SerialSlave) -> Self {
        Self { slave }
    }

    /// Assert chip-select (falling edge).
    pub fn select(&self) {
        self.slave.on_chip_select(Level::Low);
    }

    /// Release chip-select (rising edge).
    pub fn deselect(&self) {
        self.slave.on_chip_select(Level::High);
    }

    /// Exchange one unit.
    pub fn transfer(&self, out: u8) -> u8 {
        (0..BITS_PER_UNIT).rev().fold(0u8, |acc, i| {
            let miso = self.slave.clock((out >> i) & 1 == 1).unwrap_or(true);
            (acc << 1) | miso as u8
        })
    }

    /// Counted session: request `count` bytes and read them back,
    /// most significant first. Counts outside `1..=MAX_REQUEST_BYTES` are
    /// sent as-is; the slave ignores them and the filler echoes back.
    pub fn request(&self, count: u8) -> Vec<u8> {
        if !(1..=MAX_REQUEST_BYTES).contains(&count) {
            log::debug!("request for {count} bytes will not be honoured");
        }
        self.select();
        self.transfer(count);
        let bytes = self.read_lagged(usize::from(count));
        self.deselect();
        bytes
    }

    /// Streaming session: read `n` units of the register's low byte.
    pub fn stream(&self, n: usize) -> Vec<u8> {
        self.select();
        let bytes = self.read_lagged(n);
        self.deselect();
        bytes
    }

    /// Read `n` bytes with whichever session shape the slave speaks,
    /// splitting counted reads into maximal requests.
    pub fn read(&self, n: usize) -> Vec<u8> {
        match self.slave.protocol() {
            Protocol::Streaming => self.stream(n),
            Protocol::Counted => {
                let mut out = Vec::with_capacity(n);
                while out.len() < n {
                    let want = (n - out.len()).min(usize::from(MAX_REQUEST_BYTES));
                    out.extend(self.request(want as u8));
                }
                out
            }
        }
    }

    fn read_lagged(&self, n: usize) -> Vec<u8> {
        let mut bytes: Vec<u8> = (0..=n).map(|_| self.transfer(FILLER)).collect();
        bytes.remove(0);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::register::{RandomRegister, SEED};

    fn slave(protocol: Protocol, value: u32) -> SerialSlave {
        SerialSlave::new(protocol, Arc::new(RandomRegister::new(value)))
    }

    #[test]
    fn test_request_two_from_seed() {
        let s = slave(Protocol::Counted, SEED);
        assert_eq!(SpiMaster::new(&s).request(2), vec![0x55, 0x55]);
    }

    #[test]
    fn test_request_known_value() {
        let s = slave(Protocol::Counted, 0x1AB_CDEF);
        let m = SpiMaster::new(&s);
        assert_eq!(m.request(2), vec![0xCD, 0xEF]);
        assert_eq!(m.request(1), vec![0xEF]);
        assert_eq!(s.stats().sessions, 2);
    }

    #[test]
    fn test_request_out_of_range_yields_filler() {
        let s = slave(Protocol::Counted, 0x1AB_CDEF);
        let m = SpiMaster::new(&s);
        assert_eq!(m.request(0), Vec::<u8>::new());
        assert_eq!(m.request(3), vec![FILLER; 3]);
        assert_eq!(s.stats().loaded, 0);
    }

    #[test]
    fn test_stream_is_stable_without_mixing() {
        let s = slave(Protocol::Streaming, 0x1AB_CDEF);
        assert_eq!(SpiMaster::new(&s).stream(5), vec![0xEF; 5]);
    }

    #[test]
    fn test_read_splits_counted_requests() {
        let s = slave(Protocol::Counted, 0x1AB_CDEF);
        let m = SpiMaster::new(&s);
        assert_eq!(m.read(5), vec![0xCD, 0xEF, 0xCD, 0xEF, 0xEF]);
        assert_eq!(s.stats().commands, 3);
    }

    #[test]
    fn test_deselected_line_reads_high() {
        let s = slave(Protocol::Streaming, SEED);
        assert_eq!(SpiMaster::new(&s).transfer(0x00), 0xFF);
    }
}
