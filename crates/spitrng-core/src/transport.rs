//! SPI slave transport: serial engine model plus the chip-select and
//! byte-complete handlers.
//!
//! # Engine
//!
//! [`SerialEngine`] mirrors a minimal universal serial interface: a single
//! 8-bit shift register used for both directions, a bit counter, an overflow
//! flag raised after every eighth clock, and enables for the wire, the
//! overflow interrupt and the output driver. Data-Out always shows the
//! register's MSB, so a byte loaded at the end of one unit goes out during
//! the next one. Re-arming and accepting a request both load [`IDLE_BYTE`];
//! any other unit whose handler loads nothing echoes the byte the master just
//! sent.
//!
//! # Protocols
//!
//! - [`Protocol::Counted`]: a received byte in `1..=MAX_REQUEST_BYTES` is a
//!   request; every later non-request unit loads the next register byte,
//!   most significant first, until the count runs out.
//! - [`Protocol::Streaming`]: every unit loads the register's low byte.
//!
//! All state is atomic so the handlers take `&self`, like interrupt routines
//! over static storage. The overflow flag must be cleared by every
//! byte-complete invocation or the engine stalls until the next re-arm.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::register::{MAX_REQUEST_BYTES, RandomRegister};

/// Bits per serial unit.
pub const BITS_PER_UNIT: u8 = 8;

/// Shift-register contents after a re-arm or an accepted request.
pub const IDLE_BYTE: u8 = 0x00;

/// Electrical level of a master-driven line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Low,
    High,
}

/// Chip-select is active low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    /// Deselected; engine disabled.
    Idle,
    /// Selected; engine armed.
    Active,
}

/// Wire protocol served by the slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Control byte negotiates how many register bytes follow.
    #[default]
    Counted,
    /// Every unit returns the current low byte.
    Streaming,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Counted => write!(f, "counted"),
            Self::Streaming => write!(f, "streaming"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "counted" | "a" => Ok(Self::Counted),
            "streaming" | "b" => Ok(Self::Streaming),
            other => Err(format!("unknown protocol '{other}' (expected counted|streaming)")),
        }
    }
}

/// What a byte-complete invocation did with the unit just exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteAction {
    /// Received byte accepted as a request for `n` bytes; [`IDLE_BYTE`]
    /// loaded in its place.
    Command(u8),
    /// Register byte loaded for the next unit.
    Loaded(u8),
    /// Nothing to send; the received byte stays in the shift register.
    Idle,
}

// ---------------------------------------------------------------------------
// Serial engine
// ---------------------------------------------------------------------------

/// Shift-register hardware shared by the two transport handlers.
#[derive(Debug, Default)]
pub struct SerialEngine {
    data: AtomicU8,
    counter: AtomicU8,
    overflow: AtomicBool,
    wire_enabled: AtomicBool,
    interrupt_enabled: AtomicBool,
    driver_enabled: AtomicBool,
}

impl SerialEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the counter, overflow flag and shift register, then enable wire,
    /// interrupt and driver. The reset is published before the enables.
    pub fn arm(&self) {
        self.data.store(IDLE_BYTE, Ordering::Relaxed);
        self.counter.store(0, Ordering::Relaxed);
        self.overflow.store(false, Ordering::Relaxed);
        self.driver_enabled.store(true, Ordering::Relaxed);
        self.interrupt_enabled.store(true, Ordering::Release);
        self.wire_enabled.store(true, Ordering::Release);
    }

    /// Disable wire, interrupt and driver. Counter and data are left alone.
    pub fn disarm(&self) {
        self.wire_enabled.store(false, Ordering::Release);
        self.interrupt_enabled.store(false, Ordering::Release);
        self.driver_enabled.store(false, Ordering::Release);
    }

    /// One clock edge. Returns the Data-Out level presented for this bit, or
    /// `None` when the driver is off. A disabled or stalled engine shifts
    /// nothing.
    pub fn shift(&self, mosi: bool) -> Option<bool> {
        let data = self.data.load(Ordering::Acquire);
        let miso = self
            .driver_enabled
            .load(Ordering::Acquire)
            .then_some(data & 0x80 != 0);

        if self.is_stalled() {
            return miso;
        }

        self.data.store((data << 1) | mosi as u8, Ordering::Release);
        let count = self.counter.load(Ordering::Relaxed) + 1;
        if count >= BITS_PER_UNIT {
            self.counter.store(0, Ordering::Relaxed);
            self.overflow.store(true, Ordering::Release);
        } else {
            self.counter.store(count, Ordering::Relaxed);
        }
        miso
    }

    /// Whether clocks are currently ignored.
    pub fn is_stalled(&self) -> bool {
        !self.wire_enabled.load(Ordering::Acquire) || self.overflow.load(Ordering::Acquire)
    }

    /// Shift register contents.
    pub fn data(&self) -> u8 {
        self.data.load(Ordering::Acquire)
    }

    /// Place the next outgoing byte.
    pub fn load(&self, byte: u8) {
        self.data.store(byte, Ordering::Release);
    }

    pub fn counter(&self) -> u8 {
        self.counter.load(Ordering::Relaxed)
    }

    pub fn overflow_pending(&self) -> bool {
        self.overflow.load(Ordering::Acquire)
    }

    pub fn clear_overflow(&self) {
        self.overflow.store(false, Ordering::Release);
    }

    pub fn is_armed(&self) -> bool {
        self.wire_enabled.load(Ordering::Acquire)
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled.load(Ordering::Acquire)
    }

    pub fn driver_enabled(&self) -> bool {
        self.driver_enabled.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Slave
// ---------------------------------------------------------------------------

/// Transport counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaveStats {
    /// Idle → Active transitions.
    pub sessions: u64,
    /// Accepted request bytes.
    pub commands: u64,
    /// Register bytes loaded.
    pub loaded: u64,
    /// Units that loaded nothing.
    pub idle: u64,
}

#[derive(Debug, Default)]
struct SlaveCounters {
    sessions: AtomicU64,
    commands: AtomicU64,
    loaded: AtomicU64,
    idle: AtomicU64,
}

/// Read end of the register plus the transport state machine.
#[derive(Debug)]
pub struct SerialSlave {
    protocol: Protocol,
    engine: SerialEngine,
    register: Arc<RandomRegister>,
    pending_bytes: AtomicU8,
    selected: AtomicBool,
    counters: SlaveCounters,
}

impl SerialSlave {
    pub fn new(protocol: Protocol, register: Arc<RandomRegister>) -> Self {
        Self {
            protocol,
            engine: SerialEngine::new(),
            register,
            pending_bytes: AtomicU8::new(0),
            selected: AtomicBool::new(false),
            counters: SlaveCounters::default(),
        }
    }

    /// Chip-select pin-change handler.
    ///
    /// Falling edge re-arms from scratch: counter, overflow flag, shift
    /// register and the pending byte count are all reset, so a transfer cut by a
    /// deselect never resumes without a fresh request. Rising edge only
    /// disables the engine.
    pub fn on_chip_select(&self, level: Level) -> LinkState {
        match level {
            Level::Low => {
                self.pending_bytes.store(0, Ordering::Relaxed);
                self.engine.arm();
                if !self.selected.swap(true, Ordering::AcqRel) {
                    self.counters.sessions.fetch_add(1, Ordering::Relaxed);
                    log::debug!("chip select asserted, {} session armed", self.protocol);
                }
                LinkState::Active
            }
            Level::High => {
                self.engine.disarm();
                if self.selected.swap(false, Ordering::AcqRel) {
                    log::debug!(
                        "chip select released ({} bytes still pending)",
                        self.pending_byte_count()
                    );
                }
                LinkState::Idle
            }
        }
    }

    /// Byte-complete (counter overflow) handler.
    pub fn on_byte_complete(&self) -> ByteAction {
        let action = match self.protocol {
            Protocol::Counted => self.complete_counted(),
            Protocol::Streaming => {
                let byte = self.register.byte(0);
                self.engine.load(byte);
                ByteAction::Loaded(byte)
            }
        };
        self.engine.clear_overflow();

        let counter = match action {
            ByteAction::Command(_) => &self.counters.commands,
            ByteAction::Loaded(_) => &self.counters.loaded,
            ByteAction::Idle => &self.counters.idle,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        log::trace!("byte complete: {action:?}");
        action
    }

    fn complete_counted(&self) -> ByteAction {
        let received = self.engine.data();
        if (1..=MAX_REQUEST_BYTES).contains(&received) {
            self.pending_bytes.store(received, Ordering::Relaxed);
            self.engine.load(IDLE_BYTE);
            return ByteAction::Command(received);
        }
        match self.pending_bytes.load(Ordering::Relaxed) {
            0 => ByteAction::Idle,
            n => {
                let byte = self.register.byte(n - 1);
                self.engine.load(byte);
                self.pending_bytes.store(n - 1, Ordering::Relaxed);
                ByteAction::Loaded(byte)
            }
        }
    }

    /// One serial clock from the master. Dispatches the byte-complete
    /// handler when the unit finishes with the interrupt enabled.
    pub fn clock(&self, mosi: bool) -> Option<bool> {
        let miso = self.engine.shift(mosi);
        if self.engine.overflow_pending() && self.engine.interrupt_enabled() {
            self.on_byte_complete();
        }
        miso
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn link_state(&self) -> LinkState {
        if self.selected.load(Ordering::Acquire) {
            LinkState::Active
        } else {
            LinkState::Idle
        }
    }

    pub fn pending_byte_count(&self) -> u8 {
        self.pending_bytes.load(Ordering::Relaxed)
    }

    pub fn engine(&self) -> &SerialEngine {
        &self.engine
    }

    pub fn register(&self) -> &Arc<RandomRegister> {
        &self.register
    }

    pub fn stats(&self) -> SlaveStats {
        SlaveStats {
            sessions: self.counters.sessions.load(Ordering::Relaxed),
            commands: self.counters.commands.load(Ordering::Relaxed),
            loaded: self.counters.loaded.load(Ordering::Relaxed),
            idle: self.counters.idle.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: u32 = 0x123_4567;

    fn slave(protocol: Protocol, value: u32) -> SerialSlave {
        SerialSlave::new(protocol, Arc::new(RandomRegister::new(value)))
    }

    /// Clock a whole unit through the slave, MSB first.
    fn unit(slave: &SerialSlave, byte: u8) -> u8 {
        (0..BITS_PER_UNIT).rev().fold(0u8, |acc, i| {
            let miso = slave.clock((byte >> i) & 1 == 1).unwrap_or(true);
            (acc << 1) | miso as u8
        })
    }

    #[test]
    fn test_engine_shifts_and_overflows() {
        let engine = SerialEngine::new();
        engine.arm();
        engine.load(0b1100_0000);
        let out: Vec<Option<bool>> = (0..8).map(|_| engine.shift(true)).collect();
        assert_eq!(out[0], Some(true));
        assert_eq!(out[1], Some(true));
        assert_eq!(out[2], Some(false));
        assert!(engine.overflow_pending());
        assert_eq!(engine.data(), 0xFF);
        assert_eq!(engine.counter(), 0);
    }

    #[test]
    fn test_engine_disabled_drives_nothing() {
        let engine = SerialEngine::new();
        assert_eq!(engine.shift(true), None);
        assert_eq!(engine.data(), 0);
        assert!(engine.is_stalled());
    }

    #[test]
    fn test_uncleared_overflow_stalls_until_rearm() {
        let engine = SerialEngine::new();
        engine.arm();
        for _ in 0..8 {
            engine.shift(false);
        }
        assert!(engine.is_stalled());
        for _ in 0..5 {
            engine.shift(true);
        }
        assert_eq!(engine.data(), 0);
        assert_eq!(engine.counter(), 0);

        engine.arm();
        assert!(!engine.is_stalled());
        engine.shift(true);
        assert_eq!(engine.data(), 1);
        assert_eq!(engine.counter(), 1);
    }

    #[test]
    fn test_byte_complete_always_clears_overflow() {
        for protocol in [Protocol::Counted, Protocol::Streaming] {
            let s = slave(protocol, KNOWN);
            s.on_chip_select(Level::Low);
            for byte in [0u8, 1, 2, 3, 0xFF] {
                unit(&s, byte);
                assert!(!s.engine().overflow_pending(), "{protocol}: {byte}");
            }
        }
    }

    #[test]
    fn test_counted_request_two_bytes_msb_first() {
        let s = slave(Protocol::Counted, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 2);
        assert_eq!(s.pending_byte_count(), 2);
        assert_eq!(s.on_byte_complete_after(0x00), ByteAction::Loaded(0x45));
        assert_eq!(s.on_byte_complete_after(0x00), ByteAction::Loaded(0x67));
        assert_eq!(s.on_byte_complete_after(0x00), ByteAction::Idle);
        assert_eq!(s.pending_byte_count(), 0);
    }

    #[test]
    fn test_counted_wire_view() {
        let s = slave(Protocol::Counted, KNOWN);
        s.on_chip_select(Level::Low);
        // Fresh session: the control unit carries the idle byte.
        assert_eq!(unit(&s, 2), IDLE_BYTE);
        // Data-Out lags the load by one unit, and the request is not echoed.
        assert_eq!(unit(&s, 0), IDLE_BYTE);
        assert_eq!(unit(&s, 0), 0x45);
        assert_eq!(unit(&s, 0), 0x67);
        // Count exhausted: the filler is echoed.
        assert_eq!(unit(&s, 0xA5), 0x00);
        assert_eq!(unit(&s, 0), 0xA5);
    }

    #[test]
    fn test_counted_request_one_byte() {
        let s = slave(Protocol::Counted, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 1);
        assert_eq!(s.on_byte_complete_after(0x00), ByteAction::Loaded(0x67));
        assert_eq!(s.on_byte_complete_after(0x00), ByteAction::Idle);
    }

    #[test]
    fn test_counted_out_of_range_control_does_not_arm() {
        for control in [0u8, 3, 0x80, 0xFF] {
            let s = slave(Protocol::Counted, KNOWN);
            s.on_chip_select(Level::Low);
            unit(&s, control);
            assert_eq!(s.pending_byte_count(), 0);
            assert_eq!(s.on_byte_complete_after(0x00), ByteAction::Idle);
            assert_eq!(s.stats().loaded, 0);
        }
    }

    #[test]
    fn test_counted_resend_control_mid_stream() {
        let s = slave(Protocol::Counted, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 2);
        unit(&s, 0);
        assert_eq!(s.pending_byte_count(), 1);
        unit(&s, 2);
        assert_eq!(s.pending_byte_count(), 2);
    }

    #[test]
    fn test_falling_edge_resets_mid_transfer() {
        let s = slave(Protocol::Counted, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 2);
        unit(&s, 0);
        // Three bits into the next unit.
        s.clock(false);
        s.clock(false);
        s.clock(false);
        assert_eq!(s.engine().counter(), 3);

        assert_eq!(s.on_chip_select(Level::Low), LinkState::Active);
        assert_eq!(s.engine().counter(), 0);
        assert!(!s.engine().overflow_pending());
        assert_eq!(s.pending_byte_count(), 0);
        // First unit of the new window behaves like a session start.
        assert_eq!(s.on_byte_complete_after(0x00), ByteAction::Idle);
    }

    #[test]
    fn test_deselect_reselect_does_not_resume() {
        let s = slave(Protocol::Counted, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 2);
        unit(&s, 0);
        assert_eq!(s.on_chip_select(Level::High), LinkState::Idle);
        // Rising edge leaves the count alone.
        assert_eq!(s.pending_byte_count(), 1);
        s.on_chip_select(Level::Low);
        assert_eq!(s.pending_byte_count(), 0);
        let loaded_before = s.stats().loaded;
        unit(&s, 0);
        unit(&s, 0);
        assert_eq!(s.stats().loaded, loaded_before);
    }

    #[test]
    fn test_session_cut_after_load_does_not_leak() {
        let s = slave(Protocol::Counted, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 1);
        assert_eq!(s.on_byte_complete_after(0x00), ByteAction::Loaded(0x67));
        assert_eq!(s.engine().data(), 0x67);
        // Deselect before the loaded byte is clocked out.
        s.on_chip_select(Level::High);
        s.on_chip_select(Level::Low);
        assert_eq!(s.engine().data(), IDLE_BYTE);
        assert_eq!(unit(&s, 2), IDLE_BYTE);
        assert_eq!(unit(&s, 0), IDLE_BYTE);
        assert_eq!(unit(&s, 0), 0x45);
    }

    #[test]
    fn test_streaming_fresh_session_starts_idle() {
        let s = slave(Protocol::Streaming, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 0);
        s.on_chip_select(Level::High);
        s.on_chip_select(Level::Low);
        assert_eq!(unit(&s, 0xFF), IDLE_BYTE);
        assert_eq!(unit(&s, 0xFF), 0x67);
    }

    #[test]
    fn test_deselected_slave_ignores_clocks() {
        let s = slave(Protocol::Streaming, KNOWN);
        assert_eq!(s.link_state(), LinkState::Idle);
        assert_eq!(s.clock(true), None);
        assert_eq!(s.engine().counter(), 0);
        assert_eq!(s.stats(), SlaveStats::default());
    }

    #[test]
    fn test_streaming_returns_low_byte_every_unit() {
        let s = slave(Protocol::Streaming, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 0xFF);
        let got: Vec<u8> = (0..5).map(|_| unit(&s, 0x02)).collect();
        assert_eq!(got, vec![0x67; 5]);
        assert_eq!(s.stats().commands, 0);
    }

    #[test]
    fn test_streaming_tracks_register_changes() {
        let s = slave(Protocol::Streaming, KNOWN);
        s.on_chip_select(Level::Low);
        unit(&s, 0);
        s.register().reset(0xAB);
        unit(&s, 0);
        assert_eq!(unit(&s, 0), 0xAB);
    }

    #[test]
    fn test_repeated_edges_are_idempotent() {
        let s = slave(Protocol::Counted, KNOWN);
        s.on_chip_select(Level::Low);
        s.on_chip_select(Level::Low);
        s.on_chip_select(Level::High);
        s.on_chip_select(Level::High);
        assert_eq!(s.link_state(), LinkState::Idle);
        assert!(!s.engine().is_armed());
        assert!(!s.engine().driver_enabled());
        assert_eq!(s.stats().sessions, 1);
    }

    #[test]
    fn test_protocol_parse_and_display() {
        assert_eq!("counted".parse::<Protocol>(), Ok(Protocol::Counted));
        assert_eq!("Streaming".parse::<Protocol>(), Ok(Protocol::Streaming));
        assert_eq!("b".parse::<Protocol>(), Ok(Protocol::Streaming));
        assert!("fast".parse::<Protocol>().is_err());
        assert_eq!(Protocol::Streaming.to_string(), "streaming");
    }

    impl SerialSlave {
        /// Test helper: pretend the master shifted `byte` in, then run the
        /// handler directly.
        fn on_byte_complete_after(&self, byte: u8) -> ByteAction {
            self.engine.load(byte);
            self.on_byte_complete()
        }
    }
}
