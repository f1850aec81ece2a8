use std::time::Duration;

use spitrng_core::{Sampler, SpiMaster};

/// Real-time run: the sampler ticks on its own thread at the configured
/// rate while this thread plays the master.
pub fn run(opts: &super::DeviceOptions, n_bytes: usize, chunk: usize, format: &str) {
    let chunk = chunk.max(1);
    let device = super::make_device(opts);
    let period = device.config().tick_period();
    let pause = session_pause(period, chunk);
    let (collector, slave) = device.split();
    let sampler = Sampler::spawn(collector, period).unwrap_or_else(|e| super::fail(&e));
    let master = SpiMaster::new(&slave);

    let mut out = std::io::stdout().lock();
    let mut total = 0usize;
    loop {
        if n_bytes > 0 && total >= n_bytes {
            break;
        }
        let want = if n_bytes == 0 {
            chunk
        } else {
            chunk.min(n_bytes - total)
        };
        let data = master.read(want);
        if !super::emit(&mut out, &data, format) {
            break; // Broken pipe
        }
        total += data.len();
        std::thread::sleep(pause);
    }
    if format == "hex" {
        println!();
    }

    match sampler.stop() {
        Ok((collector, report)) => log::info!(
            "{} ticks ({} missed), {} mixed, {} bytes read",
            report.ticks,
            report.missed,
            collector.stats().mixed,
            total
        ),
        Err(_) => super::fail(&"sampler thread panicked"),
    }
}

/// Time between sessions: about four ticks per debiased bit, eight bits per
/// byte read.
/// Saturates instead of overflowing for huge chunks.
pub fn session_pause(period: Duration, chunk: usize) -> Duration {
    let units = u32::try_from(chunk.max(1)).unwrap_or(u32::MAX);
    period.saturating_mul(32).saturating_mul(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_pause_scales_with_chunk() {
        let period = Duration::from_micros(128);
        assert_eq!(session_pause(period, 0), period * 32);
        assert_eq!(session_pause(period, 16), period * 32 * 16);
    }

    #[test]
    fn test_session_pause_saturates_for_huge_chunks() {
        let period = Duration::from_micros(128);
        let max = session_pause(period, u32::MAX as usize);
        assert_eq!(session_pause(period, usize::MAX), max);
        assert_eq!(session_pause(Duration::MAX, 2), Duration::MAX);
    }
}
