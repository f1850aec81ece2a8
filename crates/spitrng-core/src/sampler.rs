//! Periodic tick source on its own OS thread.
//!
//! Stands in for the hardware timer when the simulator runs the entropy path
//! concurrently with the serial path. The only thing shared with the serial
//! side is the lock-free register. Deadlines that have already passed when
//! the thread wakes are counted as missed ticks and dropped, never queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::collector::EntropyCollector;
use crate::noise::NoiseInput;

/// Tick accounting for one sampler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerReport {
    /// Ticks actually handled.
    pub ticks: u64,
    /// Ticks lost because the thread fell behind.
    pub missed: u64,
}

/// Running sampler thread.
pub struct SamplerHandle<N> {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<(EntropyCollector<N>, SamplerReport)>,
}

pub struct Sampler;

impl Sampler {
    /// Start ticking `collector` every `period`. A zero period ticks as fast
    /// as possible.
    pub fn spawn<N: NoiseInput + 'static>(
        mut collector: EntropyCollector<N>,
        period: Duration,
    ) -> std::io::Result<SamplerHandle<N>> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = std::thread::Builder::new()
            .name("sampler".into())
            .spawn(move || {
                let mut report = SamplerReport::default();
                let mut deadline = Instant::now();
                while !stop_flag.load(Ordering::Acquire) {
                    collector.on_tick();
                    report.ticks += 1;

                    if period.is_zero() {
                        continue;
                    }
                    deadline += period;
                    let now = Instant::now();
                    if now < deadline {
                        std::thread::sleep(deadline - now);
                    } else {
                        let lost = ((now - deadline).as_nanos() / period.as_nanos()) as u64;
                        report.missed += lost;
                        deadline = now;
                    }
                }
                log::debug!(
                    "sampler stopped after {} ticks ({} missed)",
                    report.ticks,
                    report.missed
                );
                (collector, report)
            })?;

        Ok(SamplerHandle { stop, handle })
    }
}

impl<N> SamplerHandle<N> {
    /// Stop the thread and hand the collector back.
    pub fn stop(self) -> std::thread::Result<(EntropyCollector<N>, SamplerReport)> {
        self.stop.store(true, Ordering::Release);
        self.handle.join()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}
