use spitrng_core::{MAX_REQUEST_BYTES, Protocol};

/// Deterministic run: every session is preceded by `ticks_between` ticks on
/// the same thread, so the output depends only on the noise seed.
pub fn run(opts: &super::DeviceOptions, n_bytes: usize, ticks_between: usize, format: &str) {
    let mut device = super::make_device(opts);
    let per_session = match device.config().protocol {
        Protocol::Counted => usize::from(MAX_REQUEST_BYTES),
        Protocol::Streaming => 16,
    };

    let mut data = Vec::with_capacity(n_bytes);
    while data.len() < n_bytes {
        for _ in 0..ticks_between {
            device.tick();
        }
        let want = per_session.min(n_bytes - data.len());
        data.extend(device.master().read(want));
    }

    let mut out = std::io::stdout().lock();
    if super::emit(&mut out, &data, format) && format == "hex" {
        println!();
    }

    let stats = device.collector().stats();
    log::info!(
        "{} ticks, {} mixed ({:.1}% yield), {} sessions",
        stats.ticks,
        stats.mixed,
        stats.yield_ratio() * 100.0,
        device.slave().stats().sessions
    );
}
