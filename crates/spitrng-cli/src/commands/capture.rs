use std::collections::HashMap;
use std::path::PathBuf;

use spitrng_core::{CaptureConfig, CaptureStats, CaptureWriter, Sampler, SpiMaster};

pub fn run(
    opts: &super::DeviceOptions,
    n_bytes: usize,
    chunk: usize,
    output: &str,
    tags: &[String],
    note: Option<String>,
) {
    let device = super::make_device(opts);
    let config = CaptureConfig {
        device: device.config().clone(),
        output_dir: PathBuf::from(output),
        tags: parse_tags(tags),
        note,
    };
    let mut writer = CaptureWriter::new(config).unwrap_or_else(|e| super::fail(&e));

    let period = device.config().tick_period();
    let pause = super::stream::session_pause(period, chunk);
    let (collector, slave) = device.split();
    let sampler = Sampler::spawn(collector, period).unwrap_or_else(|e| super::fail(&e));
    let master = SpiMaster::new(&slave);

    println!("Capturing {n_bytes} bytes ({} protocol)...", slave.protocol());
    let mut total = 0usize;
    while total < n_bytes {
        let data = master.read(chunk.max(1).min(n_bytes - total));
        if let Err(e) = writer.write_chunk(&data) {
            eprintln!("Error writing chunk: {e}");
            break;
        }
        total += data.len();
        std::thread::sleep(pause);
    }

    let (collector, report) = match sampler.stop() {
        Ok(parts) => parts,
        Err(_) => super::fail(&"sampler thread panicked"),
    };
    let stats = CaptureStats {
        collector: collector.stats(),
        slave: slave.stats(),
        sampler: Some(report),
    };
    match writer.finish(stats) {
        Ok(dir) => println!("Capture saved to {}", dir.display()),
        Err(e) => super::fail(&e),
    }
}

/// Parse `key=value` tags; malformed entries are skipped with a warning.
fn parse_tags(raw: &[String]) -> HashMap<String, String> {
    raw.iter()
        .filter_map(|t| match t.split_once('=') {
            Some((k, v)) if !k.is_empty() => Some((k.to_string(), v.to_string())),
            _ => {
                log::warn!("ignoring malformed tag '{t}' (expected key=value)");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        let tags = parse_tags(&[
            "board=rev-b".to_string(),
            "bad".to_string(),
            "=x".to_string(),
            "note=a=b".to_string(),
        ]);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags["board"], "rev-b");
        assert_eq!(tags["note"], "a=b");
    }
}
