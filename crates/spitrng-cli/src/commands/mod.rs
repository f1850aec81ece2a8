pub mod capture;
pub mod config;
pub mod read;
pub mod replay;
pub mod stream;

use std::io::Write;

use spitrng_core::{
    BiasedNoise, ConstantNoise, Device, DeviceConfig, NoiseInput, Protocol, SimulatedBringUp,
};

/// Device options shared by every subcommand.
pub struct DeviceOptions<'a> {
    pub config_path: Option<&'a str>,
    pub protocol: Option<&'a str>,
    pub noise: &'a str,
    pub p_high: f64,
    pub noise_seed: Option<u64>,
}

/// Effective config: file (or defaults) with the protocol override applied.
pub fn load_config(opts: &DeviceOptions) -> DeviceConfig {
    let mut config = match opts.config_path {
        Some(path) => DeviceConfig::load(path).unwrap_or_else(|e| fail(&e)),
        None => DeviceConfig::default(),
    };
    if let Some(p) = opts.protocol {
        config.protocol = p.parse::<Protocol>().unwrap_or_else(|e| fail(&e));
    }
    config
}

/// Build the noise input named on the command line.
pub fn make_noise(opts: &DeviceOptions) -> Box<dyn NoiseInput> {
    match opts.noise {
        "constant-high" => Box::new(ConstantNoise::new(true)),
        "constant-low" => Box::new(ConstantNoise::new(false)),
        _ => match opts.noise_seed {
            Some(seed) => Box::new(BiasedNoise::with_seed(opts.p_high, seed)),
            None => Box::new(BiasedNoise::new(opts.p_high)),
        },
    }
}

/// Bring up a simulated device from the command-line options.
pub fn make_device(opts: &DeviceOptions) -> Device<Box<dyn NoiseInput>> {
    let config = load_config(opts);
    Device::init(config, &mut SimulatedBringUp::new(), make_noise(opts))
        .unwrap_or_else(|e| fail(&e))
}

/// Write bytes in the requested format. Returns false on a closed pipe.
pub fn emit(out: &mut impl Write, data: &[u8], format: &str) -> bool {
    let result = match format {
        "raw" => out.write_all(data),
        _ => {
            let hex: String = data.iter().map(|b| format!("{b:02x}")).collect();
            out.write_all(hex.as_bytes())
        }
    };
    result.and_then(|_| out.flush()).is_ok()
}

pub fn fail(err: &dyn std::fmt::Display) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(1);
}
