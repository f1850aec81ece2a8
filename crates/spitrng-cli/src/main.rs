//! CLI for spitrng: drive the simulated noise TRNG over its SPI protocols.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "spitrng")]
#[command(about = "spitrng — noise-pin TRNG behind an SPI slave, simulated on the host")]
#[command(version = spitrng_core::VERSION)]
struct Cli {
    /// Device config JSON (defaults to the reference hardware)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Override the wire protocol: counted (control byte 1-2) or streaming
    #[arg(long, global = true, value_parser = ["counted", "streaming"])]
    protocol: Option<String>,

    /// Noise input: biased (default), constant-high, constant-low
    #[arg(long, global = true, default_value = "biased", value_parser = ["biased", "constant-high", "constant-low"])]
    noise: String,

    /// Probability that the biased noise pin reads high
    #[arg(long, global = true, default_value = "0.6")]
    p_high: f64,

    /// Seed for the biased noise pin (reproducible runs)
    #[arg(long, global = true)]
    noise_seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deterministic single-thread run: tick, then read bytes as the master
    Read {
        /// Number of bytes to read
        #[arg(long, default_value = "32")]
        bytes: usize,

        /// Sampling ticks to run before every session
        #[arg(long, default_value = "64")]
        ticks_between: usize,

        /// Output format: hex or raw
        #[arg(long, default_value = "hex", value_parser = ["hex", "raw"])]
        format: String,
    },

    /// Real-time run: sampler thread at the configured tick rate, master on
    /// the main thread, bytes to stdout
    Stream {
        /// Total bytes (0 = until interrupted)
        #[arg(long, default_value = "0")]
        bytes: usize,

        /// Bytes per chip-select session
        #[arg(long, default_value = "16")]
        chunk: usize,

        /// Output format: hex or raw
        #[arg(long, default_value = "hex", value_parser = ["hex", "raw"])]
        format: String,
    },

    /// Record a real-time run into a capture directory
    Capture {
        /// Total bytes to capture
        #[arg(long, default_value = "4096")]
        bytes: usize,

        /// Bytes per chip-select session
        #[arg(long, default_value = "16")]
        chunk: usize,

        /// Output directory
        #[arg(long, default_value = "captures")]
        output: String,

        /// Tags as key=value pairs
        #[arg(long)]
        tag: Vec<String>,

        /// Free-form note stored in capture.json
        #[arg(long)]
        note: Option<String>,
    },

    /// Feed a 0/1 level script through the tick handler and show each mix
    Replay {
        /// Level script, e.g. 000110 (other characters are ignored)
        script: String,
    },

    /// Print the effective device config as JSON, or write it to a file
    Config {
        /// Write to this path instead of stdout
        #[arg(long)]
        output: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let device = commands::DeviceOptions {
        config_path: cli.config.as_deref(),
        protocol: cli.protocol.as_deref(),
        noise: &cli.noise,
        p_high: cli.p_high,
        noise_seed: cli.noise_seed,
    };

    match cli.command {
        Commands::Read {
            bytes,
            ticks_between,
            format,
        } => commands::read::run(&device, bytes, ticks_between, &format),
        Commands::Stream {
            bytes,
            chunk,
            format,
        } => commands::stream::run(&device, bytes, chunk, &format),
        Commands::Capture {
            bytes,
            chunk,
            output,
            tag,
            note,
        } => commands::capture::run(&device, bytes, chunk, &output, &tag, note),
        Commands::Replay { script } => commands::replay::run(&device, &script),
        Commands::Config { output } => commands::config::run(&device, output.as_deref()),
    }
}
