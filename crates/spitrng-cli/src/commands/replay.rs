use spitrng_core::{Device, ScriptedNoise, SimulatedBringUp, TickOutcome};

/// Feed a level script through the tick handler, one line per tick.
pub fn run(opts: &super::DeviceOptions, script: &str) {
    let config = super::load_config(opts);
    let noise = ScriptedNoise::from_digits(script);
    let ticks = noise.remaining();
    let mut device =
        Device::init(config, &mut SimulatedBringUp::new(), noise).unwrap_or_else(|e| super::fail(&e));

    println!("{:>5}  {:<10} {}", "tick", "outcome", "register");
    println!("{}", "-".repeat(32));
    for i in 1..=ticks {
        match device.tick() {
            TickOutcome::Latched => println!("{i:>5}  {:<10}", "latched"),
            TickOutcome::Discarded => println!("{i:>5}  {:<10}", "discarded"),
            TickOutcome::Mixed { bit, register } => {
                println!("{i:>5}  {:<10} {register:#09x}", format!("mixed {}", bit as u8))
            }
        }
    }

    let stats = device.collector().stats();
    println!(
        "\n{} ticks, {} mixed, {} discarded; register {:#09x}",
        stats.ticks,
        stats.mixed,
        stats.discarded,
        device.register().load()
    );
}
