/// Print or save the effective device config.
pub fn run(opts: &super::DeviceOptions, output: Option<&str>) {
    let config = super::load_config(opts);
    if let Err(e) = config.validate() {
        super::fail(&e);
    }
    match output {
        Some(path) => {
            config.save(path).unwrap_or_else(|e| super::fail(&e));
            println!("Config written to {path}");
        }
        None => match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{json}"),
            Err(e) => super::fail(&e),
        },
    }
    eprintln!(
        "sampling at {:.1} Hz (tick every {:?}), {} protocol",
        config.sample_rate_hz(),
        config.tick_period(),
        config.protocol
    );
}
