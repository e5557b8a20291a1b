use smp_world::WorldConfig;

pub fn run() -> Result<(), String> {
    let json = serde_json::to_string_pretty(&WorldConfig::default())
        .map_err(|e| format!("cannot serialize config: {e}"))?;
    println!("{json}");
    Ok(())
}
