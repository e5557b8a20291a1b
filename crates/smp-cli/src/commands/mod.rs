pub mod config;
pub mod plan;
pub mod simulate;

use std::fs;
use std::path::Path;

use smp_world::WorldConfig;

/// Load a JSON configuration file, or the defaults when no path is given.
/// Missing fields fall back to their defaults.
fn load_config(path: Option<&Path>) -> Result<WorldConfig, String> {
    let Some(path) = path else {
        return Ok(WorldConfig::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let config: WorldConfig = serde_json::from_str(&text)
        .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
    config
        .validate()
        .map_err(|e| format!("invalid config {}: {e}", path.display()))?;
    Ok(config)
}
