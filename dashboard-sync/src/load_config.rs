/// `load_config` module: reads the YAML settings file into [`SyncSettings`].
///
/// The file holds no secrets. Provider credentials are resolved separately from
/// the environment (see [`dashboard_sync_core::config::ProviderConfig`]), so a
/// settings file can be committed next to the deployment that uses it.
///
/// Every field is optional; an empty file yields the built-in defaults.
///
/// # Errors
/// Failures are `anyhow::Error`s naming the file, surfaced at the CLI boundary.
use anyhow::Result;
use dashboard_sync_core::config::SyncSettings;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SyncSettings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // serde_yaml rejects an empty document; treat it as "all defaults".
    if config_content.trim().is_empty() {
        warn!(config_path = ?path_ref, "Config file is empty, using defaults");
        return Ok(SyncSettings::default());
    }

    let settings: SyncSettings = match serde_yaml::from_str(&config_content) {
        Ok(settings) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            settings
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if settings.stats_ranges.is_empty() {
        warn!(config_path = ?path_ref, "No stats ranges configured; sync-stats will write nothing");
    }
    Ok(settings)
}
