//! Config path resolution helpers.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "services.toml";
pub const LOG_FILE_NAME: &str = "svcdeploy.log";

/// Locate services.toml.
///
/// A file shipped next to the running executable wins, so a packaged bundle
/// finds its own definitions; otherwise the user config directory is used.
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    if let Some(dir) = executable_dir() {
        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("svcdeploy").join(CONFIG_FILE_NAME))
}

/// Log file written beside the config file.
pub fn default_log_path(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(LOG_FILE_NAME)
}

fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}
