use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::TicketryConfig};

/// Standard config file name.
const CONFIG_FILENAME: &str = "ticketry.toml";

/// Load config from the given path.
pub fn load_config(path: &Path) -> std::io::Result<TicketryConfig> {
    let raw = std::fs::read_to_string(path)?;
    let raw = substitute_env(&raw);
    toml::from_str(&raw).map_err(std::io::Error::other)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./ticketry.toml` (project-local)
/// 2. `~/.config/ticketry/ticketry.toml` (user-global)
///
/// Returns `TicketryConfig::default()` if no config file is found.
pub fn discover_and_load(config_dir_override: Option<&Path>) -> TicketryConfig {
    if let Some(path) = find_config_file(config_dir_override) {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    TicketryConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file(config_dir_override: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = config_dir_override {
        let p = dir.join(CONFIG_FILENAME);
        return p.exists().then_some(p);
    }

    // Project-local
    let p = PathBuf::from(CONFIG_FILENAME);
    if p.exists() {
        return Some(p);
    }

    // User-global: ~/.config/ticketry/
    if let Some(dir) = config_dir() {
        let p = dir.join(CONFIG_FILENAME);
        if p.exists() {
            return Some(p);
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/ticketry/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ticketry").map(|d| d.config_dir().to_path_buf())
}
