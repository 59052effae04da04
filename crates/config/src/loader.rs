use std::path::{Path, PathBuf};

use {directories::ProjectDirs, tracing::debug};

use crate::{
    error::{Error, Result},
    schema::TripwireConfig,
};

const CONFIG_FILENAMES: &[&str] = &[
    "tripwire.toml",
    "tripwire.yaml",
    "tripwire.yml",
    "tripwire.json",
];

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "tripwire").ok_or(Error::NoHomeDir)
}

/// User configuration directory (e.g. `~/.config/tripwire`).
pub fn config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

/// Directory for long-lived data such as the stored access token.
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Directory for short-lived per-session state (pending authorizations).
/// Falls back to the local data directory on platforms without a state dir.
pub fn state_dir() -> Result<PathBuf> {
    let dirs = project_dirs()?;
    Ok(dirs
        .state_dir()
        .unwrap_or_else(|| dirs.data_local_dir())
        .to_path_buf())
}

/// Load a config file, picking the format from its extension.
pub fn load_config(path: &Path) -> Result<TripwireConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw, path)
}

fn parse_config(raw: &str, path: &Path) -> Result<TripwireConfig> {
    let parse_err = |message: String| Error::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        Some("yaml" | "yml") => serde_yaml::from_str(raw).map_err(|e| parse_err(e.to_string())),
        Some("json") => serde_json::from_str(raw).map_err(|e| parse_err(e.to_string())),
        _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Find the first config file in `dirs`, in order.
fn find_config_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

/// Load configuration from `explicit` if given, otherwise search the current
/// directory and then the user config directory. Returns defaults when no
/// file exists anywhere.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<TripwireConfig> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config from explicit path");
        return load_config(path);
    }

    let mut search = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        search.push(cwd);
    }
    if let Ok(dir) = config_dir() {
        search.push(dir);
    }

    match find_config_in(&search) {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)
        },
        None => {
            debug!("no config file found, using defaults");
            Ok(TripwireConfig::default())
        },
    }
}
