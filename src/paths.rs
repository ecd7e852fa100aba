//! Centralized path resolution for converge
//!
//! # Environment Variables
//!
//! - `CONVERGE_CONFIG_DIR` - Override config directory
//! - `CONVERGE_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `CONVERGE_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/converge` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\converge`
//!    - macOS/Linux: `~/.config/converge`
//!
//! For state_dir():
//! 1. `CONVERGE_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/converge` (if set)
//! 3. Platform default:
//!    - Windows: `%LOCALAPPDATA%\converge`
//!    - macOS/Linux: `~/.local/state/converge`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "CONVERGE_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "CONVERGE_STATE_DIR";

const APP_DIR: &str = "converge";

/// Desired configuration file name inside the config directory
pub const CONFIG_FILE: &str = "resources.toml";

/// Recorded state file name inside the state directory
pub const STATE_FILE: &str = "state.json";

/// Local control plane store inside the state directory
pub const REMOTE_FILE: &str = "remote.json";

/// Get the converge config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join(APP_DIR);
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the converge state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            let path = local_app_data.join(APP_DIR);
            log::debug!("Using Windows state dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Resolve an explicit path flag, or fall back to `file` inside `dir`.
pub fn resolve(
    explicit: Option<&str>,
    dir: impl FnOnce() -> Result<PathBuf>,
    file: &str,
) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(expand(path)),
        None => Ok(dir()?.join(file)),
    }
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables leave the path unexpanded.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$NONEXISTENT_CONVERGE_VAR_12345/file");
        assert_eq!(
            result,
            PathBuf::from("/path/$NONEXISTENT_CONVERGE_VAR_12345/file")
        );
    }

    #[test]
    fn test_resolve_prefers_explicit_path() {
        let path = resolve(
            Some("/tmp/custom.toml"),
            || anyhow::bail!("not consulted"),
            CONFIG_FILE,
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));

        let path = resolve(None, || Ok(PathBuf::from("/etc/converge")), STATE_FILE).unwrap();
        assert_eq!(path, PathBuf::from("/etc/converge/state.json"));
    }
}
