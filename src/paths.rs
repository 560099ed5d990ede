//! Centralized path resolution for monac
//!
//! # Environment Variables
//!
//! - `MONAC_CONFIG_DIR` - Override config directory (holds `monac.toml`)
//! - `MONAC_STATE_DIR` - Override state directory (holds `state.json`)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `MONAC_CONFIG_DIR` environment variable
//! 2. Platform config dir + `monac` (`~/.config/monac` on Linux)
//!
//! For state_dir():
//! 1. `MONAC_STATE_DIR` environment variable
//! 2. Platform state dir + `monac` (`~/.local/state/monac` on Linux)
//! 3. Platform local data dir + `monac`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "MONAC_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "MONAC_STATE_DIR";

/// Name of the config file inside the config directory
pub const CONFIG_FILE: &str = "monac.toml";

/// Name of the default state file inside the state directory
pub const STATE_FILE: &str = "state.json";

/// Get the monac config directory path
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

    let path = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("monac");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the monac state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    let base = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .context("Could not determine state directory")?;
    let path = base.join("monac");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string.
///
/// Unknown variables are left as-is.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

/// Expand `path` and anchor it at `base` when it is relative
pub fn resolve(base: &Path, path: &str) -> PathBuf {
    let expanded = expand(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// This function uses unsafe env::set_var/remove_var which can cause issues
    /// if other threads read environment variables concurrently.
    /// Only use in single-threaded test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/monac/config", || {
            let result = config_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/monac/config"));
        });
    }

    #[test]
    fn test_state_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        with_env_var(ENV_STATE_DIR, "~/monac-state-tilde-test", || {
            let result = state_dir().unwrap();
            assert_eq!(result, home.join("monac-state-tilde-test"));
        });
    }

    #[test]
    fn test_expand_absolute() {
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_expand_unknown_env_var_unchanged() {
        let result = expand("/path/$MONAC_NONEXISTENT_VAR_12345/file");
        assert_eq!(
            result,
            PathBuf::from("/path/$MONAC_NONEXISTENT_VAR_12345/file")
        );
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = Path::new("/etc/monac");
        assert_eq!(resolve(base, "objects"), PathBuf::from("/etc/monac/objects"));
        assert_eq!(resolve(base, "/srv/objects"), PathBuf::from("/srv/objects"));
    }

    #[test]
    fn test_resolve_expands_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(
            resolve(Path::new("/etc/monac"), "~/objects"),
            home.join("objects")
        );
    }
}
