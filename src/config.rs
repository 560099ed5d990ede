use anyhow::{Context, Result, bail};
use reconcile::StateOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

// ============================================================================
// Config File
// ============================================================================

/// Contents of `monac.toml`
///
/// ```toml
/// objects = "objects"
///
/// [state]
/// path = "state.json"
/// persist_untracked = false
///
/// [[backend]]
/// name = "grafana"
/// path = "remote/grafana"
/// types = ["Folder", "Alert"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Directory holding object documents
    #[serde(default = "default_objects")]
    pub objects: String,

    #[serde(default)]
    pub state: StateConfig,

    /// Local directory backends, one provider each
    #[serde(default, rename = "backend")]
    pub backends: Vec<BackendConfig>,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateConfig {
    /// State file; defaults to `state.json` in the state directory
    pub path: Option<String>,

    /// Keep tracking objects that disappeared from the documents
    #[serde(default)]
    pub persist_untracked: bool,

    /// Write the state file after each run
    #[serde(default = "default_true")]
    pub save: bool,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: None,
            persist_untracked: false,
            save: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    pub name: String,
    /// Root directory of the backend
    pub path: String,
    /// Object types stored by this backend; containers first
    pub types: Vec<String>,
}

fn default_objects() -> String {
    "objects".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Path of the config file to use
    ///
    /// An explicit path wins; otherwise `monac.toml` in the config directory.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Ok(paths::config_dir()?.join(paths::CONFIG_FILE)),
        }
    }

    /// Load and check a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config text; relative paths resolve against the working directory
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        let mut names = HashSet::new();
        for backend in &self.backends {
            if backend.name.is_empty() {
                bail!("Backend name cannot be empty");
            }
            if !names.insert(backend.name.as_str()) {
                bail!("Backend '{}' is declared twice", backend.name);
            }
            if backend.types.is_empty() {
                bail!("Backend '{}' declares no object types", backend.name);
            }
        }
        Ok(())
    }

    /// Directory holding object documents
    pub fn objects_dir(&self) -> PathBuf {
        paths::resolve(&self.base_dir, &self.objects)
    }

    /// State file location
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.state.path {
            Some(path) => Ok(paths::resolve(&self.base_dir, path)),
            None => Ok(paths::state_dir()?.join(paths::STATE_FILE)),
        }
    }

    /// Root directory of a backend
    pub fn backend_root(&self, backend: &BackendConfig) -> PathBuf {
        paths::resolve(&self.base_dir, &backend.path)
    }

    pub fn state_options(&self) -> StateOptions {
        StateOptions {
            save_state: self.state.save,
            persist_untracked: self.state.persist_untracked,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
objects = "defs"

[state]
path = "state/monac.json"
persist_untracked = true

[[backend]]
name = "grafana"
path = "/srv/grafana"
types = ["Folder", "Alert"]
"#;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.objects, "objects");
        assert!(config.backends.is_empty());
        assert!(config.state.save);
        assert!(!config.state.persist_untracked);
    }

    #[test]
    fn test_load_resolves_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monac.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.objects_dir(), dir.path().join("defs"));
        assert_eq!(config.state_path().unwrap(), dir.path().join("state/monac.json"));
        assert_eq!(
            config.backend_root(&config.backends[0]),
            PathBuf::from("/srv/grafana")
        );

        let options = config.state_options();
        assert!(options.persist_untracked);
        assert!(options.save_state);
    }

    #[test]
    fn test_duplicate_backend_names_rejected() {
        let text = r#"
[[backend]]
name = "a"
path = "x"
types = ["Folder"]

[[backend]]
name = "a"
path = "y"
types = ["Alert"]
"#;
        assert!(Config::parse(text).is_err());
    }

    #[test]
    fn test_backend_without_types_rejected() {
        let text = r#"
[[backend]]
name = "a"
path = "x"
types = []
"#;
        assert!(Config::parse(text).is_err());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        assert!(Config::parse("objekts = \"typo\"").is_err());
    }

    #[test]
    fn test_locate_explicit() {
        let path = Config::locate(Some(Path::new("/tmp/custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }
}
