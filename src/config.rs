//! Configuration: `<vault>/.notegraph/config.toml`.
//!
//! Every key is optional. A missing file means all defaults; a file that
//! does not parse is an error rather than a silent fallback.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{NoteGraphError, Result};
use crate::query::{QueryOptions, DEFAULT_LIMIT};

/// Directory under the vault root holding config and index.
pub const STATE_DIR: &str = ".notegraph";
pub const CONFIG_FILE: &str = "config.toml";

fn default_extensions() -> Vec<String> {
    vec!["md".to_string()]
}

fn default_index_path() -> PathBuf {
    PathBuf::from(STATE_DIR).join("index.db")
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

fn default_depth() -> usize {
    2
}

fn default_related_limit() -> usize {
    10
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// File extensions treated as notes, without the dot.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Relative paths are taken from the vault root.
    #[serde(default = "default_index_path")]
    pub path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_depth")]
    pub default_depth: usize,
    #[serde(default = "default_related_limit")]
    pub related_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_depth: default_depth(),
            related_limit: default_related_limit(),
        }
    }
}

impl Config {
    /// Load from the vault's state directory, or defaults if absent.
    pub fn load(vault_root: &Path) -> Result<Self> {
        let path = vault_root.join(STATE_DIR).join(CONFIG_FILE);
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(&path)?;
        Self::parse(&text).map_err(|source| NoteGraphError::Config { path, source })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Absolute index location for a vault.
    pub fn index_path(&self, vault_root: &Path) -> PathBuf {
        if self.index.path.is_absolute() {
            self.index.path.clone()
        } else {
            vault_root.join(&self.index.path)
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            default_limit: self.query.default_limit,
        }
    }

    /// Whether a file name carries one of the configured extensions.
    pub fn is_note(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| {
                self.vault
                    .extensions
                    .iter()
                    .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.vault.extensions, vec!["md"]);
        assert_eq!(config.query.default_limit, 100);
        assert_eq!(config.graph.default_depth, 2);
        assert_eq!(config.graph.related_limit, 10);
        assert_eq!(
            config.index_path(Path::new("/vault")),
            Path::new("/vault/.notegraph/index.db")
        );
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::parse("[query]\ndefault_limit = 25\n[vault]\nextensions = [\"md\", \"markdown\"]\n").unwrap();
        assert_eq!(config.query.default_limit, 25);
        assert_eq!(config.graph.default_depth, 2);
        assert!(config.is_note(Path::new("a/b.MARKDOWN")));
        assert!(!config.is_note(Path::new("a/b.txt")));
        assert_eq!(config.query_options().default_limit, 25);
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap().query.default_limit, 100);

        fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        fs::write(dir.path().join(STATE_DIR).join(CONFIG_FILE), "[query\n").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, NoteGraphError::Config { .. }));
    }
}
