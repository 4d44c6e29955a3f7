use crate::{GitSourceError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Artifacts that never participate in sourcing: VCS metadata, editor
/// droppings, package-manager trees, and build output.
pub const BUILT_IN_IGNORE: &[&str] = &[
    "**/.git/**",
    "**/*.un~",
    "**/*.swp",
    "**/.DS_Store",
    "**/.gitignore",
    "**/.npmignore",
    "**/yarn.lock",
    "**/node_modules/**",
    "**/bower_components/**",
    "**/target/**",
    "**/dist/**",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Identity of this sourcing session; also namespaces the local checkout.
    pub name: String,
    /// Remote repository url (https, ssh, scp-like, or a local path).
    pub remote: String,
    /// Glob selecting which working-tree paths participate in sourcing.
    #[serde(default = "SourceConfig::default_patterns")]
    pub patterns: String,
    /// Extra ignore globs merged with the built-in set.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Parent directory for local checkouts. Defaults to `.cache/gitsource`
    /// under the working directory.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// TLS certificate verification during clone/fetch. Lowering this is an
    /// explicit opt-in.
    #[serde(default = "SourceConfig::default_verify_certificates")]
    pub verify_certificates: bool,
    #[serde(default = "SourceConfig::default_local_branch")]
    pub local_branch: String,
    #[serde(default = "SourceConfig::default_remote_branch")]
    pub remote_branch: String,
    /// Watcher coalescing window in milliseconds.
    #[serde(default = "SourceConfig::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl SourceConfig {
    fn default_patterns() -> String {
        "**".to_string()
    }

    fn default_verify_certificates() -> bool {
        true
    }

    fn default_local_branch() -> String {
        "master".to_string()
    }

    fn default_remote_branch() -> String {
        "origin/master".to_string()
    }

    fn default_debounce_ms() -> u64 {
        200
    }

    pub fn new(name: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remote: remote.into(),
            patterns: Self::default_patterns(),
            ignore: Vec::new(),
            cache_dir: None,
            verify_certificates: Self::default_verify_certificates(),
            local_branch: Self::default_local_branch(),
            remote_branch: Self::default_remote_branch(),
            debounce_ms: Self::default_debounce_ms(),
        }
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let config: Self =
            toml::from_str(&raw).map_err(|e| GitSourceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(GitSourceError::Config("name must not be empty".into()));
        }
        if self
            .name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0')
        {
            return Err(GitSourceError::Config(format!(
                "name {:?} is not path-safe",
                self.name
            )));
        }
        if self.remote.trim().is_empty() {
            return Err(GitSourceError::Config("remote must not be empty".into()));
        }
        if self.local_branch.trim().is_empty() || self.remote_branch.trim().is_empty() {
            return Err(GitSourceError::Config("branch names must not be empty".into()));
        }
        Ok(())
    }

    /// Local checkout location for this session: `<cache_dir>/<name>`.
    pub fn local_path(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".cache").join("gitsource"))
            .join(&self.name)
    }

    /// Built-in ignore set merged with the configured extras.
    pub fn ignore_globs(&self) -> Vec<String> {
        BUILT_IN_IGNORE
            .iter()
            .map(|g| g.to_string())
            .chain(self.ignore.iter().cloned())
            .collect()
    }
}
