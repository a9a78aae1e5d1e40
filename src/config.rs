//! Protected-file configuration.
//!
//! Some files must never be moved regardless of how they classify: exact
//! filenames (credentials, install scripts), glob patterns, and a set of
//! sensitive MIME types (native executables, shell scripts, Windows PE
//! binaries). The set is loaded once at startup from a TOML file and
//! compiled into an immutable [`ProtectedSet`] shared by the batch and
//! watch paths.
//!
//! # Configuration File Format
//!
//! ```toml
//! [protected]
//! filenames = ["secrets.txt", "install.sh", "config.yaml"]
//! patterns = ["*.kdbx"]
//! mime_types = ["application/x-executable"]
//! ```

use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading the protected-set configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// On-disk configuration for the protected set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedConfig {
    pub protected: ProtectedRules,
}

/// Rules naming what must never be moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedRules {
    /// Exact filenames that must stay in place.
    #[serde(default = "default_filenames")]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the filename.
    #[serde(default)]
    pub patterns: Vec<String>,

    /// MIME types that must stay in place, on top of the built-in
    /// sensitive set.
    #[serde(default = "default_mime_types")]
    pub mime_types: Vec<String>,
}

fn default_filenames() -> Vec<String> {
    ["secrets.txt", "install.sh", "config.yaml"]
        .map(String::from)
        .to_vec()
}

/// Sensitive types that are never moved: native executables, shell
/// scripts, Windows PE binaries.
fn default_mime_types() -> Vec<String> {
    [
        "application/x-executable",
        "application/x-mach-binary",
        "application/x-msdownload",
        "application/vnd.microsoft.portable-executable",
        "application/x-sh",
        "text/x-shellscript",
    ]
    .map(String::from)
    .to_vec()
}

impl ProtectedConfig {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.chronotidy.toml` in the current directory
    /// 3. Look for `~/.config/chronotidy/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but
    /// cannot be read.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".chronotidy.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("chronotidy")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// Compile the configuration into the immutable set used at runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob pattern is invalid.
    pub fn compile(self) -> Result<ProtectedSet, ConfigError> {
        ProtectedSet::new(self.protected)
    }
}

impl Default for ProtectedConfig {
    fn default() -> Self {
        Self {
            protected: ProtectedRules {
                filenames: default_filenames(),
                patterns: Vec::new(),
                mime_types: default_mime_types(),
            },
        }
    }
}

/// Compiled, immutable protected set.
///
/// Built once at startup; both the batch organizer and the watch loop hold
/// it read-only, so it is safe to share across event workers.
pub struct ProtectedSet {
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
    mime_types: HashSet<String>,
}

impl ProtectedSet {
    fn new(rules: ProtectedRules) -> Result<Self, ConfigError> {
        let patterns = rules
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            filenames: rules.filenames.into_iter().collect(),
            patterns,
            mime_types: rules.mime_types.into_iter().collect(),
        })
    }

    /// Compiles the built-in defaults.
    pub fn defaults() -> Self {
        // The default rules contain no patterns, so compilation cannot fail.
        Self {
            filenames: default_filenames().into_iter().collect(),
            patterns: Vec::new(),
            mime_types: default_mime_types().into_iter().collect(),
        }
    }

    /// True when the file's name is protected, by exact match or pattern.
    pub fn is_protected_name(&self, path: &Path) -> bool {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        self.filenames.contains(file_name.as_ref())
            || self
                .patterns
                .iter()
                .any(|pattern| pattern.matches(&file_name))
    }

    /// True when the sniffed MIME type is protected or sensitive.
    pub fn is_protected_mime(&self, mime: &str) -> bool {
        self.mime_types.contains(mime)
    }
}
