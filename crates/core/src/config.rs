//! Configuration module for the template scanner and the folding engine
//!
//! [`ScanConfig`] and [`IgnoreFilter`] control which files a project scan
//! visits. [`EditorConfig`] is the snapshot of host editor settings that a
//! fold batch depends on.

use crate::folding::FoldingError;
use crate::models::SourceKind;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Configuration for a project scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory to scan
    pub root: PathBuf,

    /// Source kind filter (None = headers and sources)
    pub kind_filter: Option<Vec<SourceKind>>,

    /// Custom ignore patterns
    pub ignore_patterns: Vec<String>,

    /// Path to custom ignore file
    pub ignore_file: Option<PathBuf>,

    /// Number of threads for parallel processing
    pub threads: usize,

    /// Maximum file size to process (bytes)
    pub max_file_size: u64,

    /// Whether to follow symlinks
    pub follow_symlinks: bool,

    /// Whether to include hidden files
    pub include_hidden: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            kind_filter: None,
            ignore_patterns: Vec::new(),
            ignore_file: None,
            threads: num_cpus(),
            max_file_size: 10 * 1024 * 1024, // 10 MB
            follow_symlinks: false,
            include_hidden: false,
        }
    }
}

impl ScanConfig {
    /// Create new config with root directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Default::default()
        }
    }

    /// Set source kind filter (builder pattern)
    pub fn with_kind_filter(mut self, kinds: Vec<SourceKind>) -> Self {
        self.kind_filter = Some(kinds);
        self
    }

    /// Set ignore patterns (builder pattern)
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Set ignore file path (builder pattern)
    pub fn with_ignore_file(mut self, path: PathBuf) -> Self {
        self.ignore_file = Some(path);
        self
    }

    /// Set number of threads (builder pattern)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set max file size (builder pattern)
    pub fn with_max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = size;
        self
    }

    /// Set follow symlinks (builder pattern)
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Set include hidden files (builder pattern)
    pub fn with_include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }
}

/// Get number of available CPUs
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// Filter for ignoring files and directories
pub struct IgnoreFilter {
    /// Gitignore rules, plus the custom ignore file if one was given
    gitignore: Option<Gitignore>,

    /// Custom glob patterns
    custom_globs: GlobSet,

    /// Default ignore patterns
    default_ignores: GlobSet,

    /// Whether to include hidden files
    include_hidden: bool,
}

impl IgnoreFilter {
    /// Create a new ignore filter from config
    pub fn new(config: &ScanConfig) -> Result<Self, ConfigError> {
        let gitignore = Self::build_gitignore(&config.root, config.ignore_file.as_deref())?;

        let custom_globs = Self::build_globset(&config.ignore_patterns)?;

        let default_patterns = [
            "**/.git/**",
            "**/build/**",
            "**/cmake-build-*/**",
            "**/CMakeFiles/**",
            "**/_deps/**",
            "**/out/**",
            "**/target/**",
            "**/third_party/**",
            "**/vendor/**",
            "**/node_modules/**",
            "**/*.pch",
            "**/*.gch",
        ];
        let default_ignores = Self::build_globset(
            &default_patterns.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        )?;

        Ok(Self {
            gitignore,
            custom_globs,
            default_ignores,
            include_hidden: config.include_hidden,
        })
    }

    fn build_gitignore(
        root: &Path,
        ignore_file: Option<&Path>,
    ) -> Result<Option<Gitignore>, ConfigError> {
        let gitignore_path = root.join(".gitignore");
        let mut sources: Vec<&Path> = Vec::new();
        if gitignore_path.exists() {
            sources.push(&gitignore_path);
        }
        if let Some(path) = ignore_file {
            if !path.exists() {
                return Err(ConfigError::InvalidConfig(format!(
                    "ignore file not found: {}",
                    path.display()
                )));
            }
            sources.push(path);
        }
        if sources.is_empty() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(root);
        for source in sources {
            if let Some(err) = builder.add(source) {
                tracing::warn!("skipping malformed ignore rules in {}: {}", source.display(), err);
            }
        }

        match builder.build() {
            Ok(gi) => Ok(Some(gi)),
            Err(_) => Ok(None), // Ignore gitignore errors
        }
    }

    /// Build a globset from patterns
    fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidGlob(e.to_string()))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ConfigError::InvalidGlob(e.to_string()))
    }

    /// Check if a path should be ignored
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let path_str = path.to_string_lossy();

        if !self.include_hidden {
            if let Some(name) = path.file_name() {
                if name.to_string_lossy().starts_with('.') {
                    return true;
                }
            }
        }

        if self.default_ignores.is_match(&*path_str) {
            return true;
        }

        if self.custom_globs.is_match(&*path_str) {
            return true;
        }

        if let Some(ref gi) = self.gitignore {
            if gi.matched(path, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Check if path is a C/C++ file accepted by the kind filter
    pub fn matches_kind_filter(&self, path: &Path, filter: &Option<Vec<SourceKind>>) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };

        let Some(kind) = SourceKind::from_extension(&ext.to_string_lossy()) else {
            return false;
        };

        match filter {
            Some(kinds) => kinds.contains(&kind),
            None => true,
        }
    }
}

/// Snapshot of the host editor settings a fold batch depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub soft_wrap: bool,
    pub soft_wrap_at_preferred_line_length: bool,
    pub preferred_line_length: usize,
    /// Cursor treats leading soft tabs as one unit; must be off while folding
    pub atomic_soft_tabs: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            soft_wrap: false,
            soft_wrap_at_preferred_line_length: false,
            preferred_line_length: 80,
            atomic_soft_tabs: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct EditorConfigFile {
    #[serde(default)]
    editor: EditorConfig,
}

impl EditorConfig {
    /// Longest screen line a folded declaration may produce, if any.
    ///
    /// Wrapping at the window edge gives no stable width to fold against,
    /// so soft wrap is only supported at the preferred line length.
    pub fn max_line_length(&self) -> Result<Option<usize>, FoldingError> {
        match (self.soft_wrap, self.soft_wrap_at_preferred_line_length) {
            (false, _) => Ok(None),
            (true, true) => Ok(Some(self.preferred_line_length)),
            (true, false) => Err(FoldingError::UnsupportedSoftWrap),
        }
    }

    /// Parse the `[editor]` table of a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: EditorConfigFile = toml::from_str(text)?;
        if file.editor.preferred_line_length == 0 {
            return Err(ConfigError::InvalidConfig(
                "preferred_line_length must be positive".to_string(),
            ));
        }
        Ok(file.editor)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::new(PathBuf::from("/test"))
            .with_threads(4)
            .with_kind_filter(vec![SourceKind::Header])
            .with_max_file_size(1024);

        assert_eq!(config.threads, 4);
        assert!(config.kind_filter.is_some());
        assert_eq!(config.max_file_size, 1024);
    }

    #[test]
    fn test_kind_filter() {
        let config = ScanConfig::new(PathBuf::from("."));
        let filter = IgnoreFilter::new(&config).unwrap();

        assert!(filter.matches_kind_filter(Path::new("vec.hpp"), &Some(vec![SourceKind::Header])));
        assert!(!filter.matches_kind_filter(Path::new("main.cpp"), &Some(vec![SourceKind::Header])));
        assert!(filter.matches_kind_filter(Path::new("main.cpp"), &None));
        assert!(!filter.matches_kind_filter(Path::new("README.md"), &None));
    }

    #[test]
    fn test_default_ignores() {
        let config = ScanConfig::new(PathBuf::from("/nonexistent"));
        let filter = IgnoreFilter::new(&config).unwrap();

        assert!(filter.should_ignore(Path::new("/p/build/gen.hpp"), false));
        assert!(filter.should_ignore(Path::new("/p/cmake-build-debug/x.h"), false));
        assert!(filter.should_ignore(Path::new("/p/.hidden.hpp"), false));
        assert!(!filter.should_ignore(Path::new("/p/include/vec.hpp"), false));
    }

    #[test]
    fn test_custom_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        let ignore_path = dir.path().join("tplfold.ignore");
        fs::write(&ignore_path, "generated/\n*.inl\n").unwrap();

        let config = ScanConfig::new(dir.path().to_path_buf()).with_ignore_file(ignore_path);
        let filter = IgnoreFilter::new(&config).unwrap();

        assert!(filter.should_ignore(&dir.path().join("impl.inl"), false));
        assert!(filter.should_ignore(&dir.path().join("generated"), true));
        assert!(!filter.should_ignore(&dir.path().join("impl.hpp"), false));
    }

    #[test]
    fn test_missing_ignore_file_is_an_error() {
        let config = ScanConfig::new(PathBuf::from("."))
            .with_ignore_file(PathBuf::from("/definitely/not/here.ignore"));
        assert!(matches!(
            IgnoreFilter::new(&config),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_max_line_length() {
        let mut config = EditorConfig::default();
        assert_eq!(config.max_line_length().unwrap(), None);

        config.soft_wrap = true;
        assert!(matches!(
            config.max_line_length(),
            Err(FoldingError::UnsupportedSoftWrap)
        ));

        config.soft_wrap_at_preferred_line_length = true;
        config.preferred_line_length = 100;
        assert_eq!(config.max_line_length().unwrap(), Some(100));
    }

    #[test]
    fn test_editor_config_from_toml() {
        let config = EditorConfig::from_toml_str(
            "[editor]\nsoft_wrap = true\nsoft_wrap_at_preferred_line_length = true\npreferred_line_length = 120\n",
        )
        .unwrap();
        assert!(config.soft_wrap);
        assert_eq!(config.preferred_line_length, 120);
        assert!(config.atomic_soft_tabs);

        assert_eq!(EditorConfig::from_toml_str("").unwrap(), EditorConfig::default());
        assert!(EditorConfig::from_toml_str("[editor]\npreferred_line_length = 0\n").is_err());
        assert!(EditorConfig::from_toml_str("[editor]\nsoft_wrap = 3\n").is_err());
    }

    #[test]
    fn test_editor_config_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.toml");
        fs::write(&path, "[editor]\npreferred_line_length = 72\n").unwrap();
        assert_eq!(EditorConfig::load(&path).unwrap().preferred_line_length, 72);
        assert!(matches!(
            EditorConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
