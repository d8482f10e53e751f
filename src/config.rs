//! Runtime configuration for the planning and cleanup engines.
//!
//! The embedding application decides where configuration comes from (env,
//! file, settings store); this module only defines the recognized options
//! and the path resolution every entry point shares.

use std::path::{Path, PathBuf};

use directories::UserDirs;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::scope_path::{secure_path, validate_path_exists, PathKind};
use crate::services::cleanup_service::{CleanupOptions, DuplicateStrategy, DEFAULT_LARGE_FILE_MB};
use crate::services::structure_service::ApplyOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoreConfig {
    /// Confines every write and delete when set.
    pub allowed_output_base: Option<PathBuf>,
    pub default_output_dir: Option<PathBuf>,
    pub max_file_size_mb: u64,
    pub duplicate_strategy: DuplicateStrategy,
    pub max_depth: Option<usize>,
    pub exclude_names: Vec<String>,
    pub follow_symlinks: bool,
    pub overwrite_files: bool,
    pub dry_run: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            allowed_output_base: None,
            default_output_dir: None,
            max_file_size_mb: DEFAULT_LARGE_FILE_MB,
            duplicate_strategy: DuplicateStrategy::Size,
            max_depth: None,
            exclude_names: Vec::new(),
            follow_symlinks: false,
            overwrite_files: false,
            dry_run: false,
        }
    }
}

impl CoreConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn fallback_output_dir() -> PathBuf {
        UserDirs::new()
            .map(|dirs| dirs.home_dir().join("generated"))
            .unwrap_or_else(|| PathBuf::from("./generated"))
    }

    fn resolve(&self, candidate: &Path) -> Result<PathBuf, AppError> {
        secure_path(
            &candidate.to_string_lossy(),
            self.allowed_output_base.as_deref(),
        )
    }

    /// Where generated structures land: the caller's choice, the configured
    /// default, or a `generated` directory under the user's home. Always
    /// checked against `allowed_output_base` when one is configured.
    pub fn resolve_output_dir(&self, custom: Option<&Path>) -> Result<PathBuf, AppError> {
        let candidate = custom
            .map(Path::to_path_buf)
            .or_else(|| self.default_output_dir.clone())
            .unwrap_or_else(Self::fallback_output_dir);
        self.resolve(&candidate)
    }

    /// Resolve a scan/cleanup/organize root, which must already exist. With
    /// no explicit root and no configured default, the current directory is
    /// scanned.
    pub fn resolve_root(&self, raw: Option<&Path>) -> Result<PathBuf, AppError> {
        let candidate = match raw
            .map(Path::to_path_buf)
            .or_else(|| self.default_output_dir.clone())
        {
            Some(path) => path,
            None => std::env::current_dir()?,
        };
        let resolved = self.resolve(&candidate)?;
        validate_path_exists(&resolved, PathKind::Dir)?;
        Ok(resolved)
    }

    pub fn cleanup_options(&self) -> CleanupOptions {
        CleanupOptions {
            max_file_size_mb: Some(self.max_file_size_mb),
            duplicate_strategy: Some(self.duplicate_strategy),
            max_depth: self.max_depth,
            exclude_names: self.exclude_names.clone(),
            follow_symlinks: self.follow_symlinks,
            ..CleanupOptions::default()
        }
    }

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            overwrite_files: self.overwrite_files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = CoreConfig::default();
        assert_eq!(config.max_file_size_mb, 50);
        assert_eq!(config.duplicate_strategy, DuplicateStrategy::Size);
        assert!(!config.follow_symlinks);
        assert!(!config.overwrite_files);
        assert!(!config.dry_run);
    }

    #[test]
    fn loads_partial_json_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"maxFileSizeMb": 10, "duplicateStrategy": "hash", "excludeNames": [".git"]}"#,
        )
        .unwrap();

        let config = CoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.duplicate_strategy, DuplicateStrategy::Hash);
        assert_eq!(config.exclude_names, vec![".git".to_string()]);
        assert!(!config.overwrite_files);
    }

    #[test]
    fn output_dir_respects_allowed_base() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            allowed_output_base: Some(dir.path().to_path_buf()),
            ..CoreConfig::default()
        };

        let inside = config
            .resolve_output_dir(Some(Path::new("projects/new")))
            .unwrap();
        assert_eq!(inside, dir.path().join("projects/new"));

        let err = config
            .resolve_output_dir(Some(Path::new("/elsewhere")))
            .unwrap_err();
        assert_eq!(err.kind(), "PATH_OUT_OF_BOUNDS");
    }

    #[test]
    fn root_resolution_requires_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig {
            default_output_dir: Some(dir.path().join("missing")),
            ..CoreConfig::default()
        };
        let err = config.resolve_root(None).unwrap_err();
        assert_eq!(err.kind(), "PATH_NOT_FOUND");

        let ok = config.resolve_root(Some(dir.path())).unwrap();
        assert_eq!(ok, dir.path());
    }

    #[test]
    fn cleanup_options_carry_configured_surface() {
        let config = CoreConfig {
            max_file_size_mb: 5,
            duplicate_strategy: DuplicateStrategy::NameSize,
            max_depth: Some(2),
            follow_symlinks: true,
            ..CoreConfig::default()
        };
        let options = config.cleanup_options();
        assert_eq!(options.max_file_size_mb, Some(5));
        assert_eq!(
            options.duplicate_strategy,
            Some(DuplicateStrategy::NameSize)
        );
        assert_eq!(options.max_depth, Some(2));
        assert!(options.follow_symlinks);
        assert!(options.include_empty_dirs);
    }
}
