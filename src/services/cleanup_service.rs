//! Directory scanning and cleanup.
//!
//! A scan walks the tree once, collecting empty directories, oversized
//! files and opaque cache directories while bucketing every file by exact
//! byte size. Duplicate resolution then runs over the buckets with one of
//! three strategies. Scan and apply are separate steps with no locking in
//! between; apply re-checks each item's existence immediately before
//! removal instead.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::AppError;
use crate::scope_path::{validate_path_exists, PathKind};

pub const DEFAULT_CACHE_DIRS: &[&str] = &[
    "node_modules",
    ".cache",
    "dist",
    "build",
    ".next",
    ".turbo",
    ".parcel-cache",
    ".pytest_cache",
];

pub const DEFAULT_LARGE_FILE_MB: u64 = 50;

// Files above this are never hashed; they fall back to size grouping.
const MAX_HASH_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanupItemType {
    #[serde(rename = "emptyDir")]
    EmptyDir,
    #[serde(rename = "largeFile")]
    LargeFile,
    #[serde(rename = "duplicate")]
    Duplicate,
    #[serde(rename = "cacheDir")]
    CacheDir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupItem {
    #[serde(rename = "type")]
    pub item_type: CleanupItemType,
    pub path: String,
    pub size: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicateStrategy {
    #[default]
    #[serde(rename = "size")]
    Size,
    #[serde(rename = "nameSize")]
    NameSize,
    #[serde(rename = "hash")]
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CleanupOptions {
    pub include_empty_dirs: bool,
    pub include_large_files: bool,
    pub include_duplicates: bool,
    pub include_caches: bool,
    pub max_file_size_mb: Option<u64>,
    /// Legacy toggle: selects the hash strategy when no explicit strategy
    /// is set.
    pub hash_duplicates: bool,
    pub cache_dir_names: Option<Vec<String>>,
    pub max_depth: Option<usize>,
    pub exclude_names: Vec<String>,
    pub follow_symlinks: bool,
    pub duplicate_strategy: Option<DuplicateStrategy>,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            include_empty_dirs: true,
            include_large_files: true,
            include_duplicates: true,
            include_caches: true,
            max_file_size_mb: None,
            hash_duplicates: false,
            cache_dir_names: None,
            max_depth: None,
            exclude_names: Vec::new(),
            follow_symlinks: false,
            duplicate_strategy: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub empty_dirs: usize,
    pub large_files: usize,
    pub duplicates: usize,
    pub cache_dirs: usize,
    pub estimated_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupPlan {
    pub root: String,
    pub items: Vec<CleanupItem>,
    pub summary: CleanupSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupOutcome {
    pub deleted: usize,
    pub freed_bytes: u64,
}

/// Recursive size of a subtree. Used for cache directories, which are
/// reported as opaque blobs instead of being walked item by item.
fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Directory entries sorted by name, so survivor selection and plan output
/// are deterministic across platforms and filesystems.
fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>, AppError> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

struct WalkOutcome {
    items: Vec<CleanupItem>,
    child_count: usize,
}

fn walk_dir(
    root: &Path,
    options: &CleanupOptions,
    buckets: &mut BTreeMap<u64, Vec<String>>,
    depth: usize,
) -> Result<WalkOutcome, AppError> {
    let mut items = Vec::new();
    let mut child_count = 0usize;

    for entry in sorted_entries(root)? {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let full = entry.path();

        if options.exclude_names.iter().any(|n| n.as_str() == name) {
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_symlink() && !options.follow_symlinks {
            debug!(path = %full.display(), "skipping symlink");
            continue;
        }

        let (is_dir, file_size) = if file_type.is_symlink() {
            let target = fs::metadata(&full).map_err(|source| AppError::FileOperation {
                path: full.clone(),
                source,
            })?;
            (target.is_dir(), target.len())
        } else if file_type.is_dir() {
            (true, 0)
        } else {
            (false, entry.metadata()?.len())
        };

        if is_dir {
            if let Some(max_depth) = options.max_depth {
                if depth >= max_depth {
                    // Not descended, but it still counts as a non-empty
                    // child of its parent.
                    child_count += 1;
                    continue;
                }
            }

            let is_cache_name = match &options.cache_dir_names {
                Some(names) => names.iter().any(|n| n.as_str() == name),
                None => DEFAULT_CACHE_DIRS.contains(&name.as_ref()),
            };
            if options.include_caches && is_cache_name {
                let size = dir_size(&full);
                items.push(CleanupItem {
                    item_type: CleanupItemType::CacheDir,
                    path: full.to_string_lossy().into_owned(),
                    size,
                    reason: "cache directory".to_string(),
                });
                child_count += 1;
                continue;
            }

            let result = walk_dir(&full, options, buckets, depth + 1)?;
            let is_empty = result.child_count == 0;
            items.extend(result.items);

            // Transitively empty subtrees do not count as children, so a
            // directory holding only empty directories is itself empty.
            if !is_empty {
                child_count += 1;
            }
            if options.include_empty_dirs && is_empty {
                items.push(CleanupItem {
                    item_type: CleanupItemType::EmptyDir,
                    path: full.to_string_lossy().into_owned(),
                    size: 0,
                    reason: "empty directory".to_string(),
                });
            }
        } else {
            child_count += 1;

            let threshold_bytes =
                options.max_file_size_mb.unwrap_or(DEFAULT_LARGE_FILE_MB) * 1024 * 1024;
            if options.include_large_files && file_size >= threshold_bytes {
                items.push(CleanupItem {
                    item_type: CleanupItemType::LargeFile,
                    path: full.to_string_lossy().into_owned(),
                    size: file_size,
                    reason: "exceeds size threshold".to_string(),
                });
            }

            if options.include_duplicates {
                buckets
                    .entry(file_size)
                    .or_default()
                    .push(full.to_string_lossy().into_owned());
            }
        }
    }

    Ok(WalkOutcome { items, child_count })
}

fn hash_file(path: &Path) -> Result<String, AppError> {
    let bytes = fs::read(path).map_err(|source| AppError::FileOperation {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

fn duplicate_item(path: &str, size: u64, reason: &str) -> CleanupItem {
    CleanupItem {
        item_type: CleanupItemType::Duplicate,
        path: path.to_string(),
        size,
        reason: reason.to_string(),
    }
}

/// Resolve size buckets into duplicate items. In every strategy the first
/// path of a qualifying group is the kept original.
fn compute_duplicates(
    buckets: &BTreeMap<u64, Vec<String>>,
    strategy: DuplicateStrategy,
) -> Result<Vec<CleanupItem>, AppError> {
    let mut items = Vec::new();

    for (&size, paths) in buckets {
        if paths.len() < 2 {
            continue;
        }

        match strategy {
            DuplicateStrategy::Size => {
                for path in &paths[1..] {
                    items.push(duplicate_item(path, size, "same file size group"));
                }
            }
            DuplicateStrategy::NameSize => {
                let mut groups: BTreeMap<String, Vec<&String>> = BTreeMap::new();
                for path in paths {
                    let base_name = Path::new(path)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    groups
                        .entry(format!("{base_name}:{size}"))
                        .or_default()
                        .push(path);
                }
                for group in groups.values() {
                    if group.len() < 2 {
                        continue;
                    }
                    for path in &group[1..] {
                        items.push(duplicate_item(path, size, "same name and size"));
                    }
                }
            }
            DuplicateStrategy::Hash => {
                let mut groups: BTreeMap<String, Vec<&String>> = BTreeMap::new();
                for path in paths {
                    let key = if size > MAX_HASH_BYTES {
                        format!("size:{size}")
                    } else {
                        hash_file(Path::new(path))?
                    };
                    groups.entry(key).or_default().push(path);
                }
                for (key, group) in &groups {
                    if group.len() < 2 {
                        continue;
                    }
                    let reason = if key.starts_with("size:") {
                        "same file size group"
                    } else {
                        "hash match"
                    };
                    for path in &group[1..] {
                        items.push(duplicate_item(path, size, reason));
                    }
                }
            }
        }
    }

    Ok(items)
}

/// Walk `root` and produce an itemized cleanup plan. The plan is a
/// point-in-time snapshot; nothing on disk is touched.
pub fn scan_cleanup(root: &Path, options: &CleanupOptions) -> Result<CleanupPlan, AppError> {
    validate_path_exists(root, PathKind::Dir)?;

    let mut buckets: BTreeMap<u64, Vec<String>> = BTreeMap::new();
    let walked = walk_dir(root, options, &mut buckets, 0)?;

    let strategy = options.duplicate_strategy.unwrap_or(if options.hash_duplicates {
        DuplicateStrategy::Hash
    } else {
        DuplicateStrategy::Size
    });
    let duplicate_items = if options.include_duplicates {
        compute_duplicates(&buckets, strategy)?
    } else {
        Vec::new()
    };

    let mut items = walked.items;
    items.extend(duplicate_items);

    let mut summary = CleanupSummary::default();
    for item in &items {
        match item.item_type {
            CleanupItemType::EmptyDir => summary.empty_dirs += 1,
            CleanupItemType::LargeFile => summary.large_files += 1,
            CleanupItemType::Duplicate => summary.duplicates += 1,
            CleanupItemType::CacheDir => summary.cache_dirs += 1,
        }
        summary.estimated_bytes += item.size;
    }

    info!(
        root = %root.display(),
        empty_dirs = summary.empty_dirs,
        large_files = summary.large_files,
        duplicates = summary.duplicates,
        cache_dirs = summary.cache_dirs,
        "cleanup scan completed"
    );

    Ok(CleanupPlan {
        root: root.to_string_lossy().into_owned(),
        items,
        summary,
    })
}

fn path_depth(path: &str) -> usize {
    Path::new(path).components().count()
}

/// Delete plan items, or the subset named in `selection`. Plain files go
/// first, then directory items deepest-first so no removal hits a
/// not-yet-empty parent. Every item is existence-checked right before
/// removal and only counted if the deletion actually happened.
pub fn apply_cleanup(
    plan: &CleanupPlan,
    selection: Option<&[String]>,
) -> Result<CleanupOutcome, AppError> {
    let selected: Vec<&CleanupItem> = match selection {
        Some(paths) if !paths.is_empty() => plan
            .items
            .iter()
            .filter(|item| paths.contains(&item.path))
            .collect(),
        _ => plan.items.iter().collect(),
    };

    let (mut dirs, files): (Vec<&CleanupItem>, Vec<&CleanupItem>) =
        selected.into_iter().partition(|item| {
            matches!(
                item.item_type,
                CleanupItemType::EmptyDir | CleanupItemType::CacheDir
            )
        });
    dirs.sort_by_key(|item| std::cmp::Reverse(path_depth(&item.path)));

    let mut deleted = 0usize;
    let mut freed_bytes = 0u64;

    for item in files {
        let path = Path::new(&item.path);
        if path.is_file() {
            fs::remove_file(path).map_err(|source| AppError::FileOperation {
                path: path.to_path_buf(),
                source,
            })?;
            deleted += 1;
            freed_bytes += item.size;
        }
    }

    for item in dirs {
        let path = Path::new(&item.path);
        if path.is_dir() {
            fs::remove_dir_all(path).map_err(|source| AppError::FileOperation {
                path: path.to_path_buf(),
                source,
            })?;
            deleted += 1;
            freed_bytes += item.size;
        }
    }

    info!(deleted, freed_bytes, "cleanup applied");
    Ok(CleanupOutcome {
        deleted,
        freed_bytes,
    })
}
