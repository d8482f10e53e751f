//! Content-classification driven reorganization.
//!
//! Analysis walks a directory, asks the classifier about every entry name
//! and buckets entries by detected semantic type. The planner turns buckets
//! into folder creations and moves; the executor applies them with
//! per-step existence checks.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppError;
use crate::scope_path::{validate_path_exists, PathKind};
use crate::services::classifier_service::{Classifier, ClassifyResult};

pub const DEFAULT_ORGANIZE_EXCLUDES: &[&str] =
    &[".git", "node_modules", ".venv", "__pycache__", "dist", "build"];

pub const DEFAULT_ORGANIZE_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileItemType {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "dir")]
    Dir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileItem {
    pub path: String,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: FileItemType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassifyResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeStats {
    pub total_files: usize,
    pub total_dirs: usize,
    pub languages: BTreeMap<String, usize>,
    pub semantic_types: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizeResult {
    pub root: String,
    pub items: Vec<FileItem>,
    pub suggestions: BTreeMap<String, Vec<FileItem>>,
    pub stats: OrganizeStats,
}

#[derive(Debug, Clone)]
pub struct OrganizeOptions {
    pub max_depth: usize,
    pub classify: bool,
    pub exclude_names: Vec<String>,
}

impl Default for OrganizeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_ORGANIZE_DEPTH,
            classify: true,
            exclude_names: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GroupBy {
    #[default]
    #[serde(rename = "semantic")]
    Semantic,
    #[serde(rename = "language")]
    Language,
    #[serde(rename = "framework")]
    Framework,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOp {
    pub from: String,
    pub to: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorganizePlan {
    pub moves: Vec<MoveOp>,
    pub creates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorganizeOutcome {
    pub moved: usize,
    pub created: usize,
}

/// Entries sorted by name for deterministic output across platforms.
fn sorted_entries(dir: &Path) -> Result<Vec<fs::DirEntry>, AppError> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

fn walk_directory(
    root: &Path,
    max_depth: usize,
    depth: usize,
    exclude_names: &[String],
    items: &mut Vec<FileItem>,
) -> Result<(), AppError> {
    if depth >= max_depth {
        return Ok(());
    }

    for entry in sorted_entries(root)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let full = entry.path();

        if DEFAULT_ORGANIZE_EXCLUDES.contains(&name.as_str())
            || exclude_names.iter().any(|n| n == &name)
        {
            continue;
        }

        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            items.push(FileItem {
                path: full.to_string_lossy().into_owned(),
                name,
                item_type: FileItemType::Dir,
                classification: None,
                size: None,
            });
            walk_directory(&full, max_depth, depth + 1, exclude_names, items)?;
        } else if file_type.is_file() {
            let size = entry.metadata()?.len();
            items.push(FileItem {
                path: full.to_string_lossy().into_owned(),
                name,
                item_type: FileItemType::File,
                classification: None,
                size: Some(size),
            });
        }
    }

    Ok(())
}

/// Walk `root`, classify every captured entry and aggregate suggestions.
/// Classification failures are tolerated per entry: the item stays in the
/// result without a classification.
pub fn analyze_directory(
    root: &Path,
    options: &OrganizeOptions,
    classifier: &dyn Classifier,
) -> Result<OrganizeResult, AppError> {
    validate_path_exists(root, PathKind::Dir)?;

    let mut items = Vec::new();
    walk_directory(root, options.max_depth, 0, &options.exclude_names, &mut items)?;

    if options.classify {
        for item in &mut items {
            match classifier.classify(&item.name) {
                Ok(result) => item.classification = Some(result),
                Err(error) => {
                    debug!(name = %item.name, %error, "classification skipped");
                }
            }
        }
    }

    let mut suggestions: BTreeMap<String, Vec<FileItem>> = BTreeMap::new();
    let mut stats = OrganizeStats::default();

    for item in &items {
        match item.item_type {
            FileItemType::File => stats.total_files += 1,
            FileItemType::Dir => stats.total_dirs += 1,
        }

        if let Some(classification) = &item.classification {
            if let Some(language) = &classification.language {
                *stats.languages.entry(language.clone()).or_default() += 1;
            }
            if let Some(semantic_type) = &classification.semantic_type {
                *stats.semantic_types.entry(semantic_type.clone()).or_default() += 1;
                suggestions
                    .entry(semantic_type.clone())
                    .or_default()
                    .push(item.clone());
            }
        }
    }

    info!(
        root = %root.display(),
        total_files = stats.total_files,
        total_dirs = stats.total_dirs,
        "directory analysis completed"
    );

    Ok(OrganizeResult {
        root: root.to_string_lossy().into_owned(),
        items,
        suggestions,
        stats,
    })
}

/// Turn suggestion buckets into a move/create plan. Deterministic for
/// identical analysis input: buckets iterate in key order and `creates` is
/// a sorted, deduplicated set.
pub fn generate_reorganize_plan(analysis: &OrganizeResult, group_by: GroupBy) -> ReorganizePlan {
    let mut moves = Vec::new();
    let mut creates: BTreeSet<String> = BTreeSet::new();
    let root = Path::new(&analysis.root);

    for (key, bucket) in &analysis.suggestions {
        let dir_name = if key.is_empty() {
            match group_by {
                GroupBy::Language => "language",
                GroupBy::Framework => "framework",
                GroupBy::Semantic => "misc",
            }
        } else {
            key.as_str()
        };

        let target_dir = root.join(dir_name);
        creates.insert(target_dir.to_string_lossy().into_owned());

        for item in bucket {
            let target_path = target_dir.join(&item.name).to_string_lossy().into_owned();
            if item.path != target_path {
                moves.push(MoveOp {
                    from: item.path.clone(),
                    to: target_path,
                    reason: format!("Move to {dir_name} category"),
                });
            }
        }
    }

    ReorganizePlan {
        moves,
        creates: creates.into_iter().collect(),
    }
}

/// Create target directories, then move sources that still exist. A source
/// deleted since planning is skipped, not an error.
pub fn apply_reorganize_plan(plan: &ReorganizePlan) -> Result<ReorganizeOutcome, AppError> {
    let mut created = 0usize;
    let mut moved = 0usize;

    for dir in &plan.creates {
        let path = Path::new(dir);
        if !path.exists() {
            fs::create_dir_all(path).map_err(|source| AppError::FileOperation {
                path: path.to_path_buf(),
                source,
            })?;
            created += 1;
        }
    }

    for mv in &plan.moves {
        let from = Path::new(&mv.from);
        if !from.exists() {
            debug!(from = %mv.from, "move source missing, skipping");
            continue;
        }
        fs::rename(from, Path::new(&mv.to)).map_err(|source| AppError::FileOperation {
            path: from.to_path_buf(),
            source,
        })?;
        moved += 1;
    }

    info!(moved, created, "reorganization applied");
    Ok(ReorganizeOutcome { moved, created })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier_service::LocalClassifier;

    fn seed_project(root: &Path) {
        fs::write(root.join("server.js"), "console.log('hi')").unwrap();
        fs::write(root.join("README.md"), "# readme").unwrap();
        fs::write(root.join("app.test.js"), "test()").unwrap();
        fs::write(root.join("photo.raw"), "....").unwrap();
        fs::create_dir(root.join("node_modules")).unwrap();
        fs::write(root.join("node_modules").join("dep.js"), "x").unwrap();
    }

    #[test]
    fn analyze_buckets_by_semantic_type() {
        let dir = tempfile::tempdir().unwrap();
        seed_project(dir.path());

        let analysis =
            analyze_directory(dir.path(), &OrganizeOptions::default(), &LocalClassifier).unwrap();

        // node_modules is excluded by default, so four files remain.
        assert_eq!(analysis.stats.total_files, 4);
        assert_eq!(analysis.stats.total_dirs, 0);
        assert_eq!(analysis.stats.languages.get("JavaScript"), Some(&2));
        assert!(analysis.suggestions.contains_key("code"));
        assert!(analysis.suggestions.contains_key("docs"));
        assert!(analysis.suggestions.contains_key("tests"));

        // photo.raw matches no semantic keyword but is still classified.
        let photo = analysis
            .items
            .iter()
            .find(|i| i.name == "photo.raw")
            .unwrap();
        assert!(photo.classification.is_some());
        assert!(photo
            .classification
            .as_ref()
            .unwrap()
            .semantic_type
            .is_none());
    }

    #[test]
    fn classify_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        seed_project(dir.path());

        let options = OrganizeOptions {
            classify: false,
            ..OrganizeOptions::default()
        };
        let analysis = analyze_directory(dir.path(), &options, &LocalClassifier).unwrap();
        assert!(analysis.items.iter().all(|i| i.classification.is_none()));
        assert!(analysis.suggestions.is_empty());
    }

    #[test]
    fn classifier_failures_leave_entries_unclassified() {
        struct Flaky;
        impl Classifier for Flaky {
            fn classify(&self, name: &str) -> Result<ClassifyResult, AppError> {
                if name.ends_with(".md") {
                    return Err(AppError::Validation("flaky".to_string()));
                }
                LocalClassifier.classify(name)
            }
        }

        let dir = tempfile::tempdir().unwrap();
        seed_project(dir.path());

        let analysis =
            analyze_directory(dir.path(), &OrganizeOptions::default(), &Flaky).unwrap();
        let readme = analysis
            .items
            .iter()
            .find(|i| i.name == "README.md")
            .unwrap();
        assert!(readme.classification.is_none());
        // The failure is local to that entry.
        assert!(analysis.suggestions.contains_key("code"));
    }

    #[test]
    fn max_depth_bounds_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a").join("b")).unwrap();
        fs::write(dir.path().join("a").join("b").join("deep.txt"), "x").unwrap();

        let options = OrganizeOptions {
            max_depth: 1,
            ..OrganizeOptions::default()
        };
        let analysis = analyze_directory(dir.path(), &options, &LocalClassifier).unwrap();
        assert_eq!(analysis.stats.total_dirs, 1);
        assert_eq!(analysis.stats.total_files, 0);
    }

    #[test]
    fn reorganize_plan_is_deterministic_and_skips_in_place_items() {
        let dir = tempfile::tempdir().unwrap();
        seed_project(dir.path());
        // A file already in its target location produces no move.
        fs::create_dir(dir.path().join("docs")).unwrap();
        fs::rename(
            dir.path().join("README.md"),
            dir.path().join("docs").join("README.md"),
        )
        .unwrap();

        let analysis =
            analyze_directory(dir.path(), &OrganizeOptions::default(), &LocalClassifier).unwrap();
        let plan = generate_reorganize_plan(&analysis, GroupBy::Semantic);

        assert!(!plan
            .moves
            .iter()
            .any(|m| m.from.ends_with("README.md")));
        assert!(plan
            .creates
            .contains(&dir.path().join("docs").to_string_lossy().into_owned()));
        assert!(plan
            .moves
            .iter()
            .any(|m| m.from.ends_with("server.js") && m.reason == "Move to code category"));

        let again = generate_reorganize_plan(&analysis, GroupBy::Semantic);
        assert_eq!(
            serde_json::to_string(&plan).unwrap(),
            serde_json::to_string(&again).unwrap()
        );
    }

    #[test]
    fn empty_bucket_key_uses_group_fallback_name() {
        let analysis = OrganizeResult {
            root: "/project".to_string(),
            items: Vec::new(),
            suggestions: BTreeMap::from([(
                String::new(),
                vec![FileItem {
                    path: "/project/thing".to_string(),
                    name: "thing".to_string(),
                    item_type: FileItemType::File,
                    classification: None,
                    size: None,
                }],
            )]),
            stats: OrganizeStats::default(),
        };

        let plan = generate_reorganize_plan(&analysis, GroupBy::Semantic);
        assert_eq!(plan.creates, vec!["/project/misc".to_string()]);
        assert_eq!(plan.moves[0].reason, "Move to misc category");

        let plan = generate_reorganize_plan(&analysis, GroupBy::Language);
        assert_eq!(plan.creates, vec!["/project/language".to_string()]);
    }

    #[test]
    fn apply_creates_dirs_then_moves_existing_sources() {
        let dir = tempfile::tempdir().unwrap();
        seed_project(dir.path());

        let analysis =
            analyze_directory(dir.path(), &OrganizeOptions::default(), &LocalClassifier).unwrap();
        let plan = generate_reorganize_plan(&analysis, GroupBy::Semantic);

        // One source disappears between planning and applying.
        fs::remove_file(dir.path().join("app.test.js")).unwrap();

        let outcome = apply_reorganize_plan(&plan).unwrap();
        assert_eq!(outcome.created, plan.creates.len());
        assert_eq!(outcome.moved, plan.moves.len() - 1);
        assert!(dir.path().join("code").join("server.js").exists());
        assert!(!dir.path().join("server.js").exists());
    }

    #[test]
    fn result_serializes_with_wire_field_names() {
        let dir = tempfile::tempdir().unwrap();
        seed_project(dir.path());

        let analysis =
            analyze_directory(dir.path(), &OrganizeOptions::default(), &LocalClassifier).unwrap();
        let json = serde_json::to_value(&analysis).unwrap();
        assert!(json["stats"]["totalFiles"].is_number());
        assert!(json["stats"]["semanticTypes"].is_object());
        assert_eq!(json["items"][0]["type"], "file");
    }
}
