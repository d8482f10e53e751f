//! Tree text parsing, operation planning and execution.
//!
//! A structure description arrives either as indented/markdown text or as
//! the editor's id-addressed tree. Both are flattened into the same ordered
//! operation list: a directory's `mkdir` always precedes its children, so an
//! executor never writes into a missing parent.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AppError;
use crate::scope_path::is_likely_file;

const ROLLBACK_NOTE: &str =
    "Rollback deletes only newly created items. Overwritten files are not automatically restored.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "file")]
    File,
    #[serde(rename = "dir")]
    Dir,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl TreeNode {
    fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            children: Vec::new(),
            content: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalNodeData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternalNode {
    pub data: InternalNodeData,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Wire shape of the interactive editor's tree: a flat id-addressed item map
/// plus a designated root id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalTree {
    pub items: HashMap<String, InternalNode>,
    pub root_id: String,
}

/// The two ways a structure can reach the planner.
#[derive(Debug, Clone)]
pub enum TreeSource {
    Parsed(TreeNode),
    Internal(InternalTree),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    #[serde(rename = "mkdir")]
    Mkdir,
    #[serde(rename = "writeFile")]
    WriteFile,
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mkdir => write!(f, "mkdir"),
            Self::WriteFile => write!(f, "writeFile"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsOp {
    pub op: OpKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOperation {
    pub op: OpKind,
    pub path: String,
    pub exists: bool,
    pub will_overwrite: bool,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub total: usize,
    pub dirs: usize,
    pub files: usize,
    pub overwrite_count: usize,
    pub estimated_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackHint {
    pub delete_paths: Vec<String>,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub output_dir: String,
    pub operations: Vec<PlanOperation>,
    pub stats: PlanStats,
    pub rollback: RollbackHint,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplyOptions {
    pub overwrite_files: bool,
}

/// Match `- item` bullets: returns (leading space count, bullet content).
fn split_bullet(line: &str) -> Option<(usize, &str)> {
    let lead = line.len() - line.trim_start().len();
    let rest = line[lead..].strip_prefix('-')?;
    let content = rest.strip_prefix(|c: char| c.is_whitespace())?;
    Some((lead, content.trim_start()))
}

/// Normalize tree text: tabs become two spaces, trailing whitespace and
/// blank lines are dropped. If any line is a markdown bullet the whole input
/// is treated as markdown and rewritten to plain indentation.
pub fn normalize_tree_text(text: &str) -> Vec<String> {
    let lines: Vec<String> = text
        .replace('\t', "  ")
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    let is_markdown = lines.iter().any(|l| split_bullet(l).is_some());
    if !is_markdown {
        return lines;
    }

    lines
        .into_iter()
        .map(|line| match split_bullet(&line) {
            Some((lead, content)) => {
                let depth = lead / 2;
                format!("{}{}", "  ".repeat(depth), content)
            }
            None => line,
        })
        .collect()
}

/// Parse indentation-based lines into a hierarchy under a sentinel root.
///
/// Levels are `floor(indent / 2)`; odd indentation resolves to the nearest
/// shallower level. That tolerance is intentional, not validated away.
pub fn parse_tree_structure(lines: &[String]) -> TreeNode {
    let root = TreeNode::new("__root__", NodeKind::Dir);
    let mut stack: Vec<(i64, TreeNode)> = vec![(-1, root)];

    for line in lines {
        let trimmed = line.trim_start();
        let indent = (line.len() - trimmed.len()) as i64;
        let name = line.trim();
        if name.is_empty() {
            continue;
        }

        let level = indent / 2;
        let kind = if is_likely_file(name) {
            NodeKind::File
        } else {
            NodeKind::Dir
        };

        // Pop until the top is a strictly shallower parent; the sentinel
        // root is never popped.
        while stack.len() > 1 {
            let top_level = stack[stack.len() - 1].0;
            if top_level < level {
                break;
            }
            attach_top(&mut stack);
        }

        stack.push((level, TreeNode::new(name, kind)));
    }

    while stack.len() > 1 {
        attach_top(&mut stack);
    }

    match stack.pop() {
        Some((_, root)) => root,
        None => TreeNode::new("__root__", NodeKind::Dir),
    }
}

fn attach_top(stack: &mut Vec<(i64, TreeNode)>) {
    if let Some((_, done)) = stack.pop() {
        if let Some((_, parent)) = stack.last_mut() {
            parent.children.push(done);
        }
    }
}

/// Flatten a parsed tree into ordered operations under `base_path`.
/// Pre-order: each directory is emitted before anything inside it. The
/// sentinel root itself is skipped, and file nodes never recurse even if
/// ambiguous indentation attached children to them.
pub fn tree_to_operations(root: &TreeNode, base_path: &Path) -> Vec<FsOp> {
    let mut ops = Vec::new();
    flatten_children(root, base_path, &mut ops);
    ops
}

fn flatten_children(node: &TreeNode, base: &Path, ops: &mut Vec<FsOp>) {
    for child in &node.children {
        let child_path = base.join(&child.name);
        match child.kind {
            NodeKind::Dir => {
                ops.push(FsOp {
                    op: OpKind::Mkdir,
                    path: child_path.to_string_lossy().into_owned(),
                    bytes: None,
                    content: None,
                });
                flatten_children(child, &child_path, ops);
            }
            NodeKind::File => {
                ops.push(FsOp {
                    op: OpKind::WriteFile,
                    path: child_path.to_string_lossy().into_owned(),
                    bytes: Some(0),
                    content: Some(child.content.clone().unwrap_or_default()),
                });
            }
        }
    }
}

/// Flatten the editor's id-addressed tree. Unlike the parsed-text variant,
/// the designated root node is a real item and is emitted itself. Nodes
/// classified as files never recurse into their listed children; unknown
/// child ids are skipped.
pub fn internal_tree_to_operations(tree: &InternalTree, base_path: &Path) -> Vec<FsOp> {
    let mut ops = Vec::new();
    flatten_internal(tree, &tree.root_id, base_path, &mut ops);
    ops
}

fn flatten_internal(tree: &InternalTree, node_id: &str, current: &Path, ops: &mut Vec<FsOp>) {
    let Some(node) = tree.items.get(node_id) else {
        return;
    };

    let name = &node.data.title;
    let child_path = current.join(name);

    if is_likely_file(name) {
        ops.push(FsOp {
            op: OpKind::WriteFile,
            path: child_path.to_string_lossy().into_owned(),
            bytes: Some(0),
            content: Some(node.data.content.clone().unwrap_or_default()),
        });
    } else {
        ops.push(FsOp {
            op: OpKind::Mkdir,
            path: child_path.to_string_lossy().into_owned(),
            bytes: None,
            content: None,
        });
        for child_id in &node.children {
            flatten_internal(tree, child_id, &child_path, ops);
        }
    }
}

/// Single entry point over both tree shapes.
pub fn operations_from_source(source: &TreeSource, base_path: &Path) -> Vec<FsOp> {
    match source {
        TreeSource::Parsed(root) => tree_to_operations(root, base_path),
        TreeSource::Internal(tree) => internal_tree_to_operations(tree, base_path),
    }
}

fn path_depth(path: &str) -> usize {
    Path::new(path).components().count()
}

/// Annotate operations with current-state facts without touching disk.
/// The snapshot has no staleness protection: it is a preview, and external
/// changes between plan and apply will not be detected here.
pub fn build_plan_from_ops(ops: &[FsOp], output_dir: &Path) -> PlanResult {
    let operations: Vec<PlanOperation> = ops
        .iter()
        .map(|op| {
            let exists = Path::new(&op.path).exists();
            let will_overwrite = op.op == OpKind::WriteFile && exists;
            let bytes = match op.op {
                OpKind::WriteFile => op
                    .content
                    .as_ref()
                    .map(|c| c.len() as u64)
                    .or(op.bytes)
                    .unwrap_or(0),
                OpKind::Mkdir => 0,
            };
            PlanOperation {
                op: op.op,
                path: op.path.clone(),
                exists,
                will_overwrite,
                bytes,
            }
        })
        .collect();

    let mut stats = PlanStats::default();
    for op in &operations {
        stats.total += 1;
        match op.op {
            OpKind::Mkdir => stats.dirs += 1,
            OpKind::WriteFile => {
                stats.files += 1;
                stats.estimated_bytes += op.bytes;
            }
        }
        if op.will_overwrite {
            stats.overwrite_count += 1;
        }
    }

    // Deeper paths first so rollback removes children before parents.
    let mut delete_paths: Vec<String> = operations
        .iter()
        .filter(|op| !op.exists)
        .map(|op| op.path.clone())
        .collect();
    delete_paths.sort_by_key(|p| std::cmp::Reverse(path_depth(p)));

    info!(
        total = stats.total,
        overwrites = stats.overwrite_count,
        "plan built"
    );

    PlanResult {
        output_dir: output_dir.to_string_lossy().into_owned(),
        operations,
        stats,
        rollback: RollbackHint {
            delete_paths,
            note: ROLLBACK_NOTE.to_string(),
        },
    }
}

/// Apply operations in order. Directory creation is idempotent and always
/// counted; existing files are silently skipped unless overwriting is
/// enabled. The first I/O failure aborts the batch; nothing already applied
/// is undone.
pub fn apply_operations(ops: &[FsOp], options: &ApplyOptions) -> Result<usize, AppError> {
    let mut created = 0usize;

    for op in ops {
        let path = Path::new(&op.path);
        match op.op {
            OpKind::Mkdir => {
                fs::create_dir_all(path).map_err(|source| AppError::FileOperation {
                    path: path.to_path_buf(),
                    source,
                })?;
                created += 1;
            }
            OpKind::WriteFile => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|source| AppError::FileOperation {
                        path: path.to_path_buf(),
                        source,
                    })?;
                }
                if !options.overwrite_files && path.exists() {
                    debug!(path = %path.display(), "skipping existing file");
                    continue;
                }
                fs::write(path, op.content.as_deref().unwrap_or("")).map_err(|source| {
                    AppError::FileOperation {
                        path: path.to_path_buf(),
                        source,
                    }
                })?;
                created += 1;
            }
        }
    }

    info!(created, total = ops.len(), "operations applied");
    Ok(created)
}

/// Normalize, parse and plan in one step for raw text input.
pub fn build_plan_from_text(text: &str, output_dir: &Path) -> Result<PlanResult, AppError> {
    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "text must be provided to build plan".to_string(),
        ));
    }

    let lines = normalize_tree_text(text);
    let tree = parse_tree_structure(&lines);
    let ops = tree_to_operations(&tree, output_dir);
    Ok(build_plan_from_ops(&ops, output_dir))
}
