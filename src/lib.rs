//! arborist — turn a textual description of a folder layout into real files
//! and directories, and scan existing trees for cleanup and reorganization.
//!
//! Two engines, usable independently:
//!
//! - **Structure**: parse indented or markdown tree text (or the editor's
//!   id-addressed tree) into ordered filesystem operations, preview them as
//!   a dry-run plan with collision and rollback accounting, and apply them
//!   idempotently.
//! - **Cleanup / organize**: walk a directory collecting empty dirs, large
//!   files, cache dirs and duplicate candidates into an itemized plan;
//!   delete safely deepest-first; or classify entries and propose a
//!   reorganization by semantic type.
//!
//! Everything runs synchronously on the calling thread. Text generation and
//! classification are consumed through the [`TextGenerator`] and
//! [`Classifier`] traits; the crate ships only the local keyword heuristic.

pub mod config;
pub mod error;
pub mod scope_path;
pub mod services;

pub use config::CoreConfig;
pub use error::AppError;
pub use scope_path::{
    is_likely_file, sanitize_filename, secure_path, validate_path_exists, PathKind,
};
pub use services::classifier_service::{Classifier, ClassifyResult, LocalClassifier};
pub use services::cleanup_service::{
    apply_cleanup, scan_cleanup, CleanupItem, CleanupItemType, CleanupOptions, CleanupOutcome,
    CleanupPlan, CleanupSummary, DuplicateStrategy, DEFAULT_CACHE_DIRS, DEFAULT_LARGE_FILE_MB,
};
pub use services::generator_service::{
    generate_structure, plan_from_prompt, TextGenerator, GENERATION_SYSTEM_PROMPT,
};
pub use services::organizer_service::{
    analyze_directory, apply_reorganize_plan, generate_reorganize_plan, FileItem, FileItemType,
    GroupBy, MoveOp, OrganizeOptions, OrganizeResult, OrganizeStats, ReorganizeOutcome,
    ReorganizePlan, DEFAULT_ORGANIZE_DEPTH, DEFAULT_ORGANIZE_EXCLUDES,
};
pub use services::structure_service::{
    apply_operations, build_plan_from_ops, build_plan_from_text, internal_tree_to_operations,
    normalize_tree_text, operations_from_source, parse_tree_structure, tree_to_operations,
    ApplyOptions, FsOp, InternalNode, InternalNodeData, InternalTree, NodeKind, OpKind,
    PlanOperation, PlanResult, PlanStats, RollbackHint, TreeNode, TreeSource,
};
