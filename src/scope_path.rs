//! Path guard for every operation that touches disk.
//!
//! Normalization is purely lexical: `.` and `..` segments are resolved
//! against the path string itself, never against symlinks on disk.

use std::path::{Component, Path, PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Dir,
    Any,
}

/// Resolve `.`/`..` segments without touching the filesystem. Leading parent
/// segments that cannot be popped are kept, so the traversal check below can
/// still see them.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn absolutize(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        Ok(lexical_normalize(path))
    } else {
        Ok(lexical_normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Normalize and validate a path to prevent directory traversal.
///
/// With `allowed_base`, the input is resolved relative to the base and must
/// stay inside it. Containment is component-wise, so a sibling like
/// `/base-evil` is never treated as inside `/base`.
pub fn secure_path(input: &str, allowed_base: Option<&Path>) -> Result<PathBuf, AppError> {
    let normalized = lexical_normalize(Path::new(input));

    let escapes = normalized
        .components()
        .any(|c| matches!(c, Component::ParentDir));
    if escapes || input.starts_with('~') {
        return Err(AppError::PathTraversal(input.to_string()));
    }

    match allowed_base {
        Some(base) => {
            let resolved_base = absolutize(base)?;
            let resolved = if normalized.is_absolute() {
                normalized
            } else {
                resolved_base.join(&normalized)
            };

            if resolved != resolved_base && !resolved.starts_with(&resolved_base) {
                return Err(AppError::PathOutOfBounds(
                    resolved.to_string_lossy().into_owned(),
                ));
            }
            Ok(resolved)
        }
        None => absolutize(&normalized),
    }
}

/// Check that a path exists and is of the expected kind. Runs before any
/// mutating scan/cleanup/organize entry point.
pub fn validate_path_exists(path: &Path, expected: PathKind) -> Result<(), AppError> {
    let metadata = std::fs::metadata(path)
        .map_err(|_| AppError::PathNotFound(path.to_string_lossy().into_owned()))?;

    match expected {
        PathKind::File if !metadata.is_file() => Err(AppError::InvalidPathType(format!(
            "Expected file but got directory: {}",
            path.display()
        ))),
        PathKind::Dir if !metadata.is_dir() => Err(AppError::InvalidPathType(format!(
            "Expected directory but got file: {}",
            path.display()
        ))),
        _ => Ok(()),
    }
}

/// A name with a trailing alphanumeric extension is treated as a file,
/// everything else as a directory.
pub fn is_likely_file(name: &str) -> bool {
    match name.rfind('.') {
        Some(idx) => {
            let ext = &name[idx + 1..];
            !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}

/// Strip characters that are invalid in file names on common platforms.
pub fn sanitize_filename(filename: &str) -> String {
    let mut out = String::new();
    let mut in_whitespace = false;
    for c in filename.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
                in_whitespace = true;
            }
            continue;
        }
        in_whitespace = false;
        if matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*') {
            out.push('_');
        } else {
            out.push(c);
        }
    }
    out.chars().take(255).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_parent_traversal() {
        let err = secure_path("../../etc/passwd", Some(Path::new("/allowed"))).unwrap_err();
        assert_eq!(err.kind(), "PATH_TRAVERSAL");
    }

    #[test]
    fn rejects_home_shorthand() {
        let err = secure_path("~/secrets", None).unwrap_err();
        assert_eq!(err.kind(), "PATH_TRAVERSAL");
    }

    #[test]
    fn resolves_relative_inside_base() {
        let resolved = secure_path("sub/dir", Some(Path::new("/allowed"))).unwrap();
        assert_eq!(resolved, PathBuf::from("/allowed/sub/dir"));
    }

    #[test]
    fn base_itself_is_allowed() {
        let resolved = secure_path("/allowed", Some(Path::new("/allowed"))).unwrap();
        assert_eq!(resolved, PathBuf::from("/allowed"));
    }

    #[test]
    fn sibling_with_base_prefix_is_out_of_bounds() {
        let err = secure_path("/allowed-evil/x", Some(Path::new("/allowed"))).unwrap_err();
        assert_eq!(err.kind(), "PATH_OUT_OF_BOUNDS");
    }

    #[test]
    fn interior_dot_segments_collapse() {
        let resolved = secure_path("a/./b/../c", Some(Path::new("/allowed"))).unwrap();
        assert_eq!(resolved, PathBuf::from("/allowed/a/c"));
    }

    #[test]
    fn absolute_path_outside_base_rejected() {
        let err = secure_path("/elsewhere/file", Some(Path::new("/allowed"))).unwrap_err();
        assert_eq!(err.kind(), "PATH_OUT_OF_BOUNDS");
    }

    #[test]
    fn validate_exists_distinguishes_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("f.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(validate_path_exists(dir.path(), PathKind::Dir).is_ok());
        assert!(validate_path_exists(&file, PathKind::File).is_ok());
        assert_eq!(
            validate_path_exists(&file, PathKind::Dir)
                .unwrap_err()
                .kind(),
            "INVALID_PATH_TYPE"
        );
        assert_eq!(
            validate_path_exists(&dir.path().join("missing"), PathKind::Any)
                .unwrap_err()
                .kind(),
            "PATH_NOT_FOUND"
        );
    }

    #[test]
    fn likely_file_detection() {
        assert!(is_likely_file("main.rs"));
        assert!(is_likely_file("archive.tar.gz"));
        assert!(is_likely_file(".gitignore"));
        assert!(!is_likely_file("src"));
        assert!(!is_likely_file("trailing."));
        assert!(!is_likely_file("node_modules"));
    }

    #[test]
    fn sanitize_replaces_invalid_and_whitespace() {
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
        assert_eq!(sanitize_filename("my  report.pdf"), "my_report.pdf");
        assert_eq!(sanitize_filename("q?:*"), "q___");
    }
}
