//! Name classification.
//!
//! The organizer consumes classification through the `Classifier` trait and
//! treats it as a best-effort enrichment. `LocalClassifier` is the shipped
//! keyword heuristic; remote/model-backed implementations live with the
//! embedding application.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

const KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Code",
        &[
            "script", "manager", "controller", ".cs", ".js", ".ts", ".tsx", ".py", ".java",
            ".cpp", ".go", ".rs",
        ],
    ),
    (
        "Graphics",
        &[
            "button", "logo", "icon", "sprite", "canvas", ".png", ".jpg", ".jpeg", ".webp",
            ".svg", ".psd", ".ai",
        ],
    ),
    ("Audio", &["sound", "music", ".mp3", ".wav", ".flac", ".ogg", ".m4a"]),
    ("Video", &[".mp4", ".mov", ".mkv", ".avi", ".webm"]),
    (
        "Documents",
        &[
            "faktura", "podatek", "rachunek", "umowa", ".pdf", ".doc", ".docx", ".txt", ".md",
            ".xlsx", ".csv",
        ],
    ),
    (
        "Game",
        &[
            "boss", "arena", "enemy", "player", "level", "quest", "weapon", "shader", "unity",
            "unreal",
        ],
    ),
    ("Archives", &[".zip", ".rar", ".7z", ".tar", ".gz"]),
];

const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("js", "JavaScript"),
    ("jsx", "JavaScript"),
    ("ts", "TypeScript"),
    ("tsx", "TypeScript"),
    ("py", "Python"),
    ("java", "Java"),
    ("cpp", "C++"),
    ("c", "C"),
    ("cs", "C#"),
    ("go", "Go"),
    ("rs", "Rust"),
    ("php", "PHP"),
    ("rb", "Ruby"),
    ("swift", "Swift"),
    ("kt", "Kotlin"),
    ("scala", "Scala"),
];

const SEMANTIC_TYPES: &[(&str, &[&str])] = &[
    (
        "code",
        &[
            "src", "lib", "server", "client", "api", "routes", "controllers", "models", "views",
            "components", "utils", "helpers", "services",
        ],
    ),
    (
        "tests",
        &["test", "tests", "__tests__", "spec", "specs", "e2e", "integration", "unit"],
    ),
    ("config", &["config", "conf", "settings", ".vscode", ".idea", ".git"]),
    ("docs", &["docs", "documentation", "readme", "changelog", "license"]),
    ("build", &["dist", "build", "out", "target", "release", "bin", "obj"]),
    (
        "assets",
        &["assets", "static", "public", "resources", "images", "fonts", "styles", "css"],
    ),
    ("data", &["data", "db", "database", "migrations", "seeds", "fixtures"]),
    ("logs", &["logs", "log", ".log"]),
    (
        "cache",
        &["cache", ".cache", "tmp", "temp", "node_modules", ".venv", "__pycache__"],
    ),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResult {
    pub category: String,
    pub confidence: f64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
}

/// Classify a file or folder name. Implementations should return a fallback
/// category with low confidence rather than failing on ambiguous input; the
/// organizer tolerates errors anyway and records the entry unclassified.
pub trait Classifier {
    fn classify(&self, name: &str) -> Result<ClassifyResult, AppError>;
}

fn detect_language(title: &str) -> Option<String> {
    let ext = Path::new(title).extension()?.to_string_lossy().to_lowercase();
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, language)| language.to_string())
}

fn detect_semantic_type(title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    SEMANTIC_TYPES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(semantic_type, _)| semantic_type.to_string())
}

fn detect_framework(title: &str) -> Option<String> {
    let lower = title.to_lowercase();
    if lower.contains("react") || lower.contains(".tsx") {
        return Some("React".to_string());
    }
    if lower.contains("vue") {
        return Some("Vue".to_string());
    }
    if lower.contains("angular") {
        return Some("Angular".to_string());
    }
    if lower.contains("next") {
        return Some("Next.js".to_string());
    }
    if lower.contains("express") {
        return Some("Express".to_string());
    }
    if lower.contains("django") {
        return Some("Django".to_string());
    }
    if lower.contains("flask") {
        return Some("Flask".to_string());
    }
    if lower.contains("spring") {
        return Some("Spring".to_string());
    }
    None
}

/// Keyword-table classifier. Never fails for non-empty input.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClassifier;

impl Classifier for LocalClassifier {
    fn classify(&self, name: &str) -> Result<ClassifyResult, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::Validation(
                "Title must be a non-empty string".to_string(),
            ));
        }

        let lower = name.to_lowercase();
        let language = detect_language(name);
        let semantic_type = detect_semantic_type(name);
        let framework = detect_framework(name);

        for (category, keywords) in KEYWORDS {
            if keywords.iter().any(|k| lower.contains(k)) {
                return Ok(ClassifyResult {
                    category: category.to_string(),
                    confidence: 0.7,
                    source: "local".to_string(),
                    language,
                    semantic_type,
                    framework,
                });
            }
        }

        Ok(ClassifyResult {
            category: "Uncategorized".to_string(),
            confidence: 0.1,
            source: "local".to_string(),
            language,
            semantic_type,
            framework,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str) -> ClassifyResult {
        LocalClassifier.classify(name).unwrap()
    }

    #[test]
    fn code_files_are_recognized_with_language() {
        let result = classify("PlayerController.cs");
        assert_eq!(result.category, "Code");
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.source, "local");
        assert_eq!(result.language.as_deref(), Some("C#"));
    }

    #[test]
    fn graphics_and_audio_by_extension() {
        assert_eq!(classify("logo.png").category, "Graphics");
        assert_eq!(classify("theme.mp3").category, "Audio");
        assert_eq!(classify("clip.mp4").category, "Video");
        assert_eq!(classify("backup.zip").category, "Archives");
    }

    #[test]
    fn semantic_type_from_path_keywords() {
        assert_eq!(classify("server.js").semantic_type.as_deref(), Some("code"));
        assert_eq!(classify("README.md").semantic_type.as_deref(), Some("docs"));
        assert_eq!(
            classify("fixtures").semantic_type.as_deref(),
            Some("data")
        );
    }

    #[test]
    fn framework_detection() {
        assert_eq!(classify("App.tsx").framework.as_deref(), Some("React"));
        assert_eq!(
            classify("vue.config.mjs").framework.as_deref(),
            Some("Vue")
        );
        assert!(classify("plain.txt").framework.is_none());
    }

    #[test]
    fn unknown_names_fall_back_with_low_confidence() {
        let result = classify("zzz");
        assert_eq!(result.category, "Uncategorized");
        assert_eq!(result.confidence, 0.1);
    }

    #[test]
    fn empty_title_is_a_validation_error() {
        let err = LocalClassifier.classify("  ").unwrap_err();
        assert_eq!(err.kind(), "VALIDATION_ERROR");
    }

    #[test]
    fn result_serializes_with_wire_field_names() {
        let json = serde_json::to_value(classify("server.js")).unwrap();
        assert_eq!(json["semanticType"], "code");
        assert_eq!(json["source"], "local");
    }
}
