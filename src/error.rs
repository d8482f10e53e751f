use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid path: directory traversal not allowed ({0})")]
    PathTraversal(String),

    #[error("Path is outside allowed directory: {0}")]
    PathOutOfBounds(String),

    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("{0}")]
    InvalidPathType(String),

    #[error("File operation failed on {}: {source}", path.display())]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Generation failed: {0}")]
    Generation(String),
}

impl AppError {
    /// Stable machine-readable code. The embedding layer switches on this
    /// instead of matching on variants directly.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::PathTraversal(_) => "PATH_TRAVERSAL",
            Self::PathOutOfBounds(_) => "PATH_OUT_OF_BOUNDS",
            Self::PathNotFound(_) => "PATH_NOT_FOUND",
            Self::InvalidPathType(_) => "INVALID_PATH_TYPE",
            Self::FileOperation { .. } => "FILE_OP_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serde(_) => "SERDE_ERROR",
            Self::Generation(_) => "GENERATION_FAILED",
        }
    }

    /// Status-equivalent severity for the embedding layer.
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::PathTraversal(_)
            | Self::PathOutOfBounds(_)
            | Self::InvalidPathType(_) => 400,
            Self::PathNotFound(_) => 404,
            Self::FileOperation { .. } | Self::Io(_) | Self::Serde(_) => 500,
            Self::Generation(_) => 502,
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AppError", 2)?;
        state.serialize_field("kind", self.kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_status_mapping() {
        let err = AppError::Validation("text must be provided".into());
        assert_eq!(err.kind(), "VALIDATION_ERROR");
        assert_eq!(err.status(), 400);

        let err = AppError::PathNotFound("/missing".into());
        assert_eq!(err.kind(), "PATH_NOT_FOUND");
        assert_eq!(err.status(), 404);

        let err = AppError::FileOperation {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.kind(), "FILE_OP_ERROR");
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn serializes_kind_and_message() {
        let err = AppError::PathTraversal("../etc".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "PATH_TRAVERSAL");
        assert!(json["message"].as_str().unwrap().contains("../etc"));
    }
}
