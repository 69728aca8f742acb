use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sysbiokg
#[derive(Error, Debug)]
pub enum SysbioError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema registry (de)serialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Graph sink serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Source document could not be found on disk
    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// Malformed or unsupported source document
    #[error("Parse error: {0}")]
    Parse(String),

    /// Schema registry refused a declaration because the parent type is unknown.
    /// Raised when the ancestor-before-descendant order was violated.
    #[error("Parent type '{parent}' not found in schema while declaring '{child}'")]
    UnknownParent { parent: String, child: String },

    /// A parent chain in the static type mapping does not terminate
    #[error("Type hierarchy does not terminate starting from '{0}'")]
    HierarchyCycle(String),

    /// Notes payload could not be decoded
    #[error("Notes error: {0}")]
    Notes(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using SysbioError
pub type Result<T> = std::result::Result<T, SysbioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SysbioError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_unknown_parent_names_both_types() {
        let err = SysbioError::UnknownParent {
            parent: "macromolecule".to_string(),
            child: "information macromolecule".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("'macromolecule'"));
        assert!(msg.contains("information macromolecule"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SysbioError = io_err.into();
        assert!(matches!(err, SysbioError::Io(_)));
    }

    #[test]
    fn test_error_from_yaml() {
        let yaml_err = serde_yaml_ng::from_str::<serde_yaml_ng::Mapping>("[unclosed").unwrap_err();
        let err: SysbioError = yaml_err.into();
        assert!(matches!(err, SysbioError::Yaml(_)));
    }
}
