use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, SysbioError};

/// Extensions treated as model documents (case-insensitive).
pub const MODEL_EXTENSIONS: &[&str] = &["sbgn", "sbml", "xml"];

pub fn is_model_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| MODEL_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recursively list model documents under `root`, sorted by path.
///
/// A `root` that is itself a file is returned as-is, whatever its extension.
pub fn discover_models(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(SysbioError::ModelNotFound(root.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_model_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    log::info!("Discovered {} model files in {}", files.len(), root.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_models() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("maps/nested")).unwrap();
        fs::write(root.join("b.sbml"), "<sbml/>").unwrap();
        fs::write(root.join("a.SBGN"), "<sbgn/>").unwrap();
        fs::write(root.join("maps/nested/c.xml"), "<sbml/>").unwrap();
        fs::write(root.join("README.md"), "# Models").unwrap();
        fs::write(root.join("schema.yaml"), "a: b").unwrap();

        let files = discover_models(root).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.SBGN", "b.sbml", "maps/nested/c.xml"]);
    }

    #[test]
    fn test_discover_single_file_and_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("model.txt");
        fs::write(&file, "x").unwrap();
        assert_eq!(discover_models(&file).unwrap(), vec![file]);

        let missing = temp_dir.path().join("missing");
        assert!(matches!(discover_models(&missing), Err(SysbioError::ModelNotFound(_))));
    }

    #[test]
    fn test_discover_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(discover_models(temp_dir.path()).unwrap().is_empty());
    }
}
