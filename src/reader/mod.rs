//! Model parser: turns an SBGN-ML or SBML file into a [`SourceModel`].

pub mod sbgn;
pub mod sbml;
pub mod walker;
pub mod xml;

pub use walker::discover_models;
pub use xml::{XmlDocument, XmlElement};

use std::path::Path;

use crate::error::{Result, SysbioError};
use crate::model::{ModelFormat, SourceModel};

/// A reader for one document format, selected by root element name.
pub trait ModelReader {
    /// Check if this reader handles documents with the given root local name
    fn can_read(&self, root_tag: &str) -> bool;

    fn format(&self) -> ModelFormat;

    fn read(&self, doc: &XmlDocument) -> Result<SourceModel>;
}

/// Reader registry that sniffs the document root
pub struct ReaderRegistry {
    readers: Vec<Box<dyn ModelReader>>,
}

impl ReaderRegistry {
    /// Registry with the SBGN-ML and SBML readers
    pub fn new() -> Self {
        let mut registry = Self { readers: Vec::new() };
        registry.register(Box::new(sbgn::SbgnReader));
        registry.register(Box::new(sbml::SbmlReader));
        registry
    }

    pub fn register(&mut self, reader: Box<dyn ModelReader>) {
        self.readers.push(reader);
    }

    pub fn find_reader(&self, root_tag: &str) -> Option<&dyn ModelReader> {
        self.readers
            .iter()
            .find(|r| r.can_read(root_tag))
            .map(|r| r.as_ref())
    }

    /// Parse `content` and hand it to the reader matching its root element.
    pub fn read(&self, content: &str) -> Result<SourceModel> {
        let doc = XmlDocument::parse(content)?;
        let root_tag = doc.root().local_name();
        let reader = self.find_reader(root_tag).ok_or_else(|| {
            SysbioError::Parse(format!("Unsupported document root <{}>", root_tag))
        })?;
        reader.read(&doc)
    }
}

impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read and parse one model file. Any failure here is fatal for that document.
pub fn load_model(path: &Path) -> Result<SourceModel> {
    if !path.is_file() {
        return Err(SysbioError::ModelNotFound(path.to_path_buf()));
    }
    log::info!("Loading model from {}", path.display());

    let content = std::fs::read_to_string(path)?;
    let model = ReaderRegistry::new()
        .read(&content)
        .map_err(|e| match e {
            SysbioError::Parse(msg) => SysbioError::Parse(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;

    log::info!(
        "Loaded {} model from {} ({} compartments, {} entities, {} processes, {} arcs)",
        model.format.as_str(),
        path.display(),
        model.compartments.len(),
        model.entity_pools.len(),
        model.processes.len(),
        model.modulations.len()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_registry_sniffs_root() {
        let registry = ReaderRegistry::new();
        assert_eq!(registry.find_reader("sbgn").unwrap().format(), ModelFormat::Sbgn);
        assert_eq!(registry.find_reader("sbml").unwrap().format(), ModelFormat::Sbml);
        assert!(registry.find_reader("html").is_none());

        let err = registry.read("<html><body/></html>").unwrap_err();
        assert!(err.to_string().contains("html"));
    }

    #[test]
    fn test_load_model_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.sbgn");
        assert!(matches!(load_model(&missing), Err(SysbioError::ModelNotFound(_))));
    }

    #[test]
    fn test_load_model_malformed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.xml");
        fs::write(&path, "<sbml><model>").unwrap();
        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, SysbioError::Parse(ref msg) if msg.contains("broken.xml")));
    }

    #[test]
    fn test_load_model_sbml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("m.sbml");
        fs::write(
            &path,
            r#"<sbml><model id="m"><listOfSpecies><species id="s1"/></listOfSpecies></model></sbml>"#,
        )
        .unwrap();
        let model = load_model(&path).unwrap();
        assert_eq!(model.format, ModelFormat::Sbml);
        assert_eq!(model.entity_pools.len(), 1);
    }
}
