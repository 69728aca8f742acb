//! Schema registry: the live type hierarchy that extraction extends.
//!
//! `SchemaRegistry` is the operational contract the extraction engine relies
//! on. `SchemaManager` is the YAML-backed store used by the CLI; it keeps the
//! document's key order and any keys it does not understand.

use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, SysbioError};

/// Options for a single `add_child` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildSpec {
    pub inherit_properties: bool,
    pub properties: BTreeMap<String, String>,
    /// Defaults to the child name.
    pub input_label: Option<String>,
}

impl Default for ChildSpec {
    fn default() -> Self {
        Self {
            inherit_properties: true,
            properties: BTreeMap::new(),
            input_label: None,
        }
    }
}

/// What `add_child` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The child already existed and was replaced.
    Overwritten,
}

/// A mutable type hierarchy.
///
/// `add_child` must fail with [`SysbioError::UnknownParent`] when `parent` is
/// not yet a known type, and must overwrite (not fail) when `child` exists.
pub trait SchemaRegistry {
    fn contains(&self, type_name: &str) -> bool;

    fn add_child(&mut self, parent: &str, child: &str, spec: ChildSpec) -> Result<AddOutcome>;
}

/// `input_label` is a single label or a list of labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputLabel {
    One(String),
    Many(Vec<String>),
}

/// One type definition in the schema document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_a: Option<String>,
    #[serde(default = "default_inherit")]
    pub inherit_properties: bool,
    #[serde(default = "default_represented_as")]
    pub represented_as: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_label: Option<InputLabel>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
    /// Keys this crate does not interpret, kept verbatim.
    #[serde(flatten)]
    pub extra: Mapping,
}

fn default_inherit() -> bool {
    true
}

fn default_represented_as() -> String {
    "node".to_string()
}

/// YAML-backed schema store.
#[derive(Debug, Clone)]
pub struct SchemaManager {
    path: Option<PathBuf>,
    schema: Mapping,
}

impl SchemaManager {
    /// Load a schema file. Relative paths resolve against the current directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut path = path.as_ref().to_path_buf();
        if !path.is_absolute() {
            path = std::env::current_dir()?.join(path);
        }
        if !path.exists() {
            return Err(SysbioError::Config(format!(
                "Schema file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        let mut manager = Self::from_yaml_str(&content)?;
        manager.path = Some(path);

        log::info!(
            "Loaded schema from {} ({} types)",
            manager.path.as_deref().map(|p| p.display().to_string()).unwrap_or_default(),
            manager.len()
        );
        Ok(manager)
    }

    /// Parse a schema document held in memory.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let schema = match serde_yaml_ng::from_str::<Value>(content)? {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => {
                return Err(SysbioError::Config(
                    "Schema document must be a mapping of type names".to_string(),
                ))
            }
        };
        Ok(Self { path: None, schema })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.schema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }

    /// Declare several children of the same parent. Stops at the first rejection.
    pub fn add_children<I, S>(&mut self, parent: &str, children: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, ChildSpec)>,
        S: AsRef<str>,
    {
        for (child, spec) in children {
            self.add_child(parent, child.as_ref(), spec)?;
        }
        Ok(())
    }

    /// Remove a type. Returns whether it existed.
    pub fn remove_child(&mut self, child: &str) -> bool {
        if self.schema.remove(child).is_some() {
            log::info!("Removed schema type: {}", child);
            true
        } else {
            log::warn!("Schema type '{}' not found", child);
            false
        }
    }

    /// Typed view of one definition.
    pub fn get_node(&self, name: &str) -> Result<Option<NodeDefinition>> {
        match self.schema.get(name) {
            Some(value) => Ok(Some(serde_yaml_ng::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Direct children of `parent`, in document order.
    pub fn get_children(&self, parent: &str) -> Vec<String> {
        self.schema
            .iter()
            .filter(|(_, def)| def.get("is_a").and_then(Value::as_str) == Some(parent))
            .filter_map(|(name, _)| name.as_str().map(str::to_string))
            .collect()
    }

    /// All type names, optionally only those `represented_as` the given kind.
    pub fn list_nodes(&self, represented_as: Option<&str>) -> Vec<String> {
        self.schema
            .iter()
            .filter(|(_, def)| match represented_as {
                Some(kind) => def.get("represented_as").and_then(Value::as_str) == Some(kind),
                None => true,
            })
            .filter_map(|(name, _)| name.as_str().map(str::to_string))
            .collect()
    }

    /// Write the schema. `output` defaults to the path it was loaded from.
    /// With `backup`, an existing target is first renamed to `*.yaml.bak`.
    pub fn save(&self, output: Option<&Path>, backup: bool) -> Result<PathBuf> {
        let mut target = match output {
            Some(p) => p.to_path_buf(),
            None => self.path.clone().ok_or_else(|| {
                SysbioError::InvalidInput("Schema has no path to save to".to_string())
            })?,
        };
        if !target.is_absolute() {
            target = std::env::current_dir()?.join(target);
        }

        if backup && target.exists() {
            let backup_path = target.with_extension("yaml.bak");
            std::fs::rename(&target, &backup_path)?;
            log::info!("Schema backup created: {}", backup_path.display());
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(&self.schema)?;
        std::fs::write(&target, yaml)?;
        log::info!("Schema saved to: {}", target.display());
        Ok(target)
    }

    /// Text tree of root types (no `is_a`) and their descendants.
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        for (name, def) in self.schema.iter() {
            let Some(name) = name.as_str() else { continue };
            if def.get("is_a").is_none() {
                out.push_str(&format!("{} [{}]\n", name, represented_as(def)));
                self.render_children(name, 2, &mut out, &mut vec![name.to_string()]);
            }
        }
        out
    }

    fn render_children(&self, parent: &str, indent: usize, out: &mut String, seen: &mut Vec<String>) {
        for child in self.get_children(parent) {
            if seen.contains(&child) {
                continue;
            }
            let Some(def) = self.schema.get(child.as_str()) else { continue };
            let props = def
                .get("properties")
                .and_then(Value::as_mapping)
                .map(|m| {
                    m.keys()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .filter(|s| !s.is_empty())
                .map(|s| format!(" ({})", s))
                .unwrap_or_default();
            out.push_str(&format!(
                "{}├─ {} [{}]{}\n",
                " ".repeat(indent),
                child,
                represented_as(def),
                props
            ));
            seen.push(child.clone());
            self.render_children(&child, indent + 2, out, seen);
        }
    }
}

fn represented_as(def: &Value) -> &str {
    def.get("represented_as").and_then(Value::as_str).unwrap_or("unknown")
}

impl Default for SchemaManager {
    fn default() -> Self {
        Self {
            path: None,
            schema: Mapping::new(),
        }
    }
}

impl SchemaRegistry for SchemaManager {
    fn contains(&self, type_name: &str) -> bool {
        self.schema.contains_key(type_name)
    }

    fn add_child(&mut self, parent: &str, child: &str, spec: ChildSpec) -> Result<AddOutcome> {
        let Some(parent_def) = self.schema.get(parent) else {
            return Err(SysbioError::UnknownParent {
                parent: parent.to_string(),
                child: child.to_string(),
            });
        };

        let definition = NodeDefinition {
            is_a: Some(parent.to_string()),
            inherit_properties: spec.inherit_properties,
            represented_as: parent_def
                .get("represented_as")
                .and_then(Value::as_str)
                .unwrap_or("node")
                .to_string(),
            input_label: Some(InputLabel::One(
                spec.input_label.unwrap_or_else(|| child.to_string()),
            )),
            properties: spec.properties,
            extra: Mapping::new(),
        };

        let value = serde_yaml_ng::to_value(&definition)?;
        let outcome = match self.schema.insert(Value::String(child.to_string()), value) {
            Some(_) => {
                log::warn!("Overwriting existing schema type '{}'", child);
                AddOutcome::Overwritten
            }
            None => AddOutcome::Added,
        };
        log::debug!("Schema type added: {} (child of {})", child, parent);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASE_SCHEMA: &str = r#"
physical entity:
  represented_as: node
  input_label: physical entity
  preferred_id: sbgn_id
process:
  represented_as: node
  input_label: process
modifier:
  represented_as: edge
  input_label: modifier
"#;

    fn base() -> SchemaManager {
        SchemaManager::from_yaml_str(BASE_SCHEMA).unwrap()
    }

    #[test]
    fn test_add_child_inherits_representation() {
        let mut schema = base();
        let outcome = schema
            .add_child("modifier", "inhibition", ChildSpec::default())
            .unwrap();
        assert_eq!(outcome, AddOutcome::Added);

        let def = schema.get_node("inhibition").unwrap().unwrap();
        assert_eq!(def.is_a.as_deref(), Some("modifier"));
        assert_eq!(def.represented_as, "edge");
        assert!(def.inherit_properties);
        assert_eq!(def.input_label, Some(InputLabel::One("inhibition".to_string())));
    }

    #[test]
    fn test_add_child_unknown_parent_rejected() {
        let mut schema = base();
        let err = schema
            .add_child("macromolecule", "information macromolecule", ChildSpec::default())
            .unwrap_err();
        assert!(matches!(err, SysbioError::UnknownParent { .. }));
        assert!(!schema.contains("information macromolecule"));
    }

    #[test]
    fn test_add_child_overwrite_is_not_an_error() {
        let mut schema = base();
        schema.add_child("physical entity", "macromolecule", ChildSpec::default()).unwrap();
        let spec = ChildSpec {
            properties: BTreeMap::from([("weight".to_string(), "float".to_string())]),
            ..Default::default()
        };
        let outcome = schema.add_child("physical entity", "macromolecule", spec).unwrap();
        assert_eq!(outcome, AddOutcome::Overwritten);
        let def = schema.get_node("macromolecule").unwrap().unwrap();
        assert_eq!(def.properties.get("weight").map(String::as_str), Some("float"));
    }

    #[test]
    fn test_children_and_listing() {
        let mut schema = base();
        schema
            .add_children(
                "physical entity",
                vec![
                    ("macromolecule", ChildSpec::default()),
                    ("simple chemical", ChildSpec::default()),
                ],
            )
            .unwrap();
        assert_eq!(
            schema.get_children("physical entity"),
            vec!["macromolecule".to_string(), "simple chemical".to_string()]
        );
        assert_eq!(schema.list_nodes(Some("edge")), vec!["modifier".to_string()]);
        assert_eq!(schema.list_nodes(None).len(), 5);

        assert!(schema.remove_child("simple chemical"));
        assert!(!schema.remove_child("simple chemical"));
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn test_unknown_keys_preserved() {
        let schema = base();
        let def = schema.get_node("physical entity").unwrap().unwrap();
        assert_eq!(def.is_a, None);
        assert_eq!(
            def.extra.get("preferred_id").and_then(Value::as_str),
            Some("sbgn_id")
        );
    }

    #[test]
    fn test_render_tree() {
        let mut schema = base();
        schema.add_child("physical entity", "macromolecule", ChildSpec::default()).unwrap();
        schema
            .add_child("macromolecule", "information macromolecule", ChildSpec::default())
            .unwrap();
        let tree = schema.render_tree();
        assert!(tree.contains("physical entity [node]"));
        assert!(tree.contains("  ├─ macromolecule [node]"));
        assert!(tree.contains("    ├─ information macromolecule [node]"));
        assert!(tree.contains("modifier [edge]"));
    }

    #[test]
    fn test_save_and_reload_with_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config").join("schema.yaml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, BASE_SCHEMA).unwrap();

        let mut schema = SchemaManager::load(&path).unwrap();
        schema.add_child("process", "transport", ChildSpec::default()).unwrap();
        let saved = schema.save(None, true).unwrap();
        assert_eq!(saved, path);
        assert!(temp_dir.path().join("config").join("schema.yaml.bak").exists());

        let reloaded = SchemaManager::load(&path).unwrap();
        assert!(reloaded.contains("transport"));
        assert_eq!(reloaded.list_nodes(None)[0], "physical entity");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = SchemaManager::load(temp_dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(SysbioError::Config(_))));
    }

    #[test]
    fn test_empty_document_is_empty_schema() {
        let schema = SchemaManager::from_yaml_str("").unwrap();
        assert!(schema.is_empty());
        assert!(SchemaManager::from_yaml_str("- a\n- b\n").is_err());
    }
}
