//! Knowledge graph module: canonical node/edge records and their extraction
//! from a parsed source model.
//!
//! `GraphExtraction` runs once per document and is read-only afterwards;
//! `projection` turns it into namespaced node and edge streams for a sink.

pub mod annotations;
mod extraction;
pub mod hierarchy;
pub mod namespace;
pub mod projection;

pub use extraction::{ExtractionOptions, GraphExtraction, DEFAULT_COMPARTMENT_ID, ROOT_FALLBACK_ID};
pub use namespace::{FixedToken, Namespace, RandomTokens, TokenSource};
pub use projection::{emit, EdgeRecord, GraphSink, JsonlSink, NodeRecord};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A flat property value. No nested objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
    TextList(Vec<String>),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Number(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::TextList(value)
    }
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            PropertyValue::TextList(v) => Some(v),
            _ => None,
        }
    }
}

pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// What a node stands for in the source model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Model,
    Entity,
    Process,
    Compartment,
}

impl NodeRole {
    /// Edge type linking a node of this role to the root model node.
    pub fn containment_type(&self) -> Option<&'static str> {
        match self {
            NodeRole::Model => None,
            NodeRole::Entity => Some("entity in model"),
            NodeRole::Process => Some("process in model"),
            NodeRole::Compartment => Some("compartment in model"),
        }
    }
}

/// A classified node, identified by its un-namespaced local id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalNode {
    pub local_id: String,
    pub canonical_type: String,
    pub properties: PropertyMap,
    pub role: NodeRole,
}

/// A classified edge between two nodes of the same extraction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEdge {
    pub local_id: String,
    pub source_local_id: String,
    pub target_local_id: String,
    pub canonical_type: String,
    pub properties: PropertyMap,
}
