//! Namespaced node/edge streams and the JSONL graph sink.

use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{GraphExtraction, PropertyMap};
use crate::error::Result;

pub const NODES_FILE: &str = "nodes.jsonl";
pub const EDGES_FILE: &str = "edges.jsonl";

/// A node as handed to a graph store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub id: String,
    pub label: String,
    pub properties: PropertyMap,
}

/// An edge as handed to a graph store. `source` and `target` are namespaced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRecord {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    pub properties: PropertyMap,
}

impl GraphExtraction {
    /// Namespaced nodes in insertion order. Can be called any number of times.
    pub fn node_records(&self) -> impl Iterator<Item = NodeRecord> + '_ {
        let ns = self.namespace();
        self.nodes().iter().map(move |node| NodeRecord {
            id: ns.qualify(&node.local_id),
            label: node.canonical_type.clone(),
            properties: node.properties.clone(),
        })
    }

    /// Namespaced edges in insertion order.
    pub fn edge_records(&self) -> impl Iterator<Item = EdgeRecord> + '_ {
        let ns = self.namespace();
        self.edges().iter().map(move |edge| EdgeRecord {
            id: ns.qualify(&edge.local_id),
            source: ns.qualify(&edge.source_local_id),
            target: ns.qualify(&edge.target_local_id),
            label: edge.canonical_type.clone(),
            properties: edge.properties.clone(),
        })
    }
}

/// Downstream consumer of finished graphs.
pub trait GraphSink {
    fn write_node(&mut self, node: &NodeRecord) -> Result<()>;

    fn write_edge(&mut self, edge: &EdgeRecord) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Push every node, then every edge, of `graph` into `sink`.
pub fn emit(graph: &GraphExtraction, sink: &mut dyn GraphSink) -> Result<(usize, usize)> {
    let mut nodes = 0;
    for node in graph.node_records() {
        sink.write_node(&node)?;
        nodes += 1;
    }
    let mut edges = 0;
    for edge in graph.edge_records() {
        sink.write_edge(&edge)?;
        edges += 1;
    }
    sink.flush()?;
    Ok((nodes, edges))
}

/// Appends one JSON object per line to `nodes.jsonl` and `edges.jsonl`.
pub struct JsonlSink {
    dir: PathBuf,
    nodes: BufWriter<File>,
    edges: BufWriter<File>,
}

impl JsonlSink {
    /// Open (or create) both files under `dir`, creating the directory if needed.
    pub fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let open = |name: &str| -> Result<BufWriter<File>> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(name))?;
            Ok(BufWriter::new(file))
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            nodes: open(NODES_FILE)?,
            edges: open(EDGES_FILE)?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl GraphSink for JsonlSink {
    fn write_node(&mut self, node: &NodeRecord) -> Result<()> {
        serde_json::to_writer(&mut self.nodes, node)?;
        self.nodes.write_all(b"\n")?;
        Ok(())
    }

    fn write_edge(&mut self, edge: &EdgeRecord) -> Result<()> {
        serde_json::to_writer(&mut self.edges, edge)?;
        self.edges.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.nodes.flush()?;
        self.edges.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ExtractionOptions, FixedToken};
    use crate::model::{Compartment, EntityPool, SourceModel};
    use tempfile::TempDir;

    fn sample() -> GraphExtraction {
        let model = SourceModel {
            compartments: vec![Compartment {
                id: Some("C1".to_string()),
                ..Default::default()
            }],
            entity_pools: vec![EntityPool {
                id: Some("E1".to_string()),
                class: "macromolecule".to_string(),
                compartment: Some("C1".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        GraphExtraction::extract(
            &model,
            &ExtractionOptions::default(),
            None,
            &mut FixedToken("tok".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_records_are_namespaced_and_reiterable() {
        let graph = sample();
        let first: Vec<_> = graph.node_records().collect();
        let second: Vec<_> = graph.node_records().collect();
        assert_eq!(first, second);
        assert_eq!(first[0].id, "tok_model");
        assert_eq!(first[0].label, "model");

        for edge in graph.edge_records() {
            assert!(edge.id.starts_with("tok_"));
            assert!(edge.source.starts_with("tok_"));
            assert!(edge.target.starts_with("tok_"));
        }
        let contained = graph
            .edge_records()
            .find(|e| e.label == "contained entity")
            .unwrap();
        assert_eq!(contained.source, "tok_E1");
        assert_eq!(contained.target, "tok_C1");
    }

    #[test]
    fn test_jsonl_sink_appends() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("graph");
        let graph = sample();

        for _ in 0..2 {
            let mut sink = JsonlSink::create(&out).unwrap();
            let (nodes, edges) = emit(&graph, &mut sink).unwrap();
            assert_eq!(nodes, 3);
            assert_eq!(edges, 3);
        }

        let nodes = fs::read_to_string(out.join(NODES_FILE)).unwrap();
        assert_eq!(nodes.lines().count(), 6);
        let first: serde_json::Value = serde_json::from_str(nodes.lines().next().unwrap()).unwrap();
        assert_eq!(first["id"], "tok_model");
        assert_eq!(first["properties"]["source_format"], "unknown");

        let edges = fs::read_to_string(out.join(EDGES_FILE)).unwrap();
        assert_eq!(edges.lines().count(), 6);
        let edge: serde_json::Value = serde_json::from_str(edges.lines().next().unwrap()).unwrap();
        assert!(edge["source"].as_str().unwrap().starts_with("tok_"));
    }
}
