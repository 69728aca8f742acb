//! Static type mapping: source class names to canonical types.
//!
//! Node-like and edge-like classes live in separate tables. Each entry names
//! the canonical type, its SBO term and the canonical parent type (if any).
//! Parent chains must end at a root within the table size.

use regex::Regex;
use std::sync::OnceLock;

/// A resolved `(type, ontology_term, parent_type)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeMapping {
    pub canonical_type: &'static str,
    pub ontology_term: Option<&'static str>,
    pub parent: Option<&'static str>,
}

struct Entry {
    keys: &'static [&'static str],
    mapping: TypeMapping,
}

const fn entry(
    keys: &'static [&'static str],
    canonical_type: &'static str,
    ontology_term: &'static str,
    parent: Option<&'static str>,
) -> Entry {
    Entry {
        keys,
        mapping: TypeMapping {
            canonical_type,
            ontology_term: Some(ontology_term),
            parent,
        },
    }
}

/// Which of the two tables a lookup goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Node,
    Edge,
}

pub const PHYSICAL_ENTITY: &str = "physical entity";
pub const PROCESS: &str = "process";
pub const COMPARTMENT: &str = "compartment";

static NODE_TABLE: &[Entry] = &[
    entry(&["physical entity"], PHYSICAL_ENTITY, "SBO_0000236", None),
    entry(&["macromolecule"], "macromolecule", "SBO_0000245", Some(PHYSICAL_ENTITY)),
    entry(
        &["nucleic acid feature", "information macromolecule"],
        "information macromolecule",
        "SBO_0000246",
        Some("macromolecule"),
    ),
    entry(&["simple chemical"], "simple chemical", "SBO_0000247", Some(PHYSICAL_ENTITY)),
    entry(&["complex"], "complex", "SBO_0000253", Some(PHYSICAL_ENTITY)),
    entry(
        &["unspecified entity"],
        "unspecified entity",
        "SBO_0000285",
        Some(PHYSICAL_ENTITY),
    ),
    entry(&["perturbing agent"], "perturbing agent", "SBO_0000405", Some(PHYSICAL_ENTITY)),
    entry(&["emptyset", "empty set"], "empty set", "SBO_0000355", Some(PHYSICAL_ENTITY)),
    entry(&["source and sink"], "sink reaction", "SBO_0000632", None),
    entry(&["process"], PROCESS, "SBO_0000375", None),
    entry(&["compartment"], COMPARTMENT, "SBO_0000290", None),
];

static EDGE_TABLE: &[Entry] = &[
    entry(&["consumption"], "consumption", "SBO_0000010", Some("reactant")),
    entry(&["production"], "production", "SBO_0000011", Some("product")),
    entry(&["inhibition"], "inhibition", "SBO_0000169", Some("modifier")),
    entry(
        &["necessary stimulation"],
        "necessary stimulation",
        "SBO_0000171",
        Some("modifier"),
    ),
    entry(&["catalysis"], "catalysis", "SBO_0000172", Some("modifier")),
    entry(&["modulation"], "modulation", "SBO_0000168", Some("modifier")),
    entry(&["stimulation"], "stimulation", "SBO_0000170", Some("modifier")),
    entry(&["reactant"], "reactant", "SBO_0000010", None),
    entry(&["product"], "product", "SBO_0000011", None),
    entry(&["modifier"], "modifier", "SBO_0000019", None),
    entry(&["process"], PROCESS, "SBO_0000375", None),
];

/// Normalize a class key: lower-case, with spaces, `_` and `-` removed.
/// `NecessaryStimulation`, `necessary stimulation` and `necessary_stimulation`
/// all normalize to the same key.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn table(kind: TableKind) -> &'static [Entry] {
    match kind {
        TableKind::Node => NODE_TABLE,
        TableKind::Edge => EDGE_TABLE,
    }
}

fn lookup(kind: TableKind, key: &str) -> Option<TypeMapping> {
    let key = normalize_key(key);
    table(kind)
        .iter()
        .find(|e| e.keys.iter().any(|k| normalize_key(k) == key))
        .map(|e| e.mapping)
}

/// Resolve a node-like source class; unknown classes fall back to `physical entity`.
pub fn resolve_node(class_key: &str) -> TypeMapping {
    lookup(TableKind::Node, class_key).unwrap_or(NODE_TABLE[0].mapping)
}

/// Resolve an edge-like source class; unknown classes fall back to `process`.
pub fn resolve_edge(class_key: &str) -> TypeMapping {
    lookup(TableKind::Edge, class_key).unwrap_or_else(|| {
        EDGE_TABLE
            .iter()
            .find(|e| e.mapping.canonical_type == PROCESS)
            .map(|e| e.mapping)
            .unwrap_or(TypeMapping {
                canonical_type: PROCESS,
                ontology_term: None,
                parent: None,
            })
    })
}

/// Find the entry whose canonical type is `canonical_type`.
pub fn by_canonical_type(kind: TableKind, canonical_type: &str) -> Option<TypeMapping> {
    table(kind)
        .iter()
        .find(|e| e.mapping.canonical_type == canonical_type)
        .map(|e| e.mapping)
}

/// Number of entries in a table; bounds any parent walk.
pub fn table_len(kind: TableKind) -> usize {
    table(kind).len()
}

fn sbo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"SBO[:_](\d{7})").expect("Invalid regex pattern"))
}

/// Canonical `SBO_nnnnnnn` spelling of an SBO reference such as `SBO:0000245`
/// or `http://identifiers.org/SBO:0000245`.
pub fn normalize_sbo_term(term: &str) -> Option<String> {
    sbo_regex()
        .captures(term)
        .and_then(|cap| cap.get(1))
        .map(|digits| format!("SBO_{}", digits.as_str()))
}

/// Reverse lookup: the first node class key carrying the given SBO term.
pub fn node_class_for_sbo(term: &str) -> Option<&'static str> {
    let term = normalize_sbo_term(term)?;
    NODE_TABLE
        .iter()
        .find(|e| e.mapping.ontology_term == Some(term.as_str()))
        .map(|e| e.keys[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_node_case_insensitive() {
        let m = resolve_node("Macromolecule");
        assert_eq!(m.canonical_type, "macromolecule");
        assert_eq!(m.ontology_term, Some("SBO_0000245"));
        assert_eq!(m.parent, Some(PHYSICAL_ENTITY));
    }

    #[test]
    fn test_resolve_node_synonyms() {
        let spaced = resolve_node("nucleic acid feature");
        let compact = resolve_node("NucleicAcidFeature");
        assert_eq!(spaced, compact);
        assert_eq!(spaced.canonical_type, "information macromolecule");
        assert_eq!(resolve_node("SimpleChemical").canonical_type, "simple chemical");
    }

    #[test]
    fn test_resolve_node_fallback() {
        let m = resolve_node("no such glyph");
        assert_eq!(m.canonical_type, PHYSICAL_ENTITY);
        assert_eq!(m.ontology_term, Some("SBO_0000236"));
        assert_eq!(m.parent, None);
    }

    #[test]
    fn test_resolve_edge_runtime_class_names() {
        assert_eq!(
            resolve_edge("NecessaryStimulation").canonical_type,
            "necessary stimulation"
        );
        let modulation = resolve_edge("Modulation");
        assert_eq!(modulation.canonical_type, "modulation");
        assert_eq!(modulation.parent, Some("modifier"));
    }

    #[test]
    fn test_resolve_edge_fallback() {
        let m = resolve_edge("equivalence arc");
        assert_eq!(m.canonical_type, PROCESS);
        assert_eq!(m.ontology_term, Some("SBO_0000375"));
    }

    #[test]
    fn test_parent_chains_terminate() {
        for kind in [TableKind::Node, TableKind::Edge] {
            for e in table(kind) {
                let mut hops = 0;
                let mut current = e.mapping;
                while let Some(parent) = current.parent {
                    hops += 1;
                    assert!(hops <= table_len(kind), "cycle from {}", e.mapping.canonical_type);
                    assert_ne!(parent, current.canonical_type);
                    current = match by_canonical_type(kind, parent) {
                        Some(m) => m,
                        None => break,
                    };
                }
            }
        }
    }

    #[test]
    fn test_normalize_sbo_term() {
        assert_eq!(normalize_sbo_term("SBO:0000245").as_deref(), Some("SBO_0000245"));
        assert_eq!(
            normalize_sbo_term("http://identifiers.org/SBO:0000247").as_deref(),
            Some("SBO_0000247")
        );
        assert_eq!(normalize_sbo_term("GO:0005737"), None);
    }

    #[test]
    fn test_node_class_for_sbo() {
        assert_eq!(node_class_for_sbo("SBO:0000247"), Some("simple chemical"));
        assert_eq!(node_class_for_sbo("SBO:0000246"), Some("nucleic acid feature"));
        assert_eq!(node_class_for_sbo("SBO:9999999"), None);
    }
}
