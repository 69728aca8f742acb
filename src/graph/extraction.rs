//! Model-to-graph extraction (node pass, then edge pass).
//!
//! Every source element maps to at most one canonical record. Elements that
//! cannot be referenced (no identifier, dangling endpoint, duplicate id) are
//! skipped with a warning; only schema registry rejections abort a run.

use std::collections::{HashMap, HashSet};

use super::annotations::apply_side_data;
use super::hierarchy::HierarchySync;
use super::namespace::{content_address, Namespace, TokenSource};
use super::{CanonicalEdge, CanonicalNode, NodeRole, PropertyMap, PropertyValue};
use crate::error::Result;
use crate::mapping::{self, TableKind, TypeMapping};
use crate::model::{
    BoundingBox, EntityPool, Geometry, ModelFormat, Modulation, ParticipantRef, Point, Process,
    SourceElement, SourceModel,
};
use crate::schema::SchemaRegistry;

/// Local id of the synthesized compartment shared by unplaced entities.
pub const DEFAULT_COMPARTMENT_ID: &str = "default_compartment";

/// Root node local id when the model carries no id of its own.
pub const ROOT_FALLBACK_ID: &str = "model";

const MODEL_TYPE: &str = "model";
const CONTAINED_ENTITY_TYPE: &str = "contained entity";

/// Switches for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOptions {
    /// Place entities without a usable compartment in a synthesized one.
    pub add_default_compartments: bool,
    /// Copy annotation qualifiers onto nodes and edges.
    pub annotations_as_properties: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            add_default_compartments: true,
            annotations_as_properties: true,
        }
    }
}

/// Identity of the source element a record was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ElementKey {
    Model,
    DefaultCompartment,
    Compartment(usize),
    Entity(usize),
    Process(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum EdgeKey {
    Containment(ElementKey),
    ContainedEntity(usize),
    Modulation(usize),
    Reactant(usize, usize),
    Product(usize, usize),
    Modifier(usize, usize),
}

/// The finished, immutable result of extracting one source model.
#[derive(Debug, Clone)]
pub struct GraphExtraction {
    namespace: Namespace,
    format: ModelFormat,
    nodes: Vec<CanonicalNode>,
    edges: Vec<CanonicalEdge>,
}

impl GraphExtraction {
    /// Run the full extraction with a fresh namespace drawn from `tokens`.
    pub fn extract(
        model: &SourceModel,
        options: &ExtractionOptions,
        registry: Option<&mut dyn SchemaRegistry>,
        tokens: &mut dyn TokenSource,
    ) -> Result<Self> {
        Self::with_namespace(model, options, registry, Namespace::new(tokens))
    }

    /// Run the full extraction inside an existing namespace.
    pub fn with_namespace(
        model: &SourceModel,
        options: &ExtractionOptions,
        registry: Option<&mut dyn SchemaRegistry>,
        namespace: Namespace,
    ) -> Result<Self> {
        let mut extractor = Extractor::new(model, options, HierarchySync::new(registry));
        extractor.node_pass()?;
        extractor.edge_pass()?;

        log::info!(
            "Extracted {} nodes and {} edges ({} schema declarations)",
            extractor.nodes.len(),
            extractor.edges.len(),
            extractor.sync.declarations()
        );

        Ok(Self {
            namespace,
            format: model.format,
            nodes: extractor.nodes,
            edges: extractor.edges,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    /// Nodes in insertion order; the root model node is always first.
    pub fn nodes(&self) -> &[CanonicalNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[CanonicalEdge] {
        &self.edges
    }

    pub fn root(&self) -> &CanonicalNode {
        &self.nodes[0]
    }

    pub fn node(&self, local_id: &str) -> Option<&CanonicalNode> {
        self.nodes.iter().find(|n| n.local_id == local_id)
    }

    pub fn edge(&self, local_id: &str) -> Option<&CanonicalEdge> {
        self.edges.iter().find(|e| e.local_id == local_id)
    }
}

/// Working state of one run.
struct Extractor<'m, 'r> {
    model: &'m SourceModel,
    options: &'m ExtractionOptions,
    sync: HierarchySync<'r>,
    nodes: Vec<CanonicalNode>,
    node_index: HashMap<ElementKey, usize>,
    node_ids: HashSet<String>,
    /// Local ids of entity and process nodes, the only valid arc endpoints.
    endpoint_ids: HashSet<String>,
    edges: Vec<CanonicalEdge>,
    edge_index: HashMap<EdgeKey, usize>,
    edge_ids: HashSet<String>,
    /// Entity position -> local id of its compartment node.
    placements: Vec<(usize, String)>,
    default_compartment: Option<String>,
}

impl<'m, 'r> Extractor<'m, 'r> {
    fn new(model: &'m SourceModel, options: &'m ExtractionOptions, sync: HierarchySync<'r>) -> Self {
        Self {
            model,
            options,
            sync,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            node_ids: HashSet::new(),
            endpoint_ids: HashSet::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            edge_ids: HashSet::new(),
            placements: Vec::new(),
            default_compartment: None,
        }
    }

    fn classify_node(&mut self, class_key: &str) -> Result<TypeMapping> {
        let mapping = mapping::resolve_node(class_key);
        self.sync.sync(TableKind::Node, &mapping)?;
        Ok(mapping)
    }

    fn classify_edge(&mut self, class_key: &str) -> Result<TypeMapping> {
        let mapping = mapping::resolve_edge(class_key);
        self.sync.sync(TableKind::Edge, &mapping)?;
        Ok(mapping)
    }

    fn push_node(&mut self, key: ElementKey, node: CanonicalNode) -> bool {
        if self.node_index.contains_key(&key) {
            return false;
        }
        if !self.node_ids.insert(node.local_id.clone()) {
            log::warn!(
                "Duplicate node identifier '{}' ({:?}); skipping element",
                node.local_id,
                node.role
            );
            return false;
        }
        if matches!(node.role, NodeRole::Entity | NodeRole::Process) {
            self.endpoint_ids.insert(node.local_id.clone());
        }
        self.node_index.insert(key, self.nodes.len());
        self.nodes.push(node);
        true
    }

    fn push_edge(&mut self, key: EdgeKey, edge: CanonicalEdge) -> bool {
        if self.edge_index.contains_key(&key) {
            return false;
        }
        if !self.edge_ids.insert(edge.local_id.clone()) {
            log::warn!("Duplicate edge identifier '{}'; skipping edge", edge.local_id);
            return false;
        }
        self.edge_index.insert(key, self.edges.len());
        self.edges.push(edge);
        true
    }

    fn side_data<E: SourceElement + ?Sized>(&self, props: &mut PropertyMap, element: &E) {
        apply_side_data(
            props,
            element.annotations(),
            element.notes(),
            self.options.annotations_as_properties,
        );
    }

    fn node_pass(&mut self) -> Result<()> {
        self.add_root();

        let model = self.model;
        for (idx, compartment) in model.compartments.iter().enumerate() {
            let Some(id) = compartment.identifier() else {
                log::warn!("Skipping compartment #{} without identifier", idx);
                continue;
            };
            let mapping = self.classify_node(mapping::COMPARTMENT)?;
            let mut props = base_properties("compartment", id, &mapping);
            insert_label(&mut props, compartment.label());
            if let Some(Geometry::Box(bbox)) = compartment.geometry() {
                insert_bbox(&mut props, bbox);
            }
            self.side_data(&mut props, compartment);
            self.push_node(
                ElementKey::Compartment(idx),
                CanonicalNode {
                    local_id: id.to_string(),
                    canonical_type: mapping.canonical_type.to_string(),
                    properties: props,
                    role: NodeRole::Compartment,
                },
            );
        }

        if self.options.add_default_compartments && self.needs_default_compartment() {
            self.add_default_compartment()?;
        }

        for (idx, entity) in model.entity_pools.iter().enumerate() {
            self.add_entity(idx, entity)?;
        }

        for (idx, process) in model.processes.iter().enumerate() {
            self.add_process(idx, process)?;
        }

        log::debug!("Node pass produced {} nodes", self.nodes.len());
        Ok(())
    }

    fn add_root(&mut self) {
        let model = self.model;
        let local_id = model.identifier().unwrap_or(ROOT_FALLBACK_ID).to_string();
        let mut props = PropertyMap::new();
        if let Some(name) = model.label() {
            props.insert("name".to_string(), name.into());
        }
        if let Some(id) = model.identifier() {
            props.insert("source_id".to_string(), id.into());
        }
        props.insert("source_format".to_string(), model.format.as_str().into());
        self.side_data(&mut props, model);

        self.push_node(
            ElementKey::Model,
            CanonicalNode {
                local_id,
                canonical_type: MODEL_TYPE.to_string(),
                properties: props,
                role: NodeRole::Model,
            },
        );
    }

    /// Compartment node id an entity refers to, if that node exists.
    fn explicit_compartment(&self, entity: &EntityPool) -> Option<String> {
        let reference = entity.compartment.as_deref()?;
        let found = self.model.compartments.iter().enumerate().find_map(|(idx, c)| {
            (c.identifier() == Some(reference))
                .then(|| self.node_index.get(&ElementKey::Compartment(idx)))
                .flatten()
                .map(|&pos| self.nodes[pos].local_id.clone())
        });
        if found.is_none() {
            log::warn!(
                "Entity '{}' refers to unknown compartment '{}'",
                entity.identifier().unwrap_or("?"),
                reference
            );
        }
        found
    }

    fn needs_default_compartment(&self) -> bool {
        self.model.entity_pools.iter().any(|entity| {
            entity.identifier().is_some()
                && match entity.compartment.as_deref() {
                    None => true,
                    Some(reference) => !self
                        .model
                        .compartments
                        .iter()
                        .any(|c| c.identifier() == Some(reference)),
                }
        })
    }

    fn add_default_compartment(&mut self) -> Result<()> {
        if self.node_ids.contains(DEFAULT_COMPARTMENT_ID) {
            log::debug!("Source already defines '{}'; reusing it", DEFAULT_COMPARTMENT_ID);
            self.default_compartment = Some(DEFAULT_COMPARTMENT_ID.to_string());
            return Ok(());
        }
        let mapping = self.classify_node(mapping::COMPARTMENT)?;
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "default compartment".into());
        props.insert("synthesized".to_string(), true.into());
        if let Some(term) = mapping.ontology_term {
            props.insert("sbo_term".to_string(), term.into());
        }
        let added = self.push_node(
            ElementKey::DefaultCompartment,
            CanonicalNode {
                local_id: DEFAULT_COMPARTMENT_ID.to_string(),
                canonical_type: mapping.canonical_type.to_string(),
                properties: props,
                role: NodeRole::Compartment,
            },
        );
        if added {
            self.default_compartment = Some(DEFAULT_COMPARTMENT_ID.to_string());
        }
        Ok(())
    }

    fn add_entity(&mut self, idx: usize, entity: &EntityPool) -> Result<()> {
        let Some(id) = entity.identifier() else {
            log::warn!("Skipping {} entity #{} without identifier", entity.class, idx);
            return Ok(());
        };

        let mapping = self.classify_node(&entity.class)?;
        let mut props = base_properties(&entity.class, id, &mapping);
        insert_label(&mut props, entity.label());
        if let Some(Geometry::Box(bbox)) = entity.geometry() {
            insert_bbox(&mut props, bbox);
        }
        if let Some(orientation) = &entity.orientation {
            props.insert("orientation".to_string(), orientation.as_str().into());
        }
        let units: Vec<String> = entity
            .units_of_information
            .iter()
            .map(|u| u.flatten())
            .filter(|s| !s.is_empty())
            .collect();
        if !units.is_empty() {
            props.insert("unit_of_information".to_string(), units.into());
        }
        self.side_data(&mut props, entity);

        let added = self.push_node(
            ElementKey::Entity(idx),
            CanonicalNode {
                local_id: id.to_string(),
                canonical_type: mapping.canonical_type.to_string(),
                properties: props,
                role: NodeRole::Entity,
            },
        );
        if !added {
            return Ok(());
        }

        let placement = self
            .explicit_compartment(entity)
            .or_else(|| self.default_compartment.clone());
        if let Some(compartment) = placement {
            self.placements.push((idx, compartment));
        }
        Ok(())
    }

    fn add_process(&mut self, idx: usize, process: &Process) -> Result<()> {
        let Some(id) = process.identifier() else {
            log::warn!("Skipping process #{} without identifier", idx);
            return Ok(());
        };

        let mapping = self.classify_node(mapping::PROCESS)?;
        let class = if process.class.is_empty() {
            mapping::PROCESS
        } else {
            process.class.as_str()
        };
        let mut props = base_properties(class, id, &mapping);
        insert_label(&mut props, process.label());
        self.side_data(&mut props, process);

        self.push_node(
            ElementKey::Process(idx),
            CanonicalNode {
                local_id: id.to_string(),
                canonical_type: mapping.canonical_type.to_string(),
                properties: props,
                role: NodeRole::Process,
            },
        );
        Ok(())
    }

    fn edge_pass(&mut self) -> Result<()> {
        self.add_containment_edges();
        self.add_contained_entity_edges();

        let model = self.model;
        for (idx, arc) in model.modulations.iter().enumerate() {
            self.add_modulation(idx, arc)?;
        }

        for (idx, process) in model.processes.iter().enumerate() {
            let Some(&pos) = self.node_index.get(&ElementKey::Process(idx)) else {
                continue;
            };
            let process_id = self.nodes[pos].local_id.clone();
            self.add_participants(idx, process, &process_id)?;
        }

        log::debug!("Edge pass produced {} edges", self.edges.len());
        Ok(())
    }

    fn add_containment_edges(&mut self) {
        let root_id = self.nodes[0].local_id.clone();
        let keyed: Vec<(ElementKey, usize)> = {
            let mut v: Vec<_> = self.node_index.iter().map(|(k, &pos)| (*k, pos)).collect();
            v.sort_by_key(|&(_, pos)| pos);
            v
        };

        for (key, pos) in keyed {
            let node = &self.nodes[pos];
            let Some(edge_type) = node.role.containment_type() else {
                continue;
            };
            let edge = CanonicalEdge {
                local_id: content_address(&node.local_id, edge_type, &root_id),
                source_local_id: node.local_id.clone(),
                target_local_id: root_id.clone(),
                canonical_type: edge_type.to_string(),
                properties: PropertyMap::new(),
            };
            self.push_edge(EdgeKey::Containment(key), edge);
        }
    }

    fn add_contained_entity_edges(&mut self) {
        let placements = std::mem::take(&mut self.placements);
        for (idx, compartment_id) in &placements {
            let Some(&pos) = self.node_index.get(&ElementKey::Entity(*idx)) else {
                continue;
            };
            let entity_id = self.nodes[pos].local_id.clone();
            let edge = CanonicalEdge {
                local_id: content_address(&entity_id, CONTAINED_ENTITY_TYPE, compartment_id),
                source_local_id: entity_id,
                target_local_id: compartment_id.clone(),
                canonical_type: CONTAINED_ENTITY_TYPE.to_string(),
                properties: PropertyMap::new(),
            };
            self.push_edge(EdgeKey::ContainedEntity(*idx), edge);
        }
        self.placements = placements;
    }

    fn add_modulation(&mut self, idx: usize, arc: &Modulation) -> Result<()> {
        let label = arc.identifier().unwrap_or("<unnamed>");
        let (Some(source), Some(target)) = (
            resolve_endpoint(&self.endpoint_ids, arc.source.as_deref()),
            resolve_endpoint(&self.endpoint_ids, arc.target.as_deref()),
        ) else {
            log::warn!(
                "Could not resolve endpoints for {} arc {} ({:?} -> {:?})",
                arc.class,
                label,
                arc.source,
                arc.target
            );
            return Ok(());
        };

        let mapping = self.classify_edge(&arc.class)?;
        let local_id = match arc.identifier() {
            Some(id) => id.to_string(),
            None => content_address(source, mapping.canonical_type, target),
        };

        let mut props = PropertyMap::new();
        props.insert("source_class".to_string(), arc.class.as_str().into());
        if let Some(id) = arc.identifier() {
            props.insert("source_arc_id".to_string(), id.into());
        }
        if let Some(term) = mapping.ontology_term {
            props.insert("sbo_term".to_string(), term.into());
        }
        if let Some(Geometry::Path { start, end, points }) = arc.geometry() {
            insert_point(&mut props, "start", start);
            insert_point(&mut props, "end", end);
            if let Some(polyline) = serialize_points(points) {
                props.insert("intermediate_points".to_string(), polyline.into());
            }
        }
        self.side_data(&mut props, arc);

        let edge = CanonicalEdge {
            local_id,
            source_local_id: source.to_string(),
            target_local_id: target.to_string(),
            canonical_type: mapping.canonical_type.to_string(),
            properties: props,
        };
        self.push_edge(EdgeKey::Modulation(idx), edge);
        Ok(())
    }

    fn add_participants(&mut self, idx: usize, process: &Process, process_id: &str) -> Result<()> {
        for (ref_idx, reference) in process.reactants.iter().enumerate() {
            self.add_participant(
                EdgeKey::Reactant(idx, ref_idx),
                "reactant",
                reference,
                process_id,
                Direction::IntoProcess,
            )?;
        }
        for (ref_idx, reference) in process.products.iter().enumerate() {
            self.add_participant(
                EdgeKey::Product(idx, ref_idx),
                "product",
                reference,
                process_id,
                Direction::OutOfProcess,
            )?;
        }
        for (ref_idx, reference) in process.modifiers.iter().enumerate() {
            self.add_participant(
                EdgeKey::Modifier(idx, ref_idx),
                "modifier",
                reference,
                process_id,
                Direction::IntoProcess,
            )?;
        }
        Ok(())
    }

    fn add_participant(
        &mut self,
        key: EdgeKey,
        arc_class: &str,
        reference: &ParticipantRef,
        process_id: &str,
        direction: Direction,
    ) -> Result<()> {
        let Some(ref_id) = reference.identifier() else {
            log::warn!(
                "Skipping {} reference without identifier in process {}",
                arc_class,
                process_id
            );
            return Ok(());
        };
        let Some(entity_id) = resolve_endpoint(&self.endpoint_ids, reference.entity.as_deref()) else {
            log::warn!(
                "Could not resolve endpoints for {} {} in process {} (entity {:?})",
                arc_class,
                ref_id,
                process_id,
                reference.entity
            );
            return Ok(());
        };
        let entity_id = entity_id.to_string();

        let mapping = self.classify_edge(arc_class)?;
        let mut props = PropertyMap::new();
        props.insert("source_class".to_string(), arc_class.into());
        if let Some(term) = mapping.ontology_term {
            props.insert("sbo_term".to_string(), term.into());
        }
        if let Some(stoichiometry) = reference.stoichiometry {
            props.insert("stoichiometry".to_string(), stoichiometry.into());
        }
        self.side_data(&mut props, reference);

        let (source, target) = match direction {
            Direction::IntoProcess => (entity_id, process_id.to_string()),
            Direction::OutOfProcess => (process_id.to_string(), entity_id),
        };
        let edge = CanonicalEdge {
            local_id: ref_id.to_string(),
            source_local_id: source,
            target_local_id: target,
            canonical_type: mapping.canonical_type.to_string(),
            properties: props,
        };
        self.push_edge(key, edge);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    IntoProcess,
    OutOfProcess,
}

fn resolve_endpoint<'a>(endpoint_ids: &HashSet<String>, id: Option<&'a str>) -> Option<&'a str> {
    id.filter(|id| !id.is_empty() && endpoint_ids.contains(*id))
}

fn base_properties(source_class: &str, id: &str, mapping: &TypeMapping) -> PropertyMap {
    let mut props = PropertyMap::new();
    props.insert("source_class".to_string(), source_class.into());
    props.insert("source_id".to_string(), id.into());
    if let Some(term) = mapping.ontology_term {
        props.insert("sbo_term".to_string(), term.into());
    }
    props
}

fn insert_label(props: &mut PropertyMap, label: Option<&str>) {
    if let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) {
        props.insert("name".to_string(), label.into());
        props.insert("label".to_string(), label.into());
    }
}

fn insert_bbox(props: &mut PropertyMap, bbox: &BoundingBox) {
    for (key, value) in [
        ("x", bbox.x),
        ("y", bbox.y),
        ("width", bbox.width),
        ("height", bbox.height),
    ] {
        if let Some(value) = value {
            props.insert(key.to_string(), PropertyValue::Number(value));
        }
    }
}

fn insert_point(props: &mut PropertyMap, prefix: &str, point: Option<&Point>) {
    let Some(point) = point else { return };
    if let Some(x) = point.x {
        props.insert(format!("{}_x", prefix), x.into());
    }
    if let Some(y) = point.y {
        props.insert(format!("{}_y", prefix), y.into());
    }
}

/// `x1,y1|x2,y2|...`; points missing a coordinate are left out.
fn serialize_points(points: &[Point]) -> Option<String> {
    let segments: Vec<String> = points
        .iter()
        .filter_map(|p| Some(format!("{},{}", p.x?, p.y?)))
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("|"))
    }
}
