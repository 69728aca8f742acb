//! In-memory source model: the parsed form of an SBGN map or SBML model.
//!
//! Every element kind is a plain struct with explicit optional fields. Side
//! data (annotations and notes) travels with the element that owns it, so
//! consumers never need an identity-keyed lookup table.

use serde::{Deserialize, Serialize};

/// Document format a model was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Sbgn,
    Sbml,
    #[default]
    Unknown,
}

impl ModelFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Sbgn => "sbgn",
            ModelFormat::Sbml => "sbml",
            ModelFormat::Unknown => "unknown",
        }
    }
}

/// One MIRIAM-style annotation: a qualifier and the resources it points at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Qualifier local name, e.g. `is`, `isVersionOf`, `hasPart`.
    pub qualifier: String,
    /// Resource URIs in document order.
    pub resources: Vec<String>,
}

impl Annotation {
    pub fn new(qualifier: impl Into<String>, resources: Vec<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            resources,
        }
    }
}

/// A 2D point. Either coordinate may be missing in the source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
        }
    }
}

/// Bounding box of a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

/// Layout information an element may carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry<'a> {
    Box(&'a BoundingBox),
    Path {
        start: Option<&'a Point>,
        end: Option<&'a Point>,
        points: &'a [Point],
    },
}

/// Unit-of-information sub-glyph, e.g. `mt:prot` or `N:3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitOfInformation {
    pub prefix: Option<String>,
    pub value: String,
}

impl UnitOfInformation {
    /// Split a label at its first ':' into prefix and value.
    pub fn from_label(label: &str) -> Self {
        match label.split_once(':') {
            Some((prefix, value)) if !prefix.trim().is_empty() => Self {
                prefix: Some(prefix.trim().to_string()),
                value: value.trim().to_string(),
            },
            _ => Self {
                prefix: None,
                value: label.trim().to_string(),
            },
        }
    }

    /// Flattened `prefix:value` or bare `value`.
    pub fn flatten(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.value),
            None => self.value.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compartment {
    pub id: Option<String>,
    pub name: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub annotations: Vec<Annotation>,
    pub notes: Vec<Vec<u8>>,
}

/// An entity pool: SBGN entity glyph or SBML species.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityPool {
    pub id: Option<String>,
    /// Source class name, e.g. `macromolecule` or `SimpleChemical`.
    pub class: String,
    pub label: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub orientation: Option<String>,
    pub units_of_information: Vec<UnitOfInformation>,
    /// Identifier of the enclosing compartment, if any.
    pub compartment: Option<String>,
    pub annotations: Vec<Annotation>,
    pub notes: Vec<Vec<u8>>,
}

/// Reference from a process to a participating entity pool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantRef {
    pub id: Option<String>,
    /// Identifier of the referred entity pool.
    pub entity: Option<String>,
    pub stoichiometry: Option<f64>,
    pub annotations: Vec<Annotation>,
}

/// A process node: SBGN process glyph or SBML reaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Process {
    pub id: Option<String>,
    pub class: String,
    pub label: Option<String>,
    pub reactants: Vec<ParticipantRef>,
    pub products: Vec<ParticipantRef>,
    pub modifiers: Vec<ParticipantRef>,
    pub annotations: Vec<Annotation>,
    pub notes: Vec<Vec<u8>>,
}

/// A modulation arc (inhibition, stimulation, catalysis, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modulation {
    pub id: Option<String>,
    /// Arc class name, used as the edge type lookup key.
    pub class: String,
    pub source: Option<String>,
    pub target: Option<String>,
    pub start: Option<Point>,
    pub end: Option<Point>,
    /// Intermediate polyline points between start and end.
    pub points: Vec<Point>,
    pub annotations: Vec<Annotation>,
    pub notes: Vec<Vec<u8>>,
}

/// A whole parsed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceModel {
    pub id: Option<String>,
    pub name: Option<String>,
    pub format: ModelFormat,
    pub annotations: Vec<Annotation>,
    pub notes: Vec<Vec<u8>>,
    pub compartments: Vec<Compartment>,
    pub entity_pools: Vec<EntityPool>,
    pub processes: Vec<Process>,
    pub modulations: Vec<Modulation>,
}

impl SourceModel {
    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
            && self.entity_pools.is_empty()
            && self.processes.is_empty()
            && self.modulations.is_empty()
    }
}

/// Uniform accessor surface over every element kind.
pub trait SourceElement {
    fn identifier(&self) -> Option<&str>;

    fn label(&self) -> Option<&str> {
        None
    }

    fn annotations(&self) -> &[Annotation];

    fn notes(&self) -> &[Vec<u8>] {
        &[]
    }

    fn geometry(&self) -> Option<Geometry<'_>> {
        None
    }
}

impl SourceElement for SourceModel {
    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn label(&self) -> Option<&str> {
        self.name.as_deref()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn notes(&self) -> &[Vec<u8>] {
        &self.notes
    }
}

impl SourceElement for Compartment {
    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn label(&self) -> Option<&str> {
        self.name.as_deref()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn notes(&self) -> &[Vec<u8>] {
        &self.notes
    }
    fn geometry(&self) -> Option<Geometry<'_>> {
        self.bbox.as_ref().map(Geometry::Box)
    }
}

impl SourceElement for EntityPool {
    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn notes(&self) -> &[Vec<u8>] {
        &self.notes
    }
    fn geometry(&self) -> Option<Geometry<'_>> {
        self.bbox.as_ref().map(Geometry::Box)
    }
}

impl SourceElement for Process {
    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn notes(&self) -> &[Vec<u8>] {
        &self.notes
    }
}

impl SourceElement for ParticipantRef {
    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

impl SourceElement for Modulation {
    fn identifier(&self) -> Option<&str> {
        self.id.as_deref()
    }
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
    fn notes(&self) -> &[Vec<u8>] {
        &self.notes
    }
    fn geometry(&self) -> Option<Geometry<'_>> {
        if self.start.is_none() && self.end.is_none() && self.points.is_empty() {
            return None;
        }
        Some(Geometry::Path {
            start: self.start.as_ref(),
            end: self.end.as_ref(),
            points: &self.points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_of_information_split() {
        let unit = UnitOfInformation::from_label("mt:prot");
        assert_eq!(unit.prefix.as_deref(), Some("mt"));
        assert_eq!(unit.value, "prot");
        assert_eq!(unit.flatten(), "mt:prot");

        let bare = UnitOfInformation::from_label("3");
        assert_eq!(bare.prefix, None);
        assert_eq!(bare.flatten(), "3");
    }

    #[test]
    fn test_unit_of_information_empty_prefix_is_bare() {
        let unit = UnitOfInformation::from_label(":ct");
        assert_eq!(unit.prefix, None);
        assert_eq!(unit.value, ":ct");
    }

    #[test]
    fn test_modulation_geometry_absent_without_points() {
        let arc = Modulation::default();
        assert!(arc.geometry().is_none());

        let arc = Modulation {
            start: Some(Point::new(1.0, 2.0)),
            ..Default::default()
        };
        match arc.geometry() {
            Some(Geometry::Path { start, end, points }) => {
                assert_eq!(start, Some(&Point::new(1.0, 2.0)));
                assert!(end.is_none());
                assert!(points.is_empty());
            }
            other => panic!("unexpected geometry: {:?}", other),
        }
    }

    #[test]
    fn test_empty_model() {
        let model = SourceModel::default();
        assert!(model.is_empty());
        assert_eq!(model.format.as_str(), "unknown");
    }
}
