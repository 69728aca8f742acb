//! SBML (`<sbml><model>`) reader.

use std::collections::HashSet;

use super::xml::{miriam_annotations, XmlDocument, XmlElement};
use super::ModelReader;
use crate::error::{Result, SysbioError};
use crate::mapping::{self, node_class_for_sbo};
use crate::model::{Compartment, EntityPool, ModelFormat, ParticipantRef, Process, SourceModel};

pub struct SbmlReader;

impl ModelReader for SbmlReader {
    fn can_read(&self, root_tag: &str) -> bool {
        root_tag == "sbml"
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::Sbml
    }

    fn read(&self, doc: &XmlDocument) -> Result<SourceModel> {
        let model = doc
            .root()
            .child("model")
            .ok_or_else(|| SysbioError::Parse("SBML document has no <model>".to_string()))?;

        let compartments = model
            .list_items("listOfCompartments", "compartment")
            .map(|c| Compartment {
                id: c.attr_nonempty("id").map(str::to_string),
                name: c.attr_nonempty("name").map(str::to_string),
                bbox: None,
                annotations: miriam_annotations(c),
                notes: doc.notes(c),
            })
            .collect();

        let entity_pools = model
            .list_items("listOfSpecies", "species")
            .map(|s| species(doc, s))
            .collect();

        let processes = model
            .list_items("listOfReactions", "reaction")
            .map(|r| reaction(doc, r))
            .collect();

        Ok(SourceModel {
            id: model.attr_nonempty("id").map(str::to_string),
            name: model.attr_nonempty("name").map(str::to_string),
            format: ModelFormat::Sbml,
            annotations: miriam_annotations(model),
            notes: doc.notes(model),
            compartments,
            entity_pools,
            processes,
            modulations: Vec::new(),
        })
    }
}

fn species(doc: &XmlDocument, element: &XmlElement) -> EntityPool {
    let class = element
        .attr_nonempty("sboTerm")
        .and_then(node_class_for_sbo)
        .unwrap_or(mapping::PHYSICAL_ENTITY);
    EntityPool {
        id: element.attr_nonempty("id").map(str::to_string),
        class: class.to_string(),
        label: element.attr_nonempty("name").map(str::to_string),
        compartment: element.attr_nonempty("compartment").map(str::to_string),
        annotations: miriam_annotations(element),
        notes: doc.notes(element),
        ..Default::default()
    }
}

fn reaction(doc: &XmlDocument, element: &XmlElement) -> Process {
    let id = element.attr_nonempty("id").map(str::to_string);
    let mut taken = HashSet::new();
    let mut refs = |list: &str, item: &str, role: &str| -> Vec<ParticipantRef> {
        element
            .list_items(list, item)
            .enumerate()
            .map(|(position, r)| participant(r, role, id.as_deref(), position, &mut taken))
            .collect()
    };
    let reactants = refs("listOfReactants", "speciesReference", "reactant");
    let products = refs("listOfProducts", "speciesReference", "product");
    let modifiers = refs("listOfModifiers", "modifierSpeciesReference", "modifier");
    Process {
        class: mapping::PROCESS.to_string(),
        label: element.attr_nonempty("name").map(str::to_string),
        reactants,
        products,
        modifiers,
        annotations: miriam_annotations(element),
        notes: doc.notes(element),
        id,
    }
}

/// Species references rarely carry their own id; an unnamed reference is
/// keyed `<species>_<role>_<reaction>`, suffixed with its list position when
/// that key is already taken within the reaction.
fn participant(
    element: &XmlElement,
    role: &str,
    reaction_id: Option<&str>,
    position: usize,
    taken: &mut HashSet<String>,
) -> ParticipantRef {
    let entity = element.attr_nonempty("species").map(str::to_string);
    let id = element.attr_nonempty("id").map(str::to_string).or_else(|| {
        match (entity.as_deref(), reaction_id) {
            (Some(species), Some(reaction)) => {
                let key = format!("{}_{}_{}", species, role, reaction);
                if taken.contains(&key) {
                    Some(format!("{}_{}", key, position))
                } else {
                    Some(key)
                }
            }
            _ => None,
        }
    });
    if let Some(id) = &id {
        taken.insert(id.clone());
    }
    ParticipantRef {
        id,
        entity,
        stoichiometry: element.attr_f64("stoichiometry"),
        annotations: miriam_annotations(element),
    }
}
