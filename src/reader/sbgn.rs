//! SBGN-ML (`<sbgn><map>`) reader.

use std::collections::HashMap;

use super::xml::{bounding_box, miriam_annotations, point, XmlDocument, XmlElement};
use super::ModelReader;
use crate::error::{Result, SysbioError};
use crate::model::{
    Compartment, EntityPool, ModelFormat, Modulation, ParticipantRef, Process, SourceModel,
    UnitOfInformation,
};

const PROCESS_CLASSES: &[&str] = &[
    "process",
    "omitted process",
    "uncertain process",
    "association",
    "dissociation",
];

/// Auxiliary glyphs that are not entity pools in their own right.
const AUXILIARY_CLASSES: &[&str] = &[
    "unit of information",
    "state variable",
    "cardinality",
    "stoichiometry",
    "terminal",
    "tag",
    "submap",
    "annotation",
    "and",
    "or",
    "not",
    "equivalence",
    "implicit xor",
];

pub struct SbgnReader;

impl ModelReader for SbgnReader {
    fn can_read(&self, root_tag: &str) -> bool {
        root_tag == "sbgn"
    }

    fn format(&self) -> ModelFormat {
        ModelFormat::Sbgn
    }

    fn read(&self, doc: &XmlDocument) -> Result<SourceModel> {
        let sbgn = doc.root();
        let mut maps = sbgn.children_named("map");
        let map = maps
            .next()
            .ok_or_else(|| SysbioError::Parse("SBGN-ML document has no <map>".to_string()))?;
        if maps.next().is_some() {
            log::warn!("SBGN-ML document holds several maps; only the first is read");
        }

        let mut builder = MapBuilder::default();
        for glyph in map.children_named("glyph") {
            builder.visit_glyph(doc, glyph, None);
        }
        for arc in map.children_named("arc") {
            builder.visit_arc(doc, arc);
        }

        let mut notes = doc.notes(map);
        notes.extend(doc.notes(sbgn));
        Ok(SourceModel {
            id: map.attr_nonempty("id").map(str::to_string),
            name: map
                .attr_nonempty("name")
                .or_else(|| glyph_label(map))
                .map(str::to_string),
            format: ModelFormat::Sbgn,
            annotations: miriam_annotations(map),
            notes,
            compartments: builder.compartments,
            entity_pools: builder.entity_pools,
            processes: builder.processes,
            modulations: builder.modulations,
        })
    }
}

#[derive(Default)]
struct MapBuilder {
    compartments: Vec<Compartment>,
    entity_pools: Vec<EntityPool>,
    processes: Vec<Process>,
    modulations: Vec<Modulation>,
    /// Port id -> owning glyph id.
    ports: HashMap<String, String>,
    process_index: HashMap<String, usize>,
}

impl MapBuilder {
    fn visit_glyph(&mut self, doc: &XmlDocument, glyph: &XmlElement, enclosing_compartment: Option<&str>) {
        let class = glyph.attr("class").unwrap_or("").trim().to_lowercase();
        let id = glyph.attr_nonempty("id").map(str::to_string);

        if let Some(id) = &id {
            for port in glyph.children_named("port") {
                if let Some(port_id) = port.attr_nonempty("id") {
                    self.ports.insert(port_id.to_string(), id.clone());
                }
            }
        }

        if class == "compartment" {
            self.compartments.push(Compartment {
                id,
                name: glyph_label(glyph).map(str::to_string),
                bbox: bounding_box(glyph),
                annotations: miriam_annotations(glyph),
                notes: doc.notes(glyph),
            });
        } else if PROCESS_CLASSES.contains(&class.as_str()) {
            if let Some(id) = &id {
                self.process_index.insert(id.clone(), self.processes.len());
            }
            self.processes.push(Process {
                id,
                class,
                label: glyph_label(glyph).map(str::to_string),
                annotations: miriam_annotations(glyph),
                notes: doc.notes(glyph),
                ..Default::default()
            });
        } else if AUXILIARY_CLASSES.contains(&class.as_str()) {
            log::debug!("Skipping auxiliary {} glyph {:?}", class, id);
        } else {
            let compartment = glyph
                .attr_nonempty("compartmentRef")
                .or(enclosing_compartment)
                .map(str::to_string);
            let units_of_information = glyph
                .children_named("glyph")
                .filter(|g| g.attr("class").map(|c| c.trim().eq_ignore_ascii_case("unit of information")) == Some(true))
                .filter_map(glyph_label)
                .map(UnitOfInformation::from_label)
                .collect();
            self.entity_pools.push(EntityPool {
                id,
                class,
                label: glyph_label(glyph).map(str::to_string),
                bbox: bounding_box(glyph),
                orientation: glyph.attr_nonempty("orientation").map(str::to_string),
                units_of_information,
                compartment: compartment.clone(),
                annotations: miriam_annotations(glyph),
                notes: doc.notes(glyph),
            });

            // Complex components are entity pools living in the same compartment.
            for nested in glyph.children_named("glyph") {
                self.visit_glyph(doc, nested, compartment.as_deref());
            }
        }
    }

    /// Glyph id an arc endpoint refers to, following ports to their owner.
    fn resolve(&self, reference: Option<&str>) -> Option<String> {
        let reference = reference?;
        match self.ports.get(reference) {
            Some(owner) => Some(owner.clone()),
            None => Some(reference.to_string()),
        }
    }

    fn visit_arc(&mut self, doc: &XmlDocument, arc: &XmlElement) {
        let class = arc.attr("class").unwrap_or("").trim().to_lowercase();
        let id = arc.attr_nonempty("id").map(str::to_string);
        let source = self.resolve(arc.attr_nonempty("source"));
        let target = self.resolve(arc.attr_nonempty("target"));
        let annotations = miriam_annotations(arc);

        let stoichiometry = arc
            .children_named("glyph")
            .find(|g| g.attr("class").map(|c| c.trim().eq_ignore_ascii_case("stoichiometry")) == Some(true))
            .and_then(glyph_label)
            .and_then(|label| label.trim().parse::<f64>().ok());

        match class.as_str() {
            "consumption" => {
                if let Some(&idx) = target.as_deref().and_then(|t| self.process_index.get(t)) {
                    self.processes[idx].reactants.push(ParticipantRef {
                        id,
                        entity: source,
                        stoichiometry,
                        annotations,
                    });
                    return;
                }
            }
            "production" => {
                if let Some(&idx) = source.as_deref().and_then(|s| self.process_index.get(s)) {
                    self.processes[idx].products.push(ParticipantRef {
                        id,
                        entity: target,
                        stoichiometry,
                        annotations,
                    });
                    return;
                }
            }
            _ => {}
        }

        self.modulations.push(Modulation {
            id,
            class,
            source,
            target,
            start: arc.child("start").map(point),
            end: arc.child("end").map(point),
            points: arc.children_named("next").map(point).collect(),
            annotations,
            notes: doc.notes(arc),
        });
    }
}

fn glyph_label(glyph: &XmlElement) -> Option<&str> {
    glyph.child("label").and_then(|l| l.attr_nonempty("text"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sbgn xmlns="http://sbgn.org/libsbgn/0.2">
  <map id="map1" language="process description">
    <notes><html>map notes</html></notes>
    <glyph id="c1" class="compartment">
      <label text="cytosol"/>
      <bbox x="0" y="0" w="400" h="300"/>
    </glyph>
    <glyph id="g1" class="macromolecule" compartmentRef="c1">
      <label text="MAPK"/>
      <bbox x="10" y="20" w="60" h="30"/>
      <glyph id="g1_uoi" class="unit of information">
        <label text="mt:prot"/>
      </glyph>
      <glyph id="g1_sv" class="state variable"/>
    </glyph>
    <glyph id="g2" class="simple chemical" compartmentRef="c1">
      <label text="ATP"/>
    </glyph>
    <glyph id="cx" class="complex">
      <glyph id="cx_a" class="macromolecule"><label text="A"/></glyph>
    </glyph>
    <glyph id="g3" class="nucleic acid feature"/>
    <glyph id="p1" class="process" orientation="horizontal">
      <port id="p1.1" x="1" y="1"/>
      <port id="p1.2" x="2" y="2"/>
    </glyph>
    <glyph class="macromolecule"><label text="anonymous"/></glyph>
    <arc id="a1" class="consumption" source="g2" target="p1.1">
      <glyph id="a1_st" class="stoichiometry"><label text="2"/></glyph>
      <start x="1" y="2"/><end x="3" y="4"/>
    </arc>
    <arc id="a2" class="production" source="p1.2" target="g1">
      <start x="5" y="6"/><end x="7" y="8"/>
    </arc>
    <arc id="a3" class="catalysis" source="g3" target="p1">
      <start x="0" y="0"/>
      <next x="1" y="1"/>
      <next x="2" y="2"/>
      <end x="3" y="3"/>
    </arc>
  </map>
</sbgn>"#;

    fn read(xml: &str) -> Result<SourceModel> {
        SbgnReader.read(&XmlDocument::parse(xml)?)
    }

    #[test]
    fn test_reads_glyphs() {
        let model = read(MAP).unwrap();
        assert_eq!(model.format, ModelFormat::Sbgn);
        assert_eq!(model.id.as_deref(), Some("map1"));
        assert_eq!(model.notes.len(), 1);
        assert_eq!(model.compartments.len(), 1);
        assert_eq!(model.compartments[0].name.as_deref(), Some("cytosol"));

        let ids: Vec<_> = model.entity_pools.iter().map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, vec![Some("g1"), Some("g2"), Some("cx"), Some("cx_a"), Some("g3"), None]);

        let mapk = &model.entity_pools[0];
        assert_eq!(mapk.label.as_deref(), Some("MAPK"));
        assert_eq!(mapk.compartment.as_deref(), Some("c1"));
        assert_eq!(mapk.bbox.unwrap().width, Some(60.0));
        assert_eq!(mapk.units_of_information, vec![UnitOfInformation::from_label("mt:prot")]);
        assert_eq!(model.processes.len(), 1);
    }

    #[test]
    fn test_ports_resolve_to_process() {
        let model = read(MAP).unwrap();
        let process = &model.processes[0];
        assert_eq!(process.reactants.len(), 1);
        assert_eq!(process.reactants[0].id.as_deref(), Some("a1"));
        assert_eq!(process.reactants[0].entity.as_deref(), Some("g2"));
        assert_eq!(process.reactants[0].stoichiometry, Some(2.0));
        assert_eq!(process.products[0].entity.as_deref(), Some("g1"));

        assert_eq!(model.modulations.len(), 1);
        let arc = &model.modulations[0];
        assert_eq!(arc.class, "catalysis");
        assert_eq!(arc.target.as_deref(), Some("p1"));
        assert_eq!(arc.points.len(), 2);
        assert_eq!(arc.end.unwrap().x, Some(3.0));
    }

    #[test]
    fn test_requires_map() {
        assert!(matches!(read("<sbgn/>"), Err(SysbioError::Parse(_))));
    }
}
