//! Minimal owned XML tree over quick-xml, with the side-data helpers shared by
//! the SBGN-ML and SBML readers.

use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

use crate::error::{Result, SysbioError};
use crate::model::{Annotation, BoundingBox, Point};

const QUALIFIER_PREFIXES: &[&str] = &["bqbiol:", "bqmodel:"];

#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    /// Qualified name as written, e.g. `bqbiol:is`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
    /// Byte range of the raw content between the start and end tags.
    inner: Range<usize>,
}

impl XmlElement {
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// Attribute value by exact or local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .or_else(|| self.attributes.iter().find(|(k, _)| local(k) == name))
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, with empty strings treated as absent.
    pub fn attr_nonempty(&self, name: &str) -> Option<&str> {
        self.attr(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        self.attr(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn child(&self, local_name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.local_name() == local_name)
    }

    pub fn children_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.local_name() == local_name)
    }

    /// Children of the `list` wrapper, e.g. `listOfSpecies/species`.
    pub fn list_items<'a>(&'a self, list: &'a str, item: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children_named(list).flat_map(move |l| l.children_named(item))
    }

    /// Depth-first walk of every descendant, not including `self`.
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        let mut stack: Vec<&XmlElement> = self.children.iter().rev().collect();
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(el.children.iter().rev());
        }
        out
    }
}

fn local(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, l)| l).unwrap_or(name)
}

/// A parsed document: the element tree plus the source text it indexes into.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    source: String,
    root: XmlElement,
}

impl XmlDocument {
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event_start = reader.buffer_position() as usize;
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let mut element = element_from(&e)?;
                    let pos = reader.buffer_position() as usize;
                    element.inner = pos..pos;
                    stack.push(element);
                }
                Ok(Event::Empty(e)) => {
                    let element = element_from(&e)?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::End(_)) => {
                    let Some(mut element) = stack.pop() else {
                        return Err(SysbioError::Parse("unbalanced closing tag".to_string()));
                    };
                    element.inner.end = event_start.max(element.inner.start);
                    element.text = element.text.trim().to_string();
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let raw = String::from_utf8_lossy(e.as_ref());
                        match unescape(&raw) {
                            Ok(text) => current.text.push_str(&text),
                            Err(_) => current.text.push_str(&raw),
                        }
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                    }
                }
                Ok(Event::GeneralRef(e)) => {
                    if let Some(current) = stack.last_mut() {
                        let name = String::from_utf8_lossy(e.as_ref());
                        if let Some(c) = resolve_entity(&name) {
                            current.text.push(c);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(SysbioError::Parse(format!(
                        "XML parse error at byte {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(SysbioError::Parse(format!(
                "unexpected end of document inside <{}>",
                stack.last().map(|e| e.name.as_str()).unwrap_or("?")
            )));
        }
        let root = root.ok_or_else(|| SysbioError::Parse("document has no root element".to_string()))?;

        Ok(Self {
            source: xml.to_string(),
            root,
        })
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Raw XML between an element's start and end tags.
    pub fn inner_xml(&self, element: &XmlElement) -> &str {
        self.source.get(element.inner.clone()).unwrap_or("")
    }

    /// Raw payload of every `<notes>` child of `element`.
    pub fn notes(&self, element: &XmlElement) -> Vec<Vec<u8>> {
        element
            .children_named("notes")
            .map(|n| self.inner_xml(n).trim().as_bytes().to_vec())
            .filter(|payload| !payload.is_empty())
            .collect()
    }
}

fn element_from(start: &BytesStart) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SysbioError::Parse(format!("bad attribute on <{}>: {}", name, e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let raw = String::from_utf8_lossy(&attr.value).to_string();
        let value = match unescape(&raw) {
            Ok(v) => v.into_owned(),
            Err(_) => raw,
        };
        attributes.push((key, value));
    }
    Ok(XmlElement {
        name,
        attributes,
        ..Default::default()
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => log::warn!("Ignoring extra top-level element <{}>", element.name),
    }
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// MIRIAM qualifiers found under the element's `annotation` or `extension`
/// children. Each `bqbiol:*` / `bqmodel:*` element yields one annotation with
/// the `rdf:resource` of its list items.
pub fn miriam_annotations(element: &XmlElement) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    for holder in element
        .children
        .iter()
        .filter(|c| matches!(c.local_name(), "annotation" | "extension"))
    {
        for node in holder.descendants() {
            if !QUALIFIER_PREFIXES.iter().any(|p| node.name.starts_with(p)) {
                continue;
            }
            let resources: Vec<String> = node
                .descendants()
                .into_iter()
                .filter(|d| d.local_name() == "li")
                .filter_map(|li| li.attr_nonempty("resource"))
                .map(str::to_string)
                .collect();
            annotations.push(Annotation::new(node.local_name(), resources));
        }
    }
    annotations
}

/// `<bbox x= y= w= h=/>`; unparsable coordinates are treated as absent.
pub fn bounding_box(element: &XmlElement) -> Option<BoundingBox> {
    let bbox = element.child("bbox")?;
    Some(BoundingBox {
        x: bbox.attr_f64("x"),
        y: bbox.attr_f64("y"),
        width: bbox.attr_f64("w"),
        height: bbox.attr_f64("h"),
    })
}

pub fn point(element: &XmlElement) -> Point {
    Point {
        x: element.attr_f64("x"),
        y: element.attr_f64("y"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"<?xml version="1.0"?>
<root xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#">
  <item id="a" name="A &amp; B">
    <notes><p xmlns="http://www.w3.org/1999/xhtml">Hello <b>world</b></p></notes>
    <annotation>
      <rdf:RDF>
        <rdf:Description rdf:about="#a">
          <bqbiol:is>
            <rdf:Bag>
              <rdf:li rdf:resource="urn:miriam:uniprot:P12345"/>
              <rdf:li rdf:resource="urn:miriam:uniprot:P67890"/>
            </rdf:Bag>
          </bqbiol:is>
          <bqmodel:isDescribedBy>
            <rdf:Bag><rdf:li rdf:resource="urn:miriam:pubmed:1"/></rdf:Bag>
          </bqmodel:isDescribedBy>
        </rdf:Description>
      </rdf:RDF>
    </annotation>
    <bbox x="1.5" y="2" w="10" h="oops"/>
  </item>
  <item id="b"/>
</root>"##;

    #[test]
    fn test_tree_and_attributes() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let root = doc.root();
        assert_eq!(root.local_name(), "root");
        let items: Vec<_> = root.children_named("item").collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].attr("name"), Some("A & B"));
        assert_eq!(items[1].attr("id"), Some("b"));
        assert_eq!(items[1].attr("missing"), None);
    }

    #[test]
    fn test_notes_keep_raw_markup() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let item = doc.root().child("item").unwrap();
        let notes = doc.notes(item);
        assert_eq!(notes.len(), 1);
        let text = String::from_utf8(notes[0].clone()).unwrap();
        assert!(text.starts_with("<p"));
        assert!(text.contains("<b>world</b>"));
        assert!(text.ends_with("</p>"));
    }

    #[test]
    fn test_notes_closing_tag_with_whitespace() {
        let doc = XmlDocument::parse(r#"<model id="m"><notes><p>hi</p></notes ></model>"#).unwrap();
        let notes = doc.notes(doc.root());
        assert_eq!(notes, vec![b"<p>hi</p>".to_vec()]);

        let doc = XmlDocument::parse("<model><notes>\n  <p>a</p>\n</notes\n></model>").unwrap();
        assert_eq!(doc.notes(doc.root()), vec![b"<p>a</p>".to_vec()]);
    }

    #[test]
    fn test_miriam_annotations() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let item = doc.root().child("item").unwrap();
        let annotations = miriam_annotations(item);
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].qualifier, "is");
        assert_eq!(annotations[0].resources.len(), 2);
        assert_eq!(annotations[1].qualifier, "isDescribedBy");
    }

    #[test]
    fn test_bounding_box_partial() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let bbox = bounding_box(doc.root().child("item").unwrap()).unwrap();
        assert_eq!(bbox.x, Some(1.5));
        assert_eq!(bbox.y, Some(2.0));
        assert_eq!(bbox.height, None);
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(XmlDocument::parse("<a><b></a>"), Err(SysbioError::Parse(_))));
        assert!(matches!(XmlDocument::parse("<a>"), Err(SysbioError::Parse(_))));
        assert!(matches!(XmlDocument::parse(""), Err(SysbioError::Parse(_))));
    }
}
