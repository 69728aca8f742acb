//! Annotation and notes normalization into flat node/edge properties.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{PropertyMap, PropertyValue};
use crate::error::{Result, SysbioError};
use crate::model::Annotation;

/// Property key holding the encoded notes payload.
pub const NOTES_PROPERTY: &str = "notes_base64";

/// Qualifier -> resource list. Repeated qualifiers append in document order;
/// resources are not deduplicated.
pub fn annotation_properties(annotations: &[Annotation]) -> PropertyMap {
    let mut props = PropertyMap::new();
    for annotation in annotations {
        let entry = props
            .entry(annotation.qualifier.clone())
            .or_insert_with(|| PropertyValue::TextList(Vec::new()));
        if let PropertyValue::TextList(resources) = entry {
            resources.extend(annotation.resources.iter().cloned());
        }
    }
    props
}

/// Base64 of the first notes payload. Any further payloads are dropped.
pub fn encode_notes(notes: &[Vec<u8>]) -> Option<String> {
    let first = notes.first()?;
    if notes.len() > 1 {
        log::warn!("Dropping {} extra notes payload(s)", notes.len() - 1);
    }
    Some(STANDARD.encode(first))
}

/// Reverse of [`encode_notes`].
pub fn decode_notes(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| SysbioError::Notes(format!("invalid base64 notes payload: {}", e)))
}

/// Merge annotation and notes properties into `props`. Keys already present
/// are left untouched.
pub fn apply_side_data(
    props: &mut PropertyMap,
    annotations: &[Annotation],
    notes: &[Vec<u8>],
    include_annotations: bool,
) {
    if let Some(encoded) = encode_notes(notes) {
        props.entry(NOTES_PROPERTY.to_string()).or_insert(encoded.into());
    }
    if include_annotations {
        for (key, value) in annotation_properties(annotations) {
            props.entry(key).or_insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_properties_preserve_order_and_duplicates() {
        let annotations = vec![
            Annotation::new("is", vec!["urn:miriam:uniprot:P1".into(), "urn:miriam:uniprot:P1".into()]),
            Annotation::new("isVersionOf", vec!["urn:go:1".into()]),
            Annotation::new("is", vec!["urn:chebi:2".into()]),
        ];
        let props = annotation_properties(&annotations);
        assert_eq!(props.len(), 2);
        assert_eq!(
            props["is"].as_list().unwrap(),
            &[
                "urn:miriam:uniprot:P1".to_string(),
                "urn:miriam:uniprot:P1".to_string(),
                "urn:chebi:2".to_string()
            ]
        );
    }

    #[test]
    fn test_notes_round_trip_first_only() {
        let notes = vec![b"<p>first</p>".to_vec(), b"<p>second</p>".to_vec()];
        let encoded = encode_notes(&notes).unwrap();
        assert_eq!(decode_notes(&encoded).unwrap(), b"<p>first</p>");
    }

    #[test]
    fn test_no_notes_no_property() {
        assert_eq!(encode_notes(&[]), None);
        let mut props = PropertyMap::new();
        apply_side_data(&mut props, &[], &[], true);
        assert!(props.is_empty());
    }

    #[test]
    fn test_decode_invalid_notes() {
        assert!(matches!(decode_notes("***"), Err(SysbioError::Notes(_))));
    }

    #[test]
    fn test_side_data_does_not_clobber_existing_keys() {
        let mut props = PropertyMap::new();
        props.insert("name".to_string(), "ATP".into());
        let annotations = vec![Annotation::new("name", vec!["urn:x".into()])];
        apply_side_data(&mut props, &annotations, &[b"n".to_vec()], true);
        assert_eq!(props["name"].as_str(), Some("ATP"));
        assert!(props.contains_key(NOTES_PROPERTY));

        let mut without = PropertyMap::new();
        apply_side_data(&mut without, &[Annotation::new("is", vec![])], &[], false);
        assert!(without.is_empty());
    }
}
