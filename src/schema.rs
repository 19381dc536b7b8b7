//! The schema registry: a fixed, process-wide mapping from codec identity
//! to columnar descriptor.
//!
//! The registry is built once at first use and never mutated afterwards, so
//! concurrent reads need no locking. The composite codec and the batch
//! builder consult it to decide whether a field dispatches through a nested
//! codec or passes through as a primitive; lookup is keyed by extension
//! name, with no sequential type probing.

use std::collections::BTreeMap;

use arrow::datatypes::{DataType, Field, Fields};
use once_cell::sync::Lazy;

use crate::codec::{extension_name, ArrowCodec};
use crate::error::ArrowlabelError;
use crate::types::{Bbox, CompressedRle, Image, ObjectAnnotation, Pose};

/// Binds a codec identity to its ordered physical layout.
#[derive(Clone, Debug)]
pub struct ColumnDescriptor {
    /// The codec's extension name.
    pub extension_name: &'static str,

    /// The ordered field-name to physical-type layout.
    pub storage_fields: Fields,
}

static REGISTRY: Lazy<BTreeMap<&'static str, ColumnDescriptor>> = Lazy::new(|| {
    let mut registry = BTreeMap::new();
    register::<Bbox>(&mut registry);
    register::<Image>(&mut registry);
    register::<Pose>(&mut registry);
    register::<CompressedRle>(&mut registry);
    register::<ObjectAnnotation>(&mut registry);
    registry
});

fn register<T: ArrowCodec>(registry: &mut BTreeMap<&'static str, ColumnDescriptor>) {
    registry.insert(
        T::EXTENSION_NAME,
        ColumnDescriptor {
            extension_name: T::EXTENSION_NAME,
            storage_fields: T::storage_fields(),
        },
    );
}

/// Looks up a descriptor by extension name.
pub fn lookup(extension_name: &str) -> Option<&'static ColumnDescriptor> {
    REGISTRY.get(extension_name)
}

/// The descriptor registered for a codec type.
pub fn descriptor_of<T: ArrowCodec>() -> Option<&'static ColumnDescriptor> {
    lookup(T::EXTENSION_NAME)
}

/// The descriptor a field's extension annotation resolves to, if the field
/// carries one and it names a registered codec.
pub fn extension_descriptor(field: &Field) -> Option<&'static ColumnDescriptor> {
    extension_name(field).and_then(lookup)
}

/// Checks an external schema against a registered layout, depth-first.
///
/// Field names, order, and physical types must all match; fields annotated
/// with a registered extension are recursed into. Any divergence is a
/// [`SchemaMismatch`](ArrowlabelError::SchemaMismatch) naming the offending
/// path.
pub fn validate_storage(
    descriptor: &ColumnDescriptor,
    actual: &Fields,
) -> Result<(), ArrowlabelError> {
    validate_fields(&descriptor.storage_fields, actual, descriptor.extension_name)
}

fn validate_fields(expected: &Fields, actual: &Fields, path: &str) -> Result<(), ArrowlabelError> {
    if expected.len() != actual.len() {
        return Err(ArrowlabelError::SchemaMismatch(format!(
            "'{path}' has {} fields, expected {}",
            actual.len(),
            expected.len()
        )));
    }

    for (expected_field, actual_field) in expected.iter().zip(actual.iter()) {
        let field_path = format!("{path}.{}", expected_field.name());
        if expected_field.name() != actual_field.name() {
            return Err(ArrowlabelError::SchemaMismatch(format!(
                "expected field '{field_path}', found '{}'",
                actual_field.name()
            )));
        }

        if let Some(nested) = extension_descriptor(expected_field) {
            match actual_field.data_type() {
                DataType::Struct(children) => {
                    validate_fields(&nested.storage_fields, children, &field_path)?;
                }
                other => {
                    return Err(ArrowlabelError::SchemaMismatch(format!(
                        "'{field_path}' should be a '{}' struct, found {other}",
                        nested.extension_name
                    )));
                }
            }
        } else if expected_field.data_type() != actual_field.data_type() {
            return Err(ArrowlabelError::SchemaMismatch(format!(
                "'{field_path}' has physical type {}, expected {}",
                actual_field.data_type(),
                expected_field.data_type()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_codecs_are_registered() {
        for name in [
            "arrowlabel.bbox",
            "arrowlabel.image",
            "arrowlabel.pose",
            "arrowlabel.rle",
            "arrowlabel.object_annotation",
        ] {
            let descriptor = lookup(name).unwrap();
            assert_eq!(descriptor.extension_name, name);
            assert!(!descriptor.storage_fields.is_empty());
        }
        assert!(lookup("arrowlabel.unknown").is_none());
    }

    #[test]
    fn test_composite_layout_references_leaf_layouts() {
        let composite = descriptor_of::<ObjectAnnotation>().unwrap();
        let bbox_field = composite
            .storage_fields
            .iter()
            .find(|f| f.name() == "bbox")
            .unwrap();
        let nested = extension_descriptor(bbox_field).unwrap();
        assert_eq!(nested.extension_name, Bbox::EXTENSION_NAME);
    }

    #[test]
    fn test_validate_storage_accepts_own_layout() {
        let descriptor = descriptor_of::<ObjectAnnotation>().unwrap();
        validate_storage(descriptor, &ObjectAnnotation::storage_fields()).unwrap();
    }

    #[test]
    fn test_validate_storage_rejects_divergence() {
        let descriptor = descriptor_of::<Bbox>().unwrap();
        let wrong = Fields::from(vec![
            Field::new("coords", DataType::Utf8, true),
            Field::new("is_normalized", DataType::Boolean, true),
            Field::new("format", DataType::Utf8, true),
        ]);
        assert!(matches!(
            validate_storage(descriptor, &wrong),
            Err(ArrowlabelError::SchemaMismatch(_))
        ));
    }
}
