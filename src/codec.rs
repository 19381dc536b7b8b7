//! The codec contract between in-memory annotation values and their
//! columnar storage form.
//!
//! Every annotation type implements [`ArrowCodec`]: it declares a semantic
//! identity (the extension name), an ordered physical struct layout, and the
//! two conversion directions. Encoding is batch-first — a slice of optional
//! values becomes one struct array, with `None` entries stored as null rows —
//! and single-value `encode`/`decode` are provided on top of that.
//!
//! Extension identity travels as field metadata (`ARROW:extension:name`),
//! arrow's canonical mechanism. The serialized extension metadata is always
//! empty: the codec itself, not external bytes, defines the layout.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, FixedSizeListBuilder, Float32Array, Float32Builder, StructArray,
};
use arrow::datatypes::{DataType, Field, Fields};

use crate::error::ArrowlabelError;

/// Field metadata key carrying the extension name.
pub const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// Field metadata key carrying serialized extension metadata (always empty).
pub const EXTENSION_METADATA_KEY: &str = "ARROW:extension:metadata";

/// A type with a fixed columnar storage layout and lossless conversions
/// between its value form and that layout.
pub trait ArrowCodec: Sized + Clone {
    /// Semantic identity of this codec, e.g. `"arrowlabel.bbox"`.
    const EXTENSION_NAME: &'static str;

    /// The ordered physical layout: field name to storage type.
    fn storage_fields() -> Fields;

    /// Encodes a batch of optional values into one struct array.
    ///
    /// `None` entries become null rows; the result always has exactly
    /// `items.len()` rows.
    fn encode_column(items: &[Option<Self>]) -> Result<StructArray, ArrowlabelError>;

    /// Decodes row `row` of a struct array.
    ///
    /// A null cell decodes to `Ok(None)`. Columns missing from the array or
    /// holding an unexpected physical type are a [`SchemaMismatch`]; cells
    /// violating a value's own shape contract are a [`MalformedValue`].
    ///
    /// [`SchemaMismatch`]: ArrowlabelError::SchemaMismatch
    /// [`MalformedValue`]: ArrowlabelError::MalformedValue
    fn decode_row(array: &StructArray, row: usize) -> Result<Option<Self>, ArrowlabelError>;

    /// The storage type: a struct of [`storage_fields`](Self::storage_fields).
    fn storage_type() -> DataType {
        DataType::Struct(Self::storage_fields())
    }

    /// A field embedding this codec under `name`, annotated with its
    /// extension identity.
    fn field(name: &str, nullable: bool) -> Field {
        Field::new(name, Self::storage_type(), nullable)
            .with_metadata(extension_metadata(Self::EXTENSION_NAME))
    }

    /// Encodes a single value into a one-row physical struct.
    fn encode(&self) -> Result<StructArray, ArrowlabelError> {
        Self::encode_column(std::slice::from_ref(&Some(self.clone())))
    }

    /// Decodes a one-row physical struct.
    fn decode(array: &StructArray) -> Result<Option<Self>, ArrowlabelError> {
        if array.len() != 1 {
            return Err(ArrowlabelError::SchemaMismatch(format!(
                "expected a single-row struct, got {} rows",
                array.len()
            )));
        }
        Self::decode_row(array, 0)
    }

    /// Decodes every row of a struct array.
    fn decode_column(array: &StructArray) -> Result<Vec<Option<Self>>, ArrowlabelError> {
        (0..array.len()).map(|i| Self::decode_row(array, i)).collect()
    }
}

/// Builds the metadata map that annotates an embedding field with its
/// extension identity.
pub fn extension_metadata(name: &str) -> HashMap<String, String> {
    HashMap::from([
        (EXTENSION_NAME_KEY.to_string(), name.to_string()),
        (EXTENSION_METADATA_KEY.to_string(), String::new()),
    ])
}

/// Returns the extension name a field is annotated with, if any.
pub fn extension_name(field: &Field) -> Option<&str> {
    field.metadata().get(EXTENSION_NAME_KEY).map(String::as_str)
}

/// Storage type of a fixed-size float32 list, as the list builders emit it.
pub(crate) fn float_list_type(size: i32) -> DataType {
    DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), size)
}

/// Storage type of a fixed-size int32 list, as the list builders emit it.
pub(crate) fn int_list_type(size: i32) -> DataType {
    DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Int32, true)), size)
}

/// Fetches a struct column by name, downcast to its concrete array type.
pub(crate) fn column<'a, A: Array + 'static>(
    array: &'a StructArray,
    name: &str,
) -> Result<&'a A, ArrowlabelError> {
    array
        .column_by_name(name)
        .ok_or_else(|| ArrowlabelError::SchemaMismatch(format!("missing column '{name}'")))?
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| {
            ArrowlabelError::SchemaMismatch(format!("column '{name}' has an unexpected physical type"))
        })
}

/// Reads a fixed-size float32 list cell into an array of exactly `N` values.
pub(crate) fn fixed_floats<const N: usize>(
    list: &FixedSizeListArray,
    row: usize,
    what: &str,
) -> Result<[f32; N], ArrowlabelError> {
    let cell = list.value(row);
    let values = cell
        .as_any()
        .downcast_ref::<Float32Array>()
        .ok_or_else(|| {
            ArrowlabelError::SchemaMismatch(format!("'{what}' list does not hold float32 values"))
        })?;
    if values.len() != N {
        return Err(ArrowlabelError::MalformedValue(format!(
            "'{what}' holds {} values, expected {N}",
            values.len()
        )));
    }
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = values.value(i);
    }
    Ok(out)
}

/// Reads a fixed-size int32 list cell into an array of exactly `N` values.
pub(crate) fn fixed_ints<const N: usize>(
    list: &FixedSizeListArray,
    row: usize,
    what: &str,
) -> Result<[i32; N], ArrowlabelError> {
    let cell = list.value(row);
    let values = cell
        .as_any()
        .downcast_ref::<arrow::array::Int32Array>()
        .ok_or_else(|| {
            ArrowlabelError::SchemaMismatch(format!("'{what}' list does not hold int32 values"))
        })?;
    if values.len() != N {
        return Err(ArrowlabelError::MalformedValue(format!(
            "'{what}' holds {} values, expected {N}",
            values.len()
        )));
    }
    let mut out = [0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = values.value(i);
    }
    Ok(out)
}

/// Appends `value` to a fixed-size float list builder, padding the child
/// with placeholder values for null rows so list slots stay aligned.
pub(crate) fn append_floats<const N: usize>(
    builder: &mut FixedSizeListBuilder<Float32Builder>,
    value: Option<&[f32; N]>,
) {
    match value {
        Some(values) => {
            builder.values().append_slice(values);
            builder.append(true);
        }
        None => {
            builder.values().append_slice(&[0.0; N]);
            builder.append(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_metadata_is_empty() {
        let metadata = extension_metadata("arrowlabel.bbox");
        assert_eq!(metadata[EXTENSION_NAME_KEY], "arrowlabel.bbox");
        assert_eq!(metadata[EXTENSION_METADATA_KEY], "");
    }

    #[test]
    fn test_extension_name_roundtrip() {
        let field = Field::new("bbox", DataType::Boolean, true)
            .with_metadata(extension_metadata("arrowlabel.bbox"));
        assert_eq!(extension_name(&field), Some("arrowlabel.bbox"));

        let plain = Field::new("area", DataType::Float32, true);
        assert_eq!(extension_name(&plain), None);
    }
}
