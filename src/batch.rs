//! Batch array builder: sequences of annotation objects to column-oriented
//! arrays and back.
//!
//! Two entry paths produce the same columns. The typed path
//! ([`batch_columns`], [`batch_struct`]) encodes a slice of codec values
//! directly. The plain-structure path ([`rows_to_columns`]) takes exported
//! rows (the `to_dict` form) and builds each column type-directed from the
//! layout descriptor, dispatching registered extension fields through their
//! codec depth-first and converting scalar cells in place.
//!
//! Batch conversion is all-or-nothing: the first failing element fails the
//! whole call, and no partial columns are returned.

use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, BinaryBuilder, BooleanBuilder, FixedSizeListBuilder, Float32Builder,
    Int32Builder, StringBuilder, StructArray,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::codec::ArrowCodec;
use crate::error::ArrowlabelError;
use crate::schema::{self, ColumnDescriptor};

/// A plain-structure row: attribute name to JSON value.
pub type Row = Map<String, Value>;

/// Encodes `items` into one length-N column per attribute of `T`'s layout.
///
/// Attributes backed by a nested codec become N-row struct sub-arrays; plain
/// scalar attributes become primitive arrays. An empty input yields an empty
/// map.
pub fn batch_columns<T: ArrowCodec>(
    items: &[T],
) -> Result<BTreeMap<String, ArrayRef>, ArrowlabelError> {
    if items.is_empty() {
        return Ok(BTreeMap::new());
    }
    let (fields, arrays, _) = batch_struct(items)?.into_parts();
    Ok(fields
        .iter()
        .zip(arrays)
        .map(|(field, array)| (field.name().clone(), array))
        .collect())
}

/// Encodes `items` into a single N-row struct array in layout order.
pub fn batch_struct<T: ArrowCodec>(items: &[T]) -> Result<StructArray, ArrowlabelError> {
    let rows: Vec<Option<T>> = items.iter().cloned().map(Some).collect();
    T::encode_column(&rows)
}

/// Decodes every row of a batch struct array. Null rows are rejected: a
/// batch of objects has no absent elements.
pub fn batch_decode<T: ArrowCodec>(array: &StructArray) -> Result<Vec<T>, ArrowlabelError> {
    (0..array.len())
        .map(|row| {
            T::decode_row(array, row)?.ok_or_else(|| {
                ArrowlabelError::SchemaMismatch(format!("batch row {row} is null"))
            })
        })
        .collect()
}

/// Exports codec values as plain-structure rows mirroring their physical
/// layout field-for-field.
pub fn to_rows<T: Serialize>(items: &[T]) -> Result<Vec<Row>, ArrowlabelError> {
    items
        .iter()
        .map(|item| match serde_json::to_value(item)? {
            Value::Object(row) => Ok(row),
            other => Err(ArrowlabelError::MalformedValue(format!(
                "expected an object row, got {other}"
            ))),
        })
        .collect()
}

/// Rebuilds codec values from plain-structure rows.
pub fn from_rows<T: DeserializeOwned>(rows: &[Row]) -> Result<Vec<T>, ArrowlabelError> {
    rows.iter()
        .map(|row| Ok(serde_json::from_value(Value::Object(row.clone()))?))
        .collect()
}

/// Builds per-attribute columns from plain-structure rows, type-directed by
/// `descriptor`.
///
/// The attribute set is taken from the first row; every later row must carry
/// exactly the same attributes, and each attribute must exist in the
/// layout — any divergence is a
/// [`SchemaMismatch`](ArrowlabelError::SchemaMismatch). An empty input
/// yields an empty map.
pub fn rows_to_columns(
    descriptor: &ColumnDescriptor,
    rows: &[Row],
) -> Result<BTreeMap<String, ArrayRef>, ArrowlabelError> {
    let Some(first) = rows.first() else {
        return Ok(BTreeMap::new());
    };

    let attributes: Vec<&str> = first.keys().map(String::as_str).collect();
    for (index, row) in rows.iter().enumerate().skip(1) {
        if row.len() != attributes.len() || !attributes.iter().all(|name| row.contains_key(*name)) {
            return Err(ArrowlabelError::SchemaMismatch(format!(
                "row {index} attribute set diverges from row 0"
            )));
        }
    }

    let mut columns = BTreeMap::new();
    for name in attributes {
        let field = descriptor
            .storage_fields
            .iter()
            .find(|field| field.name() == name)
            .ok_or_else(|| {
                ArrowlabelError::SchemaMismatch(format!(
                    "attribute '{name}' is not part of layout '{}'",
                    descriptor.extension_name
                ))
            })?;
        let cells: Vec<Option<&Value>> = rows
            .iter()
            .map(|row| row.get(name).filter(|value| !value.is_null()))
            .collect();
        columns.insert(name.to_string(), json_column(field, &cells)?);
    }
    Ok(columns)
}

/// Reassembles externally stored columns into a struct array in layout
/// order. Missing columns, unknown columns, and unequal lengths are
/// [`SchemaMismatch`](ArrowlabelError::SchemaMismatch) errors.
pub fn struct_from_columns(
    descriptor: &ColumnDescriptor,
    columns: &BTreeMap<String, ArrayRef>,
) -> Result<StructArray, ArrowlabelError> {
    for name in columns.keys() {
        if !descriptor
            .storage_fields
            .iter()
            .any(|field| field.name() == name)
        {
            return Err(ArrowlabelError::SchemaMismatch(format!(
                "unknown column '{name}' for layout '{}'",
                descriptor.extension_name
            )));
        }
    }

    let mut arrays = Vec::with_capacity(descriptor.storage_fields.len());
    let mut rows: Option<usize> = None;
    for field in descriptor.storage_fields.iter() {
        let column = columns.get(field.name()).ok_or_else(|| {
            ArrowlabelError::SchemaMismatch(format!("missing column '{}'", field.name()))
        })?;
        match rows {
            None => rows = Some(column.len()),
            Some(expected) if column.len() != expected => {
                return Err(ArrowlabelError::SchemaMismatch(format!(
                    "column '{}' has length {}, expected {expected}",
                    field.name(),
                    column.len()
                )));
            }
            Some(_) => {}
        }
        arrays.push(Arc::clone(column));
    }

    let array = StructArray::try_new(descriptor.storage_fields.clone(), arrays, None)?;
    Ok(array)
}

/// Builds one column from JSON cells, dispatching on the field's declared
/// physical type. Registered extension fields recurse through their own
/// layout.
fn json_column(field: &Field, cells: &[Option<&Value>]) -> Result<ArrayRef, ArrowlabelError> {
    if let Some(nested) = schema::extension_descriptor(field) {
        let objects: Vec<Option<&Row>> = cells
            .iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Some(Value::Object(object)) => Ok(Some(object)),
                Some(_) => Err(malformed_cell(field.name(), row, "an object")),
                None => Ok(None),
            })
            .collect::<Result<_, _>>()?;
        return Ok(Arc::new(json_struct(&nested.storage_fields, &objects)?));
    }

    match field.data_type() {
        DataType::Utf8 => json_strings(field.name(), cells),
        DataType::Float32 => json_floats(field.name(), cells),
        DataType::Int32 => json_ints(field.name(), cells),
        DataType::Boolean => json_bools(field.name(), cells),
        DataType::Binary => json_binary(field.name(), cells),
        DataType::FixedSizeList(child, size) => match child.data_type() {
            DataType::Float32 => json_float_list(field.name(), *size, cells),
            DataType::Int32 => json_int_list(field.name(), *size, cells),
            other => Err(ArrowlabelError::SchemaMismatch(format!(
                "unsupported list element type {other} for '{}'",
                field.name()
            ))),
        },
        other => Err(ArrowlabelError::SchemaMismatch(format!(
            "unsupported physical type {other} for '{}'",
            field.name()
        ))),
    }
}

/// Builds a nested struct column from JSON object cells, one sub-column per
/// layout field.
fn json_struct(fields: &Fields, cells: &[Option<&Row>]) -> Result<StructArray, ArrowlabelError> {
    let mut arrays = Vec::with_capacity(fields.len());
    for field in fields.iter() {
        let sub_cells: Vec<Option<&Value>> = cells
            .iter()
            .map(|cell| {
                cell.and_then(|object| object.get(field.name()))
                    .filter(|value| !value.is_null())
            })
            .collect();
        arrays.push(json_column(field, &sub_cells)?);
    }

    let validity = NullBuffer::from(cells.iter().map(Option::is_some).collect::<Vec<bool>>());
    let array = StructArray::try_new(fields.clone(), arrays, Some(validity))?;
    Ok(array)
}

fn malformed_cell(name: &str, row: usize, expected: &str) -> ArrowlabelError {
    ArrowlabelError::MalformedValue(format!("'{name}' row {row}: expected {expected}"))
}

fn json_strings(name: &str, cells: &[Option<&Value>]) -> Result<ArrayRef, ArrowlabelError> {
    let mut builder = StringBuilder::new();
    for (row, cell) in cells.iter().enumerate() {
        match cell {
            Some(value) => builder.append_value(
                value
                    .as_str()
                    .ok_or_else(|| malformed_cell(name, row, "a string"))?,
            ),
            None => builder.append_null(),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn json_floats(name: &str, cells: &[Option<&Value>]) -> Result<ArrayRef, ArrowlabelError> {
    let mut builder = Float32Builder::new();
    for (row, cell) in cells.iter().enumerate() {
        match cell {
            Some(value) => builder.append_value(
                value
                    .as_f64()
                    .ok_or_else(|| malformed_cell(name, row, "a number"))? as f32,
            ),
            None => builder.append_null(),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn json_ints(name: &str, cells: &[Option<&Value>]) -> Result<ArrayRef, ArrowlabelError> {
    let mut builder = Int32Builder::new();
    for (row, cell) in cells.iter().enumerate() {
        match cell {
            Some(value) => {
                let wide = value
                    .as_i64()
                    .ok_or_else(|| malformed_cell(name, row, "an integer"))?;
                let narrow = i32::try_from(wide)
                    .map_err(|_| malformed_cell(name, row, "a 32-bit integer"))?;
                builder.append_value(narrow);
            }
            None => builder.append_null(),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn json_bools(name: &str, cells: &[Option<&Value>]) -> Result<ArrayRef, ArrowlabelError> {
    let mut builder = BooleanBuilder::new();
    for (row, cell) in cells.iter().enumerate() {
        match cell {
            Some(value) => builder.append_value(
                value
                    .as_bool()
                    .ok_or_else(|| malformed_cell(name, row, "a boolean"))?,
            ),
            None => builder.append_null(),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn json_binary(name: &str, cells: &[Option<&Value>]) -> Result<ArrayRef, ArrowlabelError> {
    let mut builder = BinaryBuilder::new();
    for (row, cell) in cells.iter().enumerate() {
        match cell {
            Some(value) => {
                let bytes = value
                    .as_array()
                    .ok_or_else(|| malformed_cell(name, row, "a byte array"))?
                    .iter()
                    .map(|element| {
                        element
                            .as_u64()
                            .and_then(|wide| u8::try_from(wide).ok())
                            .ok_or_else(|| malformed_cell(name, row, "a byte array"))
                    })
                    .collect::<Result<Vec<u8>, _>>()?;
                builder.append_value(&bytes);
            }
            None => builder.append_null(),
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn json_float_list(
    name: &str,
    size: i32,
    cells: &[Option<&Value>],
) -> Result<ArrayRef, ArrowlabelError> {
    let mut builder = FixedSizeListBuilder::new(Float32Builder::new(), size);
    for (row, cell) in cells.iter().enumerate() {
        match cell {
            Some(value) => {
                let values = value
                    .as_array()
                    .ok_or_else(|| malformed_cell(name, row, "a float list"))?;
                if values.len() != size as usize {
                    return Err(ArrowlabelError::MalformedValue(format!(
                        "'{name}' row {row} holds {} values, expected {size}",
                        values.len()
                    )));
                }
                for element in values {
                    builder.values().append_value(
                        element
                            .as_f64()
                            .ok_or_else(|| malformed_cell(name, row, "a float list"))?
                            as f32,
                    );
                }
                builder.append(true);
            }
            None => {
                for _ in 0..size {
                    builder.values().append_value(0.0);
                }
                builder.append(false);
            }
        }
    }
    Ok(Arc::new(builder.finish()))
}

fn json_int_list(
    name: &str,
    size: i32,
    cells: &[Option<&Value>],
) -> Result<ArrayRef, ArrowlabelError> {
    let mut builder = FixedSizeListBuilder::new(Int32Builder::new(), size);
    for (row, cell) in cells.iter().enumerate() {
        match cell {
            Some(value) => {
                let values = value
                    .as_array()
                    .ok_or_else(|| malformed_cell(name, row, "an integer list"))?;
                if values.len() != size as usize {
                    return Err(ArrowlabelError::MalformedValue(format!(
                        "'{name}' row {row} holds {} values, expected {size}",
                        values.len()
                    )));
                }
                for element in values {
                    let wide = element
                        .as_i64()
                        .ok_or_else(|| malformed_cell(name, row, "an integer list"))?;
                    let narrow = i32::try_from(wide)
                        .map_err(|_| malformed_cell(name, row, "an integer list"))?;
                    builder.values().append_value(narrow);
                }
                builder.append(true);
            }
            None => {
                for _ in 0..size {
                    builder.values().append_value(0);
                }
                builder.append(false);
            }
        }
    }
    Ok(Arc::new(builder.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectAnnotation;

    #[test]
    fn test_empty_batch_yields_empty_column_map() {
        let columns = batch_columns::<ObjectAnnotation>(&[]).unwrap();
        assert!(columns.is_empty());
    }

    #[test]
    fn test_empty_rows_yield_empty_column_map() {
        let descriptor = schema::descriptor_of::<ObjectAnnotation>().unwrap();
        let columns = rows_to_columns(descriptor, &[]).unwrap();
        assert!(columns.is_empty());
    }

    #[test]
    fn test_divergent_row_attributes_are_rejected() {
        let descriptor = schema::descriptor_of::<ObjectAnnotation>().unwrap();
        let rows = to_rows(&[
            ObjectAnnotation::new("a"),
            ObjectAnnotation::new("b"),
        ])
        .unwrap();

        let mut divergent = rows.clone();
        divergent[1].remove("area");
        assert!(matches!(
            rows_to_columns(descriptor, &divergent),
            Err(ArrowlabelError::SchemaMismatch(_))
        ));

        // Same size but a different key set is still a divergence.
        let mut renamed = rows;
        renamed[1].remove("area");
        renamed[1].insert("surface".to_string(), Value::Null);
        assert!(matches!(
            rows_to_columns(descriptor, &renamed),
            Err(ArrowlabelError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let descriptor = schema::descriptor_of::<ObjectAnnotation>().unwrap();
        let mut rows = to_rows(&[ObjectAnnotation::new("a")]).unwrap();
        rows[0].insert("color".to_string(), Value::String("red".into()));
        assert!(matches!(
            rows_to_columns(descriptor, &rows),
            Err(ArrowlabelError::SchemaMismatch(_))
        ));
    }
}
