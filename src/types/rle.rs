//! Compressed run-length-encoded segmentation mask.
//!
//! The run stream is opaque to this crate: it is stored and round-tripped
//! byte-for-byte, never decoded.

use std::sync::Arc;

use arrow::array::{
    Array, BinaryArray, BinaryBuilder, FixedSizeListArray, FixedSizeListBuilder, Int32Builder,
    StructArray,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields};
use serde::{Deserialize, Serialize};

use crate::codec::{column, fixed_ints, int_list_type, ArrowCodec};
use crate::error::ArrowlabelError;

/// A COCO-style compressed RLE mask: mask dimensions plus the encoded run
/// stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedRle {
    size: [i32; 2],
    counts: Vec<u8>,
}

impl CompressedRle {
    /// Creates a mask from its dimensions (`[height, width]`) and encoded
    /// run stream.
    pub fn new(size: [i32; 2], counts: Vec<u8>) -> Self {
        Self { size, counts }
    }

    /// The mask dimensions as `[height, width]`.
    #[inline]
    pub fn size(&self) -> [i32; 2] {
        self.size
    }

    /// The opaque encoded run stream.
    #[inline]
    pub fn counts(&self) -> &[u8] {
        &self.counts
    }
}

impl ArrowCodec for CompressedRle {
    const EXTENSION_NAME: &'static str = "arrowlabel.rle";

    fn storage_fields() -> Fields {
        Fields::from(vec![
            Field::new("size", int_list_type(2), true),
            Field::new("counts", DataType::Binary, true),
        ])
    }

    fn encode_column(items: &[Option<Self>]) -> Result<StructArray, ArrowlabelError> {
        let mut size = FixedSizeListBuilder::new(Int32Builder::new(), 2);
        let mut counts = BinaryBuilder::new();

        for item in items {
            match item {
                Some(mask) => {
                    size.values().append_slice(&mask.size);
                    size.append(true);
                    counts.append_value(&mask.counts);
                }
                None => {
                    size.values().append_slice(&[0, 0]);
                    size.append(false);
                    counts.append_null();
                }
            }
        }

        let validity = NullBuffer::from(items.iter().map(Option::is_some).collect::<Vec<bool>>());
        let array = StructArray::try_new(
            Self::storage_fields(),
            vec![Arc::new(size.finish()), Arc::new(counts.finish())],
            Some(validity),
        )?;
        Ok(array)
    }

    fn decode_row(array: &StructArray, row: usize) -> Result<Option<Self>, ArrowlabelError> {
        if array.is_null(row) {
            return Ok(None);
        }

        let size = column::<FixedSizeListArray>(array, "size")?;
        let counts = column::<BinaryArray>(array, "counts")?;

        if size.is_null(row) || counts.is_null(row) {
            return Err(ArrowlabelError::MalformedValue(format!(
                "mask row {row} is present but has null size or counts"
            )));
        }

        Ok(Some(CompressedRle {
            size: fixed_ints::<2>(size, row, "size")?,
            counts: counts.value(row).to_vec(),
        }))
    }
}
