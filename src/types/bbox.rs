//! Bounding box value type and its columnar codec.
//!
//! A [`Bbox`] carries exactly four coordinates, a closed coordinate-format
//! tag, and a normalization flag. Format conversions are pure functions
//! returning new values; the two formats are lossless inverses of each
//! other.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, BooleanBuilder, FixedSizeListArray, FixedSizeListBuilder, Float32Builder,
    StringArray, StringBuilder, StructArray,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields};
use serde::{Deserialize, Serialize};

use crate::codec::{append_floats, column, fixed_floats, float_list_type, ArrowCodec};
use crate::error::ArrowlabelError;

/// Coordinate encoding of a bounding box.
///
/// `Xyxy` is (xmin, ymin, xmax, ymax); `Xywh` is (x, y, width, height) with
/// (x, y) the top-left corner, as COCO uses. Any tag outside this set is
/// rejected at parse time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BboxFormat {
    Xyxy,
    Xywh,
}

impl BboxFormat {
    /// The storage tag for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            BboxFormat::Xyxy => "xyxy",
            BboxFormat::Xywh => "xywh",
        }
    }
}

impl fmt::Display for BboxFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BboxFormat {
    type Err = ArrowlabelError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "xyxy" => Ok(BboxFormat::Xyxy),
            "xywh" => Ok(BboxFormat::Xywh),
            other => Err(ArrowlabelError::MalformedValue(format!(
                "unknown bbox format '{other}' (expected 'xyxy' or 'xywh')"
            ))),
        }
    }
}

/// Converts (x, y, width, height) coordinates to (xmin, ymin, xmax, ymax).
#[inline]
pub fn xywh_to_xyxy([x, y, w, h]: [f32; 4]) -> [f32; 4] {
    [x, y, x + w, y + h]
}

/// Converts (xmin, ymin, xmax, ymax) coordinates to (x, y, width, height).
#[inline]
pub fn xyxy_to_xywh([xmin, ymin, xmax, ymax]: [f32; 4]) -> [f32; 4] {
    [xmin, ymin, xmax - xmin, ymax - ymin]
}

/// An axis-aligned bounding box in xyxy or xywh format.
///
/// The coordinate count is fixed at four by construction. Raw decode paths
/// that take external lists validate the count eagerly and fail with
/// [`MalformedValue`](ArrowlabelError::MalformedValue) on anything else.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    coords: [f32; 4],
    is_normalized: bool,
    format: BboxFormat,
}

impl Bbox {
    /// Creates a bounding box from coordinates in the given format.
    pub fn new(coords: [f32; 4], format: BboxFormat, is_normalized: bool) -> Self {
        Self {
            coords,
            is_normalized,
            format,
        }
    }

    /// Creates a bounding box from xyxy coordinates, assumed normalized.
    pub fn from_xyxy(coords: [f32; 4]) -> Self {
        Self::new(coords, BboxFormat::Xyxy, true)
    }

    /// Creates a bounding box from xywh coordinates, assumed normalized.
    pub fn from_xywh(coords: [f32; 4]) -> Self {
        Self::new(coords, BboxFormat::Xywh, true)
    }

    /// The coordinates in the box's current format.
    #[inline]
    pub fn coords(&self) -> [f32; 4] {
        self.coords
    }

    /// The coordinate format of this box.
    #[inline]
    pub fn format(&self) -> BboxFormat {
        self.format
    }

    /// Whether the coordinates are normalized to [0, 1].
    #[inline]
    pub fn is_normalized(&self) -> bool {
        self.is_normalized
    }

    /// The coordinates as (xmin, ymin, xmax, ymax), converting if needed.
    pub fn to_xyxy(&self) -> [f32; 4] {
        match self.format {
            BboxFormat::Xyxy => self.coords,
            BboxFormat::Xywh => xywh_to_xyxy(self.coords),
        }
    }

    /// The coordinates as (x, y, width, height), converting if needed.
    pub fn to_xywh(&self) -> [f32; 4] {
        match self.format {
            BboxFormat::Xywh => self.coords,
            BboxFormat::Xyxy => xyxy_to_xywh(self.coords),
        }
    }

    /// Returns this box in xyxy format. Converting a box already in xyxy
    /// format is the identity.
    pub fn format_xyxy(&self) -> Bbox {
        Bbox {
            coords: self.to_xyxy(),
            is_normalized: self.is_normalized,
            format: BboxFormat::Xyxy,
        }
    }

    /// Returns this box in xywh format. Converting a box already in xywh
    /// format is the identity.
    pub fn format_xywh(&self) -> Bbox {
        Bbox {
            coords: self.to_xywh(),
            is_normalized: self.is_normalized,
            format: BboxFormat::Xywh,
        }
    }

    /// Rescales pixel coordinates into [0, 1] by the given image dimensions.
    ///
    /// Both dimensions must be strictly positive.
    pub fn normalize(&self, height: u32, width: u32) -> Result<Bbox, ArrowlabelError> {
        let (h, w) = positive_dimensions(height, width)?;
        let [a, b, c, d] = self.coords;
        Ok(Bbox {
            coords: [a / w, b / h, c / w, d / h],
            is_normalized: true,
            format: self.format,
        })
    }

    /// Scales normalized coordinates back up to pixel values. The inverse
    /// of [`normalize`](Self::normalize).
    pub fn denormalize(&self, height: u32, width: u32) -> Result<Bbox, ArrowlabelError> {
        let (h, w) = positive_dimensions(height, width)?;
        let [a, b, c, d] = self.coords;
        Ok(Bbox {
            coords: [a * w, b * h, c * w, d * h],
            is_normalized: false,
            format: self.format,
        })
    }
}

fn positive_dimensions(height: u32, width: u32) -> Result<(f32, f32), ArrowlabelError> {
    if height == 0 || width == 0 {
        return Err(ArrowlabelError::MalformedValue(format!(
            "image dimensions must be positive, got {height}x{width}"
        )));
    }
    Ok((height as f32, width as f32))
}

impl ArrowCodec for Bbox {
    const EXTENSION_NAME: &'static str = "arrowlabel.bbox";

    fn storage_fields() -> Fields {
        Fields::from(vec![
            Field::new("coords", float_list_type(4), true),
            Field::new("is_normalized", DataType::Boolean, true),
            Field::new("format", DataType::Utf8, true),
        ])
    }

    fn encode_column(items: &[Option<Self>]) -> Result<StructArray, ArrowlabelError> {
        let mut coords = FixedSizeListBuilder::new(Float32Builder::new(), 4);
        let mut is_normalized = BooleanBuilder::new();
        let mut format = StringBuilder::new();

        for item in items {
            match item {
                Some(bbox) => {
                    append_floats(&mut coords, Some(&bbox.coords));
                    is_normalized.append_value(bbox.is_normalized);
                    format.append_value(bbox.format.as_str());
                }
                None => {
                    append_floats::<4>(&mut coords, None);
                    is_normalized.append_null();
                    format.append_null();
                }
            }
        }

        let validity = NullBuffer::from(items.iter().map(Option::is_some).collect::<Vec<bool>>());
        let array = StructArray::try_new(
            Self::storage_fields(),
            vec![
                Arc::new(coords.finish()),
                Arc::new(is_normalized.finish()),
                Arc::new(format.finish()),
            ],
            Some(validity),
        )?;
        Ok(array)
    }

    fn decode_row(array: &StructArray, row: usize) -> Result<Option<Self>, ArrowlabelError> {
        if array.is_null(row) {
            return Ok(None);
        }

        let coords_column = column::<FixedSizeListArray>(array, "coords")?;
        let normalized_column = column::<BooleanArray>(array, "is_normalized")?;
        let format_column = column::<StringArray>(array, "format")?;

        if coords_column.is_null(row) || normalized_column.is_null(row) || format_column.is_null(row)
        {
            return Err(ArrowlabelError::MalformedValue(format!(
                "bbox row {row} is present but has null coords, is_normalized, or format"
            )));
        }

        let coords = fixed_floats::<4>(coords_column, row, "coords")?;
        let format = BboxFormat::from_str(format_column.value(row))?;

        Ok(Some(Bbox {
            coords,
            is_normalized: normalized_column.value(row),
            format,
        }))
    }
}
