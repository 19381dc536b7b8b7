//! 6D pose: a 3x3 rotation matrix and a translation vector.

use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, FixedSizeListBuilder, Float32Builder, StructArray,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{Field, Fields};
use serde::{Deserialize, Serialize};

use crate::codec::{append_floats, column, fixed_floats, float_list_type, ArrowCodec};
use crate::error::ArrowlabelError;

/// An object pose as a row-major rotation matrix and a translation vector,
/// both in the camera frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    #[serde(rename = "cam_R_m2c")]
    cam_r_m2c: [f32; 9],
    cam_t_m2c: [f32; 3],
}

impl Pose {
    /// Creates a pose from a row-major rotation matrix and a translation.
    pub fn new(rotation: [f32; 9], translation: [f32; 3]) -> Self {
        Self {
            cam_r_m2c: rotation,
            cam_t_m2c: translation,
        }
    }

    /// The row-major rotation matrix.
    #[inline]
    pub fn rotation(&self) -> [f32; 9] {
        self.cam_r_m2c
    }

    /// The translation vector.
    #[inline]
    pub fn translation(&self) -> [f32; 3] {
        self.cam_t_m2c
    }
}

impl ArrowCodec for Pose {
    const EXTENSION_NAME: &'static str = "arrowlabel.pose";

    fn storage_fields() -> Fields {
        Fields::from(vec![
            Field::new("cam_R_m2c", float_list_type(9), true),
            Field::new("cam_t_m2c", float_list_type(3), true),
        ])
    }

    fn encode_column(items: &[Option<Self>]) -> Result<StructArray, ArrowlabelError> {
        let mut rotation = FixedSizeListBuilder::new(Float32Builder::new(), 9);
        let mut translation = FixedSizeListBuilder::new(Float32Builder::new(), 3);

        for item in items {
            match item {
                Some(pose) => {
                    append_floats(&mut rotation, Some(&pose.cam_r_m2c));
                    append_floats(&mut translation, Some(&pose.cam_t_m2c));
                }
                None => {
                    append_floats::<9>(&mut rotation, None);
                    append_floats::<3>(&mut translation, None);
                }
            }
        }

        let validity = NullBuffer::from(items.iter().map(Option::is_some).collect::<Vec<bool>>());
        let array = StructArray::try_new(
            Self::storage_fields(),
            vec![Arc::new(rotation.finish()), Arc::new(translation.finish())],
            Some(validity),
        )?;
        Ok(array)
    }

    fn decode_row(array: &StructArray, row: usize) -> Result<Option<Self>, ArrowlabelError> {
        if array.is_null(row) {
            return Ok(None);
        }

        let rotation = column::<FixedSizeListArray>(array, "cam_R_m2c")?;
        let translation = column::<FixedSizeListArray>(array, "cam_t_m2c")?;

        if rotation.is_null(row) || translation.is_null(row) {
            return Err(ArrowlabelError::MalformedValue(format!(
                "pose row {row} is present but has null components"
            )));
        }

        Ok(Some(Pose {
            cam_r_m2c: fixed_floats::<9>(rotation, row, "cam_R_m2c")?,
            cam_t_m2c: fixed_floats::<3>(translation, row, "cam_t_m2c")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let pose = Pose::new(
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            [0.5, -0.5, 2.0],
        );
        let row = pose.encode().unwrap();
        assert_eq!(Pose::decode(&row).unwrap(), Some(pose));
    }

    #[test]
    fn test_null_cell_decodes_to_absent() {
        let array = Pose::encode_column(&[None]).unwrap();
        assert_eq!(Pose::decode_row(&array, 0).unwrap(), None);
    }
}
