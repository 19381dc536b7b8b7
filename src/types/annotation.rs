//! Composite object annotation: geometry, mask, pose, and scalar metadata
//! aggregated into one nested struct layout.

use std::sync::Arc;

use arrow::array::{
    Array, BooleanArray, BooleanBuilder, Float32Array, Float32Builder, Int32Array, Int32Builder,
    StringArray, StringBuilder, StructArray,
};
use arrow::buffer::NullBuffer;
use arrow::datatypes::{DataType, Field, Fields};
use serde::{Deserialize, Serialize};

use crate::codec::{column, ArrowCodec};
use crate::error::ArrowlabelError;

use super::bbox::Bbox;
use super::pose::Pose;
use super::rle::CompressedRle;

/// A single object annotation.
///
/// Every field except `id` is independently nullable. The plain-structure
/// export serializes all fields, present or not, so exported rows always
/// carry the full attribute set of the layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectAnnotation {
    /// Caller-assigned unique ID.
    pub id: String,

    /// View this annotation belongs to (e.g. `"image"`, `"cam_2"`).
    #[serde(default)]
    pub view_id: Option<String>,

    /// Bounding box.
    #[serde(default)]
    pub bbox: Option<Bbox>,

    /// Producer of the bounding box (tool, model, human).
    #[serde(default)]
    pub bbox_source: Option<String>,

    /// Bounding box confidence.
    #[serde(default)]
    pub bbox_confidence: Option<f32>,

    #[serde(default)]
    pub is_group_of: Option<bool>,

    #[serde(default)]
    pub is_difficult: Option<bool>,

    #[serde(default)]
    pub is_truncated: Option<bool>,

    /// Segmentation mask.
    #[serde(default)]
    pub mask: Option<CompressedRle>,

    /// Producer of the mask.
    #[serde(default)]
    pub mask_source: Option<String>,

    /// Object area in pixels.
    #[serde(default)]
    pub area: Option<f32>,

    /// Object pose.
    #[serde(default)]
    pub pose: Option<Pose>,

    #[serde(default)]
    pub category_id: Option<i32>,

    #[serde(default)]
    pub category_name: Option<String>,

    /// Tracked identity across views or frames.
    #[serde(default)]
    pub identity: Option<String>,
}

impl ObjectAnnotation {
    /// Creates an annotation with the given ID and every optional field
    /// absent.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the view ID.
    pub fn with_view_id(mut self, view_id: impl Into<String>) -> Self {
        self.view_id = Some(view_id.into());
        self
    }

    /// Sets the bounding box.
    pub fn with_bbox(mut self, bbox: Bbox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    /// Sets the bounding box source.
    pub fn with_bbox_source(mut self, source: impl Into<String>) -> Self {
        self.bbox_source = Some(source.into());
        self
    }

    /// Sets the bounding box confidence.
    pub fn with_bbox_confidence(mut self, confidence: f32) -> Self {
        self.bbox_confidence = Some(confidence);
        self
    }

    /// Sets the mask.
    pub fn with_mask(mut self, mask: CompressedRle) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Sets the mask source.
    pub fn with_mask_source(mut self, source: impl Into<String>) -> Self {
        self.mask_source = Some(source.into());
        self
    }

    /// Sets the object area.
    pub fn with_area(mut self, area: f32) -> Self {
        self.area = Some(area);
        self
    }

    /// Sets the pose.
    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = Some(pose);
        self
    }

    /// Sets the category ID and name.
    pub fn with_category(mut self, id: i32, name: impl Into<String>) -> Self {
        self.category_id = Some(id);
        self.category_name = Some(name.into());
        self
    }

    /// Sets the tracked identity.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }
}

impl ArrowCodec for ObjectAnnotation {
    const EXTENSION_NAME: &'static str = "arrowlabel.object_annotation";

    fn storage_fields() -> Fields {
        Fields::from(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("view_id", DataType::Utf8, true),
            Bbox::field("bbox", true),
            Field::new("bbox_source", DataType::Utf8, true),
            Field::new("bbox_confidence", DataType::Float32, true),
            Field::new("is_group_of", DataType::Boolean, true),
            Field::new("is_difficult", DataType::Boolean, true),
            Field::new("is_truncated", DataType::Boolean, true),
            CompressedRle::field("mask", true),
            Field::new("mask_source", DataType::Utf8, true),
            Field::new("area", DataType::Float32, true),
            Pose::field("pose", true),
            Field::new("category_id", DataType::Int32, true),
            Field::new("category_name", DataType::Utf8, true),
            Field::new("identity", DataType::Utf8, true),
        ])
    }

    fn encode_column(items: &[Option<Self>]) -> Result<StructArray, ArrowlabelError> {
        let mut id = StringBuilder::new();
        let mut view_id = StringBuilder::new();
        let mut bbox_source = StringBuilder::new();
        let mut bbox_confidence = Float32Builder::new();
        let mut is_group_of = BooleanBuilder::new();
        let mut is_difficult = BooleanBuilder::new();
        let mut is_truncated = BooleanBuilder::new();
        let mut mask_source = StringBuilder::new();
        let mut area = Float32Builder::new();
        let mut category_id = Int32Builder::new();
        let mut category_name = StringBuilder::new();
        let mut identity = StringBuilder::new();

        let mut bboxes = Vec::with_capacity(items.len());
        let mut masks = Vec::with_capacity(items.len());
        let mut poses = Vec::with_capacity(items.len());

        for item in items {
            match item {
                Some(annotation) => {
                    id.append_value(&annotation.id);
                    view_id.append_option(annotation.view_id.as_deref());
                    bbox_source.append_option(annotation.bbox_source.as_deref());
                    bbox_confidence.append_option(annotation.bbox_confidence);
                    is_group_of.append_option(annotation.is_group_of);
                    is_difficult.append_option(annotation.is_difficult);
                    is_truncated.append_option(annotation.is_truncated);
                    mask_source.append_option(annotation.mask_source.as_deref());
                    area.append_option(annotation.area);
                    category_id.append_option(annotation.category_id);
                    category_name.append_option(annotation.category_name.as_deref());
                    identity.append_option(annotation.identity.as_deref());
                    bboxes.push(annotation.bbox);
                    masks.push(annotation.mask.clone());
                    poses.push(annotation.pose);
                }
                None => {
                    // The struct-level null masks this row; the required id
                    // column still needs a value slot.
                    id.append_value("");
                    view_id.append_null();
                    bbox_source.append_null();
                    bbox_confidence.append_null();
                    is_group_of.append_null();
                    is_difficult.append_null();
                    is_truncated.append_null();
                    mask_source.append_null();
                    area.append_null();
                    category_id.append_null();
                    category_name.append_null();
                    identity.append_null();
                    bboxes.push(None);
                    masks.push(None);
                    poses.push(None);
                }
            }
        }

        let validity = NullBuffer::from(items.iter().map(Option::is_some).collect::<Vec<bool>>());
        let array = StructArray::try_new(
            Self::storage_fields(),
            vec![
                Arc::new(id.finish()),
                Arc::new(view_id.finish()),
                Arc::new(Bbox::encode_column(&bboxes)?),
                Arc::new(bbox_source.finish()),
                Arc::new(bbox_confidence.finish()),
                Arc::new(is_group_of.finish()),
                Arc::new(is_difficult.finish()),
                Arc::new(is_truncated.finish()),
                Arc::new(CompressedRle::encode_column(&masks)?),
                Arc::new(mask_source.finish()),
                Arc::new(area.finish()),
                Arc::new(Pose::encode_column(&poses)?),
                Arc::new(category_id.finish()),
                Arc::new(category_name.finish()),
                Arc::new(identity.finish()),
            ],
            Some(validity),
        )?;
        Ok(array)
    }

    fn decode_row(array: &StructArray, row: usize) -> Result<Option<Self>, ArrowlabelError> {
        if array.is_null(row) {
            return Ok(None);
        }

        let id = column::<StringArray>(array, "id")?;
        if id.is_null(row) {
            return Err(ArrowlabelError::MalformedValue(format!(
                "annotation row {row} has a null id"
            )));
        }

        let view_id = column::<StringArray>(array, "view_id")?;
        let bbox_source = column::<StringArray>(array, "bbox_source")?;
        let bbox_confidence = column::<Float32Array>(array, "bbox_confidence")?;
        let is_group_of = column::<BooleanArray>(array, "is_group_of")?;
        let is_difficult = column::<BooleanArray>(array, "is_difficult")?;
        let is_truncated = column::<BooleanArray>(array, "is_truncated")?;
        let mask_source = column::<StringArray>(array, "mask_source")?;
        let area = column::<Float32Array>(array, "area")?;
        let category_id = column::<Int32Array>(array, "category_id")?;
        let category_name = column::<StringArray>(array, "category_name")?;
        let identity = column::<StringArray>(array, "identity")?;

        Ok(Some(ObjectAnnotation {
            id: id.value(row).to_string(),
            view_id: opt_string(view_id, row),
            bbox: Bbox::decode_row(column::<StructArray>(array, "bbox")?, row)?,
            bbox_source: opt_string(bbox_source, row),
            bbox_confidence: (!bbox_confidence.is_null(row)).then(|| bbox_confidence.value(row)),
            is_group_of: (!is_group_of.is_null(row)).then(|| is_group_of.value(row)),
            is_difficult: (!is_difficult.is_null(row)).then(|| is_difficult.value(row)),
            is_truncated: (!is_truncated.is_null(row)).then(|| is_truncated.value(row)),
            mask: CompressedRle::decode_row(column::<StructArray>(array, "mask")?, row)?,
            mask_source: opt_string(mask_source, row),
            area: (!area.is_null(row)).then(|| area.value(row)),
            pose: Pose::decode_row(column::<StructArray>(array, "pose")?, row)?,
            category_id: (!category_id.is_null(row)).then(|| category_id.value(row)),
            category_name: opt_string(category_name, row),
            identity: opt_string(identity, row),
        }))
    }
}

fn opt_string(column: &StringArray, row: usize) -> Option<String> {
    (!column.is_null(row)).then(|| column.value(row).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::bbox::BboxFormat;

    fn sample() -> ObjectAnnotation {
        ObjectAnnotation::new("ann-1")
            .with_view_id("image")
            .with_bbox(Bbox::new([0.1, 0.2, 0.5, 0.6], BboxFormat::Xyxy, true))
            .with_bbox_source("detector")
            .with_bbox_confidence(0.93)
            .with_mask(CompressedRle::new([480, 640], b"b1d2".to_vec()))
            .with_pose(Pose::new([1.0; 9], [0.0; 3]))
            .with_area(12.5)
            .with_category(3, "person")
            .with_identity("track-7")
    }

    #[test]
    fn test_new_has_no_optional_fields() {
        let annotation = ObjectAnnotation::new("ann-1");
        assert_eq!(annotation.id, "ann-1");
        assert_eq!(annotation.bbox, None);
        assert_eq!(annotation.mask, None);
        assert_eq!(annotation.pose, None);
        assert_eq!(annotation.view_id, None);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let annotation = sample();
        let row = annotation.encode().unwrap();
        assert_eq!(ObjectAnnotation::decode(&row).unwrap(), Some(annotation));
    }

    #[test]
    fn test_absent_nested_fields_roundtrip_as_null() {
        let annotation = ObjectAnnotation::new("ann-2").with_category(1, "car");
        let row = annotation.encode().unwrap();

        let bbox = column::<StructArray>(&row, "bbox").unwrap();
        let mask = column::<StructArray>(&row, "mask").unwrap();
        assert!(bbox.is_null(0));
        assert!(mask.is_null(0));

        let restored = ObjectAnnotation::decode(&row).unwrap().unwrap();
        assert_eq!(restored.bbox, None);
        assert_eq!(restored.mask, None);
        assert_eq!(restored, annotation);
    }

    #[test]
    fn test_export_mirrors_physical_layout() {
        let value = serde_json::to_value(sample()).unwrap();
        let object = value.as_object().unwrap();

        let storage_fields = ObjectAnnotation::storage_fields();
        let field_names: Vec<&str> = storage_fields
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        for name in field_names {
            assert!(object.contains_key(name), "missing exported field {name}");
        }
        assert_eq!(object.len(), ObjectAnnotation::storage_fields().len());

        // Nested codec fields export through their own layout.
        let bbox = object["bbox"].as_object().unwrap();
        assert!(bbox.contains_key("coords"));
        assert!(bbox.contains_key("is_normalized"));
        assert!(bbox.contains_key("format"));
        assert_eq!(bbox["format"], "xyxy");
    }
}
