// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON data structures for serde serialization/deserialization.
//!
//! Supports object detection and instance segmentation annotation types.
//! Keypoints, captions, and panoptic segmentation are NOT supported.

use super::mask::Dimensions;
use crate::Error;
use serde::{Deserialize, Deserializer, Serialize};

/// Top-level COCO dataset structure.
///
/// This is the root structure for COCO annotation files like
/// `instances_train2017.json` or `stuff_val2017.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoDataset {
    /// Dataset metadata (optional but commonly present).
    #[serde(default)]
    pub info: CocoInfo,
    /// License information for the images.
    #[serde(default)]
    pub licenses: Vec<CocoLicense>,
    /// List of images in the dataset.
    #[serde(default)]
    pub images: Vec<CocoImage>,
    /// List of annotations (one per object instance).
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    /// List of object categories/classes.
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

/// Dataset metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

/// License information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoLicense {
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Image metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    /// Unique image ID.
    pub id: u64,
    /// Image width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Image height in pixels.
    #[serde(default)]
    pub height: u32,
    /// Filename (relative path within the images folder).
    #[serde(default)]
    pub file_name: String,
    /// License ID (references `CocoLicense.id`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flickr_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coco_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_captured: Option<String>,
}

impl CocoImage {
    /// Pixel dimensions of the image.
    pub fn dims(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Category definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    /// Unique category ID.
    pub id: u32,
    /// Category name (e.g., "person", "banner").
    pub name: String,
    /// Parent category name (e.g., "building" for "banner").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
}

/// Annotation for object detection and instance segmentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// Unique annotation ID.
    pub id: u64,
    /// ID of the image containing this object.
    pub image_id: u64,
    /// Category ID of this object.
    #[serde(default)]
    pub category_id: u32,
    /// Bounding box: `[x, y, width, height]` in pixels (top-left corner).
    #[serde(default)]
    pub bbox: [f64; 4],
    /// Area of the segmentation mask in pixels².
    #[serde(default)]
    pub area: f64,
    /// Whether this is a crowd annotation (0 = single instance, 1 = crowd).
    #[serde(default)]
    pub iscrowd: u8,
    /// Segmentation mask (polygon or RLE format).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<CocoSegmentation>,
}

impl CocoAnnotation {
    /// Whether the crowd flag is set.
    pub fn is_crowd(&self) -> bool {
        self.iscrowd != 0
    }
}

/// Segmentation value attached to an annotation.
///
/// The JSON shape is inspected once, when the value is deserialized, and
/// the matching variant is carried from then on. Shapes are tried in a
/// fixed order: uncompressed RLE (`counts` is a number array), compressed
/// RLE (`counts` is a string), then polygon (nested coordinate arrays).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CocoSegmentation {
    /// Uncompressed RLE with a counts array.
    Rle(CocoRle),
    /// Compressed RLE with a printable counts string.
    CompressedRle(CocoCompressedRle),
    /// Polygon format: `[[x1,y1,x2,y2,...], [x3,y3,...]]`
    ///
    /// Multiple polygons represent disjoint regions of the same object.
    Polygon(Vec<Vec<f64>>),
}

impl CocoSegmentation {
    /// Classify a raw JSON segmentation value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, Error> {
        // Derived struct impls also accept a sequence, so gate on the JSON
        // kind before trying each shape.
        if value.is_object() {
            if let Ok(rle) = CocoRle::deserialize(value) {
                return Ok(CocoSegmentation::Rle(rle));
            }
            if let Ok(rle) = CocoCompressedRle::deserialize(value) {
                return Ok(CocoSegmentation::CompressedRle(rle));
            }
        } else if value.is_array() {
            if let Ok(polygons) = Vec::<Vec<f64>>::deserialize(value) {
                return Ok(CocoSegmentation::Polygon(polygons));
            }
        }

        Err(Error::UnrecognizedSegmentation(describe_shape(value)))
    }

    /// Short name of the variant, used in log and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            CocoSegmentation::Rle(_) => "rle",
            CocoSegmentation::CompressedRle(_) => "compressed-rle",
            CocoSegmentation::Polygon(_) => "polygon",
        }
    }
}

impl<'de> Deserialize<'de> for CocoSegmentation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        CocoSegmentation::from_value(&value).map_err(serde::de::Error::custom)
    }
}

fn describe_shape(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "bare string".to_string(),
        Value::Array(items) => format!("array of {} non-polygon items", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}

/// Uncompressed RLE (Run-Length Encoding) segmentation.
///
/// The counts array alternates between background and foreground pixel runs,
/// starting with background. The encoding is **column-major** (Fortran order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoRle {
    /// Run-length counts: `[bg_run, fg_run, bg_run, fg_run, ...]`
    pub counts: Vec<u32>,
    /// Image size as `[height, width]` (NOT `[width, height]`!)
    pub size: [u32; 2],
}

/// Compressed RLE segmentation.
///
/// The counts string packs the same runs as [`CocoRle`] into printable ASCII
/// (see [`pack_counts`](super::pack_counts)).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCompressedRle {
    /// Packed counts string.
    pub counts: String,
    /// Image size as `[height, width]`.
    pub size: [u32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_dataset_default() {
        let dataset = CocoDataset::default();
        assert!(dataset.images.is_empty());
        assert!(dataset.annotations.is_empty());
        assert!(dataset.categories.is_empty());
    }

    #[test]
    fn test_coco_segmentation_polygon_deserialize() {
        let json = r#"[[100.0, 200.0, 150.0, 250.0, 100.0, 250.0]]"#;
        let seg: CocoSegmentation = serde_json::from_str(json).unwrap();

        match seg {
            CocoSegmentation::Polygon(polys) => {
                assert_eq!(polys.len(), 1);
                assert_eq!(polys[0].len(), 6);
            }
            _ => panic!("Expected polygon segmentation"),
        }
    }

    #[test]
    fn test_coco_segmentation_rle_deserialize() {
        let json = r#"{"counts": [10, 20, 30, 40], "size": [100, 200]}"#;
        let seg: CocoSegmentation = serde_json::from_str(json).unwrap();

        match seg {
            CocoSegmentation::Rle(rle) => {
                assert_eq!(rle.counts, vec![10, 20, 30, 40]);
                assert_eq!(rle.size, [100, 200]);
            }
            _ => panic!("Expected RLE segmentation"),
        }
    }

    #[test]
    fn test_coco_segmentation_compressed_rle_deserialize() {
        let json = r#"{"counts": "564LM040L0", "size": [5, 6]}"#;
        let seg: CocoSegmentation = serde_json::from_str(json).unwrap();

        assert_eq!(
            seg,
            CocoSegmentation::CompressedRle(CocoCompressedRle {
                counts: "564LM040L0".to_string(),
                size: [5, 6],
            })
        );
        assert_eq!(seg.kind(), "compressed-rle");
    }

    #[test]
    fn test_coco_segmentation_empty_counts_is_uncompressed() {
        let json = r#"{"counts": [], "size": [0, 0]}"#;
        let seg: CocoSegmentation = serde_json::from_str(json).unwrap();
        assert_eq!(seg.kind(), "rle");
    }

    #[test]
    fn test_coco_segmentation_integer_polygon() {
        // Two rings, the second one the same length as a `size` pair.
        let value = serde_json::json!([[10, 20, 30, 20, 30, 40], [5, 6]]);
        let seg = CocoSegmentation::from_value(&value).unwrap();

        assert_eq!(seg.kind(), "polygon");
        assert_eq!(
            seg,
            CocoSegmentation::Polygon(vec![
                vec![10.0, 20.0, 30.0, 20.0, 30.0, 40.0],
                vec![5.0, 6.0]
            ])
        );
        assert!(serde_json::to_value(&seg).unwrap().is_array());

        let parsed: CocoSegmentation = serde_json::from_str("[[1, 2], [3, 4]]").unwrap();
        assert!(matches!(parsed, CocoSegmentation::Polygon(_)));
    }

    #[test]
    fn test_coco_segmentation_unrecognized() {
        let value = serde_json::json!({"counts": true, "size": [1, 1]});
        let err = CocoSegmentation::from_value(&value).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedSegmentation(_)));

        let value = serde_json::json!("not a segmentation");
        assert!(matches!(
            CocoSegmentation::from_value(&value),
            Err(Error::UnrecognizedSegmentation(_))
        ));

        // Negative counts do not fit the uncompressed shape.
        let value = serde_json::json!({"counts": [-1, 3], "size": [1, 2]});
        assert!(matches!(
            CocoSegmentation::from_value(&value),
            Err(Error::UnrecognizedSegmentation(_))
        ));
    }

    #[test]
    fn test_unrecognized_segmentation_fails_dataset_parse() {
        let json = r#"{
            "images": [],
            "annotations": [{"id": 1, "image_id": 1, "segmentation": {"foo": 1}}]
        }"#;
        let err = serde_json::from_str::<CocoDataset>(json).unwrap_err();
        assert!(err.to_string().contains("Unrecognized segmentation"));
    }

    #[test]
    fn test_segmentation_serialize_shapes() {
        let seg = CocoSegmentation::CompressedRle(CocoCompressedRle {
            counts: "564LM040L0".to_string(),
            size: [5, 6],
        });
        assert_eq!(
            serde_json::to_value(&seg).unwrap(),
            serde_json::json!({"counts": "564LM040L0", "size": [5, 6]})
        );

        let seg = CocoSegmentation::Rle(CocoRle {
            counts: vec![5, 25],
            size: [5, 6],
        });
        assert_eq!(
            serde_json::to_value(&seg).unwrap(),
            serde_json::json!({"counts": [5, 25], "size": [5, 6]})
        );
    }

    #[test]
    fn test_coco_annotation_roundtrip() {
        let ann = CocoAnnotation {
            id: 12345,
            image_id: 67890,
            category_id: 1,
            bbox: [100.5, 200.5, 50.0, 80.0],
            area: 4000.0,
            iscrowd: 0,
            segmentation: Some(CocoSegmentation::Polygon(vec![vec![
                100.0, 200.0, 150.0, 200.0, 150.0, 280.0, 100.0, 280.0,
            ]])),
        };

        let json = serde_json::to_string(&ann).unwrap();
        let restored: CocoAnnotation = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id, ann.id);
        assert_eq!(restored.image_id, ann.image_id);
        assert_eq!(restored.category_id, ann.category_id);
        assert_eq!(restored.bbox, ann.bbox);
        assert_eq!(restored.segmentation, ann.segmentation);
    }
}
