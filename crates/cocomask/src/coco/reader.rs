// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON/ZIP readers.
//!
//! Reads annotation files from plain JSON, ZIP archives or a directory tree
//! of JSON files, merging multiple annotation files into one dataset.

use super::types::*;
use crate::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Options for COCO reading.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CocoReadOptions {
    /// If true, validate all annotations during reading.
    pub validate: bool,
    /// Maximum number of images to read (0 = unlimited).
    pub max_images: usize,
    /// Filter by category names (empty = all).
    pub category_filter: Vec<String>,
}

/// COCO reader.
///
/// # Example
///
/// ```rust,no_run
/// use cocomask::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let dataset = reader.read_json("annotations/stuff_val2017.json")?;
/// println!("Loaded {} images", dataset.images.len());
/// # Ok::<(), cocomask::Error>(())
/// ```
pub struct CocoReader {
    options: CocoReadOptions,
}

impl CocoReader {
    /// Create a new COCO reader with default options.
    pub fn new() -> Self {
        Self {
            options: CocoReadOptions::default(),
        }
    }

    /// Create a new COCO reader with custom options.
    pub fn with_options(options: CocoReadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CocoReadOptions {
        &self.options
    }

    /// Read COCO dataset from a JSON file.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let path = path.as_ref();
        log::debug!("Reading COCO annotations from {}", path.display());

        let file = File::open(path)?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        let dataset: CocoDataset = serde_json::from_reader(reader)?;

        self.finish(dataset)
    }

    /// Read COCO dataset from an in-memory JSON document.
    pub fn read_slice(&self, json: &[u8]) -> Result<CocoDataset, Error> {
        let dataset: CocoDataset = serde_json::from_slice(json)?;
        self.finish(dataset)
    }

    /// Read COCO annotations from a ZIP file.
    ///
    /// Every `*.json` entry whose name contains `instances` is parsed and
    /// merged, in archive order.
    pub fn read_annotations_zip<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let file = File::open(path.as_ref())?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut merged = CocoDataset::default();
        let mut found = 0usize;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();

            if name.ends_with(".json") && name.contains("instances") {
                let mut contents = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut contents)?;

                let dataset: CocoDataset = serde_json::from_slice(&contents)?;
                log::debug!(
                    "{}: {} images, {} annotations",
                    name,
                    dataset.images.len(),
                    dataset.annotations.len()
                );
                merge_datasets(&mut merged, dataset);
                found += 1;
            }
        }

        if found == 0 {
            log::warn!(
                "No instances annotation files found in {}",
                path.as_ref().display()
            );
        }

        self.finish(merged)
    }

    /// Read and merge every `*.json` file below a directory.
    ///
    /// Files are visited in sorted path order so the merge is reproducible.
    pub fn read_directory<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(Error::InvalidParameters(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let mut merged = CocoDataset::default();

        for entry in walkdir::WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let is_json = entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if !is_json {
                continue;
            }

            log::debug!("Reading {}", entry.path().display());
            let file = File::open(entry.path())?;
            let dataset: CocoDataset = serde_json::from_reader(BufReader::new(file))?;
            merge_datasets(&mut merged, dataset);
        }

        self.finish(merged)
    }

    fn finish(&self, dataset: CocoDataset) -> Result<CocoDataset, Error> {
        if self.options.validate {
            validate_dataset(&dataset)?;
        }
        Ok(self.apply_filters(dataset))
    }

    /// Apply filters from options to the dataset.
    fn apply_filters(&self, mut dataset: CocoDataset) -> CocoDataset {
        if self.options.max_images > 0 && dataset.images.len() > self.options.max_images {
            let image_ids: HashSet<_> = dataset
                .images
                .iter()
                .take(self.options.max_images)
                .map(|i| i.id)
                .collect();

            dataset.images.truncate(self.options.max_images);
            dataset
                .annotations
                .retain(|a| image_ids.contains(&a.image_id));
        }

        if !self.options.category_filter.is_empty() {
            let category_ids: HashSet<_> = dataset
                .categories
                .iter()
                .filter(|c| self.options.category_filter.contains(&c.name))
                .map(|c| c.id)
                .collect();

            dataset
                .categories
                .retain(|c| self.options.category_filter.contains(&c.name));
            dataset
                .annotations
                .retain(|a| category_ids.contains(&a.category_id));
        }

        dataset
    }
}

impl Default for CocoReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate a COCO dataset for consistency.
///
/// Every annotation must reference a known image and category, carry a
/// positive bbox, and any RLE segmentation must be sized like its image.
pub fn validate_dataset(dataset: &CocoDataset) -> Result<(), Error> {
    let images: std::collections::HashMap<_, _> =
        dataset.images.iter().map(|i| (i.id, i)).collect();
    let category_ids: HashSet<_> = dataset.categories.iter().map(|c| c.id).collect();

    for ann in &dataset.annotations {
        let Some(image) = images.get(&ann.image_id) else {
            return Err(Error::CocoError(format!(
                "Annotation {} references non-existent image_id {}",
                ann.id, ann.image_id
            )));
        };

        if !category_ids.contains(&ann.category_id) {
            return Err(Error::CocoError(format!(
                "Annotation {} references non-existent category_id {}",
                ann.id, ann.category_id
            )));
        }

        if ann.bbox[2] <= 0.0 || ann.bbox[3] <= 0.0 {
            return Err(Error::CocoError(format!(
                "Annotation {} has invalid bbox dimensions",
                ann.id
            )));
        }

        if let Some(size) = ann.segmentation.as_ref().and_then(|s| s.dims())
            && size != image.dims()
        {
            return Err(Error::CocoError(format!(
                "Annotation {} segmentation is {} but image {} is {}",
                ann.id,
                size,
                image.id,
                image.dims()
            )));
        }
    }

    Ok(())
}

/// Merge a source dataset into a target dataset.
///
/// Images, categories and licenses are de-duplicated by id (first wins);
/// annotations are always appended.
pub fn merge_datasets(target: &mut CocoDataset, source: CocoDataset) {
    if target.info.description.is_none() {
        target.info = source.info;
    }

    let existing_ids: HashSet<_> = target.images.iter().map(|i| i.id).collect();
    target
        .images
        .extend(source.images.into_iter().filter(|i| !existing_ids.contains(&i.id)));

    let existing_cats: HashSet<_> = target.categories.iter().map(|c| c.id).collect();
    target.categories.extend(
        source
            .categories
            .into_iter()
            .filter(|c| !existing_cats.contains(&c.id)),
    );

    target.annotations.extend(source.annotations);

    let existing_licenses: HashSet<_> = target.licenses.iter().map(|l| l.id).collect();
    target.licenses.extend(
        source
            .licenses
            .into_iter()
            .filter(|l| !existing_licenses.contains(&l.id)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const STUFF_JSON: &str = r#"{
        "info": {"description": "stuff", "year": 2017},
        "licenses": [{"id": 1, "name": "CC"}],
        "images": [
            {"id": 1, "width": 6, "height": 5, "file_name": "a.jpg"},
            {"id": 2, "width": 4, "height": 4, "file_name": "b.jpg"}
        ],
        "annotations": [
            {"id": 10, "image_id": 1, "category_id": 92, "area": 14.0,
             "bbox": [1, 0, 5, 5], "iscrowd": 0,
             "segmentation": {"counts": "564LM040L0", "size": [5, 6]}},
            {"id": 11, "image_id": 2, "category_id": 93, "area": 16.0,
             "bbox": [0, 0, 4, 4], "iscrowd": 0,
             "segmentation": {"counts": [0, 16], "size": [4, 4]}}
        ],
        "categories": [
            {"id": 92, "name": "banner", "supercategory": "textile"},
            {"id": 93, "name": "blanket", "supercategory": "textile"}
        ]
    }"#;

    fn image(id: u64) -> CocoImage {
        CocoImage {
            id,
            width: 640,
            height: 480,
            file_name: format!("img{}.jpg", id),
            ..Default::default()
        }
    }

    fn person() -> CocoCategory {
        CocoCategory {
            id: 1,
            name: "person".to_string(),
            supercategory: None,
        }
    }

    #[test]
    fn test_reader_default() {
        let reader = CocoReader::new();
        assert!(!reader.options().validate);
        assert_eq!(reader.options().max_images, 0);
        assert!(reader.options().category_filter.is_empty());
    }

    #[test]
    fn test_read_options_deserialize_partial() {
        let options: CocoReadOptions =
            serde_json::from_str(r#"{"max_images": 3}"#).unwrap();
        assert_eq!(options.max_images, 3);
        assert!(!options.validate);
    }

    #[test]
    fn test_read_slice() {
        let dataset = CocoReader::new().read_slice(STUFF_JSON.as_bytes()).unwrap();
        assert_eq!(dataset.images.len(), 2);
        assert_eq!(dataset.annotations.len(), 2);
        assert_eq!(
            dataset.annotations[0].segmentation.as_ref().map(|s| s.kind()),
            Some("compressed-rle")
        );
        assert_eq!(
            dataset.annotations[1].segmentation.as_ref().map(|s| s.kind()),
            Some("rle")
        );
    }

    #[test]
    fn test_read_json_with_validation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stuff.json");
        std::fs::write(&path, STUFF_JSON).unwrap();

        let reader = CocoReader::with_options(CocoReadOptions {
            validate: true,
            ..Default::default()
        });
        let dataset = reader.read_json(&path).unwrap();
        assert_eq!(dataset.info.year, Some(2017));
    }

    #[test]
    fn test_read_json_missing_file() {
        let err = CocoReader::new()
            .read_json("/nonexistent/stuff.json")
            .unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }

    #[test]
    fn test_read_annotations_zip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("annotations.zip");

        {
            let file = File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            zip.start_file("annotations/instances_val.json", options)
                .unwrap();
            zip.write_all(STUFF_JSON.as_bytes()).unwrap();
            zip.start_file("annotations/captions_val.json", options)
                .unwrap();
            zip.write_all(b"not json").unwrap();
            zip.finish().unwrap();
        }

        let dataset = CocoReader::new().read_annotations_zip(&path).unwrap();
        assert_eq!(dataset.images.len(), 2);
        assert_eq!(dataset.categories.len(), 2);
    }

    #[test]
    fn test_read_directory_merges() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.json"), STUFF_JSON).unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(
            dir.path().join("nested").join("b.json"),
            r#"{"images": [{"id": 3, "width": 2, "height": 2}],
                "annotations": [{"id": 12, "image_id": 3, "category_id": 92,
                                 "bbox": [0, 0, 1, 1]}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("readme.txt"), "ignored").unwrap();

        let dataset = CocoReader::new().read_directory(dir.path()).unwrap();
        assert_eq!(dataset.images.len(), 3);
        assert_eq!(dataset.annotations.len(), 3);
        assert_eq!(dataset.categories.len(), 2);
    }

    #[test]
    fn test_read_directory_rejects_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.json");
        std::fs::write(&path, STUFF_JSON).unwrap();
        assert!(matches!(
            CocoReader::new().read_directory(&path),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_validate_dataset_missing_image() {
        let dataset = CocoDataset {
            categories: vec![person()],
            annotations: vec![CocoAnnotation {
                id: 1,
                image_id: 999,
                category_id: 1,
                bbox: [10.0, 20.0, 100.0, 80.0],
                ..Default::default()
            }],
            ..Default::default()
        };

        assert!(validate_dataset(&dataset).is_err());
    }

    #[test]
    fn test_validate_dataset_segmentation_size() {
        let mut dataset = CocoReader::new().read_slice(STUFF_JSON.as_bytes()).unwrap();
        assert!(validate_dataset(&dataset).is_ok());

        dataset.images[0].width = 7;
        let err = validate_dataset(&dataset).unwrap_err();
        assert!(err.to_string().contains("Annotation 10"));
    }

    #[test]
    fn test_merge_datasets() {
        let mut target = CocoDataset {
            images: vec![image(1)],
            categories: vec![person()],
            ..Default::default()
        };

        let source = CocoDataset {
            images: vec![image(1), image(2)],
            categories: vec![CocoCategory {
                id: 2,
                name: "car".to_string(),
                supercategory: None,
            }],
            ..Default::default()
        };

        merge_datasets(&mut target, source);

        assert_eq!(target.images.len(), 2);
        assert_eq!(target.categories.len(), 2);
    }

    #[test]
    fn test_apply_filters() {
        let reader = CocoReader::with_options(CocoReadOptions {
            max_images: 1,
            category_filter: vec!["banner".to_string()],
            ..Default::default()
        });

        let dataset = reader.read_slice(STUFF_JSON.as_bytes()).unwrap();
        assert_eq!(dataset.images.len(), 1);
        assert_eq!(dataset.categories.len(), 1);
        assert_eq!(dataset.annotations.len(), 1);
        assert_eq!(dataset.annotations[0].id, 10);
    }
}
