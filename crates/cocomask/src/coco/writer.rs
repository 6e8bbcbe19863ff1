// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON/ZIP writers.

use super::mask::BinaryMask;
use super::types::{
    CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoInfo, CocoSegmentation,
};
use crate::Error;
use serde::Deserialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use zip::{CompressionMethod, write::SimpleFileOptions};

/// Options for COCO writing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CocoWriteOptions {
    /// Deflate ZIP entries instead of storing them.
    pub compress: bool,
    /// Pretty-print JSON with indentation.
    pub pretty: bool,
}

impl Default for CocoWriteOptions {
    fn default() -> Self {
        Self {
            compress: true,
            pretty: false,
        }
    }
}

/// COCO writer for generating JSON and ZIP files.
///
/// # Example
///
/// ```rust,no_run
/// use cocomask::coco::{CocoDataset, CocoWriter};
///
/// let writer = CocoWriter::new();
/// let dataset = CocoDataset::default();
/// writer.write_json(&dataset, "annotations.json")?;
/// # Ok::<(), cocomask::Error>(())
/// ```
pub struct CocoWriter {
    options: CocoWriteOptions,
}

impl CocoWriter {
    /// Create a new COCO writer with default options.
    pub fn new() -> Self {
        Self {
            options: CocoWriteOptions::default(),
        }
    }

    /// Create a new COCO writer with custom options.
    pub fn with_options(options: CocoWriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CocoWriteOptions {
        &self.options
    }

    /// Write COCO dataset to a JSON file, creating parent directories.
    pub fn write_json<P: AsRef<Path>>(&self, dataset: &CocoDataset, path: P) -> Result<(), Error> {
        create_parent(path.as_ref())?;

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, dataset)?;
        } else {
            serde_json::to_writer(&mut writer, dataset)?;
        }
        writer.flush()?;

        log::debug!(
            "Wrote {} annotations to {}",
            dataset.annotations.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Write COCO dataset as a single JSON entry of a ZIP archive.
    ///
    /// `entry_name` is the path inside the archive, for example
    /// `annotations/instances_val2017.json`.
    pub fn write_zip<P: AsRef<Path>>(
        &self,
        dataset: &CocoDataset,
        path: P,
        entry_name: &str,
    ) -> Result<(), Error> {
        create_parent(path.as_ref())?;

        let file = File::create(path.as_ref())?;
        let mut zip = zip::ZipWriter::new(file);

        let options = if self.options.compress {
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
        } else {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        };

        zip.start_file(entry_name, options)?;
        let json = if self.options.pretty {
            serde_json::to_vec_pretty(dataset)?
        } else {
            serde_json::to_vec(dataset)?
        };
        zip.write_all(&json)?;
        zip.finish()?;

        Ok(())
    }
}

impl Default for CocoWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn create_parent(path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Builder for constructing a COCO dataset.
///
/// Ids are assigned sequentially from 1.
#[derive(Debug)]
pub struct CocoDatasetBuilder {
    dataset: CocoDataset,
    next_image_id: u64,
    next_annotation_id: u64,
    next_category_id: u32,
}

impl CocoDatasetBuilder {
    /// Create a new dataset builder.
    pub fn new() -> Self {
        Self {
            dataset: CocoDataset::default(),
            next_image_id: 1,
            next_annotation_id: 1,
            next_category_id: 1,
        }
    }

    /// Set dataset info.
    pub fn info(mut self, info: CocoInfo) -> Self {
        self.dataset.info = info;
        self
    }

    /// Add a category, returning its ID. Names are unique; adding an
    /// existing name returns the existing ID.
    pub fn add_category(&mut self, name: &str, supercategory: Option<&str>) -> u32 {
        if let Some(cat) = self.dataset.categories.iter().find(|c| c.name == name) {
            return cat.id;
        }

        let id = self.next_category_id;
        self.next_category_id += 1;

        self.dataset.categories.push(CocoCategory {
            id,
            name: name.to_string(),
            supercategory: supercategory.map(String::from),
        });

        id
    }

    /// Add an image, returning its ID.
    pub fn add_image(&mut self, file_name: &str, width: u32, height: u32) -> u64 {
        let id = self.next_image_id;
        self.next_image_id += 1;

        self.dataset.images.push(CocoImage {
            id,
            width,
            height,
            file_name: file_name.to_string(),
            ..Default::default()
        });

        id
    }

    /// Add an annotation with an explicit segmentation, returning its ID.
    ///
    /// Area and bbox are derived from the segmentation.
    pub fn add_annotation(
        &mut self,
        image_id: u64,
        category_id: u32,
        segmentation: CocoSegmentation,
        iscrowd: bool,
    ) -> Result<u64, Error> {
        let area = segmentation.area()?;
        let bbox = segmentation.bbox()?;

        let id = self.next_annotation_id;
        self.next_annotation_id += 1;

        self.dataset.annotations.push(CocoAnnotation {
            id,
            image_id,
            category_id,
            bbox,
            area,
            iscrowd: u8::from(iscrowd),
            segmentation: Some(segmentation),
        });

        Ok(id)
    }

    /// Add a mask annotation, stored as compressed RLE.
    pub fn add_mask(
        &mut self,
        image_id: u64,
        category_id: u32,
        mask: &BinaryMask,
    ) -> Result<u64, Error> {
        self.add_annotation(
            image_id,
            category_id,
            CocoSegmentation::from_mask(mask),
            false,
        )
    }

    /// Build the final dataset.
    pub fn build(self) -> CocoDataset {
        self.dataset
    }
}

impl Default for CocoDatasetBuilder {
    fn default() -> Self {
        Self::new()
    }
}
