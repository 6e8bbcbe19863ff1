// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Read-only lookup index over a COCO dataset.
//!
//! The index is built once from a parsed [`CocoDataset`] and never mutated
//! afterwards, so it can be shared freely across threads.

use super::mask::BinaryMask;
use super::segmentation::PolygonRasterizer;
use super::types::{CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoInfo, CocoLicense};
use crate::Error;
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

/// Lookup tables for filtered access to images, annotations and categories.
///
/// Entities stay in the owned dataset; the maps hold positions into its
/// vectors. When an id appears more than once the last entry wins.
#[derive(Debug, Clone)]
pub struct CocoIndex {
    dataset: CocoDataset,
    /// `image_id` → position in `dataset.images`
    images: HashMap<u64, usize>,
    /// `annotation_id` → position in `dataset.annotations`
    annotations: HashMap<u64, usize>,
    /// `category_id` → position in `dataset.categories`
    categories: HashMap<u32, usize>,
    /// `image_id` → annotation ids, in dataset order
    image_annotations: HashMap<u64, Vec<u64>>,
    /// `category_id` → ids of images with at least one such annotation
    category_images: HashMap<u32, Vec<u64>>,
}

impl CocoIndex {
    /// Build the index from a parsed dataset.
    pub fn new(dataset: CocoDataset) -> Self {
        #[cfg(feature = "profiling")]
        let _span = crate::instrument::info_span!(
            "build_index",
            images = dataset.images.len(),
            annotations = dataset.annotations.len()
        )
        .entered();

        let images = position_map(dataset.images.iter().map(|img| img.id), "image");
        let categories = position_map(dataset.categories.iter().map(|cat| cat.id), "category");
        let annotations = position_map(dataset.annotations.iter().map(|ann| ann.id), "annotation");

        let mut image_annotations: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut category_images: HashMap<u32, Vec<u64>> = HashMap::new();
        for ann in &dataset.annotations {
            image_annotations
                .entry(ann.image_id)
                .or_default()
                .push(ann.id);
            category_images
                .entry(ann.category_id)
                .or_default()
                .push(ann.image_id);
        }

        log::debug!(
            "Indexed {} images, {} annotations, {} categories",
            images.len(),
            annotations.len(),
            categories.len()
        );

        Self {
            dataset,
            images,
            annotations,
            categories,
            image_annotations,
            category_images,
        }
    }

    /// Parse a COCO JSON document and index it.
    pub fn from_slice(json: &[u8]) -> Result<Self, Error> {
        let dataset: CocoDataset = serde_json::from_slice(json)?;
        Ok(Self::new(dataset))
    }

    /// The indexed dataset.
    pub fn dataset(&self) -> &CocoDataset {
        &self.dataset
    }

    pub fn info(&self) -> &CocoInfo {
        &self.dataset.info
    }

    pub fn licenses(&self) -> &[CocoLicense] {
        &self.dataset.licenses
    }

    pub fn image(&self, id: u64) -> Option<&CocoImage> {
        self.images.get(&id).map(|&pos| &self.dataset.images[pos])
    }

    pub fn annotation(&self, id: u64) -> Option<&CocoAnnotation> {
        self.annotations
            .get(&id)
            .map(|&pos| &self.dataset.annotations[pos])
    }

    pub fn category(&self, id: u32) -> Option<&CocoCategory> {
        self.categories
            .get(&id)
            .map(|&pos| &self.dataset.categories[pos])
    }

    /// Get the category name for a category ID.
    pub fn label_name(&self, category_id: u32) -> Option<&str> {
        self.category(category_id).map(|c| c.name.as_str())
    }

    /// Get annotations for an image, in dataset order.
    pub fn annotations_for_image(&self, image_id: u64) -> Vec<&CocoAnnotation> {
        self.image_annotations
            .get(&image_id)
            .map(|ids| ids.iter().filter_map(|&id| self.annotation(id)).collect())
            .unwrap_or_default()
    }

    /// Ids of annotations matching every given filter, sorted ascending.
    ///
    /// Empty slices and `None` disable the corresponding filter:
    /// * `image_ids` keeps annotations on the listed images.
    /// * `category_ids` keeps annotations of the listed categories.
    /// * `area_range` `(low, high)` drops annotations with
    ///   `area <= low || area >= high`; both bounds are exclusive.
    /// * `crowd` keeps annotations whose crowd flag equals the value.
    pub fn annotation_ids(
        &self,
        image_ids: &[u64],
        category_ids: &[u32],
        area_range: Option<(f64, f64)>,
        crowd: Option<bool>,
    ) -> Vec<u64> {
        let candidates: Box<dyn Iterator<Item = &CocoAnnotation> + '_> = if image_ids.is_empty() {
            Box::new(
                self.annotations
                    .values()
                    .map(|&pos| &self.dataset.annotations[pos]),
            )
        } else {
            Box::new(
                image_ids
                    .iter()
                    .filter_map(|id| self.image_annotations.get(id))
                    .flatten()
                    .filter_map(|&id| self.annotation(id)),
            )
        };

        let categories: HashSet<u32> = category_ids.iter().copied().collect();

        candidates
            .filter(|ann| categories.is_empty() || categories.contains(&ann.category_id))
            .filter(|ann| match area_range {
                Some((low, high)) => !(ann.area <= low || ann.area >= high),
                None => true,
            })
            .filter(|ann| crowd.is_none_or(|crowd| ann.is_crowd() == crowd))
            .map(|ann| ann.id)
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Ids of categories matching the given names and supercategory names,
    /// sorted ascending. An empty slice disables that filter.
    pub fn category_ids(&self, names: &[&str], supercategory_names: &[&str]) -> Vec<u32> {
        let names: HashSet<&str> = names.iter().copied().collect();
        let supercategories: HashSet<&str> = supercategory_names.iter().copied().collect();

        self.categories
            .values()
            .map(|&pos| &self.dataset.categories[pos])
            .filter(|cat| names.is_empty() || names.contains(cat.name.as_str()))
            .filter(|cat| {
                supercategories.is_empty()
                    || cat
                        .supercategory
                        .as_deref()
                        .is_some_and(|sup| supercategories.contains(sup))
            })
            .map(|cat| cat.id)
            .sorted_unstable()
            .collect()
    }

    /// Ids of images containing at least one annotation of any listed
    /// category, sorted and de-duplicated. An empty slice returns every
    /// image id.
    pub fn image_ids(&self, category_ids: &[u32]) -> Vec<u64> {
        if category_ids.is_empty() {
            return self.images.keys().copied().sorted_unstable().collect();
        }

        category_ids
            .iter()
            .filter_map(|id| self.category_images.get(id))
            .flatten()
            .copied()
            .sorted_unstable()
            .dedup()
            .collect()
    }

    /// Annotations with the given ids, in request order. Unknown ids are
    /// skipped.
    pub fn load_annotations(&self, ids: &[u64]) -> Vec<&CocoAnnotation> {
        load(ids, |id| self.annotation(id), "annotation")
    }

    /// Categories with the given ids, in request order. Unknown ids are
    /// skipped.
    pub fn load_categories(&self, ids: &[u32]) -> Vec<&CocoCategory> {
        load(ids, |id| self.category(id), "category")
    }

    /// Images with the given ids, in request order. Unknown ids are skipped.
    pub fn load_images(&self, ids: &[u64]) -> Vec<&CocoImage> {
        load(ids, |id| self.image(id), "image")
    }

    /// Decode an annotation's RLE segmentation.
    ///
    /// When the annotation's image is indexed, the RLE size must match the
    /// image's `[height, width]`.
    ///
    /// # Errors
    /// `CocoError` for unknown annotations, missing segmentations or size
    /// disagreements; `UnsupportedFormat` for polygons; any codec error.
    pub fn annotation_mask(&self, annotation_id: u64) -> Result<BinaryMask, Error> {
        let ann = self.require_annotation(annotation_id)?;
        let segmentation = require_segmentation(ann)?;

        if let (Some(image), Some(size)) = (self.image(ann.image_id), segmentation.dims())
            && image.dims() != size
        {
            return Err(Error::CocoError(format!(
                "Annotation {} segmentation is {} but image {} is {}",
                ann.id,
                size,
                image.id,
                image.dims()
            )));
        }

        segmentation.to_mask()
    }

    /// Decode any annotation segmentation, rasterizing polygons onto the
    /// image grid with `rasterizer`.
    pub fn annotation_mask_with<R>(
        &self,
        annotation_id: u64,
        rasterizer: &R,
    ) -> Result<BinaryMask, Error>
    where
        R: PolygonRasterizer + ?Sized,
    {
        let ann = self.require_annotation(annotation_id)?;
        let segmentation = require_segmentation(ann)?;
        let image = self.image(ann.image_id).ok_or_else(|| {
            Error::CocoError(format!(
                "Annotation {} references non-existent image_id {}",
                ann.id, ann.image_id
            ))
        })?;

        segmentation.to_mask_with(image.dims(), rasterizer)
    }

    fn require_annotation(&self, id: u64) -> Result<&CocoAnnotation, Error> {
        self.annotation(id)
            .ok_or_else(|| Error::CocoError(format!("Unknown annotation id {}", id)))
    }
}

fn require_segmentation(ann: &CocoAnnotation) -> Result<&super::CocoSegmentation, Error> {
    ann.segmentation
        .as_ref()
        .ok_or_else(|| Error::CocoError(format!("Annotation {} has no segmentation", ann.id)))
}

fn position_map<K>(ids: impl Iterator<Item = K>, kind: &str) -> HashMap<K, usize>
where
    K: std::hash::Hash + Eq + Copy + std::fmt::Display,
{
    let mut map = HashMap::new();
    for (pos, id) in ids.enumerate() {
        if map.insert(id, pos).is_some() {
            log::warn!("Duplicate {} id {}, keeping the last entry", kind, id);
        }
    }
    map
}

fn load<'a, K, T>(ids: &[K], lookup: impl Fn(K) -> Option<&'a T>, kind: &str) -> Vec<&'a T>
where
    K: Copy + std::fmt::Display,
{
    ids.iter()
        .filter_map(|&id| {
            let found = lookup(id);
            if found.is_none() {
                log::debug!("Skipping unknown {} id {}", kind, id);
            }
            found
        })
        .collect()
}
