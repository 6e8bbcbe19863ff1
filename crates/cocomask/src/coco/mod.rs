// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # COCO Segmentation Masks
//!
//! Encoding and decoding of COCO instance segmentation masks, plus the
//! dataset plumbing needed to get at them.
//!
//! ## Layers
//!
//! 1. **Masks** ([`BinaryMask`], [`Dimensions`], [`RunCounts`]): column-major
//!    0/1 grids and their alternating run lengths.
//! 2. **Run-length codec** ([`encode_mask`], [`decode_counts`]): mask ↔ runs.
//! 3. **Compact strings** ([`pack_counts`], [`unpack_counts`]): runs ↔ the
//!    printable `counts` string of compressed RLE, compatible with
//!    pycocotools.
//! 4. **Segmentations** ([`CocoSegmentation`]): compressed RLE, uncompressed
//!    RLE or polygons, as found in annotation JSON.
//! 5. **Datasets** ([`CocoReader`], [`CocoWriter`], [`CocoIndex`]): reading,
//!    writing and querying whole annotation files.
//!
//! Keypoints, captions, and panoptic segmentation are not supported.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cocomask::coco::{CocoIndex, CocoReader};
//!
//! # fn main() -> Result<(), cocomask::Error> {
//! let dataset = CocoReader::new().read_json("annotations/stuff_val2017.json")?;
//! let index = CocoIndex::new(dataset);
//!
//! let banners = index.category_ids(&["banner"], &[]);
//! for ann_id in index.annotation_ids(&[], &banners, None, Some(false)) {
//!     let mask = index.annotation_mask(ann_id)?;
//!     println!("{}: {} pixels", ann_id, mask.area());
//! }
//! # Ok(())
//! # }
//! ```

mod compact;
mod index;
mod mask;
mod reader;
mod rle;
mod segmentation;
mod types;
mod writer;

pub use compact::{pack_counts, unpack_counts, unpack_str};
pub use index::CocoIndex;
pub use mask::{BinaryMask, Dimensions, MAX_PIXELS, RunCounts};
pub use reader::{CocoReadOptions, CocoReader, merge_datasets, validate_dataset};
pub use rle::{bbox as rle_bbox, decode_counts, encode, encode_mask};
pub use segmentation::PolygonRasterizer;
pub use types::{
    CocoAnnotation, CocoCategory, CocoCompressedRle, CocoDataset, CocoImage, CocoInfo,
    CocoLicense, CocoRle, CocoSegmentation,
};
pub use writer::{CocoDatasetBuilder, CocoWriteOptions, CocoWriter};
