// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # cocomask
//!
//! COCO segmentation mask codec and dataset index.
//!
//! Converts between binary pixel masks, run-length counts and the compact
//! string form used by compressed COCO RLE, and provides filtered lookup
//! over COCO annotation files.
//!
//! ## Quick Start
//!
//! ```rust
//! use cocomask::coco::{BinaryMask, CocoSegmentation, Dimensions};
//!
//! # fn main() -> Result<(), cocomask::Error> {
//! // 2x2 mask, left column set (column-major).
//! let mask = BinaryMask::new(vec![1, 1, 0, 0], Dimensions::new(2, 2))?;
//! let segmentation = CocoSegmentation::from_mask(&mask);
//!
//! assert_eq!(segmentation.area()?, 2.0);
//! assert_eq!(segmentation.to_mask()?, mask);
//! # Ok(())
//! # }
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: emits `tracing` spans from the codec and index.

pub mod coco;
mod error;
mod instrument;
mod settings;

pub use crate::{error::Error, settings::Settings};
