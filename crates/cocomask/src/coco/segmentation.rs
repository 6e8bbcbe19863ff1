// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Conversions between segmentation variants and binary masks.
//!
//! Compressed RLE is the canonical persisted form: every mask encodes to it.
//! Decoding accepts both RLE variants directly. Polygons need a rasterizer,
//! which this crate does not provide; callers plug one in through
//! [`PolygonRasterizer`].

use super::compact::{pack_counts, unpack_counts};
use super::mask::{BinaryMask, Dimensions, RunCounts};
use super::rle::{self, decode_counts, encode_mask};
use super::types::{CocoCompressedRle, CocoRle, CocoSegmentation};
use crate::Error;

/// Turns polygon segmentations into pixel masks.
pub trait PolygonRasterizer {
    /// Rasterize `polygons` (flat `[x0, y0, x1, y1, ...]` pixel coordinates)
    /// onto a `dims` grid.
    fn rasterize(&self, polygons: &[Vec<f64>], dims: Dimensions) -> Result<BinaryMask, Error>;
}

impl CocoRle {
    pub fn dims(&self) -> Dimensions {
        Dimensions::from_size(self.size)
    }

    /// Encode a mask as uncompressed RLE.
    pub fn from_mask(mask: &BinaryMask) -> Self {
        Self {
            counts: encode_mask(mask).into(),
            size: mask.dims().size(),
        }
    }

    pub fn run_counts(&self) -> RunCounts {
        RunCounts::new(self.counts.clone())
    }

    /// Decode to a column-major mask.
    pub fn to_mask(&self) -> Result<BinaryMask, Error> {
        decode_counts(&self.run_counts(), self.dims())
    }

    /// Pack the counts into a compressed RLE of the same size.
    ///
    /// # Errors
    /// `RunLengthMismatch` if the counts do not cover the size exactly.
    pub fn compress(&self) -> Result<CocoCompressedRle, Error> {
        let counts = self.run_counts();
        counts.check_total(self.dims())?;
        Ok(CocoCompressedRle {
            counts: pack_counts(&counts),
            size: self.size,
        })
    }
}

impl CocoCompressedRle {
    pub fn dims(&self) -> Dimensions {
        Dimensions::from_size(self.size)
    }

    /// Pack run counts for a mask of the given dimensions.
    pub fn from_counts(counts: &RunCounts, dims: Dimensions) -> Self {
        Self {
            counts: pack_counts(counts),
            size: dims.size(),
        }
    }

    /// Encode a mask as compressed RLE.
    pub fn from_mask(mask: &BinaryMask) -> Self {
        Self::from_counts(&encode_mask(mask), mask.dims())
    }

    /// Unpack the counts string.
    ///
    /// # Errors
    /// `MalformedEncoding` if the string does not unpack, or if the unpacked
    /// runs do not cover exactly `width * height` pixels (a string cut short
    /// at a run boundary unpacks cleanly but covers too few).
    pub fn run_counts(&self) -> Result<RunCounts, Error> {
        let bytes = self.counts.as_bytes();
        let counts = unpack_counts(bytes, bytes.len())?;

        let dims = self.dims();
        if counts.total() != dims.pixel_count() {
            return Err(Error::MalformedEncoding(format!(
                "{} runs cover {} pixels, size {} needs {}",
                counts.len(),
                counts.total(),
                dims,
                dims.pixel_count()
            )));
        }

        Ok(counts)
    }

    /// Decode to a column-major mask.
    pub fn to_mask(&self) -> Result<BinaryMask, Error> {
        decode_counts(&self.run_counts()?, self.dims())
    }

    /// Unpack into uncompressed RLE.
    pub fn decompress(&self) -> Result<CocoRle, Error> {
        Ok(CocoRle {
            counts: self.run_counts()?.into(),
            size: self.size,
        })
    }
}

impl CocoSegmentation {
    /// Encode a mask in the canonical compressed form.
    pub fn from_mask(mask: &BinaryMask) -> Self {
        CocoSegmentation::CompressedRle(CocoCompressedRle::from_mask(mask))
    }

    /// Mask dimensions carried by RLE variants; `None` for polygons.
    pub fn dims(&self) -> Option<Dimensions> {
        match self {
            CocoSegmentation::Rle(rle) => Some(rle.dims()),
            CocoSegmentation::CompressedRle(rle) => Some(rle.dims()),
            CocoSegmentation::Polygon(_) => None,
        }
    }

    /// Validated run counts of RLE variants; `None` for polygons.
    pub fn run_counts(&self) -> Result<Option<RunCounts>, Error> {
        match self {
            CocoSegmentation::Rle(rle) => {
                let counts = rle.run_counts();
                counts.check_total(rle.dims())?;
                Ok(Some(counts))
            }
            CocoSegmentation::CompressedRle(rle) => rle.run_counts().map(Some),
            CocoSegmentation::Polygon(_) => Ok(None),
        }
    }

    /// Decode an RLE segmentation to a column-major mask.
    ///
    /// # Errors
    /// `UnsupportedFormat` for polygons, see [`Self::to_mask_with`].
    pub fn to_mask(&self) -> Result<BinaryMask, Error> {
        match self {
            CocoSegmentation::Rle(rle) => rle.to_mask(),
            CocoSegmentation::CompressedRle(rle) => rle.to_mask(),
            CocoSegmentation::Polygon(_) => Err(Error::UnsupportedFormat(
                "polygon segmentation requires a rasterizer".to_string(),
            )),
        }
    }

    /// Decode any segmentation onto a `dims` grid, rasterizing polygons with
    /// `rasterizer`.
    ///
    /// # Errors
    /// `CocoError` if an RLE size disagrees with `dims`, plus any decode or
    /// rasterizer error.
    pub fn to_mask_with<R>(&self, dims: Dimensions, rasterizer: &R) -> Result<BinaryMask, Error>
    where
        R: PolygonRasterizer + ?Sized,
    {
        if let Some(size) = self.dims()
            && size != dims
        {
            return Err(Error::CocoError(format!(
                "{} segmentation is {} but the image is {}",
                self.kind(),
                size,
                dims
            )));
        }

        match self {
            CocoSegmentation::Polygon(polygons) => {
                let mask = rasterizer.rasterize(polygons, dims)?;
                if mask.dims() != dims {
                    return Err(Error::InvalidDimensions {
                        width: dims.width,
                        height: dims.height,
                        len: mask.as_slice().len(),
                    });
                }
                Ok(mask)
            }
            _ => self.to_mask(),
        }
    }

    /// Convert uncompressed RLE to compressed RLE; other variants are
    /// returned unchanged.
    pub fn compress(&self) -> Result<CocoSegmentation, Error> {
        match self {
            CocoSegmentation::Rle(rle) => Ok(CocoSegmentation::CompressedRle(rle.compress()?)),
            other => Ok(other.clone()),
        }
    }

    /// Segmentation area in pixels².
    ///
    /// Polygons use the shoelace formula; RLE variants count foreground
    /// pixels.
    pub fn area(&self) -> Result<f64, Error> {
        match self {
            CocoSegmentation::Polygon(polygons) => {
                Ok(polygons.iter().map(|polygon| shoelace_area(polygon)).sum())
            }
            _ => Ok(self
                .run_counts()?
                .map(|counts| counts.foreground() as f64)
                .unwrap_or_default()),
        }
    }

    /// Bounding box `[x, y, width, height]` in pixels.
    ///
    /// RLE boxes are pixel-exact; polygon boxes span the vertex extremes.
    pub fn bbox(&self) -> Result<[f64; 4], Error> {
        match self {
            CocoSegmentation::Polygon(polygons) => Ok(polygon_bbox(polygons)),
            CocoSegmentation::Rle(rle) => rle::bbox(&rle.run_counts(), rle.dims()),
            CocoSegmentation::CompressedRle(rle) => rle::bbox(&rle.run_counts()?, rle.dims()),
        }
    }
}

/// Calculate polygon area using the shoelace formula.
fn shoelace_area(polygon: &[f64]) -> f64 {
    if polygon.len() < 6 {
        return 0.0;
    }

    let n = polygon.len() / 2;
    let mut area = 0.0;

    for i in 0..n {
        let j = (i + 1) % n;
        area += polygon[i * 2] * polygon[j * 2 + 1] - polygon[j * 2] * polygon[i * 2 + 1];
    }

    (area / 2.0).abs()
}

fn polygon_bbox(polygons: &[Vec<f64>]) -> [f64; 4] {
    let mut points = polygons
        .iter()
        .flat_map(|polygon| polygon.chunks_exact(2))
        .peekable();
    if points.peek().is_none() {
        return [0.0; 4];
    }

    let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
    let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for point in points {
        x0 = x0.min(point[0]);
        y0 = y0.min(point[1]);
        x1 = x1.max(point[0]);
        y1 = y1.max(point[1]);
    }

    [x0, y0, x1 - x0, y1 - y0]
}
