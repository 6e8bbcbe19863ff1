// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Pixel-grid masks and run-length sequences.
//!
//! Masks are stored **column-major**: pixel `(x, y)` lives at index
//! `y + height * x`, so a full column is scanned before the next one. This is
//! the order the COCO run-length formats count in.

use crate::Error;
use serde::{Deserialize, Serialize};

/// Largest pixel count a mask may hold. A single run of a larger mask would
/// not fit the `u32` run counts.
pub const MAX_PIXELS: u64 = u32::MAX as u64;

/// Width and height of a mask, in pixels.
///
/// COCO persists this pair as `size: [height, width]`; use
/// [`Dimensions::from_size`] and [`Dimensions::size`] at that boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Build from a COCO `size` field (`[height, width]`).
    pub fn from_size(size: [u32; 2]) -> Self {
        Self {
            width: size[1],
            height: size[0],
        }
    }

    /// COCO `size` field (`[height, width]`).
    pub fn size(&self) -> [u32; 2] {
        [self.height, self.width]
    }

    /// Total pixel count. Never overflows.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Pixel count as a buffer length.
    ///
    /// # Errors
    /// `InvalidDimensions` if the grid holds more than [`MAX_PIXELS`] pixels.
    pub fn buffer_len(&self) -> Result<usize, Error> {
        if self.pixel_count() > MAX_PIXELS {
            return Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
                len: 0,
            });
        }
        usize::try_from(self.pixel_count()).map_err(|_| Error::InvalidDimensions {
            width: self.width,
            height: self.height,
            len: 0,
        })
    }

    pub(crate) fn check_len(&self, len: usize) -> Result<(), Error> {
        let pixels = self.pixel_count();
        if pixels <= MAX_PIXELS && u64::try_from(len).ok() == Some(pixels) {
            Ok(())
        } else {
            Err(Error::InvalidDimensions {
                width: self.width,
                height: self.height,
                len,
            })
        }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A `width × height` grid of 0/1 values in column-major order.
///
/// Every value is exactly 0 or 1 and the buffer holds exactly
/// `width * height` values; both are checked on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    dims: Dimensions,
    data: Vec<u8>,
}

impl BinaryMask {
    /// Wrap a column-major buffer.
    ///
    /// # Errors
    /// `InvalidDimensions` if `data.len() != width * height`,
    /// `InvalidParameters` if any value is neither 0 nor 1.
    pub fn new(data: Vec<u8>, dims: Dimensions) -> Result<Self, Error> {
        check_binary(&data, dims)?;
        Ok(Self { dims, data })
    }

    /// An all-background mask.
    pub fn zeros(dims: Dimensions) -> Result<Self, Error> {
        Ok(Self {
            dims,
            data: vec![0; dims.buffer_len()?],
        })
    }

    /// Build from a row-major buffer (pixel `(x, y)` at `y * width + x`),
    /// the layout image libraries use.
    pub fn from_row_major(data: &[u8], dims: Dimensions) -> Result<Self, Error> {
        check_binary(data, dims)?;

        let (w, h) = (dims.width as usize, dims.height as usize);
        let mut column_major = Vec::with_capacity(data.len());
        for x in 0..w {
            column_major.extend((0..h).map(|y| data[y * w + x]));
        }

        Ok(Self {
            dims,
            data: column_major,
        })
    }

    /// Trusted constructor for buffers the decoder has already sized.
    pub(crate) fn from_parts(data: Vec<u8>, dims: Dimensions) -> Self {
        debug_assert_eq!(data.len() as u64, dims.pixel_count());
        Self { dims, data }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn width(&self) -> u32 {
        self.dims.width
    }

    pub fn height(&self) -> u32 {
        self.dims.height
    }

    /// Column-major pixel values.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Value at column `x`, row `y`, or `None` outside the grid.
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.dims.width || y >= self.dims.height {
            return None;
        }
        let idx = y as usize + self.dims.height as usize * x as usize;
        self.data.get(idx).copied()
    }

    /// Number of foreground pixels.
    pub fn area(&self) -> u64 {
        self.data.iter().filter(|&&v| v == 1).count() as u64
    }

    /// Copy out in row-major order.
    pub fn to_row_major(&self) -> Vec<u8> {
        let (w, h) = (self.dims.width as usize, self.dims.height as usize);
        let mut row_major = vec![0u8; self.data.len()];
        for (col, column) in self.data.chunks_exact(h.max(1)).enumerate().take(w) {
            for (row, &v) in column.iter().enumerate() {
                row_major[row * w + col] = v;
            }
        }
        row_major
    }
}

fn check_binary(data: &[u8], dims: Dimensions) -> Result<(), Error> {
    dims.check_len(data.len())?;
    if let Some(pos) = data.iter().position(|&v| v > 1) {
        return Err(Error::InvalidParameters(format!(
            "mask value {} at index {} is not 0 or 1",
            data[pos], pos
        )));
    }
    Ok(())
}

/// Alternating background/foreground run lengths, starting with background.
///
/// The first run may be 0 when the first pixel is foreground. For counts
/// paired with a mask, the runs sum to exactly `width * height`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RunCounts(Vec<u32>);

impl RunCounts {
    pub fn new(counts: Vec<u32>) -> Self {
        Self(counts)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all runs, i.e. the number of pixels covered.
    pub fn total(&self) -> u64 {
        self.0.iter().map(|&c| u64::from(c)).sum()
    }

    /// Sum of the foreground (odd-indexed) runs.
    pub fn foreground(&self) -> u64 {
        self.0.iter().skip(1).step_by(2).map(|&c| u64::from(c)).sum()
    }

    /// Fail with `RunLengthMismatch` unless the runs cover `dims` exactly.
    pub fn check_total(&self, dims: Dimensions) -> Result<(), Error> {
        let actual = self.total();
        let expected = dims.pixel_count();
        if actual != expected {
            return Err(Error::RunLengthMismatch { expected, actual });
        }
        Ok(())
    }
}

impl From<Vec<u32>> for RunCounts {
    fn from(counts: Vec<u32>) -> Self {
        Self(counts)
    }
}

impl From<RunCounts> for Vec<u32> {
    fn from(counts: RunCounts) -> Self {
        counts.0
    }
}

impl<'a> IntoIterator for &'a RunCounts {
    type Item = &'a u32;
    type IntoIter = std::slice::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_size_order() {
        let dims = Dimensions::from_size([425, 640]);
        assert_eq!(dims.height, 425);
        assert_eq!(dims.width, 640);
        assert_eq!(dims.size(), [425, 640]);
        assert_eq!(dims.pixel_count(), 272_000);
        assert_eq!(dims.to_string(), "640x425");
    }

    #[test]
    fn test_pixel_count_does_not_overflow() {
        let dims = Dimensions::new(u32::MAX, u32::MAX);
        assert_eq!(dims.pixel_count(), u64::from(u32::MAX) * u64::from(u32::MAX));
    }

    #[test]
    fn test_mask_length_mismatch() {
        let err = BinaryMask::new(vec![0; 29], Dimensions::new(6, 5)).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidDimensions {
                width: 6,
                height: 5,
                len: 29
            }
        ));
    }

    #[test]
    fn test_mask_rejects_non_binary() {
        let err = BinaryMask::new(vec![0, 1, 2, 0], Dimensions::new(2, 2)).unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[test]
    fn test_row_major_roundtrip() {
        // 3 wide, 2 tall:
        // 1 0 0
        // 1 1 0
        let row_major = [1, 0, 0, 1, 1, 0];
        let dims = Dimensions::new(3, 2);
        let mask = BinaryMask::from_row_major(&row_major, dims).unwrap();

        assert_eq!(mask.as_slice(), &[1, 1, 0, 1, 0, 0]);
        assert_eq!(mask.get(1, 1), Some(1));
        assert_eq!(mask.get(1, 0), Some(0));
        assert_eq!(mask.get(3, 0), None);
        assert_eq!(mask.to_row_major(), row_major);
        assert_eq!(mask.area(), 3);
    }

    #[test]
    fn test_mask_rejects_oversized_grid() {
        // 2^32 pixels: one past what a single u32 run can cover.
        let dims = Dimensions::new(65536, 65536);
        assert!(matches!(
            BinaryMask::zeros(dims),
            Err(Error::InvalidDimensions {
                width: 65536,
                height: 65536,
                len: 0
            })
        ));
        assert!(matches!(
            BinaryMask::new(Vec::new(), dims),
            Err(Error::InvalidDimensions { .. })
        ));
        assert!(BinaryMask::zeros(Dimensions::new(1, 16)).is_ok());
    }

    #[test]
    fn test_empty_mask() {
        let mask = BinaryMask::zeros(Dimensions::new(0, 7)).unwrap();
        assert!(mask.as_slice().is_empty());
        assert!(mask.to_row_major().is_empty());
    }

    #[test]
    fn test_run_counts_sums() {
        let counts = RunCounts::new(vec![5, 6, 4, 2, 1, 2, 5, 2, 1, 2]);
        assert_eq!(counts.total(), 30);
        assert_eq!(counts.foreground(), 14);
        assert!(counts.check_total(Dimensions::new(6, 5)).is_ok());
        assert!(matches!(
            counts.check_total(Dimensions::new(6, 6)),
            Err(Error::RunLengthMismatch {
                expected: 36,
                actual: 30
            })
        ));
    }
}
