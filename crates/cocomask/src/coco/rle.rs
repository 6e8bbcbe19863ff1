// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Binary mask ↔ run counts.
//!
//! **CRITICAL**: runs are counted in column-major (Fortran) order and always
//! start with a background run, which is 0 when the first pixel is set.

use super::mask::{BinaryMask, Dimensions, RunCounts};
use crate::Error;

/// Encode a mask into run counts.
///
/// The result always sums to `width * height`; an empty mask encodes to
/// `[0]`. A mask never exceeds [`MAX_PIXELS`](super::mask::MAX_PIXELS), so
/// every run fits in a `u32`.
#[cfg_attr(
    feature = "profiling",
    tracing::instrument(skip_all, fields(dims = %mask.dims()))
)]
pub fn encode_mask(mask: &BinaryMask) -> RunCounts {
    RunCounts::new(scan_runs(mask.as_slice()))
}

/// Encode a raw column-major buffer into run counts.
///
/// # Errors
/// `InvalidDimensions` if `data.len() != width * height`,
/// `InvalidParameters` if a value is neither 0 nor 1.
pub fn encode(data: &[u8], dims: Dimensions) -> Result<RunCounts, Error> {
    dims.check_len(data.len())?;
    if let Some(pos) = data.iter().position(|&v| v > 1) {
        return Err(Error::InvalidParameters(format!(
            "mask value {} at index {} is not 0 or 1",
            data[pos], pos
        )));
    }
    Ok(RunCounts::new(scan_runs(data)))
}

fn scan_runs(data: &[u8]) -> Vec<u32> {
    let mut counts = Vec::new();
    let mut current = 0u8;
    let mut run = 0u32;

    for &v in data {
        if v != current {
            counts.push(run);
            run = 0;
            current = v;
        }
        run += 1;
    }
    counts.push(run);

    counts
}

/// Decode run counts into a mask of the given dimensions.
///
/// The run total is checked before anything is allocated or written.
///
/// # Errors
/// `RunLengthMismatch` if the runs do not cover exactly `width * height`
/// pixels.
#[cfg_attr(
    feature = "profiling",
    tracing::instrument(skip_all, fields(dims = %dims, runs = counts.len()))
)]
pub fn decode_counts(counts: &RunCounts, dims: Dimensions) -> Result<BinaryMask, Error> {
    counts.check_total(dims)?;
    let len = dims.buffer_len()?;

    let mut data = Vec::with_capacity(len);
    let mut value = 0u8;
    for &run in counts {
        data.resize(data.len() + run as usize, value);
        value ^= 1;
    }

    Ok(BinaryMask::from_parts(data, dims))
}

/// Bounding box `[x, y, width, height]` of the foreground, computed from the
/// runs without materializing the mask.
///
/// A run that crosses a column boundary widens the box to the full height.
/// Returns all zeros when there is no foreground.
///
/// # Errors
/// `RunLengthMismatch` if the runs do not cover `dims` exactly.
pub fn bbox(counts: &RunCounts, dims: Dimensions) -> Result<[f64; 4], Error> {
    counts.check_total(dims)?;

    let h = u64::from(dims.height);
    let mut x_min = u64::MAX;
    let mut x_max = 0u64;
    let mut y_min = u64::MAX;
    let mut y_max = 0u64;
    let mut offset = 0u64;

    for pair in counts.as_slice().chunks(2) {
        offset += u64::from(pair[0]);
        let Some(&fg) = pair.get(1) else { break };
        if fg == 0 {
            continue;
        }

        let start = offset;
        offset += u64::from(fg);
        let end = offset - 1;

        let (x1, y1) = (start / h, start % h);
        let (x2, y2) = (end / h, end % h);

        x_min = x_min.min(x1);
        x_max = x_max.max(x2);
        if x1 < x2 {
            y_min = 0;
            y_max = h - 1;
        } else {
            y_min = y_min.min(y1);
            y_max = y_max.max(y2);
        }
    }

    if x_min == u64::MAX {
        return Ok([0.0; 4]);
    }

    Ok([
        x_min as f64,
        y_min as f64,
        (x_max - x_min + 1) as f64,
        (y_max - y_min + 1) as f64,
    ])
}
