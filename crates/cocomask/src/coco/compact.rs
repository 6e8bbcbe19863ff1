// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Compact printable encoding of run counts.
//!
//! This is the `counts` string found in compressed COCO RLE annotations. It
//! is compatible with pycocotools and is NOT plain LEB128:
//!
//! 1. From the fourth run on, each run is replaced by its signed difference
//!    to the run two positions earlier (the previous run of the same colour).
//! 2. The value is emitted 5 bits at a time, least significant group first.
//!    Bit `0x20` of each 6-bit group marks that more groups follow and bit
//!    `0x10` of the final group is the sign of the value.
//! 3. Each group is offset by 48, so output bytes lie in `'0'..='o'`.
//!
//! The string has no length prefix and no terminator. Decoding is therefore
//! always bounded by an explicit byte length, and a group sequence that is
//! still asking for continuation when that length is reached is an error.

use super::mask::RunCounts;
use crate::Error;

const OFFSET: u8 = 48;
const GROUP_BITS: u32 = 5;
const GROUP_MASK: u8 = 0x1f;
const CONTINUATION: u8 = 0x20;
const SIGN: u8 = 0x10;
const MAX_GROUP: u8 = 0x3f;

/// Enough groups for any 33-bit signed delta, bounded well inside `i64`.
const MAX_GROUPS: u32 = 12;

/// Pack run counts into the compact string.
///
/// Infallible: the output length only depends on the run magnitudes.
#[cfg_attr(
    feature = "profiling",
    tracing::instrument(skip_all, fields(runs = counts.len()))
)]
pub fn pack_counts(counts: &RunCounts) -> String {
    let runs = counts.as_slice();
    let mut packed = String::with_capacity(runs.len() * 2);

    for (i, &run) in runs.iter().enumerate() {
        let mut x = i64::from(run);
        if i > 2 {
            x -= i64::from(runs[i - 2]);
        }

        loop {
            let group = (x & i64::from(GROUP_MASK)) as u8;
            x >>= GROUP_BITS;
            let more = if group & SIGN != 0 { x != -1 } else { x != 0 };
            let group = if more { group | CONTINUATION } else { group };
            packed.push(char::from(group + OFFSET));
            if !more {
                break;
            }
        }
    }

    packed
}

/// Unpack run counts from the first `byte_len` bytes of `bytes`.
///
/// Only `bytes[..byte_len]` is ever read.
///
/// # Errors
/// `MalformedEncoding` if `byte_len` exceeds the bytes available, a byte is
/// outside the encoding alphabet, a value is still continuing at
/// `byte_len`, or a reconstructed run is negative or wider than 32 bits.
#[cfg_attr(
    feature = "profiling",
    tracing::instrument(skip_all, fields(byte_len = byte_len))
)]
pub fn unpack_counts(bytes: &[u8], byte_len: usize) -> Result<RunCounts, Error> {
    let input = bytes.get(..byte_len).ok_or_else(|| {
        Error::MalformedEncoding(format!(
            "declared length {} exceeds the {} bytes available",
            byte_len,
            bytes.len()
        ))
    })?;

    let mut runs: Vec<u32> = Vec::with_capacity(input.len());
    let mut pos = 0;

    while pos < input.len() {
        let start = pos;
        let mut x: i64 = 0;
        let mut groups = 0u32;

        loop {
            let Some(&byte) = input.get(pos) else {
                return Err(Error::MalformedEncoding(format!(
                    "run {} starting at byte {} continues past byte length {}",
                    runs.len(),
                    start,
                    byte_len
                )));
            };
            if groups == MAX_GROUPS {
                return Err(Error::MalformedEncoding(format!(
                    "run {} starting at byte {} exceeds {} groups",
                    runs.len(),
                    start,
                    MAX_GROUPS
                )));
            }

            let group = decode_group(byte, pos)?;
            x |= i64::from(group & GROUP_MASK) << (GROUP_BITS * groups);
            groups += 1;
            pos += 1;

            if group & CONTINUATION == 0 {
                if group & SIGN != 0 {
                    x |= -1i64 << (GROUP_BITS * groups);
                }
                break;
            }
        }

        let i = runs.len();
        if i > 2 {
            x += i64::from(runs[i - 2]);
        }

        let run = u32::try_from(x).map_err(|_| {
            Error::MalformedEncoding(format!(
                "run {} starting at byte {} decodes to out-of-range length {}",
                i, start, x
            ))
        })?;
        runs.push(run);
    }

    Ok(RunCounts::new(runs))
}

/// Unpack a whole compact string.
pub fn unpack_str(packed: &str) -> Result<RunCounts, Error> {
    let bytes = packed.as_bytes();
    unpack_counts(bytes, bytes.len())
}

fn decode_group(byte: u8, pos: usize) -> Result<u8, Error> {
    match byte.checked_sub(OFFSET) {
        Some(group) if group <= MAX_GROUP => Ok(group),
        _ => Err(Error::MalformedEncoding(format!(
            "byte 0x{:02x} at offset {} is outside the encoding alphabet",
            byte, pos
        ))),
    }
}
