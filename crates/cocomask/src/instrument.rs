// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Au-Zone Technologies. All Rights Reserved.

//! Conditional tracing spans for the `profiling` feature.
//!
//! Codec entry points use the attribute form:
//!
//! ```rust,ignore
//! #[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
//! pub fn decode_counts(counts: &RunCounts, dims: Dimensions) -> Result<BinaryMask, Error> {
//!     // ...
//! }
//! ```
//!
//! Longer-running operations open a span by hand:
//!
//! ```rust,ignore
//! #[cfg(feature = "profiling")]
//! let _span = crate::instrument::info_span!("build_index", images = n).entered();
//! ```
//!
//! Without the feature nothing is compiled in.

#[cfg(feature = "profiling")]
pub use tracing::info_span;
