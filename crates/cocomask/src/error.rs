// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

/// Error type for the mask codec, the dataset index and dataset I/O.
///
/// Codec failures are never recovered internally: a mask that cannot be
/// reconstructed exactly is reported to the caller rather than clamped,
/// truncated or padded.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// ZIP archive error.
    ZipError(zip::result::ZipError),
    /// Mask length does not match `width * height`, or the dimensions
    /// cannot be addressed on this platform.
    InvalidDimensions {
        width: u32,
        height: u32,
        len: usize,
    },
    /// Run counts do not cover exactly `width * height` pixels.
    RunLengthMismatch { expected: u64, actual: u64 },
    /// Compact RLE bytes cannot be resolved within their declared length,
    /// or decode to an out-of-range run length.
    MalformedEncoding(String),
    /// A segmentation value matches none of the compact RLE, uncompressed
    /// RLE or polygon shapes.
    UnrecognizedSegmentation(String),
    /// Dataset consistency error (dangling ids, size disagreements).
    CocoError(String),
    /// Unsupported segmentation or file format.
    UnsupportedFormat(String),
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::ZipError(e) => write!(f, "ZIP error: {}", e),
            Error::InvalidDimensions { width, height, len } => write!(
                f,
                "Invalid dimensions: {} values for a {}x{} mask",
                len, width, height
            ),
            Error::RunLengthMismatch { expected, actual } => write!(
                f,
                "Run length mismatch: counts cover {} pixels, expected {}",
                actual, expected
            ),
            Error::MalformedEncoding(s) => write!(f, "Malformed RLE encoding: {}", s),
            Error::UnrecognizedSegmentation(s) => write!(f, "Unrecognized segmentation: {}", s),
            Error::CocoError(s) => write!(f, "COCO error: {}", s),
            Error::UnsupportedFormat(s) => write!(f, "Unsupported format: {}", s),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::ZipError(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_codec_errors() {
        let err = Error::RunLengthMismatch {
            expected: 30,
            actual: 28,
        };
        assert_eq!(
            err.to_string(),
            "Run length mismatch: counts cover 28 pixels, expected 30"
        );

        let err = Error::InvalidDimensions {
            width: 6,
            height: 5,
            len: 29,
        };
        assert_eq!(err.to_string(), "Invalid dimensions: 29 values for a 6x5 mask");
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::from(io);
        assert!(err.source().is_some());
        assert!(Error::MalformedEncoding("x".into()).source().is_none());
    }
}
