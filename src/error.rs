// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type shared by the whole crate.

use thiserror::Error;

use crate::misc::type_aliases::Float;

/// Result alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong in this crate.
///
/// Rejected pixels (unmatched, out of range) are never errors,
/// they are represented in the output grids instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Focal lengths or baseline unusable for depth computation.
    #[error("invalid camera intrinsics: {0}")]
    InvalidIntrinsics(String),

    /// Depth range bounds are not ordered or not numbers.
    #[error("invalid depth range: min = {min} mm, max = {max} mm")]
    InvalidDepthRange { min: Float, max: Float },

    /// Any other parameter outside of its domain.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Two grids that must share their shape do not.
    #[error("shape mismatch: expected {expected:?} (rows, cols), found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// A text file could not be parsed.
    #[error("parsing error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    PngDecoding(#[from] png::DecodingError),

    #[error(transparent)]
    PngEncoding(#[from] png::EncodingError),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    ConfigRead(#[from] toml::de::Error),

    #[error(transparent)]
    ConfigWrite(#[from] toml::ser::Error),
}
