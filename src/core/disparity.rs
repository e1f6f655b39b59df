// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Normalization of raw stereo matcher outputs into pixel disparities,
//! and their conversion into displayable levels.
//!
//! Semi global block matchers output fixed point disparities
//! (4 fractional bits for SGBM) and are often run on half resolution
//! images to go faster. Both must be undone on the caller side
//! before computing depth, otherwise depth gets scaled twice.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::misc::type_aliases::{DisparityMap, Float};

/// Scale of the raw disparities produced by the stereo matcher.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DisparityScale {
    /// Number of fractional bits of the fixed point disparities.
    pub subpixel_bits: u8,
    /// The matcher ran on images downscaled by this integer factor.
    pub resize_factor: u8,
}

impl Default for DisparityScale {
    fn default() -> Self {
        Self {
            subpixel_bits: 4,
            resize_factor: 2,
        }
    }
}

impl DisparityScale {
    pub fn validate(&self) -> Result<()> {
        if self.subpixel_bits > 15 {
            return Err(Error::InvalidParameters(format!(
                "subpixel_bits must be <= 15, got {}",
                self.subpixel_bits
            )));
        }
        if self.resize_factor == 0 {
            return Err(Error::InvalidParameters(
                "resize_factor must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert fixed point disparities into floating point disparities
    /// at the resolution of the matcher input.
    pub fn from_fixed_point(&self, raw: &DMatrix<i16>) -> DisparityMap {
        let one = Float::powi(2.0, i32::from(self.subpixel_bits));
        raw.map(|d| Float::from(d) / one)
    }

    /// Bring matcher resolution disparities back to full resolution.
    ///
    /// Disparities are multiplied by the resize factor
    /// and each one is repeated over a `factor x factor` block.
    pub fn upscale(&self, disparity: &DisparityMap) -> DisparityMap {
        let factor = usize::from(self.resize_factor);
        if factor == 1 {
            return disparity.clone();
        }
        let (nb_rows, nb_cols) = disparity.shape();
        let scale = Float::from(self.resize_factor);
        DMatrix::from_fn(nb_rows * factor, nb_cols * factor, |r, c| {
            scale * disparity[(r / factor, c / factor)]
        })
    }

    /// Full normalization of raw matcher outputs into pixel disparities
    /// of the full resolution rectified left image.
    pub fn normalize(&self, raw: &DMatrix<i16>) -> DisparityMap {
        self.upscale(&self.from_fixed_point(raw))
    }
}

/// Convert disparities into 8 bits levels for display.
///
/// The minimum disparity offset correction `d - (min_disparity - 1)`
/// is only applied here, on a copy. Depth always uses the raw disparity.
/// Values are then scaled by `255 / num_disparities`,
/// rounded and saturated into `[0, 255]`. Non numbers become 0.
pub fn display_levels(
    disparity: &DisparityMap,
    min_disparity: i32,
    num_disparities: u32,
) -> Result<DMatrix<u8>> {
    if num_disparities == 0 {
        return Err(Error::InvalidParameters(
            "num_disparities must be > 0".to_string(),
        ));
    }
    #[allow(clippy::cast_precision_loss)]
    let offset = (min_disparity - 1) as Float;
    #[allow(clippy::cast_precision_loss)]
    let scale = 255.0 / num_disparities as Float;
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let levels = disparity.map(|d| {
        let level = ((d - offset) * scale).round();
        if level.is_nan() {
            0
        } else {
            level.max(0.0).min(255.0) as u8
        }
    });
    Ok(levels)
}

// TESTS #############################################################
