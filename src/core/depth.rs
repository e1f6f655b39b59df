// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversion of disparity maps into depth maps,
//! and the depth range used to filter them.

use itertools::{Itertools, MinMaxResult};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::camera;
use crate::error::{Error, Result};
use crate::misc::type_aliases::{DepthMap, DisparityMap, Float};

/// Compute the depth map of a disparity map: `depth = fx * baseline / disparity`.
///
/// The disparity must already be in true pixel units
/// (see `core::disparity` for the conversion of raw matcher outputs).
/// No clamping is applied here, range filtering happens in the point cloud.
///
/// A disparity that is not strictly positive or not finite yields NaN.
/// Fails before touching any pixel if `fx` or `baseline` is not finite and positive.
pub fn compute_depth(disparity: &DisparityMap, fx: Float, baseline: Float) -> Result<DepthMap> {
    if !(fx.is_finite() && fx > 0.0) {
        return Err(Error::InvalidIntrinsics(format!(
            "fx must be finite and > 0, got {}",
            fx
        )));
    }
    camera::check_baseline(baseline)?;
    let factor = fx * baseline;
    let (nb_rows, nb_cols) = disparity.shape();
    let depths: Vec<Float> = disparity
        .as_slice()
        .par_iter()
        .map(|&d| from_disparity(factor, d))
        .collect();
    // Same column major layout as the input buffer.
    Ok(DMatrix::from_vec(nb_rows, nb_cols, depths))
}

/// Depth of a single disparity value, given `factor = fx * baseline`.
#[inline]
pub fn from_disparity(factor: Float, disparity: Float) -> Float {
    if disparity.is_finite() && disparity > 0.0 {
        factor / disparity
    } else {
        Float::NAN
    }
}

// DEPTH RANGE #######################################################

/// Range of plausible depths, in millimeters.
///
/// Both bounds are exclusive: a depth equal to `min` or `max` is rejected.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DepthRangeMm {
    /// Closest accepted depth (exclusive).
    pub min: Float,
    /// Farthest accepted depth (exclusive).
    pub max: Float,
}

impl Default for DepthRangeMm {
    fn default() -> Self {
        Self {
            min: 300.0,
            max: 10_000.0,
        }
    }
}

impl DepthRangeMm {
    /// Create a validated depth range.
    pub fn new(min: Float, max: Float) -> Result<Self> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Bounds must be numbers with `0 <= min < max`.
    /// `max` may be infinite to disable the far limit.
    pub fn validate(&self) -> Result<()> {
        if self.min.is_finite() && self.min >= 0.0 && !self.max.is_nan() && self.min < self.max {
            Ok(())
        } else {
            Err(Error::InvalidDepthRange {
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Accept a depth iff it is finite, non negative and strictly inside the range.
    #[inline]
    pub fn accepts(&self, depth: Float) -> bool {
        depth.is_finite() && depth >= 0.0 && depth > self.min && depth < self.max
    }
}

// STATISTICS ########################################################

/// Minimum, maximum and mean of the valid depths of a depth map.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct DepthStats {
    pub min: Float,
    pub max: Float,
    pub mean: Float,
    /// Number of finite and strictly positive depths.
    pub count: usize,
}

/// Compute statistics over finite and strictly positive depths.
///
/// Returns `None` if there is no such depth.
pub fn depth_stats(depth_map: &DepthMap) -> Option<DepthStats> {
    let valid = || depth_map.iter().cloned().filter(|d| d.is_finite() && *d > 0.0);
    let (min, max) = match valid().minmax_by(|a, b| a.total_cmp(b)) {
        MinMaxResult::NoElements => return None,
        MinMaxResult::OneElement(d) => (d, d),
        MinMaxResult::MinMax(min, max) => (min, max),
    };
    let (count, sum) = valid().fold((0, 0.0_f64), |(n, s), d| (n + 1, s + f64::from(d)));
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation)]
    let mean = (sum / count as f64) as Float;
    Some(DepthStats {
        min,
        max,
        mean,
        count,
    })
}

/// Depth at the center pixel of the map (row `h / 2`, column `w / 2`).
pub fn central_depth(depth_map: &DepthMap) -> Option<Float> {
    let (nb_rows, nb_cols) = depth_map.shape();
    depth_map.get((nb_rows / 2, nb_cols / 2)).cloned()
}

// TESTS #############################################################
