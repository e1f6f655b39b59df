// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Camera-related types and functions.
//! Pinhole intrinsics of the rectified left camera and the stereo baseline.

use crate::error::{Error, Result};
use crate::misc::type_aliases::{Float, Mat3, Point2, Point3};

/// Intrinsic parameters of a pinhole camera.
///
/// Rectified images have no skew, but it is kept
/// so that the matrix form is complete.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Intrinsics {
    /// Principal point (cx, cy) in pixels.
    pub principal_point: (Float, Float),
    /// Focal lengths (fx, fy) in pixels.
    pub focal: (Float, Float),
    /// Skew coefficient.
    pub skew: Float,
}

impl Intrinsics {
    /// Intrinsics without skew.
    pub fn new(fx: Float, fy: Float, cx: Float, cy: Float) -> Self {
        Self {
            principal_point: (cx, cy),
            focal: (fx, fy),
            skew: 0.0,
        }
    }

    /// Check that both focal lengths are finite and strictly positive.
    ///
    /// A zero focal length would silently turn every point into infinities.
    pub fn validate(&self) -> Result<()> {
        let (fx, fy) = self.focal;
        if !(fx.is_finite() && fx > 0.0) {
            return Err(Error::InvalidIntrinsics(format!(
                "fx must be finite and > 0, got {}",
                fx
            )));
        }
        if !(fy.is_finite() && fy > 0.0) {
            return Err(Error::InvalidIntrinsics(format!(
                "fy must be finite and > 0, got {}",
                fy
            )));
        }
        Ok(())
    }

    /// Retrieve the intrinsics matrix.
    #[rustfmt::skip]
    pub fn matrix(&self) -> Mat3 {
        Mat3::new(
            self.focal.0, self.skew,    self.principal_point.0,
            0.0,          self.focal.1, self.principal_point.1,
            0.0,          0.0,          1.0,
        )
    }

    /// Intrinsics of the same camera for an image scaled by `factor`.
    ///
    /// Pixel centers are kept aligned, like for the half resolution
    /// images fed to the stereo matcher.
    pub fn scaled(&self, factor: Float) -> Self {
        let (cx, cy) = self.principal_point;
        let (fx, fy) = self.focal;
        Self {
            principal_point: ((cx + 0.5) * factor - 0.5, (cy + 0.5) * factor - 0.5),
            focal: (fx * factor, fy * factor),
            skew: self.skew * factor,
        }
    }

    /// Project a 3D point in camera coordinates into the image plane.
    pub fn project(&self, point: Point3) -> Point2 {
        let (fx, fy) = self.focal;
        let (cx, cy) = self.principal_point;
        let x = point.x / point.z;
        let y = point.y / point.z;
        Point2::new(fx * x + self.skew * y + cx, fy * y + cy)
    }

    /// Back project a pixel with depth info into a 3D point in camera coordinates.
    pub fn back_project(&self, point: Point2, depth: Float) -> Point3 {
        let (fx, fy) = self.focal;
        let (cx, cy) = self.principal_point;
        let z = depth;
        let y = (point.y - cy) * z / fy;
        let x = ((point.x - cx) * z - self.skew * y) / fx;
        Point3::new(x, y, z)
    }
}

/// A calibrated and rectified stereo pair,
/// seen from its left camera.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct StereoCamera {
    /// Intrinsics of the rectified left camera.
    pub left: Intrinsics,
    /// Distance between both optical centers, in millimeters.
    pub baseline: Float,
}

impl StereoCamera {
    pub fn new(left: Intrinsics, baseline: Float) -> Self {
        Self { left, baseline }
    }

    /// Check intrinsics and baseline before any frame is processed.
    pub fn validate(&self) -> Result<()> {
        self.left.validate()?;
        check_baseline(self.baseline)
    }

    /// Numerator of the disparity to depth conversion: fx * baseline.
    pub fn depth_factor(&self) -> Float {
        self.left.focal.0 * self.baseline
    }
}

/// The baseline must be finite and strictly positive.
///
/// With a positive `fx * baseline`, every negative disparity
/// maps to an invalid depth instead of a finite wrong one.
pub fn check_baseline(baseline: Float) -> Result<()> {
    if baseline.is_finite() && baseline > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidIntrinsics(format!(
            "baseline must be finite and > 0 mm, got {}",
            baseline
        )))
    }
}

// TESTS #############################################################
