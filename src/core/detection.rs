// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Localization of a ball in 3D from circles detected in the left image.
//!
//! Circle detection itself (thresholding, blur, Hough transform)
//! is left to an external implementation of [`CircleDetector`].

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::core::camera::Intrinsics;
use crate::core::depth::DepthRangeMm;
use crate::error::{Error, Result};
use crate::misc::type_aliases::{DepthMap, Float, Point2, Point3};

/// A circle detected in an image, in pixels.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Circle {
    pub center: (Float, Float),
    pub radius: Float,
}

/// Anything able to find circles in a gray image.
pub trait CircleDetector {
    fn detect(&mut self, image: &GrayImage, params: &CircleDetectionParams) -> Vec<Circle>;
}

/// Tuning of the circle detector: binary threshold,
/// gaussian blur, then Hough transform.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CircleDetectionParams {
    /// Gray level above which pixels are set to `threshold_bin_max`.
    pub threshold_bin_min: u8,
    /// Value of the pixels above the threshold.
    pub threshold_bin_max: u8,
    /// Smallest diameter of detected circles, in pixels.
    pub diameter_min: u32,
    /// Largest diameter of detected circles, in pixels, 0 for no limit.
    pub diameter_max: u32,
    /// Higher threshold of the edge detector, lower gives more edges.
    pub edge_threshold: u32,
    /// Accumulator threshold for circle centers, lower gives more circles.
    pub accumulator_threshold: u32,
    /// Size of the gaussian kernel, odd.
    pub blur_kernel: u32,
    /// Standard deviation of the gaussian blur in both directions.
    pub blur_sigma: Float,
}

impl Default for CircleDetectionParams {
    fn default() -> Self {
        Self {
            threshold_bin_min: 50,
            threshold_bin_max: 255,
            diameter_min: 0,
            diameter_max: 0,
            edge_threshold: 100,
            accumulator_threshold: 20,
            blur_kernel: 9,
            blur_sigma: 2.0,
        }
    }
}

impl CircleDetectionParams {
    pub fn validate(&self) -> Result<()> {
        if self.threshold_bin_min > self.threshold_bin_max {
            return Err(Error::InvalidParameters(format!(
                "threshold_bin_min ({}) must be <= threshold_bin_max ({})",
                self.threshold_bin_min, self.threshold_bin_max
            )));
        }
        if self.diameter_max != 0 && self.diameter_min > self.diameter_max {
            return Err(Error::InvalidParameters(format!(
                "diameter_min ({}) must be <= diameter_max ({})",
                self.diameter_min, self.diameter_max
            )));
        }
        if self.edge_threshold == 0 || self.accumulator_threshold == 0 {
            return Err(Error::InvalidParameters(
                "edge_threshold and accumulator_threshold must be > 0".to_string(),
            ));
        }
        if self.blur_kernel % 2 == 0 {
            return Err(Error::InvalidParameters(format!(
                "blur_kernel must be odd, got {}",
                self.blur_kernel
            )));
        }
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            return Err(Error::InvalidParameters(format!(
                "blur_sigma must be finite and > 0, got {}",
                self.blur_sigma
            )));
        }
        Ok(())
    }

    /// (min, max) radii given to the Hough transform.
    pub fn radius_range(&self) -> (u32, u32) {
        (self.diameter_min / 2, self.diameter_max / 2)
    }
}

/// Tuning of the ball localization.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BallParams {
    /// Number of consecutive frames whose circles are accumulated.
    pub buffer_frames: usize,
    /// Two circles are the same candidate if the distance between their
    /// centers is below `overlap_ratio * (r1 + r2)`.
    pub overlap_ratio: Float,
    pub detection: CircleDetectionParams,
}

impl Default for BallParams {
    fn default() -> Self {
        Self {
            buffer_frames: 10,
            overlap_ratio: 1.1,
            detection: CircleDetectionParams::default(),
        }
    }
}

impl BallParams {
    pub fn validate(&self) -> Result<()> {
        if self.buffer_frames == 0 {
            return Err(Error::InvalidParameters(
                "buffer_frames must be >= 1".to_string(),
            ));
        }
        if !(self.overlap_ratio.is_finite() && self.overlap_ratio > 0.0) {
            return Err(Error::InvalidParameters(format!(
                "overlap_ratio must be finite and > 0, got {}",
                self.overlap_ratio
            )));
        }
        self.detection.validate()
    }
}

/// Where a circle is, once looked up in the depth map.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct BallObservation {
    /// Rounded center (column, row).
    pub pixel: (usize, usize),
    /// Diameter in pixels.
    pub diameter: usize,
    /// Depth at the center pixel, possibly invalid.
    pub depth: Float,
    /// 3D position of the center, if its depth is inside the range.
    pub position: Option<Point3>,
}

/// Look up the depth of a circle center and back project it.
///
/// Returns `None` if the circle is not a proper circle
/// (non finite center, negative or non finite radius)
/// or if it does not fit entirely inside the image.
pub fn locate_ball(
    circle: &Circle,
    depth_map: &DepthMap,
    intrinsics: &Intrinsics,
    range: &DepthRangeMm,
) -> Option<BallObservation> {
    let (x, y) = (circle.center.0.round(), circle.center.1.round());
    let radius = circle.radius.round();
    if !(x.is_finite() && y.is_finite() && radius.is_finite() && radius >= 0.0) {
        log::debug!("Skipping malformed circle {:?}", circle);
        return None;
    }
    // Bounds are checked with floats, casts below are then lossless.
    let (nb_rows, nb_cols) = depth_map.shape();
    #[allow(clippy::cast_precision_loss)]
    let outside = x - radius < 0.0
        || y - radius < 0.0
        || x + radius >= nb_cols as Float
        || y + radius >= nb_rows as Float;
    if outside {
        log::debug!(
            "Skipping circle at ({}, {}) because it is outside the image boundaries",
            x,
            y
        );
        return None;
    }
    #[allow(clippy::cast_sign_loss)]
    #[allow(clippy::cast_possible_truncation)]
    let (col, row, radius) = (x as usize, y as usize, radius as usize);
    let depth = depth_map[(row, col)];
    #[allow(clippy::cast_precision_loss)]
    let position = if range.accepts(depth) {
        Some(intrinsics.back_project(Point2::new(col as Float, row as Float), depth))
    } else {
        None
    };
    Some(BallObservation {
        pixel: (col, row),
        diameter: 2 * radius,
        depth,
        position,
    })
}

// VOTING ############################################################

/// A circle seen in several frames.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Candidate {
    /// First circle of this candidate.
    pub circle: Circle,
    /// Number of frames it was detected in.
    pub frequency: usize,
}

/// Accumulate circles over a buffer of frames,
/// the most frequent one being the most likely ball.
#[derive(Debug, Clone)]
pub struct CircleVotes {
    overlap_ratio: Float,
    candidates: Vec<Candidate>,
}

impl CircleVotes {
    pub fn new(overlap_ratio: Float) -> Self {
        Self {
            overlap_ratio,
            candidates: Vec::new(),
        }
    }

    /// Vote for the first candidate overlapping this circle,
    /// or start a new candidate.
    pub fn add(&mut self, circle: Circle) {
        let overlap_ratio = self.overlap_ratio;
        let existing = self.candidates.iter_mut().find(|candidate| {
            let dx = candidate.circle.center.0 - circle.center.0;
            let dy = candidate.circle.center.1 - circle.center.1;
            let distance = (dx * dx + dy * dy).sqrt();
            distance < overlap_ratio * (candidate.circle.radius + circle.radius)
        });
        match existing {
            Some(candidate) => candidate.frequency += 1,
            None => self.candidates.push(Candidate {
                circle,
                frequency: 1,
            }),
        }
    }

    /// Vote for all circles of a frame.
    pub fn add_frame<I: IntoIterator<Item = Circle>>(&mut self, circles: I) {
        circles.into_iter().for_each(|c| self.add(c));
    }

    /// Candidates by decreasing frequency.
    /// Ties keep their insertion order.
    pub fn ranked(&self) -> Vec<Candidate> {
        let mut ranked = self.candidates.clone();
        ranked.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        ranked
    }

    /// The candidate detected the most often.
    pub fn most_frequent(&self) -> Option<Candidate> {
        self.ranked().first().cloned()
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
    }
}

/// Run a detector over a buffer of frames and return the most frequent circle.
pub fn detect_over_frames<'a, D, I>(detector: &mut D, frames: I, params: &BallParams) -> Option<Candidate>
where
    D: CircleDetector,
    I: IntoIterator<Item = &'a GrayImage>,
{
    let mut votes = CircleVotes::new(params.overlap_ratio);
    frames
        .into_iter()
        .take(params.buffer_frames)
        .for_each(|img| votes.add_frame(detector.detect(img, &params.detection)));
    votes.most_frequent()
}

// TESTS #############################################################
