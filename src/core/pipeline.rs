// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Per frame processing, from raw matcher disparities to a point cloud.

use image::RgbImage;
use nalgebra::DMatrix;
use std::time::Instant;

use crate::config::Config;
use crate::core::camera::StereoCamera;
use crate::core::depth::{self, DepthRangeMm};
use crate::core::disparity::DisparityScale;
use crate::core::point_cloud::{self, CloudStats, PointCloud};
use crate::error::Result;
use crate::misc::type_aliases::{DepthMap, DisparityMap, Float};

/// Everything computed for one frame.
/// Nothing is kept from one frame to the next.
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Disparities in pixels at full resolution.
    pub disparity: DisparityMap,
    /// Depths in millimeters.
    pub depth: DepthMap,
    pub cloud: PointCloud,
    pub stats: CloudStats,
    /// Depth of the central pixel, in millimeters.
    pub central_depth: Option<Float>,
}

/// Configuration of the depth extraction for a whole session.
#[derive(Debug, Clone)]
pub struct DepthPipeline {
    camera: StereoCamera,
    range: DepthRangeMm,
    scale: DisparityScale,
}

impl DepthPipeline {
    /// Validate the camera and configuration once for the session.
    pub fn new(camera: StereoCamera, config: &Config) -> Result<Self> {
        camera.validate()?;
        config.depth_range.validate()?;
        config.disparity_scale.validate()?;
        Ok(Self {
            camera,
            range: config.depth_range,
            scale: config.disparity_scale,
        })
    }

    pub fn camera(&self) -> &StereoCamera {
        &self.camera
    }

    pub fn range(&self) -> &DepthRangeMm {
        &self.range
    }

    /// Process raw fixed point disparities, as output by the matcher.
    pub fn process(&self, raw: &DMatrix<i16>) -> Result<FrameOutput> {
        let start = Instant::now();
        let disparity = self.scale.normalize(raw);
        log::debug!(
            "Disparity normalization: {:.3} ms",
            start.elapsed().as_secs_f64() * 1e3
        );
        self.process_normalized(disparity)
    }

    /// Process disparities already in pixel units at full resolution.
    pub fn process_normalized(&self, disparity: DisparityMap) -> Result<FrameOutput> {
        let start = Instant::now();
        let depth = depth::compute_depth(&disparity, self.camera.left.focal.0, self.camera.baseline)?;
        let central_depth = depth::central_depth(&depth);
        if let Some(d) = central_depth {
            log::debug!("Depth of the central pixel: {} mm", d);
        }
        let cloud = point_cloud::build_point_cloud(&depth, &self.camera.left, &self.range)?;
        let stats = cloud.stats();
        let elapsed = start.elapsed().as_secs_f64();
        log::debug!(
            "Point cloud processing: {:.3} ms - Freq: {:.1} Hz ({} accepted, {} rejected)",
            elapsed * 1e3,
            1.0 / elapsed,
            stats.accepted,
            stats.rejected
        );
        if stats.accepted == 0 {
            log::warn!("No valid depth in this frame");
        }
        Ok(FrameOutput {
            disparity,
            depth,
            cloud,
            stats,
            central_depth,
        })
    }

    /// Same as `process`, with the cloud textured by the rectified left image.
    pub fn process_with_colors(&self, raw: &DMatrix<i16>, left: &RgbImage) -> Result<FrameOutput> {
        let mut output = self.process(raw)?;
        output.cloud = output.cloud.with_colors(left)?;
        Ok(output)
    }
}

// FRAME GATE ########################################################

/// Let a frame through only if it is new.
///
/// Capture devices may return the same last frame several times,
/// a frame is new if it has data and a timestamp different from
/// the previously accepted one.
#[derive(Debug, Clone, Default)]
pub struct FrameGate {
    last_timestamp: Option<u64>,
}

impl FrameGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and remembers the timestamp if the frame is new.
    pub fn accept(&mut self, timestamp: u64, has_data: bool) -> bool {
        if has_data && self.last_timestamp != Some(timestamp) {
            self.last_timestamp = Some(timestamp);
            true
        } else {
            false
        }
    }

    /// True if the timestamp is the one of the last accepted frame.
    /// Lets callers skip repeated frames before reading their data.
    pub fn is_repeat(&self, timestamp: u64) -> bool {
        self.last_timestamp == Some(timestamp)
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }
}

// TESTS #############################################################
