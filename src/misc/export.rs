// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Write the results of a frame to disk.

use image::RgbImage;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::core::pipeline::FrameOutput;
use crate::dataset::zed::{self, Resolution};
use crate::error::Result;
use crate::misc::{helper, interop, view};

/// Paths of the files written for one frame.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ExportPaths {
    /// 16 bits PNG of depths in millimeters.
    pub depth: PathBuf,
    /// Colored depths, close is bright.
    pub depth_view: PathBuf,
    /// Colored disparities.
    pub disparity: PathBuf,
    /// ASCII PLY point cloud.
    pub cloud: PathBuf,
}

impl ExportPaths {
    /// `<stem>_depth.png`, `<stem>_depth_view.png`, `<stem>_disparity.png`
    /// and `<stem>.ply` in `dir`.
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            depth: dir.join(format!("{}_depth.png", stem)),
            depth_view: dir.join(format!("{}_depth_view.png", stem)),
            disparity: dir.join(format!("{}_disparity.png", stem)),
            cloud: dir.join(format!("{}.ply", stem)),
        }
    }
}

/// Write depth, colored depth, colored disparity and point cloud of a frame.
///
/// With a `preview` resolution, colored images are downscaled
/// to its display scale. Depth PNG and cloud keep full resolution.
pub fn write_frame(
    output: &FrameOutput,
    config: &Config,
    paths: &ExportPaths,
    preview: Option<Resolution>,
) -> Result<()> {
    for path in [&paths.depth, &paths.depth_view, &paths.disparity, &paths.cloud] {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
    }
    let for_display = |img: RgbImage| match preview {
        Some(resolution) => zed::preview(&img, resolution),
        None => img,
    };
    helper::write_png_16bits(&paths.depth, &interop::depth_to_u16(&output.depth))?;
    for_display(view::depth_image(&output.depth, &config.depth_range)).save(&paths.depth_view)?;
    for_display(view::disparity_image(
        &output.disparity,
        config.matcher.min_disparity,
        config.matcher.num_disparities,
    )?)
    .save(&paths.disparity)?;
    let mut ply_writer = BufWriter::new(File::create(&paths.cloud)?);
    output.cloud.write_ply(&mut ply_writer)?;
    ply_writer.flush()?;
    log::debug!("Frame written to {}", paths.cloud.display());
    Ok(())
}

// TESTS #############################################################
