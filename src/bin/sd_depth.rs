// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;
use std::path::PathBuf;

use stereo_depth::config::{self, Config};
use stereo_depth::core::depth;
use stereo_depth::core::pipeline::DepthPipeline;
use stereo_depth::dataset::calibration::Calibration;
use stereo_depth::dataset::zed::{self, Resolution};
use stereo_depth::misc::export::{self, ExportPaths};
use stereo_depth::misc::{helper, interop};
use stereo_depth::{parallel, Result};

/// Depth map and point cloud of a single stereo frame.
#[derive(Parser, Debug)]
#[command(name = "sd_depth")]
struct Args {
    /// Calibration of the rectified stereo pair (TOML).
    calibration: PathBuf,
    /// 16 bits PNG of the raw fixed point matcher disparities.
    disparity: PathBuf,
    /// Rectified left color image, used to texture the point cloud.
    #[arg(short, long)]
    left: Option<PathBuf>,
    /// The left image is a side by side frame of both views.
    #[arg(long, requires = "left")]
    side_by_side: bool,
    /// Downscale colored images to the display scale of the camera resolution.
    #[arg(long)]
    preview: bool,
    /// Configuration file, created with default values if it does not exist.
    #[arg(short, long, default_value = config::DEFAULT_FILE_NAME)]
    config: PathBuf,
    /// Directory where results are written.
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
}

fn main() {
    pretty_env_logger::init_timed();
    let args = Args::parse();
    if let Err(error) = my_run(&args) {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

fn my_run(args: &Args) -> Result<()> {
    parallel::init_global_thread_pool()?;
    let config = Config::load_or_save_default(&args.config)?;

    // Read the raw disparities and bring them to full resolution size.
    let raw = interop::fixed_point_from_u16(&helper::read_png_16bits_matrix(&args.disparity)?);
    let factor = usize::from(config.disparity_scale.resize_factor);
    let (height, width) = (raw.nrows() * factor, raw.ncols() * factor);

    // Camera parameters for that size.
    #[allow(clippy::cast_possible_truncation)]
    let camera = Calibration::load(&args.calibration)?.camera_for_size(width as u32, height as u32)?;
    let pipeline = DepthPipeline::new(camera, &config)?;

    let output = match &args.left {
        Some(left_path) => {
            let mut left = image::open(left_path)?.to_rgb8();
            if args.side_by_side {
                let (width, height) = left.dimensions();
                match Resolution::from_side_by_side(width, height) {
                    Some(resolution) => log::info!("Side by side frame in {:?}", resolution),
                    None => log::warn!("Unknown side by side frame size {}x{}", width, height),
                }
                left = zed::split_side_by_side(&left)?.0;
            }
            pipeline.process_with_colors(&raw, &left)?
        }
        None => pipeline.process(&raw)?,
    };

    if let Some(stats) = depth::depth_stats(&output.depth) {
        log::info!(
            "Depth: {} valid pixels, min {} mm, max {} mm, mean {} mm",
            stats.count,
            stats.min,
            stats.max,
            stats.mean
        );
    }
    log::info!(
        "Point cloud: {} accepted, {} rejected",
        output.stats.accepted,
        output.stats.rejected
    );

    let stem = args
        .disparity
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    #[allow(clippy::cast_possible_truncation)]
    let preview = if args.preview {
        let resolution = Resolution::from_dimensions(width as u32, height as u32);
        if resolution.is_none() {
            log::warn!("No display scale for {}x{} frames", width, height);
        }
        resolution
    } else {
        None
    };
    let paths = ExportPaths::new(&args.output, stem);
    export::write_frame(&output, &config, &paths, preview)?;
    log::info!("Point cloud written to {}", paths.cloud.display());
    Ok(())
}
