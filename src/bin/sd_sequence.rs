// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::Parser;
use std::path::PathBuf;
use std::time::Instant;

use stereo_depth::config::{self, Config};
use stereo_depth::core::pipeline::{DepthPipeline, FrameGate};
use stereo_depth::dataset::calibration::Calibration;
use stereo_depth::dataset::sequence;
use stereo_depth::misc::export::{self, ExportPaths};
use stereo_depth::misc::{helper, interop};
use stereo_depth::{parallel, Error, Result};

/// Depth maps and point clouds of a recorded stereo sequence.
#[derive(Parser, Debug)]
#[command(name = "sd_sequence")]
struct Args {
    /// Calibration of the rectified stereo pair (TOML).
    calibration: PathBuf,
    /// Frame list: `timestamp disparity_path [left_image_path]` per line.
    frames: PathBuf,
    /// Configuration file, created with default values if it does not exist.
    #[arg(short, long, default_value = config::DEFAULT_FILE_NAME)]
    config: PathBuf,
    /// Directory where results are written, nothing is written without it.
    #[arg(short, long)]
    output: Option<PathBuf>,
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
    let calibration = Calibration::load(&args.calibration)?;
    let frames = sequence::load(&args.frames)?;

    let mut gate = FrameGate::new();
    let mut pipeline: Option<(DepthPipeline, (usize, usize))> = None;
    let mut nb_processed = 0;
    let start = Instant::now();

    for frame in &frames {
        if gate.is_repeat(frame.timestamp) {
            log::debug!("Skipping repeated frame {}", frame.timestamp);
            continue;
        }
        let raw = interop::fixed_point_from_u16(&helper::read_png_16bits_matrix(&frame.disparity_path)?);
        if !gate.accept(frame.timestamp, !raw.is_empty()) {
            log::debug!("Skipping empty frame {}", frame.timestamp);
            continue;
        }

        // The camera is set up once, from the size of the first frame,
        // and every other frame must have that size.
        if pipeline.is_none() {
            let factor = usize::from(config.disparity_scale.resize_factor);
            #[allow(clippy::cast_possible_truncation)]
            let (width, height) = ((raw.ncols() * factor) as u32, (raw.nrows() * factor) as u32);
            let camera = calibration.camera_for_size(width, height)?;
            pipeline = Some((DepthPipeline::new(camera, &config)?, raw.shape()));
        }
        let Some((pipeline, shape)) = &pipeline else {
            continue;
        };
        if raw.shape() != *shape {
            return Err(Error::ShapeMismatch {
                expected: *shape,
                found: raw.shape(),
            });
        }

        let output = match &frame.left_path {
            Some(left_path) => pipeline.process_with_colors(&raw, &image::open(left_path)?.to_rgb8())?,
            None => pipeline.process(&raw)?,
        };
        match output.central_depth {
            Some(d) if d.is_finite() => log::info!("{}: depth at the center {} mm", frame.timestamp, d),
            _ => log::info!("{}: no depth at the center", frame.timestamp),
        }
        log::info!(
            "{}: {} points accepted, {} rejected",
            frame.timestamp,
            output.stats.accepted,
            output.stats.rejected
        );

        if let Some(dir) = &args.output {
            let paths = ExportPaths::new(dir, &frame.timestamp.to_string());
            export::write_frame(&output, &config, &paths, None)?;
        }
        nb_processed += 1;
    }

    log::info!(
        "Processed {} of {} frames in {:.2} s",
        nb_processed,
        frames.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
