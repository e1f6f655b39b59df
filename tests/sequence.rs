// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use image::{Rgb, RgbImage};
use nalgebra::DMatrix;
use std::fs;
use std::path::Path;
use std::process::Command;

use stereo_depth::config::Config;
use stereo_depth::core::pipeline::{DepthPipeline, FrameGate};
use stereo_depth::dataset::{calibration::Calibration, sequence};
use stereo_depth::misc::export::{self, ExportPaths};
use stereo_depth::misc::{helper, interop};

const CALIBRATION: &str = "fx = 1000.0\nfy = 1000.0\ncx = 3.5\ncy = 1.5\nbaseline_mm = 120.0\nwidth = 8\nheight = 4\n";

/// Save raw fixed point disparities the way the matcher output is recorded.
#[allow(clippy::cast_sign_loss)]
fn write_raw_disparity(path: &Path, raw: &DMatrix<i16>) {
    helper::write_png_16bits(path, &raw.map(|d| d as u16)).unwrap();
}

/// 2x4 half resolution frame, 40 px at full resolution except one unmatched pixel.
fn raw_frame() -> DMatrix<i16> {
    let mut raw = DMatrix::from_element(2, 4, 320_i16);
    raw[(1, 3)] = -16;
    raw
}

#[test]
fn recorded_sequence_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("calibration.toml"), CALIBRATION).unwrap();
    fs::create_dir(dir.path().join("disparity")).unwrap();
    write_raw_disparity(&dir.path().join("disparity/0.png"), &raw_frame());
    write_raw_disparity(&dir.path().join("disparity/1.png"), &DMatrix::from_element(2, 4, 160));
    fs::write(
        dir.path().join("frames.txt"),
        "# timestamp disparity\n10 disparity/0.png\n10 disparity/0.png\n20 disparity/1.png\n",
    )
    .unwrap();

    let config = Config::default();
    let calibration = Calibration::load(dir.path().join("calibration.toml")).unwrap();
    let pipeline = DepthPipeline::new(calibration.camera_for_size(8, 4).unwrap(), &config).unwrap();
    let frames = sequence::load(dir.path().join("frames.txt")).unwrap();
    assert_eq!(frames.len(), 3);

    let mut gate = FrameGate::new();
    let mut central_depths = Vec::new();
    for frame in &frames {
        let raw = interop::fixed_point_from_u16(&helper::read_png_16bits_matrix(&frame.disparity_path).unwrap());
        if !gate.accept(frame.timestamp, true) {
            continue;
        }
        let output = pipeline.process(&raw).unwrap();
        assert_eq!(output.cloud.points().len(), 8 * 4);
        let paths = ExportPaths::new(&dir.path().join("out"), &frame.timestamp.to_string());
        export::write_frame(&output, &config, &paths, None).unwrap();
        central_depths.push(output.central_depth);
    }

    // The repeated timestamp is skipped.
    assert_eq!(central_depths, vec![Some(3000.0), Some(6000.0)]);
    let depth = helper::read_png_16bits_matrix(dir.path().join("out/10_depth.png")).unwrap();
    assert_eq!(depth[(0, 0)], 3000);
    assert_eq!(depth[(3, 7)], 0);
    let ply = fs::read_to_string(dir.path().join("out/10.ply")).unwrap();
    assert!(ply.contains("element vertex 28\n"));
    assert!(dir.path().join("out/20_disparity.png").is_file());
}

#[test]
fn depth_binary_writes_results() {
    let dir = tempfile::tempdir().unwrap();
    let calibration = dir.path().join("calibration.toml");
    let disparity = dir.path().join("frame.png");
    let config = dir.path().join("stereo_depth.toml");
    fs::write(&calibration, CALIBRATION).unwrap();
    write_raw_disparity(&disparity, &raw_frame());

    let status = Command::new(env!("CARGO_BIN_EXE_sd_depth"))
        .arg(&calibration)
        .arg(&disparity)
        .arg("--config")
        .arg(&config)
        .arg("--output")
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(status.success());
    assert!(config.is_file());
    assert!(dir.path().join("frame_depth.png").is_file());
    assert!(dir.path().join("frame_disparity.png").is_file());
    assert!(dir.path().join("frame.ply").is_file());
    assert!(dir.path().join("frame_depth_view.png").is_file());
}

#[test]
fn depth_binary_splits_side_by_side_frames() {
    let dir = tempfile::tempdir().unwrap();
    let calibration = dir.path().join("calibration.toml");
    let disparity = dir.path().join("frame.png");
    let left = dir.path().join("left.png");
    fs::write(&calibration, CALIBRATION).unwrap();
    write_raw_disparity(&disparity, &raw_frame());
    // Both views of 8x4 pixels, the left one is red.
    RgbImage::from_fn(16, 4, |x, _| if x < 8 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) })
        .save(&left)
        .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_sd_depth"))
        .arg(&calibration)
        .arg(&disparity)
        .arg("--left")
        .arg(&left)
        .arg("--side-by-side")
        .arg("--config")
        .arg(dir.path().join("stereo_depth.toml"))
        .arg("--output")
        .arg(dir.path())
        .status()
        .unwrap();
    assert!(status.success());
    let ply = fs::read_to_string(dir.path().join("frame.ply")).unwrap();
    assert!(ply.contains("property uchar red\n"));
    let body: Vec<&str> = ply.split("end_header\n").nth(1).unwrap().lines().collect();
    assert_eq!(body.len(), 28);
    assert!(body.iter().all(|line| line.ends_with(" 255 0 0")));
}

fn run_sequence(dir: &Path, list: &str) -> std::process::ExitStatus {
    fs::write(dir.join("calibration.toml"), CALIBRATION).unwrap();
    fs::write(dir.join("frames.txt"), list).unwrap();
    Command::new(env!("CARGO_BIN_EXE_sd_sequence"))
        .arg(dir.join("calibration.toml"))
        .arg(dir.join("frames.txt"))
        .arg("--config")
        .arg(dir.join("stereo_depth.toml"))
        .arg("--output")
        .arg(dir.join("out"))
        .status()
        .unwrap()
}

#[test]
fn sequence_binary_does_not_read_repeated_frames() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_disparity(&dir.path().join("0.png"), &raw_frame());
    // The repeated frame points to a missing file, reading it would fail.
    let status = run_sequence(dir.path(), "10 0.png\n10 missing.png\n");
    assert!(status.success());
    assert!(dir.path().join("out/10.ply").is_file());
}

#[test]
fn sequence_binary_rejects_frames_of_another_size() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_disparity(&dir.path().join("0.png"), &raw_frame());
    write_raw_disparity(&dir.path().join("1.png"), &DMatrix::from_element(4, 8, 320));
    let status = run_sequence(dir.path(), "10 0.png\n20 1.png\n");
    assert_eq!(status.code(), Some(1));
    assert!(dir.path().join("out/10.ply").is_file());
    assert!(!dir.path().join("out/20.ply").exists());
}

#[test]
fn depth_binary_fails_on_bad_calibration() {
    let dir = tempfile::tempdir().unwrap();
    let calibration = dir.path().join("calibration.toml");
    let disparity = dir.path().join("frame.png");
    fs::write(&calibration, "fx = 1000.0\nfy = 1000.0\ncx = 0.0\ncy = 0.0\nbaseline_mm = -120.0\n").unwrap();
    write_raw_disparity(&disparity, &raw_frame());

    let status = Command::new(env!("CARGO_BIN_EXE_sd_depth"))
        .arg(&calibration)
        .arg(&disparity)
        .arg("--config")
        .arg(dir.path().join("stereo_depth.toml"))
        .arg("--output")
        .arg(dir.path())
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}
