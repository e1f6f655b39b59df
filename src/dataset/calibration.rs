// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Calibration of the rectified stereo pair, stored as TOML.
//!
//! ```toml
//! fx = 699.5
//! fy = 699.5
//! cx = 641.2
//! cy = 362.8
//! baseline_mm = 119.9
//! # Optional size of the images the intrinsics were computed for.
//! width = 1280
//! height = 720
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::camera::{Intrinsics, StereoCamera};
use crate::error::{Error, Result};
use crate::misc::type_aliases::Float;

/// Content of a calibration file.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Calibration {
    pub fx: Float,
    pub fy: Float,
    pub cx: Float,
    pub cy: Float,
    pub baseline_mm: Float,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl Calibration {
    /// Parse a calibration from its TOML content.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read a calibration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Stereo camera described by this calibration, validated.
    pub fn camera(&self) -> Result<StereoCamera> {
        let camera = StereoCamera::new(
            Intrinsics::new(self.fx, self.fy, self.cx, self.cy),
            self.baseline_mm,
        );
        camera.validate()?;
        Ok(camera)
    }

    /// Stereo camera for images of the given size.
    ///
    /// If the calibration records the size it was computed for,
    /// intrinsics are rescaled to the new size, which must keep the aspect ratio.
    #[allow(clippy::cast_precision_loss)]
    pub fn camera_for_size(&self, width: u32, height: u32) -> Result<StereoCamera> {
        let camera = self.camera()?;
        match (self.width, self.height) {
            (Some(w), Some(h)) if (w, h) != (width, height) => {
                if u64::from(w) * u64::from(height) != u64::from(h) * u64::from(width) {
                    return Err(Error::InvalidParameters(format!(
                        "cannot rescale a {}x{} calibration to {}x{} images",
                        w, h, width, height
                    )));
                }
                let factor = width as Float / w as Float;
                log::info!("Rescaling calibration from {}x{} to {}x{}", w, h, width, height);
                Ok(StereoCamera::new(camera.left.scaled(factor), camera.baseline))
            }
            _ => Ok(camera),
        }
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    const HD720: &str = "fx = 700.0\nfy = 700.0\ncx = 639.5\ncy = 359.5\nbaseline_mm = 120.0\nwidth = 1280\nheight = 720\n";

    #[test]
    fn parse_and_build_camera() {
        let calibration = Calibration::from_toml(HD720).unwrap();
        let camera = calibration.camera().unwrap();
        assert_eq!(camera.left.focal, (700.0, 700.0));
        assert_eq!(camera.left.principal_point, (639.5, 359.5));
        assert_eq!(camera.baseline, 120.0);
    }

    #[test]
    fn size_is_optional() {
        let calibration =
            Calibration::from_toml("fx = 1.0\nfy = 1.0\ncx = 0.0\ncy = 0.0\nbaseline_mm = 1.0\n").unwrap();
        assert_eq!(calibration.width, None);
        assert!(calibration.camera_for_size(10, 10).is_ok());
        assert!(!calibration.to_toml().unwrap().contains("width"));
    }

    #[test]
    fn rescale_to_half_resolution() {
        let calibration = Calibration::from_toml(HD720).unwrap();
        let camera = calibration.camera_for_size(640, 360).unwrap();
        assert_eq!(camera.left.focal, (350.0, 350.0));
        assert_eq!(camera.left.principal_point, (319.5, 179.5));
        assert_eq!(camera.baseline, 120.0);
        assert!(calibration.camera_for_size(640, 480).is_err());
    }

    #[test]
    fn invalid_baseline_is_rejected() {
        let calibration =
            Calibration::from_toml("fx = 700.0\nfy = 700.0\ncx = 0.0\ncy = 0.0\nbaseline_mm = 0.0\n").unwrap();
        assert!(calibration.camera().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.toml");
        fs::write(&path, HD720).unwrap();
        assert_eq!(Calibration::load(&path).unwrap(), Calibration::from_toml(HD720).unwrap());
    }
}
