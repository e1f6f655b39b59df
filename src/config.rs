// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Configuration of the depth extraction, stored as TOML.
//!
//! ```toml
//! [matcher]
//! block_size = 3
//! min_disparity = 0
//! num_disparities = 96
//! # ...
//!
//! [depth_range]
//! min = 300.0
//! max = 10000.0
//!
//! [disparity_scale]
//! subpixel_bits = 4
//! resize_factor = 2
//!
//! [ball]
//! buffer_frames = 10
//! overlap_ratio = 1.1
//!
//! [ball.detection]
//! threshold_bin_min = 50
//! threshold_bin_max = 255
//! blur_kernel = 9
//! # ...
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::depth::DepthRangeMm;
use crate::core::detection::BallParams;
use crate::core::disparity::DisparityScale;
use crate::error::{Error, Result};

/// Default file name of the configuration.
pub const DEFAULT_FILE_NAME: &str = "stereo_depth.toml";

/// Mode of the semi global block matcher.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SgbmMode {
    Sgbm,
    Hh,
    Sgbm3Way,
    Hh4,
}

/// Parameters of the external semi global block matcher.
///
/// They are only forwarded to the matcher, except for `min_disparity`
/// and `num_disparities` which are also needed to display disparities.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SgbmParams {
    /// Matched block size, odd and >= 1.
    pub block_size: u32,
    /// Minimum possible disparity value.
    pub min_disparity: i32,
    /// Maximum disparity minus minimum disparity, multiple of 16.
    pub num_disparities: u32,
    pub mode: SgbmMode,
    /// Smoothness penalty for disparity changes of 1 pixel.
    pub p1: u32,
    /// Smoothness penalty for larger disparity changes, > p1.
    pub p2: u32,
    /// Maximum allowed difference in the left-right check, negative to disable.
    pub disp12_max_diff: i32,
    /// Truncation value for the prefiltered image pixels.
    pub pre_filter_cap: i32,
    /// Margin in percent by which the best match must win.
    pub uniqueness_ratio: u32,
    /// Maximum size of smooth disparity regions considered noise, 0 to disable.
    pub speckle_window_size: u32,
    /// Maximum disparity variation within each connected component.
    pub speckle_range: u32,
}

impl Default for SgbmParams {
    fn default() -> Self {
        let block_size = 3;
        let p1 = 24 * block_size * block_size;
        Self {
            block_size,
            min_disparity: 0,
            num_disparities: 96,
            mode: SgbmMode::Sgbm,
            p1,
            p2: 4 * p1,
            disp12_max_diff: 96,
            pre_filter_cap: 63,
            uniqueness_ratio: 5,
            speckle_window_size: 255,
            speckle_range: 1,
        }
    }
}

impl SgbmParams {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || self.block_size % 2 == 0 {
            return Err(Error::InvalidParameters(format!(
                "block_size must be odd, got {}",
                self.block_size
            )));
        }
        if self.num_disparities == 0 || self.num_disparities % 16 != 0 {
            return Err(Error::InvalidParameters(format!(
                "num_disparities must be a positive multiple of 16, got {}",
                self.num_disparities
            )));
        }
        if self.p2 <= self.p1 {
            return Err(Error::InvalidParameters(format!(
                "p2 ({}) must be greater than p1 ({})",
                self.p2, self.p1
            )));
        }
        Ok(())
    }
}

/// Whole configuration.
#[derive(PartialEq, Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub matcher: SgbmParams,
    pub depth_range: DepthRangeMm,
    pub disparity_scale: DisparityScale,
    pub ball: BallParams,
}

impl Config {
    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.matcher.validate()?;
        self.depth_range.validate()?;
        self.disparity_scale.validate()?;
        self.ball.validate()
    }

    /// Parse and validate a configuration.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Read a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_toml(&fs::read_to_string(path)?)
    }

    /// Write the configuration into a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Read the configuration file if it exists,
    /// otherwise write the default configuration there and use it.
    pub fn load_or_save_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_file() {
            log::info!("Loading configuration from {}", path.display());
            Self::load(path)
        } else {
            log::info!("Saving default configuration to {}", path.display());
            let config = Self::default();
            config.save(path)?;
            Ok(config)
        }
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matcher.p1, 216);
        assert_eq!(config.matcher.p2, 864);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = Config::default();
        config.depth_range = DepthRangeMm::new(50.0, 5000.0).unwrap();
        config.matcher.mode = SgbmMode::Sgbm3Way;
        let text = config.to_toml().unwrap();
        assert!(text.contains("mode = \"sgbm3_way\""));
        assert_eq!(Config::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = Config::from_toml("[depth_range]\nmin = 100.0\nmax = 2000.0\n").unwrap();
        assert_eq!(config.depth_range, DepthRangeMm::new(100.0, 2000.0).unwrap());
        assert_eq!(config.matcher, SgbmParams::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(Config::from_toml("[depth_range]\nmin = 100.0\nmax = 20.0\n").is_err());
        assert!(Config::from_toml("[disparity_scale]\nsubpixel_bits = 4\nresize_factor = 0\n").is_err());
        assert!(Config::from_toml("[depth_range]\nmin = \"near\"\nmax = 20.0\n").is_err());
    }

    #[test]
    fn circle_detection_section() {
        let config = Config::from_toml(
            "[ball.detection]\nthreshold_bin_min = 80\nblur_kernel = 5\ndiameter_min = 10\ndiameter_max = 60\n",
        )
        .unwrap();
        let detection = config.ball.detection;
        assert_eq!(detection.threshold_bin_min, 80);
        assert_eq!(detection.threshold_bin_max, 255);
        assert_eq!(detection.blur_kernel, 5);
        assert_eq!(detection.radius_range(), (5, 30));
        assert_eq!(config.ball.buffer_frames, 10);
        assert_eq!(Config::from_toml(&config.to_toml().unwrap()).unwrap(), config);
    }

    #[test]
    fn invalid_circle_detection_is_rejected() {
        // Gray levels do not fit outside of 0..=255.
        assert!(Config::from_toml("[ball.detection]\nthreshold_bin_max = 300\n").is_err());
        assert!(Config::from_toml("[ball.detection]\nthreshold_bin_min = -1\n").is_err());
        assert!(Config::from_toml("[ball.detection]\nthreshold_bin_min = 100\nthreshold_bin_max = 90\n").is_err());
        assert!(Config::from_toml("[ball.detection]\nblur_kernel = 4\n").is_err());
        assert!(Config::from_toml("[ball.detection]\ndiameter_min = 50\ndiameter_max = 20\n").is_err());
    }

    #[test]
    fn save_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE_NAME);
        let created = Config::load_or_save_default(&path).unwrap();
        assert!(path.is_file());
        let mut modified = created;
        modified.ball.buffer_frames = 4;
        modified.save(&path).unwrap();
        assert_eq!(Config::load_or_save_default(&path).unwrap(), modified);
    }
}
