// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helper functions to handle frames of ZED stereo cameras.
//!
//! The camera delivers both views in a single side by side image,
//! left view on the left half.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::misc::type_aliases::Float;

type Image<P> = ImageBuffer<P, Vec<<P as Pixel>::Subpixel>>;

/// Resolutions of one view of the camera.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Resolution {
    Vga,
    Hd720,
    Hd1080,
    Hd2k,
}

pub const ALL_RESOLUTIONS: [Resolution; 4] = [
    Resolution::Vga,
    Resolution::Hd720,
    Resolution::Hd1080,
    Resolution::Hd2k,
];

impl Resolution {
    /// (width, height) of one view.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Vga => (672, 376),
            Self::Hd720 => (1280, 720),
            Self::Hd1080 => (1920, 1080),
            Self::Hd2k => (2208, 1242),
        }
    }

    /// (width, height) of the side by side frame.
    pub fn side_by_side_dimensions(self) -> (u32, u32) {
        let (width, height) = self.dimensions();
        (2 * width, height)
    }

    /// Scale applied to frames before displaying them.
    pub fn display_scale(self) -> Float {
        match self {
            Self::Vga => 1.0,
            Self::Hd720 => 0.6,
            Self::Hd1080 | Self::Hd2k => 0.4,
        }
    }

    /// Find the resolution of a single view.
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        ALL_RESOLUTIONS
            .iter()
            .copied()
            .find(|r| r.dimensions() == (width, height))
    }

    /// Find the resolution of a side by side frame.
    pub fn from_side_by_side(width: u32, height: u32) -> Option<Self> {
        ALL_RESOLUTIONS
            .iter()
            .copied()
            .find(|r| r.side_by_side_dimensions() == (width, height))
    }
}

/// Split a side by side frame into its left and right views.
pub fn split_side_by_side<P>(frame: &Image<P>) -> Result<(Image<P>, Image<P>)>
where
    P: Pixel + 'static,
{
    let (width, height) = frame.dimensions();
    if width % 2 != 0 {
        return Err(Error::InvalidParameters(format!(
            "side by side frame must have an even width, got {}",
            width
        )));
    }
    let half = width / 2;
    let left = imageops::crop_imm(frame, 0, 0, half, height).to_image();
    let right = imageops::crop_imm(frame, half, 0, half, height).to_image();
    Ok((left, right))
}

/// Resize a frame for display at the scale of its resolution.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
pub fn preview(image: &RgbImage, resolution: Resolution) -> RgbImage {
    let scale = resolution.display_scale();
    if scale >= 1.0 {
        return image.clone();
    }
    let (width, height) = image.dimensions();
    let new_width = ((width as Float * scale).round() as u32).max(1);
    let new_height = ((height as Float * scale).round() as u32).max(1);
    imageops::resize(image, new_width, new_height, FilterType::Triangle)
}

// TESTS #############################################################
