// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Images to look at disparity and depth maps.

use image::RgbImage;

use crate::core::depth::DepthRangeMm;
use crate::core::disparity;
use crate::error::Result;
use crate::misc::type_aliases::{DepthMap, DisparityMap, Float};
use crate::misc::{colormap, interop};

/// Create an RGB image of a disparity map with the inferno colormap.
///
/// Levels are computed with the minimum disparity offset correction,
/// see `disparity::display_levels`.
pub fn disparity_image(
    disparity_map: &DisparityMap,
    min_disparity: i32,
    num_disparities: u32,
) -> Result<RgbImage> {
    let inferno = colormap::inferno_u8();
    let levels = disparity::display_levels(disparity_map, min_disparity, num_disparities)?;
    Ok(interop::rgb_from_matrix(
        &levels.map(|l| inferno[usize::from(l)]),
    ))
}

/// Create an RGB image of a depth map, close is bright.
/// Depths outside of the range are black.
pub fn depth_image(depth_map: &DepthMap, range: &DepthRangeMm) -> RgbImage {
    let inferno = colormap::inferno_u8();
    let far = if range.max.is_finite() {
        range.max
    } else {
        // Without far limit, use the farthest valid depth.
        depth_map
            .iter()
            .cloned()
            .filter(|d| range.accepts(*d))
            .fold(range.min, Float::max)
    };
    interop::rgb_from_matrix(&depth_map.map(|d| depth_color(&inferno, range, far, d)))
}

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn depth_color(colormap: &[(u8, u8, u8)], range: &DepthRangeMm, far: Float, depth: Float) -> (u8, u8, u8) {
    if !range.accepts(depth) || far <= range.min {
        return (0, 0, 0);
    }
    let closeness = (far - depth) / (far - range.min);
    let idx = (255.0 * closeness).round().max(0.0).min(255.0) as usize;
    colormap[idx]
}

#[cfg(test)]
mod tests {

    use super::*;
    use image::Rgb;
    use nalgebra::DMatrix;

    #[test]
    fn disparity_colors() {
        let disparity = DMatrix::from_row_slice(1, 2, &[-1.0, 500.0]);
        let img = disparity_image(&disparity, 0, 96).unwrap();
        let inferno = colormap::inferno_u8();
        let (r, g, b) = inferno[255];
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 4]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([r, g, b]));
    }

    #[test]
    fn out_of_range_depth_is_black() {
        let range = DepthRangeMm::new(300.0, 10_000.0).unwrap();
        let depth = DMatrix::from_row_slice(1, 3, &[Float::NAN, 200.0, 300.5]);
        let img = depth_image(&depth, &range);
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(2, 0), &Rgb([252, 255, 164]));
    }

    #[test]
    fn unbounded_range_uses_farthest_depth() {
        let range = DepthRangeMm::new(0.0, Float::INFINITY).unwrap();
        let depth = DMatrix::from_row_slice(1, 2, &[1000.0, 4000.0]);
        let img = depth_image(&depth, &range);
        assert_eq!(img.get_pixel(1, 0), &Rgb([0, 0, 4]));
    }
}
