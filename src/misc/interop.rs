// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between image, matrix and file sample types.

use image::{Rgb, RgbImage};
use nalgebra::DMatrix;

use crate::misc::type_aliases::{DepthMap, Float};

/// Convert a matrix of `(r, g, b)` colors into an `RgbImage`.
///
/// Performs a transposition to accomodate for the
/// column major matrix into the row major image.
#[allow(clippy::cast_possible_truncation)]
pub fn rgb_from_matrix(mat: &DMatrix<(u8, u8, u8)>) -> RgbImage {
    let (nb_rows, nb_cols) = mat.shape();
    let mut img_buf = RgbImage::new(nb_cols as u32, nb_rows as u32);
    for (x, y, pixel) in img_buf.enumerate_pixels_mut() {
        let (r, g, b) = mat[(y as usize, x as usize)];
        *pixel = Rgb([r, g, b]);
    }
    img_buf
}

/// Reinterpret 16 bits png samples as the signed
/// fixed point disparities they were saved from.
#[allow(clippy::cast_possible_wrap)]
pub fn fixed_point_from_u16(mat: &DMatrix<u16>) -> DMatrix<i16> {
    mat.map(|x| x as i16)
}

/// Encode a depth map in millimeters into 16 bits values.
///
/// Invalid depths, and depths that do not fit into 16 bits, are encoded with 0.
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn depth_to_u16(depth_map: &DepthMap) -> DMatrix<u16> {
    depth_map.map(|d| {
        let mm = d.round();
        if mm.is_finite() && mm > 0.0 && mm <= Float::from(u16::MAX) {
            mm as u16
        } else {
            0
        }
    })
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn rgb_from_matrix_is_row_major() {
        let mat = DMatrix::from_fn(2, 3, |r, c| (r as u8, c as u8, 7));
        let img = rgb_from_matrix(&mat);
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(img.get_pixel(2, 1), &Rgb([1, 2, 7]));
    }

    #[test]
    fn negative_disparities_survive_u16_storage() {
        let mat = DMatrix::from_row_slice(1, 3, &[0_u16, 640, 0xFFF0]);
        assert_eq!(fixed_point_from_u16(&mat).as_slice(), &[0, 640, -16]);
    }

    #[test]
    fn depth_encoding() {
        let depth = DMatrix::from_row_slice(1, 5, &[1234.4, Float::NAN, -3.0, 70_000.0, 0.2]);
        assert_eq!(depth_to_u16(&depth).as_slice(), &[1234, 0, 0, 0, 0]);
    }
}
