// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Back projection of a depth map into an organized point cloud.
//!
//! The cloud keeps one slot per pixel, in row major order,
//! so that any point can be traced back to the pixel that produced it.
//! Rejected pixels hold NaN in their three coordinates.

use image::RgbImage;
use rayon::prelude::*;
use std::io::Write;

use crate::core::camera::Intrinsics;
use crate::core::depth::DepthRangeMm;
use crate::error::{Error, Result};
use crate::misc::helper;
use crate::misc::type_aliases::{DepthMap, Float, Point3};

/// Organized point cloud in camera coordinates (millimeters).
#[derive(PartialEq, Debug, Clone)]
pub struct PointCloud {
    width: usize,
    height: usize,
    points: Vec<Point3>,
    colors: Option<Vec<[u8; 3]>>,
}

/// Number of pixels kept and dropped while building a cloud.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct CloudStats {
    pub accepted: usize,
    pub rejected: usize,
}

/// Slot value of a rejected pixel.
pub fn sentinel() -> Point3 {
    Point3::new(Float::NAN, Float::NAN, Float::NAN)
}

/// True if the point is not the sentinel.
#[inline]
pub fn is_valid(point: &Point3) -> bool {
    !point.z.is_nan()
}

/// Back project every depth inside `range` into a 3D point.
///
/// For the pixel at row `r` and column `c` with an accepted depth `d`:
/// `X = (c - cx) * d / fx`, `Y = (r - cy) * d / fy` and `Z = d`.
/// Other pixels get the NaN sentinel.
/// Non finite depths are expected inputs and simply rejected.
pub fn build_point_cloud(
    depth_map: &DepthMap,
    intrinsics: &Intrinsics,
    range: &DepthRangeMm,
) -> Result<PointCloud> {
    intrinsics.validate()?;
    range.validate()?;
    let (fx, fy) = intrinsics.focal;
    let (cx, cy) = intrinsics.principal_point;
    let (height, width) = depth_map.shape();
    let points: Vec<Point3> = (0..width * height)
        .into_par_iter()
        .map(|idx| {
            let (r, c) = helper::div_rem(idx, width);
            let depth = depth_map[(r, c)];
            if range.accepts(depth) {
                #[allow(clippy::cast_precision_loss)]
                let (u, v) = (c as Float, r as Float);
                Point3::new((u - cx) * depth / fx, (v - cy) * depth / fy, depth)
            } else {
                sentinel()
            }
        })
        .collect();
    Ok(PointCloud {
        width,
        height,
        points,
        colors: None,
    })
}

impl PointCloud {
    /// Number of columns of the source depth map.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows of the source depth map.
    pub fn height(&self) -> usize {
        self.height
    }

    /// All slots, `width * height` of them, in row major order.
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    /// Optional colors, one per slot.
    pub fn colors(&self) -> Option<&[[u8; 3]]> {
        self.colors.as_deref()
    }

    /// Slot index of the pixel at row `r` and column `c`.
    pub fn index(&self, r: usize, c: usize) -> usize {
        r * self.width + c
    }

    /// The point produced by the pixel at row `r` and column `c`,
    /// `None` if out of the grid or rejected.
    pub fn point_at(&self, r: usize, c: usize) -> Option<Point3> {
        if r < self.height && c < self.width {
            Some(self.points[self.index(r, c)]).filter(is_valid)
        } else {
            None
        }
    }

    /// Iterate over accepted points with their slot index.
    pub fn valid_points(&self) -> impl Iterator<Item = (usize, &Point3)> {
        self.points.iter().enumerate().filter(|(_, p)| is_valid(p))
    }

    /// Count accepted and rejected slots.
    pub fn stats(&self) -> CloudStats {
        let accepted = self.points.par_iter().filter(|p| is_valid(p)).count();
        CloudStats {
            accepted,
            rejected: self.points.len() - accepted,
        }
    }

    /// Attach the colors of the rectified left image, used as texture.
    pub fn with_colors(mut self, image: &RgbImage) -> Result<Self> {
        let (img_width, img_height) = image.dimensions();
        let found = (img_height as usize, img_width as usize);
        if found != (self.height, self.width) {
            return Err(Error::ShapeMismatch {
                expected: (self.height, self.width),
                found,
            });
        }
        // Image pixels are also stored in row major order.
        self.colors = Some(image.pixels().map(|p| p.0).collect());
        Ok(self)
    }

    /// Write accepted points in the ASCII PLY format.
    pub fn write_ply<W: Write>(&self, mut writer: W) -> Result<()> {
        let nb_valid = self.valid_points().count();
        writeln!(writer, "ply")?;
        writeln!(writer, "format ascii 1.0")?;
        writeln!(writer, "element vertex {}", nb_valid)?;
        writeln!(writer, "property float x")?;
        writeln!(writer, "property float y")?;
        writeln!(writer, "property float z")?;
        if self.colors.is_some() {
            writeln!(writer, "property uchar red")?;
            writeln!(writer, "property uchar green")?;
            writeln!(writer, "property uchar blue")?;
        }
        writeln!(writer, "end_header")?;
        for (idx, p) in self.valid_points() {
            match &self.colors {
                Some(colors) => {
                    let [r, g, b] = colors[idx];
                    writeln!(writer, "{} {} {} {} {} {}", p.x, p.y, p.z, r, g, b)?;
                }
                None => writeln!(writer, "{} {} {}", p.x, p.y, p.z)?,
            }
        }
        Ok(())
    }
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use image::Rgb;
    use nalgebra::DMatrix;

    fn intrinsics_500() -> Intrinsics {
        Intrinsics::new(500.0, 500.0, 0.0, 0.0)
    }

    fn wide_range() -> DepthRangeMm {
        DepthRangeMm::new(50.0, 10_000.0).unwrap()
    }

    #[test]
    fn reference_back_projection() {
        let depth = DMatrix::from_element(20, 30, 1000.0);
        let cloud = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
        assert_eq!(cloud.point_at(10, 20), Some(Point3::new(40.0, 20.0, 1000.0)));
        assert_eq!(cloud.points()[10 * 30 + 20], Point3::new(40.0, 20.0, 1000.0));
    }

    #[test]
    fn bounds_are_exclusive() {
        let depth = DMatrix::from_row_slice(1, 4, &[50.0, 50.0001, 9_999.0, 10_000.0]);
        let cloud = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
        assert_eq!(cloud.point_at(0, 0), None);
        assert!(cloud.point_at(0, 1).is_some());
        assert!(cloud.point_at(0, 2).is_some());
        assert_eq!(cloud.point_at(0, 3), None);
    }

    #[test]
    fn rejected_slots_are_nan() {
        let values = [Float::NAN, Float::INFINITY, -5.0, 20_000.0, 10.0];
        let depth = DMatrix::from_row_slice(1, values.len(), &values);
        let cloud = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
        assert!(cloud
            .points()
            .iter()
            .all(|p| p.x.is_nan() && p.y.is_nan() && p.z.is_nan()));
        assert_eq!(
            cloud.stats(),
            CloudStats {
                accepted: 0,
                rejected: 5
            }
        );
    }

    #[test]
    fn slots_follow_row_major_order() {
        let depth = DMatrix::from_fn(3, 4, |r, c| 1000.0 + (10 * r + c) as Float);
        let cloud = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
        for r in 0..3 {
            for c in 0..4 {
                let p = cloud.points()[cloud.index(r, c)];
                assert_eq!(p.z, depth[(r, c)]);
            }
        }
    }

    #[test]
    fn fail_fast_on_zero_focal() {
        let depth = DMatrix::from_element(2, 2, 1000.0);
        let bad = Intrinsics::new(500.0, 0.0, 0.0, 0.0);
        assert!(build_point_cloud(&depth, &bad, &wide_range()).is_err());
    }

    #[test]
    fn shapes_from_one_pixel_to_wvga() {
        for &(h, w) in &[(1, 1), (1, 7), (9, 1), (376, 672)] {
            let depth = DMatrix::from_element(h, w, 1000.0);
            let cloud = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
            assert_eq!(cloud.points().len(), w * h);
            assert_eq!((cloud.height(), cloud.width()), (h, w));
        }
    }

    #[test]
    fn colors_must_match_shape() {
        let depth = DMatrix::from_element(2, 3, 1000.0);
        let cloud = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
        assert!(cloud.clone().with_colors(&RgbImage::new(2, 3)).is_err());
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(2, 1, Rgb([1, 2, 3]));
        let colored = cloud.with_colors(&img).unwrap();
        assert_eq!(colored.colors().unwrap()[colored.index(1, 2)], [1, 2, 3]);
    }

    #[test]
    fn ply_only_lists_valid_points() {
        let depth = DMatrix::from_row_slice(1, 3, &[1000.0, Float::NAN, 500.0]);
        let cloud = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
        let mut buffer = Vec::new();
        cloud.write_ply(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("element vertex 2\n"));
        let body: Vec<&str> = text.split("end_header\n").nth(1).unwrap().lines().collect();
        assert_eq!(body, vec!["0 0 1000", "2 0 500"]);
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn build_is_idempotent(values: Vec<i16>) -> bool {
        let depth = DMatrix::from_fn(1, values.len(), |_, c| Float::from(values[c]) * 2.0);
        let cloud_1 = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
        let cloud_2 = build_point_cloud(&depth, &intrinsics_500(), &wide_range()).unwrap();
        // NaN != NaN, so compare bit patterns.
        let bits = |cloud: &PointCloud| -> Vec<[u32; 3]> {
            cloud
                .points()
                .iter()
                .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
                .collect()
        };
        bits(&cloud_1) == bits(&cloud_2)
    }

    #[quickcheck_macros::quickcheck]
    fn accepted_iff_in_range(values: Vec<i16>) -> bool {
        let nb_cols = values.len();
        let depth = DMatrix::from_fn(3, nb_cols, |r, c| Float::from(values[c]) * (1 + r) as Float);
        let (fx, fy, cx, cy) = (480.0, 520.0, 3.5, -2.25);
        let intrinsics = Intrinsics::new(fx, fy, cx, cy);
        let range = wide_range();
        let cloud = build_point_cloud(&depth, &intrinsics, &range).unwrap();
        (0..3).all(|r| {
            (0..nb_cols).all(|c| {
                let d = depth[(r, c)];
                let p = cloud.points()[cloud.index(r, c)];
                if range.accepts(d) {
                    p.x == (c as Float - cx) * d / fx && p.y == (r as Float - cy) * d / fy && p.z == d
                } else {
                    !is_valid(&p)
                }
            })
        })
    }
}
