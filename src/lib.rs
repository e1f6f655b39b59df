// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! # Stereo Depth
//!
//! Depth maps and point clouds from the disparities of a rectified stereo pair.
//!
//! The core ([`core::depth`], [`core::point_cloud`]) is stateless:
//! one disparity map in, one depth map and one organized point cloud out.
//! Normalization of the raw matcher output, configuration,
//! recorded sequences and image exports are layered around it.

pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod misc;
pub mod parallel;

pub use crate::error::{Error, Result};
