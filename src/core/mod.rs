// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Core functionalities of stereo depth extraction.

pub mod camera;
pub mod depth;
pub mod detection;
pub mod disparity;
pub mod pipeline;
pub mod point_cloud;
