// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Colormaps used to visualize disparity and depth maps.

use crate::misc::type_aliases::Float;

/// Samples of the inferno colormap at 0, 1/8, 2/8, ..., 1.
const INFERNO_KEYS: [(u8, u8, u8); 9] = [
    (0, 0, 4),
    (31, 12, 72),
    (85, 15, 109),
    (136, 34, 106),
    (186, 54, 85),
    (227, 89, 51),
    (249, 140, 10),
    (249, 201, 50),
    (252, 255, 164),
];

/// Inferno colormap with 256 entries, from black to pale yellow.
pub fn inferno_u8() -> Vec<(u8, u8, u8)> {
    (0..256).map(|i| interpolate(&INFERNO_KEYS, i as Float / 255.0)).collect()
}

/// Linear interpolation between regularly spaced color keys, `t` in [0, 1].
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_precision_loss)]
fn interpolate(keys: &[(u8, u8, u8)], t: Float) -> (u8, u8, u8) {
    let last = keys.len() - 1;
    let position = t.max(0.0).min(1.0) * last as Float;
    let idx = (position.floor() as usize).min(last - 1);
    let alpha = position - idx as Float;
    let mix = |a: u8, b: u8| ((1.0 - alpha) * Float::from(a) + alpha * Float::from(b)).round() as u8;
    let (a, b) = (keys[idx], keys[idx + 1]);
    (mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
