// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous modules that didn't fit elsewhere.

pub mod colormap;
pub mod export;
pub mod helper;
pub mod interop;
pub mod type_aliases;
pub mod view;
