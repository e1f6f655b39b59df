// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frame lists of recorded stereo sequences.
//!
//! Each line of a frame list is either a comment starting with `#`,
//! an empty line, or a frame:
//!
//! ```text
//! # timestamp disparity_path [left_image_path]
//! 1305031102175304 disparity/000000.png left/000000.png
//! 1305031102211193 disparity/000001.png
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Timestamp and file paths of a recorded frame.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Frame {
    /// Timestamp of the frame, in the unit of the recording device.
    pub timestamp: u64,
    /// 16 bits PNG of the raw matcher disparities.
    pub disparity_path: PathBuf,
    /// Rectified left color image, used to texture the point cloud.
    pub left_path: Option<PathBuf>,
}

impl Frame {
    /// Resolve relative paths against a base directory.
    pub fn resolve(self, base: &Path) -> Self {
        Self {
            timestamp: self.timestamp,
            disparity_path: base.join(self.disparity_path),
            left_path: self.left_path.map(|p| base.join(p)),
        }
    }
}

/// Read a frame list file, with paths relative to its directory.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<Frame>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let frames = parse::frames(&content)?;
    log::info!("Loaded {} frames from {}", frames.len(), path.display());
    Ok(frames.into_iter().map(|f| f.resolve(base)).collect())
}

/// Parse frame lists.
pub mod parse {
    use super::*;
    use nom::{
        branch::alt,
        bytes::complete::{is_not, tag},
        character::complete::{space0, space1, u64 as timestamp},
        combinator::{all_consuming, map, opt, rest, value},
        sequence::{preceded, terminated, tuple},
        IResult,
    };

    /// Parse the content of a frame list.
    pub fn frames(file_content: &str) -> Result<Vec<Frame>> {
        multi_line(frame_line, file_content)
    }

    fn multi_line<F, T>(line_parser: F, file_content: &str) -> Result<Vec<T>>
    where
        F: Fn(&str) -> IResult<&str, Option<T>>,
    {
        let mut vec_data = Vec::new();
        for (line_nb, line) in file_content.lines().enumerate() {
            match all_consuming(&line_parser)(line.trim_end()) {
                Ok((_, Some(data))) => vec_data.push(data),
                Ok(_) => (),
                Err(_) => {
                    return Err(Error::Parse(format!(
                        "line {}: cannot parse \"{}\"",
                        line_nb + 1,
                        line
                    )))
                }
            }
        }
        Ok(vec_data)
    }

    // nom parsers #############################################################

    // Frame line is either a comment, empty, or a frame.
    fn frame_line(input: &str) -> IResult<&str, Option<Frame>> {
        preceded(
            space0,
            alt((value(None, comment), map(frame, Some), value(None, tag("")))),
        )(input)
    }

    fn comment(input: &str) -> IResult<&str, ()> {
        value((), preceded(tag("#"), rest))(input)
    }

    fn frame(input: &str) -> IResult<&str, Frame> {
        map(
            tuple((
                terminated(timestamp, space1),
                path,
                opt(preceded(space1, path)),
            )),
            |(timestamp, disparity_path, left_path)| Frame {
                timestamp,
                disparity_path,
                left_path,
            },
        )(input)
    }

    fn path(input: &str) -> IResult<&str, PathBuf> {
        map(is_not(" \t\r\n"), PathBuf::from)(input)
    }
} // pub mod parse

// TESTS #############################################################
