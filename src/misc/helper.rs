// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Miscellaneous helper functions that didn't fit elsewhere.

use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use nalgebra::DMatrix;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
};

use crate::error::{Error, Result};

/// Read a 16 bit gray png image from a file.
pub fn read_png_16bits<P: AsRef<Path>>(file_path: P) -> Result<(usize, usize, Vec<u16>)> {
    read_png_16bits_buf(BufReader::new(File::open(file_path)?))
}

/// Read a 16 bit gray png image from any reader.
pub fn read_png_16bits_buf<R: Read>(r: R) -> Result<(usize, usize, Vec<u16>)> {
    let mut decoder = png::Decoder::new(r);
    // Use the IDENTITY transformation because by default
    // it will use STRIP_16 which only keep 8 bits.
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info()?;
    let mut buffer = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buffer)?;
    if info.bit_depth != png::BitDepth::Sixteen || info.color_type != png::ColorType::Grayscale {
        return Err(Error::InvalidParameters(format!(
            "expected a 16 bits gray png, got {:?} {:?}",
            info.color_type, info.bit_depth
        )));
    }
    buffer.truncate(info.buffer_size());

    // Transform buffer into 16 bits slice.
    // PNG samples are stored in big endian.
    let mut buffer_u16 = vec![0; (info.width * info.height) as usize];
    let mut buffer_cursor = Cursor::new(buffer);
    buffer_cursor.read_u16_into::<BigEndian>(&mut buffer_u16)?;

    Ok((info.width as usize, info.height as usize, buffer_u16))
}

/// Read a 16 bit gray png image into a matrix.
pub fn read_png_16bits_matrix<P: AsRef<Path>>(file_path: P) -> Result<DMatrix<u16>> {
    let (width, height, buffer_u16) = read_png_16bits(file_path)?;
    Ok(DMatrix::from_row_slice(height, width, &buffer_u16))
}

/// Write a matrix as a 16 bit gray png image into a file.
pub fn write_png_16bits<P: AsRef<Path>>(file_path: P, mat: &DMatrix<u16>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(file_path)?);
    write_png_16bits_buf(&mut writer, mat)?;
    writer.flush()?;
    Ok(())
}

/// Write a matrix as a 16 bit gray png image into any writer.
#[allow(clippy::cast_possible_truncation)]
pub fn write_png_16bits_buf<W: Write>(w: W, mat: &DMatrix<u16>) -> Result<()> {
    let (nb_rows, nb_cols) = mat.shape();
    let mut encoder = png::Encoder::new(w, nb_cols as u32, nb_rows as u32);
    encoder.set_color(png::ColorType::Grayscale);
    encoder.set_depth(png::BitDepth::Sixteen);
    let mut writer = encoder.write_header()?;

    // The matrix is column major, png rows are row major.
    let row_major: Vec<u16> = mat.transpose().as_slice().to_vec();
    let mut bytes = vec![0; 2 * row_major.len()];
    BigEndian::write_u16_into(&row_major, &mut bytes);
    writer.write_image_data(&bytes)?;
    writer.finish()?;
    Ok(())
}

/// Compute the quotient and remainder of x/y both at the same time.
pub fn div_rem<T>(x: T, y: T) -> (T, T)
where
    T: std::ops::Div<Output = T> + std::ops::Rem<Output = T> + Copy,
{
    (x / y, x % y)
}

// TESTS #############################################################
