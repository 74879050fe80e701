use std::{fs, path::Path};

use jpeg_encoder::{ColorType, Encoder};

use crate::error::IoError;
use crate::image::RgbImage;

/// Read a JPEG image with three channels (rgb8).
///
/// # Arguments
///
/// * `file_path` - The path to the JPEG file.
///
/// # Returns
///
/// An RGB image with three channels (rgb8).
pub fn read_image_jpeg_rgb8(file_path: impl AsRef<Path>) -> Result<RgbImage, IoError> {
    let file_path = file_path.as_ref();
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path.to_path_buf()));
    }

    if file_path.extension().map_or(true, |ext| {
        !ext.eq_ignore_ascii_case("jpg") && !ext.eq_ignore_ascii_case("jpeg")
    }) {
        return Err(IoError::InvalidFileExtension(file_path.to_path_buf()));
    }

    let jpeg_data = fs::read(file_path)?;
    decode_image_jpeg_rgb8(&jpeg_data)
}

/// Decode a JPEG image with three channels (rgb8) from raw bytes.
pub fn decode_image_jpeg_rgb8(src: &[u8]) -> Result<RgbImage, IoError> {
    let mut decoder = zune_jpeg::JpegDecoder::new(src);
    decoder.decode_headers()?;

    let image_info = decoder.info().ok_or_else(|| {
        IoError::JpegDecodingError(zune_jpeg::errors::DecodeErrors::Format(String::from(
            "Failed to find image info from its metadata",
        )))
    })?;

    let img_data = decoder.decode()?;

    RgbImage::new(image_info.width as usize, image_info.height as usize, img_data)
}

/// Writes the given JPEG (rgb8) data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the JPEG image.
/// - `image` - The image to encode.
/// - `quality` - The quality of the JPEG encoding, from 0 (lowest) to 100 (highest).
pub fn write_image_jpeg_rgb8(
    file_path: impl AsRef<Path>,
    image: &RgbImage,
    quality: u8,
) -> Result<(), IoError> {
    let encoder = Encoder::new_file(file_path, quality)?;
    encoder.encode(
        image.as_slice(),
        image.width() as u16,
        image.height() as u16,
        ColorType::Rgb,
    )?;
    Ok(())
}
