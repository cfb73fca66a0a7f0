use crate::error::LineArtError;
use image::{
    DynamicImage, GenericImageView, GrayImage, ImageDecoder, ImageError, ImageFormat, ImageReader,
};
use std::io::Cursor;

/// Input formats the decoder recognises
pub const SUPPORTED_FORMATS: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/bmp",
    "image/webp",
    "image/tiff",
];

/// Decode an encoded raster image, upright according to its EXIF
/// orientation. Anything that does not decode into an image with pixels is
/// the caller's fault.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, LineArtError> {
    if bytes.is_empty() {
        return Err(LineArtError::InvalidInput("image data is empty".to_string()));
    }

    let mut decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| LineArtError::InvalidInput(format!("Failed to read image: {}", e)))?
        .into_decoder()
        .map_err(decode_error)?;
    let orientation = decoder.orientation().map_err(decode_error)?;

    let mut image = DynamicImage::from_decoder(decoder).map_err(decode_error)?;
    image.apply_orientation(orientation);

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(LineArtError::InvalidInput(format!(
            "decoded image has no pixels ({}x{})",
            width, height
        )));
    }

    tracing::debug!(width, height, color = ?image.color(), ?orientation, "Decoded input image");
    Ok(image)
}

fn decode_error(e: ImageError) -> LineArtError {
    LineArtError::InvalidInput(format!("Failed to decode image: {}", e))
}

/// Encode a single-channel image as PNG
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>, LineArtError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| LineArtError::ProcessingFailure(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}
