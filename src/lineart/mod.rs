//! Photo to line art conversion
//!
//! A fixed pipeline over one decoded image: bounded resize, grayscale,
//! bilateral smoothing, adaptive binarization and morphological cleanup.
//! Everything here is CPU-bound and owns its buffers; callers may run
//! conversions on as many threads as they like.

pub mod codec;
pub mod params;
pub mod pipeline;
pub mod steps;

pub use params::ConversionParameters;
pub use pipeline::{Pipeline, StepTiming};

use crate::error::LineArtError;

/// PNG-encoded conversion result
#[derive(Debug, Clone)]
pub struct EncodedLineArt {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub steps: Vec<StepTiming>,
}

/// Decode `bytes`, run the pipeline and encode the result as PNG
pub fn convert(
    bytes: &[u8],
    parameters: &ConversionParameters,
) -> Result<EncodedLineArt, LineArtError> {
    let pipeline = Pipeline::new(parameters)?;
    let image = codec::decode(bytes)?;
    let line_art = pipeline.process(image)?;
    let png = codec::encode_png(&line_art.image)?;

    tracing::debug!(
        width = line_art.width,
        height = line_art.height,
        pipeline_ms = line_art.total_time_ms,
        png_bytes = png.len(),
        "Line art encoded"
    );

    Ok(EncodedLineArt {
        png,
        width: line_art.width,
        height: line_art.height,
        steps: line_art.steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn photo_bytes(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgb([230, 220, 210])
            } else {
                Rgb([25, 30, 40])
            }
        });
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_convert_round_trip() {
        let bytes = photo_bytes(120, 80, ImageFormat::Png);
        let result = convert(&bytes, &ConversionParameters::default()).unwrap();

        let decoded = image::load_from_memory(&result.png).unwrap();
        assert_eq!(decoded.dimensions(), (result.width, result.height));
        assert_eq!((result.width, result.height), (120, 80));
        let gray = decoded.to_luma8();
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn test_convert_jpeg_is_deterministic() {
        let bytes = photo_bytes(64, 64, ImageFormat::Jpeg);
        let params = ConversionParameters {
            thickness: 0,
            ..Default::default()
        };
        let first = convert(&bytes, &params).unwrap();
        let second = convert(&bytes, &params).unwrap();
        assert_eq!(first.png, second.png);
    }

    #[test]
    fn test_convert_respects_max_dimension() {
        let bytes = photo_bytes(300, 150, ImageFormat::Png);
        let params = ConversionParameters {
            max_dimension: 100,
            ..Default::default()
        };
        let result = convert(&bytes, &params).unwrap();
        assert_eq!((result.width, result.height), (100, 50));
    }

    #[test]
    fn test_undecodable_bytes_are_invalid_input() {
        let jpeg = photo_bytes(64, 64, ImageFormat::Jpeg);
        let truncated = &jpeg[..16];
        for bytes in [&[][..], &b"GIF89a but not really"[..], truncated] {
            let result = convert(bytes, &ConversionParameters::default());
            assert!(matches!(result, Err(LineArtError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_invalid_max_dimension_is_invalid_input() {
        let bytes = photo_bytes(10, 10, ImageFormat::Png);
        let params = ConversionParameters {
            max_dimension: 0,
            ..Default::default()
        };
        assert!(matches!(
            convert(&bytes, &params),
            Err(LineArtError::InvalidInput(_))
        ));
    }
}
