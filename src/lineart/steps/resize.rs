use crate::error::LineArtError;
use image::{ImageBuffer, Pixel, RgbImage};

/// Shrink the image so its longest side fits within `max_dimension`.
/// Images already within bounds are returned untouched.
pub fn apply(image: RgbImage, max_dimension: u32) -> Result<RgbImage, LineArtError> {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = target_dimensions(width, height, max_dimension);

    if (new_width, new_height) == (width, height) {
        return Ok(image);
    }

    area_resize(&image, new_width, new_height)
}

/// Output size for a bounded downscale, preserving aspect ratio up to flooring.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dimension {
        return (width, height);
    }

    // Integer math so the longest side lands exactly on max_dimension
    let scale = |side: u32| {
        let scaled = u64::from(side) * u64::from(max_dimension) / u64::from(longest);
        (scaled as u32).max(1)
    };
    (scale(width), scale(height))
}

/// Area-averaging resize: every output sample is the coverage-weighted mean
/// of the source samples under its footprint.
fn area_resize<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    new_width: u32,
    new_height: u32,
) -> Result<ImageBuffer<P, Vec<u8>>, LineArtError>
where
    P: Pixel<Subpixel = u8>,
{
    let channels = P::CHANNEL_COUNT as usize;
    let (width, height) = image.dimensions();
    let src = image.as_raw();

    let x_taps = area_taps(width, new_width);
    let y_taps = area_taps(height, new_height);

    let src_stride = width as usize * channels;
    let dst_stride = new_width as usize * channels;

    // Horizontal pass into a float buffer of height x new_width
    let mut rows = vec![0.0f32; height as usize * dst_stride];
    for (src_row, dst_row) in src
        .chunks_exact(src_stride)
        .zip(rows.chunks_exact_mut(dst_stride))
    {
        for (dx, taps) in x_taps.iter().enumerate() {
            for &(sx, weight) in taps {
                for c in 0..channels {
                    dst_row[dx * channels + c] += weight * f32::from(src_row[sx * channels + c]);
                }
            }
        }
    }

    // Vertical pass
    let mut out = vec![0u8; new_height as usize * dst_stride];
    for (dst_row, taps) in out.chunks_exact_mut(dst_stride).zip(&y_taps) {
        for (i, sample) in dst_row.iter_mut().enumerate() {
            let acc: f32 = taps
                .iter()
                .map(|&(sy, weight)| weight * rows[sy * dst_stride + i])
                .sum();
            *sample = acc.round().clamp(0.0, 255.0) as u8;
        }
    }

    ImageBuffer::from_raw(new_width, new_height, out).ok_or_else(|| {
        LineArtError::ProcessingFailure(format!(
            "resize produced a buffer that does not fit {}x{}",
            new_width, new_height
        ))
    })
}

/// For each destination index, the source indices it covers and their weights.
/// Weights of one destination index sum to 1.
fn area_taps(src_len: u32, dst_len: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = f64::from(src_len) / f64::from(dst_len);
    let src_end = f64::from(src_len);

    (0..dst_len)
        .map(|d| {
            let start = f64::from(d) * scale;
            let end = (f64::from(d + 1) * scale).min(src_end);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len as usize);

            (first..last)
                .filter_map(|s| {
                    let cover = end.min(s as f64 + 1.0) - start.max(s as f64);
                    (cover > 1e-9).then(|| (s, (cover / (end - start)) as f32))
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_resize_limits_large_image() {
        let img = RgbImage::new(2000, 1000);
        let result = apply(img, 1200).unwrap();
        assert_eq!(result.dimensions(), (1200, 600));
    }

    #[test]
    fn test_resize_passes_small_image_through() {
        let img = RgbImage::from_fn(300, 200, |x, y| Rgb([x as u8, y as u8, 7]));
        let result = apply(img.clone(), 1200).unwrap();
        assert_eq!(result, img);
    }

    #[test]
    fn test_resize_exact_bound_is_untouched() {
        let img = RgbImage::new(1200, 800);
        let result = apply(img, 1200).unwrap();
        assert_eq!(result.dimensions(), (1200, 800));
    }

    #[test]
    fn test_target_dimensions_keep_aspect_ratio() {
        let (w, h) = target_dimensions(4032, 3024, 1000);
        assert_eq!(w, 1000);
        assert_eq!(h, 750);

        let (w, h) = target_dimensions(333, 1000, 100);
        assert_eq!((w, h), (33, 100));
        let expected = 333.0 * 100.0 / 1000.0;
        assert!((w as f64 - expected).abs() <= 1.0);
    }

    #[test]
    fn test_target_dimensions_never_collapse_to_zero() {
        assert_eq!(target_dimensions(5000, 2, 100), (100, 1));
    }

    #[test]
    fn test_area_resize_averages_blocks() {
        // 2x2 checkerboard cells of 0 and 200 average to 100
        let img = RgbImage::from_fn(8, 8, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([0, 0, 0])
            } else {
                Rgb([200, 200, 200])
            }
        });
        let result = apply(img, 4).unwrap();
        assert_eq!(result.dimensions(), (4, 4));
        for pixel in result.pixels() {
            assert_eq!(pixel.0, [100, 100, 100]);
        }
    }

    #[test]
    fn test_area_resize_keeps_flat_color() {
        let img = RgbImage::from_pixel(999, 501, Rgb([12, 128, 240]));
        let result = apply(img, 250).unwrap();
        assert_eq!(result.dimensions(), (250, 125));
        for pixel in result.pixels() {
            assert_eq!(pixel.0, [12, 128, 240]);
        }
    }

    #[test]
    fn test_area_taps_weights_sum_to_one() {
        for (src, dst) in [(10, 3), (2000, 1200), (7, 7), (1001, 10)] {
            for taps in area_taps(src, dst) {
                let total: f32 = taps.iter().map(|&(_, w)| w).sum();
                assert!((total - 1.0).abs() < 1e-4, "{} -> {}: {}", src, dst, total);
            }
        }
    }
}
