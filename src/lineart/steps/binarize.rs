use crate::error::LineArtError;
use image::{GrayImage, Luma};

/// Adaptive Gaussian thresholding.
///
/// Each pixel is compared against the Gaussian-weighted mean of its
/// `block_size` x `block_size` neighbourhood minus `c`. Pixels brighter than
/// that local threshold become white (255), the rest black (0). Because the
/// cutoff follows the local mean, uneven lighting does not swallow lines.
pub fn apply(image: &GrayImage, block_size: u32, c: i32) -> Result<GrayImage, LineArtError> {
    if block_size % 2 == 0 {
        return Err(LineArtError::ProcessingFailure(format!(
            "adaptive threshold block size must be odd, got {}",
            block_size
        )));
    }

    let mean = gaussian_local_mean(image, block_size)?;

    Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = i32::from(image.get_pixel(x, y).0[0]);
        let local = i32::from(mean.get_pixel(x, y).0[0]);
        if pixel > local - c {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    }))
}

/// Normalized 1-D Gaussian kernel of odd length `size`.
/// Sigma follows the usual default for a given aperture: 0.3 * ((size - 1) / 2 - 1) + 0.8
fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as f64;
    let scale = -0.5 / (sigma * sigma);

    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - half;
            (d * d * scale).exp()
        })
        .collect();
    let total: f64 = raw.iter().sum();
    raw.iter().map(|w| (w / total) as f32).collect()
}

/// Separable Gaussian blur with replicated borders, rounded back to 8 bits.
fn gaussian_local_mean(image: &GrayImage, block_size: u32) -> Result<GrayImage, LineArtError> {
    let (width, height) = image.dimensions();
    let (w, h) = (width as i64, height as i64);
    let kernel = gaussian_kernel(block_size);
    let half = i64::from(block_size / 2);
    let src = image.as_raw();

    let mut horizontal = vec![0.0f32; src.len()];
    for y in 0..h {
        let row = &src[(y * w) as usize..((y + 1) * w) as usize];
        for x in 0..w {
            horizontal[(y * w + x) as usize] = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sx = (x + k as i64 - half).clamp(0, w - 1);
                    weight * f32::from(row[sx as usize])
                })
                .sum();
        }
    }

    let mut out = Vec::with_capacity(src.len());
    for y in 0..h {
        for x in 0..w {
            let value: f32 = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| {
                    let sy = (y + k as i64 - half).clamp(0, h - 1);
                    weight * horizontal[(sy * w + x) as usize]
                })
                .sum();
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }

    GrayImage::from_raw(width, height, out).ok_or_else(|| {
        LineArtError::ProcessingFailure(format!(
            "local mean buffer does not fit {}x{}",
            width, height
        ))
    })
}
