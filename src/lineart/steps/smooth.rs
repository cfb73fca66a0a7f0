use crate::error::LineArtError;
use image::GrayImage;

/// Bilateral window diameter in pixels
pub const WINDOW_DIAMETER: u32 = 9;

/// Apply `passes` rounds of bilateral filtering, each feeding the next.
/// Zero passes returns the image unchanged.
pub fn apply(image: GrayImage, passes: u32, sigma: f32) -> Result<GrayImage, LineArtError> {
    if passes == 0 {
        return Ok(image);
    }

    let filter = BilateralFilter::new(WINDOW_DIAMETER / 2, sigma, sigma);
    let mut smoothed = image;
    for _ in 0..passes {
        smoothed = filter.apply(&smoothed)?;
    }
    Ok(smoothed)
}

/// Edge-preserving filter: neighbours are weighted by spatial distance and
/// by intensity similarity to the centre pixel.
struct BilateralFilter {
    radius: u32,
    /// (dx, dy, spatial weight) for every offset inside the circular window
    offsets: Vec<(i32, i32, f32)>,
    /// Range weight indexed by absolute intensity difference
    range_weights: [f32; 256],
}

impl BilateralFilter {
    fn new(radius: u32, sigma_color: f32, sigma_space: f32) -> Self {
        let r = radius as i32;
        let space_coeff = -0.5 / (sigma_space * sigma_space);
        let color_coeff = -0.5 / (sigma_color * sigma_color);

        let mut offsets = Vec::new();
        for dy in -r..=r {
            for dx in -r..=r {
                let dist_sq = (dx * dx + dy * dy) as f32;
                if dist_sq > (r * r) as f32 {
                    continue;
                }
                offsets.push((dx, dy, (dist_sq * space_coeff).exp()));
            }
        }

        let mut range_weights = [0.0f32; 256];
        for (diff, weight) in range_weights.iter_mut().enumerate() {
            let d = diff as f32;
            *weight = (d * d * color_coeff).exp();
        }

        Self {
            radius,
            offsets,
            range_weights,
        }
    }

    fn apply(&self, image: &GrayImage) -> Result<GrayImage, LineArtError> {
        let (width, height) = image.dimensions();
        let src = image.as_raw();
        let w = width as usize;
        let r = self.radius as i64;

        // Padded coordinate -> source coordinate, reflecting at the borders
        let columns = reflect_table(width, self.radius);
        let rows = reflect_table(height, self.radius);

        let mut out = Vec::with_capacity(src.len());
        for y in 0..height as i64 {
            for x in 0..width as i64 {
                let center = src[y as usize * w + x as usize];
                let mut sum = 0.0f32;
                let mut weight_sum = 0.0f32;

                for &(dx, dy, spatial) in &self.offsets {
                    let sy = rows[(y + r + i64::from(dy)) as usize];
                    let sx = columns[(x + r + i64::from(dx)) as usize];
                    let value = src[sy * w + sx];
                    let weight = spatial * self.range_weights[value.abs_diff(center) as usize];
                    sum += weight * f32::from(value);
                    weight_sum += weight;
                }

                // The centre offset always contributes weight 1
                out.push((sum / weight_sum).round().clamp(0.0, 255.0) as u8);
            }
        }

        GrayImage::from_raw(width, height, out).ok_or_else(|| {
            LineArtError::ProcessingFailure(format!(
                "bilateral filter produced a buffer that does not fit {}x{}",
                width, height
            ))
        })
    }
}

/// Index table for `len + 2 * pad` padded positions, mirrored at both ends
/// without repeating the edge sample (`dcb|abcd|cba`).
fn reflect_table(len: u32, pad: u32) -> Vec<usize> {
    let n = i64::from(len);
    let pad = i64::from(pad);
    (-pad..n + pad)
        .map(|i| reflect_101(i, n) as usize)
        .collect()
}

fn reflect_101(mut i: i64, n: i64) -> i64 {
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Deterministic noise around mid-gray
    fn noisy_fixture(width: u32, height: u32) -> GrayImage {
        let mut state: u32 = 0x2545_f491;
        GrayImage::from_fn(width, height, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            Luma([(88 + state % 81) as u8])
        })
    }

    fn total_variation(img: &GrayImage) -> u64 {
        let (width, height) = img.dimensions();
        let mut tv = 0u64;
        for y in 0..height {
            for x in 0..width {
                let p = img.get_pixel(x, y).0[0];
                if x + 1 < width {
                    tv += u64::from(p.abs_diff(img.get_pixel(x + 1, y).0[0]));
                }
                if y + 1 < height {
                    tv += u64::from(p.abs_diff(img.get_pixel(x, y + 1).0[0]));
                }
            }
        }
        tv
    }

    #[test]
    fn test_zero_passes_is_identity() {
        let img = noisy_fixture(16, 16);
        let result = apply(img.clone(), 0, 50.0).unwrap();
        assert_eq!(result, img);
    }

    #[test]
    fn test_uniform_image_unchanged() {
        let img = GrayImage::from_pixel(20, 12, Luma([131]));
        let result = apply(img.clone(), 3, 125.0).unwrap();
        assert_eq!(result, img);
    }

    #[test]
    fn test_more_passes_never_add_noise() {
        let img = noisy_fixture(48, 48);
        let variations: Vec<u64> = (0..=3)
            .map(|passes| {
                let sigma = 50.0 + passes as f32 * 25.0;
                total_variation(&apply(img.clone(), passes, sigma).unwrap())
            })
            .collect();

        for pair in variations.windows(2) {
            assert!(
                pair[1] <= pair[0],
                "total variation increased: {:?}",
                variations
            );
        }
        assert!(variations[1] < variations[0]);
    }

    #[test]
    fn test_strong_edge_survives_smoothing() {
        let img = GrayImage::from_fn(30, 10, |x, _| if x < 15 { Luma([20]) } else { Luma([230]) });
        let result = apply(img, 1, 75.0).unwrap();

        let left = result.get_pixel(14, 5).0[0];
        let right = result.get_pixel(15, 5).0[0];
        assert!(left < 128, "left of edge washed out: {}", left);
        assert!(right > 128, "right of edge washed out: {}", right);
    }

    #[test]
    fn test_reflect_101_mirrors_without_edge_repeat() {
        assert_eq!(reflect_table(4, 2), vec![2, 1, 0, 1, 2, 3, 2, 1]);
        assert_eq!(reflect_table(1, 2), vec![0; 5]);
        // Narrower than the window still stays in bounds
        assert!(reflect_table(2, 4).iter().all(|&i| i < 2));
    }

    #[test]
    fn test_tiny_image_is_filtered() {
        let img = GrayImage::from_fn(2, 3, |x, y| Luma([(x * 50 + y * 10) as u8]));
        let result = apply(img, 2, 100.0).unwrap();
        assert_eq!(result.dimensions(), (2, 3));
    }
}
