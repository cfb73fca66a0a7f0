use crate::error::LineArtError;
use image::{GrayImage, Luma, RgbImage};

// BT.601 luma weights in 14-bit fixed point; they sum to 1 << 14
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Convert an RGB image to single-channel luminance
pub fn apply(image: RgbImage) -> Result<GrayImage, LineArtError> {
    Ok(GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    }))
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted =
        u32::from(r) * R_WEIGHT + u32::from(g) * G_WEIGHT + u32::from(b) * B_WEIGHT;
    ((weighted + (1 << (SHIFT - 1))) >> SHIFT) as u8
}
