use crate::error::LineArtError;
use serde::{Deserialize, Serialize};

const MAX_BLUR_PASSES: i64 = 3;
const MIN_BLOCK_SIZE: i64 = 11;
const MAX_BLOCK_SIZE: i64 = 31;
const MIN_C_CONSTANT: i64 = 2;
const MAX_C_CONSTANT: i64 = 15;
const MIN_KERNEL_SIZE: i64 = 2;
const MAX_KERNEL_SIZE: i64 = 3;

/// User-facing conversion knobs.
///
/// Values outside the documented ranges are accepted.
/// [`ConversionParameters::resolve`] derives the stage constants from the raw
/// values and clamps the constants, not the knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionParameters {
    /// Line sensitivity, 0-255
    pub threshold: i64,
    /// Smoothing strength, 0-3
    pub blur_passes: i64,
    /// Line thickness class, 0-2
    pub thickness: i64,
    /// Cap on the longest side of the working image
    #[serde(rename = "max_dim")]
    pub max_dimension: i64,
}

impl Default for ConversionParameters {
    fn default() -> Self {
        Self {
            threshold: 50,
            blur_passes: 1,
            thickness: 1,
            max_dimension: 1200,
        }
    }
}

/// How the morphological cleaner finishes its output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanMode {
    /// Opening and closing only
    Standard,
    /// Opening and closing, then keep only lines confirmed by Canny edges
    ThinEdgeBlend,
}

/// Internal constants derived from [`ConversionParameters`], already clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedParameters {
    pub max_dimension: u32,
    pub blur_passes: u32,
    pub sigma: f32,
    pub block_size: u32,
    pub c_constant: i32,
    pub kernel_size: u32,
    pub clean_mode: CleanMode,
}

impl ConversionParameters {
    /// Derive the constants used by the pipeline stages, clamped into the
    /// ranges the stages accept.
    pub fn resolve(&self) -> Result<ResolvedParameters, LineArtError> {
        if self.max_dimension <= 0 {
            return Err(LineArtError::InvalidInput(format!(
                "max_dim must be positive, got {}",
                self.max_dimension
            )));
        }
        let max_dimension = u32::try_from(self.max_dimension).unwrap_or(u32::MAX);

        let blur_passes = self.blur_passes.clamp(0, MAX_BLUR_PASSES) as u32;

        Ok(ResolvedParameters {
            max_dimension,
            blur_passes,
            sigma: 50.0 + blur_passes as f32 * 25.0,
            block_size: block_size(self.threshold),
            c_constant: c_constant(self.threshold),
            kernel_size: kernel_size(self.thickness),
            clean_mode: if self.thickness == 0 {
                CleanMode::ThinEdgeBlend
            } else {
                CleanMode::Standard
            },
        })
    }
}

/// Local window for adaptive thresholding; always odd.
/// Division floors, so negative thresholds round towards larger windows.
fn block_size(threshold: i64) -> u32 {
    let size = 25i64
        .saturating_sub(threshold.div_euclid(20))
        .clamp(MIN_BLOCK_SIZE, MAX_BLOCK_SIZE) as u32;
    if size % 2 == 0 {
        size + 1
    } else {
        size
    }
}

fn c_constant(threshold: i64) -> i32 {
    threshold
        .div_euclid(20)
        .clamp(MIN_C_CONSTANT, MAX_C_CONSTANT) as i32
}

fn kernel_size(thickness: i64) -> u32 {
    thickness
        .saturating_add(1)
        .clamp(MIN_KERNEL_SIZE, MAX_KERNEL_SIZE) as u32
}
