use crate::error::LineArtError;
use image::{DynamicImage, GenericImageView, GrayImage};
use std::time::Instant;

use super::params::{ConversionParameters, ResolvedParameters};
use super::steps;

/// Timing information for a single pipeline stage
#[derive(Debug, Clone)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Binary line art produced by [`Pipeline::process`]
#[derive(Debug, Clone)]
pub struct LineArt {
    /// Single-channel image holding only 0 and 255
    pub image: GrayImage,
    pub width: u32,
    pub height: u32,
    /// Total pipeline time in milliseconds
    pub total_time_ms: u64,
    /// Individual stage timings
    pub steps: Vec<StepTiming>,
}

/// The five-stage line art pipeline:
/// resize, grayscale, smooth, binarize, clean.
pub struct Pipeline {
    params: ResolvedParameters,
}

impl Pipeline {
    /// Resolve the parameters once; fails only if they cannot be clamped
    pub fn new(parameters: &ConversionParameters) -> Result<Self, LineArtError> {
        Ok(Self {
            params: parameters.resolve()?,
        })
    }

    /// Run every stage over a decoded image. Any stage failure aborts the
    /// whole conversion.
    pub fn process(&self, image: DynamicImage) -> Result<LineArt, LineArtError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(LineArtError::InvalidInput(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }

        let params = self.params;
        let mut timings = Vec::new();

        // Alpha is dropped; channels are R, G, B from here on
        let color = image.into_rgb8();

        let resized = self.run_step("resize", color, &mut timings, |img| {
            steps::resize::apply(img, params.max_dimension)
        })?;
        let gray = self.run_step("grayscale", resized, &mut timings, steps::grayscale::apply)?;
        let smoothed = self.run_step("smooth", gray, &mut timings, |img| {
            steps::smooth::apply(img, params.blur_passes, params.sigma)
        })?;
        let binary = self.run_step("binarize", &smoothed, &mut timings, |img| {
            steps::binarize::apply(img, params.block_size, params.c_constant)
        })?;
        let cleaned = self.run_step("clean", binary, &mut timings, |img| {
            steps::clean::apply(img, &smoothed, params.kernel_size, params.clean_mode)
        })?;

        let (width, height) = cleaned.dimensions();
        Ok(LineArt {
            image: cleaned,
            width,
            height,
            total_time_ms: start.elapsed().as_millis() as u64,
            steps: timings,
        })
    }

    fn run_step<I, O, F>(
        &self,
        name: &str,
        input: I,
        timings: &mut Vec<StepTiming>,
        step_fn: F,
    ) -> Result<O, LineArtError>
    where
        F: FnOnce(I) -> Result<O, LineArtError>,
    {
        let step_start = Instant::now();
        let result = step_fn(input)?;
        let time_ms = step_start.elapsed().as_millis() as u64;
        tracing::debug!(step = name, time_ms, "Pipeline step finished");
        timings.push(StepTiming {
            name: name.to_string(),
            time_ms,
        });
        Ok(result)
    }
}
