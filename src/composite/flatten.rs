use rayon::prelude::*;

use crate::{
    deep::sample::Sample,
    deep::store::DeepImage,
    flat::raster::FlatImage,
    foundation::error::{DeepError, DeepResult},
};

/// Controls for deep-to-flat compositing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompositeOptions {
    /// Stop walking a pixel's samples once transmittance drops below this.
    pub transmittance_threshold: f32,
    /// Composite rows on a rayon thread pool.
    pub parallel: bool,
    /// Optional explicit worker thread count (parallel mode only).
    pub threads: Option<usize>,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            transmittance_threshold: 1e-6,
            parallel: false,
            threads: None,
        }
    }
}

/// Flatten a deep image with default options (serial).
pub fn composite(image: &DeepImage) -> FlatImage {
    flatten_serial(image, CompositeOptions::default().transmittance_threshold)
}

/// Flatten a deep image.
///
/// Serial and parallel runs produce bit-identical output: every pixel goes
/// through [`composite_pixel`] and rows never interact.
#[tracing::instrument(skip(image, opts), fields(width = image.width(), height = image.height()))]
pub fn composite_with(image: &DeepImage, opts: &CompositeOptions) -> DeepResult<FlatImage> {
    let threshold = opts.transmittance_threshold;
    if !threshold.is_finite() || !(0.0..1.0).contains(&threshold) {
        return Err(DeepError::validation(format!(
            "transmittance threshold must be in [0, 1), got {threshold}"
        )));
    }

    if !opts.parallel {
        if opts.threads.is_some() {
            tracing::debug!("threads is ignored when compositing serially");
        }
        return Ok(flatten_serial(image, threshold));
    }

    let pool = build_thread_pool(opts.threads)?;
    let mut pixels = vec![[0.0f32; 4]; image.pixel_count()];
    pool.install(|| {
        pixels
            .par_chunks_mut(image.width() as usize)
            .enumerate()
            .for_each(|(y, row)| flatten_row(image, y as u32, row, threshold));
    });
    Ok(FlatImage::from_pixels(image.width(), image.height(), pixels))
}

/// Front-to-back "over" accumulation of one pixel's depth-ordered samples.
///
/// Returns straight RGB accumulated with transmittance weighting plus
/// `alpha = 1 - T`. An empty list yields transparent black.
pub fn composite_pixel(samples: &[Sample], threshold: f32) -> [f32; 4] {
    let mut rgb = [0.0f32; 3];
    let mut transmittance = 1.0f32;
    for s in samples {
        let weight = transmittance * s.alpha;
        for (out, c) in rgb.iter_mut().zip(s.color) {
            *out += weight * c;
        }
        transmittance *= 1.0 - s.alpha;
        if transmittance < threshold {
            break;
        }
    }
    [rgb[0], rgb[1], rgb[2], 1.0 - transmittance]
}

fn flatten_serial(image: &DeepImage, threshold: f32) -> FlatImage {
    let mut pixels = vec![[0.0f32; 4]; image.pixel_count()];
    for (y, row) in pixels.chunks_mut(image.width() as usize).enumerate() {
        flatten_row(image, y as u32, row, threshold);
    }
    FlatImage::from_pixels(image.width(), image.height(), pixels)
}

fn flatten_row(image: &DeepImage, y: u32, row: &mut [[f32; 4]], threshold: f32) {
    for (x, samples) in image.window_row(y) {
        row[x as usize] = composite_pixel(samples, threshold);
    }
}

fn build_thread_pool(threads: Option<usize>) -> DeepResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(DeepError::validation(
            "composite threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| DeepError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/composite/flatten.rs"]
mod tests;
