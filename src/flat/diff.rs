use crate::{
    flat::raster::FlatImage,
    foundation::error::{DeepError, DeepResult},
};

/// Per-channel difference between two flat images.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct DiffReport {
    /// Largest absolute channel difference.
    pub max_abs: f32,
    /// Root mean square over every channel of every pixel.
    pub rms: f64,
    /// Pixels where any channel differs.
    pub differing_pixels: usize,
    /// Pixels compared.
    pub pixel_count: usize,
}

impl DiffReport {
    /// `true` when some channel differs by more than `tolerance`.
    pub fn differs(&self, tolerance: f32) -> bool {
        self.max_abs > tolerance
    }

    /// `true` when every channel is bit-for-bit equal in value.
    pub fn is_identical(&self) -> bool {
        self.differing_pixels == 0
    }
}

/// Compare two flat images of equal size.
///
/// A NaN on either side counts as an infinite difference.
pub fn diff_flat_images(a: &FlatImage, b: &FlatImage) -> DeepResult<DiffReport> {
    if (a.width(), a.height()) != (b.width(), b.height()) {
        return Err(DeepError::validation(format!(
            "cannot diff {}x{} against {}x{}",
            a.width(),
            a.height(),
            b.width(),
            b.height()
        )));
    }

    let mut max_abs = 0.0f32;
    let mut sum_sq = 0.0f64;
    let mut differing_pixels = 0usize;
    for (pa, pb) in a.pixels().iter().zip(b.pixels()) {
        let mut differs = false;
        for (&ca, &cb) in pa.iter().zip(pb) {
            let d = (ca - cb).abs();
            let d = if d.is_nan() { f32::INFINITY } else { d };
            if d > 0.0 {
                differs = true;
            }
            max_abs = max_abs.max(d);
            sum_sq += f64::from(d) * f64::from(d);
        }
        differing_pixels += usize::from(differs);
    }

    let pixel_count = a.pixels().len();
    let rms = if pixel_count == 0 {
        0.0
    } else {
        (sum_sq / (pixel_count * 4) as f64).sqrt()
    };
    Ok(DiffReport {
        max_abs,
        rms,
        differing_pixels,
        pixel_count,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/flat/diff.rs"]
mod tests;
