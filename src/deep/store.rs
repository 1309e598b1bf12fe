use std::ops::Range;

use crate::{
    deep::sample::{ChannelSet, Sample},
    foundation::error::{DeepError, DeepResult},
};

/// Half-open rectangle `[x0, x1) x [y0, y1)` where samples may exist.
///
/// Deserialization goes through [`DataWindow::new`], so inverted windows are
/// rejected there too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "DataWindowDef")]
pub struct DataWindow {
    /// First column.
    pub x0: u32,
    /// First row.
    pub y0: u32,
    /// One past the last column.
    pub x1: u32,
    /// One past the last row.
    pub y1: u32,
}

#[derive(serde::Deserialize)]
struct DataWindowDef {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl TryFrom<DataWindowDef> for DataWindow {
    type Error = DeepError;

    fn try_from(def: DataWindowDef) -> Result<Self, Self::Error> {
        Self::new(def.x0, def.y0, def.x1, def.y1)
    }
}

impl DataWindow {
    /// Build a window; `x0 <= x1` and `y0 <= y1` are required.
    pub fn new(x0: u32, y0: u32, x1: u32, y1: u32) -> DeepResult<Self> {
        let window = Self { x0, y0, x1, y1 };
        if window.is_inverted() {
            return Err(DeepError::validation(format!(
                "data window [{x0}, {x1}) x [{y0}, {y1}) has negative extent"
            )));
        }
        Ok(window)
    }

    /// Window covering a whole `width x height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
        }
    }

    /// Window width in pixels.
    pub fn width(self) -> u32 {
        self.x1 - self.x0
    }

    /// Window height in pixels.
    pub fn height(self) -> u32 {
        self.y1 - self.y0
    }

    /// Number of pixels inside the window.
    pub fn area(self) -> usize {
        (self.width() as usize).saturating_mul(self.height() as usize)
    }

    /// `true` when the window holds no pixels.
    pub fn is_empty(self) -> bool {
        self.area() == 0
    }

    /// `true` when `(x, y)` lies inside the window.
    pub fn contains(self, x: u32, y: u32) -> bool {
        (self.x0..self.x1).contains(&x) && (self.y0..self.y1).contains(&y)
    }

    /// `true` when the window lies inside a `width x height` image.
    pub fn fits(self, width: u32, height: u32) -> bool {
        self.x1 <= width && self.y1 <= height
    }

    fn is_inverted(self) -> bool {
        self.x0 > self.x1 || self.y0 > self.y1
    }

    /// Row-major index of `(x, y)` inside the window. Caller checks `contains`.
    pub(crate) fn index_of(self, x: u32, y: u32) -> usize {
        (y - self.y0) as usize * self.width() as usize + (x - self.x0) as usize
    }
}

/// How [`DeepSampleStore`] handles depths that arrive out of order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertMode {
    /// Insert at the depth-sorted position (after equal depths).
    #[default]
    Sorted,
    /// Reject a depth smaller than the last one stored at the pixel.
    Strict,
}

#[derive(Clone, Debug, Default)]
struct PixelSamples {
    samples: Vec<Sample>,
    aovs: Vec<f32>,
}

/// Mutable builder for a [`DeepImage`].
///
/// Samples are kept per pixel in depth order as they are added; [`Self::finish`]
/// packs them into the immutable image.
#[derive(Clone, Debug)]
pub struct DeepSampleStore {
    width: u32,
    height: u32,
    data_window: DataWindow,
    channels: ChannelSet,
    mode: InsertMode,
    pixels: Vec<PixelSamples>,
}

impl DeepSampleStore {
    /// Create an empty store covering a full `width x height` data window.
    pub fn new(width: u32, height: u32, channels: ChannelSet) -> DeepResult<Self> {
        Self::new_windowed(width, height, DataWindow::full(width, height), channels)
    }

    /// Create an empty store whose samples are restricted to `window`.
    ///
    /// Storage is sized by the window, not by the image.
    pub fn new_windowed(
        width: u32,
        height: u32,
        window: DataWindow,
        channels: ChannelSet,
    ) -> DeepResult<Self> {
        if width == 0 || height == 0 {
            return Err(DeepError::validation(format!(
                "deep image dimensions must be >= 1, got {width}x{height}"
            )));
        }
        check_window(window, width, height)?;
        Ok(Self {
            width,
            height,
            data_window: window,
            channels,
            mode: InsertMode::default(),
            pixels: vec![PixelSamples::default(); window.area()],
        })
    }

    /// Restrict samples to `window`. Drops anything added so far.
    pub fn with_data_window(mut self, window: DataWindow) -> DeepResult<Self> {
        check_window(window, self.width, self.height)?;
        self.data_window = window;
        self.pixels = vec![PixelSamples::default(); window.area()];
        Ok(self)
    }

    /// Select how out-of-order depths are handled.
    pub fn with_insert_mode(mut self, mode: InsertMode) -> Self {
        self.mode = mode;
        self
    }

    /// Channel set shared by every pixel.
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Add a sample to pixel `(x, y)`.
    ///
    /// Only valid when the channel set declares no AOVs; use
    /// [`Self::add_sample_with_aovs`] otherwise.
    pub fn add_sample(
        &mut self,
        x: u32,
        y: u32,
        depth: f32,
        color: [f32; 3],
        alpha: f32,
    ) -> DeepResult<()> {
        self.add_sample_with_aovs(x, y, Sample::new(depth, color, alpha), &[])
    }

    /// Add a sample together with its AOV values (channel declaration order).
    pub fn add_sample_with_aovs(
        &mut self,
        x: u32,
        y: u32,
        sample: Sample,
        aovs: &[f32],
    ) -> DeepResult<()> {
        let idx = self.slot(x, y)?;
        if aovs.len() != self.channels.aov_count() {
            let roles = self.channels.len() - self.channels.aov_count();
            return Err(DeepError::ChannelMismatch {
                declared: self.channels.len(),
                actual: roles + aovs.len(),
            });
        }
        sample.validate(x, y)?;

        let stride = aovs.len();
        let pixel = &mut self.pixels[idx];
        let pos = match (self.mode, pixel.samples.last()) {
            (InsertMode::Strict, Some(last)) if sample.depth < last.depth => {
                return Err(DeepError::Ordering {
                    x,
                    y,
                    depth: sample.depth,
                    previous: last.depth,
                });
            }
            (InsertMode::Strict, _) => pixel.samples.len(),
            (InsertMode::Sorted, _) => pixel
                .samples
                .partition_point(|s| s.depth <= sample.depth),
        };

        pixel.samples.insert(pos, sample);
        let at = pos * stride;
        pixel.aovs.splice(at..at, aovs.iter().copied());
        Ok(())
    }

    /// Pack the per-pixel lists into an immutable [`DeepImage`].
    pub fn finish(self) -> DeepImage {
        let total: usize = self.pixels.iter().map(|p| p.samples.len()).sum();
        let mut offsets = Vec::with_capacity(self.pixels.len() + 1);
        let mut samples = Vec::with_capacity(total);
        let mut aovs = Vec::with_capacity(total * self.channels.aov_count());

        offsets.push(0);
        for pixel in self.pixels {
            samples.extend(pixel.samples);
            aovs.extend(pixel.aovs);
            offsets.push(samples.len());
        }

        DeepImage {
            width: self.width,
            height: self.height,
            data_window: self.data_window,
            channels: self.channels,
            offsets,
            samples,
            aovs,
        }
    }

    fn slot(&self, x: u32, y: u32) -> DeepResult<usize> {
        let out_of_range = |context| DeepError::OutOfRange {
            x: i64::from(x),
            y: i64::from(y),
            width: self.width,
            height: self.height,
            context,
        };
        if x >= self.width || y >= self.height {
            return Err(out_of_range("image bounds"));
        }
        if !self.data_window.contains(x, y) {
            return Err(out_of_range("outside data window"));
        }
        Ok(self.data_window.index_of(x, y))
    }
}

fn check_window(window: DataWindow, width: u32, height: u32) -> DeepResult<()> {
    if window.is_inverted() {
        return Err(DeepError::validation(format!(
            "data window [{}, {}) x [{}, {}) has negative extent",
            window.x0, window.x1, window.y0, window.y1
        )));
    }
    if !window.fits(width, height) {
        return Err(DeepError::OutOfRange {
            x: i64::from(window.x1),
            y: i64::from(window.y1),
            width,
            height,
            context: "data window extends past image bounds",
        });
    }
    Ok(())
}

/// Immutable deep image: depth-ordered samples per pixel.
///
/// Samples are packed in one buffer indexed by a cumulative offset table over
/// the data window (row-major, top row first).
#[derive(Clone, Debug, PartialEq)]
pub struct DeepImage {
    width: u32,
    height: u32,
    data_window: DataWindow,
    channels: ChannelSet,
    offsets: Vec<usize>,
    samples: Vec<Sample>,
    aovs: Vec<f32>,
}

impl DeepImage {
    /// Image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Region that may hold samples.
    pub fn data_window(&self) -> DataWindow {
        self.data_window
    }

    /// Channel set shared by every pixel.
    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    /// Number of pixels (`width * height`), holes included.
    pub fn pixel_count(&self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Total number of samples in the image.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of pixels with at least one sample.
    pub fn non_empty_pixel_count(&self) -> usize {
        self.offsets.windows(2).filter(|w| w[1] > w[0]).count()
    }

    /// Largest per-pixel sample count.
    pub fn max_samples_per_pixel(&self) -> usize {
        self.offsets
            .windows(2)
            .map(|w| w[1] - w[0])
            .max()
            .unwrap_or(0)
    }

    /// Depth-ordered samples at `(x, y)`; empty for pixels outside the data window.
    pub fn samples_at(&self, x: u32, y: u32) -> DeepResult<&[Sample]> {
        Ok(self
            .range_at(x, y)?
            .map_or(&[][..], |r| &self.samples[r]))
    }

    /// AOV values at `(x, y)`: `aov_count` values per sample, in sample order.
    pub fn aovs_at(&self, x: u32, y: u32) -> DeepResult<&[f32]> {
        let stride = self.channels.aov_count();
        Ok(self
            .range_at(x, y)?
            .map_or(&[][..], |r| &self.aovs[r.start * stride..r.end * stride]))
    }

    /// Iterate the data window row-major, yielding `(x, y, samples, aovs)`.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32, &[Sample], &[f32])> + '_ {
        let dw = self.data_window;
        let stride = self.channels.aov_count();
        (dw.y0..dw.y1)
            .flat_map(move |y| (dw.x0..dw.x1).map(move |x| (x, y)))
            .zip(self.offsets.windows(2))
            .map(move |((x, y), w)| {
                (
                    x,
                    y,
                    &self.samples[w[0]..w[1]],
                    &self.aovs[w[0] * stride..w[1] * stride],
                )
            })
    }

    /// Samples of row `y` inside the data window, left to right, keyed by `x`.
    ///
    /// Yields nothing for rows outside the data window.
    pub(crate) fn window_row(&self, y: u32) -> impl Iterator<Item = (u32, &[Sample])> + '_ {
        let dw = self.data_window;
        let w = dw.width() as usize;
        let offsets: &[usize] = if (dw.y0..dw.y1).contains(&y) {
            let start = (y - dw.y0) as usize * w;
            &self.offsets[start..=start + w]
        } else {
            &[]
        };
        offsets
            .windows(2)
            .enumerate()
            .map(move |(i, o)| (dw.x0 + i as u32, &self.samples[o[0]..o[1]]))
    }

    fn range_at(&self, x: u32, y: u32) -> DeepResult<Option<Range<usize>>> {
        if x >= self.width || y >= self.height {
            return Err(DeepError::OutOfRange {
                x: i64::from(x),
                y: i64::from(y),
                width: self.width,
                height: self.height,
                context: "image bounds",
            });
        }
        if !self.data_window.contains(x, y) {
            return Ok(None);
        }
        let idx = self.data_window.index_of(x, y);
        Ok(Some(self.offsets[idx]..self.offsets[idx + 1]))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/deep/store.rs"]
mod tests;
