use std::{fmt, path::Path, str::FromStr};

use anyhow::Context;

use crate::foundation::{
    error::{DeepError, DeepResult},
    math::{Fnv1a64, unit_to_u8},
};

/// Flattened image: row-major straight RGBA `f32`, immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct FlatImage {
    width: u32,
    height: u32,
    pixels: Vec<[f32; 4]>,
}

impl FlatImage {
    pub(crate) fn from_pixels(width: u32, height: u32, pixels: Vec<[f32; 4]>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Fully transparent black image.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self::from_pixels(width, height, vec![[0.0; 4]; width as usize * height as usize])
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    /// RGBA at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> DeepResult<[f32; 4]> {
        if x >= self.width || y >= self.height {
            return Err(DeepError::OutOfRange {
                x: i64::from(x),
                y: i64::from(y),
                width: self.width,
                height: self.height,
                context: "flat image bounds",
            });
        }
        Ok(self.pixels[y as usize * self.width as usize + x as usize])
    }

    /// Stable hash of dimensions and exact pixel bits.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u32(self.width);
        h.write_u32(self.height);
        for px in &self.pixels {
            for &v in px {
                h.write_f32(v);
            }
        }
        h.finish()
    }

    fn selected_f32(&self, selection: ChannelSelection) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.pixels.len() * selection.channel_count());
        for px in &self.pixels {
            match selection {
                ChannelSelection::Rgba => out.extend_from_slice(px),
                ChannelSelection::Rgb => out.extend_from_slice(&px[..3]),
                ChannelSelection::Alpha => out.push(px[3]),
            }
        }
        out
    }
}

/// Channels handed to the raster writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelection {
    /// Color and alpha.
    #[default]
    Rgba,
    /// Color only.
    Rgb,
    /// Alpha only, written as a single gray channel.
    Alpha,
}

impl ChannelSelection {
    /// Channels per pixel in the written raster.
    pub fn channel_count(self) -> usize {
        match self {
            Self::Rgba => 4,
            Self::Rgb => 3,
            Self::Alpha => 1,
        }
    }
}

impl FromStr for ChannelSelection {
    type Err = DeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgba" => Ok(Self::Rgba),
            "rgb" => Ok(Self::Rgb),
            "a" | "alpha" => Ok(Self::Alpha),
            other => Err(DeepError::validation(format!(
                "unknown channel selection '{other}' (expected rgba, rgb or a)"
            ))),
        }
    }
}

impl fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rgba => "rgba",
            Self::Rgb => "rgb",
            Self::Alpha => "a",
        })
    }
}

/// Create `path`'s parent directory if needed.
pub fn ensure_parent_dir(path: &Path) -> DeepResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Write `flat` to `path`; the raster format follows the extension.
///
/// OpenEXR receives 32-bit floats (alpha-only is replicated into RGB since
/// the encoder has no single-channel float layout). Every other format gets
/// 8-bit values clamped to `[0, 1]`.
#[tracing::instrument(skip(flat, path), fields(path = %path.as_ref().display()))]
pub fn write_flat_image(
    flat: &FlatImage,
    path: impl AsRef<Path>,
    selection: ChannelSelection,
) -> DeepResult<()> {
    let path = path.as_ref();
    let format = image::ImageFormat::from_path(path).map_err(|e| {
        DeepError::validation(format!(
            "cannot infer raster format from '{}': {e}",
            path.display()
        ))
    })?;
    ensure_parent_dir(path)?;

    let (w, h) = (flat.width, flat.height);
    if format == image::ImageFormat::OpenExr {
        let dynamic = match selection {
            ChannelSelection::Rgba => {
                image::Rgba32FImage::from_raw(w, h, flat.selected_f32(selection))
                    .map(image::DynamicImage::ImageRgba32F)
            }
            ChannelSelection::Rgb => {
                image::Rgb32FImage::from_raw(w, h, flat.selected_f32(selection))
                    .map(image::DynamicImage::ImageRgb32F)
            }
            ChannelSelection::Alpha => {
                let gray: Vec<f32> = flat.pixels.iter().flat_map(|px| [px[3]; 3]).collect();
                image::Rgb32FImage::from_raw(w, h, gray).map(image::DynamicImage::ImageRgb32F)
            }
        }
        .ok_or_else(|| DeepError::validation("flat image buffer does not match its dimensions"))?;
        dynamic
            .save_with_format(path, format)
            .with_context(|| format!("write exr '{}'", path.display()))?;
        return Ok(());
    }

    let color = match selection {
        ChannelSelection::Rgba => image::ColorType::Rgba8,
        ChannelSelection::Rgb => image::ColorType::Rgb8,
        ChannelSelection::Alpha => image::ColorType::L8,
    };
    let bytes: Vec<u8> = flat
        .selected_f32(selection)
        .into_iter()
        .map(unit_to_u8)
        .collect();
    image::save_buffer_with_format(path, &bytes, w, h, color, format)
        .with_context(|| format!("write {format:?} '{}'", path.display()))?;
    Ok(())
}

/// Load any raster the `image` crate understands as a [`FlatImage`].
///
/// Gray images expand to `(l, l, l, 1)`; 8-bit values map to `[0, 1]`.
pub fn read_flat_image(path: impl AsRef<Path>) -> DeepResult<FlatImage> {
    let path = path.as_ref();
    let decoded = image::open(path).with_context(|| format!("read image '{}'", path.display()))?;
    let rgba = decoded.to_rgba32f();
    let (width, height) = rgba.dimensions();
    let pixels = rgba
        .into_raw()
        .chunks_exact(4)
        .map(|c| [c[0], c[1], c[2], c[3]])
        .collect();
    Ok(FlatImage::from_pixels(width, height, pixels))
}

#[cfg(test)]
#[path = "../../tests/unit/flat/raster.rs"]
mod tests;
