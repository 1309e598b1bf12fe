use std::{fmt, path::Path};

use anyhow::Context;

use crate::{
    deep::sample::ChannelSet,
    deep::store::{DataWindow, DeepImage, InsertMode},
    flat::raster::ensure_parent_dir,
    foundation::error::{DeepError, DeepResult},
};

pub(crate) mod bytes;
pub(crate) mod dtex;
pub(crate) mod shw;

use bytes::{ByteReader, ByteWriter};

/// Supported deep containers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeepFormat {
    /// Pixel-interleaved little-endian container (`.dtex`).
    Dtex,
    /// Planar big-endian container with bottom-up rows (`.shw`).
    Shw,
}

impl DeepFormat {
    /// Every supported format.
    pub const ALL: [Self; 2] = [Self::Dtex, Self::Shw];

    /// Canonical file extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Dtex => "dtex",
            Self::Shw => "shw",
        }
    }

    /// Magic bytes at the start of the container.
    pub fn magic(self) -> &'static [u8; 4] {
        match self {
            Self::Dtex => dtex::MAGIC,
            Self::Shw => shw::MAGIC,
        }
    }

    /// Pick a format from a path's extension (case-insensitive).
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?;
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Identify a container by its magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| bytes.starts_with(f.magic()))
    }

    /// Decode `bytes` as this container.
    pub fn decode(self, bytes: &[u8], opts: &DecodeOptions) -> DeepResult<DeepImage> {
        match self {
            Self::Dtex => dtex::decode(bytes, opts),
            Self::Shw => shw::decode(bytes, opts),
        }
    }

    /// Encode `image` as this container.
    pub fn encode(self, image: &DeepImage) -> DeepResult<Vec<u8>> {
        match self {
            Self::Dtex => dtex::encode(image),
            Self::Shw => shw::encode(image),
        }
    }
}

impl fmt::Display for DeepFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Decoder configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// How out-of-order depths in the file are handled.
    pub insert_mode: InsertMode,
    /// Per-pixel sample count above which the file is treated as corrupt.
    pub max_samples_per_pixel: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            insert_mode: InsertMode::Sorted,
            max_samples_per_pixel: 1 << 20,
        }
    }
}

impl DecodeOptions {
    pub(crate) fn check_sample_count(&self, x: u32, y: u32, count: u32) -> DeepResult<()> {
        if count > self.max_samples_per_pixel {
            return Err(DeepError::format(format!(
                "pixel ({x}, {y}) declares {count} samples, limit is {}",
                self.max_samples_per_pixel
            )));
        }
        Ok(())
    }
}

/// Decode a deep container.
///
/// The magic bytes select the reader. `hint` is only used when no magic
/// matches, in which case that reader reports the format error.
#[tracing::instrument(skip(bytes, opts), fields(len = bytes.len()))]
pub fn decode(
    bytes: &[u8],
    hint: Option<DeepFormat>,
    opts: &DecodeOptions,
) -> DeepResult<DeepImage> {
    let format = match (DeepFormat::sniff(bytes), hint) {
        (Some(found), Some(hinted)) if found != hinted => {
            tracing::debug!(%found, %hinted, "magic bytes override format hint");
            found
        }
        (Some(found), _) => found,
        (None, Some(hinted)) => hinted,
        (None, None) => {
            return Err(DeepError::format(
                "unrecognized deep container: no known magic bytes",
            ));
        }
    };
    let image = format.decode(bytes, opts)?;
    tracing::debug!(
        %format,
        width = image.width(),
        height = image.height(),
        samples = image.sample_count(),
        "decoded deep image"
    );
    Ok(image)
}

/// Read and decode a deep image file; the extension is used as the format hint.
pub fn read_deep_image(path: impl AsRef<Path>, opts: &DecodeOptions) -> DeepResult<DeepImage> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("read deep image '{}'", path.display()))?;
    decode(&bytes, DeepFormat::from_extension(path), opts)
}

/// Encode and write a deep image; `format` defaults to the path's extension.
pub fn write_deep_image(
    path: impl AsRef<Path>,
    image: &DeepImage,
    format: Option<DeepFormat>,
) -> DeepResult<()> {
    let path = path.as_ref();
    let format = format
        .or_else(|| DeepFormat::from_extension(path))
        .ok_or_else(|| {
            DeepError::validation(format!(
                "cannot infer deep format from '{}'",
                path.display()
            ))
        })?;
    let bytes = format.encode(image)?;
    ensure_parent_dir(path)?;
    std::fs::write(path, bytes)
        .with_context(|| format!("write deep image '{}'", path.display()))?;
    Ok(())
}

pub(crate) fn read_header_window(
    r: &mut ByteReader<'_>,
    width: u32,
    height: u32,
) -> DeepResult<DataWindow> {
    if width == 0 || height == 0 {
        return Err(DeepError::format(format!(
            "image dimensions must be >= 1, got {width}x{height}"
        )));
    }
    let x0 = r.u32("data window x0")?;
    let y0 = r.u32("data window y0")?;
    let x1 = r.u32("data window x1")?;
    let y1 = r.u32("data window y1")?;
    let window = DataWindow::new(x0, y0, x1, y1).map_err(|_| {
        DeepError::format(format!(
            "data window [{x0}, {x1}) x [{y0}, {y1}) is inverted"
        ))
    })?;
    if !window.fits(width, height) {
        return Err(DeepError::format(format!(
            "data window [{x0}, {x1}) x [{y0}, {y1}) exceeds {width}x{height}"
        )));
    }
    Ok(window)
}

pub(crate) fn write_header_window(w: &mut ByteWriter, window: DataWindow) {
    w.u32(window.x0);
    w.u32(window.y0);
    w.u32(window.x1);
    w.u32(window.y1);
}

pub(crate) fn header_channels(names: Vec<String>) -> DeepResult<ChannelSet> {
    ChannelSet::new(names).map_err(|e| match e {
        DeepError::Validation(msg) => DeepError::format(format!("channel list: {msg}")),
        other => other,
    })
}

#[cfg(test)]
#[path = "../tests/unit/formats/dispatch.rs"]
mod tests;
