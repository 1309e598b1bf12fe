//! Pixel-interleaved deep container (`.dtex`).
//!
//! Little-endian, rows stored top-down, every pixel record carrying its own
//! sample count and per-sample value count:
//!
//! ```text
//! "DTEX" | u32 version | u32 width | u32 height | u32 x0 y0 x1 y1
//! u16 channel count | (u16 len, utf8 name)*
//! per pixel in the data window: u32 samples | u16 values | (f32 depth, f32 * values)*
//! ```

use crate::{
    deep::store::{DeepImage, DeepSampleStore},
    formats::DecodeOptions,
    formats::bytes::{ByteReader, ByteWriter, Endian},
    foundation::error::{DeepError, DeepResult},
};

pub(crate) const MAGIC: &[u8; 4] = b"DTEX";
pub(crate) const VERSION: u32 = 1;
const PIXEL_RECORD_MIN: usize = 6;

pub(crate) fn decode(bytes: &[u8], opts: &DecodeOptions) -> DeepResult<DeepImage> {
    let mut r = ByteReader::new(bytes, Endian::Little);

    let magic: [u8; 4] = r.array("dtex magic")?;
    if &magic != MAGIC {
        return Err(DeepError::format(format!(
            "not a dtex container (magic {magic:02x?})"
        )));
    }
    let version = r.u32("dtex version")?;
    if version != VERSION {
        return Err(DeepError::format(format!(
            "unsupported dtex version {version} (expected {VERSION})"
        )));
    }

    let width = r.u32("dtex width")?;
    let height = r.u32("dtex height")?;
    let window = super::read_header_window(&mut r, width, height)?;

    let count = usize::from(r.u16("dtex channel count")?);
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        let len = usize::from(r.u16("dtex channel name length")?);
        names.push(r.utf8(len, "dtex channel name")?);
    }
    let channels = super::header_channels(names)?;
    let n_channels = channels.len();

    // Every pixel record is at least a sample count and a value count.
    r.ensure(
        window.area().saturating_mul(PIXEL_RECORD_MIN),
        "dtex pixel records",
    )?;
    let mut store = DeepSampleStore::new_windowed(width, height, window, channels)?
        .with_insert_mode(opts.insert_mode);

    let mut values = Vec::with_capacity(n_channels);
    let mut aovs = Vec::new();
    for y in window.y0..window.y1 {
        for x in window.x0..window.x1 {
            let n_samples = r.u32("dtex sample count")?;
            opts.check_sample_count(x, y, n_samples)?;

            let per_sample = usize::from(r.u16("dtex values per sample")?);
            if per_sample != n_channels {
                return Err(DeepError::ChannelMismatch {
                    declared: n_channels,
                    actual: per_sample,
                });
            }

            for _ in 0..n_samples {
                let depth = r.f32("dtex sample depth")?;
                values.clear();
                r.f32s(n_channels, "dtex sample values", &mut values)?;
                aovs.clear();
                let sample = store.channels().split_values(depth, &values, &mut aovs);
                store.add_sample_with_aovs(x, y, sample, &aovs)?;
            }
        }
    }

    r.finish()?;
    Ok(store.finish())
}

pub(crate) fn encode(image: &DeepImage) -> DeepResult<Vec<u8>> {
    let channels = image.channels();
    let n_channels = u16::try_from(channels.len())
        .map_err(|_| DeepError::validation("dtex supports at most 65535 channels"))?;

    let mut w = ByteWriter::new(Endian::Little);
    w.bytes(MAGIC);
    w.u32(VERSION);
    w.u32(image.width());
    w.u32(image.height());
    super::write_header_window(&mut w, image.data_window());

    w.u16(n_channels);
    for name in channels.names() {
        let len = u16::try_from(name.len()).map_err(|_| {
            DeepError::validation(format!("dtex channel name '{name}' is too long"))
        })?;
        w.u16(len);
        w.bytes(name.as_bytes());
    }

    let stride = channels.aov_count();
    let mut values = Vec::with_capacity(channels.len());
    for (_, _, samples, aovs) in image.pixels() {
        let n_samples = u32::try_from(samples.len())
            .map_err(|_| DeepError::validation("dtex pixel holds too many samples"))?;
        w.u32(n_samples);
        w.u16(n_channels);
        for (i, sample) in samples.iter().enumerate() {
            w.f32(sample.depth);
            values.clear();
            channels.join_values(sample, &aovs[i * stride..(i + 1) * stride], &mut values);
            for &v in &values {
                w.f32(v);
            }
        }
    }

    Ok(w.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/formats/dtex.rs"]
mod tests;
