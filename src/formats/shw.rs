//! Planar deep shadow container (`.shw`).
//!
//! Big-endian. A per-pixel cumulative offset table (rows bottom-up) is
//! followed by one depth plane and one plane per channel:
//!
//! ```text
//! "DSHW" | u16 version | u16 flags | u32 width | u32 height | u32 x0 y0 x1 y1
//! u8 channel count | (u8 len, utf8 name)*
//! u32 cumulative sample count * data window area   (bottom row first)
//! u64 plane length | f32 depth * total | (f32 value * total) per channel
//! ```
//!
//! The data window is stored in top-down coordinates; only the pixel order
//! of the offset table and planes runs bottom-up.

use crate::{
    deep::store::{DataWindow, DeepImage, DeepSampleStore},
    formats::DecodeOptions,
    formats::bytes::{ByteReader, ByteWriter, Endian},
    foundation::error::{DeepError, DeepResult},
};

pub(crate) const MAGIC: &[u8; 4] = b"DSHW";
pub(crate) const VERSION: u16 = 2;

pub(crate) fn decode(bytes: &[u8], opts: &DecodeOptions) -> DeepResult<DeepImage> {
    let mut r = ByteReader::new(bytes, Endian::Big);

    let magic: [u8; 4] = r.array("shw magic")?;
    if &magic != MAGIC {
        return Err(DeepError::format(format!(
            "not a shw container (magic {magic:02x?})"
        )));
    }
    let version = r.u16("shw version")?;
    if version != VERSION {
        return Err(DeepError::format(format!(
            "unsupported shw version {version} (expected {VERSION})"
        )));
    }
    let flags = r.u16("shw flags")?;
    if flags != 0 {
        return Err(DeepError::format(format!(
            "unsupported shw flags {flags:#06x}"
        )));
    }

    let width = r.u32("shw width")?;
    let height = r.u32("shw height")?;
    let window = super::read_header_window(&mut r, width, height)?;

    let count = usize::from(r.u8("shw channel count")?);
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        let len = usize::from(r.u8("shw channel name length")?);
        names.push(r.utf8(len, "shw channel name")?);
    }
    let channels = super::header_channels(names)?;
    let n_channels = channels.len();

    let area = window.area();
    r.ensure(area.saturating_mul(4), "shw offset table")?;
    let mut offsets = Vec::with_capacity(area);
    let mut prev = 0u32;
    for i in 0..area {
        let end = r.u32("shw offset table")?;
        if end < prev {
            return Err(DeepError::format(format!(
                "shw offset table decreases at entry {i} ({end} < {prev})"
            )));
        }
        let (x, y) = stored_to_xy(window, i);
        opts.check_sample_count(x, y, end - prev)?;
        offsets.push(end);
        prev = end;
    }
    let total = prev as usize;

    let plane_len = r.u64("shw plane length")?;
    let expected = (total as u64) * (1 + n_channels as u64);
    if plane_len != expected {
        if total == 0 {
            return Err(DeepError::format(format!(
                "shw declares {plane_len} plane values but no samples"
            )));
        }
        let per_sample = plane_len / total as u64;
        return Err(DeepError::ChannelMismatch {
            declared: n_channels,
            actual: per_sample.saturating_sub(1) as usize,
        });
    }

    let mut depths = Vec::new();
    r.f32s(total, "shw depth plane", &mut depths)?;
    let mut planes = Vec::new();
    r.f32s(total * n_channels, "shw channel planes", &mut planes)?;
    r.finish()?;

    let mut store = DeepSampleStore::new_windowed(width, height, window, channels)?
        .with_insert_mode(opts.insert_mode);

    let mut values = Vec::with_capacity(n_channels);
    let mut aovs = Vec::new();
    let mut start = 0usize;
    for (i, &end) in offsets.iter().enumerate() {
        let (x, y) = stored_to_xy(window, i);
        let end = end as usize;
        for s in start..end {
            values.clear();
            values.extend((0..n_channels).map(|c| planes[c * total + s]));
            aovs.clear();
            let sample = store.channels().split_values(depths[s], &values, &mut aovs);
            store.add_sample_with_aovs(x, y, sample, &aovs)?;
        }
        start = end;
    }

    Ok(store.finish())
}

pub(crate) fn encode(image: &DeepImage) -> DeepResult<Vec<u8>> {
    let channels = image.channels();
    let n_channels = u8::try_from(channels.len())
        .map_err(|_| DeepError::validation("shw supports at most 255 channels"))?;
    let window = image.data_window();

    let mut w = ByteWriter::new(Endian::Big);
    w.bytes(MAGIC);
    w.u16(VERSION);
    w.u16(0);
    w.u32(image.width());
    w.u32(image.height());
    super::write_header_window(&mut w, window);

    w.u8(n_channels);
    for name in channels.names() {
        let len = u8::try_from(name.len()).map_err(|_| {
            DeepError::validation(format!("shw channel name '{name}' is too long"))
        })?;
        w.u8(len);
        w.bytes(name.as_bytes());
    }

    // Gather pixels in stored (bottom-up) order.
    let stride = channels.aov_count();
    let mut depths = Vec::with_capacity(image.sample_count());
    let mut values = Vec::with_capacity(image.sample_count() * channels.len());
    let mut scratch = Vec::with_capacity(channels.len());
    for i in 0..window.area() {
        let (x, y) = stored_to_xy(window, i);
        let samples = image.samples_at(x, y)?;
        let aovs = image.aovs_at(x, y)?;
        for (k, sample) in samples.iter().enumerate() {
            depths.push(sample.depth);
            scratch.clear();
            channels.join_values(sample, &aovs[k * stride..(k + 1) * stride], &mut scratch);
            values.extend_from_slice(&scratch);
        }
        let end = u32::try_from(depths.len())
            .map_err(|_| DeepError::validation("shw holds at most u32::MAX samples"))?;
        w.u32(end);
    }

    let total = depths.len();
    w.u64((total * (1 + channels.len())) as u64);
    for &d in &depths {
        w.f32(d);
    }
    // `values` is sample-major; planes are channel-major.
    for c in 0..channels.len() {
        for s in 0..total {
            w.f32(values[s * channels.len() + c]);
        }
    }

    Ok(w.into_inner())
}

/// Map a stored pixel index (bottom row first) to top-down `(x, y)`.
fn stored_to_xy(window: DataWindow, index: usize) -> (u32, u32) {
    let w = window.width() as usize;
    let row = (index / w) as u32;
    let col = (index % w) as u32;
    (window.x0 + col, window.y1 - 1 - row)
}

#[cfg(test)]
#[path = "../../tests/unit/formats/shw.rs"]
mod tests;
