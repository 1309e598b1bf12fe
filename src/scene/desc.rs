use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    deep::{
        sample::{ChannelSet, Sample},
        store::{DataWindow, DeepImage, DeepSampleStore, InsertMode},
    },
    foundation::error::{DeepError, DeepResult},
};

fn default_channels() -> Vec<String> {
    ChannelSet::rgba().names().to_vec()
}

fn default_alpha() -> f32 {
    1.0
}

/// One sample of a scene pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDesc {
    /// Distance from the camera.
    pub depth: f32,
    /// RGB color; black when omitted.
    #[serde(default)]
    pub color: [f32; 3],
    /// Opacity; opaque when omitted.
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    /// AOV values in channel declaration order; zeros when omitted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aovs: Vec<f32>,
}

/// Samples of one pixel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelDesc {
    /// Column.
    pub x: u32,
    /// Row (top-down).
    pub y: u32,
    /// Samples in any depth order.
    pub samples: Vec<SampleDesc>,
}

/// JSON-facing description of a deep image.
///
/// ```json
/// { "width": 2, "height": 1, "channels": ["R", "G", "B", "A"],
///   "pixels": [ { "x": 0, "y": 0,
///                 "samples": [ { "depth": 1.0, "color": [1, 0, 0], "alpha": 0.5 } ] } ] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDesc {
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Channel names; `R`, `G`, `B`, `A` when omitted.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// `[x0, y0, x1, y1]` half-open data window; the full image when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_window: Option<[u32; 4]>,
    /// Pixels that carry samples.
    #[serde(default)]
    pub pixels: Vec<PixelDesc>,
}

impl SceneDesc {
    /// Parse a scene from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> DeepResult<Self> {
        serde_json::from_reader(r).map_err(|e| DeepError::serde(format!("parse scene JSON: {e}")))
    }

    /// Parse a scene from a JSON string.
    pub fn from_json_str(s: &str) -> DeepResult<Self> {
        serde_json::from_str(s).map_err(|e| DeepError::serde(format!("parse scene JSON: {e}")))
    }

    /// Parse a scene from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> DeepResult<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open scene JSON '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Describe an existing deep image; AOVs are kept, holes are omitted.
    pub fn from_image(image: &DeepImage) -> Self {
        let dw = image.data_window();
        let full = DataWindow::full(image.width(), image.height());
        let aov_count = image.channels().aov_count();
        let pixels = image
            .pixels()
            .filter(|(_, _, samples, _)| !samples.is_empty())
            .map(|(x, y, samples, aovs)| PixelDesc {
                x,
                y,
                samples: samples
                    .iter()
                    .enumerate()
                    .map(|(i, s)| SampleDesc {
                        depth: s.depth,
                        color: s.color,
                        alpha: s.alpha,
                        aovs: aovs[i * aov_count..(i + 1) * aov_count].to_vec(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            width: image.width(),
            height: image.height(),
            channels: image.channels().names().to_vec(),
            data_window: (dw != full).then_some([dw.x0, dw.y0, dw.x1, dw.y1]),
            pixels,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> DeepResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DeepError::serde(format!("serialize scene JSON: {e}")))
    }

    /// Build the deep image; samples are depth-sorted on insertion.
    ///
    /// Invalid coordinates, samples or AOV counts fail with the store's error.
    pub fn build(&self) -> DeepResult<DeepImage> {
        let channels = ChannelSet::new(self.channels.iter().cloned())?;
        let aov_count = channels.aov_count();
        let window = match self.data_window {
            Some([x0, y0, x1, y1]) => DataWindow::new(x0, y0, x1, y1)?,
            None => DataWindow::full(self.width, self.height),
        };
        let mut store = DeepSampleStore::new_windowed(self.width, self.height, window, channels)?
            .with_insert_mode(InsertMode::Sorted);

        let zeros = vec![0.0f32; aov_count];
        for px in &self.pixels {
            for s in &px.samples {
                let aovs = if s.aovs.is_empty() { &zeros } else { &s.aovs };
                store.add_sample_with_aovs(px.x, px.y, Sample::new(s.depth, s.color, s.alpha), aovs)?;
            }
        }
        Ok(store.finish())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/desc.rs"]
mod tests;
