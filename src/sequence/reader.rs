use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

use crate::{
    deep::store::DeepImage,
    formats::{DecodeOptions, read_deep_image},
    foundation::error::{DeepError, DeepResult},
    sequence::pattern::FramePattern,
};

/// What to do when the requested frame cannot be loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFramePolicy {
    /// Return the load error.
    #[default]
    Error,
    /// Load the closest frame in `[first, last]` that exists.
    NearestFrame,
    /// Return no image; callers render a transparent frame.
    Black,
}

impl FromStr for MissingFramePolicy {
    type Err = DeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "nearest" | "nearest_frame" => Ok(Self::NearestFrame),
            "black" => Ok(Self::Black),
            other => Err(DeepError::validation(format!(
                "unknown missing-frame policy '{other}' (expected error, nearest or black)"
            ))),
        }
    }
}

impl fmt::Display for MissingFramePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::NearestFrame => "nearest",
            Self::Black => "black",
        })
    }
}

/// Frame range and loading behavior of a [`SequenceReader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SequenceOptions {
    /// First frame of the sequence (inclusive).
    pub first: i32,
    /// Last frame of the sequence (inclusive).
    pub last: i32,
    /// Missing-frame handling.
    pub policy: MissingFramePolicy,
    /// Options forwarded to the decoder.
    pub decode: DecodeOptions,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            first: 1,
            last: 1,
            policy: MissingFramePolicy::Error,
            decode: DecodeOptions::default(),
        }
    }
}

impl SequenceOptions {
    /// Check the frame range.
    pub fn validate(&self) -> DeepResult<()> {
        if self.first > self.last {
            return Err(DeepError::validation(format!(
                "frame range first={} must be <= last={}",
                self.first, self.last
            )));
        }
        Ok(())
    }
}

/// Loads frames of a deep image sequence, keeping the last decoded file.
///
/// Resolving to the same path as the previous successful load returns the
/// cached image without touching the filesystem until [`Self::reload`].
#[derive(Debug)]
pub struct SequenceReader {
    pattern: FramePattern,
    opts: SequenceOptions,
    cached: Option<(PathBuf, Arc<DeepImage>)>,
}

impl SequenceReader {
    /// Create a reader over `pattern`.
    pub fn new(pattern: impl Into<FramePattern>, opts: SequenceOptions) -> DeepResult<Self> {
        opts.validate()?;
        Ok(Self {
            pattern: pattern.into(),
            opts,
            cached: None,
        })
    }

    /// Path template of the sequence.
    pub fn pattern(&self) -> &FramePattern {
        &self.pattern
    }

    /// Reader configuration.
    pub fn options(&self) -> &SequenceOptions {
        &self.opts
    }

    /// Path of the currently cached file, if any.
    pub fn cached_path(&self) -> Option<&Path> {
        self.cached.as_ref().map(|(p, _)| p.as_path())
    }

    /// Forget the cached image so the next read hits the filesystem.
    pub fn reload(&mut self) {
        self.cached = None;
    }

    /// Load `frame` according to the missing-frame policy.
    ///
    /// `Ok(None)` only happens under [`MissingFramePolicy::Black`].
    #[tracing::instrument(skip(self), fields(pattern = %self.pattern, policy = %self.opts.policy))]
    pub fn read_frame(&mut self, frame: i32) -> DeepResult<Option<Arc<DeepImage>>> {
        match self.opts.policy {
            MissingFramePolicy::Error => self.load(frame).map(Some),
            MissingFramePolicy::Black => match self.load(frame) {
                Ok(image) => Ok(Some(image)),
                Err(e) => {
                    tracing::warn!(frame, error = %e, "frame missing, rendering black");
                    Ok(None)
                }
            },
            MissingFramePolicy::NearestFrame => {
                let mut last_err = None;
                for candidate in nearest_frame_order(frame, self.opts.first, self.opts.last) {
                    match self.load(candidate) {
                        Ok(image) => {
                            if candidate != frame {
                                tracing::warn!(frame, candidate, "substituting nearest frame");
                            }
                            return Ok(Some(image));
                        }
                        Err(e) => {
                            tracing::debug!(candidate, error = %e, "candidate frame failed");
                            last_err = Some(e);
                        }
                    }
                }
                Err(last_err.unwrap_or_else(|| {
                    DeepError::validation(format!(
                        "no frames in [{}, {}] to search",
                        self.opts.first, self.opts.last
                    ))
                }))
            }
        }
    }

    fn load(&mut self, frame: i32) -> DeepResult<Arc<DeepImage>> {
        let path = self.pattern.resolve(frame);
        if let Some((cached_path, image)) = &self.cached
            && *cached_path == path
        {
            tracing::debug!(path = %path.display(), "deep image cache hit");
            return Ok(Arc::clone(image));
        }

        let image = Arc::new(read_deep_image(&path, &self.opts.decode)?);
        self.cached = Some((path, Arc::clone(&image)));
        Ok(image)
    }
}

/// Frames tried for `frame` under [`MissingFramePolicy::NearestFrame`].
///
/// At or before `first` the range is walked upwards from `first`; at or past
/// `last` downwards from `last`; otherwise outwards as `f, f+1, f-1, f+2, ...`.
pub(crate) fn nearest_frame_order(
    frame: i32,
    first: i32,
    last: i32,
) -> Box<dyn Iterator<Item = i32>> {
    if first > last {
        return Box::new(std::iter::empty());
    }
    if frame <= first {
        return Box::new(first..=last);
    }
    if frame >= last {
        return Box::new((first..=last).rev());
    }

    let (first, last) = (i64::from(first), i64::from(last));
    let (mut down, mut up) = (i64::from(frame), i64::from(frame) + 1);
    let mut take_down = true;
    Box::new(std::iter::from_fn(move || {
        loop {
            if down < first && up > last {
                return None;
            }
            let pick_down = take_down;
            take_down = !take_down;
            if pick_down && down >= first {
                down -= 1;
                return Some(down + 1);
            }
            if !pick_down && up <= last {
                up += 1;
                return Some(up - 1);
            }
        }
    }).map(|f| f as i32))
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/reader.rs"]
mod tests;
