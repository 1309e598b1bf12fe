//! deepflat decodes deep images and flattens them into ordinary RGBA rasters.
//!
//! A deep image stores, for every pixel, a depth-ordered list of samples
//! (depth, color, alpha) instead of a single color.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: `bytes -> DeepImage` through one of the supported containers
//!    ([`DeepFormat::Dtex`] pixel-interleaved, [`DeepFormat::Shw`] planar with
//!    bottom-up rows). Magic bytes pick the reader.
//! 2. **Store**: samples are kept depth-sorted per pixel in a [`DeepImage`]
//!    built through [`DeepSampleStore`].
//! 3. **Composite**: front-to-back "over" per pixel produces a [`FlatImage`]
//!    of straight RGBA `f32` ([`composite`], [`composite_with`]).
//! 4. **Output** (optional): [`write_flat_image`] hands the result to the
//!    `image` crate; [`diff_flat_images`] compares two rasters.
//!
//! Frame sequences with missing-frame policies are read through
//! [`SequenceReader`]; [`SceneDesc`] builds deep images from JSON.
//!
//! Decoding and compositing are deterministic and `unsafe` is forbidden.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod composite;
mod deep;
mod flat;
mod formats;
mod foundation;
mod scene;
mod sequence;

pub use composite::flatten::{CompositeOptions, composite, composite_pixel, composite_with};
pub use deep::sample::{ChannelSet, Sample};
pub use deep::store::{DataWindow, DeepImage, DeepSampleStore, InsertMode};
pub use flat::diff::{DiffReport, diff_flat_images};
pub use flat::raster::{
    ChannelSelection, FlatImage, ensure_parent_dir, read_flat_image, write_flat_image,
};
pub use formats::{DecodeOptions, DeepFormat, decode, read_deep_image, write_deep_image};
pub use foundation::error::{DeepError, DeepResult};
pub use scene::desc::{PixelDesc, SampleDesc, SceneDesc};
pub use sequence::pattern::FramePattern;
pub use sequence::reader::{MissingFramePolicy, SequenceOptions, SequenceReader};
