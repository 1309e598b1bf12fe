/// Convenience result type used across deepflat.
pub type DeepResult<T> = Result<T, DeepError>;

/// Top-level error taxonomy used by decoder, store and compositor APIs.
#[derive(thiserror::Error, Debug)]
pub enum DeepError {
    /// Bad magic bytes, unsupported version, or malformed header values.
    #[error("format error: {0}")]
    Format(String),

    /// Input ended before `what` could be read.
    #[error("truncated data: {what} needs {needed} bytes at offset {offset}, {available} available")]
    TruncatedData {
        /// Field or section being read.
        what: &'static str,
        /// Byte offset where the read started.
        offset: usize,
        /// Bytes required by the read.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// Declared channel count disagrees with the sample layout.
    #[error("channel mismatch: declared {declared} channels, layout carries {actual}")]
    ChannelMismatch {
        /// Channel count declared in the header or channel set.
        declared: usize,
        /// Channel count implied by the data.
        actual: usize,
    },

    /// Pixel coordinate outside the image bounds or data window.
    #[error("pixel ({x}, {y}) is out of range for {width}x{height} ({context})")]
    OutOfRange {
        /// Requested column.
        x: i64,
        /// Requested row.
        y: i64,
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
        /// Which bound was violated.
        context: &'static str,
    },

    /// Non-monotonic depth inserted in strict mode.
    #[error("ordering error at ({x}, {y}): depth {depth} follows depth {previous}")]
    Ordering {
        /// Pixel column.
        x: u32,
        /// Pixel row.
        y: u32,
        /// Offending depth.
        depth: f32,
        /// Last depth already stored at the pixel.
        previous: f32,
    },

    /// Sample values outside their valid domain (depth, alpha, color).
    #[error("invalid sample at ({x}, {y}): {reason}")]
    InvalidSample {
        /// Pixel column.
        x: u32,
        /// Pixel row.
        y: u32,
        /// Human readable reason.
        reason: String,
    },

    /// Invalid caller-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeepError {
    /// Build a [`DeepError::Format`] value.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Build a [`DeepError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DeepError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`DeepError::InvalidSample`] value.
    pub fn invalid_sample(x: u32, y: u32, reason: impl Into<String>) -> Self {
        Self::InvalidSample {
            x,
            y,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
