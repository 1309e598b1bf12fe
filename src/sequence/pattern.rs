use std::{fmt, path::PathBuf};

/// Frame-number placeholder inside a pattern string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct FrameToken {
    start: usize,
    len: usize,
    width: usize,
}

/// File path template for a frame sequence.
///
/// The first run of `#` is replaced by the zero-padded frame number, padded to
/// the run length (`shot.####.dtex` -> `shot.0042.dtex`). Without `#`, the
/// first printf-style `%d` or `%0Nd` is used instead. A path with neither
/// names a single file shared by every frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePattern {
    raw: String,
    token: Option<FrameToken>,
}

impl FramePattern {
    /// Parse a pattern; any string is accepted.
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let token = if raw.contains('#') {
            hash_token(&raw)
        } else {
            printf_token(&raw)
        };
        Self { raw, token }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// `true` when the path changes with the frame number.
    pub fn is_sequence(&self) -> bool {
        self.token.is_some()
    }

    /// Path of `frame`.
    pub fn resolve(&self, frame: i32) -> PathBuf {
        let Some(t) = self.token else {
            return PathBuf::from(&self.raw);
        };
        let mut out = String::with_capacity(self.raw.len() + t.width);
        out.push_str(&self.raw[..t.start]);
        out.push_str(&format!("{frame:0width$}", width = t.width));
        out.push_str(&self.raw[t.start + t.len..]);
        PathBuf::from(out)
    }
}

impl fmt::Display for FramePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FramePattern {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for FramePattern {
    fn from(raw: String) -> Self {
        Self::parse(raw)
    }
}

fn hash_token(raw: &str) -> Option<FrameToken> {
    let start = raw.find('#')?;
    let len = raw[start..].bytes().take_while(|&b| b == b'#').count();
    Some(FrameToken {
        start,
        len,
        width: len,
    })
}

fn printf_token(raw: &str) -> Option<FrameToken> {
    let bytes = raw.as_bytes();
    raw.match_indices('%').find_map(|(start, _)| {
        let rest = &bytes[start + 1..];
        let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
        if rest.get(digits) != Some(&b'd') {
            return None;
        }
        // `%d` or zero-padded `%0Nd` only.
        let width = match digits {
            0 => 1,
            _ if rest[0] == b'0' => raw[start + 1..start + 1 + digits].parse::<usize>().ok()?,
            _ => return None,
        };
        Some(FrameToken {
            start,
            len: digits + 2,
            width: width.max(1),
        })
    })
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/pattern.rs"]
mod tests;
