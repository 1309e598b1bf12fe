use crate::foundation::error::{DeepError, DeepResult};

/// One sample along a pixel's ray.
///
/// `color` is straight (not premultiplied); the compositor weights it by `alpha`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Sample {
    /// Distance from the camera; finite and `>= 0`.
    pub depth: f32,
    /// RGB color.
    pub color: [f32; 3],
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
}

impl Sample {
    /// Build a sample without validating it.
    pub fn new(depth: f32, color: [f32; 3], alpha: f32) -> Self {
        Self {
            depth,
            color,
            alpha,
        }
    }

    /// A fully opaque sample.
    pub fn opaque(depth: f32, color: [f32; 3]) -> Self {
        Self::new(depth, color, 1.0)
    }

    /// Check the sample invariants; `(x, y)` is only used for error reporting.
    pub fn validate(&self, x: u32, y: u32) -> DeepResult<()> {
        if !self.depth.is_finite() || self.depth < 0.0 {
            return Err(DeepError::invalid_sample(
                x,
                y,
                format!("depth must be finite and >= 0, got {}", self.depth),
            ));
        }
        if !self.alpha.is_finite() || !(0.0..=1.0).contains(&self.alpha) {
            return Err(DeepError::invalid_sample(
                x,
                y,
                format!("alpha must be in [0, 1], got {}", self.alpha),
            ));
        }
        if let Some(c) = self.color.iter().find(|c| !c.is_finite()) {
            return Err(DeepError::invalid_sample(
                x,
                y,
                format!("color components must be finite, got {c}"),
            ));
        }
        Ok(())
    }
}

/// Ordered channel names shared by every pixel of a deep image.
///
/// `R`, `G`, `B` and `A` feed the sample color and alpha; every other name is
/// an AOV carried alongside the sample. Depth is implicit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSet {
    names: Vec<String>,
    red: Option<usize>,
    green: Option<usize>,
    blue: Option<usize>,
    alpha: Option<usize>,
    aovs: Vec<usize>,
}

impl ChannelSet {
    /// Build a channel set from names in declaration order.
    pub fn new<I, S>(names: I) -> DeepResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let mut out = Self {
            names: Vec::with_capacity(names.len()),
            red: None,
            green: None,
            blue: None,
            alpha: None,
            aovs: Vec::new(),
        };

        for (idx, name) in names.into_iter().enumerate() {
            if name.is_empty() {
                return Err(DeepError::validation("channel names must be non-empty"));
            }
            if out.names.contains(&name) {
                return Err(DeepError::validation(format!(
                    "duplicate channel name '{name}'"
                )));
            }
            match name.as_str() {
                "R" => out.red = Some(idx),
                "G" => out.green = Some(idx),
                "B" => out.blue = Some(idx),
                "A" => out.alpha = Some(idx),
                _ => out.aovs.push(idx),
            }
            out.names.push(name);
        }
        Ok(out)
    }

    /// `R`, `G`, `B`, `A`.
    pub fn rgba() -> Self {
        Self {
            names: ["R", "G", "B", "A"].map(String::from).to_vec(),
            red: Some(0),
            green: Some(1),
            blue: Some(2),
            alpha: Some(3),
            aovs: Vec::new(),
        }
    }

    /// A single `A` channel, as written by shadow renders.
    pub fn alpha_only() -> Self {
        Self {
            names: vec!["A".to_string()],
            red: None,
            green: None,
            blue: None,
            alpha: Some(0),
            aovs: Vec::new(),
        }
    }

    /// Channel names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of declared channels.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` when only depth is stored.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// `true` when an `A` channel is declared; otherwise samples are opaque.
    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Number of channels that are not `R`, `G`, `B` or `A`.
    pub fn aov_count(&self) -> usize {
        self.aovs.len()
    }

    /// Names of the AOV channels in declaration order.
    pub fn aov_names(&self) -> impl Iterator<Item = &str> {
        self.aovs.iter().map(|&i| self.names[i].as_str())
    }

    /// Split one sample's channel values (declaration order) into a [`Sample`],
    /// appending AOV values to `aovs`.
    pub(crate) fn split_values(&self, depth: f32, values: &[f32], aovs: &mut Vec<f32>) -> Sample {
        debug_assert_eq!(values.len(), self.names.len());
        let pick = |slot: Option<usize>, fallback: f32| slot.map_or(fallback, |i| values[i]);
        aovs.extend(self.aovs.iter().map(|&i| values[i]));
        Sample {
            depth,
            color: [pick(self.red, 0.0), pick(self.green, 0.0), pick(self.blue, 0.0)],
            alpha: pick(self.alpha, 1.0),
        }
    }

    /// Inverse of [`Self::split_values`]: write declaration-order values to `out`.
    pub(crate) fn join_values(&self, sample: &Sample, aovs: &[f32], out: &mut Vec<f32>) {
        debug_assert_eq!(aovs.len(), self.aovs.len());
        let start = out.len();
        out.resize(start + self.names.len(), 0.0);
        let slots = &mut out[start..];
        if let Some(i) = self.red {
            slots[i] = sample.color[0];
        }
        if let Some(i) = self.green {
            slots[i] = sample.color[1];
        }
        if let Some(i) = self.blue {
            slots[i] = sample.color[2];
        }
        if let Some(i) = self.alpha {
            slots[i] = sample.alpha;
        }
        for (&i, &v) in self.aovs.iter().zip(aovs) {
            slots[i] = v;
        }
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::rgba()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/deep/sample.rs"]
mod tests;
