//! Selection State
//!
//! The persisted per-entity customization record. This is plain data: every
//! change that must invalidate compositing output goes through
//! [`Skinnable`](super::Skinnable), which pairs the write with the matching
//! [`DirtyEvent`](super::DirtyEvent).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Voice type used until a voice variant is selected.
pub const DEFAULT_VOICE_TYPE: &str = "altoflute";
/// Voice pitch used until a voice variant is selected.
pub const DEFAULT_VOICE_PITCH: &str = "medium";

/// Part codes that drive the voice instead of the mesh.
pub const VOICE_TYPE_PART: &str = "voicetype";
pub const VOICE_PITCH_PART: &str = "voicepitch";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectionState {
    pub model: Option<String>,
    /// Part code -> variant code
    pub variants: BTreeMap<String, String>,
    /// Part code -> packed RGBA color
    pub colors: BTreeMap<String, u32>,
    /// Scale part code -> scale factor
    pub scales: BTreeMap<String, f64>,
    /// Part code -> glow intensity
    pub glow: BTreeMap<String, i32>,
    /// Painting name -> raw RGBA bytes (`size * size * 4`)
    pub paintings: BTreeMap<String, Vec<u8>>,
    pub eye_height_offset: f64,
    pub voice_type: String,
    pub voice_pitch: String,
    /// Emote codes in activation order, most recent last. Not persisted.
    #[serde(skip)]
    pub active_emotes: Vec<String>,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self {
            model: None,
            variants: BTreeMap::new(),
            colors: BTreeMap::new(),
            scales: BTreeMap::new(),
            glow: BTreeMap::new(),
            paintings: BTreeMap::new(),
            eye_height_offset: 0.0,
            voice_type: DEFAULT_VOICE_TYPE.to_string(),
            voice_pitch: DEFAULT_VOICE_PITCH.to_string(),
            active_emotes: Vec::new(),
        }
    }
}

impl SelectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    #[must_use]
    pub fn variant(&self, part: &str) -> Option<&str> {
        self.variants.get(part).map(String::as_str)
    }

    /// Packed color, `0` when unset.
    #[must_use]
    pub fn color(&self, part: &str) -> u32 {
        self.colors.get(part).copied().unwrap_or(0)
    }

    /// Glow intensity, `-1` when unset.
    #[must_use]
    pub fn glow(&self, part: &str) -> i32 {
        self.glow.get(part).copied().unwrap_or(-1)
    }

    #[must_use]
    pub fn scale(&self, scale_part: &str) -> Option<f64> {
        self.scales.get(scale_part).copied()
    }

    /// Stored painting decoded into packed pixels, if it holds exactly
    /// `width * height` pixels.
    #[must_use]
    pub fn painting_pixels(&self, name: &str, width: u32, height: u32) -> Option<Vec<u32>> {
        let bytes = self.paintings.get(name)?;
        let expected = (width as usize) * (height as usize) * 4;
        if bytes.len() != expected {
            return None;
        }
        Some(
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        )
    }

    #[must_use]
    pub fn is_emote_active(&self, code: &str) -> bool {
        self.active_emotes
            .iter()
            .any(|e| e.eq_ignore_ascii_case(code))
    }

    /// Pitch multiplier for the selected voice pitch.
    #[must_use]
    pub fn voice_pitch_modifier(&self) -> f32 {
        pitch_modifier(&self.voice_pitch)
    }
}

/// Pitch multiplier for a voice pitch name, `1.0` for unknown names.
#[must_use]
pub fn pitch_modifier(pitch: &str) -> f32 {
    match pitch {
        "verylow" => 0.6,
        "low" => 0.8,
        "high" => 1.2,
        "veryhigh" => 1.4,
        _ => 1.0,
    }
}
