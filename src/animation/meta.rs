//! Animation metadata and declarative overrides.
//!
//! [`AnimationMeta`] is the per-entity playback description of a clip
//! (weights, speeds, blend modes). Models patch it with
//! [`AnimationOverride`]s whose `None` fields leave the base value alone.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    #[serde(alias = "add")]
    Add,
    #[serde(alias = "average")]
    Average,
    #[serde(alias = "addAverage")]
    AddAverage,
}

/// Playback metadata for one animation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationMeta {
    pub code: String,
    /// Clip code to play
    pub animation: String,
    pub weight: f32,
    pub element_weight: BTreeMap<String, f32>,
    pub animation_speed: f32,
    pub mul_with_walk_speed: bool,
    pub weight_cap_factor: f32,
    pub ease_in_speed: f32,
    pub ease_out_speed: f32,
    pub blend_mode: BlendMode,
    pub element_blend_mode: BTreeMap<String, BlendMode>,
    pub supress_default_animation: bool,
    pub hold_eye_pos_after_easein: f32,
    pub client_side: bool,
    pub with_fp_variant: bool,
}

impl Default for AnimationMeta {
    fn default() -> Self {
        Self {
            code: String::new(),
            animation: String::new(),
            weight: 1.0,
            element_weight: BTreeMap::new(),
            animation_speed: 1.0,
            mul_with_walk_speed: false,
            weight_cap_factor: 0.0,
            ease_in_speed: 10.0,
            ease_out_speed: 10.0,
            blend_mode: BlendMode::Add,
            element_blend_mode: BTreeMap::new(),
            supress_default_animation: false,
            hold_eye_pos_after_easein: 99.0,
            client_side: false,
            with_fp_variant: false,
        }
    }
}

impl AnimationMeta {
    #[must_use]
    pub fn new(code: &str, animation: &str) -> Self {
        Self {
            code: code.to_string(),
            animation: animation.to_string(),
            ..Self::default()
        }
    }

    /// Copies per-element weight and blend entries onto their remapped bone
    /// names. Original keys stay in place.
    pub fn apply_remappings(&mut self, remappings: &BTreeMap<String, String>) {
        if remappings.is_empty() {
            return;
        }

        let weights: Vec<(String, f32)> = self
            .element_weight
            .iter()
            .filter_map(|(k, v)| remappings.get(k).map(|to| (to.clone(), *v)))
            .collect();
        let blends: Vec<(String, BlendMode)> = self
            .element_blend_mode
            .iter()
            .filter_map(|(k, v)| remappings.get(k).map(|to| (to.clone(), *v)))
            .collect();

        self.element_weight.extend(weights);
        self.element_blend_mode.extend(blends);
    }
}

/// Patch over [`AnimationMeta`]. Every `Some` field replaces the target's
/// field; `None` keeps it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationOverride {
    pub code: Option<String>,
    pub animation: Option<String>,
    pub weight: Option<f32>,
    pub element_weight: Option<BTreeMap<String, f32>>,
    pub animation_speed: Option<f32>,
    pub mul_with_walk_speed: Option<bool>,
    pub weight_cap_factor: Option<f32>,
    pub ease_in_speed: Option<f32>,
    pub ease_out_speed: Option<f32>,
    pub blend_mode: Option<BlendMode>,
    pub element_blend_mode: Option<BTreeMap<String, BlendMode>>,
    pub supress_default_animation: Option<bool>,
    pub hold_eye_pos_after_easein: Option<f32>,
    pub client_side: Option<bool>,
    pub with_fp_variant: Option<bool>,
}

impl AnimationOverride {
    /// Patches `meta` in place. The meta's code is never touched.
    pub fn apply_to(&self, meta: &mut AnimationMeta) {
        if let Some(v) = &self.animation {
            meta.animation.clone_from(v);
        }
        if let Some(v) = self.weight {
            meta.weight = v;
        }
        if let Some(v) = &self.element_weight {
            meta.element_weight.clone_from(v);
        }
        if let Some(v) = self.animation_speed {
            meta.animation_speed = v;
        }
        if let Some(v) = self.mul_with_walk_speed {
            meta.mul_with_walk_speed = v;
        }
        if let Some(v) = self.weight_cap_factor {
            meta.weight_cap_factor = v;
        }
        if let Some(v) = self.ease_in_speed {
            meta.ease_in_speed = v;
        }
        if let Some(v) = self.ease_out_speed {
            meta.ease_out_speed = v;
        }
        if let Some(v) = self.blend_mode {
            meta.blend_mode = v;
        }
        if let Some(v) = &self.element_blend_mode {
            meta.element_blend_mode.clone_from(v);
        }
        if let Some(v) = self.supress_default_animation {
            meta.supress_default_animation = v;
        }
        if let Some(v) = self.hold_eye_pos_after_easein {
            meta.hold_eye_pos_after_easein = v;
        }
        if let Some(v) = self.client_side {
            meta.client_side = v;
        }
        if let Some(v) = self.with_fp_variant {
            meta.with_fp_variant = v;
        }
    }

    /// Builds a fresh meta from this override, filling unset fields with the
    /// engine defaults. Returns `None` when the override has no code.
    #[must_use]
    pub fn to_meta(&self) -> Option<AnimationMeta> {
        let code = self.code.as_ref()?;
        let mut meta = AnimationMeta {
            code: code.clone(),
            animation: self.animation.clone().unwrap_or_else(|| code.clone()),
            ..AnimationMeta::default()
        };
        self.apply_to(&mut meta);
        Some(meta)
    }
}
