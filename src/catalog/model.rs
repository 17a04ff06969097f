//! Skin model catalog entry
//!
//! A [`SkinModel`] is deserialized from configuration, optionally merged with
//! addon documents through [`SkinModel::apply_addon`], and then prepared with
//! [`SkinModel::initialize`], which derives every lookup table the compositors
//! read. After initialization a model is shared immutably (`Arc<SkinModel>`).
//!
//! Addon application and initialization are separate phases. Tables built by
//! `initialize` go stale as soon as an addon is applied, so the registry
//! applies every addon first and initializes once at the end.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use glam::Vec2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::emote::Emote;
use super::part::{ScalePart, SkinPart};
use super::target::{ClothingOverlay, PaintingTarget, TextureCopy, TextureTarget};
use crate::animation::{AnimationClip, AnimationOverride, AnimationSet};
use crate::utils::CaseInsensitiveMap;

/// Bone names used by the host's head controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JointNames {
    pub head: String,
    pub neck: String,
    pub torso_upper: String,
    pub torso_lower: String,
    pub leg_upper_l: String,
    pub leg_upper_r: String,
}

impl Default for JointNames {
    fn default() -> Self {
        Self {
            head: "b_Head".to_string(),
            neck: "b_Neck".to_string(),
            torso_upper: "UpperTorso".to_string(),
            torso_lower: "LowerTorso".to_string(),
            leg_upper_l: "b_FootUpperL".to_string(),
            leg_upper_r: "b_FootUpperR".to_string(),
        }
    }
}

impl JointNames {
    /// Every name, for joint resolution.
    #[must_use]
    pub fn all(&self) -> [&str; 6] {
        [
            &self.head,
            &self.neck,
            &self.torso_upper,
            &self.torso_lower,
            &self.leg_upper_l,
            &self.leg_upper_r,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SkinModel {
    /// Unique model code, e.g. `kemono0`
    pub code: String,
    /// Code of the model this document extends, if it is an addon
    pub addon: Option<String>,
    /// Folder holding the model's part shapes
    pub shape_path: Option<String>,
    /// Folder holding the model's part textures
    pub texture_path: Option<String>,
    /// Base shape location
    pub model: Option<String>,
    /// Hidden from character creation
    pub hidden: bool,
    pub joints: JointNames,

    pub scale_parts: Vec<ScalePart>,
    pub skin_parts: Vec<SkinPart>,
    pub emotes: Vec<Emote>,
    /// Vanilla bone name -> model bone name
    pub animation_remappings: BTreeMap<String, String>,
    pub animation_overrides: Vec<AnimationOverride>,
    /// Codes of extra [`AnimationSet`]s
    pub animations: Vec<String>,
    pub gui_layout: Vec<Vec<String>>,
    pub gui_render_height_offset: f64,

    pub eye_height: f64,
    pub eye_height_offset_min: f64,
    pub eye_height_offset_max: f64,
    pub hit_box_size: Vec2,

    // === Derived by `initialize` ===
    #[serde(skip)]
    addon_shape_paths: Vec<String>,
    #[serde(skip)]
    addon_texture_paths: Vec<String>,
    #[serde(skip)]
    shape_paths: Vec<String>,
    #[serde(skip)]
    texture_paths: Vec<String>,
    #[serde(skip)]
    parts_by_code: FxHashMap<String, usize>,
    #[serde(skip)]
    scale_parts_by_code: FxHashMap<String, usize>,
    #[serde(skip)]
    scale_parts_by_target: FxHashMap<String, usize>,
    #[serde(skip)]
    render_order: Vec<usize>,
    #[serde(skip)]
    texture_targets: Vec<TextureTarget>,
    #[serde(skip)]
    texture_targets_by_code: FxHashMap<String, usize>,
    #[serde(skip)]
    painting_targets: Vec<PaintingTarget>,
    #[serde(skip)]
    painting_targets_by_code: FxHashMap<String, usize>,
    #[serde(skip)]
    texture_copies: Vec<TextureCopy>,
    #[serde(skip)]
    clothing_overlays: Vec<ClothingOverlay>,
    #[serde(skip)]
    emotes_by_code: CaseInsensitiveMap<usize>,
    #[serde(skip)]
    compiled_animations: OnceLock<Arc<[AnimationClip]>>,
}

impl Default for SkinModel {
    fn default() -> Self {
        Self {
            code: String::new(),
            addon: None,
            shape_path: None,
            texture_path: None,
            model: None,
            hidden: false,
            joints: JointNames::default(),
            scale_parts: Vec::new(),
            skin_parts: Vec::new(),
            emotes: Vec::new(),
            animation_remappings: BTreeMap::new(),
            animation_overrides: Vec::new(),
            animations: Vec::new(),
            gui_layout: Vec::new(),
            gui_render_height_offset: 0.0,
            eye_height: 1.7,
            eye_height_offset_min: -0.5,
            eye_height_offset_max: 0.5,
            hit_box_size: Vec2::new(0.6, 1.85),
            addon_shape_paths: Vec::new(),
            addon_texture_paths: Vec::new(),
            shape_paths: Vec::new(),
            texture_paths: Vec::new(),
            parts_by_code: FxHashMap::default(),
            scale_parts_by_code: FxHashMap::default(),
            scale_parts_by_target: FxHashMap::default(),
            render_order: Vec::new(),
            texture_targets: Vec::new(),
            texture_targets_by_code: FxHashMap::default(),
            painting_targets: Vec::new(),
            painting_targets_by_code: FxHashMap::default(),
            texture_copies: Vec::new(),
            clothing_overlays: Vec::new(),
            emotes_by_code: CaseInsensitiveMap::new(),
            compiled_animations: OnceLock::new(),
        }
    }
}

impl SkinModel {
    #[must_use]
    pub fn new(code: &str, model: &str) -> Self {
        Self {
            code: code.to_string(),
            model: Some(model.to_string()),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_part(mut self, part: SkinPart) -> Self {
        self.skin_parts.push(part);
        self
    }

    #[must_use]
    pub fn with_scale_part(mut self, scale: ScalePart) -> Self {
        self.scale_parts.push(scale);
        self
    }

    #[must_use]
    pub fn with_emote(mut self, emote: Emote) -> Self {
        self.emotes.push(emote);
        self
    }

    #[must_use]
    pub fn is_addon(&self) -> bool {
        self.addon.is_some()
    }

    // ========================================================================
    // Phases
    // ========================================================================

    /// Merges an addon document into this model.
    ///
    /// Parts whose code already exists get the addon's variants appended;
    /// animation overrides replace by code; everything else appends. The
    /// model must be [initialized](Self::initialize) again afterwards.
    pub fn apply_addon(&mut self, other: SkinModel) {
        if other.model.is_some() {
            self.model = other.model;
        }
        if let Some(path) = other.shape_path {
            self.addon_shape_paths.push(path);
        }
        if let Some(path) = other.texture_path {
            self.addon_texture_paths.push(path);
        }

        self.scale_parts.extend(other.scale_parts);

        for part in other.skin_parts {
            match self.skin_parts.iter_mut().find(|p| p.code == part.code) {
                Some(existing) => existing.variants.extend(part.variants),
                None => self.skin_parts.push(part),
            }
        }

        for anim in other.animation_overrides {
            match self
                .animation_overrides
                .iter_mut()
                .find(|a| a.code == anim.code)
            {
                Some(existing) => *existing = anim,
                None => self.animation_overrides.push(anim),
            }
        }

        self.animations.extend(other.animations);
        self.emotes.extend(other.emotes);
        self.gui_layout.extend(other.gui_layout);
    }

    /// Derives every lookup table from the configured lists. Idempotent.
    pub fn initialize(&mut self) {
        self.shape_paths = self
            .shape_path
            .iter()
            .chain(&self.addon_shape_paths)
            .cloned()
            .collect();
        self.texture_paths = self
            .texture_path
            .iter()
            .chain(&self.addon_texture_paths)
            .cloned()
            .collect();

        self.scale_parts_by_code = index_by(&self.scale_parts, |s| s.code.clone());
        self.scale_parts_by_target = index_by(&self.scale_parts, |s| s.target.clone());

        for part in &mut self.skin_parts {
            part.index_variants();
            part.reset_blend_overlay();
            part.texture_target_index = None;
        }
        self.parts_by_code = index_by(&self.skin_parts, |p| p.code.clone());

        // stable: equal render orders keep declaration order
        let mut order: Vec<usize> = (0..self.skin_parts.len())
            .filter(|&i| !self.skin_parts[i].is_voice())
            .collect();
        order.sort_by_key(|&i| self.skin_parts[i].render_order);
        self.render_order = order;

        self.build_targets();

        for emote in &mut self.emotes {
            emote.initialize();
        }
        self.emotes_by_code = CaseInsensitiveMap::with_capacity(self.emotes.len());
        for (i, emote) in self.emotes.iter().enumerate() {
            self.emotes_by_code.insert(&emote.code, i);
        }

        self.compiled_animations = OnceLock::new();
    }

    fn build_targets(&mut self) {
        let mut targets: Vec<TextureTarget> = Vec::new();
        let mut targets_by_code: FxHashMap<String, usize> = FxHashMap::default();
        let mut painting_sizes: Vec<(String, u32)> = Vec::new();
        let mut copies = Vec::new();
        let mut overlays = Vec::new();

        for &i in &self.render_order {
            let part = &mut self.skin_parts[i];

            if let Some(target) = part.texture_target.clone() {
                let index = match targets_by_code.get(&target) {
                    Some(&index) => {
                        targets[index].parts.push(part.code.clone());
                        index
                    }
                    None => {
                        part.texture_blend_overlay = false;
                        targets.push(TextureTarget {
                            code: target.clone(),
                            parts: vec![part.code.clone()],
                            width: part.texture_target_width,
                            height: part.texture_target_height,
                        });
                        targets_by_code.insert(target, targets.len() - 1);
                        targets.len() - 1
                    }
                };
                part.texture_target_index = Some(index);
            } else if part.use_painting || part.use_clothing_texture {
                log::warn!(
                    "Skin part {} in model {} has no texture target, it will not render",
                    part.code,
                    self.code
                );
            }

            if let Some(name) = &part.painting_name
                && part.painting_size > 0
            {
                match painting_sizes.iter_mut().find(|(n, _)| n == name) {
                    Some(entry) => entry.1 = part.painting_size,
                    None => painting_sizes.push((name.clone(), part.painting_size)),
                }
            }

            if let (Some(from), Some(to)) = (&part.texture_copy_from, &part.texture_target) {
                copies.push(TextureCopy {
                    from: from.clone(),
                    to: to.clone(),
                });
            }

            if part.use_clothing_texture
                && let Some(target) = &part.texture_target
            {
                overlays.push(ClothingOverlay {
                    target: target.clone(),
                    slots: part.clothing_textures.iter().copied().collect(),
                    offset: part.texture_render_to,
                });
            }
        }

        // targets with no size cannot be allocated
        for target in &targets {
            if target.width == 0 || target.height == 0 {
                log::warn!(
                    "Texture target {} in model {} has size {}x{}, it will not render",
                    target.code,
                    self.code,
                    target.width,
                    target.height
                );
            }
        }

        // overlay offsets are not clamped when compositing
        overlays.retain(|overlay: &ClothingOverlay| {
            let Some(target) = targets_by_code.get(&overlay.target).map(|&i| &targets[i]) else {
                return false;
            };
            let in_bounds = u32::try_from(overlay.offset.x).is_ok_and(|x| x < target.width)
                && u32::try_from(overlay.offset.y).is_ok_and(|y| y < target.height);
            if !in_bounds {
                log::warn!(
                    "Clothing overlay offset ({}, {}) outside target {} ({}x{}) in model {}, skipped",
                    overlay.offset.x,
                    overlay.offset.y,
                    target.code,
                    target.width,
                    target.height,
                    self.code
                );
            }
            in_bounds
        });

        copies.retain(|copy: &TextureCopy| {
            let known = targets_by_code.contains_key(&copy.from);
            if !known {
                log::warn!(
                    "Texture copy source {} is not a texture target in model {}, skipped",
                    copy.from,
                    self.code
                );
            }
            known
        });

        let paintings: Vec<PaintingTarget> = painting_sizes
            .into_iter()
            .map(|(code, size)| {
                let mut texture_targets: SmallVec<[String; 2]> = SmallVec::new();
                for &i in &self.render_order {
                    let part = &self.skin_parts[i];
                    if part.use_painting
                        && part.painting_name.as_deref() == Some(code.as_str())
                        && let Some(target) = &part.texture_target
                        && !texture_targets.contains(target)
                    {
                        texture_targets.push(target.clone());
                    }
                }
                PaintingTarget {
                    code,
                    size,
                    texture_targets,
                }
            })
            .collect();

        self.painting_targets_by_code = index_by(&paintings, |p| p.code.clone());
        self.painting_targets = paintings;
        self.texture_targets_by_code = targets_by_code;
        self.texture_targets = targets;
        self.texture_copies = copies;
        self.clothing_overlays = overlays;
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    #[must_use]
    pub fn part(&self, code: &str) -> Option<&SkinPart> {
        self.parts_by_code
            .get(code)
            .and_then(|&i| self.skin_parts.get(i))
    }

    /// Non-voice parts, ascending render order.
    pub fn parts_by_render_order(&self) -> impl Iterator<Item = &SkinPart> {
        self.render_order.iter().map(|&i| &self.skin_parts[i])
    }

    #[must_use]
    pub fn scale_part(&self, code: &str) -> Option<&ScalePart> {
        self.scale_parts_by_code
            .get(code)
            .and_then(|&i| self.scale_parts.get(i))
    }

    /// Scale part whose target is the element `name`.
    #[must_use]
    pub fn scale_part_for_element(&self, name: &str) -> Option<&ScalePart> {
        self.scale_parts_by_target
            .get(name)
            .and_then(|&i| self.scale_parts.get(i))
    }

    #[must_use]
    pub fn texture_targets(&self) -> &[TextureTarget] {
        &self.texture_targets
    }

    #[must_use]
    pub fn texture_target(&self, code: &str) -> Option<&TextureTarget> {
        self.texture_targets_by_code
            .get(code)
            .and_then(|&i| self.texture_targets.get(i))
    }

    /// Texture target a part paints into.
    #[must_use]
    pub fn part_texture_target(&self, part: &SkinPart) -> Option<&TextureTarget> {
        part.texture_target_index
            .and_then(|i| self.texture_targets.get(i))
    }

    #[must_use]
    pub fn painting_targets(&self) -> &[PaintingTarget] {
        &self.painting_targets
    }

    #[must_use]
    pub fn painting_target(&self, code: &str) -> Option<&PaintingTarget> {
        self.painting_targets_by_code
            .get(code)
            .and_then(|&i| self.painting_targets.get(i))
    }

    #[must_use]
    pub fn texture_copies(&self) -> &[TextureCopy] {
        &self.texture_copies
    }

    #[must_use]
    pub fn clothing_overlays(&self) -> &[ClothingOverlay] {
        &self.clothing_overlays
    }

    /// Case-insensitive emote lookup.
    #[must_use]
    pub fn emote(&self, code: &str) -> Option<&Emote> {
        self.emotes_by_code
            .get(code)
            .and_then(|&i| self.emotes.get(i))
    }

    /// Own shape folder first, then every addon's.
    #[must_use]
    pub fn shape_paths(&self) -> &[String] {
        &self.shape_paths
    }

    #[must_use]
    pub fn texture_paths(&self) -> &[String] {
        &self.texture_paths
    }

    /// Base shape location, or empty if none is configured.
    #[must_use]
    pub fn model_path(&self) -> &str {
        self.model.as_deref().unwrap_or_default()
    }

    /// Base shape clips followed by every clip of the model's animation
    /// sets, computed on first use and shared afterwards.
    pub fn compiled_animations(
        &self,
        base: &[AnimationClip],
        sets: &FxHashMap<String, AnimationSet>,
    ) -> Arc<[AnimationClip]> {
        self.compiled_animations
            .get_or_init(|| {
                let mut clips = base.to_vec();
                for code in &self.animations {
                    match sets.get(code) {
                        Some(set) => clips.extend(set.animations.iter().cloned()),
                        None => log::warn!(
                            "Model {} references unknown animation set {code}",
                            self.code
                        ),
                    }
                }
                clips.into()
            })
            .clone()
    }
}

fn index_by<T>(items: &[T], key: impl Fn(&T) -> String) -> FxHashMap<String, usize> {
    items.iter().enumerate().map(|(i, it)| (key(it), i)).collect()
}
