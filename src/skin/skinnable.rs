//! Skinnable entity
//!
//! [`Skinnable`] owns everything one customizable entity needs: its model,
//! selection, dirty tracker, command queue, both compositors and its
//! animation metadata. Mutations record typed [`DirtyEvent`]s and never
//! rebuild on their own; the host calls [`Skinnable::rebuild`] once per
//! tesselation event with a [`SkinHost`] lending the engine collaborators.
//!
//! ```rust,ignore
//! let mut skin = Skinnable::new(7, "kemono:player", Side::Client);
//! skin.set_model_code(&registry, "kemono0")?;
//! skin.select_variant("hair", "braid")?;
//! let report = skin.rebuild(&mut host)?;
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use glam::Vec2;
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use super::applied::{AppliedVariant, PartFilter, applied_parts};
use super::command::SkinCommand;
use super::dirty::{DirtyEvent, DirtyState, DirtyTracker, ShapeDirty};
use super::equipment::Inventory;
use super::selection::{SelectionState, VOICE_PITCH_PART, VOICE_TYPE_PART};
use super::shape_compositor::{ShapeCompositor, ShapeInputs, ShapeReport, Side};
use crate::animation::{AnimCacheKey, AnimationCache, AnimationMeta, CachedAnimations, EntityAnimations};
use crate::assets::{ShapeSource, TextureSource};
use crate::catalog::{ModelPreset, ModelRegistry, PartKind, SkinModel, SkinPart};
use crate::errors::{Result, SkinError};
use crate::resources::Bitmap;
use crate::texture::{
    ClearTextureCache, CompositorSettings, TextureAtlas, TextureCompositor, TextureInputs,
    TextureReport,
};
use crate::utils::ColorRgb;
use crate::utils::color::pack_rgba;

/// GPU-side collaborators, absent on the server.
pub struct Graphics<'a> {
    pub atlas: &'a mut dyn TextureAtlas,
    pub clear_textures: &'a mut ClearTextureCache,
}

/// Engine collaborators lent to one rebuild.
pub struct SkinHost<'a> {
    pub registry: &'a ModelRegistry,
    pub shapes: &'a dyn ShapeSource,
    pub textures: &'a dyn TextureSource,
    pub inventory: Option<&'a dyn Inventory>,
    pub animation_cache: &'a mut AnimationCache,
    pub graphics: Option<Graphics<'a>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildReport {
    /// Queued commands applied before compositing
    pub commands: usize,
    pub shape: ShapeReport,
    pub animations_reloaded: bool,
    pub joints_resolved: bool,
    /// `None` when no graphics were available
    pub textures: Option<TextureReport>,
}

/// Emote start or stop, for the host animator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmoteChange {
    Started {
        code: String,
        animation: Option<String>,
    },
    Stopped {
        code: String,
        animation: Option<String>,
    },
}

#[derive(Debug)]
pub struct Skinnable {
    entity_id: u64,
    entity_code: String,
    side: Side,

    model: Option<Arc<SkinModel>>,
    selection: SelectionState,
    dirty: DirtyTracker,
    commands: VecDeque<SkinCommand>,

    shapes: ShapeCompositor,
    textures: TextureCompositor,
    animations: EntityAnimations,
    cached_animations: Option<Arc<CachedAnimations>>,

    /// Allocations to release on the next rebuild (model changed)
    release_textures: bool,
    /// Animation cache entry to drop on the next rebuild (model reloaded)
    stale_animations: Option<AnimCacheKey>,

    rng: StdRng,
}

impl Skinnable {
    /// The random source is seeded from the entity id, so initial colors are
    /// reproducible per entity.
    #[must_use]
    pub fn new(entity_id: u64, entity_code: &str, side: Side) -> Self {
        Self {
            entity_id,
            entity_code: entity_code.to_string(),
            side,
            model: None,
            selection: SelectionState::new(),
            dirty: DirtyTracker::new(),
            commands: VecDeque::new(),
            shapes: ShapeCompositor::new(),
            textures: TextureCompositor::new(CompositorSettings::default()),
            animations: EntityAnimations::default(),
            cached_animations: None,
            release_textures: false,
            stale_animations: None,
            rng: StdRng::seed_from_u64(entity_id),
        }
    }

    /// Entity type animation metadata that model overrides patch.
    #[must_use]
    pub fn with_animations(mut self, metas: Vec<AnimationMeta>) -> Self {
        self.animations = EntityAnimations::new(metas);
        self
    }

    #[must_use]
    pub fn with_compositor_settings(mut self, settings: CompositorSettings) -> Self {
        self.textures = TextureCompositor::new(settings);
        self
    }

    /// Restores a persisted selection. Call [`set_model`](Self::set_model)
    /// (or rebuild with a queued `SetModel`) afterwards to validate it.
    #[must_use]
    pub fn with_selection(mut self, selection: SelectionState) -> Self {
        self.selection = selection;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn entity_id(&self) -> u64 {
        self.entity_id
    }

    #[inline]
    #[must_use]
    pub fn entity_code(&self) -> &str {
        &self.entity_code
    }

    #[inline]
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn model(&self) -> Option<&Arc<SkinModel>> {
        self.model.as_ref()
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    #[must_use]
    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    #[must_use]
    pub fn shape_compositor(&self) -> &ShapeCompositor {
        &self.shapes
    }

    #[must_use]
    pub fn texture_compositor(&self) -> &TextureCompositor {
        &self.textures
    }

    #[must_use]
    pub fn animations(&self) -> &EntityAnimations {
        &self.animations
    }

    #[must_use]
    pub fn cached_animations(&self) -> Option<&Arc<CachedAnimations>> {
        self.cached_animations.as_ref()
    }

    #[must_use]
    pub fn eye_height(&self) -> f64 {
        self.shapes.eye_height()
    }

    #[must_use]
    pub fn hit_box(&self) -> Vec2 {
        self.shapes.hit_box()
    }

    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Applied variants of every part, in render order.
    #[must_use]
    pub fn applied_parts(&self) -> Vec<AppliedVariant> {
        self.model
            .as_ref()
            .map(|model| applied_parts(model, &self.selection, PartFilter::All))
            .unwrap_or_default()
    }

    fn require_model(&self) -> Result<Arc<SkinModel>> {
        self.model.clone().ok_or(SkinError::NoModel)
    }

    fn require_part<'m>(model: &'m SkinModel, code: &str) -> Result<&'m SkinPart> {
        model.part(code).ok_or_else(|| {
            log::error!("Part {code} not found in model {}", model.code);
            SkinError::UnknownPart {
                model: model.code.clone(),
                part: code.to_string(),
            }
        })
    }

    // ========================================================================
    // Model
    // ========================================================================

    /// Switches to `model`. Selecting the current model again does nothing;
    /// use [`reload_model`](Self::reload_model) to force it.
    pub fn set_model(&mut self, model: Arc<SkinModel>, preset: Option<&ModelPreset>) {
        if self.model.as_ref().is_some_and(|m| m.code == model.code) {
            return;
        }
        self.install_model(model, preset);
    }

    pub fn set_model_code(&mut self, registry: &ModelRegistry, code: &str) -> Result<()> {
        let model = registry.require_model(code)?.clone();
        self.set_model(model, registry.default_preset(code));
        Ok(())
    }

    /// Re-fetches the current model from `registry` (after a catalog reload)
    /// and drops its shared animation cache entry.
    pub fn reload_model(&mut self, registry: &ModelRegistry) -> Result<()> {
        let current = self.require_model()?;
        let model = registry.require_model(&current.code)?.clone();
        self.stale_animations = Some(AnimCacheKey::new(&self.entity_code, current.model_path()));
        self.install_model(model, registry.default_preset(&current.code));
        Ok(())
    }

    fn install_model(&mut self, model: Arc<SkinModel>, preset: Option<&ModelPreset>) {
        log::info!("Entity {} using skin model {}", self.entity_id, model.code);
        self.selection.model = Some(model.code.clone());
        self.selection.active_emotes.clear();
        self.model = Some(model);
        self.shapes.clear();
        self.release_textures = true;
        self.dirty.mark(DirtyEvent::BaseShape);
        self.dirty.mark(DirtyEvent::FaceShape);
        self.dirty.mark(DirtyEvent::Animations);
        self.initialize_skin_parts(preset);
    }

    /// Releases every texture allocation now. The next rebuild allocates
    /// and repaints every target.
    pub fn free_textures(&mut self, atlas: &mut dyn TextureAtlas) {
        self.textures.free_all(atlas);
    }

    /// Releases the entity's atlas space and GPU textures.
    pub fn despawn(mut self, atlas: &mut dyn TextureAtlas) {
        self.textures.free_all(atlas);
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Drops selection entries the model no longer supports, then fills every
    /// part without a variant or color from `preset` or defaults.
    pub fn initialize_skin_parts(&mut self, preset: Option<&ModelPreset>) {
        let Some(model) = self.model.clone() else {
            log::error!("Cannot initialize skin parts of entity {}: no model", self.entity_id);
            return;
        };
        let selection = &mut self.selection;

        let before = selection.variants.len() + selection.colors.len() + selection.glow.len();
        selection.variants.retain(|part, variant| {
            model
                .part(part)
                .is_some_and(|p| !p.variants.is_empty() && p.has_variant(variant))
        });
        selection.colors.retain(|part, _| model.part(part).is_some());
        selection.glow.retain(|part, _| model.part(part).is_some());
        let removed = before - (selection.variants.len() + selection.colors.len() + selection.glow.len());
        if removed > 0 && self.side == Side::Client {
            log::warn!("Removed {removed} invalid part selections for model {}", model.code);
        }

        selection.scales.retain(|code, _| model.scale_part(code).is_some());
        selection.paintings.retain(|name, bytes| {
            let valid = model
                .painting_target(name)
                .is_some_and(|target| target.byte_len() == bytes.len());
            if !valid && self.side == Side::Client {
                log::warn!("Removing invalid painting {name}");
            }
            valid
        });

        for part in &model.skin_parts {
            if part.is_voice() {
                continue;
            }

            if !part.variants.is_empty() && !selection.variants.contains_key(&part.code) {
                let preset_variant = preset
                    .and_then(|p| p.parts.get(&part.code))
                    .filter(|v| part.has_variant(v));
                let initial = preset_variant.unwrap_or(&part.variants[0].code);
                selection.variants.insert(part.code.clone(), initial.clone());
            }

            if !selection.colors.contains_key(&part.code) {
                let color = match preset.and_then(|p| p.colors.get(&part.code)) {
                    Some(rgb) => rgb.to_packed(),
                    None => random_color(&mut self.rng),
                };
                selection.colors.insert(part.code.clone(), color);
            }
        }

        for part in model.skin_parts.iter().filter(|p| !p.is_voice()) {
            mark_texture(&mut self.dirty, &model, &part.code);
        }
        self.dirty.mark(DirtyEvent::BaseShape);
    }

    /// Random variant for every part, random color for color-slider parts.
    pub fn randomize_skin_parts(&mut self) -> Result<()> {
        let model = self.require_model()?;
        for part in model.skin_parts.iter().filter(|p| !p.is_voice()) {
            match part.variants.len() {
                0 => {}
                1 => {
                    self.selection
                        .variants
                        .insert(part.code.clone(), part.variants[0].code.clone());
                }
                n => {
                    let i = self.rng.random_range(0..n);
                    self.selection
                        .variants
                        .insert(part.code.clone(), part.variants[i].code.clone());
                }
            }
            if part.use_color_slider {
                let color = random_color(&mut self.rng);
                self.selection.colors.insert(part.code.clone(), color);
            }
            mark_texture(&mut self.dirty, &model, &part.code);
        }
        self.dirty.mark(DirtyEvent::BaseShape);
        self.dirty.mark(DirtyEvent::FaceShape);
        Ok(())
    }

    pub fn select_variant(&mut self, part_code: &str, variant: &str) -> Result<()> {
        let model = self.require_model()?;
        let part = Self::require_part(&model, part_code)?;
        if !part.has_variant(variant) {
            log::warn!("Part {part_code} has no variant {variant}");
            return Err(SkinError::UnknownVariant {
                part: part_code.to_string(),
                variant: variant.to_string(),
            });
        }

        self.selection
            .variants
            .insert(part_code.to_string(), variant.to_string());

        match part.kind {
            PartKind::Voice => {
                if part_code == VOICE_TYPE_PART {
                    variant.clone_into(&mut self.selection.voice_type);
                } else if part_code == VOICE_PITCH_PART {
                    variant.clone_into(&mut self.selection.voice_pitch);
                }
                return Ok(());
            }
            PartKind::Shape => self.dirty.mark(shape_event(part)),
            PartKind::Texture => {}
        }
        mark_texture(&mut self.dirty, &model, part_code);
        Ok(())
    }

    /// Sets a packed RGBA color; `0` disables tinting.
    pub fn set_color(&mut self, part_code: &str, color: u32) -> Result<()> {
        let model = self.require_model()?;
        Self::require_part(&model, part_code)?;
        self.selection.colors.insert(part_code.to_string(), color);
        mark_texture(&mut self.dirty, &model, part_code);
        Ok(())
    }

    pub fn set_color_rgb(&mut self, part_code: &str, color: ColorRgb) -> Result<()> {
        self.set_color(part_code, color.to_packed())
    }

    pub fn set_glow(&mut self, part_code: &str, glow: i32) -> Result<()> {
        let model = self.require_model()?;
        let part = Self::require_part(&model, part_code)?;
        self.selection.glow.insert(part_code.to_string(), glow);
        self.dirty.mark(shape_event(part));
        Ok(())
    }

    pub fn remove_glow(&mut self) {
        if self.selection.glow.is_empty() {
            return;
        }
        self.selection.glow.clear();
        self.dirty.mark(DirtyEvent::BaseShape);
    }

    pub fn set_scale(&mut self, scale_part: &str, scale: f64) -> Result<()> {
        let model = self.require_model()?;
        if model.scale_part(scale_part).is_none() {
            log::error!("Scale part {scale_part} not found in model {}", model.code);
            return Err(SkinError::UnknownPart {
                model: model.code.clone(),
                part: scale_part.to_string(),
            });
        }
        self.selection.scales.insert(scale_part.to_string(), scale);
        self.dirty.mark(DirtyEvent::BaseShape);
        Ok(())
    }

    pub fn clear_scale(&mut self) {
        self.selection.scales.clear();
        self.dirty.mark(DirtyEvent::BaseShape);
    }

    /// Clamped to the model's offset bounds.
    pub fn set_eye_height_offset(&mut self, offset: f64) {
        let offset = match &self.model {
            Some(model) => offset.clamp(model.eye_height_offset_min, model.eye_height_offset_max),
            None => offset,
        };
        self.selection.eye_height_offset = offset;
        self.dirty.mark(DirtyEvent::BaseShape);
    }

    /// Marks the texture target of a part dirty. Unknown parts are logged and
    /// ignored.
    pub fn mark_part_texture_dirty(&mut self, part_code: &str) {
        let Some(model) = self.model.clone() else {
            log::error!("Cannot mark {part_code} dirty: no model");
            return;
        };
        mark_texture(&mut self.dirty, &model, part_code);
    }

    // ========================================================================
    // Paintings
    // ========================================================================

    /// Stores painting pixels (`size * size` packed RGBA).
    pub fn set_painting_pixels(&mut self, name: &str, pixels: &[u32]) -> Result<()> {
        let model = self.require_model()?;
        let Some(target) = model.painting_target(name) else {
            log::error!("Painting {name} not found in model {}", model.code);
            return Err(SkinError::UnknownPainting(name.to_string()));
        };
        let expected = target.byte_len();
        if pixels.len() * 4 != expected {
            log::error!("Painting {name} pixel count mismatch");
            return Err(SkinError::PaintingSizeMismatch {
                name: name.to_string(),
                expected,
                actual: pixels.len() * 4,
            });
        }

        let bytes: Vec<u8> = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
        self.selection.paintings.insert(name.to_string(), bytes);
        self.dirty.mark(DirtyEvent::Painting {
            name: name.to_string(),
            targets: target.texture_targets.clone(),
        });
        Ok(())
    }

    /// Stored pixels, or `width * height` zeros when nothing of that size is
    /// stored.
    #[must_use]
    pub fn get_painting_pixels(&self, name: &str, width: u32, height: u32) -> Vec<u32> {
        self.selection
            .painting_pixels(name, width, height)
            .unwrap_or_else(|| vec![0; (width as usize) * (height as usize)])
    }

    /// Fills the whole canvas with `color`.
    pub fn clear_painting_pixels(&mut self, name: &str, color: u32) -> Result<()> {
        let model = self.require_model()?;
        let size = model
            .painting_target(name)
            .ok_or_else(|| SkinError::UnknownPainting(name.to_string()))?
            .size;
        let pixels = vec![color; (size as usize) * (size as usize)];
        self.set_painting_pixels(name, &pixels)
    }

    /// Imports a PNG; it must match the canvas size exactly.
    pub fn set_painting_from_png(&mut self, name: &str, png: &[u8]) -> Result<()> {
        let model = self.require_model()?;
        let size = model
            .painting_target(name)
            .ok_or_else(|| SkinError::UnknownPainting(name.to_string()))?
            .size;
        let bitmap = Bitmap::from_png_bytes(png)?;
        if bitmap.width() != size || bitmap.height() != size {
            return Err(SkinError::PaintingImageSize {
                name: name.to_string(),
                size,
                width: bitmap.width(),
                height: bitmap.height(),
            });
        }
        self.set_painting_pixels(name, bitmap.pixels())
    }

    pub fn painting_png(&self, name: &str) -> Result<Vec<u8>> {
        let model = self.require_model()?;
        let size = model
            .painting_target(name)
            .ok_or_else(|| SkinError::UnknownPainting(name.to_string()))?
            .size;
        let pixels = self.get_painting_pixels(name, size, size);
        Bitmap::from_pixels(size, size, pixels).to_png_bytes()
    }

    // ========================================================================
    // Presets
    // ========================================================================

    pub fn save_preset(&self) -> Result<ModelPreset> {
        let model = self.require_model()?;
        let mut preset = ModelPreset::new(&model.code);

        for part in model.parts_by_render_order() {
            if let Some(variant) = self.selection.variant(&part.code)
                && part.has_variant(variant)
            {
                preset.parts.insert(part.code.clone(), variant.to_string());
            }
            if let Some(&color) = self.selection.colors.get(&part.code) {
                preset
                    .colors
                    .insert(part.code.clone(), ColorRgb::from_packed(color));
            }
        }
        for scale in &model.scale_parts {
            if let Some(value) = self.selection.scale(&scale.code) {
                preset.scale.insert(scale.code.clone(), value);
            }
        }
        Ok(preset)
    }

    /// Switches to the preset's model, then applies every valid entry.
    pub fn load_preset(&mut self, registry: &ModelRegistry, preset: &ModelPreset) -> Result<()> {
        let model = registry.require_model(&preset.model).inspect_err(|_| {
            log::error!("Preset model {} not found", preset.model);
        })?;
        self.set_model(model.clone(), registry.default_preset(&preset.model));
        let model = self.require_model()?;

        self.selection.scales.clear();
        self.dirty.mark(DirtyEvent::BaseShape);

        for (code, variant) in &preset.parts {
            let Some(part) = model.part(code).filter(|p| p.has_variant(variant)) else {
                continue;
            };
            self.selection.variants.insert(code.clone(), variant.clone());
            if part.kind == PartKind::Shape {
                self.dirty.mark(DirtyEvent::BaseShape);
            }
            mark_texture(&mut self.dirty, &model, code);
        }

        for (code, &scale) in &preset.scale {
            if model.scale_part(code).is_some() {
                self.selection.scales.insert(code.clone(), scale);
            }
        }

        for (code, rgb) in &preset.colors {
            if model.part(code).is_some() {
                self.selection.colors.insert(code.clone(), rgb.to_packed());
                mark_texture(&mut self.dirty, &model, code);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Emotes
    // ========================================================================

    /// Activates an emote. Returns `None` for unknown or already active
    /// emotes.
    pub fn start_emote(&mut self, code: &str) -> Option<EmoteChange> {
        let model = self.model.clone()?;
        let emote = model.emote(code)?;
        if self.selection.is_emote_active(&emote.code) {
            return None;
        }
        self.selection.active_emotes.push(emote.code.clone());
        self.mark_emote_parts(&model, &emote.code);
        Some(EmoteChange::Started {
            code: emote.code.clone(),
            animation: emote.animation.clone(),
        })
    }

    pub fn stop_emote(&mut self, code: &str) -> Option<EmoteChange> {
        let model = self.model.clone()?;
        let index = self
            .selection
            .active_emotes
            .iter()
            .position(|e| e.eq_ignore_ascii_case(code))?;
        let code = self.selection.active_emotes.remove(index);
        self.mark_emote_parts(&model, &code);
        Some(EmoteChange::Stopped {
            animation: model.emote(&code).and_then(|e| e.animation.clone()),
            code,
        })
    }

    pub fn stop_all_emotes(&mut self) -> Vec<EmoteChange> {
        let active: Vec<String> = self.selection.active_emotes.iter().rev().cloned().collect();
        active
            .iter()
            .filter_map(|code| self.stop_emote(code))
            .collect()
    }

    fn mark_emote_parts(&mut self, model: &SkinModel, code: &str) {
        let Some(emote) = model.emote(code) else {
            return;
        };
        for selected in emote.parts() {
            let Some(part) = model.part(&selected.part) else {
                continue;
            };
            if part.kind == PartKind::Shape {
                self.dirty.mark(shape_event(part));
            }
            mark_texture(&mut self.dirty, model, &part.code);
        }
    }

    // ========================================================================
    // Deferred commands
    // ========================================================================

    pub fn enqueue(&mut self, command: SkinCommand) {
        self.commands.push_back(command);
    }

    /// Applies queued commands in order. Failures are logged and skipped.
    pub fn apply_commands(&mut self, registry: &ModelRegistry) -> usize {
        let mut applied = 0;
        while let Some(command) = self.commands.pop_front() {
            let name = command.name();
            if let Err(err) = self.apply_command(command, registry) {
                log::warn!("Skin command {name} on entity {} failed: {err}", self.entity_id);
            }
            applied += 1;
        }
        applied
    }

    fn apply_command(&mut self, command: SkinCommand, registry: &ModelRegistry) -> Result<()> {
        match command {
            SkinCommand::SetModel(code) => self.set_model_code(registry, &code),
            SkinCommand::ReloadModel => self.reload_model(registry),
            SkinCommand::SelectVariant { part, variant } => self.select_variant(&part, &variant),
            SkinCommand::SetColor { part, color } => self.set_color(&part, color),
            SkinCommand::SetGlow { part, glow } => self.set_glow(&part, glow),
            SkinCommand::RemoveGlow => {
                self.remove_glow();
                Ok(())
            }
            SkinCommand::SetScale { part, scale } => self.set_scale(&part, scale),
            SkinCommand::ClearScale => {
                self.clear_scale();
                Ok(())
            }
            SkinCommand::SetEyeHeightOffset(offset) => {
                self.set_eye_height_offset(offset);
                Ok(())
            }
            SkinCommand::SetPaintingPixels { name, pixels } => self.set_painting_pixels(&name, &pixels),
            SkinCommand::ClearPaintingPixels { name, color } => self.clear_painting_pixels(&name, color),
            SkinCommand::LoadPreset(preset) => self.load_preset(registry, &preset),
            SkinCommand::Randomize => self.randomize_skin_parts(),
            SkinCommand::StartEmote(code) => {
                self.start_emote(&code);
                Ok(())
            }
            SkinCommand::StopEmote(code) => {
                self.stop_emote(&code);
                Ok(())
            }
            SkinCommand::StopAllEmotes => {
                self.stop_all_emotes();
                Ok(())
            }
        }
    }

    // ========================================================================
    // Rebuild
    // ========================================================================

    /// Applies queued commands, then recomposites whatever is dirty.
    ///
    /// On error the dirty state is restored, so the next call retries.
    pub fn rebuild(&mut self, host: &mut SkinHost<'_>) -> Result<RebuildReport> {
        let commands = self.apply_commands(host.registry);
        let model = self.require_model()?;

        if self.release_textures {
            match host.graphics.as_mut() {
                Some(graphics) => self.textures.free_all(&mut *graphics.atlas),
                None => self.textures.forget_all(),
            }
            self.release_textures = false;
        }
        if let Some(key) = self.stale_animations.take()
            && host.animation_cache.invalidate(&key)
        {
            log::debug!("Dropped animation cache entry {key}");
        }

        let snapshot = self.dirty.take();
        let mut working = snapshot.clone();
        match self.composite(&model, host, &mut working) {
            Ok(mut report) => {
                report.commands = commands;
                // texture work left over on a side without graphics
                self.dirty.restore(working);
                Ok(report)
            }
            Err(err) => {
                log::warn!("Rebuild of entity {} failed: {err}", self.entity_id);
                self.dirty.restore(snapshot);
                Err(err)
            }
        }
    }

    fn composite(
        &mut self,
        model: &SkinModel,
        host: &mut SkinHost<'_>,
        dirty: &mut DirtyState,
    ) -> Result<RebuildReport> {
        let mut report = RebuildReport::default();

        let inputs = ShapeInputs {
            model,
            selection: &self.selection,
            shapes: host.shapes,
            inventory: host.inventory,
            animation_sets: host.registry.animation_sets(),
            side: self.side,
        };
        report.shape = self.shapes.rebuild(&inputs, &mut dirty.shape)?;

        if dirty.shape.contains(ShapeDirty::ANIMATIONS) {
            self.animations
                .reload(&model.animation_remappings, &model.animation_overrides);
            let joint_count = self.shapes.resolve_joints(&model.joints.all());
            let key = AnimCacheKey::new(&self.entity_code, model.model_path());
            let clips = self.shapes.clips().clone();
            self.cached_animations = Some(host.animation_cache.get_or_insert_with(&key, || {
                CachedAnimations { clips, joint_count }
            }));
            report.animations_reloaded = true;
            report.joints_resolved = true;
        } else if report.shape.base_rebuilt {
            self.shapes.resolve_joints(&model.joints.all());
            report.joints_resolved = true;
        }
        dirty.shape.remove(ShapeDirty::ANIMATIONS);

        if let Some(graphics) = host.graphics.as_mut() {
            let applied = applied_parts(model, &self.selection, PartFilter::All);
            let inputs = TextureInputs {
                entity_id: self.entity_id,
                model,
                applied: &applied,
                selection: &self.selection,
                textures: host.textures,
                inventory: host.inventory,
            };
            report.textures = Some(self.textures.render(
                &inputs,
                dirty,
                &mut *graphics.atlas,
                &mut *graphics.clear_textures,
            )?);
        }

        Ok(report)
    }
}

/// Face parts dirty the face stage, everything else the base.
fn shape_event(part: &SkinPart) -> DirtyEvent {
    if part.face {
        DirtyEvent::FaceShape
    } else {
        DirtyEvent::BaseShape
    }
}

fn mark_texture(dirty: &mut DirtyTracker, model: &SkinModel, part_code: &str) {
    let Some(part) = model.part(part_code) else {
        log::error!("Part {part_code} not found in model {}", model.code);
        return;
    };
    if let Some(target) = &part.texture_target {
        dirty.mark(DirtyEvent::Texture(target.clone()));
    }
}

fn random_color(rng: &mut StdRng) -> u32 {
    pack_rgba(
        rng.random_range(0..255),
        rng.random_range(0..255),
        rng.random_range(0..255),
        255,
    )
}
