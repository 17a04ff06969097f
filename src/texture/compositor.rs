//! Texture Compositor
//!
//! Keeps one [`TextureAllocation`] per texture target of an entity and
//! redraws only what the dirty state asks for. One pass:
//!
//! 1. Invalidate: worn-item changes dirty every overlay target, and a dirty
//!    copy source dirties its copy destination.
//! 2. Paint: walk applied parts in render order, drawing paintings and part
//!    textures into the CPU buffers of dirty targets.
//! 3. Commit dirty buffers to the atlas. Freshly allocated targets count as
//!    dirty.
//! 4. Re-apply target copies and worn-item overlays over committed regions.
//!
//! With nothing dirty and nothing worn changed, a pass commits nothing.

use rustc_hash::{FxHashMap, FxHashSet};

use super::allocation::TextureAllocation;
use super::atlas::{AtlasBlend, AtlasPosition, ClearTextureCache, SubId, TextureAtlas, TextureRegion};
use crate::assets::{AssetLocation, FALLBACK_DOMAIN, TextureSource};
use crate::catalog::{DressSlot, SkinModel, SkinPart, TextureTarget};
use crate::errors::Result;
use crate::resources::Bitmap;
use crate::skin::applied::AppliedVariant;
use crate::skin::dirty::DirtyState;
use crate::skin::equipment::{IGNORED_ITEM_TEXTURE, Inventory};
use crate::skin::selection::SelectionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositorSettings {
    /// Body texture target that other systems draw clothing onto
    pub primary_target: String,
    /// Commit the primary target on every pass, dirty or not
    pub always_commit_primary: bool,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            primary_target: "main".to_string(),
            always_commit_primary: false,
        }
    }
}

/// Everything a pass reads besides the dirty state and the atlas.
pub struct TextureInputs<'a> {
    pub entity_id: u64,
    pub model: &'a SkinModel,
    pub applied: &'a [AppliedVariant],
    pub selection: &'a SelectionState,
    pub textures: &'a dyn TextureSource,
    pub inventory: Option<&'a dyn Inventory>,
}

/// What a pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureReport {
    /// Targets that received a new atlas region
    pub allocated: Vec<String>,
    /// Targets uploaded and drawn into the atlas, in target order
    pub committed: Vec<String>,
    pub copies: usize,
    pub overlays: usize,
}

impl TextureReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocated.is_empty() && self.committed.is_empty() && self.copies == 0 && self.overlays == 0
    }
}

type OverlaySignature = Vec<(usize, DressSlot, TextureRegion)>;

#[derive(Debug, Default)]
pub struct TextureCompositor {
    settings: CompositorSettings,
    /// Target code -> allocation
    allocations: FxHashMap<String, TextureAllocation>,
    overlay_signature: OverlaySignature,
}

impl TextureCompositor {
    #[must_use]
    pub fn new(settings: CompositorSettings) -> Self {
        Self {
            settings,
            allocations: FxHashMap::default(),
            overlay_signature: Vec::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    #[must_use]
    pub fn allocation(&self, target: &str) -> Option<&TextureAllocation> {
        self.allocations.get(target)
    }

    pub fn allocations(&self) -> impl Iterator<Item = &TextureAllocation> {
        self.allocations.values()
    }

    /// `(allocation key, atlas region id, atlas position)` for every target,
    /// for the renderer's texture bindings.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, SubId, &AtlasPosition)> {
        self.allocations
            .values()
            .map(|a| (a.key(), a.sub_id(), a.position()))
    }

    /// Releases every allocation.
    pub fn free_all(&mut self, atlas: &mut dyn TextureAtlas) {
        for (_, allocation) in self.allocations.drain() {
            allocation.release(atlas);
        }
        self.overlay_signature.clear();
    }

    /// Forgets allocations without touching an atlas, for hosts that
    /// dropped the atlas themselves.
    pub fn forget_all(&mut self) {
        self.allocations.clear();
        self.overlay_signature.clear();
    }

    /// Runs one compositing pass. `dirty` is consumed: on success its texture
    /// and painting sets are empty. On error it may be partially consumed and
    /// the caller should restore its own copy; regions allocated by the
    /// failed pass are released again.
    pub fn render(
        &mut self,
        inputs: &TextureInputs<'_>,
        dirty: &mut DirtyState,
        atlas: &mut dyn TextureAtlas,
        clear_textures: &mut ClearTextureCache,
    ) -> Result<TextureReport> {
        let signature = overlay_signature(inputs.model, inputs.inventory);
        let mut report = TextureReport::default();

        match self.composite(inputs, &signature, dirty, atlas, clear_textures, &mut report) {
            Ok(()) => {
                self.overlay_signature = signature;
                if !report.is_empty() {
                    log::debug!(
                        "Entity {} textures: committed {:?}, {} copies, {} overlays",
                        inputs.entity_id,
                        report.committed,
                        report.copies,
                        report.overlays
                    );
                }
                Ok(report)
            }
            Err(err) => {
                for code in &report.allocated {
                    if let Some(allocation) = self.allocations.remove(code) {
                        allocation.release(atlas);
                    }
                }
                Err(err)
            }
        }
    }

    fn composite(
        &mut self,
        inputs: &TextureInputs<'_>,
        signature: &OverlaySignature,
        dirty: &mut DirtyState,
        atlas: &mut dyn TextureAtlas,
        clear_textures: &mut ClearTextureCache,
        report: &mut TextureReport,
    ) -> Result<()> {
        let model = inputs.model;

        self.invalidate(model, signature, dirty);

        for applied in inputs.applied {
            if applied.skip {
                continue;
            }
            let Some(part) = model.part(&applied.part) else {
                continue;
            };
            let Some(target) = model.part_texture_target(part) else {
                continue;
            };
            if target.width == 0 || target.height == 0 {
                continue;
            }

            let allocation = match self.allocations.entry(target.code.clone()) {
                std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                std::collections::hash_map::Entry::Vacant(e) => {
                    let allocation = allocate(target, inputs.entity_id, atlas, clear_textures)?;
                    report.allocated.push(target.code.clone());
                    // a fresh region holds nothing but the clear texture
                    dirty.textures.insert(target.code.clone());
                    e.insert(allocation)
                }
            };

            let target_dirty = dirty.textures.contains(&target.code);

            if part.use_painting {
                let Some(name) = part.painting_name.as_deref() else {
                    continue;
                };
                if dirty.paintings.contains(name) || target_dirty {
                    let size = part.painting_size;
                    let painting = painting_bitmap(inputs.selection, name, size);
                    allocation.write_pixels(
                        painting.pixels(),
                        size,
                        size,
                        part.texture_render_to.x,
                        part.texture_render_to.y,
                        part.texture_blend_overlay,
                    );
                    dirty.textures.insert(target.code.clone());
                    // parts sharing this painting must not draw it twice
                    dirty.paintings.remove(name);
                }
            } else if part.use_clothing_texture {
                continue;
            } else if target_dirty && let Some(texture) = applied.texture.as_deref() {
                if target.is_base_part(&part.code) {
                    allocation.clear_pixels();
                }
                let Some(mut bitmap) = load_part_bitmap(inputs.textures, texture) else {
                    log::error!("Failed loading texture {texture} for part {}", part.code);
                    continue;
                };
                if tints(part, applied.color) {
                    bitmap.multiply_rgb(applied.color);
                }
                log::debug!("Drawing {texture} into {}", target.code);
                allocation.write_pixels(
                    bitmap.pixels(),
                    bitmap.width(),
                    bitmap.height(),
                    part.texture_render_to.x,
                    part.texture_render_to.y,
                    part.texture_blend_overlay,
                );
            }
        }

        // commit
        let forced = self.forced_commits(model);
        let mut committed: FxHashSet<&str> = FxHashSet::default();
        for target in model.texture_targets() {
            let Some(allocation) = self.allocations.get_mut(&target.code) else {
                continue;
            };
            if dirty.textures.contains(&target.code) || forced.contains(target.code.as_str()) {
                allocation.commit(atlas)?;
                committed.insert(target.code.as_str());
                report.committed.push(target.code.clone());
            }
        }

        // copies
        for copy in model.texture_copies() {
            if !committed.contains(copy.from.as_str()) && !committed.contains(copy.to.as_str()) {
                continue;
            }
            let (Some(from), Some(to)) = (self.allocations.get(&copy.from), self.allocations.get(&copy.to))
            else {
                continue;
            };
            let Some(texture) = from.texture() else {
                continue;
            };
            atlas.render_into_atlas(
                &TextureRegion::full(texture, to.width(), to.height()),
                to.position(),
                0,
                0,
                AtlasBlend::Overlay,
            )?;
            report.copies += 1;
        }

        // worn-item overlays
        if let Some(inventory) = inputs.inventory
            && !inventory.hides_clothing()
        {
            for overlay in model.clothing_overlays() {
                if !committed.contains(overlay.target.as_str()) {
                    continue;
                }
                let Some(allocation) = self.allocations.get(&overlay.target) else {
                    continue;
                };
                for &slot in &overlay.slots {
                    let Some(stack) = inventory.stack(slot).filter(|s| s.has_valid_texture()) else {
                        continue;
                    };
                    for texture in stack.textures.iter().filter(|t| t.code != IGNORED_ITEM_TEXTURE) {
                        atlas.render_into_atlas(
                            &texture.region,
                            allocation.position(),
                            overlay.offset.x,
                            overlay.offset.y,
                            AtlasBlend::Overlay,
                        )?;
                        report.overlays += 1;
                    }
                }
            }
        }

        dirty.textures.clear();
        dirty.paintings.clear();
        Ok(())
    }

    /// Targets committed whether dirty or not: the primary target when
    /// configured, plus every copy destination fed from it.
    fn forced_commits<'m>(&self, model: &'m SkinModel) -> FxHashSet<&'m str> {
        let mut forced = FxHashSet::default();
        if !self.settings.always_commit_primary {
            return forced;
        }
        let Some(primary) = model.texture_target(&self.settings.primary_target) else {
            return forced;
        };
        forced.insert(primary.code.as_str());
        loop {
            let mut changed = false;
            for copy in model.texture_copies() {
                if forced.contains(copy.from.as_str()) && forced.insert(copy.to.as_str()) {
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        forced
    }

    fn invalidate(&self, model: &SkinModel, signature: &OverlaySignature, dirty: &mut DirtyState) {
        if *signature != self.overlay_signature {
            for overlay in model.clothing_overlays() {
                dirty.textures.insert(overlay.target.clone());
            }
        }

        // copies may chain, propagate until stable
        loop {
            let mut changed = false;
            for copy in model.texture_copies() {
                if dirty.textures.contains(&copy.from) && !dirty.textures.contains(&copy.to) {
                    dirty.textures.insert(copy.to.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    }
}

fn allocate(
    target: &TextureTarget,
    entity_id: u64,
    atlas: &mut dyn TextureAtlas,
    clear_textures: &mut ClearTextureCache,
) -> Result<TextureAllocation> {
    let (sub_id, position) = atlas.allocate(target.width, target.height)?;
    clear_textures.clear_region(atlas, &position)?;
    log::debug!(
        "Allocated {}x{} for {}-{entity_id} at ({}, {})",
        target.width,
        target.height,
        target.code,
        position.x,
        position.y
    );
    Ok(TextureAllocation::new(
        format!("{}-{entity_id}", target.code),
        &target.code,
        sub_id,
        position,
    ))
}

fn overlay_signature(model: &SkinModel, inventory: Option<&dyn Inventory>) -> OverlaySignature {
    let Some(inventory) = inventory.filter(|inv| !inv.hides_clothing()) else {
        return Vec::new();
    };
    let mut signature = Vec::new();
    for (i, overlay) in model.clothing_overlays().iter().enumerate() {
        for &slot in &overlay.slots {
            let Some(stack) = inventory.stack(slot).filter(|s| s.has_valid_texture()) else {
                continue;
            };
            signature.extend(
                stack
                    .textures
                    .iter()
                    .filter(|t| t.code != IGNORED_ITEM_TEXTURE)
                    .map(|t| (i, slot, t.region)),
            );
        }
    }
    signature
}

fn painting_bitmap(selection: &SelectionState, name: &str, size: u32) -> Bitmap {
    match selection.paintings.get(name) {
        Some(bytes) => Bitmap::from_rgba_bytes(size, size, bytes),
        None => Bitmap::new(size, size),
    }
}

/// Part texture, retried under the fallback domain.
pub(crate) fn load_part_bitmap(textures: &dyn TextureSource, path: &str) -> Option<Bitmap> {
    let location = AssetLocation::texture(path);
    textures
        .load_bitmap(&location)
        .or_else(|| textures.load_bitmap(&location.with_domain(FALLBACK_DOMAIN)))
}

#[inline]
fn tints(part: &SkinPart, color: u32) -> bool {
    part.use_color_slider && color != 0
}
