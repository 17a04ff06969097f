//! Texture atlas contract
//!
//! The host owns one shared entity texture atlas. This crate only needs to
//! reserve rectangular regions in it, upload CPU pixel buffers as standalone
//! GPU textures, and draw those textures into the reserved regions.

use rustc_hash::FxHashMap;
use slotmap::new_key_type;

use crate::errors::Result;
use crate::utils::color::pack_rgba;

new_key_type! {
    /// Reserved atlas region.
    pub struct SubId;
    /// Standalone GPU texture.
    pub struct GpuTextureId;
}

/// Pixel rectangle of a reserved region inside an atlas page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtlasPosition {
    pub atlas_id: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasPosition {
    /// Normalized `[u0, v0, u1, v1]` for an atlas page of the given size.
    #[must_use]
    pub fn uv(&self, atlas_width: u32, atlas_height: u32) -> [f32; 4] {
        let w = atlas_width.max(1) as f32;
        let h = atlas_height.max(1) as f32;
        [
            self.x as f32 / w,
            self.y as f32 / h,
            (self.x + self.width) as f32 / w,
            (self.y + self.height) as f32 / h,
        ]
    }
}

/// Rectangle of a GPU texture used as a draw source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    pub texture: GpuTextureId,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureRegion {
    /// The whole texture, starting at the origin.
    #[must_use]
    pub const fn full(texture: GpuTextureId, width: u32, height: u32) -> Self {
        Self {
            texture,
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// How drawn pixels combine with the atlas contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtlasBlend {
    /// Source pixels overwrite the destination, alpha included.
    #[default]
    Replace,
    /// Alpha-over onto the destination.
    Overlay,
}

pub trait TextureAtlas {
    /// Reserves a `width x height` region.
    fn allocate(&mut self, width: u32, height: u32) -> Result<(SubId, AtlasPosition)>;

    /// Releases a region. Unknown ids are ignored.
    fn free(&mut self, id: SubId);

    /// Uploads pixels into `existing` (reusing it when the size matches) or
    /// into a new texture.
    fn upload(
        &mut self,
        existing: Option<GpuTextureId>,
        pixels: &[u32],
        width: u32,
        height: u32,
    ) -> Result<GpuTextureId>;

    /// Destroys a texture. Unknown ids are ignored.
    fn dispose(&mut self, texture: GpuTextureId);

    /// Draws `source` into the atlas page of `target`, with its top-left
    /// corner at `target` offset by `(offset_x, offset_y)`. No clamping to
    /// the target rectangle is performed.
    fn render_into_atlas(
        &mut self,
        source: &TextureRegion,
        target: &AtlasPosition,
        offset_x: i32,
        offset_y: i32,
        blend: AtlasBlend,
    ) -> Result<()>;
}

// ============================================================================
// Clear textures
// ============================================================================

/// Transparent white, used to wipe a freshly allocated region.
pub const CLEAR_COLOR: u32 = pack_rgba(255, 255, 255, 0);

/// Shared "clear" textures keyed by size, uploaded lazily.
///
/// One cache serves every entity drawing into the same atlas.
#[derive(Debug, Default)]
pub struct ClearTextureCache {
    textures: FxHashMap<(u32, u32), GpuTextureId>,
}

impl ClearTextureCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(
        &mut self,
        atlas: &mut dyn TextureAtlas,
        width: u32,
        height: u32,
    ) -> Result<GpuTextureId> {
        if let Some(&id) = self.textures.get(&(width, height)) {
            return Ok(id);
        }
        let pixels = vec![CLEAR_COLOR; (width as usize) * (height as usize)];
        let id = atlas.upload(None, &pixels, width, height)?;
        self.textures.insert((width, height), id);
        Ok(id)
    }

    /// Overwrites the region at `position` with transparent white.
    pub fn clear_region(
        &mut self,
        atlas: &mut dyn TextureAtlas,
        position: &AtlasPosition,
    ) -> Result<()> {
        let texture = self.get_or_create(atlas, position.width, position.height)?;
        atlas.render_into_atlas(
            &TextureRegion::full(texture, position.width, position.height),
            position,
            0,
            0,
            AtlasBlend::Replace,
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Disposes every cached texture.
    pub fn dispose_all(&mut self, atlas: &mut dyn TextureAtlas) {
        for (_, id) in self.textures.drain() {
            atlas.dispose(id);
        }
    }
}
