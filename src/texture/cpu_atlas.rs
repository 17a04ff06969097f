//! Software texture atlas
//!
//! A single-page atlas held in CPU memory. Regions are packed on shelves
//! (rows of regions sharing a top edge); freed regions are kept and handed
//! out again to allocations of the same size. "GPU" textures are plain
//! bitmaps in a slot map.
//!
//! Used headless (server tools, tests) and as the reference behavior for
//! host atlas implementations.

use slotmap::{Key, SlotMap};

use super::atlas::{AtlasBlend, AtlasPosition, GpuTextureId, SubId, TextureAtlas, TextureRegion};
use crate::errors::{Result, SkinError};
use crate::resources::Bitmap;
use crate::utils::color::blend_over;

#[derive(Debug, Clone, Copy)]
struct Shelf {
    y: u32,
    height: u32,
    cursor_x: u32,
}

#[derive(Debug)]
pub struct CpuAtlas {
    page: Bitmap,
    regions: SlotMap<SubId, AtlasPosition>,
    free_regions: Vec<AtlasPosition>,
    shelves: Vec<Shelf>,
    textures: SlotMap<GpuTextureId, Bitmap>,
    uploads: usize,
    draws: usize,
}

impl Default for CpuAtlas {
    fn default() -> Self {
        Self::new(1024, 1024)
    }
}

impl CpuAtlas {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            page: Bitmap::new(width, height),
            regions: SlotMap::with_key(),
            free_regions: Vec::new(),
            shelves: Vec::new(),
            textures: SlotMap::with_key(),
            uploads: 0,
            draws: 0,
        }
    }

    /// The atlas page.
    #[inline]
    #[must_use]
    pub fn page(&self) -> &Bitmap {
        &self.page
    }

    /// Copy of the page pixels covered by `position`.
    #[must_use]
    pub fn region_pixels(&self, position: &AtlasPosition) -> Bitmap {
        let mut out = Bitmap::new(position.width, position.height);
        for y in 0..position.height {
            for x in 0..position.width {
                if let Some(p) = self.page.pixel(position.x + x, position.y + y) {
                    out.set_pixel(x, y, p);
                }
            }
        }
        out
    }

    /// Registers an existing bitmap as a texture, e.g. a baked item texture.
    pub fn register_texture(&mut self, bitmap: Bitmap) -> GpuTextureId {
        self.textures.insert(bitmap)
    }

    #[must_use]
    pub fn texture(&self, id: GpuTextureId) -> Option<&Bitmap> {
        self.textures.get(id)
    }

    #[must_use]
    pub fn position(&self, id: SubId) -> Option<&AtlasPosition> {
        self.regions.get(id)
    }

    /// Number of uploads performed.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    /// Number of draws into the page performed.
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.draws
    }

    #[must_use]
    pub fn allocation_count(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    fn pack(&mut self, width: u32, height: u32) -> Option<AtlasPosition> {
        if let Some(i) = self
            .free_regions
            .iter()
            .position(|r| r.width == width && r.height == height)
        {
            return Some(self.free_regions.swap_remove(i));
        }

        let page_width = self.page.width();
        let page_height = self.page.height();
        if width > page_width {
            return None;
        }

        // tightest shelf that fits
        let shelf = self
            .shelves
            .iter_mut()
            .filter(|s| s.height >= height && s.cursor_x + width <= page_width)
            .min_by_key(|s| s.height);
        if let Some(shelf) = shelf {
            let position = AtlasPosition {
                atlas_id: 0,
                x: shelf.cursor_x,
                y: shelf.y,
                width,
                height,
            };
            shelf.cursor_x += width;
            return Some(position);
        }

        let y = self.shelves.last().map_or(0, |s| s.y + s.height);
        if y + height > page_height {
            return None;
        }
        self.shelves.push(Shelf {
            y,
            height,
            cursor_x: width,
        });
        Some(AtlasPosition {
            atlas_id: 0,
            x: 0,
            y,
            width,
            height,
        })
    }
}

impl TextureAtlas for CpuAtlas {
    fn allocate(&mut self, width: u32, height: u32) -> Result<(SubId, AtlasPosition)> {
        let position = self
            .pack(width, height)
            .ok_or(SkinError::AtlasFull { width, height })?;
        let id = self.regions.insert(position);
        Ok((id, position))
    }

    fn free(&mut self, id: SubId) {
        if let Some(position) = self.regions.remove(id) {
            self.free_regions.push(position);
        }
    }

    fn upload(
        &mut self,
        existing: Option<GpuTextureId>,
        pixels: &[u32],
        width: u32,
        height: u32,
    ) -> Result<GpuTextureId> {
        let bitmap = Bitmap::from_pixels(width, height, pixels.to_vec());
        self.uploads += 1;
        match existing {
            Some(id) => {
                let slot = self
                    .textures
                    .get_mut(id)
                    .ok_or_else(|| SkinError::InvalidTexture(id.data().as_ffi()))?;
                *slot = bitmap;
                Ok(id)
            }
            None => Ok(self.textures.insert(bitmap)),
        }
    }

    fn dispose(&mut self, texture: GpuTextureId) {
        self.textures.remove(texture);
    }

    fn render_into_atlas(
        &mut self,
        source: &TextureRegion,
        target: &AtlasPosition,
        offset_x: i32,
        offset_y: i32,
        blend: AtlasBlend,
    ) -> Result<()> {
        let texture = self
            .textures
            .get(source.texture)
            .ok_or_else(|| SkinError::InvalidTexture(source.texture.data().as_ffi()))?;

        let origin_x = i64::from(target.x) + i64::from(offset_x);
        let origin_y = i64::from(target.y) + i64::from(offset_y);
        let page_width = i64::from(self.page.width());
        let page_height = i64::from(self.page.height());

        for sy in 0..source.height {
            let dy = origin_y + i64::from(sy);
            if dy < 0 || dy >= page_height {
                continue;
            }
            for sx in 0..source.width {
                let dx = origin_x + i64::from(sx);
                if dx < 0 || dx >= page_width {
                    continue;
                }
                let Some(src) = texture.pixel(source.x + sx, source.y + sy) else {
                    continue;
                };
                // bounds checked above
                let (x, y) = (dx as u32, dy as u32);
                let value = match blend {
                    AtlasBlend::Replace => src,
                    AtlasBlend::Overlay => blend_over(self.page.pixel(x, y).unwrap_or(0), src),
                };
                self.page.set_pixel(x, y, value);
            }
        }
        self.draws += 1;
        Ok(())
    }
}
